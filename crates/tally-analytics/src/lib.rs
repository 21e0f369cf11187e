// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client-side telemetry SDK for Tally.
//!
//! Records are queued locally, persisted through a [`KeyValueStore`], and
//! uploaded to a collector in timestamp-ordered batches. At most one upload
//! is in flight per client. A "payload too large" response halves the batch
//! size and retries until a single record is dropped.
//!
//! # Example
//!
//! ```ignore
//! use tally_analytics::{AnalyticsClient, Properties};
//!
//! let client = AnalyticsClient::builder()
//!     .api_key("your_api_key")
//!     .base_url("https://collector.example.com")
//!     .batch_events(true)
//!     .build()?;
//!
//! client
//!     .log_event("button_clicked", Properties::new().insert("button", "checkout"))
//!     .await?;
//!
//! client
//!     .set_user_properties(Properties::new().insert("plan", "pro"))
//!     .await?;
//!
//! client.shutdown().await?;
//! ```

pub mod batch;
pub mod buffer;
pub mod client;
pub mod clock;
pub mod config;
pub mod delivery;
pub mod error;
pub mod properties;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod transport;

pub use batch::{compose_batch, Batch};
pub use buffer::{EventBuffer, QueueKeys};
pub use client::{
	AnalyticsClient, AnalyticsClientBuilder, DeviceInfo, LogOutcome, SkipReason, UploadCallback,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{load_config, load_layer, AnalyticsConfig, AnalyticsConfigLayer, ConfigError};
pub use delivery::{backoff_batch_size, UploadOutcome};
pub use error::{AnalyticsError, Result};
pub use properties::Properties;
pub use scheduler::{UploadDecision, UploadPolicy};
pub use session::SessionTracker;
pub use store::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use transport::{HttpTransport, Transport, TransportResponse};

pub use tally_analytics_core::{
	Event, EventId, EventKind, Identity, UploadPayload, IDENTIFY_EVENT, REVENUE_EVENT,
};

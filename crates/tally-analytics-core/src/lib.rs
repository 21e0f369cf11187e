// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for Tally client-side telemetry.
//!
//! This crate provides the records the SDK queues and uploads: the [`Event`]
//! record with its per-kind [`EventId`], the persisted [`Identity`], the
//! [`UploadPayload`] sent to the collector together with its checksum, and the
//! string truncation applied to property payloads. It is used by the
//! `tally-analytics` client SDK.
//!
//! # Example
//!
//! ```
//! use tally_analytics_core::{checksum, EventKind, UploadPayload, API_VERSION};
//!
//! assert_eq!(EventKind::of("$identify"), EventKind::Identify);
//! assert_eq!(EventKind::of("button_clicked"), EventKind::Regular);
//!
//! let payload = UploadPayload::from_serialized("api_key", "[]".to_string(), 1_700_000_000_000);
//! assert_eq!(payload.v, API_VERSION);
//! assert_eq!(
//!     payload.checksum,
//!     checksum(API_VERSION, "api_key", "[]", 1_700_000_000_000)
//! );
//! ```

pub mod error;
pub mod event;
pub mod identity;
pub mod payload;
pub mod truncate;

pub use error::{CoreError, Result};
pub use event::{Event, EventId, EventKind, Library, IDENTIFY_EVENT, REVENUE_EVENT};
pub use identity::Identity;
pub use payload::{checksum, UploadPayload, API_VERSION};
pub use truncate::{truncate_value, MAX_STRING_LENGTH};

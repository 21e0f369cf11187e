// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the analytics SDK.

use tally_analytics_core::CoreError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::store::StorageError;

/// Analytics SDK errors.
///
/// Policy outcomes such as opt-out or an empty event type are not errors;
/// they are reported as [`crate::LogOutcome::Skipped`].
#[derive(Debug, Error)]
pub enum AnalyticsError {
	/// API key is missing or empty.
	#[error("missing API key")]
	InvalidApiKey,

	/// Base URL is missing or invalid.
	#[error("invalid base URL")]
	InvalidBaseUrl,

	/// HTTP request failed.
	#[error("HTTP request failed: {0}")]
	RequestFailed(#[from] reqwest::Error),

	/// Client has been shut down.
	#[error("client has been shut down")]
	ClientShutdown,

	/// Event validation failed.
	#[error("event validation failed: {0}")]
	ValidationFailed(String),

	/// Serialization error.
	#[error("serialization error: {0}")]
	SerializationError(#[from] serde_json::Error),

	/// Building a core record failed.
	#[error(transparent)]
	Core(#[from] CoreError),

	/// The key/value store could not be opened.
	#[error(transparent)]
	Storage(#[from] StorageError),

	/// Configuration could not be loaded.
	#[error(transparent)]
	Config(#[from] ConfigError),
}

/// Result type alias for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;

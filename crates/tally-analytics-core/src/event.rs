// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Event records queued on the client and uploaded in batches.
//!
//! Every record carries an [`EventId`] that is unique and increasing only
//! within its [`EventKind`]. Regular events and identify events draw from
//! independent counters, so ids must never be compared across kinds.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reserved event type for user-property mutation records.
pub const IDENTIFY_EVENT: &str = "$identify";

/// Event type used by revenue tracking.
pub const REVENUE_EVENT: &str = "revenue_amount";

/// Per-kind sequence number of a queued record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub u64);

impl EventId {
	/// Returns the id that follows this one.
	#[must_use]
	pub fn next(self) -> Self {
		Self(self.0 + 1)
	}
}

impl std::fmt::Display for EventId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::str::FromStr for EventId {
	type Err = std::num::ParseIntError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(s.trim().parse()?))
	}
}

impl From<u64> for EventId {
	fn from(value: u64) -> Self {
		Self(value)
	}
}

/// Which queue (and which id counter) a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
	/// Ordinary application events.
	Regular,
	/// `$identify` records carrying user-property operations.
	Identify,
}

impl EventKind {
	/// Classifies an event type.
	pub fn of(event_type: &str) -> Self {
		if event_type == IDENTIFY_EVENT {
			EventKind::Identify
		} else {
			EventKind::Regular
		}
	}
}

impl std::fmt::Display for EventKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			EventKind::Regular => write!(f, "regular"),
			EventKind::Identify => write!(f, "identify"),
		}
	}
}

/// SDK identification attached to every record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
	pub name: String,
	pub version: String,
}

impl Library {
	pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			version: version.into(),
		}
	}
}

/// A single queued telemetry record.
///
/// Records are immutable once created. The field names are part of the wire
/// format: the upload batch is the JSON array of these records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
	pub device_id: String,
	/// The user id, or the device id when no user is known.
	pub user_id: String,
	/// Milliseconds since the Unix epoch.
	pub timestamp: i64,
	pub event_id: EventId,
	/// Session start time in ms, or `-1` when no session is active.
	pub session_id: i64,
	pub event_type: String,
	#[serde(default)]
	pub version_name: Option<String>,
	pub platform: String,
	#[serde(default)]
	pub os_name: Option<String>,
	#[serde(default)]
	pub os_version: Option<String>,
	#[serde(default)]
	pub device_model: Option<String>,
	pub language: String,
	#[serde(default)]
	pub api_properties: serde_json::Value,
	#[serde(default)]
	pub event_properties: serde_json::Value,
	#[serde(default)]
	pub user_properties: serde_json::Value,
	pub uuid: Uuid,
	pub library: Library,
}

impl Event {
	/// Returns the queue this record belongs to.
	pub fn kind(&self) -> EventKind {
		EventKind::of(&self.event_type)
	}
}

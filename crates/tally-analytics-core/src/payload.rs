// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The form payload posted to the collector for one upload attempt.
//!
//! | Field | Description |
//! |-------|-------------|
//! | `client` | API key |
//! | `e` | JSON array of [`Event`] records |
//! | `v` | Protocol version ([`API_VERSION`]) |
//! | `upload_time` | Milliseconds since the Unix epoch at send time |
//! | `checksum` | Lowercase hex MD5 of `v + client + e + upload_time` |
//!
//! The checksum input is the plain string concatenation of the four values,
//! integers in decimal. The collector recomputes it byte for byte.

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::event::Event;

/// Upload protocol version.
pub const API_VERSION: u32 = 2;

/// Form fields of a single batch upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadPayload {
	pub client: String,
	pub e: String,
	pub v: u32,
	pub upload_time: i64,
	pub checksum: String,
}

impl UploadPayload {
	/// Serializes `events` and builds the payload around them.
	pub fn new(api_key: &str, events: &[Event], upload_time: i64) -> Result<Self> {
		let serialized = serde_json::to_string(events)?;
		Ok(Self::from_serialized(api_key, serialized, upload_time))
	}

	/// Builds the payload from an already serialized event batch.
	pub fn from_serialized(api_key: &str, events: String, upload_time: i64) -> Self {
		let checksum = checksum(API_VERSION, api_key, &events, upload_time);
		Self {
			client: api_key.to_string(),
			e: events,
			v: API_VERSION,
			upload_time,
			checksum,
		}
	}

	/// Returns true if `checksum` matches the other fields.
	pub fn verify(&self) -> bool {
		self.checksum == checksum(self.v, &self.client, &self.e, self.upload_time)
	}

	/// Parses the serialized batch back into records.
	pub fn events(&self) -> Result<Vec<Event>> {
		Ok(serde_json::from_str(&self.e)?)
	}
}

/// Computes the upload checksum over `version + api_key + events + upload_time`.
pub fn checksum(version: u32, api_key: &str, events: &str, upload_time: i64) -> String {
	let mut hasher = Md5::new();
	hasher.update(version.to_string().as_bytes());
	hasher.update(api_key.as_bytes());
	hasher.update(events.as_bytes());
	hasher.update(upload_time.to_string().as_bytes());
	hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn checksum_matches_known_digest() {
		assert_eq!(
			checksum(2, "tally_key", "[]", 1_700_000_000_000),
			"9fc324a853006a4b3704d904a0acca1c"
		);
		assert_eq!(
			checksum(2, "abc123", r#"[{"event_type":"click"}]"#, 1500),
			"d683e1112c5f813208507321af0e00bc"
		);
	}

	#[test]
	fn payload_uses_protocol_version() {
		let payload = UploadPayload::new("abc123", &[], 1500).unwrap();
		assert_eq!(payload.v, API_VERSION);
		assert_eq!(payload.e, "[]");
		assert_eq!(payload.client, "abc123");
		assert!(payload.verify());
	}

	#[test]
	fn tampered_payload_fails_verification() {
		let mut payload =
			UploadPayload::from_serialized("abc123", r#"[{"event_type":"click"}]"#.to_string(), 1500);
		assert!(payload.verify());

		payload.upload_time += 1;
		assert!(!payload.verify());
	}

	#[test]
	fn payload_form_encodes_all_fields() {
		let payload = UploadPayload::from_serialized("key", "[]".to_string(), 42);
		let json = serde_json::to_value(&payload).unwrap();
		for field in ["client", "e", "v", "upload_time", "checksum"] {
			assert!(json.get(field).is_some(), "missing field {field}");
		}
	}

	proptest! {
		#[test]
		fn checksum_is_lowercase_hex(
			key in "[a-zA-Z0-9_]{0,40}",
			events in ".{0,100}",
			upload_time in 0i64..4_000_000_000_000,
		) {
			let digest = checksum(API_VERSION, &key, &events, upload_time);
			prop_assert_eq!(digest.len(), 32);
			prop_assert!(digest.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
		}
	}
}

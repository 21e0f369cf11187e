// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The persisted identity of the tracked device and user.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Device id, user id, and opt-out flag, persisted as one record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
	#[serde(default)]
	pub device_id: String,
	#[serde(default)]
	pub user_id: Option<String>,
	#[serde(default)]
	pub opt_out: bool,
}

impl Identity {
	/// Resolves the identity at startup.
	///
	/// Explicit overrides win over persisted values. A device id is generated
	/// when neither source provides a non-empty one.
	pub fn resolve(
		persisted: Option<Identity>,
		device_id: Option<String>,
		user_id: Option<String>,
	) -> Self {
		let persisted = persisted.unwrap_or_default();

		let device_id = device_id
			.filter(|id| !id.is_empty())
			.or_else(|| Some(persisted.device_id).filter(|id| !id.is_empty()))
			.unwrap_or_else(|| Uuid::new_v4().to_string());

		let user_id = user_id
			.filter(|id| !id.is_empty())
			.or(persisted.user_id.filter(|id| !id.is_empty()));

		Self {
			device_id,
			user_id,
			opt_out: persisted.opt_out,
		}
	}

	/// The id reported as `user_id` on records: the user id, else the device id.
	pub fn effective_user_id(&self) -> &str {
		self.user_id.as_deref().unwrap_or(&self.device_id)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn resolve_generates_device_id_when_missing() {
		let identity = Identity::resolve(None, None, None);
		assert!(Uuid::parse_str(&identity.device_id).is_ok());
		assert!(identity.user_id.is_none());
		assert!(!identity.opt_out);
	}

	#[test]
	fn resolve_prefers_overrides() {
		let persisted = Identity {
			device_id: "stored-device".to_string(),
			user_id: Some("stored-user".to_string()),
			opt_out: true,
		};
		let identity = Identity::resolve(
			Some(persisted),
			Some("new-device".to_string()),
			Some("new-user".to_string()),
		);
		assert_eq!(identity.device_id, "new-device");
		assert_eq!(identity.user_id.as_deref(), Some("new-user"));
		assert!(identity.opt_out);
	}

	#[test]
	fn resolve_keeps_persisted_values() {
		let persisted = Identity {
			device_id: "stored-device".to_string(),
			user_id: Some("stored-user".to_string()),
			opt_out: false,
		};
		let identity = Identity::resolve(Some(persisted), Some(String::new()), None);
		assert_eq!(identity.device_id, "stored-device");
		assert_eq!(identity.user_id.as_deref(), Some("stored-user"));
	}

	#[test]
	fn effective_user_id_falls_back_to_device() {
		let mut identity = Identity {
			device_id: "device".to_string(),
			user_id: None,
			opt_out: false,
		};
		assert_eq!(identity.effective_user_id(), "device");

		identity.user_id = Some("user".to_string());
		assert_eq!(identity.effective_user_id(), "user");
	}

	#[test]
	fn partial_json_deserializes_with_defaults() {
		let identity: Identity = serde_json::from_str(r#"{"device_id":"d"}"#).unwrap();
		assert_eq!(identity.device_id, "d");
		assert!(identity.user_id.is_none());
		assert!(!identity.opt_out);
	}
}

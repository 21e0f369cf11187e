// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Inactivity-based session tracking.
//!
//! A session id is the millisecond timestamp at which the session started.
//! A new session begins when no session is known or when the gap since the
//! last recorded event exceeds the configured timeout. Both values are
//! persisted so a session can continue across a restart.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::store::{get_positive_int, set_best_effort, KeyValueStore};

pub const SESSION_ID_KEY: &str = "tally_session_id";
pub const LAST_EVENT_TIME_KEY: &str = "tally_last_event_time";

pub struct SessionTracker {
	session_id: Option<i64>,
	last_event_time: Option<i64>,
	timeout_ms: i64,
	store: Arc<dyn KeyValueStore>,
}

impl SessionTracker {
	/// Restores the session id and last event time from `store`.
	pub fn load(store: Arc<dyn KeyValueStore>, timeout: Duration) -> Self {
		let session_id = get_positive_int(store.as_ref(), SESSION_ID_KEY);
		let last_event_time = get_positive_int(store.as_ref(), LAST_EVENT_TIME_KEY);
		Self {
			session_id,
			last_event_time,
			timeout_ms: i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX),
			store,
		}
	}

	/// Records activity at `now`, starting a new session first if needed.
	///
	/// Returns true if a new session was started.
	pub fn touch(&mut self, now: i64) -> bool {
		let expired = match (self.session_id, self.last_event_time) {
			(Some(_), Some(last)) => now.saturating_sub(last) > self.timeout_ms,
			_ => true,
		};

		if expired {
			debug!(
				previous = ?self.session_id,
				session_id = now,
				"starting new session"
			);
			self.session_id = Some(now);
			set_best_effort(self.store.as_ref(), SESSION_ID_KEY, &now.to_string());
		}

		self.last_event_time = Some(now);
		set_best_effort(self.store.as_ref(), LAST_EVENT_TIME_KEY, &now.to_string());
		expired
	}

	pub fn session_id(&self) -> Option<i64> {
		self.session_id
	}

	pub fn last_event_time(&self) -> Option<i64> {
		self.last_event_time
	}
}

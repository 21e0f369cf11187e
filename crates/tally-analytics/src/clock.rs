// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wall-clock source for event timestamps, session gaps, and upload times.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::Utc;

/// Source of milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
	fn now_millis(&self) -> i64;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now_millis(&self) -> i64 {
		Utc::now().timestamp_millis()
	}
}

/// A clock that only moves when told to.
///
/// Useful for exercising session rotation without sleeping.
#[derive(Debug, Default)]
pub struct ManualClock {
	now: AtomicI64,
}

impl ManualClock {
	pub fn new(start_millis: i64) -> Self {
		Self {
			now: AtomicI64::new(start_millis),
		}
	}

	pub fn set(&self, millis: i64) {
		self.now.store(millis, Ordering::SeqCst);
	}

	pub fn advance(&self, by: Duration) {
		self.now.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
	}
}

impl Clock for ManualClock {
	fn now_millis(&self) -> i64 {
		self.now.load(Ordering::SeqCst)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn system_clock_is_after_2020() {
		assert!(SystemClock.now_millis() > 1_577_836_800_000);
	}

	#[test]
	fn manual_clock_advances() {
		let clock = ManualClock::new(1_000);
		clock.advance(Duration::from_millis(1_500));
		assert_eq!(clock.now_millis(), 2_500);

		clock.set(10);
		assert_eq!(clock.now_millis(), 10);
	}
}

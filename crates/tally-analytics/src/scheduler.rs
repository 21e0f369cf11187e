// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Decides when pending records should be uploaded.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::client::ClientInner;

/// What to do about the current backlog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadDecision {
	/// Nothing to upload.
	Idle,
	/// Upload now.
	Now,
	/// Upload after the delay.
	Deferred(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
	pub batch_events: bool,
	pub event_upload_threshold: usize,
	pub event_upload_period: Duration,
}

impl UploadPolicy {
	/// With batching off, any backlog uploads now. With batching on, a
	/// backlog at or above the threshold uploads now and a smaller one waits
	/// for the upload period.
	pub fn decide(&self, unsent: usize) -> UploadDecision {
		if unsent == 0 {
			UploadDecision::Idle
		} else if !self.batch_events || unsent >= self.event_upload_threshold {
			UploadDecision::Now
		} else {
			UploadDecision::Deferred(self.event_upload_period)
		}
	}
}

impl ClientInner {
	/// Applies the upload policy to a backlog of `unsent` records.
	///
	/// Arms a one-shot flush timer when the decision is deferred. Returns
	/// true when the caller should upload immediately.
	pub(crate) fn upload_due(self: &Arc<Self>, unsent: usize) -> bool {
		match self.policy.decide(unsent) {
			UploadDecision::Idle => false,
			UploadDecision::Now => true,
			UploadDecision::Deferred(delay) => {
				if self.closed.load(Ordering::SeqCst) {
					return false;
				}
				let Ok(handle) = Handle::try_current() else {
					warn!(unsent, "no tokio runtime, deferred upload not scheduled");
					return false;
				};
				debug!(unsent, delay_ms = delay.as_millis() as u64, "deferring upload");
				let inner = Arc::clone(self);
				handle.spawn(async move {
					tokio::time::sleep(delay).await;
					inner.flush_events().await;
				});
				false
			}
		}
	}
}

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The upload loop: one request in flight at a time, pruning on success and
//! halving the batch size when the collector reports the payload too large.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tally_analytics_core::{EventId, UploadPayload};
use tracing::{debug, error, warn};

use crate::client::ClientInner;
use crate::error::Result;
use crate::transport::TransportResponse;

/// Body the collector returns for an accepted batch.
pub const SUCCESS_BODY: &str = "success";

/// Status reported when the collector says the payload is too large.
pub const PAYLOAD_TOO_LARGE: u16 = 413;

const NO_REQUEST_SENT: &str = "No request sent";

/// Result of an upload attempt, as reported to callbacks and `flush`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
	/// Nothing was sent: no backlog, opted out, or another upload in flight.
	NotSent,
	/// The collector answered.
	Response { status: u16, body: String },
	/// The request failed before any answer arrived.
	Failed { message: String },
}

impl UploadOutcome {
	/// HTTP status, or 0 when there was no response.
	pub fn status(&self) -> u16 {
		match self {
			UploadOutcome::Response { status, .. } => *status,
			UploadOutcome::NotSent | UploadOutcome::Failed { .. } => 0,
		}
	}

	pub fn body(&self) -> &str {
		match self {
			UploadOutcome::NotSent => NO_REQUEST_SENT,
			UploadOutcome::Response { body, .. } => body,
			UploadOutcome::Failed { message } => message,
		}
	}

	pub fn is_success(&self) -> bool {
		matches!(self, UploadOutcome::Response { status: 200, body } if body == SUCCESS_BODY)
	}
}

impl From<TransportResponse> for UploadOutcome {
	fn from(response: TransportResponse) -> Self {
		UploadOutcome::Response {
			status: response.status,
			body: response.body,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResponseKind {
	Accepted,
	TooLarge,
	Rejected,
}

fn classify(response: &TransportResponse) -> ResponseKind {
	if response.status == 200 && response.body == SUCCESS_BODY {
		ResponseKind::Accepted
	} else if response.status == PAYLOAD_TOO_LARGE {
		ResponseKind::TooLarge
	} else {
		ResponseKind::Rejected
	}
}

/// Batch size to retry with after a batch of `num_events` was too large.
pub fn backoff_batch_size(num_events: usize) -> usize {
	num_events.div_ceil(2).max(1)
}

/// A composed batch with the sending flag held.
struct PendingUpload {
	payload: UploadPayload,
	num_events: usize,
	max_event_id: Option<EventId>,
	max_identify_id: Option<EventId>,
}

enum Next {
	/// Keep uploading; carries the outcome to report if no further batch goes out.
	Upload(UploadOutcome),
	Done(UploadOutcome),
}

impl ClientInner {
	/// Uploads pending records until the backlog no longer calls for an
	/// immediate upload, the collector rejects a batch, or the request fails.
	pub(crate) async fn flush_events(self: &Arc<Self>) -> UploadOutcome {
		let mut last = UploadOutcome::NotSent;
		loop {
			let Some(pending) = self.begin_upload().await else {
				return last;
			};

			let result = self
				.transport
				.send_batch(&self.upload_url, &pending.payload)
				.await;

			match self.complete_upload(pending, result).await {
				Next::Upload(outcome) => last = outcome,
				Next::Done(outcome) => return outcome,
			}
		}
	}

	/// Claims the sending flag and composes the next batch.
	async fn begin_upload(&self) -> Option<PendingUpload> {
		let state = self.state.lock().await;
		if state.identity.opt_out || state.buffer.is_empty() {
			return None;
		}
		if self
			.sending
			.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
			.is_err()
		{
			debug!("upload already in flight");
			return None;
		}

		let batch = state.buffer.compose(state.upload_batch_size);
		let upload_time = self.clock.now_millis();
		match UploadPayload::new(&self.api_key, &batch.events, upload_time) {
			Ok(payload) => {
				debug!(
					count = batch.len(),
					max_event_id = ?batch.max_event_id,
					max_identify_id = ?batch.max_identify_id,
					"uploading batch"
				);
				Some(PendingUpload {
					payload,
					num_events: batch.len(),
					max_event_id: batch.max_event_id,
					max_identify_id: batch.max_identify_id,
				})
			}
			Err(e) => {
				self.sending.store(false, Ordering::SeqCst);
				error!(error = %e, "failed to serialize upload batch");
				None
			}
		}
	}

	/// Applies the collector's answer to the queues.
	///
	/// The sending flag is released only while the state lock is held, so the
	/// next upload always composes from pruned queues and the current batch
	/// size.
	async fn complete_upload(
		self: &Arc<Self>,
		pending: PendingUpload,
		result: Result<TransportResponse>,
	) -> Next {
		let mut state = self.state.lock().await;
		self.sending.store(false, Ordering::SeqCst);

		let response = match result {
			Ok(response) => response,
			Err(e) => {
				warn!(error = %e, "upload request failed");
				return Next::Done(UploadOutcome::Failed {
					message: e.to_string(),
				});
			}
		};

		match classify(&response) {
			ResponseKind::Accepted => {
				state
					.buffer
					.remove_through(pending.max_event_id, pending.max_identify_id);
				if self.save_events {
					state.buffer.persist();
				}
				let unsent = state.buffer.unsent_count();
				drop(state);
				debug!(count = pending.num_events, remaining = unsent, "upload accepted");

				if self.upload_due(unsent) {
					Next::Upload(response.into())
				} else {
					Next::Done(response.into())
				}
			}
			ResponseKind::TooLarge => {
				if state.upload_batch_size == 1 {
					warn!(
						max_event_id = ?pending.max_event_id,
						max_identify_id = ?pending.max_identify_id,
						"dropping single record rejected as too large"
					);
					state
						.buffer
						.remove_through(pending.max_event_id, pending.max_identify_id);
					if self.save_events {
						state.buffer.persist();
					}
				}
				state.upload_batch_size = backoff_batch_size(pending.num_events);
				warn!(
					num_events = pending.num_events,
					upload_batch_size = state.upload_batch_size,
					"payload too large, reducing batch size"
				);
				Next::Upload(response.into())
			}
			ResponseKind::Rejected => {
				warn!(
					status = response.status,
					body = %response.body,
					"collector rejected upload"
				);
				Next::Done(response.into())
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn classify_requires_success_body() {
		assert_eq!(
			classify(&TransportResponse::new(200, "success")),
			ResponseKind::Accepted
		);
		assert_eq!(
			classify(&TransportResponse::new(200, "invalid_checksum")),
			ResponseKind::Rejected
		);
		assert_eq!(
			classify(&TransportResponse::new(413, "")),
			ResponseKind::TooLarge
		);
		assert_eq!(
			classify(&TransportResponse::new(500, "success")),
			ResponseKind::Rejected
		);
	}

	#[test]
	fn backoff_halves_rounding_up() {
		assert_eq!(backoff_batch_size(8), 4);
		assert_eq!(backoff_batch_size(5), 3);
		assert_eq!(backoff_batch_size(2), 1);
		assert_eq!(backoff_batch_size(1), 1);
		assert_eq!(backoff_batch_size(0), 1);
	}

	#[test]
	fn outcome_status_and_body() {
		assert_eq!(UploadOutcome::NotSent.status(), 0);
		assert_eq!(UploadOutcome::NotSent.body(), "No request sent");

		let failed = UploadOutcome::Failed {
			message: "connection refused".to_string(),
		};
		assert_eq!(failed.status(), 0);
		assert_eq!(failed.body(), "connection refused");

		let ok: UploadOutcome = TransportResponse::new(200, "success").into();
		assert_eq!(ok.status(), 200);
		assert!(ok.is_success());
		assert!(!UploadOutcome::from(TransportResponse::new(200, "nope")).is_success());
	}

	proptest! {
		#[test]
		fn backoff_never_grows_and_stays_positive(n in 0usize..100_000) {
			let next = backoff_batch_size(n);
			prop_assert!(next >= 1);
			prop_assert!(next <= n.max(1));
		}
	}
}

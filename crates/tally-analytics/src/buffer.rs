// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The two bounded queues of unsent records and their id counters.
//!
//! Regular events and identify records are queued separately, each ordered
//! by id and by timestamp. A queue never holds more than `saved_max_count`
//! records; beyond that the oldest record is evicted and counted as dropped.

use std::collections::VecDeque;
use std::sync::Arc;

use tally_analytics_core::{Event, EventId, EventKind};
use tracing::{debug, warn};

use crate::batch::{compose_batch, Batch};
use crate::store::{get_positive_int, set_best_effort, KeyValueStore};

pub const LAST_EVENT_ID_KEY: &str = "tally_last_event_id";
pub const LAST_IDENTIFY_ID_KEY: &str = "tally_last_identify_id";

/// Storage keys under which the queues are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueKeys {
	pub unsent: String,
	pub unsent_identify: String,
}

pub struct EventBuffer {
	events: VecDeque<Event>,
	identifies: VecDeque<Event>,
	last_event_id: EventId,
	last_identify_id: EventId,
	saved_max_count: usize,
	dropped: u64,
	keys: QueueKeys,
	store: Arc<dyn KeyValueStore>,
}

impl EventBuffer {
	/// Restores counters and, if `load_queues`, both queues from `store`.
	///
	/// A queue that fails to parse is discarded. Counters are raised to at
	/// least the highest id found in their restored queue.
	pub fn hydrate(
		store: Arc<dyn KeyValueStore>,
		keys: QueueKeys,
		saved_max_count: usize,
		load_queues: bool,
	) -> Self {
		let (events, identifies) = if load_queues {
			(
				load_queue(store.as_ref(), &keys.unsent),
				load_queue(store.as_ref(), &keys.unsent_identify),
			)
		} else {
			(VecDeque::new(), VecDeque::new())
		};

		let last_event_id = restore_counter(store.as_ref(), LAST_EVENT_ID_KEY, &events);
		let last_identify_id = restore_counter(store.as_ref(), LAST_IDENTIFY_ID_KEY, &identifies);

		let mut buffer = Self {
			events,
			identifies,
			last_event_id,
			last_identify_id,
			saved_max_count: saved_max_count.max(1),
			dropped: 0,
			keys,
			store,
		};
		buffer.enforce_bound(EventKind::Regular);
		buffer.enforce_bound(EventKind::Identify);

		debug!(
			events = buffer.events.len(),
			identifies = buffer.identifies.len(),
			last_event_id = %buffer.last_event_id,
			last_identify_id = %buffer.last_identify_id,
			"hydrated event buffer"
		);
		buffer
	}

	/// Allocates the next id for `kind` and persists the counter.
	pub fn next_event_id(&mut self, kind: EventKind) -> EventId {
		let (counter, key) = match kind {
			EventKind::Regular => (&mut self.last_event_id, LAST_EVENT_ID_KEY),
			EventKind::Identify => (&mut self.last_identify_id, LAST_IDENTIFY_ID_KEY),
		};
		*counter = counter.next();
		let id = *counter;
		set_best_effort(self.store.as_ref(), key, &id.to_string());
		id
	}

	/// Appends a record to its queue, evicting the oldest records beyond the
	/// bound. Returns the number evicted.
	pub fn push(&mut self, event: Event) -> usize {
		let kind = event.kind();
		self.queue_mut(kind).push_back(event);
		self.enforce_bound(kind)
	}

	/// Builds the next batch from the queue heads without removing anything.
	pub fn compose(&self, max_count: usize) -> Batch {
		compose_batch(&self.events, &self.identifies, max_count)
	}

	/// Removes every record whose id is at or below the given maximum for its
	/// queue. `None` leaves that queue untouched.
	pub fn remove_through(
		&mut self,
		max_event_id: Option<EventId>,
		max_identify_id: Option<EventId>,
	) {
		if let Some(max) = max_event_id {
			self.events.retain(|e| e.event_id > max);
		}
		if let Some(max) = max_identify_id {
			self.identifies.retain(|e| e.event_id > max);
		}
	}

	/// Writes both queues to the store.
	pub fn persist(&self) {
		self.persist_queue(EventKind::Regular);
		self.persist_queue(EventKind::Identify);
	}

	pub fn queue(&self, kind: EventKind) -> &VecDeque<Event> {
		match kind {
			EventKind::Regular => &self.events,
			EventKind::Identify => &self.identifies,
		}
	}

	pub fn unsent_count(&self) -> usize {
		self.events.len() + self.identifies.len()
	}

	pub fn is_empty(&self) -> bool {
		self.unsent_count() == 0
	}

	/// Records evicted by the queue bound since this buffer was created.
	pub fn dropped(&self) -> u64 {
		self.dropped
	}

	pub fn last_id(&self, kind: EventKind) -> EventId {
		match kind {
			EventKind::Regular => self.last_event_id,
			EventKind::Identify => self.last_identify_id,
		}
	}

	fn queue_mut(&mut self, kind: EventKind) -> &mut VecDeque<Event> {
		match kind {
			EventKind::Regular => &mut self.events,
			EventKind::Identify => &mut self.identifies,
		}
	}

	fn enforce_bound(&mut self, kind: EventKind) -> usize {
		let max = self.saved_max_count;
		let queue = self.queue_mut(kind);
		let mut evicted = 0;
		while queue.len() > max {
			if let Some(oldest) = queue.pop_front() {
				warn!(
					kind = %kind,
					event_type = %oldest.event_type,
					event_id = %oldest.event_id,
					"dropped event due to queue overflow"
				);
				evicted += 1;
			}
		}
		self.dropped += evicted as u64;
		evicted
	}

	fn persist_queue(&self, kind: EventKind) {
		let key = match kind {
			EventKind::Regular => &self.keys.unsent,
			EventKind::Identify => &self.keys.unsent_identify,
		};
		match serde_json::to_string(self.queue(kind)) {
			Ok(json) => set_best_effort(self.store.as_ref(), key, &json),
			Err(e) => debug!(key = %key, error = %e, "failed to serialize queue"),
		}
	}
}

fn load_queue(store: &dyn KeyValueStore, key: &str) -> VecDeque<Event> {
	let raw = match store.get(key) {
		Ok(Some(raw)) => raw,
		Ok(None) => return VecDeque::new(),
		Err(e) => {
			debug!(key, error = %e, "failed to read saved queue");
			return VecDeque::new();
		}
	};
	match serde_json::from_str(&raw) {
		Ok(queue) => queue,
		Err(e) => {
			debug!(key, error = %e, "discarding unreadable saved queue");
			VecDeque::new()
		}
	}
}

fn restore_counter(store: &dyn KeyValueStore, key: &str, queue: &VecDeque<Event>) -> EventId {
	let persisted = get_positive_int(store, key)
		.and_then(|v| u64::try_from(v).ok())
		.map(EventId)
		.unwrap_or(EventId(0));
	let highest_queued = queue.iter().map(|e| e.event_id).max().unwrap_or(EventId(0));
	persisted.max(highest_queued)
}

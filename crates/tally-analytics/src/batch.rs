// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Composition of one upload batch from the two pending queues.
//!
//! Both queues are individually ordered by timestamp. The batch is a merge
//! of their heads in timestamp order, taking the identify record when the
//! timestamps tie. Records are only read here; the queues are pruned after
//! the collector accepts the batch, using the highest id taken from each.

use std::collections::VecDeque;

use tally_analytics_core::{Event, EventId};

/// One upload's worth of records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
	pub events: Vec<Event>,
	/// Highest regular-event id in the batch.
	pub max_event_id: Option<EventId>,
	/// Highest identify id in the batch.
	pub max_identify_id: Option<EventId>,
}

impl Batch {
	pub fn len(&self) -> usize {
		self.events.len()
	}

	pub fn is_empty(&self) -> bool {
		self.events.is_empty()
	}
}

/// Takes up to `max_count` records from the heads of `events` and
/// `identifies`, oldest first.
pub fn compose_batch(
	events: &VecDeque<Event>,
	identifies: &VecDeque<Event>,
	max_count: usize,
) -> Batch {
	let mut batch = Batch {
		events: Vec::with_capacity(max_count.min(events.len() + identifies.len())),
		..Batch::default()
	};
	let mut events = events.iter().peekable();
	let mut identifies = identifies.iter().peekable();

	while batch.events.len() < max_count {
		let take_identify = match (events.peek(), identifies.peek()) {
			(None, None) => break,
			(Some(_), None) => false,
			(None, Some(_)) => true,
			(Some(event), Some(identify)) => identify.timestamp <= event.timestamp,
		};

		let next = if take_identify {
			identifies.next()
		} else {
			events.next()
		};
		let Some(record) = next else { break };

		let max = if take_identify {
			&mut batch.max_identify_id
		} else {
			&mut batch.max_event_id
		};
		*max = (*max).max(Some(record.event_id));
		batch.events.push(record.clone());
	}

	batch
}

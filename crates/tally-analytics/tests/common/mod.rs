// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tally_analytics::{
	AnalyticsClient, AnalyticsClientBuilder, Event, ManualClock, MemoryStore, Result, Transport,
	TransportResponse, UploadPayload,
};
use tokio::sync::Notify;

pub const START_MS: i64 = 1_700_000_000_000;

/// Answers uploads from a script, then with "200 success" once it runs out.
#[derive(Default)]
pub struct ScriptedTransport {
	responses: Mutex<VecDeque<TransportResponse>>,
	requests: Mutex<Vec<UploadPayload>>,
}

impl ScriptedTransport {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn respond(&self, status: u16, body: &str) {
		self
			.responses
			.lock()
			.unwrap()
			.push_back(TransportResponse::new(status, body));
	}

	pub fn requests(&self) -> Vec<UploadPayload> {
		self.requests.lock().unwrap().clone()
	}

	pub fn batches(&self) -> Vec<Vec<Event>> {
		self
			.requests()
			.iter()
			.map(|payload| payload.events().unwrap())
			.collect()
	}

	pub fn batch_sizes(&self) -> Vec<usize> {
		self.batches().iter().map(Vec::len).collect()
	}
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
	async fn send_batch(&self, _url: &str, payload: &UploadPayload) -> Result<TransportResponse> {
		self.requests.lock().unwrap().push(payload.clone());
		let scripted = self.responses.lock().unwrap().pop_front();
		Ok(scripted.unwrap_or_else(|| TransportResponse::new(200, "success")))
	}
}

/// Blocks every upload until released.
#[derive(Default)]
pub struct GatedTransport {
	pub entered: Notify,
	pub release: Notify,
	pub calls: Mutex<usize>,
}

#[async_trait::async_trait]
impl Transport for GatedTransport {
	async fn send_batch(&self, _url: &str, _payload: &UploadPayload) -> Result<TransportResponse> {
		*self.calls.lock().unwrap() += 1;
		self.entered.notify_one();
		self.release.notified().await;
		Ok(TransportResponse::new(200, "success"))
	}
}

pub struct Harness {
	pub store: Arc<MemoryStore>,
	pub clock: Arc<ManualClock>,
	pub transport: Arc<ScriptedTransport>,
}

impl Harness {
	pub fn new() -> Self {
		Self {
			store: Arc::new(MemoryStore::new()),
			clock: Arc::new(ManualClock::new(START_MS)),
			transport: ScriptedTransport::new(),
		}
	}

	/// Batching on with a threshold and period that never trigger on their own.
	pub fn builder(&self) -> AnalyticsClientBuilder {
		AnalyticsClient::builder()
			.api_key("abc123")
			.base_url("https://collector.example.com")
			.store(self.store.clone())
			.clock(self.clock.clone())
			.transport(self.transport.clone())
			.batch_events(true)
			.event_upload_threshold(1_000)
			.event_upload_period(Duration::from_secs(3600))
	}

	pub fn client(&self) -> AnalyticsClient {
		self.builder().build().unwrap()
	}
}

/// Polls `condition` until it holds or about two seconds pass.
pub async fn eventually<F: Fn() -> bool>(condition: F) -> bool {
	for _ in 0..200 {
		if condition() {
			return true;
		}
		tokio::time::sleep(Duration::from_millis(10)).await;
	}
	condition()
}

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Analytics client for recording events and uploading them to a collector.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map, Value};
use tally_analytics_core::{
	truncate_value, Event, EventId, EventKind, Identity, Library, IDENTIFY_EVENT,
	MAX_STRING_LENGTH, REVENUE_EVENT,
};
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::buffer::{EventBuffer, QueueKeys};
use crate::clock::{Clock, SystemClock};
use crate::config::{AnalyticsConfigLayer, AnalyticsConfig};
use crate::delivery::UploadOutcome;
use crate::error::{AnalyticsError, Result};
use crate::properties::Properties;
use crate::scheduler::UploadPolicy;
use crate::session::SessionTracker;
use crate::store::{set_best_effort, FileStore, KeyValueStore, MemoryStore};
use crate::transport::{HttpTransport, Transport};

/// SDK name reported in every record.
const SDK_NAME: &str = "tally-rust";
/// SDK version reported in every record.
const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Invoked once with the outcome of the upload a record triggered.
pub type UploadCallback = Box<dyn FnOnce(UploadOutcome) + Send + 'static>;

/// Why a record was not queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
	EmptyEventType,
	OptedOut,
}

/// Result of logging a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutcome {
	Queued { event_id: EventId, kind: EventKind },
	Skipped(SkipReason),
}

impl LogOutcome {
	/// The id assigned to the record, if it was queued.
	pub fn event_id(&self) -> Option<EventId> {
		match self {
			LogOutcome::Queued { event_id, .. } => Some(*event_id),
			LogOutcome::Skipped(_) => None,
		}
	}

	pub fn is_queued(&self) -> bool {
		matches!(self, LogOutcome::Queued { .. })
	}
}

/// Operating system and hardware attached to every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
	pub os_name: Option<String>,
	pub os_version: Option<String>,
	pub device_model: Option<String>,
}

impl DeviceInfo {
	/// Fills in what the standard library can tell about the host.
	pub fn detect() -> Self {
		Self {
			os_name: Some(std::env::consts::OS.to_string()),
			os_version: None,
			device_model: Some(std::env::consts::ARCH.to_string()),
		}
	}
}

/// Builder for constructing an [`AnalyticsClient`].
pub struct AnalyticsClientBuilder {
	layer: AnalyticsConfigLayer,
	store: Option<Arc<dyn KeyValueStore>>,
	transport: Option<Arc<dyn Transport>>,
	clock: Option<Arc<dyn Clock>>,
	device: DeviceInfo,
	context_properties: Properties,
	version_name: Option<String>,
}

impl AnalyticsClientBuilder {
	pub fn new() -> Self {
		Self {
			layer: AnalyticsConfigLayer::default(),
			store: None,
			transport: None,
			clock: None,
			device: DeviceInfo::detect(),
			context_properties: Properties::new(),
			version_name: None,
		}
	}

	/// Merges a configuration layer, e.g. one from [`crate::load_layer`].
	/// Values set in `layer` override earlier ones.
	pub fn config(mut self, layer: AnalyticsConfigLayer) -> Self {
		self.layer.merge(layer);
		self
	}

	/// Sets the API key sent as the `client` field of every upload.
	pub fn api_key(mut self, key: impl Into<String>) -> Self {
		self.layer.api_key = Some(key.into());
		self
	}

	/// Sets the collector base URL.
	///
	/// Example: `https://collector.example.com`
	pub fn base_url(mut self, url: impl Into<String>) -> Self {
		self.layer.base_url = Some(url.into());
		self
	}

	/// Persist the queues after every change and restore them at startup.
	pub fn save_events(mut self, enabled: bool) -> Self {
		self.layer.save_events = Some(enabled);
		self
	}

	pub fn saved_max_count(mut self, max: usize) -> Self {
		self.layer.saved_max_count = Some(max);
		self
	}

	pub fn session_timeout(mut self, timeout: Duration) -> Self {
		self.layer.session_timeout_ms = Some(whole_millis(timeout));
		self
	}

	pub fn upload_batch_size(mut self, size: usize) -> Self {
		self.layer.upload_batch_size = Some(size);
		self
	}

	/// Enables threshold/period batching instead of uploading per record.
	pub fn batch_events(mut self, enabled: bool) -> Self {
		self.layer.batch_events = Some(enabled);
		self
	}

	pub fn event_upload_threshold(mut self, threshold: usize) -> Self {
		self.layer.event_upload_threshold = Some(threshold);
		self
	}

	pub fn event_upload_period(mut self, period: Duration) -> Self {
		self.layer.event_upload_period_ms = Some(whole_millis(period));
		self
	}

	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.layer.request_timeout_ms = Some(whole_millis(timeout));
		self
	}

	pub fn platform(mut self, platform: impl Into<String>) -> Self {
		self.layer.platform = Some(platform.into());
		self
	}

	pub fn language(mut self, language: impl Into<String>) -> Self {
		self.layer.language = Some(language.into());
		self
	}

	/// Overrides the persisted device id.
	pub fn device_id(mut self, device_id: impl Into<String>) -> Self {
		self.layer.device_id = Some(device_id.into());
		self
	}

	/// Overrides the persisted user id.
	pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
		self.layer.user_id = Some(user_id.into());
		self
	}

	pub fn version_name(mut self, version: impl Into<String>) -> Self {
		self.version_name = Some(version.into());
		self
	}

	pub fn device_info(mut self, device: DeviceInfo) -> Self {
		self.device = device;
		self
	}

	/// Properties merged into the user properties of every record, such as
	/// campaign parameters. Keys set on the record itself win.
	pub fn context_properties(mut self, properties: Properties) -> Self {
		self.context_properties = properties;
		self
	}

	/// Persists to the platform data directory instead of memory.
	///
	/// See [`FileStore::default_location`]. Keeps the in-memory store when the
	/// platform has no data directory.
	pub fn data_dir_storage(mut self) -> Self {
		match FileStore::default_location() {
			Some(dir) => self.layer.storage_dir = Some(dir),
			None => warn!("no platform data directory, events stay in memory"),
		}
		self
	}

	/// Uses `store` for persistence instead of the configured default.
	pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
		self.store = Some(store);
		self
	}

	pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
		self.transport = Some(transport);
		self
	}

	pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = Some(clock);
		self
	}

	/// Builds the client.
	///
	/// Restores identity, queues, and session from the store, then uploads
	/// any restored backlog the upload policy calls for. Uploads are spawned
	/// on the current Tokio runtime.
	pub fn build(self) -> Result<AnalyticsClient> {
		let config = self.layer.finalize();
		let api_key = config.api_key.clone().ok_or(AnalyticsError::InvalidApiKey)?;
		let upload_url = upload_url(config.base_url.as_deref())?;

		let transport: Arc<dyn Transport> = match self.transport {
			Some(transport) => transport,
			None => Arc::new(HttpTransport::new(config.request_timeout())?),
		};
		let store = match self.store {
			Some(store) => store,
			None => default_store(&config)?,
		};
		let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

		let persisted = load_identity(store.as_ref(), &config.identity_key);
		let identity = Identity::resolve(persisted, config.device_id.clone(), config.user_id.clone());
		persist_identity(store.as_ref(), &config.identity_key, &identity);

		let buffer = EventBuffer::hydrate(
			Arc::clone(&store),
			QueueKeys {
				unsent: config.unsent_key.clone(),
				unsent_identify: config.unsent_identify_key.clone(),
			},
			config.saved_max_count,
			config.save_events,
		);
		let unsent = buffer.unsent_count();

		let mut session = SessionTracker::load(Arc::clone(&store), config.session_timeout());
		let new_session = session.touch(clock.now_millis());

		let inner = Arc::new(ClientInner {
			api_key,
			upload_url: upload_url.clone(),
			save_events: config.save_events,
			policy: UploadPolicy {
				batch_events: config.batch_events,
				event_upload_threshold: config.event_upload_threshold,
				event_upload_period: config.event_upload_period(),
			},
			identity_key: config.identity_key.clone(),
			platform: config.platform.clone(),
			language: config.language.clone(),
			device: self.device,
			library: Library::new(SDK_NAME, SDK_VERSION),
			context_properties: self.context_properties,
			new_session,
			state: Mutex::new(EngineState {
				buffer,
				session,
				identity,
				upload_batch_size: config.upload_batch_size,
				version_name: self.version_name,
			}),
			sending: AtomicBool::new(false),
			closed: AtomicBool::new(false),
			store,
			transport,
			clock,
		});

		info!(
			upload_url = %upload_url,
			unsent,
			new_session,
			"analytics client initialized"
		);

		if inner.upload_due(unsent) {
			inner.spawn_flush(None);
		}

		Ok(AnalyticsClient { inner })
	}
}

impl Default for AnalyticsClientBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// Milliseconds in `duration`, rounded up so a non-zero duration never
/// becomes zero, saturating at `u64::MAX`.
fn whole_millis(duration: Duration) -> u64 {
	let millis = duration.as_nanos().div_ceil(1_000_000);
	u64::try_from(millis).unwrap_or(u64::MAX)
}

fn upload_url(base_url: Option<&str>) -> Result<String> {
	let base_url = base_url.ok_or(AnalyticsError::InvalidBaseUrl)?;
	let base_url = base_url.trim_end_matches('/');
	let parsed = reqwest::Url::parse(base_url).map_err(|_| AnalyticsError::InvalidBaseUrl)?;
	if !matches!(parsed.scheme(), "http" | "https") {
		return Err(AnalyticsError::InvalidBaseUrl);
	}
	Ok(format!("{base_url}/"))
}

fn default_store(config: &AnalyticsConfig) -> Result<Arc<dyn KeyValueStore>> {
	match &config.storage_dir {
		Some(dir) => Ok(Arc::new(FileStore::new(dir)?)),
		None => Ok(Arc::new(MemoryStore::new())),
	}
}

fn load_identity(store: &dyn KeyValueStore, key: &str) -> Option<Identity> {
	match store.get(key) {
		Ok(Some(raw)) => match serde_json::from_str(&raw) {
			Ok(identity) => Some(identity),
			Err(e) => {
				debug!(key, error = %e, "discarding unreadable identity");
				None
			}
		},
		Ok(None) => None,
		Err(e) => {
			debug!(key, error = %e, "failed to read identity");
			None
		}
	}
}

fn persist_identity(store: &dyn KeyValueStore, key: &str, identity: &Identity) {
	match serde_json::to_string(identity) {
		Ok(json) => set_best_effort(store, key, &json),
		Err(e) => debug!(error = %e, "failed to serialize identity"),
	}
}

/// Mutable engine state, guarded by one lock.
pub(crate) struct EngineState {
	pub(crate) buffer: EventBuffer,
	pub(crate) session: SessionTracker,
	pub(crate) identity: Identity,
	pub(crate) upload_batch_size: usize,
	pub(crate) version_name: Option<String>,
}

pub(crate) struct ClientInner {
	pub(crate) api_key: String,
	pub(crate) upload_url: String,
	pub(crate) save_events: bool,
	pub(crate) policy: UploadPolicy,
	identity_key: String,
	platform: String,
	language: String,
	device: DeviceInfo,
	library: Library,
	context_properties: Properties,
	new_session: bool,
	pub(crate) state: Mutex<EngineState>,
	/// Held while an upload request is in flight.
	pub(crate) sending: AtomicBool,
	pub(crate) closed: AtomicBool,
	store: Arc<dyn KeyValueStore>,
	pub(crate) transport: Arc<dyn Transport>,
	pub(crate) clock: Arc<dyn Clock>,
}

impl ClientInner {
	/// Builds a record, queues it, and returns the new backlog size.
	async fn record_event(
		&self,
		event_type: &str,
		api_properties: Value,
		event_properties: Value,
		user_properties: Value,
	) -> Result<(LogOutcome, usize)> {
		if self.closed.load(Ordering::SeqCst) {
			return Err(AnalyticsError::ClientShutdown);
		}
		if event_type.is_empty() {
			debug!("ignoring event with empty type");
			return Ok((LogOutcome::Skipped(SkipReason::EmptyEventType), 0));
		}

		let mut state = self.state.lock().await;
		if state.identity.opt_out {
			debug!(event_type, "opted out, event not recorded");
			return Ok((
				LogOutcome::Skipped(SkipReason::OptedOut),
				state.buffer.unsent_count(),
			));
		}

		let kind = EventKind::of(event_type);
		let event_id = state.buffer.next_event_id(kind);

		// Timestamps never run backwards within a process.
		let floor = state.session.last_event_time().unwrap_or(i64::MIN);
		let timestamp = self.clock.now_millis().max(floor);
		state.session.touch(timestamp);

		let user_properties = Properties::from(user_properties)
			.with_defaults(&self.context_properties)
			.into_value();

		let event = Event {
			device_id: state.identity.device_id.clone(),
			user_id: state.identity.effective_user_id().to_string(),
			timestamp,
			event_id,
			session_id: state.session.session_id().unwrap_or(-1),
			event_type: event_type.to_string(),
			version_name: state.version_name.clone(),
			platform: self.platform.clone(),
			os_name: self.device.os_name.clone(),
			os_version: self.device.os_version.clone(),
			device_model: self.device.device_model.clone(),
			language: self.language.clone(),
			api_properties,
			event_properties: truncate_value(event_properties, MAX_STRING_LENGTH),
			user_properties: truncate_value(user_properties, MAX_STRING_LENGTH),
			uuid: Uuid::new_v4(),
			library: self.library.clone(),
		};

		state.buffer.push(event);
		if self.save_events {
			state.buffer.persist();
		}
		let unsent = state.buffer.unsent_count();

		debug!(event_type, event_id = %event_id, kind = %kind, unsent, "queued event");
		Ok((LogOutcome::Queued { event_id, kind }, unsent))
	}

	/// Runs the upload loop in the background and reports to `callback`.
	pub(crate) fn spawn_flush(self: &Arc<Self>, callback: Option<UploadCallback>) {
		let Ok(handle) = Handle::try_current() else {
			warn!("no tokio runtime, upload not started");
			if let Some(callback) = callback {
				callback(UploadOutcome::NotSent);
			}
			return;
		};
		let inner = Arc::clone(self);
		handle.spawn(async move {
			let outcome = inner.flush_events().await;
			if let Some(callback) = callback {
				callback(outcome);
			}
		});
	}

	async fn update_identity<F>(&self, update: F)
	where
		F: FnOnce(&mut Identity),
	{
		let mut state = self.state.lock().await;
		update(&mut state.identity);
		persist_identity(self.store.as_ref(), &self.identity_key, &state.identity);
	}
}

/// Client for recording telemetry and uploading it in batches.
///
/// Cloning is cheap; clones share the same queues and upload state.
#[derive(Clone)]
pub struct AnalyticsClient {
	inner: Arc<ClientInner>,
}

impl AnalyticsClient {
	pub fn builder() -> AnalyticsClientBuilder {
		AnalyticsClientBuilder::new()
	}

	/// Records an event.
	///
	/// # Example
	///
	/// ```ignore
	/// client
	///     .log_event("checkout_started", Properties::new().insert("items", 3))
	///     .await?;
	/// ```
	pub async fn log_event(&self, event_type: &str, properties: Properties) -> Result<LogOutcome> {
		self
			.log(
				event_type,
				empty_object(),
				properties.into_value(),
				Value::Null,
				None,
			)
			.await
	}

	/// Records an event and reports the outcome of the upload it triggers.
	///
	/// `callback` receives [`UploadOutcome::NotSent`] when the record was
	/// skipped or did not trigger an immediate upload.
	pub async fn log_event_with_callback<F>(
		&self,
		event_type: &str,
		properties: Properties,
		callback: F,
	) -> Result<LogOutcome>
	where
		F: FnOnce(UploadOutcome) + Send + 'static,
	{
		self
			.log(
				event_type,
				empty_object(),
				properties.into_value(),
				Value::Null,
				Some(Box::new(callback)),
			)
			.await
	}

	/// Records a `$identify` record carrying user-property operations.
	pub async fn identify(&self, operations: Properties) -> Result<LogOutcome> {
		self
			.log(
				IDENTIFY_EVENT,
				empty_object(),
				empty_object(),
				operations.into_value(),
				None,
			)
			.await
	}

	/// Sets user properties via a `$set` identify record.
	pub async fn set_user_properties(&self, properties: Properties) -> Result<LogOutcome> {
		self.identify(properties.into_set_operation()).await
	}

	/// Records a purchase. `quantity` defaults to 1.
	pub async fn log_revenue(
		&self,
		price: f64,
		quantity: Option<u32>,
		product_id: Option<&str>,
	) -> Result<LogOutcome> {
		if !price.is_finite() {
			return Err(AnalyticsError::ValidationFailed(format!(
				"revenue price must be finite, got {price}"
			)));
		}

		let api_properties = json!({
			"productId": product_id,
			"special": REVENUE_EVENT,
			"quantity": quantity.unwrap_or(1),
			"price": price,
		});
		self
			.log(REVENUE_EVENT, api_properties, empty_object(), Value::Null, None)
			.await
	}

	async fn log(
		&self,
		event_type: &str,
		api_properties: Value,
		event_properties: Value,
		user_properties: Value,
		callback: Option<UploadCallback>,
	) -> Result<LogOutcome> {
		let result = self
			.inner
			.record_event(event_type, api_properties, event_properties, user_properties)
			.await;

		let upload_now = match &result {
			Ok((LogOutcome::Queued { .. }, unsent)) => self.inner.upload_due(*unsent),
			_ => false,
		};
		if upload_now {
			self.inner.spawn_flush(callback);
		} else if let Some(callback) = callback {
			callback(UploadOutcome::NotSent);
		}

		result.map(|(outcome, _)| outcome)
	}

	/// Uploads pending records now and returns the last upload's outcome.
	pub async fn flush(&self) -> UploadOutcome {
		self.inner.flush_events().await
	}

	/// Sets or clears the user id. Empty strings clear it.
	pub async fn set_user_id(&self, user_id: Option<&str>) {
		let user_id = user_id.filter(|id| !id.is_empty()).map(str::to_string);
		self
			.inner
			.update_identity(|identity| identity.user_id = user_id)
			.await;
	}

	/// Replaces the device id. Empty strings are ignored.
	pub async fn set_device_id(&self, device_id: &str) {
		if device_id.is_empty() {
			return;
		}
		self
			.inner
			.update_identity(|identity| identity.device_id = device_id.to_string())
			.await;
	}

	/// While opted out, nothing is recorded or uploaded.
	pub async fn set_opt_out(&self, opt_out: bool) {
		info!(opt_out, "analytics opt-out changed");
		self
			.inner
			.update_identity(|identity| identity.opt_out = opt_out)
			.await;
	}

	pub async fn set_version_name(&self, version_name: Option<&str>) {
		self.inner.state.lock().await.version_name = version_name.map(str::to_string);
	}

	pub async fn identity(&self) -> Identity {
		self.inner.state.lock().await.identity.clone()
	}

	/// Records waiting to be uploaded, across both queues.
	pub async fn unsent_count(&self) -> usize {
		self.inner.state.lock().await.buffer.unsent_count()
	}

	/// Records evicted by the queue bound since the client was built.
	pub async fn dropped_events(&self) -> u64 {
		self.inner.state.lock().await.buffer.dropped()
	}

	pub async fn session_id(&self) -> Option<i64> {
		self.inner.state.lock().await.session.session_id()
	}

	/// Current records-per-upload cap, after any "too large" backoff.
	pub async fn upload_batch_size(&self) -> usize {
		self.inner.state.lock().await.upload_batch_size
	}

	/// Whether building this client started a new session.
	pub fn is_new_session(&self) -> bool {
		self.inner.new_session
	}

	pub fn is_closed(&self) -> bool {
		self.inner.closed.load(Ordering::SeqCst)
	}

	/// Stops accepting records and makes a final upload attempt.
	pub async fn shutdown(&self) -> Result<()> {
		if self.inner.closed.swap(true, Ordering::SeqCst) {
			debug!("analytics client already shut down");
			return Ok(());
		}

		info!("shutting down analytics client");
		let outcome = self.inner.flush_events().await;
		debug!(status = outcome.status(), body = outcome.body(), "final upload finished");
		Ok(())
	}
}

fn empty_object() -> Value {
	Value::Object(Map::new())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_builder_missing_api_key() {
		let result = AnalyticsClient::builder()
			.base_url("https://collector.example.com")
			.build();
		assert!(matches!(result, Err(AnalyticsError::InvalidApiKey)));
	}

	#[test]
	fn test_builder_empty_api_key() {
		let result = AnalyticsClient::builder()
			.api_key("")
			.base_url("https://collector.example.com")
			.build();
		assert!(matches!(result, Err(AnalyticsError::InvalidApiKey)));
	}

	#[test]
	fn test_builder_missing_base_url() {
		let result = AnalyticsClient::builder().api_key("abc123").build();
		assert!(matches!(result, Err(AnalyticsError::InvalidBaseUrl)));
	}

	#[test]
	fn test_builder_rejects_non_http_url() {
		let result = AnalyticsClient::builder()
			.api_key("abc123")
			.base_url("ftp://collector.example.com")
			.build();
		assert!(matches!(result, Err(AnalyticsError::InvalidBaseUrl)));
	}

	#[test]
	fn test_upload_url_has_single_trailing_slash() {
		assert_eq!(
			upload_url(Some("https://collector.example.com//")).unwrap(),
			"https://collector.example.com/"
		);
		assert_eq!(
			upload_url(Some("https://collector.example.com")).unwrap(),
			"https://collector.example.com/"
		);
	}

	#[test]
	fn test_sub_second_durations_are_kept() {
		let builder = AnalyticsClient::builder()
			.request_timeout(Duration::from_millis(250))
			.session_timeout(Duration::from_micros(1500))
			.event_upload_period(Duration::MAX);
		assert_eq!(builder.layer.request_timeout_ms, Some(250));
		assert_eq!(builder.layer.session_timeout_ms, Some(2));
		assert_eq!(builder.layer.event_upload_period_ms, Some(u64::MAX));

		let config = builder.layer.finalize();
		assert_eq!(config.request_timeout(), Duration::from_millis(250));
	}

	#[test]
	fn test_data_dir_storage_uses_platform_location() {
		let builder = AnalyticsClient::builder().data_dir_storage();
		assert_eq!(builder.layer.storage_dir, FileStore::default_location());
	}

	#[test]
	fn test_storage_dir_selects_file_store() {
		let dir = tempfile::tempdir().unwrap();
		let config = AnalyticsConfigLayer {
			storage_dir: Some(dir.path().join("events")),
			..Default::default()
		}
		.finalize();

		let store = default_store(&config).unwrap();
		store.set("tally_session_id", "1").unwrap();
		assert!(dir.path().join("events").join("tally_session_id").exists());
	}

	#[test]
	fn test_log_outcome_event_id() {
		let queued = LogOutcome::Queued {
			event_id: EventId(3),
			kind: EventKind::Regular,
		};
		assert_eq!(queued.event_id(), Some(EventId(3)));
		assert!(queued.is_queued());
		assert_eq!(LogOutcome::Skipped(SkipReason::OptedOut).event_id(), None);
	}

	#[test]
	fn test_detected_device_info() {
		let device = DeviceInfo::detect();
		assert_eq!(device.os_name.as_deref(), Some(std::env::consts::OS));
	}

	#[tokio::test]
	async fn test_build_generates_and_persists_identity() {
		let store = Arc::new(MemoryStore::new());
		let client = AnalyticsClient::builder()
			.api_key("abc123")
			.base_url("https://collector.example.com")
			.store(store.clone())
			.build()
			.unwrap();

		let identity = client.identity().await;
		assert!(!identity.device_id.is_empty());
		let saved: Identity =
			serde_json::from_str(&store.get("tally_id").unwrap().unwrap()).unwrap();
		assert_eq!(saved, identity);
	}

	#[tokio::test]
	async fn test_rejects_non_finite_revenue() {
		let client = AnalyticsClient::builder()
			.api_key("abc123")
			.base_url("https://collector.example.com")
			.batch_events(true)
			.build()
			.unwrap();

		let result = client.log_revenue(f64::NAN, None, None).await;
		assert!(matches!(result, Err(AnalyticsError::ValidationFailed(_))));
		assert_eq!(client.unsent_count().await, 0);
	}
}

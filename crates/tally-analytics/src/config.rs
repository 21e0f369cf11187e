// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client configuration: built-in defaults, an optional TOML file, and
//! `TALLY_*` environment variables, merged in that order.
//!
//! Numeric options set to zero fall back to their defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

fn default_save_events() -> bool {
	true
}

fn default_saved_max_count() -> usize {
	1000
}

fn default_session_timeout_ms() -> u64 {
	30 * 60 * 1000
}

fn default_upload_batch_size() -> usize {
	100
}

fn default_event_upload_threshold() -> usize {
	30
}

fn default_event_upload_period_ms() -> u64 {
	30 * 1000
}

fn default_platform() -> String {
	"Rust".to_string()
}

fn default_language() -> String {
	"en".to_string()
}

fn default_request_timeout_ms() -> u64 {
	10_000
}

fn default_unsent_key() -> String {
	"tally_unsent".to_string()
}

fn default_unsent_identify_key() -> String {
	"tally_unsent_identify".to_string()
}

fn default_identity_key() -> String {
	"tally_id".to_string()
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read config file {path}: {source}")]
	FileRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse config file {path}: {source}")]
	TomlParse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("invalid value for {key}: {message}")]
	InvalidValue { key: String, message: String },
}

/// One partial source of configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsConfigLayer {
	pub api_key: Option<String>,
	pub base_url: Option<String>,
	pub save_events: Option<bool>,
	pub saved_max_count: Option<usize>,
	pub session_timeout_ms: Option<u64>,
	pub upload_batch_size: Option<usize>,
	pub batch_events: Option<bool>,
	pub event_upload_threshold: Option<usize>,
	pub event_upload_period_ms: Option<u64>,
	pub platform: Option<String>,
	pub language: Option<String>,
	pub request_timeout_ms: Option<u64>,
	pub unsent_key: Option<String>,
	pub unsent_identify_key: Option<String>,
	pub identity_key: Option<String>,
	pub device_id: Option<String>,
	pub user_id: Option<String>,
	pub storage_dir: Option<PathBuf>,
}

impl AnalyticsConfigLayer {
	pub fn merge(&mut self, other: Self) {
		override_with(&mut self.api_key, other.api_key);
		override_with(&mut self.base_url, other.base_url);
		override_with(&mut self.save_events, other.save_events);
		override_with(&mut self.saved_max_count, other.saved_max_count);
		override_with(&mut self.session_timeout_ms, other.session_timeout_ms);
		override_with(&mut self.upload_batch_size, other.upload_batch_size);
		override_with(&mut self.batch_events, other.batch_events);
		override_with(&mut self.event_upload_threshold, other.event_upload_threshold);
		override_with(&mut self.event_upload_period_ms, other.event_upload_period_ms);
		override_with(&mut self.platform, other.platform);
		override_with(&mut self.language, other.language);
		override_with(&mut self.request_timeout_ms, other.request_timeout_ms);
		override_with(&mut self.unsent_key, other.unsent_key);
		override_with(&mut self.unsent_identify_key, other.unsent_identify_key);
		override_with(&mut self.identity_key, other.identity_key);
		override_with(&mut self.device_id, other.device_id);
		override_with(&mut self.user_id, other.user_id);
		override_with(&mut self.storage_dir, other.storage_dir);
	}

	pub fn finalize(self) -> AnalyticsConfig {
		AnalyticsConfig {
			api_key: self.api_key.filter(|s| !s.is_empty()),
			base_url: self.base_url.filter(|s| !s.is_empty()),
			save_events: self.save_events.unwrap_or_else(default_save_events),
			saved_max_count: nonzero(self.saved_max_count).unwrap_or_else(default_saved_max_count),
			session_timeout_ms: nonzero(self.session_timeout_ms)
				.unwrap_or_else(default_session_timeout_ms),
			upload_batch_size: nonzero(self.upload_batch_size)
				.unwrap_or_else(default_upload_batch_size),
			batch_events: self.batch_events.unwrap_or(false),
			event_upload_threshold: nonzero(self.event_upload_threshold)
				.unwrap_or_else(default_event_upload_threshold),
			event_upload_period_ms: nonzero(self.event_upload_period_ms)
				.unwrap_or_else(default_event_upload_period_ms),
			platform: nonempty(self.platform).unwrap_or_else(default_platform),
			language: nonempty(self.language).unwrap_or_else(default_language),
			request_timeout_ms: nonzero(self.request_timeout_ms)
				.unwrap_or_else(default_request_timeout_ms),
			unsent_key: nonempty(self.unsent_key).unwrap_or_else(default_unsent_key),
			unsent_identify_key: nonempty(self.unsent_identify_key)
				.unwrap_or_else(default_unsent_identify_key),
			identity_key: nonempty(self.identity_key).unwrap_or_else(default_identity_key),
			device_id: nonempty(self.device_id),
			user_id: nonempty(self.user_id),
			storage_dir: self.storage_dir,
		}
	}

	/// Parses a layer from TOML text.
	pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
		toml::from_str(content).map_err(|e| ConfigError::TomlParse {
			path: path.to_path_buf(),
			source: e,
		})
	}

	/// Loads a layer from a TOML file. A missing file yields an empty layer.
	pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
		if !path.exists() {
			debug!(path = %path.display(), "config file not found, skipping");
			return Ok(Self::default());
		}

		debug!(path = %path.display(), "loading config file");
		let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
			path: path.to_path_buf(),
			source: e,
		})?;
		let layer = Self::from_toml_str(&content, path)?;
		trace!("parsed config layer from TOML");
		Ok(layer)
	}

	/// Loads a layer from `TALLY_*` environment variables.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Loads a layer using `lookup` in place of the process environment.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let env = EnvReader { lookup };
		Ok(Self {
			api_key: env.var("TALLY_API_KEY"),
			base_url: env.var("TALLY_BASE_URL"),
			save_events: env.bool("TALLY_SAVE_EVENTS"),
			saved_max_count: env.usize("TALLY_SAVED_MAX_COUNT")?,
			session_timeout_ms: env.u64("TALLY_SESSION_TIMEOUT_MS")?,
			upload_batch_size: env.usize("TALLY_UPLOAD_BATCH_SIZE")?,
			batch_events: env.bool("TALLY_BATCH_EVENTS"),
			event_upload_threshold: env.usize("TALLY_EVENT_UPLOAD_THRESHOLD")?,
			event_upload_period_ms: env.u64("TALLY_EVENT_UPLOAD_PERIOD_MS")?,
			platform: env.var("TALLY_PLATFORM"),
			language: env.var("TALLY_LANGUAGE"),
			request_timeout_ms: env.u64("TALLY_REQUEST_TIMEOUT_MS")?,
			unsent_key: env.var("TALLY_UNSENT_KEY"),
			unsent_identify_key: env.var("TALLY_UNSENT_IDENTIFY_KEY"),
			identity_key: env.var("TALLY_IDENTITY_KEY"),
			device_id: env.var("TALLY_DEVICE_ID"),
			user_id: env.var("TALLY_USER_ID"),
			storage_dir: env.var("TALLY_STORAGE_DIR").map(PathBuf::from),
		})
	}
}

struct EnvReader<F> {
	lookup: F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
	fn var(&self, name: &str) -> Option<String> {
		(self.lookup)(name).filter(|s| !s.is_empty())
	}

	fn bool(&self, name: &str) -> Option<bool> {
		self
			.var(name)
			.map(|v| v.eq_ignore_ascii_case("true") || v == "1")
	}

	fn u64(&self, name: &str) -> Result<Option<u64>, ConfigError> {
		match self.var(name) {
			Some(v) => v.trim().parse().map(Some).map_err(|_| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid u64 value '{v}'"),
			}),
			None => Ok(None),
		}
	}

	fn usize(&self, name: &str) -> Result<Option<usize>, ConfigError> {
		match self.var(name) {
			Some(v) => v.trim().parse().map(Some).map_err(|_| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid integer value '{v}'"),
			}),
			None => Ok(None),
		}
	}
}

fn override_with<T>(slot: &mut Option<T>, value: Option<T>) {
	if value.is_some() {
		*slot = value;
	}
}

fn nonzero<T: PartialEq + Default>(value: Option<T>) -> Option<T> {
	value.filter(|v| *v != T::default())
}

fn nonempty(value: Option<String>) -> Option<String> {
	value.filter(|s| !s.is_empty())
}

/// Merges `path` (if given) and then the environment into one layer.
pub fn load_layer(path: Option<&Path>) -> Result<AnalyticsConfigLayer, ConfigError> {
	let mut layer = AnalyticsConfigLayer::default();
	if let Some(path) = path {
		layer.merge(AnalyticsConfigLayer::from_file(path)?);
	}
	layer.merge(AnalyticsConfigLayer::from_env()?);
	Ok(layer)
}

/// Loads configuration from defaults, then `path` (if given), then the
/// environment.
pub fn load_config(path: Option<&Path>) -> Result<AnalyticsConfig, ConfigError> {
	Ok(load_layer(path)?.finalize())
}

/// Resolved client configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsConfig {
	pub api_key: Option<String>,
	pub base_url: Option<String>,
	/// Persist queues after every change.
	pub save_events: bool,
	/// Per-queue bound; the oldest record is evicted beyond it.
	pub saved_max_count: usize,
	pub session_timeout_ms: u64,
	/// Initial records-per-upload cap; halved on "payload too large".
	pub upload_batch_size: usize,
	/// When false, every record triggers an immediate upload.
	pub batch_events: bool,
	pub event_upload_threshold: usize,
	pub event_upload_period_ms: u64,
	pub platform: String,
	pub language: String,
	pub request_timeout_ms: u64,
	pub unsent_key: String,
	pub unsent_identify_key: String,
	pub identity_key: String,
	pub device_id: Option<String>,
	pub user_id: Option<String>,
	/// Directory for the file-backed store. In-memory when unset.
	pub storage_dir: Option<PathBuf>,
}

impl AnalyticsConfig {
	pub fn session_timeout(&self) -> Duration {
		Duration::from_millis(self.session_timeout_ms)
	}

	pub fn event_upload_period(&self) -> Duration {
		Duration::from_millis(self.event_upload_period_ms)
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_millis(self.request_timeout_ms)
	}
}

impl Default for AnalyticsConfig {
	fn default() -> Self {
		AnalyticsConfigLayer::default().finalize()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;
	use tempfile::TempDir;

	#[test]
	fn test_default_values() {
		let config = AnalyticsConfig::default();
		assert!(config.save_events);
		assert_eq!(config.saved_max_count, 1000);
		assert_eq!(config.session_timeout_ms, 1_800_000);
		assert_eq!(config.upload_batch_size, 100);
		assert!(!config.batch_events);
		assert_eq!(config.event_upload_threshold, 30);
		assert_eq!(config.event_upload_period_ms, 30_000);
		assert_eq!(config.platform, "Rust");
		assert_eq!(config.language, "en");
		assert_eq!(config.unsent_key, "tally_unsent");
		assert_eq!(config.unsent_identify_key, "tally_unsent_identify");
		assert_eq!(config.identity_key, "tally_id");
		assert!(config.api_key.is_none());
	}

	#[test]
	fn test_zero_values_fall_back_to_defaults() {
		let config = AnalyticsConfigLayer {
			saved_max_count: Some(0),
			upload_batch_size: Some(0),
			event_upload_period_ms: Some(0),
			platform: Some(String::new()),
			..Default::default()
		}
		.finalize();
		assert_eq!(config.saved_max_count, 1000);
		assert_eq!(config.upload_batch_size, 100);
		assert_eq!(config.event_upload_period_ms, 30_000);
		assert_eq!(config.platform, "Rust");
	}

	#[test]
	fn test_merge_overwrites() {
		let mut base = AnalyticsConfigLayer {
			api_key: Some("base".to_string()),
			upload_batch_size: Some(50),
			..Default::default()
		};
		base.merge(AnalyticsConfigLayer {
			upload_batch_size: Some(10),
			batch_events: Some(true),
			..Default::default()
		});
		assert_eq!(base.api_key.as_deref(), Some("base"));
		assert_eq!(base.upload_batch_size, Some(10));
		assert_eq!(base.batch_events, Some(true));
	}

	#[test]
	fn test_toml_layer() {
		let layer = AnalyticsConfigLayer::from_toml_str(
			r#"
				api_key = "abc123"
				base_url = "https://collector.example.com"
				batch_events = true
				event_upload_threshold = 5
			"#,
			Path::new("tally.toml"),
		)
		.unwrap();
		let config = layer.finalize();
		assert_eq!(config.api_key.as_deref(), Some("abc123"));
		assert!(config.batch_events);
		assert_eq!(config.event_upload_threshold, 5);
	}

	#[test]
	fn test_invalid_toml_reports_path() {
		let err = AnalyticsConfigLayer::from_toml_str("batch_events = 'yes", Path::new("bad.toml"))
			.unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { .. }));
		assert!(err.to_string().contains("bad.toml"));
	}

	#[test]
	fn test_missing_file_is_skipped() {
		let dir = TempDir::new().unwrap();
		let layer = AnalyticsConfigLayer::from_file(&dir.path().join("absent.toml")).unwrap();
		assert_eq!(layer, AnalyticsConfigLayer::default());
	}

	#[test]
	fn test_file_layer_is_read() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("tally.toml");
		std::fs::write(&path, "upload_batch_size = 7\n").unwrap();
		let layer = AnalyticsConfigLayer::from_file(&path).unwrap();
		assert_eq!(layer.upload_batch_size, Some(7));
	}

	#[test]
	fn test_env_layer() {
		let vars: HashMap<&str, &str> = [
			("TALLY_API_KEY", "from-env"),
			("TALLY_BATCH_EVENTS", "1"),
			("TALLY_EVENT_UPLOAD_PERIOD_MS", "500"),
			("TALLY_PLATFORM", ""),
		]
		.into_iter()
		.collect();
		let layer =
			AnalyticsConfigLayer::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();
		assert_eq!(layer.api_key.as_deref(), Some("from-env"));
		assert_eq!(layer.batch_events, Some(true));
		assert_eq!(layer.event_upload_period_ms, Some(500));
		assert_eq!(layer.platform, None);
	}

	#[test]
	fn test_env_layer_rejects_bad_numbers() {
		let err = AnalyticsConfigLayer::from_lookup(|name| {
			(name == "TALLY_SAVED_MAX_COUNT").then(|| "lots".to_string())
		})
		.unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "TALLY_SAVED_MAX_COUNT"));
	}

	#[test]
	fn test_durations() {
		let config = AnalyticsConfig::default();
		assert_eq!(config.session_timeout(), Duration::from_secs(1800));
		assert_eq!(config.event_upload_period(), Duration::from_secs(30));
		assert_eq!(config.request_timeout(), Duration::from_secs(10));
	}
}

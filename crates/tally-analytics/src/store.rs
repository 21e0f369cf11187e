// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Durable string key/value storage for queues, counters, and identity.
//!
//! The engine treats every write as best effort: a failed write is logged and
//! the in-memory state stays authoritative for the rest of the process.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing::debug;

/// Errors raised by a [`KeyValueStore`].
#[derive(Debug, Error)]
pub enum StorageError {
	#[error("failed to access storage for key '{key}': {source}")]
	Io {
		key: String,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to open storage directory {path}: {source}")]
	Open {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("storage lock poisoned")]
	Poisoned,
}

/// A string-keyed store that survives process restarts.
pub trait KeyValueStore: Send + Sync {
	fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
	fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// An in-process store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
	entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}
}

impl KeyValueStore for MemoryStore {
	fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
		let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
		Ok(entries.get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
		let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
		entries.insert(key.to_string(), value.to_string());
		Ok(())
	}
}

/// A store that keeps one file per key inside a directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct FileStore {
	dir: PathBuf,
}

impl FileStore {
	/// Opens (creating if needed) a store rooted at `dir`.
	pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
		let dir = dir.into();
		std::fs::create_dir_all(&dir).map_err(|source| StorageError::Open {
			path: dir.clone(),
			source,
		})?;
		Ok(Self { dir })
	}

	/// The platform data directory for Tally, e.g. `~/.local/share/tally`.
	pub fn default_location() -> Option<PathBuf> {
		dirs::data_dir().map(|dir| dir.join("tally"))
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	fn path_for(&self, key: &str) -> PathBuf {
		let file_name: String = key
			.chars()
			.map(|c| {
				if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
					c
				} else {
					'_'
				}
			})
			.collect();
		self.dir.join(file_name)
	}
}

impl KeyValueStore for FileStore {
	fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
		match std::fs::read_to_string(self.path_for(key)) {
			Ok(value) => Ok(Some(value)),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
			Err(source) => Err(StorageError::Io {
				key: key.to_string(),
				source,
			}),
		}
	}

	fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
		let path = self.path_for(key);
		let mut tmp = path.clone().into_os_string();
		tmp.push(".tmp");
		let io_err = |source| StorageError::Io {
			key: key.to_string(),
			source,
		};
		std::fs::write(&tmp, value).map_err(io_err)?;
		std::fs::rename(&tmp, &path).map_err(io_err)
	}
}

/// Writes `value`, logging instead of failing.
pub(crate) fn set_best_effort(store: &dyn KeyValueStore, key: &str, value: &str) {
	if let Err(e) = store.set(key, value) {
		debug!(key, error = %e, "failed to persist value");
	}
}

/// Reads a positive integer. Missing, unreadable, non-numeric, and zero
/// values all read as `None`.
pub(crate) fn get_positive_int(store: &dyn KeyValueStore, key: &str) -> Option<i64> {
	match store.get(key) {
		Ok(Some(raw)) => raw.trim().parse::<i64>().ok().filter(|v| *v > 0),
		Ok(None) => None,
		Err(e) => {
			debug!(key, error = %e, "failed to read value");
			None
		}
	}
}

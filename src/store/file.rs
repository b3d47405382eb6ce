//! File-backed [`CredentialBacking`]; the durable slot for processes that restart.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	store::{CredentialBacking, CredentialKey, StoreError, StoreFuture},
};

/// Persists credential material to a JSON snapshot after each mutation.
///
/// Writes go through a sibling temp file followed by a rename, so a crash
/// mid-write leaves the previous snapshot intact.
#[derive(Clone, Debug)]
pub struct FileBacking {
	path: PathBuf,
	inner: Arc<RwLock<HashMap<String, String>>>,
}
impl FileBacking {
	/// Opens (or creates) a backing at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = if path.exists() { Self::load_snapshot(&path)? } else { HashMap::new() };

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	fn load_snapshot(path: &Path) -> Result<HashMap<String, String>, StoreError> {
		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(HashMap::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: &HashMap<String, String>) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(contents).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl CredentialBacking for FileBacking {
	fn read(&self, key: CredentialKey) -> StoreFuture<'_, Option<String>> {
		Box::pin(async move { Ok(self.inner.read().get(key.as_str()).cloned()) })
	}

	fn write(&self, key: CredentialKey, value: String) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			guard.insert(key.as_str().to_owned(), value);
			self.persist_locked(&guard)?;

			Ok(())
		})
	}

	fn remove(&self, key: CredentialKey) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			if guard.remove(key.as_str()).is_some() {
				self.persist_locked(&guard)?;
			}

			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;

	fn temp_path() -> PathBuf {
		let unique = format!(
			"auth_relay_file_backing_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[test]
	fn write_and_reload_round_trip() {
		let path = temp_path();
		let backing = FileBacking::open(&path).expect("Failed to open file backing snapshot.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file backing test.");

		rt.block_on(backing.write(CredentialKey::AccessToken, "persisted-token".into()))
			.expect("Failed to write fixture value to file backing.");
		drop(backing);

		let reopened = FileBacking::open(&path).expect("Failed to reopen file backing snapshot.");
		let fetched = rt
			.block_on(reopened.read(CredentialKey::AccessToken))
			.expect("Failed to read fixture value from file backing.")
			.expect("File backing lost value after reopen.");

		assert_eq!(fetched, "persisted-token");

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary backing snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn remove_of_absent_key_does_not_touch_disk() {
		let path = temp_path();
		let backing = FileBacking::open(&path).expect("Failed to open file backing snapshot.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file backing test.");

		rt.block_on(backing.remove(CredentialKey::Identity))
			.expect("Removing an absent key should succeed.");

		assert!(!path.exists(), "No snapshot should be written for a no-op removal.");
	}
}

//! Thread-safe in-memory [`CredentialBacking`]; the session-scoped slot in most wirings.

// self
use crate::{
	_prelude::*,
	store::{CredentialBacking, CredentialKey, StoreError, StoreFuture},
};

type SlotMap = Arc<RwLock<HashMap<CredentialKey, String>>>;

/// In-process backing that lives exactly as long as the owning session.
#[derive(Clone, Debug, Default)]
pub struct MemoryBacking(SlotMap);
impl MemoryBacking {
	fn read_now(map: SlotMap, key: CredentialKey) -> Option<String> {
		map.read().get(&key).cloned()
	}

	fn write_now(map: SlotMap, key: CredentialKey, value: String) -> Result<(), StoreError> {
		map.write().insert(key, value);

		Ok(())
	}

	fn remove_now(map: SlotMap, key: CredentialKey) -> Result<(), StoreError> {
		map.write().remove(&key);

		Ok(())
	}
}
impl CredentialBacking for MemoryBacking {
	fn read(&self, key: CredentialKey) -> StoreFuture<'_, Option<String>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::read_now(map, key)) })
	}

	fn write(&self, key: CredentialKey, value: String) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::write_now(map, key, value) })
	}

	fn remove(&self, key: CredentialKey) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::remove_now(map, key) })
	}
}

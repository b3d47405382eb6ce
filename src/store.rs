//! Storage contracts and the dual-slot credential store facade.
//!
//! Two independent key/value backings hold the credential material: one durable
//! across process restarts, one scoped to the current session. [`CredentialStore`]
//! threads an explicit `durable` flag through its API instead of inferring the
//! slot from ambient state, so a credential is always read back from the slot it
//! was written to.

pub mod file;
pub mod memory;

pub use file::FileBacking;
pub use memory::MemoryBacking;

// self
use crate::{
	_prelude::*,
	credential::{AuthIdentity, Credential, TokenSecret},
};

/// Boxed future returned by [`CredentialBacking`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Key/value contract implemented by credential backings.
///
/// Each backing stores at most one value per [`CredentialKey`]; the store facade
/// owns the composition of the three keys into a [`Credential`].
pub trait CredentialBacking
where
	Self: Send + Sync,
{
	/// Fetches the value stored under the key, if present.
	fn read(&self, key: CredentialKey) -> StoreFuture<'_, Option<String>>;

	/// Stores or replaces the value under the key.
	fn write(&self, key: CredentialKey, value: String) -> StoreFuture<'_, ()>;

	/// Removes the value under the key; removing an absent key is a no-op.
	fn remove(&self, key: CredentialKey) -> StoreFuture<'_, ()>;
}

/// Slots a backing must support.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CredentialKey {
	/// Short-lived access token.
	AccessToken,
	/// Longer-lived refresh token.
	RefreshToken,
	/// Decoded identity blob (JSON-encoded [`AuthIdentity`]).
	Identity,
}
impl CredentialKey {
	/// Every key, in the order backings are expected to enumerate them.
	pub const ALL: [Self; 3] = [Self::AccessToken, Self::RefreshToken, Self::Identity];

	/// Returns a stable label suitable for persistent backings.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::AccessToken => "access_token",
			Self::RefreshToken => "refresh_token",
			Self::Identity => "identity",
		}
	}
}

/// Error type produced by [`CredentialBacking`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Dual-slot credential store: one durable backing, one session-scoped backing.
///
/// Pure state holder. Expiry is never evaluated here; the pipeline decides
/// whether a present credential is still usable.
pub struct CredentialStore {
	durable: Arc<dyn CredentialBacking>,
	ephemeral: Arc<dyn CredentialBacking>,
}
impl CredentialStore {
	/// Creates a store over the provided durable and session-scoped backings.
	pub fn new(durable: Arc<dyn CredentialBacking>, ephemeral: Arc<dyn CredentialBacking>) -> Self {
		Self { durable, ephemeral }
	}

	/// Writes the credential into the selected slot, overwriting whatever that
	/// slot held. The other slot is left untouched.
	///
	/// The identity blob is recomputed from the access token on every write; a
	/// token whose claims cannot be decoded stores no identity at all.
	pub async fn set(&self, credential: Credential, durable: bool) -> Result<()> {
		let backing = self.slot(durable);

		backing
			.write(CredentialKey::AccessToken, credential.access_token.expose().to_owned())
			.await?;

		match credential.refresh_token.as_ref() {
			Some(secret) =>
				backing.write(CredentialKey::RefreshToken, secret.expose().to_owned()).await?,
			None => backing.remove(CredentialKey::RefreshToken).await?,
		}

		match AuthIdentity::decode(credential.access_token.expose()) {
			Ok(identity) => {
				let blob = serde_json::to_string(&identity).map_err(|e| StoreError::Serialization {
					message: format!("Failed to encode identity blob: {e}"),
				})?;

				backing.write(CredentialKey::Identity, blob).await?;
			},
			Err(_) => backing.remove(CredentialKey::Identity).await?,
		}

		Ok(())
	}

	/// Returns the current credential, checking the durable slot first.
	///
	/// The returned credential's `durable` flag reflects the slot it was read
	/// from. A present access token that cannot be decoded and has no usable
	/// identity blob surfaces as [`Error::CorruptCredential`].
	pub async fn get(&self) -> Result<Option<Credential>> {
		if let Some(credential) = self.read_slot(true).await? {
			return Ok(Some(credential));
		}

		self.read_slot(false).await
	}

	/// Removes every key from both slots.
	pub async fn clear(&self) -> Result<()> {
		for durable in [true, false] {
			let backing = self.slot(durable);

			for key in CredentialKey::ALL {
				backing.remove(key).await?;
			}
		}

		Ok(())
	}

	/// Returns `true` iff an access token is present in either slot.
	///
	/// Expiry is deliberately ignored; a present-but-expired token still counts
	/// as authenticated here and is weeded out by the pipeline instead.
	pub async fn is_authenticated(&self) -> Result<bool> {
		if self.slot(true).read(CredentialKey::AccessToken).await?.is_some() {
			return Ok(true);
		}

		Ok(self.slot(false).read(CredentialKey::AccessToken).await?.is_some())
	}

	/// Returns the decoded identity for the current credential, or `None` when
	/// no credential is present or the stored material cannot be decoded.
	pub async fn identity(&self) -> Result<Option<AuthIdentity>> {
		for durable in [true, false] {
			let backing = self.slot(durable);
			let Some(access) = backing.read(CredentialKey::AccessToken).await? else {
				continue;
			};
			let identity = backing
				.read(CredentialKey::Identity)
				.await?
				.and_then(|blob| serde_json::from_str::<AuthIdentity>(&blob).ok())
				.or_else(|| AuthIdentity::decode(&access).ok());

			// Corrupt material maps to "not authenticated" rather than an error.
			return Ok(identity);
		}

		Ok(None)
	}

	/// Returns the refresh token and the durability of the slot holding it,
	/// checking the durable slot first.
	///
	/// Used by the coordinator, which must reach the refresh token even when the
	/// access token alongside it is undecodable.
	pub async fn refresh_secret(&self) -> Result<Option<(TokenSecret, bool)>> {
		if let Some(value) = self.slot(true).read(CredentialKey::RefreshToken).await? {
			return Ok(Some((TokenSecret::new(value), true)));
		}

		Ok(self
			.slot(false)
			.read(CredentialKey::RefreshToken)
			.await?
			.map(|value| (TokenSecret::new(value), false)))
	}

	fn slot(&self, durable: bool) -> &dyn CredentialBacking {
		if durable { self.durable.as_ref() } else { self.ephemeral.as_ref() }
	}

	async fn read_slot(&self, durable: bool) -> Result<Option<Credential>> {
		let backing = self.slot(durable);
		let Some(access) = backing.read(CredentialKey::AccessToken).await? else {
			return Ok(None);
		};
		let refresh = backing.read(CredentialKey::RefreshToken).await?;
		let expires_at = match backing.read(CredentialKey::Identity).await? {
			Some(blob) => match serde_json::from_str::<AuthIdentity>(&blob) {
				Ok(identity) => identity.expires_at,
				Err(_) => AuthIdentity::decode(&access)?.expires_at,
			},
			None => AuthIdentity::decode(&access)?.expires_at,
		};

		Ok(Some(Credential {
			access_token: TokenSecret::new(access),
			refresh_token: refresh.map(TokenSecret::new),
			expires_at,
			durable,
		}))
	}
}
impl Debug for CredentialStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("CredentialStore(..)")
	}
}

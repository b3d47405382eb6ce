//! Credential pair model, redacting secret wrapper, and decoded-identity claims.

pub mod claims;

pub use claims::*;

// self
use crate::_prelude::*;

/// Redacted token secret wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Errors produced by [`CredentialBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CredentialBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when the access token value was empty.
	#[error("Access token must not be empty.")]
	EmptyAccessToken,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
}

/// The short-lived access/refresh pair attached to outbound calls.
///
/// `durable` records which backing-store slot the pair lives in (or should live
/// in): `true` survives process restarts, `false` is scoped to the current
/// session. An expired pair is still *present*; presence and validity are
/// checked at different layers.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
	/// Access token attached to outbound calls.
	pub access_token: TokenSecret,
	/// Refresh token exchanged for a new pair once the access token expires.
	pub refresh_token: Option<TokenSecret>,
	/// Instant past which the access token is no longer valid.
	pub expires_at: OffsetDateTime,
	/// `true` when the pair persists across restarts rather than per session.
	pub durable: bool,
}
impl Credential {
	/// Returns a builder for assembling a credential field by field.
	pub fn builder() -> CredentialBuilder {
		CredentialBuilder::default()
	}

	/// Builds a credential from a freshly issued token pair, deriving the expiry
	/// instant from the access token's claims.
	pub fn from_token_pair(
		access: impl Into<String>,
		refresh: impl Into<String>,
	) -> Result<Self, ClaimsError> {
		let access = access.into();
		let identity = AuthIdentity::decode(&access)?;

		Ok(Self {
			access_token: TokenSecret::new(access),
			refresh_token: Some(TokenSecret::new(refresh.into())),
			expires_at: identity.expires_at,
			durable: false,
		})
	}

	/// Overrides the durability flag.
	pub fn with_durable(mut self, durable: bool) -> Self {
		self.durable = durable;

		self
	}

	/// Returns `true` if the access token has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Returns `true` if the access token is expired relative to the current clock.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("expires_at", &self.expires_at)
			.field("durable", &self.durable)
			.finish()
	}
}

/// Builder for [`Credential`].
#[derive(Clone, Debug, Default)]
pub struct CredentialBuilder {
	access_token: Option<String>,
	refresh_token: Option<String>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
	durable: bool,
}
impl CredentialBuilder {
	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(token.into());

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(token.into());

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the current clock.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Marks the credential as surviving process restarts.
	pub fn durable(mut self, durable: bool) -> Self {
		self.durable = durable;

		self
	}

	/// Consumes the builder and produces a [`Credential`].
	pub fn build(self) -> Result<Credential, CredentialBuilderError> {
		let access_token = self.access_token.ok_or(CredentialBuilderError::MissingAccessToken)?;

		if access_token.is_empty() {
			return Err(CredentialBuilderError::EmptyAccessToken);
		}

		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => OffsetDateTime::now_utc() + delta,
			(None, None) => return Err(CredentialBuilderError::MissingExpiry),
		};

		Ok(Credential {
			access_token: TokenSecret::new(access_token),
			refresh_token: self.refresh_token.map(TokenSecret::new),
			expires_at,
			durable: self.durable,
		})
	}
}

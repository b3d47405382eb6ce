//! Identity claims decoded from the access token payload.
//!
//! Decoding here is presentation-level only: the payload segment is base64url
//! decoded and parsed, never signature-verified. Verification belongs to the
//! issuing server.

// crates.io
use base64::{DecodeError, Engine, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::_prelude::*;

/// Error returned when an access token payload cannot be decoded.
#[derive(Debug, ThisError)]
pub enum ClaimsError {
	/// The token is not a three-segment JWT.
	#[error("Access token is not a three-segment JWT.")]
	MalformedToken,
	/// The payload segment is not valid base64url.
	#[error("Access token payload is not valid base64url.")]
	PayloadEncoding(#[from] DecodeError),
	/// The payload JSON could not be parsed.
	#[error("Access token payload is not a valid claims object.")]
	PayloadParse(#[from] serde_path_to_error::Error<serde_json::Error>),
	/// No subject claim was present under any recognized name.
	#[error("Access token payload is missing a subject claim.")]
	MissingSubject,
	/// No expiry claim was present.
	#[error("Access token payload is missing an expiry claim.")]
	MissingExpiry,
	/// The expiry claim is outside the representable timestamp range.
	#[error("Access token expiry claim is out of range.")]
	ExpiryOutOfRange,
}

/// Claims decoded from the current access token.
///
/// Derived state only: recomputed whenever the credential changes, never
/// mutated independently.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthIdentity {
	/// Subject identifier of the authenticated principal.
	pub subject: String,
	/// Email claim, when issued.
	pub email: Option<String>,
	/// Display-name claim, when issued.
	pub name: Option<String>,
	/// Role claim, when issued.
	pub role: Option<String>,
	/// Expiry instant carried by the token.
	pub expires_at: OffsetDateTime,
}
impl AuthIdentity {
	/// Decodes the claims carried by the provided access token.
	pub fn decode(access_token: &str) -> Result<Self, ClaimsError> {
		let mut segments = access_token.split('.');
		let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
			(Some(_), Some(payload), Some(_), None) => payload,
			_ => return Err(ClaimsError::MalformedToken),
		};
		let bytes = URL_SAFE_NO_PAD.decode(payload)?;
		let mut deserializer = serde_json::Deserializer::from_slice(&bytes);
		let raw: RawClaims = serde_path_to_error::deserialize(&mut deserializer)?;

		raw.try_into()
	}

	/// Returns `true` if the claims have expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}
}

// Issuers disagree on claim names; candidates are kept as separate fields and
// resolved in precedence order rather than via serde aliases, so a payload
// carrying several candidates at once still parses.
#[derive(Debug, Deserialize)]
struct RawClaims {
	#[serde(default)]
	sub: Option<String>,
	#[serde(default, rename = "userId")]
	user_id: Option<String>,
	#[serde(default)]
	id: Option<String>,
	#[serde(default)]
	email: Option<String>,
	#[serde(default)]
	given_name: Option<String>,
	#[serde(default, rename = "fullName")]
	full_name: Option<String>,
	#[serde(default)]
	role: Option<String>,
	#[serde(default, rename = "http://schemas.microsoft.com/ws/2008/06/identity/claims/role")]
	schema_role: Option<String>,
	#[serde(default)]
	exp: Option<i64>,
}
impl TryFrom<RawClaims> for AuthIdentity {
	type Error = ClaimsError;

	fn try_from(raw: RawClaims) -> Result<Self, Self::Error> {
		let subject = raw
			.sub
			.or(raw.user_id)
			.or(raw.id)
			.filter(|value| !value.is_empty())
			.ok_or(ClaimsError::MissingSubject)?;
		let exp = raw.exp.ok_or(ClaimsError::MissingExpiry)?;
		let expires_at =
			OffsetDateTime::from_unix_timestamp(exp).map_err(|_| ClaimsError::ExpiryOutOfRange)?;

		Ok(Self {
			subject,
			email: raw.email,
			name: raw.given_name.or(raw.full_name),
			role: raw.role.or(raw.schema_role),
			expires_at,
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	fn encode_token(payload: serde_json::Value) -> String {
		let header = URL_SAFE_NO_PAD.encode(b"{\"alg\":\"none\",\"typ\":\"JWT\"}");
		let body = URL_SAFE_NO_PAD.encode(payload.to_string());

		format!("{header}.{body}.sig")
	}

	#[test]
	fn decodes_standard_claims() {
		let token = encode_token(json!({
			"sub": "user-7",
			"email": "user-7@example.com",
			"given_name": "Quinn",
			"role": "Recruiter",
			"exp": 1_767_225_600_i64,
		}));
		let identity = AuthIdentity::decode(&token).expect("Standard claims should decode.");

		assert_eq!(identity.subject, "user-7");
		assert_eq!(identity.email.as_deref(), Some("user-7@example.com"));
		assert_eq!(identity.name.as_deref(), Some("Quinn"));
		assert_eq!(identity.role.as_deref(), Some("Recruiter"));
		assert_eq!(identity.expires_at.unix_timestamp(), 1_767_225_600);
	}

	#[test]
	fn subject_falls_back_through_candidate_claims() {
		let token = encode_token(json!({ "userId": "fallback-1", "exp": 1_767_225_600_i64 }));
		let identity = AuthIdentity::decode(&token).expect("userId should satisfy the subject.");

		assert_eq!(identity.subject, "fallback-1");

		let token = encode_token(json!({ "id": "fallback-2", "exp": 1_767_225_600_i64 }));

		assert_eq!(
			AuthIdentity::decode(&token).expect("id should satisfy the subject.").subject,
			"fallback-2",
		);
	}

	#[test]
	fn role_honors_the_schema_uri_claim() {
		let token = encode_token(json!({
			"sub": "user-8",
			"http://schemas.microsoft.com/ws/2008/06/identity/claims/role": "Admin",
			"exp": 1_767_225_600_i64,
		}));
		let identity = AuthIdentity::decode(&token).expect("Schema-URI role should decode.");

		assert_eq!(identity.role.as_deref(), Some("Admin"));
	}

	#[test]
	fn rejects_non_jwt_material() {
		assert!(matches!(
			AuthIdentity::decode("not-a-jwt"),
			Err(ClaimsError::MalformedToken),
		));
		assert!(matches!(
			AuthIdentity::decode("a.b.c.d"),
			Err(ClaimsError::MalformedToken),
		));
		assert!(matches!(
			AuthIdentity::decode("head.!!!.sig"),
			Err(ClaimsError::PayloadEncoding(_)),
		));
	}

	#[test]
	fn rejects_missing_subject_and_expiry() {
		let token = encode_token(json!({ "exp": 1_767_225_600_i64 }));

		assert!(matches!(AuthIdentity::decode(&token), Err(ClaimsError::MissingSubject)));

		let token = encode_token(json!({ "sub": "user-9" }));

		assert!(matches!(AuthIdentity::decode(&token), Err(ClaimsError::MissingExpiry)));
	}
}

//! Pipeline-level error types shared across the store, coordinator, and transport layers.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical pipeline error exposed by public APIs.
///
/// Credential expiry itself never appears here; it is an internal signal that the
/// pipeline absorbs by renewing and replaying. Callers only observe the final
/// outcome of at most one replay.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Backing-store failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Stored credential could not be decoded; treated as "not authenticated".
	#[error("Stored credential could not be decoded.")]
	CorruptCredential(
		#[from]
		#[source]
		crate::credential::ClaimsError,
	),
	/// Transport failure (DNS, TCP, TLS); no response was received, so the refresh
	/// path is never consulted.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Renewal failed, or a replayed call still reported credential expiry.
	#[error("Authentication failed: {reason}.")]
	AuthenticationFailed {
		/// Coordinator- or pipeline-supplied reason string.
		reason: String,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while executing the outbound call.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while executing the outbound call.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

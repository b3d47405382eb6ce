//! Renewal endpoint contract and the HTTP client that speaks it.
//!
//! The wire format is deliberately narrow: the request carries the refresh
//! token, a successful response carries the replacement pair, and *anything*
//! else (non-success status, malformed body, transport failure) is a renewal
//! failure. The coordinator owns what failure means for the session.

// self
use crate::{
	_prelude::*,
	credential::TokenSecret,
	error::TransportError,
	http::{CallTransport, OutboundRequest},
};

/// Boxed future returned by [`RenewalClient::renew`].
pub type RenewalFuture<'a> =
	Pin<Box<dyn Future<Output = Result<RenewedPair, RenewalError>> + 'a + Send>>;

/// Contract for exchanging a refresh token against the remote identity endpoint.
pub trait RenewalClient
where
	Self: Send + Sync,
{
	/// Exchanges the refresh token for a fresh access/refresh pair.
	fn renew(&self, refresh_token: &str) -> RenewalFuture<'_>;
}

/// Replacement pair issued by a successful renewal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RenewedPair {
	/// Fresh access token.
	#[serde(rename = "accessToken")]
	pub access_token: TokenSecret,
	/// Fresh refresh token superseding the one just spent.
	#[serde(rename = "refreshToken")]
	pub refresh_token: TokenSecret,
}

/// Classification of renewal failures.
///
/// Every variant ends a session the same way; the split exists for logs and
/// tests, not for callers to branch on.
#[derive(Debug, ThisError)]
pub enum RenewalError {
	/// Endpoint answered with a non-success status.
	#[error("Renewal endpoint rejected the exchange with status {status}.")]
	Rejected {
		/// HTTP status code returned by the endpoint.
		status: u16,
	},
	/// Endpoint answered 2xx but the body did not match the expected shape.
	#[error("Renewal endpoint returned a malformed response.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Endpoint answered with an empty access token.
	#[error("Renewal endpoint returned an empty access token.")]
	EmptyAccessToken,
	/// Request body could not be encoded.
	#[error("Renewal request could not be encoded.")]
	RequestEncode(#[from] serde_json::Error),
	/// No response was received from the endpoint.
	#[error(transparent)]
	Transport(#[from] TransportError),
}

#[derive(Serialize)]
struct RenewalRequestBody<'a> {
	#[serde(rename = "refreshToken")]
	refresh_token: &'a str,
}

/// [`RenewalClient`] speaking JSON over a [`CallTransport`] to a fixed endpoint.
pub struct HttpRenewalClient {
	transport: Arc<dyn CallTransport>,
	endpoint: Url,
}
impl HttpRenewalClient {
	/// Creates a client posting exchanges to the provided endpoint.
	pub fn new(transport: Arc<dyn CallTransport>, endpoint: Url) -> Self {
		Self { transport, endpoint }
	}

	/// Returns the configured endpoint.
	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}
}
impl RenewalClient for HttpRenewalClient {
	fn renew(&self, refresh_token: &str) -> RenewalFuture<'_> {
		let request = OutboundRequest::post(self.endpoint.clone())
			.with_json(&RenewalRequestBody { refresh_token })
			.map_err(RenewalError::from);

		Box::pin(async move {
			let response = self.transport.execute(request?).await?;

			if !response.is_success() {
				return Err(RenewalError::Rejected { status: response.status.as_u16() });
			}

			let mut deserializer = serde_json::Deserializer::from_slice(&response.body);
			let pair: RenewedPair = serde_path_to_error::deserialize(&mut deserializer)
				.map_err(|source| RenewalError::MalformedResponse { source })?;

			if pair.access_token.expose().is_empty() {
				return Err(RenewalError::EmptyAccessToken);
			}

			Ok(pair)
		})
	}
}
impl Debug for HttpRenewalClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HttpRenewalClient").field("endpoint", &self.endpoint.as_str()).finish()
	}
}

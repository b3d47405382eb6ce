//! Transport primitives for outbound calls.
//!
//! The pipeline never talks to an HTTP stack directly; it hands an
//! [`OutboundRequest`] to a [`CallTransport`] and inspects the returned
//! [`OutboundResponse`]. A reqwest-backed implementation ships behind the
//! `reqwest` feature; anything else (test doubles included) implements the
//! trait directly.

// std
use std::ops::Deref;
// crates.io
use http::{
	HeaderMap, HeaderValue, Method, StatusCode,
	header::{AUTHORIZATION, CONTENT_TYPE, HeaderName},
};
// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`CallTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<OutboundResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing outbound calls.
///
/// Implementations must return an [`OutboundResponse`] whenever the server
/// answered at all, error statuses included, and a [`TransportError`] only when
/// no response was received. The pipeline relies on that split: transport
/// errors propagate unchanged, while response statuses drive the refresh path.
pub trait CallTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes the request and resolves with the raw response.
	fn execute(&self, request: OutboundRequest) -> TransportFuture<'_>;
}

/// Request descriptor handed to the transport: target, method, headers, body.
#[derive(Clone, Debug)]
pub struct OutboundRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute target URL.
	pub url: Url,
	/// Headers to send, including any caller-supplied `Authorization`.
	pub headers: HeaderMap,
	/// Optional request body.
	pub body: Option<Vec<u8>>,
}
impl OutboundRequest {
	/// Creates a descriptor for the provided method and target.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: HeaderMap::new(), body: None }
	}

	/// Creates a GET descriptor.
	pub fn get(url: Url) -> Self {
		Self::new(Method::GET, url)
	}

	/// Creates a POST descriptor.
	pub fn post(url: Url) -> Self {
		Self::new(Method::POST, url)
	}

	/// Appends a header.
	pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Attaches a raw body.
	pub fn with_body(mut self, body: Vec<u8>) -> Self {
		self.body = Some(body);

		self
	}

	/// Attaches a JSON body and the matching content type.
	pub fn with_json<T>(self, payload: &T) -> Result<Self, serde_json::Error>
	where
		T: ?Sized + Serialize,
	{
		let body = serde_json::to_vec(payload)?;

		Ok(self
			.with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
			.with_body(body))
	}

	/// Returns `true` if the descriptor already carries an `Authorization` header.
	pub fn has_authorization(&self) -> bool {
		self.headers.contains_key(AUTHORIZATION)
	}

	/// Installs (or replaces) a bearer `Authorization` header.
	///
	/// Tokens that cannot be represented as a header value are skipped; the call
	/// then goes out unauthenticated and the expiry signal takes over from there.
	pub(crate) fn insert_bearer(&mut self, token: &str) {
		if let Some(value) = bearer_value(token) {
			self.headers.insert(AUTHORIZATION, value);
		}
	}
}

/// Response descriptor produced by the transport.
#[derive(Clone, Debug)]
pub struct OutboundResponse {
	/// HTTP status returned by the server.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl OutboundResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Returns the body interpreted as UTF-8, lossily.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}

pub(crate) fn bearer_value(token: &str) -> Option<HeaderValue> {
	HeaderValue::try_from(format!("Bearer {token}")).ok().map(|mut value| {
		value.set_sensitive(true);

		value
	})
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// The pipeline treats redirects, pooling, and TLS as the client's business;
/// configure the wrapped [`ReqwestClient`] accordingly before handing it over.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestCallTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestCallTransport {
	/// Wraps an existing [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestCallTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestCallTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl CallTransport for ReqwestCallTransport {
	fn execute(&self, request: OutboundRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let mut builder =
				client.request(request.method, request.url).headers(request.headers);

			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response = builder.send().await.map_err(TransportError::from)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body = response.bytes().await.map_err(TransportError::from)?.to_vec();

			Ok(OutboundResponse { status, headers, body })
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn target() -> Url {
		Url::parse("https://api.example.com/jobs").expect("Fixture URL should parse.")
	}

	#[test]
	fn bearer_header_is_sensitive_and_well_formed() {
		let value = bearer_value("token-123").expect("ASCII tokens should form a header value.");

		assert!(value.is_sensitive());
		assert_eq!(value.to_str().expect("Bearer value should be visible ASCII."), "Bearer token-123");
	}

	#[test]
	fn unheaderable_tokens_are_skipped() {
		let mut request = OutboundRequest::get(target());

		request.insert_bearer("nul\u{0}byte");

		assert!(!request.has_authorization());
	}

	#[test]
	fn caller_supplied_authorization_is_detected() {
		let request = OutboundRequest::get(target()).with_header(
			AUTHORIZATION,
			HeaderValue::from_static("Bearer caller-owned"),
		);

		assert!(request.has_authorization());
	}

	#[test]
	fn json_body_sets_content_type() {
		let request = OutboundRequest::post(target())
			.with_json(&serde_json::json!({ "q": "rust" }))
			.expect("JSON fixture should encode.");

		assert_eq!(
			request.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
			Some("application/json"),
		);
		assert!(request.body.is_some());
	}
}

//! Outbound-call pipeline: attach the credential, execute, inspect, renew, replay.
//!
//! Every outbound call flows through [`RequestPipeline::dispatch`]. Responses
//! that do not match the configured expiry signal pass through untouched; a
//! matching response sends the call through the single-flight coordinator and
//! exactly one replay. Transport failures short-circuit before any of that.

// crates.io
use http::StatusCode;
// self
use crate::{
	_prelude::*,
	credential::TokenSecret,
	http::{CallTransport, OutboundRequest, OutboundResponse},
	obs::{self, PipelineSpan, StageKind, StageOutcome},
	refresh::RefreshCoordinator,
	retry::RetryExecutor,
	store::CredentialStore,
};

/// Authenticated request pipeline wrapping an arbitrary [`CallTransport`].
#[derive(Clone)]
pub struct RequestPipeline {
	transport: Arc<dyn CallTransport>,
	store: Arc<CredentialStore>,
	coordinator: Arc<RefreshCoordinator>,
	retry: RetryExecutor,
	expiry_status: StatusCode,
}
impl RequestPipeline {
	/// Creates a pipeline over the provided transport, store, and coordinator.
	///
	/// The expiry signal defaults to `401 Unauthorized`; override it with
	/// [`RequestPipeline::with_expiry_status`] for servers that signal
	/// credential expiry differently.
	pub fn new(
		transport: Arc<dyn CallTransport>,
		store: Arc<CredentialStore>,
		coordinator: Arc<RefreshCoordinator>,
	) -> Self {
		Self {
			transport,
			store,
			coordinator,
			retry: RetryExecutor,
			expiry_status: StatusCode::UNAUTHORIZED,
		}
	}

	/// Overrides the status code treated as the credential-expiry signal.
	pub fn with_expiry_status(mut self, status: StatusCode) -> Self {
		self.expiry_status = status;

		self
	}

	/// Returns the coordinator backing this pipeline.
	pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
		&self.coordinator
	}

	/// Returns the credential store backing this pipeline.
	pub fn store(&self) -> &Arc<CredentialStore> {
		&self.store
	}

	/// Executes an outbound call with the current credential attached,
	/// absorbing at most one expiry/renewal/replay round trip.
	///
	/// Non-expiry responses (success, validation failures, server errors) are
	/// returned unchanged. Transport errors propagate unchanged and never
	/// consult the refresh path.
	pub async fn dispatch(&self, request: OutboundRequest) -> Result<OutboundResponse> {
		const KIND: StageKind = StageKind::Dispatch;

		let span = PipelineSpan::new(KIND, "dispatch");

		obs::record_stage_outcome(KIND, StageOutcome::Attempt);

		let result = span
			.instrument(async move {
				let replay_seed = request.clone();
				let response = self.send_with_current(request).await?;

				if !self.is_expiry_signal(response.status) {
					return Ok(response);
				}

				let token = self.coordinator.request_refresh().await?;

				self.retry.replay(self, replay_seed, token).await
			})
			.await;

		match &result {
			Ok(_) => obs::record_stage_outcome(KIND, StageOutcome::Success),
			Err(_) => obs::record_stage_outcome(KIND, StageOutcome::Failure),
		}

		result
	}

	pub(crate) fn is_expiry_signal(&self, status: StatusCode) -> bool {
		status == self.expiry_status
	}

	pub(crate) async fn send_bearing(
		&self,
		mut request: OutboundRequest,
		token: &TokenSecret,
	) -> Result<OutboundResponse> {
		request.insert_bearer(token.expose());

		Ok(self.transport.execute(request).await?)
	}

	// A caller-supplied Authorization header wins over the stored credential; a
	// corrupt stored credential sends the call out unauthenticated and lets the
	// expiry signal sort it out.
	async fn send_with_current(&self, mut request: OutboundRequest) -> Result<OutboundResponse> {
		if !request.has_authorization() {
			match self.store.get().await {
				Ok(Some(credential)) => request.insert_bearer(credential.access_token.expose()),
				Ok(None) | Err(Error::CorruptCredential(_)) => (),
				Err(e) => return Err(e),
			}
		}

		Ok(self.transport.execute(request).await?)
	}
}
impl Debug for RequestPipeline {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestPipeline").field("expiry_status", &self.expiry_status).finish()
	}
}

//! Bounded replay of a call that already observed credential expiry once.

// self
use crate::{
	_prelude::*,
	credential::TokenSecret,
	http::{OutboundRequest, OutboundResponse},
	obs::{self, PipelineSpan, StageKind, StageOutcome},
	pipeline::RequestPipeline,
};

/// Replays exactly one previously-failed call with a freshly obtained credential.
///
/// The replay never re-enters the refresh path: a second expiry signal surfaces
/// immediately as [`Error::AuthenticationFailed`] instead of looping.
#[derive(Clone, Copy, Debug, Default)]
pub struct RetryExecutor;
impl RetryExecutor {
	/// Reissues the descriptor once with the fresh bearer token.
	pub async fn replay(
		&self,
		pipeline: &RequestPipeline,
		request: OutboundRequest,
		token: TokenSecret,
	) -> Result<OutboundResponse> {
		const KIND: StageKind = StageKind::Replay;

		let span = PipelineSpan::new(KIND, "replay");

		obs::record_stage_outcome(KIND, StageOutcome::Attempt);

		let result = span
			.instrument(async move {
				let response = pipeline.send_bearing(request, &token).await?;

				if pipeline.is_expiry_signal(response.status) {
					return Err(Error::AuthenticationFailed {
						reason: "replayed call was rejected with the expiry signal again".into(),
					});
				}

				Ok(response)
			})
			.await;

		match &result {
			Ok(_) => obs::record_stage_outcome(KIND, StageOutcome::Success),
			Err(_) => obs::record_stage_outcome(KIND, StageOutcome::Failure),
		}

		result
	}
}

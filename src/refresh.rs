//! Single-flight renewal coordination.
//!
//! [`RefreshCoordinator`] owns a private `Idle ⇄ Refreshing` state machine.
//! The first caller to observe `Idle` becomes the cycle leader and performs the
//! renewal; every caller arriving while a cycle is in flight suspends as a
//! queued waiter and shares the leader's result. Exactly one renewal-endpoint
//! call happens per cycle, waiters are released in arrival order, and a failed
//! cycle invalidates the session exactly once no matter how many callers were
//! waiting.

mod metrics;

pub use metrics::RefreshMetrics;

// std
use std::mem;
// crates.io
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	credential::{Credential, TokenSecret},
	events::{SessionEvents, SessionNotice},
	obs::{self, PipelineSpan, StageKind, StageOutcome},
	renew::RenewalClient,
	store::CredentialStore,
};

const ABORTED_REASON: &str = "renewal cycle ended before a result was produced";

/// Result fanned out to the leader and every queued waiter of one cycle.
#[derive(Clone, Debug)]
enum CycleOutcome {
	Renewed(TokenSecret),
	Denied { reason: String },
}

type Waiter = oneshot::Sender<CycleOutcome>;

enum Ticket {
	Leader,
	Queued(oneshot::Receiver<CycleOutcome>),
}

enum RefreshState {
	Idle,
	Refreshing { waiters: Vec<Waiter> },
}

/// Single-flight coordinator for credential renewal.
///
/// Also hosts the explicit `login`/`logout` entry points: they mutate the
/// credential store under the same session guard as an in-flight renewal, so
/// an explicit logout can never race a renewal's store write.
pub struct RefreshCoordinator {
	store: Arc<CredentialStore>,
	renewal: Arc<dyn RenewalClient>,
	state: Mutex<RefreshState>,
	session_guard: AsyncMutex<()>,
	events: SessionEvents,
	metrics: Arc<RefreshMetrics>,
}
impl RefreshCoordinator {
	/// Creates a coordinator over the provided store and renewal client.
	pub fn new(store: Arc<CredentialStore>, renewal: Arc<dyn RenewalClient>) -> Self {
		Self {
			store,
			renewal,
			state: Mutex::new(RefreshState::Idle),
			session_guard: AsyncMutex::new(()),
			events: SessionEvents::default(),
			metrics: Default::default(),
		}
	}

	/// Returns the session notice channel.
	pub fn events(&self) -> &SessionEvents {
		&self.events
	}

	/// Returns the coordinator's activity counters.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Obtains a fresh access token, either by leading a renewal cycle or by
	/// joining the one already in flight.
	///
	/// Resolves with the replacement access token on success and
	/// [`Error::AuthenticationFailed`] when the cycle invalidated the session.
	pub async fn request_refresh(&self) -> Result<TokenSecret> {
		const KIND: StageKind = StageKind::Renew;

		let span = PipelineSpan::new(KIND, "request_refresh");

		obs::record_stage_outcome(KIND, StageOutcome::Attempt);

		let result = span
			.instrument(async move {
				match self.claim_cycle() {
					Ticket::Queued(ticket) => {
						self.metrics.record_queued();

						match ticket.await {
							Ok(CycleOutcome::Renewed(token)) => Ok(token),
							Ok(CycleOutcome::Denied { reason }) =>
								Err(Error::AuthenticationFailed { reason }),
							// The cycle's sender vanished without settling; the
							// drop guard should make this unreachable, but a
							// torn-down coordinator still lands here.
							Err(_) => Err(Error::AuthenticationFailed {
								reason: ABORTED_REASON.into(),
							}),
						}
					},
					Ticket::Leader => {
						self.metrics.record_cycle();

						let guard = CycleGuard::new(self);
						let outcome = self.run_cycle().await;

						guard.settle(outcome.clone());

						match outcome {
							CycleOutcome::Renewed(token) => Ok(token),
							CycleOutcome::Denied { reason } =>
								Err(Error::AuthenticationFailed { reason }),
						}
					},
				}
			})
			.await;

		match &result {
			Ok(_) => obs::record_stage_outcome(KIND, StageOutcome::Success),
			Err(_) => obs::record_stage_outcome(KIND, StageOutcome::Failure),
		}

		result
	}

	/// Stores a freshly issued credential, serialized against any in-flight
	/// renewal, and announces the authenticated session.
	pub async fn login(&self, credential: Credential, durable: bool) -> Result<()> {
		let _session = self.session_guard.lock().await;

		self.store.set(credential, durable).await?;
		self.events.publish(SessionNotice { authenticated: true });

		Ok(())
	}

	/// Clears both credential slots, serialized against any in-flight renewal,
	/// and announces the invalidated session.
	pub async fn logout(&self) -> Result<()> {
		let _session = self.session_guard.lock().await;

		self.store.clear().await?;
		self.events.publish(SessionNotice { authenticated: false });

		Ok(())
	}

	// Observe-and-transition is one critical section with no suspension point:
	// two callers can never both see `Idle`.
	fn claim_cycle(&self) -> Ticket {
		let mut state = self.state.lock();

		match &mut *state {
			RefreshState::Idle => {
				*state = RefreshState::Refreshing { waiters: Vec::new() };

				Ticket::Leader
			},
			RefreshState::Refreshing { waiters } => {
				let (tx, rx) = oneshot::channel();

				waiters.push(tx);

				Ticket::Queued(rx)
			},
		}
	}

	async fn run_cycle(&self) -> CycleOutcome {
		let _session = self.session_guard.lock().await;
		let (refresh, durable) = match self.store.refresh_secret().await {
			Ok(Some(pair)) => pair,
			Ok(None) => return self.invalidate("no refresh token is available").await,
			Err(e) =>
				return self.invalidate(&format!("refresh token could not be read: {e}")).await,
		};
		let pair = match self.renewal.renew(refresh.expose()).await {
			Ok(pair) => pair,
			Err(e) => return self.invalidate(&e.to_string()).await,
		};
		let credential = match Credential::from_token_pair(
			pair.access_token.expose(),
			pair.refresh_token.expose(),
		) {
			// The replacement credential inherits the durability of the slot it
			// replaces.
			Ok(credential) => credential.with_durable(durable),
			Err(e) =>
				return self.invalidate(&format!("renewed access token is undecodable: {e}")).await,
		};
		let token = credential.access_token.clone();

		if let Err(e) = self.store.set(credential, durable).await {
			return self.invalidate(&format!("renewed credential could not be stored: {e}")).await;
		}

		self.metrics.record_renewed();

		CycleOutcome::Renewed(token)
	}

	// A failed renewal ends the session: wipe both slots and notify once per
	// cycle, never once per waiter.
	async fn invalidate(&self, reason: &str) -> CycleOutcome {
		let _ = self.store.clear().await;

		self.events.publish(SessionNotice { authenticated: false });
		self.metrics.record_denied();

		CycleOutcome::Denied { reason: reason.to_owned() }
	}

	// Fan-out happens while the state lock is held, so the next cycle cannot
	// begin until every waiter from this one has been notified, in arrival
	// order. Waiters whose callers were cancelled are retired silently by the
	// failed `send`.
	fn finish_cycle(&self, outcome: CycleOutcome) {
		let mut state = self.state.lock();
		let waiters = match mem::replace(&mut *state, RefreshState::Idle) {
			RefreshState::Refreshing { waiters } => waiters,
			RefreshState::Idle => Vec::new(),
		};

		for waiter in waiters {
			let _ = waiter.send(outcome.clone());
		}
	}
}
impl Debug for RefreshCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = match *self.state.lock() {
			RefreshState::Idle => "Idle",
			RefreshState::Refreshing { .. } => "Refreshing",
		};

		f.debug_struct("RefreshCoordinator").field("state", &state).finish()
	}
}

// Settles the cycle even when the leader's future is dropped mid-renewal, so
// queued waiters are rejected instead of stranded. The abort path does not
// publish a session notice; the session was not invalidated, the leader merely
// went away.
struct CycleGuard<'a> {
	coordinator: &'a RefreshCoordinator,
	armed: bool,
}
impl<'a> CycleGuard<'a> {
	fn new(coordinator: &'a RefreshCoordinator) -> Self {
		Self { coordinator, armed: true }
	}

	fn settle(mut self, outcome: CycleOutcome) {
		self.armed = false;
		self.coordinator.finish_cycle(outcome);
	}
}
impl Drop for CycleGuard<'_> {
	fn drop(&mut self) {
		if self.armed {
			self.coordinator
				.finish_cycle(CycleOutcome::Denied { reason: ABORTED_REASON.into() });
		}
	}
}

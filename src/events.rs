//! Session lifecycle broadcast consumed by the surrounding UI/session layer.

// crates.io
use tokio::sync::broadcast;

/// Broadcast payload describing the session's authentication state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionNotice {
	/// `false` when the session has been invalidated and re-login is required.
	pub authenticated: bool,
}

/// Broadcast channel for session notices.
///
/// Publishing with zero subscribers is a no-op; the pipeline never requires a
/// listener to make progress.
#[derive(Clone, Debug)]
pub struct SessionEvents {
	tx: broadcast::Sender<SessionNotice>,
}
impl SessionEvents {
	/// Creates a channel retaining up to `capacity` undelivered notices per subscriber.
	pub fn new(capacity: usize) -> Self {
		let (tx, _) = broadcast::channel(capacity);

		Self { tx }
	}

	/// Registers a new subscriber.
	pub fn subscribe(&self) -> broadcast::Receiver<SessionNotice> {
		self.tx.subscribe()
	}

	/// Publishes a notice to every current subscriber.
	pub fn publish(&self, notice: SessionNotice) {
		let _ = self.tx.send(notice);
	}
}
impl Default for SessionEvents {
	fn default() -> Self {
		Self::new(16)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn publish_without_subscribers_is_a_no_op() {
		SessionEvents::default().publish(SessionNotice { authenticated: false });
	}

	#[tokio::test]
	async fn subscribers_receive_published_notices() {
		let events = SessionEvents::default();
		let mut rx = events.subscribe();

		events.publish(SessionNotice { authenticated: false });

		let notice = rx.recv().await.expect("Subscriber should receive the notice.");

		assert!(!notice.authenticated);
	}
}

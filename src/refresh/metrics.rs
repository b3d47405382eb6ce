// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing coordinator activity.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	cycles: AtomicU64,
	queued: AtomicU64,
	renewed: AtomicU64,
	denied: AtomicU64,
}
impl RefreshMetrics {
	/// Returns the number of renewal cycles led so far.
	pub fn cycles(&self) -> u64 {
		self.cycles.load(Ordering::Relaxed)
	}

	/// Returns the number of callers that joined an in-flight cycle instead of
	/// starting their own.
	pub fn queued(&self) -> u64 {
		self.queued.load(Ordering::Relaxed)
	}

	/// Returns the number of cycles that ended with a stored replacement credential.
	pub fn renewed(&self) -> u64 {
		self.renewed.load(Ordering::Relaxed)
	}

	/// Returns the number of cycles that ended by invalidating the session.
	pub fn denied(&self) -> u64 {
		self.denied.load(Ordering::Relaxed)
	}

	pub(crate) fn record_cycle(&self) {
		self.cycles.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_queued(&self) {
		self.queued.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_renewed(&self) {
		self.renewed.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_denied(&self) {
		self.denied.fetch_add(1, Ordering::Relaxed);
	}
}

// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters describing refresh episodes since the gateway was built.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	led: AtomicU64,
	renewed: AtomicU64,
	expired: AtomicU64,
	queued: AtomicU64,
}
impl RefreshMetrics {
	/// Episodes a leader started (at most one in flight at a time).
	pub fn attempts(&self) -> u64 {
		read(&self.led)
	}

	/// Episodes that renewed the access credential.
	pub fn successes(&self) -> u64 {
		read(&self.renewed)
	}

	/// Episodes that ended the session.
	pub fn failures(&self) -> u64 {
		read(&self.expired)
	}

	/// Requests that waited behind an in-flight refresh.
	pub fn queued(&self) -> u64 {
		read(&self.queued)
	}

	pub(crate) fn record_attempt(&self) {
		bump(&self.led);
	}

	pub(crate) fn record_success(&self) {
		bump(&self.renewed);
	}

	pub(crate) fn record_failure(&self) {
		bump(&self.expired);
	}

	pub(crate) fn record_queued(&self) {
		bump(&self.queued);
	}
}

fn read(counter: &AtomicU64) -> u64 {
	counter.load(Ordering::Relaxed)
}

fn bump(counter: &AtomicU64) {
	counter.fetch_add(1, Ordering::Relaxed);
}

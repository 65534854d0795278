//! Session-expired notification port supplied by the hosting application.
//!
//! The gateway calls [`SessionExpiredNotifier::session_expired`] at most once per failed
//! refresh episode, and skips the call entirely while the host reports it is already showing
//! its login surface.

// std
use std::sync::atomic::{AtomicBool, Ordering};
// self
use crate::_prelude::*;

/// Event handed to the notifier when a session cannot be recovered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionExpired {
	/// Why the session ended.
	pub reason: String,
	/// When the gateway gave up on the session.
	pub at: OffsetDateTime,
}
impl SessionExpired {
	/// Creates an event stamped with the current clock.
	pub fn new(reason: impl Into<String>) -> Self {
		Self { reason: reason.into(), at: OffsetDateTime::now_utc() }
	}
}

/// Host hook invoked when credentials are gone for good (typically a redirect to login).
pub trait SessionExpiredNotifier
where
	Self: Send + Sync,
{
	/// Returns `true` while the host is already on its login surface.
	fn is_at_login(&self) -> bool {
		false
	}

	/// Handles the end of the session.
	fn session_expired(&self, event: &SessionExpired);
}

/// Notifier that ignores every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotifier;
impl SessionExpiredNotifier for NoopNotifier {
	fn session_expired(&self, _event: &SessionExpired) {}
}

/// Adapts a closure into a [`SessionExpiredNotifier`].
pub struct FnNotifier<F>(F);
impl<F> FnNotifier<F>
where
	F: Fn(&SessionExpired) + Send + Sync,
{
	/// Wraps the closure.
	pub fn new(f: F) -> Self {
		Self(f)
	}
}
impl<F> SessionExpiredNotifier for FnNotifier<F>
where
	F: Fn(&SessionExpired) + Send + Sync,
{
	fn session_expired(&self, event: &SessionExpired) {
		(self.0)(event)
	}
}
impl<F> Debug for FnNotifier<F> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("FnNotifier(..)")
	}
}

/// Notifier that records events and lets callers toggle the at-login flag; meant for tests
/// and demos.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
	events: Mutex<Vec<SessionExpired>>,
	at_login: AtomicBool,
}
impl RecordingNotifier {
	/// Returns the recorded events, oldest first.
	pub fn events(&self) -> Vec<SessionExpired> {
		self.events.lock().clone()
	}

	/// Returns how many times the notifier fired.
	pub fn count(&self) -> usize {
		self.events.lock().len()
	}

	/// Simulates the host navigating to (or away from) its login surface.
	pub fn set_at_login(&self, at_login: bool) {
		self.at_login.store(at_login, Ordering::SeqCst);
	}
}
impl SessionExpiredNotifier for RecordingNotifier {
	fn is_at_login(&self) -> bool {
		self.at_login.load(Ordering::SeqCst)
	}

	fn session_expired(&self, event: &SessionExpired) {
		self.events.lock().push(event.clone());
	}
}

//! Single-flight credential refresh with ordered replay of the requests queued behind it.
//!
//! The first request to see a 401 while the coordinator is idle becomes the episode's leader:
//! it flips the phase to [`RefreshPhase::Refreshing`] under the state lock, calls the refresh
//! endpoint, and settles the episode. Every 401 observed while an episode is in flight is
//! queued (FIFO) and parked on a oneshot channel instead of issuing another refresh.
//!
//! - On success the new access credential is written to the store, the phase returns to idle,
//!   and the leader replays its own request followed by the queue in arrival order, each marked
//!   as replayed so a second 401 is terminal.
//! - On failure (including a missing refresh credential or an elapsed refresh timeout) the
//!   store is cleared, the phase returns to idle, every queued request is rejected with
//!   [`Error::AuthExpired`], and the session-expired notifier fires once.
//!
//! A leader future dropped mid-episode resets the coordinator through its episode guard, which
//! rejects the queue rather than leaving it parked forever.
//!
//! Every episode is stamped with the coordinator's session epoch. Logout and login end the
//! epoch; a leader whose refresh completes under an ended epoch neither stores the renewed
//! credential nor touches the store on failure, and fails instead of replaying.

mod metrics;

pub use self::metrics::RefreshMetrics;

// crates.io
use futures::future;
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	auth::{Credential, TokenSecret},
	envelope::{ApiResponse, Envelope},
	error::TransportError,
	gateway::Gateway,
	http::{ApiRequest, HttpTransport},
	notify::SessionExpired,
	obs::{self, OpKind, OpOutcome, OpSpan},
};

type Responder = oneshot::Sender<Result<ApiResponse>>;

/// Phase of the refresh state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshPhase {
	/// No refresh in flight.
	Idle,
	/// A leader is renewing the access credential.
	Refreshing,
}

/// Refresh state owned by one gateway.
#[derive(Debug)]
pub struct RefreshCoordinator {
	state: Mutex<RefreshState>,
	max_pending: usize,
}
impl RefreshCoordinator {
	/// Creates an idle coordinator that queues at most `max_pending` requests per episode.
	pub fn new(max_pending: usize) -> Self {
		Self { state: Mutex::new(RefreshState::default()), max_pending }
	}

	/// Returns the current phase.
	pub fn phase(&self) -> RefreshPhase {
		self.state.lock().phase
	}

	/// Returns how many requests are queued behind the in-flight refresh.
	pub fn pending(&self) -> usize {
		self.state.lock().queue.len()
	}

	/// Returns `true` once [`close`](Self::close) was called.
	pub fn is_closed(&self) -> bool {
		self.state.lock().closed
	}

	/// Rejects every queued request with [`Error::AuthExpired`]; the in-flight refresh, if any,
	/// keeps running. Returns the number of rejected requests.
	pub fn reject_pending(&self, reason: &str) -> usize {
		let pending: Vec<_> = self.state.lock().queue.drain(..).collect();

		reject_all(pending, reason)
	}

	/// Ends the current session epoch and rejects the queue. A refresh still in flight finishes
	/// as a failure and leaves nothing behind in the store.
	pub fn end_session(&self, reason: &str) -> usize {
		let pending: Vec<_> = {
			let mut state = self.state.lock();

			state.epoch += 1;

			state.queue.drain(..).collect()
		};

		reject_all(pending, reason)
	}

	/// Stops admitting new episodes and rejects the queue. Later 401s fail immediately with
	/// [`Error::AuthExpired`]; an in-flight leader still completes its own episode.
	pub fn close(&self, reason: &str) -> usize {
		let pending: Vec<_> = {
			let mut state = self.state.lock();

			state.closed = true;

			state.queue.drain(..).collect()
		};

		reject_all(pending, reason)
	}

	fn is_current(&self, epoch: u64) -> bool {
		self.state.lock().epoch == epoch
	}

	fn admit(&self, request: &ApiRequest) -> Admission {
		let mut state = self.state.lock();
		let phase = state.phase;

		if state.closed {
			return Admission::Closed;
		}

		match phase {
			RefreshPhase::Idle => {
				state.phase = RefreshPhase::Refreshing;

				Admission::Leader(state.epoch)
			},
			RefreshPhase::Refreshing if state.queue.len() >= self.max_pending =>
				Admission::Rejected,
			RefreshPhase::Refreshing => {
				let (responder, receiver) = oneshot::channel();

				state.queue.push_back(PendingRequest { request: request.clone(), responder });

				Admission::Follower(receiver)
			},
		}
	}

	/// Returns to idle and hands back the queue in arrival order.
	fn settle(&self) -> Vec<PendingRequest> {
		let mut state = self.state.lock();

		state.phase = RefreshPhase::Idle;

		state.queue.drain(..).collect()
	}
}

#[derive(Debug)]
struct RefreshState {
	phase: RefreshPhase,
	queue: VecDeque<PendingRequest>,
	epoch: u64,
	closed: bool,
}
impl Default for RefreshState {
	fn default() -> Self {
		Self { phase: RefreshPhase::Idle, queue: VecDeque::new(), epoch: 0, closed: false }
	}
}

/// A request parked until the in-flight refresh settles.
struct PendingRequest {
	request: ApiRequest,
	responder: Responder,
}
impl PendingRequest {
	fn reject(self, reason: &str) {
		// A closed receiver means the caller stopped waiting.
		let _ = self.responder.send(Err(Error::auth_expired(reason)));
	}
}
impl Debug for PendingRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PendingRequest")
			.field("method", &self.request.method)
			.field("path", &self.request.path)
			.finish()
	}
}

enum Admission {
	Leader(u64),
	Follower(oneshot::Receiver<Result<ApiResponse>>),
	Rejected,
	Closed,
}

/// Resets the coordinator if the leader is dropped before settling its episode.
struct EpisodeGuard<'a> {
	coordinator: &'a RefreshCoordinator,
	armed: bool,
}
impl<'a> EpisodeGuard<'a> {
	fn new(coordinator: &'a RefreshCoordinator) -> Self {
		Self { coordinator, armed: true }
	}

	fn settle(mut self) -> Vec<PendingRequest> {
		self.armed = false;

		self.coordinator.settle()
	}
}
impl Drop for EpisodeGuard<'_> {
	fn drop(&mut self) {
		if !self.armed {
			return;
		}

		let pending = self.coordinator.settle();

		tracing::warn!(queued = pending.len(), "Refresh leader dropped mid-episode.");

		reject_all(pending, "credential refresh was abandoned");
	}
}

fn reject_all(pending: Vec<PendingRequest>, reason: &str) -> usize {
	let count = pending.len();

	for request in pending {
		request.reject(reason);
	}

	count
}

#[derive(Deserialize)]
struct RefreshGrant {
	access_token: TokenSecret,
	#[serde(default)]
	refresh_token: Option<TokenSecret>,
	#[serde(default)]
	expires_in: Option<i64>,
}

impl<T> Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Routes a request that hit a 401 through the refresh state machine.
	pub(crate) async fn recover_unauthorized(
		&self,
		request: ApiRequest,
		replays: u32,
	) -> Result<ApiResponse> {
		match self.coordinator.admit(&request) {
			Admission::Leader(epoch) => self.lead_refresh(request, replays, epoch).await,
			Admission::Follower(receiver) => {
				self.refresh_metrics.record_queued();

				tracing::debug!(
					method = %request.method,
					path = %request.path,
					"Queued request behind in-flight refresh."
				);

				receiver
					.await
					.unwrap_or_else(|_| Err(Error::auth_expired("credential refresh was abandoned")))
			},
			Admission::Rejected => {
				tracing::warn!(
					max_pending = self.coordinator.max_pending,
					"Refresh queue is full; rejecting request."
				);

				Err(Error::auth_expired("too many requests are waiting for a credential refresh"))
			},
			Admission::Closed => Err(Error::auth_expired("session was shut down")),
		}
	}

	async fn lead_refresh(
		&self,
		trigger: ApiRequest,
		replays: u32,
		epoch: u64,
	) -> Result<ApiResponse> {
		const KIND: OpKind = OpKind::Refresh;

		let guard = EpisodeGuard::new(&self.coordinator);
		let span = OpSpan::new(KIND, "lead_refresh");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		let renewed = span.instrument(self.renew_access(epoch)).await;
		let outcome = match &renewed {
			Ok(Some(_)) => OpOutcome::Success,
			_ => OpOutcome::Failure,
		};

		span.record_outcome(outcome);
		obs::record_op_outcome(KIND, outcome);

		match renewed {
			Ok(Some(_)) => {
				self.refresh_metrics.record_success();

				let pending = guard.settle();

				tracing::info!(queued = pending.len(), "Credential refreshed; replaying requests.");

				self.replay(trigger, pending, replays + 1).await
			},
			Ok(None) => {
				self.refresh_metrics.record_failure();

				tracing::info!("Session ended during credential refresh; discarding the result.");

				let reason = "session ended during credential refresh";

				reject_all(guard.settle(), reason);

				Err(Error::auth_expired(reason))
			},
			Err(err) => {
				self.refresh_metrics.record_failure();

				let reason = match &err {
					Error::AuthExpired { reason } => reason.clone(),
					other => format!("credential refresh failed: {other}"),
				};

				// A replaced or ended session owns the store now.
				if !self.coordinator.is_current(epoch) {
					tracing::info!(%reason, "Credential refresh failed after the session ended.");

					reject_all(guard.settle(), &reason);

					return Err(Error::auth_expired(reason));
				}

				tracing::warn!(%reason, "Credential refresh failed; ending session.");

				if let Err(store_err) = self.store.clear_all().await {
					tracing::error!(error = %store_err, "Failed to clear credentials.");
				}

				reject_all(guard.settle(), &reason);
				self.notify_session_expired(&reason);

				Err(Error::auth_expired(reason))
			},
		}
	}

	/// Starts the trigger's replay, then each queued replay in arrival order; every queued
	/// caller is answered as soon as its own replay settles.
	async fn replay(
		&self,
		trigger: ApiRequest,
		pending: Vec<PendingRequest>,
		replays: u32,
	) -> Result<ApiResponse> {
		let queued = future::join_all(pending.into_iter().map(|pending| async move {
			let PendingRequest { request, responder } = pending;
			let result = self.dispatch_attempt(request, replays).await;

			// A closed receiver means the caller stopped waiting.
			let _ = responder.send(result);
		}));
		let (result, _) = future::join(self.dispatch_attempt(trigger, replays), queued).await;

		result
	}

	/// Exchanges the stored refresh credential for a new access credential and stores it.
	///
	/// Returns `Ok(None)` without storing anything when the session epoch ended while the
	/// refresh call was in flight.
	async fn renew_access(&self, epoch: u64) -> Result<Option<Credential>> {
		let refresh = self
			.store
			.refresh()
			.await?
			.filter(|token| !token.is_blank())
			.ok_or_else(|| Error::auth_expired("no refresh credential is stored"))?;
		let request = ApiRequest::post(self.config.endpoints.refresh.as_str()).with_bearer(&refresh);
		let timeout = self.config.refresh_timeout;
		let reply = tokio::time::timeout(timeout.unsigned_abs(), self.transport.send(request))
			.await
			.map_err(|_| TransportError::Timeout { timeout })??;

		if !reply.is_success() {
			return Err(Error::http(reply.status));
		}

		let grant: RefreshGrant =
			Envelope::decode(reply.status, &reply.body)?.into_result(reply.status)?.data_as()?;

		if grant.access_token.is_blank() {
			return Err(Error::auth_expired("refresh endpoint returned an empty access token"));
		}

		let credential = Credential::new(grant.access_token)
			.with_expires_in(Duration::seconds(grant.expires_in.unwrap_or_default()));

		if !self.coordinator.is_current(epoch) {
			return Ok(None);
		}

		self.store.set_access(credential.clone()).await?;

		if let Some(rotated) = grant.refresh_token.filter(|token| !token.is_blank()) {
			self.store.set_refresh(rotated).await?;
		}

		Ok(Some(credential))
	}

	/// Invokes the notifier unless the host is already on its login surface.
	pub(crate) fn notify_session_expired(&self, reason: &str) {
		if self.notifier.is_at_login() {
			tracing::debug!("Host is already at login; skipping session-expired notification.");

			return;
		}

		self.notifier.session_expired(&SessionExpired::new(reason));
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn admission_elects_one_leader_and_queues_the_rest() {
		let coordinator = RefreshCoordinator::new(2);
		let request = ApiRequest::get("/tasks/");

		assert!(matches!(coordinator.admit(&request), Admission::Leader(0)));
		assert_eq!(coordinator.phase(), RefreshPhase::Refreshing);
		assert!(matches!(coordinator.admit(&request), Admission::Follower(_)));
		assert!(matches!(coordinator.admit(&request), Admission::Follower(_)));
		assert!(matches!(coordinator.admit(&request), Admission::Rejected));
		assert_eq!(coordinator.pending(), 2);

		let pending = coordinator.settle();

		assert_eq!(pending.len(), 2);
		assert_eq!(coordinator.phase(), RefreshPhase::Idle);
		assert_eq!(coordinator.pending(), 0);
	}

	#[tokio::test]
	async fn dropped_leader_rejects_the_queue() {
		let coordinator = RefreshCoordinator::new(8);
		let request = ApiRequest::get("/groups/");

		assert!(matches!(coordinator.admit(&request), Admission::Leader(_)));

		let guard = EpisodeGuard::new(&coordinator);
		let Admission::Follower(receiver) = coordinator.admit(&request) else {
			panic!("Second admission should queue behind the leader.");
		};

		drop(guard);

		let result = receiver.await.expect("Guard should answer the queued request.");

		assert!(result.expect_err("Abandoned refresh should reject.").is_auth_expired());
		assert_eq!(coordinator.phase(), RefreshPhase::Idle);
	}

	#[tokio::test]
	async fn reject_pending_answers_every_waiter() {
		let coordinator = RefreshCoordinator::new(8);
		let request = ApiRequest::get("/results/");

		assert!(matches!(coordinator.admit(&request), Admission::Leader(_)));

		let receivers: Vec<_> = (0..3)
			.map(|_| match coordinator.admit(&request) {
				Admission::Follower(receiver) => receiver,
				_ => panic!("Admissions during refresh should queue."),
			})
			.collect();

		assert_eq!(coordinator.reject_pending("session was shut down"), 3);

		for receiver in receivers {
			let err = receiver
				.await
				.expect("Rejected waiter should receive an answer.")
				.expect_err("Rejected waiter should observe an error.");

			assert!(matches!(err, Error::AuthExpired { ref reason } if reason == "session was shut down"));
		}

		assert_eq!(coordinator.phase(), RefreshPhase::Refreshing);
	}

	#[tokio::test]
	async fn ending_the_session_outdates_the_running_episode() {
		let coordinator = RefreshCoordinator::new(8);
		let request = ApiRequest::get("/files/");
		let Admission::Leader(epoch) = coordinator.admit(&request) else {
			panic!("Idle coordinator should elect a leader.");
		};
		let Admission::Follower(receiver) = coordinator.admit(&request) else {
			panic!("Second admission should queue behind the leader.");
		};

		assert!(coordinator.is_current(epoch));
		assert_eq!(coordinator.end_session("session ended by logout"), 1);
		assert!(!coordinator.is_current(epoch));

		let err = receiver
			.await
			.expect("Ended session should answer the waiter.")
			.expect_err("Ended session should reject the waiter.");

		assert!(matches!(err, Error::AuthExpired { ref reason } if reason == "session ended by logout"));

		coordinator.settle();

		assert!(matches!(coordinator.admit(&request), Admission::Leader(next) if next == epoch + 1));
	}

	#[test]
	fn closed_coordinator_admits_nobody() {
		let coordinator = RefreshCoordinator::new(8);
		let request = ApiRequest::get("/websites/");

		assert_eq!(coordinator.close("session was shut down"), 0);
		assert!(coordinator.is_closed());
		assert!(matches!(coordinator.admit(&request), Admission::Closed));
		assert_eq!(coordinator.phase(), RefreshPhase::Idle);
	}
}

//! The authenticated request gateway and its operations.

pub mod dispatch;
pub mod refresh;
pub mod session;

pub use dispatch::*;
pub use refresh::*;

// self
use crate::{
	_prelude::*,
	config::GatewayConfig,
	http::HttpTransport,
	notify::SessionExpiredNotifier,
	store::CredentialStore,
};
#[cfg(feature = "reqwest")]
use crate::{error::ConfigError, http::ReqwestTransport};

#[cfg(feature = "reqwest")]
/// Gateway specialized for the crate's default reqwest transport.
pub type ReqwestGateway = Gateway<ReqwestTransport>;

/// Wraps an [`HttpTransport`] with bearer injection and coordinated credential refresh.
///
/// The gateway owns its [`RefreshCoordinator`], so two gateways never share refresh state.
/// Clones share everything (transport, store, notifier, coordinator) and can be handed to as
/// many tasks as needed.
pub struct Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Transport used for every outbound request, including refresh calls.
	pub transport: Arc<T>,
	/// Credential store treated as the sole source of truth for tokens.
	pub store: Arc<dyn CredentialStore>,
	/// Host hook told when the session cannot be recovered.
	pub notifier: Arc<dyn SessionExpiredNotifier>,
	/// Validated configuration.
	pub config: Arc<GatewayConfig>,
	/// Shared counters for refresh episodes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	coordinator: Arc<RefreshCoordinator>,
	session_guard: Arc<AsyncMutex<()>>,
}
impl<T> Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a gateway around a caller-provided transport.
	pub fn with_transport(
		config: GatewayConfig,
		transport: impl Into<Arc<T>>,
		store: Arc<dyn CredentialStore>,
		notifier: Arc<dyn SessionExpiredNotifier>,
	) -> Self {
		let coordinator = Arc::new(RefreshCoordinator::new(config.max_pending));

		Self {
			transport: transport.into(),
			store,
			notifier,
			config: Arc::new(config),
			refresh_metrics: Default::default(),
			coordinator,
			session_guard: Default::default(),
		}
	}

	/// Returns the coordinator's current phase.
	pub fn refresh_phase(&self) -> RefreshPhase {
		self.coordinator.phase()
	}

	/// Returns `true` once [`shutdown`](Self::shutdown) was called.
	pub fn is_shut_down(&self) -> bool {
		self.coordinator.is_closed()
	}

	/// Returns how many requests are waiting behind an in-flight refresh.
	pub fn pending_requests(&self) -> usize {
		self.coordinator.pending()
	}

	/// Tears the session down: every request queued behind an in-flight refresh is rejected
	/// with [`Error::AuthExpired`]. Returns the number of rejected requests.
	///
	/// The gateway stays usable for requests that do not need a refresh, but it no longer starts
	/// refresh episodes: any later 401 fails immediately with [`Error::AuthExpired`]. An episode
	/// already in flight still finishes for its leader.
	pub fn shutdown(&self) -> usize {
		let rejected = self.coordinator.close("session was shut down");

		if rejected > 0 {
			tracing::info!(rejected, "Rejected queued requests during shutdown.");
		}

		rejected
	}
}
#[cfg(feature = "reqwest")]
impl Gateway<ReqwestTransport> {
	/// Creates a gateway that provisions its own reqwest-backed transport.
	pub fn new(
		config: GatewayConfig,
		store: Arc<dyn CredentialStore>,
		notifier: Arc<dyn SessionExpiredNotifier>,
	) -> Result<Self, ConfigError> {
		let transport = ReqwestTransport::from_config(&config)?;

		Ok(Self::with_transport(config, transport, store, notifier))
	}
}
impl<T> Clone for Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			store: self.store.clone(),
			notifier: self.notifier.clone(),
			config: self.config.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
			coordinator: self.coordinator.clone(),
			session_guard: self.session_guard.clone(),
		}
	}
}
impl<T> Debug for Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Gateway")
			.field("base_url", &self.config.base_url.as_str())
			.field("refresh_phase", &self.refresh_phase())
			.field("pending_requests", &self.pending_requests())
			.finish()
	}
}

//! Credential store contract and built-in store implementations.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{Credential, TokenSecret, UserProfile},
};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend the gateway treats as the sole source of truth for credentials.
///
/// Implementations must stay consistent under concurrent callers: every operation observes
/// either the state before or after any other operation, never a mix of the two.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Returns the current access credential, if any.
	fn access(&self) -> StoreFuture<'_, Option<Credential>>;

	/// Returns the current refresh credential, if any.
	fn refresh(&self) -> StoreFuture<'_, Option<TokenSecret>>;

	/// Replaces the access credential.
	fn set_access(&self, credential: Credential) -> StoreFuture<'_, ()>;

	/// Replaces the refresh credential.
	fn set_refresh(&self, token: TokenSecret) -> StoreFuture<'_, ()>;

	/// Returns the last-known user profile, if any.
	fn profile(&self) -> StoreFuture<'_, Option<UserProfile>>;

	/// Replaces the last-known user profile.
	fn set_profile(&self, profile: UserProfile) -> StoreFuture<'_, ()>;

	/// Replaces the whole session in one step.
	fn save_session(&self, session: StoredSession) -> StoreFuture<'_, ()>;

	/// Removes every credential and the profile.
	fn clear_all(&self) -> StoreFuture<'_, ()>;
}

/// Everything a store persists for one signed-in session.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StoredSession {
	/// Access credential.
	#[serde(default)]
	pub access: Option<Credential>,
	/// Refresh credential.
	#[serde(default)]
	pub refresh: Option<TokenSecret>,
	/// Last-known user profile.
	#[serde(default)]
	pub profile: Option<UserProfile>,
}
impl StoredSession {
	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.access.is_none() && self.refresh.is_none() && self.profile.is_none()
	}
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

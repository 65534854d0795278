//! Thread-safe in-memory [`CredentialStore`] implementation for tests and short-lived hosts.

// self
use crate::{
	_prelude::*,
	auth::{Credential, TokenSecret, UserProfile},
	store::{CredentialStore, StoreFuture, StoredSession},
};

/// Storage backend that keeps the session in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<StoredSession>>);
impl MemoryStore {
	/// Creates a store seeded with an existing session.
	pub fn with_session(session: StoredSession) -> Self {
		Self(Arc::new(RwLock::new(session)))
	}

	/// Returns a copy of the stored session.
	pub fn snapshot(&self) -> StoredSession {
		self.0.read().clone()
	}

	fn update(
		session: Arc<RwLock<StoredSession>>,
		f: impl 'static + Send + FnOnce(&mut StoredSession),
	) -> StoreFuture<'static, ()> {
		Box::pin(async move {
			f(&mut session.write());

			Ok(())
		})
	}
}
impl CredentialStore for MemoryStore {
	fn access(&self) -> StoreFuture<'_, Option<Credential>> {
		let session = self.0.clone();

		Box::pin(async move { Ok(session.read().access.clone()) })
	}

	fn refresh(&self) -> StoreFuture<'_, Option<TokenSecret>> {
		let session = self.0.clone();

		Box::pin(async move { Ok(session.read().refresh.clone()) })
	}

	fn set_access(&self, credential: Credential) -> StoreFuture<'_, ()> {
		Self::update(self.0.clone(), move |session| session.access = Some(credential))
	}

	fn set_refresh(&self, token: TokenSecret) -> StoreFuture<'_, ()> {
		Self::update(self.0.clone(), move |session| session.refresh = Some(token))
	}

	fn profile(&self) -> StoreFuture<'_, Option<UserProfile>> {
		let session = self.0.clone();

		Box::pin(async move { Ok(session.read().profile.clone()) })
	}

	fn set_profile(&self, profile: UserProfile) -> StoreFuture<'_, ()> {
		Self::update(self.0.clone(), move |session| session.profile = Some(profile))
	}

	fn save_session(&self, session: StoredSession) -> StoreFuture<'_, ()> {
		Self::update(self.0.clone(), move |current| *current = session)
	}

	fn clear_all(&self) -> StoreFuture<'_, ()> {
		Self::update(self.0.clone(), move |session| *session = StoredSession::default())
	}
}

//! File-backed [`CredentialStore`] that survives restarts of the host application.

// std
use std::{
	fs::{self, File},
	io::{BufWriter, ErrorKind, Write},
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{Credential, TokenSecret, UserProfile},
	store::{CredentialStore, StoreError, StoreFuture, StoredSession},
};

/// Persists the session as a JSON snapshot.
///
/// The snapshot is read once in [`FileStore::open`]; afterwards the in-memory copy is
/// authoritative. Every mutation writes a sibling `*.tmp` file and renames it over the snapshot,
/// and the in-memory copy only changes once that rename succeeded.
///
/// Writes are synchronous and run on the calling task while the snapshot lock is held, so
/// concurrent writers are applied in order and readers never observe a snapshot the disk does
/// not hold. The snapshot is a few hundred bytes and is only written on login, logout, and
/// refresh; hosts that keep it on slow storage should wrap the store and move writes onto a
/// blocking pool.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	session: Arc<RwLock<StoredSession>>,
}
impl FileStore {
	/// Opens the snapshot at `path`, creating parent directories as needed. A missing or empty
	/// file yields an empty session.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		create_parent(&path)?;

		let session = read_snapshot(&path)?;

		Ok(Self { path, session: Arc::new(RwLock::new(session)) })
	}

	/// Returns the snapshot path.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn write_snapshot(&self, session: &StoredSession) -> Result<(), StoreError> {
		create_parent(&self.path)?;

		let staging = self.path.with_extension("tmp");
		let file = File::create(&staging).map_err(backend("create", &staging))?;
		let mut writer = BufWriter::new(file);

		serde_json::to_writer_pretty(&mut writer, session).map_err(|e| {
			StoreError::Serialization { message: format!("Failed to encode session snapshot: {e}") }
		})?;
		writer.flush().map_err(backend("write", &staging))?;
		writer.get_ref().sync_all().map_err(backend("sync", &staging))?;
		fs::rename(&staging, &self.path).map_err(backend("replace", &self.path))
	}

	fn mutate(&self, apply: impl FnOnce(&mut StoredSession)) -> Result<(), StoreError> {
		let mut current = self.session.write();
		let mut next = current.clone();

		apply(&mut next);
		self.write_snapshot(&next)?;

		*current = next;

		Ok(())
	}

	fn read<T>(&self, get: impl FnOnce(&StoredSession) -> T) -> T {
		get(&self.session.read())
	}
}
impl CredentialStore for FileStore {
	fn access(&self) -> StoreFuture<'_, Option<Credential>> {
		Box::pin(async move { Ok(self.read(|s| s.access.clone())) })
	}

	fn refresh(&self) -> StoreFuture<'_, Option<TokenSecret>> {
		Box::pin(async move { Ok(self.read(|s| s.refresh.clone())) })
	}

	fn set_access(&self, credential: Credential) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.mutate(|s| s.access = Some(credential)) })
	}

	fn set_refresh(&self, token: TokenSecret) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.mutate(|s| s.refresh = Some(token)) })
	}

	fn profile(&self) -> StoreFuture<'_, Option<UserProfile>> {
		Box::pin(async move { Ok(self.read(|s| s.profile.clone())) })
	}

	fn set_profile(&self, profile: UserProfile) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.mutate(|s| s.profile = Some(profile)) })
	}

	fn save_session(&self, session: StoredSession) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.mutate(|s| *s = session) })
	}

	fn clear_all(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.mutate(|s| *s = StoredSession::default()) })
	}
}

fn backend<'a>(action: &'a str, path: &'a Path) -> impl 'a + FnOnce(std::io::Error) -> StoreError {
	move |e| StoreError::Backend { message: format!("Failed to {action} {}: {e}", path.display()) }
}

fn create_parent(path: &Path) -> Result<(), StoreError> {
	match path.parent() {
		Some(parent) if !parent.as_os_str().is_empty() =>
			fs::create_dir_all(parent).map_err(backend("create directory", parent)),
		_ => Ok(()),
	}
}

fn read_snapshot(path: &Path) -> Result<StoredSession, StoreError> {
	let bytes = match fs::read(path) {
		Ok(bytes) => bytes,
		Err(e) if e.kind() == ErrorKind::NotFound => return Ok(StoredSession::default()),
		Err(e) => return Err(backend("read", path)(e)),
	};

	if bytes.iter().all(u8::is_ascii_whitespace) {
		return Ok(StoredSession::default());
	}

	serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
		message: format!("Snapshot {} is not a valid session: {e}", path.display()),
	})
}

#[cfg(test)]
mod tests {
	// std
	use std::env;
	// self
	use super::*;

	struct Scratch(PathBuf);
	impl Scratch {
		fn new(name: &str) -> Self {
			let dir = env::temp_dir().join(format!(
				"monitor-gateway-{name}-{}",
				OffsetDateTime::now_utc().unix_timestamp_nanos()
			));

			Self(dir)
		}

		fn snapshot(&self) -> PathBuf {
			self.0.join("session.json")
		}
	}
	impl Drop for Scratch {
		fn drop(&mut self) {
			let _ = fs::remove_dir_all(&self.0);
		}
	}

	#[tokio::test]
	async fn session_survives_reopen() {
		let scratch = Scratch::new("reopen");
		let store = FileStore::open(scratch.snapshot()).expect("Snapshot should open.");

		store
			.save_session(StoredSession {
				access: Some(Credential::new("access-token").with_expires_in(Duration::hours(24))),
				refresh: Some(TokenSecret::new("refresh-token")),
				profile: Some(UserProfile::new(1, "admin", "admin")),
			})
			.await
			.expect("Session should persist.");
		drop(store);

		let reopened = FileStore::open(scratch.snapshot()).expect("Snapshot should reopen.");
		let access = reopened
			.access()
			.await
			.expect("Access read should work.")
			.expect("Access credential should survive a reopen.");

		assert_eq!(access.access_token.expose(), "access-token");
		assert!(access.expires_at.is_some());
		assert_eq!(
			reopened.refresh().await.expect("Refresh read should work.").as_ref().map(TokenSecret::expose),
			Some("refresh-token")
		);
		assert!(!scratch.snapshot().with_extension("tmp").exists());

		reopened.clear_all().await.expect("Clearing should persist.");

		let cleared = FileStore::open(scratch.snapshot()).expect("Cleared snapshot should reopen.");

		assert!(cleared.read(StoredSession::is_empty));
	}

	#[tokio::test]
	async fn concurrent_writes_leave_the_last_applied_snapshot_on_disk() {
		let scratch = Scratch::new("concurrent");
		let store = FileStore::open(scratch.snapshot()).expect("Snapshot should open.");
		let writers = (0..8).map(|i| {
			let store = store.clone();

			tokio::spawn(async move {
				store
					.set_access(Credential::new(format!("access-{i}")))
					.await
					.expect("Concurrent write should persist.");
			})
		});

		for writer in writers.collect::<Vec<_>>() {
			writer.await.expect("Writer task should not panic.");
		}

		let in_memory = store.read(|s| s.access.clone()).expect("A writer should have won.");
		let on_disk = read_snapshot(&scratch.snapshot())
			.expect("Snapshot should decode.")
			.access
			.expect("Snapshot should hold the access credential.");

		assert_eq!(on_disk.access_token, in_memory.access_token);
		assert!(!scratch.snapshot().with_extension("tmp").exists());
	}

	#[test]
	fn corrupt_snapshot_is_reported() {
		let scratch = Scratch::new("corrupt");

		fs::create_dir_all(&scratch.0).expect("Scratch directory should be creatable.");
		fs::write(scratch.snapshot(), b"{not json").expect("Corrupt fixture should be writable.");

		let err = FileStore::open(scratch.snapshot()).expect_err("Corrupt snapshot should fail.");

		assert!(matches!(err, StoreError::Serialization { .. }));
	}

	#[test]
	fn missing_or_blank_snapshot_opens_empty() {
		let scratch = Scratch::new("blank");
		let store = FileStore::open(scratch.snapshot()).expect("Missing snapshot should open.");

		assert!(store.read(StoredSession::is_empty));

		fs::write(scratch.snapshot(), b"  \n").expect("Blank fixture should be writable.");

		let store = FileStore::open(scratch.snapshot()).expect("Blank snapshot should open.");

		assert!(store.read(StoredSession::is_empty));
	}
}

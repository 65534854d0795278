// std
use std::sync::Arc;
// crates.io
use time::{Duration, macros};
// self
use monitor_gateway::{
	auth::{Credential, TokenSecret, UserProfile},
	store::{CredentialStore, MemoryStore, StoredSession},
};

fn credential(token: &str) -> Credential {
	let mut credential = Credential::new(token);

	credential.issued_at = macros::datetime!(2025-11-10 12:00 UTC);

	credential.with_expires_in(Duration::hours(1))
}

#[tokio::test]
async fn access_and_refresh_are_independent() {
	let store = MemoryStore::default();

	assert!(store.access().await.expect("Reading an empty store should succeed.").is_none());

	store.set_access(credential("access-1")).await.expect("Setting access should succeed.");

	assert!(store.refresh().await.expect("Reading refresh should succeed.").is_none());

	store.set_refresh(TokenSecret::new("refresh-1")).await.expect("Setting refresh should succeed.");
	store.set_access(credential("access-2")).await.expect("Replacing access should succeed.");

	let access = store
		.access()
		.await
		.expect("Reading access should succeed.")
		.expect("Access credential should be present.");

	assert_eq!(access.access_token.expose(), "access-2");
	assert_eq!(access.expires_at, Some(macros::datetime!(2025-11-10 13:00 UTC)));
	assert!(access.is_expired_at(macros::datetime!(2025-11-10 13:00 UTC)));
	assert_eq!(
		store
			.refresh()
			.await
			.expect("Reading refresh should succeed.")
			.map(|token| token.expose().to_owned()),
		Some("refresh-1".into())
	);
}

#[tokio::test]
async fn save_session_replaces_everything_and_clear_all_empties() {
	let store = MemoryStore::with_session(StoredSession {
		access: Some(credential("old-access")),
		refresh: Some(TokenSecret::new("old-refresh")),
		profile: Some(UserProfile::new(2, "viewer", "user")),
	});

	store
		.save_session(StoredSession {
			access: Some(credential("new-access")),
			refresh: None,
			profile: Some(UserProfile::new(1, "admin", "admin")),
		})
		.await
		.expect("Saving a session should succeed.");

	let snapshot = store.snapshot();

	assert_eq!(snapshot.access.map(|c| c.access_token.expose().to_owned()), Some("new-access".into()));
	assert!(snapshot.refresh.is_none());
	assert!(snapshot.profile.is_some_and(|profile| profile.is_admin()));

	store.clear_all().await.expect("Clearing should succeed.");

	assert!(store.snapshot().is_empty());
	assert!(store.profile().await.expect("Reading profile should succeed.").is_none());
}

#[tokio::test]
async fn clones_share_state_across_tasks() {
	let store = Arc::new(MemoryStore::default());
	let writers = (0..8).map(|i| {
		let store = store.clone();

		tokio::spawn(async move {
			store
				.set_access(credential(&format!("access-{i}")))
				.await
				.expect("Concurrent write should succeed.");
		})
	});

	for writer in writers.collect::<Vec<_>>() {
		writer.await.expect("Writer task should not panic.");
	}

	let access = store
		.access()
		.await
		.expect("Reading access should succeed.")
		.expect("One of the writers should have won.");

	assert!(access.access_token.expose().starts_with("access-"));
}

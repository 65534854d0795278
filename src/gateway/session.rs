//! Session lifecycle on top of the dispatcher: login, logout, profile lookup, and restoring a
//! persisted session at startup.
//!
//! Login, logout, and restore are serialized through the gateway's session lock so a logout
//! can never interleave with a login writing fresh credentials. Login and logout also end the
//! coordinator's session epoch, so a refresh still in flight cannot write its credential into
//! the session that replaced it.

// self
use crate::{
	_prelude::*,
	auth::{Credential, TokenSecret, UserProfile},
	envelope::{ApiResponse, Envelope},
	gateway::{Gateway, dispatch},
	http::{ApiRequest, HttpReply, HttpTransport},
	obs::{self, OpKind, OpOutcome, OpSpan},
	store::StoredSession,
};

#[derive(Serialize)]
struct LoginForm<'a> {
	username: &'a str,
	password: &'a str,
}

#[derive(Deserialize)]
struct LoginGrant {
	access_token: TokenSecret,
	#[serde(default)]
	refresh_token: Option<TokenSecret>,
	#[serde(default)]
	expires_in: Option<i64>,
	#[serde(default)]
	user: Option<UserProfile>,
}

impl<T> Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Exchanges username/password for a credential pair and persists the new session.
	///
	/// When the login reply carries no user, the profile is fetched with the new access
	/// credential before anything is stored. On failure the stored credentials are left
	/// untouched. Rejected credentials surface as [`Error::Business`] carrying the API's message.
	pub async fn login(&self, username: &str, password: &str) -> Result<UserProfile> {
		const KIND: OpKind = OpKind::Login;

		let span = OpSpan::new(KIND, "login");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let _session = self.session_guard.lock().await;
				let request = ApiRequest::post(self.config.endpoints.login.as_str())
					.with_json(&LoginForm { username, password })?;
				let reply = self.transport.send(request).await?;
				let grant: LoginGrant = classify_auth_reply(reply)?.data_as()?;

				if grant.access_token.is_blank() {
					return Err(Error::Business {
						code: 500,
						message: "Login response carried an empty access token".into(),
						data: None,
					});
				}

				let access = Credential::new(grant.access_token)
					.with_expires_in(Duration::seconds(grant.expires_in.unwrap_or_default()));
				let refresh = grant.refresh_token.filter(|token| !token.is_blank());

				if refresh.is_none() {
					tracing::warn!("Login response carried no refresh credential.");
				}

				let profile = match grant.user {
					Some(profile) => profile,
					None => self.fetch_profile(&access.access_token).await?,
				};
				let ended = self.coordinator.end_session("session replaced by login");

				if ended > 0 {
					tracing::debug!(
						rejected = ended,
						"Rejected requests queued for the previous session."
					);
				}

				self.store
					.save_session(StoredSession {
						access: Some(access),
						refresh,
						profile: Some(profile.clone()),
					})
					.await?;

				tracing::info!(username = %profile.username, role = %profile.role, "Signed in.");

				Ok(profile)
			})
			.await;
		let outcome = OpOutcome::of(&result);

		span.record_outcome(outcome);
		obs::record_op_outcome(KIND, outcome);

		result
	}

	/// Ends the session.
	///
	/// The server-side logout call is best-effort and only made when an access credential
	/// exists; local credentials are cleared whatever its outcome.
	pub async fn logout(&self) -> Result<()> {
		const KIND: OpKind = OpKind::Logout;

		let span = OpSpan::new(KIND, "logout");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let _session = self.session_guard.lock().await;

				match self.store.access().await {
					Ok(Some(credential)) => {
						let request = ApiRequest::post(self.config.endpoints.logout.as_str())
							.with_bearer(&credential.access_token);

						match self.transport.send(request).await.and_then(dispatch::classify_reply) {
							Ok(_) => tracing::debug!("Server-side logout succeeded."),
							Err(err) => tracing::warn!(error = %err, "Server-side logout failed."),
						}
					},
					Ok(None) => {},
					Err(err) => tracing::warn!(error = %err, "Failed to read access credential."),
				}

				let ended = self.coordinator.end_session("session ended by logout");

				if ended > 0 {
					tracing::debug!(rejected = ended, "Rejected requests queued behind a refresh.");
				}

				self.store.clear_all().await?;

				tracing::info!("Signed out.");

				Ok(())
			})
			.await;
		let outcome = OpOutcome::of(&result);

		span.record_outcome(outcome);
		obs::record_op_outcome(KIND, outcome);

		result
	}

	/// Fetches the signed-in user's profile through the dispatcher and stores it.
	pub async fn current_user(&self) -> Result<UserProfile> {
		const KIND: OpKind = OpKind::CurrentUser;

		let span = OpSpan::new(KIND, "current_user");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let response =
					self.dispatch(ApiRequest::get(self.config.endpoints.current_user.as_str())).await?;
				let profile: UserProfile = response.data_as()?;

				self.store.set_profile(profile.clone()).await?;

				Ok(profile)
			})
			.await;
		let outcome = OpOutcome::of(&result);

		span.record_outcome(outcome);
		obs::record_op_outcome(KIND, outcome);

		result
	}

	/// Restores a persisted session at startup.
	///
	/// Returns `Ok(None)` when nothing usable is stored or the API no longer accepts the
	/// session (the store is cleared in that case). A stale access credential is renewed
	/// transparently by the dispatcher. Network failures are returned as errors and leave the
	/// stored session intact so the host can retry.
	pub async fn restore_session(&self) -> Result<Option<UserProfile>> {
		const KIND: OpKind = OpKind::Restore;

		let span = OpSpan::new(KIND, "restore_session");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let _session = self.session_guard.lock().await;
				let has_access = self.store.access().await?.is_some();
				let has_profile = self.store.profile().await?.is_some();

				if !has_access || !has_profile {
					tracing::debug!("No stored session to restore.");

					return Ok(None);
				}

				match self.current_user().await {
					Ok(profile) => {
						tracing::info!(username = %profile.username, "Session restored.");

						Ok(Some(profile))
					},
					Err(err @ (Error::Network(_) | Error::Storage(_))) => Err(err),
					Err(err) => {
						tracing::warn!(error = %err, "Stored session is no longer valid.");

						self.store.clear_all().await?;

						Ok(None)
					},
				}
			})
			.await;
		let outcome = OpOutcome::of(&result);

		span.record_outcome(outcome);
		obs::record_op_outcome(KIND, outcome);

		result
	}

	/// Merges `changes` into the stored profile and persists the result.
	///
	/// Keys naming a known profile field replace it; any other key lands in
	/// [`UserProfile::extra`]. Returns `Ok(None)` without touching the store when no profile is
	/// stored.
	pub async fn update_profile(
		&self,
		changes: serde_json::Map<String, JsonValue>,
	) -> Result<Option<UserProfile>> {
		let _session = self.session_guard.lock().await;
		let Some(current) = self.store.profile().await? else {
			tracing::debug!("No stored profile to update.");

			return Ok(None);
		};
		let updated = current.merge(changes).map_err(Error::ProfileUpdate)?;

		self.store.set_profile(updated.clone()).await?;

		Ok(Some(updated))
	}

	/// Returns `true` when both an access credential and a profile are stored.
	pub async fn is_signed_in(&self) -> Result<bool> {
		Ok(self.store.access().await?.is_some() && self.store.profile().await?.is_some())
	}

	async fn fetch_profile(&self, access_token: &TokenSecret) -> Result<UserProfile> {
		let request =
			ApiRequest::get(self.config.endpoints.current_user.as_str()).with_bearer(access_token);
		let reply = self.transport.send(request).await?;

		dispatch::classify_reply(reply)?.data_as()
	}
}

/// Like [`dispatch::classify_reply`], but error statuses that still carry an envelope surface
/// its message as a business failure (login answers bad passwords with 401 + envelope).
fn classify_auth_reply(reply: HttpReply) -> Result<ApiResponse> {
	if reply.is_success() {
		return dispatch::classify_reply(reply);
	}

	match Envelope::decode(reply.status, &reply.body) {
		Ok(envelope) if !envelope.is_success() => envelope.into_result(reply.status),
		_ => Err(Error::http(reply.status)),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn auth_reply_prefers_envelope_message_on_error_status() {
		let err = classify_auth_reply(HttpReply::new(
			401,
			r#"{"code":401,"message":"Invalid username or password","data":null}"#,
		))
		.expect_err("401 login reply should fail.");

		assert!(matches!(
			err,
			Error::Business { code: 401, ref message, .. } if message == "Invalid username or password"
		));

		let err = classify_auth_reply(HttpReply::new(502, "Bad Gateway"))
			.expect_err("Non-envelope error reply should fail.");

		assert!(matches!(err, Error::Http { status: 502, .. }));
	}
}

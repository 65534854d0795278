//! Access credential records written by login and refresh.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Access credential plus the bookkeeping the gateway keeps alongside it.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
	/// Bearer token attached to every outbound request.
	pub access_token: TokenSecret,
	/// Instant the credential was written locally.
	#[serde(with = "time::serde::rfc3339")]
	pub issued_at: OffsetDateTime,
	/// Expiry derived from the API's `expires_in`, when it supplied one.
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub expires_at: Option<OffsetDateTime>,
}
impl Credential {
	/// Creates a credential issued now with no known expiry.
	pub fn new(access_token: impl Into<TokenSecret>) -> Self {
		Self { access_token: access_token.into(), issued_at: OffsetDateTime::now_utc(), expires_at: None }
	}

	/// Sets the expiry relative to `issued_at`. Non-positive values and expiries beyond the
	/// representable range leave the expiry unknown.
	pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
		self.expires_at =
			expires_in.is_positive().then(|| self.issued_at.checked_add(expires_in)).flatten();

		self
	}

	/// Returns `true` when a known expiry lies at or before `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expires_at| instant >= expires_at)
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("access_token", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn expiry_tracks_expires_in() {
		let mut credential = Credential::new("access");

		credential.issued_at = macros::datetime!(2025-11-10 12:00 UTC);

		let credential = credential.with_expires_in(Duration::hours(24));

		assert_eq!(credential.expires_at, Some(macros::datetime!(2025-11-11 12:00 UTC)));
		assert!(!credential.is_expired_at(macros::datetime!(2025-11-11 11:59 UTC)));
		assert!(credential.is_expired_at(macros::datetime!(2025-11-11 12:00 UTC)));
	}

	#[test]
	fn unknown_expiry_never_expires_locally() {
		let credential = Credential::new("access").with_expires_in(Duration::ZERO);

		assert!(credential.expires_at.is_none());
		assert!(!credential.is_expired_at(OffsetDateTime::now_utc() + Duration::days(365)));
		assert!(!format!("{credential:?}").contains("access\""));
	}

	#[test]
	fn oversized_expires_in_leaves_expiry_unknown() {
		let credential = Credential::new("access").with_expires_in(Duration::seconds(i64::MAX));

		assert!(credential.expires_at.is_none());
		assert!(!credential.is_expired_at(OffsetDateTime::now_utc()));
	}
}

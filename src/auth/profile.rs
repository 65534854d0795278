//! Last-known user profile and the role checks the admin client performs locally.

// self
use crate::_prelude::*;

/// Role string the API assigns to administrators.
pub const ADMIN_ROLE: &str = "admin";

/// User profile returned by login and `/auth/me`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
	/// Numeric user identifier.
	pub id: i64,
	/// Login name.
	pub username: String,
	/// Role label (`admin`, `user`, ...).
	#[serde(default = "UserProfile::guest_role")]
	pub role: String,
	/// Display name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub nickname: Option<String>,
	/// Contact address.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	/// Remaining fields the API attaches; kept so profile round-trips stay lossless.
	#[serde(flatten)]
	pub extra: BTreeMap<String, JsonValue>,
}
impl UserProfile {
	/// Creates a profile with the provided identity and role.
	pub fn new(id: i64, username: impl Into<String>, role: impl Into<String>) -> Self {
		Self {
			id,
			username: username.into(),
			role: role.into(),
			nickname: None,
			email: None,
			extra: BTreeMap::new(),
		}
	}

	/// Returns `true` when the profile carries the administrator role.
	pub fn is_admin(&self) -> bool {
		self.role == ADMIN_ROLE
	}

	/// Checks whether the profile may use the given capability.
	///
	/// Administrators hold every permission. Admin-only permissions are denied to other roles;
	/// everything else is allowed for any signed-in user.
	pub fn has_permission(&self, permission: Permission) -> bool {
		self.is_admin() || !permission.is_admin_only()
	}

	/// Returns a copy with `changes` applied on top of this profile.
	///
	/// Keys naming a known field replace it (`null` clears an optional field); every other key
	/// is stored in [`extra`](Self::extra).
	pub fn merge(&self, changes: serde_json::Map<String, JsonValue>) -> serde_json::Result<Self> {
		let mut value = serde_json::to_value(self)?;

		if let JsonValue::Object(fields) = &mut value {
			fields.extend(changes);
		}

		serde_json::from_value(value)
	}

	fn guest_role() -> String {
		"guest".into()
	}
}

/// Capabilities gated in the admin client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
	/// Managing other user accounts.
	UserManagement,
	/// Editing email/system settings.
	SystemSettings,
	/// Website, task, group, result, and file screens.
	Monitoring,
}
impl Permission {
	/// Returns `true` for permissions reserved to administrators.
	pub const fn is_admin_only(self) -> bool {
		matches!(self, Self::UserManagement | Self::SystemSettings)
	}
}

//! Auth-domain models: redacted token secrets, stored credentials, and user profiles.

pub mod credential;
pub mod profile;
pub mod secret;

pub use credential::*;
pub use profile::*;
pub use secret::*;

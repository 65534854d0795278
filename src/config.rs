//! Gateway configuration: API base URL, auth endpoint paths, and the bounds applied to the
//! refresh machinery.
//!
//! Values are assembled through [`GatewayConfigBuilder`] and validated once on
//! [`build`](GatewayConfigBuilder::build), so the dispatch path never re-checks them.

// self
use crate::{_prelude::*, error::ConfigError};

/// Auth endpoint paths, relative to [`GatewayConfig::base_url`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEndpoints {
	/// Exchanges a refresh credential for a new access credential.
	pub refresh: String,
	/// Exchanges username/password for a credential pair.
	pub login: String,
	/// Invalidates the current access credential server-side.
	pub logout: String,
	/// Returns the signed-in user's profile.
	pub current_user: String,
}
impl Default for AuthEndpoints {
	fn default() -> Self {
		Self {
			refresh: "/auth/refresh".into(),
			login: "/auth/login".into(),
			logout: "/auth/logout".into(),
			current_user: "/auth/me".into(),
		}
	}
}

/// Immutable gateway configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
	/// Base URL every request path is joined onto (e.g. `https://monitor.example.com/api/`).
	pub base_url: Url,
	/// Auth endpoint paths.
	pub endpoints: AuthEndpoints,
	/// Deadline applied by the transport to every request.
	pub request_timeout: Duration,
	/// Deadline for the refresh call; elapsing counts as a failed refresh.
	pub refresh_timeout: Duration,
	/// Maximum number of requests allowed to wait behind one refresh.
	pub max_pending: usize,
}
impl GatewayConfig {
	/// Default per-request deadline.
	pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::seconds(30);
	/// Default refresh deadline.
	pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::seconds(30);
	/// Default refresh queue bound.
	pub const DEFAULT_MAX_PENDING: usize = 256;

	/// Creates a new builder for the provided base URL.
	pub fn builder(base_url: Url) -> GatewayConfigBuilder {
		GatewayConfigBuilder::new(base_url)
	}

	/// Resolves a request path against the base URL.
	///
	/// Leading slashes are stripped so paths stay below the base URL's own path
	/// (`/api/` + `/auth/me` resolves to `/api/auth/me`).
	pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
		self.base_url.join(path.trim_start_matches('/')).map_err(|source| {
			ConfigError::InvalidPath { path: path.to_owned(), source }
		})
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if !matches!(self.base_url.scheme(), "http" | "https") {
			return Err(ConfigError::UnsupportedScheme { url: self.base_url.to_string() });
		}

		validate_path("refresh", &self.endpoints.refresh)?;
		validate_path("login", &self.endpoints.login)?;
		validate_path("logout", &self.endpoints.logout)?;
		validate_path("current_user", &self.endpoints.current_user)?;
		validate_timeout("request", self.request_timeout)?;
		validate_timeout("refresh", self.refresh_timeout)?;

		if self.max_pending == 0 {
			return Err(ConfigError::ZeroPendingBound);
		}

		Ok(())
	}
}

/// Builder for [`GatewayConfig`] values.
#[derive(Debug)]
pub struct GatewayConfigBuilder {
	base_url: Url,
	endpoints: AuthEndpoints,
	request_timeout: Duration,
	refresh_timeout: Duration,
	max_pending: usize,
}
impl GatewayConfigBuilder {
	/// Creates a new builder seeded with defaults.
	pub fn new(base_url: Url) -> Self {
		let base_url = with_trailing_slash(base_url);

		Self {
			base_url,
			endpoints: AuthEndpoints::default(),
			request_timeout: GatewayConfig::DEFAULT_REQUEST_TIMEOUT,
			refresh_timeout: GatewayConfig::DEFAULT_REFRESH_TIMEOUT,
			max_pending: GatewayConfig::DEFAULT_MAX_PENDING,
		}
	}

	/// Overrides all auth endpoint paths.
	pub fn endpoints(mut self, endpoints: AuthEndpoints) -> Self {
		self.endpoints = endpoints;

		self
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.refresh = path.into();

		self
	}

	/// Overrides the per-request deadline.
	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Overrides the refresh deadline.
	pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
		self.refresh_timeout = timeout;

		self
	}

	/// Overrides the refresh queue bound.
	pub fn max_pending(mut self, max_pending: usize) -> Self {
		self.max_pending = max_pending;

		self
	}

	/// Consumes the builder and validates the resulting config.
	pub fn build(self) -> Result<GatewayConfig, ConfigError> {
		let config = GatewayConfig {
			base_url: self.base_url,
			endpoints: self.endpoints,
			request_timeout: self.request_timeout,
			refresh_timeout: self.refresh_timeout,
			max_pending: self.max_pending,
		};

		config.validate()?;

		Ok(config)
	}
}

fn with_trailing_slash(mut url: Url) -> Url {
	if !url.path().ends_with('/') {
		let path = format!("{}/", url.path());

		url.set_path(&path);
	}

	url
}

fn validate_path(endpoint: &'static str, path: &str) -> Result<(), ConfigError> {
	if path.starts_with('/') {
		Ok(())
	} else {
		Err(ConfigError::RelativeEndpoint { endpoint, path: path.to_owned() })
	}
}

fn validate_timeout(name: &'static str, timeout: Duration) -> Result<(), ConfigError> {
	if timeout.is_positive() { Ok(()) } else { Err(ConfigError::NonPositiveTimeout { name }) }
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn base() -> Url {
		Url::parse("https://monitor.example.com/api").expect("Base URL fixture should parse.")
	}

	#[test]
	fn defaults_match_the_admin_api() {
		let config = GatewayConfig::builder(base()).build().expect("Defaults should validate.");

		assert_eq!(config.base_url.as_str(), "https://monitor.example.com/api/");
		assert_eq!(config.endpoints.refresh, "/auth/refresh");
		assert_eq!(config.request_timeout, Duration::seconds(30));
		assert_eq!(config.max_pending, 256);
	}

	#[test]
	fn resolve_keeps_paths_below_the_base() {
		let config = GatewayConfig::builder(base()).build().expect("Defaults should validate.");

		assert_eq!(
			config.resolve("/auth/me").expect("Path should resolve.").as_str(),
			"https://monitor.example.com/api/auth/me"
		);
		assert_eq!(
			config.resolve("websites/").expect("Path should resolve.").as_str(),
			"https://monitor.example.com/api/websites/"
		);
	}

	#[test]
	fn builder_rejects_invalid_values() {
		let err = GatewayConfig::builder(base())
			.refresh_path("auth/refresh")
			.build()
			.expect_err("Relative refresh path should be rejected.");

		assert!(matches!(err, ConfigError::RelativeEndpoint { endpoint: "refresh", .. }));

		let err = GatewayConfig::builder(base())
			.refresh_timeout(Duration::ZERO)
			.build()
			.expect_err("Zero refresh timeout should be rejected.");

		assert!(matches!(err, ConfigError::NonPositiveTimeout { name: "refresh" }));

		let err = GatewayConfig::builder(base())
			.max_pending(0)
			.build()
			.expect_err("Zero pending bound should be rejected.");

		assert!(matches!(err, ConfigError::ZeroPendingBound));

		let ftp = Url::parse("ftp://monitor.example.com/").expect("FTP URL fixture should parse.");
		let err = GatewayConfig::builder(ftp).build().expect_err("FTP base should be rejected.");

		assert!(matches!(err, ConfigError::UnsupportedScheme { .. }));
	}

	#[test]
	fn config_deserializes_from_json() {
		let config = GatewayConfig::builder(base()).build().expect("Defaults should validate.");
		let json = serde_json::to_string(&config).expect("Config should serialize.");
		let parsed: GatewayConfig = serde_json::from_str(&json).expect("Config should parse.");

		assert_eq!(parsed, config);
	}
}

//! Gateway-level error types shared across dispatch, refresh, session, and store layers.

// self
use crate::_prelude::*;

/// Gateway-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Canonical gateway error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// No response was received from the API.
	#[error(transparent)]
	Network(#[from] TransportError),
	/// Response body could not be decoded into the API envelope.
	#[error(transparent)]
	Decode(#[from] DecodeError),

	/// API answered with an envelope whose `code` is not 200.
	#[error("Request failed with business code {code}: {message}.")]
	Business {
		/// Application-level code carried by the envelope.
		code: i64,
		/// Envelope message, or a generic fallback when the API omitted one.
		message: String,
		/// Envelope payload, if the API attached one to the failure.
		data: Option<JsonValue>,
	},
	/// API answered with a 4xx/5xx status that is not resolved by the refresh machinery.
	#[error("{message} (HTTP {status}).")]
	Http {
		/// Stable classification of the status code.
		kind: HttpErrorKind,
		/// Raw HTTP status code.
		status: u16,
		/// Human-readable message from the fixed status table.
		message: &'static str,
	},
	/// Profile changes could not be applied to the stored profile.
	#[error("Profile update is invalid: {0}.")]
	ProfileUpdate(#[source] serde_json::Error),
	/// Credential refresh was impossible or failed; the session is over.
	#[error("Session expired: {reason}.")]
	AuthExpired {
		/// Why the session could not be recovered.
		reason: String,
	},
}
impl Error {
	/// Builds an [`Error::AuthExpired`] with the provided reason.
	pub fn auth_expired(reason: impl Into<String>) -> Self {
		Self::AuthExpired { reason: reason.into() }
	}

	/// Builds an [`Error::Http`] from a raw status code using the fixed message table.
	pub fn http(status: u16) -> Self {
		let kind = HttpErrorKind::from_status(status);

		Self::Http { kind, status, message: kind.message() }
	}

	/// Returns `true` for the terminal [`Error::AuthExpired`] variant.
	pub fn is_auth_expired(&self) -> bool {
		matches!(self, Self::AuthExpired { .. })
	}

	/// Returns the business code when the error is an [`Error::Business`] failure.
	pub fn business_code(&self) -> Option<i64> {
		match self {
			Self::Business { code, .. } => Some(*code),
			_ => None,
		}
	}
}

/// Stable classification of HTTP error statuses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpErrorKind {
	/// 400.
	BadRequest,
	/// 401.
	Unauthorized,
	/// 403.
	Forbidden,
	/// 404.
	NotFound,
	/// 500.
	InternalServerError,
	/// Any other non-success status.
	Other,
}
impl HttpErrorKind {
	/// Classifies a raw status code.
	pub const fn from_status(status: u16) -> Self {
		match status {
			400 => Self::BadRequest,
			401 => Self::Unauthorized,
			403 => Self::Forbidden,
			404 => Self::NotFound,
			500 => Self::InternalServerError,
			_ => Self::Other,
		}
	}

	/// Returns the fixed human-readable message for the kind.
	pub const fn message(self) -> &'static str {
		match self {
			Self::BadRequest => "Invalid request parameters",
			Self::Unauthorized => "Unauthorized",
			Self::Forbidden => "Access denied",
			Self::NotFound => "Requested resource does not exist",
			Self::InternalServerError => "Internal server error",
			Self::Other => "Connection error",
		}
	}
}

/// Configuration and validation failures raised by the gateway.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Request path could not be joined onto the base URL.
	#[error("Path `{path}` cannot be joined onto the base URL.")]
	InvalidPath {
		/// Offending request path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL is not usable for HTTP requests.
	#[error("Base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Base URL that failed validation.
		url: String,
	},
	/// Configured endpoint path does not start with `/`.
	#[error("The {endpoint} path must start with '/': {path}.")]
	RelativeEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Offending path.
		path: String,
	},
	/// A timeout is zero or negative.
	#[error("The {name} timeout must be positive.")]
	NonPositiveTimeout {
		/// Which timeout failed validation.
		name: &'static str,
	},
	/// The refresh queue bound is zero.
	#[error("The pending request bound must be greater than zero.")]
	ZeroPendingBound,
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	BodySerialize(#[source] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (no response received).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network connection failed.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request did not complete before its deadline.
	#[error("Request timed out after {timeout}.")]
	Timeout {
		/// Deadline that elapsed.
		timeout: Duration,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// The response body is not a valid API envelope.
#[derive(Debug, ThisError)]
#[error("API returned a malformed envelope (HTTP {status}).")]
pub struct DecodeError {
	/// HTTP status of the undecodable response.
	pub status: u16,
	/// Structured parsing failure.
	#[source]
	pub source: serde_path_to_error::Error<serde_json::Error>,
}

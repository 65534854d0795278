//! Transport primitives for gateway requests.
//!
//! The module exposes the immutable [`ApiRequest`] descriptor callers dispatch, the raw
//! [`HttpReply`] a transport hands back, and the [`HttpTransport`] trait that is the
//! gateway's only dependency on an HTTP stack. [`ReqwestTransport`] is the default
//! implementation; hosts with their own stack implement the trait directly.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::GatewayConfig,
	error::{ConfigError, TransportError},
};

/// Name of the header carrying the bearer credential.
pub const AUTHORIZATION: &str = "Authorization";

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<HttpReply>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing gateway requests.
///
/// Implementations resolve [`ApiRequest::path`] against their base URL, send the headers
/// verbatim, and report any response (including 4xx/5xx) as an [`HttpReply`]. Only failures
/// where no response arrived are returned as errors, typically [`TransportError`].
/// Implementations must be `Send + Sync + 'static` so one transport can back a gateway shared
/// across tasks.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends the request and resolves once the full response body is available.
	fn send(&self, request: ApiRequest) -> TransportFuture<'_>;
}

/// HTTP methods used by the admin API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// `GET`.
	Get,
	/// `POST`.
	Post,
	/// `PUT`.
	Put,
	/// `PATCH`.
	Patch,
	/// `DELETE`.
	Delete,
}
impl Method {
	/// Returns the canonical method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Post => "POST",
			Self::Put => "PUT",
			Self::Patch => "PATCH",
			Self::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Immutable request descriptor.
///
/// The gateway never mutates a caller's descriptor; the credential is applied to a copy right
/// before each send.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the API base URL.
	pub path: String,
	/// Extra request headers.
	pub headers: BTreeMap<String, String>,
	/// Query string pairs, in order.
	pub query: Vec<(String, String)>,
	/// Optional JSON body.
	pub body: Option<JsonValue>,
}
impl ApiRequest {
	/// Creates a request with no headers, query, or body.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			headers: BTreeMap::new(),
			query: Vec::new(),
			body: None,
		}
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::Post, path)
	}

	/// Shorthand for a `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::Put, path)
	}

	/// Shorthand for a `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::Delete, path)
	}

	/// Adds or replaces a header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());

		self
	}

	/// Appends a query pair.
	pub fn with_query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
		self.query.push((name.into(), value.to_string()));

		self
	}

	/// Sets a raw JSON body.
	pub fn with_body(mut self, body: JsonValue) -> Self {
		self.body = Some(body);

		self
	}

	/// Serializes `body` as the JSON body.
	pub fn with_json<T>(self, body: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		let value = serde_json::to_value(body).map_err(ConfigError::BodySerialize)?;

		Ok(self.with_body(value))
	}

	/// Returns the value of a header, matching names case-insensitively.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}

	/// Returns a copy carrying `Authorization: Bearer <token>`, replacing any existing
	/// authorization header.
	pub fn with_bearer(&self, token: &TokenSecret) -> Self {
		let mut outgoing = self.clone();

		outgoing.headers.retain(|key, _| !key.eq_ignore_ascii_case(AUTHORIZATION));
		outgoing.headers.insert(AUTHORIZATION.into(), token.bearer());

		outgoing
	}
}

/// Raw response handed back by a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpReply {
	/// HTTP status code.
	pub status: u16,
	/// Full response body.
	pub body: Vec<u8>,
}
impl HttpReply {
	/// Creates a reply from a status and body.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, body: body.into() }
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// [`HttpTransport`] backed by a shared [`ReqwestClient`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
	client: ReqwestClient,
	config: Arc<GatewayConfig>,
}
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Builds a transport with a fresh client applying the config's request timeout.
	pub fn from_config(config: &GatewayConfig) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().timeout(config.request_timeout.unsigned_abs()).build()?;

		Ok(Self::with_client(client, config))
	}

	/// Wraps an existing reqwest [`ReqwestClient`]; the config's request timeout is still applied
	/// per request.
	pub fn with_client(client: ReqwestClient, config: &GatewayConfig) -> Self {
		Self { client, config: Arc::new(config.clone()) }
	}

	fn method(method: Method) -> reqwest::Method {
		match method {
			Method::Get => reqwest::Method::GET,
			Method::Post => reqwest::Method::POST,
			Method::Put => reqwest::Method::PUT,
			Method::Patch => reqwest::Method::PATCH,
			Method::Delete => reqwest::Method::DELETE,
		}
	}

	async fn execute(&self, request: ApiRequest) -> Result<HttpReply> {
		let url = self.config.resolve(&request.path)?;
		let timeout = self.config.request_timeout;
		let mut builder = self
			.client
			.request(Self::method(request.method), url)
			.timeout(timeout.unsigned_abs());

		if !request.query.is_empty() {
			builder = builder.query(&request.query);
		}

		for (name, value) in &request.headers {
			builder = builder.header(name.as_str(), value.as_str());
		}

		if let Some(body) = &request.body {
			let bytes = serde_json::to_vec(body).map_err(ConfigError::BodySerialize)?;

			builder = builder.header(reqwest::header::CONTENT_TYPE, "application/json").body(bytes);
		}

		let map_err = |e: ReqwestError| {
			if e.is_timeout() { TransportError::Timeout { timeout } } else { TransportError::from(e) }
		};
		let response = builder.send().await.map_err(map_err)?;
		let status = response.status().as_u16();
		let body = response.bytes().await.map_err(map_err)?;

		Ok(HttpReply::new(status, body.to_vec()))
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: ApiRequest) -> TransportFuture<'_> {
		Box::pin(self.execute(request))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn bearer_copy_replaces_existing_authorization() {
		let original = ApiRequest::get("/websites/")
			.with_header("authorization", "Bearer stale")
			.with_query("page", 2);
		let outgoing = original.with_bearer(&TokenSecret::new("fresh"));

		assert_eq!(original.header(AUTHORIZATION), Some("Bearer stale"));
		assert_eq!(outgoing.header(AUTHORIZATION), Some("Bearer fresh"));
		assert_eq!(outgoing.headers.len(), 1);
		assert_eq!(outgoing.query, vec![("page".to_string(), "2".to_string())]);
	}

	#[test]
	fn json_bodies_serialize_through_serde() {
		#[derive(Serialize)]
		struct NewGroup<'a> {
			name: &'a str,
		}

		let request = ApiRequest::post("/groups/")
			.with_json(&NewGroup { name: "edge" })
			.expect("Body fixture should serialize.");

		assert_eq!(request.body, Some(serde_json::json!({ "name": "edge" })));
		assert_eq!(request.method.to_string(), "POST");
	}

	#[test]
	fn reply_success_covers_2xx_only() {
		assert!(HttpReply::new(204, Vec::new()).is_success());
		assert!(!HttpReply::new(301, Vec::new()).is_success());
		assert!(!HttpReply::new(401, Vec::new()).is_success());
	}
}

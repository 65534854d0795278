//! Demonstrates plugging a host-owned HTTP stack into the gateway.
//!
//! 1. Implement [`HttpTransport`] so the gateway can send [`ApiRequest`]s through it.
//! 2. Pick a [`CredentialStore`] (here the in-process [`MemoryStore`]) seeded with a stale
//!    access credential.
//! 3. Hand the gateway a [`FnNotifier`] so the host learns when the session is gone.
//! 4. Dispatch a few concurrent requests and watch them share a single refresh.

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use color_eyre::Result;
use futures::future;
use url::Url;
// self
use monitor_gateway::{
	auth::{Credential, TokenSecret},
	config::GatewayConfig,
	gateway::Gateway,
	http::{AUTHORIZATION, ApiRequest, HttpReply, HttpTransport, TransportFuture},
	notify::{FnNotifier, SessionExpired},
	store::{MemoryStore, StoredSession},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = GatewayConfig::builder(Url::parse("https://monitor.example.com/api/")?).build()?;
	let store = Arc::new(MemoryStore::with_session(StoredSession {
		access: Some(Credential::new("stale-access")),
		refresh: Some(TokenSecret::new("demo-refresh")),
		profile: None,
	}));
	let notifier = Arc::new(FnNotifier::new(|event: &SessionExpired| {
		println!("session expired: {event:?}");
	}));
	let transport = Arc::new(InProcessApi::default());
	let gateway: Gateway<InProcessApi> =
		Gateway::with_transport(config, transport.clone(), store, notifier);
	let requests = ["/websites/", "/tasks/", "/groups/"]
		.into_iter()
		.map(|path| gateway.dispatch(ApiRequest::get(path).with_query("page", 1)));

	for result in future::join_all(requests).await {
		let response = result?;

		println!("{} -> {:?}", response.status, response.data);
	}

	println!("refresh calls: {}", transport.refresh_calls.load(Ordering::SeqCst));

	Ok(())
}

/// Answers requests in-process: only `demo-access` is accepted, and the refresh endpoint
/// rotates to it.
#[derive(Default)]
struct InProcessApi {
	refresh_calls: AtomicUsize,
}
impl HttpTransport for InProcessApi {
	fn send(&self, request: ApiRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			if request.path == "/auth/refresh" {
				self.refresh_calls.fetch_add(1, Ordering::SeqCst);

				return Ok(HttpReply::new(
					200,
					r#"{"code":200,"data":{"access_token":"demo-access","expires_in":3600}}"#,
				));
			}

			match request.header(AUTHORIZATION) {
				Some("Bearer demo-access") => Ok(HttpReply::new(
					200,
					format!(r#"{{"code":200,"message":"success","data":{{"path":"{}"}}}}"#, request.path),
				)),
				_ => Ok(HttpReply::new(401, "")),
			}
		})
	}
}

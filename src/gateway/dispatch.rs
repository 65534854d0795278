//! Request dispatch: bearer injection, response classification, and 401 interception.

// self
use crate::{
	_prelude::*,
	envelope::{ApiResponse, Envelope},
	gateway::Gateway,
	http::{ApiRequest, HttpReply, HttpTransport},
	obs::{self, OpKind, OpOutcome, OpSpan},
};

/// Status the API answers with when the access credential is missing, expired, or invalid.
pub const UNAUTHORIZED: u16 = 401;
/// How many times a request may be replayed after a refresh before a 401 becomes terminal.
pub const MAX_REPLAYS: u32 = 1;

/// Boxed future returned by the internal dispatch path.
pub(crate) type DispatchFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ApiResponse>> + 'a + Send>>;

impl<T> Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Sends `request` with the current access credential attached.
	///
	/// Resolves to the unwrapped envelope on success. A 401 is intercepted and resolved through
	/// the refresh coordinator, so callers only ever observe it as the terminal
	/// [`Error::AuthExpired`]. Business failures (`code != 200`) surface as
	/// [`Error::Business`], other HTTP statuses as [`Error::Http`], and missing responses as
	/// [`Error::Network`].
	pub async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse> {
		const KIND: OpKind = OpKind::Dispatch;

		let span = OpSpan::new(KIND, "dispatch");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span.instrument(self.dispatch_attempt(request, 0)).await;
		let outcome = OpOutcome::of(&result);

		span.record_outcome(outcome);
		obs::record_op_outcome(KIND, outcome);

		result
	}

	/// One pass through the transport; `replays` counts how often `request` was already
	/// replayed after a refresh.
	pub(crate) fn dispatch_attempt(&self, request: ApiRequest, replays: u32) -> DispatchFuture<'_> {
		Box::pin(async move {
			let sent_with = self.store.access().await?.map(|credential| credential.access_token);
			let outgoing = match &sent_with {
				Some(token) => request.with_bearer(token),
				None => request.clone(),
			};
			let reply = self.transport.send(outgoing).await?;

			if reply.status != UNAUTHORIZED {
				return classify_reply(reply);
			}
			if replays >= MAX_REPLAYS {
				tracing::warn!(
					method = %request.method,
					path = %request.path,
					"Replayed request was rejected again; giving up."
				);

				return Err(Error::auth_expired("request was rejected after a credential refresh"));
			}

			let current = self.store.access().await?.map(|credential| credential.access_token);

			// Renewed while this request was in flight.
			if current.is_some() && current != sent_with {
				tracing::debug!(
					method = %request.method,
					path = %request.path,
					"Access credential changed since send; replaying without a refresh."
				);

				return self.dispatch_attempt(request, replays + 1).await;
			}

			tracing::info!(
				method = %request.method,
				path = %request.path,
				"Access credential rejected; handing request to the refresh coordinator."
			);

			self.recover_unauthorized(request, replays).await
		})
	}
}

/// Maps a raw reply onto the gateway's result taxonomy.
pub(crate) fn classify_reply(reply: HttpReply) -> Result<ApiResponse> {
	if !reply.is_success() {
		return Err(Error::http(reply.status));
	}

	Envelope::decode(reply.status, &reply.body)?.into_result(reply.status)
}

//! The `{ code, message, data }` envelope every admin API endpoint answers with.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{_prelude::*, error::DecodeError};

/// Application-level code signalling success.
pub const SUCCESS_CODE: i64 = 200;

/// Raw response envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
	/// Application-level status; [`SUCCESS_CODE`] means success.
	pub code: i64,
	/// Optional human-readable message.
	#[serde(default)]
	pub message: Option<String>,
	/// Optional payload.
	#[serde(default)]
	pub data: Option<JsonValue>,
}
impl Envelope {
	/// Decodes an envelope from a response body, tracking the failing path on error.
	pub fn decode(status: u16, body: &[u8]) -> Result<Self, DecodeError> {
		let mut de = serde_json::Deserializer::from_slice(body);

		serde_path_to_error::deserialize(&mut de).map_err(|source| DecodeError { status, source })
	}

	/// Returns `true` when the envelope carries the success code.
	pub fn is_success(&self) -> bool {
		self.code == SUCCESS_CODE
	}

	/// Splits the envelope into a successful response or a business failure.
	pub fn into_result(self, status: u16) -> Result<ApiResponse> {
		if self.is_success() {
			Ok(ApiResponse { status, message: self.message, data: self.data })
		} else {
			Err(Error::Business {
				code: self.code,
				message: self.message.unwrap_or_else(|| "Request failed".into()),
				data: self.data,
			})
		}
	}
}

/// Successful API response, unwrapped from its envelope.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiResponse {
	/// HTTP status of the response.
	pub status: u16,
	/// Envelope message, if any.
	pub message: Option<String>,
	/// Envelope payload, if any.
	pub data: Option<JsonValue>,
}
impl ApiResponse {
	/// Deserializes the payload into `T`; a missing payload is treated as JSON `null`.
	pub fn data_as<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let value = self.data.clone().unwrap_or(JsonValue::Null);

		serde_path_to_error::deserialize(value)
			.map_err(|source| DecodeError { status: self.status, source }.into())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn success_envelope_unwraps_payload() {
		let envelope = Envelope::decode(200, br#"{"code":200,"message":"ok","data":{"id":5}}"#)
			.expect("Envelope fixture should decode.");
		let response = envelope.into_result(200).expect("Code 200 should be a success.");

		assert_eq!(response.message.as_deref(), Some("ok"));
		assert_eq!(response.data, Some(serde_json::json!({ "id": 5 })));
	}

	#[test]
	fn non_success_code_becomes_business_error() {
		let envelope = Envelope::decode(200, br#"{"code":409,"message":"Website exists"}"#)
			.expect("Envelope fixture should decode.");
		let err = envelope.into_result(200).expect_err("Code 409 should be a business failure.");

		assert!(matches!(err, Error::Business { code: 409, ref message, .. } if message == "Website exists"));
	}

	#[test]
	fn missing_message_uses_fallback() {
		let err = Envelope { code: 500, message: None, data: None }
			.into_result(200)
			.expect_err("Code 500 should be a business failure.");

		assert_eq!(err.to_string(), "Request failed with business code 500: Request failed.");
	}

	#[test]
	fn decode_errors_report_the_failing_path() {
		let err = Envelope::decode(200, br#"{"code":"two hundred"}"#)
			.expect_err("String code should fail to decode.");

		assert_eq!(err.status, 200);
		assert_eq!(err.source.path().to_string(), "code");
	}

	#[test]
	fn data_as_reports_typed_payload_errors() {
		#[derive(Debug, Deserialize)]
		struct Tokens {
			#[allow(dead_code)]
			access_token: String,
		}

		let response = ApiResponse {
			status: 200,
			message: None,
			data: Some(serde_json::json!({ "access_token": 42 })),
		};
		let err = response.data_as::<Tokens>().expect_err("Numeric token should fail.");

		assert!(matches!(err, Error::Decode(DecodeError { status: 200, .. })));
	}
}

//! Status-driven classification of API responses.

// self
use crate::{_prelude::*, error::DecodeError};

/// Result of classifying one response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
	/// `200`: the body is handed to the caller's decoder.
	Payload(Bytes),
	/// Any other `2xx`: success with the body discarded.
	NoContent(StatusCode),
	/// Non-success status.
	Failed(ApiError),
}
impl Outcome {
	/// Converts into the decodable body, `None` for bodiless successes, or the API error.
	pub fn into_result(self) -> Result<Option<Bytes>, ApiError> {
		match self {
			Self::Payload(body) => Ok(Some(body)),
			Self::NoContent(_) => Ok(None),
			Self::Failed(e) => Err(e),
		}
	}
}

/// Failed API call.
///
/// `message` is the server's own message when the body carried a
/// `{"error":{"code","message"}}` envelope, otherwise the HTTP status line.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("{message}")]
pub struct ApiError {
	/// HTTP status code.
	pub status: u16,
	/// Raw status line, e.g. `404 Not Found`.
	pub status_line: String,
	/// Server-supplied machine code, e.g. `ErrorItemNotFound`.
	pub code: Option<String>,
	/// Human-readable message.
	pub message: String,
}
impl ApiError {
	/// Builds an error, falling back to `status_line` when `message` is absent or empty.
	pub fn new(
		status: u16,
		status_line: impl Into<String>,
		message: Option<String>,
		code: Option<String>,
	) -> Self {
		let status_line = status_line.into();
		let message = message.filter(|m| !m.is_empty()).unwrap_or_else(|| status_line.clone());

		Self { status, status_line, code, message }
	}

	/// Whether the server supplied its own message.
	pub fn has_server_message(&self) -> bool {
		self.message != self.status_line
	}
}

#[derive(Deserialize)]
struct ErrorEnvelope {
	error: ErrorBody,
}
#[derive(Deserialize)]
struct ErrorBody {
	#[serde(default)]
	code: Option<String>,
	#[serde(default)]
	message: Option<String>,
}

/// Classifies a response by status alone, decoding the error envelope on failure.
pub fn classify(status: StatusCode, body: Bytes) -> Outcome {
	match status.as_u16() {
		200 => Outcome::Payload(body),
		201..=299 => Outcome::NoContent(status),
		code => {
			let line = status_line(status);
			let error = match serde_json::from_slice::<ErrorEnvelope>(&body) {
				Ok(ErrorEnvelope { error }) => ApiError::new(code, line, error.message, error.code),
				Err(_) => ApiError::new(code, line, None, None),
			};

			Outcome::Failed(error)
		},
	}
}

/// Decodes a JSON body, recording the path of the first mismatch.
pub fn decode_json<T>(body: &[u8]) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut de = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut de).map_err(|e| DecodeError::from(e).into())
}

pub(crate) fn status_line(status: StatusCode) -> String {
	match status.canonical_reason() {
		Some(reason) => format!("{} {reason}", status.as_u16()),
		None => status.as_u16().to_string(),
	}
}

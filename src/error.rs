//! Crate-level error types shared by the query builder, execution engine, and credential flows.

// std
use std::io;
// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Every failed operation yields exactly one value; [`Error::kind`] and [`Error::status`]
/// carry enough structure to branch on the cause without inspecting the message.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Mutually exclusive query directives were combined.
	#[error(transparent)]
	ConflictingOptions(#[from] crate::query::ConflictingOptions),
	/// Network or connection-level failure.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// The API answered with a non-success status.
	#[error(transparent)]
	Api(#[from] crate::response::ApiError),
	/// The token endpoint rejected an exchange or refresh.
	#[error(transparent)]
	CredentialExchange(#[from] CredentialExchangeError),
	/// The interactive authorization-code flow failed before a code was exchanged.
	#[error(transparent)]
	InteractiveFlow(#[from] InteractiveFlowError),
	/// A response body did not match the expected shape.
	#[error(transparent)]
	Decode(#[from] DecodeError),
	/// A request body could not be serialized.
	#[error("Request body could not be encoded as JSON.")]
	Encode(#[source] serde_json::Error),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Token cache failure.
	#[error("{0}")]
	Cache(
		#[from]
		#[source]
		crate::cache::CacheError,
	),
}
impl Error {
	/// Returns the coarse category of this error.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::ConflictingOptions(_) => ErrorKind::ConflictingOptions,
			Self::Transport(_) => ErrorKind::Transport,
			Self::Api(_) => ErrorKind::Api,
			Self::CredentialExchange(_) => ErrorKind::CredentialExchange,
			Self::InteractiveFlow(_) => ErrorKind::InteractiveFlow,
			Self::Decode(_) => ErrorKind::Decode,
			Self::Encode(_) => ErrorKind::Encode,
			Self::Config(_) => ErrorKind::Config,
			Self::Cache(_) => ErrorKind::Cache,
		}
	}

	/// HTTP status code tied to the failure, when one was observed.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Api(e) => Some(e.status),
			Self::CredentialExchange(e) => e.status(),
			_ => None,
		}
	}
}

/// Coarse categories mirrored from the [`Error`] variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// See [`Error::ConflictingOptions`].
	ConflictingOptions,
	/// See [`Error::Transport`].
	Transport,
	/// See [`Error::Api`].
	Api,
	/// See [`Error::CredentialExchange`].
	CredentialExchange,
	/// See [`Error::InteractiveFlow`].
	InteractiveFlow,
	/// See [`Error::Decode`].
	Decode,
	/// See [`Error::Encode`].
	Encode,
	/// See [`Error::Config`].
	Config,
	/// See [`Error::Cache`].
	Cache,
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Provider descriptor failed validation.
	#[error(transparent)]
	Descriptor(#[from] crate::provider::ProviderDescriptorError),
	/// Provider descriptor contains an invalid URL.
	#[error("Descriptor contains an invalid URL.")]
	InvalidDescriptor {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Redirect URI cannot be parsed.
	#[error("Redirect URI is invalid.")]
	InvalidRedirect {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request base URL cannot be parsed.
	#[error("Base URL `{url}` is invalid.")]
	InvalidBaseUrl {
		/// Offending input.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Loopback callback path must be absolute.
	#[error("Loopback callback path `{path}` must start with `/`.")]
	InvalidCallbackPath {
		/// Offending path.
		path: String,
	},
	/// Descriptor does not enable the requested grant.
	#[error("Descriptor `{descriptor}` does not enable the {grant} grant.")]
	UnsupportedGrant {
		/// Provider identifier string.
		descriptor: String,
		/// Disabled grant label.
		grant: &'static str,
	},
	/// Requested scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// Credential builder validation failed.
	#[error("Unable to build credential.")]
	CredentialBuild(#[from] crate::auth::CredentialBuilderError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Transport-level failures (network, IO, deadlines).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {endpoint}.")]
	Network {
		/// Which kind of endpoint was being called.
		endpoint: &'static str,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The per-call deadline elapsed before the round trip completed.
	#[error("Request to {endpoint} timed out.")]
	Timeout {
		/// Which kind of endpoint was being called.
		endpoint: &'static str,
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] io::Error),
}
impl TransportError {
	pub(crate) const API: &'static str = "the API";
	pub(crate) const TOKEN: &'static str = "the token endpoint";

	/// Wraps a transport-specific network error.
	pub fn network(
		endpoint: &'static str,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { endpoint, source: Box::new(src) }
	}

	pub(crate) fn from_reqwest(endpoint: &'static str, e: ReqwestError) -> Self {
		if e.is_timeout() {
			Self::Timeout { endpoint, source: Box::new(e) }
		} else {
			Self::Network { endpoint, source: Box::new(e) }
		}
	}
}

/// Token endpoint rejections, classified by the provider strategy.
#[derive(Debug, ThisError)]
pub enum CredentialExchangeError {
	/// Provider rejected the grant (bad code, expired refresh token, denied consent).
	#[error("Provider rejected the grant: {reason}")]
	InvalidGrant {
		/// Provider-supplied reason string.
		reason: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Client authentication failed (bad secret, disabled application).
	#[error("Client authentication failed: {reason}")]
	InvalidClient {
		/// Provider-supplied reason string.
		reason: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Requested scopes exceed what the application may be granted.
	#[error("Requested scopes were refused: {reason}")]
	InsufficientScope {
		/// Provider-supplied reason string.
		reason: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Provider returned an unexpected response.
	#[error("Token endpoint returned an unexpected response: {message}")]
	Endpoint {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint responded with JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned a non-positive or out-of-range `expires_in`.
	#[error("The expires_in value must be a positive number of seconds.")]
	InvalidExpiresIn,
	/// The live credential cannot be refreshed because no refresh token was issued.
	#[error("Credential cannot be refreshed without a refresh token.")]
	MissingRefreshToken,
}
impl CredentialExchangeError {
	/// HTTP status code reported by the token endpoint, when available.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::InvalidGrant { status, .. }
			| Self::InvalidClient { status, .. }
			| Self::InsufficientScope { status, .. }
			| Self::Endpoint { status, .. }
			| Self::ResponseParse { status, .. } => *status,
			_ => None,
		}
	}
}

/// Failures of the interactive authorization-code flow.
///
/// Each variant names a distinct cause so callers can tell a denied consent from a timeout
/// or from a port already held by another login.
#[derive(Debug, ThisError)]
pub enum InteractiveFlowError {
	/// The authorization server redirected back with an `error` parameter.
	#[error("Authorization server returned `{error}`{}.", describe(.description))]
	ProviderDenied {
		/// OAuth `error` code.
		error: String,
		/// Optional `error_description`.
		description: Option<String>,
	},
	/// The callback `state` did not match the nonce of this flow.
	#[error("Callback state does not match the pending authorization request.")]
	StateMismatch,
	/// The callback carried a matching state but no authorization code.
	#[error("Callback did not include an authorization code.")]
	MissingCode,
	/// The loopback listener could not bind its address.
	#[error("Loopback listener could not bind {addr}.")]
	ListenerBind {
		/// Address the listener attempted to bind.
		addr: String,
		/// Underlying socket failure.
		#[source]
		source: io::Error,
	},
	/// The loopback listener stopped before a callback resolved the flow.
	#[error("Loopback listener failed: {message}.")]
	ListenerFailure {
		/// Summary of the failure.
		message: String,
	},
	/// No callback arrived before the configured wait elapsed.
	#[error("No authorization callback arrived within {waited:?}.")]
	Timeout {
		/// Configured wait.
		waited: StdDuration,
	},
	/// The caller-supplied cancellation signal fired.
	#[error("Interactive authorization was cancelled.")]
	Cancelled,
	/// The browser could not be opened at the authorization URL.
	#[error("Browser could not be opened for the authorization URL.")]
	BrowserLaunch {
		/// Platform launcher failure.
		#[source]
		source: io::Error,
	},
}

/// Response bodies that do not match the expected shape.
#[derive(Debug, ThisError)]
pub enum DecodeError {
	/// JSON decoding failed at the recorded path.
	#[error("Response body does not match the expected shape at `{path}`.")]
	Json {
		/// JSON path of the first mismatch.
		path: String,
		/// Underlying serde failure.
		#[source]
		source: serde_json::Error,
	},
	/// A continuation cursor could not be parsed as a URL.
	#[error("Continuation cursor `{cursor}` is not a valid URL.")]
	InvalidCursor {
		/// Raw cursor text.
		cursor: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// The server handed back a cursor that was already followed.
	#[error("Continuation cursor `{cursor}` was already followed.")]
	RepeatedCursor {
		/// Raw cursor text.
		cursor: String,
	},
}
impl From<serde_path_to_error::Error<serde_json::Error>> for DecodeError {
	fn from(e: serde_path_to_error::Error<serde_json::Error>) -> Self {
		let path = e.path().to_string();

		Self::Json { path, source: e.into_inner() }
	}
}

fn describe(description: &Option<String>) -> String {
	match description.as_deref() {
		Some(text) if !text.is_empty() => format!(": {text}"),
		_ => String::new(),
	}
}

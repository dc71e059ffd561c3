//! Classification of token-endpoint rejections.

// self
use crate::{_prelude::*, provider::descriptor::GrantType};

/// Hook that maps a token-endpoint rejection onto a [`ProviderErrorKind`].
///
/// The context carries only primitive data so strategies stay independent of the HTTP
/// client in use.
pub trait ProviderStrategy: Send + Sync {
	/// Classifies a failed token request.
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind;
}

/// Canonical provider error categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderErrorKind {
	/// The grant was rejected (bad code, expired refresh token, denied consent).
	InvalidGrant,
	/// Client authentication failed.
	InvalidClient,
	/// Requested scopes were refused.
	InsufficientScope,
	/// Any other failure reported by the endpoint.
	Other,
}

/// Context passed to [`ProviderStrategy::classify_token_error`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderErrorContext {
	/// Grant type associated with the failing request.
	pub grant_type: GrantType,
	/// HTTP status code returned by the provider, when available.
	pub http_status: Option<u16>,
	/// Provider-supplied OAuth `error` field.
	pub oauth_error: Option<String>,
	/// Provider-supplied OAuth `error_description` field.
	pub error_description: Option<String>,
}
impl ProviderErrorContext {
	/// Creates a new context scoped to the provided grant type.
	pub fn new(grant_type: GrantType) -> Self {
		Self { grant_type, http_status: None, oauth_error: None, error_description: None }
	}

	/// Adds an HTTP status code.
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Adds the OAuth `error` code.
	pub fn with_oauth_error(mut self, error: impl Into<String>) -> Self {
		self.oauth_error = Some(error.into());

		self
	}

	/// Adds the OAuth `error_description` field.
	pub fn with_error_description(mut self, description: impl Into<String>) -> Self {
		self.error_description = Some(description.into());

		self
	}
}

/// RFC 6749 heuristics: the `error` code first, then the description, then the status.
#[derive(Debug, Default)]
pub struct DefaultProviderStrategy;
impl ProviderStrategy for DefaultProviderStrategy {
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind {
		ctx.oauth_error
			.as_deref()
			.and_then(match_exact_value)
			.or_else(|| ctx.error_description.as_deref().and_then(match_description))
			.unwrap_or_else(|| classify_status(ctx.http_status))
	}
}

fn match_exact_value(value: &str) -> Option<ProviderErrorKind> {
	let value = value.to_ascii_lowercase();

	match value.as_str() {
		"invalid_grant" | "access_denied" | "interaction_required" =>
			Some(ProviderErrorKind::InvalidGrant),
		"invalid_client" | "unauthorized_client" => Some(ProviderErrorKind::InvalidClient),
		"invalid_scope" | "insufficient_scope" => Some(ProviderErrorKind::InsufficientScope),
		_ => None,
	}
}

fn match_description(text: &str) -> Option<ProviderErrorKind> {
	let lowered = text.to_ascii_lowercase();

	if lowered.contains("invalid_grant") {
		Some(ProviderErrorKind::InvalidGrant)
	} else if lowered.contains("invalid_client") || lowered.contains("client secret") {
		Some(ProviderErrorKind::InvalidClient)
	} else if lowered.contains("invalid_scope") || lowered.contains("insufficient_scope") {
		Some(ProviderErrorKind::InsufficientScope)
	} else {
		None
	}
}

fn classify_status(status: Option<u16>) -> ProviderErrorKind {
	match status {
		Some(401) => ProviderErrorKind::InvalidClient,
		Some(403) => ProviderErrorKind::InsufficientScope,
		_ => ProviderErrorKind::Other,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn classify(ctx: ProviderErrorContext) -> ProviderErrorKind {
		DefaultProviderStrategy.classify_token_error(&ctx)
	}

	#[test]
	fn oauth_error_code_wins() {
		assert_eq!(
			classify(
				ProviderErrorContext::new(GrantType::ClientCredentials)
					.with_oauth_error("invalid_client")
					.with_http_status(400)
			),
			ProviderErrorKind::InvalidClient
		);
		assert_eq!(
			classify(
				ProviderErrorContext::new(GrantType::RefreshToken).with_oauth_error("invalid_grant")
			),
			ProviderErrorKind::InvalidGrant
		);
	}

	#[test]
	fn description_and_status_are_fallbacks() {
		assert_eq!(
			classify(
				ProviderErrorContext::new(GrantType::ClientCredentials)
					.with_oauth_error("unknown_error")
					.with_error_description("AADSTS7000215: Invalid client secret provided.")
			),
			ProviderErrorKind::InvalidClient
		);
		assert_eq!(
			classify(ProviderErrorContext::new(GrantType::AuthorizationCode).with_http_status(403)),
			ProviderErrorKind::InsufficientScope
		);
		assert_eq!(
			classify(ProviderErrorContext::new(GrantType::AuthorizationCode).with_http_status(503)),
			ProviderErrorKind::Other
		);
	}
}

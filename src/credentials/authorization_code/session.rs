// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::{_prelude::*, auth::ScopeSet, provider::ProviderDescriptor};

const STATE_BYTES: usize = 16;

/// One pending authorization request: the nonce and the URL carrying it.
#[derive(Clone)]
pub(crate) struct AuthorizationRequest {
	pub(crate) state: String,
	pub(crate) authorize_url: Url,
}
impl AuthorizationRequest {
	pub(crate) fn new(
		descriptor: &ProviderDescriptor,
		client_id: &str,
		redirect_uri: &Url,
		scope: &ScopeSet,
	) -> Self {
		let state = generate_state();
		let mut authorize_url = descriptor.endpoints.authorization.clone();

		authorize_url
			.query_pairs_mut()
			.append_pair("response_type", "code")
			.append_pair("client_id", client_id)
			.append_pair("redirect_uri", redirect_uri.as_str())
			.append_pair("scope", &scope.normalized())
			.append_pair("state", &state)
			.append_pair("access_type", "offline");

		Self { state, authorize_url }
	}
}
impl Debug for AuthorizationRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizationRequest")
			.field("state", &"<redacted>")
			.field("authorize_url", &self.authorize_url.path())
			.finish()
	}
}

fn generate_state() -> String {
	URL_SAFE_NO_PAD.encode(rand::random::<[u8; STATE_BYTES]>())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::TenantId;

	#[test]
	fn authorize_url_carries_nonce_and_offline_access() {
		let tenant = TenantId::new("common").expect("Tenant should be valid.");
		let descriptor = ProviderDescriptor::azure_ad(&tenant).expect("Azure preset should build.");
		let redirect =
			Url::parse("http://localhost:8001/authcb").expect("Redirect fixture should parse.");
		let scope = ScopeSet::new(["User.Read", "offline_access"]).expect("Scope should be valid.");
		let request = AuthorizationRequest::new(&descriptor, "app", &redirect, &scope);
		let pairs = request.authorize_url.query_pairs().into_owned().collect::<HashMap<_, _>>();

		assert_eq!(pairs.get("state"), Some(&request.state));
		assert_eq!(pairs.get("scope").map(String::as_str), Some("User.Read offline_access"));
		assert_eq!(pairs.get("redirect_uri").map(String::as_str), Some("http://localhost:8001/authcb"));
		assert_eq!(pairs.get("access_type").map(String::as_str), Some("offline"));
		assert_eq!(pairs.get("response_type").map(String::as_str), Some("code"));
	}

	#[test]
	fn nonces_are_url_safe_and_unique() {
		let a = generate_state();
		let b = generate_state();

		assert_ne!(a, b);
		assert_eq!(a.len(), 22, "16 bytes encode to 22 unpadded base64 characters.");
		assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
	}
}

//! Provider descriptor data structures and the Azure AD preset.

/// Builder API for assembling provider descriptors.
pub mod builder;
/// Grant helpers wired into provider descriptors.
pub mod grant;

pub use builder::*;
pub use grant::*;

// self
use crate::{
	_prelude::*,
	auth::{ProviderId, TenantId},
};

/// Login host for the Azure AD v2 endpoints.
pub const AZURE_AD_AUTHORITY: &str = "https://login.microsoftonline.com";

/// How the client authenticates itself at the token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	/// HTTP Basic with `client_id`/`client_secret`.
	#[default]
	ClientSecretBasic,
	/// `client_id`/`client_secret` as form body parameters.
	ClientSecretPost,
	/// Public client; no secret is sent.
	None,
}

/// Endpoint set declared by a provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Authorization endpoint the browser is sent to.
	pub authorization: Url,
	/// Token endpoint used for exchanges and refreshes.
	pub token: Url,
}

/// Immutable provider descriptor consumed by the credential providers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Descriptor identifier.
	pub id: ProviderId,
	/// Endpoint definitions exposed by the provider.
	pub endpoints: ProviderEndpoints,
	/// Supported grant flags.
	pub supported_grants: SupportedGrants,
	/// Preferred client authentication mechanism.
	pub preferred_client_auth_method: ClientAuthMethod,
}
impl ProviderDescriptor {
	/// Creates a new builder for the provided identifier.
	pub fn builder(id: ProviderId) -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::new(id)
	}

	/// Azure AD v2 endpoints for `tenant` on the public cloud.
	pub fn azure_ad(tenant: &TenantId) -> Result<Self, ProviderDescriptorError> {
		Self::azure_ad_at(AZURE_AD_AUTHORITY, tenant)
	}

	/// Azure AD v2 endpoints for `tenant` under a custom authority host.
	///
	/// Client secrets travel in the form body, which is what Azure AD expects.
	pub fn azure_ad_at(
		authority: &str,
		tenant: &TenantId,
	) -> Result<Self, ProviderDescriptorError> {
		let base = authority.trim_end_matches('/');
		let endpoint = |leaf: &str| {
			let raw = format!("{base}/{tenant}/oauth2/v2.0/{leaf}");

			Url::parse(&raw).map_err(|_| ProviderDescriptorError::InvalidEndpoint { url: raw })
		};
		let id = ProviderId::new("azure-ad").map_err(|_| {
			ProviderDescriptorError::InvalidEndpoint { url: authority.to_owned() }
		})?;

		ProviderDescriptor::builder(id)
			.authorization_endpoint(endpoint("authorize")?)
			.token_endpoint(endpoint("token")?)
			.support_grants([
				GrantType::AuthorizationCode,
				GrantType::RefreshToken,
				GrantType::ClientCredentials,
			])
			.preferred_client_auth_method(ClientAuthMethod::ClientSecretPost)
			.build()
	}

	/// Checks whether the descriptor supports a given grant.
	pub fn supports(&self, grant: GrantType) -> bool {
		self.supported_grants.supports(grant)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn azure_preset_embeds_the_tenant() {
		let tenant = TenantId::new("contoso.onmicrosoft.com").expect("Tenant fixture should be valid.");
		let descriptor = ProviderDescriptor::azure_ad(&tenant).expect("Azure preset should build.");

		assert_eq!(
			descriptor.endpoints.token.as_str(),
			"https://login.microsoftonline.com/contoso.onmicrosoft.com/oauth2/v2.0/token"
		);
		assert_eq!(
			descriptor.endpoints.authorization.as_str(),
			"https://login.microsoftonline.com/contoso.onmicrosoft.com/oauth2/v2.0/authorize"
		);
		assert_eq!(descriptor.preferred_client_auth_method, ClientAuthMethod::ClientSecretPost);
		assert!(descriptor.supports(GrantType::ClientCredentials));
	}

	#[test]
	fn custom_authority_allows_loopback_http() {
		let tenant = TenantId::new("tenant").expect("Tenant fixture should be valid.");
		let descriptor = ProviderDescriptor::azure_ad_at("http://127.0.0.1:9000/", &tenant)
			.expect("Loopback authority should be accepted.");

		assert_eq!(descriptor.endpoints.token.as_str(), "http://127.0.0.1:9000/tenant/oauth2/v2.0/token");
	}
}

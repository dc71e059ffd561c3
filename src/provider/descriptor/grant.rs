// self
use crate::_prelude::*;

/// OAuth 2.0 grant types a provider may accept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
	/// Authorization Code grant used by interactive logins.
	AuthorizationCode,
	/// Refresh Token grant renewing an interactive login.
	RefreshToken,
	/// Client Credentials grant for application-only tokens.
	ClientCredentials,
}
impl GrantType {
	/// Returns the RFC 6749 identifier for the grant type.
	pub fn as_str(self) -> &'static str {
		match self {
			GrantType::AuthorizationCode => "authorization_code",
			GrantType::RefreshToken => "refresh_token",
			GrantType::ClientCredentials => "client_credentials",
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Grant flags carried by a descriptor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedGrants {
	/// Indicates whether the Authorization Code grant is enabled.
	pub authorization_code: bool,
	/// Indicates whether the Refresh Token grant is enabled.
	pub refresh_token: bool,
	/// Indicates whether the Client Credentials grant is enabled.
	pub client_credentials: bool,
}
impl SupportedGrants {
	/// Returns true if the provided grant is supported.
	pub fn supports(self, grant: GrantType) -> bool {
		match grant {
			GrantType::AuthorizationCode => self.authorization_code,
			GrantType::RefreshToken => self.refresh_token,
			GrantType::ClientCredentials => self.client_credentials,
		}
	}

	/// Marks a grant as supported.
	pub fn enable(mut self, grant: GrantType) -> Self {
		match grant {
			GrantType::AuthorizationCode => self.authorization_code = true,
			GrantType::RefreshToken => self.refresh_token = true,
			GrantType::ClientCredentials => self.client_credentials = true,
		}

		self
	}

	/// Returns true when no grants are enabled.
	pub fn is_empty(self) -> bool {
		!self.authorization_code && !self.refresh_token && !self.client_credentials
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn enable_sets_only_the_requested_flag() {
		let grants = SupportedGrants::default().enable(GrantType::ClientCredentials);

		assert!(grants.supports(GrantType::ClientCredentials));
		assert!(!grants.supports(GrantType::AuthorizationCode));
		assert!(!grants.is_empty());
		assert_eq!(GrantType::RefreshToken.to_string(), "refresh_token");
	}
}

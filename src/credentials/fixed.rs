// self
use crate::{
	_prelude::*,
	auth::{ClientIdentity, Credential, TokenSecret},
	credentials::{CredentialFuture, CredentialProvider},
};

/// Provider that always returns the credential it was built with.
///
/// Nothing is renewed; once the token expires the API starts rejecting requests.
#[derive(Clone, Debug)]
pub struct StaticCredentials {
	identity: ClientIdentity,
	credential: Arc<Credential>,
}
impl StaticCredentials {
	/// Wraps a pre-issued access token covering the identity's scopes until `expires_at`.
	pub fn new(
		identity: ClientIdentity,
		access_token: impl Into<String>,
		expires_at: OffsetDateTime,
	) -> Self {
		let credential = Credential {
			scope: identity.scope.clone(),
			access_token: TokenSecret::new(access_token),
			refresh_token: None,
			issued_at: OffsetDateTime::now_utc(),
			expires_at,
		};

		Self { identity, credential: Arc::new(credential) }
	}
}
impl CredentialProvider for StaticCredentials {
	fn identity(&self) -> &ClientIdentity {
		&self.identity
	}

	fn authenticate(&self) -> CredentialFuture<'_, Arc<Credential>> {
		let credential = self.credential.clone();

		Box::pin(async move { Ok(credential) })
	}
}

//! Application identity used to key cached credentials.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	auth::{ClientId, ScopeSet, TenantId, TokenSecret},
};

/// Tenant, application, and scope triple a credential is issued for.
///
/// The client secret never lives here. When one is attached via
/// [`with_secret`](Self::with_secret) only its digest is kept, so rotating the secret
/// changes the [`fingerprint`](Self::fingerprint) without exposing the value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientIdentity {
	/// Directory tenant.
	pub tenant: TenantId,
	/// Registered application.
	pub client_id: ClientId,
	/// Scopes requested for this identity.
	pub scope: ScopeSet,
	secret_digest: Option<String>,
}
impl ClientIdentity {
	/// Creates an identity without a client secret.
	pub fn new(tenant: TenantId, client_id: ClientId, scope: ScopeSet) -> Self {
		Self { tenant, client_id, scope, secret_digest: None }
	}

	/// Binds the identity to the digest of the provided client secret.
	pub fn with_secret(mut self, secret: &TokenSecret) -> Self {
		self.secret_digest = Some(URL_SAFE_NO_PAD.encode(Sha256::digest(secret.expose())));

		self
	}

	/// Stable, filesystem-safe key derived from every identity component.
	pub fn fingerprint(&self) -> String {
		let mut hasher = Sha256::new();

		for part in [
			self.tenant.as_ref(),
			self.client_id.as_ref(),
			self.secret_digest.as_deref().unwrap_or_default(),
			self.scope.fingerprint(),
		] {
			hasher.update(part.as_bytes());
			hasher.update([0]);
		}

		URL_SAFE_NO_PAD.encode(hasher.finalize())
	}
}

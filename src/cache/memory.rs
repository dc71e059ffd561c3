//! In-process credential cache.

// self
use crate::{
	_prelude::*,
	auth::{ClientIdentity, Credential},
	cache::{CacheError, CacheFuture, TokenCache},
};

/// Thread-safe cache keyed by identity fingerprint; clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryCache(Arc<RwLock<HashMap<String, Credential>>>);
impl MemoryCache {
	/// Number of cached credentials.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is cached.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl TokenCache for MemoryCache {
	fn load<'a>(&'a self, identity: &'a ClientIdentity) -> CacheFuture<'a, Credential> {
		let found = self.0.read().get(&identity.fingerprint()).cloned();

		Box::pin(async move { found.ok_or(CacheError::NotFound) })
	}

	fn save<'a>(
		&'a self,
		identity: &'a ClientIdentity,
		credential: &'a Credential,
	) -> CacheFuture<'a, ()> {
		self.0.write().insert(identity.fingerprint(), credential.clone());

		Box::pin(async { Ok(()) })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{_preludet::*, auth::ScopeSet};

	#[tokio::test]
	async fn save_replaces_previous_entry() {
		let cache = MemoryCache::default();
		let identity = test_identity();

		assert_eq!(cache.load(&identity).await.err(), Some(CacheError::NotFound));

		for token in ["first", "second"] {
			let credential = Credential::builder(identity.scope.clone())
				.access_token(token)
				.expires_in(Duration::hours(1))
				.build()
				.expect("Credential fixture should build.");

			cache.save(&identity, &credential).await.expect("Memory save should succeed.");
		}

		let loaded = cache.load(&identity).await.expect("Saved credential should load.");

		assert_eq!(loaded.access_token.expose(), "second");
		assert_eq!(cache.len(), 1);
	}

	#[tokio::test]
	async fn identities_with_different_scopes_do_not_collide() {
		let cache = MemoryCache::default();
		let identity = test_identity();
		let other = ClientIdentity::new(
			identity.tenant.clone(),
			identity.client_id.clone(),
			ScopeSet::new(["Mail.Read"]).expect("Scope fixture should be valid."),
		);
		let credential = Credential::builder(identity.scope.clone())
			.access_token("user-read")
			.expires_in(Duration::hours(1))
			.build()
			.expect("Credential fixture should build.");

		cache.save(&identity, &credential).await.expect("Memory save should succeed.");

		assert!(cache.load(&other).await.is_err());
	}
}

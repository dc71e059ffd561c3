//! Cache that never stores anything.

// self
use crate::{
	_prelude::*,
	auth::{ClientIdentity, Credential},
	cache::{CacheError, CacheFuture, TokenCache},
};

/// Cache whose loads always miss and whose saves are discarded.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullCache;
impl TokenCache for NullCache {
	fn load<'a>(&'a self, _: &'a ClientIdentity) -> CacheFuture<'a, Credential> {
		Box::pin(async { Err(CacheError::NotFound) })
	}

	fn save<'a>(&'a self, _: &'a ClientIdentity, _: &'a Credential) -> CacheFuture<'a, ()> {
		Box::pin(async { Ok(()) })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::*;

	#[tokio::test]
	async fn save_then_load_still_misses() {
		let identity = test_identity();
		let credential = Credential::builder(identity.scope.clone())
			.access_token("discarded")
			.expires_in(Duration::hours(1))
			.build()
			.expect("Credential fixture should build.");

		NullCache.save(&identity, &credential).await.expect("Null save should succeed.");

		assert_eq!(NullCache.load(&identity).await.err(), Some(CacheError::NotFound));
	}
}

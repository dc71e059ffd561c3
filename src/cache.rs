//! Credential cache contract and built-in cache backends.

pub mod file;
pub mod memory;
pub mod null;

pub use file::FileCache;
pub use memory::MemoryCache;
pub use null::NullCache;

// self
use crate::{
	_prelude::*,
	auth::{ClientIdentity, Credential},
};

/// Boxed future returned by [`TokenCache`] operations.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CacheError>> + 'a + Send>>;

/// Persistence for the credential obtained by an interactive login.
///
/// A cache holds at most one credential per [`ClientIdentity`]; saving replaces the
/// previous entry.
pub trait TokenCache
where
	Self: Send + Sync,
{
	/// Loads the credential for `identity`, failing with [`CacheError::NotFound`] on a miss.
	fn load<'a>(&'a self, identity: &'a ClientIdentity) -> CacheFuture<'a, Credential>;

	/// Persists or replaces the credential for `identity`.
	fn save<'a>(
		&'a self,
		identity: &'a ClientIdentity,
		credential: &'a Credential,
	) -> CacheFuture<'a, ()>;
}

/// Error type produced by [`TokenCache`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CacheError {
	/// No credential is stored for the identity.
	#[error("No cached credential.")]
	NotFound,
	/// Stored data could not be encoded or decoded.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage medium.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
impl CacheError {
	/// Returns `true` for [`CacheError::NotFound`].
	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::NotFound)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn cache_error_converts_into_crate_error_with_source() {
		let cache_error = CacheError::Backend { message: "disk unavailable".into() };
		let error: Error = cache_error.clone().into();

		assert!(matches!(error, Error::Cache(_)));
		assert!(error.to_string().contains("disk unavailable"));

		let source =
			StdError::source(&error).expect("Crate error should expose the cache error as source.");

		assert_eq!(source.to_string(), cache_error.to_string());
	}
}

//! Credential providers: where the bearer token attached to each API call comes from.
//!
//! A [`Client`](crate::client::Client) holds exactly one provider for its lifetime:
//!
//! - [`ClientCredentialsProvider`] exchanges an application secret without user interaction.
//! - [`AuthorizationCodeProvider`] runs the interactive browser login with a loopback listener.
//! - [`StaticCredentials`] hands out a fixed credential.

pub mod authorization_code;
pub mod browser;
pub mod client_credentials;
pub mod loopback;

mod fixed;
mod slot;

pub use authorization_code::*;
pub use browser::*;
pub use client_credentials::*;
pub use fixed::*;
pub use loopback::*;
pub use slot::RefreshPolicy;

// self
use crate::{
	_prelude::*,
	auth::{ClientIdentity, Credential},
};

/// Boxed future returned by [`CredentialProvider::authenticate`].
pub type CredentialFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Source of valid bearer credentials.
pub trait CredentialProvider
where
	Self: Send + Sync,
{
	/// Identity the credentials are issued for.
	fn identity(&self) -> &ClientIdentity;

	/// Returns a credential that is valid now, renewing it first when it is about to expire.
	///
	/// Concurrent callers share one renewal; the renewed credential replaces the old one
	/// wholesale.
	fn authenticate(&self) -> CredentialFuture<'_, Arc<Credential>>;
}

//! Authenticated REST execution for multi-tenant cloud APIs: OAuth 2.0 client-credentials and
//! loopback authorization-code flows, cursor-driven pagination, and typed query options.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod client;
pub mod credentials;
pub mod error;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod provider;
pub mod query;
pub mod response;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{ClientId, ClientIdentity, Credential, ScopeSet, TenantId},
		client::{Client, ClientConfig},
		credentials::{CredentialProvider, StaticCredentials},
		http::ReqwestHttpClient,
	};

	/// Bearer token attached by [`build_test_client`].
	pub const TEST_ACCESS_TOKEN: &str = "test-access-token";

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_client() -> ReqwestClient {
		ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.")
	}

	/// Wraps [`test_reqwest_client`] for the token-endpoint transport.
	pub fn test_token_http_client() -> ReqwestHttpClient {
		ReqwestHttpClient::with_client(test_reqwest_client())
	}

	/// Identity fixture shared by integration tests.
	pub fn test_identity() -> ClientIdentity {
		ClientIdentity::new(
			TenantId::new("tenant-test").expect("Tenant fixture should be valid."),
			ClientId::new("client-test").expect("Client fixture should be valid."),
			ScopeSet::new(["User.Read"]).expect("Scope fixture should be valid."),
		)
	}

	/// Constructs a [`Client`] whose requests carry [`TEST_ACCESS_TOKEN`] and use the insecure
	/// test transport.
	pub fn build_test_client(config: ClientConfig) -> Client {
		let provider: Arc<dyn CredentialProvider> = Arc::new(StaticCredentials::new(
			test_identity(),
			TEST_ACCESS_TOKEN,
			OffsetDateTime::now_utc() + Duration::hours(1),
		));

		Client::with_http_client(provider, config, test_reqwest_client())
	}

	/// Issues a credential as a completed token exchange would, for seeding caches.
	pub fn issued_credential(
		scope: ScopeSet,
		access_token: &str,
		refresh_token: Option<&str>,
		expires_in: Duration,
	) -> Credential {
		let builder = Credential::builder(scope).access_token(access_token).expires_in(expires_in);
		let builder = match refresh_token {
			Some(token) => builder.refresh_token(token),
			None => builder,
		};

		builder.build().expect("Issued credential fixture should build.")
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap, HashSet, hash_map::DefaultHasher},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		hash::{Hash, Hasher},
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use bytes::Bytes;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError, Method, StatusCode};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use tokio_util::sync::CancellationToken;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};

//! Non-interactive client-credentials provider.
//!
//! The first exchange happens inside [`ClientCredentialsBuilder::build`], so a bad secret
//! or a disabled application is reported when the client is constructed rather than on its
//! first request. Later renewals are plain re-exchanges; this grant issues no refresh token.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, ClientIdentity, Credential, ScopeSet, TenantId, TokenSecret},
	credentials::{CredentialFuture, CredentialProvider, RefreshPolicy, slot::CredentialSlot},
	error::ConfigError,
	http::{ReqwestHttpClient, TokenHttpClient},
	oauth::BasicFacade,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::{DefaultProviderStrategy, GrantType, ProviderDescriptor, ProviderStrategy},
};

/// Scope requesting every application permission granted to the client on the API.
pub const DEFAULT_APP_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Provider backed by the client-credentials grant.
pub struct ClientCredentialsProvider<C = ReqwestHttpClient>
where
	C: TokenHttpClient,
{
	identity: ClientIdentity,
	facade: BasicFacade<C>,
	slot: CredentialSlot,
}
impl ClientCredentialsProvider {
	/// Starts a builder for `tenant`/`client_id` authenticated with `secret`.
	pub fn builder(
		tenant: TenantId,
		client_id: ClientId,
		secret: impl Into<String>,
	) -> ClientCredentialsBuilder {
		ClientCredentialsBuilder {
			tenant,
			client_id,
			secret: TokenSecret::new(secret),
			scope: None,
			descriptor: None,
			strategy: Arc::new(DefaultProviderStrategy),
			http_client: Arc::new(ReqwestHttpClient::default()),
			preemptive_window: RefreshPolicy::DEFAULT_WINDOW,
		}
	}
}
impl<C> ClientCredentialsProvider<C>
where
	C: TokenHttpClient,
{
	async fn exchange(facade: &BasicFacade<C>, scope: &ScopeSet, stage: &'static str) -> Result<Credential> {
		const KIND: FlowKind = FlowKind::ClientCredentials;

		let span = FlowSpan::new(KIND, stage);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(facade.exchange_client_credentials(scope)).await;

		obs::record_flow_outcome(KIND, FlowOutcome::of(&result));

		result
	}
}
impl<C> CredentialProvider for ClientCredentialsProvider<C>
where
	C: TokenHttpClient,
{
	fn identity(&self) -> &ClientIdentity {
		&self.identity
	}

	fn authenticate(&self) -> CredentialFuture<'_, Arc<Credential>> {
		Box::pin(async move {
			self.slot
				.current_or_renew(|_| Self::exchange(&self.facade, &self.identity.scope, "renew"))
				.await
		})
	}
}
impl<C> Debug for ClientCredentialsProvider<C>
where
	C: TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCredentialsProvider").field("identity", &self.identity).finish()
	}
}

/// Builder for [`ClientCredentialsProvider`].
pub struct ClientCredentialsBuilder<C = ReqwestHttpClient>
where
	C: TokenHttpClient,
{
	tenant: TenantId,
	client_id: ClientId,
	secret: TokenSecret,
	scope: Option<ScopeSet>,
	descriptor: Option<ProviderDescriptor>,
	strategy: Arc<dyn ProviderStrategy>,
	http_client: Arc<C>,
	preemptive_window: Duration,
}
impl<C> ClientCredentialsBuilder<C>
where
	C: TokenHttpClient,
{
	/// Overrides the requested scopes; defaults to [`DEFAULT_APP_SCOPE`].
	pub fn scope(mut self, scope: ScopeSet) -> Self {
		self.scope = Some(scope);

		self
	}

	/// Overrides the provider; defaults to [`ProviderDescriptor::azure_ad`] for the tenant.
	pub fn descriptor(mut self, descriptor: ProviderDescriptor) -> Self {
		self.descriptor = Some(descriptor);

		self
	}

	/// Overrides the error classification strategy.
	pub fn strategy(mut self, strategy: Arc<dyn ProviderStrategy>) -> Self {
		self.strategy = strategy;

		self
	}

	/// Overrides how long before expiry the credential is renewed.
	pub fn preemptive_window(mut self, window: Duration) -> Self {
		self.preemptive_window = window;

		self
	}

	/// Swaps the token-endpoint transport.
	pub fn http_client<C2>(self, http_client: C2) -> ClientCredentialsBuilder<C2>
	where
		C2: TokenHttpClient,
	{
		ClientCredentialsBuilder {
			tenant: self.tenant,
			client_id: self.client_id,
			secret: self.secret,
			scope: self.scope,
			descriptor: self.descriptor,
			strategy: self.strategy,
			http_client: Arc::new(http_client),
			preemptive_window: self.preemptive_window,
		}
	}

	/// Performs the initial exchange and returns the ready provider.
	pub async fn build(self) -> Result<ClientCredentialsProvider<C>> {
		let descriptor = match self.descriptor {
			Some(descriptor) => descriptor,
			None => ProviderDescriptor::azure_ad(&self.tenant).map_err(ConfigError::from)?,
		};

		if !descriptor.supports(GrantType::ClientCredentials) {
			return Err(ConfigError::UnsupportedGrant {
				descriptor: descriptor.id.to_string(),
				grant: GrantType::ClientCredentials.as_str(),
			}
			.into());
		}

		let scope = match self.scope {
			Some(scope) => scope,
			None => ScopeSet::new([DEFAULT_APP_SCOPE]).map_err(ConfigError::from)?,
		};
		let identity =
			ClientIdentity::new(self.tenant, self.client_id, scope).with_secret(&self.secret);
		let facade = BasicFacade::from_descriptor(
			&descriptor,
			&identity.client_id,
			Some(&self.secret),
			self.http_client,
			self.strategy,
		)?;
		let credential =
			ClientCredentialsProvider::<C>::exchange(&facade, &identity.scope, "build").await?;
		let policy = RefreshPolicy::for_identity(&identity).with_window(self.preemptive_window);

		Ok(ClientCredentialsProvider { identity, facade, slot: CredentialSlot::new(credential, policy) })
	}
}

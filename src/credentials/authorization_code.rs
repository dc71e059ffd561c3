//! Interactive authorization-code provider.
//!
//! [`AuthorizationCodeBuilder::authenticate`] runs the whole login:
//!
//! 1. Look the identity up in the [`TokenCache`]; a usable hit returns without interaction.
//! 2. Generate a fresh state nonce and the authorization URL (with `offline_access`).
//! 3. Bind the [`CallbackListener`], then open the browser.
//! 4. Race callback, cancellation, and timeout; release the port.
//! 5. Exchange the code and save the credential to the cache.
//!
//! Renewal afterwards uses the refresh token and writes the result back to the cache.

mod session;

// crates.io
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	auth::{ClientId, ClientIdentity, Credential, OFFLINE_ACCESS, ScopeSet, TenantId, TokenSecret},
	cache::{NullCache, TokenCache},
	credentials::{
		BrowserLauncher, CallbackListener, CredentialFuture, CredentialProvider, LoopbackConfig,
		RefreshPolicy, SystemBrowser, authorization_code::session::AuthorizationRequest,
		slot::CredentialSlot,
	},
	error::{ConfigError, CredentialExchangeError, InteractiveFlowError},
	http::{ReqwestHttpClient, TokenHttpClient},
	oauth::BasicFacade,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::{DefaultProviderStrategy, GrantType, ProviderDescriptor, ProviderStrategy},
};

/// Provider backed by an interactive browser login.
pub struct AuthorizationCodeProvider<C = ReqwestHttpClient>
where
	C: TokenHttpClient,
{
	identity: ClientIdentity,
	descriptor: ProviderDescriptor,
	facade: BasicFacade<C>,
	cache: Arc<dyn TokenCache>,
	slot: CredentialSlot,
}
impl AuthorizationCodeProvider {
	/// Starts a builder; `offline_access` is added to `scope` automatically.
	pub fn builder(tenant: TenantId, client_id: ClientId, scope: ScopeSet) -> AuthorizationCodeBuilder {
		AuthorizationCodeBuilder {
			tenant,
			client_id,
			scope,
			secret: None,
			descriptor: None,
			strategy: Arc::new(DefaultProviderStrategy),
			cache: Arc::new(NullCache),
			loopback: LoopbackConfig::default(),
			browser: Arc::new(SystemBrowser),
			cancel: CancellationToken::new(),
			http_client: Arc::new(ReqwestHttpClient::default()),
			preemptive_window: RefreshPolicy::DEFAULT_WINDOW,
		}
	}
}
impl<C> AuthorizationCodeProvider<C>
where
	C: TokenHttpClient,
{
	async fn renew(&self, current: Arc<Credential>) -> Result<Credential> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "renew");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async {
				if !self.descriptor.supports(GrantType::RefreshToken) {
					return Err(ConfigError::UnsupportedGrant {
						descriptor: self.descriptor.id.to_string(),
						grant: GrantType::RefreshToken.as_str(),
					}
					.into());
				}

				let refresh = current
					.refresh_token
					.as_ref()
					.ok_or(CredentialExchangeError::MissingRefreshToken)?;
				let fresh = self.facade.refresh_token(refresh, &self.identity.scope).await?;

				save_best_effort(self.cache.as_ref(), &self.identity, &fresh).await;

				Ok(fresh)
			})
			.await;

		obs::record_flow_outcome(KIND, FlowOutcome::of(&result));

		result
	}
}
impl<C> CredentialProvider for AuthorizationCodeProvider<C>
where
	C: TokenHttpClient,
{
	fn identity(&self) -> &ClientIdentity {
		&self.identity
	}

	fn authenticate(&self) -> CredentialFuture<'_, Arc<Credential>> {
		Box::pin(async move { self.slot.current_or_renew(|current| self.renew(current)).await })
	}
}
impl<C> Debug for AuthorizationCodeProvider<C>
where
	C: TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizationCodeProvider")
			.field("identity", &self.identity)
			.field("descriptor", &self.descriptor.id)
			.finish()
	}
}

/// Builder for [`AuthorizationCodeProvider`].
pub struct AuthorizationCodeBuilder<C = ReqwestHttpClient>
where
	C: TokenHttpClient,
{
	tenant: TenantId,
	client_id: ClientId,
	scope: ScopeSet,
	secret: Option<TokenSecret>,
	descriptor: Option<ProviderDescriptor>,
	strategy: Arc<dyn ProviderStrategy>,
	cache: Arc<dyn TokenCache>,
	loopback: LoopbackConfig,
	browser: Arc<dyn BrowserLauncher>,
	cancel: CancellationToken,
	http_client: Arc<C>,
	preemptive_window: Duration,
}
impl<C> AuthorizationCodeBuilder<C>
where
	C: TokenHttpClient,
{
	/// Attaches a client secret for confidential applications.
	pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
		self.secret = Some(TokenSecret::new(secret));

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

	/// Persists credentials in `cache`; defaults to [`NullCache`].
	pub fn cache(mut self, cache: Arc<dyn TokenCache>) -> Self {
		self.cache = cache;

		self
	}

	/// Overrides the loopback listener settings.
	pub fn loopback(mut self, loopback: LoopbackConfig) -> Self {
		self.loopback = loopback;

		self
	}

	/// Overrides how the authorization URL is opened; defaults to [`SystemBrowser`].
	pub fn browser(mut self, browser: Arc<dyn BrowserLauncher>) -> Self {
		self.browser = browser;

		self
	}

	/// Aborts the login when `cancel` fires.
	pub fn cancellation(mut self, cancel: CancellationToken) -> Self {
		self.cancel = cancel;

		self
	}

	/// Overrides how long before expiry the credential is renewed.
	pub fn preemptive_window(mut self, window: Duration) -> Self {
		self.preemptive_window = window;

		self
	}

	/// Swaps the token-endpoint transport.
	pub fn http_client<C2>(self, http_client: C2) -> AuthorizationCodeBuilder<C2>
	where
		C2: TokenHttpClient,
	{
		AuthorizationCodeBuilder {
			tenant: self.tenant,
			client_id: self.client_id,
			scope: self.scope,
			secret: self.secret,
			descriptor: self.descriptor,
			strategy: self.strategy,
			cache: self.cache,
			loopback: self.loopback,
			browser: self.browser,
			cancel: self.cancel,
			http_client: Arc::new(http_client),
			preemptive_window: self.preemptive_window,
		}
	}

	/// Runs the login, or returns the cached credential for this identity.
	pub async fn authenticate(self) -> Result<AuthorizationCodeProvider<C>> {
		const KIND: FlowKind = FlowKind::AuthorizationCode;

		let span = FlowSpan::new(KIND, "authenticate");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.run()).await;

		obs::record_flow_outcome(KIND, FlowOutcome::of(&result));

		result
	}

	async fn run(self) -> Result<AuthorizationCodeProvider<C>> {
		let descriptor = match self.descriptor {
			Some(descriptor) => descriptor,
			None => ProviderDescriptor::azure_ad(&self.tenant).map_err(ConfigError::from)?,
		};

		if !descriptor.supports(GrantType::AuthorizationCode) {
			return Err(ConfigError::UnsupportedGrant {
				descriptor: descriptor.id.to_string(),
				grant: GrantType::AuthorizationCode.as_str(),
			}
			.into());
		}

		let scope = self.scope.with(OFFLINE_ACCESS).map_err(ConfigError::from)?;
		let mut identity = ClientIdentity::new(self.tenant, self.client_id, scope);

		if let Some(secret) = &self.secret {
			identity = identity.with_secret(secret);
		}

		let facade = BasicFacade::from_descriptor(
			&descriptor,
			&identity.client_id,
			self.secret.as_ref(),
			self.http_client,
			self.strategy,
		)?;
		let policy = RefreshPolicy::for_identity(&identity).with_window(self.preemptive_window);
		let cached = load_cached(self.cache.as_ref(), &identity)
			.await
			.filter(|c| c.refresh_token.is_some() || !c.is_expired());
		let credential = match cached {
			Some(credential) => credential,
			None => {
				let redirect_uri = self.loopback.redirect_uri()?;
				let request = AuthorizationRequest::new(
					&descriptor,
					&identity.client_id,
					&redirect_uri,
					&identity.scope,
				);
				let mut listener = CallbackListener::bind(&self.loopback, &request.state).await?;

				if let Err(source) = self.browser.open(&request.authorize_url) {
					listener.shutdown().await;

					return Err(InteractiveFlowError::BrowserLaunch { source }.into());
				}

				let code = listener.wait(&self.cancel, self.loopback.wait).await?;
				let credential =
					facade.exchange_authorization_code(&code, &identity.scope, &redirect_uri).await?;

				save_best_effort(self.cache.as_ref(), &identity, &credential).await;

				credential
			},
		};

		Ok(AuthorizationCodeProvider {
			identity,
			descriptor,
			facade,
			cache: self.cache,
			slot: CredentialSlot::new(credential, policy),
		})
	}
}

// Any load failure counts as a miss; a corrupt entry is replaced by the next save.
async fn load_cached(cache: &dyn TokenCache, identity: &ClientIdentity) -> Option<Credential> {
	match cache.load(identity).await {
		Ok(credential) => Some(credential),
		Err(e) => {
			#[cfg(feature = "tracing")]
			if !e.is_not_found() {
				tracing::warn!(error = %e, "Token cache load failed; starting interactive login.");
			}
			#[cfg(not(feature = "tracing"))]
			let _ = e;

			None
		},
	}
}

async fn save_best_effort(cache: &dyn TokenCache, identity: &ClientIdentity, credential: &Credential) {
	if let Err(e) = cache.save(identity, credential).await {
		#[cfg(feature = "tracing")]
		tracing::warn!(error = %e, "Token cache save failed; credential kept in memory only.");
		#[cfg(not(feature = "tracing"))]
		let _ = e;
	}
}

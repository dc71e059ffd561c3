//! Token-endpoint exchanges built on the `oauth2` crate.

pub use oauth2;

// std
use std::borrow::Cow;
// crates.io
use oauth2::{
	AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
	HttpClientError, RedirectUrl, RefreshToken, RequestTokenError, Scope, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	auth::{Credential, ScopeSet, TokenSecret},
	error::{ConfigError, CredentialExchangeError, TransportError},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	provider::{
		ClientAuthMethod, GrantType, ProviderDescriptor, ProviderErrorContext, ProviderErrorKind,
		ProviderStrategy,
	},
};

type ConfiguredBasicClient =
	BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;
type FacadeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// `oauth2` client bound to one descriptor, one transport, and one error strategy.
pub(crate) struct BasicFacade<C>
where
	C: ?Sized + TokenHttpClient,
{
	oauth_client: ConfiguredBasicClient,
	http_client: Arc<C>,
	strategy: Arc<dyn ProviderStrategy>,
}
impl<C> BasicFacade<C>
where
	C: ?Sized + TokenHttpClient,
{
	pub(crate) fn from_descriptor(
		descriptor: &ProviderDescriptor,
		client_id: &str,
		client_secret: Option<&TokenSecret>,
		http_client: Arc<C>,
		strategy: Arc<dyn ProviderStrategy>,
	) -> Result<Self> {
		let auth_url = AuthUrl::new(descriptor.endpoints.authorization.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let token_url = TokenUrl::new(descriptor.endpoints.token.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let mut oauth_client = BasicClient::new(ClientId::new(client_id.to_owned()))
			.set_auth_uri(auth_url)
			.set_token_uri(token_url);

		match (descriptor.preferred_client_auth_method, client_secret) {
			(ClientAuthMethod::None, _) | (_, None) => {},
			(method, Some(secret)) => {
				oauth_client =
					oauth_client.set_client_secret(ClientSecret::new(secret.expose().to_owned()));

				if method == ClientAuthMethod::ClientSecretPost {
					oauth_client = oauth_client.set_auth_type(AuthType::RequestBody);
				}
			},
		}

		Ok(Self { oauth_client, http_client, strategy })
	}

	/// Performs the client-credentials grant for `scope`.
	pub(crate) fn exchange_client_credentials<'a>(
		&'a self,
		scope: &'a ScopeSet,
	) -> FacadeFuture<'a, Credential> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.with_metadata(meta.clone());
			let request = scope.iter().fold(
				self.oauth_client.exchange_client_credentials(),
				|request, scope| request.add_scope(Scope::new(scope.to_owned())),
			);
			let response = request.request_async(&instrumented).await.map_err(|e| {
				self.map_request_error(GrantType::ClientCredentials, meta.take(), e)
			})?;

			build_credential(scope, response, None)
		})
	}

	/// Redeems an authorization code delivered to `redirect_uri`.
	pub(crate) fn exchange_authorization_code<'a>(
		&'a self,
		code: &'a str,
		scope: &'a ScopeSet,
		redirect_uri: &'a Url,
	) -> FacadeFuture<'a, Credential> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.with_metadata(meta.clone());
			let redirect_url = RedirectUrl::new(redirect_uri.to_string())
				.map_err(|source| ConfigError::InvalidRedirect { source })?;
			let mut request = self
				.oauth_client
				.exchange_code(AuthorizationCode::new(code.to_owned()))
				.set_redirect_uri(Cow::Owned(redirect_url));

			if !scope.is_empty() {
				request = request.add_extra_param("scope", scope.normalized());
			}

			let response = request.request_async(&instrumented).await.map_err(|e| {
				self.map_request_error(GrantType::AuthorizationCode, meta.take(), e)
			})?;

			build_credential(scope, response, None)
		})
	}

	/// Redeems a refresh token. The previous refresh token is carried over when the
	/// provider does not rotate it.
	pub(crate) fn refresh_token<'a>(
		&'a self,
		refresh_token: &'a TokenSecret,
		scope: &'a ScopeSet,
	) -> FacadeFuture<'a, Credential> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.with_metadata(meta.clone());
			let secret = RefreshToken::new(refresh_token.expose().to_owned());
			let request = scope.iter().fold(
				self.oauth_client.exchange_refresh_token(&secret),
				|request, scope| request.add_scope(Scope::new(scope.to_owned())),
			);
			let response = request
				.request_async(&instrumented)
				.await
				.map_err(|e| self.map_request_error(GrantType::RefreshToken, meta.take(), e))?;

			build_credential(scope, response, Some(refresh_token))
		})
	}

	fn map_request_error(
		&self,
		grant: GrantType,
		meta: Option<ResponseMetadata>,
		err: BasicRequestTokenError<HttpClientError<C::TransportError>>,
	) -> Error {
		let status = meta.and_then(|m| m.status);

		match err {
			RequestTokenError::ServerResponse(response) =>
				self.map_server_response(grant, status, response).into(),
			RequestTokenError::Request(error) => map_transport_error(error),
			RequestTokenError::Parse(source, _body) =>
				CredentialExchangeError::ResponseParse { source, status }.into(),
			RequestTokenError::Other(message) =>
				CredentialExchangeError::Endpoint { message, status }.into(),
		}
	}

	fn map_server_response(
		&self,
		grant: GrantType,
		status: Option<u16>,
		response: BasicErrorResponse,
	) -> CredentialExchangeError {
		let code = response.error().as_ref().to_owned();
		let mut ctx = ProviderErrorContext::new(grant).with_oauth_error(code.clone());

		if let Some(description) = response.error_description() {
			ctx = ctx.with_error_description(description.clone());
		}
		if let Some(status) = status {
			ctx = ctx.with_http_status(status);
		}

		let reason = match response.error_description() {
			Some(description) => format!("{code}: {description}"),
			None => code,
		};

		match self.strategy.classify_token_error(&ctx) {
			ProviderErrorKind::InvalidGrant => CredentialExchangeError::InvalidGrant { reason, status },
			ProviderErrorKind::InvalidClient =>
				CredentialExchangeError::InvalidClient { reason, status },
			ProviderErrorKind::InsufficientScope =>
				CredentialExchangeError::InsufficientScope { reason, status },
			ProviderErrorKind::Other => CredentialExchangeError::Endpoint { message: reason, status },
		}
	}
}

fn build_credential(
	scope: &ScopeSet,
	response: BasicTokenResponse,
	previous_refresh: Option<&TokenSecret>,
) -> Result<Credential> {
	let expires_in =
		response.expires_in().ok_or(CredentialExchangeError::MissingExpiresIn)?.as_secs();
	let expires_in =
		i64::try_from(expires_in).map_err(|_| CredentialExchangeError::InvalidExpiresIn)?;

	if expires_in <= 0 {
		return Err(CredentialExchangeError::InvalidExpiresIn.into());
	}

	let mut builder = Credential::builder(scope.clone())
		.access_token(response.access_token().secret().to_owned())
		.issued_at(OffsetDateTime::now_utc())
		.expires_in(Duration::seconds(expires_in));
	let refresh = response
		.refresh_token()
		.map(|token| token.secret().to_owned())
		.or_else(|| previous_refresh.map(|token| token.expose().to_owned()));

	if let Some(refresh) = refresh {
		builder = builder.refresh_token(refresh);
	}

	builder.build().map_err(|e| ConfigError::from(e).into())
}

fn map_transport_error<E>(err: HttpClientError<E>) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	match err {
		HttpClientError::Reqwest(inner) => {
			let erased: Box<dyn StdError + Send + Sync> = inner;
			let timed_out = erased.downcast_ref::<ReqwestError>().is_some_and(ReqwestError::is_timeout);

			if timed_out {
				TransportError::Timeout { endpoint: TransportError::TOKEN, source: erased }.into()
			} else {
				TransportError::Network { endpoint: TransportError::TOKEN, source: erased }.into()
			}
		},
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) =>
			CredentialExchangeError::Endpoint { message, status: None }.into(),
		_ => CredentialExchangeError::Endpoint {
			message: "HTTP client failed while calling the token endpoint".into(),
			status: None,
		}
		.into(),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		auth::{ProviderId, TenantId},
		http::ReqwestHttpClient,
		provider::DefaultProviderStrategy,
	};

	fn facade(method: ClientAuthMethod, secret: Option<&TokenSecret>) -> Result<BasicFacade<ReqwestHttpClient>> {
		let descriptor = ProviderDescriptor::builder(
			ProviderId::new("test-provider").expect("Provider id should be valid."),
		)
		.authorization_endpoint(
			Url::parse("https://example.com/oauth2/authorize")
				.expect("Authorization endpoint should parse."),
		)
		.token_endpoint(
			Url::parse("https://example.com/oauth2/token").expect("Token endpoint should parse."),
		)
		.support_grant(GrantType::AuthorizationCode)
		.preferred_client_auth_method(method)
		.build()
		.expect("Descriptor should build.");

		BasicFacade::from_descriptor(
			&descriptor,
			"client-id",
			secret,
			Arc::new(ReqwestHttpClient::default()),
			Arc::new(DefaultProviderStrategy),
		)
	}

	#[test]
	fn builds_for_every_auth_method() {
		let secret = TokenSecret::new("secret");

		for method in
			[ClientAuthMethod::ClientSecretBasic, ClientAuthMethod::ClientSecretPost, ClientAuthMethod::None]
		{
			assert!(facade(method, Some(&secret)).is_ok(), "{method:?} facade should build.");
		}

		assert!(facade(ClientAuthMethod::ClientSecretPost, None).is_ok());
	}

	#[test]
	fn azure_preset_builds_a_facade() {
		let tenant = TenantId::new("common").expect("Tenant should be valid.");
		let descriptor = ProviderDescriptor::azure_ad(&tenant).expect("Azure preset should build.");

		assert!(
			BasicFacade::<ReqwestHttpClient>::from_descriptor(
				&descriptor,
				"client-id",
				None,
				Arc::new(ReqwestHttpClient::default()),
				Arc::new(DefaultProviderStrategy),
			)
			.is_ok()
		);
	}
}

// crates.io
use reqwest::{Body, header::HeaderMap};
// self
use crate::{
	_prelude::*,
	client::ClientConfig,
	credentials::CredentialProvider,
	error::TransportError,
	obs::{self, ApiLogEntry, FlowKind, FlowOutcome, FlowSpan},
	response::{self, Outcome},
};

/// HTTP client that attaches a valid bearer credential to every request.
///
/// Renewal happens inside [`CredentialProvider::authenticate`], so an expired credential is
/// replaced before the request leaves.
#[derive(Clone)]
pub struct AuthenticatedTransport {
	http: ReqwestClient,
	provider: Arc<dyn CredentialProvider>,
}
impl AuthenticatedTransport {
	/// Pairs an HTTP client with the provider its bearer tokens come from.
	pub fn new(provider: Arc<dyn CredentialProvider>, http: ReqwestClient) -> Self {
		Self { http, provider }
	}

	/// Provider backing this transport.
	pub fn provider(&self) -> &Arc<dyn CredentialProvider> {
		&self.provider
	}

	/// Performs one round trip and classifies the response.
	///
	/// The body is read in full before classification so the API log sink and the decoder
	/// both see the same bytes.
	pub async fn execute(
		&self,
		config: &ClientConfig,
		method: Method,
		url: &Url,
		headers: &HeaderMap,
		body: Option<Body>,
		stage: &'static str,
	) -> Result<Outcome> {
		const KIND: FlowKind = FlowKind::Api;

		let span = FlowSpan::new(KIND, stage);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.round_trip(config, method, url, headers, body)).await;

		obs::record_flow_outcome(KIND, FlowOutcome::of(&result));

		result
	}

	async fn round_trip(
		&self,
		config: &ClientConfig,
		method: Method,
		url: &Url,
		headers: &HeaderMap,
		body: Option<Body>,
	) -> Result<Outcome> {
		let credential = self.provider.authenticate().await?;
		let mut request = self
			.http
			.request(method.clone(), url.clone())
			.timeout(config.call_timeout)
			.headers(headers.clone())
			.bearer_auth(credential.access_token.expose());

		if let Some(body) = body {
			request = request.header(reqwest::header::CONTENT_TYPE, "application/json").body(body);
		}

		let response = request
			.send()
			.await
			.map_err(|e| TransportError::from_reqwest(TransportError::API, e))?;
		let status = response.status();
		let bytes =
			response.bytes().await.map_err(|e| TransportError::from_reqwest(TransportError::API, e))?;

		#[cfg(feature = "tracing")]
		tracing::debug!(method = %method, url = %url, status = status.as_u16(), "API round trip completed.");

		if let Some(sink) = &config.api_log {
			sink.record(&ApiLogEntry { method: &method, url, status, body: &bytes });
		}

		Ok(response::classify(status, bytes))
	}
}
impl Debug for AuthenticatedTransport {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthenticatedTransport").field("identity", self.provider.identity()).finish()
	}
}

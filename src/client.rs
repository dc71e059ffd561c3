//! Execution engine: authenticated requests, response classification, and cursor-driven
//! pagination.
//!
//! Every request goes through the client's [`AuthenticatedTransport`] and is classified by
//! [`response::classify`](crate::response::classify):
//!
//! - `200` bodies reach the decoder.
//! - Other `2xx` statuses succeed without decoding.
//! - Everything else becomes an [`ApiError`](crate::response::ApiError).
//!
//! Paginated traversal is all-or-nothing: a failure on any page discards the items gathered so
//! far and returns the error.

mod body;
mod config;
mod page;
mod transport;

pub use config::*;
pub use page::*;
pub use transport::*;

// crates.io
use reqwest::header::HeaderMap;
// self
use crate::{
	_prelude::*,
	auth::ClientIdentity,
	credentials::CredentialProvider,
	error::{ConfigError, DecodeError},
	query::RequestOptions,
	response::{self, ApiError, Outcome},
};

/// Authenticated API client bound to one credential provider.
#[derive(Clone, Debug)]
pub struct Client {
	transport: AuthenticatedTransport,
	config: ClientConfig,
}
impl Client {
	/// Builds a client with a default `reqwest` transport.
	pub fn new(provider: Arc<dyn CredentialProvider>, config: ClientConfig) -> Result<Self> {
		let http = ReqwestClient::builder().build().map_err(ConfigError::http_client_build)?;

		Ok(Self::with_http_client(provider, config, http))
	}

	/// Builds a client over a caller-supplied `reqwest` client.
	pub fn with_http_client(
		provider: Arc<dyn CredentialProvider>,
		config: ClientConfig,
		http: ReqwestClient,
	) -> Self {
		Self { transport: AuthenticatedTransport::new(provider, http), config }
	}

	/// Identity the client authenticates as.
	pub fn identity(&self) -> &ClientIdentity {
		self.transport.provider().identity()
	}

	/// Current configuration.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Sets the per-call timeout; a zero duration leaves the current value in place.
	pub fn set_call_timeout(&mut self, timeout: StdDuration) {
		self.config = self.config.clone().with_call_timeout(timeout);
	}

	/// GETs `url` and decodes a `200` body as JSON; other `2xx` statuses yield `None`.
	pub async fn get<T>(&self, url: &Url) -> Result<Option<T>>
	where
		T: DeserializeOwned,
	{
		self.get_with(url, &HeaderMap::new(), response::decode_json).await
	}

	/// GETs `url` with extra headers and a caller-supplied decoder.
	pub async fn get_with<T, D>(&self, url: &Url, headers: &HeaderMap, decode: D) -> Result<Option<T>>
	where
		D: FnOnce(&[u8]) -> Result<T>,
	{
		let outcome =
			self.transport.execute(&self.config, Method::GET, url, headers, None, "get").await?;

		outcome.into_result()?.map(|body| decode(&body)).transpose()
	}

	/// DELETEs `url`; any `2xx` is success and the body is ignored.
	pub async fn delete(&self, url: &Url) -> Result<()> {
		self.transport
			.execute(&self.config, Method::DELETE, url, &HeaderMap::new(), None, "delete")
			.await?
			.into_result()?;

		Ok(())
	}

	/// POSTs `body` as streamed JSON; any `2xx` is success and the response body is ignored.
	pub async fn post<B>(&self, url: &Url, body: B) -> Result<()>
	where
		B: 'static + Send + Serialize,
	{
		self.post_with(url, &HeaderMap::new(), body, |_| Ok(())).await.map(|_| ())
	}

	/// POSTs `body` as streamed JSON and decodes a `200` response with `decode`.
	pub async fn post_with<B, T, D>(
		&self,
		url: &Url,
		headers: &HeaderMap,
		body: B,
		decode: D,
	) -> Result<Option<T>>
	where
		B: 'static + Send + Serialize,
		D: FnOnce(&[u8]) -> Result<T>,
	{
		let (body, encoder) = body::json_body(body);
		let sent = self
			.transport
			.execute(&self.config, Method::POST, url, headers, Some(body), "post")
			.await;

		encoder.finish().await?;

		sent?.into_result()?.map(|body| decode(&body)).transpose()
	}

	/// Follows continuation cursors from `url`, collecting every page's items.
	///
	/// `decode` turns one page body into its items and the next cursor; an empty or missing
	/// cursor ends the traversal. Every page must answer `200`; any other status, including a
	/// bodiless `2xx`, fails the traversal. With `max_items`, no page is fetched once the running total
	/// reaches the budget; the page that crosses it is kept whole.
	pub async fn list_paginated<T, D>(
		&self,
		url: Url,
		headers: &HeaderMap,
		max_items: Option<usize>,
		mut decode: D,
	) -> Result<Vec<T>>
	where
		D: FnMut(&[u8]) -> Result<(Vec<T>, Option<String>)>,
	{
		let mut items = Vec::new();
		let mut visited = HashSet::new();
		let mut next = url;

		loop {
			visited.insert(next.to_string());

			let outcome = self
				.transport
				.execute(&self.config, Method::GET, &next, headers, None, "page")
				.await?;
			let body = match outcome {
				Outcome::Payload(body) => body,
				// Only 200 carries a page.
				Outcome::NoContent(status) =>
					return Err(ApiError::new(
						status.as_u16(),
						response::status_line(status),
						None,
						None,
					)
					.into()),
				Outcome::Failed(e) => return Err(e.into()),
			};
			let (page, cursor) = decode(&body)?;

			items.extend(page);

			if max_items.is_some_and(|max| items.len() >= max) {
				break;
			}

			let Some(cursor) = cursor.filter(|c| !c.is_empty()) else {
				break;
			};

			next = Url::parse(&cursor)
				.map_err(|source| DecodeError::InvalidCursor { cursor: cursor.clone(), source })?;

			if visited.contains(next.as_str()) {
				return Err(DecodeError::RepeatedCursor { cursor }.into());
			}
		}

		#[cfg(feature = "tracing")]
		tracing::debug!(items = items.len(), pages = visited.len(), "Paginated traversal finished.");

		Ok(items)
	}

	/// Lists an OData collection at `base`, applying query options, headers, and the item budget.
	pub async fn list<T>(&self, base: &str, options: &RequestOptions) -> Result<Vec<T>>
	where
		T: DeserializeOwned,
	{
		let url = options.build(base)?;

		self.list_paginated(url, &options.headers(), options.item_budget(), |body| {
			response::decode_json::<Page<T>>(body).map(Page::into_parts)
		})
		.await
	}
}

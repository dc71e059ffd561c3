//! Typed query directives and their translation into a request URL.
//!
//! [`RequestOptions`] collects directives in caller order; [`RequestOptions::build`] checks
//! the mutual-exclusion rules before producing any URL.

// crates.io
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
// self
use crate::{_prelude::*, error::ConfigError};

const PREFER_TEXT_BODY: &str = "outlook.body-content-type=\"text\"";

/// Directives that cannot be combined.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ConflictingOptions {
	/// More than one search directive was supplied.
	#[error("Cannot have more than one search (found {count}).")]
	MultipleSearch {
		/// Number of search directives present.
		count: usize,
	},
	/// A filter was combined with a search.
	#[error("Cannot use a filter with a search request.")]
	FilterWithSearch,
}

/// One typed query directive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestOption {
	/// Raw OData expression passed verbatim as `$filter`.
	Filter(String),
	/// Free-text search, optionally scoped to one property (`from`, `subject`, ...).
	Search {
		/// Text to search for; escaped on output.
		value: String,
		/// Property restricting the search.
		property: Option<String>,
	},
	/// Field to include in `$select`; order is preserved.
	Select(String),
	/// Server page size, sent as `top`.
	PageSize(u32),
	/// Item budget for paginated traversal; never sent to the server.
	MaxItems(usize),
	/// Ask for plain-text message bodies through the `Prefer` header.
	TextBody,
}

/// Ordered collection of [`RequestOption`] values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestOptions(Vec<RequestOption>);
impl RequestOptions {
	/// Creates an empty collection.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a raw directive.
	pub fn push(mut self, option: RequestOption) -> Self {
		self.0.push(option);

		self
	}

	/// Appends a `$filter` expression.
	pub fn filter(self, expression: impl Into<String>) -> Self {
		self.push(RequestOption::Filter(expression.into()))
	}

	/// Appends an unscoped search.
	pub fn search(self, value: impl Into<String>) -> Self {
		self.push(RequestOption::Search { value: value.into(), property: None })
	}

	/// Appends a search scoped to `property`.
	pub fn search_in(self, property: impl Into<String>, value: impl Into<String>) -> Self {
		self.push(RequestOption::Search { value: value.into(), property: Some(property.into()) })
	}

	/// Appends a `$select` field.
	pub fn select(self, field: impl Into<String>) -> Self {
		self.push(RequestOption::Select(field.into()))
	}

	/// Sets the server page size.
	pub fn page_size(self, n: u32) -> Self {
		self.push(RequestOption::PageSize(n))
	}

	/// Sets the traversal item budget.
	pub fn max_items(self, n: usize) -> Self {
		self.push(RequestOption::MaxItems(n))
	}

	/// Requests plain-text message bodies.
	pub fn text_body(self) -> Self {
		self.push(RequestOption::TextBody)
	}

	/// Directives in insertion order.
	pub fn as_slice(&self) -> &[RequestOption] {
		&self.0
	}

	/// First item budget present, if any.
	pub fn item_budget(&self) -> Option<usize> {
		self.0.iter().find_map(|o| match o {
			RequestOption::MaxItems(n) => Some(*n),
			_ => None,
		})
	}

	/// Extra request headers implied by the directives.
	pub fn headers(&self) -> HeaderMap {
		let mut headers = HeaderMap::new();

		if self.0.contains(&RequestOption::TextBody) {
			headers.insert(HeaderName::from_static("prefer"), HeaderValue::from_static(PREFER_TEXT_BODY));
		}

		headers
	}

	/// Produces `base` with a query string rebuilt from the directives.
	///
	/// Any query already present on `base` is replaced.
	pub fn build(&self, base: &str) -> Result<Url> {
		self.check_conflicts()?;

		let mut url = Url::parse(base)
			.map_err(|source| ConfigError::InvalidBaseUrl { url: base.to_owned(), source })?;
		let selected = self
			.0
			.iter()
			.filter_map(|o| match o {
				RequestOption::Select(field) => Some(field.as_str()),
				_ => None,
			})
			.collect::<Vec<_>>();

		url.set_query(None);

		{
			let mut pairs = url.query_pairs_mut();

			for option in &self.0 {
				match option {
					RequestOption::Search { value, property: Some(property) } => {
						pairs.append_pair("$search", &format!("\"{property}:{}\"", escape_search(value)));
					},
					RequestOption::Search { value, property: None } => {
						pairs.append_pair("$search", &format!("\"{}\"", escape_search(value)));
					},
					RequestOption::Filter(expression) => {
						pairs.append_pair("$filter", expression);
					},
					RequestOption::PageSize(n) => {
						pairs.append_pair("top", &n.to_string());
					},
					RequestOption::Select(_) | RequestOption::MaxItems(_) | RequestOption::TextBody => {},
				}
			}

			if !selected.is_empty() {
				pairs.append_pair("$select", &selected.join(","));
			}
		}

		if url.query() == Some("") {
			url.set_query(None);
		}

		Ok(url)
	}

	fn check_conflicts(&self) -> Result<(), ConflictingOptions> {
		let (searches, filters) = self.0.iter().fold((0, 0), |(s, f), o| match o {
			RequestOption::Search { .. } => (s + 1, f),
			RequestOption::Filter(_) => (s, f + 1),
			_ => (s, f),
		});

		if searches > 1 {
			return Err(ConflictingOptions::MultipleSearch { count: searches });
		}
		if searches == 1 && filters > 0 {
			return Err(ConflictingOptions::FilterWithSearch);
		}

		Ok(())
	}
}
impl FromIterator<RequestOption> for RequestOptions {
	fn from_iter<I: IntoIterator<Item = RequestOption>>(iter: I) -> Self {
		Self(iter.into_iter().collect())
	}
}

/// Escapes a search term: `"` becomes `\"` and `'` is doubled.
pub fn escape_search(value: &str) -> String {
	let mut escaped = String::with_capacity(value.len());

	for ch in value.chars() {
		match ch {
			'"' => escaped.push_str("\\\""),
			'\'' => escaped.push_str("''"),
			other => escaped.push(other),
		}
	}

	escaped
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const BASE: &str = "https://graph.microsoft.com/v1.0/me/messages";

	fn decoded(url: &Url) -> Vec<(String, String)> {
		let mut pairs = url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect::<Vec<_>>();

		pairs.sort();

		pairs
	}

	#[test]
	fn escape_handles_quotes() {
		assert_eq!(escape_search("ab'c'"), "ab''c''");
		assert_eq!(escape_search("abc \"def\""), "abc \\\"def\\\"");
		assert_eq!(escape_search("abc"), "abc");
	}

	#[test]
	fn search_with_filter_conflicts() {
		let err = RequestOptions::new()
			.filter("isRead eq false")
			.search("invoice")
			.build(BASE)
			.expect_err("Search combined with filter must fail.");

		assert!(matches!(err, Error::ConflictingOptions(ConflictingOptions::FilterWithSearch)));
	}

	#[test]
	fn two_searches_conflict_regardless_of_content() {
		for (a, b) in [("x", "y"), ("same", "same"), ("", "")] {
			let err = RequestOptions::new()
				.search(a)
				.search_in("subject", b)
				.build(BASE)
				.expect_err("Two searches must fail.");

			assert!(matches!(
				err,
				Error::ConflictingOptions(ConflictingOptions::MultipleSearch { count: 2 })
			));
		}
	}

	#[test]
	fn select_joins_in_order_alongside_filter() {
		let url = RequestOptions::new()
			.select("sender")
			.filter("from/emailAddress/address eq 'a@b.c'")
			.select("body")
			.build(BASE)
			.expect("Filter with select should build.");

		assert_eq!(
			decoded(&url),
			vec![
				("$filter".to_owned(), "from/emailAddress/address eq 'a@b.c'".to_owned()),
				("$select".to_owned(), "sender,body".to_owned()),
			]
		);
	}

	#[test]
	fn search_is_quoted_and_scoped() {
		let url = RequestOptions::new()
			.search_in("from", "O'Brien")
			.page_size(25)
			.max_items(100)
			.build(BASE)
			.expect("Scoped search should build.");

		assert_eq!(
			decoded(&url),
			vec![
				("$search".to_owned(), "\"from:O''Brien\"".to_owned()),
				("top".to_owned(), "25".to_owned()),
			]
		);

		let bare = RequestOptions::new().search("abc").build(BASE).expect("Bare search should build.");

		assert_eq!(decoded(&bare), vec![("$search".to_owned(), "\"abc\"".to_owned())]);
	}

	#[test]
	fn empty_options_leave_no_query_and_replace_existing_one() {
		let url = RequestOptions::new()
			.build("https://graph.microsoft.com/v1.0/users?stale=1")
			.expect("Empty option set should build.");

		assert_eq!(url.as_str(), "https://graph.microsoft.com/v1.0/users");
	}

	#[test]
	fn malformed_base_is_a_config_error() {
		let err = RequestOptions::new().build("not a url").expect_err("Relative base must fail.");

		assert!(matches!(err, Error::Config(ConfigError::InvalidBaseUrl { .. })));
	}

	#[test]
	fn budget_and_headers_never_reach_the_query() {
		let options = RequestOptions::new().max_items(5).max_items(9).text_body();

		assert_eq!(options.item_budget(), Some(5));
		assert_eq!(
			options.headers().get("prefer").and_then(|v| v.to_str().ok()),
			Some(PREFER_TEXT_BODY)
		);
		assert_eq!(options.build(BASE).expect("Should build.").query(), None);
	}
}

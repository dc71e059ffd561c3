// self
use crate::_prelude::*;

/// One completed API round trip, handed to an [`ApiLogSink`] before decoding.
#[derive(Clone, Copy, Debug)]
pub struct ApiLogEntry<'a> {
	/// Request method.
	pub method: &'a Method,
	/// Request URL, including the query string.
	pub url: &'a Url,
	/// Response status.
	pub status: StatusCode,
	/// Raw response body.
	pub body: &'a [u8],
}

/// Receives every raw API response body.
///
/// Sinks run inline on the request path and must not block.
pub trait ApiLogSink
where
	Self: Send + Sync,
{
	/// Records one round trip.
	fn record(&self, entry: &ApiLogEntry<'_>);
}
impl<F> ApiLogSink for F
where
	F: Fn(&ApiLogEntry<'_>) + Send + Sync,
{
	fn record(&self, entry: &ApiLogEntry<'_>) {
		self(entry)
	}
}

/// Emits each entry as a `DEBUG` event under the `graph_broker::api` target.
#[cfg(feature = "tracing")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingApiLog;
#[cfg(feature = "tracing")]
impl ApiLogSink for TracingApiLog {
	fn record(&self, entry: &ApiLogEntry<'_>) {
		tracing::debug!(
			target: "graph_broker::api",
			method = %entry.method,
			url = %entry.url,
			status = entry.status.as_u16(),
			body = %String::from_utf8_lossy(entry.body),
			"API response received."
		);
	}
}

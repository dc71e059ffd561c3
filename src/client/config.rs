// self
use crate::{_prelude::*, obs::ApiLogSink};

/// Per-request deadline used when none is configured.
pub const DEFAULT_CALL_TIMEOUT: StdDuration = StdDuration::from_secs(180);

/// Settings held by one [`Client`](crate::client::Client).
#[derive(Clone)]
pub struct ClientConfig {
	/// Deadline for a single HTTP round trip, including reading the body.
	///
	/// A paginated traversal gets a fresh deadline per page.
	pub call_timeout: StdDuration,
	/// Receives every raw response body before decoding; `None` disables API logging.
	pub api_log: Option<Arc<dyn ApiLogSink>>,
}
impl ClientConfig {
	/// Overrides the per-call timeout; a zero duration is ignored.
	pub fn with_call_timeout(mut self, timeout: StdDuration) -> Self {
		if !timeout.is_zero() {
			self.call_timeout = timeout;
		}

		self
	}

	/// Installs a diagnostic sink for raw response bodies.
	pub fn with_api_log(mut self, sink: Arc<dyn ApiLogSink>) -> Self {
		self.api_log = Some(sink);

		self
	}
}
impl Default for ClientConfig {
	fn default() -> Self {
		Self { call_timeout: DEFAULT_CALL_TIMEOUT, api_log: None }
	}
}
impl Debug for ClientConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientConfig")
			.field("call_timeout", &self.call_timeout)
			.field("api_log", &self.api_log.is_some())
			.finish()
	}
}

//! Single-use loopback listener that catches the authorization redirect.
//!
//! The listener is bound before the browser is opened. [`CallbackListener::wait`] then races
//! three events: the first callback, the caller's cancellation token, and the configured
//! wait. Whichever wins decides the result; the listener is shut down on every path within
//! the configured grace period and the port is released before `wait` returns.

// crates.io
use axum::{
	Router,
	extract::{Query, State},
	response::{Html, IntoResponse, Response},
	routing::get,
};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, InteractiveFlowError},
};

const CLOSE_WINDOW_PAGE: &str =
	"<!doctype html><html><body><script>close();</script></body></html>";

type CallbackResult = Result<String, InteractiveFlowError>;

/// Address, path, and timing of the loopback listener.
///
/// The redirect URI derived from it must be registered with the identity provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoopbackConfig {
	/// Host the listener binds and the redirect URI names.
	pub host: String,
	/// Fixed port.
	pub port: u16,
	/// Callback path; must start with `/`.
	pub path: String,
	/// How long to wait for the callback.
	pub wait: StdDuration,
	/// Upper bound on graceful shutdown before the server task is aborted.
	pub shutdown_grace: StdDuration,
}
impl LoopbackConfig {
	/// Overrides the host.
	pub fn with_host(mut self, host: impl Into<String>) -> Self {
		self.host = host.into();

		self
	}

	/// Overrides the port.
	pub fn with_port(mut self, port: u16) -> Self {
		self.port = port;

		self
	}

	/// Overrides the callback path.
	pub fn with_path(mut self, path: impl Into<String>) -> Self {
		self.path = path.into();

		self
	}

	/// Overrides the callback wait.
	pub fn with_wait(mut self, wait: StdDuration) -> Self {
		self.wait = wait;

		self
	}

	/// Overrides the shutdown grace period.
	pub fn with_shutdown_grace(mut self, grace: StdDuration) -> Self {
		self.shutdown_grace = grace;

		self
	}

	/// Redirect URI the authorization server sends the browser back to.
	pub fn redirect_uri(&self) -> Result<Url> {
		if !self.path.starts_with('/') {
			return Err(ConfigError::InvalidCallbackPath { path: self.path.clone() }.into());
		}

		let raw = format!("http://{}:{}{}", self.host, self.port, self.path);

		Url::parse(&raw).map_err(|source| ConfigError::InvalidRedirect { source }.into())
	}
}
impl Default for LoopbackConfig {
	fn default() -> Self {
		Self {
			host: "localhost".into(),
			port: 8001,
			path: "/authcb".into(),
			wait: StdDuration::from_secs(120),
			shutdown_grace: StdDuration::from_secs(3),
		}
	}
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
	code: Option<String>,
	state: Option<String>,
	error: Option<String>,
	error_description: Option<String>,
}

#[derive(Clone)]
struct CallbackState {
	expected_state: Arc<str>,
	resolver: Arc<Mutex<Option<oneshot::Sender<CallbackResult>>>>,
}
impl CallbackState {
	fn resolve(&self, result: CallbackResult) -> bool {
		match self.resolver.lock().take() {
			Some(tx) => {
				let _ = tx.send(result);

				true
			},
			None => false,
		}
	}
}

/// Running loopback listener for one authorization attempt.
pub struct CallbackListener {
	addr: String,
	grace: StdDuration,
	result_rx: Option<oneshot::Receiver<CallbackResult>>,
	shutdown_tx: Option<oneshot::Sender<()>>,
	handle: Option<JoinHandle<()>>,
}
impl CallbackListener {
	/// Binds the configured address and starts serving; a busy port fails immediately.
	pub async fn bind(config: &LoopbackConfig, expected_state: &str) -> Result<Self> {
		config.redirect_uri()?;

		let addr = format!("{}:{}", config.host, config.port);
		let listener = TcpListener::bind((config.host.as_str(), config.port))
			.await
			.map_err(|source| InteractiveFlowError::ListenerBind { addr: addr.clone(), source })?;
		let (result_tx, result_rx) = oneshot::channel();
		let callback_state = CallbackState {
			expected_state: Arc::from(expected_state),
			resolver: Arc::new(Mutex::new(Some(result_tx))),
		};
		let failure_state = callback_state.clone();
		let app = Router::new().route(&config.path, get(handle_callback)).with_state(callback_state);
		let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
		let handle = tokio::spawn(async move {
			let served = axum::serve(listener, app)
				.with_graceful_shutdown(async move {
					let _ = shutdown_rx.await;
				})
				.await;

			if let Err(e) = served {
				failure_state.resolve(Err(InteractiveFlowError::ListenerFailure {
					message: e.to_string(),
				}));
			}
		});

		#[cfg(feature = "tracing")]
		tracing::debug!(addr = %addr, path = %config.path, "Loopback listener bound.");

		Ok(Self {
			addr,
			grace: config.shutdown_grace,
			result_rx: Some(result_rx),
			shutdown_tx: Some(shutdown_tx),
			handle: Some(handle),
		})
	}

	/// Address the listener is bound to.
	pub fn addr(&self) -> &str {
		&self.addr
	}

	/// Waits for the first of callback, cancellation, or `wait` elapsing, then shuts down.
	pub async fn wait(
		mut self,
		cancel: &CancellationToken,
		wait: StdDuration,
	) -> Result<String, InteractiveFlowError> {
		let outcome = match self.result_rx.take() {
			Some(result_rx) => tokio::select! {
				biased;
				received = result_rx => received.unwrap_or_else(|_| {
					Err(InteractiveFlowError::ListenerFailure {
						message: "listener stopped before a callback arrived".into(),
					})
				}),
				_ = cancel.cancelled() => Err(InteractiveFlowError::Cancelled),
				_ = tokio::time::sleep(wait) => Err(InteractiveFlowError::Timeout { waited: wait }),
			},
			None => Err(InteractiveFlowError::ListenerFailure {
				message: "listener was already consumed".into(),
			}),
		};

		self.shutdown().await;

		outcome
	}

	/// Stops the server, aborting it if graceful shutdown exceeds the grace period.
	pub async fn shutdown(&mut self) {
		if let Some(tx) = self.shutdown_tx.take() {
			let _ = tx.send(());
		}
		if let Some(mut handle) = self.handle.take() {
			if tokio::time::timeout(self.grace, &mut handle).await.is_err() {
				handle.abort();

				let _ = handle.await;
			}
		}

		#[cfg(feature = "tracing")]
		tracing::debug!(addr = %self.addr, "Loopback listener released.");
	}
}
impl Debug for CallbackListener {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CallbackListener")
			.field("addr", &self.addr)
			.field("running", &self.handle.is_some())
			.finish()
	}
}
impl Drop for CallbackListener {
	fn drop(&mut self) {
		if let Some(tx) = self.shutdown_tx.take() {
			let _ = tx.send(());
		}
		if let Some(handle) = self.handle.take() {
			handle.abort();
		}
	}
}

async fn handle_callback(
	State(state): State<CallbackState>,
	Query(params): Query<CallbackParams>,
) -> Response {
	if state.resolver.lock().is_none() {
		return (StatusCode::BAD_REQUEST, "authorization callback already handled").into_response();
	}

	if let Some(error) = params.error.filter(|e| !e.is_empty()) {
		let description = params.error_description.filter(|d| !d.is_empty());
		let body = description.clone().unwrap_or_else(|| error.clone());

		state.resolve(Err(InteractiveFlowError::ProviderDenied { error, description }));

		return body.into_response();
	}
	if params.state.as_deref() != Some(&*state.expected_state) {
		state.resolve(Err(InteractiveFlowError::StateMismatch));

		return (StatusCode::BAD_REQUEST, "state doesn't match").into_response();
	}

	match params.code.filter(|c| !c.is_empty()) {
		Some(code) if state.resolve(Ok(code.clone())) => Html(CLOSE_WINDOW_PAGE).into_response(),
		Some(_) =>
			(StatusCode::BAD_REQUEST, "authorization callback already handled").into_response(),
		None => {
			state.resolve(Err(InteractiveFlowError::MissingCode));

			(StatusCode::BAD_REQUEST, "missing authorization code").into_response()
		},
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{io, net::TcpListener as StdTcpListener};
	// self
	use super::*;
	use crate::_preludet::*;

	fn free_port() -> u16 {
		StdTcpListener::bind("127.0.0.1:0")
			.and_then(|l| l.local_addr())
			.map(|a| a.port())
			.expect("Ephemeral port should be available.")
	}

	fn config(port: u16) -> LoopbackConfig {
		LoopbackConfig::default()
			.with_host("127.0.0.1")
			.with_port(port)
			.with_wait(StdDuration::from_secs(5))
			.with_shutdown_grace(StdDuration::from_millis(500))
	}

	async fn hit(port: u16, query: &str) -> (u16, String) {
		let response = test_reqwest_client()
			.get(format!("http://127.0.0.1:{port}/authcb?{query}"))
			.send()
			.await
			.expect("Callback request should reach the listener.");
		let status = response.status().as_u16();
		let body = response.text().await.expect("Callback body should be readable.");

		(status, body)
	}

	#[test]
	fn default_redirect_uri_matches_registration() {
		let uri = LoopbackConfig::default().redirect_uri().expect("Default redirect should parse.");

		assert_eq!(uri.as_str(), "http://localhost:8001/authcb");
		assert!(LoopbackConfig::default().with_path("authcb").redirect_uri().is_err());
	}

	#[tokio::test]
	async fn matching_state_yields_code_and_close_page() {
		let port = free_port();
		let cfg = config(port);
		let listener = CallbackListener::bind(&cfg, "nonce").await.expect("Listener should bind.");
		let waiter = tokio::spawn(async move {
			listener.wait(&CancellationToken::new(), StdDuration::from_secs(5)).await
		});
		let (status, body) = hit(port, "code=abc&state=nonce").await;

		assert_eq!(status, 200);
		assert_eq!(body, CLOSE_WINDOW_PAGE);
		assert_eq!(waiter.await.expect("Waiter should not panic.").expect("Code expected."), "abc");
	}

	#[tokio::test]
	async fn provider_error_is_echoed_and_reported() {
		let port = free_port();
		let listener =
			CallbackListener::bind(&config(port), "nonce").await.expect("Listener should bind.");
		let waiter = tokio::spawn(async move {
			listener.wait(&CancellationToken::new(), StdDuration::from_secs(5)).await
		});
		let (status, body) =
			hit(port, "error=access_denied&error_description=User%20declined").await;

		assert_eq!(status, 200);
		assert_eq!(body, "User declined");

		let err = waiter.await.expect("Waiter should not panic.").expect_err("Denial expected.");

		assert!(matches!(
			err,
			InteractiveFlowError::ProviderDenied { ref error, description: Some(ref d) }
				if error == "access_denied" && d == "User declined"
		));
	}

	#[tokio::test]
	async fn cancellation_wins_and_releases_port() {
		let port = free_port();
		let cfg = config(port);
		let listener = CallbackListener::bind(&cfg, "nonce").await.expect("Listener should bind.");
		let cancel = CancellationToken::new();

		cancel.cancel();

		let err = listener
			.wait(&cancel, StdDuration::from_secs(5))
			.await
			.expect_err("Cancelled wait must fail.");

		assert!(matches!(err, InteractiveFlowError::Cancelled));

		CallbackListener::bind(&cfg, "again").await.expect("Port should be free after shutdown.");
	}

	#[tokio::test]
	async fn busy_port_fails_fast() {
		let port = free_port();
		let cfg = config(port);
		let _first = CallbackListener::bind(&cfg, "one").await.expect("First bind should succeed.");
		let err = CallbackListener::bind(&cfg, "two").await.expect_err("Second bind must fail.");

		assert!(matches!(
			err,
			Error::InteractiveFlow(InteractiveFlowError::ListenerBind { ref source, .. })
				if source.kind() == io::ErrorKind::AddrInUse
		));
	}
}

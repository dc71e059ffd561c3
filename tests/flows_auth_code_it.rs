// std
use std::{
	io,
	net::TcpListener as StdTcpListener,
	sync::atomic::{AtomicUsize, Ordering},
};
// crates.io
use httpmock::prelude::*;
// self
use graph_broker::{
	_preludet::*,
	CancellationToken,
	auth::{ClientId, ClientIdentity, OFFLINE_ACCESS, ProviderId, ScopeSet, TenantId},
	cache::{MemoryCache, TokenCache},
	credentials::{AuthorizationCodeProvider, BrowserLauncher, CredentialProvider, LoopbackConfig},
	error::{ErrorKind, InteractiveFlowError},
	provider::{ClientAuthMethod, GrantType, ProviderDescriptor},
};

const CLIENT_ID: &str = "interactive-app";

fn build_descriptor(server: &MockServer) -> ProviderDescriptor {
	ProviderDescriptor::builder(
		ProviderId::new("mock-interactive").expect("Provider identifier should be valid."),
	)
	.authorization_endpoint(
		Url::parse(&server.url("/authorize")).expect("Mock authorization endpoint should parse."),
	)
	.token_endpoint(Url::parse(&server.url("/token")).expect("Mock token endpoint should parse."))
	.support_grants([GrantType::AuthorizationCode, GrantType::RefreshToken])
	.preferred_client_auth_method(ClientAuthMethod::None)
	.build()
	.expect("Provider descriptor should build successfully.")
}

fn tenant() -> TenantId {
	TenantId::new("tenant-interactive").expect("Tenant fixture should be valid.")
}

fn client_id() -> ClientId {
	ClientId::new(CLIENT_ID).expect("Client fixture should be valid.")
}

fn scope() -> ScopeSet {
	ScopeSet::new(["Mail.Read", "User.Read"]).expect("Scope fixture should be valid.")
}

fn cached_identity() -> ClientIdentity {
	ClientIdentity::new(
		tenant(),
		client_id(),
		scope().with(OFFLINE_ACCESS).expect("offline_access should be accepted."),
	)
}

fn free_port() -> u16 {
	StdTcpListener::bind("127.0.0.1:0")
		.and_then(|l| l.local_addr())
		.map(|a| a.port())
		.expect("Ephemeral port should be available.")
}

fn loopback(port: u16, wait: StdDuration) -> LoopbackConfig {
	LoopbackConfig::default()
		.with_host("127.0.0.1")
		.with_port(port)
		.with_wait(wait)
		.with_shutdown_grace(StdDuration::from_millis(500))
}

/// Browser stand-in that hits the redirect URI with `reply(state)` as the query string.
fn redirecting_browser<F>(reply: F) -> Arc<dyn BrowserLauncher>
where
	F: 'static + Fn(&str) -> String + Send + Sync,
{
	Arc::new(move |url: &Url| -> io::Result<()> {
		let pairs = url.query_pairs().into_owned().collect::<HashMap<_, _>>();
		let redirect = format!("{}?{}", pairs["redirect_uri"], reply(&pairs["state"]));

		tokio::spawn(async move {
			let _ = test_reqwest_client().get(redirect).send().await;
		});

		Ok(())
	})
}

fn counting_browser(count: Arc<AtomicUsize>) -> Arc<dyn BrowserLauncher> {
	Arc::new(move |_: &Url| -> io::Result<()> {
		count.fetch_add(1, Ordering::SeqCst);

		Ok(())
	})
}

fn token_body(access: &str, refresh: &str, expires_in: u64) -> String {
	format!(
		"{{\"access_token\":\"{access}\",\"refresh_token\":\"{refresh}\",\"token_type\":\"bearer\",\"expires_in\":{expires_in}}}"
	)
}

#[tokio::test]
async fn cache_hit_skips_the_browser() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(500);
		})
		.await;
	let cache = Arc::new(MemoryCache::default());
	let credential = issued_credential(
		cached_identity().scope,
		"cached-access",
		Some("cached-refresh"),
		Duration::hours(1),
	);

	cache.save(&cached_identity(), &credential).await.expect("Seeding the cache should succeed.");

	let opened = Arc::new(AtomicUsize::new(0));
	let provider = AuthorizationCodeProvider::builder(tenant(), client_id(), scope())
		.descriptor(build_descriptor(&server))
		.cache(cache)
		.browser(counting_browser(opened.clone()))
		.loopback(loopback(free_port(), StdDuration::from_millis(200)))
		.http_client(test_token_http_client())
		.authenticate()
		.await
		.expect("Cache hit should authenticate without interaction.");
	let live = provider.authenticate().await.expect("Cached credential should still be valid.");

	assert_eq!(live.access_token.expose(), "cached-access");
	assert_eq!(opened.load(Ordering::SeqCst), 0);

	token.assert_calls_async(0).await;
}

#[tokio::test]
async fn full_login_exchanges_code_and_fills_cache() {
	let server = MockServer::start_async().await;
	let port = free_port();
	let token = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.body_includes("grant_type=authorization_code")
				.body_includes("code=auth-code-1")
				.body_includes(format!("redirect_uri=http%3A%2F%2F127.0.0.1%3A{port}%2Fauthcb"));
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("fresh-access", "fresh-refresh", 3600));
		})
		.await;
	let cache = Arc::new(MemoryCache::default());
	let provider = AuthorizationCodeProvider::builder(tenant(), client_id(), scope())
		.descriptor(build_descriptor(&server))
		.cache(cache.clone())
		.browser(redirecting_browser(|state| format!("code=auth-code-1&state={state}")))
		.loopback(loopback(port, StdDuration::from_secs(5)))
		.http_client(test_token_http_client())
		.authenticate()
		.await
		.expect("Interactive login should succeed.");
	let live = provider.authenticate().await.expect("Fresh credential should be valid.");

	assert_eq!(live.access_token.expose(), "fresh-access");
	assert!(provider.identity().scope.contains(OFFLINE_ACCESS));

	let cached = cache.load(&cached_identity()).await.expect("Login should populate the cache.");

	assert_eq!(cached.access_token.expose(), "fresh-access");
	assert_eq!(cached.refresh_token.as_ref().map(|t| t.expose()), Some("fresh-refresh"));

	token.assert_calls_async(1).await;

	StdTcpListener::bind(("127.0.0.1", port)).expect("Listener port should be released after login.");
}

#[tokio::test]
async fn forged_state_is_rejected_without_exchange() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("never", "never", 3600));
		})
		.await;
	let err = AuthorizationCodeProvider::builder(tenant(), client_id(), scope())
		.descriptor(build_descriptor(&server))
		.browser(redirecting_browser(|_| "code=stolen&state=forged".into()))
		.loopback(loopback(free_port(), StdDuration::from_secs(5)))
		.http_client(test_token_http_client())
		.authenticate()
		.await
		.expect_err("Forged state should fail the login.");

	assert!(matches!(err, Error::InteractiveFlow(InteractiveFlowError::StateMismatch)));

	token.assert_calls_async(0).await;
}

#[tokio::test]
async fn provider_denial_is_surfaced() {
	let server = MockServer::start_async().await;
	let err = AuthorizationCodeProvider::builder(tenant(), client_id(), scope())
		.descriptor(build_descriptor(&server))
		.browser(redirecting_browser(|state| {
			format!("error=access_denied&error_description=User+declined+consent&state={state}")
		}))
		.loopback(loopback(free_port(), StdDuration::from_secs(5)))
		.http_client(test_token_http_client())
		.authenticate()
		.await
		.expect_err("Denied consent should fail the login.");
	let Error::InteractiveFlow(InteractiveFlowError::ProviderDenied { error, description }) = err
	else {
		panic!("Error should be a provider denial.");
	};

	assert_eq!(error, "access_denied");
	assert_eq!(description.as_deref(), Some("User declined consent"));
}

#[tokio::test]
async fn timeout_fails_and_releases_the_port() {
	let server = MockServer::start_async().await;
	let port = free_port();
	let opened = Arc::new(AtomicUsize::new(0));
	let err = AuthorizationCodeProvider::builder(tenant(), client_id(), scope())
		.descriptor(build_descriptor(&server))
		.browser(counting_browser(opened.clone()))
		.loopback(loopback(port, StdDuration::from_millis(150)))
		.http_client(test_token_http_client())
		.authenticate()
		.await
		.expect_err("No callback should time out.");

	assert!(matches!(err, Error::InteractiveFlow(InteractiveFlowError::Timeout { .. })));
	assert_eq!(opened.load(Ordering::SeqCst), 1);

	StdTcpListener::bind(("127.0.0.1", port)).expect("Port should be free after the timeout.");
}

#[tokio::test]
async fn cancellation_aborts_the_wait() {
	let server = MockServer::start_async().await;
	let cancel = CancellationToken::new();
	let trigger = cancel.clone();
	let browser: Arc<dyn BrowserLauncher> = Arc::new(move |_: &Url| -> io::Result<()> {
		trigger.cancel();

		Ok(())
	});
	let err = AuthorizationCodeProvider::builder(tenant(), client_id(), scope())
		.descriptor(build_descriptor(&server))
		.browser(browser)
		.cancellation(cancel)
		.loopback(loopback(free_port(), StdDuration::from_secs(30)))
		.http_client(test_token_http_client())
		.authenticate()
		.await
		.expect_err("Cancellation should abort the login.");

	assert!(matches!(err, Error::InteractiveFlow(InteractiveFlowError::Cancelled)));
}

#[tokio::test]
async fn busy_port_fails_before_opening_the_browser() {
	let server = MockServer::start_async().await;
	let squatter = StdTcpListener::bind("127.0.0.1:0").expect("Ephemeral port should bind.");
	let port = squatter.local_addr().expect("Local address should be readable.").port();
	let opened = Arc::new(AtomicUsize::new(0));
	let err = AuthorizationCodeProvider::builder(tenant(), client_id(), scope())
		.descriptor(build_descriptor(&server))
		.browser(counting_browser(opened.clone()))
		.loopback(loopback(port, StdDuration::from_secs(5)))
		.http_client(test_token_http_client())
		.authenticate()
		.await
		.expect_err("Busy port should fail the login.");

	assert_eq!(err.kind(), ErrorKind::InteractiveFlow);
	assert!(matches!(err, Error::InteractiveFlow(InteractiveFlowError::ListenerBind { .. })));
	assert_eq!(opened.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn browser_failure_is_reported() {
	let server = MockServer::start_async().await;
	let browser: Arc<dyn BrowserLauncher> =
		Arc::new(|_: &Url| -> io::Result<()> { Err(io::Error::other("no display")) });
	let err = AuthorizationCodeProvider::builder(tenant(), client_id(), scope())
		.descriptor(build_descriptor(&server))
		.browser(browser)
		.loopback(loopback(free_port(), StdDuration::from_secs(5)))
		.http_client(test_token_http_client())
		.authenticate()
		.await
		.expect_err("Browser failure should fail the login.");

	assert!(matches!(err, Error::InteractiveFlow(InteractiveFlowError::BrowserLaunch { .. })));
}

#[tokio::test]
async fn expiring_credential_is_refreshed_and_written_back() {
	let server = MockServer::start_async().await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.body_includes("grant_type=refresh_token")
				.body_includes("refresh_token=old-refresh");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("renewed-access", "rotated-refresh", 3600));
		})
		.await;
	let cache = Arc::new(MemoryCache::default());
	let stale = issued_credential(
		cached_identity().scope,
		"old-access",
		Some("old-refresh"),
		Duration::seconds(5),
	);

	cache.save(&cached_identity(), &stale).await.expect("Seeding the cache should succeed.");

	let provider = AuthorizationCodeProvider::builder(tenant(), client_id(), scope())
		.descriptor(build_descriptor(&server))
		.cache(cache.clone())
		.browser(counting_browser(Arc::default()))
		.loopback(loopback(free_port(), StdDuration::from_millis(200)))
		.preemptive_window(Duration::minutes(5))
		.http_client(test_token_http_client())
		.authenticate()
		.await
		.expect("Cache hit should authenticate.");
	let live = provider.authenticate().await.expect("Refresh should succeed.");

	assert_eq!(live.access_token.expose(), "renewed-access");

	let cached = cache.load(&cached_identity()).await.expect("Refreshed credential should be cached.");

	assert_eq!(cached.access_token.expose(), "renewed-access");
	assert_eq!(cached.refresh_token.as_ref().map(|t| t.expose()), Some("rotated-refresh"));

	refresh.assert_calls_async(1).await;
}

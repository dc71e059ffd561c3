// self
use crate::{
	_prelude::*,
	auth::{ClientIdentity, Credential},
};

/// When a live credential is renewed ahead of its expiry.
///
/// The effective window is the configured window minus a per-identity jitter, so
/// processes sharing an identity do not all renew at the same instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshPolicy {
	window: Duration,
	seed: u64,
}
impl RefreshPolicy {
	/// Default preemptive window.
	pub const DEFAULT_WINDOW: Duration = Duration::seconds(60);

	/// Creates a policy with the default window, jittered for `identity`.
	pub fn for_identity(identity: &ClientIdentity) -> Self {
		let mut hasher = DefaultHasher::new();

		identity.hash(&mut hasher);

		Self { window: Self::DEFAULT_WINDOW, seed: hasher.finish() }
	}

	/// Overrides the preemptive window; negative values clamp to zero.
	pub fn with_window(mut self, window: Duration) -> Self {
		self.window = if window.is_negative() { Duration::ZERO } else { window };

		self
	}

	/// Determines whether `credential` must be renewed at `now`.
	pub fn should_refresh(&self, credential: &Credential, now: OffsetDateTime) -> bool {
		if credential.is_expired_at(now) {
			return true;
		}

		let window = self.effective_window();

		!window.is_zero() && credential.expires_within(window, now)
	}

	fn effective_window(&self) -> Duration {
		self.window.checked_sub(self.jitter()).unwrap_or(Duration::ZERO)
	}

	fn jitter(&self) -> Duration {
		let window_secs = self.window.whole_seconds();

		if window_secs <= 1 {
			return Duration::ZERO;
		}

		let modulus = u64::try_from(window_secs).unwrap_or(u64::MAX);
		let jitter_secs = i64::try_from(self.seed % modulus).unwrap_or(i64::MAX);

		Duration::seconds(jitter_secs)
	}
}

/// Holds the live credential of one provider and serializes its renewal.
pub(crate) struct CredentialSlot {
	current: RwLock<Arc<Credential>>,
	renewal: AsyncMutex<()>,
	policy: RefreshPolicy,
}
impl CredentialSlot {
	pub(crate) fn new(credential: Credential, policy: RefreshPolicy) -> Self {
		Self { current: RwLock::new(Arc::new(credential)), renewal: AsyncMutex::new(()), policy }
	}

	pub(crate) fn current(&self) -> Arc<Credential> {
		self.current.read().clone()
	}

	/// Returns the live credential, running `renew` under the singleflight guard when needed.
	pub(crate) async fn current_or_renew<F, Fut>(&self, renew: F) -> Result<Arc<Credential>>
	where
		F: FnOnce(Arc<Credential>) -> Fut,
		Fut: Future<Output = Result<Credential>>,
	{
		let live = self.current();

		if !self.policy.should_refresh(&live, OffsetDateTime::now_utc()) {
			return Ok(live);
		}

		let _singleflight = self.renewal.lock().await;
		// Another caller may have renewed while this one waited.
		let live = self.current();

		if !self.policy.should_refresh(&live, OffsetDateTime::now_utc()) {
			return Ok(live);
		}

		let fresh = Arc::new(renew(live).await?);

		*self.current.write() = fresh.clone();

		Ok(fresh)
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::_preludet::*;

	fn credential(token: &str, expires_in: Duration) -> Credential {
		Credential::builder(test_identity().scope)
			.access_token(token)
			.expires_in(expires_in)
			.build()
			.expect("Credential fixture should build.")
	}

	const NOW: OffsetDateTime = macros::datetime!(2025-01-01 00:00 UTC);

	fn credential_issued_now(expires_in: Duration) -> Credential {
		Credential::builder(test_identity().scope)
			.access_token("a")
			.issued_at(NOW)
			.expires_in(expires_in)
			.build()
			.expect("Credential fixture should build.")
	}

	#[test]
	fn jittered_window_never_exceeds_configured_window() {
		let policy = RefreshPolicy::for_identity(&test_identity());

		assert!(policy.should_refresh(&credential_issued_now(Duration::seconds(1)), NOW));
		assert!(!policy.should_refresh(&credential_issued_now(Duration::seconds(61)), NOW));
		assert!(policy.should_refresh(&credential_issued_now(Duration::seconds(-1)), NOW));
	}

	#[test]
	fn zero_window_only_renews_expired_credentials() {
		let policy = RefreshPolicy::for_identity(&test_identity()).with_window(Duration::seconds(-5));

		assert!(!policy.should_refresh(&credential_issued_now(Duration::seconds(1)), NOW));
		assert!(policy.should_refresh(&credential_issued_now(Duration::ZERO), NOW));
	}

	#[tokio::test]
	async fn concurrent_callers_share_one_renewal() {
		let slot = Arc::new(CredentialSlot::new(
			credential("stale", Duration::ZERO),
			RefreshPolicy::for_identity(&test_identity()),
		));
		let renewals = Arc::new(AtomicUsize::new(0));
		let tasks = (0..8)
			.map(|_| {
				let slot = slot.clone();
				let renewals = renewals.clone();

				tokio::spawn(async move {
					slot.current_or_renew(|_| async move {
						renewals.fetch_add(1, Ordering::SeqCst);
						tokio::time::sleep(StdDuration::from_millis(20)).await;

						Ok(credential("fresh", Duration::hours(1)))
					})
					.await
				})
			})
			.collect::<Vec<_>>();

		for task in tasks {
			let live = task
				.await
				.expect("Renewal task should not panic.")
				.expect("Renewal should succeed.");

			assert_eq!(live.access_token.expose(), "fresh");
		}

		assert_eq!(renewals.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn failed_renewal_keeps_previous_credential() {
		let slot = CredentialSlot::new(
			credential("stale", Duration::ZERO),
			RefreshPolicy::for_identity(&test_identity()),
		);
		let err = slot
			.current_or_renew(|_| async {
				Err(Error::from(crate::error::CredentialExchangeError::MissingRefreshToken))
			})
			.await
			.expect_err("Renewal failure should propagate.");

		assert!(matches!(err, Error::CredentialExchange(_)));
		assert_eq!(slot.current().access_token.expose(), "stale");
	}
}

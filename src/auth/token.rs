//! Shared bearer-token state and the sources that mint it.
//!
//! [`TokenManager`] is the only owner of the proxy's access token. It is built once, shared
//! behind an [`Arc`], and consulted by every upstream call. The token has no expiry tracking:
//! staleness shows up as a 401 from the data API, after which the HTTP layer calls
//! [`TokenManager::refresh`] and retries once. Refreshes are single-flight; a caller that
//! queued behind an in-flight exchange reuses its result instead of hitting the token
//! endpoint again.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use tracing::Instrument;
// self
use crate::{
	_prelude::*,
	auth::{Credentials, Environment, Secret},
	error::{AuthError, ConfigError},
	http::ReqwestHttpClient,
	oauth::ClientCredentialsSource,
	obs::{self, Operation, Outcome},
};

/// Placeholder returned by the dev environment, which models an unauthenticated backend.
pub const DEV_PLACEHOLDER_TOKEN: &str = "dev-mock-token";

/// Boxed future returned by [`TokenSource::fetch_token`].
pub type TokenFuture<'a> = Pin<Box<dyn Future<Output = Result<Secret, AuthError>> + 'a + Send>>;

/// Anything able to mint a fresh access token.
///
/// Production code uses [`ClientCredentialsSource`]; tests and the dev environment plug in
/// [`StaticTokenSource`] or their own fakes.
pub trait TokenSource
where
	Self: Send + Sync,
{
	/// Performs one exchange and returns the raw access token.
	fn fetch_token(&self) -> TokenFuture<'_>;
}

/// Token source that always yields the same value without any I/O.
#[derive(Clone, Debug)]
pub struct StaticTokenSource(Secret);
impl StaticTokenSource {
	/// Wraps a fixed token value.
	pub fn new(token: impl Into<String>) -> Self {
		Self(Secret::new(token))
	}

	/// Source used by the dev environment.
	pub fn dev_placeholder() -> Self {
		Self::new(DEV_PLACEHOLDER_TOKEN)
	}
}
impl TokenSource for StaticTokenSource {
	fn fetch_token(&self) -> TokenFuture<'_> {
		let token = self.0.clone();

		Box::pin(async move { Ok(token) })
	}
}

/// Access token currently held by the manager.
#[derive(Clone, Debug)]
pub struct Token {
	/// Bearer value attached to upstream calls.
	pub value: Secret,
	/// Deployment the token was issued for.
	pub environment: Environment,
	/// Instant the token was stored.
	pub issued_at: OffsetDateTime,
}

/// Owns the proxy's bearer token and the knowledge of how to replace it.
pub struct TokenManager {
	environment: Environment,
	source: Arc<dyn TokenSource>,
	current: RwLock<Option<Token>>,
	generation: AtomicU64,
	exchange_guard: AsyncMutex<()>,
}
impl TokenManager {
	/// Creates a manager with no token yet, backed by the provided source.
	pub fn new(environment: Environment, source: Arc<dyn TokenSource>) -> Self {
		Self {
			environment,
			source,
			current: RwLock::new(None),
			generation: AtomicU64::new(0),
			exchange_guard: AsyncMutex::new(()),
		}
	}

	/// Wires the source implied by `environment`.
	///
	/// Dev gets the placeholder source and ignores credentials. Every other environment
	/// requires credentials and exchanges them against its fixed token endpoint and scope;
	/// a missing credential pair fails here rather than on first use.
	pub fn for_environment(
		environment: Environment,
		credentials: Option<Credentials>,
		http_client: ReqwestHttpClient,
	) -> Result<Self, ConfigError> {
		let source: Arc<dyn TokenSource> = if environment.requires_auth() {
			let credentials =
				credentials.ok_or(ConfigError::MissingCredentials { environment })?;

			Arc::new(ClientCredentialsSource::new(
				environment.token_url()?,
				environment.scope(),
				credentials,
				http_client,
			))
		} else {
			Arc::new(StaticTokenSource::dev_placeholder())
		};

		Ok(Self::new(environment, source))
	}

	/// Seeds the manager with an explicitly provided token.
	pub fn with_token(self, value: impl Into<String>) -> Self {
		self.store(Secret::new(value));

		self
	}

	/// Deployment this manager serves.
	pub fn environment(&self) -> Environment {
		self.environment
	}

	/// Returns the last stored token, if any.
	pub fn current_token(&self) -> Option<Token> {
		self.current.read().clone()
	}

	/// Bearer credential for upstream calls; always `None` in dev.
	pub fn bearer(&self) -> Option<Secret> {
		if !self.environment.requires_auth() {
			return None;
		}

		self.current.read().as_ref().map(|token| token.value.clone())
	}

	/// Exchanges credentials for a new token and stores it.
	///
	/// In dev this returns the placeholder without touching the network.
	pub async fn acquire(&self) -> Result<Token, AuthError> {
		let _exclusive = self.exchange_guard.lock().await;

		self.exchange(Operation::TokenAcquire).await
	}

	/// Replaces the token after the data API rejected it.
	///
	/// Callers that queued behind another refresh get that refresh's token back.
	pub async fn refresh(&self) -> Result<Token, AuthError> {
		let observed = self.generation.load(Ordering::Acquire);
		let _exclusive = self.exchange_guard.lock().await;

		if self.generation.load(Ordering::Acquire) != observed
			&& let Some(token) = self.current_token()
		{
			tracing::debug!(
				environment = %self.environment,
				"Reusing token minted by a concurrent refresh."
			);

			return Ok(token);
		}

		self.exchange(Operation::TokenRefresh).await
	}

	async fn exchange(&self, operation: Operation) -> Result<Token, AuthError> {
		obs::record_outcome(operation, Outcome::Attempt);

		let result = async {
			let value = self.source.fetch_token().await?;

			Ok::<_, AuthError>(self.store(value))
		}
		.instrument(obs::span(operation))
		.await;

		match &result {
			Ok(_) => {
				obs::record_outcome(operation, Outcome::Success);
				tracing::info!(environment = %self.environment, %operation, "Stored new access token.");
			},
			Err(e) => {
				obs::record_outcome(operation, Outcome::Failure);
				tracing::error!(
					environment = %self.environment,
					%operation,
					status = e.status(),
					"Token exchange failed: {e}"
				);
			},
		}

		result
	}

	fn store(&self, value: Secret) -> Token {
		let token =
			Token { value, environment: self.environment, issued_at: OffsetDateTime::now_utc() };

		*self.current.write() = Some(token.clone());
		self.generation.fetch_add(1, Ordering::AcqRel);

		token
	}
}
impl Debug for TokenManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("environment", &self.environment)
			.field("token_set", &self.current.read().is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::AtomicUsize;
	// self
	use super::*;

	struct CountingSource {
		calls: AtomicUsize,
	}
	impl TokenSource for CountingSource {
		fn fetch_token(&self) -> TokenFuture<'_> {
			Box::pin(async move {
				let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

				tokio::time::sleep(std::time::Duration::from_millis(20)).await;

				Ok(Secret::new(format!("token-{n}")))
			})
		}
	}

	struct FailingSource;
	impl TokenSource for FailingSource {
		fn fetch_token(&self) -> TokenFuture<'_> {
			Box::pin(async {
				Err(AuthError::Rejected { reason: "invalid_client".into(), status: Some(400) })
			})
		}
	}

	#[tokio::test]
	async fn dev_acquire_returns_placeholder_without_bearer() {
		let manager =
			TokenManager::for_environment(Environment::Dev, None, ReqwestHttpClient::default())
				.expect("Dev should not need credentials.");
		let token = manager.acquire().await.expect("Dev acquire should succeed.");

		assert_eq!(token.value.expose(), DEV_PLACEHOLDER_TOKEN);
		assert!(manager.bearer().is_none());
	}

	#[test]
	fn non_dev_without_credentials_is_a_config_error() {
		let err = TokenManager::for_environment(
			Environment::Staging,
			None,
			ReqwestHttpClient::default(),
		)
		.expect_err("Staging requires credentials.");

		assert!(matches!(
			err,
			ConfigError::MissingCredentials { environment: Environment::Staging }
		));
	}

	#[test]
	fn injected_token_is_current_until_replaced() {
		let manager = TokenManager::new(
			Environment::Production,
			Arc::new(StaticTokenSource::new("unused")),
		)
		.with_token("injected");

		assert_eq!(
			manager.bearer().expect("Injected token should be attached.").expose(),
			"injected"
		);
	}

	#[tokio::test]
	async fn concurrent_refreshes_share_one_exchange() {
		let source = Arc::new(CountingSource { calls: AtomicUsize::new(0) });
		let manager = TokenManager::new(Environment::Staging, source.clone());
		let (first, second) = tokio::join!(manager.refresh(), manager.refresh());
		let first = first.expect("First refresh should succeed.");
		let second = second.expect("Second refresh should succeed.");

		assert_eq!(source.calls.load(Ordering::SeqCst), 1);
		assert_eq!(first.value.expose(), "token-1");
		assert_eq!(second.value.expose(), "token-1");
	}

	#[tokio::test]
	async fn failed_exchange_keeps_previous_token() {
		let manager =
			TokenManager::new(Environment::Staging, Arc::new(FailingSource)).with_token("old");
		let err = manager.refresh().await.expect_err("Rejected credentials should surface.");

		assert_eq!(err.status(), Some(400));
		assert_eq!(
			manager.current_token().expect("Previous token should remain.").value.expose(),
			"old"
		);
	}
}

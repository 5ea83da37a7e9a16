//! axum surface: `/api/plan`, `/api/collect`, and `/health`.
//!
//! Handlers translate query strings and bodies into the client's request models, call the
//! [`DataClient`], and render failures as `{ "error": message }`. An upstream 401 outside dev
//! triggers one token refresh and one repeat of the same call.

// std
use std::net::SocketAddr;
// crates.io
use axum::{
	Json, Router,
	extract::{RawQuery, State, rejection::JsonRejection},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::get,
};
use time::format_description::well_known::Rfc3339;
use tower_http::trace::TraceLayer;
// self
use crate::{
	_prelude::*,
	auth::{Environment, TokenManager},
	client::DataClient,
	config::Config,
	error::{ConfigError, UpstreamError},
	model::{CollectQuery, ListFilters, PlanQuery, QueryInt},
	transport::{DataTransport, ReqwestTransport},
	validate::ValidationError,
};

/// State shared by every handler.
#[derive(Debug)]
pub struct AppState<T = ReqwestTransport>
where
	T: DataTransport,
{
	/// Validating data API client.
	pub client: DataClient<T>,
	/// Deployment label echoed by `/health`.
	pub deployment: Option<String>,
}
impl<T> AppState<T>
where
	T: DataTransport,
{
	/// Wraps an already wired client.
	pub fn new(client: DataClient<T>, deployment: Option<String>) -> Self {
		Self { client, deployment }
	}

	/// Token manager behind the client.
	pub fn tokens(&self) -> &Arc<TokenManager> {
		self.client.tokens()
	}

	/// Upstream deployment.
	pub fn environment(&self) -> Environment {
		self.tokens().environment()
	}
}
impl AppState {
	/// Wires the reqwest-backed client described by `config`.
	pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
		let http_client = config.http_client()?;
		let tokens = TokenManager::for_environment(
			config.api_environment,
			config.credentials(),
			http_client.clone(),
		)?;
		let client = DataClient::new(Arc::new(tokens), Arc::new(config.transport(http_client)));

		Ok(Self::new(client, config.deployment.clone()))
	}
}

/// Builds the router over `state`.
pub fn router<T>(state: Arc<AppState<T>>) -> Router
where
	T: DataTransport,
{
	Router::new()
		.route("/api/plan", get(plan_read::<T>))
		.route("/api/collect", get(collect_read::<T>).post(collect_write::<T>))
		.route("/health", get(health::<T>))
		.with_state(state)
		.layer(TraceLayer::new_for_http())
}

/// Binds `addr` and serves `router` until Ctrl-C or SIGTERM.
pub async fn serve(addr: SocketAddr, router: Router) -> std::io::Result<()> {
	let listener = tokio::net::TcpListener::bind(addr).await?;

	tracing::info!(%addr, "Listening.");

	axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await
}

/// Failure rendered as `{ "error": message }`.
#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	message: String,
}
impl ApiError {
	/// Status code of the response.
	pub fn status(&self) -> StatusCode {
		self.status
	}
}
impl From<Error> for ApiError {
	fn from(e: Error) -> Self {
		let status = match &e {
			Error::Validation(_) => StatusCode::BAD_REQUEST,
			Error::Auth(_) | Error::Upstream(UpstreamError::Unauthorized { .. }) =>
				StatusCode::UNAUTHORIZED,
			Error::Upstream(_) | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
		};

		Self { status, message: e.to_string() }
	}
}
impl From<ValidationError> for ApiError {
	fn from(e: ValidationError) -> Self {
		Error::from(e).into()
	}
}
impl From<JsonRejection> for ApiError {
	fn from(rejection: JsonRejection) -> Self {
		Self { status: StatusCode::BAD_REQUEST, message: rejection.body_text() }
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		(self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
	}
}

#[derive(Debug, Serialize)]
struct Health {
	status: &'static str,
	timestamp: String,
	environment: Option<String>,
	api_environment: &'static str,
}

/// Decoded query string. Keeps every pair so lists can arrive as `a,b`, repeated keys, or
/// `name[]` keys.
#[derive(Debug, Default)]
struct QueryParams(Vec<(String, String)>);
impl QueryParams {
	fn parse(raw: Option<&str>) -> Self {
		Self(url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes()).into_owned().collect())
	}

	fn single(&self, name: &str) -> Option<String> {
		self.0.iter().find(|(key, _)| key == name).map(|(_, value)| value.clone())
	}

	fn int(&self, name: &str) -> Option<QueryInt> {
		self.single(name).filter(|value| !value.trim().is_empty()).map(|value| QueryInt::parse(&value))
	}

	fn list(&self, name: &str) -> Option<Vec<String>> {
		let bracketed = format!("{name}[]");
		let values: Vec<String> = self
			.0
			.iter()
			.filter(|(key, _)| key == name || *key == bracketed)
			.flat_map(|(_, value)| value.split(','))
			.map(str::trim)
			.filter(|value| !value.is_empty())
			.map(str::to_owned)
			.collect();

		(!values.is_empty()).then_some(values)
	}

	fn filters(&self) -> ListFilters {
		ListFilters {
			resource_types: self.list("resourceTypes"),
			resources: self.list("resources"),
			attributes: self.list("attributes"),
			tenant_ids: self.list("tenantIds"),
		}
	}

	fn plan_query(&self) -> PlanQuery {
		PlanQuery {
			from: self.single("from"),
			to: self.single("to"),
			interval_type: self.int("intervalType"),
			filters: self.filters(),
		}
	}

	fn collect_query(&self) -> CollectQuery {
		CollectQuery {
			from: self.single("from"),
			to: self.single("to"),
			cycle: self.int("cycle"),
			data_type1: self.int("dataType1"),
			filters: self.filters(),
		}
	}
}

async fn plan_read<T>(
	State(state): State<Arc<AppState<T>>>,
	RawQuery(raw): RawQuery,
) -> Result<Json<Value>, ApiError>
where
	T: DataTransport,
{
	let query = QueryParams::parse(raw.as_deref()).plan_query();
	let client = &state.client;

	with_token_retry(&state, || client.get_plan_data(&query)).await
}

async fn collect_read<T>(
	State(state): State<Arc<AppState<T>>>,
	RawQuery(raw): RawQuery,
) -> Result<Json<Value>, ApiError>
where
	T: DataTransport,
{
	let query = QueryParams::parse(raw.as_deref()).collect_query();
	let client = &state.client;

	with_token_retry(&state, || client.get_collect_data(&query)).await
}

async fn collect_write<T>(
	State(state): State<Arc<AppState<T>>>,
	body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError>
where
	T: DataTransport,
{
	let Json(body) = body?;
	let client = &state.client;

	with_token_retry(&state, || client.create_collect_data(body.clone())).await
}

async fn health<T>(State(state): State<Arc<AppState<T>>>) -> Json<Health>
where
	T: DataTransport,
{
	let now = OffsetDateTime::now_utc();

	Json(Health {
		status: "ok",
		timestamp: now.format(&Rfc3339).unwrap_or_else(|_| now.unix_timestamp().to_string()),
		environment: state.deployment.clone(),
		api_environment: state.environment().as_str(),
	})
}

async fn with_token_retry<T, F, Fut>(state: &AppState<T>, call: F) -> Result<Json<Value>, ApiError>
where
	T: DataTransport,
	F: Fn() -> Fut,
	Fut: Future<Output = Result<Value>>,
{
	let result = match call().await {
		Err(e) if e.is_unauthorized() && state.environment().requires_auth() => {
			tracing::warn!(
				environment = %state.environment(),
				"Upstream rejected the token; refreshing once."
			);

			state.tokens().refresh().await.map_err(Error::from)?;

			call().await
		},
		other => other,
	};

	Ok(Json(result?))
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			tracing::error!("Failed to listen for Ctrl-C: {e}");
		}
	};
	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			},
			Err(e) => tracing::error!("Failed to listen for SIGTERM: {e}"),
		}
	};
	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}

	tracing::info!("Shutting down.");
}

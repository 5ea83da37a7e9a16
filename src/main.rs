//! telemetry-proxy binary.

// std
use std::sync::Arc;
// crates.io
use clap::Parser;
use color_eyre::{Result, eyre::WrapErr};
// self
use telemetry_proxy::{
	config::Config,
	obs,
	server::{self, AppState},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let dotenv = dotenvy::dotenv();
	let config = Config::parse();

	obs::init_tracing(config.log_format);

	if let Ok(path) = dotenv {
		tracing::debug!(path = %path.display(), "Loaded environment file.");
	}

	let state = Arc::new(AppState::from_config(&config).wrap_err("Failed to wire the proxy")?);
	let environment = state.environment();

	if environment.requires_auth() {
		state.tokens().acquire().await.wrap_err("Failed to obtain initial OAuth token")?;

		tracing::info!(%environment, "Obtained initial OAuth token.");
	} else {
		tracing::info!(%environment, "Development environment: skipping initial token acquisition.");
	}

	tracing::info!(
		%environment,
		api_base_url = %config.api_base_url,
		deployment = config.deployment.as_deref().unwrap_or("-"),
		"Starting telemetry proxy."
	);

	server::serve(config.socket_addr(), server::router(state)).await.wrap_err("Server failed")
}

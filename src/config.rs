//! Command-line and environment configuration for the proxy binary.

// std
use std::{
	net::{IpAddr, Ipv4Addr, SocketAddr},
	time::Duration as StdDuration,
};
// crates.io
use clap::Parser;
// self
use crate::{
	_prelude::*,
	auth::{Credentials, Environment, Secret},
	error::ConfigError,
	http::ReqwestHttpClient,
	obs::LogFormat,
	transport::ReqwestTransport,
};

/// Proxy settings. Every flag falls back to an environment variable, which may come from a
/// `.env` file loaded before parsing.
#[derive(Clone, Debug, Parser)]
#[command(name = "telemetry-proxy", version, about)]
pub struct Config {
	/// Port to listen on.
	#[arg(long, env = "PORT", default_value_t = 3000)]
	pub port: u16,
	/// Address to bind.
	#[arg(long = "bind", env = "BIND_ADDRESS", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
	pub bind_address: IpAddr,
	/// Base URL of the data API, e.g. `https://api.example.com/dep-webapi`.
	#[arg(long, env = "API_BASE_URL")]
	pub api_base_url: Url,
	/// Upstream deployment: dev, stg, or service.
	#[arg(long, env = "API_ENVIRONMENT", default_value = "dev")]
	pub api_environment: Environment,
	/// OAuth 2.0 client identifier; required outside dev.
	#[arg(long, env = "API_CLIENT_ID")]
	pub client_id: Option<String>,
	/// OAuth 2.0 client secret; required outside dev.
	#[arg(long, env = "API_CLIENT_SECRET", hide_env_values = true)]
	pub client_secret: Option<Secret>,
	/// Free-form deployment label reported by `/health`.
	#[arg(long, env = "APP_ENV")]
	pub deployment: Option<String>,
	/// Timeout, in seconds, applied to every outbound request.
	#[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value_t = 30)]
	pub upstream_timeout_secs: u64,
	/// Log output flavor.
	#[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
	pub log_format: LogFormat,
}
impl Config {
	/// Client credentials, when both halves are present and non-empty.
	pub fn credentials(&self) -> Option<Credentials> {
		let client_id = self.client_id.as_deref().filter(|id| !id.is_empty())?;
		let client_secret = self.client_secret.as_ref().filter(|secret| !secret.is_empty())?;

		Some(Credentials { client_id: client_id.to_owned(), client_secret: client_secret.clone() })
	}

	/// Socket address the server binds.
	pub fn socket_addr(&self) -> SocketAddr {
		SocketAddr::new(self.bind_address, self.port)
	}

	/// Outbound request timeout.
	pub fn upstream_timeout(&self) -> StdDuration {
		StdDuration::from_secs(self.upstream_timeout_secs)
	}

	/// Builds the shared HTTP client.
	pub fn http_client(&self) -> Result<ReqwestHttpClient, ConfigError> {
		ReqwestHttpClient::with_timeout(self.upstream_timeout())
	}

	/// Builds the data API transport over `http_client`.
	pub fn transport(&self, http_client: ReqwestHttpClient) -> ReqwestTransport {
		ReqwestTransport::new(self.api_base_url.clone(), http_client)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn parse(args: &[&str]) -> Config {
		Config::try_parse_from(
			["telemetry-proxy", "--api-base-url", "https://api.example.com/dep-webapi"]
				.into_iter()
				.chain(args.iter().copied()),
		)
		.expect("Arguments should parse.")
	}

	#[test]
	fn flags_override_defaults() {
		let config = parse(&["--port", "8080", "--api-environment", "stg", "--log-format", "json"]);

		assert_eq!(config.socket_addr().port(), 8080);
		assert_eq!(config.api_environment, Environment::Staging);
		assert_eq!(config.log_format, LogFormat::Json);
	}

	#[test]
	fn credentials_need_both_halves() {
		assert!(parse(&["--client-id", "proxy"]).credentials().is_none());
		assert!(parse(&["--client-id", "proxy", "--client-secret", ""]).credentials().is_none());

		let credentials = parse(&["--client-id", "proxy", "--client-secret", "s3cret"])
			.credentials()
			.expect("Both halves are present.");

		assert_eq!(credentials.client_id, "proxy");
		assert_eq!(credentials.client_secret.expose(), "s3cret");
	}

	#[test]
	fn debug_redacts_client_secret() {
		let config = parse(&["--client-secret", "s3cret"]);

		assert!(!format!("{config:?}").contains("s3cret"));
	}

	#[test]
	fn unknown_environment_is_rejected() {
		let result = Config::try_parse_from([
			"telemetry-proxy",
			"--api-base-url",
			"https://api.example.com",
			"--api-environment",
			"qa",
		]);

		assert!(result.is_err());
	}
}

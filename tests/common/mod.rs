#![allow(dead_code)]

// std
use std::time::Duration as StdDuration;
// crates.io
use httpmock::MockServer;
use time::{Duration, OffsetDateTime, format_description::well_known::Rfc3339, macros::offset};
// self
use telemetry_proxy::{
	auth::{Credentials, Environment, TokenManager},
	http::ReqwestHttpClient,
	oauth::ClientCredentialsSource,
	reqwest::Url,
	transport::ReqwestTransport,
};

pub const CLIENT_ID: &str = "proxy-client";
pub const CLIENT_SECRET: &str = "proxy-secret";
pub const SCOPE: &str = "service-platform-api-stg-dep-resource/api.auth";

pub fn http_client() -> ReqwestHttpClient {
	ReqwestHttpClient::with_timeout(StdDuration::from_secs(5))
		.expect("Test HTTP client should build.")
}

pub fn url(server: &MockServer, path: &str) -> Url {
	Url::parse(&server.url(path)).expect("Mock server URL should parse.")
}

/// Token manager exchanging against `/oauth2/token` on the mock server.
pub fn token_manager(server: &MockServer, environment: Environment) -> TokenManager {
	let source = ClientCredentialsSource::new(
		url(server, "/oauth2/token"),
		SCOPE,
		Credentials::new(CLIENT_ID, CLIENT_SECRET),
		http_client(),
	);

	TokenManager::new(environment, std::sync::Arc::new(source))
}

/// Data API transport rooted at `/dep-webapi` on the mock server.
pub fn transport(server: &MockServer) -> ReqwestTransport {
	ReqwestTransport::new(url(server, "/dep-webapi"), http_client())
}

/// RFC 3339 timestamp `offset` away from now, rendered in +09:00.
pub fn stamp_from_now(offset: Duration) -> String {
	(OffsetDateTime::now_utc() + offset)
		.to_offset(offset!(+9))
		.format(&Rfc3339)
		.expect("Instants should format as RFC 3339.")
}

pub fn token_body(token: &str) -> String {
	format!("{{\"access_token\":\"{token}\",\"token_type\":\"bearer\",\"expires_in\":3600}}")
}

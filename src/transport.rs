//! Upstream data API transport.
//!
//! [`DataTransport`] is the client's only dependency on the network: "send this request with
//! this bearer credential and give me the JSON back". [`ReqwestTransport`] is the production
//! implementation; tests substitute recording fakes.

// crates.io
use reqwest::{StatusCode, header::AUTHORIZATION};
// self
use crate::{
	_prelude::*,
	auth::Secret,
	error::{ConfigError, UpstreamError},
	http::ReqwestHttpClient,
};

/// Boxed future returned by [`DataTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<Value, UpstreamError>> + 'a + Send>>;

/// HTTP method of an upstream call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpstreamMethod {
	/// Read.
	Get,
	/// Write with a JSON body.
	Post,
}

/// Fully prepared upstream call.
#[derive(Clone, Debug, PartialEq)]
pub struct UpstreamRequest {
	/// HTTP method.
	pub method: UpstreamMethod,
	/// Path below the API base URL, e.g. `/data/plan`.
	pub path: &'static str,
	/// Query pairs, in order.
	pub query: Vec<(String, String)>,
	/// JSON body for writes.
	pub body: Option<Value>,
	/// Bearer credential; `None` for unauthenticated deployments.
	pub bearer: Option<Secret>,
}
impl UpstreamRequest {
	/// Builds a GET request.
	pub fn get(path: &'static str, query: Vec<(String, String)>, bearer: Option<Secret>) -> Self {
		Self { method: UpstreamMethod::Get, path, query, body: None, bearer }
	}

	/// Builds a POST request carrying `body`.
	pub fn post(path: &'static str, body: Value, bearer: Option<Secret>) -> Self {
		Self { method: UpstreamMethod::Post, path, query: Vec::new(), body: Some(body), bearer }
	}
}

/// Sends prepared requests to the data API.
pub trait DataTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes `request` and returns the parsed JSON body of a 2xx response.
	///
	/// A 401 must surface as [`UpstreamError::Unauthorized`] so callers can refresh the token.
	fn send(&self, request: UpstreamRequest) -> TransportFuture<'_>;
}

/// [`DataTransport`] over reqwest.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
	http_client: ReqwestHttpClient,
	base_url: Url,
}
impl ReqwestTransport {
	/// Creates a transport rooted at `base_url` (e.g. `https://api.example.com/dep-webapi`).
	pub fn new(base_url: Url, http_client: ReqwestHttpClient) -> Self {
		Self { http_client, base_url }
	}

	/// Base URL requests are resolved against.
	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		let base = self.base_url.as_str().trim_end_matches('/');

		Ok(Url::parse(&format!("{base}{path}"))?)
	}
}
impl DataTransport for ReqwestTransport {
	fn send(&self, request: UpstreamRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let url = self.endpoint(request.path).map_err(UpstreamError::network)?;
			let mut builder = match request.method {
				UpstreamMethod::Get => self.http_client.get(url),
				UpstreamMethod::Post => self.http_client.post(url),
			};

			if !request.query.is_empty() {
				builder = builder.query(&request.query);
			}
			if let Some(body) = &request.body {
				builder = builder.json(body);
			}
			if let Some(bearer) = &request.bearer {
				builder = builder.header(AUTHORIZATION, format!("Bearer {}", bearer.expose()));
			}

			let response = builder.send().await?;
			let status = response.status();
			let bytes = response.bytes().await?;

			if status == StatusCode::UNAUTHORIZED {
				return Err(UpstreamError::Unauthorized {
					body: String::from_utf8_lossy(&bytes).into_owned(),
				});
			}
			if !status.is_success() {
				return Err(UpstreamError::Status {
					status: status.as_u16(),
					body: String::from_utf8_lossy(&bytes).into_owned(),
				});
			}
			if bytes.is_empty() {
				return Ok(Value::Null);
			}

			serde_json::from_slice(&bytes).map_err(|source| UpstreamError::Decode { source })
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn endpoint_keeps_base_path() {
		let transport = ReqwestTransport::new(
			Url::parse("https://api.example.com/dep-webapi/").expect("Base URL should parse."),
			ReqwestHttpClient::default(),
		);

		assert_eq!(
			transport.endpoint("/data/plan").expect("Endpoint should resolve.").as_str(),
			"https://api.example.com/dep-webapi/data/plan"
		);
	}
}

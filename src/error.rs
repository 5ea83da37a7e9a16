//! Proxy-wide error taxonomy shared by the token manager, validator, and transports.

// self
use crate::{_prelude::*, auth::Environment, validate::ValidationError};

/// Proxy-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Callers branch on the variant rather than on message text; every message is safe to return
/// to API consumers verbatim.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Request input is malformed or out of policy.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// Token exchange failed.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Data API call failed.
	#[error(transparent)]
	Upstream(#[from] UpstreamError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
}
impl Error {
	/// Returns true when the data API rejected the bearer token, i.e. the call is eligible for a
	/// single refresh-and-retry.
	pub fn is_unauthorized(&self) -> bool {
		matches!(self, Self::Upstream(UpstreamError::Unauthorized { .. }))
	}
}

/// Configuration failures detected while wiring the proxy together.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Environment label does not name a known deployment.
	#[error("Unknown API environment `{value}`; expected one of dev, stg, service.")]
	UnknownEnvironment {
		/// Label supplied by the caller.
		value: String,
	},
	/// Non-dev environments need client credentials for the token exchange.
	#[error("Environment `{environment}` requires API client credentials.")]
	MissingCredentials {
		/// Environment that was being configured.
		environment: Environment,
	},
	/// Token endpoint or base URL cannot be parsed.
	#[error("Endpoint URL is invalid.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<url::ParseError> for ConfigError {
	fn from(source: url::ParseError) -> Self {
		Self::InvalidEndpoint { source }
	}
}

/// Token exchange failures.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// Token endpoint rejected the client (bad credentials, unknown scope, ...).
	#[error("Token endpoint rejected the client credentials: {reason}.")]
	Rejected {
		/// OAuth error code or description returned by the endpoint.
		reason: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint returned an unexpected response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint responded with a body that is not a token response.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Network failure while calling the token endpoint.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl AuthError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// HTTP status reported by the token endpoint, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Rejected { status, .. }
			| Self::TokenEndpoint { status, .. }
			| Self::TokenResponseParse { status, .. } => *status,
			Self::Network { .. } => None,
		}
	}
}

/// Data API failures, surfaced without interpretation apart from the 401 split.
#[derive(Debug, ThisError)]
pub enum UpstreamError {
	/// Data API answered 401; the bearer token is stale or invalid.
	#[error("Upstream API rejected the bearer token.")]
	Unauthorized {
		/// Response body, kept for diagnostics.
		body: String,
	},
	/// Data API answered with any other non-2xx status.
	#[error("Upstream API responded with status {status}: {body}")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Response body as text.
		body: String,
	},
	/// Network failure while calling the data API.
	#[error("Network error occurred while calling the upstream API: {source}")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Data API returned a 2xx body that is not JSON.
	#[error("Upstream API returned a body that is not valid JSON.")]
	Decode {
		/// Underlying decoding failure.
		#[source]
		source: serde_json::Error,
	},
}
impl UpstreamError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for UpstreamError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

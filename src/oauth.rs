//! OAuth 2.0 client-credentials exchange backed by the `oauth2` crate.

pub use oauth2;

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use oauth2::{
	ClientId, EndpointNotSet, EndpointSet, HttpClientError, RequestTokenError, Scope,
	TokenResponse, TokenUrl,
	basic::{BasicClient, BasicRequestTokenError},
};
// self
use crate::{
	_prelude::*,
	auth::{Credentials, Secret, TokenFuture, TokenSource},
	error::AuthError,
	http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot},
};

type TokenEndpointClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// [`TokenSource`] that performs the `client_credentials` grant.
///
/// Client authentication is HTTP Basic over the raw `client_id:client_secret` pair, base64
/// encoded without the form-encoding step `oauth2` applies, so secrets containing `+`, `/`, or
/// `=` reach the endpoint byte for byte. The `oauth2` client therefore holds no secret and also
/// names the client in the form body. The request carries exactly one scope. Only
/// `access_token` is read from the response; expiry is not tracked because the proxy refreshes
/// reactively on 401.
pub struct ClientCredentialsSource {
	oauth_client: TokenEndpointClient,
	token_url: Url,
	scope: String,
	basic_authorization: Secret,
	http_client: ReqwestHttpClient,
}
impl ClientCredentialsSource {
	/// Creates a source for the given endpoint, scope, and client credentials.
	pub fn new(
		token_url: Url,
		scope: impl Into<String>,
		credentials: Credentials,
		http_client: ReqwestHttpClient,
	) -> Self {
		let basic_authorization = basic_authorization(&credentials);
		let oauth_client = BasicClient::new(ClientId::new(credentials.client_id))
			.set_token_uri(TokenUrl::from_url(token_url.clone()));

		Self { oauth_client, token_url, scope: scope.into(), basic_authorization, http_client }
	}

	/// Token endpoint this source exchanges against.
	pub fn token_url(&self) -> &Url {
		&self.token_url
	}
}
impl TokenSource for ClientCredentialsSource {
	fn fetch_token(&self) -> TokenFuture<'_> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self
				.http_client
				.instrumented_with_authorization(meta.clone(), Some(self.basic_authorization.clone()));

			tracing::debug!(
				token_url = %self.token_url,
				scope = %self.scope,
				"Requesting client_credentials token."
			);

			let response = self
				.oauth_client
				.exchange_client_credentials()
				.add_scope(Scope::new(self.scope.clone()))
				.request_async(&instrumented)
				.await
				.map_err(|err| map_request_error(meta.take(), err))?;
			let access_token = response.access_token().secret();

			if access_token.is_empty() {
				return Err(AuthError::TokenEndpoint {
					message: "access_token is empty".into(),
					status: meta_status(meta.take().as_ref()),
				});
			}

			Ok(Secret::new(access_token.to_owned()))
		})
	}
}
impl Debug for ClientCredentialsSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCredentialsSource")
			.field("token_url", &self.token_url.as_str())
			.field("scope", &self.scope)
			.finish()
	}
}

fn basic_authorization(credentials: &Credentials) -> Secret {
	let pair = format!("{}:{}", credentials.client_id, credentials.client_secret.expose());

	Secret::new(format!("Basic {}", STANDARD.encode(pair)))
}

fn map_request_error(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
) -> AuthError {
	let status = meta_status(meta.as_ref());

	match err {
		RequestTokenError::ServerResponse(response) => {
			let code: &str = response.error().as_ref();
			let reason = match response.error_description() {
				Some(description) => format!("{code}: {description}"),
				None => code.to_owned(),
			};

			AuthError::Rejected { reason, status }
		},
		RequestTokenError::Request(HttpClientError::Reqwest(inner)) if inner.is_timeout() =>
			AuthError::TokenEndpoint {
				message: "request timed out".into(),
				status: status.or_else(|| inner.status().map(|code| code.as_u16())),
			},
		RequestTokenError::Request(HttpClientError::Reqwest(inner)) => AuthError::network(*inner),
		RequestTokenError::Request(HttpClientError::Io(inner)) => AuthError::network(inner),
		RequestTokenError::Request(other) =>
			AuthError::TokenEndpoint { message: other.to_string(), status },
		RequestTokenError::Parse(source, _body) => AuthError::TokenResponseParse { source, status },
		RequestTokenError::Other(message) => AuthError::TokenEndpoint { message, status },
	}
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::Environment;

	#[test]
	fn debug_omits_client_secret() {
		let source = ClientCredentialsSource::new(
			Environment::Staging.token_url().expect("Staging endpoint should parse."),
			Environment::Staging.scope(),
			Credentials::new("proxy", "top-secret"),
			ReqwestHttpClient::default(),
		);
		let rendered = format!("{source:?}");

		assert!(rendered.contains("stg-dep"));
		assert!(!rendered.contains("top-secret"));
	}

	#[test]
	fn basic_authorization_encodes_raw_pair() {
		let header = basic_authorization(&Credentials::new("client", "s+cr/t="));

		assert_eq!(header.expose(), "Basic Y2xpZW50OnMrY3IvdD0=");
	}

	#[test]
	fn server_response_maps_to_rejected_with_status() {
		let response = oauth2::basic::BasicErrorResponse::new(
			oauth2::basic::BasicErrorResponseType::InvalidClient,
			Some("bad secret".into()),
			None,
		);
		let err = map_request_error(
			Some(ResponseMetadata { status: Some(401) }),
			RequestTokenError::ServerResponse(response),
		);

		assert!(matches!(
			&err,
			AuthError::Rejected { reason, status: Some(401) } if reason == "invalid_client: bad secret"
		));
	}
}

//! Closed set of upstream deployments and their fixed OAuth endpoints.

// self
use crate::{_prelude::*, error::ConfigError};

/// Upstream deployment selected at startup.
///
/// Each variant maps to exactly one token endpoint and one scope; the lookups are exhaustive
/// `match`es so adding a deployment fails to compile until both are provided.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Environment {
	/// Unauthenticated development backend.
	#[default]
	Dev,
	/// Staging deployment (`stg`).
	Staging,
	/// Production deployment (`service`).
	Production,
}
impl Environment {
	/// Every known deployment, in declaration order.
	pub const ALL: [Self; 3] = [Self::Dev, Self::Staging, Self::Production];

	/// Returns a stable label suitable for logs and the health endpoint.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Dev => "dev",
			Self::Staging => "staging",
			Self::Production => "production",
		}
	}

	/// OAuth 2.0 token endpoint for the deployment.
	pub const fn token_endpoint(self) -> &'static str {
		match self {
			Self::Dev =>
				"https://service-platform-api-dev-dep.auth.ap-northeast-1.amazoncognito.com/oauth2/token",
			Self::Staging =>
				"https://service-platform-api-stg-dep.auth.ap-northeast-1.amazoncognito.com/oauth2/token",
			Self::Production =>
				"https://service-platform-api-service-dep.auth.ap-northeast-1.amazoncognito.com/oauth2/token",
		}
	}

	/// OAuth 2.0 scope requested during the client-credentials exchange.
	pub const fn scope(self) -> &'static str {
		match self {
			Self::Dev => "service-platform-api-dev-dep-resource/api.auth",
			Self::Staging => "service-platform-api-stg-dep-resource/api.auth",
			Self::Production => "service-platform-api-service-dep-resource/api.auth",
		}
	}

	/// Whether calls to this deployment carry a bearer token.
	pub const fn requires_auth(self) -> bool {
		!matches!(self, Self::Dev)
	}

	/// Parses [`Self::token_endpoint`] into a [`Url`].
	pub fn token_url(self) -> Result<Url, ConfigError> {
		Ok(Url::parse(self.token_endpoint())?)
	}
}
impl Display for Environment {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Environment {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"dev" => Ok(Self::Dev),
			"stg" | "staging" => Ok(Self::Staging),
			"service" | "production" | "prod" => Ok(Self::Production),
			_ => Err(ConfigError::UnknownEnvironment { value: s.to_owned() }),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn parses_legacy_and_canonical_labels() {
		assert_eq!("stg".parse::<Environment>().expect("stg should parse."), Environment::Staging);
		assert_eq!(
			"Service".parse::<Environment>().expect("service should parse."),
			Environment::Production
		);
		assert_eq!("dev".parse::<Environment>().expect("dev should parse."), Environment::Dev);

		let err = "qa".parse::<Environment>().expect_err("Unknown labels should be rejected.");

		assert!(matches!(err, ConfigError::UnknownEnvironment { value } if value == "qa"));
	}

	#[test]
	fn every_environment_has_a_valid_endpoint_and_scope() {
		for environment in Environment::ALL {
			let url = environment.token_url().expect("Fixed token endpoints should parse.");

			assert_eq!(url.scheme(), "https");
			assert_eq!(url.path(), "/oauth2/token");
			assert!(environment.scope().ends_with("/api.auth"));
		}
	}

	#[test]
	fn only_dev_skips_authentication() {
		assert!(!Environment::Dev.requires_auth());
		assert!(Environment::Staging.requires_auth());
		assert!(Environment::Production.requires_auth());
	}
}

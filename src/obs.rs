//! Observability helpers shared by the token manager, client, and HTTP layer.
//!
//! # Feature Flags
//!
//! - Spans named `telemetry_proxy.operation` (field `operation`) are always emitted through
//!   `tracing`; installing a subscriber is the binary's job (see [`init_tracing`]).
//! - Enable `metrics` to increment the `telemetry_proxy_operation_total` counter for every
//!   attempt/success/rejection/failure, labeled by `operation` + `outcome`.

mod metrics;

pub use metrics::*;

// self
use crate::_prelude::*;

/// Operations observed by the proxy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// `GET /data/plan`.
	PlanRead,
	/// `GET /data/collect`.
	CollectRead,
	/// `POST /data/collect`.
	CollectWrite,
	/// Initial token exchange.
	TokenAcquire,
	/// Reactive token exchange after a 401.
	TokenRefresh,
}
impl Operation {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::PlanRead => "plan_read",
			Operation::CollectRead => "collect_read",
			Operation::CollectWrite => "collect_write",
			Operation::TokenAcquire => "token_acquire",
			Operation::TokenRefresh => "token_refresh",
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Input failed validation; no network call was made.
	Rejected,
	/// Failure propagated back to the caller.
	Failure,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::Success => "success",
			Outcome::Rejected => "rejected",
			Outcome::Failure => "failure",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Creates the span wrapping one operation.
pub fn span(operation: Operation) -> tracing::Span {
	tracing::info_span!("telemetry_proxy.operation", operation = operation.as_str())
}

/// Log output flavor selected at startup.
#[cfg(feature = "server")]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
	/// Human-readable lines.
	#[default]
	Text,
	/// One JSON object per event.
	Json,
}

/// Installs the global `tracing` subscriber, filtered by `RUST_LOG` (default `info`).
#[cfg(feature = "server")]
pub fn init_tracing(format: LogFormat) {
	// crates.io
	use tracing_subscriber::{EnvFilter, fmt};

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
	let builder = fmt().with_env_filter(filter).with_target(true);
	let result = match format {
		LogFormat::Text => builder.try_init(),
		LogFormat::Json => builder.json().try_init(),
	};

	if let Err(e) = result {
		eprintln!("Tracing subscriber already installed: {e}");
	}
}

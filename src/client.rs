//! Validating client for the plan/collect data API.
//!
//! Each operation validates its input first; a rejected input never reaches the transport.
//! Transport failures are returned as-is. A stale token shows up as
//! [`Error::is_unauthorized`], and the caller decides whether to refresh and retry. The client
//! itself never retries.

// crates.io
use tracing::Instrument;
// self
use crate::{
	_prelude::*,
	auth::TokenManager,
	model::{CollectDataRequest, CollectQuery, Cycle, IntervalType, PlanQuery, QueryInt},
	obs::{self, Operation, Outcome},
	transport::{DataTransport, ReqwestTransport, UpstreamRequest},
	validate::{self, ValidationError},
};

/// Upstream path for plan reads.
pub const PLAN_PATH: &str = "/data/plan";
/// Upstream path for collect reads and writes.
pub const COLLECT_PATH: &str = "/data/collect";

/// Client wiring validation, the shared token, and a [`DataTransport`].
pub struct DataClient<T = ReqwestTransport>
where
	T: ?Sized + DataTransport,
{
	tokens: Arc<TokenManager>,
	transport: Arc<T>,
}
impl<T> DataClient<T>
where
	T: ?Sized + DataTransport,
{
	/// Creates a client over an injected token manager and transport.
	pub fn new(tokens: Arc<TokenManager>, transport: Arc<T>) -> Self {
		Self { tokens, transport }
	}

	/// Token manager shared with the HTTP layer.
	pub fn tokens(&self) -> &Arc<TokenManager> {
		&self.tokens
	}

	/// Underlying transport.
	pub fn transport(&self) -> &Arc<T> {
		&self.transport
	}

	/// `GET /data/plan` after checking the date range and interval type.
	pub async fn get_plan_data(&self, query: &PlanQuery) -> Result<Value> {
		let prepared = check_plan_query(query).map(|_| {
			UpstreamRequest::get(PLAN_PATH, query.to_query_pairs(), self.tokens.bearer())
		});

		self.dispatch(Operation::PlanRead, prepared).await
	}

	/// `GET /data/collect` after checking the date range, cycle, dataType1, and the cycle's
	/// ceiling against the requested range.
	pub async fn get_collect_data(&self, query: &CollectQuery) -> Result<Value> {
		let prepared = check_collect_query(query).map(|_| {
			UpstreamRequest::get(COLLECT_PATH, query.to_query_pairs(), self.tokens.bearer())
		});

		self.dispatch(Operation::CollectRead, prepared).await
	}

	/// `POST /data/collect` after the full nested validation.
	///
	/// The body is forwarded exactly as received.
	pub async fn create_collect_data(&self, body: Value) -> Result<Value> {
		let prepared = CollectDataRequest::from_json(&body)
			.and_then(|view| validate::validate_collect_data(&view))
			.map(|_| UpstreamRequest::post(COLLECT_PATH, body, self.tokens.bearer()));

		self.dispatch(Operation::CollectWrite, prepared).await
	}

	async fn dispatch(
		&self,
		operation: Operation,
		prepared: Result<UpstreamRequest, ValidationError>,
	) -> Result<Value> {
		obs::record_outcome(operation, Outcome::Attempt);

		let request = match prepared {
			Ok(request) => request,
			Err(e) => {
				obs::record_outcome(operation, Outcome::Rejected);
				tracing::warn!(%operation, "Rejected request: {e}");

				return Err(e.into());
			},
		};
		let result = self.transport.send(request).instrument(obs::span(operation)).await;

		match &result {
			Ok(_) => obs::record_outcome(operation, Outcome::Success),
			Err(e) => {
				obs::record_outcome(operation, Outcome::Failure);
				tracing::error!(%operation, "Upstream call failed: {e}");
			},
		}

		result.map_err(Error::from)
	}
}
impl<T> Clone for DataClient<T>
where
	T: ?Sized + DataTransport,
{
	fn clone(&self) -> Self {
		Self { tokens: self.tokens.clone(), transport: self.transport.clone() }
	}
}
impl<T> Debug for DataClient<T>
where
	T: ?Sized + DataTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DataClient").field("tokens", &self.tokens).finish()
	}
}

/// Plan read rules: date range, presence of `intervalType`, then its value.
///
/// A non-integer `intervalType` counts as present and fails the value check.
pub fn check_plan_query(query: &PlanQuery) -> Result<IntervalType, ValidationError> {
	validate::validate_date_range(query.from.as_deref(), query.to.as_deref())?;

	let interval_type = query
		.interval_type
		.as_ref()
		.ok_or(ValidationError::MissingPlanParameters)?
		.value()
		.ok_or(ValidationError::InvalidIntervalType)?;

	validate::validate_interval_type(interval_type)
}

/// Collect read rules: date range, cycle, dataType1, then the cycle ceiling on the range.
///
/// A missing or non-integer cycle fails as an invalid cycle.
pub fn check_collect_query(query: &CollectQuery) -> Result<Cycle, ValidationError> {
	let (from, to) = validate::validate_date_range(query.from.as_deref(), query.to.as_deref())?;
	let cycle =
		query.cycle.as_ref().and_then(QueryInt::value).ok_or(ValidationError::InvalidCycle)?;
	let cycle = validate::validate_cycle(cycle)?;
	let data_type1 = query
		.data_type1
		.as_ref()
		.map(|raw| raw.value().ok_or(ValidationError::InvalidDataType1))
		.transpose()?;

	validate::validate_data_type1(data_type1)?;
	validate::validate_cycle_time_period(cycle, from, to)?;

	Ok(cycle)
}

//! Request models for the plan/collect endpoints.
//!
//! Query and body types are deliberately loose (`Option` everywhere): the HTTP layer hands
//! over whatever the caller sent and the validator decides, with a specific message, what is
//! missing or out of policy. The typed enums at the top are what a successful validation
//! produces.

// self
use crate::{_prelude::*, validate::ValidationError};

/// Upstream data collection granularity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cycle {
	/// 1-second collection.
	OneSecond,
	/// 1-minute collection.
	OneMinute,
	/// 5-minute collection.
	FiveMinutes,
	/// 30-minute collection.
	ThirtyMinutes,
	/// 12-hour collection.
	TwelveHours,
}
impl Cycle {
	/// Every cycle in code order.
	pub const ALL: [Self; 5] = [
		Self::OneSecond,
		Self::OneMinute,
		Self::FiveMinutes,
		Self::ThirtyMinutes,
		Self::TwelveHours,
	];

	/// Wire code (1..=5).
	pub const fn code(self) -> i64 {
		match self {
			Self::OneSecond => 1,
			Self::OneMinute => 2,
			Self::FiveMinutes => 3,
			Self::ThirtyMinutes => 4,
			Self::TwelveHours => 5,
		}
	}

	/// Widest time window, in hours, a single query or write may span for this cycle.
	pub const fn max_window_hours(self) -> i64 {
		match self {
			Self::OneSecond => 2,
			Self::OneMinute | Self::FiveMinutes => 48,
			Self::ThirtyMinutes | Self::TwelveHours => 1440,
		}
	}

	/// [`Self::max_window_hours`] as a [`Duration`].
	pub const fn max_window(self) -> Duration {
		Duration::hours(self.max_window_hours())
	}
}
impl TryFrom<i64> for Cycle {
	type Error = ValidationError;

	fn try_from(code: i64) -> Result<Self, Self::Error> {
		Self::ALL.into_iter().find(|cycle| cycle.code() == code).ok_or(ValidationError::InvalidCycle)
	}
}
impl Display for Cycle {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}", self.code())
	}
}

/// Aggregation granularity of plan data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IntervalType {
	/// Command value.
	CommandValue,
	/// 1-minute plan.
	OneMinutePlan,
	/// 30-minute plan.
	ThirtyMinutePlan,
}
impl IntervalType {
	/// Wire code (0..=2).
	pub const fn code(self) -> i64 {
		match self {
			Self::CommandValue => 0,
			Self::OneMinutePlan => 1,
			Self::ThirtyMinutePlan => 2,
		}
	}
}
impl TryFrom<i64> for IntervalType {
	type Error = ValidationError;

	fn try_from(code: i64) -> Result<Self, Self::Error> {
		match code {
			0 => Ok(Self::CommandValue),
			1 => Ok(Self::OneMinutePlan),
			2 => Ok(Self::ThirtyMinutePlan),
			_ => Err(ValidationError::InvalidIntervalType),
		}
	}
}

/// Classification of a collected data point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType1 {
	/// Actual value.
	ActualValue,
	/// Received data.
	ReceivedData,
	/// Processed data.
	ProcessedData,
	/// Forecast.
	Forecast,
}
impl DataType1 {
	/// Wire code (5..=8).
	pub const fn code(self) -> i64 {
		match self {
			Self::ActualValue => 5,
			Self::ReceivedData => 6,
			Self::ProcessedData => 7,
			Self::Forecast => 8,
		}
	}
}
impl TryFrom<i64> for DataType1 {
	type Error = ValidationError;

	fn try_from(code: i64) -> Result<Self, Self::Error> {
		match code {
			5 => Ok(Self::ActualValue),
			6 => Ok(Self::ReceivedData),
			7 => Ok(Self::ProcessedData),
			8 => Ok(Self::Forecast),
			_ => Err(ValidationError::InvalidDataType1),
		}
	}
}

/// Integer query parameter, kept as received until validation decides what it means.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryInt {
	/// Well-formed integer.
	Value(i64),
	/// Text that is not an integer.
	Malformed(String),
}
impl QueryInt {
	/// Parses `raw`, keeping the original text when it is not an integer.
	pub fn parse(raw: &str) -> Self {
		match raw.trim().parse() {
			Ok(value) => Self::Value(value),
			Err(_) => Self::Malformed(raw.to_owned()),
		}
	}

	/// The integer, if the parameter held one.
	pub fn value(&self) -> Option<i64> {
		match self {
			Self::Value(value) => Some(*value),
			Self::Malformed(_) => None,
		}
	}
}
impl From<i64> for QueryInt {
	fn from(value: i64) -> Self {
		Self::Value(value)
	}
}
impl Display for QueryInt {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Value(value) => write!(f, "{value}"),
			Self::Malformed(raw) => f.write_str(raw),
		}
	}
}

/// Filters shared by the plan and collect read endpoints.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListFilters {
	/// Resource type filter.
	pub resource_types: Option<Vec<String>>,
	/// Resource identifier filter.
	pub resources: Option<Vec<String>>,
	/// Attribute identifier filter.
	pub attributes: Option<Vec<String>>,
	/// Tenant identifier filter.
	pub tenant_ids: Option<Vec<String>>,
}
impl ListFilters {
	fn push_query(&self, query: &mut Vec<(String, String)>) {
		for (name, values) in [
			("resourceTypes", &self.resource_types),
			("resources", &self.resources),
			("attributes", &self.attributes),
			("tenantIds", &self.tenant_ids),
		] {
			for value in values.iter().flatten() {
				query.push((format!("{name}[]"), value.clone()));
			}
		}
	}
}

/// Parameters of `GET /data/plan`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlanQuery {
	/// Range start, ISO-8601 with explicit offset.
	pub from: Option<String>,
	/// Range end, ISO-8601 with explicit offset.
	pub to: Option<String>,
	/// Plan aggregation granularity code.
	pub interval_type: Option<QueryInt>,
	/// List filters.
	pub filters: ListFilters,
}
impl PlanQuery {
	/// Query pairs forwarded upstream, values untouched.
	pub fn to_query_pairs(&self) -> Vec<(String, String)> {
		let mut query = Vec::new();

		push_opt(&mut query, "from", self.from.as_deref());
		push_opt(&mut query, "to", self.to.as_deref());
		push_opt(&mut query, "intervalType", self.interval_type.as_ref().map(QueryInt::to_string).as_deref());
		self.filters.push_query(&mut query);

		query
	}
}

/// Parameters of `GET /data/collect`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectQuery {
	/// Range start, ISO-8601 with explicit offset.
	pub from: Option<String>,
	/// Range end, ISO-8601 with explicit offset.
	pub to: Option<String>,
	/// Collection cycle code.
	pub cycle: Option<QueryInt>,
	/// Data classification filter.
	pub data_type1: Option<QueryInt>,
	/// List filters.
	pub filters: ListFilters,
}
impl CollectQuery {
	/// Query pairs forwarded upstream, values untouched.
	pub fn to_query_pairs(&self) -> Vec<(String, String)> {
		let mut query = Vec::new();

		push_opt(&mut query, "from", self.from.as_deref());
		push_opt(&mut query, "to", self.to.as_deref());
		push_opt(&mut query, "cycle", self.cycle.as_ref().map(QueryInt::to_string).as_deref());
		self.filters.push_query(&mut query);
		push_opt(&mut query, "dataType1", self.data_type1.as_ref().map(QueryInt::to_string).as_deref());

		query
	}
}

/// Read-only view of a `POST /data/collect` body.
///
/// The client validates this view and forwards the original JSON document, so fields not
/// modeled here still reach the upstream API.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectDataRequest {
	/// Collection cycle code.
	pub cycle: Option<i64>,
	/// Request-wide data classification.
	pub data_type1: Option<i64>,
	/// Resources being written.
	pub resources: Option<Vec<ResourceBlock>>,
}
impl CollectDataRequest {
	/// Views a JSON body as a collect-data request, naming the offending path on shape errors.
	pub fn from_json(body: &Value) -> Result<Self, ValidationError> {
		serde_path_to_error::deserialize(body).map_err(|e| ValidationError::MalformedBody {
			path: e.path().to_string(),
			reason: e.into_inner().to_string(),
		})
	}
}

/// One resource inside a [`CollectDataRequest`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceBlock {
	/// Resource identifier.
	pub resource_id: Option<String>,
	/// Attributes written for the resource.
	pub attributes: Option<Vec<AttributeBlock>>,
}

/// One attribute series inside a [`ResourceBlock`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeBlock {
	/// Six-digit attribute identifier.
	pub attribute: Option<String>,
	/// Data classification code.
	pub data_type1: Option<i64>,
	/// Free-form classification, at most 64 characters.
	pub data_type2: Option<String>,
	/// Free-form classification, at most 64 characters.
	pub data_type3: Option<String>,
	/// Data points.
	pub values: Option<Vec<ValuePoint>>,
}

/// A single timestamped value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ValuePoint {
	/// ISO-8601 timestamp with explicit offset.
	pub datetime: Option<String>,
	/// Value as sent by the caller.
	pub value: Option<String>,
}

fn push_opt(query: &mut Vec<(String, String)>, name: &str, value: Option<&str>) {
	if let Some(value) = value {
		query.push((name.to_owned(), value.to_owned()));
	}
}

//! Fail-fast request validation for the plan/collect endpoints.
//!
//! Every check is a small pure function over explicit inputs. The read path (query parameters)
//! and the write path (nested collect-data body) share the date-range, cycle, and dataType1
//! predicates. The first violation wins; errors are never aggregated. Messages are returned to
//! API consumers verbatim, so they name the exact rule that failed.

// std
use std::sync::LazyLock;
// crates.io
use regex::Regex;
use time::{
	Date, Month,
	format_description::well_known::{Iso8601, Rfc3339},
};
// self
use crate::{
	_prelude::*,
	model::{AttributeBlock, CollectDataRequest, Cycle, DataType1, IntervalType, ValuePoint},
};

/// Longest accepted `dataType2`/`dataType3`, in characters.
pub const DATA_TYPE_MAX_CHARS: usize = 64;
/// How far ahead of now a written value may lie.
pub const FUTURE_LIMIT_MONTHS: i32 = 4;
/// How far behind now a written value may lie.
pub const PAST_LIMIT_YEARS: i32 = 2;

static EXPLICIT_OFFSET: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"[+-][0-9]{2}:[0-9]{2}$").expect("Offset pattern is a valid regular expression.")
});
static ATTRIBUTE_ID: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^[0-9]{6}$").expect("Attribute pattern is a valid regular expression.")
});

/// Reasons a request is rejected before any network call.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ValidationError {
	/// `from` or `to` is missing.
	#[error("Both from and to dates are required")]
	MissingDateRange,
	/// A timestamp does not end in `+HH:MM`/`-HH:MM`.
	#[error("Timezone is required in format +HH:MM or -HH:MM")]
	MissingTimezone,
	/// `from` or `to` does not parse.
	#[error("Invalid date format. Use ISO8601 format (YYYY-MM-DDThh:mm:ss+TZ)")]
	InvalidDateFormat,
	/// `from` is later than `to`.
	#[error("From date must be before or equal to to date")]
	InvertedDateRange,
	/// Plan reads need `intervalType` besides the range.
	#[error("from, to, and intervalType are required parameters")]
	MissingPlanParameters,
	/// Cycle code outside 1..=5.
	#[error("Invalid cycle value. Must be one of: 1, 2, 3, 4, 5")]
	InvalidCycle,
	/// Interval type outside 0..=2.
	#[error(
		"Invalid intervalType. Must be one of: 0, 1, 2 (0: Command value, 1: 1-minute plan, 2: 30-minute plan)"
	)]
	InvalidIntervalType,
	/// dataType1 outside 5..=8.
	#[error(
		"Invalid dataType1. Must be one of: 5, 6, 7, 8 (5:Actual Value, 6:Received Data, 7:Processed Data, 8:Forecast)"
	)]
	InvalidDataType1,
	/// Time window wider than the cycle allows.
	#[error("For cycle {cycle}, maximum time period is {max_hours} hours")]
	CycleWindowExceeded {
		/// Cycle code.
		cycle: i64,
		/// Ceiling for the cycle.
		max_hours: i64,
	},
	/// Body lacks `cycle` or a non-empty `resources` array.
	#[error("cycle and resources array are required")]
	MissingCollectFields,
	/// Resource lacks `resourceId` or `attributes`.
	#[error("resourceId and attributes array are required for each resource")]
	MissingResourceFields,
	/// Attribute lacks `attribute` or `values`.
	#[error("attribute and values array are required for each attribute")]
	MissingAttributeFields,
	/// Attribute id is not six ASCII digits.
	#[error("attribute must be a 6-digit number string")]
	InvalidAttributeId,
	/// `dataType2`/`dataType3` longer than allowed.
	#[error("{field} maximum length is 64 characters")]
	DataTypeTooLong {
		/// Offending field name.
		field: &'static str,
	},
	/// Attribute carries no values.
	#[error("values array cannot be empty")]
	EmptyValues,
	/// Value lacks `datetime` or `value`.
	#[error("datetime and value are required for each value")]
	MissingValueFields,
	/// Value datetime does not parse.
	#[error("Invalid datetime format. Use ISO8601 format (YYYY-MM-DDThh:mm:ss+TZ)")]
	InvalidDatetime,
	/// Value lies beyond the future registration window.
	#[error("Future data can only be registered up to 4 months ahead (API specification)")]
	FutureLimitExceeded,
	/// Value lies beyond the past registration window.
	#[error("Past data can only be registered up to 2 years ago (API specification)")]
	PastLimitExceeded,
	/// Body JSON cannot be viewed as a collect-data request.
	#[error("Invalid request body at {path}: {reason}")]
	MalformedBody {
		/// JSON path of the offending node.
		path: String,
		/// Deserializer message.
		reason: String,
	},
}

/// Checks presence, offset, parseability, and ordering of a `from`/`to` pair.
pub fn validate_date_range(
	from: Option<&str>,
	to: Option<&str>,
) -> Result<(OffsetDateTime, OffsetDateTime), ValidationError> {
	let (Some(from), Some(to)) = (from.filter(|s| !s.is_empty()), to.filter(|s| !s.is_empty()))
	else {
		return Err(ValidationError::MissingDateRange);
	};

	if !has_explicit_offset(from) || !has_explicit_offset(to) {
		return Err(ValidationError::MissingTimezone);
	}

	let (Some(from), Some(to)) = (parse_timestamp(from), parse_timestamp(to)) else {
		return Err(ValidationError::InvalidDateFormat);
	};

	if from > to {
		return Err(ValidationError::InvertedDateRange);
	}

	Ok((from, to))
}

/// Parses a cycle code.
pub fn validate_cycle(cycle: i64) -> Result<Cycle, ValidationError> {
	Cycle::try_from(cycle)
}

/// Parses a plan interval type code.
pub fn validate_interval_type(interval_type: i64) -> Result<IntervalType, ValidationError> {
	IntervalType::try_from(interval_type)
}

/// Parses an optional dataType1 code; absence is fine.
pub fn validate_data_type1(data_type1: Option<i64>) -> Result<Option<DataType1>, ValidationError> {
	data_type1.map(DataType1::try_from).transpose()
}

/// Rejects windows wider than the cycle's ceiling. Exactly the ceiling is allowed.
pub fn validate_cycle_time_period(
	cycle: Cycle,
	from: OffsetDateTime,
	to: OffsetDateTime,
) -> Result<(), ValidationError> {
	if to - from > cycle.max_window() {
		return Err(ValidationError::CycleWindowExceeded {
			cycle: cycle.code(),
			max_hours: cycle.max_window_hours(),
		});
	}

	Ok(())
}

/// Checks an attribute block's own fields (not its values' timestamps).
pub fn validate_attribute(attr: &AttributeBlock) -> Result<(), ValidationError> {
	let (Some(attribute), Some(values)) =
		(attr.attribute.as_deref().filter(|s| !s.is_empty()), attr.values.as_ref())
	else {
		return Err(ValidationError::MissingAttributeFields);
	};

	if !ATTRIBUTE_ID.is_match(attribute) {
		return Err(ValidationError::InvalidAttributeId);
	}

	validate_data_type1(attr.data_type1)?;

	for (field, value) in [("dataType2", &attr.data_type2), ("dataType3", &attr.data_type3)] {
		if value.as_deref().is_some_and(|s| s.chars().count() > DATA_TYPE_MAX_CHARS) {
			return Err(ValidationError::DataTypeTooLong { field });
		}
	}

	if values.is_empty() {
		return Err(ValidationError::EmptyValues);
	}

	Ok(())
}

/// Checks one value point against the registration window around `now`.
///
/// Returns the parsed instant so callers can track the spread of an attribute's values.
pub fn validate_value(
	point: &ValuePoint,
	now: OffsetDateTime,
) -> Result<OffsetDateTime, ValidationError> {
	let (Some(datetime), Some(_)) =
		(point.datetime.as_deref().filter(|s| !s.is_empty()), point.value.as_ref())
	else {
		return Err(ValidationError::MissingValueFields);
	};
	let instant = parse_timestamp(datetime).ok_or(ValidationError::InvalidDatetime)?;

	if !has_explicit_offset(datetime) {
		return Err(ValidationError::MissingTimezone);
	}
	if instant > shift_months(now, FUTURE_LIMIT_MONTHS) {
		return Err(ValidationError::FutureLimitExceeded);
	}
	if instant < shift_months(now, -12 * PAST_LIMIT_YEARS) {
		return Err(ValidationError::PastLimitExceeded);
	}

	Ok(instant)
}

/// Validates a collect-data body against the current clock.
pub fn validate_collect_data(request: &CollectDataRequest) -> Result<Cycle, ValidationError> {
	validate_collect_data_at(request, OffsetDateTime::now_utc())
}

/// Validates a collect-data body with `now` as the reference for the registration window.
///
/// Order: top-level shape, cycle, top-level dataType1, then per resource, per attribute, per
/// value. After an attribute's values are checked, the cycle ceiling is applied to the spread
/// between its earliest and latest timestamps.
pub fn validate_collect_data_at(
	request: &CollectDataRequest,
	now: OffsetDateTime,
) -> Result<Cycle, ValidationError> {
	let (Some(cycle), Some(resources)) =
		(request.cycle.filter(|&c| c != 0), request.resources.as_ref().filter(|r| !r.is_empty()))
	else {
		return Err(ValidationError::MissingCollectFields);
	};
	let cycle = validate_cycle(cycle)?;

	validate_data_type1(request.data_type1)?;

	for resource in resources {
		let (Some(_), Some(attributes)) = (
			resource.resource_id.as_deref().filter(|s| !s.is_empty()),
			resource.attributes.as_ref(),
		) else {
			return Err(ValidationError::MissingResourceFields);
		};

		for attr in attributes {
			validate_attribute(attr)?;

			let mut spread: Option<(OffsetDateTime, OffsetDateTime)> = None;

			for point in attr.values.iter().flatten() {
				let instant = validate_value(point, now)?;

				spread = Some(match spread {
					Some((min, max)) => (min.min(instant), max.max(instant)),
					None => (instant, instant),
				});
			}

			if let Some((min, max)) = spread {
				validate_cycle_time_period(cycle, min, max)?;
			}
		}
	}

	Ok(cycle)
}

fn has_explicit_offset(value: &str) -> bool {
	EXPLICIT_OFFSET.is_match(value)
}

fn parse_timestamp(value: &str) -> Option<OffsetDateTime> {
	OffsetDateTime::parse(value, &Rfc3339)
		.or_else(|_| OffsetDateTime::parse(value, &Iso8601::DEFAULT))
		.ok()
}

/// Moves `at` by whole calendar months, clamping the day to the target month's length.
fn shift_months(at: OffsetDateTime, months: i32) -> OffsetDateTime {
	let index = at.year() * 12 + i32::from(u8::from(at.month())) - 1 + months;
	let year = index.div_euclid(12);
	let Ok(month) = Month::try_from((index.rem_euclid(12) + 1) as u8) else {
		return at;
	};

	(1..=at.day())
		.rev()
		.find_map(|day| Date::from_calendar_date(year, month, day).ok())
		.map_or(at, |date| at.replace_date(date))
}

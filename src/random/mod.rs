//! Random test data
//!
//! Generators behind the "random string/integer/float/date" steps:
//! - strings never start with a digit, so a parser never reads them as numbers
//! - floats always carry a fractional part, so integer and float assertions
//!   can tell them apart
//! - dates can be bounded by a start and an end in either order

pub mod date_format;

pub use date_format::{DateFormat, DEFAULT_DATE_FORMAT};

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::errors::{ApiTestError, Result};
use crate::strings::parse_list;

pub const DEFAULT_INT_MIN: i64 = 0;
pub const DEFAULT_INT_MAX: i64 = 100;

/// Default day limit for `date_after` / `date_before`
pub const DEFAULT_DAY_LIMIT: i64 = 100_000;

/// Base date layouts accepted besides RFC 3339
const BASE_DATETIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];
const BASE_DATE_LAYOUTS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"];

/// A random string: `a` followed by 32 hex digits
pub fn rand_string() -> String {
    format!("a{}", Uuid::new_v4().simple())
}

pub fn rand_strings(count: usize) -> Vec<String> {
    (0..count).map(|_| rand_string()).collect()
}

/// Uniform integer in `[min, max)`
pub fn rand_int(min: i64, max: i64) -> Result<i64> {
    if min >= max {
        return Err(ApiTestError::InvalidArgument(format!(
            "Empty integer range {}..{}",
            min, max
        )));
    }
    Ok(rand::rng().random_range(min..max))
}

pub fn rand_ints(min: i64, max: i64, count: usize) -> Result<Vec<i64>> {
    (0..count).map(|_| rand_int(min, max)).collect()
}

/// Largest magnitude `rand_float` accepts for its bounds
pub const FLOAT_BOUND: i64 = 1 << 30;

const FRACTION_STEPS: u32 = 1_000_000;

/// Random integer from `[min, max)` plus a fraction in millionths, never zero
///
/// Bounds are limited to `FLOAT_BOUND` so the fraction survives the addition.
pub fn rand_float(min: i64, max: i64) -> Result<f64> {
    if min < -FLOAT_BOUND || max > FLOAT_BOUND {
        return Err(ApiTestError::InvalidArgument(format!(
            "Float range {}..{} exceeds ±{}",
            min, max, FLOAT_BOUND
        )));
    }
    let whole = rand_int(min, max)?;
    let steps = rand::rng().random_range(1..FRACTION_STEPS);
    Ok(whole as f64 + f64::from(steps) / f64::from(FRACTION_STEPS))
}

/// Pick one non-empty item from a comma-separated list
pub fn any_from_list(value: &str) -> Result<String> {
    let items: Vec<String> = parse_list(value)?
        .into_iter()
        .filter(|item| !item.is_empty())
        .collect();

    if items.is_empty() {
        return Err(ApiTestError::InvalidArgument(format!(
            "No items to choose from in `{}`",
            value
        )));
    }

    let idx = rand::rng().random_range(0..items.len());
    Ok(items[idx].clone())
}

pub fn now(format: &DateFormat) -> String {
    format.format(&Local::now())
}

pub fn utc_now(format: &DateFormat) -> String {
    format.format(&Utc::now())
}

/// Now, or a date between `start` and `stop` when both are given
pub fn rand_date(format: &DateFormat, start: Option<&str>, stop: Option<&str>) -> Result<String> {
    match (start, stop) {
        (Some(start), Some(stop)) => date_between(start, stop, format),
        _ => Ok(now(format)),
    }
}

/// Parse a base date given as a step argument
pub fn parse_base_date(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.naive_local());
    }

    for layout in BASE_DATETIME_LAYOUTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, layout) {
            return Ok(dt);
        }
    }

    for layout in BASE_DATE_LAYOUTS {
        if let Ok(date) = NaiveDate::parse_from_str(value, layout) {
            if let Some(dt) = date.and_hms_opt(0, 0, 0) {
                return Ok(dt);
            }
        }
    }

    Err(ApiTestError::InvalidArgument(format!("Cannot parse date `{}`", value)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    After,
    Before,
}

fn shift(base: NaiveDateTime, direction: Direction, offset: Duration) -> Result<NaiveDateTime> {
    let shifted = match direction {
        Direction::After => base.checked_add_signed(offset),
        Direction::Before => base.checked_sub_signed(offset),
    };
    shifted.ok_or_else(|| {
        ApiTestError::InvalidArgument(format!(
            "Moving `{}` by {} leaves the supported date range",
            base, offset
        ))
    })
}

/// Move `base` by a random 1..=limit whole days (no move when limit is 0)
fn shift_days(base: NaiveDateTime, direction: Direction, limit: i64) -> Result<NaiveDateTime> {
    let limit = limit.saturating_abs();
    if limit == 0 {
        return Ok(base);
    }
    let days = rand::rng().random_range(1..=limit);
    let offset = Duration::try_days(days)
        .ok_or_else(|| ApiTestError::InvalidArgument(format!("Day limit {} is too large", limit)))?;
    shift(base, direction, offset)
}

/// A date-time strictly after `base`, at most `limit` days later
pub fn datetime_after(base: NaiveDateTime, limit: i64) -> Result<NaiveDateTime> {
    shift_days(base, Direction::After, limit)
}

/// A date-time strictly before `base`, at most `limit` days earlier
pub fn datetime_before(base: NaiveDateTime, limit: i64) -> Result<NaiveDateTime> {
    shift_days(base, Direction::Before, limit)
}

/// A date-time strictly between two bounds given in either order
///
/// Bounds closer than two seconds leave no room and yield `start`.
pub fn datetime_between(start: NaiveDateTime, end: NaiveDateTime) -> Result<NaiveDateTime> {
    let direction = if end > start { Direction::After } else { Direction::Before };
    let span = (end - start).abs();

    let span_days = span.num_days();
    if span_days >= 2 {
        return shift_days(start, direction, span_days - 1);
    }

    let span_secs = span.num_seconds();
    if span_secs >= 2 {
        let secs = rand::rng().random_range(1..span_secs);
        return shift(start, direction, Duration::seconds(secs));
    }

    Ok(start)
}

fn render(value: NaiveDateTime, format: &DateFormat) -> String {
    format.format(&Utc.from_utc_datetime(&value))
}

pub fn date_after(base: &str, format: &DateFormat, limit: i64) -> Result<String> {
    Ok(render(datetime_after(parse_base_date(base)?, limit)?, format))
}

pub fn date_before(base: &str, format: &DateFormat, limit: i64) -> Result<String> {
    Ok(render(datetime_before(parse_base_date(base)?, limit)?, format))
}

pub fn date_between(start: &str, end: &str, format: &DateFormat) -> Result<String> {
    let start = parse_base_date(start)?;
    let end = parse_base_date(end)?;
    Ok(render(datetime_between(start, end)?, format))
}

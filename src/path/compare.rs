//! Value comparisons behind assertion steps
//!
//! Every check is a pure function over an actual and an expected value. A
//! mismatch is an `Assertion` error carrying the path, both values and a
//! message; an expected value that cannot be read (e.g. `"abc"` for an
//! integer check) is an `InvalidArgument` error instead.

use serde_json::Value;

use crate::errors::{ApiTestError, Result};
use crate::resolve::value_to_text;
use crate::strings::{parse_list, truncate_str, MAX_DIAGNOSTIC_LEN};

/// How both sides are read before an equality check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    None,
    Int,
    Float,
}

/// Substring checks shared by headers, XPath and JSON Pointer steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextCheck {
    Contains,
    StartsWith,
    EndsWith,
}

impl TextCheck {
    fn holds(&self, actual: &str, expected: &str) -> bool {
        match self {
            TextCheck::Contains => actual.contains(expected),
            TextCheck::StartsWith => actual.starts_with(expected),
            TextCheck::EndsWith => actual.ends_with(expected),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            TextCheck::Contains => "contain",
            TextCheck::StartsWith => "start with",
            TextCheck::EndsWith => "end with",
        }
    }
}

fn fail(path: &str, actual: &str, expected: &str, message: String) -> ApiTestError {
    ApiTestError::assertion(
        path,
        truncate_str(actual, MAX_DIAGNOSTIC_LEN),
        truncate_str(expected, MAX_DIAGNOSTIC_LEN),
        message,
    )
}

fn expected_int(expected: &str) -> Result<i64> {
    expected
        .trim()
        .parse()
        .map_err(|_| ApiTestError::InvalidArgument(format!("`{}` is not an integer", expected)))
}

fn expected_float(expected: &str) -> Result<f64> {
    expected
        .trim()
        .parse()
        .map_err(|_| ApiTestError::InvalidArgument(format!("`{}` is not a float", expected)))
}

fn value_as_int(actual: &Value) -> Option<i64> {
    match actual {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_as_float(actual: &Value) -> Option<f64> {
    match actual {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Equality of a text value, optionally read as int or float on both sides
pub fn equals(path: &str, actual: &str, expected: &str, coercion: Coercion) -> Result<()> {
    equals_value(path, &Value::String(actual.to_string()), expected, coercion)
}

/// Equality of a JSON value against the expected text
///
/// Without coercion strings compare as-is and anything else by its JSON
/// text, so `1` equals `"1"` and `true` equals `"true"`.
pub fn equals_value(path: &str, actual: &Value, expected: &str, coercion: Coercion) -> Result<()> {
    let actual_text = value_to_text(actual);

    let matches = match coercion {
        Coercion::None => actual_text == expected,
        Coercion::Int => {
            let expected = expected_int(expected)?;
            value_as_int(actual) == Some(expected)
        }
        Coercion::Float => {
            let expected = expected_float(expected)?;
            value_as_float(actual) == Some(expected)
        }
    };

    if matches {
        return Ok(());
    }

    let kind = match coercion {
        Coercion::None => "",
        Coercion::Int => " as an integer",
        Coercion::Float => " as a float",
    };
    Err(fail(
        path,
        &actual_text,
        expected,
        format!("`{}` is `{}` instead of `{}`{}", path, actual_text, expected, kind),
    ))
}

/// Items of an expected list: a JSON array when it starts with `[`,
/// otherwise comma-separated values
pub fn parse_expected_list(expected: &str) -> Result<Vec<String>> {
    let trimmed = expected.trim();
    if trimmed.starts_with('[') {
        let items: Vec<Value> = serde_json::from_str(trimmed).map_err(|e| {
            ApiTestError::InvalidArgument(format!("`{}` is not a JSON list: {}", expected, e))
        })?;
        return Ok(items.iter().map(value_to_text).collect());
    }
    parse_list(expected)
}

/// The actual value is a list with exactly the expected items, in order
pub fn is_a_list(path: &str, actual: &Value, expected: &str) -> Result<()> {
    let expected_items = parse_expected_list(expected)?;
    let actual_text = value_to_text(actual);

    let items = match actual {
        Value::Array(items) => items,
        _ => {
            return Err(fail(path, &actual_text, expected, format!("`{}` is not a list", path)));
        }
    };

    let actual_items: Vec<String> = items.iter().map(value_to_text).collect();
    if actual_items == expected_items {
        Ok(())
    } else {
        Err(fail(
            path,
            &actual_text,
            expected,
            format!("`{}` is {:?} instead of {:?}", path, actual_items, expected_items),
        ))
    }
}

/// The actual value is among the expected items
pub fn is_one_of(path: &str, actual: &str, expected: &str) -> Result<()> {
    let items = parse_list(expected)?;
    if items.iter().any(|item| item == actual) {
        Ok(())
    } else {
        Err(fail(path, actual, expected, format!("`{}` should be among {:?}", actual, items)))
    }
}

/// The actual value is not among the expected items
pub fn is_not_one_of(path: &str, actual: &str, expected: &str) -> Result<()> {
    let items = parse_list(expected)?;
    if items.iter().any(|item| item == actual) {
        Err(fail(path, actual, expected, format!("`{}` should not be among {:?}", actual, items)))
    } else {
        Ok(())
    }
}

/// Text is empty
pub fn is_empty(path: &str, actual: &str) -> Result<()> {
    if actual.is_empty() {
        Ok(())
    } else {
        Err(fail(path, actual, "", format!("`{}` should be empty", path)))
    }
}

/// Text is not empty
pub fn is_not_empty(path: &str, actual: &str) -> Result<()> {
    if actual.is_empty() {
        Err(fail(path, actual, "<not empty>", format!("`{}` should not be empty", path)))
    } else {
        Ok(())
    }
}

/// A JSON value counts as empty when absent, `null`, `""`, `[]` or `{}`
pub fn json_is_empty_value(actual: Option<&Value>) -> bool {
    match actual {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(_) => false,
    }
}

pub fn json_is_empty(path: &str, actual: Option<&Value>) -> Result<()> {
    if json_is_empty_value(actual) {
        return Ok(());
    }
    let actual_text = actual.map(value_to_text).unwrap_or_default();
    Err(fail(path, &actual_text, "", format!("`{}` should be empty", path)))
}

pub fn json_is_not_empty(path: &str, actual: Option<&Value>) -> Result<()> {
    if !json_is_empty_value(actual) {
        return Ok(());
    }
    let actual_text = match actual {
        Some(v) => value_to_text(v),
        None => "<absent>".to_string(),
    };
    Err(fail(path, &actual_text, "<not empty>", format!("`{}` should not be empty", path)))
}

/// Substring check, or its negation when `expect_match` is false
pub fn check_text(path: &str, actual: &str, expected: &str, check: TextCheck, expect_match: bool) -> Result<()> {
    if check.holds(actual, expected) == expect_match {
        return Ok(());
    }
    let verb = if expect_match { "should" } else { "should not" };
    Err(fail(
        path,
        actual,
        expected,
        format!("`{}` {} {} `{}`", path, verb, check.describe(), expected),
    ))
}

fn check_shape(path: &str, actual: &Value, ok: bool, expected: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(fail(
            path,
            &value_to_text(actual),
            expected,
            format!("`{}` should be {}", path, expected),
        ))
    }
}

pub fn is_true(path: &str, actual: &Value) -> Result<()> {
    check_shape(path, actual, actual == &Value::Bool(true), "true")
}

pub fn is_false(path: &str, actual: &Value) -> Result<()> {
    check_shape(path, actual, actual == &Value::Bool(false), "false")
}

pub fn is_null(path: &str, actual: &Value) -> Result<()> {
    check_shape(path, actual, actual.is_null(), "null")
}

pub fn is_an_empty_list(path: &str, actual: &Value) -> Result<()> {
    let ok = matches!(actual, Value::Array(items) if items.is_empty());
    check_shape(path, actual, ok, "an empty list")
}

pub fn is_an_empty_dict(path: &str, actual: &Value) -> Result<()> {
    let ok = matches!(actual, Value::Object(map) if map.is_empty());
    check_shape(path, actual, ok, "an empty dict")
}

pub fn is_not_a_string(path: &str, actual: &Value) -> Result<()> {
    check_shape(path, actual, !actual.is_string(), "anything but a string")
}

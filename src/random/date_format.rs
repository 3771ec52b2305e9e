//! Date format patterns
//!
//! Scenario files name their date formats with arrow-style tokens such as
//! `YYYY-MM-DDTHH:mm:ss`. They are translated once into a chrono strftime
//! string. A pattern that already contains `%` is taken as strftime as-is.
//! Text inside `[...]` is copied literally.

use std::fmt;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, TimeZone};

use crate::errors::{ApiTestError, Result};

/// Pattern pre-registered under the `default` name
pub const DEFAULT_DATE_FORMAT: &str = "YYYY-MM-DDTHH:mm:ss";

// Longest tokens first so `YYYY` wins over `YY`.
const TOKENS: &[(&str, &str)] = &[
    ("SSSSSS", "%6f"),
    ("YYYY", "%Y"),
    ("MMMM", "%B"),
    ("DDDD", "%j"),
    ("dddd", "%A"),
    ("SSS", "%3f"),
    ("MMM", "%b"),
    ("DDD", "%-j"),
    ("ddd", "%a"),
    ("YY", "%y"),
    ("MM", "%m"),
    ("DD", "%d"),
    ("HH", "%H"),
    ("hh", "%I"),
    ("mm", "%M"),
    ("ss", "%S"),
    ("ZZ", "%:z"),
    ("M", "%-m"),
    ("D", "%-d"),
    ("d", "%u"),
    ("H", "%-H"),
    ("h", "%-I"),
    ("m", "%-M"),
    ("s", "%-S"),
    ("A", "%p"),
    ("a", "%P"),
    ("Z", "%z"),
    ("X", "%s"),
];

/// A validated date format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat {
    pattern: String,
    strftime: String,
}

impl DateFormat {
    /// Translate an arrow-style (or strftime) pattern
    pub fn parse(pattern: &str) -> Result<Self> {
        let strftime = if pattern.contains('%') {
            pattern.to_string()
        } else {
            translate(pattern)?
        };

        if StrftimeItems::new(&strftime).any(|item| matches!(item, Item::Error)) {
            return Err(ApiTestError::InvalidArgument(format!(
                "Invalid date format `{}`",
                pattern
            )));
        }

        Ok(Self {
            pattern: pattern.to_string(),
            strftime,
        })
    }

    /// The pattern as written in the scenario
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The equivalent chrono strftime string
    pub fn strftime(&self) -> &str {
        &self.strftime
    }

    /// Render a date-time with this format
    pub fn format<Tz>(&self, value: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        value.format(&self.strftime).to_string()
    }
}

impl Default for DateFormat {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_DATE_FORMAT.to_string(),
            strftime: "%Y-%m-%dT%H:%M:%S".to_string(),
        }
    }
}

fn translate(pattern: &str) -> Result<String> {
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut rest = pattern;

    'outer: while !rest.is_empty() {
        if let Some(stripped) = rest.strip_prefix('[') {
            let end = stripped.find(']').ok_or_else(|| {
                ApiTestError::InvalidArgument(format!("Unclosed `[` in date format `{}`", pattern))
            })?;
            out.push_str(&stripped[..end]);
            rest = &stripped[end + 1..];
            continue;
        }

        for (token, replacement) in TOKENS {
            if let Some(stripped) = rest.strip_prefix(token) {
                out.push_str(replacement);
                rest = stripped;
                continue 'outer;
            }
        }

        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_default_pattern() {
        let format = DateFormat::parse(DEFAULT_DATE_FORMAT).unwrap();
        assert_eq!(format.strftime(), "%Y-%m-%dT%H:%M:%S");
        assert_eq!(format, DateFormat::default());
    }

    #[test]
    fn test_short_tokens() {
        let format = DateFormat::parse("YY-DD-MM").unwrap();
        assert_eq!(format.strftime(), "%y-%d-%m");
    }

    #[test]
    fn test_literal_brackets() {
        let format = DateFormat::parse("YYYY [at] HH").unwrap();
        assert_eq!(format.strftime(), "%Y at %H");
    }

    #[test]
    fn test_strftime_passthrough() {
        let format = DateFormat::parse("%d/%m/%Y").unwrap();
        assert_eq!(format.strftime(), "%d/%m/%Y");
    }

    #[test]
    fn test_invalid_strftime_rejected() {
        assert!(DateFormat::parse("%Q").is_err());
    }

    #[test]
    fn test_format_with_offset() {
        let format = DateFormat::parse("YYYY-MM-DD HH:mm:ss ZZ").unwrap();
        let value = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(format.format(&value), "2024-03-09 07:05:01 +00:00");
    }
}

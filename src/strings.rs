//! String utilities
//!
//! List parsing for step arguments and truncation for diagnostics.

use crate::errors::{ApiTestError, Result};

/// Longest document excerpt embedded in an error message
pub const MAX_DIAGNOSTIC_LEN: usize = 512;

/// Truncate a string to a maximum length, adding "..." if truncated
///
/// Handles UTF-8 character boundaries correctly.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }

    if max_len <= 3 {
        return "...".to_string();
    }

    let mut truncate_at = max_len - 3;
    while truncate_at > 0 && !s.is_char_boundary(truncate_at) {
        truncate_at -= 1;
    }

    format!("{}...", &s[..truncate_at])
}

/// Parse a comma-separated step argument into its items
///
/// Items are trimmed and may be double-quoted to carry commas:
/// `a,"b, c", d` gives `["a", "b, c", "d"]`. An empty string gives an
/// empty list.
pub fn parse_list(value: &str) -> Result<Vec<String>> {
    if value.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(value.as_bytes());

    match reader.records().next() {
        Some(record) => {
            let record = record
                .map_err(|e| ApiTestError::InvalidArgument(format!("Invalid list `{}`: {}", value, e)))?;
            Ok(record.iter().map(String::from).collect())
        }
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hello", 3), "...");
    }

    #[test]
    fn test_truncate_utf8() {
        let truncated = truncate_str("héllo wörld", 8);
        assert!(truncated.ends_with("..."));
        assert!(truncated.is_char_boundary(truncated.len()));
    }

    #[test]
    fn test_parse_list_trims() {
        assert_eq!(parse_list("a, b ,c").unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parse_list_quoted_commas() {
        assert_eq!(parse_list(r#"a,"b, c", d"#).unwrap(), vec!["a", "b, c", "d"]);
    }

    #[test]
    fn test_parse_list_empty() {
        assert!(parse_list("").unwrap().is_empty());
        assert!(parse_list("   ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_list_keeps_empty_items() {
        assert_eq!(parse_list("a,,b").unwrap(), vec!["a", "", "b"]);
    }
}

//! HTTP method names

use crate::errors::{ApiTestError, Result};

/// Method of a fresh request
pub const GET: &str = "GET";

/// Uppercase a method name, rejecting anything that is not an HTTP token
///
/// Extension methods such as `PURGE` are allowed.
pub fn normalize(method: &str) -> Result<String> {
    let method = method.trim();
    let is_token = !method.is_empty()
        && method
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c));

    if !is_token {
        return Err(ApiTestError::InvalidArgument(format!(
            "Invalid HTTP method `{}`",
            method
        )));
    }

    Ok(method.to_ascii_uppercase())
}

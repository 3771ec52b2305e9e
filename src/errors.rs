//! Error types for apitest
//!
//! Every failure a step can hit maps to its own variant so test suites can
//! tell which assertion failed, on what path, and with what values.

use thiserror::Error;

/// Main error type for apitest
#[derive(Error, Debug)]
pub enum ApiTestError {
    /// An indirect `$`, `#` or `@` reference could not be resolved
    #[error("Cannot resolve `{sigil}{name}`: {reason}")]
    Resolution {
        sigil: char,
        name: String,
        reason: String,
    },

    /// Body attached before a format was chosen, or unsupported format operation
    #[error("Format error: {0}")]
    Format(String),

    #[error("No `{path}` path in `{document}`")]
    PathNotFound { path: String, document: String },

    #[error("Path `{path}` points to {count} nodes in `{document}`, expected exactly one")]
    AmbiguousPath {
        path: String,
        count: usize,
        document: String,
    },

    #[error("Invalid path `{path}`: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Assertion failed at `{path}`: {message} (actual `{actual}`, expected `{expected}`)")]
    Assertion {
        path: String,
        actual: String,
        expected: String,
        message: String,
    },

    #[error("Fixture missing: {0}")]
    FixtureMissing(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Step `{template}` expects {expected} argument(s), got {actual}")]
    Arity {
        template: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("XML parse error: {0}")]
    XmlParse(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ApiTestError {
    /// Build an assertion failure carrying actual and expected values
    pub fn assertion(
        path: impl Into<String>,
        actual: impl Into<String>,
        expected: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ApiTestError::Assertion {
            path: path.into(),
            actual: actual.into(),
            expected: expected.into(),
            message: message.into(),
        }
    }

    /// True for failures raised by a comparison rather than by a broken step
    pub fn is_assertion(&self) -> bool {
        matches!(self, ApiTestError::Assertion { .. })
    }
}

pub type Result<T> = std::result::Result<T, ApiTestError>;

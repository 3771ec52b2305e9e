//! Request authentication
//!
//! A closed set of schemes, so a sum type rather than trait objects.

use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use crate::errors::{ApiTestError, Result};

/// HTTP Basic Authentication credentials (RFC 7617)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    username: String,
    password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    fn header_value(&self) -> String {
        let credentials = format!("{}:{}", self.username, self.password);
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials.as_bytes());
        format!("Basic {}", encoded)
    }
}

/// Bearer token (RFC 6750)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerAuth {
    token: String,
}

impl BearerAuth {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }

    fn header_value(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Credentials attached to every request of a scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    Basic(BasicAuth),
    Bearer(BearerAuth),
}

impl Auth {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Auth::Basic(BasicAuth::new(username, password))
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Auth::Bearer(BearerAuth::new(token))
    }

    /// Value of the `Authorization` header
    pub fn header_value(&self) -> String {
        match self {
            Auth::Basic(basic) => basic.header_value(),
            Auth::Bearer(bearer) => bearer.header_value(),
        }
    }

    /// Set the `Authorization` header
    pub fn apply(&self, headers: &mut HeaderMap) -> Result<()> {
        let value = HeaderValue::from_str(&self.header_value())
            .map_err(|e| ApiTestError::InvalidArgument(format!("Invalid credentials: {}", e)))?;
        headers.insert(AUTHORIZATION, value);
        Ok(())
    }
}

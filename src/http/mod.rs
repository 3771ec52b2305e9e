//! HTTP transport seam
//!
//! Steps build a [`PreparedRequest`] and hand it to an [`HttpExecutor`].
//! [`ReqwestExecutor`] talks to real servers; [`EchoExecutor`] answers in
//! process by reflecting the request back.

mod client;
mod echo;
mod method;

pub use client::ReqwestExecutor;
pub use echo::EchoExecutor;
pub use method::*;

use indexmap::IndexMap;
use reqwest::header::HeaderMap;

use crate::auth::Auth;
use crate::errors::Result;
use crate::format::WireBody;

/// Request headers in insertion order; names compare case-insensitively
pub type Headers = IndexMap<String, String>;

/// Set a header, replacing any existing one whatever its case
pub fn set_header(headers: &mut Headers, name: &str, value: &str) {
    remove_header(headers, name);
    headers.insert(name.to_string(), value.to_string());
}

/// Remove a header whatever its case
pub fn remove_header(headers: &mut Headers, name: &str) {
    headers.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
}

pub fn get_header<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Everything the transport needs to send one request
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: String,
    pub url: String,
    pub headers: Headers,
    pub body: WireBody,
    pub auth: Option<Auth>,
}

/// What came back
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub text: String,
}

impl HttpResponse {
    /// Header value as text; the first one when the header repeats
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
    }
}

/// Sends prepared requests
pub trait HttpExecutor: Send + Sync {
    fn send(&self, request: &PreparedRequest) -> Result<HttpResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_helpers_ignore_case() {
        let mut headers = Headers::new();
        set_header(&mut headers, "Content-Type", "text/plain");
        set_header(&mut headers, "content-type", "application/json");
        assert_eq!(headers.len(), 1);
        assert_eq!(get_header(&headers, "CONTENT-TYPE"), Some("application/json"));
        remove_header(&mut headers, "Content-Type");
        assert!(headers.is_empty());
    }
}

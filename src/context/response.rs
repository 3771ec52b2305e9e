//! The last response received

use reqwest::header::HeaderMap;
use tracing::debug;

use crate::errors::Result;
use crate::format::{Body, Format};
use crate::http::HttpResponse;

#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: HeaderMap,
    pub text: String,
    /// Format `body` was read with
    pub format: Format,
    pub body: Body,
}

impl Response {
    /// Read a transport response with the given format
    pub fn read(http: HttpResponse, format: Format) -> Result<Self> {
        let body = format.deserialize(&http.text)?;
        debug!(status = http.status, format = %format, "Parsed response body");
        Ok(Self {
            status: http.status,
            headers: http.headers,
            text: http.text,
            format,
            body,
        })
    }

    /// Header value as text; repeated headers are joined with `, `
    pub fn header(&self, name: &str) -> Option<String> {
        let values: Vec<String> = self
            .headers
            .get_all(name)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values.join(", "))
        }
    }

    pub fn header_names(&self) -> Vec<String> {
        self.headers.keys().map(|name| name.as_str().to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(text: &str) -> HttpResponse {
        HttpResponse {
            status: 201,
            headers: HeaderMap::new(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_read_json() {
        let response = Response::read(http(r#"{"id": 5}"#), Format::Json).unwrap();
        assert_eq!(response.status, 201);
        assert_eq!(response.body.as_json().unwrap()["id"], 5);
    }

    #[test]
    fn test_repeated_headers_are_joined() {
        let mut raw = http("");
        raw.headers.append("x-tag", "a".parse().unwrap());
        raw.headers.append("x-tag", "b".parse().unwrap());
        let response = Response::read(raw, Format::Raw).unwrap();
        assert_eq!(response.header("X-Tag").as_deref(), Some("a, b"));
        assert_eq!(response.header("x-missing"), None);
    }

    #[test]
    fn test_read_invalid_xml() {
        assert!(Response::read(http("not xml"), Format::Xml).is_err());
    }
}

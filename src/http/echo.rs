//! In-process echo transport
//!
//! Replies with a JSON document describing the request it was given, in the
//! shape of httpbin's `/anything`: `data`, `form`, `files`, `headers`,
//! `method` and `url`. Handy for dry runs and for testing scenarios without
//! a server.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::errors::{ApiTestError, Result};
use crate::format::{WireBody, FORM_CONTENT_TYPE, JSON_CONTENT_TYPE};

use super::{get_header, HttpExecutor, HttpResponse, PreparedRequest};

#[derive(Debug, Clone)]
pub struct EchoExecutor {
    status: u16,
    extra_headers: Vec<(String, String)>,
}

impl Default for EchoExecutor {
    fn default() -> Self {
        Self {
            status: 200,
            extra_headers: Vec::new(),
        }
    }
}

impl EchoExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with this status instead of 200
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Add a header to every reply
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    fn describe(request: &PreparedRequest) -> Value {
        let mut headers = Map::new();
        for (name, value) in &request.headers {
            headers.insert(name.clone(), Value::String(value.clone()));
        }
        if let Some(auth) = &request.auth {
            headers.insert("Authorization".to_string(), Value::String(auth.header_value()));
        }

        let is_urlencoded = get_header(&request.headers, "Content-Type")
            .is_some_and(|value| value.starts_with(FORM_CONTENT_TYPE));

        let (data, form, files) = match &request.body {
            WireBody::Empty => (String::new(), Map::new(), Map::new()),
            WireBody::Text(text) if is_urlencoded => {
                let fields: Vec<(String, String)> = url::form_urlencoded::parse(text.as_bytes())
                    .into_owned()
                    .collect();
                (String::new(), form_map(&fields), Map::new())
            }
            WireBody::Text(text) => (text.clone(), Map::new(), Map::new()),
            WireBody::Multipart { fields, files } => {
                let mut uploaded = Map::new();
                for file in files {
                    uploaded.insert(
                        file.field.clone(),
                        Value::String(String::from_utf8_lossy(&file.bytes).into_owned()),
                    );
                }
                (String::new(), form_map(fields), uploaded)
            }
        };

        json!({
            "data": data,
            "form": form,
            "files": files,
            "headers": headers,
            "method": request.method,
            "url": request.url,
        })
    }
}

/// Form fields as JSON; a repeated name becomes a list
fn form_map(fields: &[(String, String)]) -> Map<String, Value> {
    let mut form = Map::new();
    for (name, value) in fields {
        match form.get_mut(name) {
            Some(Value::Array(values)) => values.push(Value::String(value.clone())),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value.clone())]);
            }
            None => {
                form.insert(name.clone(), Value::String(value.clone()));
            }
        }
    }
    form
}

impl HttpExecutor for EchoExecutor {
    fn send(&self, request: &PreparedRequest) -> Result<HttpResponse> {
        debug!(method = %request.method, url = %request.url, "Echoing request");

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        for (name, value) in &self.extra_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ApiTestError::InvalidArgument(format!("Invalid header name `{}`: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ApiTestError::InvalidArgument(format!("Invalid header value `{}`: {}", value, e)))?;
            headers.append(name, value);
        }

        Ok(HttpResponse {
            status: self.status,
            headers,
            text: serde_json::to_string(&Self::describe(request))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Auth;
    use crate::http::Headers;

    fn request(body: WireBody) -> PreparedRequest {
        let mut headers = Headers::new();
        headers.insert("X-Test".to_string(), "1".to_string());
        PreparedRequest {
            method: "POST".to_string(),
            url: "http://echo.local/items?x=1".to_string(),
            headers,
            body,
            auth: Some(Auth::bearer("t")),
        }
    }

    #[test]
    fn test_echoes_text_body() {
        let response = EchoExecutor::new()
            .send(&request(WireBody::Text("{\"a\":1}".to_string())))
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.header("content-type").as_deref(), Some(JSON_CONTENT_TYPE));

        let echoed: Value = serde_json::from_str(&response.text).unwrap();
        assert_eq!(echoed["data"], "{\"a\":1}");
        assert_eq!(echoed["method"], "POST");
        assert_eq!(echoed["url"], "http://echo.local/items?x=1");
        assert_eq!(echoed["headers"]["X-Test"], "1");
        assert_eq!(echoed["headers"]["Authorization"], "Bearer t");
    }

    #[test]
    fn test_echoes_repeated_form_fields() {
        let body = WireBody::Multipart {
            fields: vec![
                ("tag".to_string(), "a".to_string()),
                ("tag".to_string(), "b".to_string()),
                ("one".to_string(), "1".to_string()),
            ],
            files: Vec::new(),
        };
        let response = EchoExecutor::new().send(&request(body)).unwrap();
        let echoed: Value = serde_json::from_str(&response.text).unwrap();
        assert_eq!(echoed["form"], json!({"tag": ["a", "b"], "one": "1"}));
    }

    #[test]
    fn test_decodes_urlencoded_text() {
        let mut prepared = request(WireBody::Text("q=a+b%26c&tag=x&tag=y".to_string()));
        prepared
            .headers
            .insert("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string());
        let response = EchoExecutor::new().send(&prepared).unwrap();
        let echoed: Value = serde_json::from_str(&response.text).unwrap();
        assert_eq!(echoed["form"], json!({"q": "a b&c", "tag": ["x", "y"]}));
        assert_eq!(echoed["data"], "");
    }

    #[test]
    fn test_custom_status_and_headers() {
        let response = EchoExecutor::new()
            .with_status(404)
            .with_header("X-Trace", "abc")
            .send(&request(WireBody::Empty))
            .unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(response.header("x-trace").as_deref(), Some("abc"));
    }
}

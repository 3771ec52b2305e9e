//! Blocking reqwest transport

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use tracing::debug;

use crate::config::HttpConfig;
use crate::errors::{ApiTestError, Result};
use crate::format::{FileAttachment, WireBody};

use super::{HttpExecutor, HttpResponse, PreparedRequest};

/// Sends requests with a blocking reqwest client
///
/// The blocking client runs its own runtime, so it must not be created or
/// used from inside an async task; wrap calls in `spawn_blocking` there.
#[derive(Debug, Clone)]
pub struct ReqwestExecutor {
    client: Client,
}

impl ReqwestExecutor {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

fn build_headers(request: &PreparedRequest) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value) in &request.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ApiTestError::InvalidArgument(format!("Invalid header name `{}`: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ApiTestError::InvalidArgument(format!("Invalid value for header `{}`: {}", name, e)))?;
        headers.append(name, value);
    }
    if let Some(auth) = &request.auth {
        auth.apply(&mut headers)?;
    }
    Ok(headers)
}

fn build_multipart_form(fields: &[(String, String)], files: &[FileAttachment]) -> Result<Form> {
    let mut form = Form::new();

    for (name, value) in fields {
        form = form.text(name.clone(), value.clone());
    }

    for file in files {
        let mime_type = mime_guess::from_path(&file.file_name).first_or_octet_stream();
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(mime_type.essence_str())?;
        form = form.part(file.field.clone(), part);
    }

    Ok(form)
}

impl HttpExecutor for ReqwestExecutor {
    fn send(&self, request: &PreparedRequest) -> Result<HttpResponse> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| ApiTestError::InvalidArgument(format!("Invalid HTTP method `{}`: {}", request.method, e)))?;

        debug!(method = %method, url = %request.url, "Sending request");

        let builder = self
            .client
            .request(method, &request.url)
            .headers(build_headers(request)?);

        let builder = match &request.body {
            WireBody::Empty => builder,
            WireBody::Text(text) => builder.body(text.clone()),
            WireBody::Multipart { fields, files } => builder.multipart(build_multipart_form(fields, files)?),
        };

        let response = builder.send()?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let text = response.text()?;

        debug!(status, bytes = text.len(), "Received response");

        Ok(HttpResponse { status, headers, text })
    }
}

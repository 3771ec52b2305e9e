//! The request under construction

use serde_json::Value;

use crate::auth::Auth;
use crate::errors::{ApiTestError, Result};
use crate::format::{Body, FileAttachment, Format, FormData, WireBody, XmlDocument, CONTENT_TYPE};
use crate::http::{remove_header, set_header, Headers, PreparedRequest, GET};
use crate::path::Namespaces;

pub const DEFAULT_URL_PATH: &str = "/";

/// Request state accumulated by "Given" steps
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub address: String,
    pub url_path: String,
    pub query_string: String,
    pub method: String,
    pub headers: Headers,
    pub namespaces: Namespaces,
    format: Option<Format>,
    response_format: Option<Format>,
    body_source: Option<String>,
    body: Option<Body>,
    form: FormData,
}

impl Request {
    pub fn new(user_agent: &str) -> Self {
        let mut headers = Headers::new();
        set_header(&mut headers, "User-Agent", user_agent);
        Self {
            address: String::new(),
            url_path: DEFAULT_URL_PATH.to_string(),
            query_string: String::new(),
            method: GET.to_string(),
            headers,
            namespaces: Namespaces::new(),
            format: None,
            response_format: None,
            body_source: None,
            body: None,
            form: FormData::new(),
        }
    }

    pub fn format(&self) -> Option<Format> {
        self.format
    }

    pub fn set_format(&mut self, format: Format) {
        self.format = Some(format);
    }

    pub fn response_format(&self) -> Option<Format> {
        self.response_format
    }

    pub fn set_response_format(&mut self, format: Format) {
        self.response_format = Some(format);
    }

    /// Format replies are read with: the response format, else the request
    /// format, else RAW
    pub fn effective_response_format(&self) -> Format {
        self.response_format.or(self.format).unwrap_or(Format::Raw)
    }

    /// Parse `text` as the request body in the current format
    pub fn attach_body(&mut self, text: &str) -> Result<()> {
        let format = self.format.ok_or_else(|| {
            ApiTestError::Format("Format not set, cannot attach a request body".to_string())
        })?;
        self.body = Some(format.parse_body(text)?);
        self.body_source = Some(text.to_string());
        Ok(())
    }

    /// Request text as given, before any edits
    pub fn body_source(&self) -> Option<&str> {
        self.body_source.as_deref()
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// The JSON body, for steps that edit it
    pub fn json_body_mut(&mut self) -> Result<&mut Value> {
        self.body
            .as_mut()
            .and_then(Body::as_json_mut)
            .ok_or_else(|| ApiTestError::Format("The request has no JSON body".to_string()))
    }

    /// The XML body, for steps that edit it
    pub fn xml_body_mut(&mut self) -> Result<&mut XmlDocument> {
        self.body
            .as_mut()
            .and_then(Body::as_xml_mut)
            .ok_or_else(|| ApiTestError::Format("The request has no XML body".to_string()))
    }

    /// Add a form field; the form replaces any parsed body
    pub fn add_param(&mut self, name: &str, value: &str) {
        self.body = None;
        self.form.add_field(name, value);
    }

    /// Add a file upload, dropping any `Content-Type` so the transport can
    /// set the multipart one
    pub fn add_file(&mut self, file: FileAttachment) {
        self.body = None;
        remove_header(&mut self.headers, CONTENT_TYPE);
        self.form.add_file(file);
    }

    pub fn form(&self) -> &FormData {
        &self.form
    }

    pub fn clear_form(&mut self) {
        self.form = FormData::new();
    }

    /// Address, path and query string joined as written
    pub fn url(&self) -> String {
        format!("{}{}{}", self.address, self.url_path, self.query_string)
    }

    /// Serialize the body and collect everything the transport needs
    pub fn prepare(&mut self, auth: Option<&Auth>) -> Result<PreparedRequest> {
        let body = match self.format {
            Some(format) => format.serialize(self.body.as_ref(), &self.form, &mut self.headers)?,
            None => WireBody::Empty,
        };

        Ok(PreparedRequest {
            method: self.method.clone(),
            url: self.url(),
            headers: self.headers.clone(),
            body,
            auth: auth.cloned(),
        })
    }
}

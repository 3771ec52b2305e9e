//! Wire formats
//!
//! A request is built in one of four formats. The format decides how request
//! text is parsed into a body, how that body goes on the wire, and how the
//! response text is read back. Each decision lives here, in one match per
//! operation, instead of in the step handlers.

pub mod form;
pub mod xml;

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::errors::{ApiTestError, Result};
use crate::http::{remove_header, set_header, Headers};

pub use form::{FieldValue, FileAttachment, FormData};
pub use xml::XmlDocument;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Request and response formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Xml,
    Json,
    Raw,
    Form,
}

impl Format {
    pub const ALL: [Format; 4] = [Format::Xml, Format::Json, Format::Raw, Format::Form];

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Xml => "XML",
            Format::Json => "JSON",
            Format::Raw => "RAW",
            Format::Form => "FORM",
        }
    }

    /// Directory holding this format's fixtures
    pub fn dir_name(&self) -> &'static str {
        match self {
            Format::Xml => "xml",
            Format::Json => "json",
            Format::Raw => "raw",
            Format::Form => "form",
        }
    }

    /// Parse request text into a body
    pub fn parse_body(&self, text: &str) -> Result<Body> {
        match self {
            Format::Xml => {
                if text.trim().is_empty() {
                    return Err(ApiTestError::FixtureMissing("XML request is empty".to_string()));
                }
                Ok(Body::Xml(XmlDocument::parse(text)?))
            }
            Format::Json => Ok(Body::Json(serde_json::from_str(text)?)),
            Format::Raw => Ok(Body::Raw(text.to_string())),
            Format::Form => Err(ApiTestError::Format(
                "FORM requests are built from request param and request file steps".to_string(),
            )),
        }
    }

    /// Turn the request body (or form) into what goes on the wire, adjusting
    /// `Content-Type` as the format requires
    pub fn serialize(&self, body: Option<&Body>, form: &FormData, headers: &mut Headers) -> Result<WireBody> {
        if *self == Format::Form {
            if form.is_empty() {
                return Ok(WireBody::Empty);
            }
            if form.has_files() {
                // The transport writes the multipart boundary itself.
                remove_header(headers, CONTENT_TYPE);
                return Ok(WireBody::Multipart {
                    fields: form.pairs(),
                    files: form.files().to_vec(),
                });
            }
            set_header(headers, CONTENT_TYPE, FORM_CONTENT_TYPE);
            return Ok(WireBody::Text(form.to_urlencoded()));
        }

        let Some(body) = body else {
            return Ok(WireBody::Empty);
        };

        match (self, body) {
            (Format::Xml, Body::Xml(doc)) => Ok(WireBody::Text(doc.to_xml_string())),
            (Format::Json, Body::Json(value)) => {
                set_header(headers, CONTENT_TYPE, JSON_CONTENT_TYPE);
                Ok(WireBody::Text(serde_json::to_string_pretty(value)?))
            }
            (Format::Raw, Body::Raw(text)) => Ok(WireBody::Text(text.clone())),
            (format, body) => Err(ApiTestError::Format(format!(
                "Cannot send a {} body as {}",
                body.kind(),
                format
            ))),
        }
    }

    /// Read response text
    pub fn deserialize(&self, text: &str) -> Result<Body> {
        match self {
            Format::Xml => Ok(Body::Xml(XmlDocument::parse(text)?)),
            Format::Json => Ok(Body::Json(serde_json::from_str(text)?)),
            Format::Raw | Format::Form => Ok(Body::Raw(text.to_string())),
        }
    }
}

impl FromStr for Format {
    type Err = ApiTestError;

    fn from_str(s: &str) -> Result<Self> {
        Format::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                ApiTestError::InvalidArgument(format!(
                    "Unknown format `{}`, expected one of XML, JSON, RAW, FORM",
                    s
                ))
            })
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed request or response body
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Xml(XmlDocument),
    Json(Value),
    Raw(String),
}

impl Body {
    pub fn kind(&self) -> &'static str {
        match self {
            Body::Xml(_) => "XML",
            Body::Json(_) => "JSON",
            Body::Raw(_) => "RAW",
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Body::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_json_mut(&mut self) -> Option<&mut Value> {
        match self {
            Body::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_xml(&self) -> Option<&XmlDocument> {
        match self {
            Body::Xml(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_xml_mut(&mut self) -> Option<&mut XmlDocument> {
        match self {
            Body::Xml(doc) => Some(doc),
            _ => None,
        }
    }
}

/// What the transport sends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireBody {
    Empty,
    Text(String),
    Multipart {
        fields: Vec<(String, String)>,
        files: Vec<FileAttachment>,
    },
}

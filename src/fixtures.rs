//! Fixture files under the environment directory
//!
//! Request and response bodies live in
//! `<environment_dir>/<format>/<request|response>/<name>`, e.g.
//! `json/response/user.json`. Files uploaded by `request file` steps are read
//! from `<environment_dir>/form/request/<name>`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{ApiTestError, Result};
use crate::format::{FileAttachment, Format};

/// Which side of the exchange a fixture belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureKind {
    Request,
    Response,
}

impl FixtureKind {
    pub fn dir_name(&self) -> &'static str {
        match self {
            FixtureKind::Request => "request",
            FixtureKind::Response => "response",
        }
    }
}

pub fn fixture_path(environment_dir: &Path, format: Format, kind: FixtureKind, name: &str) -> PathBuf {
    environment_dir
        .join(format.dir_name())
        .join(kind.dir_name())
        .join(name)
}

/// Read a body fixture. An empty name reads as an empty body.
pub fn read_fixture(environment_dir: &Path, format: Format, kind: FixtureKind, name: &str) -> Result<String> {
    if name.is_empty() {
        return Ok(String::new());
    }

    let path = fixture_path(environment_dir, format, kind, name);
    if !path.is_file() {
        return Err(ApiTestError::FixtureMissing(path.display().to_string()));
    }

    debug!(path = %path.display(), "Reading fixture");
    Ok(fs::read_to_string(&path)?)
}

/// Read a file to upload under the form field `field`
pub fn read_upload(environment_dir: &Path, field: &str, name: &str) -> Result<FileAttachment> {
    let path = fixture_path(environment_dir, Format::Form, FixtureKind::Request, name);
    if !path.is_file() {
        return Err(ApiTestError::FixtureMissing(format!(
            "File upload not found: {}",
            path.display()
        )));
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());

    debug!(path = %path.display(), field, "Reading upload");
    Ok(FileAttachment {
        field: field.to_string(),
        file_name,
        bytes: fs::read(&path)?,
    })
}

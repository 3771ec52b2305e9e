//! Per-scenario state
//!
//! A [`TestContext`] is created when a scenario starts and mutated by every
//! step. Contexts are never shared between scenarios.

mod request;
mod response;

pub use request::{Request, DEFAULT_URL_PATH};
pub use response::Response;

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::auth::Auth;
use crate::config::Config;
use crate::errors::{ApiTestError, Result};
use crate::format::Format;
use crate::random::DateFormat;
use crate::resolve::ValueResolver;

/// Name the default date format is registered under
pub const DEFAULT_DATE_FORMAT_NAME: &str = "default";

/// `User-Agent` sent unless a step or the config says otherwise
pub fn default_user_agent() -> String {
    format!("apitest/{}", env!("CARGO_PKG_VERSION"))
}

fn default_date_formats() -> IndexMap<String, DateFormat> {
    let mut formats = IndexMap::new();
    formats.insert(DEFAULT_DATE_FORMAT_NAME.to_string(), DateFormat::default());
    formats
}

#[derive(Debug, Clone)]
pub struct TestContext {
    pub request: Request,
    pub response: Option<Response>,
    /// Values written by store steps, read back with `#name`
    pub user_store: IndexMap<String, Value>,
    pub date_formats: IndexMap<String, DateFormat>,
    pub auth: Option<Auth>,
    environment_dir: PathBuf,
    config: Config,
}

impl TestContext {
    pub fn new(environment_dir: impl Into<PathBuf>, config: Config) -> Self {
        let request = Request::new(&Self::user_agent(&config));
        Self {
            request,
            response: None,
            user_store: IndexMap::new(),
            date_formats: default_date_formats(),
            auth: None,
            environment_dir: environment_dir.into(),
            config,
        }
    }

    /// Create a context for `environment_dir`, reading its `config.toml`
    pub fn load(environment_dir: impl Into<PathBuf>) -> Result<Self> {
        let environment_dir = environment_dir.into();
        let config = Config::load(&environment_dir)?;
        Ok(Self::new(environment_dir, config))
    }

    fn user_agent(config: &Config) -> String {
        config.http.user_agent.clone().unwrap_or_else(default_user_agent)
    }

    pub fn environment_dir(&self) -> &Path {
        &self.environment_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn resolver(&self) -> ValueResolver<'_> {
        ValueResolver::new(&self.user_store, &self.config)
    }

    /// Reset everything a scenario builds up; the environment directory and
    /// config stay
    pub fn cleanup(&mut self) {
        debug!(stored = self.user_store.len(), "Cleaning up context");
        self.request = Request::new(&Self::user_agent(&self.config));
        self.response = None;
        self.user_store.clear();
        self.date_formats = default_date_formats();
        self.auth = None;
    }

    /// A registered date format by name
    pub fn date_format(&self, name: &str) -> Result<&DateFormat> {
        self.date_formats.get(name).ok_or_else(|| {
            ApiTestError::InvalidArgument(format!("No date format named `{}`", name))
        })
    }

    pub fn response(&self) -> Result<&Response> {
        self.response
            .as_ref()
            .ok_or_else(|| ApiTestError::Format("No response yet, the URL has not been invoked".to_string()))
    }

    /// The response body as JSON, failing unless replies are read as JSON
    pub fn json_response(&self) -> Result<&Value> {
        let response = self.response()?;
        if self.request.effective_response_format() != Format::Json {
            return Err(ApiTestError::Format("This step works with JSON replies only".to_string()));
        }
        response
            .body
            .as_json()
            .ok_or_else(|| ApiTestError::Format("This step works with JSON replies only".to_string()))
    }
}

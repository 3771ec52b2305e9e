//! Config file handling
//!
//! Each test environment directory may carry a `config.toml`:
//!
//! ```toml
//! [user]
//! api_key = "secret"
//! retries = 3
//!
//! [http]
//! timeout = "30s"
//! user_agent = "my-suite/1.0"
//! ```
//!
//! Entries under `[user]` are what `@name` arguments resolve to.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::errors::{ApiTestError, Result};

/// Name of the config file looked up in the environment directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Transport settings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpConfig {
    /// Per-request timeout handed to the transport
    pub timeout: Option<Duration>,
    /// Overrides the default `User-Agent` header
    pub user_agent: Option<String>,
}

/// Environment configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub user: HashMap<String, String>,
    pub http: HttpConfig,
}

impl Config {
    /// Load `config.toml` from an environment directory, defaults if absent
    pub fn load(environment_dir: &Path) -> Result<Self> {
        let config_file = environment_dir.join(CONFIG_FILE_NAME);

        if !config_file.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_file)
            .map_err(|e| ApiTestError::Config(format!("Failed to read {}: {}", config_file.display(), e)))?;

        Self::parse(&content)
    }

    /// Parse config TOML content
    pub fn parse(content: &str) -> Result<Self> {
        let toml_value: toml::Value = toml::from_str(content)
            .map_err(|e| ApiTestError::Config(format!("Invalid config TOML: {}", e)))?;

        let user = toml_value
            .get("user")
            .and_then(|u| u.as_table())
            .map(|table| {
                table
                    .iter()
                    .filter_map(|(k, v)| scalar_to_string(v).map(|s| (k.clone(), s)))
                    .collect()
            })
            .unwrap_or_default();

        let http = match toml_value.get("http") {
            Some(section) => Self::parse_http(section)?,
            None => HttpConfig::default(),
        };

        Ok(Self { user, http })
    }

    fn parse_http(section: &toml::Value) -> Result<HttpConfig> {
        let timeout = match section.get("timeout") {
            Some(toml::Value::String(s)) => Some(
                humantime::parse_duration(s)
                    .map_err(|e| ApiTestError::Config(format!("Invalid http.timeout '{}': {}", s, e)))?,
            ),
            Some(toml::Value::Integer(secs)) if *secs >= 0 => Some(Duration::from_secs(*secs as u64)),
            Some(toml::Value::Float(secs)) => Some(
                Duration::try_from_secs_f64(*secs)
                    .map_err(|e| ApiTestError::Config(format!("Invalid http.timeout {}: {}", secs, e)))?,
            ),
            Some(other) => {
                return Err(ApiTestError::Config(format!("Invalid http.timeout: {}", other)));
            }
            None => None,
        };

        let user_agent = section
            .get("user_agent")
            .and_then(|v| v.as_str())
            .map(String::from);

        Ok(HttpConfig { timeout, user_agent })
    }

    /// Build a config holding only user entries
    pub fn with_user<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            user: entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            http: HttpConfig::default(),
        }
    }

    /// Look up a `[user]` entry
    pub fn user_value(&self, name: &str) -> Option<&str> {
        self.user.get(name).map(String::as_str)
    }
}

fn scalar_to_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        toml::Value::Datetime(d) => Some(d.to_string()),
        _ => None,
    }
}

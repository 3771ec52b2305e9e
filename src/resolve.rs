//! Indirect value resolution
//!
//! Step arguments may point somewhere else instead of carrying a literal:
//! - `$NAME` / `${NAME}` reads a process environment variable
//! - `#NAME` / `#{NAME}` reads a value stored by an earlier step
//! - `@NAME` / `@{NAME}` reads an entry of the `[user]` config table
//!
//! A sigil at position 0 replaces the whole argument. Braced forms are
//! substituted wherever they occur, keeping the surrounding text.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::config::Config;
use crate::errors::{ApiTestError, Result};

/// Inline references: `${NAME}`, `#{NAME}`, `@{NAME}`
static INLINE_REF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([$#@])\{(\w*)\}").expect("Invalid inline reference regex")
});

/// Where a sigil points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Environment,
    Store,
    Config,
}

impl Source {
    pub fn from_sigil(sigil: char) -> Option<Self> {
        match sigil {
            '$' => Some(Source::Environment),
            '#' => Some(Source::Store),
            '@' => Some(Source::Config),
            _ => None,
        }
    }

    pub fn sigil(&self) -> char {
        match self {
            Source::Environment => '$',
            Source::Store => '#',
            Source::Config => '@',
        }
    }
}

/// Resolves step arguments against the environment, the store and config
pub struct ValueResolver<'a> {
    store: &'a IndexMap<String, Value>,
    config: &'a Config,
}

impl<'a> ValueResolver<'a> {
    pub fn new(store: &'a IndexMap<String, Value>, config: &'a Config) -> Self {
        Self { store, config }
    }

    /// Resolve one argument
    pub fn resolve(&self, arg: &str) -> Result<String> {
        let mut chars = arg.chars();
        if let Some(source) = chars.next().and_then(Source::from_sigil) {
            let name = chars.as_str();
            if !name.starts_with('{') {
                return self.lookup(source, name);
            }
        }

        self.interpolate(arg)
    }

    /// Resolve every argument, in order
    pub fn resolve_all(&self, args: &[String]) -> Result<Vec<String>> {
        args.iter().map(|arg| self.resolve(arg)).collect()
    }

    fn interpolate(&self, arg: &str) -> Result<String> {
        if !INLINE_REF_RE.is_match(arg) {
            return Ok(arg.to_string());
        }

        let mut failure = None;
        let resolved = INLINE_REF_RE.replace_all(arg, |caps: &Captures| {
            let source = caps[1].chars().next().and_then(Source::from_sigil);
            let looked_up = match source {
                Some(source) => self.lookup(source, &caps[2]),
                None => Ok(caps[0].to_string()),
            };
            match looked_up {
                Ok(value) => value,
                Err(e) => {
                    failure.get_or_insert(e);
                    String::new()
                }
            }
        });

        match failure {
            Some(e) => Err(e),
            None => Ok(resolved.into_owned()),
        }
    }

    fn lookup(&self, source: Source, name: &str) -> Result<String> {
        let fail = |reason: &str| ApiTestError::Resolution {
            sigil: source.sigil(),
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if name.is_empty() {
            return Err(fail("empty name"));
        }

        match source {
            Source::Environment => {
                std::env::var(name).map_err(|_| fail("environment variable not set"))
            }
            Source::Store => self
                .store
                .get(name)
                .map(value_to_text)
                .ok_or_else(|| fail("nothing stored under this name")),
            Source::Config => self
                .config
                .user_value(name)
                .map(String::from)
                .ok_or_else(|| fail("no such entry in the [user] config table")),
        }
    }
}

/// Text form of a stored value: strings as-is, anything else as JSON
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

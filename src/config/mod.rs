//! Environment configuration

mod config;

pub use config::{Config, HttpConfig, CONFIG_FILE_NAME};

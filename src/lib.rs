//! apitest library interface
//!
//! A declarative API-testing interpreter. Scenarios are written as
//! Given/When/Then sentences; a front end matches each sentence to a
//! [`steps::StepKind`] and hands the extracted arguments to
//! [`steps::StepRunner`], which builds the request, sends it and checks the
//! response.
//!
//! # Module Organization
//!
//! - [`steps`] - Step vocabulary and dispatch (StepKind, Step, StepRunner)
//! - [`context`] - Per-scenario state (TestContext, Request, Response)
//! - [`resolve`] - `$ENV`, `#stored` and `@config` references
//! - [`format`] - XML, JSON, RAW and FORM bodies
//! - [`path`] - XPath and JSON Pointer lookups and comparisons
//! - [`random`] - Random strings, numbers and dates
//! - [`http`] - Transport seam (HttpExecutor, ReqwestExecutor, EchoExecutor)
//! - [`errors`] - Error types (ApiTestError, Result)

pub mod auth;
pub mod config;
pub mod context;
pub mod errors;
pub mod fixtures;
pub mod format;
pub mod http;
pub mod logging;
pub mod path;
pub mod random;
pub mod resolve;
pub mod steps;
pub mod strings;

pub use context::TestContext;
pub use errors::{ApiTestError, Result};
pub use steps::{Step, StepKind, StepRunner};

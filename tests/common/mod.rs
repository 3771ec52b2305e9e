//! Common test utilities for apitest integration tests
//!
//! - Running scenario sentences against a live wiremock server
//! - Test environment directories with fixtures and config

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use apitest::config::{Config, HttpConfig};
use apitest::http::ReqwestExecutor;
use apitest::{ApiTestError, Result, Step, StepRunner, TestContext};
use tempfile::TempDir;

/// Parse scenario sentences, panicking on anything that is not a known step
pub fn steps(sentences: &[&str]) -> Vec<Step> {
    sentences
        .iter()
        .map(|sentence| {
            Step::from_sentence(sentence).unwrap_or_else(|| panic!("Not a step: {}", sentence))
        })
        .collect()
}

/// Run sentences over the real transport, off the async runtime
///
/// The blocking reqwest client must not run on a runtime thread, so the
/// whole scenario moves to `spawn_blocking` and the context comes back for
/// further assertions.
pub async fn run_scenario(ctx: TestContext, sentences: &[&str]) -> (TestContext, Result<()>) {
    let steps = steps(sentences);
    tokio::task::spawn_blocking(move || {
        let mut ctx = ctx;
        let result = ReqwestExecutor::new(&HttpConfig::default())
            .and_then(|executor| StepRunner::new(executor).run_all(&mut ctx, &steps));
        (ctx, result)
    })
    .await
    .expect("Scenario thread panicked")
}

/// A context with no environment directory behind it
pub fn bare_context() -> TestContext {
    TestContext::new("/nonexistent", Config::default())
}

/// Assert a step failed with an assertion error naming `actual`
pub fn assert_assertion(result: Result<()>, expected_actual: &str) {
    match result {
        Err(ApiTestError::Assertion { actual, .. }) => assert_eq!(actual, expected_actual),
        Err(other) => panic!("Expected an assertion failure, got: {}", other),
        Ok(()) => panic!("Expected an assertion failure, the scenario passed"),
    }
}

/// Test environment directory with fixture helpers
pub struct TestEnv {
    pub dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file relative to the environment root
    pub fn write(&self, relative: &str, content: &str) -> &Self {
        let file = self.dir.path().join(relative);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).expect("Failed to create fixture dir");
        }
        fs::write(&file, content).expect("Failed to write fixture");
        self
    }

    pub fn context(&self) -> TestContext {
        TestContext::load(self.dir.path()).expect("Failed to load test context")
    }
}

//! Whole scenarios against environment directories, answered in process
mod common;

use pretty_assertions::assert_eq;
use serde_json::json;

use apitest::http::EchoExecutor;
use apitest::{ApiTestError, StepRunner};
use common::{steps, TestEnv};

const CONFIG: &str = r#"
[user]
base_url = "http://echo.local"
api_key = "k-42"
retries = 3

[http]
user_agent = "scenario-suite/1.0"
"#;

fn environment() -> TestEnv {
    let env = TestEnv::new();
    env.write("config.toml", CONFIG)
        .write("json/request/new_user.json", r#"{"user": {"name": "", "tags": []}}"#)
        .write("xml/request/ping.xml", r#"<ping><id>0</id></ping>"#)
        .write("form/request/avatar.txt", "not really a picture");
    env
}

// ============================================================================
// Config and resolution
// ============================================================================

#[test]
fn test_config_references_and_user_agent() {
    let env = environment();
    let mut ctx = env.context();
    let runner = StepRunner::new(EchoExecutor::new());

    runner
        .run_all(
            &mut ctx,
            &steps(&[
                r#"address "@base_url""#,
                r#"URL path "/keys/@{api_key}""#,
                r#"header "X-Retries" "@retries""#,
                r#"header "X-Package" "$CARGO_PKG_NAME""#,
                r#"format "JSON""#,
                "the URL is invoked",
                r#"JSON Pointer "/url" is "http://echo.local/keys/k-42""#,
                r#"JSON Pointer "/headers/X-Retries" is "3""#,
                r#"JSON Pointer "/headers/X-Package" is "apitest""#,
                r#"JSON Pointer "/headers/User-Agent" is "scenario-suite/1.0""#,
            ]),
        )
        .unwrap();
}

#[test]
fn test_unknown_reference_fails_before_running() {
    let env = environment();
    let mut ctx = env.context();
    let runner = StepRunner::new(EchoExecutor::new());

    let err = runner
        .run_all(&mut ctx, &steps(&[r#"address "@nope""#]))
        .unwrap_err();
    assert!(matches!(err, ApiTestError::Resolution { sigil: '@', .. }));

    let err = runner
        .run_all(&mut ctx, &steps(&[r##"address "#{never_stored}""##]))
        .unwrap_err();
    assert!(matches!(err, ApiTestError::Resolution { sigil: '#', .. }));
    assert_eq!(ctx.request.address, "");
}

// ============================================================================
// Fixtures
// ============================================================================

#[test]
fn test_json_fixture_round_trip() {
    let env = environment();
    let mut ctx = env.context();
    let runner = StepRunner::new(EchoExecutor::new());

    runner
        .run_all(
            &mut ctx,
            &steps(&[
                r#"address "@base_url""#,
                r#"HTTP method "POST""#,
                r#"format "JSON""#,
                r#"request "new_user.json""#,
                r#"JSON Pointer "/user/name" in request is "Ann""#,
                r#"JSON Pointer "/user/tags" in request is a list "x, y""#,
                r#"I store a random integer under "seq""#,
                r##"JSON Pointer "/user/seq" in request is an integer "#seq""##,
                "the URL is invoked",
                r#"status is "200""#,
                r#"JSON Pointer "/method" is "POST""#,
                r#"JSON Pointer "/data" contains "Ann""#,
            ]),
        )
        .unwrap();

    let echoed: serde_json::Value = serde_json::from_str(
        ctx.json_response().unwrap()["data"].as_str().unwrap(),
    )
    .unwrap();
    assert_eq!(echoed["user"]["name"], json!("Ann"));
    assert_eq!(echoed["user"]["tags"], json!(["x", "y"]));
    assert_eq!(echoed["user"]["seq"], ctx.user_store["seq"]);

    let expected = serde_json::to_string(ctx.json_response().unwrap()).unwrap();
    env.write("json/response/echo.json", &expected);
    runner
        .run_all(&mut ctx, &steps(&[r#"response is equal to that from "echo.json""#]))
        .unwrap();
}

#[test]
fn test_missing_fixture() {
    let env = environment();
    let mut ctx = env.context();
    let runner = StepRunner::new(EchoExecutor::new());

    let err = runner
        .run_all(&mut ctx, &steps(&[r#"format "XML""#, r#"request "absent.xml""#]))
        .unwrap_err();
    assert!(matches!(err, ApiTestError::FixtureMissing(_)));

    runner
        .run_all(&mut ctx, &steps(&[r#"request "ping.xml""#, r#"XPath "/ping/id" in request is "7""#]))
        .unwrap();
}

#[test]
fn test_form_with_upload_fixture() {
    let env = environment();
    let mut ctx = env.context();
    let runner = StepRunner::new(EchoExecutor::new());

    runner
        .run_all(
            &mut ctx,
            &steps(&[
                r#"address "@base_url""#,
                r#"format "FORM""#,
                r#"response format "JSON""#,
                r#"request param "owner" is "ann""#,
                r#"request file "avatar" is "avatar.txt""#,
                "the URL is invoked",
                r#"JSON Pointer "/form/owner" is "ann""#,
                r#"JSON Pointer "/files/avatar" is "not really a picture""#,
                "form is cleaned up",
                r#"request param "owner" is "bob""#,
                "the URL is invoked",
                r#"JSON Pointer "/form/owner" is "bob""#,
                r#"JSON Pointer "/files" is an empty dict"#,
            ]),
        )
        .unwrap();
}

// ============================================================================
// Store and variables
// ============================================================================

#[test]
fn test_store_and_variable_checks() {
    let env = environment();
    let mut ctx = env.context();
    let runner = StepRunner::new(EchoExecutor::new());

    runner
        .run_all(
            &mut ctx,
            &steps(&[
                r#"I store "a, b" under "letters""#,
                r#"I store "12" under "count""#,
                r#"I store "True" under "flag""#,
                r#"I encode "user:pass" using Base64 under "creds""#,
                r#"date format "day" "YYYY-MM-DD""#,
                r#"I store a random date under "when", format "day""#,
                r##"variable "#letters" is a list "a, b""##,
                r##"variable "#count" is an integer "12""##,
                r##"variable "#flag" is True"##,
                r##"variable "#creds" is a string "dXNlcjpwYXNz""##,
            ]),
        )
        .unwrap();

    let when = ctx.user_store["when"].as_str().unwrap().to_string();
    assert_eq!(when.len(), "2024-01-01".len());

    let err = runner
        .run_all(&mut ctx, &steps(&[r##"variable "#count" is an integer "13""##]))
        .unwrap_err();
    assert!(matches!(err, ApiTestError::Assertion { .. }));
}

#[test]
fn test_context_cleanup_between_scenarios() {
    let env = environment();
    let mut ctx = env.context();
    let runner = StepRunner::new(EchoExecutor::new());

    runner
        .run_all(
            &mut ctx,
            &steps(&[
                r#"address "@base_url""#,
                r#"I store "1" under "kept""#,
                r#"Basic Auth "u" "p""#,
                "the URL is invoked",
                "context is cleaned up",
            ]),
        )
        .unwrap();

    assert!(ctx.response.is_none());
    assert!(ctx.user_store.is_empty());
    assert!(ctx.auth.is_none());
    assert_eq!(ctx.request.address, "");
    assert_eq!(ctx.config().user_value("api_key"), Some("k-42"));

    let err = runner
        .run_all(&mut ctx, &steps(&[r#"status is "200""#]))
        .unwrap_err();
    assert!(matches!(err, ApiTestError::Format(_)));
}

#[test]
fn test_sleep_accepts_seconds_and_durations() {
    let env = environment();
    let mut ctx = env.context();
    let runner = StepRunner::new(EchoExecutor::new());

    runner
        .run_all(&mut ctx, &steps(&[r#"I sleep for "0.01""#, r#"I sleep for "5ms""#]))
        .unwrap();

    let err = runner
        .run_all(&mut ctx, &steps(&[r#"I sleep for "soon""#]))
        .unwrap_err();
    assert!(matches!(err, ApiTestError::InvalidArgument(_)));
}

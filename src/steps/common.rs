//! Steps shared by every format: request setup, invocation, status and
//! header checks, the store and variables

use std::str::FromStr;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::Value;
use tracing::{debug, info};

use crate::auth::Auth;
use crate::context::{Response, TestContext};
use crate::errors::{ApiTestError, Result};
use crate::fixtures::{self, FixtureKind};
use crate::format::{Body, Format};
use crate::http::{self, set_header, HttpExecutor};
use crate::path::{compare, pointer, xpath, Coercion, TextCheck};
use crate::random::{self, DateFormat, DEFAULT_INT_MAX, DEFAULT_INT_MIN};
use crate::strings::{truncate_str, MAX_DIAGNOSTIC_LEN};

use super::{unsupported, StepKind};

const USER_AGENT: &str = "User-Agent";
const VARIABLE: &str = "variable";

pub(super) fn run(ctx: &mut TestContext, executor: &dyn HttpExecutor, kind: StepKind, args: &[String]) -> Result<()> {
    match kind {
        StepKind::Address => ctx.request.address = args[0].clone(),
        StepKind::UrlPath => ctx.request.url_path = args[0].clone(),
        StepKind::HttpMethod => ctx.request.method = http::normalize(&args[0])?,
        StepKind::Format | StepKind::RequestFormat => ctx.request.set_format(Format::from_str(&args[0])?),
        StepKind::ResponseFormat => ctx.request.set_response_format(Format::from_str(&args[0])?),
        StepKind::UserAgent => set_header(&mut ctx.request.headers, USER_AGENT, &args[0]),
        StepKind::Header => set_header(&mut ctx.request.headers, &args[0], &args[1]),
        StepKind::Request => request_from_fixture(ctx, &args[0])?,
        StepKind::RequestIs => ctx.request.attach_body(&args[0])?,
        StepKind::RequestFile => {
            let file = fixtures::read_upload(ctx.environment_dir(), &args[0], &args[1])?;
            ctx.request.add_file(file);
        }
        StepKind::RequestParam => ctx.request.add_param(&args[0], &args[1]),
        StepKind::QueryString => ctx.request.query_string = args[0].clone(),
        StepKind::DateFormat => {
            let format = DateFormat::parse(&args[1])?;
            ctx.date_formats.insert(args[0].clone(), format);
        }
        StepKind::BasicAuth => ctx.auth = Some(Auth::basic(&args[0], &args[1])),
        StepKind::BearerToken => ctx.auth = Some(Auth::bearer(&args[0])),

        StepKind::StoreValue => store(ctx, &args[1], Value::String(args[0].clone())),
        StepKind::StoreRandomString => store(ctx, &args[0], Value::String(random::rand_string())),
        StepKind::StoreRandomInteger => {
            let value = random::rand_int(DEFAULT_INT_MIN, DEFAULT_INT_MAX)?;
            store(ctx, &args[0], Value::from(value));
        }
        StepKind::StoreRandomFloat => {
            let value = random::rand_float(DEFAULT_INT_MIN, DEFAULT_INT_MAX)?;
            store(ctx, &args[0], Value::from(value));
        }
        StepKind::StoreRandomDate => {
            let value = random::rand_date(ctx.date_format(&args[1])?, None, None)?;
            store(ctx, &args[0], Value::String(value));
        }
        StepKind::EncodeBase64 => store(ctx, &args[1], Value::String(STANDARD.encode(args[0].as_bytes()))),

        StepKind::UrlIsInvoked => invoke(ctx, executor)?,
        StepKind::ContextIsCleanedUp => ctx.cleanup(),
        StepKind::FormIsCleanedUp => ctx.request.clear_form(),

        StepKind::StatusIs => status_is(ctx.response()?, &args[0])?,
        StepKind::HeaderIs => {
            let value = response_header(ctx, &args[0])?;
            compare::equals(&args[0], &value, &args[1], Coercion::None)?
        }
        StepKind::HeaderIsNot => {
            let value = response_header(ctx, &args[0])?;
            if value == args[1] {
                return Err(ApiTestError::assertion(
                    &args[0],
                    value,
                    &args[1],
                    format!("Expected for header `{}` not to be equal to `{}`", args[0], args[1]),
                ));
            }
        }
        StepKind::HeaderContains => header_text(ctx, args, TextCheck::Contains, true)?,
        StepKind::HeaderDoesNotContain => header_text(ctx, args, TextCheck::Contains, false)?,
        StepKind::HeaderStartsWith => header_text(ctx, args, TextCheck::StartsWith, true)?,
        StepKind::HeaderDoesNotStartWith => header_text(ctx, args, TextCheck::StartsWith, false)?,
        StepKind::HeaderEndsWith => header_text(ctx, args, TextCheck::EndsWith, true)?,
        StepKind::HeaderDoesNotEndWith => header_text(ctx, args, TextCheck::EndsWith, false)?,
        StepKind::HeaderExists => {
            response_header(ctx, &args[0])?;
        }
        StepKind::HeaderDoesNotExist => {
            let response = ctx.response()?;
            if let Some(value) = response.header(&args[0]) {
                return Err(ApiTestError::assertion(
                    &args[0],
                    value,
                    "<absent>",
                    format!("Header `{}` shouldn't be among {:?}", args[0], response.header_names()),
                ));
            }
        }
        StepKind::HeaderIsEmpty => compare::is_empty(&args[0], &response_header(ctx, &args[0])?)?,
        StepKind::HeaderIsNotEmpty => compare::is_not_empty(&args[0], &response_header(ctx, &args[0])?)?,

        StepKind::StoreFromResponse => store_from_response(ctx, &args[0], &args[1], None)?,
        StepKind::StoreFromResponseWithDefault => store_from_response(ctx, &args[0], &args[1], Some(&args[2]))?,
        StepKind::ResponseIsEqualTo => {
            let expected = parse_expected_json(&args[0])?;
            response_is_equal_to(ctx, &expected)?
        }
        StepKind::ResponseIsEqualToThatFrom => {
            // Fails on non-JSON replies before touching the fixture
            ctx.json_response()?;
            let text = fixtures::read_fixture(ctx.environment_dir(), Format::Json, FixtureKind::Response, &args[0])?;
            let expected = parse_expected_json(&text)?;
            response_is_equal_to(ctx, &expected)?
        }
        StepKind::SleepFor => sleep_for(&args[0])?,

        StepKind::VariableIsAList => {
            let actual = Value::Array(
                compare::parse_expected_list(&args[0])?
                    .into_iter()
                    .map(Value::String)
                    .collect(),
            );
            compare::is_a_list(VARIABLE, &actual, &args[1])?
        }
        StepKind::VariableIsAnEmptyList => {
            let is_empty_list = serde_json::from_str::<Vec<Value>>(args[0].trim())
                .map(|items| items.is_empty())
                .unwrap_or(false);
            if !is_empty_list {
                return Err(ApiTestError::assertion(
                    VARIABLE,
                    &args[0],
                    "[]",
                    format!("Value `{}` is not an empty list", args[0]),
                ));
            }
        }
        StepKind::VariableIsAnInteger => compare::equals(VARIABLE, &args[0], &args[1], Coercion::Int)?,
        StepKind::VariableIsAFloat => compare::equals(VARIABLE, &args[0], &args[1], Coercion::Float)?,
        StepKind::VariableIsAString => compare::equals(VARIABLE, &args[0], &args[1], Coercion::None)?,
        StepKind::VariableIsTrue => variable_is_bool(&args[0], true)?,
        StepKind::VariableIsFalse => variable_is_bool(&args[0], false)?,

        _ => return Err(unsupported(kind)),
    }
    Ok(())
}

fn store(ctx: &mut TestContext, name: &str, value: Value) {
    debug!(name, value = %value, "Storing value");
    ctx.user_store.insert(name.to_string(), value);
}

fn request_from_fixture(ctx: &mut TestContext, name: &str) -> Result<()> {
    let format = ctx.request.format().ok_or_else(|| {
        ApiTestError::Format("Format not set, cannot attach a request body".to_string())
    })?;
    let text = fixtures::read_fixture(ctx.environment_dir(), format, FixtureKind::Request, name)?;
    ctx.request.attach_body(&text)
}

/// Serialize the request, send it and read the reply
fn invoke(ctx: &mut TestContext, executor: &dyn HttpExecutor) -> Result<()> {
    let prepared = ctx.request.prepare(ctx.auth.as_ref())?;
    info!(method = %prepared.method, url = %prepared.url, "Invoking URL");

    let reply = executor.send(&prepared)?;
    let format = ctx.request.effective_response_format();
    ctx.response = Some(Response::read(reply, format)?);
    Ok(())
}

fn status_is(response: &Response, expected: &str) -> Result<()> {
    let expected_status: u16 = expected
        .trim()
        .parse()
        .map_err(|_| ApiTestError::InvalidArgument(format!("`{}` is not an HTTP status", expected)))?;

    if response.status == expected_status {
        return Ok(());
    }
    Err(ApiTestError::assertion(
        "status",
        response.status.to_string(),
        expected_status.to_string(),
        format!("Status expected `{}`, received `{}`", expected_status, response.status),
    ))
}

fn response_header(ctx: &TestContext, name: &str) -> Result<String> {
    let response = ctx.response()?;
    response.header(name).ok_or_else(|| {
        ApiTestError::assertion(
            name,
            "<absent>",
            "<present>",
            format!("Header `{}` should be among {:?}", name, response.header_names()),
        )
    })
}

fn header_text(ctx: &TestContext, args: &[String], check: TextCheck, expect_match: bool) -> Result<()> {
    let value = response_header(ctx, &args[0])?;
    compare::check_text(&args[0], &value, &args[1], check, expect_match)
}

/// Store an XPath or JSON Pointer value of the response, or `default` when
/// the path is absent
fn store_from_response(ctx: &mut TestContext, path: &str, name: &str, default: Option<&str>) -> Result<()> {
    let response = ctx.response()?;
    let value = match &response.body {
        Body::Xml(doc) => match (xpath::get(doc, path, &ctx.request.namespaces), default) {
            (Ok(text), _) => Value::String(text),
            (Err(ApiTestError::PathNotFound { .. }), Some(default)) => Value::String(default.to_string()),
            (Err(e), _) => return Err(e),
        },
        Body::Json(doc) => match (pointer::lookup(doc, path)?, default) {
            (Some(found), _) => found.clone(),
            (None, Some(default)) => Value::String(default.to_string()),
            (None, None) => pointer::lookup_required(doc, path)?.clone(),
        },
        Body::Raw(_) => {
            return Err(ApiTestError::Format(format!(
                "Cannot read `{}` from a {} reply",
                path,
                response.format
            )));
        }
    };

    store(ctx, name, value);
    Ok(())
}

fn parse_expected_json(text: &str) -> Result<Value> {
    serde_json::from_str(text)
        .map_err(|e| ApiTestError::InvalidArgument(format!("Expected response is not JSON: {}", e)))
}

fn response_is_equal_to(ctx: &TestContext, expected: &Value) -> Result<()> {
    let actual = ctx.json_response()?;
    if actual == expected {
        return Ok(());
    }

    let actual_text = serde_json::to_string_pretty(actual)?;
    let expected_text = serde_json::to_string_pretty(expected)?;
    Err(ApiTestError::assertion(
        "response",
        truncate_str(&actual_text, MAX_DIAGNOSTIC_LEN),
        truncate_str(&expected_text, MAX_DIAGNOSTIC_LEN),
        "Response is not equal to the expected one",
    ))
}

/// Seconds as a float (`"0.5"`) or a humantime duration (`"500ms"`)
fn parse_sleep(value: &str) -> Result<Duration> {
    let value = value.trim();
    match value.parse::<f64>() {
        Ok(secs) => Duration::try_from_secs_f64(secs)
            .map_err(|e| ApiTestError::InvalidArgument(format!("Cannot sleep for `{}`: {}", value, e))),
        Err(_) => humantime::parse_duration(value)
            .map_err(|e| ApiTestError::InvalidArgument(format!("Cannot sleep for `{}`: {}", value, e))),
    }
}

fn sleep_for(value: &str) -> Result<()> {
    let duration = parse_sleep(value)?;
    debug!(?duration, "Sleeping");
    std::thread::sleep(duration);
    Ok(())
}

fn variable_is_bool(actual: &str, expected: bool) -> Result<()> {
    let matches = match actual.trim() {
        "true" | "True" => expected,
        "false" | "False" => !expected,
        _ => false,
    };
    if matches {
        return Ok(());
    }
    let expected_text = if expected { "True" } else { "False" };
    Err(ApiTestError::assertion(
        VARIABLE,
        actual,
        expected_text,
        format!("Value `{}` is not {}", actual, expected_text),
    ))
}

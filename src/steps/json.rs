//! JSON Pointer steps: setting values in the request, checking the response

use serde_json::Value;
use tracing::debug;

use crate::context::TestContext;
use crate::errors::{ApiTestError, Result};
use crate::path::{compare, pointer, Coercion, TextCheck};
use crate::random::{self, DEFAULT_DAY_LIMIT, DEFAULT_INT_MAX, DEFAULT_INT_MIN};
use crate::resolve::value_to_text;
use crate::strings::parse_list;

use super::{unsupported, StepKind};

pub(super) fn run(ctx: &mut TestContext, kind: StepKind, args: &[String]) -> Result<()> {
    match request_value(ctx, kind, args)? {
        Some(value) => {
            let path = &args[0];
            debug!(path = %path, value = %value, "Setting JSON Pointer in request");
            pointer::set(ctx.request.json_body_mut()?, path, value)
        }
        None => check_response(ctx, kind, args),
    }
}

fn parse_int(value: &str) -> Result<i64> {
    value
        .trim()
        .parse()
        .map_err(|_| ApiTestError::InvalidArgument(format!("`{}` is not an integer", value)))
}

fn parse_float(value: &str) -> Result<Value> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| ApiTestError::InvalidArgument(format!("`{}` is not a float", value)))
}

/// The value a request step writes, or `None` for response steps
fn request_value(ctx: &TestContext, kind: StepKind, args: &[String]) -> Result<Option<Value>> {
    let value = match kind {
        StepKind::JsonRequestIs => Value::String(args[1].clone()),
        StepKind::JsonRequestIsAnInteger => Value::from(parse_int(&args[1])?),
        StepKind::JsonRequestIsAFloat => parse_float(&args[1])?,
        StepKind::JsonRequestIsAList => Value::Array(parse_list(&args[1])?.into_iter().map(Value::String).collect()),
        StepKind::JsonRequestIsARandomString => Value::String(random::rand_string()),
        StepKind::JsonRequestIsARandomInteger => Value::from(random::rand_int(DEFAULT_INT_MIN, DEFAULT_INT_MAX)?),
        StepKind::JsonRequestIsARandomFloat => Value::from(random::rand_float(DEFAULT_INT_MIN, DEFAULT_INT_MAX)?),
        StepKind::JsonRequestIsOneOf => Value::String(random::any_from_list(&args[1])?),
        StepKind::JsonRequestIsARandomDate => {
            Value::String(random::rand_date(ctx.date_format(&args[1])?, None, None)?)
        }
        StepKind::JsonRequestIsNow => Value::String(random::now(ctx.date_format(&args[1])?)),
        StepKind::JsonRequestIsUtcNow => Value::String(random::utc_now(ctx.date_format(&args[1])?)),
        StepKind::JsonRequestIsARandomDateAfter => Value::String(random::date_after(
            &args[1],
            ctx.date_format(&args[2])?,
            DEFAULT_DAY_LIMIT,
        )?),
        StepKind::JsonRequestIsARandomDateBefore => Value::String(random::date_before(
            &args[1],
            ctx.date_format(&args[2])?,
            DEFAULT_DAY_LIMIT,
        )?),
        StepKind::JsonRequestIsARandomDateBetween => Value::String(random::date_between(
            &args[1],
            &args[2],
            ctx.date_format(&args[3])?,
        )?),
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn check_response(ctx: &TestContext, kind: StepKind, args: &[String]) -> Result<()> {
    let doc = ctx.json_response()?;
    let path = args[0].as_str();

    match kind {
        StepKind::JsonIsEmpty => return compare::json_is_empty(path, pointer::lookup(doc, path)?),
        StepKind::JsonIsNotEmpty => return compare::json_is_not_empty(path, pointer::lookup(doc, path)?),
        _ => {}
    }

    let actual = pointer::lookup_required(doc, path)?;
    match kind {
        StepKind::JsonIs => compare::equals_value(path, actual, &args[1], Coercion::None),
        StepKind::JsonIsAnInteger => compare::equals_value(path, actual, &args[1], Coercion::Int),
        StepKind::JsonIsAFloat => compare::equals_value(path, actual, &args[1], Coercion::Float),
        StepKind::JsonIsAList => compare::is_a_list(path, actual, &args[1]),
        StepKind::JsonIsOneOf => compare::is_one_of(path, &value_to_text(actual), &args[1]),
        StepKind::JsonIsNotOneOf => compare::is_not_one_of(path, &value_to_text(actual), &args[1]),
        StepKind::JsonIsTrue => compare::is_true(path, actual),
        StepKind::JsonIsFalse => compare::is_false(path, actual),
        StepKind::JsonIsAnEmptyList => compare::is_an_empty_list(path, actual),
        StepKind::JsonIsAnEmptyDict => compare::is_an_empty_dict(path, actual),
        StepKind::JsonIsNotAString => compare::is_not_a_string(path, actual),
        StepKind::JsonIsNull => compare::is_null(path, actual),
        StepKind::JsonContains => text_check(path, actual, &args[1], TextCheck::Contains, true),
        StepKind::JsonDoesNotContain => text_check(path, actual, &args[1], TextCheck::Contains, false),
        StepKind::JsonStartsWith => text_check(path, actual, &args[1], TextCheck::StartsWith, true),
        StepKind::JsonDoesNotStartWith => text_check(path, actual, &args[1], TextCheck::StartsWith, false),
        StepKind::JsonEndsWith => text_check(path, actual, &args[1], TextCheck::EndsWith, true),
        StepKind::JsonDoesNotEndWith => text_check(path, actual, &args[1], TextCheck::EndsWith, false),
        _ => Err(unsupported(kind)),
    }
}

fn text_check(path: &str, actual: &Value, expected: &str, check: TextCheck, expect_match: bool) -> Result<()> {
    compare::check_text(path, &value_to_text(actual), expected, check, expect_match)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::http::EchoExecutor;
    use crate::steps::{Step, StepRunner};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn run(runner: &StepRunner, ctx: &mut TestContext, kind: StepKind, args: &[&str]) -> Result<()> {
        runner.run(ctx, &Step::new(kind, args.iter().copied()))
    }

    fn json_context(body: &str) -> (StepRunner, TestContext) {
        let runner = StepRunner::new(EchoExecutor::new());
        let mut ctx = TestContext::new("/env", Config::default());
        ctx.request.address = "http://echo.local".to_string();
        run(&runner, &mut ctx, StepKind::Format, &["JSON"]).unwrap();
        run(&runner, &mut ctx, StepKind::RequestIs, &[body]).unwrap();
        (runner, ctx)
    }

    fn request_body(ctx: &mut TestContext) -> Value {
        ctx.request.json_body_mut().unwrap().clone()
    }

    #[test]
    fn test_echo_scenario() {
        let (runner, mut ctx) = json_context(r#"{"hello": "world"}"#);
        run(&runner, &mut ctx, StepKind::JsonRequestIs, &["/hello", "abc"]).unwrap();
        run(&runner, &mut ctx, StepKind::UrlIsInvoked, &[]).unwrap();
        run(&runner, &mut ctx, StepKind::StatusIs, &["200"]).unwrap();
        run(&runner, &mut ctx, StepKind::JsonContains, &["/data", "abc"]).unwrap();
        run(&runner, &mut ctx, StepKind::JsonDoesNotContain, &["/data", "world"]).unwrap();
        run(&runner, &mut ctx, StepKind::JsonIs, &["/method", "GET"]).unwrap();
        run(&runner, &mut ctx, StepKind::JsonStartsWith, &["/url", "http://echo.local"]).unwrap();
        run(&runner, &mut ctx, StepKind::JsonEndsWith, &["/url", "/"]).unwrap();
        run(&runner, &mut ctx, StepKind::JsonIsAnEmptyDict, &["/form"]).unwrap();
        run(&runner, &mut ctx, StepKind::JsonIsNotAString, &["/headers"]).unwrap();
    }

    #[test]
    fn test_request_setters() {
        let (runner, mut ctx) = json_context(r#"{"a": {}, "items": []}"#);
        run(&runner, &mut ctx, StepKind::JsonRequestIsAnInteger, &["/a/n", "42"]).unwrap();
        run(&runner, &mut ctx, StepKind::JsonRequestIsAFloat, &["/a/f", "1.5"]).unwrap();
        run(&runner, &mut ctx, StepKind::JsonRequestIsAList, &["/a/l", "x, y"]).unwrap();
        run(&runner, &mut ctx, StepKind::JsonRequestIsOneOf, &["/a/o", "only"]).unwrap();
        run(&runner, &mut ctx, StepKind::JsonRequestIsARandomString, &["/items/-"]).unwrap();

        let body = request_body(&mut ctx);
        assert_eq!(body["a"]["n"], json!(42));
        assert_eq!(body["a"]["f"], json!(1.5));
        assert_eq!(body["a"]["l"], json!(["x", "y"]));
        assert_eq!(body["a"]["o"], json!("only"));
        assert_eq!(body["items"].as_array().unwrap().len(), 1);

        let err = run(&runner, &mut ctx, StepKind::JsonRequestIsAnInteger, &["/a/n", "x"]).unwrap_err();
        assert!(matches!(err, ApiTestError::InvalidArgument(_)));
        let err = run(&runner, &mut ctx, StepKind::JsonRequestIs, &["/missing/x", "1"]).unwrap_err();
        assert!(matches!(err, ApiTestError::PathNotFound { .. }));
    }

    #[test]
    fn test_random_values_in_request() {
        let (runner, mut ctx) = json_context("{}");
        run(&runner, &mut ctx, StepKind::DateFormat, &["day", "YYYY-MM-DD"]).unwrap();
        run(&runner, &mut ctx, StepKind::JsonRequestIsARandomInteger, &["/i"]).unwrap();
        run(&runner, &mut ctx, StepKind::JsonRequestIsARandomFloat, &["/f"]).unwrap();
        run(&runner, &mut ctx, StepKind::JsonRequestIsARandomDate, &["/d", "day"]).unwrap();
        run(&runner, &mut ctx, StepKind::JsonRequestIsNow, &["/now", "day"]).unwrap();
        run(&runner, &mut ctx, StepKind::JsonRequestIsUtcNow, &["/utc", "default"]).unwrap();
        run(&runner, &mut ctx, StepKind::JsonRequestIsARandomDateAfter, &["/after", "2020-01-01", "day"]).unwrap();
        run(&runner, &mut ctx, StepKind::JsonRequestIsARandomDateBefore, &["/before", "2020-01-01", "day"]).unwrap();
        run(
            &runner,
            &mut ctx,
            StepKind::JsonRequestIsARandomDateBetween,
            &["/between", "2020-01-01", "2020-12-31", "day"],
        )
        .unwrap();

        let body = request_body(&mut ctx);
        let i = body["i"].as_i64().unwrap();
        assert!((DEFAULT_INT_MIN..DEFAULT_INT_MAX).contains(&i));
        assert!(body["f"].as_f64().unwrap().fract() != 0.0);
        assert_eq!(body["d"].as_str().unwrap().len(), 10);
        assert!(body["after"].as_str().unwrap() > "2020-01-01");
        assert!(body["before"].as_str().unwrap() < "2020-01-01");
        let between = body["between"].as_str().unwrap();
        assert!(between > "2020-01-01" && between < "2020-12-31");
    }

    #[test]
    fn test_response_assertions() {
        let (runner, mut ctx) = json_context(r#"{"n": 1}"#);
        run(&runner, &mut ctx, StepKind::UrlIsInvoked, &[]).unwrap();

        run(&runner, &mut ctx, StepKind::JsonIsOneOf, &["/method", "GET, POST"]).unwrap();
        run(&runner, &mut ctx, StepKind::JsonIsNotOneOf, &["/method", "PUT, DELETE"]).unwrap();
        run(&runner, &mut ctx, StepKind::JsonIsEmpty, &["/missing"]).unwrap();
        run(&runner, &mut ctx, StepKind::JsonIsEmpty, &["/files"]).unwrap();
        run(&runner, &mut ctx, StepKind::JsonIsNotEmpty, &["/data"]).unwrap();

        let err = run(&runner, &mut ctx, StepKind::JsonIs, &["/method", "POST"]).unwrap_err();
        match err {
            ApiTestError::Assertion { path, actual, expected, .. } => {
                assert_eq!(path, "/method");
                assert_eq!(actual, "GET");
                assert_eq!(expected, "POST");
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = run(&runner, &mut ctx, StepKind::JsonIsNull, &["/nope"]).unwrap_err();
        assert!(matches!(err, ApiTestError::PathNotFound { .. }));
        let err = run(&runner, &mut ctx, StepKind::JsonIsTrue, &["/method"]).unwrap_err();
        assert!(err.is_assertion());
    }

    #[test]
    fn test_response_steps_need_json() {
        let (runner, mut ctx) = json_context("{}");
        run(&runner, &mut ctx, StepKind::ResponseFormat, &["RAW"]).unwrap();
        run(&runner, &mut ctx, StepKind::UrlIsInvoked, &[]).unwrap();
        let err = run(&runner, &mut ctx, StepKind::JsonIs, &["/method", "GET"]).unwrap_err();
        assert!(matches!(err, ApiTestError::Format(_)));
    }
}

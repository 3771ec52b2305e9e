//! XML steps: namespaces, SOAP action, XPath values in the request and
//! checks against the response

use tracing::debug;

use crate::context::TestContext;
use crate::errors::{ApiTestError, Result};
use crate::http::set_header;
use crate::path::{compare, xpath, Coercion, TextCheck};
use crate::random::{self, DEFAULT_DAY_LIMIT, DEFAULT_INT_MAX, DEFAULT_INT_MIN};

use super::{unsupported, StepKind};

const SOAP_ACTION: &str = "SOAPAction";

pub(super) fn run(ctx: &mut TestContext, kind: StepKind, args: &[String]) -> Result<()> {
    match kind {
        StepKind::NamespacePrefix => {
            ctx.request.namespaces.insert(args[0].clone(), args[1].clone());
            Ok(())
        }
        StepKind::SoapAction => {
            set_header(&mut ctx.request.headers, SOAP_ACTION, &args[0]);
            Ok(())
        }
        _ => match request_value(ctx, kind, args)? {
            Some(value) => {
                let path = &args[0];
                debug!(path = %path, value = %value, "Setting XPath in request");
                let namespaces = ctx.request.namespaces.clone();
                xpath::set(ctx.request.xml_body_mut()?, path, &namespaces, &value)
            }
            None => check_response(ctx, kind, args),
        },
    }
}

/// The text a request step writes, or `None` for response steps
fn request_value(ctx: &TestContext, kind: StepKind, args: &[String]) -> Result<Option<String>> {
    let value = match kind {
        StepKind::XPathRequestIs => args[1].clone(),
        StepKind::XPathRequestIsARandomString => random::rand_string(),
        StepKind::XPathRequestIsARandomInteger => random::rand_int(DEFAULT_INT_MIN, DEFAULT_INT_MAX)?.to_string(),
        StepKind::XPathRequestIsARandomFloat => random::rand_float(DEFAULT_INT_MIN, DEFAULT_INT_MAX)?.to_string(),
        StepKind::XPathRequestIsARandomDate => random::rand_date(ctx.date_format(&args[1])?, None, None)?,
        StepKind::XPathRequestIsNow => random::now(ctx.date_format(&args[1])?),
        StepKind::XPathRequestIsUtcNow => random::utc_now(ctx.date_format(&args[1])?),
        StepKind::XPathRequestIsARandomDateAfter => {
            random::date_after(&args[1], ctx.date_format(&args[2])?, DEFAULT_DAY_LIMIT)?
        }
        StepKind::XPathRequestIsARandomDateBefore => {
            random::date_before(&args[1], ctx.date_format(&args[2])?, DEFAULT_DAY_LIMIT)?
        }
        StepKind::XPathRequestIsARandomDateBetween => {
            random::date_between(&args[1], &args[2], ctx.date_format(&args[3])?)?
        }
        StepKind::XPathRequestIsOneOf => random::any_from_list(&args[1])?,
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn check_response(ctx: &TestContext, kind: StepKind, args: &[String]) -> Result<()> {
    let response = ctx.response()?;
    let doc = response.body.as_xml().ok_or_else(|| {
        ApiTestError::Format(format!("This step works with XML replies only, got {}", response.format))
    })?;

    let path = args[0].as_str();
    let actual = xpath::get(doc, path, &ctx.request.namespaces)?;

    match kind {
        StepKind::XPathIs => compare::equals(path, &actual, &args[1], Coercion::None),
        StepKind::XPathIsAnInteger => compare::equals(path, &actual, &args[1], Coercion::Int),
        StepKind::XPathIsAFloat => compare::equals(path, &actual, &args[1], Coercion::Float),
        StepKind::XPathIsEmpty => compare::is_empty(path, &actual),
        StepKind::XPathIsNotEmpty => compare::is_not_empty(path, &actual),
        StepKind::XPathIsOneOf => compare::is_one_of(path, &actual, &args[1]),
        StepKind::XPathIsNotOneOf => compare::is_not_one_of(path, &actual, &args[1]),
        StepKind::XPathContains => compare::check_text(path, &actual, &args[1], TextCheck::Contains, true),
        StepKind::XPathDoesNotContain => compare::check_text(path, &actual, &args[1], TextCheck::Contains, false),
        StepKind::XPathStartsWith => compare::check_text(path, &actual, &args[1], TextCheck::StartsWith, true),
        StepKind::XPathDoesNotStartWith => compare::check_text(path, &actual, &args[1], TextCheck::StartsWith, false),
        StepKind::XPathEndsWith => compare::check_text(path, &actual, &args[1], TextCheck::EndsWith, true),
        StepKind::XPathDoesNotEndWith => compare::check_text(path, &actual, &args[1], TextCheck::EndsWith, false),
        _ => Err(unsupported(kind)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::format::{WireBody, XmlDocument};
    use crate::http::{get_header, EchoExecutor, HttpExecutor, HttpResponse, PreparedRequest};
    use crate::steps::{Step, StepRunner};
    use reqwest::header::HeaderMap;

    const ORDER: &str = r#"<ord:order xmlns:ord="urn:orders"><ord:id>1</ord:id><ord:customer><ord:name>Ann</ord:name></ord:customer><ord:created/></ord:order>"#;

    /// Replies with the request body, as a SOAP echo service would
    struct Mirror;

    impl HttpExecutor for Mirror {
        fn send(&self, request: &PreparedRequest) -> Result<HttpResponse> {
            let text = match &request.body {
                WireBody::Text(text) => text.clone(),
                _ => String::new(),
            };
            Ok(HttpResponse {
                status: 200,
                headers: HeaderMap::new(),
                text,
            })
        }
    }

    fn run(runner: &StepRunner, ctx: &mut TestContext, kind: StepKind, args: &[&str]) -> Result<()> {
        runner.run(ctx, &Step::new(kind, args.iter().copied()))
    }

    fn xml_context(runner: &StepRunner) -> TestContext {
        let mut ctx = TestContext::new("/env", Config::default());
        ctx.request.address = "http://soap.local".to_string();
        run(runner, &mut ctx, StepKind::Format, &["XML"]).unwrap();
        run(runner, &mut ctx, StepKind::RequestIs, &[ORDER]).unwrap();
        run(runner, &mut ctx, StepKind::NamespacePrefix, &["o", "urn:orders"]).unwrap();
        ctx
    }

    fn request_value_at(ctx: &mut TestContext, path: &str) -> String {
        let namespaces = ctx.request.namespaces.clone();
        let doc: &XmlDocument = ctx.request.xml_body_mut().unwrap();
        xpath::get(doc, path, &namespaces).unwrap()
    }

    #[test]
    fn test_soap_action_header() {
        let runner = StepRunner::new(EchoExecutor::new());
        let mut ctx = xml_context(&runner);
        run(&runner, &mut ctx, StepKind::SoapAction, &["urn:orders/create"]).unwrap();
        assert_eq!(get_header(&ctx.request.headers, "SOAPAction"), Some("urn:orders/create"));
    }

    #[test]
    fn test_request_setters() {
        let runner = StepRunner::new(Mirror);
        let mut ctx = xml_context(&runner);
        run(&runner, &mut ctx, StepKind::XPathRequestIs, &["//o:name", "Bob"]).unwrap();
        run(&runner, &mut ctx, StepKind::XPathRequestIsARandomInteger, &["/o:order/o:id"]).unwrap();
        run(&runner, &mut ctx, StepKind::XPathRequestIsNow, &["//o:created", "default"]).unwrap();

        assert_eq!(request_value_at(&mut ctx, "//o:name"), "Bob");
        let id: i64 = request_value_at(&mut ctx, "/o:order/o:id").parse().unwrap();
        assert!((DEFAULT_INT_MIN..DEFAULT_INT_MAX).contains(&id));
        assert_eq!(request_value_at(&mut ctx, "//o:created").len(), "2024-01-01T00:00:00".len());

        run(&runner, &mut ctx, StepKind::DateFormat, &["day", "YYYY-MM-DD"]).unwrap();
        run(
            &runner,
            &mut ctx,
            StepKind::XPathRequestIsARandomDateBetween,
            &["//o:created", "2021-03-01", "2021-03-05", "day"],
        )
        .unwrap();
        let created = request_value_at(&mut ctx, "//o:created");
        assert!(created.as_str() > "2021-03-01" && created.as_str() < "2021-03-05");
    }

    #[test]
    fn test_request_setter_errors() {
        let runner = StepRunner::new(Mirror);
        let mut ctx = xml_context(&runner);
        let err = run(&runner, &mut ctx, StepKind::XPathRequestIs, &["//o:missing", "x"]).unwrap_err();
        assert!(matches!(err, ApiTestError::PathNotFound { .. }));
        let err = run(&runner, &mut ctx, StepKind::XPathRequestIs, &["//x:name", "x"]).unwrap_err();
        assert!(matches!(err, ApiTestError::InvalidPath { .. }));
        let err = run(&runner, &mut ctx, StepKind::XPathRequestIs, &["//o:*", "x"]).unwrap_err();
        assert!(matches!(err, ApiTestError::AmbiguousPath { .. }));
    }

    #[test]
    fn test_response_assertions() {
        let runner = StepRunner::new(Mirror);
        let mut ctx = xml_context(&runner);
        run(&runner, &mut ctx, StepKind::UrlIsInvoked, &[]).unwrap();

        run(&runner, &mut ctx, StepKind::XPathIs, &["//o:name", "Ann"]).unwrap();
        run(&runner, &mut ctx, StepKind::XPathIsAnInteger, &["//o:id", "1"]).unwrap();
        run(&runner, &mut ctx, StepKind::XPathIsAFloat, &["//o:id", "1.0"]).unwrap();
        run(&runner, &mut ctx, StepKind::XPathIsEmpty, &["//o:created"]).unwrap();
        run(&runner, &mut ctx, StepKind::XPathIsNotEmpty, &["//o:name"]).unwrap();
        run(&runner, &mut ctx, StepKind::XPathIsOneOf, &["//o:name", "Ann, Bob"]).unwrap();
        run(&runner, &mut ctx, StepKind::XPathIsNotOneOf, &["//o:name", "Cid"]).unwrap();
        run(&runner, &mut ctx, StepKind::XPathContains, &["//o:name", "n"]).unwrap();
        run(&runner, &mut ctx, StepKind::XPathDoesNotContain, &["//o:name", "z"]).unwrap();
        run(&runner, &mut ctx, StepKind::XPathStartsWith, &["//o:name", "A"]).unwrap();
        run(&runner, &mut ctx, StepKind::XPathDoesNotStartWith, &["//o:name", "n"]).unwrap();
        run(&runner, &mut ctx, StepKind::XPathEndsWith, &["//o:name", "nn"]).unwrap();
        run(&runner, &mut ctx, StepKind::XPathDoesNotEndWith, &["//o:name", "A"]).unwrap();

        let err = run(&runner, &mut ctx, StepKind::XPathIs, &["//o:name", "Bob"]).unwrap_err();
        match err {
            ApiTestError::Assertion { actual, expected, .. } => {
                assert_eq!(actual, "Ann");
                assert_eq!(expected, "Bob");
            }
            other => panic!("unexpected error: {other}"),
        }

        run(&runner, &mut ctx, StepKind::StoreFromResponse, &["//o:name", "who"]).unwrap();
        assert_eq!(ctx.user_store["who"], serde_json::json!("Ann"));
        run(&runner, &mut ctx, StepKind::StoreFromResponseWithDefault, &["//o:nope", "x", "none"]).unwrap();
        assert_eq!(ctx.user_store["x"], serde_json::json!("none"));
    }

    #[test]
    fn test_response_steps_need_xml() {
        let runner = StepRunner::new(Mirror);
        let mut ctx = xml_context(&runner);
        run(&runner, &mut ctx, StepKind::ResponseFormat, &["RAW"]).unwrap();
        run(&runner, &mut ctx, StepKind::UrlIsInvoked, &[]).unwrap();
        let err = run(&runner, &mut ctx, StepKind::XPathIs, &["//o:name", "Ann"]).unwrap_err();
        assert!(matches!(err, ApiTestError::Format(_)));
    }
}

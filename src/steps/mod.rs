//! Step vocabulary and dispatch
//!
//! Every sentence a scenario may use is one [`StepKind`]. A front end matches
//! sentences against [`StepKind::template`], extracts the quoted arguments
//! and hands a [`Step`] to [`StepRunner::run`], which resolves `$`/`#`/`@`
//! references and runs the handler against the [`TestContext`].

mod common;
mod json;
mod xml;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::context::TestContext;
use crate::errors::{ApiTestError, Result};
use crate::http::HttpExecutor;

/// Which handler module a step belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepGroup {
    Common,
    Json,
    Xml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKind {
    // Request setup
    Address,
    UrlPath,
    HttpMethod,
    Format,
    RequestFormat,
    ResponseFormat,
    UserAgent,
    Header,
    Request,
    RequestIs,
    RequestFile,
    RequestParam,
    QueryString,
    DateFormat,
    BasicAuth,
    BearerToken,

    // Store
    StoreValue,
    StoreRandomString,
    StoreRandomInteger,
    StoreRandomFloat,
    StoreRandomDate,
    EncodeBase64,

    UrlIsInvoked,
    ContextIsCleanedUp,
    FormIsCleanedUp,

    // Response
    StatusIs,
    HeaderIs,
    HeaderIsNot,
    HeaderContains,
    HeaderDoesNotContain,
    HeaderExists,
    HeaderDoesNotExist,
    HeaderIsEmpty,
    HeaderIsNotEmpty,
    HeaderStartsWith,
    HeaderDoesNotStartWith,
    HeaderEndsWith,
    HeaderDoesNotEndWith,
    StoreFromResponse,
    StoreFromResponseWithDefault,
    ResponseIsEqualTo,
    ResponseIsEqualToThatFrom,
    SleepFor,

    // Variables
    VariableIsAList,
    VariableIsAnEmptyList,
    VariableIsAnInteger,
    VariableIsAFloat,
    VariableIsAString,
    VariableIsTrue,
    VariableIsFalse,

    // JSON request
    JsonRequestIs,
    JsonRequestIsAnInteger,
    JsonRequestIsAFloat,
    JsonRequestIsAList,
    JsonRequestIsARandomString,
    JsonRequestIsARandomInteger,
    JsonRequestIsARandomFloat,
    JsonRequestIsOneOf,
    JsonRequestIsARandomDate,
    JsonRequestIsNow,
    JsonRequestIsUtcNow,
    JsonRequestIsARandomDateAfter,
    JsonRequestIsARandomDateBefore,
    JsonRequestIsARandomDateBetween,

    // JSON response
    JsonIs,
    JsonIsAnInteger,
    JsonIsAFloat,
    JsonIsAList,
    JsonIsEmpty,
    JsonIsNotEmpty,
    JsonIsOneOf,
    JsonIsNotOneOf,
    JsonIsTrue,
    JsonIsFalse,
    JsonIsAnEmptyList,
    JsonIsAnEmptyDict,
    JsonIsNotAString,
    JsonIsNull,
    JsonContains,
    JsonDoesNotContain,
    JsonStartsWith,
    JsonDoesNotStartWith,
    JsonEndsWith,
    JsonDoesNotEndWith,

    // XML request
    NamespacePrefix,
    SoapAction,
    XPathRequestIs,
    XPathRequestIsARandomString,
    XPathRequestIsARandomInteger,
    XPathRequestIsARandomFloat,
    XPathRequestIsARandomDate,
    XPathRequestIsNow,
    XPathRequestIsUtcNow,
    XPathRequestIsARandomDateAfter,
    XPathRequestIsARandomDateBefore,
    XPathRequestIsARandomDateBetween,
    XPathRequestIsOneOf,

    // XML response
    XPathIs,
    XPathIsAnInteger,
    XPathIsAFloat,
    XPathIsEmpty,
    XPathIsNotEmpty,
    XPathIsOneOf,
    XPathIsNotOneOf,
    XPathContains,
    XPathDoesNotContain,
    XPathStartsWith,
    XPathDoesNotStartWith,
    XPathEndsWith,
    XPathDoesNotEndWith,
}

impl StepKind {
    pub const ALL: &'static [StepKind] = &[
        StepKind::Address,
        StepKind::UrlPath,
        StepKind::HttpMethod,
        StepKind::Format,
        StepKind::RequestFormat,
        StepKind::ResponseFormat,
        StepKind::UserAgent,
        StepKind::Header,
        StepKind::Request,
        StepKind::RequestIs,
        StepKind::RequestFile,
        StepKind::RequestParam,
        StepKind::QueryString,
        StepKind::DateFormat,
        StepKind::BasicAuth,
        StepKind::BearerToken,
        StepKind::StoreValue,
        StepKind::StoreRandomString,
        StepKind::StoreRandomInteger,
        StepKind::StoreRandomFloat,
        StepKind::StoreRandomDate,
        StepKind::EncodeBase64,
        StepKind::UrlIsInvoked,
        StepKind::ContextIsCleanedUp,
        StepKind::FormIsCleanedUp,
        StepKind::StatusIs,
        StepKind::HeaderIs,
        StepKind::HeaderIsNot,
        StepKind::HeaderContains,
        StepKind::HeaderDoesNotContain,
        StepKind::HeaderExists,
        StepKind::HeaderDoesNotExist,
        StepKind::HeaderIsEmpty,
        StepKind::HeaderIsNotEmpty,
        StepKind::HeaderStartsWith,
        StepKind::HeaderDoesNotStartWith,
        StepKind::HeaderEndsWith,
        StepKind::HeaderDoesNotEndWith,
        StepKind::StoreFromResponse,
        StepKind::StoreFromResponseWithDefault,
        StepKind::ResponseIsEqualTo,
        StepKind::ResponseIsEqualToThatFrom,
        StepKind::SleepFor,
        StepKind::VariableIsAList,
        StepKind::VariableIsAnEmptyList,
        StepKind::VariableIsAnInteger,
        StepKind::VariableIsAFloat,
        StepKind::VariableIsAString,
        StepKind::VariableIsTrue,
        StepKind::VariableIsFalse,
        StepKind::JsonRequestIs,
        StepKind::JsonRequestIsAnInteger,
        StepKind::JsonRequestIsAFloat,
        StepKind::JsonRequestIsAList,
        StepKind::JsonRequestIsARandomString,
        StepKind::JsonRequestIsARandomInteger,
        StepKind::JsonRequestIsARandomFloat,
        StepKind::JsonRequestIsOneOf,
        StepKind::JsonRequestIsARandomDate,
        StepKind::JsonRequestIsNow,
        StepKind::JsonRequestIsUtcNow,
        StepKind::JsonRequestIsARandomDateAfter,
        StepKind::JsonRequestIsARandomDateBefore,
        StepKind::JsonRequestIsARandomDateBetween,
        StepKind::JsonIs,
        StepKind::JsonIsAnInteger,
        StepKind::JsonIsAFloat,
        StepKind::JsonIsAList,
        StepKind::JsonIsEmpty,
        StepKind::JsonIsNotEmpty,
        StepKind::JsonIsOneOf,
        StepKind::JsonIsNotOneOf,
        StepKind::JsonIsTrue,
        StepKind::JsonIsFalse,
        StepKind::JsonIsAnEmptyList,
        StepKind::JsonIsAnEmptyDict,
        StepKind::JsonIsNotAString,
        StepKind::JsonIsNull,
        StepKind::JsonContains,
        StepKind::JsonDoesNotContain,
        StepKind::JsonStartsWith,
        StepKind::JsonDoesNotStartWith,
        StepKind::JsonEndsWith,
        StepKind::JsonDoesNotEndWith,
        StepKind::NamespacePrefix,
        StepKind::SoapAction,
        StepKind::XPathRequestIs,
        StepKind::XPathRequestIsARandomString,
        StepKind::XPathRequestIsARandomInteger,
        StepKind::XPathRequestIsARandomFloat,
        StepKind::XPathRequestIsARandomDate,
        StepKind::XPathRequestIsNow,
        StepKind::XPathRequestIsUtcNow,
        StepKind::XPathRequestIsARandomDateAfter,
        StepKind::XPathRequestIsARandomDateBefore,
        StepKind::XPathRequestIsARandomDateBetween,
        StepKind::XPathRequestIsOneOf,
        StepKind::XPathIs,
        StepKind::XPathIsAnInteger,
        StepKind::XPathIsAFloat,
        StepKind::XPathIsEmpty,
        StepKind::XPathIsNotEmpty,
        StepKind::XPathIsOneOf,
        StepKind::XPathIsNotOneOf,
        StepKind::XPathContains,
        StepKind::XPathDoesNotContain,
        StepKind::XPathStartsWith,
        StepKind::XPathDoesNotStartWith,
        StepKind::XPathEndsWith,
        StepKind::XPathDoesNotEndWith,
    ];

    /// The sentence this step is written as; `{name}` marks an argument
    pub fn template(&self) -> &'static str {
        match self {
            StepKind::Address => r#"address "{address}""#,
            StepKind::UrlPath => r#"URL path "{url_path}""#,
            StepKind::HttpMethod => r#"HTTP method "{method}""#,
            StepKind::Format => r#"format "{format}""#,
            StepKind::RequestFormat => r#"request format "{format}""#,
            StepKind::ResponseFormat => r#"response format "{format}""#,
            StepKind::UserAgent => r#"user agent is "{value}""#,
            StepKind::Header => r#"header "{header}" "{value}""#,
            StepKind::Request => r#"request "{request_path}""#,
            StepKind::RequestIs => r#"request is "{data}""#,
            StepKind::RequestFile => r#"request file "{name}" is "{value}""#,
            StepKind::RequestParam => r#"request param "{name}" is "{value}""#,
            StepKind::QueryString => r#"query string "{query_string}""#,
            StepKind::DateFormat => r#"date format "{name}" "{format}""#,
            StepKind::BasicAuth => r#"Basic Auth "{username}" "{password}""#,
            StepKind::BearerToken => r#"Bearer token "{token}""#,

            StepKind::StoreValue => r#"I store "{value}" under "{name}""#,
            StepKind::StoreRandomString => r#"I store a random string under "{name}""#,
            StepKind::StoreRandomInteger => r#"I store a random integer under "{name}""#,
            StepKind::StoreRandomFloat => r#"I store a random float under "{name}""#,
            StepKind::StoreRandomDate => r#"I store a random date under "{name}", format "{format}""#,
            StepKind::EncodeBase64 => r#"I encode "{value}" using Base64 under "{name}""#,

            StepKind::UrlIsInvoked => "the URL is invoked",
            StepKind::ContextIsCleanedUp => "context is cleaned up",
            StepKind::FormIsCleanedUp => "form is cleaned up",

            StepKind::StatusIs => r#"status is "{expected_status}""#,
            StepKind::HeaderIs => r#"header "{expected_header}" is "{expected_value}""#,
            StepKind::HeaderIsNot => r#"header "{expected_header}" isn't "{expected_value}""#,
            StepKind::HeaderContains => r#"header "{expected_header}" contains "{expected_value}""#,
            StepKind::HeaderDoesNotContain => r#"header "{expected_header}" doesn't contain "{expected_value}""#,
            StepKind::HeaderExists => r#"header "{expected_header}" exists"#,
            StepKind::HeaderDoesNotExist => r#"header "{expected_header}" doesn't exist"#,
            StepKind::HeaderIsEmpty => r#"header "{expected_header}" is empty"#,
            StepKind::HeaderIsNotEmpty => r#"header "{expected_header}" isn't empty"#,
            StepKind::HeaderStartsWith => r#"header "{expected_header}" starts with "{expected_value}""#,
            StepKind::HeaderDoesNotStartWith => {
                r#"header "{expected_header}" doesn't start with "{expected_value}""#
            }
            StepKind::HeaderEndsWith => r#"header "{expected_header}" ends with "{expected_value}""#,
            StepKind::HeaderDoesNotEndWith => r#"header "{expected_header}" doesn't end with "{expected_value}""#,
            StepKind::StoreFromResponse => r#"I store "{path}" from response under "{name}""#,
            StepKind::StoreFromResponseWithDefault => {
                r#"I store "{path}" from response under "{name}", default "{default}""#
            }
            StepKind::ResponseIsEqualTo => r#"response is equal to "{expected}""#,
            StepKind::ResponseIsEqualToThatFrom => r#"response is equal to that from "{path}""#,
            StepKind::SleepFor => r#"I sleep for "{sleep_time}""#,

            StepKind::VariableIsAList => r#"variable "{variable}" is a list "{value}""#,
            StepKind::VariableIsAnEmptyList => r#"variable "{variable}" is an empty list"#,
            StepKind::VariableIsAnInteger => r#"variable "{variable}" is an integer "{value}""#,
            StepKind::VariableIsAFloat => r#"variable "{variable}" is a float "{value}""#,
            StepKind::VariableIsAString => r#"variable "{variable}" is a string "{value}""#,
            StepKind::VariableIsTrue => r#"variable "{variable}" is True"#,
            StepKind::VariableIsFalse => r#"variable "{variable}" is False"#,

            StepKind::JsonRequestIs => r#"JSON Pointer "{path}" in request is "{value}""#,
            StepKind::JsonRequestIsAnInteger => r#"JSON Pointer "{path}" in request is an integer "{value}""#,
            StepKind::JsonRequestIsAFloat => r#"JSON Pointer "{path}" in request is a float "{value}""#,
            StepKind::JsonRequestIsAList => r#"JSON Pointer "{path}" in request is a list "{value}""#,
            StepKind::JsonRequestIsARandomString => r#"JSON Pointer "{path}" in request is a random string"#,
            StepKind::JsonRequestIsARandomInteger => r#"JSON Pointer "{path}" in request is a random integer"#,
            StepKind::JsonRequestIsARandomFloat => r#"JSON Pointer "{path}" in request is a random float"#,
            StepKind::JsonRequestIsOneOf => r#"JSON Pointer "{path}" in request is any of "{value}""#,
            StepKind::JsonRequestIsARandomDate => r#"JSON Pointer "{path}" in request is a random date "{format}""#,
            StepKind::JsonRequestIsNow => r#"JSON Pointer "{path}" in request is now "{format}""#,
            StepKind::JsonRequestIsUtcNow => r#"JSON Pointer "{path}" in request is UTC now "{format}""#,
            StepKind::JsonRequestIsARandomDateAfter => {
                r#"JSON Pointer "{path}" in request is a random date after "{date_start}" "{format}""#
            }
            StepKind::JsonRequestIsARandomDateBefore => {
                r#"JSON Pointer "{path}" in request is a random date before "{date_end}" "{format}""#
            }
            StepKind::JsonRequestIsARandomDateBetween => {
                r#"JSON Pointer "{path}" in request is a random date between "{date_start}" and "{date_end}" "{format}""#
            }

            StepKind::JsonIs => r#"JSON Pointer "{path}" is "{value}""#,
            StepKind::JsonIsAnInteger => r#"JSON Pointer "{path}" is an integer "{value}""#,
            StepKind::JsonIsAFloat => r#"JSON Pointer "{path}" is a float "{value}""#,
            StepKind::JsonIsAList => r#"JSON Pointer "{path}" is a list "{value}""#,
            StepKind::JsonIsEmpty => r#"JSON Pointer "{path}" is empty"#,
            StepKind::JsonIsNotEmpty => r#"JSON Pointer "{path}" is not empty"#,
            StepKind::JsonIsOneOf => r#"JSON Pointer "{path}" is one of "{value}""#,
            StepKind::JsonIsNotOneOf => r#"JSON Pointer "{path}" is not one of "{value}""#,
            StepKind::JsonIsTrue => r#"JSON Pointer "{path}" is True"#,
            StepKind::JsonIsFalse => r#"JSON Pointer "{path}" is False"#,
            StepKind::JsonIsAnEmptyList => r#"JSON Pointer "{path}" is an empty list"#,
            StepKind::JsonIsAnEmptyDict => r#"JSON Pointer "{path}" is an empty dict"#,
            StepKind::JsonIsNotAString => r#"JSON Pointer "{path}" is not a string"#,
            StepKind::JsonIsNull => r#"JSON Pointer "{path}" is null"#,
            StepKind::JsonContains => r#"JSON Pointer "{path}" contains "{value}""#,
            StepKind::JsonDoesNotContain => r#"JSON Pointer "{path}" doesn't contain "{value}""#,
            StepKind::JsonStartsWith => r#"JSON Pointer "{path}" starts with "{value}""#,
            StepKind::JsonDoesNotStartWith => r#"JSON Pointer "{path}" doesn't start with "{value}""#,
            StepKind::JsonEndsWith => r#"JSON Pointer "{path}" ends with "{value}""#,
            StepKind::JsonDoesNotEndWith => r#"JSON Pointer "{path}" doesn't end with "{value}""#,

            StepKind::NamespacePrefix => r#"namespace prefix "{prefix}" of "{namespace}""#,
            StepKind::SoapAction => r#"SOAP action "{value}""#,
            StepKind::XPathRequestIs => r#"XPath "{xpath}" in request is "{value}""#,
            StepKind::XPathRequestIsARandomString => r#"XPath "{xpath}" in request is a random string"#,
            StepKind::XPathRequestIsARandomInteger => r#"XPath "{xpath}" in request is a random integer"#,
            StepKind::XPathRequestIsARandomFloat => r#"XPath "{xpath}" in request is a random float"#,
            StepKind::XPathRequestIsARandomDate => r#"XPath "{xpath}" in request is a random date "{format}""#,
            StepKind::XPathRequestIsNow => r#"XPath "{xpath}" in request is now "{format}""#,
            StepKind::XPathRequestIsUtcNow => r#"XPath "{xpath}" in request is UTC now "{format}""#,
            StepKind::XPathRequestIsARandomDateAfter => {
                r#"XPath "{xpath}" in request is a random date after "{date_start}" "{format}""#
            }
            StepKind::XPathRequestIsARandomDateBefore => {
                r#"XPath "{xpath}" in request is a random date before "{date_end}" "{format}""#
            }
            StepKind::XPathRequestIsARandomDateBetween => {
                r#"XPath "{xpath}" in request is a random date between "{date_start}" and "{date_end}" "{format}""#
            }
            StepKind::XPathRequestIsOneOf => r#"XPath "{xpath}" in request is one of "{value}""#,

            StepKind::XPathIs => r#"XPath "{elem}" is "{value}""#,
            StepKind::XPathIsAnInteger => r#"XPath "{elem}" is an integer "{value}""#,
            StepKind::XPathIsAFloat => r#"XPath "{elem}" is a float "{value}""#,
            StepKind::XPathIsEmpty => r#"XPath "{elem}" is empty"#,
            StepKind::XPathIsNotEmpty => r#"XPath "{elem}" isn't empty"#,
            StepKind::XPathIsOneOf => r#"XPath "{elem}" is one of "{value}""#,
            StepKind::XPathIsNotOneOf => r#"XPath "{elem}" isn't one of "{value}""#,
            StepKind::XPathContains => r#"XPath "{elem}" contains "{value}""#,
            StepKind::XPathDoesNotContain => r#"XPath "{elem}" doesn't contain "{value}""#,
            StepKind::XPathStartsWith => r#"XPath "{elem}" starts with "{value}""#,
            StepKind::XPathDoesNotStartWith => r#"XPath "{elem}" doesn't start with "{value}""#,
            StepKind::XPathEndsWith => r#"XPath "{elem}" ends with "{value}""#,
            StepKind::XPathDoesNotEndWith => r#"XPath "{elem}" doesn't end with "{value}""#,
        }
    }

    /// Other sentences accepted for the same step
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            StepKind::JsonRequestIsOneOf => &[r#"JSON Pointer "{path}" in request is one of "{value}""#],
            _ => &[],
        }
    }

    pub fn from_template(template: &str) -> Option<StepKind> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.template() == template || kind.aliases().contains(&template))
    }

    /// Number of arguments the template takes
    pub fn arity(&self) -> usize {
        self.template().matches("\"{").count()
    }

    /// `HTTP method` takes its argument literally
    pub fn resolves_arguments(&self) -> bool {
        !matches!(self, StepKind::HttpMethod)
    }

    pub fn group(&self) -> StepGroup {
        match self {
            StepKind::JsonRequestIs
            | StepKind::JsonRequestIsAnInteger
            | StepKind::JsonRequestIsAFloat
            | StepKind::JsonRequestIsAList
            | StepKind::JsonRequestIsARandomString
            | StepKind::JsonRequestIsARandomInteger
            | StepKind::JsonRequestIsARandomFloat
            | StepKind::JsonRequestIsOneOf
            | StepKind::JsonRequestIsARandomDate
            | StepKind::JsonRequestIsNow
            | StepKind::JsonRequestIsUtcNow
            | StepKind::JsonRequestIsARandomDateAfter
            | StepKind::JsonRequestIsARandomDateBefore
            | StepKind::JsonRequestIsARandomDateBetween
            | StepKind::JsonIs
            | StepKind::JsonIsAnInteger
            | StepKind::JsonIsAFloat
            | StepKind::JsonIsAList
            | StepKind::JsonIsEmpty
            | StepKind::JsonIsNotEmpty
            | StepKind::JsonIsOneOf
            | StepKind::JsonIsNotOneOf
            | StepKind::JsonIsTrue
            | StepKind::JsonIsFalse
            | StepKind::JsonIsAnEmptyList
            | StepKind::JsonIsAnEmptyDict
            | StepKind::JsonIsNotAString
            | StepKind::JsonIsNull
            | StepKind::JsonContains
            | StepKind::JsonDoesNotContain
            | StepKind::JsonStartsWith
            | StepKind::JsonDoesNotStartWith
            | StepKind::JsonEndsWith
            | StepKind::JsonDoesNotEndWith => StepGroup::Json,

            StepKind::NamespacePrefix
            | StepKind::SoapAction
            | StepKind::XPathRequestIs
            | StepKind::XPathRequestIsARandomString
            | StepKind::XPathRequestIsARandomInteger
            | StepKind::XPathRequestIsARandomFloat
            | StepKind::XPathRequestIsARandomDate
            | StepKind::XPathRequestIsNow
            | StepKind::XPathRequestIsUtcNow
            | StepKind::XPathRequestIsARandomDateAfter
            | StepKind::XPathRequestIsARandomDateBefore
            | StepKind::XPathRequestIsARandomDateBetween
            | StepKind::XPathRequestIsOneOf
            | StepKind::XPathIs
            | StepKind::XPathIsAnInteger
            | StepKind::XPathIsAFloat
            | StepKind::XPathIsEmpty
            | StepKind::XPathIsNotEmpty
            | StepKind::XPathIsOneOf
            | StepKind::XPathIsNotOneOf
            | StepKind::XPathContains
            | StepKind::XPathDoesNotContain
            | StepKind::XPathStartsWith
            | StepKind::XPathDoesNotStartWith
            | StepKind::XPathEndsWith
            | StepKind::XPathDoesNotEndWith => StepGroup::Xml,

            _ => StepGroup::Common,
        }
    }
}

/// Templates and aliases compiled to anchored regexes, one capture per argument
static TEMPLATE_PATTERNS: Lazy<Vec<(StepKind, Regex, usize)>> = Lazy::new(|| {
    StepKind::ALL
        .iter()
        .flat_map(|kind| {
            std::iter::once(kind.template())
                .chain(kind.aliases().iter().copied())
                .filter_map(move |template| {
                    compile_template(template).map(|(re, literal_len)| (*kind, re, literal_len))
                })
        })
        .collect()
});

/// Anchored regex for a template and the length of its literal text
fn compile_template(template: &str) -> Option<(Regex, usize)> {
    let mut pattern = String::from("^");
    let mut literal_len = 0;
    let mut rest = template;
    while let Some(start) = rest.find("\"{") {
        let Some(end) = rest[start..].find("}\"") else {
            break;
        };
        pattern.push_str(&regex::escape(&rest[..start]));
        pattern.push_str("\"(.*?)\"");
        literal_len += start;
        rest = &rest[start + end + 2..];
    }
    pattern.push_str(&regex::escape(rest));
    pattern.push('$');
    literal_len += rest.len();
    Regex::new(&pattern).ok().map(|re| (re, literal_len))
}

/// A step with its arguments already extracted from the sentence
///
/// Serializes as `{"kind": "Address", "args": ["http://localhost"]}` so a
/// front end running elsewhere can ship recorded steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub kind: StepKind,
    pub args: Vec<String>,
}

impl Step {
    pub fn new<I, S>(kind: StepKind, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Match a sentence against every template
    ///
    /// When several templates match, the one with the most literal text
    /// wins, so `I store "/a" from response under "b"` is not read as a
    /// plain `I store "{value}" under "{name}"`.
    pub fn from_sentence(sentence: &str) -> Option<Self> {
        let sentence = sentence.trim();
        TEMPLATE_PATTERNS
            .iter()
            .filter_map(|(kind, re, literal_len)| {
                re.captures(sentence).map(|caps| {
                    let args = caps
                        .iter()
                        .skip(1)
                        .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                        .collect::<Vec<_>>();
                    (*literal_len, Step { kind: *kind, args })
                })
            })
            .max_by_key(|(literal_len, _)| *literal_len)
            .map(|(_, step)| step)
    }
}

/// Runs steps against a context, sending requests through an executor
pub struct StepRunner {
    executor: Box<dyn HttpExecutor>,
}

impl StepRunner {
    pub fn new(executor: impl HttpExecutor + 'static) -> Self {
        Self {
            executor: Box::new(executor),
        }
    }

    pub fn executor(&self) -> &dyn HttpExecutor {
        self.executor.as_ref()
    }

    /// Check arity, resolve arguments, run the handler
    pub fn run(&self, ctx: &mut TestContext, step: &Step) -> Result<()> {
        let kind = step.kind;
        if step.args.len() != kind.arity() {
            return Err(ApiTestError::Arity {
                template: kind.template(),
                expected: kind.arity(),
                actual: step.args.len(),
            });
        }

        let args = if kind.resolves_arguments() {
            ctx.resolver().resolve_all(&step.args)?
        } else {
            step.args.clone()
        };

        debug!(step = kind.template(), args = ?args, "Running step");

        let result = match kind.group() {
            StepGroup::Common => common::run(ctx, self.executor(), kind, &args),
            StepGroup::Json => json::run(ctx, kind, &args),
            StepGroup::Xml => xml::run(ctx, kind, &args),
        };

        if let Err(e) = &result {
            warn!(step = kind.template(), error = %e, "Step failed");
        }
        result
    }

    /// Run steps in order, stopping at the first failure
    pub fn run_all(&self, ctx: &mut TestContext, steps: &[Step]) -> Result<()> {
        for step in steps {
            self.run(ctx, step)?;
        }
        Ok(())
    }
}

/// Error for a step routed to the wrong handler module
fn unsupported(kind: StepKind) -> ApiTestError {
    ApiTestError::InvalidArgument(format!("Step `{}` is not handled here", kind.template()))
}

//! XPath subset over [`XmlDocument`]
//!
//! Supported location paths:
//! - `/a/b`, `a/b`, `//b`, `a//b`, `.`, `..`, `*`
//! - `prefix:name` and `prefix:*`, with prefixes taken from the namespace map
//! - `@attr`, `@prefix:attr`, `@*` as the last step
//! - predicates `[2]`, `[last()]`, `[name]`, `[@attr]`, `[text()]`,
//!   `[name='v']`, `[@attr='v']`, `[text()='v']`, `[.='v']`
//!
//! Absolute paths start at the document, relative ones at the root element.
//! An unprefixed name only matches elements outside any namespace.

use indexmap::IndexMap;
use winnow::ascii::{digit1, multispace0};
use winnow::combinator::{alt, delimited, opt, preceded, repeat};
use winnow::prelude::*;
use winnow::token::{take_till, take_while};
use winnow::ModalResult;

use crate::errors::{ApiTestError, Result};
use crate::format::xml::{Element, XmlDocument};
use crate::strings::{truncate_str, MAX_DIAGNOSTIC_LEN};

/// Namespace prefix to URI
pub type Namespaces = IndexMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
struct NameTest {
    prefix: Option<String>,
    /// `None` for `*`
    local: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Axis {
    Child,
    /// The step followed `//`
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeTest {
    Element(NameTest),
    Attribute(NameTest),
    SelfNode,
    Parent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Operand {
    Child(NameTest),
    Attribute(NameTest),
    Text,
    SelfNode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Position(usize),
    Last,
    Exists(Operand),
    Equals(Operand, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Predicate>,
}

/// Address of a selected node: child indices from the root element, plus the
/// attribute index when an attribute was selected
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeAddr {
    pub path: Vec<usize>,
    pub attr: Option<usize>,
}

/// A compiled path expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPath {
    source: String,
    absolute: bool,
    steps: Vec<Step>,
}

// ---------------------------------------------------------------------------
// Parsing

fn ncname<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    (
        take_while(1, |c: char| c.is_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_alphanumeric() || matches!(c, '_' | '-' | '.')),
    )
        .take()
        .parse_next(input)
}

fn local_part(input: &mut &str) -> ModalResult<Option<String>> {
    alt(('*'.value(None), ncname.map(|s: &str| Some(s.to_string())))).parse_next(input)
}

fn name_test(input: &mut &str) -> ModalResult<NameTest> {
    alt((
        '*'.value(NameTest {
            prefix: None,
            local: None,
        }),
        (ncname, opt(preceded(':', local_part))).map(|(first, rest): (&str, Option<Option<String>>)| {
            match rest {
                Some(local) => NameTest {
                    prefix: Some(first.to_string()),
                    local,
                },
                None => NameTest {
                    prefix: None,
                    local: Some(first.to_string()),
                },
            }
        }),
    ))
    .parse_next(input)
}

fn literal(input: &mut &str) -> ModalResult<String> {
    alt((
        delimited('"', take_till(0.., '"'), '"'),
        delimited('\'', take_till(0.., '\''), '\''),
    ))
    .map(|s: &str| s.to_string())
    .parse_next(input)
}

fn operand(input: &mut &str) -> ModalResult<Operand> {
    alt((
        "text()".value(Operand::Text),
        preceded('@', name_test).map(Operand::Attribute),
        '.'.value(Operand::SelfNode),
        name_test.map(Operand::Child),
    ))
    .parse_next(input)
}

fn predicate_body(input: &mut &str) -> ModalResult<Predicate> {
    alt((
        digit1.try_map(|s: &str| s.parse::<usize>()).map(Predicate::Position),
        "last()".value(Predicate::Last),
        (operand, opt(preceded((multispace0, '=', multispace0), literal))).map(
            |(operand, literal)| match literal {
                Some(value) => Predicate::Equals(operand, value),
                None => Predicate::Exists(operand),
            },
        ),
    ))
    .parse_next(input)
}

fn predicate(input: &mut &str) -> ModalResult<Predicate> {
    delimited(('[', multispace0), predicate_body, (multispace0, ']')).parse_next(input)
}

fn node_test(input: &mut &str) -> ModalResult<NodeTest> {
    alt((
        "..".value(NodeTest::Parent),
        '.'.value(NodeTest::SelfNode),
        preceded('@', name_test).map(NodeTest::Attribute),
        name_test.map(NodeTest::Element),
    ))
    .parse_next(input)
}

fn step_body(input: &mut &str) -> ModalResult<(NodeTest, Vec<Predicate>)> {
    (node_test, repeat(0.., predicate)).parse_next(input)
}

fn separator(input: &mut &str) -> ModalResult<Axis> {
    alt(("//".value(Axis::Descendant), '/'.value(Axis::Child))).parse_next(input)
}

fn location_path(input: &mut &str) -> ModalResult<(bool, Vec<Step>)> {
    let leading = opt(separator).parse_next(input)?;
    let (test, predicates) = step_body.parse_next(input)?;

    let mut steps = vec![Step {
        axis: leading.clone().unwrap_or(Axis::Child),
        test,
        predicates,
    }];

    let rest: Vec<(Axis, (NodeTest, Vec<Predicate>))> =
        repeat(0.., (separator, step_body)).parse_next(input)?;
    steps.extend(rest.into_iter().map(|(axis, (test, predicates))| Step {
        axis,
        test,
        predicates,
    }));

    Ok((leading.is_some(), steps))
}

impl XPath {
    pub fn parse(expr: &str) -> Result<Self> {
        let invalid = |reason: String| ApiTestError::InvalidPath {
            path: expr.to_string(),
            reason,
        };

        let mut input = expr.trim();
        let (absolute, steps) = location_path(&mut input).map_err(|e| invalid(e.to_string()))?;
        if !input.is_empty() {
            return Err(invalid(format!("unexpected `{}`", input)));
        }

        if let Some(pos) = steps.iter().position(|s| matches!(s.test, NodeTest::Attribute(_))) {
            if pos + 1 != steps.len() {
                return Err(invalid("an attribute step must come last".to_string()));
            }
        }

        Ok(Self {
            source: expr.to_string(),
            absolute,
            steps,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    fn check_prefixes(&self, namespaces: &Namespaces) -> Result<()> {
        let mut tests = Vec::new();
        for step in &self.steps {
            match &step.test {
                NodeTest::Element(t) | NodeTest::Attribute(t) => tests.push(t),
                _ => {}
            }
            for predicate in &step.predicates {
                match predicate {
                    Predicate::Exists(Operand::Child(t) | Operand::Attribute(t))
                    | Predicate::Equals(Operand::Child(t) | Operand::Attribute(t), _) => tests.push(t),
                    _ => {}
                }
            }
        }

        for test in tests {
            if let Some(prefix) = &test.prefix {
                if !namespaces.contains_key(prefix) {
                    return Err(ApiTestError::InvalidPath {
                        path: self.source.clone(),
                        reason: format!("undefined namespace prefix `{}`", prefix),
                    });
                }
            }
        }
        Ok(())
    }

    /// Every node the path selects, in document order
    pub fn select(&self, doc: &XmlDocument, namespaces: &Namespaces) -> Result<Vec<NodeAddr>> {
        self.check_prefixes(namespaces)?;

        let eval = Evaluator { doc, namespaces };
        let mut context = vec![if self.absolute {
            Ctx::Document
        } else {
            Ctx::Element(Vec::new())
        }];

        for step in &self.steps {
            let mut next = Vec::new();
            for node in &context {
                let bases = match step.axis {
                    Axis::Child => vec![node.clone()],
                    Axis::Descendant => eval.descendants_or_self(node),
                };
                for base in &bases {
                    let candidates = eval.apply_test(base, &step.test);
                    next.extend(eval.filter(candidates, &step.predicates));
                }
            }
            next.sort_by_key(Ctx::sort_key);
            next.dedup();
            context = next;
        }

        Ok(context.into_iter().filter_map(Ctx::into_addr).collect())
    }

    /// The single node the path selects
    pub fn select_one(&self, doc: &XmlDocument, namespaces: &Namespaces) -> Result<NodeAddr> {
        let mut found = self.select(doc, namespaces)?;
        match found.len() {
            1 => Ok(found.remove(0)),
            0 => Err(ApiTestError::PathNotFound {
                path: self.source.clone(),
                document: describe(doc, namespaces),
            }),
            count => Err(ApiTestError::AmbiguousPath {
                path: self.source.clone(),
                count,
                document: describe(doc, namespaces),
            }),
        }
    }
}

fn describe(doc: &XmlDocument, namespaces: &Namespaces) -> String {
    let text = truncate_str(&doc.to_xml_string(), MAX_DIAGNOSTIC_LEN);
    if namespaces.is_empty() {
        text
    } else {
        format!("{}` with namespaces `{:?}", text, namespaces)
    }
}

// ---------------------------------------------------------------------------
// Evaluation

#[derive(Debug, Clone, PartialEq, Eq)]
enum Ctx {
    Document,
    Element(Vec<usize>),
    Attribute(Vec<usize>, usize),
}

impl Ctx {
    fn sort_key(&self) -> Option<NodeAddr> {
        match self {
            Ctx::Document => None,
            Ctx::Element(path) => Some(NodeAddr {
                path: path.clone(),
                attr: None,
            }),
            Ctx::Attribute(path, idx) => Some(NodeAddr {
                path: path.clone(),
                attr: Some(*idx),
            }),
        }
    }

    fn into_addr(self) -> Option<NodeAddr> {
        match self {
            Ctx::Document => None,
            Ctx::Element(path) => Some(NodeAddr { path, attr: None }),
            Ctx::Attribute(path, idx) => Some(NodeAddr { path, attr: Some(idx) }),
        }
    }
}

struct Evaluator<'a> {
    doc: &'a XmlDocument,
    namespaces: &'a Namespaces,
}

impl<'a> Evaluator<'a> {
    fn element(&self, path: &[usize]) -> Option<&'a Element> {
        self.doc.element(path)
    }

    fn name_matches(&self, test: &NameTest, namespace: Option<&str>, local: &str) -> bool {
        let wanted_ns = test
            .prefix
            .as_ref()
            .and_then(|p| self.namespaces.get(p))
            .map(String::as_str);

        // `*` alone matches any name in any namespace.
        let namespace_ok = match (&test.prefix, &test.local) {
            (None, None) => true,
            _ => wanted_ns == namespace,
        };
        let local_ok = test.local.as_deref().map_or(true, |l| l == local);
        namespace_ok && local_ok
    }

    fn child_elements(&self, node: &Ctx) -> Vec<(Vec<usize>, &'a Element)> {
        match node {
            Ctx::Document => vec![(Vec::new(), &self.doc.root)],
            Ctx::Element(path) => match self.element(path) {
                Some(parent) => parent
                    .child_elements()
                    .map(|(idx, child)| {
                        let mut child_path = path.clone();
                        child_path.push(idx);
                        (child_path, child)
                    })
                    .collect(),
                None => Vec::new(),
            },
            Ctx::Attribute(..) => Vec::new(),
        }
    }

    fn descendants_or_self(&self, node: &Ctx) -> Vec<Ctx> {
        let mut out = vec![node.clone()];
        let mut pending = self.child_elements(node);
        pending.reverse();
        while let Some((path, _)) = pending.pop() {
            let ctx = Ctx::Element(path);
            let mut children = self.child_elements(&ctx);
            children.reverse();
            out.push(ctx);
            pending.extend(children);
        }
        out
    }

    fn apply_test(&self, node: &Ctx, test: &NodeTest) -> Vec<Ctx> {
        match test {
            NodeTest::SelfNode => vec![node.clone()],
            NodeTest::Parent => match node {
                Ctx::Document => Vec::new(),
                Ctx::Element(path) if path.is_empty() => vec![Ctx::Document],
                Ctx::Element(path) => vec![Ctx::Element(path[..path.len() - 1].to_vec())],
                Ctx::Attribute(path, _) => vec![Ctx::Element(path.clone())],
            },
            NodeTest::Element(name) => self
                .child_elements(node)
                .into_iter()
                .filter(|(_, e)| self.name_matches(name, e.namespace.as_deref(), &e.local_name))
                .map(|(path, _)| Ctx::Element(path))
                .collect(),
            NodeTest::Attribute(name) => match node {
                Ctx::Element(path) => match self.element(path) {
                    Some(element) => element
                        .plain_attributes()
                        .filter(|(_, a)| self.name_matches(name, a.namespace.as_deref(), &a.local_name))
                        .map(|(idx, _)| Ctx::Attribute(path.clone(), idx))
                        .collect(),
                    None => Vec::new(),
                },
                _ => Vec::new(),
            },
        }
    }

    fn filter(&self, mut candidates: Vec<Ctx>, predicates: &[Predicate]) -> Vec<Ctx> {
        for predicate in predicates {
            let total = candidates.len();
            candidates = candidates
                .into_iter()
                .enumerate()
                .filter(|(idx, node)| match predicate {
                    Predicate::Position(n) => idx + 1 == *n,
                    Predicate::Last => idx + 1 == total,
                    Predicate::Exists(operand) => !self.operand_values(node, operand).is_empty(),
                    Predicate::Equals(operand, value) => {
                        self.operand_values(node, operand).iter().any(|v| v == value)
                    }
                })
                .map(|(_, node)| node)
                .collect();
        }
        candidates
    }

    /// String values an operand yields for a node
    fn operand_values(&self, node: &Ctx, operand: &Operand) -> Vec<String> {
        match operand {
            Operand::SelfNode => self.string_value(node).into_iter().collect(),
            Operand::Text => match node {
                Ctx::Element(path) => self
                    .element(path)
                    .map(|e| e.text_runs())
                    .unwrap_or_default(),
                _ => Vec::new(),
            },
            Operand::Child(name) => self
                .apply_test(node, &NodeTest::Element(name.clone()))
                .iter()
                .filter_map(|child| self.string_value(child))
                .collect(),
            Operand::Attribute(name) => self
                .apply_test(node, &NodeTest::Attribute(name.clone()))
                .iter()
                .filter_map(|attr| self.string_value(attr))
                .collect(),
        }
    }

    fn string_value(&self, node: &Ctx) -> Option<String> {
        match node {
            Ctx::Document => Some(self.doc.root.string_value()),
            Ctx::Element(path) => self.element(path).map(Element::string_value),
            Ctx::Attribute(path, idx) => self
                .element(path)
                .and_then(|e| e.attributes.get(*idx))
                .map(|a| a.value.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Values

/// Value of a selected node: leading text for elements, text for attributes
pub fn node_value(doc: &XmlDocument, addr: &NodeAddr) -> Option<String> {
    let element = doc.element(&addr.path)?;
    match addr.attr {
        Some(idx) => element.attributes.get(idx).map(|a| a.value.clone()),
        None => Some(element.text()),
    }
}

/// Replace the value of a selected node
pub fn set_node_value(doc: &mut XmlDocument, addr: &NodeAddr, value: &str) -> bool {
    let Some(element) = doc.element_mut(&addr.path) else {
        return false;
    };
    match addr.attr {
        Some(idx) => match element.attributes.get_mut(idx) {
            Some(attr) => {
                attr.value = value.to_string();
                true
            }
            None => false,
        },
        None => {
            element.set_text(value);
            true
        }
    }
}

/// Value of the single node `expr` selects
pub fn get(doc: &XmlDocument, expr: &str, namespaces: &Namespaces) -> Result<String> {
    let xpath = XPath::parse(expr)?;
    let addr = xpath.select_one(doc, namespaces)?;
    node_value(doc, &addr).ok_or_else(|| ApiTestError::PathNotFound {
        path: expr.to_string(),
        document: describe(doc, namespaces),
    })
}

/// Set the value of the single node `expr` selects
pub fn set(doc: &mut XmlDocument, expr: &str, namespaces: &Namespaces, value: &str) -> Result<()> {
    let xpath = XPath::parse(expr)?;
    let addr = xpath.select_one(doc, namespaces)?;
    if set_node_value(doc, &addr, value) {
        Ok(())
    } else {
        Err(ApiTestError::PathNotFound {
            path: expr.to_string(),
            document: describe(doc, namespaces),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUSTOMERS: &str = r#"<cust:list xmlns:cust="urn:customers" xmlns:o="urn:other">
  <cust:customer id="1" tier="gold"><cust:name>Anna</cust:name><cust:city>Oslo</cust:city></cust:customer>
  <cust:customer id="2"><cust:name>Ben</cust:name><cust:city>Rome</cust:city></cust:customer>
  <o:name>Other</o:name>
  <plain>text<child>inner</child></plain>
</cust:list>"#;

    fn ns() -> Namespaces {
        let mut ns = Namespaces::new();
        ns.insert("cust".to_string(), "urn:customers".to_string());
        ns
    }

    fn doc() -> XmlDocument {
        XmlDocument::parse(CUSTOMERS).unwrap()
    }

    #[test]
    fn test_descendant_name_ambiguous() {
        let err = get(&doc(), "//cust:name", &ns()).unwrap_err();
        assert!(matches!(err, ApiTestError::AmbiguousPath { count: 2, .. }));
    }

    #[test]
    fn test_descendant_name_missing() {
        let doc = XmlDocument::parse(r#"<cust:list xmlns:cust="urn:customers"><cust:id>1</cust:id></cust:list>"#).unwrap();
        let err = get(&doc, "//cust:name", &ns()).unwrap_err();
        assert!(matches!(err, ApiTestError::PathNotFound { .. }));
    }

    #[test]
    fn test_predicates() {
        let doc = doc();
        assert_eq!(get(&doc, "//cust:customer[@id='2']/cust:name", &ns()).unwrap(), "Ben");
        assert_eq!(get(&doc, "//cust:customer[2]/cust:city", &ns()).unwrap(), "Rome");
        assert_eq!(get(&doc, "//cust:customer[last()]/@id", &ns()).unwrap(), "2");
        assert_eq!(get(&doc, "//cust:customer[@tier]/cust:name", &ns()).unwrap(), "Anna");
        assert_eq!(get(&doc, "//cust:customer[cust:city='Oslo']/@id", &ns()).unwrap(), "1");
        assert_eq!(get(&doc, "//cust:name[text()='Ben']/../@id", &ns()).unwrap(), "2");
        assert_eq!(get(&doc, "//cust:name[.='Anna']/../cust:city", &ns()).unwrap(), "Oslo");
    }

    #[test]
    fn test_absolute_and_relative() {
        let doc = doc();
        assert_eq!(get(&doc, "/cust:list/plain", &ns()).unwrap(), "text");
        assert_eq!(get(&doc, "plain/child", &ns()).unwrap(), "inner");
        assert_eq!(get(&doc, "./plain/child", &ns()).unwrap(), "inner");
    }

    #[test]
    fn test_unprefixed_name_ignores_namespaced_elements() {
        let doc = doc();
        let found = XPath::parse("//name").unwrap().select(&doc, &ns()).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_wildcards() {
        let doc = doc();
        let all = XPath::parse("/cust:list/*").unwrap().select(&doc, &ns()).unwrap();
        assert_eq!(all.len(), 4);
        let in_ns = XPath::parse("/cust:list/cust:*").unwrap().select(&doc, &ns()).unwrap();
        assert_eq!(in_ns.len(), 2);
        let attrs = XPath::parse("//cust:customer[1]/@*").unwrap().select(&doc, &ns()).unwrap();
        assert_eq!(attrs.len(), 2);
    }

    #[test]
    fn test_unknown_prefix() {
        let err = get(&doc(), "//x:name", &ns()).unwrap_err();
        assert!(matches!(err, ApiTestError::InvalidPath { .. }));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(XPath::parse("//a[").is_err());
        assert!(XPath::parse("a/@b/c").is_err());
        assert!(XPath::parse("a b").is_err());
        assert!(XPath::parse("").is_err());
    }

    #[test]
    fn test_set_element_and_attribute() {
        let mut doc = doc();
        set(&mut doc, "//cust:customer[@id='1']/cust:city", &ns(), "Bergen").unwrap();
        set(&mut doc, "//cust:customer[2]/@id", &ns(), "20").unwrap();
        assert_eq!(get(&doc, "//cust:customer[@id='1']/cust:city", &ns()).unwrap(), "Bergen");
        assert_eq!(get(&doc, "//cust:customer[@id='20']/cust:name", &ns()).unwrap(), "Ben");
        assert!(doc.to_xml_string().contains("<cust:city>Bergen</cust:city>"));
    }

    #[test]
    fn test_document_order_after_union() {
        let doc = XmlDocument::parse("<a><b><c>1</c></b><b><c>2</c></b></a>").unwrap();
        let found = XPath::parse("//b//c").unwrap().select(&doc, &Namespaces::new()).unwrap();
        let values: Vec<String> = found.iter().map(|a| node_value(&doc, a).unwrap()).collect();
        assert_eq!(values, vec!["1", "2"]);
    }
}

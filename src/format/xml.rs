//! Owned XML element tree
//!
//! Documents are read with quick-xml into a tree that keeps every element's
//! resolved namespace, so XPath name tests can match on namespace URI rather
//! than on whatever prefix the document happened to use. The tree can be
//! edited in place and written back out.

use std::fmt;

use quick_xml::escape::{escape, partial_escape, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::errors::{ApiTestError, Result};

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// A node inside an element
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
}

/// An attribute with its namespace resolved
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Name as written, e.g. `xsi:type`
    pub name: String,
    pub prefix: Option<String>,
    pub local_name: String,
    pub namespace: Option<String>,
    pub value: String,
}

impl Attribute {
    /// `xmlns` and `xmlns:*` declarations
    pub fn is_namespace_declaration(&self) -> bool {
        self.name == "xmlns" || self.prefix.as_deref() == Some("xmlns")
    }
}

/// An element with its namespace resolved
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Name as written, e.g. `soap:Envelope`
    pub name: String,
    pub prefix: Option<String>,
    pub local_name: String,
    pub namespace: Option<String>,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl Element {
    /// Text before the first child element or comment, empty if none
    pub fn text(&self) -> String {
        let mut text = String::new();
        for child in &self.children {
            match child {
                Node::Text(t) | Node::CData(t) => text.push_str(t),
                _ => break,
            }
        }
        text
    }

    /// Replace the leading text, keeping child elements
    pub fn set_text(&mut self, value: &str) {
        let leading = self
            .children
            .iter()
            .take_while(|child| matches!(child, Node::Text(_) | Node::CData(_)))
            .count();
        self.children.drain(..leading);
        if !value.is_empty() {
            self.children.insert(0, Node::Text(value.to_string()));
        }
    }

    /// All text inside this element and its descendants
    pub fn string_value(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Child elements with their index in `children`
    pub fn child_elements(&self) -> impl Iterator<Item = (usize, &Element)> {
        self.children.iter().enumerate().filter_map(|(idx, node)| match node {
            Node::Element(e) => Some((idx, e)),
            _ => None,
        })
    }

    /// Runs of direct text, split wherever a non-text child sits
    pub fn text_runs(&self) -> Vec<String> {
        let mut runs = Vec::new();
        let mut current: Option<String> = None;
        for child in &self.children {
            match child {
                Node::Text(t) | Node::CData(t) => current.get_or_insert_with(String::new).push_str(t),
                _ => runs.extend(current.take()),
            }
        }
        runs.extend(current);
        runs
    }

    /// Attributes other than namespace declarations
    pub fn plain_attributes(&self) -> impl Iterator<Item = (usize, &Attribute)> {
        self.attributes
            .iter()
            .enumerate()
            .filter(|(_, attr)| !attr.is_namespace_declaration())
    }

    fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for attr in &self.attributes {
            out.push(' ');
            out.push_str(&attr.name);
            out.push_str("=\"");
            out.push_str(&escape(attr.value.as_str()));
            out.push('"');
        }

        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }

        out.push('>');
        for child in &self.children {
            match child {
                Node::Element(e) => e.write_to(out),
                Node::Text(t) => out.push_str(&partial_escape(t.as_str())),
                Node::CData(t) => {
                    out.push_str("<![CDATA[");
                    out.push_str(t);
                    out.push_str("]]>");
                }
                Node::Comment(t) => {
                    out.push_str("<!--");
                    out.push_str(t);
                    out.push_str("-->");
                }
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

fn collect_text(element: &Element, out: &mut String) {
    for child in &element.children {
        match child {
            Node::Text(t) | Node::CData(t) => out.push_str(t),
            Node::Element(e) => collect_text(e, out),
            Node::Comment(_) => {}
        }
    }
}

/// A parsed XML document
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    pub root: Element,
}

impl XmlDocument {
    pub fn parse(text: &str) -> Result<Self> {
        Parser::default().run(text)
    }

    /// Element reached by following child indices from the root
    pub fn element(&self, path: &[usize]) -> Option<&Element> {
        let mut current = &self.root;
        for idx in path {
            current = match current.children.get(*idx)? {
                Node::Element(e) => e,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn element_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let mut current = &mut self.root;
        for idx in path {
            current = match current.children.get_mut(*idx)? {
                Node::Element(e) => e,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        self.root.write_to(&mut out);
        out
    }
}

impl fmt::Display for XmlDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_xml_string())
    }
}

type Scope = Vec<(Option<String>, String)>;

#[derive(Default)]
struct Parser {
    scopes: Vec<Scope>,
    stack: Vec<Element>,
    root: Option<Element>,
}

impl Parser {
    fn run(mut self, text: &str) -> Result<XmlDocument> {
        let mut reader = Reader::from_str(text);

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    let element = self.open(e)?;
                    self.stack.push(element);
                }
                Ok(Event::Empty(ref e)) => {
                    let element = self.open(e)?;
                    self.scopes.pop();
                    self.attach(Node::Element(element))?;
                }
                Ok(Event::End(_)) => {
                    let element = self
                        .stack
                        .pop()
                        .ok_or_else(|| ApiTestError::XmlParse("Unexpected closing tag".to_string()))?;
                    self.scopes.pop();
                    self.attach(Node::Element(element))?;
                }
                Ok(Event::Text(ref e)) => {
                    let raw = String::from_utf8_lossy(e.as_ref());
                    let text = unescape(&raw)
                        .map_err(|e| ApiTestError::XmlParse(e.to_string()))?
                        .into_owned();
                    self.attach(Node::Text(text))?;
                }
                Ok(Event::GeneralRef(ref e)) => {
                    let entity = format!("&{};", String::from_utf8_lossy(e.as_ref()));
                    let text = unescape(&entity)
                        .map_err(|e| ApiTestError::XmlParse(e.to_string()))?
                        .into_owned();
                    self.attach(Node::Text(text))?;
                }
                Ok(Event::CData(ref e)) => {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    self.attach(Node::CData(text))?;
                }
                Ok(Event::Comment(ref e)) => {
                    if !self.stack.is_empty() {
                        let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                        self.attach(Node::Comment(text))?;
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(ApiTestError::XmlParse(format!(
                        "{} at position {}",
                        e,
                        reader.error_position()
                    )))
                }
                _ => {}
            }
        }

        if let Some(open) = self.stack.last() {
            return Err(ApiTestError::XmlParse(format!("Unclosed element `{}`", open.name)));
        }

        self.root
            .map(|root| XmlDocument { root })
            .ok_or_else(|| ApiTestError::XmlParse("No root element".to_string()))
    }

    /// Build an element from its start tag and push its namespace scope
    fn open(&mut self, start: &BytesStart) -> Result<Element> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();

        let mut raw_attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| ApiTestError::XmlParse(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let raw = String::from_utf8_lossy(&attr.value);
            let value = unescape(&raw)
                .map_err(|e| ApiTestError::XmlParse(e.to_string()))?
                .into_owned();
            raw_attributes.push((key, value));
        }

        let scope: Scope = raw_attributes
            .iter()
            .filter_map(|(key, value)| {
                if key == "xmlns" {
                    Some((None, value.clone()))
                } else {
                    key.strip_prefix("xmlns:")
                        .map(|prefix| (Some(prefix.to_string()), value.clone()))
                }
            })
            .collect();
        self.scopes.push(scope);

        let (prefix, local_name) = split_name(&name);
        let namespace = self.resolve(prefix.as_deref(), true, &name)?;

        let mut attributes = Vec::with_capacity(raw_attributes.len());
        for (key, value) in raw_attributes {
            let (attr_prefix, attr_local) = split_name(&key);
            let attr_namespace = match attr_prefix.as_deref() {
                None | Some("xmlns") => None,
                Some(p) => self.resolve(Some(p), false, &key)?,
            };
            attributes.push(Attribute {
                name: key,
                prefix: attr_prefix,
                local_name: attr_local,
                namespace: attr_namespace,
                value,
            });
        }

        Ok(Element {
            name,
            prefix,
            local_name,
            namespace,
            attributes,
            children: Vec::new(),
        })
    }

    fn resolve(&self, prefix: Option<&str>, use_default: bool, name: &str) -> Result<Option<String>> {
        if prefix == Some("xml") {
            return Ok(Some(XML_NAMESPACE.to_string()));
        }
        if prefix.is_none() && !use_default {
            return Ok(None);
        }

        for scope in self.scopes.iter().rev() {
            for (declared, uri) in scope.iter().rev() {
                if declared.as_deref() == prefix {
                    return Ok(if uri.is_empty() { None } else { Some(uri.clone()) });
                }
            }
        }

        match prefix {
            None => Ok(None),
            Some(p) => Err(ApiTestError::XmlParse(format!(
                "Unbound namespace prefix `{}` in `{}`",
                p, name
            ))),
        }
    }

    fn attach(&mut self, node: Node) -> Result<()> {
        if let Some(parent) = self.stack.last_mut() {
            // Entity references arrive as separate events; keep text contiguous.
            if let Node::Text(more) = &node {
                if let Some(Node::Text(previous)) = parent.children.last_mut() {
                    previous.push_str(more);
                    return Ok(());
                }
            }
            parent.children.push(node);
            return Ok(());
        }

        match node {
            Node::Element(element) => {
                if self.root.is_some() {
                    return Err(ApiTestError::XmlParse(format!(
                        "More than one root element, found `{}`",
                        element.name
                    )));
                }
                self.root = Some(element);
                Ok(())
            }
            Node::Text(t) if t.trim().is_empty() => Ok(()),
            Node::Text(t) | Node::CData(t) => Err(ApiTestError::XmlParse(format!(
                "Text outside the root element: `{}`",
                t.trim()
            ))),
            Node::Comment(_) => Ok(()),
        }
    }
}

fn split_name(name: &str) -> (Option<String>, String) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix.to_string()), local.to_string()),
        None => (None, name.to_string()),
    }
}

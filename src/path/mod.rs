//! Path queries and comparisons
//!
//! XPath for XML bodies, JSON Pointer for JSON bodies, and the comparison
//! functions assertion steps apply to whatever the path points at.

pub mod compare;
pub mod pointer;
pub mod xpath;

pub use compare::{Coercion, TextCheck};
pub use xpath::{Namespaces, NodeAddr, XPath};

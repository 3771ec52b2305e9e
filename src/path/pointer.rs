//! JSON Pointer (RFC 6901) lookups and updates

use serde_json::Value;

use crate::errors::{ApiTestError, Result};
use crate::strings::{truncate_str, MAX_DIAGNOSTIC_LEN};

fn validate(pointer: &str) -> Result<()> {
    if pointer.is_empty() || pointer.starts_with('/') {
        Ok(())
    } else {
        Err(ApiTestError::InvalidPath {
            path: pointer.to_string(),
            reason: "a JSON Pointer is empty or starts with `/`".to_string(),
        })
    }
}

fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Array index token: digits only, no leading zero
fn parse_index(token: &str) -> Option<usize> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if token.len() > 1 && token.starts_with('0') {
        return None;
    }
    token.parse().ok()
}

fn not_found(pointer: &str, document: &Value) -> ApiTestError {
    ApiTestError::PathNotFound {
        path: pointer.to_string(),
        document: truncate_str(&document.to_string(), MAX_DIAGNOSTIC_LEN),
    }
}

/// Value at `pointer`, `None` when the path does not exist
pub fn lookup<'a>(document: &'a Value, pointer: &str) -> Result<Option<&'a Value>> {
    validate(pointer)?;
    Ok(document.pointer(pointer))
}

/// Value at `pointer`, or the caller's sentinel when the path does not exist
///
/// Getting the sentinel back means "absent", which is a different outcome
/// from a present but empty value.
pub fn lookup_or<'a>(document: &'a Value, pointer: &str, default: &'a Value) -> Result<&'a Value> {
    Ok(lookup(document, pointer)?.unwrap_or(default))
}

/// Value at `pointer`, `PathNotFound` when absent
pub fn lookup_required<'a>(document: &'a Value, pointer: &str) -> Result<&'a Value> {
    lookup(document, pointer)?.ok_or_else(|| not_found(pointer, document))
}

/// Set the value at `pointer`
///
/// The parent must exist. The last token overwrites or creates an object
/// member, replaces an array element, or appends when it is `-` or equal to
/// the array length. The empty pointer replaces the whole document.
pub fn set(document: &mut Value, pointer: &str, value: Value) -> Result<()> {
    validate(pointer)?;

    if pointer.is_empty() {
        *document = value;
        return Ok(());
    }

    let (parent_pointer, last) = match pointer.rfind('/') {
        Some(idx) => (&pointer[..idx], unescape_token(&pointer[idx + 1..])),
        None => return Err(not_found(pointer, document)),
    };

    let parent = match document.pointer_mut(parent_pointer) {
        Some(parent) => parent,
        None => return Err(not_found(pointer, document)),
    };

    match parent {
        Value::Object(map) => {
            map.insert(last, value);
            Ok(())
        }
        Value::Array(items) => {
            if last == "-" {
                items.push(value);
                return Ok(());
            }
            let idx = parse_index(&last).ok_or_else(|| ApiTestError::InvalidPath {
                path: pointer.to_string(),
                reason: format!("`{}` is not an array index", last),
            })?;
            if idx < items.len() {
                items[idx] = value;
                Ok(())
            } else if idx == items.len() {
                items.push(value);
                Ok(())
            } else {
                Err(ApiTestError::PathNotFound {
                    path: pointer.to_string(),
                    document: format!("array of {} item(s)", items.len()),
                })
            }
        }
        other => Err(ApiTestError::InvalidPath {
            path: pointer.to_string(),
            reason: format!("cannot set a member of `{}`", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_nested() {
        let doc = json!({"a": {"b": "cc"}});
        assert_eq!(lookup(&doc, "/a/b").unwrap(), Some(&json!("cc")));
        assert_eq!(lookup(&doc, "/a/x").unwrap(), None);
    }

    #[test]
    fn test_lookup_or_sentinel() {
        let doc = json!({"a": {"b": "cc", "empty": ""}});
        let sentinel = json!("no-value-sentinel");
        assert_eq!(lookup_or(&doc, "/a/x", &sentinel).unwrap(), &sentinel);
        assert_eq!(lookup_or(&doc, "/a/empty", &sentinel).unwrap(), &json!(""));
    }

    #[test]
    fn test_lookup_required() {
        let doc = json!({"a": [1, 2]});
        assert_eq!(lookup_required(&doc, "/a/1").unwrap(), &json!(2));
        let err = lookup_required(&doc, "/a/5").unwrap_err();
        assert!(matches!(err, ApiTestError::PathNotFound { .. }));
    }

    #[test]
    fn test_escaped_tokens() {
        let doc = json!({"a/b": {"m~n": 1}});
        assert_eq!(lookup(&doc, "/a~1b/m~0n").unwrap(), Some(&json!(1)));
    }

    #[test]
    fn test_invalid_pointer() {
        let doc = json!({});
        assert!(matches!(
            lookup(&doc, "a/b").unwrap_err(),
            ApiTestError::InvalidPath { .. }
        ));
    }

    #[test]
    fn test_set_object_member() {
        let mut doc = json!({"hello": "world"});
        set(&mut doc, "/hello", json!("abc")).unwrap();
        set(&mut doc, "/new", json!(1)).unwrap();
        assert_eq!(doc, json!({"hello": "abc", "new": 1}));
    }

    #[test]
    fn test_set_array() {
        let mut doc = json!({"items": [1, 2]});
        set(&mut doc, "/items/0", json!(10)).unwrap();
        set(&mut doc, "/items/-", json!(3)).unwrap();
        set(&mut doc, "/items/3", json!(4)).unwrap();
        assert_eq!(doc, json!({"items": [10, 2, 3, 4]}));
        assert!(set(&mut doc, "/items/9", json!(0)).is_err());
    }

    #[test]
    fn test_set_rejects_non_canonical_indexes() {
        let mut doc = json!({"items": [1, 2]});
        for token in ["01", "00", "+1", " 1", ""] {
            let err = set(&mut doc, &format!("/items/{}", token), json!(0)).unwrap_err();
            assert!(matches!(err, ApiTestError::InvalidPath { .. }), "{:?}", token);
        }
        assert_eq!(lookup(&doc, "/items/01").unwrap(), None);
        assert_eq!(doc, json!({"items": [1, 2]}));
    }

    #[test]
    fn test_set_missing_parent() {
        let mut doc = json!({"a": {}});
        let err = set(&mut doc, "/a/b/c", json!(1)).unwrap_err();
        assert!(matches!(err, ApiTestError::PathNotFound { .. }));
    }

    #[test]
    fn test_set_whole_document() {
        let mut doc = json!({"a": 1});
        set(&mut doc, "", json!([1])).unwrap();
        assert_eq!(doc, json!([1]));
    }
}

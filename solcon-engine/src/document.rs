//! Reading and writing nested documents by path
//!
//! Documents are plain `serde_json::Value` trees (with `preserve_order`, so maps keep
//! their insertion order). Both directions tolerate the shape drift that descriptor
//! files show in practice:
//!
//! - a list index applied to a single value treats it as a one-element list
//! - a key applied to a list reduces the list to one object first: when every element
//!   is a map and there is more than one, the maps are merged (later keys win),
//!   otherwise the first element is used
//!
//! The merge is lossy on purpose: TOSCA often spells a map as a list of single-key
//! maps (`requirements: [{virtual_binding: c1}, {virtual_link: l1}]`).
//!
//! Writes can create missing structure. An absent or empty intermediate is
//! materialized by looking at the segment that comes next: an index means a list, a
//! key means a map.

use crate::error::{Diagnostics, EngineError, Warning};
use crate::path::{Path, Segment};
use serde_json::{Map, Value};
use std::borrow::Cow;

/// How [`read`] treats a miss and the shape of the result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// A miss is a [`EngineError::PathNotFound`] instead of `Ok(None)`
    pub required: bool,
    /// Merge a final list of maps into one map
    pub ensure_map: bool,
    /// Do not log misses
    pub silent: bool,
}

impl ReadOptions {
    pub fn required() -> Self {
        ReadOptions {
            required: true,
            ..Default::default()
        }
    }

    pub fn optional() -> Self {
        ReadOptions::default()
    }

    pub fn ensure_map(mut self) -> Self {
        self.ensure_map = true;
        self
    }

    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }
}

/// How [`write`] treats missing structure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    pub create_missing: bool,
    /// Element picked when a key meets a list
    pub list_elem: usize,
}

impl WriteOptions {
    pub fn create() -> Self {
        WriteOptions {
            create_missing: true,
            list_elem: 0,
        }
    }

    pub fn existing() -> Self {
        WriteOptions::default()
    }

    pub fn list_elem(mut self, index: usize) -> Self {
        self.list_elem = index;
        self
    }
}

/// Read the value at `path`
///
/// `null` counts as absent, while `0`, `false` and empty collections are values.
pub fn read(
    document: &Value,
    path: &Path,
    options: ReadOptions,
) -> Result<Option<Value>, EngineError> {
    let mut current: Cow<'_, Value> = Cow::Borrowed(document);

    for segment in path.segments() {
        let next = match &current {
            Cow::Borrowed(node) => step(*node, segment),
            Cow::Owned(node) => step(node, segment).map(|v| Cow::Owned(v.into_owned())),
        };
        match next {
            Some(value) if !value.is_null() => current = value,
            _ => {
                if options.required {
                    return Err(EngineError::not_found(segment, path));
                }
                if !options.silent {
                    log::debug!("'{}' not found while reading '{}'", segment, path);
                }
                return Ok(None);
            }
        }
    }

    let value = current.into_owned();
    if value.is_null() {
        if options.required {
            return Err(EngineError::not_found("", path));
        }
        return Ok(None);
    }
    if options.ensure_map {
        if let Value::Array(items) = &value {
            if let Some(merged) = merge_list_of_maps(items) {
                return Ok(Some(Value::Object(merged)));
            }
        }
    }
    Ok(Some(value))
}

fn step<'a>(node: &'a Value, segment: &Segment) -> Option<Cow<'a, Value>> {
    match segment {
        Segment::Index(index) => match node {
            Value::Array(items) => items.get(*index).map(Cow::Borrowed),
            Value::Null => None,
            single => (*index == 0).then_some(Cow::Borrowed(single)),
        },
        Segment::Key(key) => match node {
            Value::Object(map) => map.get(key).map(Cow::Borrowed),
            Value::Array(items) => match reduce_list(items)? {
                Cow::Borrowed(reduced) => reduced.get(key.as_str()).map(Cow::Borrowed),
                Cow::Owned(Value::Object(mut merged)) => merged.remove(key).map(Cow::Owned),
                Cow::Owned(_) => None,
            },
            _ => None,
        },
        Segment::Placeholder => None,
    }
}

fn reduce_list(items: &[Value]) -> Option<Cow<'_, Value>> {
    if items.len() > 1 {
        if let Some(merged) = merge_list_of_maps(items) {
            return Some(Cow::Owned(Value::Object(merged)));
        }
    }
    items.first().map(Cow::Borrowed)
}

/// Merge a list whose elements are all maps; later keys overwrite earlier ones
pub fn merge_list_of_maps(items: &[Value]) -> Option<Map<String, Value>> {
    let mut merged = Map::new();
    for item in items {
        let Value::Object(map) = item else {
            return None;
        };
        for (key, value) in map {
            merged.insert(key.clone(), value.clone());
        }
    }
    Some(merged)
}

/// Write `value` at `path`, replacing whatever was there
pub fn write(
    document: &mut Value,
    path: &Path,
    value: Value,
    options: WriteOptions,
) -> Result<(), EngineError> {
    write_at(document, path.segments(), value, path, options)
}

fn write_at(
    node: &mut Value,
    segments: &[Segment],
    value: Value,
    path: &Path,
    options: WriteOptions,
) -> Result<(), EngineError> {
    let Some((segment, rest)) = segments.split_first() else {
        *node = value;
        return Ok(());
    };

    match segment {
        Segment::Placeholder => Err(EngineError::mismatch(
            segment,
            path,
            "placeholder was never resolved",
        )),
        Segment::Index(index) => {
            if !node.is_array() {
                if !options.create_missing {
                    return Err(EngineError::mismatch(
                        segment,
                        path,
                        "list index applied to a non-list",
                    ));
                }
                let existing = node.take();
                *node = if is_truthy(&existing) || is_integer_zero(&existing) {
                    Value::Array(vec![existing])
                } else {
                    Value::Array(Vec::new())
                };
            }
            let Value::Array(items) = node else {
                return Err(EngineError::mismatch(segment, path, "expected a list"));
            };
            if *index >= items.len() {
                if !options.create_missing {
                    return Err(EngineError::mismatch(
                        segment,
                        path,
                        format!("index out of range for {} elements", items.len()),
                    ));
                }
                items.resize(*index + 1, Value::Null);
            }
            let child = &mut items[*index];
            if options.create_missing {
                materialize(child, rest);
            }
            write_at(child, rest, value, path, options)
        }
        Segment::Key(key) => match node {
            Value::Object(map) => {
                if !map.contains_key(key) {
                    if !options.create_missing {
                        return Err(EngineError::not_found(key, path));
                    }
                    map.insert(key.clone(), Value::Null);
                }
                let Some(child) = map.get_mut(key) else {
                    return Err(EngineError::not_found(key, path));
                };
                if options.create_missing {
                    materialize(child, rest);
                }
                write_at(child, rest, value, path, options)
            }
            Value::Array(items) => {
                if items.is_empty() && options.create_missing {
                    items.push(Value::Object(Map::new()));
                }
                let len = items.len();
                let Some(elem) = items.get_mut(options.list_elem) else {
                    return Err(EngineError::mismatch(
                        segment,
                        path,
                        format!(
                            "list element {} selected from {} elements",
                            options.list_elem, len
                        ),
                    ));
                };
                write_at(elem, segments, value, path, options)
            }
            Value::Null if options.create_missing => {
                *node = Value::Object(Map::new());
                write_at(node, segments, value, path, options)
            }
            _ => Err(EngineError::mismatch(
                segment,
                path,
                "key applied to a scalar",
            )),
        },
    }
}

/// Replace an empty intermediate with the container the next segment needs
///
/// Only null and empty strings or collections count as empty; `0` and `false` are
/// values and stay.
fn materialize(child: &mut Value, rest: &[Segment]) {
    let Some(next) = rest.first() else {
        return;
    };
    let empty = match &*child {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    };
    if !empty {
        return;
    }
    *child = match (next, &*child) {
        (Segment::Index(_), _) => Value::Array(Vec::new()),
        (_, Value::Array(_)) => Value::Array(vec![Value::Object(Map::new())]),
        _ => Value::Object(Map::new()),
    };
}

/// Loose truthiness: null, `false`, zero, and empty strings or collections are false
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map(|n| n != 0.0).unwrap_or(true),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn is_integer_zero(value: &Value) -> bool {
    value.as_i64() == Some(0) || value.as_u64() == Some(0)
}

/// Whether a pipeline result should reach the target
///
/// Everything falsy is suppressed except the integer `0`, which is a real value
/// (minimum instance counts, boot order positions).
pub fn should_write(value: Option<&Value>) -> bool {
    match value {
        None => false,
        Some(value) => is_integer_zero(value) || is_truthy(value),
    }
}

/// Turn a list of maps into a map keyed by the `key` field of each element
///
/// ```text
///     [{id: c1, min: 1}, {id: s3, min: 2}]  ->  {c1: {min: 1}, s3: {min: 2}}
/// ```
///
/// Elements without the field are skipped. Duplicate keys keep the last element.
pub fn merge_keyed_pairs(
    list: &Value,
    key: &str,
    diagnostics: &mut Diagnostics,
) -> Result<Map<String, Value>, EngineError> {
    let mut result = Map::new();
    let items = match list {
        Value::Null => return Ok(result),
        Value::Array(items) => items.as_slice(),
        single @ Value::Object(_) => std::slice::from_ref(single),
        _ => {
            return Err(EngineError::mismatch(
                key,
                "<keyed pairs>",
                "expected a list of maps",
            ))
        }
    };

    for item in items {
        let Some(map) = item.as_object() else {
            continue;
        };
        let Some(key_value) = map.get(key) else {
            continue;
        };
        let key_text = match key_value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        if result.contains_key(&key_text) {
            diagnostics.push(Warning::DuplicateKeyCollision {
                key: key_text.clone(),
                context: format!("entries keyed by '{}'", key),
            });
        }
        let rest: Map<String, Value> = map
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        result.insert(key_text, Value::Object(rest));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn p(text: &str) -> Path {
        Path::parse(text)
    }

    #[test]
    fn test_read_nested_values() {
        let doc = json!({"a": {"b": [10, 20, 30]}});
        assert_eq!(read(&doc, &p("a.b.1"), ReadOptions::required()).unwrap(), Some(json!(20)));
        assert_eq!(read(&doc, &p("a.c"), ReadOptions::optional()).unwrap(), None);
    }

    #[test]
    fn test_read_required_miss_names_segment() {
        let doc = json!({"a": {}});
        let err = read(&doc, &p("a.c.d"), ReadOptions::required()).unwrap_err();
        assert_eq!(
            err,
            EngineError::PathNotFound {
                segment: "c".to_string(),
                path: "a.c.d".to_string()
            }
        );
    }

    #[test]
    fn test_read_null_is_absent_but_zero_is_not() {
        let doc = json!({"n": null, "z": 0, "f": false, "e": []});
        assert_eq!(read(&doc, &p("n"), ReadOptions::optional()).unwrap(), None);
        assert_eq!(read(&doc, &p("z"), ReadOptions::optional()).unwrap(), Some(json!(0)));
        assert_eq!(read(&doc, &p("f"), ReadOptions::optional()).unwrap(), Some(json!(false)));
        assert_eq!(read(&doc, &p("e"), ReadOptions::optional()).unwrap(), Some(json!([])));
    }

    #[test]
    fn test_read_index_on_single_value() {
        let doc = json!({"a": {"b": "x"}});
        assert_eq!(read(&doc, &p("a.0.b"), ReadOptions::required()).unwrap(), Some(json!("x")));
        assert_eq!(read(&doc, &p("a.1"), ReadOptions::optional()).unwrap(), None);
    }

    #[test]
    fn test_read_key_on_list_merges_maps() {
        let doc = json!({"req": [{"virtual_binding": "c1"}, {"virtual_link": "l1"}]});
        assert_eq!(
            read(&doc, &p("req.virtual_link"), ReadOptions::required()).unwrap(),
            Some(json!("l1"))
        );
        let dup = json!({"req": [{"k": 1}, {"k": 2}]});
        assert_eq!(read(&dup, &p("req.k"), ReadOptions::required()).unwrap(), Some(json!(2)));
    }

    #[test]
    fn test_read_key_on_mixed_list_uses_first_element() {
        let doc = json!({"req": [{"k": 1}, "scalar"]});
        assert_eq!(read(&doc, &p("req.k"), ReadOptions::required()).unwrap(), Some(json!(1)));
    }

    #[test]
    fn test_read_ensure_map() {
        let doc = json!({"props": [{"a": 1}, {"b": 2}]});
        assert_eq!(
            read(&doc, &p("props"), ReadOptions::required().ensure_map()).unwrap(),
            Some(json!({"a": 1, "b": 2}))
        );
    }

    #[test]
    fn test_write_creates_missing_structure_by_lookahead() {
        let mut doc = json!({});
        write(&mut doc, &p("vnfd.vdu.0.id"), json!("c1"), WriteOptions::create()).unwrap();
        write(&mut doc, &p("vnfd.vdu.2.id"), json!("s3"), WriteOptions::create()).unwrap();
        assert_eq!(
            doc,
            json!({"vnfd": {"vdu": [{"id": "c1"}, null, {"id": "s3"}]}})
        );
    }

    #[test]
    fn test_write_without_create_fails() {
        let mut doc = json!({"a": {}});
        let err = write(&mut doc, &p("a.b.c"), json!(1), WriteOptions::existing()).unwrap_err();
        assert!(matches!(err, EngineError::PathNotFound { .. }));

        let mut doc = json!({"a": []});
        let err = write(&mut doc, &p("a.3"), json!(1), WriteOptions::existing()).unwrap_err();
        assert!(matches!(err, EngineError::StructuralMismatch { .. }));
    }

    #[test]
    fn test_write_key_on_list_selects_element() {
        let mut doc = json!({"a": [{"x": 1}, {"x": 2}]});
        write(&mut doc, &p("a.y"), json!(3), WriteOptions::create().list_elem(1)).unwrap();
        assert_eq!(doc, json!({"a": [{"x": 1}, {"x": 2, "y": 3}]}));

        let err = write(&mut doc, &p("a.y"), json!(3), WriteOptions::create().list_elem(5))
            .unwrap_err();
        assert!(matches!(err, EngineError::StructuralMismatch { .. }));
    }

    #[test]
    fn test_write_replaces_empty_intermediates() {
        let mut doc = json!({"a": "", "b": []});
        write(&mut doc, &p("a.0"), json!("x"), WriteOptions::create()).unwrap();
        write(&mut doc, &p("b.k"), json!("y"), WriteOptions::create()).unwrap();
        assert_eq!(doc, json!({"a": ["x"], "b": [{"k": "y"}]}));
    }

    #[test]
    fn test_write_keeps_zero_and_false_intermediates() {
        let mut doc = json!({"a": 0, "b": false});
        write(&mut doc, &p("a.1"), json!("x"), WriteOptions::create()).unwrap();
        assert_eq!(doc["a"], json!([0, "x"]));

        let err = write(&mut doc, &p("b.k"), json!("y"), WriteOptions::create()).unwrap_err();
        assert!(matches!(err, EngineError::StructuralMismatch { .. }));
        assert_eq!(doc["b"], json!(false));
    }

    #[test]
    fn test_write_index_wraps_single_value() {
        let mut doc = json!({"a": {"k": 1}});
        write(&mut doc, &p("a.1"), json!({"k": 2}), WriteOptions::create()).unwrap();
        assert_eq!(doc, json!({"a": [{"k": 1}, {"k": 2}]}));
    }

    #[test]
    fn test_write_key_on_scalar_is_mismatch() {
        let mut doc = json!({"a": 5});
        let err = write(&mut doc, &p("a.b"), json!(1), WriteOptions::existing()).unwrap_err();
        assert!(matches!(err, EngineError::StructuralMismatch { .. }));
    }

    #[test]
    fn test_should_write() {
        assert!(should_write(Some(&json!(0))));
        assert!(should_write(Some(&json!("x"))));
        assert!(should_write(Some(&json!([null]))));
        assert!(!should_write(None));
        assert!(!should_write(Some(&Value::Null)));
        assert!(!should_write(Some(&json!(""))));
        assert!(!should_write(Some(&json!([]))));
        assert!(!should_write(Some(&json!({}))));
        assert!(!should_write(Some(&json!(false))));
        assert!(!should_write(Some(&json!(0.0))));
    }

    #[test]
    fn test_merge_keyed_pairs() {
        let mut diag = Diagnostics::new();
        let list = json!([
            {"id": "c1", "min-number-of-instances": 1},
            {"max": 3},
            {"id": "s3", "min-number-of-instances": 2},
            {"id": "c1", "min-number-of-instances": 4}
        ]);
        let merged = merge_keyed_pairs(&list, "id", &mut diag).unwrap();
        assert_eq!(
            Value::Object(merged),
            json!({
                "c1": {"min-number-of-instances": 4},
                "s3": {"min-number-of-instances": 2}
            })
        );
        assert_eq!(diag.len(), 1);
        assert!(merge_keyed_pairs(&json!("x"), "id", &mut diag).is_err());
    }
}

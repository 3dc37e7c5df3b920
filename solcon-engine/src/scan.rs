//! Document scanning
//!
//! Finds every map in a document that satisfies a key/value condition (or a predicate),
//! no matter how deep it sits or how many lists and maps lie in between. This is how
//! repeated sibling structures are discovered: every node template of a given `type`,
//! every policy that targets a scaling aspect, and so on.
//!
//! # The Algorithm
//!
//! 1. Maps are tested first: if any of their entries satisfies the condition, the map is
//!    emitted together with the key it is stored under and the walk does not descend into
//!    it any further. Siblings and cousins are still visited.
//! 2. Otherwise every map-valued entry is walked with its key as the enclosing key.
//! 3. Lists are flattened: each element is walked on its own and its matches are
//!    appended to the same flat result. Elements have no enclosing key.
//! 4. Scalars are leaves and never match.
//!
//! With neither key nor value set, the predicate is the condition: it is tested against
//! each map-valued child wrapped as `{key: child}`. When a predicate accompanies a
//! key/value condition it filters the matches instead. The optional parent allow-list is
//! applied last.
//!
//! An empty result is a valid answer; callers decide whether that is an error.

use serde_json::{Map, Value};
use std::fmt;

/// Predicate over a wrapped `{key: node}` value
pub type Predicate = Box<dyn Fn(&Value) -> bool + Send + Sync>;

/// A single scan hit
#[derive(Debug, Clone, PartialEq)]
pub struct ScanMatch {
    /// Key the matched map is stored under, `None` for list elements and the root
    pub key: Option<String>,
    /// The matched map itself
    pub node: Value,
}

impl ScanMatch {
    /// The match as a document: `{key: node}` when there is an enclosing key
    pub fn to_value(&self) -> Value {
        match &self.key {
            Some(key) => {
                let mut wrapped = Map::new();
                wrapped.insert(key.clone(), self.node.clone());
                Value::Object(wrapped)
            }
            None => self.node.clone(),
        }
    }

    /// The representative name: the enclosing key, or else the node's first key
    pub fn name(&self) -> Option<&str> {
        match &self.key {
            Some(key) => Some(key.as_str()),
            None => self
                .node
                .as_object()
                .and_then(|map| map.keys().next())
                .map(String::as_str),
        }
    }
}

/// Search condition builder
///
/// ```text
/// Scan::new().key("type").value("cisco.nodes.nfv.Vdu.Compute").find(&tosca)
/// ```
#[derive(Default)]
pub struct Scan {
    key: Option<String>,
    value: Option<Value>,
    predicate: Option<Predicate>,
    parents: Option<Vec<String>>,
}

impl Scan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Box::new(predicate));
        self
    }

    /// Keep only matches whose enclosing key is one of `parents`
    pub fn parents<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parents = Some(parents.into_iter().map(Into::into).collect());
        self
    }

    fn has_condition(&self) -> bool {
        self.key.is_some() || self.value.is_some()
    }

    /// Run the scan over `document`
    pub fn find(&self, document: &Value) -> Vec<ScanMatch> {
        let mut found = Vec::new();
        match document {
            Value::Array(items) => {
                for item in items {
                    self.walk(item, None, &mut found);
                }
            }
            _ => self.walk(document, None, &mut found),
        }

        if self.has_condition() {
            if let Some(predicate) = &self.predicate {
                found.retain(|m| predicate(&m.to_value()));
            }
        }
        if let Some(parents) = &self.parents {
            found.retain(|m| {
                m.key
                    .as_ref()
                    .map(|key| parents.iter().any(|p| p == key))
                    .unwrap_or(false)
            });
        }
        found
    }

    fn walk(&self, node: &Value, enclosing: Option<&str>, found: &mut Vec<ScanMatch>) {
        let Value::Object(map) = node else {
            return;
        };

        if self.has_condition() && map.iter().any(|(k, v)| self.entry_matches(k, v)) {
            found.push(ScanMatch {
                key: enclosing.map(str::to_string),
                node: node.clone(),
            });
            return;
        }

        for (key, value) in map {
            match value {
                Value::Array(items) => {
                    for item in items {
                        self.walk(item, None, found);
                    }
                }
                Value::Object(_) => {
                    if !self.has_condition() && self.predicate_accepts(key, value) {
                        found.push(ScanMatch {
                            key: Some(key.clone()),
                            node: value.clone(),
                        });
                        continue;
                    }
                    self.walk(value, Some(key), found);
                }
                _ => {}
            }
        }
    }

    fn predicate_accepts(&self, key: &str, value: &Value) -> bool {
        let Some(predicate) = &self.predicate else {
            return false;
        };
        let mut wrapped = Map::new();
        wrapped.insert(key.to_string(), value.clone());
        predicate(&Value::Object(wrapped))
    }

    fn entry_matches(&self, key: &str, value: &Value) -> bool {
        match (&self.key, &self.value) {
            (Some(want_key), None) => key == want_key,
            (Some(want_key), Some(want_value)) => key == want_key && value == want_value,
            (None, Some(want_value)) => value == want_value || contains(value, want_value),
            (None, None) => false,
        }
    }
}

impl fmt::Debug for Scan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scan")
            .field("key", &self.key)
            .field("value", &self.value)
            .field("predicate", &self.predicate.as_ref().map(|_| "<fn>"))
            .field("parents", &self.parents)
            .finish()
    }
}

/// Loose containment used by value-only scans
fn contains(haystack: &Value, needle: &Value) -> bool {
    match (haystack, needle) {
        (Value::String(text), Value::String(part)) => text.contains(part.as_str()),
        (Value::Array(items), _) => items.contains(needle),
        (Value::Object(map), Value::String(key)) => map.contains_key(key),
        _ => false,
    }
}

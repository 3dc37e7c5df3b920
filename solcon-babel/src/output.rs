//! Shaping converted documents for output
//!
//!     converter ──▶ prune_empty ──▶ wrap_envelope ──▶ render (JSON | YAML)
//!
//! Pruning drops whatever a mapping left empty: nulls, empty strings and empty
//! collections, recursively, so a map that only held empties disappears too. `0`,
//! `false` and the `[null]` sentinel (an explicitly empty YANG leaf-list) are values and
//! survive.

use crate::error::ConvertError;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Container keys SOL006 documents are delivered in
pub const ENVELOPE_DATA: &str = "data";
pub const ENVELOPE_NFV: &str = "etsi-nfv-descriptors:nfv";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl FromStr for OutputFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            other => Err(ConvertError::InvalidInput(format!(
                "unknown output format '{}', expected json or yaml",
                other
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Yaml => write!(f, "yaml"),
        }
    }
}

/// Remove empty values recursively; returns `None` when nothing is left
pub fn prune_empty(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(text) if text.is_empty() => None,
        Value::Array(items) if is_null_sentinel(&items) => Some(Value::Array(items)),
        Value::Array(items) => {
            let kept: Vec<Value> = items.into_iter().filter_map(prune_empty).collect();
            (!kept.is_empty()).then_some(Value::Array(kept))
        }
        Value::Object(map) => {
            let kept: Map<String, Value> = map
                .into_iter()
                .filter_map(|(key, child)| prune_empty(child).map(|child| (key, child)))
                .collect();
            (!kept.is_empty()).then_some(Value::Object(kept))
        }
        other => Some(other),
    }
}

fn is_null_sentinel(items: &[Value]) -> bool {
    matches!(items, [Value::Null])
}

/// Place a SOL006 document under `data.etsi-nfv-descriptors:nfv`
pub fn wrap_envelope(document: Value) -> Value {
    let mut nfv = Map::new();
    nfv.insert(ENVELOPE_NFV.to_string(), document);
    let mut data = Map::new();
    data.insert(ENVELOPE_DATA.to_string(), Value::Object(nfv));
    Value::Object(data)
}

/// The inner document of an enveloped SOL006 descriptor, or the input itself
pub fn unwrap_envelope(document: &Value) -> &Value {
    document
        .get(ENVELOPE_DATA)
        .and_then(|data| data.get(ENVELOPE_NFV))
        .unwrap_or(document)
}

pub fn render(document: &Value, format: OutputFormat) -> Result<String, ConvertError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(document)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(document)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prune_keeps_zero_false_and_sentinel() {
        let doc = json!({
            "vnfd": {
                "id": "v1",
                "empty": "",
                "nothing": null,
                "count": 0,
                "flag": false,
                "vnfm-info": [null],
                "gone": {"a": null, "b": [], "c": {"d": ""}},
                "list": [{}, {"id": "x"}, null]
            }
        });
        assert_eq!(
            prune_empty(doc).unwrap(),
            json!({"vnfd": {
                "id": "v1",
                "count": 0,
                "flag": false,
                "vnfm-info": [null],
                "list": [{"id": "x"}]
            }})
        );
    }

    #[test]
    fn test_prune_everything() {
        assert_eq!(prune_empty(json!({"a": {"b": null}})), None);
    }

    #[test]
    fn test_envelope_round_trip() {
        let wrapped = wrap_envelope(json!({"vnfd": {"id": "v1"}}));
        assert_eq!(wrapped["data"]["etsi-nfv-descriptors:nfv"]["vnfd"]["id"], "v1");
        assert_eq!(unwrap_envelope(&wrapped), &json!({"vnfd": {"id": "v1"}}));
        let bare = json!({"vnfd": {}});
        assert_eq!(unwrap_envelope(&bare), &bare);
    }

    #[test]
    fn test_render_json_indents_two_spaces() {
        let text = render(&json!({"vnfd": {"id": "v1"}}), OutputFormat::Json).unwrap();
        insta::assert_snapshot!(text, @r###"
        {
          "vnfd": {
            "id": "v1"
          }
        }
        "###);
    }

    #[test]
    fn test_render_yaml() {
        let text = render(&json!({"vnfd": {"id": "v1", "count": 0}}), OutputFormat::Yaml).unwrap();
        assert_eq!(text, "vnfd:\n  id: v1\n  count: 0\n");
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("YAML".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}

//! Reading source descriptors
//!
//! Descriptors arrive as YAML (or JSON, which YAML accepts). Before conversion, TOSCA
//! `{get_input: NAME}` references are replaced with concrete values: first from the
//! `input_values` table of the path bundle, then from the `default` of the matching
//! entry under the bundle's `inputs` path. References with neither stay as they are.

use crate::error::ConvertError;
use serde_json::{Map, Value};
use solcon_engine::document::{self, ReadOptions};
use solcon_engine::Path;

const INPUT_KEY: &str = "get_input";

/// Parse a YAML or JSON descriptor
pub fn parse_document(text: &str) -> Result<Value, ConvertError> {
    let document: Value = serde_yaml::from_str(text)?;
    if !document.is_object() {
        return Err(ConvertError::InvalidInput(
            "a descriptor must be a mapping at the top level".to_string(),
        ));
    }
    Ok(document)
}

/// The provider named on the first `provider:` line, lowercased
///
/// A cheap sniff over the raw text, so anchors and tags in front of the value are kept:
/// `provider: &provider Cisco` yields `"&provider cisco"`, which provider selection
/// still resolves through substring matching.
pub fn find_provider(text: &str) -> Result<String, ConvertError> {
    let line = text
        .lines()
        .find(|line| line.contains("provider:"))
        .ok_or(ConvertError::ProviderNotFound)?;
    let value = line.rsplit(':').next().unwrap_or_default().trim();
    if value.is_empty() {
        return Err(ConvertError::ProviderNotFound);
    }
    Ok(value.to_lowercase())
}

/// Replace `{get_input: NAME}` maps throughout `document`
///
/// `inputs` locates the input declarations whose defaults are used when `configured`
/// has no value. Returns how many references were replaced.
pub fn substitute_inputs(document: &mut Value, inputs: &Path, configured: Option<&Value>) -> usize {
    let defaults = input_defaults(document, inputs);
    let empty = Map::new();
    let configured = configured.and_then(Value::as_object).unwrap_or(&empty);
    replace(document, configured, &defaults)
}

fn input_defaults(document: &Value, inputs: &Path) -> Map<String, Value> {
    let declared = document::read(document, inputs, ReadOptions::optional().silent(true))
        .ok()
        .flatten();
    match declared {
        Some(Value::Object(inputs)) => inputs
            .iter()
            .filter_map(|(name, input)| {
                input.get("default").map(|value| (name.clone(), value.clone()))
            })
            .collect(),
        _ => Map::new(),
    }
}

fn replace(node: &mut Value, configured: &Map<String, Value>, defaults: &Map<String, Value>) -> usize {
    if let Some(name) = input_name(node) {
        return match configured.get(&name).or_else(|| defaults.get(&name)) {
            Some(value) => {
                log::debug!("input '{}' -> {}", name, value);
                *node = value.clone();
                1
            }
            None => {
                log::warn!("no value for input '{}', leaving the reference in place", name);
                0
            }
        };
    }

    match node {
        Value::Object(map) => map
            .values_mut()
            .map(|child| replace(child, configured, defaults))
            .sum(),
        Value::Array(items) => items
            .iter_mut()
            .map(|child| replace(child, configured, defaults))
            .sum(),
        _ => 0,
    }
}

fn input_name(node: &Value) -> Option<String> {
    let map = node.as_object()?;
    if map.len() != 1 {
        return None;
    }
    map.get(INPUT_KEY)?.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("    provider: Cisco\n", "cisco")]
    #[case("a: 1\n  provider: &provider-cisco cisco\nprovider: other\n", "&provider-cisco cisco")]
    #[case("metadata:\n  vendor_provider:   Big Vendor  \n", "big vendor")]
    fn test_find_provider(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(find_provider(text).unwrap(), expected);
    }

    #[test]
    fn test_find_provider_missing() {
        assert!(matches!(
            find_provider("vendor: x\n"),
            Err(ConvertError::ProviderNotFound)
        ));
    }

    #[test]
    fn test_substitute_inputs() {
        let mut doc = json!({
            "topology_template": {
                "inputs": {"FLAVOR": {"type": "string", "default": "m1.small"}, "IMAGE": {}},
                "node_templates": {
                    "c1": {"properties": {
                        "flavor": {"get_input": "FLAVOR"},
                        "image": {"get_input": "IMAGE"},
                        "disks": [{"get_input": "DISK"}]
                    }}
                }
            }
        });
        let configured = json!({"DISK": "qcow2"});
        let inputs = Path::parse("topology_template.inputs");
        let replaced = substitute_inputs(&mut doc, &inputs, Some(&configured));

        assert_eq!(replaced, 2);
        let props = &doc["topology_template"]["node_templates"]["c1"]["properties"];
        assert_eq!(props["flavor"], "m1.small");
        assert_eq!(props["image"], json!({"get_input": "IMAGE"}));
        assert_eq!(props["disks"], json!(["qcow2"]));
    }

    #[test]
    fn test_input_defaults_follow_the_given_path() {
        let mut doc = json!({
            "inputs": {"CPUS": {"default": 4}},
            "topology_template": {
                "inputs": {"CPUS": {"default": 2}},
                "vdu": {"cpus": {"get_input": "CPUS"}}
            }
        });
        let replaced = substitute_inputs(&mut doc, &Path::parse("inputs"), None);
        assert_eq!(replaced, 1);
        assert_eq!(doc["topology_template"]["vdu"]["cpus"], 4);
    }

    #[test]
    fn test_parse_document_rejects_scalars() {
        assert!(parse_document("just text").is_err());
        assert_eq!(parse_document("a: [1, 2]").unwrap(), json!({"a": [1, 2]}));
    }
}

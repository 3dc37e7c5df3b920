//! Converter registry for discovery and selection

use crate::converter::Converter;
use crate::error::ConvertError;
use std::collections::HashMap;

/// Registry of descriptor converters, keyed by name
pub struct ConverterRegistry {
    converters: HashMap<String, Box<dyn Converter>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        ConverterRegistry {
            converters: HashMap::new(),
        }
    }

    /// Register a converter, replacing any with the same name
    pub fn register<C: Converter + 'static>(&mut self, converter: C) {
        self.converters
            .insert(converter.name().to_string(), Box::new(converter));
    }

    pub fn get(&self, name: &str) -> Result<&dyn Converter, ConvertError> {
        self.converters
            .get(name)
            .map(|c| c.as_ref())
            .ok_or_else(|| ConvertError::ConverterNotFound(name.to_string()))
    }

    pub fn has(&self, name: &str) -> bool {
        self.converters.contains_key(name)
    }

    /// All converter names, sorted
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<_> = self.converters.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(crate::converters::cisco::CiscoConverter);
        registry.register(crate::converters::nokia::NokiaConverter);
        registry.register(crate::converters::sol6_to_tosca::Sol6ToToscaConverter);
        registry
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::Conversion;
    use serde_json::Value;
    use solcon_engine::{PathConfig, RunReport};

    struct Echo;

    impl Converter for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Returns its input"
        }
        fn convert(&self, source: &Value, _paths: &PathConfig) -> Result<Conversion, ConvertError> {
            Ok(Conversion {
                document: source.clone(),
                report: RunReport::default(),
            })
        }
    }

    #[test]
    fn test_registry_creation() {
        let registry = ConverterRegistry::new();
        assert!(registry.list().is_empty());
    }

    #[test]
    fn test_registry_register_and_get() {
        let mut registry = ConverterRegistry::new();
        registry.register(Echo);
        assert!(registry.has("echo"));
        assert_eq!(registry.get("echo").unwrap().description(), "Returns its input");
    }

    #[test]
    fn test_registry_missing_converter() {
        let registry = ConverterRegistry::new();
        assert!(matches!(
            registry.get("nope"),
            Err(ConvertError::ConverterNotFound(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_registry_defaults() {
        let registry = ConverterRegistry::with_defaults();
        assert_eq!(registry.list(), vec!["cisco", "nokia", "sol6-to-tosca"]);
        assert!(registry.get("sol6-to-tosca").unwrap().reads_sol6());
    }
}

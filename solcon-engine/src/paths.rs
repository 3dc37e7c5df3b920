//! Path configuration bundles
//!
//! Mapping tables refer to locations by logical name (`vdu_name`, `int_cpd_layer_prot`)
//! and the concrete paths live in TOML bundles, one per dialect:
//!
//! ```toml
//! delimiter = ";"
//! providers = ["cisco"]
//!
//! [tosca]
//! node_templates = "topology_template;node_templates"
//! vdu            = ["node_templates", "{}"]        # parent name + suffix
//! vdu_name       = ["vdu", "properties;name"]
//! VIRT_STORAGE_DEFAULT_VAL = "root"                 # literal, not a path
//!
//! [provider_identifiers.cisco]
//! vdu = ["type", "cisco.nodes.nfv.Vdu.Compute"]
//! ```
//!
//! A `[parent, suffix]` entry is the parent's full path, the delimiter, then the suffix,
//! resolved recursively when the bundle is loaded. Keys ending in `_VAL` and table
//! values are literals and are returned as-is. Provider identifiers become
//! `<kind>_identifier` entries of the `tosca` section once a provider is selected.

use crate::error::EngineError;
use crate::flags::EnumCatalogs;
use crate::path::{Path, DEFAULT_DELIMITER};
use crate::scan::Scan;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

const LITERAL_SUFFIX: &str = "_VAL";
const IDENTIFIER_SUFFIX: &str = "_identifier";

/// A `(key, value)` scan condition that picks out one kind of node
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub key: String,
    pub value: Value,
}

impl Identifier {
    pub fn to_scan(&self) -> Scan {
        Scan::new().key(self.key.clone()).value(self.value.clone())
    }
}

/// What a logical name stands for
#[derive(Debug, Clone, PartialEq)]
pub enum Entry<'a> {
    Path(Path),
    Literal(&'a Value),
}

/// One dialect's names
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    name: String,
    delimiter: char,
    paths: BTreeMap<String, String>,
    literals: BTreeMap<String, Value>,
    identifiers: BTreeMap<String, Identifier>,
}

impl Section {
    fn empty(name: &str, delimiter: char) -> Self {
        Section {
            name: name.to_string(),
            delimiter,
            ..Default::default()
        }
    }

    fn from_table(name: &str, table: &toml::Table, delimiter: char) -> Result<Self, EngineError> {
        let mut raw = BTreeMap::new();
        let mut section = Section::empty(name, delimiter);

        for (key, value) in table {
            if let Some(base) = key.strip_suffix(LITERAL_SUFFIX) {
                section.literals.insert(base.to_string(), to_json(value)?);
                continue;
            }
            match value {
                toml::Value::String(path) => {
                    raw.insert(key.clone(), RawEntry::Root(path.clone()));
                }
                toml::Value::Array(parts) => {
                    let pair: Vec<&str> = parts.iter().filter_map(toml::Value::as_str).collect();
                    let [parent, suffix] = pair.as_slice() else {
                        return Err(EngineError::InvalidConfig(format!(
                            "[{}] {} must be a path or a [parent, suffix] pair",
                            name, key
                        )));
                    };
                    raw.insert(
                        key.clone(),
                        RawEntry::Child {
                            parent: parent.to_string(),
                            suffix: suffix.to_string(),
                        },
                    );
                }
                toml::Value::Table(_) => {
                    section.literals.insert(key.clone(), to_json(value)?);
                }
                _ => {
                    return Err(EngineError::InvalidConfig(format!(
                        "[{}] {} has an unsupported value type",
                        name, key
                    )))
                }
            }
        }

        for key in raw.keys() {
            let full = resolve_raw(name, key, &raw, delimiter, &mut HashSet::new())?;
            section.paths.insert(key.clone(), full);
        }
        Ok(section)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Parse ad-hoc text with this section's delimiter
    pub fn parse(&self, text: &str) -> Path {
        Path::parse_with(text, self.delimiter)
    }

    pub fn path(&self, name: &str) -> Result<Path, EngineError> {
        self.paths
            .get(name)
            .map(|text| Path::parse_with(text, self.delimiter))
            .ok_or_else(|| self.missing(name))
    }

    pub fn literal(&self, name: &str) -> Result<&Value, EngineError> {
        self.literals.get(name).ok_or_else(|| self.missing(name))
    }

    pub fn identifier(&self, kind: &str) -> Result<&Identifier, EngineError> {
        let key = format!("{}{}", kind, IDENTIFIER_SUFFIX);
        self.identifiers.get(&key).ok_or_else(|| self.missing(&key))
    }

    /// A path, or a literal when the name only exists as one
    pub fn resolve(&self, name: &str) -> Result<Entry<'_>, EngineError> {
        if let Ok(path) = self.path(name) {
            return Ok(Entry::Path(path));
        }
        self.literal(name).map(Entry::Literal)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.paths.contains_key(name) || self.literals.contains_key(name)
    }

    fn missing(&self, name: &str) -> EngineError {
        EngineError::MissingConfigKey {
            name: name.to_string(),
            section: self.name.clone(),
        }
    }

    fn absorb(&mut self, other: Section) {
        self.paths.extend(other.paths);
        self.literals.extend(other.literals);
        self.identifiers.extend(other.identifiers);
    }
}

#[derive(Debug, Clone)]
enum RawEntry {
    Root(String),
    Child { parent: String, suffix: String },
}

fn resolve_raw(
    section: &str,
    key: &str,
    raw: &BTreeMap<String, RawEntry>,
    delimiter: char,
    visiting: &mut HashSet<String>,
) -> Result<String, EngineError> {
    if !visiting.insert(key.to_string()) {
        return Err(EngineError::InvalidConfig(format!(
            "[{}] {} refers back to itself",
            section, key
        )));
    }
    let resolved = match raw.get(key) {
        Some(RawEntry::Root(path)) => path.clone(),
        Some(RawEntry::Child { parent, suffix }) => {
            let base = resolve_raw(section, parent, raw, delimiter, visiting)?;
            format!("{}{}{}", base, delimiter, suffix)
        }
        None => {
            return Err(EngineError::MissingConfigKey {
                name: key.to_string(),
                section: section.to_string(),
            })
        }
    };
    visiting.remove(key);
    Ok(resolved)
}

fn to_json(value: &toml::Value) -> Result<Value, EngineError> {
    serde_json::to_value(value).map_err(|e| EngineError::InvalidConfig(e.to_string()))
}

/// Both dialects' names plus the provider identifier bundles
#[derive(Debug, Clone, PartialEq)]
pub struct PathConfig {
    delimiter: char,
    tosca: Section,
    sol6: Section,
    providers: Vec<String>,
    provider_identifiers: BTreeMap<String, BTreeMap<String, Identifier>>,
    provider: Option<String>,
}

impl Default for PathConfig {
    fn default() -> Self {
        PathConfig {
            delimiter: DEFAULT_DELIMITER,
            tosca: Section::empty("tosca", DEFAULT_DELIMITER),
            sol6: Section::empty("sol6", DEFAULT_DELIMITER),
            providers: Vec::new(),
            provider_identifiers: BTreeMap::new(),
            provider: None,
        }
    }
}

impl PathConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, EngineError> {
        let table: toml::Table = text
            .parse()
            .map_err(|e: toml::de::Error| EngineError::InvalidConfig(e.to_string()))?;

        let delimiter = match table.get("delimiter") {
            None => DEFAULT_DELIMITER,
            Some(toml::Value::String(text)) if text.chars().count() == 1 => {
                text.chars().next().unwrap_or(DEFAULT_DELIMITER)
            }
            Some(other) => {
                return Err(EngineError::InvalidConfig(format!(
                    "delimiter must be a single character, found {}",
                    other
                )))
            }
        };

        let section = |name: &str| -> Result<Section, EngineError> {
            match table.get(name) {
                None => Ok(Section::empty(name, delimiter)),
                Some(toml::Value::Table(inner)) => Section::from_table(name, inner, delimiter),
                Some(_) => Err(EngineError::InvalidConfig(format!(
                    "[{}] must be a table",
                    name
                ))),
            }
        };

        let providers = match table.get("providers") {
            None => Vec::new(),
            Some(toml::Value::Array(items)) => items
                .iter()
                .filter_map(toml::Value::as_str)
                .map(normalize_provider)
                .collect(),
            Some(_) => {
                return Err(EngineError::InvalidConfig(
                    "providers must be a list of names".to_string(),
                ))
            }
        };

        let mut provider_identifiers = BTreeMap::new();
        if let Some(toml::Value::Table(bundles)) = table.get("provider_identifiers") {
            for (provider, kinds) in bundles {
                let toml::Value::Table(kinds) = kinds else {
                    return Err(EngineError::InvalidConfig(format!(
                        "provider_identifiers.{} must be a table",
                        provider
                    )));
                };
                let mut parsed = BTreeMap::new();
                for (kind, pair) in kinds {
                    parsed.insert(kind.clone(), parse_identifier(provider, kind, pair)?);
                }
                provider_identifiers.insert(normalize_provider(provider), parsed);
            }
        }

        Ok(PathConfig {
            delimiter,
            tosca: section("tosca")?,
            sol6: section("sol6")?,
            providers,
            provider_identifiers,
            provider: None,
        })
    }

    /// Combine two bundles, typically the TOSCA file and the SOL006 file
    pub fn merged_with(mut self, other: PathConfig) -> Result<Self, EngineError> {
        let other_has_paths =
            !other.tosca.paths.is_empty() || !other.sol6.paths.is_empty();
        let self_has_paths = !self.tosca.paths.is_empty() || !self.sol6.paths.is_empty();
        if other_has_paths && self_has_paths && other.delimiter != self.delimiter {
            return Err(EngineError::InvalidConfig(format!(
                "bundles disagree on the delimiter: '{}' and '{}'",
                self.delimiter, other.delimiter
            )));
        }
        if !self_has_paths {
            self.delimiter = other.delimiter;
            self.tosca.delimiter = other.delimiter;
            self.sol6.delimiter = other.delimiter;
        }
        self.tosca.absorb(other.tosca);
        self.sol6.absorb(other.sol6);
        for provider in other.providers {
            if !self.providers.contains(&provider) {
                self.providers.push(provider);
            }
        }
        self.provider_identifiers.extend(other.provider_identifiers);
        Ok(self)
    }

    /// Select a provider and inject its identifiers into the `tosca` section
    ///
    /// The token is lowercased with spaces turned into `-`. When it is not a known
    /// provider, a known provider contained in it is used instead.
    pub fn for_provider(&self, token: &str) -> Result<Self, EngineError> {
        let wanted = normalize_provider(token);
        let provider = if self.providers.contains(&wanted) {
            wanted.clone()
        } else {
            self.providers
                .iter()
                .find(|known| wanted.contains(known.as_str()))
                .cloned()
                .ok_or_else(|| EngineError::UnknownProvider {
                    provider: wanted.clone(),
                    known: self.providers.clone(),
                })?
        };

        let mut selected = self.clone();
        if let Some(identifiers) = self.provider_identifiers.get(&provider) {
            for (kind, identifier) in identifiers {
                selected
                    .tosca
                    .identifiers
                    .insert(format!("{}{}", kind, IDENTIFIER_SUFFIX), identifier.clone());
            }
        }
        log::info!("using provider '{}'", provider);
        selected.provider = Some(provider);
        Ok(selected)
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn tosca(&self) -> &Section {
        &self.tosca
    }

    pub fn sol6(&self) -> &Section {
        &self.sol6
    }

    pub fn providers(&self) -> &[String] {
        &self.providers
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// Enum catalogs, with any `VALID_*_VAL` literals from the `sol6` section applied
    pub fn catalogs(&self) -> EnumCatalogs {
        let mut catalogs = EnumCatalogs::default();
        let sol6 = &self.sol6;
        let overrides: [(&str, &mut Vec<String>); 5] = [
            ("VALID_PROTOCOLS", &mut catalogs.protocols),
            ("VALID_DISK_FORMATS", &mut catalogs.disk_formats),
            ("VALID_CONTAINER_FORMATS", &mut catalogs.container_formats),
            ("VALID_AFF_SCOPES", &mut catalogs.affinity_scopes),
            ("VALID_STORAGE_TYPES", &mut catalogs.storage_types),
        ];
        for (name, target) in overrides {
            if let Ok(Value::Array(items)) = sol6.literal(name) {
                *target = items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect();
            }
        }
        if let Ok(Value::String(prefix)) = sol6.literal("PROTOCOLS_PREFIX") {
            catalogs.protocol_prefix = prefix.clone();
        }
        catalogs
    }
}

fn normalize_provider(token: &str) -> String {
    token.trim().to_lowercase().split_whitespace().collect::<Vec<_>>().join("-")
}

fn parse_identifier(
    provider: &str,
    kind: &str,
    pair: &toml::Value,
) -> Result<Identifier, EngineError> {
    if let toml::Value::Array(items) = pair {
        if let [toml::Value::String(key), value] = items.as_slice() {
            return Ok(Identifier {
                key: key.clone(),
                value: to_json(value)?,
            });
        }
    }
    Err(EngineError::InvalidConfig(format!(
        "provider_identifiers.{}.{} must be a [key, value] pair",
        provider, kind
    )))
}

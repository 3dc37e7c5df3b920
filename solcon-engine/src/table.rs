//! Building mapping tables
//!
//! Converters describe their work in logical names and let [`TableBuilder`] turn them
//! into paths through a pair of [`Section`]s: the one the source document is written
//! in and the one the target is written in.
//!
//! ```text
//!     builder.indexed("vdu_name", "vdu_name", FlagSet::empty(), &vdus)?
//!         source  tosca:vdu_name = topology_template;node_templates;{};properties;name
//!         target  sol6:vdu_name  = vnfd;vdu;{};name
//! ```
//!
//! A source name that only exists as a `_VAL` literal becomes a key-as-value write of
//! that literal.
//!
//! [`TableSpec`] is the declarative form: correspondence maps and entries read from
//! TOML or YAML, compiled against one source document.

use crate::correspondence::{
    ensure_contiguous, generate_from_scan, Binding, CorrId, Discovery, GenerateOptions,
    MapStrategy, Ordinal, ScanRequest,
};
use crate::error::{Diagnostics, EngineError};
use crate::flags::{Flag, FlagSet};
use crate::path::{Path, Segment};
use crate::paths::{Entry, Section};
use crate::runner::{IndexSide, MappingEntry, MappingTable};
use crate::scan::Scan;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// Resolves logical names into [`MappingEntry`] rows
#[derive(Debug)]
pub struct TableBuilder<'c> {
    from: &'c Section,
    to: &'c Section,
    table: MappingTable,
}

impl<'c> TableBuilder<'c> {
    pub fn new(from: &'c Section, to: &'c Section) -> Self {
        TableBuilder {
            from,
            to,
            table: MappingTable::new(),
        }
    }

    pub fn indexing(mut self, side: IndexSide) -> Self {
        self.table.index_side = side;
        self
    }

    pub fn from_section(&self) -> &'c Section {
        self.from
    }

    pub fn to_section(&self) -> &'c Section {
        self.to
    }

    pub fn table(&self) -> &MappingTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut MappingTable {
        &mut self.table
    }

    /// One write from `source` to `target`
    pub fn single(&mut self, source: &str, target: &str, flags: FlagSet) -> Result<&mut Self, EngineError> {
        let target = self.to.path(target)?;
        let (source, flags) = self.source_entry(source, flags)?;
        self.table.push(MappingEntry::single(source, target, flags));
        Ok(self)
    }

    /// Like [`single`](Self::single), with `slots` filling the target's leading placeholders
    pub fn single_at(
        &mut self,
        source: &str,
        target: &str,
        slots: &[usize],
        flags: FlagSet,
    ) -> Result<&mut Self, EngineError> {
        let target = fill_leading(&self.to.path(target)?, slots);
        let (source, flags) = self.source_entry(source, flags)?;
        self.table.push(MappingEntry::single(source, target, flags));
        Ok(self)
    }

    /// One write per correspondence in `ids`
    pub fn indexed(
        &mut self,
        source: &str,
        target: &str,
        flags: FlagSet,
        ids: &[CorrId],
    ) -> Result<&mut Self, EngineError> {
        let target = self.to.path(target)?;
        let (source, flags) = self.source_entry(source, flags)?;
        self.table
            .push(MappingEntry::indexed(source, target, flags, ids.to_vec()));
        Ok(self)
    }

    /// Key-as-value over each correspondence's own name (or slot with `UseValue`)
    pub fn keys(
        &mut self,
        target: &str,
        flags: FlagSet,
        ids: &[CorrId],
    ) -> Result<&mut Self, EngineError> {
        let target = self.to.path(target)?;
        let source = Path::from_segments(vec![Segment::Placeholder], self.from.delimiter());
        self.table.push(MappingEntry::indexed(
            source,
            target,
            flags.with(Flag::KeySetValue),
            ids.to_vec(),
        ));
        Ok(self)
    }

    /// Write a literal at `target`
    ///
    /// `slots` fill the target's leading placeholders first, so
    /// `set_value("CP_MGMT", "ext_cpd_id", &[0], FlagSet::empty(), None)` writes
    /// `ext-cpd.0.id`. With `ids` the remaining placeholders are filled per correspondence.
    /// The literal still passes through the flag pipeline.
    pub fn set_value(
        &mut self,
        value: &str,
        target: &str,
        slots: &[usize],
        flags: FlagSet,
        ids: Option<&[CorrId]>,
    ) -> Result<&mut Self, EngineError> {
        let target = fill_leading(&self.to.path(target)?, slots);
        self.push_literal(value, target, flags, ids);
        Ok(self)
    }

    /// Write `type_name` at `target` once per correspondence
    ///
    /// Used for node types, which exist only on the target side.
    pub fn set_type(&mut self, type_name: &str, target: &str, ids: &[CorrId]) -> Result<&mut Self, EngineError> {
        let target = self.to.path(target)?;
        self.push_literal(type_name, target, FlagSet::empty(), Some(ids));
        Ok(self)
    }

    pub fn push(&mut self, entry: MappingEntry) -> &mut Self {
        self.table.push(entry);
        self
    }

    pub fn finish(self) -> MappingTable {
        self.table
    }

    fn push_literal(&mut self, value: &str, target: Path, flags: FlagSet, ids: Option<&[CorrId]>) {
        let source = literal_path(value, self.from.delimiter());
        let flags = flags.with(Flag::KeySetValue);
        let entry = match ids {
            Some(ids) => MappingEntry::indexed(source, target, flags, ids.to_vec()),
            None => MappingEntry::single(source, target, flags),
        };
        self.table.push(entry);
    }

    fn source_entry(&self, name: &str, flags: FlagSet) -> Result<(Path, FlagSet), EngineError> {
        match self.from.resolve(name)? {
            Entry::Path(path) => Ok((path, flags)),
            Entry::Literal(value) => {
                let text = match value {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                Ok((
                    literal_path(&text, self.from.delimiter()),
                    flags.with(Flag::KeySetValue),
                ))
            }
        }
    }
}

/// A one-segment path holding `value` verbatim, delimiters included
fn literal_path(value: &str, delimiter: char) -> Path {
    Path::from_segments(vec![Segment::Key(value.to_string())], delimiter)
}

fn fill_leading(path: &Path, slots: &[usize]) -> Path {
    let mut slots = slots.iter();
    let segments = path
        .segments()
        .iter()
        .map(|segment| match segment {
            Segment::Placeholder => slots
                .next()
                .map(|slot| Segment::Index(*slot))
                .unwrap_or(Segment::Placeholder),
            other => other.clone(),
        })
        .collect();
    Path::from_segments(segments, path.delimiter())
}

/// Declarative mapping table
///
/// ```toml
/// [[maps]]
/// name = "vdus"
/// under = "node_templates"
/// identifier = "vdu"
///
/// [[maps]]
/// name = "cps"
/// under = "node_templates"
/// identifier = "int_cpd"
/// bind = "requirements;virtual_binding"
/// parents = "vdus"
///
/// [[entries]]
/// map = "vdus"
/// target = "vdu_id"
/// flags = ["key-set-value"]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableSpec {
    #[serde(default)]
    pub maps: Vec<MapSpec>,
    #[serde(default)]
    pub entries: Vec<EntrySpec>,
}

/// How one set of correspondences is discovered
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapSpec {
    pub name: String,
    /// Logical source name to discover below
    pub under: Option<String>,
    /// Provider identifier kind used as the scan condition
    pub identifier: Option<String>,
    /// Explicit scan condition when no identifier is given
    pub key: Option<String>,
    pub value: Option<Value>,
    /// Every element or entry at `under` instead of a scan
    #[serde(default)]
    pub children: bool,
    /// Path inside each discovered node naming its parent
    pub bind: Option<String>,
    /// Name of a previously declared map holding the parents
    pub parents: Option<String>,
    #[serde(default)]
    pub start: usize,
    #[serde(default)]
    pub contiguous: bool,
}

/// One entry by logical names
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntrySpec {
    /// Logical source name, defaulting to the correspondence key for indexed entries
    pub source: Option<String>,
    pub target: String,
    #[serde(default)]
    pub flags: FlagSet,
    /// Correspondence map to index with
    pub map: Option<String>,
    /// Literal to write instead of reading the source
    pub value: Option<String>,
}

impl TableSpec {
    pub fn from_toml_str(text: &str) -> Result<Self, EngineError> {
        toml::from_str(text).map_err(|e| EngineError::InvalidConfig(e.to_string()))
    }

    /// Discover every map in `source` and resolve every entry
    pub fn compile(
        &self,
        from: &Section,
        to: &Section,
        source: &Value,
        diagnostics: &mut Diagnostics,
    ) -> Result<MappingTable, EngineError> {
        let mut builder = TableBuilder::new(from, to);
        let mut maps: HashMap<&str, Vec<CorrId>> = HashMap::new();

        for spec in &self.maps {
            let ids = spec.generate(from, source, &maps, builder.table_mut(), diagnostics)?;
            log::debug!("map '{}' produced {} correspondences", spec.name, ids.len());
            maps.insert(spec.name.as_str(), ids);
        }

        for entry in &self.entries {
            let ids = match &entry.map {
                Some(name) => Some(lookup(&maps, name)?),
                None => None,
            };
            match (&entry.value, &entry.source, ids) {
                (Some(value), _, ids) => {
                    builder.set_value(value, &entry.target, &[], entry.flags, ids)?;
                }
                (None, Some(source), Some(ids)) => {
                    builder.indexed(source, &entry.target, entry.flags, ids)?;
                }
                (None, Some(source), None) => {
                    builder.single(source, &entry.target, entry.flags)?;
                }
                (None, None, Some(ids)) => {
                    builder.keys(&entry.target, entry.flags, ids)?;
                }
                (None, None, None) => {
                    return Err(EngineError::InvalidConfig(format!(
                        "entry for '{}' needs a source, a value or a map",
                        entry.target
                    )))
                }
            }
        }
        Ok(builder.finish())
    }
}

fn lookup<'m>(maps: &'m HashMap<&str, Vec<CorrId>>, name: &str) -> Result<&'m [CorrId], EngineError> {
    maps.get(name)
        .map(Vec::as_slice)
        .ok_or_else(|| EngineError::InvalidConfig(format!("unknown map '{}'", name)))
}

impl MapSpec {
    fn generate(
        &self,
        from: &Section,
        source: &Value,
        maps: &HashMap<&str, Vec<CorrId>>,
        table: &mut MappingTable,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<CorrId>, EngineError> {
        let discovery = if self.children {
            Discovery::Children
        } else if let Some(kind) = &self.identifier {
            Discovery::Scan(from.identifier(kind)?.to_scan())
        } else {
            let mut scan = Scan::new();
            if let Some(key) = &self.key {
                scan = scan.key(key.clone());
            }
            if let Some(value) = &self.value {
                scan = scan.value(value.clone());
            }
            Discovery::Scan(scan)
        };

        let mut request = ScanRequest::new(source, discovery);
        if let Some(under) = &self.under {
            request = request.under(from.path(under)?);
        }

        let parents = match &self.parents {
            Some(name) => lookup(maps, name)?.to_vec(),
            None => Vec::new(),
        };
        let strategy: Box<dyn MapStrategy> = match &self.bind {
            Some(bind) => Box::new(Binding {
                path: from.parse(bind),
                parents,
                start: self.start,
            }),
            None if !parents.is_empty() => {
                Box::new(Ordinal(GenerateOptions::starting_at(self.start).parents_by_name(&parents)))
            }
            None => Box::new(Ordinal(GenerateOptions::starting_at(self.start))),
        };

        let ids = generate_from_scan(&mut table.arena, &request, strategy.as_ref(), diagnostics)?;
        if self.contiguous {
            ensure_contiguous(&mut table.arena, &ids);
        }
        Ok(ids)
    }
}

//! Identifier correspondences
//!
//! Repeated sibling structures in a source document (VDUs, connection points, storage
//! nodes) are turned into ordered [`Correspondence`] records: a name taken from the
//! source, an ordinal slot used as a target list index, and an optional parent. The
//! parent chain is what lets a nested target path like `vdu.{}.int-cpd.{}` be filled in
//! one level at a time.
//!
//! Records live in a [`CorrespondenceArena`] and refer to their parents by [`CorrId`].
//! A parent must be allocated before its children are linked to it, so chains are
//! always finite.
//!
//! Generation comes in three shapes, all behind the one-method [`MapStrategy`] trait:
//!
//! - [`Ordinal`]: names in order, slots counting up from a base
//! - [`ParentMatch`]: each name is linked to a parent given by a name-to-name table
//! - [`Binding`]: each node names its parent through a binding path, and the slot
//!   counter restarts whenever the parent changes

use crate::document::{self, ReadOptions};
use crate::error::{Diagnostics, EngineError, Warning};
use crate::path::Path;
use crate::scan::{Scan, ScanMatch};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Handle to a record inside a [`CorrespondenceArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrId(usize);

impl CorrId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A `(name, slot, parent)` triple
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Correspondence {
    pub name: Option<String>,
    pub slot: Option<usize>,
    pub parent: Option<CorrId>,
}

impl Correspondence {
    pub fn new<S: Into<String>>(name: Option<S>, slot: Option<usize>) -> Self {
        Correspondence {
            name: name.map(Into::into),
            slot,
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: CorrId) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// Owner of every correspondence created for one mapping table
#[derive(Debug, Clone, Default)]
pub struct CorrespondenceArena {
    elems: Vec<Correspondence>,
}

impl CorrespondenceArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, elem: Correspondence) -> CorrId {
        self.elems.push(elem);
        CorrId(self.elems.len() - 1)
    }

    pub fn get(&self, id: CorrId) -> &Correspondence {
        &self.elems[id.0]
    }

    pub fn get_mut(&mut self, id: CorrId) -> &mut Correspondence {
        &mut self.elems[id.0]
    }

    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    /// Shallow copy: the new record shares the original's parent
    pub fn duplicate(&mut self, id: CorrId) -> CorrId {
        let copy = self.get(id).clone();
        self.alloc(copy)
    }

    pub fn duplicate_all(&mut self, ids: &[CorrId]) -> Vec<CorrId> {
        ids.iter().map(|id| self.duplicate(*id)).collect()
    }

    /// `n` records named and numbered `0..n`
    pub fn basic_list(&mut self, n: usize) -> Vec<CorrId> {
        (0..n)
            .map(|i| self.alloc(Correspondence::new(Some(i.to_string()), Some(i))))
            .collect()
    }

    /// Link every record in `ids` to `parent`
    ///
    /// A record that already has a parent is an error, unless `silent` is set, in which
    /// case the existing link is kept.
    pub fn add_parent(
        &mut self,
        ids: &[CorrId],
        parent: CorrId,
        silent: bool,
    ) -> Result<(), EngineError> {
        for id in ids {
            if let Some(existing) = self.get(*id).parent {
                if silent {
                    log::debug!(
                        "SILENT: {} already has parent {}, keeping it",
                        self.describe(*id),
                        self.describe(existing)
                    );
                    continue;
                }
                return Err(EngineError::ParentAlreadySet {
                    elem: self.describe(*id),
                    existing: self.describe(existing),
                });
            }
            if self.chain(parent).any(|up| up == *id) {
                return Err(EngineError::InvalidConfig(format!(
                    "linking {} under {} would form a cycle",
                    self.describe(*id),
                    self.describe(parent)
                )));
            }
            self.get_mut(*id).parent = Some(parent);
        }
        Ok(())
    }

    /// Last record in `ids` named `name`
    pub fn find_by_name(&self, ids: &[CorrId], name: &str) -> Option<CorrId> {
        ids.iter()
            .rev()
            .copied()
            .find(|id| self.get(*id).name.as_deref() == Some(name))
    }

    /// Last record in `ids` with ordinal `slot`
    pub fn find_by_slot(&self, ids: &[CorrId], slot: usize) -> Option<CorrId> {
        ids.iter()
            .rev()
            .copied()
            .find(|id| self.get(*id).slot == Some(slot))
    }

    pub fn names(&self, ids: &[CorrId]) -> Vec<Option<String>> {
        ids.iter().map(|id| self.get(*id).name.clone()).collect()
    }

    pub fn slots(&self, ids: &[CorrId]) -> Vec<Option<usize>> {
        ids.iter().map(|id| self.get(*id).slot).collect()
    }

    pub fn set_slot(&mut self, id: CorrId, slot: usize) {
        self.get_mut(id).slot = Some(slot);
    }

    /// `id` followed by its ancestors, nearest first
    pub fn chain(&self, id: CorrId) -> Chain<'_> {
        Chain {
            arena: self,
            next: Some(id),
        }
    }

    /// `name -> slot, parent=(name -> slot)` rendering of a chain
    pub fn describe(&self, id: CorrId) -> String {
        Describe { arena: self, id }.to_string()
    }
}

/// Iterator over a correspondence and its ancestors
pub struct Chain<'a> {
    arena: &'a CorrespondenceArena,
    next: Option<CorrId>,
}

impl Iterator for Chain<'_> {
    type Item = CorrId;

    fn next(&mut self) -> Option<CorrId> {
        let current = self.next?;
        self.next = self.arena.get(current).parent;
        Some(current)
    }
}

struct Describe<'a> {
    arena: &'a CorrespondenceArena,
    id: CorrId,
}

impl fmt::Display for Describe<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elem = self.arena.get(self.id);
        match &elem.name {
            Some(name) => write!(f, "{}", name)?,
            None => write!(f, "_")?,
        }
        match elem.slot {
            Some(slot) => write!(f, " -> {}", slot)?,
            None => write!(f, " -> _")?,
        }
        if let Some(parent) = elem.parent {
            write!(
                f,
                ", parent=({})",
                Describe {
                    arena: self.arena,
                    id: parent
                }
            )?;
        }
        Ok(())
    }
}

/// Knobs for [`generate_from_list`] and the [`Ordinal`] strategy
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// First ordinal handed out
    pub start: usize,
    /// Link each record to the parent with the same name
    pub parent_map: Option<Vec<CorrId>>,
    /// Link each record to the parent with the same ordinal
    pub value_map: Option<Vec<CorrId>>,
    /// Leave names empty
    pub none_key: bool,
    /// Leave ordinals empty
    pub none_value: bool,
}

impl GenerateOptions {
    pub fn starting_at(start: usize) -> Self {
        GenerateOptions {
            start,
            ..Default::default()
        }
    }

    pub fn parents_by_name(mut self, parents: &[CorrId]) -> Self {
        self.parent_map = Some(parents.to_vec());
        self
    }

    pub fn parents_by_slot(mut self, parents: &[CorrId]) -> Self {
        self.value_map = Some(parents.to_vec());
        self
    }

    pub fn without_names(mut self) -> Self {
        self.none_key = true;
        self
    }

    pub fn without_slots(mut self) -> Self {
        self.none_value = true;
        self
    }
}

/// The name a source item contributes to a correspondence
///
/// Maps give their first key, scalars their text, lists the name of their first element.
pub fn representative_name(item: &Value) -> Result<String, EngineError> {
    match item {
        Value::Object(map) => map.keys().next().cloned().ok_or_else(|| {
            EngineError::mismatch("{}", "<item>", "an empty map has no name to map")
        }),
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        Value::Array(items) => match items.first() {
            Some(first) => representative_name(first),
            None => Err(EngineError::mismatch(
                "[]",
                "<item>",
                "an empty list has no name to map",
            )),
        },
        Value::Null => Err(EngineError::mismatch(
            "null",
            "<item>",
            "null items cannot be mapped",
        )),
    }
}

/// Correspondences for `items`, in order
pub fn generate_from_list(
    arena: &mut CorrespondenceArena,
    items: &[Value],
    options: &GenerateOptions,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<CorrId>, EngineError> {
    let names = items
        .iter()
        .map(representative_name)
        .collect::<Result<Vec<_>, _>>()?;
    let no_source = Value::Null;
    let mut ctx = StrategyContext {
        arena,
        source: &no_source,
        filtered: &[],
        diagnostics,
    };
    Ordinal(options.clone()).generate(&names, &mut ctx)
}

/// Everything a [`MapStrategy`] may consult while generating
pub struct StrategyContext<'a> {
    pub arena: &'a mut CorrespondenceArena,
    /// The whole source document
    pub source: &'a Value,
    /// Nodes found by discovery, in the same order as the names
    pub filtered: &'a [ScanMatch],
    pub diagnostics: &'a mut Diagnostics,
}

impl StrategyContext<'_> {
    /// The discovered node behind `name`; the last one wins on duplicates
    pub fn node_named(&self, name: &str) -> Option<&Value> {
        self.filtered
            .iter()
            .rev()
            .find(|m| m.name() == Some(name))
            .map(|m| &m.node)
    }
}

/// A way of turning discovered names into correspondences
pub trait MapStrategy {
    fn generate(
        &self,
        names: &[String],
        ctx: &mut StrategyContext<'_>,
    ) -> Result<Vec<CorrId>, EngineError>;
}

/// Names in discovery order, ordinals counting up
#[derive(Debug, Clone, Default)]
pub struct Ordinal(pub GenerateOptions);

impl MapStrategy for Ordinal {
    fn generate(
        &self,
        names: &[String],
        ctx: &mut StrategyContext<'_>,
    ) -> Result<Vec<CorrId>, EngineError> {
        let options = &self.0;
        warn_duplicates(names, ctx.diagnostics);

        let mut ids = Vec::with_capacity(names.len());
        for (offset, name) in names.iter().enumerate() {
            let slot = options.start + offset;
            let mut elem = Correspondence::new(
                (!options.none_key).then(|| name.clone()),
                (!options.none_value).then_some(slot),
            );
            if let Some(parents) = &options.parent_map {
                elem.parent = ctx.arena.find_by_name(parents, name);
            }
            if let Some(parents) = &options.value_map {
                elem.parent = ctx.arena.find_by_slot(parents, slot);
            }
            ids.push(ctx.arena.alloc(elem));
        }
        Ok(ids)
    }
}

/// Each name points at a parent through a `name -> parent name` table
///
/// The record takes the parent's slot.
#[derive(Debug, Clone, Default)]
pub struct ParentMatch {
    pub values: HashMap<String, String>,
    pub parents: Vec<CorrId>,
}

impl MapStrategy for ParentMatch {
    fn generate(
        &self,
        names: &[String],
        ctx: &mut StrategyContext<'_>,
    ) -> Result<Vec<CorrId>, EngineError> {
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            let parent = self
                .values
                .get(name)
                .and_then(|parent_name| ctx.arena.find_by_name(&self.parents, parent_name));
            let slot = parent.and_then(|p| ctx.arena.get(p).slot);
            let mut elem = Correspondence::new(Some(name.clone()), slot);
            elem.parent = parent;
            ids.push(ctx.arena.alloc(elem));
        }
        Ok(ids)
    }
}

/// Each node names its parent through `path`; ordinals restart per parent
///
/// Used for connection points, which are numbered within their VDU:
///
/// ```text
///     c1_nic0 (binds c1) -> 0
///     c1_nic1 (binds c1) -> 1
///     s3_nic0 (binds s3) -> 0
/// ```
#[derive(Debug, Clone)]
pub struct Binding {
    /// Read relative to each discovered node
    pub path: Path,
    pub parents: Vec<CorrId>,
    pub start: usize,
}

impl MapStrategy for Binding {
    fn generate(
        &self,
        names: &[String],
        ctx: &mut StrategyContext<'_>,
    ) -> Result<Vec<CorrId>, EngineError> {
        warn_duplicates(names, ctx.diagnostics);

        let mut ids = Vec::with_capacity(names.len());
        let mut last_bound: Option<Option<String>> = None;
        let mut counter = self.start;

        for name in names {
            let bound = match ctx.node_named(name) {
                Some(node) => document::read(node, &self.path, ReadOptions::optional())?
                    .map(|value| representative_name(&value))
                    .transpose()?,
                None => None,
            };

            if last_bound.as_ref() == Some(&bound) {
                counter += 1;
            } else {
                counter = self.start;
                last_bound = Some(bound.clone());
            }

            let mut elem = Correspondence::new(Some(name.clone()), Some(counter));
            elem.parent = bound
                .as_deref()
                .and_then(|parent_name| ctx.arena.find_by_name(&self.parents, parent_name));
            if elem.parent.is_none() {
                log::debug!("{} has no bound parent at '{}'", name, self.path);
            }
            ids.push(ctx.arena.alloc(elem));
        }
        Ok(ids)
    }
}

fn warn_duplicates(names: &[String], diagnostics: &mut Diagnostics) {
    let mut seen = std::collections::HashSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            diagnostics.push(Warning::DuplicateKeyCollision {
                key: name.clone(),
                context: "generated correspondences".to_string(),
            });
        }
    }
}

/// How repeated nodes are located before a strategy runs
#[derive(Debug)]
pub enum Discovery {
    /// Search below the path
    Scan(Scan),
    /// Every element (list) or entry (map) at the path
    Children,
}

/// Where and how to discover nodes for [`generate_from_scan`]
#[derive(Debug)]
pub struct ScanRequest<'a> {
    pub source: &'a Value,
    pub path: Option<Path>,
    pub discovery: Discovery,
    pub parent: Option<CorrId>,
    pub silent: bool,
}

impl<'a> ScanRequest<'a> {
    pub fn new(source: &'a Value, discovery: Discovery) -> Self {
        ScanRequest {
            source,
            path: None,
            discovery,
            parent: None,
            silent: false,
        }
    }

    /// Discover below `path` instead of the document root
    pub fn under(mut self, path: Path) -> Self {
        self.path = Some(path);
        self
    }

    /// Link every generated record to `parent`
    pub fn with_parent(mut self, parent: CorrId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    fn discover(&self) -> Result<Vec<ScanMatch>, EngineError> {
        let root = match (&self.path, &self.discovery) {
            (None, _) => self.source.clone(),
            (Some(path), Discovery::Scan(_)) => {
                document::read(self.source, path, ReadOptions::required().ensure_map())?
                    .unwrap_or(Value::Null)
            }
            (Some(path), Discovery::Children) => {
                document::read(self.source, path, ReadOptions::required())?
                    .unwrap_or(Value::Null)
            }
        };

        Ok(match &self.discovery {
            Discovery::Scan(scan) => scan.find(&root),
            Discovery::Children => children(root),
        })
    }
}

fn children(root: Value) -> Vec<ScanMatch> {
    match root {
        Value::Array(items) => items
            .into_iter()
            .map(|node| ScanMatch { key: None, node })
            .collect(),
        Value::Object(map) => map
            .into_iter()
            .map(|(key, node)| ScanMatch {
                key: Some(key),
                node,
            })
            .collect(),
        Value::Null => Vec::new(),
        scalar => vec![ScanMatch {
            key: None,
            node: scalar,
        }],
    }
}

/// Discover nodes in a document and package them through `strategy`
pub fn generate_from_scan(
    arena: &mut CorrespondenceArena,
    request: &ScanRequest<'_>,
    strategy: &dyn MapStrategy,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<CorrId>, EngineError> {
    let found = request.discover()?;
    let names = found
        .iter()
        .map(|m| representative_name(&m.to_value()))
        .collect::<Result<Vec<_>, _>>()?;

    let mut ctx = StrategyContext {
        arena,
        source: request.source,
        filtered: &found,
        diagnostics,
    };
    let ids = strategy.generate(&names, &mut ctx)?;

    if let Some(parent) = request.parent {
        arena.add_parent(&ids, parent, request.silent)?;
    }
    Ok(ids)
}

/// Renumber `ids` from the first record's slot when the slots have gaps
///
/// Returns whether anything changed.
pub fn ensure_contiguous(arena: &mut CorrespondenceArena, ids: &[CorrId]) -> bool {
    let Some(first) = ids.first() else {
        return false;
    };
    let base = arena.get(*first).slot.unwrap_or(0);
    let contiguous = ids
        .iter()
        .enumerate()
        .all(|(offset, id)| arena.get(*id).slot == Some(base + offset));
    if !contiguous {
        renumber(arena, ids, base);
    }
    !contiguous
}

/// Force slots to `start, start + 1, ...`
pub fn renumber(arena: &mut CorrespondenceArena, ids: &[CorrId], start: usize) {
    for (offset, id) in ids.iter().enumerate() {
        arena.set_slot(*id, start + offset);
    }
}

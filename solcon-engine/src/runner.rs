//! Mapping table execution
//!
//! A [`MappingTable`] is an ordered list of [`MappingEntry`] values plus the arena holding
//! every correspondence the entries refer to. The runner walks the entries in order:
//!
//! ```text
//!     next entry ──▶ flags ──┬──▶ single write ──────────────────────────┐
//!                            └──▶ per correspondence:                     │
//!                                   parent check (ReqParent)              │
//!                                   target by slot, source by name/slot   │
//!                                   pipeline, write ──────────────────────┤
//!     next entry ◀────────────────────────────────────────────────────────┘
//! ```
//!
//! Writes are skipped when the pipeline produces a falsy value, except the integer `0`.
//! Fatal errors abort the pass and leave the target as written so far; everything else
//! ends up as a warning in the [`RunReport`].

use crate::correspondence::{CorrId, CorrespondenceArena};
use crate::document::{self, WriteOptions};
use crate::error::{Diagnostics, EngineError, Warning};
use crate::flags::{EntryInput, EnumCatalogs, Flag, FlagPipeline, FlagSet};
use crate::path::{Path, Resolve};
use serde_json::Value;

/// One row of a mapping table
#[derive(Debug, Clone, PartialEq)]
pub struct MappingEntry {
    /// Where the value comes from; for `KeySetValue` its last segment is the value
    pub source: Path,
    pub target: Path,
    pub flags: FlagSet,
    /// One write per correspondence when present
    pub correspondences: Option<Vec<CorrId>>,
}

impl MappingEntry {
    pub fn single(source: Path, target: Path, flags: FlagSet) -> Self {
        MappingEntry {
            source,
            target,
            flags,
            correspondences: None,
        }
    }

    pub fn indexed(source: Path, target: Path, flags: FlagSet, correspondences: Vec<CorrId>) -> Self {
        MappingEntry {
            source,
            target,
            flags,
            correspondences: Some(correspondences),
        }
    }

    pub fn is_indexed(&self) -> bool {
        self.correspondences.is_some()
    }
}

/// Which side of an indexed entry is addressed by ordinal slots
///
/// SOL006 keeps repeated structures in lists and TOSCA keys them by node name, so a
/// TOSCA to SOL006 table indexes its target and the reverse table indexes its source.
/// The other side is addressed by name, or by slot with `UseValue`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IndexSide {
    #[default]
    Target,
    Source,
}

/// Entries and the correspondences they index with
#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    pub arena: CorrespondenceArena,
    pub entries: Vec<MappingEntry>,
    pub index_side: IndexSide,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_arena(arena: CorrespondenceArena) -> Self {
        MappingTable {
            arena,
            ..Default::default()
        }
    }

    pub fn indexing(mut self, side: IndexSide) -> Self {
        self.index_side = side;
        self
    }

    pub fn push(&mut self, entry: MappingEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of a successful pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub diagnostics: Diagnostics,
    pub entries: usize,
    pub writes: usize,
    /// Pipeline results that were falsy and therefore not written
    pub suppressed: usize,
    /// Correspondences skipped for lacking a required parent, or a chain too short
    /// to fill their paths under `FailSilent`
    pub skipped: usize,
}

impl RunReport {
    pub fn warnings(&self) -> &[Warning] {
        self.diagnostics.warnings()
    }
}

/// Executes mapping tables against a source document
#[derive(Debug, Clone, Copy)]
pub struct MappingRunner<'a> {
    pipeline: FlagPipeline<'a>,
}

impl<'a> MappingRunner<'a> {
    pub fn new(catalogs: &'a EnumCatalogs) -> Self {
        MappingRunner {
            pipeline: FlagPipeline::new(catalogs),
        }
    }

    pub fn run(
        &self,
        table: &MappingTable,
        source: &Value,
        target: &mut Value,
    ) -> Result<RunReport, EngineError> {
        let mut report = RunReport::default();

        for entry in &table.entries {
            report.entries += 1;
            match &entry.correspondences {
                None => {
                    self.write_one(entry, &entry.source, &entry.target, 0, source, target, &mut report)?;
                }
                Some(ids) => self.run_indexed(table, entry, ids, source, target, &mut report)?,
            }
        }

        log::debug!(
            "ran {} entries: {} writes, {} suppressed, {} skipped, {} warnings",
            report.entries,
            report.writes,
            report.suppressed,
            report.skipped,
            report.diagnostics.len()
        );
        Ok(report)
    }

    fn run_indexed(
        &self,
        table: &MappingTable,
        entry: &MappingEntry,
        ids: &[CorrId],
        source: &Value,
        target: &mut Value,
        report: &mut RunReport,
    ) -> Result<(), EngineError> {
        let arena = &table.arena;
        let named = if entry.flags.contains(Flag::UseValue) {
            Resolve::Slot
        } else {
            Resolve::Name
        };
        let (source_by, target_by) = match table.index_side {
            IndexSide::Target => (named, Resolve::Slot),
            IndexSide::Source => (Resolve::Slot, named),
        };

        for (run, &id) in ids.iter().enumerate() {
            if entry.flags.contains(Flag::ReqParent) && arena.get(id).parent.is_none() {
                let warning = Warning::MissingParent {
                    elem: arena.describe(id),
                    path: entry.target.to_string(),
                };
                if entry.flags.contains(Flag::FailSilent) {
                    report.diagnostics.push_silent(warning);
                } else {
                    report.diagnostics.push(warning);
                }
                report.skipped += 1;
                continue;
            }

            let target_path = entry.target.resolve(arena, Some(id), target_by);
            let source_path = entry.source.resolve(arena, Some(id), source_by);

            // Without FailSilent an unfilled target placeholder fails in the write
            if entry.flags.contains(Flag::FailSilent)
                && (target_path.has_placeholders() || source_path.has_placeholders())
            {
                let path = if target_path.has_placeholders() {
                    &target_path
                } else {
                    &source_path
                };
                report.diagnostics.push_silent(Warning::UnresolvedPlaceholder {
                    elem: arena.describe(id),
                    path: path.to_string(),
                });
                report.skipped += 1;
                continue;
            }
            self.write_one(entry, &source_path, &target_path, run, source, target, report)?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn write_one(
        &self,
        entry: &MappingEntry,
        source_path: &Path,
        target_path: &Path,
        run: usize,
        source: &Value,
        target: &mut Value,
        report: &mut RunReport,
    ) -> Result<(), EngineError> {
        let input = EntryInput {
            source_path,
            target_path,
            run,
            source,
            target: &*target,
        };
        let value = self.pipeline.apply(entry.flags, input, &mut report.diagnostics)?;

        if !document::should_write(value.as_ref()) {
            report.suppressed += 1;
            return Ok(());
        }
        if let Some(value) = value {
            log::trace!("{} -> {}", source_path, target_path);
            document::write(target, target_path, value, WriteOptions::create())?;
            report.writes += 1;
        }
        Ok(())
    }
}

//! Path-based tree mapping engine
//!
//!     Descriptors in one dialect are turned into the other by a table of entries, each
//!     reading a value at a source path, transforming it through a fixed pipeline of flags
//!     and writing it at a target path. Repeated structures are handled with path templates
//!     (`vdu.{}.int-cpd.{}.id`) whose placeholders are filled from correspondence chains.
//!
//! Architecture
//!
//!     source doc ──▶ scan ──▶ correspondence ──▶ runner ──▶ target doc
//!                                  ▲               │
//!     paths (TOML) ──▶ table ──────┘            flags + document
//!
//!     - path.rs: path templates, segments, placeholder resolution
//!     - document.rs: reading and writing values inside nested documents
//!     - scan.rs: locating repeated sibling structures
//!     - correspondence.rs: (name, slot, parent) records and the strategies that make them
//!     - flags.rs: the per-entry transform pipeline and enum catalogs
//!     - runner.rs: mapping tables and their execution
//!     - paths.rs: logical-name bundles and provider identifiers
//!     - table.rs: building tables from logical names, and the declarative table format
//!
//!     Documents are plain `serde_json::Value` trees with key order preserved. The engine
//!     has no global state; a table runs against one source and one target at a time.
//!
//! Errors
//!
//!     Structural problems and missing required values are [`EngineError`]s and abort a
//!     pass. Data-quality problems are [`Warning`]s collected in [`Diagnostics`] and
//!     returned in the [`RunReport`].

pub mod correspondence;
pub mod document;
pub mod error;
pub mod flags;
pub mod path;
pub mod paths;
pub mod runner;
pub mod scan;
pub mod table;

pub use correspondence::{CorrId, Correspondence, CorrespondenceArena};
pub use error::{Diagnostics, EngineError, Warning};
pub use flags::{EnumCatalogs, Flag, FlagPipeline, FlagSet};
pub use path::{Path, Resolve, Segment};
pub use paths::{PathConfig, Section};
pub use runner::{IndexSide, MappingEntry, MappingRunner, MappingTable, RunReport};
pub use scan::{Scan, ScanMatch};
pub use table::{TableBuilder, TableSpec};

//! Descriptor conversion between TOSCA and SOL006
//!
//!     This crate puts the mapping engine to work on real descriptors. Each dialect pair is
//!     a converter that builds a mapping table for the document at hand and runs it; the
//!     path bundles that name every location ship with the crate.
//!
//! Architecture
//!
//!     - Converter trait: one direction between two dialects, see ./converter.rs
//!     - ConverterRegistry: discovery and selection by name
//!     - Converters: the concrete tables, one module each
//!
//!     Like the engine, this is a pure lib: no printing, no env vars, no files. Reading
//!     descriptors from disk and writing results is the CLI's business.
//!
//!     The file structure :
//!     .
//!     ├── error.rs
//!     ├── converter.rs            # Converter trait definition
//!     ├── registry.rs             # ConverterRegistry
//!     ├── converters
//!     │   ├── cisco.rs            # Cisco TOSCA -> SOL006
//!     │   ├── nokia.rs            # Nokia TOSCA -> SOL006, a plain declarative table
//!     │   └── sol6_to_tosca.rs    # SOL006 -> TOSCA
//!     ├── defaults.rs             # embedded path bundles and tables (defaults/*.toml)
//!     ├── input.rs                # parsing, provider sniffing, input substitution
//!     ├── output.rs               # pruning, envelope, rendering
//!     └── lib.rs
//!
//! Testing
//!     tests
//!     ├── cisco.rs
//!     ├── sol6_to_tosca.rs
//!     └── fixtures
//!         └── <descriptor>.yaml
//!
//! Lossiness
//!
//!     The dialects do not cover the same ground. TOSCA node types, input defaults and
//!     provider-specific properties have no SOL006 home, and SOL006 keeps connectivity and
//!     storage details TOSCA never states, so a round trip through both converters is not
//!     expected to reproduce its input.

pub mod converter;
pub mod converters;
pub mod defaults;
pub mod error;
pub mod input;
pub mod output;
pub mod registry;

pub use converter::{Conversion, Converter};
pub use defaults::{default_paths, load_paths};
pub use error::ConvertError;
pub use output::OutputFormat;
pub use registry::ConverterRegistry;

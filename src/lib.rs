//! # solcon
//!
//! Conversion between TOSCA and SOL006 (YANG) VNF descriptors.
//!
//! The work is split across the workspace:
//!
//!     - solcon-engine: paths, correspondences, the flag pipeline and the mapping runner
//!     - solcon-babel: converters, the embedded path bundles, input and output shaping
//!     - solcon-config: application settings
//!     - solcon-cli: the `solcon` binary
//!
//! This crate re-exports the libraries and offers [`convert`] for the common case of
//! running a shipped converter with the shipped path bundles.

pub use solcon_babel as babel;
pub use solcon_config as config;
pub use solcon_engine as engine;

pub use solcon_babel::{Conversion, ConvertError, Converter, ConverterRegistry, OutputFormat};
pub use solcon_engine::{EngineError, MappingRunner, MappingTable, Path, PathConfig, Warning};

use serde_json::Value;

/// Run the converter named `converter` over `source` with the built-in path bundles
pub fn convert(source: &Value, converter: &str) -> Result<Conversion, ConvertError> {
    let paths = solcon_babel::default_paths()?;
    ConverterRegistry::with_defaults()
        .get(converter)?
        .convert(source, &paths)
}

//! Converter trait definition
//!
//! Every dialect pair is a [`Converter`]: it builds a mapping table for one source
//! document and runs it, returning the bare target document together with the
//! run report. Wrapping, pruning and rendering are left to [`crate::output`].

use crate::error::ConvertError;
use serde_json::Value;
use solcon_engine::{PathConfig, RunReport};

/// A converted document and what happened while producing it
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub document: Value,
    pub report: RunReport,
}

/// Trait for descriptor converters
///
/// ```ignore
/// struct Passthrough;
///
/// impl Converter for Passthrough {
///     fn name(&self) -> &str {
///         "passthrough"
///     }
///
///     fn convert(&self, source: &Value, _paths: &PathConfig) -> Result<Conversion, ConvertError> {
///         Ok(Conversion { document: source.clone(), report: RunReport::default() })
///     }
/// }
/// ```
pub trait Converter: Send + Sync {
    /// Registry key; for TOSCA input this is also the provider it handles
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Whether the input is SOL006 rather than TOSCA
    fn reads_sol6(&self) -> bool {
        false
    }

    fn convert(&self, source: &Value, paths: &PathConfig) -> Result<Conversion, ConvertError>;
}

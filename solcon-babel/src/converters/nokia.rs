//! Nokia TOSCA to SOL006
//!
//! The whole mapping is the declarative table in `defaults/nokia-table.toml`, compiled
//! against each descriptor. Node kinds come from the `nokia` provider identifiers.

use crate::converter::{Conversion, Converter};
use crate::defaults::NOKIA_TABLE;
use crate::error::ConvertError;
use crate::input::substitute_inputs;
use serde_json::{Map, Value};
use solcon_engine::{Diagnostics, MappingRunner, PathConfig, TableSpec};

pub struct NokiaConverter;

impl Converter for NokiaConverter {
    fn name(&self) -> &str {
        "nokia"
    }

    fn description(&self) -> &str {
        "Nokia TOSCA VNF descriptors to SOL006"
    }

    fn convert(&self, source: &Value, paths: &PathConfig) -> Result<Conversion, ConvertError> {
        let paths = paths.for_provider(self.name())?;

        let mut source = source.clone();
        let inputs = paths.tosca().path("inputs")?;
        let configured = paths.tosca().literal("input_values").ok();
        substitute_inputs(&mut source, &inputs, configured);

        let spec = TableSpec::from_toml_str(NOKIA_TABLE)?;
        let mut diagnostics = Diagnostics::new();
        let table = spec.compile(paths.tosca(), paths.sol6(), &source, &mut diagnostics)?;
        log::info!(
            "built nokia table: {} entries, {} correspondences",
            table.len(),
            table.arena.len()
        );

        let catalogs = paths.catalogs();
        let mut document = Value::Object(Map::new());
        let mut report = MappingRunner::new(&catalogs).run(&table, &source, &mut document)?;
        diagnostics.extend(report.diagnostics);
        report.diagnostics = diagnostics;

        Ok(Conversion { document, report })
    }
}

//! Path bundles shipped with the converters

use solcon_engine::{EngineError, PathConfig};

/// TOSCA locations and provider identifiers
pub const TOSCA_PATHS: &str = include_str!("../defaults/tosca-paths.toml");

/// SOL006 locations and enum catalogs
pub const SOL6_PATHS: &str = include_str!("../defaults/sol6-paths.toml");

/// Declarative table of the Nokia converter
pub const NOKIA_TABLE: &str = include_str!("../defaults/nokia-table.toml");

/// Both shipped bundles merged
pub fn default_paths() -> Result<PathConfig, EngineError> {
    load_paths(TOSCA_PATHS, SOL6_PATHS)
}

/// Merge a TOSCA bundle and a SOL006 bundle
pub fn load_paths(tosca: &str, sol6: &str) -> Result<PathConfig, EngineError> {
    PathConfig::from_toml_str(tosca)?.merged_with(PathConfig::from_toml_str(sol6)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipped_bundles_load() {
        let paths = default_paths().unwrap();
        assert_eq!(paths.delimiter(), ';');
        assert_eq!(paths.providers().to_vec(), vec!["cisco", "nokia"]);
        assert_eq!(
            paths.tosca().path("vdu_name").unwrap().to_string(),
            "topology_template;node_templates;{};properties;name"
        );
        assert_eq!(
            paths.sol6().path("df_inst_level_vdu_vdu").unwrap().to_string(),
            "vnfd;df;instantiation-level;{};vdu-level;{};vdu-id"
        );
    }

    #[test]
    fn test_cisco_identifiers() {
        let paths = default_paths().unwrap().for_provider("cisco").unwrap();
        for kind in ["vdu", "int_cpd", "int_cpd_mgmt", "virtual_storage", "instantiation_level"] {
            assert!(paths.tosca().identifier(kind).is_ok(), "{}", kind);
        }
    }

    #[test]
    fn test_nokia_uses_standard_node_types() {
        let paths = default_paths().unwrap().for_provider("Nokia Solutions").unwrap();
        assert_eq!(paths.provider(), Some("nokia"));
        let vdu = paths.tosca().identifier("vdu").unwrap();
        assert_eq!(vdu.value, "tosca.nodes.nfv.Vdu.Compute");
        assert!(paths.tosca().identifier("int_cpd_mgmt").is_err());
    }

    #[test]
    fn test_catalogs_come_from_the_sol6_bundle() {
        let catalogs = default_paths().unwrap().catalogs();
        assert_eq!(catalogs.protocol_prefix, "etsi-nfv-descriptors:");
        assert!(catalogs.disk_formats.contains(&"qcow2".to_string()));
    }
}

//! Cisco TOSCA -> SOL006 over a complete descriptor
//!
//! The fixture has two VDUs, three connection points bound across them, one image-backed
//! storage node, instantiation levels, one scaling aspect with a VDU delta and an
//! anti-affinity rule.

use serde_json::{json, Value};
use solcon_babel::input::{find_provider, parse_document};
use solcon_babel::{default_paths, Conversion, ConverterRegistry};
use solcon_engine::Warning;

const FIXTURE: &str = include_str!("fixtures/cisco_vnf.yaml");

fn convert() -> Conversion {
    let source = parse_document(FIXTURE).expect("fixture parses");
    let registry = ConverterRegistry::with_defaults();
    registry
        .get("cisco")
        .expect("cisco converter registered")
        .convert(&source, &default_paths().expect("default paths load"))
        .expect("fixture converts")
}

fn vnfd(conversion: &Conversion) -> &Value {
    &conversion.document["vnfd"]
}

#[test]
fn test_provider_is_sniffed_from_text() {
    assert_eq!(find_provider(FIXTURE).unwrap(), "cisco");
}

#[test]
fn test_metadata() {
    let conversion = convert();
    let vnfd = vnfd(&conversion);
    assert_eq!(vnfd["id"], "pgw");
    assert_eq!(vnfd["provider"], "Cisco");
    assert_eq!(vnfd["product-name"], "PGW");
    assert_eq!(vnfd["software-version"], "21.28");
    assert_eq!(vnfd["version"], "1.0");
    assert_eq!(vnfd["product-info-description"], "Two-VDU packet gateway");
}

#[test]
fn test_fixed_links_and_external_cps() {
    let conversion = convert();
    let vnfd = vnfd(&conversion);
    assert_eq!(vnfd["int-virtual-link-desc"][0]["id"], "CP_MGMT");
    assert_eq!(vnfd["int-virtual-link-desc"][1]["id"], "CP_ORCH");
    assert_eq!(
        vnfd["int-virtual-link-desc"][0]["connectivity-type"]["layer-protocol"],
        json!(["etsi-nfv-descriptors:ipv4"])
    );
    assert_eq!(vnfd["ext-cpd"][1]["id"], "CP_EXT_ORCH");
    assert_eq!(vnfd["ext-cpd"][1]["int-virtual-link-desc"], "CP_ORCH");
}

#[test]
fn test_vdus_in_document_order() {
    let conversion = convert();
    let vdu = &vnfd(&conversion)["vdu"];
    assert_eq!(vdu[0]["id"], "vduA");
    assert_eq!(vdu[0]["name"], "Control Function");
    assert_eq!(vdu[0]["description"], "Control plane");
    assert_eq!(vdu[1]["id"], "vduB");
    assert_eq!(vdu[1].get("description"), None);
}

#[test]
fn test_connection_point_ordinals_restart_per_vdu() {
    let conversion = convert();
    let vdu = &vnfd(&conversion)["vdu"];

    assert_eq!(vdu[0]["int-cpd"][0]["id"], "cp1");
    assert_eq!(vdu[0]["int-cpd"][1]["id"], "cp2");
    assert_eq!(vdu[1]["int-cpd"][0]["id"], "cp3");
    assert_eq!(vdu[1]["int-cpd"].as_array().map(Vec::len), Some(1));

    assert_eq!(vdu[0]["int-cpd"][0]["int-virtual-link-desc"], "CP_MGMT");
    assert_eq!(vdu[0]["int-cpd"][1]["int-virtual-link-desc"], "CP_ORCH");
    assert_eq!(vdu[1]["int-cpd"][0]["int-virtual-link-desc"], "CP_ORCH");
    assert_eq!(
        vdu[0]["int-cpd"][1]["layer-protocol"],
        json!(["etsi-nfv-descriptors:ipv4", "etsi-nfv-descriptors:ipv6"])
    );
}

#[test]
fn test_boot_order_and_storage_links() {
    let conversion = convert();
    let vdu = &vnfd(&conversion)["vdu"];
    assert_eq!(
        vdu[0]["boot-order"],
        json!([{"key": 0, "value": "vduA_storage"}])
    );
    assert_eq!(vdu[0]["virtual-storage-desc"], json!(["vduA_storage"]));
    assert_eq!(vdu[1].get("boot-order"), None);
}

#[test]
fn test_virtual_compute_uses_substituted_inputs() {
    let conversion = convert();
    let vnfd = vnfd(&conversion);
    assert_eq!(vnfd["vdu"][0]["virtual-compute-desc"], "vduA");

    let compute = &vnfd["virtual-compute-descriptor"][0];
    assert_eq!(compute["id"], "vduA");
    assert_eq!(compute["virtual-cpu"]["num-virtual-cpu"], 8);
    assert_eq!(compute["virtual-memory"]["size"], json!(16.0));
}

#[test]
fn test_storage_and_images() {
    let conversion = convert();
    let vnfd = vnfd(&conversion);

    let storage = &vnfd["virtual-storage-descriptor"][0];
    assert_eq!(storage["id"], "vduA_storage");
    assert_eq!(storage["type-of-storage"], "root-storage");
    assert_eq!(storage["size-of-storage"], 16);
    assert_eq!(storage["sw-image-desc"], "vduA_storage");

    let image = &vnfd["sw-image-desc"][0];
    assert_eq!(image["id"], "vduA_storage");
    assert_eq!(image["version"], "21.28");
    assert_eq!(image["container-format"], "bare");
    assert_eq!(image["disk-format"], "qcow2");
    assert_eq!(image["min-disk"], 16);
    assert_eq!(image["size"], 16);
    assert_eq!(image["image"], "../Images/cf-21.28.qcow2");
}

#[test]
fn test_deployment_flavour() {
    let conversion = convert();
    let df = &vnfd(&conversion)["df"];

    assert_eq!(df["id"], "default");
    assert_eq!(df["description"], "Default deployment");
    assert_eq!(df["vdu-profile"][0]["id"], "vduA");
    assert_eq!(df["vdu-profile"][0]["min-number-of-instances"], 0);
    assert_eq!(df["vdu-profile"][1]["max-number-of-instances"], 8);

    let level = &df["instantiation-level"][0];
    assert_eq!(level["id"], "default");
    assert_eq!(level["description"], "Smallest working deployment");
    assert_eq!(
        level["vdu-level"],
        json!([
            {"vdu-id": "vduA", "number-of-instances": 1},
            {"vdu-id": "vduB", "number-of-instances": 2}
        ])
    );
}

#[test]
fn test_scaling_aspect_and_deltas() {
    let conversion = convert();
    let df = &vnfd(&conversion)["df"];

    assert_eq!(
        df["scaling-aspect"],
        json!([{
            "id": "processing",
            "name": "processing",
            "description": "User plane scale out",
            "max-scale-level": 3,
            "aspect-delta-details": {
                "step-deltas": ["delta_1"],
                "deltas": [{
                    "id": "delta_1",
                    "vdu-delta": [{"id": "vduB", "number-of-instances": 1}]
                }]
            }
        }])
    );
    assert_eq!(
        df["instantiation-level"][0]["scaling-info"],
        json!([{"scaling-aspect-id": "processing", "scale-level": 0}])
    );
}

#[test]
fn test_anti_affinity_group() {
    let conversion = convert();
    let df = &vnfd(&conversion)["df"];

    let group = &df["affinity-or-anti-affinity-group"][0];
    assert_eq!(group["id"], "control_anti_affinity");
    assert_eq!(group["type"], "anti-affinity");
    assert_eq!(group["scope"], "nfvi-node");
    assert_eq!(
        df["vdu-profile"][0]["affinity-or-anti-affinity-group"],
        json!([{"id": "control_anti_affinity"}])
    );
}

#[test]
fn test_clean_descriptor_has_no_structural_warnings() {
    let conversion = convert();
    assert!(conversion.report.warnings().iter().all(|w| matches!(
        w,
        Warning::MissingOptionalValue { .. }
    )));
    assert!(conversion.report.writes > 50);
}

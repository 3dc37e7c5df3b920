//! SOL006 -> TOSCA, fed with the output of the Cisco converter

use serde_json::{json, Value};
use solcon_babel::input::parse_document;
use solcon_babel::output::{prune_empty, unwrap_envelope, wrap_envelope};
use solcon_babel::{default_paths, ConverterRegistry};

const FIXTURE: &str = include_str!("fixtures/cisco_vnf.yaml");

fn sol6() -> Value {
    let source = parse_document(FIXTURE).expect("fixture parses");
    let paths = default_paths().expect("default paths load");
    let registry = ConverterRegistry::with_defaults();
    let conversion = registry
        .get("cisco")
        .unwrap()
        .convert(&source, &paths)
        .expect("fixture converts");
    wrap_envelope(prune_empty(conversion.document).unwrap_or_default())
}

fn tosca() -> Value {
    let registry = ConverterRegistry::with_defaults();
    registry
        .get("sol6-to-tosca")
        .unwrap()
        .convert(&sol6(), &default_paths().unwrap())
        .expect("sol6 converts")
        .document
}

#[test]
fn test_envelope_is_transparent() {
    let wrapped = sol6();
    assert_eq!(unwrap_envelope(&wrapped)["vnfd"]["id"], "pgw");
}

#[test]
fn test_vnf_node() {
    let tosca = tosca();
    let vnf = &tosca["topology_template"]["node_templates"]["vnf"];
    assert_eq!(vnf["type"], "pgw_VNF");
    assert_eq!(vnf["properties"]["descriptor_id"], "pgw");
    assert_eq!(vnf["properties"]["provider"], "Cisco");
    assert_eq!(vnf["properties"]["flavour_id"], "default");
}

#[test]
fn test_vdus_come_back_with_profiles_and_boot_order() {
    let tosca = tosca();
    let nodes = &tosca["topology_template"]["node_templates"];

    assert_eq!(nodes["vduA"]["type"], "pgw_VDU_Compute");
    assert_eq!(nodes["vduA"]["properties"]["name"], "Control Function");
    assert_eq!(
        nodes["vduA"]["properties"]["boot_order"],
        json!(["vduA_storage"])
    );
    assert_eq!(
        nodes["vduA"]["properties"]["vdu_profile"],
        json!({"min_number_of_instances": 0, "max_number_of_instances": 2})
    );
    assert_eq!(
        nodes["vduA"]["capabilities"]["virtual_compute"]["properties"]["virtual_cpu"]
            ["num_virtual_cpu"],
        8
    );
}

#[test]
fn test_connection_points_are_rebound() {
    let tosca = tosca();
    let nodes = &tosca["topology_template"]["node_templates"];

    for (cp, vdu) in [("cp1", "vduA"), ("cp2", "vduA"), ("cp3", "vduB")] {
        assert_eq!(nodes[cp]["type"], "pgw_VDU_CP", "{}", cp);
        assert_eq!(
            nodes[cp]["requirements"][0]["virtual_binding"],
            vdu,
            "{}",
            cp
        );
    }
}

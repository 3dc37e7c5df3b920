//! SOL006 to TOSCA
//!
//! The reverse table reads list positions on the SOL006 side and writes TOSCA nodes by
//! name, so every correspondence carries the SOL006 id as its name and the list index
//! as its slot:
//!
//!     vnfd.vdu.1.int-cpd.0.layer-protocol  ->  node_templates.s3_nic0.properties.layer_protocols
//!
//! Node types are derived from the descriptor id (`<vnfd-id>_VNF`, `<vnfd-id>_VDU_Compute`,
//! `<vnfd-id>_VDU_CP`).

use crate::converter::{Conversion, Converter};
use crate::error::ConvertError;
use crate::output::unwrap_envelope;
use serde_json::{Map, Value};
use solcon_engine::document::{self, ReadOptions};
use solcon_engine::{
    CorrId, Correspondence, Diagnostics, EngineError, Flag, FlagSet, IndexSide, MappingRunner,
    MappingTable, Path, PathConfig, Resolve, Section, TableBuilder,
};

pub struct Sol6ToToscaConverter;

impl Converter for Sol6ToToscaConverter {
    fn name(&self) -> &str {
        "sol6-to-tosca"
    }

    fn description(&self) -> &str {
        "SOL006 VNF descriptors to TOSCA"
    }

    fn reads_sol6(&self) -> bool {
        true
    }

    fn convert(&self, source: &Value, paths: &PathConfig) -> Result<Conversion, ConvertError> {
        let source = unwrap_envelope(source);

        let mut diagnostics = Diagnostics::new();
        let table = build_table(paths, source, &mut diagnostics)?;

        let catalogs = paths.catalogs();
        let mut document = Value::Object(Map::new());
        let mut report = MappingRunner::new(&catalogs).run(&table, source, &mut document)?;
        diagnostics.extend(report.diagnostics);
        report.diagnostics = diagnostics;

        Ok(Conversion { document, report })
    }
}

/// `(index, id)` for every element of the list at `path` that has an id under `key`
fn ids_at(source: &Value, path: &Path, key: &str) -> Result<Vec<(usize, String)>, EngineError> {
    let items = match document::read(source, path, ReadOptions::optional().silent(true))? {
        Some(Value::Array(items)) => items,
        Some(single @ Value::Object(_)) => vec![single],
        _ => return Ok(Vec::new()),
    };
    Ok(items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            item.get(key).map(|id| match id {
                Value::String(text) => (index, text.clone()),
                other => (index, other.to_string()),
            })
        })
        .collect())
}

fn alloc_all(
    table: &mut MappingTable,
    ids: &[(usize, String)],
    parent: Option<CorrId>,
) -> Vec<CorrId> {
    ids.iter()
        .map(|(index, id)| {
            let mut elem = Correspondence::new(Some(id.clone()), Some(*index));
            elem.parent = parent;
            table.arena.alloc(elem)
        })
        .collect()
}

fn literal(section: &Section, name: &str) -> Result<String, EngineError> {
    match section.literal(name)? {
        Value::String(text) => Ok(text.clone()),
        other => Ok(other.to_string()),
    }
}

pub(crate) fn build_table(
    paths: &PathConfig,
    source: &Value,
    diagnostics: &mut Diagnostics,
) -> Result<MappingTable, EngineError> {
    let sol6 = paths.sol6();
    let tosca = paths.tosca();
    let mut b = TableBuilder::new(sol6, tosca).indexing(IndexSide::Source);

    let vnfd_id = match document::read(source, &sol6.path("vnfd_id")?, ReadOptions::required())? {
        Some(Value::String(id)) => id,
        Some(other) => other.to_string(),
        None => String::new(),
    };

    metadata(&mut b, &vnfd_id)?;
    let vdus = vdus(&mut b, source, &vnfd_id, diagnostics)?;
    connection_points(&mut b, source, &vdus, &vnfd_id)?;
    deployment_flavour(&mut b, source)?;

    let table = b.finish();
    log::info!(
        "built sol6-to-tosca table: {} entries, {} correspondences",
        table.len(),
        table.arena.len()
    );
    Ok(table)
}

fn metadata(b: &mut TableBuilder<'_>, vnfd_id: &str) -> Result<(), EngineError> {
    let tosca = b.to_section();
    let vnf_type = format!("{}_VNF", vnfd_id);

    b.set_value(
        &literal(tosca, "TOSCA_DEFINITIONS_VERSION")?,
        "definitions_version",
        &[],
        FlagSet::empty(),
        None,
    )?
    .set_value(&vnf_type, "vnf_type", &[], FlagSet::empty(), None)?
    .set_value(&vnf_type, "substitution_type", &[], FlagSet::empty(), None)?;

    b.single("vnfd_id", "vnf_desc_id", Flag::Required.into())?;
    for (from, to) in [
        ("vnfd_provider", "vnf_provider"),
        ("vnfd_product", "vnf_product_name"),
        ("vnfd_software_ver", "vnf_software_ver"),
        ("vnfd_ver", "vnf_desc_ver"),
        ("vnfd_info_name", "vnf_product_info_name"),
        ("vnfd_info_desc", "vnf_product_info_desc"),
        ("vnfd_vnfm_info", "vnf_vnfm_info"),
    ] {
        b.single(from, to, Flag::FailSilent.into())?;
    }
    Ok(())
}

fn vdus(
    b: &mut TableBuilder<'_>,
    source: &Value,
    vnfd_id: &str,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<CorrId>, EngineError> {
    let sol6 = b.from_section();
    let quiet = FlagSet::from(Flag::FailSilent);

    let found = ids_at(source, &sol6.path("vdus")?, "id")?;
    let vdus = alloc_all(b.table_mut(), &found, None);
    log::debug!("found {} vdus", vdus.len());

    b.set_type(&format!("{}_VDU_Compute", vnfd_id), "vdu_type", &vdus)?
        .indexed("vdu_name", "vdu_name", quiet, &vdus)?
        .indexed("vdu_desc", "vdu_desc", quiet, &vdus)?;

    // Boot order is keyed by position; TOSCA wants the plain list
    let boot_list = sol6.path("vdu_boot_order_list")?;
    let append = FlagSet::from([Flag::AppendList, Flag::FailSilent]);
    for &vdu in &vdus {
        let path = boot_list.resolve(&b.table().arena, Some(vdu), Resolve::Slot);
        let Some(list) = document::read(source, &path, ReadOptions::optional().silent(true))?
        else {
            continue;
        };
        let mut entries: Vec<(String, Value)> =
            document::merge_keyed_pairs(&list, "key", diagnostics)?
                .into_iter()
                .collect();
        entries.sort_by_key(|(key, _)| key.parse::<u64>().unwrap_or(u64::MAX));
        for (_, entry) in entries {
            let Some(value) = entry.get("value").and_then(Value::as_str) else {
                continue;
            };
            b.set_value(value, "vdu_boot", &[], append, Some(std::slice::from_ref(&vdu)))?;
        }
    }

    // Compute sizing lives in a shared descriptor the VDU points at
    let compute = ids_at(source, &sol6.path("vnfd_virt_compute_desc")?.without_last(1), "id")?;
    let vc_desc = sol6.path("vdu_vc_desc")?;
    let mut sized = Vec::new();
    for &vdu in &vdus {
        let path = vc_desc.resolve(&b.table().arena, Some(vdu), Resolve::Slot);
        let Some(Value::String(wanted)) =
            document::read(source, &path, ReadOptions::optional().silent(true))?
        else {
            continue;
        };
        if let Some((index, _)) = compute.iter().find(|(_, id)| *id == wanted) {
            let name = b.table().arena.get(vdu).name.clone();
            sized.push(b.table_mut().arena.alloc(Correspondence::new(name, Some(*index))));
        }
    }
    b.indexed("vnfd_vcd_cpu_num", "vdu_virt_cpu_num", quiet, &sized)?
        .indexed("vnfd_vcd_mem_size", "vdu_virt_mem_size", quiet, &sized)?;

    Ok(vdus)
}

fn connection_points(
    b: &mut TableBuilder<'_>,
    source: &Value,
    vdus: &[CorrId],
    vnfd_id: &str,
) -> Result<(), EngineError> {
    let sol6 = b.from_section();
    let cpd_list = sol6.path("int_cpd_list")?;

    let mut cps = Vec::new();
    let mut bindings = Vec::new();
    for &vdu in vdus {
        let path = cpd_list.resolve(&b.table().arena, Some(vdu), Resolve::Slot);
        let found = ids_at(source, &path, "id")?;
        cps.extend(alloc_all(b.table_mut(), &found, Some(vdu)));

        // No slot of their own, so the vdu fills the placeholder on the SOL006 side
        for (_, id) in &found {
            let binding = Correspondence::new(Some(id.clone()), None).with_parent(vdu);
            bindings.push(b.table_mut().arena.alloc(binding));
        }
    }
    log::debug!("found {} connection points", cps.len());

    b.set_type(&format!("{}_VDU_CP", vnfd_id), "int_cpd_type", &cps)?
        .indexed(
            "int_cpd_layer_prot",
            "int_cpd_layer_prot",
            Flag::FailSilent.into(),
            &cps,
        )?
        .indexed("vdu_id", "int_cpd_virt_binding_out", FlagSet::empty(), &bindings)?;
    Ok(())
}

fn deployment_flavour(b: &mut TableBuilder<'_>, source: &Value) -> Result<(), EngineError> {
    let sol6 = b.from_section();
    let quiet = FlagSet::from(Flag::FailSilent);

    b.single("df_id", "df_id", quiet)?
        .single("df_desc", "df_desc", quiet)?;

    let profiles = ids_at(source, &sol6.path("df_vdu_profile_list")?, "id")?;
    let profiles = alloc_all(b.table_mut(), &profiles, None);
    b.indexed("df_vdu_prof_inst_min", "vdu_prof_inst_min", quiet, &profiles)?
        .indexed("df_vdu_prof_inst_max", "vdu_prof_inst_max", quiet, &profiles)?;
    Ok(())
}

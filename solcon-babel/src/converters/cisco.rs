//! Cisco TOSCA to SOL006
//!
//! The table is built in sections, each discovering its nodes first and then adding the
//! entries that copy their fields:
//!
//!     metadata            vnf node properties -> vnfd leaves
//!     fixed links         management and orchestration virtual links, external cps
//!     vdus                Vdu.Compute nodes, their boot order and compute sizing
//!     connection points   VduCp nodes, numbered within the VDU they bind to
//!     storage             VirtualBlockStorage nodes carrying a software image
//!     deployment flavour  vdu profiles, the default instantiation level, scaling aspects
//!                         and their deltas, affinity groups
//!
//! Node kinds come from the provider identifiers of the path bundle, so the same table
//! works for any provider whose descriptors follow the Cisco layout.

use crate::converter::{Conversion, Converter};
use crate::error::ConvertError;
use crate::input::substitute_inputs;
use serde_json::{Map, Value};
use solcon_engine::correspondence::{
    ensure_contiguous, generate_from_list, generate_from_scan, Binding, Discovery,
    GenerateOptions, MapStrategy, Ordinal, ScanRequest,
};
use solcon_engine::document::{self, ReadOptions};
use solcon_engine::{
    CorrId, Correspondence, Diagnostics, EngineError, Flag, FlagSet, MappingRunner, MappingTable,
    Path, PathConfig, Resolve, Scan, Section, Segment, TableBuilder, Warning,
};
use std::collections::{HashMap, HashSet};

pub struct CiscoConverter;

impl Converter for CiscoConverter {
    fn name(&self) -> &str {
        "cisco"
    }

    fn description(&self) -> &str {
        "Cisco TOSCA VNF descriptors to SOL006"
    }

    fn convert(&self, source: &Value, paths: &PathConfig) -> Result<Conversion, ConvertError> {
        let paths = paths.for_provider(self.name())?;

        let mut source = source.clone();
        let inputs = paths.tosca().path("inputs")?;
        let configured = paths.tosca().literal("input_values").ok();
        let replaced = substitute_inputs(&mut source, &inputs, configured);
        log::debug!("replaced {} input references", replaced);

        let mut diagnostics = Diagnostics::new();
        let table = build_table(&paths, &source, &mut diagnostics)?;

        let catalogs = paths.catalogs();
        let mut document = Value::Object(Map::new());
        let mut report = MappingRunner::new(&catalogs).run(&table, &source, &mut document)?;
        diagnostics.extend(report.diagnostics);
        report.diagnostics = diagnostics;

        Ok(Conversion { document, report })
    }
}

fn flags<const N: usize>(flags: [Flag; N]) -> FlagSet {
    FlagSet::from(flags)
}

fn literal(section: &Section, name: &str) -> Result<String, EngineError> {
    match section.literal(name)? {
        Value::String(text) => Ok(text.clone()),
        other => Ok(other.to_string()),
    }
}

/// The node inside a wrapped `{key: node}` scan candidate
fn wrapped_node(wrapped: &Value) -> Option<&Value> {
    wrapped.as_object().and_then(|map| map.values().next())
}

/// Scan filter keeping nodes whose value at `path` is present and truthy
fn has_truthy(path: Path) -> impl Fn(&Value) -> bool + Send + Sync + 'static {
    move |wrapped| {
        wrapped_node(wrapped)
            .and_then(|node| document::read(node, &path, ReadOptions::optional().silent(true)).ok())
            .flatten()
            .map(|value| document::is_truthy(&value))
            .unwrap_or(false)
    }
}

/// Nodes below `under` matching `scan`; an absent `under` yields nothing
fn discover(
    table: &mut MappingTable,
    source: &Value,
    under: &Path,
    scan: Scan,
    strategy: &dyn MapStrategy,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<CorrId>, EngineError> {
    let present = document::read(source, under, ReadOptions::optional().silent(true))?;
    if present.is_none() {
        log::debug!("nothing to discover below '{}'", under);
        return Ok(Vec::new());
    }
    let request = ScanRequest::new(source, Discovery::Scan(scan)).under(under.clone());
    generate_from_scan(&mut table.arena, &request, strategy, diagnostics)
}

/// The value at `path` for one correspondence
fn read_at(
    table: &MappingTable,
    source: &Value,
    path: &Path,
    id: CorrId,
) -> Result<Option<Value>, EngineError> {
    let path = path.resolve(&table.arena, Some(id), Resolve::Name);
    document::read(source, &path, ReadOptions::optional().silent(true))
}

/// Values at `path` for one correspondence, as a list
fn read_list(
    table: &MappingTable,
    source: &Value,
    path: &Path,
    id: CorrId,
) -> Result<Vec<Value>, EngineError> {
    Ok(match read_at(table, source, path, id)? {
        Some(Value::Array(items)) => items,
        Some(single) => vec![single],
        None => Vec::new(),
    })
}

/// Keys of the map at `path` for one correspondence
fn read_keys(
    table: &MappingTable,
    source: &Value,
    path: &Path,
    id: CorrId,
) -> Result<Vec<Value>, EngineError> {
    Ok(match read_at(table, source, path, id)? {
        Some(Value::Object(map)) => map.keys().map(|key| Value::from(key.as_str())).collect(),
        _ => Vec::new(),
    })
}

pub(crate) fn build_table(
    paths: &PathConfig,
    source: &Value,
    diagnostics: &mut Diagnostics,
) -> Result<MappingTable, EngineError> {
    let tosca = paths.tosca();
    let sol6 = paths.sol6();
    let mut b = TableBuilder::new(tosca, sol6);

    metadata(&mut b)?;
    fixed_links(&mut b, sol6)?;
    let vdus = vdus(&mut b, source, diagnostics)?;
    connection_points(&mut b, source, &vdus, diagnostics)?;
    storage(&mut b, source, diagnostics)?;
    deployment_flavour(&mut b, source, &vdus, diagnostics)?;

    let table = b.finish();
    log::info!(
        "built cisco table: {} entries, {} correspondences",
        table.len(),
        table.arena.len()
    );
    Ok(table)
}

fn metadata(b: &mut TableBuilder<'_>) -> Result<(), EngineError> {
    b.single("vnf_desc_id", "vnfd_id", Flag::Required.into())?;
    for (from, to) in [
        ("vnf_provider", "vnfd_provider"),
        ("vnf_product_name", "vnfd_product"),
        ("vnf_software_ver", "vnfd_software_ver"),
        ("vnf_desc_ver", "vnfd_ver"),
        ("vnf_product_info_name", "vnfd_info_name"),
        ("desc", "vnfd_info_desc"),
        ("vnf_vnfm_info", "vnfd_vnfm_info"),
    ] {
        b.single(from, to, FlagSet::empty())?;
    }
    Ok(())
}

fn fixed_links(b: &mut TableBuilder<'_>, sol6: &Section) -> Result<(), EngineError> {
    let ip = FlagSet::from(Flag::FormatIp);

    for (slot, link, protocol) in [
        (0, "KEY_VIRT_LINK_MGMT", "KEY_VIRT_LINK_MGMT_PROT"),
        (1, "KEY_VIRT_LINK_ORCH", "KEY_VIRT_LINK_ORCH_PROT"),
    ] {
        b.set_value(&literal(sol6, link)?, "virt_link_desc_id", &[slot], FlagSet::empty(), None)?;
        b.set_value(&literal(sol6, protocol)?, "virt_link_desc_protocol", &[slot], ip, None)?;
    }

    for (slot, cp, protocol, link) in [
        (0, "KEY_EXT_CP_MGMT", "KEY_EXT_CP_MGMT_PROT", "KEY_VIRT_LINK_MGMT"),
        (1, "KEY_EXT_CP_ORCH", "KEY_EXT_CP_ORCH_PROT", "KEY_VIRT_LINK_ORCH"),
    ] {
        b.set_value(&literal(sol6, cp)?, "ext_cpd_id", &[slot], FlagSet::empty(), None)?;
        b.set_value(&literal(sol6, protocol)?, "ext_cpd_protocol", &[slot], ip, None)?;
        b.set_value(&literal(sol6, link)?, "ext_cpd_virt_link", &[slot], FlagSet::empty(), None)?;
    }
    Ok(())
}

fn vdus(
    b: &mut TableBuilder<'_>,
    source: &Value,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<CorrId>, EngineError> {
    let tosca = b.from_section();
    let node_templates = tosca.path("node_templates")?;
    let vdus = discover(
        b.table_mut(),
        source,
        &node_templates,
        tosca.identifier("vdu")?.to_scan(),
        &Ordinal::default(),
        diagnostics,
    )?;
    log::debug!("found {} vdus", vdus.len());

    b.keys("vdu_id", FlagSet::empty(), &vdus)?
        .indexed("vdu_name", "vdu_name", FlagSet::empty(), &vdus)?
        .indexed("vdu_desc", "vdu_desc", Flag::FailSilent.into(), &vdus)?;

    // Boot order items are named after the storage they boot from and numbered per VDU
    let boot_path = tosca.path("vdu_boot")?;
    let mut boots = Vec::new();
    for &vdu in &vdus {
        let items = read_list(b.table(), source, &boot_path, vdu)?;
        if items.is_empty() {
            continue;
        }
        let arena = &mut b.table_mut().arena;
        let ids = generate_from_list(arena, &items, &GenerateOptions::default(), diagnostics)?;
        arena.add_parent(&ids, vdu, false)?;
        boots.extend(ids);
    }
    b.keys("vdu_boot_key", flags([Flag::UseValue, Flag::OnlyNumbers]), &boots)?
        .keys("vdu_boot_value", FlagSet::empty(), &boots)?
        .keys("vdu_vs_desc", FlagSet::empty(), &boots)?;

    b.keys("vdu_vc_desc", FlagSet::empty(), &vdus)?
        .keys("vnfd_vcd_id", FlagSet::empty(), &vdus)?
        .indexed(
            "vdu_virt_cpu_num",
            "vnfd_vcd_cpu_num",
            flags([Flag::OnlyNumbers, Flag::FailSilent]),
            &vdus,
        )?
        .indexed(
            "vdu_virt_mem_size",
            "vnfd_vcd_mem_size",
            flags([Flag::UnitGb, Flag::UnitFractional, Flag::FailSilent]),
            &vdus,
        )?;

    Ok(vdus)
}

fn connection_points(
    b: &mut TableBuilder<'_>,
    source: &Value,
    vdus: &[CorrId],
    diagnostics: &mut Diagnostics,
) -> Result<(), EngineError> {
    let tosca = b.from_section();
    let sol6 = b.to_section();
    let node_templates = tosca.path("node_templates")?;
    let int_cpd = tosca.path("int_cpd")?;

    let binding = Binding {
        path: tosca.path("int_cpd_virt_binding")?.without_prefix_level(&int_cpd),
        parents: vdus.to_vec(),
        start: 0,
    };
    let cps = discover(
        b.table_mut(),
        source,
        &node_templates,
        tosca.identifier("int_cpd")?.to_scan(),
        &binding,
        diagnostics,
    )?;

    let management = tosca.path("int_cpd_management")?.without_prefix_level(&int_cpd);
    let mgmt_scan = tosca
        .identifier("int_cpd_mgmt")?
        .to_scan()
        .predicate(has_truthy(management));
    let mgmt_names: HashSet<String> = match document::read(
        source,
        &node_templates,
        ReadOptions::optional().silent(true),
    )? {
        Some(nodes) => mgmt_scan
            .find(&nodes)
            .iter()
            .filter_map(|m| m.name().map(str::to_string))
            .collect(),
        None => HashSet::new(),
    };

    let arena = &b.table().arena;
    let (mgmt, orch): (Vec<CorrId>, Vec<CorrId>) = cps.iter().copied().partition(|id| {
        arena
            .get(*id)
            .name
            .as_deref()
            .map(|name| mgmt_names.contains(name))
            .unwrap_or(false)
    });
    log::debug!(
        "found {} connection points, {} on the management link",
        cps.len(),
        mgmt.len()
    );

    let quiet_child = flags([Flag::ReqParent, Flag::FailSilent]);
    b.keys("int_cpd_id", Flag::ReqParent.into(), &cps)?
        .indexed(
            "int_cpd_layer_prot",
            "int_cpd_layer_prot",
            flags([Flag::FormatIp, Flag::ReqParent, Flag::FailSilent]),
            &cps,
        )?
        .set_value(
            &literal(sol6, "KEY_VIRT_LINK_MGMT")?,
            "int_cpd_virt_link_desc",
            &[],
            quiet_child,
            Some(&mgmt),
        )?
        .set_value(
            &literal(sol6, "KEY_VIRT_LINK_ORCH")?,
            "int_cpd_virt_link_desc",
            &[],
            quiet_child,
            Some(&orch),
        )?;
    Ok(())
}

fn storage(
    b: &mut TableBuilder<'_>,
    source: &Value,
    diagnostics: &mut Diagnostics,
) -> Result<(), EngineError> {
    let tosca = b.from_section();
    let node_templates = tosca.path("node_templates")?;
    let image_data = tosca
        .path("sw_image_data")?
        .without_prefix_level(&tosca.path("virt_storage")?);

    let scan = tosca
        .identifier("virtual_storage")?
        .to_scan()
        .predicate(has_truthy(image_data));
    let storage = discover(
        b.table_mut(),
        source,
        &node_templates,
        scan,
        &Ordinal::default(),
        diagnostics,
    )?;
    log::debug!("found {} storage nodes with images", storage.len());

    let quiet = FlagSet::from(Flag::FailSilent);
    let storage_type = flags([Flag::FormatStorageType, Flag::ListFirst]);

    // The default goes in first so a declared type replaces it
    b.keys("vnfd_virt_storage_id", FlagSet::empty(), &storage)?
        .indexed("VIRT_STORAGE_DEFAULT", "vnfd_virt_storage_type", storage_type, &storage)?
        .indexed(
            "virt_type",
            "vnfd_virt_storage_type",
            storage_type.with(Flag::FailSilent),
            &storage,
        )?
        .indexed(
            "virt_size",
            "vnfd_virt_storage_size",
            flags([Flag::UnitGb, Flag::FailSilent]),
            &storage,
        )?
        .keys("vnfd_virt_storage_sw_image", FlagSet::empty(), &storage)?;

    b.keys("sw_id", FlagSet::empty(), &storage)?
        .keys("sw_name", FlagSet::empty(), &storage)?
        .indexed("sw_version", "sw_version", quiet, &storage)?
        .indexed("sw_checksum", "sw_checksum", quiet, &storage)?
        .indexed(
            "sw_container_fmt",
            "sw_container_format",
            flags([Flag::FormatContainer, Flag::ListFirst, Flag::FailSilent]),
            &storage,
        )?
        .indexed(
            "sw_disk_fmt",
            "sw_disk_format",
            flags([Flag::FormatDisk, Flag::ListFirst, Flag::FailSilent]),
            &storage,
        )?
        .indexed(
            "sw_min_disk",
            "sw_min_disk",
            flags([Flag::OnlyNumbers, Flag::FailSilent]),
            &storage,
        )?
        .indexed("sw_size", "sw_size", flags([Flag::UnitGb, Flag::FailSilent]), &storage)?
        .indexed("sw_image_file", "sw_image", quiet, &storage)?;
    Ok(())
}

fn deployment_flavour(
    b: &mut TableBuilder<'_>,
    source: &Value,
    vdus: &[CorrId],
    diagnostics: &mut Diagnostics,
) -> Result<(), EngineError> {
    let quiet = FlagSet::from(Flag::FailSilent);

    b.single("df_id", "df_id", FlagSet::empty())?
        .single("df_desc", "df_desc", quiet)?
        .keys("df_vdu_prof_id", FlagSet::empty(), vdus)?
        .indexed("vdu_prof_inst_min", "df_vdu_prof_inst_min", quiet, vdus)?
        .indexed("vdu_prof_inst_max", "df_vdu_prof_inst_max", quiet, vdus)?;

    instantiation_levels(b, source, diagnostics)?;
    scaling_aspects(b, source, diagnostics)?;
    affinity_groups(b, source, vdus, diagnostics)
}

/// Every VDU a level policy targets becomes one `vdu-level` of the default level
fn instantiation_levels(
    b: &mut TableBuilder<'_>,
    source: &Value,
    diagnostics: &mut Diagnostics,
) -> Result<(), EngineError> {
    let tosca = b.from_section();
    let policies = tosca.path("policies")?;
    let default_key = literal(tosca, "DEF_INST_KEY")?;

    let levels = document::read(
        source,
        &tosca.path("def_inst_levels")?,
        ReadOptions::optional().silent(true),
    )?;
    if levels.as_ref().and_then(|l| l.get(&default_key)).is_some() {
        b.set_value(&default_key, "df_inst_level_id", &[0], FlagSet::empty(), None)?
            .single_at("def_inst_desc", "df_inst_level_desc", &[0], Flag::FailSilent.into())?;
    }

    let level_policies = discover(
        b.table_mut(),
        source,
        &policies,
        tosca.identifier("instantiation_level")?.to_scan(),
        &Ordinal::default(),
        diagnostics,
    )?;

    let targets_path = tosca.path("inst_level_targets")?;
    let mut per_target = Vec::new();
    let mut targets = Vec::new();
    for &policy in &level_policies {
        for target in read_list(b.table(), source, &targets_path, policy)? {
            per_target.push(b.table_mut().arena.duplicate(policy));
            targets.push(target);
        }
    }

    let arena = &mut b.table_mut().arena;
    if ensure_contiguous(arena, &per_target) {
        log::debug!("renumbered {} instantiation level targets", per_target.len());
    }
    let target_ids = generate_from_list(arena, &targets, &GenerateOptions::default(), diagnostics)?;

    let level = arena.alloc(Correspondence::new(Some(default_key), Some(0)));
    arena.add_parent(&per_target, level, false)?;
    arena.add_parent(&target_ids, level, false)?;

    b.keys("df_inst_level_vdu_vdu", FlagSet::empty(), &target_ids)?
        .indexed(
            "inst_level_num_instances",
            "df_inst_level_vdu_num",
            FlagSet::empty(),
            &per_target,
        )?;
    Ok(())
}

/// Scaling aspects with their step deltas, and the scale levels of the default level
///
/// Aspects from every ScalingAspects policy are numbered together. Each step delta
/// becomes one `deltas` entry of its aspect, and every VDU a VduScalingAspectDeltas
/// policy targets with that delta becomes one of its `vdu-delta`s. Deltas are looked up
/// by name alone, so when a step delta name is used twice the deltas are left out.
fn scaling_aspects(
    b: &mut TableBuilder<'_>,
    source: &Value,
    diagnostics: &mut Diagnostics,
) -> Result<(), EngineError> {
    let tosca = b.from_section();
    let policies = tosca.path("policies")?;

    let aspect_policies = discover(
        b.table_mut(),
        source,
        &policies,
        tosca.identifier("scaling_aspects")?.to_scan(),
        &Ordinal::default(),
        diagnostics,
    )?;

    let items_path = tosca.path("scaling_aspect_items")?;
    let mut aspects = Vec::new();
    for &policy in &aspect_policies {
        let names = read_keys(b.table(), source, &items_path, policy)?;
        let arena = &mut b.table_mut().arena;
        let options = GenerateOptions::starting_at(aspects.len());
        let ids = generate_from_list(arena, &names, &options, diagnostics)?;
        arena.add_parent(&ids, policy, false)?;
        aspects.extend(ids);
    }
    log::debug!("found {} scaling aspects", aspects.len());

    b.keys("df_scale_aspect_id", FlagSet::empty(), &aspects)?
        .indexed("scaling_aspect_name", "df_scale_aspect_name", Flag::FailSilent.into(), &aspects)?
        .indexed("scaling_aspect_desc", "df_scale_aspect_desc", Flag::FailSilent.into(), &aspects)?
        .indexed(
            "scaling_aspect_level",
            "df_scale_aspect_max_level",
            flags([Flag::OnlyNumbers, Flag::Min1, Flag::FailSilent]),
            &aspects,
        )?;

    if step_deltas_are_unique(b, source, &aspects, diagnostics)? {
        scaling_deltas(b, source, &aspects, diagnostics)?;
    }
    scaling_info(b, source, diagnostics)
}

/// Whether every step delta name below the known aspects is used once
fn step_deltas_are_unique(
    b: &TableBuilder<'_>,
    source: &Value,
    aspects: &[CorrId],
    diagnostics: &mut Diagnostics,
) -> Result<bool, EngineError> {
    let tosca = b.from_section();
    let Some(Segment::Key(step_deltas)) = tosca.path("scaling_aspect_deltas")?.last_segment().cloned()
    else {
        return Ok(true);
    };
    let Some(policies) =
        document::read(source, &tosca.path("policies")?, ReadOptions::optional().silent(true))?
    else {
        return Ok(true);
    };

    let arena = &b.table().arena;
    let known = arena.names(aspects).into_iter().flatten();
    let found = Scan::new().key(step_deltas.as_str()).parents(known).find(&policies);

    let mut seen = HashSet::new();
    let mut unique = true;
    for hit in &found {
        let names = match hit.node.get(step_deltas.as_str()) {
            Some(Value::Array(items)) => items.clone(),
            Some(single) => vec![single.clone()],
            None => Vec::new(),
        };
        for name in names.iter().filter_map(Value::as_str) {
            if !seen.insert(name.to_string()) {
                diagnostics.push(Warning::AmbiguousName {
                    name: name.to_string(),
                    context: "scaling aspect step deltas".to_string(),
                });
                unique = false;
            }
        }
    }
    Ok(unique)
}

/// Step deltas per aspect and the VDU deltas the delta policies give them
fn scaling_deltas(
    b: &mut TableBuilder<'_>,
    source: &Value,
    aspects: &[CorrId],
    diagnostics: &mut Diagnostics,
) -> Result<(), EngineError> {
    let tosca = b.from_section();
    let step_path = tosca.path("scaling_aspect_deltas")?;
    let mut steps = Vec::new();
    let mut steps_by_aspect: HashMap<CorrId, Vec<CorrId>> = HashMap::new();
    for &aspect in aspects {
        let items = read_list(b.table(), source, &step_path, aspect)?;
        if items.is_empty() {
            continue;
        }
        let arena = &mut b.table_mut().arena;
        let ids = generate_from_list(arena, &items, &GenerateOptions::default(), diagnostics)?;
        arena.add_parent(&ids, aspect, false)?;
        steps_by_aspect.insert(aspect, ids.clone());
        steps.extend(ids);
    }

    b.keys("df_scale_aspect_step_deltas", FlagSet::empty(), &steps)?
        .keys("df_scale_aspect_delta_id", FlagSet::empty(), &steps)?;

    let delta_policies = discover(
        b.table_mut(),
        source,
        &tosca.path("policies")?,
        tosca.identifier("scaling_deltas")?.to_scan(),
        &Ordinal::default(),
        diagnostics,
    )?;

    let aspect_path = tosca.path("scaling_deltas_aspect")?;
    let deltas_path = tosca.path("scaling_deltas_list")?;
    let targets_path = tosca.path("scaling_deltas_targets")?;
    let mut planned = Vec::new();
    for &policy in &delta_policies {
        let table = b.table();
        let aspect = read_at(table, source, &aspect_path, policy)?
            .and_then(|name| name.as_str().and_then(|name| table.arena.find_by_name(aspects, name)));
        let Some(aspect) = aspect else {
            log::debug!("{} names no known scaling aspect", table.arena.describe(policy));
            continue;
        };
        let Some(Value::Object(deltas)) = read_at(table, source, &deltas_path, policy)? else {
            continue;
        };
        let targets = read_list(table, source, &targets_path, policy)?;
        let aspect_steps = steps_by_aspect.get(&aspect).map(Vec::as_slice).unwrap_or_default();

        for (delta, body) in &deltas {
            let Some(step) = table.arena.find_by_name(aspect_steps, delta) else {
                log::debug!("delta '{}' is not a step delta of its aspect", delta);
                continue;
            };
            let count = match body.get("number_of_instances") {
                Some(Value::String(text)) => Some(text.clone()),
                Some(Value::Number(number)) => Some(number.to_string()),
                _ => None,
            };
            for target in targets.iter().filter_map(Value::as_str) {
                planned.push((step, target.to_string(), count.clone()));
            }
        }
    }

    let mut vdu_deltas = Vec::new();
    let mut instances = Vec::new();
    let mut per_step: HashMap<CorrId, usize> = HashMap::new();
    for (step, target, count) in planned {
        let next = per_step.entry(step).or_insert(0);
        let elem = Correspondence::new(Some(target), Some(*next)).with_parent(step);
        *next += 1;
        let id = b.table_mut().arena.alloc(elem);
        vdu_deltas.push(id);
        if let Some(count) = count {
            instances.push((count, id));
        }
    }
    log::debug!("found {} vdu deltas", vdu_deltas.len());

    b.keys("df_scale_aspect_vdu_id", FlagSet::empty(), &vdu_deltas)?;
    for (count, id) in instances {
        b.set_value(&count, "df_scale_aspect_vdu_num", &[], Flag::OnlyNumbers.into(), Some(&[id]))?;
    }
    Ok(())
}

/// Scale level of each aspect in the default instantiation level
fn scaling_info(
    b: &mut TableBuilder<'_>,
    source: &Value,
    diagnostics: &mut Diagnostics,
) -> Result<(), EngineError> {
    let tosca = b.from_section();
    let scale_info = document::read(
        source,
        &tosca.path("def_inst_scale_info")?,
        ReadOptions::optional().silent(true),
    )?;
    let Some(Value::Object(scale_info)) = scale_info else {
        return Ok(());
    };

    let names: Vec<Value> = scale_info.keys().map(|key| Value::from(key.as_str())).collect();
    let arena = &mut b.table_mut().arena;
    let ids = generate_from_list(arena, &names, &GenerateOptions::default(), diagnostics)?;
    let level = arena.alloc(Correspondence::new(Some(literal(tosca, "DEF_INST_KEY")?), Some(0)));
    arena.add_parent(&ids, level, false)?;

    b.keys("df_inst_scaling_aspect", FlagSet::empty(), &ids)?
        .indexed("def_inst_scale_level", "df_inst_scaling_level", FlagSet::empty(), &ids)?;
    Ok(())
}

/// Affinity and anti-affinity rules as groups, linked from the profiles of their VDUs
fn affinity_groups(
    b: &mut TableBuilder<'_>,
    source: &Value,
    vdus: &[CorrId],
    diagnostics: &mut Diagnostics,
) -> Result<(), EngineError> {
    let tosca = b.from_section();
    let sol6 = b.to_section();
    let policies = tosca.path("policies")?;

    let affinity = discover(
        b.table_mut(),
        source,
        &policies,
        tosca.identifier("affinity_rule")?.to_scan(),
        &Ordinal::default(),
        diagnostics,
    )?;
    let anti_affinity = discover(
        b.table_mut(),
        source,
        &policies,
        tosca.identifier("anti_affinity_rule")?.to_scan(),
        &Ordinal(GenerateOptions::starting_at(affinity.len())),
        diagnostics,
    )?;

    let scope = flags([Flag::FormatAffinityScope, Flag::ListFirst, Flag::FailSilent]);
    for (groups, kind) in [(&affinity, "AFFINITY_TYPE"), (&anti_affinity, "ANTI_AFFINITY_TYPE")] {
        b.keys("df_affinity_group_id", FlagSet::empty(), groups)?
            .set_value(&literal(sol6, kind)?, "df_affinity_group_type", &[], FlagSet::empty(), Some(groups))?
            .indexed("affinity_rule_scope", "df_affinity_group_scope", scope, groups)?;
    }

    let targets_path = tosca.path("affinity_rule_targets")?;
    let mut links = Vec::new();
    let mut per_vdu: HashMap<CorrId, usize> = HashMap::new();
    for &group in affinity.iter().chain(&anti_affinity) {
        let group_name = b.table().arena.get(group).name.clone();
        for target in read_list(b.table(), source, &targets_path, group)? {
            let arena = &mut b.table_mut().arena;
            let vdu = target.as_str().and_then(|name| arena.find_by_name(vdus, name));
            let slot = vdu.map(|vdu| {
                let next = per_vdu.entry(vdu).or_insert(0);
                *next += 1;
                *next - 1
            });
            let mut link = Correspondence::new(group_name.clone(), slot);
            link.parent = vdu;
            links.push(arena.alloc(link));
        }
    }
    b.keys("df_vdu_prof_aff_group_id", Flag::ReqParent.into(), &links)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::default_paths;
    use serde_json::json;

    fn convert(source: Value) -> Conversion {
        CiscoConverter
            .convert(&source, &default_paths().unwrap())
            .unwrap()
    }

    fn minimal(node_templates: Value) -> Value {
        json!({"topology_template": {"node_templates": node_templates}})
    }

    #[test]
    fn test_metadata_requires_descriptor_id() {
        let err = CiscoConverter
            .convert(&minimal(json!({"vnf": {"properties": {}}})), &default_paths().unwrap())
            .unwrap_err();
        assert!(matches!(
            err,
            ConvertError::Engine(EngineError::PathNotFound { .. })
        ));
    }

    #[test]
    fn test_connection_points_restart_per_vdu() {
        let conversion = convert(minimal(json!({
            "vnf": {"properties": {"descriptor_id": "v1"}},
            "c1": {"type": "cisco.nodes.nfv.Vdu.Compute", "properties": {"name": "CF"}},
            "s3": {"type": "cisco.nodes.nfv.Vdu.Compute", "properties": {"name": "SF"}},
            "c1_nic0": {"type": "cisco.nodes.nfv.VduCp",
                        "properties": {"management": true, "layer_protocols": ["ipv4"]},
                        "requirements": [{"virtual_binding": "c1"}]},
            "c1_nic1": {"type": "cisco.nodes.nfv.VduCp",
                        "requirements": [{"virtual_binding": "c1"}]},
            "s3_nic0": {"type": "cisco.nodes.nfv.VduCp",
                        "requirements": [{"virtual_binding": "s3"}]}
        })));
        let vdu = &conversion.document["vnfd"]["vdu"];

        assert_eq!(vdu[0]["int-cpd"][0]["id"], "c1_nic0");
        assert_eq!(vdu[0]["int-cpd"][0]["int-virtual-link-desc"], "CP_MGMT");
        assert_eq!(
            vdu[0]["int-cpd"][0]["layer-protocol"],
            json!(["etsi-nfv-descriptors:ipv4"])
        );
        assert_eq!(vdu[0]["int-cpd"][1]["id"], "c1_nic1");
        assert_eq!(vdu[0]["int-cpd"][1]["int-virtual-link-desc"], "CP_ORCH");
        assert_eq!(vdu[1]["int-cpd"][0]["id"], "s3_nic0");
        assert_eq!(vdu[1]["int-cpd"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn test_unbound_connection_point_is_skipped_with_warning() {
        let conversion = convert(minimal(json!({
            "vnf": {"properties": {"descriptor_id": "v1"}},
            "c1": {"type": "cisco.nodes.nfv.Vdu.Compute"},
            "stray": {"type": "cisco.nodes.nfv.VduCp"}
        })));
        assert!(conversion
            .report
            .warnings()
            .iter()
            .any(|w| matches!(w, solcon_engine::Warning::MissingParent { .. })));
        assert_eq!(conversion.document["vnfd"]["vdu"][0].get("int-cpd"), None);
    }

    #[test]
    fn test_storage_defaults_to_root() {
        let conversion = convert(minimal(json!({
            "vnf": {"properties": {"descriptor_id": "v1"}},
            "c1_storage": {"type": "cisco.nodes.nfv.Vdu.VirtualBlockStorage",
                           "properties": {"sw_image_data": {"name": "img", "disk_format": "QCOW2"},
                                          "virtual_block_storage_data": {"size_of_storage": "10 GB"}}},
            "scratch": {"type": "cisco.nodes.nfv.Vdu.VirtualBlockStorage", "properties": {}}
        })));
        let vnfd = &conversion.document["vnfd"];
        let descriptors = vnfd["virtual-storage-descriptor"].as_array().unwrap();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0]["id"], "c1_storage");
        assert_eq!(descriptors[0]["type-of-storage"], "root-storage");
        assert_eq!(descriptors[0]["size-of-storage"], 10);
        assert_eq!(vnfd["sw-image-desc"][0]["disk-format"], "qcow2");
    }

    fn with_policies(policies: Value) -> Value {
        let mut source = minimal(json!({
            "vnf": {"properties": {"descriptor_id": "v1"}},
            "c1": {"type": "cisco.nodes.nfv.Vdu.Compute"},
            "s3": {"type": "cisco.nodes.nfv.Vdu.Compute"}
        }));
        source["topology_template"]["policies"] = policies;
        source
    }

    #[test]
    fn test_vdu_deltas_number_per_step_delta() {
        let conversion = convert(with_policies(json!([
            {"scaling_aspects": {"type": "tosca.policies.nfv.ScalingAspects",
                "properties": {"aspects": {
                    "a1": {"name": "a1", "max_scale_level": 0, "step_deltas": ["d1", "d2"]},
                    "a2": {"name": "a2", "max_scale_level": 2}}}}},
            {"a1_deltas": {"type": "tosca.policies.nfv.VduScalingAspectDeltas",
                "properties": {"aspect": "a1", "deltas": {
                    "d1": {"number_of_instances": 1},
                    "d2": {"number_of_instances": "2"},
                    "d9": {"number_of_instances": 5}}},
                "targets": ["c1", "s3"]}}
        ])));
        let aspects = &conversion.document["vnfd"]["df"]["scaling-aspect"];

        assert_eq!(aspects[0]["id"], "a1");
        assert_eq!(aspects[0]["max-scale-level"], 1);
        assert_eq!(aspects[1]["id"], "a2");
        assert_eq!(aspects[1].get("aspect-delta-details"), None);

        let details = &aspects[0]["aspect-delta-details"];
        assert_eq!(details["step-deltas"], json!(["d1", "d2"]));
        assert_eq!(
            details["deltas"],
            json!([
                {"id": "d1", "vdu-delta": [
                    {"id": "c1", "number-of-instances": 1},
                    {"id": "s3", "number-of-instances": 1}
                ]},
                {"id": "d2", "vdu-delta": [
                    {"id": "c1", "number-of-instances": 2},
                    {"id": "s3", "number-of-instances": 2}
                ]}
            ])
        );
    }

    #[test]
    fn test_repeated_step_delta_names_leave_deltas_out() {
        let conversion = convert(with_policies(json!([
            {"scaling_aspects": {"type": "tosca.policies.nfv.ScalingAspects",
                "properties": {"aspects": {
                    "a1": {"name": "a1", "step_deltas": ["d1"]},
                    "a2": {"name": "a2", "step_deltas": ["d1"]}}}}},
            {"a1_deltas": {"type": "tosca.policies.nfv.VduScalingAspectDeltas",
                "properties": {"aspect": "a1", "deltas": {"d1": {"number_of_instances": 1}}},
                "targets": ["c1"]}}
        ])));
        let aspects = &conversion.document["vnfd"]["df"]["scaling-aspect"];

        assert_eq!(aspects[0]["id"], "a1");
        assert_eq!(aspects[1]["id"], "a2");
        assert_eq!(aspects[0].get("aspect-delta-details"), None);
        assert_eq!(aspects[1].get("aspect-delta-details"), None);
        assert!(conversion.report.warnings().iter().any(|w| matches!(
            w,
            Warning::AmbiguousName { name, .. } if name == "d1"
        )));
    }
}

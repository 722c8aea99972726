//! Segmented TBM tunnel lining
//!
//! One pass removes the previous output, builds the regular and key segment
//! templates with their live cutters, assembles the procedural node group and
//! binds it to a controller object.
pub mod cleanup;
pub mod controller;
pub mod cutter;
pub mod graph;
pub mod layout;
pub mod segment;

use crate::config::TunnelConfig;
use crate::core::manifest::Manifest;
use crate::core::session::Session;
use crate::core::types::python_string_literal;
use crate::error::Result;
use cutter::{Cutter, attach_cutters, bolt_cutters, handle_cutters};
use layout::RingLayout;
use log::info;
use segment::SegmentMesh;
use std::fmt::Write;

pub const COLLECTION: &str = "Tunnel";
pub const NODE_GROUP: &str = "TBM_TunnelProcedural";
pub const CONTROLLER: &str = "Tunnel Controller";
pub const SEGMENT_REGULAR: &str = "Segment (Regular)";
pub const SEGMENT_KEY: &str = "Segment (Key)";

/// Links `var` into the tunnel collection only and records it under `key`
/// in the script's `created` table.
pub(crate) fn link_to_collection(var: &str, key: &str) -> String {
    format!(
        "link_to_tunnel({var})\ncreated[{key}] = {var}\n",
        key = python_string_literal(key)
    )
}

fn emit_prelude(session: &mut Session) {
    session.section("Tunnel collection");
    session.push(&format!(
        r#"created = {{}}
coll = bpy.data.collections.new({name})
bpy.context.scene.collection.children.link(coll)


def link_to_tunnel(obj):
    if obj.name not in coll.objects:
        coll.objects.link(obj)
    if obj.name in bpy.context.scene.collection.objects:
        bpy.context.scene.collection.objects.unlink(obj)

"#,
        name = python_string_literal(COLLECTION)
    ));
    session.manifest_mut().track_collection(COLLECTION);
}

/// What a generation pass produced, for reporting.
#[derive(Debug, Clone)]
pub struct TunnelReport {
    pub layout: RingLayout,
    pub segments: Vec<SegmentMesh>,
    pub cutters: Vec<Cutter>,
}

/// Tells the operator which objects drive the result.
fn emit_summary(session: &mut Session, report: &TunnelReport) {
    session.section("Summary");
    let mut code = String::from("print(\"TEMPLATES (edit to change every ring):\")\n");
    for segment in &report.segments {
        let _ = writeln!(
            code,
            "print({})",
            python_string_literal(&format!("  {}", segment.name))
        );
    }
    code.push_str("print(\"CUTTER OBJECTS (move/scale these to tweak booleans!):\")\n");
    for cutter in &report.cutters {
        let _ = writeln!(
            code,
            "print({})",
            python_string_literal(&format!("  {}", cutter.name))
        );
    }
    session.push(&code);
}

fn build_template(
    session: &mut Session,
    name: &str,
    label: &str,
    angle_deg: f64,
    config: &TunnelConfig,
) -> (SegmentMesh, Vec<Cutter>) {
    let mesh = SegmentMesh::build(name, angle_deg, &config.geometry);
    mesh.emit(session);

    let mut cutters = bolt_cutters(label, angle_deg, &config.geometry, &config.bolt);
    cutters.extend(handle_cutters(label, angle_deg, &config.geometry, &config.handle));
    attach_cutters(session, name, &cutters);
    (mesh, cutters)
}

/// Appends a full generation pass to `session`.
///
/// `previous` is the manifest of the last pass, if one was saved; without it
/// the cleanup falls back to the name-based sweep.
pub fn generate(
    session: &mut Session,
    config: &TunnelConfig,
    previous: Option<&Manifest>,
) -> Result<TunnelReport> {
    config.validate()?;

    let layout = RingLayout::from_config(&config.segmentation);
    info!("regular angle: {:.3}°", layout.regular_angle_deg);
    info!("key angle:     {:.3}°", layout.key_angle_deg);

    cleanup::emit(session, previous);
    emit_prelude(session);

    session.section("Segment templates");
    let (regular, mut cutters) = build_template(
        session,
        SEGMENT_REGULAR,
        "Regular",
        layout.regular_angle_deg,
        config,
    );
    let (key, key_cutters) =
        build_template(session, SEGMENT_KEY, "Key", layout.key_angle_deg, config);
    cutters.extend(key_cutters);

    session.section("Procedural node group");
    graph::emit(session, &layout, &config.procedural)?;

    session.section("Controller");
    controller::emit(session, &config.procedural);

    let report = TunnelReport {
        layout,
        segments: vec![regular, key],
        cutters,
    };
    emit_summary(session, &report);
    info!(
        "tunnel script ready: {} segments, {} cutters, {} rings",
        report.segments.len(),
        report.cutters.len(),
        config.procedural.ring_count
    );
    for cutter in &report.cutters {
        info!("  cutter: {}", cutter.name);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::test_utils::GLOBAL_TEST_LOCK;
    use crate::core::session::test_utils::nested_fstring_quotes;

    #[test]
    fn test_generate_orders_phases() {
        let _lock = GLOBAL_TEST_LOCK.lock().unwrap();
        let mut session = Session::new();
        let report = generate(&mut session, &TunnelConfig::default(), None).unwrap();

        assert_eq!(report.segments.len(), 2);
        assert_eq!(report.cutters.len(), 8);

        let script = session.script();
        let cleanup = script.find("def _matches_generated(name)").unwrap();
        let coll = script.find("bpy.data.collections.new(\"Tunnel\")").unwrap();
        let group = script.find("tree_name = \"TBM_TunnelProcedural\"").unwrap();
        let controller = script.find("bpy.data.objects.new(\"Tunnel Controller\"").unwrap();
        assert!(cleanup < coll && coll < group && group < controller);
    }

    #[test]
    fn test_manifest_covers_everything_created() {
        let _lock = GLOBAL_TEST_LOCK.lock().unwrap();
        let mut session = Session::new();
        let report = generate(&mut session, &TunnelConfig::default(), None).unwrap();
        let manifest = session.manifest();

        assert_eq!(manifest.collections, [COLLECTION]);
        assert_eq!(manifest.node_groups, [NODE_GROUP]);
        for cutter in &report.cutters {
            assert!(manifest.objects.contains(&cutter.name));
            assert!(manifest.meshes.contains(&cutter.mesh_name()));
        }
        for name in [SEGMENT_REGULAR, SEGMENT_KEY, CONTROLLER] {
            assert!(manifest.objects.iter().any(|o| o == name));
        }
        assert_eq!(manifest.objects.len(), 2 + 8 + 1);
    }

    #[test]
    fn test_previous_manifest_replaces_sweep() {
        let _lock = GLOBAL_TEST_LOCK.lock().unwrap();
        let mut previous = Manifest::default();
        previous.track_object("Segment (Regular)");

        let mut session = Session::new();
        generate(&mut session, &TunnelConfig::default(), Some(&previous)).unwrap();
        assert!(!session.script().contains("def _matches_generated(name)"));
        assert!(session.script().contains("_remove_objects([\"Segment (Regular)\"])"));
    }

    #[test]
    fn test_summary_lists_templates_and_cutters() {
        let _lock = GLOBAL_TEST_LOCK.lock().unwrap();
        let mut session = Session::new();
        let report = generate(&mut session, &TunnelConfig::default(), None).unwrap();

        let script = session.script();
        let summary = &script[script.find("# ===== Summary =====").unwrap()..];
        assert!(summary.contains("print(\"  Segment (Regular)\")\nprint(\"  Segment (Key)\")\n"));
        for cutter in &report.cutters {
            assert!(summary.contains(&format!("print(\"  {}\")\n", cutter.name)));
        }
        assert!(summary.find("TEMPLATES") < summary.find("CUTTER OBJECTS"));
    }

    #[test]
    fn test_scripts_parse_on_python_3_11() {
        let _lock = GLOBAL_TEST_LOCK.lock().unwrap();
        let mut previous = Manifest::default();
        previous.track_object(SEGMENT_KEY);

        for manifest in [None, Some(&previous)] {
            let mut session = Session::new();
            generate(&mut session, &TunnelConfig::default(), manifest).unwrap();
            assert_eq!(nested_fstring_quotes(session.script()), Vec::<&str>::new());
        }
    }

    #[test]
    fn test_invalid_config_emits_nothing() {
        let mut config = TunnelConfig::default();
        config.segmentation.regular_count = 0;
        let mut session = Session::new();
        assert!(generate(&mut session, &config, None).is_err());
        assert_eq!(session.script(), "import bpy\n");
    }
}

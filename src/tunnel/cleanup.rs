//! Removal of a previous generation pass
//!
//! With a saved manifest the teardown is exact. Without one, a name-based
//! sweep catches everything older versions of the generator could have left.
use crate::core::manifest::Manifest;
use crate::core::session::Session;
use crate::core::types::python_string_literal;
use log::{info, warn};
use std::fmt::Write;

/// Object names the sweep removes, alone or followed by `.` or `_`.
pub const SWEEP_NAMES: &[&str] = &[
    "Segment (Regular)",
    "Segment (Key)",
    "Bolt Pocket (Top)",
    "Bolt Pocket (Bottom)",
    "Handle Hole (Top)",
    "Handle Hole (Bottom)",
    "Bolt Pocket",
    "Handle Hole",
    "Tunnel Controller",
    "TunnelRing",
    "SegReg",
    "SegKey",
    "RingGuide",
    "TBM_Ring",
    "RingBase",
    "TBM_Tunnel",
];

/// Collections emptied and removed by the sweep.
pub const SWEEP_COLLECTIONS: &[&str] = &["TBM_Ring", "Tunnel"];

/// Node groups removed by the sweep.
pub const SWEEP_NODE_GROUPS: &[&str] = &["TBM_TunnelAlongZ", "TBM_TunnelProcedural"];

fn python_list(names: &[impl AsRef<str>]) -> String {
    let items: Vec<_> = names
        .iter()
        .map(|n| python_string_literal(n.as_ref()))
        .collect();
    format!("[{}]", items.join(", "))
}

/// Script removing exactly what `manifest` lists. Missing data-blocks are
/// skipped, so running it twice is harmless.
pub fn teardown_script(manifest: &Manifest) -> String {
    let mut code = String::from(
        r#"
def _remove_objects(names):
    for n in names:
        obj = bpy.data.objects.get(n)
        if obj is not None:
            bpy.data.objects.remove(obj, do_unlink=True)


def _remove_meshes(names):
    for n in names:
        me = bpy.data.meshes.get(n)
        if me is not None and me.users == 0:
            bpy.data.meshes.remove(me)


def _remove_node_groups(names):
    for n in names:
        ng = bpy.data.node_groups.get(n)
        if ng is not None:
            bpy.data.node_groups.remove(ng, do_unlink=True)


def _remove_collections(names):
    for n in names:
        c = bpy.data.collections.get(n)
        if c is not None:
            bpy.data.collections.remove(c)

"#,
    );
    let _ = writeln!(code, "_remove_objects({})", python_list(&manifest.objects));
    let _ = writeln!(code, "_remove_meshes({})", python_list(&manifest.meshes));
    let _ = writeln!(
        code,
        "_remove_node_groups({})",
        python_list(&manifest.node_groups)
    );
    let _ = writeln!(
        code,
        "_remove_collections({})",
        python_list(&manifest.collections)
    );
    code
}

/// Script sweeping every data-block matching the generator's known names,
/// plus orphaned meshes.
pub fn sweep_script() -> String {
    format!(
        r#"
_SWEEP_NAMES = {names}


def _matches_generated(name):
    return any(name == n or name.startswith(n + ".") or name.startswith(n + "_") for n in _SWEEP_NAMES)


for c in list(bpy.data.collections):
    if c.name in {collections}:
        for obj in list(c.objects):
            bpy.data.objects.remove(obj, do_unlink=True)
        bpy.data.collections.remove(c)

for obj in list(bpy.data.objects):
    if _matches_generated(obj.name):
        bpy.data.objects.remove(obj, do_unlink=True)

for me in list(bpy.data.meshes):
    if me.users == 0:
        bpy.data.meshes.remove(me)

for ng in list(bpy.data.node_groups):
    if ng.name in {groups}:
        bpy.data.node_groups.remove(ng, do_unlink=True)
"#,
        names = python_list(SWEEP_NAMES),
        collections = python_list(SWEEP_COLLECTIONS),
        groups = python_list(SWEEP_NODE_GROUPS),
    )
}

/// Emits the cleanup step, preferring exact teardown.
pub fn emit(session: &mut Session, previous: Option<&Manifest>) {
    session.section("Cleanup");
    match previous {
        Some(manifest) if !manifest.is_empty() => {
            info!(
                "removing {} objects from the previous run",
                manifest.objects.len()
            );
            session.push(&teardown_script(manifest));
        }
        _ => {
            warn!("no previous manifest, sweeping by name");
            session.push(&sweep_script());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_teardown_lists_manifest_entries() {
        let mut manifest = Manifest::default();
        manifest.track_collection("Tunnel");
        manifest.track_object("Segment (Key)");
        manifest.track_object("Tunnel Controller");
        manifest.track_mesh("Segment (Key)_Mesh");
        manifest.track_node_group("TBM_TunnelProcedural");

        let script = teardown_script(&manifest);
        assert!(script.contains("_remove_objects([\"Segment (Key)\", \"Tunnel Controller\"])\n"));
        assert!(script.contains("_remove_meshes([\"Segment (Key)_Mesh\"])\n"));
        assert!(script.contains("_remove_node_groups([\"TBM_TunnelProcedural\"])\n"));
        assert!(script.contains("_remove_collections([\"Tunnel\"])\n"));
        // objects go before the collections holding them
        assert!(script.find("_remove_objects([") < script.find("_remove_collections(["));
        assert!(!script.contains("_matches_generated"));
    }

    #[test]
    fn test_empty_manifest_falls_back_to_sweep() {
        let mut session = Session::new();
        emit(&mut session, Some(&Manifest::default()));
        let script = session.script();
        assert!(script.contains(
            "_SWEEP_NAMES = [\"Segment (Regular)\", \"Segment (Key)\", \"Bolt Pocket (Top)\", "
        ));
        assert!(script.contains("\"RingBase\", \"TBM_Tunnel\"]\n"));
        // exact name, or the name with a `.NNN` or `_suffix` tail
        assert!(script.contains(
            "def _matches_generated(name):\n    return any(name == n or name.startswith(n + \".\") \
             or name.startswith(n + \"_\") for n in _SWEEP_NAMES)\n"
        ));
        assert!(script.contains(
            "for obj in list(bpy.data.objects):\n    if _matches_generated(obj.name):\n        \
             bpy.data.objects.remove(obj, do_unlink=True)\n"
        ));
        assert!(script.contains("\"TBM_TunnelAlongZ\", \"TBM_TunnelProcedural\""));
        assert!(script.contains("if c.name in [\"TBM_Ring\", \"Tunnel\"]:"));
        assert!(script.contains("if me.users == 0:"));
    }
}

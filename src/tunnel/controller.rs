use crate::config::ProceduralConfig;
use crate::core::session::Session;
use crate::core::types::{fmt_f32, python_string_literal};
use crate::tunnel::{CONTROLLER, NODE_GROUP, SEGMENT_KEY, SEGMENT_REGULAR, link_to_collection};

/// Name of the NODES modifier on the controller.
pub const MODIFIER: &str = "TunnelProcedural";

/// Creates the controller object and binds the node group to it.
///
/// Socket identifiers differ between Blender versions, so the input
/// assignment only warns when it fails.
pub fn emit(session: &mut Session, procedural: &ProceduralConfig) {
    let controller = python_string_literal(CONTROLLER);
    let mesh_name = format!("{}_Mesh", CONTROLLER);

    let mut code = format!(
        r#"bpy.ops.mesh.primitive_cube_add(size=0.1, location=(0, 0, 0))
temp = bpy.context.active_object
temp_mesh = temp.data
controller_mesh = temp_mesh.copy()
controller_mesh.name = {mesh}
bpy.data.objects.remove(temp, do_unlink=True)
if temp_mesh.users == 0:
    bpy.data.meshes.remove(temp_mesh)
controller = bpy.data.objects.new({controller}, controller_mesh)
"#,
        mesh = python_string_literal(&mesh_name),
    );
    code.push_str(&link_to_collection("controller", CONTROLLER));
    code.push_str(&format!(
        r#"mod = controller.modifiers.new(name={modifier}, type='NODES')
mod.node_group = bpy.data.node_groups[{group}]
try:
    input_sockets = [
        s for s in mod.node_group.interface.items_tree
        if s.item_type == 'SOCKET' and s.in_out == 'INPUT'
    ]
    values = [
        created[{regular}],
        created[{key}],
        {ring_count},
        {ring_spacing},
        {rot_jitter},
        {pos_jitter},
        {seed},
    ]
    for socket, value in zip(input_sockets, values):
        mod[socket.identifier] = value
    print("Modifier inputs assigned")
except Exception as e:
    print(f"WARNING: could not assign modifier inputs: {{e}}")
print(f"View result on: {{controller.name}}")
"#,
        modifier = python_string_literal(MODIFIER),
        group = python_string_literal(NODE_GROUP),
        regular = python_string_literal(SEGMENT_REGULAR),
        key = python_string_literal(SEGMENT_KEY),
        ring_count = procedural.ring_count,
        ring_spacing = fmt_f32(procedural.ring_spacing),
        rot_jitter = fmt_f32(procedural.rot_jitter_deg),
        pos_jitter = fmt_f32(procedural.pos_jitter),
        seed = procedural.seed,
    ));

    session.push(&code);
    let manifest = session.manifest_mut();
    manifest.track_mesh(&mesh_name);
    manifest.track_object(CONTROLLER);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::test_utils::nested_fstring_quotes;

    #[test]
    fn test_controller_binds_group_with_guarded_inputs() {
        let mut session = Session::new();
        emit(&mut session, &ProceduralConfig::default());
        let script = session.script();

        assert!(script.contains("primitive_cube_add(size=0.1,"));
        assert!(script.contains("controller_mesh.name = \"Tunnel Controller_Mesh\"\n"));
        assert!(script.contains("modifiers.new(name=\"TunnelProcedural\", type='NODES')"));
        assert!(script.contains("bpy.data.node_groups[\"TBM_TunnelProcedural\"]"));

        assert!(script.ends_with(
            r#"mod = controller.modifiers.new(name="TunnelProcedural", type='NODES')
mod.node_group = bpy.data.node_groups["TBM_TunnelProcedural"]
try:
    input_sockets = [
        s for s in mod.node_group.interface.items_tree
        if s.item_type == 'SOCKET' and s.in_out == 'INPUT'
    ]
    values = [
        created["Segment (Regular)"],
        created["Segment (Key)"],
        10,
        1.500000,
        40.000000,
        0.010000,
        27,
    ]
    for socket, value in zip(input_sockets, values):
        mod[socket.identifier] = value
    print("Modifier inputs assigned")
except Exception as e:
    print(f"WARNING: could not assign modifier inputs: {e}")
print(f"View result on: {controller.name}")
"#
        ));
        assert!(nested_fstring_quotes(script).is_empty());

        assert_eq!(session.manifest().objects, ["Tunnel Controller"]);
        assert_eq!(session.manifest().meshes, ["Tunnel Controller_Mesh"]);
    }
}

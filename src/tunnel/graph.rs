//! The `TBM_TunnelProcedural` geometry node group.
//!
//! Segments are fanned around the tunnel axis (Y) into one ring, and the
//! realized ring is repeated along the axis with seeded twist and shift.
use crate::config::ProceduralConfig;
use crate::core::nodes::{
    FunctionNodeEulerToRotation, FunctionNodeRandomValue, FunctionNodeRandomValueDataType,
    GeometryNodeInputIndex, GeometryNodeInstanceOnPoints, GeometryNodeJoinGeometry,
    GeometryNodeMeshLine, GeometryNodeObjectInfo, GeometryNodeObjectInfoTransformSpace,
    GeometryNodeRealizeInstances, GeometryNodeRotateInstances, GeometryNodeSetPosition,
    NodeGroupInput, NodeGroupOutput, ShaderNodeCombineXyz,
};
use crate::core::session::Session;
use crate::core::tree::NodeTree;
use crate::core::types::{Float, Geo, Int, NodeGroupInputExt, NodeSocket, Object, Rotation};
use crate::error::{Error, Result};
use crate::tunnel::NODE_GROUP;
use crate::tunnel::layout::RingLayout;
use lining_macros::node_math;

pub const IN_SEGMENT_REGULAR: &str = "Segment (Regular)";
pub const IN_SEGMENT_KEY: &str = "Segment (Key)";
pub const IN_RING_COUNT: &str = "Ring Count";
pub const IN_RING_SPACING: &str = "Ring Spacing";
pub const IN_ROT_JITTER: &str = "Rot Jitter Deg";
pub const IN_POS_JITTER: &str = "Pos Jitter";
pub const IN_SEED: &str = "Seed";
pub const OUT_GEOMETRY: &str = "Geometry";

/// Group interface, inputs in socket order.
pub fn tree(procedural: &ProceduralConfig) -> NodeTree {
    NodeTree::new_geometry(NODE_GROUP)
        .input::<Object>(IN_SEGMENT_REGULAR)
        .input::<Object>(IN_SEGMENT_KEY)
        .input_with_default::<Int>(IN_RING_COUNT, procedural.ring_count)
        .input_with_default::<Float>(IN_RING_SPACING, procedural.ring_spacing)
        .input_with_default::<Float>(IN_ROT_JITTER, procedural.rot_jitter_deg)
        .input_with_default::<Float>(IN_POS_JITTER, procedural.pos_jitter)
        .input_with_default::<Int>(IN_SEED, procedural.seed)
        .output::<Geo>(OUT_GEOMETRY)
}

fn vector_y(y: impl Into<NodeSocket<Float>>) -> ShaderNodeCombineXyz {
    ShaderNodeCombineXyz::new()
        .with_x(0.0)
        .with_y(y)
        .with_z(0.0)
}

fn y_rotation(angle_rad: impl Into<NodeSocket<Float>>) -> NodeSocket<Rotation> {
    FunctionNodeEulerToRotation::new()
        .with_euler(vector_y(angle_rad).out_vector())
        .out_rotation()
}

/// `count` mesh-line points collapsed onto the origin.
fn points_at_origin(count: impl Into<NodeSocket<Int>>) -> NodeSocket<Geo> {
    let line = GeometryNodeMeshLine::new().with_count(count);
    GeometryNodeSetPosition::new()
        .with_geometry(line.out_mesh())
        .with_position(vector_y(0.0).out_vector())
        .out_geometry()
}

fn segment_geometry(object: NodeSocket<Object>) -> NodeSocket<Geo> {
    GeometryNodeObjectInfo::new()
        .with_transform_space(GeometryNodeObjectInfoTransformSpace::Relative)
        .with_object(object)
        .out_geometry()
}

/// Uniform random float in `[-range, range]`, one draw per element.
fn symmetric_random(range: &NodeSocket<Float>, seed: &NodeSocket<Int>) -> NodeSocket<Float> {
    FunctionNodeRandomValue::new()
        .with_data_type(FunctionNodeRandomValueDataType::Float)
        .with_min_0(-range)
        .with_max_0(range)
        .with_seed(seed)
        .out_value_0()
}

fn assemble(layout: &RingLayout, regular_count: i32) {
    let group_in = NodeGroupInput::new();
    let seed = group_in.socket::<Int>(IN_SEED);

    let regular = segment_geometry(group_in.socket(IN_SEGMENT_REGULAR));
    let key = segment_geometry(group_in.socket(IN_SEGMENT_KEY));

    // one ring
    let index = GeometryNodeInputIndex::new().out_index().cast::<Float>();
    let step_deg = layout.regular_angle_deg as f32;
    let regular_angle = node_math!(radians((index + 0.5) * step_deg));
    let regular_instances = GeometryNodeInstanceOnPoints::new()
        .with_points(points_at_origin(regular_count))
        .with_instance(regular)
        .with_rotation(y_rotation(regular_angle));

    let key_angle = layout.key_instance_angle_deg().to_radians() as f32;
    let key_instance = GeometryNodeInstanceOnPoints::new()
        .with_points(points_at_origin(1))
        .with_instance(key)
        .with_rotation(y_rotation(key_angle));

    let ring = GeometryNodeJoinGeometry::new()
        .append_geometry(regular_instances.out_instances())
        .append_geometry(key_instance.out_instances());
    let ring = GeometryNodeRealizeInstances::new().with_geometry(ring.out_geometry());

    // rings along the axis
    let ring_index = GeometryNodeInputIndex::new().out_index().cast::<Float>();
    let spacing = group_in.socket::<Float>(IN_RING_SPACING);
    let ring_line = GeometryNodeMeshLine::new().with_count(group_in.socket::<Int>(IN_RING_COUNT));
    let ring_points = GeometryNodeSetPosition::new()
        .with_geometry(ring_line.out_mesh())
        .with_position(vector_y(node_math!(ring_index * spacing)).out_vector());
    let rings = GeometryNodeInstanceOnPoints::new()
        .with_points(ring_points.out_geometry())
        .with_instance(ring.out_geometry());

    // jitter
    let twist_deg = symmetric_random(&group_in.socket(IN_ROT_JITTER), &seed);
    let twisted = GeometryNodeRotateInstances::new()
        .with_instances(rings.out_instances())
        .with_rotation(y_rotation(node_math!(radians(twist_deg))));

    let shift = symmetric_random(&group_in.socket(IN_POS_JITTER), &seed);
    let shifted = GeometryNodeSetPosition::new()
        .with_geometry(twisted.out_instances())
        .with_offset(vector_y(shift).out_vector());

    let realized = GeometryNodeRealizeInstances::new().with_geometry(shifted.out_geometry());
    NodeGroupOutput::new().set_input(0, realized.out_geometry());
}

/// Rebuilds the node group from scratch.
pub fn emit(
    session: &mut Session,
    layout: &RingLayout,
    procedural: &ProceduralConfig,
) -> Result<()> {
    let regular_count = i32::try_from(layout.regular_count).map_err(|_| {
        Error::InvalidConfig(format!(
            "{} regular segments do not fit an integer socket",
            layout.regular_count
        ))
    })?;
    session.add_tree(&tree(procedural), || assemble(layout, regular_count));
    Ok(())
}

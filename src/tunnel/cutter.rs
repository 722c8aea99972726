//! Bolt-pocket and handle-recess cutters and their boolean wiring.
//!
//! Cutters stay in the scene as wireframe objects invisible to the renderer,
//! so they can be moved by hand and the booleans re-evaluate live.
use crate::config::{BoltConfig, GeometryConfig, HandleConfig};
use crate::core::session::Session;
use crate::core::types::{fmt_f64, fmt_vec3, python_string_literal};
use crate::tunnel::link_to_collection;
use std::f64::consts::FRAC_PI_2;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutterKind {
    BoltPocket,
    HandleHole,
}

impl CutterKind {
    fn label(self) -> &'static str {
        match self {
            Self::BoltPocket => "Bolt Pocket",
            Self::HandleHole => "Handle Hole",
        }
    }

    fn modifier_prefix(self) -> &'static str {
        match self {
            Self::BoltPocket => "Bolt",
            Self::HandleHole => "Handle",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Cylinder { vertices: u32, radius: f64, depth: f64 },
    Cube { size: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cutter {
    pub name: String,
    pub kind: CutterKind,
    pub primitive: Primitive,
    pub location: [f64; 3],
    /// XYZ Euler angles in radians
    pub rotation: [f64; 3],
    pub scale: [f64; 3],
}

impl Cutter {
    pub fn mesh_name(&self) -> String {
        format!("{}_Mesh", self.name)
    }

    /// Angle of the cutter centre around the tunnel axis.
    pub fn polar_angle(&self) -> f64 {
        self.location[2].atan2(self.location[0])
    }

    fn emit(&self, session: &mut Session) {
        let mut code = String::new();
        let location = fmt_vec3(self.location);
        let _ = match &self.primitive {
            Primitive::Cylinder {
                vertices,
                radius,
                depth,
            } => writeln!(
                code,
                "bpy.ops.mesh.primitive_cylinder_add(vertices={}, radius={}, depth={}, location={})",
                vertices,
                fmt_f64(*radius),
                fmt_f64(*depth),
                location
            ),
            Primitive::Cube { size } => writeln!(
                code,
                "bpy.ops.mesh.primitive_cube_add(size={}, location={})",
                fmt_f64(*size),
                location
            ),
        };
        let _ = write!(
            code,
            r#"cutter = bpy.context.active_object
cutter.name = {name}
cutter.data.name = {mesh}
cutter.rotation_euler = {rotation}
cutter.scale = {scale}
cutter.display_type = 'WIRE'
cutter.visible_camera = False
cutter.visible_shadow = False
"#,
            name = python_string_literal(&self.name),
            mesh = python_string_literal(&self.mesh_name()),
            rotation = fmt_vec3(self.rotation),
            scale = fmt_vec3(self.scale),
        );
        code.push_str(&link_to_collection("cutter", &self.name));

        session.push(&code);
        let manifest = session.manifest_mut();
        manifest.track_mesh(&self.mesh_name());
        manifest.track_object(&self.name);
    }
}

fn cutter_name(kind: CutterKind, side: &str, segment_label: &str) -> String {
    format!("{} ({}) - {}", kind.label(), side, segment_label)
}

/// Round pockets near the segment centre, one towards each ring face.
pub fn bolt_cutters(
    segment_label: &str,
    angle_deg: f64,
    geometry: &GeometryConfig,
    bolt: &BoltConfig,
) -> Vec<Cutter> {
    let half = (angle_deg / 2.0).to_radians();
    let depth = geometry.thickness * bolt.depth_frac;
    let base_radius = geometry.inner_radius - depth / 2.0;
    let t = half * bolt.angle_frac;
    let (s, c) = t.sin_cos();

    [(-1.0, "Back"), (1.0, "Front")]
        .into_iter()
        .map(|(sign, side)| Cutter {
            name: cutter_name(CutterKind::BoltPocket, side, segment_label),
            kind: CutterKind::BoltPocket,
            primitive: Primitive::Cylinder {
                vertices: bolt.vertices,
                radius: bolt.radius,
                depth,
            },
            location: [
                base_radius * c,
                sign * geometry.ring_length * bolt.axial_frac,
                base_radius * s,
            ],
            // cylinder axis turned from Z to the radial direction
            rotation: [0.0, FRAC_PI_2 + t, 0.0],
            scale: [1.0, 1.0, 1.0],
        })
        .collect()
}

/// Rectangular recesses off-centre, sized from the segment chord.
pub fn handle_cutters(
    segment_label: &str,
    angle_deg: f64,
    geometry: &GeometryConfig,
    handle: &HandleConfig,
) -> Vec<Cutter> {
    let half = (angle_deg / 2.0).to_radians();
    let t = -half * handle.angle_frac;
    let chord = 2.0 * geometry.inner_radius * half.sin();
    let width = chord * handle.width_tan;
    let height = chord * handle.height_tan;
    let depth = geometry.thickness * handle.depth_frac;
    let base_radius = geometry.inner_radius - depth * handle.radial_inset;
    let (s, c) = t.sin_cos();
    let diagonal = handle.diagonal_deg.to_radians();

    [(1.0, "Front"), (-1.0, "Back")]
        .into_iter()
        .map(|(sign, side)| Cutter {
            name: cutter_name(CutterKind::HandleHole, side, segment_label),
            kind: CutterKind::HandleHole,
            primitive: Primitive::Cube { size: 1.0 },
            location: [
                base_radius * c,
                sign * geometry.ring_length * (0.5 - handle.from_edge_frac),
                base_radius * s,
            ],
            rotation: [0.0, t + diagonal, FRAC_PI_2],
            // radial depth on X, width along the tunnel on Y, height on Z
            scale: [depth * 0.5, width * 0.5, height * 0.5],
        })
        .collect()
}

/// Modifier names for `cutters`, numbered per kind in creation order.
pub fn modifier_names(cutters: &[Cutter]) -> Vec<String> {
    let mut bolts = 0;
    let mut handles = 0;
    cutters
        .iter()
        .map(|cutter| {
            let counter = match cutter.kind {
                CutterKind::BoltPocket => &mut bolts,
                CutterKind::HandleHole => &mut handles,
            };
            let name = format!("{}_{}", cutter.kind.modifier_prefix(), counter);
            *counter += 1;
            name
        })
        .collect()
}

/// Creates the cutter objects and attaches one live exact-difference boolean
/// per cutter to `segment`, in order. Modifiers are never applied.
pub fn attach_cutters(session: &mut Session, segment: &str, cutters: &[Cutter]) {
    for cutter in cutters {
        cutter.emit(session);
    }

    let mut code = String::new();
    for (cutter, modifier) in cutters.iter().zip(modifier_names(cutters)) {
        let _ = write!(
            code,
            r#"mod = created[{segment}].modifiers.new(name={modifier}, type='BOOLEAN')
mod.operation = 'DIFFERENCE'
mod.solver = 'EXACT'
mod.object = created[{cutter}]
"#,
            segment = python_string_literal(segment),
            modifier = python_string_literal(&modifier),
            cutter = python_string_literal(&cutter.name),
        );
    }
    // no quotes inside f-string fields: Python 3.11 rejects them
    let _ = write!(
        code,
        "seg = created[{}]\nprint(f\"  Created: {{seg.name}} with {{len(seg.modifiers)}} boolean modifiers\")\n",
        python_string_literal(segment)
    );
    session.push(&code);
}

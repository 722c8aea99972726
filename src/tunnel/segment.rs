use crate::config::GeometryConfig;
use crate::core::session::Session;
use crate::core::types::{fmt_vec3, python_string_literal};
use crate::tunnel::link_to_collection;
use std::fmt::Write;

/// Fewest angular steps any segment gets, however narrow.
pub const MIN_STEPS: usize = 8;

/// Angular step count for an arc of `angle_deg`.
///
/// Halves round to even, the same way the Python host rounds.
pub fn step_count(full_circle_res: u32, angle_deg: f64) -> usize {
    let steps = (f64::from(full_circle_res) * angle_deg / 360.0).round_ties_even();
    MIN_STEPS.max(steps as usize)
}

/// Extruded ring-section arc centred on angle 0.
///
/// The ring lies in the XZ plane and the tunnel runs along +Y. Each step
/// contributes four vertices: inner back, outer back, inner front, outer
/// front.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentMesh {
    pub name: String,
    pub angle_deg: f64,
    pub steps: usize,
    pub vertices: Vec<[f64; 3]>,
    pub faces: Vec<[u32; 4]>,
}

impl SegmentMesh {
    pub fn build(name: &str, angle_deg: f64, geometry: &GeometryConfig) -> Self {
        let steps = step_count(geometry.full_circle_res, angle_deg);
        let half = angle_deg.to_radians() / 2.0;

        let r_in = geometry.inner_radius;
        let r_out = geometry.inner_radius + geometry.thickness;
        let y_back = -geometry.ring_length / 2.0;
        let y_front = geometry.ring_length / 2.0;

        let mut vertices = Vec::with_capacity(4 * (steps + 1));
        for i in 0..=steps {
            let t = -half + 2.0 * half * (i as f64 / steps as f64);
            let (s, c) = t.sin_cos();
            vertices.push([r_in * c, y_back, r_in * s]);
            vertices.push([r_out * c, y_back, r_out * s]);
            vertices.push([r_in * c, y_front, r_in * s]);
            vertices.push([r_out * c, y_front, r_out * s]);
        }

        let mut faces = Vec::with_capacity(4 * steps + 2);
        for i in 0..steps as u32 {
            let b0 = i * 4;
            let b1 = (i + 1) * 4;
            faces.push([b0, b1, b1 + 2, b0 + 2]); // inner
            faces.push([b0 + 1, b0 + 3, b1 + 3, b1 + 1]); // outer
            faces.push([b0, b0 + 1, b1 + 1, b1]); // back wall
            faces.push([b0 + 2, b1 + 2, b1 + 3, b0 + 3]); // front wall
        }
        let last = steps as u32 * 4;
        faces.push([0, 2, 3, 1]);
        faces.push([last, last + 1, last + 3, last + 2]);

        Self {
            name: name.to_string(),
            angle_deg,
            steps,
            vertices,
            faces,
        }
    }

    pub fn mesh_name(&self) -> String {
        format!("{}_Mesh", self.name)
    }

    /// Creates the mesh and object in the tunnel collection, flat shaded.
    pub fn emit(&self, session: &mut Session) {
        let mut code = String::new();
        let _ = writeln!(code, "\n# --- Segment: {} ({} steps) ---", self.name, self.steps);

        code.push_str("verts = [\n");
        for v in &self.vertices {
            let _ = writeln!(code, "    {},", fmt_vec3(*v));
        }
        code.push_str("]\nfaces = [\n");
        for f in &self.faces {
            let _ = writeln!(code, "    ({}, {}, {}, {}),", f[0], f[1], f[2], f[3]);
        }
        code.push_str("]\n");

        let mesh_name = self.mesh_name();
        let _ = write!(
            code,
            r#"me = bpy.data.meshes.new({mesh})
me.from_pydata(verts, [], faces)
me.update()
obj = bpy.data.objects.new({object}, me)
for p in me.polygons:
    p.use_smooth = False
"#,
            mesh = python_string_literal(&mesh_name),
            object = python_string_literal(&self.name),
        );
        code.push_str(&link_to_collection("obj", &self.name));

        session.push(&code);
        let manifest = session.manifest_mut();
        manifest.track_mesh(&mesh_name);
        manifest.track_object(&self.name);
    }
}

use crate::config::RenderConfig;
use crate::core::context::append_post_creation;
use crate::core::nodes::{CompositorNodeOutputFile, CompositorNodeRLayers};
use crate::core::session::Session;
use crate::core::tree::NodeTree;
use crate::core::types::{Color, NodeSocket, python_bool, python_string_literal};
use crate::render::plan::{CameraJob, LayerJob, PRIMARY_LAYER_NAME, RenderMode, RenderPlan};
use std::fmt::Write;

fn emit_scene_setup(session: &mut Session, plan: &RenderPlan, config: &RenderConfig) {
    session.section("Scene setup");
    let name = python_string_literal(&plan.scene_name);
    session.push(&format!(
        r#"scene = bpy.context.scene
scene.name = {name}
scene.use_nodes = True
if scene.view_layers[0].name == "ViewLayer":
    scene.view_layers[0].name = {primary}
scene.frame_current = 0
scene.frame_start = 0
scene.render.use_multiview = True
scene.render.views_format = 'MULTIVIEW'
scene.render.resolution_x = {res_x}
scene.render.resolution_y = {res_y}
scene.cycles.use_adaptive_sampling = {adaptive}
scene.cycles.use_denoising = {denoise}
scene.render.filepath = {scratch}
scene.render.image_settings.file_format = 'PNG'
scene.render.image_settings.color_mode = 'RGBA'
bpy.data.worlds["World"].mist_settings.falloff = '{falloff}'
"#,
        primary = python_string_literal(PRIMARY_LAYER_NAME),
        res_x = config.resolution[0],
        res_y = config.resolution[1],
        adaptive = python_bool(config.use_adaptive_sampling),
        denoise = python_bool(config.use_denoising),
        scratch = python_string_literal(&format!("{}{}_", config.scratch_dir, plan.scene_name)),
        falloff = config.mist_falloff,
    ));
}

fn file_output(image: NodeSocket<Color>, slot_path: &str) {
    let node = CompositorNodeOutputFile::new()
        .with_base_path("//")
        .with_image(image);
    append_post_creation(
        &node.name,
        &format!(
            "{n}.file_slots[0].path = {path}\n{n}.format.file_format = 'PNG'\n{n}.format.color_mode = 'RGBA'\n",
            n = node.name,
            path = python_string_literal(slot_path)
        ),
    );
}

/// Render Layers source feeding a combined and a mist file output.
fn layer_outputs(layer: &LayerJob) {
    let Some(paths) = &layer.outputs else {
        return;
    };
    let source = CompositorNodeRLayers::new().with_layer(&layer.name);
    file_output(source.out_image(), &paths.combined);
    file_output(source.out_mist().cast::<Color>(), &paths.mist);
}

fn emit_camera(session: &mut Session, job: &CameraJob) {
    session.section(&format!("Camera {} (view {})", job.object, job.view));

    let mut code = String::new();
    let _ = write!(
        code,
        r#"scene.cycles.samples = {samples}
for view in reversed(scene.render.views):
    if view.name in ("left", "right"):
        view.use = False
    else:
        scene.render.views.remove(view)
scene.render.views.new({view})
scene.camera = bpy.data.objects[{object}]
scene.frame_end = {frame_end}
"#,
        samples = job.samples,
        view = python_string_literal(&job.view),
        object = python_string_literal(&job.object),
        frame_end = job.frame_end,
    );
    for layer in &job.layers {
        let _ = writeln!(
            code,
            "layer = scene.view_layers[{}]\nlayer.use = {}",
            python_string_literal(&layer.name),
            python_bool(layer.enabled())
        );
        if layer.enabled() {
            code.push_str(
                "layer.use_pass_combined = True\nlayer.use_pass_z = False\nlayer.use_pass_mist = True\n",
            );
        }
    }
    session.push(&code);

    session.add_tree(&NodeTree::new_compositor(), || {
        for layer in &job.layers {
            layer_outputs(layer);
        }
    });

    session.push(match job.mode {
        RenderMode::Animation => "bpy.ops.render.render(animation=True)\n",
        RenderMode::Still => "bpy.ops.render.render(write_still=False)\n",
    });
}

/// Appends the scene setup and one render per planned camera.
pub fn emit(session: &mut Session, plan: &RenderPlan, config: &RenderConfig) {
    emit_scene_setup(session, plan, config);
    for job in &plan.jobs {
        emit_camera(session, job);
    }
}

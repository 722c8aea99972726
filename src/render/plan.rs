//! Per-camera render jobs derived from a scene snapshot.
use crate::config::RenderConfig;
use crate::render::snapshot::{CameraInfo, SceneSnapshot};
use log::{debug, warn};

/// Name Blender gives a new scene's first view layer.
const DEFAULT_LAYER_NAME: &str = "ViewLayer";
/// What the first view layer is renamed to before rendering.
pub const PRIMARY_LAYER_NAME: &str = "main";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// `hide_render` is set
    Hidden,
    /// The name carries the skip tag
    Tagged,
    /// The view name does not contain the camera filter
    Filtered,
    /// The camera object is not in any collection
    NoCollection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Animation,
    Still,
}

/// Whether a camera ending at `frame_end` renders its frame range.
pub fn render_mode(frame_end: i32, animation_frame_limit: i32) -> RenderMode {
    if frame_end > 1 && frame_end < animation_frame_limit {
        RenderMode::Animation
    } else {
        RenderMode::Still
    }
}

/// The preview camera renders with few samples.
pub fn sample_count(view: &str, config: &RenderConfig) -> u32 {
    if view == config.preview_camera {
        config.preview_samples
    } else {
        config.samples
    }
}

/// File-output slot paths for one layer of one camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub combined: String,
    pub mist: String,
}

/// `<root>/<scene>/[<layer>/]#_<view>` and the `m_` mist twin. `layer` is
/// `None` for the primary layer.
pub fn output_paths(root: &str, scene: &str, layer: Option<&str>, view: &str) -> OutputPaths {
    let prefix = layer.map(|l| format!("{}/", l)).unwrap_or_default();
    OutputPaths {
        combined: format!("{}/{}/{}#_{}", root, scene, prefix, view),
        mist: format!("{}/{}/{}m_#_{}", root, scene, prefix, view),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerJob {
    pub name: String,
    /// Set when the layer renders for this camera
    pub outputs: Option<OutputPaths>,
}

impl LayerJob {
    pub fn enabled(&self) -> bool {
        self.outputs.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraJob {
    /// Camera object name
    pub object: String,
    /// Stereo view name, the object name without the camera prefix
    pub view: String,
    pub samples: u32,
    pub frame_end: i32,
    pub mode: RenderMode,
    /// Every view layer, in scene order
    pub layers: Vec<LayerJob>,
}

impl CameraJob {
    pub fn enabled_layers(&self) -> impl Iterator<Item = &LayerJob> {
        self.layers.iter().filter(|l| l.enabled())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPlan {
    pub scene_name: String,
    /// View-layer names after the primary rename
    pub layer_names: Vec<String>,
    pub jobs: Vec<CameraJob>,
    pub skipped: Vec<(String, SkipReason)>,
}

fn layer_names(snapshot: &SceneSnapshot) -> Vec<String> {
    snapshot
        .view_layers
        .iter()
        .enumerate()
        .map(|(i, layer)| {
            if i == 0 && layer.name == DEFAULT_LAYER_NAME {
                PRIMARY_LAYER_NAME.to_string()
            } else {
                layer.name.clone()
            }
        })
        .collect()
}

fn skip_reason(
    camera: &CameraInfo,
    view: &str,
    config: &RenderConfig,
    filter: Option<&str>,
) -> Option<SkipReason> {
    if camera.hide_render {
        Some(SkipReason::Hidden)
    } else if !config.skip_tag.is_empty() && camera.name.contains(&config.skip_tag) {
        Some(SkipReason::Tagged)
    } else if filter.is_some_and(|f| !view.contains(f)) {
        Some(SkipReason::Filtered)
    } else if camera.collection.is_none() {
        Some(SkipReason::NoCollection)
    } else {
        None
    }
}

/// Plans one render job per eligible camera.
///
/// An empty `filter` is the same as no filter.
pub fn plan(snapshot: &SceneSnapshot, config: &RenderConfig, filter: Option<&str>) -> RenderPlan {
    let filter = filter.filter(|f| !f.is_empty());
    let scene_name = snapshot.scene_name();
    let names = layer_names(snapshot);

    let mut jobs = Vec::new();
    let mut skipped = Vec::new();
    for camera in &snapshot.cameras {
        let view = camera
            .name
            .strip_prefix(config.camera_prefix.as_str())
            .unwrap_or(&camera.name)
            .to_string();

        if let Some(reason) = skip_reason(camera, &view, config, filter) {
            if reason == SkipReason::NoCollection {
                warn!("camera {} is not in any collection, skipping", camera.name);
            } else {
                debug!("skipping camera {}: {:?}", camera.name, reason);
            }
            skipped.push((camera.name.clone(), reason));
            continue;
        }
        let collection = camera.collection.as_deref().unwrap_or_default();

        let layers = snapshot
            .view_layers
            .iter()
            .zip(&names)
            .enumerate()
            .map(|(i, (layer, name))| {
                let excluded_by_name = !config.excluded_layer_prefix.is_empty()
                    && name.starts_with(&config.excluded_layer_prefix);
                let enabled = match layer.layer_collection.find(collection) {
                    Some(lc) => !excluded_by_name && !lc.exclude,
                    None => {
                        warn!(
                            "view layer {} has no layer collection for {}, disabling it",
                            name, collection
                        );
                        false
                    }
                };
                let prefix = (i > 0).then_some(name.as_str());
                LayerJob {
                    name: name.clone(),
                    outputs: enabled
                        .then(|| output_paths(&config.output_root, &scene_name, prefix, &view)),
                }
            })
            .collect();

        let frame_end = camera.frame_end.unwrap_or(snapshot.frame_end);
        jobs.push(CameraJob {
            object: camera.name.clone(),
            samples: sample_count(&view, config),
            mode: render_mode(frame_end, config.animation_frame_limit),
            view,
            frame_end,
            layers,
        });
    }

    RenderPlan {
        scene_name,
        layer_names: names,
        jobs,
        skipped,
    }
}

//! Read-only view of the scene a render plan is computed from.
//!
//! The snapshot is written inside Blender by [`export_script`] and read back
//! here, so planning never needs the host.
use crate::core::types::python_string_literal;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSnapshot {
    /// Path of the open `.blend` file, empty when unsaved
    pub filepath: String,
    pub frame_end: i32,
    pub view_layers: Vec<ViewLayer>,
    /// Camera objects in `bpy.data.objects` order
    pub cameras: Vec<CameraInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewLayer {
    pub name: String,
    pub layer_collection: LayerCollection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerCollection {
    /// Name of the collection this entry wraps
    pub collection: String,
    pub exclude: bool,
    pub children: Vec<LayerCollection>,
}

impl LayerCollection {
    /// Depth-first search for the entry wrapping `collection`.
    pub fn find(&self, collection: &str) -> Option<&LayerCollection> {
        if self.collection == collection {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(collection))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraInfo {
    pub name: String,
    pub hide_render: bool,
    /// First collection the camera object belongs to
    pub collection: Option<String>,
    /// `frame_end` custom property, if set
    pub frame_end: Option<i32>,
}

impl SceneSnapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_json(&raw).map_err(|source| Error::Json {
            path: path.to_owned(),
            source,
        })
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Scene name derived from the file name, kept under `puzzles/` when the
    /// file lives there.
    pub fn scene_name(&self) -> String {
        let stem = display_name(&self.filepath);
        if stem.is_empty() {
            "untitled".to_string()
        } else if self.filepath.contains("puzzles/") {
            format!("puzzles/{}", stem)
        } else {
            stem
        }
    }
}

/// File name without directory or extension.
pub fn display_name(filepath: &str) -> String {
    let base = filepath.rsplit(['/', '\\']).next().unwrap_or_default();
    match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => base.to_string(),
    }
}

/// Python that writes the current scene's snapshot as JSON to `path`.
pub fn export_script(path: &str) -> String {
    format!(
        r#"import bpy
import json


def _layer_collection(lc):
    return {{
        "collection": lc.collection.name,
        "exclude": lc.exclude,
        "children": [_layer_collection(c) for c in lc.children],
    }}


def _camera(obj):
    frame_end = obj.get("frame_end")
    return {{
        "name": obj.name,
        "hide_render": obj.hide_render,
        "collection": obj.users_collection[0].name if obj.users_collection else None,
        "frame_end": int(frame_end) if frame_end is not None else None,
    }}


scene = bpy.context.scene
snapshot = {{
    "filepath": bpy.data.filepath,
    "frame_end": scene.frame_end,
    "view_layers": [
        {{"name": layer.name, "layer_collection": _layer_collection(layer.layer_collection)}}
        for layer in scene.view_layers
    ],
    "cameras": [_camera(obj) for obj in bpy.data.objects if obj.type == "CAMERA"],
}}
with open({path}, "w") as f:
    json.dump(snapshot, f, indent=2)
print(f"scene snapshot written: {{len(snapshot['cameras'])}} cameras")
"#,
        path = python_string_literal(path)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "filepath": "/work/puzzles/level3.blend",
        "frame_end": 120,
        "view_layers": [
            { "name": "ViewLayer", "layer_collection": {
                "collection": "Scene Collection",
                "children": [
                    { "collection": "Cams", "children": [
                        { "collection": "Nested", "exclude": true }
                    ] }
                ]
            } }
        ],
        "cameras": [
            { "name": "Camera_0", "collection": "Cams" },
            { "name": "Camera_A", "hide_render": true, "collection": "Nested", "frame_end": 48 }
        ]
    }"#;

    #[test]
    fn test_parses_partial_documents() {
        let snapshot = SceneSnapshot::from_json(SAMPLE).unwrap();
        assert_eq!(snapshot.frame_end, 120);
        assert_eq!(snapshot.cameras.len(), 2);
        assert!(!snapshot.cameras[0].hide_render);
        assert_eq!(snapshot.cameras[0].frame_end, None);
        assert_eq!(snapshot.cameras[1].frame_end, Some(48));
        assert!(!snapshot.view_layers[0].layer_collection.exclude);
    }

    #[test]
    fn test_layer_collection_search_is_recursive() {
        let snapshot = SceneSnapshot::from_json(SAMPLE).unwrap();
        let root = &snapshot.view_layers[0].layer_collection;

        assert!(root.find("Nested").unwrap().exclude);
        assert!(!root.find("Cams").unwrap().exclude);
        assert_eq!(root.find("Scene Collection"), Some(root));
        assert_eq!(root.find("Missing"), None);
    }

    #[test]
    fn test_scene_name() {
        let mut snapshot = SceneSnapshot::from_json(SAMPLE).unwrap();
        assert_eq!(snapshot.scene_name(), "puzzles/level3");

        snapshot.filepath = "C:\\scenes\\intro.v2.blend".to_string();
        assert_eq!(snapshot.scene_name(), "intro.v2");

        snapshot.filepath.clear();
        assert_eq!(snapshot.scene_name(), "untitled");
    }

    #[test]
    fn test_export_script_targets_path() {
        let script = export_script("/tmp/snap \"1\".json");
        assert!(script.contains("with open(\"/tmp/snap \\\"1\\\".json\", \"w\") as f:"));
        assert!(script.contains("if obj.type == \"CAMERA\""));
        assert!(crate::core::session::test_utils::nested_fstring_quotes(&script).is_empty());
    }
}

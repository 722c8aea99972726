use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Names of every data-block a generation pass created, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub collections: Vec<String>,
    pub objects: Vec<String>,
    pub meshes: Vec<String>,
    pub node_groups: Vec<String>,
}

impl Manifest {
    pub fn track_collection(&mut self, name: &str) {
        push_unique(&mut self.collections, name);
    }

    pub fn track_object(&mut self, name: &str) {
        push_unique(&mut self.objects, name);
    }

    pub fn track_mesh(&mut self, name: &str) {
        push_unique(&mut self.meshes, name);
    }

    pub fn track_node_group(&mut self, name: &str) {
        push_unique(&mut self.node_groups, name);
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
            && self.objects.is_empty()
            && self.meshes.is_empty()
            && self.node_groups.is_empty()
    }

    /// Reads a manifest, returning `None` when the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(Error::Read {
                    path: path.to_owned(),
                    source,
                });
            }
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| Error::Json {
                path: path.to_owned(),
                source,
            })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|source| Error::Json {
            path: path.to_owned(),
            source,
        })?;
        std::fs::write(path, json).map_err(|source| Error::Write {
            path: path.to_owned(),
            source,
        })
    }
}

fn push_unique(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|n| n == name) {
        list.push(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracking_ignores_duplicates() {
        let mut manifest = Manifest::default();
        assert!(manifest.is_empty());
        manifest.track_object("Segment (Key)");
        manifest.track_object("Segment (Key)");
        manifest.track_mesh("Segment (Key)_Mesh");
        assert_eq!(manifest.objects, ["Segment (Key)"]);
        assert!(!manifest.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!(
            "tunnel_manifest_{}.json",
            uuid::Uuid::new_v4().simple()
        ));
        assert_eq!(Manifest::load(&path).unwrap(), None);

        let mut manifest = Manifest::default();
        manifest.track_collection("Tunnel");
        manifest.track_node_group("TBM_TunnelProcedural");
        manifest.save(&path).unwrap();

        assert_eq!(Manifest::load(&path).unwrap(), Some(manifest));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_rejects_garbage() {
        let path = std::env::temp_dir().join(format!(
            "tunnel_manifest_{}.json",
            uuid::Uuid::new_v4().simple()
        ));
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(Manifest::load(&path), Err(Error::Json { .. })));
        std::fs::remove_file(&path).unwrap();
    }
}

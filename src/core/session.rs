use crate::core::live_link::LiveLink;
use crate::core::manifest::Manifest;
use crate::core::tree::{NodeTree, TreeType};
use crate::error::Result;
use log::trace;

/// Explicit handle to the Blender document a script will run against.
///
/// Every procedure that touches the scene takes `&mut Session`; it collects
/// the generated statements and records what they create.
pub struct Session {
    script: String,
    manifest: Manifest,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            script: generate_script_header(),
            manifest: Manifest::default(),
        }
    }

    pub fn push(&mut self, code: &str) {
        self.script.push_str(code);
    }

    pub fn section(&mut self, title: &str) {
        self.script.push_str(&format!("\n# ===== {} =====\n", title));
    }

    /// Builds a node tree into the script; geometry groups are recorded in
    /// the manifest.
    pub fn add_tree<F>(&mut self, tree: &NodeTree, builder: F)
    where
        F: FnOnce(),
    {
        let code = tree.build(builder);
        self.script.push_str(&code);
        if tree.tree_type() == TreeType::Geometry {
            self.manifest.track_node_group(tree.name());
        }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn manifest_mut(&mut self) -> &mut Manifest {
        &mut self.manifest
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn send(&self, link: &LiveLink) -> Result<()> {
        trace!("{}", self.script);
        link.send(&self.script)
    }
}

pub fn generate_script_header() -> String {
    "import bpy\n".to_string()
}

#[cfg(test)]
pub mod test_utils {
    /// Lines holding a `f"..."` literal whose replacement fields contain a
    /// double quote. Python before 3.12 cannot parse those.
    pub fn nested_fstring_quotes(script: &str) -> Vec<&str> {
        script
            .lines()
            .filter(|line| {
                let mut rest = *line;
                while let Some(start) = rest.find("f\"") {
                    let body = &rest[start + 2..];
                    let mut depth = 0;
                    let mut end = body.len();
                    for (i, ch) in body.char_indices() {
                        match ch {
                            '{' => depth += 1,
                            '}' if depth > 0 => depth -= 1,
                            '"' if depth > 0 => return true,
                            '"' => {
                                end = i + 1;
                                break;
                            }
                            _ => {}
                        }
                    }
                    rest = &body[end..];
                }
                false
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_utils::nested_fstring_quotes;
    use super::*;
    use crate::core::context::test_utils::GLOBAL_TEST_LOCK;
    use crate::core::nodes::NodeGroupOutput;
    use crate::core::types::Geo;

    #[test]
    fn test_geometry_trees_are_tracked() {
        let _lock = GLOBAL_TEST_LOCK.lock().unwrap();
        let mut session = Session::new();
        session.add_tree(&NodeTree::new_geometry("G").output::<Geo>("Geometry"), || {
            NodeGroupOutput::new();
        });
        session.add_tree(&NodeTree::new_compositor(), || {});

        assert!(session.script().starts_with("import bpy\n"));
        assert_eq!(session.manifest().node_groups, ["G"]);
    }

    #[test]
    fn test_nested_fstring_quotes() {
        let script = "print(f\"{obj.name} ok\")\n\
                      print(f\"{d['k']}\")\n\
                      print(f\"{created[\"Key\"].name}\")\n\
                      print(f\"{{literal}}\", \"x\")\n";
        assert_eq!(
            nested_fstring_quotes(script),
            ["print(f\"{created[\"Key\"].name}\")"]
        );
    }
}

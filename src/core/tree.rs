use crate::core::context::{enter_zone, exit_zone};
use crate::core::types::{NodeSocket, SocketDef, python_string_literal};
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeType {
    /// A geometry node group stored in `bpy.data.node_groups`.
    Geometry,
    /// The active scene's compositor tree.
    Compositor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Input,
    Output,
}

#[derive(Debug, Clone)]
struct InterfaceSocket {
    name: String,
    direction: Direction,
    socket_type: &'static str,
    default: Option<String>,
}

pub struct NodeTree {
    name: String,
    tree_type: TreeType,
    interface: Vec<InterfaceSocket>,
}

impl NodeTree {
    pub fn new_geometry(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tree_type: TreeType::Geometry,
            interface: Vec::new(),
        }
    }

    pub fn new_compositor() -> Self {
        Self {
            name: "Compositing".to_string(),
            tree_type: TreeType::Compositor,
            interface: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tree_type(&self) -> TreeType {
        self.tree_type
    }

    /// Declares a group input. Sockets are registered in declaration order,
    /// so `NodeGroupInput` outputs follow the same indices.
    pub fn input<T: SocketDef>(mut self, name: &str) -> Self {
        self.push_socket::<T>(name, Direction::Input, None);
        self
    }

    pub fn input_with_default<T: SocketDef>(
        mut self,
        name: &str,
        default: impl Into<NodeSocket<T>>,
    ) -> Self {
        let default = default.into().python_expr().to_string();
        self.push_socket::<T>(name, Direction::Input, Some(default));
        self
    }

    pub fn output<T: SocketDef>(mut self, name: &str) -> Self {
        self.push_socket::<T>(name, Direction::Output, None);
        self
    }

    fn push_socket<T: SocketDef>(&mut self, name: &str, direction: Direction, default: Option<String>) {
        self.interface.push(InterfaceSocket {
            name: name.to_string(),
            direction,
            socket_type: T::blender_socket_type(),
            default,
        });
    }

    fn generate_setup_script(&self) -> String {
        let mut code = String::new();
        match self.tree_type {
            TreeType::Geometry => {
                let _ = write!(
                    &mut code,
                    r#"
# --- Setup GeoNodes: {name} ---
tree_name = {literal}
if tree_name in bpy.data.node_groups:
    bpy.data.node_groups.remove(bpy.data.node_groups[tree_name], do_unlink=True)
tree = bpy.data.node_groups.new(name=tree_name, type='GeometryNodeTree')
"#,
                    name = self.name,
                    literal = python_string_literal(&self.name)
                );
                for direction in [Direction::Input, Direction::Output] {
                    for socket in self.interface.iter().filter(|s| s.direction == direction) {
                        let _ = writeln!(
                            &mut code,
                            "tree.interface.new_socket(name={}, in_out='{}', socket_type='{}')",
                            python_string_literal(&socket.name),
                            match direction {
                                Direction::Input => "INPUT",
                                Direction::Output => "OUTPUT",
                            },
                            socket.socket_type
                        );
                    }
                }
            }
            TreeType::Compositor => {
                code.push_str(
                    r#"
# --- Setup Compositor ---
bpy.context.scene.use_nodes = True
tree = bpy.context.scene.node_tree
tree.nodes.clear()
"#,
                );
            }
        }
        code
    }

    fn generate_defaults_script(&self) -> String {
        let mut code = String::new();
        let defaults: Vec<_> = self
            .interface
            .iter()
            .filter_map(|s| s.default.as_ref().map(|d| (&s.name, d)))
            .collect();
        if defaults.is_empty() {
            return code;
        }
        code.push_str("\n# --- Interface Defaults Phase ---\n");
        for (name, value) in defaults {
            let _ = writeln!(
                &mut code,
                "tree.interface.items_tree[{}].default_value = {}",
                python_string_literal(name),
                value
            );
        }
        code
    }

    /// Runs `body`, collecting every node it creates, and returns the script
    /// that rebuilds this tree from scratch.
    pub fn build<F>(&self, body: F) -> String
    where
        F: FnOnce(),
    {
        struct PanicGuard {
            is_panicking: bool,
        }

        impl Drop for PanicGuard {
            fn drop(&mut self) {
                if self.is_panicking {
                    let _ = exit_zone();
                }
            }
        }

        enter_zone();
        let mut guard = PanicGuard { is_panicking: true };
        body();
        guard.is_panicking = false;
        let my_nodes = exit_zone();

        let mut code = self.generate_setup_script();

        code.push_str("\n# --- Node Creation Phase ---\n");
        for node in &my_nodes {
            code.push_str(&node.creation_script());
        }

        code.push_str("\n# --- Node Linking Phase ---\n");
        for node in &my_nodes {
            code.push_str(&node.links_script());
        }

        code.push_str(&self.generate_defaults_script());
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::test_utils::GLOBAL_TEST_LOCK;
    use crate::core::nodes::{GeometryNodeMeshLine, NodeGroupInput, NodeGroupOutput};
    use crate::core::types::{Geo, Int, NodeGroupInputExt, Object};

    #[test]
    fn test_geometry_setup_registers_interface_in_order() {
        let _lock = GLOBAL_TEST_LOCK.lock().unwrap();
        let tree = NodeTree::new_geometry("Demo")
            .output::<Geo>("Geometry")
            .input::<Object>("Segment")
            .input_with_default::<Int>("Count", 3);

        let script = tree.build(|| {
            let group_in = NodeGroupInput::new();
            let line = GeometryNodeMeshLine::new().with_count(group_in.socket::<Int>("Count"));
            NodeGroupOutput::new().set_input(0, line.out_mesh());
        });

        let segment = script.find("name=\"Segment\", in_out='INPUT'").unwrap();
        let count = script.find("name=\"Count\", in_out='INPUT'").unwrap();
        let geometry = script.find("name=\"Geometry\", in_out='OUTPUT'").unwrap();
        assert!(segment < count && count < geometry);

        assert!(script.contains("tree.interface.items_tree[\"Count\"].default_value = 3\n"));
        assert!(script.find("Node Linking Phase") < script.find("Interface Defaults Phase"));
        assert_eq!(script.matches("tree.links.new(").count(), 2);
    }

    #[test]
    fn test_compositor_setup_clears_scene_tree() {
        let _lock = GLOBAL_TEST_LOCK.lock().unwrap();
        let script = NodeTree::new_compositor().build(|| {});
        assert!(script.contains("tree = bpy.context.scene.node_tree\ntree.nodes.clear()\n"));
        assert!(!script.contains("Interface Defaults Phase"));
    }
}

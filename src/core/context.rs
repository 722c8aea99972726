use crate::core::types::NodeSocket;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::{Mutex, MutexGuard};

/// What feeds a node input: a literal default or one or more links.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputValue {
    Literal(String),
    Link(String),
    Links(Vec<String>),
}

impl InputValue {
    fn from_socket<T>(socket: &NodeSocket<T>) -> Self {
        if socket.is_literal() {
            Self::Literal(socket.python_expr().to_string())
        } else {
            Self::Link(socket.python_expr().to_string())
        }
    }
}

#[derive(Clone, Debug)]
pub struct NodeData {
    pub name: String,
    pub bl_idname: String,
    pub properties: BTreeMap<String, String>,
    pub inputs: BTreeMap<usize, InputValue>,
    pub output_defaults: BTreeMap<usize, String>,
    pub post_creation_script: String,
}

impl NodeData {
    pub fn new(name: String, bl_idname: String) -> Self {
        Self {
            name,
            bl_idname,
            properties: BTreeMap::new(),
            inputs: BTreeMap::new(),
            output_defaults: BTreeMap::new(),
            post_creation_script: String::new(),
        }
    }

    pub fn creation_script(&self) -> String {
        let mut code = format!("{} = tree.nodes.new('{}')\n", self.name, self.bl_idname);
        for (k, v) in &self.properties {
            let _ = writeln!(code, "{}.{} = {}", self.name, k, v);
        }
        for (idx, value) in &self.inputs {
            if let InputValue::Literal(expr) = value {
                let _ = writeln!(
                    code,
                    "{}.inputs[{}].default_value = {}",
                    self.name, idx, expr
                );
            }
        }
        for (idx, expr) in &self.output_defaults {
            let _ = writeln!(
                code,
                "{}.outputs[{}].default_value = {}",
                self.name, idx, expr
            );
        }
        code.push_str(&self.post_creation_script);
        code
    }

    pub fn links_script(&self) -> String {
        let mut code = String::new();
        for (idx, value) in &self.inputs {
            let sources: &[String] = match value {
                InputValue::Literal(_) => &[],
                InputValue::Link(src) => std::slice::from_ref(src),
                InputValue::Links(srcs) => srcs,
            };
            for src in sources {
                let _ = writeln!(
                    code,
                    "tree.links.new({}, {}.inputs[{}])",
                    src, self.name, idx
                );
            }
        }
        code
    }

    /// Number of links this node receives.
    pub fn link_count(&self) -> usize {
        self.inputs
            .values()
            .map(|v| match v {
                InputValue::Literal(_) => 0,
                InputValue::Link(_) => 1,
                InputValue::Links(l) => l.len(),
            })
            .sum()
    }
}

pub type Scope = Vec<NodeData>;

/// Stack of node scopes; each tree build pushes one and pops it when done.
pub struct BuildContext {
    stack: Vec<Scope>,
}

impl BuildContext {
    fn new() -> Self {
        Self {
            stack: vec![Vec::new()],
        }
    }

    fn add_node(&mut self, data: NodeData) {
        if let Some(scope) = self.stack.last_mut() {
            scope.push(data);
        }
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut NodeData> {
        self.stack
            .iter_mut()
            .rev()
            .find_map(|scope| scope.iter_mut().find(|n| n.name == name))
    }

    fn enter_scope(&mut self) {
        self.stack.push(Vec::new());
    }

    fn exit_scope(&mut self) -> Scope {
        if self.stack.len() > 1 {
            self.stack.pop().unwrap_or_default()
        } else {
            std::mem::take(&mut self.stack[0])
        }
    }
}

static GLOBAL_CONTEXT: Lazy<Mutex<BuildContext>> = Lazy::new(|| Mutex::new(BuildContext::new()));

fn context() -> MutexGuard<'static, BuildContext> {
    GLOBAL_CONTEXT
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn add_node(data: NodeData) {
    context().add_node(data);
}

pub fn update_property(name: &str, key: &str, val: String) {
    if let Some(node) = context().find_mut(name) {
        node.properties.insert(key.to_string(), val);
    }
}

pub fn update_input<T>(name: &str, index: usize, socket: &NodeSocket<T>) {
    if let Some(node) = context().find_mut(name) {
        node.inputs.insert(index, InputValue::from_socket(socket));
    }
}

/// Adds one more link to a multi-input socket, keeping the existing ones.
pub fn append_input<T>(name: &str, index: usize, socket: &NodeSocket<T>) {
    let mut ctx = context();
    let Some(node) = ctx.find_mut(name) else {
        return;
    };
    let incoming = InputValue::from_socket(socket);
    let merged = match (node.inputs.remove(&index), incoming) {
        (_, InputValue::Literal(expr)) => InputValue::Literal(expr),
        (Some(InputValue::Link(prev)), InputValue::Link(src)) => InputValue::Links(vec![prev, src]),
        (Some(InputValue::Links(mut prev)), InputValue::Link(src)) => {
            prev.push(src);
            InputValue::Links(prev)
        }
        (_, InputValue::Link(src)) => InputValue::Links(vec![src]),
        (_, links @ InputValue::Links(_)) => links,
    };
    node.inputs.insert(index, merged);
}

pub fn update_output_default<T>(name: &str, index: usize, socket: &NodeSocket<T>) {
    if let Some(node) = context().find_mut(name) {
        node.output_defaults
            .insert(index, socket.python_expr().to_string());
    }
}

/// Appends raw statements run right after the node is created.
pub fn append_post_creation(name: &str, script: &str) {
    if let Some(node) = context().find_mut(name) {
        node.post_creation_script.push_str(script);
    }
}

pub fn enter_zone() {
    context().enter_scope();
}

pub fn exit_zone() -> Scope {
    context().exit_scope()
}

#[cfg(test)]
pub mod test_utils {
    use once_cell::sync::Lazy;
    use std::sync::Mutex;

    /// Serialises tests that build nodes through the global context.
    pub static GLOBAL_TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
}

#[cfg(test)]
mod tests {
    use super::test_utils::GLOBAL_TEST_LOCK;
    use super::*;

    fn node(name: &str) {
        add_node(NodeData::new(name.to_string(), "ShaderNodeMath".to_string()));
    }

    #[test]
    fn test_literal_and_link_phases() {
        let _lock = GLOBAL_TEST_LOCK.lock().unwrap();
        enter_zone();
        node("m");
        update_property("m", "operation", "\"ADD\"".to_string());
        update_input("m", 1, &NodeSocket::<crate::core::types::Float>::from(0.5));
        update_input(
            "m",
            0,
            &NodeSocket::<crate::core::types::Float>::new_output("idx.outputs[\"Index\"]"),
        );
        let nodes = exit_zone();

        assert_eq!(nodes.len(), 1);
        let created = nodes[0].creation_script();
        assert!(created.starts_with("m = tree.nodes.new('ShaderNodeMath')\n"));
        assert!(created.contains("m.operation = \"ADD\"\n"));
        assert!(created.contains("m.inputs[1].default_value = 0.500000\n"));
        assert!(!created.contains("inputs[0]"));

        assert_eq!(
            nodes[0].links_script(),
            "tree.links.new(idx.outputs[\"Index\"], m.inputs[0])\n"
        );
    }

    #[test]
    fn test_append_input_accumulates_links() {
        let _lock = GLOBAL_TEST_LOCK.lock().unwrap();
        enter_zone();
        node("join");
        append_input("join", 0, &NodeSocket::<crate::core::types::Geo>::new_output("a.outputs[0]"));
        append_input("join", 0, &NodeSocket::<crate::core::types::Geo>::new_output("b.outputs[0]"));
        let nodes = exit_zone();

        assert_eq!(nodes[0].link_count(), 2);
        let links = nodes[0].links_script();
        assert_eq!(links.lines().count(), 2);
        assert!(links.find("a.outputs[0]") < links.find("b.outputs[0]"));
    }

    #[test]
    fn test_nested_scopes_are_isolated() {
        let _lock = GLOBAL_TEST_LOCK.lock().unwrap();
        enter_zone();
        node("outer");
        enter_zone();
        node("inner");
        update_property("outer", "label", "\"x\"".to_string());
        let inner = exit_zone();
        let outer = exit_zone();

        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0].name, "inner");
        assert_eq!(outer.len(), 1);
        assert_eq!(outer[0].properties.get("label").unwrap(), "\"x\"");
    }
}

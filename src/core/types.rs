use std::marker::PhantomData;

pub struct Geo;
pub struct Float;
pub struct Int;
pub struct Vector;
pub struct Color;
pub struct StringType;
pub struct Bool;
pub struct Object;
pub struct Collection;
pub struct Rotation;
pub struct Matrix;

pub fn python_string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str(r"\\"),
            '"' => out.push_str(r#"\""#),
            '\n' => out.push_str(r"\n"),
            '\r' => out.push_str(r"\r"),
            '\t' => out.push_str(r"\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

pub fn python_bool(v: bool) -> String {
    String::from(if v { "True" } else { "False" })
}

/// Formats a float as a Python expression with six decimals.
pub fn fmt_f64(v: f64) -> String {
    if v.is_nan() {
        "float('nan')".to_string()
    } else if v.is_infinite() && v.is_sign_positive() {
        "float('inf')".to_string()
    } else if v.is_infinite() {
        "float('-inf')".to_string()
    } else {
        let s = format!("{:.6}", v);
        // keep "-0.000000" out of generated scripts
        if s.trim_start_matches('-').chars().all(|c| c == '0' || c == '.') {
            s.trim_start_matches('-').to_string()
        } else {
            s
        }
    }
}

pub fn fmt_f32(v: f32) -> String {
    fmt_f64(f64::from(v))
}

pub fn fmt_vec3(v: [f64; 3]) -> String {
    format!("({}, {}, {})", fmt_f64(v[0]), fmt_f64(v[1]), fmt_f64(v[2]))
}

/// A typed handle to a value inside a node tree.
///
/// Literal sockets carry a Python expression that becomes an input's
/// `default_value`; output sockets reference another node's output and become
/// links.
#[derive(Debug, PartialEq, Eq)]
pub struct NodeSocket<T> {
    expr: String,
    is_literal: bool,
    _marker: PhantomData<T>,
}

impl<T> Clone for NodeSocket<T> {
    fn clone(&self) -> Self {
        Self {
            expr: self.expr.clone(),
            is_literal: self.is_literal,
            _marker: PhantomData,
        }
    }
}

impl<T> NodeSocket<T> {
    pub fn new_expr(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            is_literal: true,
            _marker: PhantomData,
        }
    }

    pub fn new_output(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            is_literal: false,
            _marker: PhantomData,
        }
    }

    pub fn python_expr(&self) -> &str {
        &self.expr
    }

    pub fn is_literal(&self) -> bool {
        self.is_literal
    }

    pub fn cast<U>(self) -> NodeSocket<U> {
        NodeSocket {
            expr: self.expr,
            is_literal: self.is_literal,
            _marker: PhantomData,
        }
    }
}

impl From<f32> for NodeSocket<Float> {
    fn from(v: f32) -> Self {
        Self::new_expr(fmt_f32(v))
    }
}

impl From<i32> for NodeSocket<Int> {
    fn from(v: i32) -> Self {
        Self::new_expr(v.to_string())
    }
}

impl From<bool> for NodeSocket<Bool> {
    fn from(v: bool) -> Self {
        Self::new_expr(python_bool(v))
    }
}

impl From<&str> for NodeSocket<StringType> {
    fn from(s: &str) -> Self {
        Self::new_expr(python_string_literal(s))
    }
}

impl From<(f32, f32, f32)> for NodeSocket<Vector> {
    fn from(v: (f32, f32, f32)) -> Self {
        Self::new_expr(format!(
            "({}, {}, {})",
            fmt_f32(v.0),
            fmt_f32(v.1),
            fmt_f32(v.2)
        ))
    }
}

impl<T> From<&NodeSocket<T>> for NodeSocket<T> {
    fn from(socket: &NodeSocket<T>) -> Self {
        socket.clone()
    }
}

/// Interface metadata for socket types that can appear on a group interface.
pub trait SocketDef {
    fn blender_socket_type() -> &'static str;
}

macro_rules! impl_socket_def {
    ($type:ident, $blender_sock:expr) => {
        impl SocketDef for $type {
            fn blender_socket_type() -> &'static str {
                $blender_sock
            }
        }
    };
}

impl_socket_def!(Geo, "NodeSocketGeometry");
impl_socket_def!(Float, "NodeSocketFloat");
impl_socket_def!(Int, "NodeSocketInt");
impl_socket_def!(Vector, "NodeSocketVector");
impl_socket_def!(Color, "NodeSocketColor");
impl_socket_def!(Bool, "NodeSocketBool");
impl_socket_def!(StringType, "NodeSocketString");
impl_socket_def!(Object, "NodeSocketObject");
impl_socket_def!(Collection, "NodeSocketCollection");
impl_socket_def!(Rotation, "NodeSocketRotation");
impl_socket_def!(Matrix, "NodeSocketMatrix");

/// Group input sockets are defined by the tree interface, not the catalog.
pub trait NodeGroupInputExt {
    fn socket<T: SocketDef>(&self, name: &str) -> NodeSocket<T>;
}

impl NodeGroupInputExt for crate::core::nodes::NodeGroupInput {
    fn socket<T: SocketDef>(&self, name: &str) -> NodeSocket<T> {
        NodeSocket::new_output(format!(
            "{}.outputs[{}]",
            self.name,
            python_string_literal(name)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_formatting() {
        assert_eq!(
            NodeSocket::<Float>::from(std::f32::consts::PI).python_expr(),
            "3.141593"
        );
        assert_eq!(NodeSocket::<Float>::from(-0.0).python_expr(), "0.000000");
        assert_eq!(NodeSocket::<Float>::from(f32::NAN).python_expr(), "float('nan')");
        assert_eq!(NodeSocket::<Int>::from(27).python_expr(), "27");
        assert_eq!(NodeSocket::<Bool>::from(false).python_expr(), "False");
        assert_eq!(fmt_vec3([1.0, -0.5, 2.25]), "(1.000000, -0.500000, 2.250000)");
    }

    #[test]
    fn test_string_escaping() {
        assert_eq!(python_string_literal("Segment (Key)"), "\"Segment (Key)\"");
        assert_eq!(
            python_string_literal("a \"b\"\\c\n"),
            "\"a \\\"b\\\"\\\\c\\n\""
        );
    }

    #[test]
    fn test_literal_and_output_kinds() {
        let lit = NodeSocket::<Vector>::from((0.0, 1.0, 0.0));
        assert!(lit.is_literal());

        let out = NodeSocket::<Int>::new_output("node.outputs[0]");
        assert!(!out.is_literal());

        let cast: NodeSocket<Float> = out.cast();
        assert!(!cast.is_literal());
        assert_eq!(cast.python_expr(), "node.outputs[0]");
    }
}

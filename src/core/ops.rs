use crate::core::nodes::ShaderNodeMath;
use crate::core::types::{Float, NodeSocket};

fn math(op: &str, a: NodeSocket<Float>, b: NodeSocket<Float>) -> NodeSocket<Float> {
    ShaderNodeMath::new()
        .with_operation(op)
        .set_input(0, a)
        .set_input(1, b)
        .out_value()
}

macro_rules! impl_float_op {
    ($Trait:ident, $method:ident, $op_str:expr) => {
        impl std::ops::$Trait<&NodeSocket<Float>> for &NodeSocket<Float> {
            type Output = NodeSocket<Float>;
            fn $method(self, rhs: &NodeSocket<Float>) -> Self::Output {
                math($op_str, self.clone(), rhs.clone())
            }
        }
        impl std::ops::$Trait<&NodeSocket<Float>> for NodeSocket<Float> {
            type Output = NodeSocket<Float>;
            fn $method(self, rhs: &NodeSocket<Float>) -> Self::Output {
                math($op_str, self, rhs.clone())
            }
        }
        impl std::ops::$Trait<NodeSocket<Float>> for &NodeSocket<Float> {
            type Output = NodeSocket<Float>;
            fn $method(self, rhs: NodeSocket<Float>) -> Self::Output {
                math($op_str, self.clone(), rhs)
            }
        }
        impl std::ops::$Trait<NodeSocket<Float>> for NodeSocket<Float> {
            type Output = NodeSocket<Float>;
            fn $method(self, rhs: NodeSocket<Float>) -> Self::Output {
                math($op_str, self, rhs)
            }
        }

        // with plain f32 on either side
        impl std::ops::$Trait<f32> for &NodeSocket<Float> {
            type Output = NodeSocket<Float>;
            fn $method(self, rhs: f32) -> Self::Output {
                math($op_str, self.clone(), rhs.into())
            }
        }
        impl std::ops::$Trait<f32> for NodeSocket<Float> {
            type Output = NodeSocket<Float>;
            fn $method(self, rhs: f32) -> Self::Output {
                math($op_str, self, rhs.into())
            }
        }
        impl std::ops::$Trait<&NodeSocket<Float>> for f32 {
            type Output = NodeSocket<Float>;
            fn $method(self, rhs: &NodeSocket<Float>) -> Self::Output {
                math($op_str, self.into(), rhs.clone())
            }
        }
        impl std::ops::$Trait<NodeSocket<Float>> for f32 {
            type Output = NodeSocket<Float>;
            fn $method(self, rhs: NodeSocket<Float>) -> Self::Output {
                math($op_str, self.into(), rhs)
            }
        }
    };
}

impl_float_op!(Add, add, "ADD");
impl_float_op!(Sub, sub, "SUBTRACT");
impl_float_op!(Mul, mul, "MULTIPLY");
impl_float_op!(Div, div, "DIVIDE");

impl std::ops::Neg for &NodeSocket<Float> {
    type Output = NodeSocket<Float>;
    fn neg(self) -> Self::Output {
        self * -1.0
    }
}

impl std::ops::Neg for NodeSocket<Float> {
    type Output = NodeSocket<Float>;
    fn neg(self) -> Self::Output {
        -&self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context;
    use crate::core::context::InputValue;
    use crate::core::context::test_utils::GLOBAL_TEST_LOCK;

    #[test]
    fn test_operators_emit_math_nodes() {
        let _lock = GLOBAL_TEST_LOCK.lock().unwrap();
        context::enter_zone();
        let a = NodeSocket::<Float>::new_output("a.outputs[0]");
        let b = NodeSocket::<Float>::new_output("b.outputs[0]");

        let _ = &a + &b;
        let _ = &a - b.clone();
        let _ = a.clone() * &b;
        let _ = a.clone() / b.clone();

        let nodes = context::exit_zone();
        let ops: Vec<_> = nodes
            .iter()
            .map(|n| n.properties.get("operation").unwrap().as_str())
            .collect();
        assert_eq!(ops, ["\"ADD\"", "\"SUBTRACT\"", "\"MULTIPLY\"", "\"DIVIDE\""]);
        assert!(nodes.iter().all(|n| n.bl_idname == "ShaderNodeMath"));
        assert!(nodes.iter().all(|n| n.link_count() == 2));
    }

    #[test]
    fn test_scalar_operand_order() {
        let _lock = GLOBAL_TEST_LOCK.lock().unwrap();
        context::enter_zone();
        let a = NodeSocket::<Float>::new_output("a.outputs[0]");

        let _ = &a - 2.0;
        let _ = 100.0 / &a;

        let nodes = context::exit_zone();
        assert_eq!(nodes[0].inputs[&0], InputValue::Link("a.outputs[0]".to_string()));
        assert_eq!(nodes[0].inputs[&1], InputValue::Literal("2.000000".to_string()));
        assert_eq!(nodes[1].inputs[&0], InputValue::Literal("100.000000".to_string()));
        assert_eq!(nodes[1].inputs[&1], InputValue::Link("a.outputs[0]".to_string()));
    }

    #[test]
    fn test_negation_multiplies_by_minus_one() {
        let _lock = GLOBAL_TEST_LOCK.lock().unwrap();
        context::enter_zone();
        let a = NodeSocket::<Float>::new_output("a.outputs[0]");
        let neg = -&a;
        let nodes = context::exit_zone();

        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].properties["operation"], "\"MULTIPLY\"");
        assert_eq!(nodes[0].inputs[&1], InputValue::Literal("-1.000000".to_string()));
        assert!(!neg.is_literal());
    }
}

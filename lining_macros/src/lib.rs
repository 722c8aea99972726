use proc_macro::TokenStream;
use quote::quote;
use syn::fold::Fold;
use syn::{Expr, parse_macro_input};

/// Rust function name, Blender `ShaderNodeMath` operation, argument count.
const MATH_OPS: &[(&str, &str, usize)] = &[
    ("sin", "SINE", 1),
    ("cos", "COSINE", 1),
    ("tan", "TANGENT", 1),
    ("asin", "ARCSINE", 1),
    ("acos", "ARCCOSINE", 1),
    ("atan", "ARCTANGENT", 1),
    ("sqrt", "SQRT", 1),
    ("exp", "EXPONENT", 1),
    ("round", "ROUND", 1),
    ("floor", "FLOOR", 1),
    ("ceil", "CEIL", 1),
    ("fract", "FRACT", 1),
    ("abs", "ABSOLUTE", 1),
    ("sign", "SIGN", 1),
    ("radians", "RADIANS", 1),
    ("degrees", "DEGREES", 1),
    ("atan2", "ARCTAN2", 2),
    ("pow", "POWER", 2),
    ("modulo", "MODULO", 2),
    ("min", "MINIMUM", 2),
    ("max", "MAXIMUM", 2),
    ("snap", "SNAP", 2),
    ("wrap", "WRAP", 3),
    ("compare", "COMPARE", 3),
    ("multiply_add", "MULTIPLY_ADD", 3),
];

fn lookup_op(name: &str) -> Option<(&'static str, usize)> {
    MATH_OPS
        .iter()
        .find(|(rust_name, _, _)| *rust_name == name)
        .map(|&(_, op, arity)| (op, arity))
}

/// Rewrites a Rust arithmetic expression over `NodeSocket<Float>` values.
///
/// Variables are cloned on every use so a socket can appear more than once,
/// and calls to the functions in `MATH_OPS` become `ShaderNodeMath` nodes.
struct NodeMathFolder;

impl Fold for NodeMathFolder {
    fn fold_expr(&mut self, expr: Expr) -> Expr {
        let folded = syn::fold::fold_expr(self, expr);

        match &folded {
            Expr::Path(path) => {
                if let Some(ident) = path.path.get_ident()
                    && lookup_op(&ident.to_string()).is_some()
                {
                    return folded;
                }
                syn::parse_quote!( #path.clone() )
            }
            Expr::Call(call) => {
                let Expr::Path(func) = &*call.func else {
                    return folded;
                };
                let Some(name) = func.path.segments.last().map(|s| s.ident.to_string()) else {
                    return folded;
                };
                let Some((op, arity)) = lookup_op(&name) else {
                    return folded;
                };
                if call.args.len() != arity {
                    let msg = format!(
                        "node_math!: `{}` takes {} argument(s), got {}",
                        name,
                        arity,
                        call.args.len()
                    );
                    return syn::parse_quote! { compile_error!(#msg) };
                }

                let inputs = call
                    .args
                    .iter()
                    .enumerate()
                    .map(|(i, arg)| quote! { .set_input(#i, #arg) });

                syn::parse_quote! {
                    crate::core::nodes::ShaderNodeMath::new()
                        .with_operation(#op)
                        #(#inputs)*
                        .out_value()
                }
            }
            _ => folded,
        }
    }
}

/// Builds a chain of Math nodes from an ordinary Rust expression.
///
/// Operators go through the `std::ops` impls on `NodeSocket<Float>`; calls
/// such as `radians(x)` or `atan2(y, x)` become single `ShaderNodeMath`
/// nodes. Paths are cloned, so a variable may be used several times.
///
/// ```ignore
/// let angle = node_math!(radians((index + 0.5) * step_deg));
/// ```
///
/// A variable named like a supported function (`sin`, `min`, ...) is not
/// cloned and will be moved.
#[proc_macro]
pub fn node_math(input: TokenStream) -> TokenStream {
    let expr = parse_macro_input!(input as Expr);
    let expanded = NodeMathFolder.fold_expr(expr);
    TokenStream::from(quote!( #expanded ))
}

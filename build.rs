use heck::{ToPascalCase, ToSnakeCase};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::env;
use std::fs;
use std::path::Path;

const CATALOG_PATH: &str = "blender_nodes.json";

// catalog schema ---------------------------------------------------------------------------------
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum SocketKind {
    NodeSocketBool,
    NodeSocketColor,
    NodeSocketFloat,
    NodeSocketFloatAngle,
    NodeSocketFloatDistance,
    NodeSocketFloatFactor,
    NodeSocketGeometry,
    NodeSocketInt,
    NodeSocketMatrix,
    NodeSocketObject,
    NodeSocketCollection,
    NodeSocketRotation,
    NodeSocketString,
    NodeSocketVector,
    NodeSocketVectorEuler,
    NodeSocketVectorTranslation,
    NodeSocketVectorXYZ,
}

#[derive(Deserialize, Debug)]
struct SocketDecl {
    name: String,
    #[serde(rename = "type")]
    kind: SocketKind,
    #[serde(default)]
    is_multi_input: bool,
}

#[derive(Deserialize, Debug)]
struct EnumItem {
    identifier: String,
}

#[derive(Deserialize, Debug)]
struct PropertyDecl {
    identifier: String,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    enum_items: Vec<EnumItem>,
}

#[derive(Deserialize, Debug)]
struct NodeDecl {
    bl_idname: String,
    #[serde(default)]
    inputs: Vec<SocketDecl>,
    #[serde(default)]
    outputs: Vec<SocketDecl>,
    #[serde(default)]
    properties: Vec<PropertyDecl>,
}

#[derive(Deserialize, Debug)]
#[allow(non_snake_case)]
struct Catalog {
    #[serde(default)]
    GeometryNodes: BTreeMap<String, NodeDecl>,
    #[serde(default)]
    CompositorNodes: BTreeMap<String, NodeDecl>,
}

// identifiers ------------------------------------------------------------------------------------
#[derive(Default)]
struct IdentPool {
    used: HashSet<String>,
}

impl IdentPool {
    /// Returns `<prefix>_<snake name>`, suffixed with a counter on collision.
    fn claim(&mut self, raw: &str, fallback_index: usize, prefix: &str) -> String {
        let mut base = raw.to_snake_case();
        if base.is_empty() {
            base = format!("idx_{}", fallback_index);
        } else if base.starts_with(|c: char| c.is_ascii_digit()) {
            base = format!("_{}", base);
        }
        if syn::parse_str::<syn::Ident>(&base).is_err() {
            base.push('_');
        }

        let stem = format!("{}_{}", prefix, base);
        let mut candidate = stem.clone();
        let mut counter = 0;
        while self.used.contains(&candidate) {
            candidate = format!("{}_{}", stem, counter);
            counter += 1;
        }
        if counter > 0 && env::var("LINING_DEBUG_NODES").is_ok() {
            println!("cargo:warning=renamed colliding binding '{}' to '{}'", stem, candidate);
        }
        self.used.insert(candidate.clone());
        candidate
    }
}

fn rust_type(kind: SocketKind) -> TokenStream {
    match kind {
        SocketKind::NodeSocketGeometry => quote! { crate::core::types::Geo },
        SocketKind::NodeSocketFloat
        | SocketKind::NodeSocketFloatAngle
        | SocketKind::NodeSocketFloatDistance
        | SocketKind::NodeSocketFloatFactor => quote! { crate::core::types::Float },
        SocketKind::NodeSocketInt => quote! { crate::core::types::Int },
        SocketKind::NodeSocketVector
        | SocketKind::NodeSocketVectorEuler
        | SocketKind::NodeSocketVectorTranslation
        | SocketKind::NodeSocketVectorXYZ => quote! { crate::core::types::Vector },
        SocketKind::NodeSocketColor => quote! { crate::core::types::Color },
        SocketKind::NodeSocketBool => quote! { crate::core::types::Bool },
        SocketKind::NodeSocketObject => quote! { crate::core::types::Object },
        SocketKind::NodeSocketCollection => quote! { crate::core::types::Collection },
        SocketKind::NodeSocketString => quote! { crate::core::types::StringType },
        SocketKind::NodeSocketRotation => quote! { crate::core::types::Rotation },
        SocketKind::NodeSocketMatrix => quote! { crate::core::types::Matrix },
    }
}

// generators -------------------------------------------------------------------------------------
fn input_bindings(decl: &NodeDecl, pool: &mut IdentPool) -> (Vec<TokenStream>, Vec<TokenStream>) {
    let mut pins = Vec::new();
    let mut setters = Vec::new();
    let mut used_pins = HashSet::new();

    for (i, socket) in decl.inputs.iter().enumerate() {
        let upper = socket.name.to_snake_case().to_uppercase();
        let stem = if upper.is_empty() || upper.starts_with(|c: char| c.is_ascii_digit()) {
            format!("PIN_{}", i)
        } else {
            format!("PIN_{}", upper)
        };
        let mut pin = stem.clone();
        let mut counter = 0;
        while !used_pins.insert(pin.clone()) {
            pin = format!("{}_{}", stem, counter);
            counter += 1;
        }
        let pin_ident = format_ident!("{}", pin);
        pins.push(quote! { pub const #pin_ident: usize = #i; });

        let ty = rust_type(socket.kind);
        let (prefix, call) = if socket.is_multi_input {
            ("append", quote! { crate::core::context::append_input })
        } else {
            ("with", quote! { crate::core::context::update_input })
        };
        let method = format_ident!("{}", pool.claim(&socket.name, i, prefix));
        setters.push(quote! {
            pub fn #method(self, val: impl Into<crate::core::types::NodeSocket<#ty>>) -> Self {
                let socket: crate::core::types::NodeSocket<#ty> = val.into();
                #call(&self.name, #i, &socket);
                self
            }
        });
    }

    (pins, setters)
}

fn output_bindings(decl: &NodeDecl, pool: &mut IdentPool) -> (Vec<TokenStream>, Vec<TokenStream>) {
    let mut defaults = Vec::new();
    let mut getters = Vec::new();

    for (i, socket) in decl.outputs.iter().enumerate() {
        let ty = rust_type(socket.kind);

        let default_method = format_ident!("{}", pool.claim(&socket.name, i, "default"));
        defaults.push(quote! {
            pub fn #default_method(self, val: impl Into<crate::core::types::NodeSocket<#ty>>) -> Self {
                let socket: crate::core::types::NodeSocket<#ty> = val.into();
                crate::core::context::update_output_default(&self.name, #i, &socket);
                self
            }
        });

        // Blender resolves socket names to the first match, so shared names
        // (e.g. the four "Value" outputs of Random Value) go by position.
        let shared = decl.outputs.iter().filter(|o| o.name == socket.name).count() > 1;
        let key = if shared {
            quote! { #i.to_string() }
        } else {
            let name = &socket.name;
            quote! { crate::core::types::python_string_literal(#name) }
        };

        let getter = format_ident!("{}", pool.claim(&socket.name, i, "out"));
        getters.push(quote! {
            pub fn #getter(&self) -> crate::core::types::NodeSocket<#ty> {
                crate::core::types::NodeSocket::new_output(format!("{}.outputs[{}]", self.name, #key))
            }
        });
    }

    (defaults, getters)
}

fn enum_property(
    node_id: &str,
    prop: &PropertyDecl,
    method: &syn::Ident,
) -> (TokenStream, TokenStream) {
    let enum_ident = format_ident!(
        "{}{}",
        node_id.to_pascal_case(),
        prop.identifier.to_pascal_case()
    );

    let mut pool = IdentPool::default();
    let mut variants = Vec::new();
    let mut arms = Vec::new();
    for (i, item) in prop.enum_items.iter().enumerate() {
        let mut variant = pool
            .claim(&item.identifier, i, "")
            .trim_start_matches('_')
            .to_pascal_case();
        if variant.is_empty() || variant.starts_with(|c: char| c.is_ascii_digit()) {
            variant = format!("Variant{}", variant);
        }
        let variant = format_ident!("{}", variant);
        let blender_id = &item.identifier;
        variants.push(quote! { #variant });
        arms.push(quote! { Self::#variant => #blender_id });
    }

    let definition = quote! {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum #enum_ident { #(#variants),* }

        impl #enum_ident {
            pub fn as_str(&self) -> &'static str {
                match self { #(#arms),* }
            }
        }

        impl std::fmt::Display for #enum_ident {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };

    let prop_id = &prop.identifier;
    let setter = quote! {
        pub fn #method(self, val: #enum_ident) -> Self {
            crate::core::context::update_property(
                &self.name,
                #prop_id,
                crate::core::types::python_string_literal(val.as_str()),
            );
            self
        }
    };

    (setter, definition)
}

fn property_bindings(
    node_id: &str,
    decl: &NodeDecl,
    pool: &mut IdentPool,
) -> (Vec<TokenStream>, Vec<TokenStream>) {
    let mut setters = Vec::new();
    let mut enums = Vec::new();

    for (i, prop) in decl.properties.iter().enumerate() {
        let method = format_ident!("{}", pool.claim(&prop.identifier, i, "with"));
        let prop_id = &prop.identifier;

        let setter = match prop.type_name.as_str() {
            "INT" => quote! {
                pub fn #method(self, val: i32) -> Self {
                    crate::core::context::update_property(&self.name, #prop_id, val.to_string());
                    self
                }
            },
            "FLOAT" => quote! {
                pub fn #method(self, val: f32) -> Self {
                    crate::core::context::update_property(&self.name, #prop_id, crate::core::types::fmt_f32(val));
                    self
                }
            },
            "BOOLEAN" => quote! {
                pub fn #method(self, val: bool) -> Self {
                    crate::core::context::update_property(&self.name, #prop_id, crate::core::types::python_bool(val));
                    self
                }
            },
            "ENUM" if !prop.enum_items.is_empty() => {
                let (setter, definition) = enum_property(node_id, prop, &method);
                enums.push(definition);
                setter
            }
            _ => quote! {
                pub fn #method(self, val: &str) -> Self {
                    crate::core::context::update_property(&self.name, #prop_id, crate::core::types::python_string_literal(val));
                    self
                }
            },
        };
        setters.push(setter);
    }

    (setters, enums)
}

fn node_struct(node_id: &str, decl: &NodeDecl) -> TokenStream {
    let struct_ident = format_ident!("{}", node_id.to_pascal_case());
    let struct_name = struct_ident.to_string();
    let bl_idname = &decl.bl_idname;

    let mut pool = IdentPool::default();
    let (pins, setters) = input_bindings(decl, &mut pool);
    let (defaults, getters) = output_bindings(decl, &mut pool);
    let (properties, enums) = property_bindings(node_id, decl, &mut pool);

    quote! {
        #(#enums)*

        #[derive(Clone, Debug)]
        pub struct #struct_ident { pub name: String }

        impl Default for #struct_ident {
            fn default() -> Self {
                Self::new()
            }
        }

        impl #struct_ident {
            pub const BL_IDNAME: &'static str = #bl_idname;
            #(#pins)*

            pub fn new() -> Self {
                let uid = uuid::Uuid::new_v4().simple().to_string();
                let name = format!("{}_{}", #struct_name, &uid[..12]);
                crate::core::context::add_node(crate::core::context::NodeData::new(
                    name.clone(),
                    Self::BL_IDNAME.to_string(),
                ));
                Self { name }
            }

            #(#setters)*
            #(#defaults)*
            #(#getters)*
            #(#properties)*

            pub fn set_input<T>(self, index: usize, val: crate::core::types::NodeSocket<T>) -> Self {
                crate::core::context::update_input(&self.name, index, &val);
                self
            }

            pub fn append_input<T>(self, index: usize, val: crate::core::types::NodeSocket<T>) -> Self {
                crate::core::context::append_input(&self.name, index, &val);
                self
            }
        }
    }
}

fn main() {
    println!("cargo:rerun-if-changed={}", CATALOG_PATH);

    let raw = fs::read_to_string(CATALOG_PATH)
        .unwrap_or_else(|e| panic!("failed to read {}: {}", CATALOG_PATH, e));
    let catalog: Catalog = serde_json::from_str(&raw)
        .unwrap_or_else(|e| panic!("failed to parse {}: {}", CATALOG_PATH, e));

    let mut nodes = BTreeMap::new();
    for (key, decl) in catalog
        .GeometryNodes
        .into_iter()
        .chain(catalog.CompositorNodes)
    {
        if nodes.insert(key.clone(), decl).is_some() {
            panic!("node '{}' is declared twice in {}", key, CATALOG_PATH);
        }
    }

    let mut seen = HashSet::new();
    let structs: Vec<_> = nodes
        .iter()
        .map(|(key, decl)| {
            if !seen.insert(key.to_pascal_case()) {
                panic!("node '{}' collides with another node after PascalCase", key);
            }
            node_struct(key, decl)
        })
        .collect();

    let out_dir = env::var_os("OUT_DIR").expect("OUT_DIR is set by cargo");
    let dest = Path::new(&out_dir).join("nodes.rs");
    fs::write(&dest, quote! { #(#structs)* }.to_string())
        .unwrap_or_else(|e| panic!("failed to write {}: {}", dest.display(), e));
}

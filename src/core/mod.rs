pub mod context;
pub mod live_link;
pub mod manifest;
pub mod ops;
pub mod session;
pub mod tree;
pub mod types;

/// Node bindings generated by `build.rs` from `blender_nodes.json`.
#[allow(clippy::all)]
pub mod nodes {
    include!(concat!(env!("OUT_DIR"), "/nodes.rs"));
}

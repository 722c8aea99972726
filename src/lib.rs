//! Procedural TBM tunnel lining and batch render driver for Blender.
//!
//! Geometry, cutter placement and render plans are computed here; the host
//! only receives the resulting Python script over the Live-Link.
pub mod config;
pub mod core;
pub mod error;
pub mod render;
pub mod tunnel;

pub use error::{Error, Result};

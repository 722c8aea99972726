//! Run configuration
//!
//! Every field has a default, so a config file only needs the values it
//! overrides.
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub live_link: LiveLinkConfig,
    pub tunnel: TunnelConfig,
    pub render: RenderConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_owned(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| Error::Json {
            path: path.to_owned(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.tunnel.validate()?;
        self.render.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveLinkConfig {
    /// `host:port` of the listener running inside Blender
    pub addr: String,
    pub connect_timeout_ms: u64,
}

impl Default for LiveLinkConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8080".to_string(),
            connect_timeout_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunnelConfig {
    pub geometry: GeometryConfig,
    pub segmentation: SegmentationConfig,
    pub bolt: BoltConfig,
    pub handle: HandleConfig,
    pub procedural: ProceduralConfig,
}

impl TunnelConfig {
    pub fn validate(&self) -> Result<()> {
        let g = &self.geometry;
        check(g.inner_radius > 0.0, "geometry.inner_radius must be positive")?;
        check(g.thickness > 0.0, "geometry.thickness must be positive")?;
        check(g.ring_length > 0.0, "geometry.ring_length must be positive")?;
        check(g.full_circle_res >= 1, "geometry.full_circle_res must be at least 1")?;

        let s = &self.segmentation;
        check(s.regular_count >= 1, "segmentation.regular_count must be at least 1")?;
        check(
            i32::try_from(s.regular_count).is_ok(),
            "segmentation.regular_count must fit a 32-bit socket",
        )?;
        check(
            s.key_angle_factor > 0.0,
            "segmentation.key_angle_factor must be positive",
        )?;

        check(self.bolt.radius > 0.0, "bolt.radius must be positive")?;
        check(self.bolt.vertices >= 3, "bolt.vertices must be at least 3")?;

        let p = &self.procedural;
        check(p.ring_count >= 0, "procedural.ring_count must not be negative")?;
        check(p.rot_jitter_deg >= 0.0, "procedural.rot_jitter_deg must not be negative")?;
        check(p.pos_jitter >= 0.0, "procedural.pos_jitter must not be negative")
    }
}

/// Cross-section and resolution of one ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub inner_radius: f64,
    pub thickness: f64,
    /// Length of one ring along the tunnel axis
    pub ring_length: f64,
    /// Angular steps a full circle would get
    pub full_circle_res: u32,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            inner_radius: 2.45,
            thickness: 0.30,
            ring_length: 1.5,
            full_circle_res: 128,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    pub regular_count: u32,
    /// Key segment angle as a fraction of the regular angle
    pub key_angle_factor: f64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            regular_count: 5,
            key_angle_factor: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoltConfig {
    /// Offset from the segment centre as a fraction of the half angle
    pub angle_frac: f64,
    pub radius: f64,
    /// Cutter depth as a fraction of the wall thickness
    pub depth_frac: f64,
    /// Axial offset as a fraction of the ring length
    pub axial_frac: f64,
    pub vertices: u32,
}

impl Default for BoltConfig {
    fn default() -> Self {
        Self {
            angle_frac: 0.0,
            radius: 0.10,
            depth_frac: 0.95,
            axial_frac: 0.15,
            vertices: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandleConfig {
    pub angle_frac: f64,
    /// Width as a fraction of the chord length
    pub width_tan: f64,
    /// Height as a fraction of the chord length
    pub height_tan: f64,
    pub depth_frac: f64,
    /// Twist around the surface normal
    pub diagonal_deg: f64,
    /// Distance from the ring edge as a fraction of the ring length
    pub from_edge_frac: f64,
    /// How far inside the inner radius the cutter centre sits, in depths
    pub radial_inset: f64,
}

impl Default for HandleConfig {
    fn default() -> Self {
        Self {
            angle_frac: 0.75,
            width_tan: 0.45,
            height_tan: 0.18,
            depth_frac: 0.30,
            diagonal_deg: 15.0,
            from_edge_frac: 0.18,
            radial_inset: 0.6,
        }
    }
}

/// Defaults written onto the node-graph interface and the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProceduralConfig {
    pub ring_count: i32,
    pub ring_spacing: f32,
    pub rot_jitter_deg: f32,
    pub pos_jitter: f32,
    pub seed: i32,
}

impl Default for ProceduralConfig {
    fn default() -> Self {
        Self {
            ring_count: 10,
            ring_spacing: 1.5,
            rot_jitter_deg: 40.0,
            pos_jitter: 0.01,
            seed: 27,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub samples: u32,
    /// Camera view name that renders with `preview_samples`
    pub preview_camera: String,
    pub preview_samples: u32,
    pub resolution: [u32; 2],
    pub camera_prefix: String,
    /// Cameras whose name contains this tag never render
    pub skip_tag: String,
    /// View layers starting with this prefix never render
    pub excluded_layer_prefix: String,
    pub output_root: String,
    /// Frame ends at or above this render as stills
    pub animation_frame_limit: i32,
    pub use_denoising: bool,
    pub use_adaptive_sampling: bool,
    pub mist_falloff: String,
    pub scratch_dir: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            samples: 4096,
            preview_camera: "0".to_string(),
            preview_samples: 4,
            resolution: [640, 400],
            camera_prefix: "Camera_".to_string(),
            skip_tag: "-noimp".to_string(),
            excluded_layer_prefix: "_".to_string(),
            output_root: "renders".to_string(),
            animation_frame_limit: 250,
            use_denoising: true,
            use_adaptive_sampling: false,
            mist_falloff: "LINEAR".to_string(),
            scratch_dir: "/tmp/".to_string(),
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<()> {
        check(self.samples >= 1, "render.samples must be at least 1")?;
        check(self.preview_samples >= 1, "render.preview_samples must be at least 1")?;
        check(
            self.resolution.iter().all(|&r| r > 0),
            "render.resolution must be positive",
        )?;
        check(
            ["NONE", "LINEAR", "QUADRATIC", "INVERSE_QUADRATIC"].contains(&self.mist_falloff.as_str()),
            "render.mist_falloff must be one of NONE, LINEAR, QUADRATIC, INVERSE_QUADRATIC",
        )
    }
}

fn check(ok: bool, msg: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(Error::InvalidConfig(msg.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: Config = serde_json::from_str(
            r#"{ "tunnel": { "segmentation": { "regular_count": 7 } }, "render": { "samples": 128 } }"#,
        )
        .unwrap();

        assert_eq!(config.tunnel.segmentation.regular_count, 7);
        assert_eq!(config.tunnel.segmentation.key_angle_factor, 0.6);
        assert_eq!(config.tunnel.geometry, GeometryConfig::default());
        assert_eq!(config.render.samples, 128);
        assert_eq!(config.render.preview_samples, 4);
        assert_eq!(config.live_link.addr, "127.0.0.1:8080");
    }

    #[test]
    fn test_rejects_degenerate_segmentation() {
        let mut config = Config::default();
        config.tunnel.segmentation.regular_count = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = Config::default();
        config.tunnel.segmentation.key_angle_factor = 0.0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = Config::default();
        config.tunnel.segmentation.regular_count = u32::MAX;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_unknown_mist_falloff() {
        let mut config = Config::default();
        config.render.mist_falloff = "CUBIC".to_string();
        assert!(config.validate().is_err());
    }
}

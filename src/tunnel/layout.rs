use crate::config::SegmentationConfig;

/// Angular partition of one ring into `regular_count` equal segments plus a
/// smaller key segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingLayout {
    pub regular_count: u32,
    pub regular_angle_deg: f64,
    pub key_angle_deg: f64,
}

impl RingLayout {
    /// Solves the regular angle so the ring closes exactly:
    /// `n * a + f * a = 360`.
    pub fn new(regular_count: u32, key_angle_factor: f64) -> Self {
        let regular_angle_deg = 360.0 / (f64::from(regular_count) + key_angle_factor);
        Self {
            regular_count,
            regular_angle_deg,
            key_angle_deg: regular_angle_deg * key_angle_factor,
        }
    }

    pub fn from_config(config: &SegmentationConfig) -> Self {
        Self::new(config.regular_count, config.key_angle_factor)
    }

    pub fn total_angle_deg(&self) -> f64 {
        f64::from(self.regular_count) * self.regular_angle_deg + self.key_angle_deg
    }

    /// Centre angle of regular segment `index` around the tunnel axis.
    pub fn regular_instance_angle_deg(&self, index: u32) -> f64 {
        (f64::from(index) + 0.5) * self.regular_angle_deg
    }

    pub fn regular_instance_angles_deg(&self) -> Vec<f64> {
        (0..self.regular_count)
            .map(|i| self.regular_instance_angle_deg(i))
            .collect()
    }

    /// Centre angle of the key segment, right after the last regular one.
    pub fn key_instance_angle_deg(&self) -> f64 {
        f64::from(self.regular_count) * self.regular_angle_deg + self.key_angle_deg / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_partition_closes_circle() {
        for n in 1..=12 {
            for factor in [0.05, 0.3, 0.6, 1.0, 1.7] {
                let layout = RingLayout::new(n, factor);
                assert!((layout.total_angle_deg() - 360.0).abs() < EPS, "n={n} f={factor}");
                assert!((layout.key_angle_deg - factor * layout.regular_angle_deg).abs() < EPS);
            }
        }
    }

    #[test]
    fn test_default_angles() {
        let layout = RingLayout::from_config(&SegmentationConfig::default());
        assert!((layout.regular_angle_deg - 360.0 / 5.6).abs() < EPS);
        assert!((layout.key_angle_deg - 0.6 * 360.0 / 5.6).abs() < EPS);
    }

    #[test]
    fn test_regular_instance_angles() {
        let layout = RingLayout::new(5, 0.6);
        let angles = layout.regular_instance_angles_deg();
        assert_eq!(angles.len(), 5);
        for (i, a) in angles.iter().enumerate() {
            assert!((a - (i as f64 + 0.5) * layout.regular_angle_deg).abs() < EPS);
        }
        assert!(angles.windows(2).all(|w| w[1] > w[0]));

        // each segment spans half an angle either side of its centre
        let start = angles[0] - layout.regular_angle_deg / 2.0;
        let end = angles[4] + layout.regular_angle_deg / 2.0;
        assert!(start.abs() < EPS);
        assert!((end - start - 5.0 * layout.regular_angle_deg).abs() < EPS);
    }

    #[test]
    fn test_key_segment_is_adjacent() {
        let layout = RingLayout::new(5, 0.6);
        let key = layout.key_instance_angle_deg();
        let last_regular_end = layout.regular_instance_angle_deg(4) + layout.regular_angle_deg / 2.0;

        assert!((key - (5.0 * layout.regular_angle_deg + layout.key_angle_deg / 2.0)).abs() < EPS);
        assert!((key - layout.key_angle_deg / 2.0 - last_regular_end).abs() < EPS);
        assert!((key + layout.key_angle_deg / 2.0 - 360.0).abs() < EPS);
    }
}

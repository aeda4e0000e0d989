//! Colormaps used by the figure: a diverging map for the surface and three
//! sequential maps that tell the planar projections apart.

use serde::{Deserialize, Serialize};

/// Moreland's diverging cool-to-warm map, sampled every 1/8.
const COOLWARM_ANCHORS: [[f32; 3]; 9] = [
    [0.230, 0.299, 0.754],
    [0.384, 0.510, 0.918],
    [0.553, 0.690, 0.996],
    [0.722, 0.816, 0.976],
    [0.865, 0.865, 0.865],
    [0.957, 0.769, 0.678],
    [0.957, 0.604, 0.482],
    [0.871, 0.376, 0.302],
    [0.706, 0.016, 0.150],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Colormap {
    Coolwarm,
    Winter,
    Summer,
    Autumn,
}

impl Colormap {
    pub fn name(self) -> &'static str {
        match self {
            Colormap::Coolwarm => "coolwarm",
            Colormap::Winter => "winter",
            Colormap::Summer => "summer",
            Colormap::Autumn => "autumn",
        }
    }

    /// RGB in [0, 1] for a scalar in [0, 1]. Out-of-range and NaN inputs
    /// are pinned to the nearest end.
    pub fn sample(self, t: f64) -> [f32; 3] {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) as f32 };
        match self {
            Colormap::Coolwarm => interpolate(&COOLWARM_ANCHORS, t),
            Colormap::Winter => [0.0, t, 1.0 - 0.5 * t],
            Colormap::Summer => [t, 0.5 + 0.5 * t, 0.4],
            Colormap::Autumn => [1.0, t, 0.0],
        }
    }

    pub fn rgba(self, t: f64, alpha: f32) -> [f32; 4] {
        let [r, g, b] = self.sample(t);
        [r, g, b, alpha]
    }
}

fn interpolate(anchors: &[[f32; 3]], t: f32) -> [f32; 3] {
    let segments = (anchors.len() - 1) as f32;
    let pos = t * segments;
    let idx = (pos.floor() as usize).min(anchors.len() - 2);
    let frac = pos - idx as f32;
    let a = anchors[idx];
    let b = anchors[idx + 1];
    [
        a[0] + (b[0] - a[0]) * frac,
        a[1] + (b[1] - a[1]) * frac,
        a[2] + (b[2] - a[2]) * frac,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-5)
    }

    #[test]
    fn test_coolwarm_endpoints_and_midpoint() {
        assert!(close(Colormap::Coolwarm.sample(0.0), COOLWARM_ANCHORS[0]));
        assert!(close(Colormap::Coolwarm.sample(0.5), COOLWARM_ANCHORS[4]));
        assert!(close(Colormap::Coolwarm.sample(1.0), COOLWARM_ANCHORS[8]));
        // blue end is blue, red end is red
        let cold = Colormap::Coolwarm.sample(0.0);
        let hot = Colormap::Coolwarm.sample(1.0);
        assert!(cold[2] > cold[0]);
        assert!(hot[0] > hot[2]);
    }

    #[test]
    fn test_sequential_maps() {
        assert!(close(Colormap::Winter.sample(0.0), [0.0, 0.0, 1.0]));
        assert!(close(Colormap::Winter.sample(1.0), [0.0, 1.0, 0.5]));
        assert!(close(Colormap::Summer.sample(0.0), [0.0, 0.5, 0.4]));
        assert!(close(Colormap::Summer.sample(1.0), [1.0, 1.0, 0.4]));
        assert!(close(Colormap::Autumn.sample(0.0), [1.0, 0.0, 0.0]));
        assert!(close(Colormap::Autumn.sample(1.0), [1.0, 1.0, 0.0]));
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(Colormap::Autumn.sample(-3.0), Colormap::Autumn.sample(0.0));
        assert_eq!(Colormap::Autumn.sample(9.0), Colormap::Autumn.sample(1.0));
        assert_eq!(Colormap::Coolwarm.sample(f64::NAN), Colormap::Coolwarm.sample(0.0));
        assert_eq!(Colormap::Coolwarm.rgba(0.5, 0.3)[3], 0.3);
    }

    #[test]
    fn test_names_match_serialized_form() {
        for map in [Colormap::Coolwarm, Colormap::Winter, Colormap::Summer, Colormap::Autumn] {
            let json = serde_json::to_value(map).unwrap();
            assert_eq!(json, map.name());
        }
    }
}

//! Presentation constants for a single evaluate-and-render cycle.

use serde::{Deserialize, Serialize};

use crate::error::HarmonicError;

pub const MIN_RESOLUTION: usize = 2;
pub const MAX_RESOLUTION: usize = 2000;
pub const MIN_IMAGE_SIZE: u32 = 64;
pub const MAX_IMAGE_SIZE: u32 = 4096;

/// Grid density, viewing box and drawing options.
///
/// Defaults reproduce the classic figure: a 200×200 angular mesh drawn
/// inside the fixed cube [-1, 1]³ with a translucent surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Number of samples over the polar angle θ ∈ [0, π].
    pub theta_resolution: usize,
    /// Number of samples over the azimuthal angle φ ∈ [0, 2π].
    pub phi_resolution: usize,
    /// Half-width of the cubic viewing box; also the projection plane offset.
    pub view_extent: f64,
    /// Contour lines drawn per planar projection.
    pub contour_levels: usize,
    /// Opacity of the 3-D surface.
    pub surface_alpha: f32,
    /// Side length of the rasterized figure in pixels.
    pub image_size: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            theta_resolution: 200,
            phi_resolution: 200,
            view_extent: 1.0,
            contour_levels: 8,
            surface_alpha: 0.3,
            image_size: 800,
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<(), HarmonicError> {
        for (name, value) in [
            ("theta_resolution", self.theta_resolution),
            ("phi_resolution", self.phi_resolution),
        ] {
            if !(MIN_RESOLUTION..=MAX_RESOLUTION).contains(&value) {
                return Err(HarmonicError::InvalidConfig(format!(
                    "{name} must be between {MIN_RESOLUTION} and {MAX_RESOLUTION}, got {value}"
                )));
            }
        }
        if !self.view_extent.is_finite() || self.view_extent <= 0.0 {
            return Err(HarmonicError::InvalidConfig(format!(
                "view_extent must be a positive number, got {}",
                self.view_extent
            )));
        }
        if !(0.0..=1.0).contains(&self.surface_alpha) {
            return Err(HarmonicError::InvalidConfig(format!(
                "surface_alpha must be within [0, 1], got {}",
                self.surface_alpha
            )));
        }
        if !(MIN_IMAGE_SIZE..=MAX_IMAGE_SIZE).contains(&self.image_size) {
            return Err(HarmonicError::InvalidConfig(format!(
                "image_size must be between {MIN_IMAGE_SIZE} and {MAX_IMAGE_SIZE}, got {}",
                self.image_size
            )));
        }
        Ok(())
    }

    /// Returns a copy with every field pulled into its accepted range.
    pub fn clamped(&self) -> Self {
        let defaults = Self::default();
        Self {
            theta_resolution: self.theta_resolution.clamp(MIN_RESOLUTION, MAX_RESOLUTION),
            phi_resolution: self.phi_resolution.clamp(MIN_RESOLUTION, MAX_RESOLUTION),
            view_extent: if self.view_extent.is_finite() && self.view_extent > 0.0 {
                self.view_extent
            } else {
                defaults.view_extent
            },
            contour_levels: self.contour_levels.min(64),
            surface_alpha: if self.surface_alpha.is_nan() {
                defaults.surface_alpha
            } else {
                self.surface_alpha.clamp(0.0, 1.0)
            },
            image_size: self.image_size.clamp(MIN_IMAGE_SIZE, MAX_IMAGE_SIZE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = RenderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.theta_resolution, 200);
        assert_eq!(config.phi_resolution, 200);
        assert_eq!(config.view_extent, 1.0);
    }

    #[test]
    fn test_rejects_bad_values() {
        let config = RenderConfig { theta_resolution: 1, ..Default::default() };
        assert!(matches!(config.validate(), Err(HarmonicError::InvalidConfig(_))));

        let config = RenderConfig { view_extent: 0.0, ..Default::default() };
        assert!(config.validate().is_err());

        let config = RenderConfig { view_extent: f64::NAN, ..Default::default() };
        assert!(config.validate().is_err());

        let config = RenderConfig { surface_alpha: 1.5, ..Default::default() };
        assert!(config.validate().is_err());

        let config = RenderConfig { image_size: 10, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_clamped_is_always_valid() {
        let config = RenderConfig {
            theta_resolution: 0,
            phi_resolution: 1_000_000,
            view_extent: -3.0,
            contour_levels: 500,
            surface_alpha: 7.0,
            image_size: 1,
        }
        .clamped();
        assert!(config.validate().is_ok());
        assert_eq!(config.theta_resolution, MIN_RESOLUTION);
        assert_eq!(config.phi_resolution, MAX_RESOLUTION);
        assert_eq!(config.view_extent, 1.0);
        assert_eq!(config.contour_levels, 64);
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: RenderConfig =
            serde_json::from_str(r#"{"theta_resolution": 50, "view_extent": 2.0}"#).unwrap();
        assert_eq!(config.theta_resolution, 50);
        assert_eq!(config.phi_resolution, 200);
        assert_eq!(config.view_extent, 2.0);
    }
}

//! Display resolution provider.

use crate::domain::ports::DisplayScalePort;

/// Default logical screen width in points.
pub const DEFAULT_WIDTH_POINTS: f64 = 390.0;

/// Default pixels per point.
pub const DEFAULT_SCALE: f64 = 3.0;

/// Display with a fixed width and pixel scale.
///
/// Images are prepared for the full screen width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedDisplayScale {
    width_points: f64,
    scale: f64,
}

impl FixedDisplayScale {
    /// Creates a display `width_points` wide at `scale` pixels per point.
    #[must_use]
    pub const fn new(width_points: f64, scale: f64) -> Self {
        Self {
            width_points,
            scale,
        }
    }

    /// Creates a display that is `pixels` wide at scale 1.
    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub const fn pixels(pixels: u32) -> Self {
        Self::new(pixels as f64, 1.0)
    }
}

impl Default for FixedDisplayScale {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH_POINTS, DEFAULT_SCALE)
    }
}

impl DisplayScalePort for FixedDisplayScale {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn max_dimension(&self) -> u32 {
        let pixels = (self.width_points * self.scale).round();
        if pixels.is_finite() && pixels >= 1.0 {
            pixels.min(f64::from(u32::MAX)) as u32
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_full_width_in_pixels() {
        assert_eq!(FixedDisplayScale::default().max_dimension(), 1170);
    }

    #[test]
    fn test_fractional_scale_rounds() {
        assert_eq!(FixedDisplayScale::new(375.0, 2.5).max_dimension(), 938);
    }

    #[test]
    fn test_degenerate_values_clamp_to_one() {
        assert_eq!(FixedDisplayScale::new(0.0, 3.0).max_dimension(), 1);
        assert_eq!(FixedDisplayScale::new(-10.0, 2.0).max_dimension(), 1);
        assert_eq!(FixedDisplayScale::new(f64::NAN, 2.0).max_dimension(), 1);
    }
}

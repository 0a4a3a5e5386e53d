//! Per-pixel color classification.
//!
//! A pixel belongs to the marker when its green channel is bright enough and
//! dominates both the red and the blue channel by a configurable ratio.

use crate::constants::{
    DEFAULT_GREEN_BLUE_RATIO, DEFAULT_GREEN_RED_RATIO, DEFAULT_MIN_GREEN, MAX_MIN_GREEN,
    MAX_RATIO_PERCENT,
};
use image::Rgb;
use serde::{Deserialize, Serialize};

/// Tunable parameters of the marker color test.
///
/// Ratios are percentages: `green_red_ratio = 200` means green must be more
/// than twice the red channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierParameters {
    /// Green must be strictly above this intensity
    pub min_green: u32,
    /// Minimum green/red ratio, in percent
    pub green_red_ratio: u32,
    /// Minimum green/blue ratio, in percent
    pub green_blue_ratio: u32,
}

impl Default for ClassifierParameters {
    fn default() -> Self {
        Self {
            min_green: DEFAULT_MIN_GREEN,
            green_red_ratio: DEFAULT_GREEN_RED_RATIO,
            green_blue_ratio: DEFAULT_GREEN_BLUE_RATIO,
        }
    }
}

impl ClassifierParameters {
    /// Create a parameter set
    #[must_use]
    pub const fn new(min_green: u32, green_red_ratio: u32, green_blue_ratio: u32) -> Self {
        Self {
            min_green,
            green_red_ratio,
            green_blue_ratio,
        }
    }

    /// Clamp every value into the range the trackbars can express
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            min_green: self.min_green.min(MAX_MIN_GREEN),
            green_red_ratio: self.green_red_ratio.min(MAX_RATIO_PERCENT),
            green_blue_ratio: self.green_blue_ratio.min(MAX_RATIO_PERCENT),
        }
    }

    /// Test a single pixel against the marker color
    #[inline]
    #[must_use]
    pub fn matches(&self, pixel: &Rgb<u8>) -> bool {
        let [r, g, b] = pixel.0;
        is_marker_color(r, g, b, self)
    }
}

/// Returns true when `(r, g, b)` passes all three marker tests.
///
/// `g / r > ratio / 100` is evaluated as `g * 100 > ratio * r`, which is
/// exact for integers. A zero red or blue channel fails its ratio test.
#[inline]
#[must_use]
pub fn is_marker_color(r: u8, g: u8, b: u8, params: &ClassifierParameters) -> bool {
    let (r, g, b) = (u64::from(r), u64::from(g), u64::from(b));

    if g <= u64::from(params.min_green) {
        return false;
    }
    if r == 0 || b == 0 {
        return false;
    }

    g * 100 > u64::from(params.green_red_ratio) * r && g * 100 > u64::from(params.green_blue_ratio) * b
}

/// Ratio `g * 100 / denominator` as shown by the pixel inspector, 0 when undefined
#[must_use]
pub fn ratio_percent(g: u8, denominator: u8) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        f64::from(g) / f64::from(denominator) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parameters() {
        let params = ClassifierParameters::default();
        assert_eq!(params, ClassifierParameters::new(100, 200, 200));
    }

    #[test]
    fn test_bright_green_matches() {
        let params = ClassifierParameters::default();
        assert!(is_marker_color(10, 101, 10, &params));
        assert!(params.matches(&Rgb([10, 101, 10])));
    }

    #[test]
    fn test_zero_denominator_never_matches() {
        let params = ClassifierParameters::new(0, 0, 0);
        for g in [1u8, 50, 255] {
            for other in [0u8, 1, 128, 255] {
                assert!(!is_marker_color(0, g, other, &params));
                assert!(!is_marker_color(other, g, 0, &params));
            }
        }
    }

    #[test]
    fn test_green_threshold_is_strict() {
        let params = ClassifierParameters::default();
        assert!(!is_marker_color(10, 100, 10, &params));
        assert!(is_marker_color(10, 101, 10, &params));
    }

    #[test]
    fn test_ratio_thresholds_are_strict() {
        let params = ClassifierParameters::new(0, 200, 200);
        // 200 / 100 is exactly 2.0, not above it
        assert!(!is_marker_color(100, 200, 10, &params));
        assert!(!is_marker_color(10, 200, 100, &params));
        assert!(is_marker_color(99, 200, 99, &params));
    }

    #[test]
    fn test_clamped() {
        let params = ClassifierParameters::new(1000, 900, 42).clamped();
        assert_eq!(params, ClassifierParameters::new(255, 500, 42));
    }

    #[test]
    fn test_ratio_percent() {
        assert_eq!(ratio_percent(50, 0), 0.0);
        assert!((ratio_percent(50, 10) - 500.0).abs() < 1e-9);
    }
}

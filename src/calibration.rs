//! Calibration of the classifier from a reference patch.
//!
//! The user holds the marker inside the central square of the frame and
//! requests a calibration. Every parameter becomes the mean of the matching
//! quantity over that square.

use crate::{
    classifier::ClassifierParameters,
    constants::CALIBRATION_RADIUS_DIVISOR,
    error::{AppError, Result},
    segmentation::Region,
};
use image::RgbImage;
use log::{info, warn};

/// Outcome of one calibration pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationReport {
    /// Parameters to use from the next frame on
    pub params: ClassifierParameters,
    /// Pixels inside the reference region
    pub sampled: u64,
    /// Pixels that contributed to the green/red ratio
    pub red_samples: u64,
    /// Pixels that contributed to the green/blue ratio
    pub blue_samples: u64,
}

/// Derives classifier parameters from the central square of a frame
#[derive(Debug, Clone, Copy)]
pub struct Calibrator {
    radius_divisor: u32,
}

impl Default for Calibrator {
    fn default() -> Self {
        Self::new(CALIBRATION_RADIUS_DIVISOR)
    }
}

impl Calibrator {
    /// The reference square has half side `height / radius_divisor`
    #[must_use]
    pub const fn new(radius_divisor: u32) -> Self {
        Self { radius_divisor }
    }

    /// Half side of the reference square for a frame of the given height
    #[must_use]
    pub const fn radius(&self, height: u32) -> u32 {
        if self.radius_divisor == 0 {
            0
        } else {
            height / self.radius_divisor
        }
    }

    /// Central square sampled on a `width x height` frame
    #[must_use]
    pub fn reference_region(&self, width: u32, height: u32) -> Region {
        let radius = self.radius(height);
        let (cx, cy) = (width / 2, height / 2);
        Region {
            x_min: cx.saturating_sub(radius),
            y_min: cy.saturating_sub(radius),
            x_max: (cx + radius).min(width),
            y_max: (cy + radius).min(height),
        }
    }

    /// Compute new parameters from `frame`.
    ///
    /// A ratio whose denominator channel is zero on every sampled pixel keeps
    /// its value from `current`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Calibration`] when the reference region is empty.
    #[allow(clippy::cast_possible_truncation)] // Means of u8-derived values fit in u32
    pub fn calibrate(&self, frame: &RgbImage, current: &ClassifierParameters) -> Result<CalibrationReport> {
        let region = self.reference_region(frame.width(), frame.height());
        if region.is_empty() {
            return Err(AppError::Calibration(format!(
                "reference region is empty for a {}x{} frame",
                frame.width(),
                frame.height()
            )));
        }

        let mut green_sum = 0u64;
        let mut sampled = 0u64;
        let mut red_ratio_sum = 0u64;
        let mut red_samples = 0u64;
        let mut blue_ratio_sum = 0u64;
        let mut blue_samples = 0u64;

        for y in region.y_min..region.y_max {
            for x in region.x_min..region.x_max {
                let [r, g, b] = frame.get_pixel(x, y).0;
                let (r, g, b) = (u64::from(r), u64::from(g), u64::from(b));

                green_sum += g;
                sampled += 1;

                if r != 0 {
                    red_ratio_sum += g * 100 / r;
                    red_samples += 1;
                }
                if b != 0 {
                    blue_ratio_sum += g * 100 / b;
                    blue_samples += 1;
                }
            }
        }

        let mut params = *current;
        params.min_green = (green_sum / sampled) as u32;

        if red_samples > 0 {
            params.green_red_ratio = (red_ratio_sum / red_samples) as u32;
        } else {
            warn!("No pixel with a non-zero red channel, keeping green/red ratio");
        }
        if blue_samples > 0 {
            params.green_blue_ratio = (blue_ratio_sum / blue_samples) as u32;
        } else {
            warn!("No pixel with a non-zero blue channel, keeping green/blue ratio");
        }

        info!(
            "Calibrated over {} pixels: green > {}, g/r > {}%, g/b > {}%",
            sampled, params.min_green, params.green_red_ratio, params.green_blue_ratio
        );

        Ok(CalibrationReport {
            params,
            sampled,
            red_samples,
            blue_samples,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_reference_region_default_frame() {
        let region = Calibrator::default().reference_region(640, 480);
        assert_eq!(
            region,
            Region {
                x_min: 280,
                y_min: 200,
                x_max: 360,
                y_max: 280
            }
        );
    }

    #[test]
    fn test_uniform_region() {
        let frame = RgbImage::from_pixel(640, 480, Rgb([10, 50, 10]));
        let report = Calibrator::default()
            .calibrate(&frame, &ClassifierParameters::default())
            .unwrap();

        assert_eq!(report.params, ClassifierParameters::new(50, 500, 500));
        assert_eq!(report.sampled, 80 * 80);
        assert_eq!(report.red_samples, report.sampled);
    }

    #[test]
    fn test_zero_channels_are_excluded_from_ratios() {
        let mut frame = RgbImage::from_pixel(120, 120, Rgb([10, 60, 20]));
        // Left half of the region has no red at all
        let region = Calibrator::default().reference_region(120, 120);
        for y in region.y_min..region.y_max {
            for x in region.x_min..region.x_min + region.width() / 2 {
                frame.put_pixel(x, y, Rgb([0, 60, 20]));
            }
        }

        let report = Calibrator::default()
            .calibrate(&frame, &ClassifierParameters::default())
            .unwrap();

        assert_eq!(report.red_samples, report.sampled / 2);
        assert_eq!(report.params.green_red_ratio, 600);
        assert_eq!(report.params.green_blue_ratio, 300);
        assert_eq!(report.params.min_green, 60);
    }

    #[test]
    fn test_degenerate_region_keeps_ratios() {
        let frame = RgbImage::from_pixel(64, 48, Rgb([0, 120, 0]));
        let current = ClassifierParameters::new(10, 321, 123);

        let report = Calibrator::default().calibrate(&frame, &current).unwrap();

        assert_eq!(report.params, ClassifierParameters::new(120, 321, 123));
        assert_eq!(report.red_samples, 0);
        assert_eq!(report.blue_samples, 0);
    }

    #[test]
    fn test_empty_region_is_an_error() {
        let frame = RgbImage::from_pixel(20, 5, Rgb([10, 50, 10]));
        let result = Calibrator::default().calibrate(&frame, &ClassifierParameters::default());
        assert!(matches!(result, Err(AppError::Calibration(_))));
    }
}

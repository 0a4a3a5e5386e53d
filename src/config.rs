//! Configuration management for the marker trigger application

use crate::{
    classifier::ClassifierParameters,
    constants::{
        CALIBRATION_RADIUS_DIVISOR, DEFAULT_SEARCH_RADIUS, DEFAULT_TRIGGER_DELAY_SECS, DEFAULT_TRIGGER_KEY,
        FRAME_HEIGHT, FRAME_WIDTH, MAX_MIN_GREEN, MAX_RATIO_PERCENT,
    },
    trigger::keysym_from_name,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Frame acquisition configuration
    pub frame: FrameConfig,

    /// Initial classifier parameters
    pub classifier: ClassifierParameters,

    /// Segmentation configuration
    pub segmentation: SegmentationConfig,

    /// Calibration configuration
    pub calibration: CalibrationConfig,

    /// Trigger configuration
    pub trigger: TriggerConfig,

    /// Display configuration
    pub display: DisplayConfig,
}

/// Frame acquisition parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Frame width in pixels
    pub width: u32,

    /// Frame height in pixels
    pub height: u32,

    /// Mirror frames horizontally
    pub mirror: bool,
}

/// Segmentation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Half side of the search window around the last centroid
    pub search_radius: u32,

    /// Paint matched pixels in the displayed frame
    pub highlight_matches: bool,
}

/// Calibration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Reference square half side is `height / radius_divisor`
    pub radius_divisor: u32,
}

/// Trigger parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Minimum seconds between two triggers
    pub delay_secs: f64,

    /// Key sent on every trigger (X11 keysym name or single character)
    pub key: String,

    /// Inject key presses (false only logs triggers)
    pub inject_keys: bool,
}

/// Display configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Window title
    pub window_title: String,

    /// Run without any window
    pub headless: bool,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            width: FRAME_WIDTH,
            height: FRAME_HEIGHT,
            mirror: true,
        }
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            search_radius: DEFAULT_SEARCH_RADIUS,
            highlight_matches: true,
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            radius_divisor: CALIBRATION_RADIUS_DIVISOR,
        }
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            delay_secs: DEFAULT_TRIGGER_DELAY_SECS,
            key: DEFAULT_TRIGGER_KEY.to_string(),
            inject_keys: true,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            window_title: "Slideshow".to_string(),
            headless: false,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.frame.width == 0 || self.frame.height == 0 {
            return Err(Error::ConfigError("Frame size must be non-zero".to_string()));
        }

        if self.classifier.min_green > MAX_MIN_GREEN {
            return Err(Error::ConfigError(format!(
                "Green threshold must be between 0 and {MAX_MIN_GREEN}"
            )));
        }
        if self.classifier.green_red_ratio > MAX_RATIO_PERCENT
            || self.classifier.green_blue_ratio > MAX_RATIO_PERCENT
        {
            return Err(Error::ConfigError(format!(
                "Ratio percentages must be between 0 and {MAX_RATIO_PERCENT}"
            )));
        }

        if self.segmentation.search_radius == 0 {
            return Err(Error::ConfigError(
                "Search radius must be greater than 0".to_string(),
            ));
        }

        if self.calibration.radius_divisor == 0 {
            return Err(Error::ConfigError(
                "Calibration radius divisor must be greater than 0".to_string(),
            ));
        }
        if self.frame.height / self.calibration.radius_divisor == 0 {
            return Err(Error::ConfigError(
                "Calibration region is empty for this frame height".to_string(),
            ));
        }

        if !self.trigger.delay_secs.is_finite() || self.trigger.delay_secs < 0.0 {
            return Err(Error::ConfigError(
                "Trigger delay must be a non-negative number of seconds".to_string(),
            ));
        }
        if keysym_from_name(&self.trigger.key).is_none() {
            return Err(Error::ConfigError(format!("Unknown trigger key: {}", self.trigger.key)));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Marker Trigger Configuration

# Frame acquisition
frame:
  width: 640
  height: 480
  mirror: true

# Initial color parameters (ratios in percent)
classifier:
  min_green: 100
  green_red_ratio: 200
  green_blue_ratio: 200

# Segmentation
segmentation:
  search_radius: 160
  highlight_matches: true

# Calibration square half side = height / radius_divisor
calibration:
  radius_divisor: 12

# Trigger
trigger:
  delay_secs: 2.0
  key: "space"
  inject_keys: true

# Display
display:
  window_title: "Slideshow"
  headless: false
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.frame.width, 640);
        assert_eq!(config.frame.height, 480);
        assert_eq!(config.classifier, ClassifierParameters::new(100, 200, 200));
        assert_eq!(config.trigger.delay_secs, 2.0);
    }

    #[test]
    fn test_example_config_parses() {
        let config: Config = serde_yaml::from_str(EXAMPLE_CONFIG).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.segmentation.search_radius, 160);
        assert_eq!(config.trigger.key, "space");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_yaml::from_str("trigger:\n  delay_secs: 0.5\n").unwrap();
        assert_eq!(config.trigger.delay_secs, 0.5);
        assert_eq!(config.trigger.key, "space");
        assert_eq!(config.frame.width, 640);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.segmentation.search_radius = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.classifier.green_red_ratio = 501;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.trigger.delay_secs = -1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.trigger.key = "NoSuchKey".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.calibration.radius_divisor = 0;
        assert!(config.validate().is_err());
    }
}

//! Constants used throughout the application

/// Frame width requested from the camera, in pixels
pub const FRAME_WIDTH: u32 = 640;

/// Frame height requested from the camera, in pixels
pub const FRAME_HEIGHT: u32 = 480;

/// Minimum number of seconds between two triggers
pub const DEFAULT_TRIGGER_DELAY_SECS: f64 = 2.0;

/// Default classifier parameters
pub const DEFAULT_MIN_GREEN: u32 = 100;
pub const DEFAULT_GREEN_RED_RATIO: u32 = 200;
pub const DEFAULT_GREEN_BLUE_RATIO: u32 = 200;

/// Upper bounds of the parameter trackbars
pub const MAX_MIN_GREEN: u32 = 255;
pub const MAX_RATIO_PERCENT: u32 = 500;

/// Half side of the search window around the last centroid
pub const DEFAULT_SEARCH_RADIUS: u32 = 160;

/// The calibration square has half side `height / CALIBRATION_RADIUS_DIVISOR`
pub const CALIBRATION_RADIUS_DIVISOR: u32 = 12;

/// Color painted over matched pixels; non-zero red and blue keep it a match
pub const HIGHLIGHT_COLOR: [u8; 3] = [1, 255, 1];

/// Key pressed on every trigger
pub const DEFAULT_TRIGGER_KEY: &str = "space";

/// Bounded wait for keyboard input in the GUI, in milliseconds
pub const INPUT_POLL_MS: i32 = 5;

/// Key codes returned by the GUI key poll
pub const KEY_ENTER: i32 = 10;
pub const KEY_RETURN: i32 = 13;
pub const KEY_ESCAPE: i32 = 27;

/// Height of the top and bottom banners drawn over the frame
pub const BANNER_HEIGHT: i32 = 25;

/// Frames between two throughput log lines
pub const STATS_INTERVAL_FRAMES: u64 = 30;

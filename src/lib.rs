//! Colored marker detection that turns each presentation into a key press.
//!
//! The library watches a video stream for a marker of a given color (a green
//! card by default) and fires one trigger every time the marker is shown to
//! the camera, e.g. to advance presentation slides hands-free.
//!
//! The per-frame pipeline consists of:
//! 1. Optional calibration of the color test from the center of the frame
//! 2. Segmentation of the marker inside a search window
//! 3. Presence tracking, which debounces detections into triggers
//!
//! # Examples
//!
//! ## Detecting a marker
//!
//! ```
//! use marker_trigger::{classifier::ClassifierParameters, segmentation::{scan, Region}};
//! use image::{Rgb, RgbImage};
//!
//! let mut frame = RgbImage::from_pixel(64, 48, Rgb([60, 60, 60]));
//! frame.put_pixel(10, 20, Rgb([10, 200, 10]));
//!
//! let detection = scan(&frame, Region::full(64, 48), &ClassifierParameters::default());
//! assert_eq!(detection.map(|d| d.centroid), Some((10, 20)));
//! ```
//!
//! ## Debouncing triggers
//!
//! ```
//! use marker_trigger::presence::PresenceTracker;
//! use marker_trigger::segmentation::{BoundingBox, MarkerDetection};
//! use std::time::{Duration, Instant};
//!
//! let mut tracker = PresenceTracker::new(Duration::from_secs(2));
//! let marker = Some(MarkerDetection {
//!     centroid: (12, 12),
//!     bbox: BoundingBox { top: 10, bottom: 14, left: 10, right: 14 },
//!     pixel_count: 25,
//! });
//!
//! let start = Instant::now();
//! assert!(tracker.update(&marker, start).is_some());
//! // Still visible: no second trigger
//! assert!(tracker.update(&marker, start + Duration::from_secs(5)).is_none());
//! ```
//!
//! ## Complete pipeline
//!
//! ```no_run
//! use marker_trigger::{
//!     app::MarkerTriggerApp,
//!     config::Config,
//!     frontend::HeadlessFrontend,
//!     source::ImageSequenceSource,
//!     trigger::LogSink,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let source = ImageSequenceSource::from_dir("frames", 640, 480, false)?;
//! let mut app = MarkerTriggerApp::new(
//!     &config,
//!     Box::new(source),
//!     Box::new(LogSink),
//!     Box::new(HeadlessFrontend::default()),
//! );
//! let summary = app.run()?;
//! println!("{} triggers", summary.triggers);
//! # Ok(())
//! # }
//! ```

/// Per-pixel marker color test
pub mod classifier;

/// Calibration of the color test from a reference patch
pub mod calibration;

/// Marker localization with a moving search window
pub mod segmentation;

/// Presence tracking and trigger debouncing
pub mod presence;

/// Per-frame detection pipeline
pub mod pipeline;

/// Frame sources (image sequences, camera)
pub mod source;

/// Trigger sinks, including X11 key injection
pub mod trigger;

/// Display, commands and live parameter UI
pub mod frontend;

/// Main application module
pub mod app;

/// Error types and result handling
pub mod error;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};

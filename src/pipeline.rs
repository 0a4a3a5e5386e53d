//! Per-frame detection pipeline.
//!
//! Ties together calibration, segmentation and presence tracking. The
//! pipeline owns the active classifier parameters; calibration and the UI
//! replace them between frames.

use crate::{
    calibration::{CalibrationReport, Calibrator},
    classifier::ClassifierParameters,
    config::Config,
    error::Result,
    presence::{PresenceTracker, TriggerEvent},
    segmentation::{FrameSegmenter, SearchWindow, SegmentationResult},
};
use image::RgbImage;
use log::{debug, info};
use std::time::{Duration, Instant};

/// Everything the pipeline learned from one frame
#[derive(Debug, Clone)]
pub struct FrameReport {
    /// Window that was scanned
    pub window: SearchWindow,
    /// Marker found on the frame, if any
    pub detection: SegmentationResult,
    /// Trigger fired on this frame, if any
    pub trigger: Option<TriggerEvent>,
    /// Calibration run before segmenting this frame, if any
    pub calibration: Option<CalibrationReport>,
    /// Whether triggers are suppressed after this frame
    pub suppressed: bool,
    /// Total triggers so far
    pub trigger_count: u64,
}

/// Detection and triggering state for one video stream
#[derive(Debug, Clone)]
pub struct MarkerPipeline {
    params: ClassifierParameters,
    calibrator: Calibrator,
    segmenter: FrameSegmenter,
    tracker: PresenceTracker,
    calibration_armed: bool,
}

impl MarkerPipeline {
    /// Create a pipeline from explicit components
    #[must_use]
    pub const fn new(
        params: ClassifierParameters,
        calibrator: Calibrator,
        segmenter: FrameSegmenter,
        tracker: PresenceTracker,
    ) -> Self {
        Self {
            params,
            calibrator,
            segmenter,
            tracker,
            calibration_armed: true,
        }
    }

    /// Create a pipeline from the application configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.classifier.clamped(),
            Calibrator::new(config.calibration.radius_divisor),
            FrameSegmenter::new(config.segmentation.search_radius, config.segmentation.highlight_matches),
            PresenceTracker::new(Duration::from_secs_f64(config.trigger.delay_secs)),
        )
    }

    /// Process one frame captured at `now`.
    ///
    /// When `calibrate` is set and calibration is still armed, the frame is
    /// sampled first and the new parameters apply to this very frame.
    ///
    /// # Errors
    ///
    /// Returns an error if a requested calibration cannot sample the frame.
    pub fn process(&mut self, frame: &mut RgbImage, now: Instant, calibrate: bool) -> Result<FrameReport> {
        let calibration = if calibrate { self.calibrate(frame)? } else { None };

        let window = self.segmenter.search_window(frame.width(), frame.height());
        let detection = self.segmenter.segment(frame, &self.params);
        let trigger = self.tracker.update(&detection, now);

        Ok(FrameReport {
            window,
            detection,
            trigger,
            calibration,
            suppressed: self.tracker.is_suppressed(),
            trigger_count: self.tracker.trigger_count(),
        })
    }

    /// Calibrate from `frame` if calibration is still armed
    ///
    /// # Errors
    ///
    /// Returns an error if the reference region does not fit in the frame.
    pub fn calibrate(&mut self, frame: &RgbImage) -> Result<Option<CalibrationReport>> {
        if !self.calibration_armed {
            debug!("Calibration already done, ignoring request");
            return Ok(None);
        }

        let report = self.calibrator.calibrate(frame, &self.params)?;
        self.params = report.params;
        self.calibration_armed = false;
        Ok(Some(report))
    }

    /// Replace the classifier parameters, e.g. from the UI.
    ///
    /// Values are clamped to the trackbar range. Calibration may produce
    /// ratios above that range; they stay active until the next call here,
    /// which replaces all three values with their clamped form.
    pub fn set_params(&mut self, params: ClassifierParameters) {
        let params = params.clamped();
        if params != self.params {
            info!(
                "Parameters set to green > {}, g/r > {}%, g/b > {}%",
                params.min_green, params.green_red_ratio, params.green_blue_ratio
            );
            self.params = params;
        }
    }

    /// Active classifier parameters
    #[must_use]
    pub const fn params(&self) -> ClassifierParameters {
        self.params
    }

    /// Whether a calibration request would still be honored
    #[must_use]
    pub const fn calibration_armed(&self) -> bool {
        self.calibration_armed
    }

    /// Calibrator used by this pipeline
    #[must_use]
    pub const fn calibrator(&self) -> &Calibrator {
        &self.calibrator
    }

    /// Presence tracker state
    #[must_use]
    pub const fn tracker(&self) -> &PresenceTracker {
        &self.tracker
    }
}

//! Main application module: the frame-driven detection loop.

use crate::{
    config::Config,
    constants::STATS_INTERVAL_FRAMES,
    error::Result,
    frontend::{Command, Frontend, Overlay},
    pipeline::{FrameReport, MarkerPipeline},
    source::FrameSource,
    trigger::TriggerSink,
};
use log::{info, warn};
use std::time::{Duration, Instant};

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The frame source has no more frames
    EndOfStream,
    /// The user asked to quit
    Quit,
}

/// Summary of a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Frames processed
    pub frames: u64,
    /// Triggers fired
    pub triggers: u64,
    /// Why the loop ended
    pub stop_reason: StopReason,
}

/// Marker trigger application: source, pipeline, sink and frontend
pub struct MarkerTriggerApp {
    source: Box<dyn FrameSource>,
    pipeline: MarkerPipeline,
    sink: Box<dyn TriggerSink>,
    frontend: Box<dyn Frontend>,
    frame_count: u64,
    processing_time: Duration,
}

impl MarkerTriggerApp {
    /// Assemble the application from its collaborators
    pub fn new(
        config: &Config,
        source: Box<dyn FrameSource>,
        sink: Box<dyn TriggerSink>,
        frontend: Box<dyn Frontend>,
    ) -> Self {
        info!("Initializing marker trigger application");
        info!(
            "Frames {}x{}, trigger delay {:.1}s, sink {}",
            config.frame.width,
            config.frame.height,
            config.trigger.delay_secs,
            sink.name()
        );

        Self {
            source,
            pipeline: MarkerPipeline::from_config(config),
            sink,
            frontend,
            frame_count: 0,
            processing_time: Duration::ZERO,
        }
    }

    /// Run until the source ends or the user quits
    pub fn run(&mut self) -> Result<RunSummary> {
        info!("Starting main application loop");
        let initial = self.pipeline.params();
        self.frontend.show_parameters(&initial)?;

        let mut calibrate_requested = false;
        let stop_reason = loop {
            let Some(mut frame) = self.source.next_frame()? else {
                info!("End of stream reached");
                break StopReason::EndOfStream;
            };

            if let Some(params) = self.frontend.poll_parameters()? {
                self.pipeline.set_params(params);
            }

            let start = Instant::now();
            let report = self.process(&mut frame, start, calibrate_requested)?;
            calibrate_requested = false;
            self.processing_time += start.elapsed();

            if let Some(calibration) = &report.calibration {
                self.frontend.show_parameters(&calibration.params)?;
            }

            let overlay = Overlay {
                marker: report.detection.map(|d| d.bbox),
                suppressed: report.suppressed,
                trigger_count: report.trigger_count,
                calibration_region: self
                    .pipeline
                    .calibration_armed()
                    .then(|| self.pipeline.calibrator().reference_region(frame.width(), frame.height())),
            };
            self.frontend.render(&frame, &overlay)?;

            match self.frontend.poll_command()? {
                Command::None => {}
                Command::Calibrate => calibrate_requested = true,
                Command::Quit => {
                    info!("Exit requested by user");
                    break StopReason::Quit;
                }
            }
        };

        let summary = RunSummary {
            frames: self.frame_count,
            triggers: self.pipeline.tracker().trigger_count(),
            stop_reason,
        };
        info!(
            "Application shutting down after {} frames and {} triggers",
            summary.frames, summary.triggers
        );
        Ok(summary)
    }

    /// Process one frame and forward its trigger to the sink
    fn process(&mut self, frame: &mut image::RgbImage, now: Instant, calibrate: bool) -> Result<FrameReport> {
        let report = match self.pipeline.process(frame, now, calibrate) {
            Ok(report) => report,
            Err(e) if calibrate => {
                warn!("Calibration failed: {}", e);
                self.pipeline.process(frame, now, false)?
            }
            Err(e) => return Err(e),
        };

        if let Some(event) = &report.trigger {
            if let Err(e) = self.sink.emit(event) {
                warn!("Failed to deliver trigger #{}: {}", event.sequence, e);
            }
        }

        self.frame_count += 1;
        if self.frame_count % STATS_INTERVAL_FRAMES == 0 {
            #[allow(clippy::cast_precision_loss)]
            let avg_ms = self.processing_time.as_secs_f64() * 1000.0 / self.frame_count as f64;
            info!(
                "Frame {}: processing={:.2}ms, window {}x{}, triggers={}",
                self.frame_count,
                avg_ms,
                report.window.width(),
                report.window.height(),
                report.trigger_count
            );
        }

        Ok(report)
    }

    /// Detection pipeline state
    #[must_use]
    pub const fn pipeline(&self) -> &MarkerPipeline {
        &self.pipeline
    }
}

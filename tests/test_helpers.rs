//! Helper functions and utilities for tests
#![allow(dead_code)]

use image::{Rgb, RgbImage};
use marker_trigger::{
    error::Result,
    frontend::{Command, Frontend, Overlay},
    classifier::ClassifierParameters,
    presence::TriggerEvent,
    source::FrameSource,
    trigger::TriggerSink,
};
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

/// Pixel that matches the default classifier parameters
pub const MARKER: Rgb<u8> = Rgb([20, 200, 30]);

/// Pixel that never matches the default classifier parameters
pub const BACKGROUND: Rgb<u8> = Rgb([80, 90, 100]);

/// Create a background-only frame
pub fn blank_frame(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, BACKGROUND)
}

/// Create a frame with a square marker whose top-left corner is `(x, y)`
pub fn frame_with_marker(width: u32, height: u32, x: u32, y: u32, side: u32) -> RgbImage {
    let mut frame = blank_frame(width, height);
    for py in y..(y + side).min(height) {
        for px in x..(x + side).min(width) {
            frame.put_pixel(px, py, MARKER);
        }
    }
    frame
}

/// Frame source replaying a fixed list of frames
pub struct ScriptedSource {
    frames: VecDeque<RgbImage>,
    resolution: (u32, u32),
}

impl ScriptedSource {
    pub fn new(frames: Vec<RgbImage>) -> Self {
        let resolution = frames.first().map_or((0, 0), RgbImage::dimensions);
        Self {
            frames: frames.into(),
            resolution,
        }
    }
}

impl FrameSource for ScriptedSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        Ok(self.frames.pop_front())
    }

    fn resolution(&self) -> (u32, u32) {
        self.resolution
    }
}

/// Trigger sink recording every event it receives
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub events: Arc<Mutex<Vec<TriggerEvent>>>,
}

impl TriggerSink for RecordingSink {
    fn emit(&mut self, event: &TriggerEvent) -> Result<()> {
        self.events.lock().unwrap().push(*event);
        Ok(())
    }

    fn name(&self) -> &str {
        "RecordingSink"
    }
}

/// Frontend replaying commands and parameter changes, recording overlays
#[derive(Clone, Default)]
pub struct ScriptedFrontend {
    pub commands: Arc<Mutex<VecDeque<Command>>>,
    pub parameters: Arc<Mutex<VecDeque<Option<ClassifierParameters>>>>,
    pub overlays: Arc<Mutex<Vec<Overlay>>>,
    pub shown: Arc<Mutex<Vec<ClassifierParameters>>>,
}

impl ScriptedFrontend {
    pub fn with_commands(commands: Vec<Command>) -> Self {
        let frontend = Self::default();
        frontend.commands.lock().unwrap().extend(commands);
        frontend
    }
}

impl Frontend for ScriptedFrontend {
    fn render(&mut self, _frame: &RgbImage, overlay: &Overlay) -> Result<()> {
        self.overlays.lock().unwrap().push(overlay.clone());
        Ok(())
    }

    fn poll_command(&mut self) -> Result<Command> {
        Ok(self.commands.lock().unwrap().pop_front().unwrap_or(Command::None))
    }

    fn poll_parameters(&mut self) -> Result<Option<ClassifierParameters>> {
        Ok(self.parameters.lock().unwrap().pop_front().flatten())
    }

    fn show_parameters(&mut self, params: &ClassifierParameters) -> Result<()> {
        self.shown.lock().unwrap().push(*params);
        Ok(())
    }
}

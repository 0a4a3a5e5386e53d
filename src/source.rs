//! Frame sources feeding the detection loop.

use crate::error::{AppError, Result};
use image::{imageops, RgbImage};
use log::{debug, info};
use std::path::{Path, PathBuf};

/// Blocking supplier of RGB frames
pub trait FrameSource {
    /// Next frame, or `None` once the stream has ended
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;

    /// Size of the frames produced, `(width, height)`
    fn resolution(&self) -> (u32, u32);
}

/// Resize `frame` to `width x height` if needed and optionally mirror it
#[must_use]
pub fn prepare_frame(frame: RgbImage, width: u32, height: u32, mirror: bool) -> RgbImage {
    let mut frame = if frame.dimensions() == (width, height) {
        frame
    } else {
        imageops::resize(&frame, width, height, imageops::FilterType::Triangle)
    };
    if mirror {
        imageops::flip_horizontal_in_place(&mut frame);
    }
    frame
}

/// Frames read from a directory of image files, in file name order
#[derive(Debug)]
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    next: usize,
    width: u32,
    height: u32,
    mirror: bool,
}

impl ImageSequenceSource {
    /// Collect every PNG, JPEG or BMP file in `dir`
    pub fn from_dir<P: AsRef<Path>>(dir: P, width: u32, height: u32, mirror: bool) -> Result<Self> {
        let dir = dir.as_ref();
        info!("Reading frames from {}", dir.display());

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let supported = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(str::to_ascii_lowercase)
                .is_some_and(|ext| matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "bmp"));
            if supported {
                paths.push(path);
            }
        }
        paths.sort();

        if paths.is_empty() {
            return Err(AppError::FrameSource(format!(
                "No image files found in {}",
                dir.display()
            )));
        }
        info!("Found {} frames", paths.len());

        Ok(Self::from_paths(paths, width, height, mirror))
    }

    /// Use an explicit list of image files
    #[must_use]
    pub const fn from_paths(paths: Vec<PathBuf>, width: u32, height: u32, mirror: bool) -> Self {
        Self {
            paths,
            next: 0,
            width,
            height,
            mirror,
        }
    }

    /// Number of frames not yet returned
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.paths.len().saturating_sub(self.next)
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        let Some(path) = self.paths.get(self.next) else {
            return Ok(None);
        };
        self.next += 1;

        debug!("Loading frame {}", path.display());
        let frame = image::open(path)?.to_rgb8();
        Ok(Some(prepare_frame(frame, self.width, self.height, self.mirror)))
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(feature = "gui")]
pub use camera::CameraSource;

#[cfg(feature = "gui")]
mod camera {
    use super::{prepare_frame, FrameSource};
    use crate::{
        error::{AppError, Result},
        frontend::mat_to_rgb_image,
    };
    use image::RgbImage;
    use log::{info, warn};
    use opencv::{
        core::Mat,
        prelude::*,
        videoio::{self, VideoCapture, CAP_PROP_BUFFERSIZE, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH},
    };

    /// Webcam frames captured through `OpenCV`
    pub struct CameraSource {
        capture: VideoCapture,
        width: u32,
        height: u32,
        mirror: bool,
    }

    impl CameraSource {
        /// Open camera `index` and request `width x height` frames
        pub fn new(index: i32, width: u32, height: u32, mirror: bool) -> Result<Self> {
            info!("Opening camera {} at {}x{}", index, width, height);

            let mut capture = VideoCapture::new(index, videoio::CAP_ANY)?;
            if !capture.is_opened()? {
                return Err(AppError::FrameSource(format!("Could not open camera {index}")));
            }

            capture.set(CAP_PROP_FRAME_WIDTH, f64::from(width))?;
            capture.set(CAP_PROP_FRAME_HEIGHT, f64::from(height))?;
            // Reduce buffer size for lower latency
            if !capture.set(CAP_PROP_BUFFERSIZE, 1.0)? {
                warn!("Camera ignored the buffer size request");
            }

            Ok(Self {
                capture,
                width,
                height,
                mirror,
            })
        }
    }

    impl FrameSource for CameraSource {
        fn next_frame(&mut self) -> Result<Option<RgbImage>> {
            let mut mat = Mat::default();
            if !self.capture.read(&mut mat)? || mat.empty() {
                return Ok(None);
            }

            let frame = mat_to_rgb_image(&mat)?;
            Ok(Some(prepare_frame(frame, self.width, self.height, self.mirror)))
        }

        fn resolution(&self) -> (u32, u32) {
            (self.width, self.height)
        }
    }
}

//! User-facing side of the loop: display, commands and live parameters.
//!
//! The headless frontend is always available. The `OpenCV` HighGUI window
//! with trackbars, pixel inspector and banners needs the `gui` feature.

use crate::{
    classifier::{ratio_percent, ClassifierParameters},
    error::Result,
    segmentation::{BoundingBox, Region},
};
use image::RgbImage;
use log::debug;
use std::collections::VecDeque;

/// User command polled once per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Nothing requested
    None,
    /// Calibrate from the current frame
    Calibrate,
    /// Leave the loop after this frame
    Quit,
}

/// What to draw over the current frame
#[derive(Debug, Clone)]
pub struct Overlay {
    /// Marker extents on this frame
    pub marker: Option<BoundingBox>,
    /// Whether triggers are suppressed
    pub suppressed: bool,
    /// Triggers fired so far
    pub trigger_count: u64,
    /// Calibration square, shown while calibration is still pending
    pub calibration_region: Option<Region>,
}

/// Display, command input and parameter UI
pub trait Frontend {
    /// Show the processed frame with its overlay
    fn render(&mut self, frame: &RgbImage, overlay: &Overlay) -> Result<()>;

    /// Poll the user for a command, waiting at most a few milliseconds
    fn poll_command(&mut self) -> Result<Command>;

    /// Parameters changed by the user since the last poll
    fn poll_parameters(&mut self) -> Result<Option<ClassifierParameters>>;

    /// Reflect parameters set elsewhere, e.g. by calibration
    fn show_parameters(&mut self, params: &ClassifierParameters) -> Result<()>;
}

/// Text describing the pixel at `(x, y)`, or `None` outside the frame
#[must_use]
pub fn pixel_info(frame: &RgbImage, x: u32, y: u32) -> Option<String> {
    if x >= frame.width() || y >= frame.height() {
        return None;
    }
    let [r, g, b] = frame.get_pixel(x, y).0;
    Some(format!(
        "xy({x}, {y}) rgb({r}, {g}, {b})  g/r = {:.0}  g/b = {:.0}",
        ratio_percent(g, r),
        ratio_percent(g, b)
    ))
}

/// Frontend without a window; commands come from a script
#[derive(Debug, Default)]
pub struct HeadlessFrontend {
    commands: VecDeque<Command>,
}

impl HeadlessFrontend {
    /// Create a frontend that issues `commands`, one per frame, then nothing
    #[must_use]
    pub fn new(commands: impl IntoIterator<Item = Command>) -> Self {
        Self {
            commands: commands.into_iter().collect(),
        }
    }
}

impl Frontend for HeadlessFrontend {
    fn render(&mut self, _frame: &RgbImage, overlay: &Overlay) -> Result<()> {
        if let Some(bbox) = overlay.marker {
            debug!(
                "Marker box ({}, {})-({}, {}), suppressed={}",
                bbox.left, bbox.top, bbox.right, bbox.bottom, overlay.suppressed
            );
        }
        Ok(())
    }

    fn poll_command(&mut self) -> Result<Command> {
        Ok(self.commands.pop_front().unwrap_or(Command::None))
    }

    fn poll_parameters(&mut self) -> Result<Option<ClassifierParameters>> {
        Ok(None)
    }

    fn show_parameters(&mut self, _params: &ClassifierParameters) -> Result<()> {
        Ok(())
    }
}

#[cfg(feature = "gui")]
pub use highgui_frontend::{mat_to_rgb_image, rgb_image_to_mat, HighGuiFrontend};

#[cfg(feature = "gui")]
mod highgui_frontend {
    use super::{pixel_info, Command, Frontend, Overlay};
    use crate::{
        classifier::ClassifierParameters,
        constants::{BANNER_HEIGHT, INPUT_POLL_MS, KEY_ENTER, KEY_ESCAPE, KEY_RETURN, MAX_MIN_GREEN, MAX_RATIO_PERCENT},
        error::{AppError, Result},
        presence::trigger_banner,
    };
    use image::RgbImage;
    use log::{info, warn};
    use opencv::{
        core::{Mat, Point, Rect, Scalar, CV_8UC3},
        highgui::{self, EVENT_MOUSEMOVE, WINDOW_AUTOSIZE},
        imgproc::{self, FONT_HERSHEY_SIMPLEX, FONT_HERSHEY_TRIPLEX, LINE_8},
        prelude::*,
    };
    use std::sync::{Arc, Mutex};

    const TRACKBAR_GREEN: &str = "Green threshold";
    const TRACKBAR_RED: &str = "Green/Red percentage";
    const TRACKBAR_BLUE: &str = "Green/Blue percentage";
    const HELP_TEXT: &str = "Move the mouse over the picture to see informations about the single pixels";

    fn white() -> Scalar {
        Scalar::new(255.0, 255.0, 255.0, 0.0)
    }

    /// Convert a BGR `Mat` into an RGB image
    pub fn mat_to_rgb_image(mat: &Mat) -> Result<RgbImage> {
        if mat.typ() != CV_8UC3 {
            return Err(AppError::InvalidInput(format!("Expected an 8-bit BGR frame, got type {}", mat.typ())));
        }
        let width = u32::try_from(mat.cols()).map_err(|_| AppError::InvalidInput("Negative frame width".to_string()))?;
        let height = u32::try_from(mat.rows()).map_err(|_| AppError::InvalidInput("Negative frame height".to_string()))?;

        let owned;
        let mat = if mat.is_continuous() {
            mat
        } else {
            owned = mat.try_clone()?;
            &owned
        };

        let bytes = mat.data_bytes()?;
        let mut rgb = Vec::with_capacity(bytes.len());
        for bgr in bytes.chunks_exact(3) {
            rgb.extend_from_slice(&[bgr[2], bgr[1], bgr[0]]);
        }

        RgbImage::from_raw(width, height, rgb)
            .ok_or_else(|| AppError::InvalidInput("Frame buffer size mismatch".to_string()))
    }

    /// Convert an RGB image into a BGR `Mat`
    pub fn rgb_image_to_mat(image: &RgbImage) -> Result<Mat> {
        let rows = i32::try_from(image.height()).map_err(|_| AppError::InvalidInput("Frame too tall".to_string()))?;
        let cols = i32::try_from(image.width()).map_err(|_| AppError::InvalidInput("Frame too wide".to_string()))?;

        let mut mat = Mat::new_rows_cols_with_default(rows, cols, CV_8UC3, Scalar::all(0.0))?;
        let bytes = mat.data_bytes_mut()?;
        for (bgr, pixel) in bytes.chunks_exact_mut(3).zip(image.pixels()) {
            let [r, g, b] = pixel.0;
            bgr.copy_from_slice(&[b, g, r]);
        }
        Ok(mat)
    }

    fn to_i32(value: u32) -> i32 {
        i32::try_from(value).unwrap_or(i32::MAX)
    }

    /// HighGUI window with parameter trackbars and overlays
    pub struct HighGuiFrontend {
        title: String,
        mouse: Arc<Mutex<Option<(i32, i32)>>>,
        shown: ClassifierParameters,
    }

    impl HighGuiFrontend {
        /// Create the window and its trackbars
        pub fn new(title: &str, params: &ClassifierParameters) -> Result<Self> {
            info!("Creating window '{}'", title);
            highgui::named_window(title, WINDOW_AUTOSIZE)?;

            highgui::create_trackbar(TRACKBAR_GREEN, title, None, to_i32(MAX_MIN_GREEN), None)?;
            highgui::create_trackbar(TRACKBAR_RED, title, None, to_i32(MAX_RATIO_PERCENT), None)?;
            highgui::create_trackbar(TRACKBAR_BLUE, title, None, to_i32(MAX_RATIO_PERCENT), None)?;

            let mouse = Arc::new(Mutex::new(None));
            let mouse_writer = Arc::clone(&mouse);
            highgui::set_mouse_callback(
                title,
                Some(Box::new(move |event, x, y, _flags| {
                    if event == EVENT_MOUSEMOVE {
                        if let Ok(mut position) = mouse_writer.lock() {
                            *position = Some((x, y));
                        }
                    }
                })),
            )?;

            let mut frontend = Self {
                title: title.to_string(),
                mouse,
                shown: *params,
            };
            frontend.show_parameters(params)?;
            Ok(frontend)
        }

        fn mouse_position(&self) -> Option<(u32, u32)> {
            let position = *self.mouse.lock().ok()?;
            let (x, y) = position?;
            Some((u32::try_from(x).ok()?, u32::try_from(y).ok()?))
        }

        fn draw_calibration_target(mat: &mut Mat, center: Point, radius: i32) -> Result<()> {
            let reach = radius + radius / 5;
            imgproc::circle(mat, center, radius, white(), 2, LINE_8, 0)?;
            imgproc::line(
                mat,
                Point::new(center.x - reach, center.y),
                Point::new(center.x + reach, center.y),
                white(),
                2,
                LINE_8,
                0,
            )?;
            imgproc::line(
                mat,
                Point::new(center.x, center.y - reach),
                Point::new(center.x, center.y + reach),
                white(),
                2,
                LINE_8,
                0,
            )?;
            imgproc::put_text(
                mat,
                "Press ENTER for calibration",
                Point::new(center.x - 220, center.y + radius * 3),
                FONT_HERSHEY_TRIPLEX,
                1.0,
                white(),
                1,
                LINE_8,
                false,
            )?;
            Ok(())
        }
    }

    impl Frontend for HighGuiFrontend {
        fn render(&mut self, frame: &RgbImage, overlay: &Overlay) -> Result<()> {
            let mut mat = rgb_image_to_mat(frame)?;
            let width = mat.cols();
            let height = mat.rows();

            let banner_color = if overlay.suppressed {
                Scalar::new(0.0, 0.0, 255.0, 0.0)
            } else {
                Scalar::all(0.0)
            };

            if overlay.suppressed {
                if let Some(bbox) = overlay.marker {
                    imgproc::rectangle(
                        &mut mat,
                        Rect::new(
                            to_i32(bbox.left),
                            to_i32(bbox.top),
                            to_i32(bbox.width()),
                            to_i32(bbox.height()),
                        ),
                        white(),
                        3,
                        LINE_8,
                        0,
                    )?;
                }
            }

            let top_text = self
                .mouse_position()
                .and_then(|(x, y)| pixel_info(frame, x, y))
                .unwrap_or_else(|| HELP_TEXT.to_string());
            imgproc::rectangle(&mut mat, Rect::new(0, 0, width, BANNER_HEIGHT), banner_color, -1, LINE_8, 0)?;
            imgproc::put_text(&mut mat, &top_text, Point::new(5, 15), FONT_HERSHEY_SIMPLEX, 0.4, white(), 1, LINE_8, false)?;

            imgproc::rectangle(
                &mut mat,
                Rect::new(0, height - BANNER_HEIGHT, width, BANNER_HEIGHT),
                banner_color,
                -1,
                LINE_8,
                0,
            )?;
            imgproc::put_text(
                &mut mat,
                &trigger_banner(overlay.trigger_count),
                Point::new(5, height - 10),
                FONT_HERSHEY_SIMPLEX,
                0.4,
                white(),
                1,
                LINE_8,
                false,
            )?;

            if let Some(region) = overlay.calibration_region {
                let center = Point::new(to_i32((region.x_min + region.x_max) / 2), to_i32((region.y_min + region.y_max) / 2));
                Self::draw_calibration_target(&mut mat, center, to_i32(region.height() / 2))?;
            }

            highgui::imshow(&self.title, &mat)?;
            Ok(())
        }

        fn poll_command(&mut self) -> Result<Command> {
            let key = highgui::wait_key(INPUT_POLL_MS)? & 0xFF;
            Ok(match key {
                KEY_ENTER | KEY_RETURN => Command::Calibrate,
                KEY_ESCAPE => Command::Quit,
                _ => Command::None,
            })
        }

        fn poll_parameters(&mut self) -> Result<Option<ClassifierParameters>> {
            let read = |name: &str| -> Result<u32> {
                let position = highgui::get_trackbar_pos(name, &self.title)?;
                Ok(u32::try_from(position).unwrap_or(0))
            };
            let current = ClassifierParameters::new(read(TRACKBAR_GREEN)?, read(TRACKBAR_RED)?, read(TRACKBAR_BLUE)?);

            if current == self.shown {
                return Ok(None);
            }
            self.shown = current;
            Ok(Some(current))
        }

        fn show_parameters(&mut self, params: &ClassifierParameters) -> Result<()> {
            let clamped = params.clamped();
            if clamped != *params {
                warn!(
                    "Parameters green > {}, g/r > {}%, g/b > {}% exceed the trackbar range; \
                     the next trackbar edit applies {}/{}/{}",
                    params.min_green,
                    params.green_red_ratio,
                    params.green_blue_ratio,
                    clamped.min_green,
                    clamped.green_red_ratio,
                    clamped.green_blue_ratio
                );
            }
            let params = clamped;
            highgui::set_trackbar_pos(TRACKBAR_GREEN, &self.title, to_i32(params.min_green))?;
            highgui::set_trackbar_pos(TRACKBAR_RED, &self.title, to_i32(params.green_red_ratio))?;
            highgui::set_trackbar_pos(TRACKBAR_BLUE, &self.title, to_i32(params.green_blue_ratio))?;
            self.shown = params;
            Ok(())
        }
    }

    impl Drop for HighGuiFrontend {
        fn drop(&mut self) {
            let _ = highgui::destroy_window(&self.title);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_pixel_info() {
        let mut frame = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        frame.put_pixel(1, 2, Rgb([10, 50, 0]));

        let text = pixel_info(&frame, 1, 2).unwrap();
        assert_eq!(text, "xy(1, 2) rgb(10, 50, 0)  g/r = 500  g/b = 0");
        assert!(pixel_info(&frame, 4, 0).is_none());
    }

    #[test]
    fn test_headless_commands_are_consumed_in_order() {
        let mut frontend = HeadlessFrontend::new([Command::Calibrate, Command::Quit]);
        assert_eq!(frontend.poll_command().unwrap(), Command::Calibrate);
        assert_eq!(frontend.poll_command().unwrap(), Command::Quit);
        assert_eq!(frontend.poll_command().unwrap(), Command::None);
        assert!(frontend.poll_parameters().unwrap().is_none());
    }
}

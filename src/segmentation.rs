//! Marker localization within a frame.
//!
//! The segmenter classifies every pixel of a search window, then reports the
//! centroid and bounding box of the matched pixels. Once the marker has been
//! found, the next frame only scans a window around the last centroid.

use crate::{classifier::ClassifierParameters, constants::HIGHLIGHT_COLOR};
use image::{Rgb, RgbImage};
use log::debug;

/// Axis-aligned pixel region `[x_min, x_max) x [y_min, y_max)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// First column (inclusive)
    pub x_min: u32,
    /// First row (inclusive)
    pub y_min: u32,
    /// Last column (exclusive)
    pub x_max: u32,
    /// Last row (exclusive)
    pub y_max: u32,
}

/// Region scanned by the segmenter on a given frame
pub type SearchWindow = Region;

impl Region {
    /// Region covering a whole `width x height` frame
    #[must_use]
    pub const fn full(width: u32, height: u32) -> Self {
        Self {
            x_min: 0,
            y_min: 0,
            x_max: width,
            y_max: height,
        }
    }

    /// Square of half side `radius` around `center`, clipped to the frame
    #[must_use]
    pub fn around(center: (u32, u32), radius: u32, width: u32, height: u32) -> Self {
        let (cx, cy) = center;
        Self {
            x_min: cx.saturating_sub(radius).min(width),
            y_min: cy.saturating_sub(radius).min(height),
            x_max: cx.saturating_add(radius).min(width),
            y_max: cy.saturating_add(radius).min(height),
        }
    }

    /// Region width in pixels
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.x_max.saturating_sub(self.x_min)
    }

    /// Region height in pixels
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.y_max.saturating_sub(self.y_min)
    }

    /// Number of pixels in the region
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Whether the region contains no pixel
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.area() == 0
    }

    /// Whether the region fits inside a `width x height` frame
    #[must_use]
    pub const fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x_max <= width && self.y_max <= height
    }
}

/// Inclusive extents of the matched pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    /// Smallest matched row
    pub top: u32,
    /// Largest matched row
    pub bottom: u32,
    /// Smallest matched column
    pub left: u32,
    /// Largest matched column
    pub right: u32,
}

impl BoundingBox {
    fn at(x: u32, y: u32) -> Self {
        Self {
            top: y,
            bottom: y,
            left: x,
            right: x,
        }
    }

    fn include(&mut self, x: u32, y: u32) {
        self.top = self.top.min(y);
        self.bottom = self.bottom.max(y);
        self.left = self.left.min(x);
        self.right = self.right.max(x);
    }

    /// Top-left corner as `(x, y)`
    #[must_use]
    pub const fn top_left(&self) -> (u32, u32) {
        (self.left, self.top)
    }

    /// Box width, counting both edge columns
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.right - self.left + 1
    }

    /// Box height, counting both edge rows
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.bottom - self.top + 1
    }
}

/// Marker found on one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerDetection {
    /// Mean position of the matched pixels, `(x, y)`
    pub centroid: (u32, u32),
    /// Extents of the matched pixels
    pub bbox: BoundingBox,
    /// Number of matched pixels
    pub pixel_count: u64,
}

/// Outcome of segmenting one frame: `None` when no pixel matched
pub type SegmentationResult = Option<MarkerDetection>;

/// Running sums over the matched pixels
#[derive(Default)]
struct Accumulator {
    sum_x: u64,
    sum_y: u64,
    count: u64,
    bbox: Option<BoundingBox>,
}

impl Accumulator {
    fn add(&mut self, x: u32, y: u32) {
        self.sum_x += u64::from(x);
        self.sum_y += u64::from(y);
        self.count += 1;
        match &mut self.bbox {
            Some(bbox) => bbox.include(x, y),
            None => self.bbox = Some(BoundingBox::at(x, y)),
        }
    }

    #[allow(clippy::cast_possible_truncation)] // Means of u32 coordinates fit in u32
    fn finish(self) -> SegmentationResult {
        let bbox = self.bbox?;
        Some(MarkerDetection {
            centroid: ((self.sum_x / self.count) as u32, (self.sum_y / self.count) as u32),
            bbox,
            pixel_count: self.count,
        })
    }
}

/// Scan `window` of `frame` without modifying it
#[must_use]
pub fn scan(frame: &RgbImage, window: SearchWindow, params: &ClassifierParameters) -> SegmentationResult {
    let window = clip(window, frame.width(), frame.height());
    let mut acc = Accumulator::default();

    for y in window.y_min..window.y_max {
        for x in window.x_min..window.x_max {
            if params.matches(frame.get_pixel(x, y)) {
                acc.add(x, y);
            }
        }
    }

    acc.finish()
}

/// Scan `window` of `frame`, painting every matched pixel with the highlight color
pub fn scan_and_highlight(
    frame: &mut RgbImage,
    window: SearchWindow,
    params: &ClassifierParameters,
) -> SegmentationResult {
    let window = clip(window, frame.width(), frame.height());
    let mut acc = Accumulator::default();

    for y in window.y_min..window.y_max {
        for x in window.x_min..window.x_max {
            let pixel = frame.get_pixel_mut(x, y);
            if params.matches(pixel) {
                *pixel = Rgb(HIGHLIGHT_COLOR);
                acc.add(x, y);
            }
        }
    }

    acc.finish()
}

fn clip(window: SearchWindow, width: u32, height: u32) -> SearchWindow {
    Region {
        x_min: window.x_min.min(width),
        y_min: window.y_min.min(height),
        x_max: window.x_max.min(width),
        y_max: window.y_max.min(height),
    }
}

/// Stateful segmenter that narrows its search around the last centroid
#[derive(Debug, Clone)]
pub struct FrameSegmenter {
    search_radius: u32,
    highlight: bool,
    last_centroid: Option<(u32, u32)>,
}

impl FrameSegmenter {
    /// Create a segmenter scanning `search_radius` pixels around the last centroid.
    ///
    /// A radius of 0 is raised to 1 so the window always contains the centroid.
    #[must_use]
    pub const fn new(search_radius: u32, highlight: bool) -> Self {
        Self {
            search_radius: if search_radius == 0 { 1 } else { search_radius },
            highlight,
            last_centroid: None,
        }
    }

    /// Window that the next call to [`segment`](Self::segment) will scan
    #[must_use]
    pub fn search_window(&self, width: u32, height: u32) -> SearchWindow {
        match self.last_centroid {
            Some(center) if center.0 < width && center.1 < height => {
                Region::around(center, self.search_radius, width, height)
            }
            _ => Region::full(width, height),
        }
    }

    /// Segment one frame and update the search window for the next one
    pub fn segment(&mut self, frame: &mut RgbImage, params: &ClassifierParameters) -> SegmentationResult {
        let window = self.search_window(frame.width(), frame.height());

        let result = if self.highlight {
            scan_and_highlight(frame, window, params)
        } else {
            scan(frame, window, params)
        };

        match &result {
            Some(detection) => {
                debug!(
                    "Marker at ({}, {}), {} pixels, window {}x{}",
                    detection.centroid.0,
                    detection.centroid.1,
                    detection.pixel_count,
                    window.width(),
                    window.height()
                );
                self.last_centroid = Some(detection.centroid);
            }
            None => {
                if self.last_centroid.is_some() {
                    debug!("Marker lost, scanning full frame next");
                }
                self.last_centroid = None;
            }
        }

        result
    }

    /// Centroid that anchors the next search window, if any
    #[must_use]
    pub const fn last_centroid(&self) -> Option<(u32, u32)> {
        self.last_centroid
    }

    /// Enable or disable painting of matched pixels
    pub fn set_highlight(&mut self, highlight: bool) {
        self.highlight = highlight;
    }

    /// Forget the last centroid so the next frame is scanned in full
    pub fn reset(&mut self) {
        self.last_centroid = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MAX_RATIO_PERCENT;

    const GREEN: Rgb<u8> = Rgb([10, 200, 10]);
    const BACKGROUND: Rgb<u8> = Rgb([90, 90, 90]);

    fn blank(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, BACKGROUND)
    }

    #[test]
    fn test_region_around_is_clipped() {
        let window = Region::around((5, 478), 20, 640, 480);
        assert_eq!(
            window,
            Region {
                x_min: 0,
                y_min: 458,
                x_max: 25,
                y_max: 480
            }
        );
        assert!(window.fits_within(640, 480));
    }

    #[test]
    fn test_region_around_far_corner() {
        let window = Region::around((639, 0), 1000, 640, 480);
        assert_eq!(window, Region::full(640, 480));
    }

    #[test]
    fn test_empty_frame_is_absent() {
        let mut frame = blank(32, 24);
        let mut segmenter = FrameSegmenter::new(8, true);
        assert!(segmenter.segment(&mut frame, &ClassifierParameters::default()).is_none());
        assert_eq!(segmenter.search_window(32, 24), Region::full(32, 24));
    }

    #[test]
    fn test_single_pixel() {
        let mut frame = blank(32, 24);
        frame.put_pixel(7, 11, GREEN);

        let detection = scan(&frame, Region::full(32, 24), &ClassifierParameters::default())
            .expect("pixel should be detected");

        assert_eq!(detection.centroid, (7, 11));
        assert_eq!(
            detection.bbox,
            BoundingBox {
                top: 11,
                bottom: 11,
                left: 7,
                right: 7
            }
        );
        assert_eq!(detection.pixel_count, 1);
    }

    #[test]
    fn test_block_centroid_and_bbox() {
        let mut frame = blank(40, 30);
        for y in 10..14 {
            for x in 20..26 {
                frame.put_pixel(x, y, GREEN);
            }
        }

        let detection = scan(&frame, Region::full(40, 30), &ClassifierParameters::default()).unwrap();
        // Integer means of 20..=25 and 10..=13
        assert_eq!(detection.centroid, (22, 11));
        assert_eq!(detection.bbox.top_left(), (20, 10));
        assert_eq!((detection.bbox.width(), detection.bbox.height()), (6, 4));
        assert_eq!(detection.pixel_count, 24);
    }

    #[test]
    fn test_window_narrows_after_detection() {
        let mut frame = blank(100, 100);
        frame.put_pixel(50, 50, GREEN);

        let mut segmenter = FrameSegmenter::new(10, false);
        segmenter.segment(&mut frame, &ClassifierParameters::default()).unwrap();

        let window = segmenter.search_window(100, 100);
        assert_eq!(
            window,
            Region {
                x_min: 40,
                y_min: 40,
                x_max: 60,
                y_max: 60
            }
        );
    }

    #[test]
    fn test_pixels_outside_window_are_ignored() {
        let mut frame = blank(100, 100);
        frame.put_pixel(50, 50, GREEN);
        let mut segmenter = FrameSegmenter::new(10, false);
        segmenter.segment(&mut frame, &ClassifierParameters::default());

        let mut next = blank(100, 100);
        next.put_pixel(90, 90, GREEN);
        assert!(segmenter.segment(&mut next, &ClassifierParameters::default()).is_none());
        // Lost, so the far pixel is found on the following full scan
        let detection = segmenter.segment(&mut next, &ClassifierParameters::default()).unwrap();
        assert_eq!(detection.centroid, (90, 90));
    }

    #[test]
    fn test_highlight_paints_matches_only() {
        let mut frame = blank(10, 10);
        frame.put_pixel(3, 4, Rgb([20, 180, 30]));

        let mut segmenter = FrameSegmenter::new(5, true);
        segmenter.segment(&mut frame, &ClassifierParameters::default());

        assert_eq!(*frame.get_pixel(3, 4), Rgb(HIGHLIGHT_COLOR));
        assert_eq!(*frame.get_pixel(0, 0), BACKGROUND);
    }

    #[test]
    fn test_highlight_is_idempotent() {
        let mut frame = blank(10, 10);
        frame.put_pixel(3, 4, GREEN);
        let params = ClassifierParameters::default();

        let first = scan_and_highlight(&mut frame, Region::full(10, 10), &params);
        let snapshot = frame.clone();
        let second = scan_and_highlight(&mut frame, Region::full(10, 10), &params);

        assert_eq!(first, second);
        assert_eq!(frame, snapshot);
    }

    #[test]
    fn test_highlight_color_still_matches() {
        let [r, g, b] = HIGHLIGHT_COLOR;
        assert!(ClassifierParameters::default().matches(&Rgb([r, g, b])));
        assert!(ClassifierParameters::new(0, MAX_RATIO_PERCENT, MAX_RATIO_PERCENT).matches(&Rgb([r, g, b])));
    }

    #[test]
    fn test_zero_radius_keeps_stationary_marker() {
        let mut segmenter = FrameSegmenter::new(0, false);
        let params = ClassifierParameters::default();
        let mut frame = blank(20, 20);
        frame.put_pixel(5, 5, GREEN);

        for _ in 0..4 {
            let mut copy = frame.clone();
            let detection = segmenter.segment(&mut copy, &params);
            assert_eq!(detection.map(|d| d.centroid), Some((5, 5)));
        }
        assert!(segmenter.search_window(20, 20).area() > 0);
    }

    #[test]
    fn test_resized_frame_falls_back_to_full_scan() {
        let mut segmenter = FrameSegmenter::new(10, false);
        let mut frame = blank(200, 200);
        frame.put_pixel(150, 150, GREEN);
        segmenter.segment(&mut frame, &ClassifierParameters::default());

        assert_eq!(segmenter.search_window(100, 100), Region::full(100, 100));
    }
}

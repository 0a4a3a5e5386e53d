//! Tests for configuration files and image-sequence input

use image::{Rgb, RgbImage};
use marker_trigger::{
    classifier::ClassifierParameters,
    config::{Config, EXAMPLE_CONFIG},
    error::AppError,
    source::{FrameSource, ImageSequenceSource},
};

#[test]
fn test_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");

    let mut config = Config::default();
    config.classifier = ClassifierParameters::new(90, 250, 180);
    config.trigger.key = "Next".to_string();
    config.segmentation.search_radius = 64;
    config.to_file(&path).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded.classifier, config.classifier);
    assert_eq!(loaded.trigger.key, "Next");
    assert_eq!(loaded.segmentation.search_radius, 64);
    assert!(loaded.validate().is_ok());
}

#[test]
fn test_example_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("example.yaml");
    std::fs::write(&path, EXAMPLE_CONFIG).unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.classifier, ClassifierParameters::default());
    assert_eq!(config.display.window_title, "Slideshow");
}

#[test]
fn test_missing_and_malformed_config() {
    let dir = tempfile::tempdir().unwrap();

    let missing = Config::from_file(dir.path().join("absent.yaml"));
    assert!(matches!(missing, Err(AppError::Io(_))));

    let path = dir.path().join("broken.yaml");
    std::fs::write(&path, "frame: [not, a, map").unwrap();
    assert!(matches!(Config::from_file(&path), Err(AppError::ConfigError(_))));
}

#[test]
fn test_image_sequence_source_reads_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    RgbImage::from_pixel(32, 24, Rgb([0, 200, 0]))
        .save(dir.path().join("frame_002.png"))
        .unwrap();
    RgbImage::from_pixel(32, 24, Rgb([200, 0, 0]))
        .save(dir.path().join("frame_001.png"))
        .unwrap();
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let mut source = ImageSequenceSource::from_dir(dir.path(), 32, 24, false).unwrap();
    assert_eq!(source.remaining(), 2);

    let first = source.next_frame().unwrap().unwrap();
    assert_eq!(*first.get_pixel(0, 0), Rgb([200, 0, 0]));
    let second = source.next_frame().unwrap().unwrap();
    assert_eq!(*second.get_pixel(0, 0), Rgb([0, 200, 0]));
    assert!(source.next_frame().unwrap().is_none());
}

#[test]
fn test_image_sequence_source_rejects_empty_dir() {
    let dir = tempfile::tempdir().unwrap();
    let result = ImageSequenceSource::from_dir(dir.path(), 32, 24, false);
    assert!(matches!(result, Err(AppError::FrameSource(_))));
}

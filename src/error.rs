//! Error types for the marker trigger library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// `OpenCV` operation failed
    #[cfg(feature = "gui")]
    #[error("OpenCV error: {0}")]
    OpenCV(#[from] opencv::Error),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or resizing failed
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// `X11` window system operation failed
    #[error("X11 error: {0}")]
    X11(String),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Frame acquisition failed
    #[error("Frame source error: {0}")]
    FrameSource(String),

    /// Calibration could not sample the reference region
    #[error("Calibration error: {0}")]
    Calibration(String),

    /// Key injection failed
    #[error("Key injection error: {0}")]
    KeyInjection(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Application-specific error type (alias for main Error type)
pub type AppError = Error;

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;

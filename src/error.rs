//! Error types for qrgen operations

use thiserror::Error;

/// Result type alias using qrgen's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for qrgen operations
#[derive(Error, Debug)]
pub enum Error {
    /// Generator or runtime configuration rejected
    #[error("Configuration error: {0}")]
    Config(String),

    /// A render request argument was rejected before any work began
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Requested output modes cannot be combined
    #[error("Unsupported combination: {0}")]
    UnsupportedCombination(String),

    /// QR code encoding failed
    #[error("Failed to encode QR code: {0}")]
    QrEncode(String),

    /// QR code decoding failed
    #[error("Failed to decode QR code: {0}")]
    QrDecode(String),

    /// No QR code found in image
    #[error("No QR code found in image")]
    NoQrCodeFound,

    /// Image load, resize, composite or write failed
    #[error("Image processing error: {0}")]
    Image(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Image(e.to_string())
    }
}

impl From<png::EncodingError> for Error {
    fn from(e: png::EncodingError) -> Self {
        Error::Image(format!("PNG encoding failed: {}", e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Other(format!("JSON error: {}", e))
    }
}

//! qrgen - QR code generator with PNG/SVG output and logo embedding
//!
//! Encodes a text payload (typically a URL) into a QR code and writes it as a
//! PNG or SVG file named after the payload's host and the current time.
//! PNG output can carry a logo composited over the symbol.
//!
//! # Features
//!
//! - **Raster and vector output**: PNG with DPI metadata, or SVG
//! - **Logo embedding**: Lanczos-resampled logo pasted onto PNG output
//! - **Configurable rendering**: error-correction level, module scale,
//!   border width and colors
//!
//! # Example
//!
//! ```no_run
//! use qrgen::{GeneratorConfig, QrCodeGenerator, RenderRequest};
//!
//! fn main() -> qrgen::Result<()> {
//!     let config = GeneratorConfig::new("H", 10, 4, 300, None)?;
//!     let generator = QrCodeGenerator::new(config);
//!
//!     let path = generator.generate(&RenderRequest::new("https://example.com/page"))?;
//!     println!("QR code written to {}", path.display());
//!     Ok(())
//! }
//! ```
//!
//! Vector output cannot be combined with a logo. Choosing an error-correction
//! level and logo size that keep the symbol scannable is up to the caller.

#![warn(missing_docs, rust_2024_compatibility)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod error;
pub mod generator;
pub mod logging;
pub mod qr;

// Re-exports for convenience
pub use error::{Error, Result};

pub use config::{GeneratorOptions, LogRotation, LoggingOptions, QrgenConfig, RenderOptions};
pub use generator::{GeneratorConfig, QrCodeGenerator, RenderRequest};
pub use qr::{Color, ErrorCorrection, OutputFormat, QrDecoder, QrEncoder, QrPayload};

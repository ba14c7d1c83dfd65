//! QR code encoding, rendering and decoding
//!
//! Symbol encoding is delegated to the `qrcode` crate and decoding to `rqrr`.
//! This module owns everything around them: module-grid rendering to PNG and
//! SVG, color parsing, logo compositing and artifact naming.

mod color;
mod decoder;
mod encoder;
pub mod logo;
pub mod naming;
mod raster;

pub use color::Color;
pub use decoder::QrDecoder;
pub use encoder::{Encoder, QrEncoder, QrSymbol, Symbol};
pub use raster::read_png_dpi;
pub use logo::{LogoPlacement, embed_logo, logo_placement};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// QR error-correction level, trading redundancy for capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCorrection {
    /// ~7% recovery
    L,
    /// ~15% recovery
    M,
    /// ~25% recovery
    Q,
    /// ~30% recovery
    H,
}

impl ErrorCorrection {
    /// Parse a level identifier (case-insensitive, surrounding whitespace ignored).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "L" => Some(Self::L),
            "M" => Some(Self::M),
            "Q" => Some(Self::Q),
            "H" => Some(Self::H),
            _ => None,
        }
    }

    pub(crate) fn to_ec_level(self) -> qrcode::EcLevel {
        match self {
            Self::L => qrcode::EcLevel::L,
            Self::M => qrcode::EcLevel::M,
            Self::Q => qrcode::EcLevel::Q,
            Self::H => qrcode::EcLevel::H,
        }
    }
}

impl FromStr for ErrorCorrection {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        Self::parse(value).ok_or_else(|| {
            Error::Config(format!(
                "Unknown error correction level '{value}', expected one of L, M, Q, H"
            ))
        })
    }
}

impl fmt::Display for ErrorCorrection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::L => "L",
            Self::M => "M",
            Self::Q => "Q",
            Self::H => "H",
        };
        f.write_str(label)
    }
}

/// Output flavour of a generated QR code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Fixed-pixel PNG bitmap
    #[default]
    Raster,
    /// Resolution-independent SVG document
    Vector,
}

impl OutputFormat {
    /// File extension (without the dot) used for this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Raster => "png",
            Self::Vector => "svg",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raster => f.write_str("raster"),
            Self::Vector => f.write_str("vector"),
        }
    }
}

/// Geometry and colors shared by raster and vector rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderStyle {
    /// Pixels per module
    pub scale: u32,
    /// Quiet-zone width in modules
    pub border: u32,
    /// Dark module color
    pub foreground: Color,
    /// Light module and border color
    pub background: Color,
}

/// A decoded QR code payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrPayload {
    /// The raw decoded data
    pub data: Vec<u8>,
    /// String representation if valid UTF-8
    pub text: Option<String>,
}

impl QrPayload {
    /// Create a new QR payload from raw bytes
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let text = String::from_utf8(data.clone()).ok();
        Self { data, text }
    }

    /// Get the payload as a string, if valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

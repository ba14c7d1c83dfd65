//! QR code decoder using rqrr, used to verify generated artifacts

use crate::error::{Error, Result};
use crate::qr::QrPayload;
use image::{DynamicImage, GrayImage};
use std::path::Path;

/// QR code decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct QrDecoder;

impl QrDecoder {
    /// Create a new QR decoder with default settings
    pub fn new() -> Self {
        Self
    }

    /// Decode the first QR code found in an image
    pub fn decode(&self, img: &DynamicImage) -> Result<QrPayload> {
        self.decode_gray(&img.to_luma8())
    }

    /// Decode the first QR code found in an image file
    pub fn decode_file(&self, path: &Path) -> Result<QrPayload> {
        let img = image::open(path)?;
        self.decode(&img)
    }

    /// Decode the first QR code found in a grayscale image
    pub fn decode_gray(&self, img: &GrayImage) -> Result<QrPayload> {
        let mut prepared = rqrr::PreparedImage::prepare(img.clone());

        let grids = prepared.detect_grids();
        let grid = grids.first().ok_or(Error::NoQrCodeFound)?;

        match grid.decode() {
            Ok((meta, content)) => {
                tracing::debug!(
                    "Decoded QR: version={:?}, ecc_level={:?}, length={}",
                    meta.version,
                    meta.ecc_level,
                    content.len()
                );

                Ok(QrPayload::from_bytes(content.into_bytes()))
            }
            Err(e) => Err(Error::QrDecode(format!("Decode failed: {:?}", e))),
        }
    }
}

//! PNG writer that records DPI in the `pHYs` chunk

use crate::error::{Error, Result};
use image::RgbaImage;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

const METERS_PER_INCH: f64 = 0.0254;

/// Convert dots-per-inch to the pixels-per-meter unit PNG stores.
pub(crate) fn dpi_to_ppm(dpi: u32) -> u32 {
    (f64::from(dpi) / METERS_PER_INCH).round() as u32
}

/// Write an RGBA image as PNG, tagging it with `dpi` when given.
pub(crate) fn write_png(path: &Path, image: &RgbaImage, dpi: Option<u32>) -> Result<()> {
    let file = File::create(path)?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), image.width(), image.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    if let Some(dpi) = dpi {
        let ppm = dpi_to_ppm(dpi);
        encoder.set_pixel_dims(Some(png::PixelDimensions {
            xppu: ppm,
            yppu: ppm,
            unit: png::Unit::Meter,
        }));
    }

    let mut writer = encoder.write_header()?;
    writer.write_image_data(image.as_raw())?;
    writer.finish()?;
    Ok(())
}

/// Read back the DPI recorded in a PNG file, if any.
pub fn read_png_dpi(path: &Path) -> Result<Option<u32>> {
    let decoder = png::Decoder::new(File::open(path)?);
    let reader = decoder
        .read_info()
        .map_err(|e| Error::Image(format!("PNG header read failed: {e}")))?;
    let dims = reader.info().pixel_dims;
    Ok(dims
        .filter(|d| d.unit == png::Unit::Meter)
        .map(|d| (f64::from(d.xppu) * METERS_PER_INCH).round() as u32))
}

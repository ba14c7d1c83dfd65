//! Logo compositing onto rendered QR rasters
//!
//! The logo is scaled to a square `floor(min(w, h) * relative_size)` pixels
//! wide and pasted at `((w - size) / divisor, (h - size) / divisor)` using
//! integer division. A divisor of 2 centers the logo; larger divisors pull it
//! toward the top-left corner rather than acting as a percentage.
//!
//! Nothing here checks that the symbol stays scannable. Callers pick an
//! error-correction level and logo size that the symbol can absorb.

use crate::error::{Error, Result};
use crate::qr::raster::write_png;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Where and how large the logo lands on the QR image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoPlacement {
    /// Side length of the square logo in pixels
    pub size: u32,
    /// Left offset in pixels
    pub x: u32,
    /// Top offset in pixels
    pub y: u32,
}

/// Compute logo size and paste offset for a `qr_width` x `qr_height` image.
pub fn logo_placement(
    qr_width: u32,
    qr_height: u32,
    relative_size: f64,
    position_divisor: u32,
) -> Result<LogoPlacement> {
    if position_divisor == 0 {
        return Err(Error::InvalidArgument(
            "logo position divisor must be at least 1".to_string(),
        ));
    }
    if !relative_size.is_finite() || relative_size <= 0.0 || relative_size > 1.0 {
        return Err(Error::InvalidArgument(format!(
            "logo relative size must be within (0, 1], got {relative_size}"
        )));
    }

    let size = (f64::from(qr_width.min(qr_height)) * relative_size).floor() as u32;
    if size == 0 {
        return Err(Error::Image(format!(
            "logo would be 0 pixels wide on a {qr_width}x{qr_height} image at relative size {relative_size}"
        )));
    }

    Ok(LogoPlacement {
        size,
        x: (qr_width - size) / position_divisor,
        y: (qr_height - size) / position_divisor,
    })
}

/// Resize `logo` and paste it onto `qr` according to `placement`.
///
/// Logos with an alpha channel are blended through it; others are pasted opaque.
/// Any alpha-carrying color type counts (`La8`, `Rgba16`, ...), not only 8-bit RGBA.
pub fn composite(qr: &mut RgbaImage, logo: &DynamicImage, placement: LogoPlacement) {
    let resized = logo
        .resize_exact(placement.size, placement.size, FilterType::Lanczos3)
        .to_rgba8();
    let (x, y) = (i64::from(placement.x), i64::from(placement.y));

    if logo.color().has_alpha() {
        imageops::overlay(qr, &resized, x, y);
    } else {
        imageops::replace(qr, &resized, x, y);
    }
}

/// Composite the logo at `logo_path` onto the PNG at `qr_path`, in place.
///
/// The result is written to a sibling file and renamed over `qr_path`, so on
/// failure the original raster is left untouched.
pub fn embed_logo(
    qr_path: &Path,
    logo_path: &Path,
    position_divisor: u32,
    relative_size: f64,
    dpi: Option<u32>,
) -> Result<()> {
    let result = embed_logo_inner(qr_path, logo_path, position_divisor, relative_size, dpi);
    if let Err(ref err) = result {
        tracing::error!(
            qr = %qr_path.display(),
            logo = %logo_path.display(),
            error = %err,
            "Failed to embed logo"
        );
    }
    result
}

fn embed_logo_inner(
    qr_path: &Path,
    logo_path: &Path,
    position_divisor: u32,
    relative_size: f64,
    dpi: Option<u32>,
) -> Result<()> {
    let mut qr = image::open(qr_path)
        .map_err(|e| Error::Image(format!("Failed to load QR image {}: {e}", qr_path.display())))?
        .to_rgba8();
    let logo = image::open(logo_path)
        .map_err(|e| Error::Image(format!("Failed to load logo {}: {e}", logo_path.display())))?;

    let placement = logo_placement(qr.width(), qr.height(), relative_size, position_divisor)?;
    tracing::debug!(
        size = placement.size,
        x = placement.x,
        y = placement.y,
        alpha = logo.color().has_alpha(),
        "Placing logo"
    );
    composite(&mut qr, &logo, placement);

    let staging = staging_path(qr_path);
    if let Err(err) = write_png(&staging, &qr, dpi) {
        let _ = fs::remove_file(&staging);
        return Err(match err {
            Error::Image(_) => err,
            other => Error::Image(format!(
                "Failed to write composited image {}: {other}",
                staging.display()
            )),
        });
    }
    fs::rename(&staging, qr_path).map_err(|e| {
        let _ = fs::remove_file(&staging);
        Error::Image(format!("Failed to replace {}: {e}", qr_path.display()))
    })?;

    tracing::info!(path = %qr_path.display(), "Logo embedded in PNG QR code");
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("qr_code"));
    name.push(".partial");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba};

    #[test]
    fn test_centered_placement() {
        let placement = logo_placement(1000, 1000, 0.5, 2).expect("placement");
        assert_eq!(
            placement,
            LogoPlacement {
                size: 500,
                x: 250,
                y: 250
            }
        );
    }

    #[test]
    fn test_divisor_shifts_toward_top_left() {
        let placement = logo_placement(1000, 1000, 0.5, 4).expect("placement");
        assert_eq!((placement.x, placement.y), (125, 125));

        let placement = logo_placement(1000, 1000, 0.5, 1).expect("placement");
        assert_eq!((placement.x, placement.y), (500, 500));
    }

    #[test]
    fn test_placement_uses_smaller_side_and_floors() {
        let placement = logo_placement(301, 200, 0.2, 2).expect("placement");
        assert_eq!(placement.size, 40);
        assert_eq!((placement.x, placement.y), (130, 80));

        let placement = logo_placement(333, 333, 0.2, 3).expect("placement");
        assert_eq!(placement.size, 66);
        assert_eq!((placement.x, placement.y), (89, 89));
    }

    #[test]
    fn test_placement_rejects_bad_inputs() {
        assert!(matches!(
            logo_placement(100, 100, 0.5, 0),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            logo_placement(100, 100, 0.0, 2),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            logo_placement(100, 100, 1.5, 2),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            logo_placement(100, 100, f64::NAN, 2),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            logo_placement(3, 3, 0.2, 2),
            Err(Error::Image(_))
        ));
    }

    #[test]
    fn test_full_size_logo_at_origin() {
        let placement = logo_placement(120, 80, 1.0, 7).expect("placement");
        assert_eq!(placement.size, 80);
        assert_eq!((placement.x, placement.y), (40 / 7, 0));
    }

    #[test]
    fn test_composite_opaque_logo() {
        let mut qr = RgbaImage::from_pixel(100, 100, Rgba([255, 255, 255, 255]));
        let logo = DynamicImage::ImageRgb8(RgbImage::from_pixel(7, 7, Rgb([200, 0, 0])));
        let placement = logo_placement(100, 100, 0.3, 2).expect("placement");

        composite(&mut qr, &logo, placement);

        assert_eq!(qr.get_pixel(35, 35), &Rgba([200, 0, 0, 255]));
        assert_eq!(qr.get_pixel(64, 64), &Rgba([200, 0, 0, 255]));
        assert_eq!(qr.get_pixel(34, 34), &Rgba([255, 255, 255, 255]));
        assert_eq!(qr.get_pixel(65, 65), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_composite_respects_alpha() {
        let mut qr = RgbaImage::from_pixel(50, 50, Rgba([10, 20, 30, 255]));
        let logo = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 0])));
        let placement = logo_placement(50, 50, 0.5, 2).expect("placement");

        composite(&mut qr, &logo, placement);

        // Fully transparent logo leaves the QR untouched.
        assert_eq!(qr.get_pixel(25, 25), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_composite_blends_gray_alpha_logo() {
        let mut qr = RgbaImage::from_pixel(40, 40, Rgba([10, 20, 30, 255]));
        let logo = DynamicImage::ImageLumaA8(image::GrayAlphaImage::from_pixel(
            6,
            6,
            image::LumaA([0, 0]),
        ));
        let placement = logo_placement(40, 40, 0.5, 2).expect("placement");

        composite(&mut qr, &logo, placement);

        assert_eq!(qr.get_pixel(20, 20), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_embed_logo_in_place() {
        let dir = tempfile::tempdir().expect("tempdir");
        let qr_path = dir.path().join("qr.png");
        let logo_path = dir.path().join("logo.png");
        write_png(
            &qr_path,
            &RgbaImage::from_pixel(1000, 1000, Rgba([255, 255, 255, 255])),
            Some(300),
        )
        .expect("write qr");
        RgbImage::from_pixel(10, 10, Rgb([0, 0, 255]))
            .save(&logo_path)
            .expect("write logo");

        embed_logo(&qr_path, &logo_path, 4, 0.5, Some(300)).expect("embed");

        let result = image::open(&qr_path).expect("reopen").to_rgba8();
        assert_eq!(result.dimensions(), (1000, 1000));
        assert_eq!(result.get_pixel(125, 125), &Rgba([0, 0, 255, 255]));
        assert_eq!(result.get_pixel(624, 624), &Rgba([0, 0, 255, 255]));
        assert_eq!(result.get_pixel(124, 124), &Rgba([255, 255, 255, 255]));
        assert_eq!(result.get_pixel(625, 625), &Rgba([255, 255, 255, 255]));
        assert_eq!(
            crate::qr::read_png_dpi(&qr_path).expect("dpi"),
            Some(300)
        );
        assert!(!staging_path(&qr_path).exists());
    }

    #[test]
    fn test_embed_missing_logo_leaves_raster_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let qr_path = dir.path().join("qr.png");
        write_png(
            &qr_path,
            &RgbaImage::from_pixel(20, 20, Rgba([1, 2, 3, 255])),
            None,
        )
        .expect("write qr");
        let before = fs::read(&qr_path).expect("read before");

        let err = embed_logo(&qr_path, &dir.path().join("missing.png"), 2, 0.2, None)
            .unwrap_err();

        assert!(matches!(err, Error::Image(_)));
        assert_eq!(fs::read(&qr_path).expect("read after"), before);
    }

    #[test]
    fn test_embed_staging_failure_is_image_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let qr_path = dir.path().join("qr.png");
        let logo_path = dir.path().join("logo.png");
        write_png(
            &qr_path,
            &RgbaImage::from_pixel(100, 100, Rgba([255, 255, 255, 255])),
            None,
        )
        .expect("write qr");
        RgbImage::from_pixel(8, 8, Rgb([0, 0, 0]))
            .save(&logo_path)
            .expect("write logo");
        let before = fs::read(&qr_path).expect("read before");
        // A directory in the staging slot makes the staging file uncreatable.
        fs::create_dir(staging_path(&qr_path)).expect("block staging path");

        let err = embed_logo(&qr_path, &logo_path, 2, 0.2, None).unwrap_err();

        assert!(matches!(err, Error::Image(_)), "{err:?}");
        assert_eq!(fs::read(&qr_path).expect("read after"), before);
        assert!(staging_path(&qr_path).is_dir());
    }
}

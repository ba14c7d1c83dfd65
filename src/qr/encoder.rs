//! QR code encoder and module-grid renderers

use crate::error::{Error, Result};
use crate::qr::raster::write_png;
use crate::qr::{Color, ErrorCorrection, RenderStyle};
use image::RgbaImage;
use qrcode::QrCode;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Upper bound on rendered pixels (1 GiB of RGBA).
const MAX_RASTER_PIXELS: u64 = 1 << 28;

/// Turns a payload into a QR symbol at a given error-correction level.
pub trait Encoder {
    /// Symbol type produced by this encoder
    type Symbol: Symbol;

    /// Build the QR symbol for `payload`.
    fn encode(&self, payload: &str, level: ErrorCorrection) -> Result<Self::Symbol>;
}

/// An encoded QR symbol that can be written out as PNG or SVG.
pub trait Symbol {
    /// Write a PNG at `path`, tagged with `dpi`.
    fn save_raster(&self, path: &Path, style: &RenderStyle, dpi: u32) -> Result<()>;

    /// Write an SVG document at `path`.
    fn save_vector(&self, path: &Path, style: &RenderStyle) -> Result<()>;
}

/// QR code encoder backed by the `qrcode` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct QrEncoder;

impl QrEncoder {
    /// Create a new QR encoder
    pub fn new() -> Self {
        Self
    }
}

impl Encoder for QrEncoder {
    type Symbol = QrSymbol;

    fn encode(&self, payload: &str, level: ErrorCorrection) -> Result<QrSymbol> {
        let code = QrCode::with_error_correction_level(payload.as_bytes(), level.to_ec_level())
            .map_err(|e| Error::QrEncode(format!("Failed to create QR code: {}", e)))?;

        tracing::debug!(
            version = ?code.version(),
            width = code.width(),
            level = %level,
            "Encoded QR symbol"
        );

        Ok(QrSymbol {
            width: code.width(),
            modules: code.to_colors(),
        })
    }
}

/// Module grid of an encoded QR code
#[derive(Debug, Clone)]
pub struct QrSymbol {
    width: usize,
    modules: Vec<qrcode::Color>,
}

impl QrSymbol {
    /// Number of modules per side, excluding the border.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Whether the module at column `x`, row `y` is dark.
    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        self.modules[y * self.width + x] == qrcode::Color::Dark
    }

    /// Side length in modules including the border on both sides.
    fn span(&self, border: u32) -> Option<u32> {
        u32::try_from(self.width)
            .ok()?
            .checked_add(border.checked_mul(2)?)
    }

    /// Rasterize the symbol into an RGBA bitmap.
    pub fn render_image(&self, style: &RenderStyle) -> Result<RgbaImage> {
        if style.scale == 0 {
            return Err(Error::InvalidArgument("scale must be positive".to_string()));
        }
        let side = self
            .span(style.border)
            .and_then(|span| span.checked_mul(style.scale))
            .ok_or_else(|| {
                Error::Image(format!(
                    "QR image too large for scale {} and border {}",
                    style.scale, style.border
                ))
            })?;
        let pixels = u64::from(side) * u64::from(side);
        if pixels > MAX_RASTER_PIXELS {
            return Err(Error::Image(format!(
                "QR image too large: {side}x{side} pixels exceeds the {MAX_RASTER_PIXELS} pixel limit"
            )));
        }

        let dark = style.foreground.to_rgba();
        let mut image = RgbaImage::from_pixel(side, side, style.background.to_rgba());

        for y in 0..self.width {
            for x in 0..self.width {
                if !self.is_dark(x, y) {
                    continue;
                }
                let left = (x as u32 + style.border) * style.scale;
                let top = (y as u32 + style.border) * style.scale;
                for dy in 0..style.scale {
                    for dx in 0..style.scale {
                        image.put_pixel(left + dx, top + dy, dark);
                    }
                }
            }
        }

        Ok(image)
    }

    /// Render the symbol as an SVG document in module units, sized by `scale`.
    pub fn render_svg(&self, style: &RenderStyle) -> Result<String> {
        let span = self.span(style.border).ok_or_else(|| {
            Error::InvalidArgument(format!("border {} is too large", style.border))
        })?;
        let pixels = u64::from(span) * u64::from(style.scale);

        let mut svg = String::new();
        svg.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        let _ = writeln!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{pixels}\" height=\"{pixels}\" \
             viewBox=\"0 0 {span} {span}\" shape-rendering=\"crispEdges\">"
        );
        if !style.background.is_transparent() {
            let _ = writeln!(
                svg,
                "<rect width=\"{span}\" height=\"{span}\" {}/>",
                fill(style.background)
            );
        }

        // One subpath per horizontal run of dark modules.
        let mut path = String::new();
        for y in 0..self.width {
            let mut x = 0;
            while x < self.width {
                if !self.is_dark(x, y) {
                    x += 1;
                    continue;
                }
                let start = x;
                while x < self.width && self.is_dark(x, y) {
                    x += 1;
                }
                let run = x - start;
                let _ = write!(
                    path,
                    "M{},{}h{run}v1h-{run}z",
                    start as u32 + style.border,
                    y as u32 + style.border
                );
            }
        }
        if !path.is_empty() && !style.foreground.is_transparent() {
            let _ = writeln!(svg, "<path {} d=\"{path}\"/>", fill(style.foreground));
        }
        svg.push_str("</svg>\n");

        Ok(svg)
    }
}

fn fill(color: Color) -> String {
    if color.a == 255 {
        format!("fill=\"{}\"", color.hex_rgb())
    } else {
        format!(
            "fill=\"{}\" fill-opacity=\"{:.3}\"",
            color.hex_rgb(),
            f64::from(color.a) / 255.0
        )
    }
}

impl Symbol for QrSymbol {
    fn save_raster(&self, path: &Path, style: &RenderStyle, dpi: u32) -> Result<()> {
        let image = self.render_image(style)?;
        write_png(path, &image, Some(dpi))
    }

    fn save_vector(&self, path: &Path, style: &RenderStyle) -> Result<()> {
        let svg = self.render_svg(style)?;
        fs::write(path, svg)?;
        Ok(())
    }
}

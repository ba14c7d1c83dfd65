//! Module colors parsed from names or hex notation

use crate::error::{Error, Result};
use image::Rgba;
use std::fmt;
use std::str::FromStr;

/// An RGBA color used for dark modules or the light background
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
    /// Alpha channel (255 = opaque)
    pub a: u8,
}

impl Color {
    /// Opaque black, the default dark module color.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white, the default background color.
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    /// Fully transparent.
    pub const TRANSPARENT: Self = Self {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    /// Opaque color from RGB components.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse a color name (`"blue"`) or hex code (`"#00f"`, `"#0000ff"`, `"#0000ff80"`).
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        if let Some(hex) = value.strip_prefix('#') {
            return Self::parse_hex(hex);
        }
        Self::named(&value)
    }

    fn named(name: &str) -> Option<Self> {
        let color = match name {
            "black" => Self::BLACK,
            "white" => Self::WHITE,
            "transparent" => Self::TRANSPARENT,
            "red" => Self::rgb(255, 0, 0),
            "green" => Self::rgb(0, 128, 0),
            "lime" => Self::rgb(0, 255, 0),
            "blue" => Self::rgb(0, 0, 255),
            "yellow" => Self::rgb(255, 255, 0),
            "cyan" | "aqua" => Self::rgb(0, 255, 255),
            "magenta" | "fuchsia" => Self::rgb(255, 0, 255),
            "gray" | "grey" => Self::rgb(128, 128, 128),
            "silver" => Self::rgb(192, 192, 192),
            "orange" => Self::rgb(255, 165, 0),
            "purple" => Self::rgb(128, 0, 128),
            "navy" => Self::rgb(0, 0, 128),
            "maroon" => Self::rgb(128, 0, 0),
            "olive" => Self::rgb(128, 128, 0),
            "teal" => Self::rgb(0, 128, 128),
            _ => return None,
        };
        Some(color)
    }

    fn parse_hex(hex: &str) -> Option<Self> {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => {
                let mut rgb = [0u8; 3];
                for (slot, c) in rgb.iter_mut().zip(hex.chars()) {
                    let nibble = c.to_digit(16)? as u8;
                    *slot = nibble * 17;
                }
                Some(Self::rgb(rgb[0], rgb[1], rgb[2]))
            }
            6 | 8 => {
                let r = channel(&hex[0..2])?;
                let g = channel(&hex[2..4])?;
                let b = channel(&hex[4..6])?;
                let a = if hex.len() == 8 {
                    channel(&hex[6..8])?
                } else {
                    255
                };
                Some(Self { r, g, b, a })
            }
            _ => None,
        }
    }

    /// Whether the color is fully transparent.
    pub fn is_transparent(self) -> bool {
        self.a == 0
    }

    /// `#rrggbb` notation, alpha omitted.
    pub fn hex_rgb(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub(crate) fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, self.a])
    }
}

impl FromStr for Color {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        Self::parse(value).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "Unrecognised color '{value}', expected a color name or #rgb/#rrggbb/#rrggbbaa"
            ))
        })
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            f.write_str(&self.hex_rgb())
        } else {
            write!(f, "{}{:02x}", self.hex_rgb(), self.a)
        }
    }
}

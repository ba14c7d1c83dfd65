//! Generate a PNG, an SVG and a logo-embedded PNG for one URL
//!
//! Usage: cargo run --example generate_qr

use image::{Rgba, RgbaImage};
use qrgen::{Color, GeneratorConfig, OutputFormat, QrCodeGenerator, RenderRequest};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let out_dir = std::env::temp_dir().join("qrgen-demo");
    let url = "https://www.example.com/index";

    let plain = QrCodeGenerator::new(GeneratorConfig::new("M", 10, 4, 300, None)?);

    let png = plain.generate(&RenderRequest::new(url).with_output_dir(&out_dir))?;
    println!("✓ PNG written to {}", png.display());

    let svg = plain.generate(
        &RenderRequest::new(url)
            .with_format(OutputFormat::Vector)
            .with_colors(Color::rgb(0, 0, 128), Color::WHITE)
            .with_output_dir(&out_dir),
    )?;
    println!("✓ SVG written to {}", svg.display());

    // A translucent orange square stands in for a brand logo.
    let logo_path = out_dir.join("demo_logo.png");
    RgbaImage::from_pixel(64, 64, Rgba([255, 140, 0, 220])).save(&logo_path)?;

    let branded = QrCodeGenerator::new(GeneratorConfig::new("H", 10, 4, 300, Some(logo_path))?);
    let with_logo = branded.generate(
        &RenderRequest::new(url)
            .with_output_dir(out_dir.join("branded"))
            .with_logo_layout(0.2, 2),
    )?;
    println!("✓ Logo PNG written to {}", with_logo.display());

    Ok(())
}

//! qrgen command-line entrypoint

use clap::Parser;
use qrgen::{
    Error, OutputFormat, QrCodeGenerator, QrDecoder, QrgenConfig, Result, logging,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "qrgen",
    version,
    about = "Generate QR codes as PNG or SVG, optionally with an embedded logo"
)]
struct Cli {
    /// URL or text to encode
    payload: String,

    /// Optional configuration file (toml/yaml). Defaults to qrgen.{toml,yaml} in cwd/XDG config.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Error-correction level: L, M, Q or H
    #[arg(short = 'e', long, value_name = "LEVEL")]
    error_correction: Option<String>,

    /// Pixels per module
    #[arg(long, value_name = "PX")]
    scale: Option<u32>,

    /// Quiet-zone width in modules
    #[arg(long, value_name = "MODULES")]
    border: Option<u32>,

    /// DPI recorded in PNG output
    #[arg(long)]
    dpi: Option<u32>,

    /// Logo image to embed (PNG output only)
    #[arg(long, value_name = "PATH")]
    logo: Option<PathBuf>,

    /// Write SVG instead of PNG
    #[arg(long)]
    vector: bool,

    /// Dark module color (name or #hex)
    #[arg(long, value_name = "COLOR")]
    foreground: Option<String>,

    /// Background color (name or #hex)
    #[arg(long, value_name = "COLOR")]
    background: Option<String>,

    /// Directory to write the QR code into
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Logo size as a fraction of the QR image side
    #[arg(long, value_name = "FRACTION")]
    logo_size: Option<f64>,

    /// Logo position divisor (2 centers the logo)
    #[arg(long, value_name = "N")]
    logo_position: Option<u32>,

    /// Decode the generated PNG and check it matches the payload
    #[arg(long)]
    verify: bool,

    /// Output the result as JSON instead of a bare path
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = QrgenConfig::load(cli.config.as_deref())?;
    apply_cli_overrides(&mut config, &cli);

    logging::init(&config.logging)?;

    let generator = QrCodeGenerator::new(config.generator_config()?);
    let request = config.render.to_request(cli.payload.clone())?;
    let path = generator.generate(&request)?;

    let verified = if cli.verify {
        Some(verify(&path, &request.payload, request.format)?)
    } else {
        None
    };

    if cli.json {
        let result = json!({
            "path": path.display().to_string(),
            "format": request.format.to_string(),
            "payload": request.payload,
            "verified": verified,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", path.display());
    }

    Ok(())
}

fn apply_cli_overrides(config: &mut QrgenConfig, cli: &Cli) {
    let generator = &mut config.generator;
    if let Some(ref level) = cli.error_correction {
        generator.error_correction = level.clone();
    }
    if let Some(scale) = cli.scale {
        generator.scale = scale;
    }
    if let Some(border) = cli.border {
        generator.border = border;
    }
    if let Some(dpi) = cli.dpi {
        generator.dpi = dpi;
    }
    if let Some(ref logo) = cli.logo {
        generator.logo = Some(logo.clone());
    }

    let render = &mut config.render;
    if cli.vector {
        render.format = OutputFormat::Vector;
    }
    if let Some(ref color) = cli.foreground {
        render.foreground = color.clone();
    }
    if let Some(ref color) = cli.background {
        render.background = color.clone();
    }
    if let Some(ref dir) = cli.output_dir {
        render.output_dir = dir.clone();
    }
    if let Some(size) = cli.logo_size {
        render.logo_relative_size = size;
    }
    if let Some(position) = cli.logo_position {
        render.logo_position_divisor = position;
    }
}

/// Decode a generated PNG and compare it with the payload. SVG output is not
/// decodable here and is reported as unverified.
fn verify(path: &Path, payload: &str, format: OutputFormat) -> Result<bool> {
    if format == OutputFormat::Vector {
        warn!(path = %path.display(), "Skipping verification of SVG output");
        return Ok(false);
    }

    let decoded = QrDecoder::new().decode_file(path)?;
    match decoded.as_str() {
        Some(text) if text == payload => {
            info!(path = %path.display(), "Generated QR code decodes to the payload");
            Ok(true)
        }
        other => Err(Error::QrDecode(format!(
            "{} decodes to {:?}, expected {:?}",
            path.display(),
            other,
            payload
        ))),
    }
}

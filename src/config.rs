//! qrgen runtime configuration handling

use crate::error::{Error, Result};
use crate::generator::{
    DEFAULT_LOGO_POSITION_DIVISOR, DEFAULT_LOGO_RELATIVE_SIZE, DEFAULT_OUTPUT_DIR, GeneratorConfig,
    RenderRequest,
};
use crate::qr::{Color, OutputFormat};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration structure persisted to disk or environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QrgenConfig {
    /// Generator settings fixed for every render
    pub generator: GeneratorOptions,
    /// Per-render defaults
    pub render: RenderOptions,
    /// Logging configuration
    pub logging: LoggingOptions,
}

impl QrgenConfig {
    /// Load configuration from an explicit path or fall back to discovered defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = explicit_path {
            Self::from_file(path)?
        } else if let Some(path) = Self::discover_file()? {
            tracing::info!("Using configuration file: {}", path.display());
            Self::from_file(&path)?
        } else {
            tracing::debug!("No qrgen.toml / qrgen.yaml found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Attempt to locate a configuration file in common locations.
    fn discover_file() -> Result<Option<PathBuf>> {
        let cwd =
            env::current_dir().map_err(|e| Error::Config(format!("Failed to read cwd: {e}")))?;
        for candidate in ["qrgen.toml", "qrgen.yaml", "qrgen.yml"] {
            let path = cwd.join(candidate);
            if path.exists() {
                return Ok(Some(path));
            }
        }

        if let Some(xdg_config) = env::var_os("XDG_CONFIG_HOME") {
            let base = PathBuf::from(xdg_config).join("qrgen");
            for candidate in ["config.toml", "config.yaml"] {
                let path = base.join(candidate);
                if path.exists() {
                    return Ok(Some(path));
                }
            }
        }

        Ok(None)
    }

    /// Read configuration from a concrete file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;

        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_ascii_lowercase()
            .as_str()
        {
            "toml" => toml::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse TOML {}: {e}", path.display()))
            }),
            "yaml" | "yml" => serde_yaml::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse YAML {}: {e}", path.display()))
            }),
            other => Err(Error::Config(format!(
                "Unsupported config format '{}', expected toml/yaml",
                other
            ))),
        }
    }

    /// Apply environment variable overrides after file/default loading.
    fn apply_env_overrides(&mut self) {
        self.generator.apply_env_overrides();
        self.render.apply_env_overrides();
        self.logging.apply_env_overrides();
    }

    /// Validated generator configuration.
    pub fn generator_config(&self) -> Result<GeneratorConfig> {
        self.generator.to_generator_config()
    }
}

/// Generator settings as they appear in config files
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorOptions {
    /// Error-correction level (L, M, Q or H)
    pub error_correction: String,
    /// Pixels per module
    pub scale: u32,
    /// Quiet-zone width in modules
    pub border: u32,
    /// DPI stored in PNG output
    pub dpi: u32,
    /// Logo composited onto PNG output
    pub logo: Option<PathBuf>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            error_correction: "H".to_string(), // leaves room for a logo
            scale: 10,
            border: 4,
            dpi: 300,
            logo: None,
        }
    }
}

impl GeneratorOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(level) = env::var("QRGEN_ERROR_CORRECTION") {
            self.error_correction = level;
        }
        if let Ok(scale) = env::var("QRGEN_SCALE") {
            if let Ok(parsed) = scale.parse::<u32>() {
                self.scale = parsed;
            }
        }
        if let Ok(border) = env::var("QRGEN_BORDER") {
            if let Ok(parsed) = border.parse::<u32>() {
                self.border = parsed;
            }
        }
        if let Ok(dpi) = env::var("QRGEN_DPI") {
            if let Ok(parsed) = dpi.parse::<u32>() {
                self.dpi = parsed;
            }
        }
        if let Ok(logo) = env::var("QRGEN_LOGO") {
            if logo.trim().is_empty() {
                self.logo = None;
            } else {
                self.logo = Some(PathBuf::from(logo));
            }
        }
    }

    /// Convert into a validated [`GeneratorConfig`].
    pub fn to_generator_config(&self) -> Result<GeneratorConfig> {
        GeneratorConfig::new(
            &self.error_correction,
            self.scale,
            self.border,
            self.dpi,
            self.logo.clone(),
        )
    }
}

/// Render defaults as they appear in config files
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// `raster` or `vector`
    pub format: OutputFormat,
    /// Dark module color name or hex code
    pub foreground: String,
    /// Background color name or hex code
    pub background: String,
    /// Directory artifacts are written to
    pub output_dir: PathBuf,
    /// Logo side as a fraction of the smaller QR side
    pub logo_relative_size: f64,
    /// Logo position divisor (2 centers)
    pub logo_position_divisor: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Raster,
            foreground: "black".to_string(),
            background: "white".to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            logo_relative_size: DEFAULT_LOGO_RELATIVE_SIZE,
            logo_position_divisor: DEFAULT_LOGO_POSITION_DIVISOR,
        }
    }
}

impl RenderOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(format) = env::var("QRGEN_FORMAT") {
            match format.to_ascii_lowercase().as_str() {
                "raster" | "png" => self.format = OutputFormat::Raster,
                "vector" | "svg" => self.format = OutputFormat::Vector,
                _ => {}
            }
        }
        if let Ok(color) = env::var("QRGEN_FOREGROUND") {
            self.foreground = color;
        }
        if let Ok(color) = env::var("QRGEN_BACKGROUND") {
            self.background = color;
        }
        if let Ok(dir) = env::var("QRGEN_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
    }

    /// Build a render request for `payload` from these defaults.
    pub fn to_request(&self, payload: impl Into<String>) -> Result<RenderRequest> {
        Ok(RenderRequest {
            payload: payload.into(),
            format: self.format,
            foreground: self.foreground.parse::<Color>()?,
            background: self.background.parse::<Color>()?,
            output_dir: self.output_dir.clone(),
            logo_relative_size: self.logo_relative_size,
            logo_position_divisor: self.logo_position_divisor,
        })
    }
}

/// Structured logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingOptions {
    /// Default log level (overridable via `QRGEN_LOG_LEVEL`)
    pub level: String,
    /// Optional log file path for teeing structured logs
    pub file: Option<PathBuf>,
    /// Force ANSI colors in terminal logging
    pub color: bool,
    /// Optional log rotation strategy applied to `file`
    pub rotation: Option<LogRotation>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            color: true,
            rotation: None,
        }
    }
}

impl LoggingOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(level) = env::var(crate::logging::LOG_LEVEL_ENV) {
            self.level = level;
        }
        if let Ok(file) = env::var("QRGEN_LOG_FILE") {
            self.file = Some(PathBuf::from(file));
        }
        if let Ok(color) = env::var("QRGEN_LOG_COLOR") {
            match color.to_ascii_lowercase().as_str() {
                "0" | "false" | "off" => self.color = false,
                "1" | "true" | "on" => self.color = true,
                _ => {}
            }
        }
        if let Ok(rotation) = env::var("QRGEN_LOG_ROTATION") {
            if let Some(parsed) = LogRotation::parse(&rotation) {
                self.rotation = Some(parsed);
            }
        }
    }
}

/// Supported log rotation policies for file sinks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// Rotate log files once per hour
    Hourly,
    /// Rotate log files once per day
    Daily,
}

impl LogRotation {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            _ => None,
        }
    }
}

//! QR code generation: configuration, render requests and output-mode policy

use crate::error::{Error, Result};
use crate::qr::{
    Color, Encoder, ErrorCorrection, OutputFormat, QrEncoder, RenderStyle, Symbol, embed_logo,
    naming,
};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Dispatch;

/// Default directory artifacts are written to
pub const DEFAULT_OUTPUT_DIR: &str = "./output_qr_codes";
/// Default logo size as a fraction of the smaller QR image side
pub const DEFAULT_LOGO_RELATIVE_SIZE: f64 = 0.2;
/// Default logo position divisor (2 centers the logo)
pub const DEFAULT_LOGO_POSITION_DIVISOR: u32 = 2;

/// Rendering parameters fixed for the lifetime of a generator
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    error_correction: ErrorCorrection,
    scale: u32,
    border: u32,
    dpi: u32,
    logo: Option<PathBuf>,
}

impl GeneratorConfig {
    /// Validate and normalize generator settings.
    ///
    /// `error_correction` is matched case-insensitively against L/M/Q/H.
    /// `scale` and `dpi` must be positive; `border` may be zero.
    pub fn new(
        error_correction: &str,
        scale: u32,
        border: u32,
        dpi: u32,
        logo: Option<PathBuf>,
    ) -> Result<Self> {
        let result = Self::validated(error_correction, scale, border, dpi, logo);
        if let Err(ref err) = result {
            tracing::error!(error = %err, "Rejected QR generator configuration");
        }
        result
    }

    fn validated(
        error_correction: &str,
        scale: u32,
        border: u32,
        dpi: u32,
        logo: Option<PathBuf>,
    ) -> Result<Self> {
        let error_correction = error_correction.parse::<ErrorCorrection>()?;
        if scale == 0 {
            return Err(Error::Config("scale must be a positive number of pixels".to_string()));
        }
        if dpi == 0 {
            return Err(Error::Config("dpi must be positive".to_string()));
        }
        if logo.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
            return Err(Error::Config("logo path must not be empty".to_string()));
        }

        Ok(Self {
            error_correction,
            scale,
            border,
            dpi,
            logo,
        })
    }

    /// Error-correction level symbols are encoded at
    pub fn error_correction(&self) -> ErrorCorrection {
        self.error_correction
    }

    /// Pixels per module
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Quiet-zone width in modules
    pub fn border(&self) -> u32 {
        self.border
    }

    /// DPI recorded in raster output
    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    /// Logo composited onto raster output, if any
    pub fn logo(&self) -> Option<&Path> {
        self.logo.as_deref()
    }
}

/// Parameters for a single `generate` call
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    /// URL or arbitrary text to encode. An empty payload is rejected with
    /// `InvalidArgument` rather than encoded as an empty symbol.
    pub payload: String,
    /// Raster (PNG) or vector (SVG) output
    pub format: OutputFormat,
    /// Dark module color
    pub foreground: Color,
    /// Light module and border color
    pub background: Color,
    /// Directory the artifact is written to, created when missing
    pub output_dir: PathBuf,
    /// Logo side as a fraction of the smaller QR image side, in (0, 1]
    pub logo_relative_size: f64,
    /// Divisor applied to the free space around the logo to get its offset
    pub logo_position_divisor: u32,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self {
            payload: String::new(),
            format: OutputFormat::Raster,
            foreground: Color::BLACK,
            background: Color::WHITE,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            logo_relative_size: DEFAULT_LOGO_RELATIVE_SIZE,
            logo_position_divisor: DEFAULT_LOGO_POSITION_DIVISOR,
        }
    }
}

impl RenderRequest {
    /// Request with default options for `payload`.
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            ..Default::default()
        }
    }

    /// Set the output format.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Set foreground and background colors.
    pub fn with_colors(mut self, foreground: Color, background: Color) -> Self {
        self.foreground = foreground;
        self.background = background;
        self
    }

    /// Set the output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set logo relative size and position divisor.
    pub fn with_logo_layout(mut self, relative_size: f64, position_divisor: u32) -> Self {
        self.logo_relative_size = relative_size;
        self.logo_position_divisor = position_divisor;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.payload.is_empty() {
            return Err(Error::InvalidArgument("payload must not be empty".to_string()));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(Error::InvalidArgument(
                "output directory must not be empty".to_string(),
            ));
        }
        let size = self.logo_relative_size;
        if !size.is_finite() || size <= 0.0 || size > 1.0 {
            return Err(Error::InvalidArgument(format!(
                "logo relative size must be within (0, 1], got {size}"
            )));
        }
        if self.logo_position_divisor == 0 {
            return Err(Error::InvalidArgument(
                "logo position divisor must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Generates QR code artifacts from render requests.
///
/// Holds only immutable configuration, so one generator can serve any
/// number of sequential calls. Logging goes to the injected dispatcher when
/// one is given, otherwise to the current default subscriber.
#[derive(Debug)]
pub struct QrCodeGenerator<E = QrEncoder> {
    config: GeneratorConfig,
    encoder: E,
    dispatch: Option<Dispatch>,
}

impl QrCodeGenerator<QrEncoder> {
    /// Generator backed by the `qrcode` encoder, logging to the default subscriber.
    pub fn new(config: GeneratorConfig) -> Self {
        Self::with_parts(config, QrEncoder::new(), None)
    }
}

impl<E: Encoder> QrCodeGenerator<E> {
    /// Generator with an explicit encoder and optional log dispatcher.
    pub fn with_parts(config: GeneratorConfig, encoder: E, dispatch: Option<Dispatch>) -> Self {
        let generator = Self {
            config,
            encoder,
            dispatch,
        };
        generator.in_scope(|| {
            let config = &generator.config;
            tracing::info!(
                error_correction = %config.error_correction,
                scale = config.scale,
                border = config.border,
                dpi = config.dpi,
                logo = ?config.logo,
                "QR code generator initialized"
            );
        });
        generator
    }

    /// Configuration this generator renders with.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Render `request` and return the path of the written artifact.
    pub fn generate(&self, request: &RenderRequest) -> Result<PathBuf> {
        self.generate_at(request, &Local::now())
    }

    /// Like [`generate`](Self::generate), naming the artifact after `timestamp`.
    pub fn generate_at(&self, request: &RenderRequest, timestamp: &DateTime<Local>) -> Result<PathBuf> {
        self.in_scope(|| {
            let result = self.render(request, timestamp);
            if let Err(ref err) = result {
                tracing::error!(
                    payload = %request.payload,
                    format = %request.format,
                    output_dir = %request.output_dir.display(),
                    logo = ?self.config.logo,
                    error = %err,
                    "QR code generation failed"
                );
            }
            result
        })
    }

    fn render(&self, request: &RenderRequest, timestamp: &DateTime<Local>) -> Result<PathBuf> {
        request.validate()?;

        if self.config.logo.is_some() && request.format == OutputFormat::Vector {
            return Err(Error::UnsupportedCombination(
                "SVG output cannot embed a raster logo".to_string(),
            ));
        }

        tracing::debug!(
            payload = %request.payload,
            error_correction = %self.config.error_correction,
            foreground = %request.foreground,
            background = %request.background,
            format = %request.format,
            "Generating QR code"
        );

        let symbol = self
            .encoder
            .encode(&request.payload, self.config.error_correction)?;

        ensure_output_dir(&request.output_dir)?;

        let file_name = naming::artifact_file_name(&request.payload, timestamp, request.format);
        let path = request.output_dir.join(file_name);
        let style = RenderStyle {
            scale: self.config.scale,
            border: self.config.border,
            foreground: request.foreground,
            background: request.background,
        };

        match (request.format, self.config.logo.as_deref()) {
            (OutputFormat::Vector, _) => {
                symbol.save_vector(&path, &style)?;
            }
            (OutputFormat::Raster, None) => {
                symbol.save_raster(&path, &style, self.config.dpi)?;
            }
            (OutputFormat::Raster, Some(logo)) => {
                symbol.save_raster(&path, &style, self.config.dpi)?;
                embed_logo(
                    &path,
                    logo,
                    request.logo_position_divisor,
                    request.logo_relative_size,
                    Some(self.config.dpi),
                )?;
            }
        }

        tracing::info!(path = %path.display(), format = %request.format, "QR code written");
        Ok(path)
    }

    fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        match &self.dispatch {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, f),
            None => f(),
        }
    }
}

/// Create `dir` (and parents) unless it already exists.
fn ensure_output_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        tracing::debug!(dir = %dir.display(), "Output directory already exists");
        return Ok(());
    }
    fs::create_dir_all(dir)?;
    tracing::info!(dir = %dir.display(), "Created output directory");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }

        fn dispatch(&self) -> Dispatch {
            let sink = self.clone();
            let subscriber = tracing_subscriber::fmt()
                .with_writer(move || sink.clone())
                .with_ansi(false)
                .with_max_level(tracing::Level::DEBUG)
                .finish();
            Dispatch::new(subscriber)
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct FailingEncoder;

    impl Encoder for FailingEncoder {
        type Symbol = crate::qr::QrSymbol;

        fn encode(&self, _payload: &str, _level: ErrorCorrection) -> Result<Self::Symbol> {
            Err(Error::QrEncode("data too long".to_string()))
        }
    }

    fn config(logo: Option<PathBuf>) -> GeneratorConfig {
        GeneratorConfig::new("h", 4, 4, 300, logo).expect("valid config")
    }

    #[test]
    fn test_config_normalizes_level() {
        let config = config(None);
        assert_eq!(config.error_correction(), ErrorCorrection::H);
        assert_eq!(config.scale(), 4);
        assert_eq!(config.border(), 4);
        assert_eq!(config.dpi(), 300);
        assert!(config.logo().is_none());
    }

    #[test]
    fn test_config_rejects_invalid_fields() {
        for result in [
            GeneratorConfig::new("Z", 4, 4, 300, None),
            GeneratorConfig::new("", 4, 4, 300, None),
            GeneratorConfig::new("M", 0, 4, 300, None),
            GeneratorConfig::new("M", 4, 4, 0, None),
            GeneratorConfig::new("M", 4, 4, 300, Some(PathBuf::new())),
        ] {
            assert!(matches!(result, Err(Error::Config(_))), "{result:?}");
        }
        assert!(GeneratorConfig::new("M", 4, 0, 300, None).is_ok());
    }

    #[test]
    fn test_request_defaults() {
        let request = RenderRequest::new("https://example.com");
        assert_eq!(request.format, OutputFormat::Raster);
        assert_eq!(request.foreground, Color::BLACK);
        assert_eq!(request.background, Color::WHITE);
        assert_eq!(request.output_dir, PathBuf::from("./output_qr_codes"));
        assert_eq!(request.logo_relative_size, 0.2);
        assert_eq!(request.logo_position_divisor, 2);
    }

    #[test]
    fn test_request_validation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let generator = QrCodeGenerator::new(config(None));
        let base = RenderRequest::new("payload").with_output_dir(dir.path());

        for request in [
            RenderRequest::new("").with_output_dir(dir.path()),
            base.clone().with_logo_layout(0.0, 2),
            base.clone().with_logo_layout(1.01, 2),
            base.clone().with_logo_layout(f64::INFINITY, 2),
            base.clone().with_logo_layout(0.2, 0),
            base.clone().with_output_dir(""),
        ] {
            let err = generator.generate(&request).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)), "{err:?}");
        }
        assert_eq!(fs::read_dir(dir.path()).expect("read dir").count(), 0);
    }

    #[test]
    fn test_logo_with_vector_is_rejected_before_io() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("never-created");
        let generator = QrCodeGenerator::new(config(Some(PathBuf::from("logo.png"))));

        for payload in ["https://example.com/page", "plain text", "WIFI:S:x;;"] {
            let request = RenderRequest::new(payload)
                .with_format(OutputFormat::Vector)
                .with_output_dir(&out);
            let err = generator.generate(&request).unwrap_err();
            assert!(matches!(err, Error::UnsupportedCombination(_)), "{err:?}");
        }
        assert!(!out.exists());
    }

    #[test]
    fn test_encoder_error_propagates_unchanged() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("out");
        let generator = QrCodeGenerator::with_parts(config(None), FailingEncoder, None);

        let err = generator
            .generate(&RenderRequest::new("https://example.com").with_output_dir(&out))
            .unwrap_err();

        match err {
            Error::QrEncode(message) => assert_eq!(message, "data too long"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!out.exists());
    }

    #[test]
    fn test_injected_dispatch_receives_logs() {
        let logs = CapturedLogs::default();
        let dir = tempfile::tempdir().expect("tempdir");
        let generator =
            QrCodeGenerator::with_parts(config(None), QrEncoder::new(), Some(logs.dispatch()));

        let output = logs.contents();
        assert!(output.contains("QR code generator initialized"), "{output}");
        assert!(output.contains("error_correction=H"), "{output}");
        assert!(output.contains("dpi=300"), "{output}");

        generator
            .generate(&RenderRequest::new("https://example.com").with_output_dir(dir.path()))
            .expect("generate");
        let output = logs.contents();
        assert!(output.contains("Output directory already exists"), "{output}");
        assert!(output.contains("QR code written"), "{output}");
    }

    #[test]
    fn test_failures_are_logged() {
        let logs = CapturedLogs::default();
        let generator = QrCodeGenerator::with_parts(
            config(Some(PathBuf::from("logo.png"))),
            QrEncoder::new(),
            Some(logs.dispatch()),
        );

        let _ = generator
            .generate(&RenderRequest::new("https://example.com").with_format(OutputFormat::Vector));

        let output = logs.contents();
        assert!(output.contains("QR code generation failed"), "{output}");
        assert!(output.contains("Unsupported combination"), "{output}");
    }

    #[test]
    fn test_missing_logo_fails_whole_operation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let generator =
            QrCodeGenerator::new(config(Some(dir.path().join("does-not-exist.png"))));

        let err = generator
            .generate(&RenderRequest::new("https://example.com").with_output_dir(dir.path()))
            .unwrap_err();
        assert!(matches!(err, Error::Image(_)), "{err:?}");
    }
}

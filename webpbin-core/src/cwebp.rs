//! WebP encoding through `cwebp`.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use image::DynamicImage;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use crate::adapter::{stage_input, stage_output, Input, Output, Staging};
use crate::error::{Result, WebpError};
use crate::options::{check_range, push_flag, push_value, Crop, LogLevel, Resize};
use crate::process::BinWrapper;
use crate::provision::Tool;

// =============================================================================
// Options
// =============================================================================

/// Metadata chunks copied from the source into the WebP file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataKind {
    All,
    None,
    Exif,
    Icc,
    Xmp,
}

impl MetadataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::None => "none",
            Self::Exif => "exif",
            Self::Icc => "icc",
            Self::Xmp => "xmp",
        }
    }
}

impl fmt::Display for MetadataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetadataKind {
    type Err = WebpError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "none" => Ok(Self::None),
            "exif" => Ok(Self::Exif),
            "icc" => Ok(Self::Icc),
            "xmp" => Ok(Self::Xmp),
            other => Err(WebpError::InvalidOption(format!(
                "unknown metadata kind '{other}'"
            ))),
        }
    }
}

/// Encoder settings. Unset options leave the tool's defaults in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodeOptions {
    /// Lossy quality factor, or compression effort in lossless mode (0-100).
    pub quality: Option<f32>,
    /// Alpha-channel quality (0-100).
    pub alpha_quality: Option<u8>,
    /// Speed/size trade-off (0 = fastest, 6 = smallest).
    pub method: Option<u8>,
    pub lossless: bool,
    /// Near-lossless preprocessing level (0-100, 100 is off).
    pub near_lossless: Option<u8>,
    /// Keep RGB values under fully transparent pixels.
    pub exact: bool,
    pub sharp_yuv: bool,
    pub multithread: bool,
    pub crop: Option<Crop>,
    pub resize: Option<Resize>,
    pub metadata: Vec<MetadataKind>,
    pub log_level: LogLevel,
}

impl EncodeOptions {
    /// Checks every set value against the range the tool accepts.
    pub fn validate(&self) -> Result<()> {
        if let Some(quality) = self.quality {
            check_range("quality", quality, 100.0)?;
        }
        if let Some(alpha) = self.alpha_quality {
            check_range("alpha quality", f32::from(alpha), 100.0)?;
        }
        if let Some(method) = self.method {
            check_range("method", f32::from(method), 6.0)?;
        }
        if let Some(level) = self.near_lossless {
            check_range("near-lossless level", f32::from(level), 100.0)?;
        }
        if let Some(crop) = &self.crop {
            crop.validate()?;
        }
        if let Some(resize) = &self.resize {
            resize.validate()?;
        }
        Ok(())
    }

    /// Option flags in the order the tool documents them, without the
    /// input and output arguments.
    pub fn to_args(&self) -> Vec<OsString> {
        let mut args = Vec::new();
        if let Some(quality) = self.quality {
            push_value(&mut args, "-q", quality);
        }
        if let Some(alpha) = self.alpha_quality {
            push_value(&mut args, "-alpha_q", alpha);
        }
        if let Some(method) = self.method {
            push_value(&mut args, "-m", method);
        }
        if self.lossless {
            push_flag(&mut args, "-lossless");
        }
        if let Some(level) = self.near_lossless {
            push_value(&mut args, "-near_lossless", level);
        }
        if self.exact {
            push_flag(&mut args, "-exact");
        }
        if self.sharp_yuv {
            push_flag(&mut args, "-sharp_yuv");
        }
        if self.multithread {
            push_flag(&mut args, "-mt");
        }
        if let Some(crop) = &self.crop {
            crop.push_args(&mut args);
        }
        if let Some(resize) = &self.resize {
            resize.push_args(&mut args);
        }
        if !self.metadata.is_empty() {
            let kinds: Vec<&str> = self.metadata.iter().map(MetadataKind::as_str).collect();
            push_value(&mut args, "-metadata", kinds.join(","));
        }
        self.log_level.push_args(&mut args);
        args
    }
}

// =============================================================================
// Encoder
// =============================================================================

/// Configurable `cwebp` invocation.
///
/// File and image inputs and file outputs survive a run, so the same
/// encoder can be run again. Streams are consumed and must be supplied anew.
///
/// ```ignore
/// let mut encoder = CWebP::new(BinWrapper::from_env());
/// encoder
///     .quality(80.0)
///     .input_file("photo.jpg")
///     .output_file("photo.webp");
/// encoder.run().await?;
/// ```
#[derive(Debug)]
pub struct CWebP {
    bin: BinWrapper,
    options: EncodeOptions,
    input: Option<Input>,
    output: Option<Output>,
    staging: Staging,
}

impl CWebP {
    pub fn new(bin: BinWrapper) -> Self {
        Self {
            bin,
            options: EncodeOptions::default(),
            input: None,
            output: None,
            staging: Staging::Pipe,
        }
    }

    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: EncodeOptions) -> &mut Self {
        self.options = options;
        self
    }

    pub fn quality(&mut self, quality: f32) -> &mut Self {
        self.options.quality = Some(quality);
        self
    }

    pub fn alpha_quality(&mut self, quality: u8) -> &mut Self {
        self.options.alpha_quality = Some(quality);
        self
    }

    pub fn method(&mut self, method: u8) -> &mut Self {
        self.options.method = Some(method);
        self
    }

    pub fn lossless(&mut self, lossless: bool) -> &mut Self {
        self.options.lossless = lossless;
        self
    }

    pub fn near_lossless(&mut self, level: u8) -> &mut Self {
        self.options.near_lossless = Some(level);
        self
    }

    pub fn exact(&mut self, exact: bool) -> &mut Self {
        self.options.exact = exact;
        self
    }

    pub fn sharp_yuv(&mut self, sharp_yuv: bool) -> &mut Self {
        self.options.sharp_yuv = sharp_yuv;
        self
    }

    pub fn multithread(&mut self, multithread: bool) -> &mut Self {
        self.options.multithread = multithread;
        self
    }

    pub fn crop(&mut self, x: u32, y: u32, width: u32, height: u32) -> &mut Self {
        self.options.crop = Some(Crop::new(x, y, width, height));
        self
    }

    pub fn resize(&mut self, width: u32, height: u32) -> &mut Self {
        self.options.resize = Some(Resize::new(width, height));
        self
    }

    /// Adds a metadata kind to copy. Duplicates are ignored.
    pub fn metadata(&mut self, kind: MetadataKind) -> &mut Self {
        if !self.options.metadata.contains(&kind) {
            self.options.metadata.push(kind);
        }
        self
    }

    pub fn log_level(&mut self, level: LogLevel) -> &mut Self {
        self.options.log_level = level;
        self
    }

    pub fn quiet(&mut self) -> &mut Self {
        self.log_level(LogLevel::Quiet)
    }

    pub fn verbose(&mut self) -> &mut Self {
        self.log_level(LogLevel::Verbose)
    }

    pub fn staging(&mut self, staging: Staging) -> &mut Self {
        self.staging = staging;
        self
    }

    pub fn input_file(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.input = Some(Input::File(path.into()));
        self
    }

    /// Reads encoded image bytes (PNG, JPEG, TIFF, WebP) from a stream.
    pub fn input<R>(&mut self, reader: R) -> &mut Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        self.input = Some(Input::Reader(Box::new(reader)));
        self
    }

    pub fn input_image(&mut self, image: DynamicImage) -> &mut Self {
        self.input = Some(Input::Image(image));
        self
    }

    pub fn output_file(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.output = Some(Output::File(path.into()));
        self
    }

    pub fn output<W>(&mut self, writer: W) -> &mut Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        self.output = Some(Output::Writer(Box::new(writer)));
        self
    }

    /// Full argument list for the given input and output arguments.
    pub fn command_args(&self, input_arg: &OsStr, output_arg: &OsStr) -> Vec<OsString> {
        let mut args = self.options.to_args();
        args.push("-o".into());
        args.push(output_arg.to_os_string());
        args.push("--".into());
        args.push(input_arg.to_os_string());
        args
    }

    /// Encodes the configured input into the configured output.
    ///
    /// # Errors
    ///
    /// - [`WebpError::InvalidOption`] if an option is out of range.
    /// - [`WebpError::MissingInput`] / [`WebpError::MissingOutput`] if either
    ///   side is unset or was a stream consumed by an earlier run.
    /// - [`WebpError::Invocation`] if `cwebp` exits with a non-zero status.
    pub async fn run(&mut self) -> Result<()> {
        self.options.validate()?;
        let Some(input) = self.input.take() else {
            return Err(WebpError::MissingInput);
        };
        let Some(output) = self.output.take() else {
            self.input = Some(input);
            return Err(WebpError::MissingOutput);
        };
        self.input = input.try_clone();
        self.output = output.try_clone();

        let mut staged_input = stage_input(input, self.staging).await?;
        let staged_output = stage_output(output, self.staging, ".webp")?;
        let args = self.command_args(staged_input.arg(), &staged_output.arg());

        let result = self
            .bin
            .run(Tool::Cwebp, &args, staged_input.take_stdin())
            .await?;
        staged_output.deliver(&result.stdout).await?;

        if !result.stderr.is_empty() {
            debug!("cwebp: {}", result.stderr.trim());
        }
        info!("Encoded WebP image");
        Ok(())
    }

    /// Version string of the resolved `cwebp`.
    pub async fn version(&self) -> Result<String> {
        self.bin.version(Tool::Cwebp).await
    }
}

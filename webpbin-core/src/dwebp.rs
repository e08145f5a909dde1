//! WebP decoding through `dwebp`.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use image::DynamicImage;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use crate::adapter::{stage_input, stage_output, temp_path, Input, Output, Staging};
use crate::error::{Result, WebpError};
use crate::options::{push_flag, Crop, LogLevel, Resize};
use crate::process::BinWrapper;
use crate::provision::Tool;

/// Image format written by the decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DecodeFormat {
    #[default]
    Png,
    Pam,
    Ppm,
    Bmp,
    Tiff,
    Pgm,
    Yuv,
}

impl DecodeFormat {
    pub fn all() -> &'static [DecodeFormat] {
        &[
            Self::Png,
            Self::Pam,
            Self::Ppm,
            Self::Bmp,
            Self::Tiff,
            Self::Pgm,
            Self::Yuv,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Pam => "pam",
            Self::Ppm => "ppm",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
            Self::Pgm => "pgm",
            Self::Yuv => "yuv",
        }
    }

    /// Selector flag; PNG is what `dwebp` writes without one.
    pub fn flag(&self) -> Option<&'static str> {
        match self {
            Self::Png => None,
            Self::Pam => Some("-pam"),
            Self::Ppm => Some("-ppm"),
            Self::Bmp => Some("-bmp"),
            Self::Tiff => Some("-tiff"),
            Self::Pgm => Some("-pgm"),
            Self::Yuv => Some("-yuv"),
        }
    }

    /// File extension including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => ".png",
            Self::Pam => ".pam",
            Self::Ppm => ".ppm",
            Self::Bmp => ".bmp",
            Self::Tiff => ".tiff",
            Self::Pgm => ".pgm",
            Self::Yuv => ".yuv",
        }
    }
}

impl fmt::Display for DecodeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DecodeFormat {
    type Err = WebpError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().trim_start_matches('.').to_ascii_lowercase();
        let wanted = if wanted == "tif" { "tiff".to_string() } else { wanted };
        Self::all()
            .iter()
            .copied()
            .find(|format| format.as_str() == wanted)
            .ok_or_else(|| WebpError::InvalidOption(format!("unknown output format '{s}'")))
    }
}

/// Decoder settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    pub format: DecodeFormat,
    /// Disable fancy upsampling.
    pub no_fancy: bool,
    /// Disable in-loop filtering.
    pub no_filter: bool,
    /// Disable dithering.
    pub no_dither: bool,
    pub multithread: bool,
    pub crop: Option<Crop>,
    pub resize: Option<Resize>,
    /// Flip the decoded image vertically.
    pub flip: bool,
    pub log_level: LogLevel,
}

impl DecodeOptions {
    pub fn validate(&self) -> Result<()> {
        if let Some(crop) = &self.crop {
            crop.validate()?;
        }
        if let Some(resize) = &self.resize {
            resize.validate()?;
        }
        Ok(())
    }

    pub fn to_args(&self) -> Vec<OsString> {
        let mut args = Vec::new();
        if let Some(flag) = self.format.flag() {
            push_flag(&mut args, flag);
        }
        if self.no_fancy {
            push_flag(&mut args, "-nofancy");
        }
        if self.no_filter {
            push_flag(&mut args, "-nofilter");
        }
        if self.no_dither {
            push_flag(&mut args, "-nodither");
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
        if self.flip {
            push_flag(&mut args, "-flip");
        }
        self.log_level.push_args(&mut args);
        args
    }
}

/// Configurable `dwebp` invocation.
///
/// Streams are staged through temporary files by default since older
/// releases cannot read WebP data from stdin.
#[derive(Debug)]
pub struct DWebP {
    bin: BinWrapper,
    options: DecodeOptions,
    input: Option<Input>,
    output: Option<Output>,
    staging: Staging,
}

impl DWebP {
    pub fn new(bin: BinWrapper) -> Self {
        Self {
            bin,
            options: DecodeOptions::default(),
            input: None,
            output: None,
            staging: Staging::TempFile,
        }
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: DecodeOptions) -> &mut Self {
        self.options = options;
        self
    }

    pub fn format(&mut self, format: DecodeFormat) -> &mut Self {
        self.options.format = format;
        self
    }

    pub fn no_fancy(&mut self, no_fancy: bool) -> &mut Self {
        self.options.no_fancy = no_fancy;
        self
    }

    pub fn no_filter(&mut self, no_filter: bool) -> &mut Self {
        self.options.no_filter = no_filter;
        self
    }

    pub fn no_dither(&mut self, no_dither: bool) -> &mut Self {
        self.options.no_dither = no_dither;
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

    pub fn flip(&mut self, flip: bool) -> &mut Self {
        self.options.flip = flip;
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

    /// Reads WebP bytes from a stream.
    pub fn input<R>(&mut self, reader: R) -> &mut Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        self.input = Some(Input::Reader(Box::new(reader)));
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

    pub fn command_args(&self, input_arg: &OsStr, output_arg: &OsStr) -> Vec<OsString> {
        build_args(&self.options, input_arg, output_arg)
    }

    fn take_input(&mut self) -> Result<Input> {
        let input = self.input.take().ok_or(WebpError::MissingInput)?;
        self.input = input.try_clone();
        Ok(input)
    }

    /// Decodes the configured input into the configured output.
    pub async fn run(&mut self) -> Result<()> {
        self.options.validate()?;
        if self.input.is_none() {
            return Err(WebpError::MissingInput);
        }
        let output = self.output.take().ok_or(WebpError::MissingOutput)?;
        self.output = output.try_clone();
        let input = self.take_input()?;

        let mut staged_input = stage_input(input, self.staging).await?;
        let staged_output = stage_output(output, self.staging, self.options.format.extension())?;
        let args = self.command_args(staged_input.arg(), &staged_output.arg());

        let result = self
            .bin
            .run(Tool::Dwebp, &args, staged_input.take_stdin())
            .await?;
        staged_output.deliver(&result.stdout).await?;

        info!("Decoded WebP image as {}", self.options.format);
        Ok(())
    }

    /// Decodes the configured input into memory, ignoring the configured
    /// output and format.
    pub async fn decode_image(&mut self) -> Result<DynamicImage> {
        self.options.validate()?;
        let input = self.take_input()?;

        let mut staged_input = stage_input(input, self.staging).await?;
        let temp = temp_path(DecodeFormat::Png.extension())?;
        let options = DecodeOptions {
            format: DecodeFormat::Png,
            ..self.options.clone()
        };
        let args = build_args(&options, staged_input.arg(), temp.as_os_str());

        self.bin
            .run(Tool::Dwebp, &args, staged_input.take_stdin())
            .await?;

        let bytes = tokio::fs::read(&temp).await?;
        debug!("Loading {}-byte PNG from {}", bytes.len(), temp.display());
        Ok(image::load_from_memory(&bytes)?)
    }

    /// Version string of the resolved `dwebp`.
    pub async fn version(&self) -> Result<String> {
        self.bin.version(Tool::Dwebp).await
    }
}

fn build_args(options: &DecodeOptions, input_arg: &OsStr, output_arg: &OsStr) -> Vec<OsString> {
    let mut args = options.to_args();
    args.push("-o".into());
    args.push(output_arg.to_os_string());
    args.push("--".into());
    args.push(input_arg.to_os_string());
    args
}

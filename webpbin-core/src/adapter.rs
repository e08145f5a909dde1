//! Input/output staging for tool invocations.
//!
//! Callers hand over a file path, a byte stream or a decoded image; the tools
//! only understand paths and stdin/stdout. This module turns the former into
//! the latter and delivers the result back to the caller's destination.

use std::ffi::OsString;
use std::fmt;
use std::io::Cursor;
use std::path::PathBuf;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ColorType, DynamicImage};
use tempfile::TempPath;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::Result;

/// Boxed byte source accepted as tool input.
pub type ByteReader = Box<dyn AsyncRead + Send + Unpin>;

/// Boxed byte sink accepted as tool output.
pub type ByteWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Argument telling a tool to use stdin or stdout.
const STDIO_ARG: &str = "-";

// =============================================================================
// Sources and destinations
// =============================================================================

/// Where a tool reads its image from.
pub enum Input {
    /// Passed through unchanged.
    File(PathBuf),
    /// Consumed by the invocation that uses it.
    Reader(ByteReader),
    /// Serialized to a lossless PNG intermediate before invocation.
    Image(DynamicImage),
}

impl Input {
    /// Returns a copy for the next invocation. Streams cannot be replayed.
    pub fn try_clone(&self) -> Option<Input> {
        match self {
            Self::File(path) => Some(Self::File(path.clone())),
            Self::Image(image) => Some(Self::Image(image.clone())),
            Self::Reader(_) => None,
        }
    }
}

impl fmt::Debug for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Reader(_) => f.write_str("Reader(..)"),
            Self::Image(image) => write!(f, "Image({}x{})", image.width(), image.height()),
        }
    }
}

/// Where a tool writes its result to.
pub enum Output {
    /// Passed through unchanged.
    File(PathBuf),
    /// Consumed by the invocation that uses it.
    Writer(ByteWriter),
}

impl Output {
    /// Returns a copy for the next invocation. Streams cannot be replayed.
    pub fn try_clone(&self) -> Option<Output> {
        match self {
            Self::File(path) => Some(Self::File(path.clone())),
            Self::Writer(_) => None,
        }
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Writer(_) => f.write_str("Writer(..)"),
        }
    }
}

/// How streams and in-memory images reach the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staging {
    /// Feed stdin and read stdout.
    Pipe,
    /// Write through temporary files removed after the invocation.
    TempFile,
}

// =============================================================================
// Staged forms
// =============================================================================

/// Input ready to be handed to a tool.
#[derive(Default)]
pub struct StagedInput {
    arg: OsString,
    stdin: Option<ByteReader>,
    temp: Option<TempPath>,
}

impl StagedInput {
    /// Path argument for the tool (`-` for stdin).
    pub fn arg(&self) -> &OsString {
        &self.arg
    }

    /// Stream to feed on stdin, if any. Can only be taken once.
    pub fn take_stdin(&mut self) -> Option<ByteReader> {
        self.stdin.take()
    }

    /// True if a temporary file backs this input.
    pub fn is_temp_file(&self) -> bool {
        self.temp.is_some()
    }
}

/// Output destination ready to be handed to a tool.
pub enum StagedOutput {
    File(PathBuf),
    Stdout(ByteWriter),
    TempFile { temp: TempPath, writer: ByteWriter },
}

impl StagedOutput {
    /// Path argument for the tool (`-` for stdout).
    pub fn arg(&self) -> OsString {
        match self {
            Self::File(path) => path.clone().into_os_string(),
            Self::Stdout(_) => OsString::from(STDIO_ARG),
            Self::TempFile { temp, .. } => temp.as_os_str().to_os_string(),
        }
    }

    /// Copies the tool's result to the caller's destination.
    ///
    /// `stdout` is the captured standard output of the finished tool.
    pub async fn deliver(self, stdout: &[u8]) -> Result<()> {
        match self {
            Self::File(path) => {
                debug!("Output written to {}", path.display());
            }
            Self::Stdout(mut writer) => {
                writer.write_all(stdout).await?;
                writer.flush().await?;
                debug!("Delivered {} bytes from stdout", stdout.len());
            }
            Self::TempFile { temp, mut writer } => {
                let mut file = tokio::fs::File::open(&temp).await?;
                let bytes = tokio::io::copy(&mut file, &mut writer).await?;
                writer.flush().await?;
                debug!("Delivered {} bytes from {}", bytes, temp.display());
            }
        }
        Ok(())
    }
}

// =============================================================================
// Staging
// =============================================================================

/// Prepares `input` for a tool invocation.
pub async fn stage_input(input: Input, staging: Staging) -> Result<StagedInput> {
    match (input, staging) {
        (Input::File(path), _) => Ok(StagedInput {
            arg: path.into_os_string(),
            ..Default::default()
        }),
        (Input::Reader(reader), Staging::Pipe) => Ok(StagedInput {
            arg: OsString::from(STDIO_ARG),
            stdin: Some(reader),
            temp: None,
        }),
        (Input::Reader(mut reader), Staging::TempFile) => {
            let temp = temp_path(".in")?;
            let mut file = tokio::fs::File::create(&temp).await?;
            let bytes = tokio::io::copy(&mut reader, &mut file).await?;
            file.flush().await?;
            debug!("Staged {} input bytes in {}", bytes, temp.display());
            Ok(StagedInput {
                arg: temp.as_os_str().to_os_string(),
                stdin: None,
                temp: Some(temp),
            })
        }
        (Input::Image(image), Staging::Pipe) => {
            let png = encode_png(&image)?;
            Ok(StagedInput {
                arg: OsString::from(STDIO_ARG),
                stdin: Some(Box::new(Cursor::new(png))),
                temp: None,
            })
        }
        (Input::Image(image), Staging::TempFile) => {
            let png = encode_png(&image)?;
            let temp = temp_path(".png")?;
            tokio::fs::write(&temp, &png).await?;
            debug!("Staged {}-byte PNG in {}", png.len(), temp.display());
            Ok(StagedInput {
                arg: temp.as_os_str().to_os_string(),
                stdin: None,
                temp: Some(temp),
            })
        }
    }
}

/// Prepares `output` for a tool invocation. `suffix` names temporary files.
pub fn stage_output(output: Output, staging: Staging, suffix: &str) -> Result<StagedOutput> {
    Ok(match (output, staging) {
        (Output::File(path), _) => StagedOutput::File(path),
        (Output::Writer(writer), Staging::Pipe) => StagedOutput::Stdout(writer),
        (Output::Writer(writer), Staging::TempFile) => StagedOutput::TempFile {
            temp: temp_path(suffix)?,
            writer,
        },
    })
}

/// Creates a named temporary file and returns its path. The file is removed
/// when the path is dropped.
pub(crate) fn temp_path(suffix: &str) -> Result<TempPath> {
    let file = tempfile::Builder::new()
        .prefix("webpbin-")
        .suffix(suffix)
        .tempfile()?;
    Ok(file.into_temp_path())
}

/// Serializes an image as an uncompressed, unfiltered (lossless) PNG.
///
/// Float images are converted to 8-bit RGBA first since PNG cannot hold them.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let converted;
    let image = match image.color() {
        ColorType::L8
        | ColorType::La8
        | ColorType::Rgb8
        | ColorType::Rgba8
        | ColorType::L16
        | ColorType::La16
        | ColorType::Rgb16
        | ColorType::Rgba16 => image,
        _ => {
            converted = DynamicImage::ImageRgba8(image.to_rgba8());
            &converted
        }
    };

    let mut buffer = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut buffer, CompressionType::Uncompressed, FilterType::NoFilter);
    image.write_with_encoder(encoder)?;
    Ok(buffer)
}

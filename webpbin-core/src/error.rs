//! Error types for webpbin.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while provisioning or invoking the libwebp tools.
#[derive(Debug, Error)]
pub enum WebpError {
    /// No prebuilt archive is known for this platform/version combination.
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// The archive could not be fetched.
    #[error("Download failed for {url}: {reason}")]
    Download { url: String, reason: String },

    /// The downloaded archive could not be unpacked.
    #[error("Failed to extract {}: {reason}", path.display())]
    Extraction { path: PathBuf, reason: String },

    /// The tool ran but exited with a non-zero status.
    #[error("{tool} failed (exit code {}): {stderr}", code.map(|c| c.to_string()).unwrap_or_else(|| "none".into()))]
    Invocation {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The tool could not be started at all.
    #[error("Failed to start {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("No input configured")]
    MissingInput,

    #[error("No output configured")]
    MissingOutput,

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl WebpError {
    pub(crate) fn download(url: &str, reason: impl ToString) -> Self {
        Self::Download {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn extraction(path: &std::path::Path, reason: impl ToString) -> Self {
        Self::Extraction {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WebpError>;

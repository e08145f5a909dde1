//! Webpbin Core Library
//!
//! Drives the libwebp command-line tools from Rust. It includes:
//!
//! - Provisioning of prebuilt `cwebp`/`dwebp` binaries into a per-release cache
//! - Configuration from code or the `SKIP_DOWNLOAD`, `VENDOR_PATH` and
//!   `LIBWEBP_VERSION` environment variables
//! - Process execution with stdin feeding and captured output
//! - Input/output staging for files, byte streams and in-memory images
//! - Option builders for encoding (`CWebP`) and decoding (`DWebP`)

pub mod adapter;
pub mod config;
pub mod cwebp;
pub mod dwebp;
pub mod error;
pub mod options;
pub mod process;
pub mod provision;

#[cfg(test)]
mod test_support;

pub use adapter::{encode_png, ByteReader, ByteWriter, Input, Output, Staging};
pub use config::{BinaryConfig, DEFAULT_BASE_URL, DEFAULT_LIBWEBP_VERSION};
pub use cwebp::{CWebP, EncodeOptions, MetadataKind};
pub use dwebp::{DWebP, DecodeFormat, DecodeOptions};
pub use error::{Result, WebpError};
pub use options::{Crop, LogLevel, Resize};
pub use process::{BinWrapper, ProcessOutput};
pub use provision::{
    BinLocation, DownloadProgress, InstallManifest, Platform, Provisioner, Tool,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! On-demand provisioning of the libwebp command-line tools.
//!
//! Prebuilt `cwebp`/`dwebp` binaries are fetched from the libwebp release
//! bucket the first time they are needed and cached per release under the
//! user's cache directory.
//!
//! # Architecture
//!
//! - `types`: Core types (Tool, Os, Arch, Platform, ArchiveFormat)
//! - `paths`: Cache-directory path resolution
//! - `catalog`: Static (OS, arch) -> archive table
//! - `manifest`: JSON install record
//! - `downloader`: Async file download with progress reporting
//! - `extractor`: Archive extraction (zip, tar.gz) with path stripping
//! - `provisioner`: High-level API tying the pieces together
//!
//! # Example
//!
//! ```ignore
//! use webpbin_core::{BinaryConfig, Provisioner};
//!
//! let provisioner = Provisioner::new(BinaryConfig::from_env());
//! let location = provisioner.ensure_installed(|progress| {
//!     if let Some(percent) = progress.percent {
//!         println!("Progress: {:.1}%", percent);
//!     }
//! }).await?;
//! ```

pub mod catalog;
pub mod downloader;
pub mod extractor;
pub mod manifest;
pub mod paths;
pub mod provisioner;
pub mod types;

pub use catalog::{all_archives, find_archive, ArchiveEntry, STRIP_COMPONENTS};
pub use downloader::DownloadProgress;
pub use manifest::InstallManifest;
pub use provisioner::{BinLocation, Provisioner};
pub use types::{Arch, ArchiveFormat, Os, Platform, Tool};

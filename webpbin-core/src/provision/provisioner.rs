//! Binary provisioner coordinating lookup, download and extraction.
//!
//! The `Provisioner` is the entry point for making the libwebp tools
//! available. It ties together the catalog, downloader, extractor and install
//! record.

use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::catalog::{self, ArchiveEntry, STRIP_COMPONENTS};
use super::downloader::{self, download_file, DownloadProgress};
use super::extractor::{extract_archive, make_executable};
use super::manifest::{load_manifest_from, save_manifest_to, InstallManifest};
use super::paths;
use super::types::{Platform, Tool};
use crate::config::BinaryConfig;
use crate::error::{Result, WebpError};

// ============================================================================
// Binary Location
// ============================================================================

/// Where the tools are run from once provisioning has finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinLocation {
    /// The tools live in this directory.
    Directory(PathBuf),
    /// Downloading was skipped; the tools are resolved through PATH.
    SystemPath,
}

// ============================================================================
// Provisioner
// ============================================================================

/// Ensures the libwebp tools for one configured release are present.
#[derive(Debug, Clone)]
pub struct Provisioner {
    config: BinaryConfig,
    /// Target platform, `None` when the host is not recognised.
    platform: Option<Platform>,
}

impl Provisioner {
    /// Creates a provisioner for the host platform.
    pub fn new(config: BinaryConfig) -> Self {
        Self::for_platform(config, Platform::detect())
    }

    /// Creates a provisioner for an explicit platform.
    pub fn for_platform(config: BinaryConfig, platform: Option<Platform>) -> Self {
        Self { config, platform }
    }

    pub fn config(&self) -> &BinaryConfig {
        &self.config
    }

    pub fn platform(&self) -> Option<Platform> {
        self.platform
    }

    /// Directory the tools are installed to and run from.
    pub fn bin_dir(&self) -> PathBuf {
        self.config.bin_dir()
    }

    /// Returns true when no download should be attempted.
    pub fn should_skip_download(&self) -> bool {
        self.config.skip_download
            || self
                .platform
                .is_some_and(|platform| platform.arch.is_known_unsupported())
    }

    /// Resolves the archive URL for the configured release.
    pub fn download_url(&self) -> Result<String> {
        self.resolve().map(|(url, _)| url)
    }

    fn resolve(&self) -> Result<(String, &'static ArchiveEntry)> {
        let platform = self.platform.ok_or_else(|| {
            WebpError::UnsupportedPlatform(format!(
                "unrecognised host {}/{}",
                std::env::consts::OS,
                std::env::consts::ARCH
            ))
        })?;
        catalog::resolve(&self.config.base_url, &self.config.version, platform)
    }

    /// Path used to invoke `tool`.
    ///
    /// In skip mode without a vendor path this is the bare tool name so the
    /// OS resolves it through PATH.
    pub fn executable_path(&self, tool: Tool) -> PathBuf {
        if self.should_skip_download() && self.config.vendor_path.is_none() {
            PathBuf::from(tool.as_str())
        } else {
            self.bin_dir()
                .join(tool.executable_name(self.platform.map(|p| p.os)))
        }
    }

    /// Returns true if every tool executable is present in the binary
    /// directory.
    pub fn is_installed(&self) -> bool {
        let bin_dir = self.bin_dir();
        let os = self.platform.map(|p| p.os);
        Tool::all()
            .iter()
            .all(|tool| bin_dir.join(tool.executable_name(os)).is_file())
    }

    /// Reads the install record of the binary directory, if any.
    pub fn install_manifest(&self) -> Result<Option<InstallManifest>> {
        load_manifest_from(&paths::manifest_path(&self.bin_dir()))
    }

    // ========================================================================
    // Installation
    // ========================================================================

    /// Makes the tools available, downloading them if needed.
    ///
    /// Performs no network activity when downloading is skipped or the
    /// binary directory already holds the tools.
    pub async fn ensure_installed<F>(&self, progress_cb: F) -> Result<BinLocation>
    where
        F: Fn(DownloadProgress),
    {
        if self.should_skip_download() {
            return Ok(match &self.config.vendor_path {
                Some(dir) => {
                    info!("Download skipped, using libwebp tools in {}", dir.display());
                    BinLocation::Directory(dir.clone())
                }
                None => {
                    info!("Download skipped, using libwebp tools from PATH");
                    BinLocation::SystemPath
                }
            });
        }

        let bin_dir = self.bin_dir();
        if self.is_installed() {
            debug!("libwebp tools already present in {}", bin_dir.display());
            return Ok(BinLocation::Directory(bin_dir));
        }

        self.install(progress_cb).await?;
        Ok(BinLocation::Directory(bin_dir))
    }

    /// Downloads and extracts the configured release into the binary
    /// directory, replacing whatever tools are there.
    pub async fn install<F>(&self, progress_cb: F) -> Result<()>
    where
        F: Fn(DownloadProgress),
    {
        let (url, entry) = self.resolve()?;
        let allowed_host = downloader::host_of(&self.config.base_url)?;
        let bin_dir = self.bin_dir();

        info!(
            "Installing libwebp {} for {} into {}",
            self.config.version,
            entry.platform(),
            bin_dir.display()
        );

        paths::ensure_dir_exists(&bin_dir)?;

        let archive_path = bin_dir.join(format!(".{}", entry.file_name(&self.config.version)));
        let bytes_downloaded = download_file(&url, &archive_path, &allowed_host, progress_cb).await?;

        let extracted = extract_archive(&archive_path, &bin_dir, entry.format, STRIP_COMPONENTS);

        if let Err(e) = tokio::fs::remove_file(&archive_path).await {
            warn!("Failed to clean up archive: {}", e);
        }
        extracted?;

        for tool in Tool::all() {
            let exec_path = bin_dir.join(tool.executable_name(Some(entry.os)));
            if !exec_path.is_file() {
                return Err(WebpError::extraction(
                    &archive_path,
                    format!("archive did not contain {}", tool),
                ));
            }
            make_executable(&exec_path)?;
        }

        let manifest = InstallManifest::new(&self.config.version, url, bytes_downloaded);
        save_manifest_to(&manifest, &paths::manifest_path(&bin_dir))?;

        info!("libwebp {} installed successfully", self.config.version);
        Ok(())
    }
}

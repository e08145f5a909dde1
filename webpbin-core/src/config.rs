//! Provisioning configuration.
//!
//! A [`BinaryConfig`] selects which libwebp release is used, where its
//! binaries live, and whether they may be downloaded. It replaces
//! process-wide settings: every [`BinWrapper`](crate::BinWrapper) owns one.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use crate::provision::paths;
use crate::provision::types::{host_is_minimal_distro, Arch};

// =============================================================================
// Defaults
// =============================================================================

/// libwebp release used when nothing else is configured.
pub const DEFAULT_LIBWEBP_VERSION: &str = "1.4.0";

/// Release bucket the prebuilt archives are fetched from.
pub const DEFAULT_BASE_URL: &str =
    "https://storage.googleapis.com/downloads.webmproject.org/releases/webp/";

/// Set to `true` to never download and use the tools found on PATH.
pub const ENV_SKIP_DOWNLOAD: &str = "SKIP_DOWNLOAD";
/// Overrides the directory the binaries are installed to and run from.
pub const ENV_VENDOR_PATH: &str = "VENDOR_PATH";
/// Overrides the libwebp release.
pub const ENV_LIBWEBP_VERSION: &str = "LIBWEBP_VERSION";

// =============================================================================
// BinaryConfig
// =============================================================================

/// Settings for locating (and if needed downloading) the libwebp tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinaryConfig {
    /// libwebp release, e.g. `1.4.0`.
    pub version: String,
    /// Explicit binary directory. Replaces the versioned cache directory.
    pub vendor_path: Option<PathBuf>,
    /// Never download; run the tools by bare name from PATH.
    pub skip_download: bool,
    /// Base URL the archive file name is appended to.
    pub base_url: String,
}

impl Default for BinaryConfig {
    fn default() -> Self {
        Self {
            version: DEFAULT_LIBWEBP_VERSION.to_string(),
            vendor_path: None,
            skip_download: false,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl BinaryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a config from defaults overlaid with the process environment.
    pub fn from_env() -> Self {
        Self::default().apply_env(|key| std::env::var(key).ok())
    }

    /// Overlays environment values obtained through `lookup`.
    ///
    /// Empty values are ignored. `SKIP_DOWNLOAD` only ever turns skipping on.
    pub fn apply_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if lookup(ENV_SKIP_DOWNLOAD).as_deref() == Some("true") {
            self.skip_download = true;
        }

        if let Some(path) = lookup(ENV_VENDOR_PATH).filter(|p| !p.is_empty()) {
            self.vendor_path = Some(PathBuf::from(path));
        }

        if let Some(version) = lookup(ENV_LIBWEBP_VERSION).filter(|v| !v.is_empty()) {
            self.version = version;
        }

        debug!(?self, "Applied environment to binary config");
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_vendor_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.vendor_path = Some(path.into());
        self
    }

    pub fn with_skip_download(mut self, skip: bool) -> Self {
        self.skip_download = skip;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Turns on `skip_download` on hosts without usable prebuilt tools
    /// (32-bit ARM, Alpine). Tools there must be built and put on PATH.
    pub fn detect_unsupported_platforms(mut self) -> Self {
        let arm = Arch::current().is_some_and(|arch| arch.is_known_unsupported());
        if arm || host_is_minimal_distro() {
            debug!("Prebuilt libwebp tools unusable on this host, skipping download");
            self.skip_download = true;
        }
        self
    }

    /// Directory the binaries are expected in.
    pub fn bin_dir(&self) -> PathBuf {
        self.vendor_path
            .clone()
            .unwrap_or_else(|| paths::default_bin_dir(&self.version))
    }
}

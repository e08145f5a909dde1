//! Cache-directory path management for the libwebp tools.
//!
//! Downloaded binaries live in a per-version directory under the user's cache
//! location:
//!
//! - Linux/macOS: `~/.cache/webp/<version>/bin/`
//! - Windows: `%APPDATA%\webp\<version>\bin\`
//!
//! When neither location can be resolved the OS temp directory is used as
//! the root instead.

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Product directory name under the cache root.
const PRODUCT_DIR: &str = "webp";

/// File name of the install record written next to the binaries.
const MANIFEST_FILE: &str = "install.json";

// ============================================================================
// Path Resolution
// ============================================================================

/// Returns the platform-specific root that holds the product directory.
pub fn cache_root() -> PathBuf {
    #[cfg(windows)]
    let root = dirs::data_dir();

    #[cfg(not(windows))]
    let root = dirs::home_dir().map(|home| home.join(".cache"));

    root.unwrap_or_else(std::env::temp_dir)
}

/// Returns the default binary directory for a libwebp version.
///
/// Path: `{cache_root}/webp/{version}/bin`
pub fn default_bin_dir(version: &str) -> PathBuf {
    bin_dir_under(&cache_root(), version)
}

/// Returns the binary directory for a version below an explicit root.
pub fn bin_dir_under(root: &Path, version: &str) -> PathBuf {
    root.join(PRODUCT_DIR).join(version).join("bin")
}

/// Returns the install record path inside a binary directory.
pub fn manifest_path(bin_dir: &Path) -> PathBuf {
    bin_dir.join(MANIFEST_FILE)
}

/// Creates the binary directory if it is absent.
pub fn ensure_dir_exists(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    Ok(())
}

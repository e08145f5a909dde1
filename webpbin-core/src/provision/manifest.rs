//! Install record persistence.
//!
//! After a successful download an `install.json` is written next to the
//! binaries recording which release was fetched and from where. The record is
//! informational only: whether a download is needed is decided by looking for
//! the executable itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{Result, WebpError};

/// Current schema version for the install record.
const SCHEMA_VERSION: u32 = 1;

/// What was installed into a binary directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallManifest {
    /// Schema version for forward compatibility.
    pub schema_version: u32,
    /// libwebp release string.
    pub version: String,
    /// URL the archive was downloaded from.
    pub source_url: String,
    /// When the archive was installed.
    pub installed_at: DateTime<Utc>,
    /// Size of the downloaded archive in bytes.
    pub archive_bytes: u64,
}

impl InstallManifest {
    pub fn new(version: impl Into<String>, source_url: impl Into<String>, archive_bytes: u64) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            version: version.into(),
            source_url: source_url.into(),
            installed_at: Utc::now(),
            archive_bytes,
        }
    }
}

/// Loads the install record at `path`.
///
/// A missing or unreadable record yields `None`; a corrupted one is logged
/// and treated as missing.
pub fn load_manifest_from(path: &Path) -> Result<Option<InstallManifest>> {
    if !path.exists() {
        debug!("No install record at {}", path.display());
        return Ok(None);
    }

    let content = fs::read_to_string(path)?;

    match serde_json::from_str::<InstallManifest>(&content) {
        Ok(mut manifest) => {
            if manifest.schema_version != SCHEMA_VERSION {
                info!(
                    "Install record schema version {} differs from current {}",
                    manifest.schema_version, SCHEMA_VERSION
                );
                manifest.schema_version = SCHEMA_VERSION;
            }
            Ok(Some(manifest))
        }
        Err(e) => {
            warn!(
                "Failed to parse install record at {}: {}. Ignoring it.",
                path.display(),
                e
            );
            Ok(None)
        }
    }
}

/// Writes the install record to `path`.
pub fn save_manifest_to(manifest: &InstallManifest, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(manifest)
        .map_err(|e| WebpError::Config(format!("failed to serialize install record: {}", e)))?;

    fs::write(path, content)?;

    debug!("Install record saved to {}", path.display());
    Ok(())
}

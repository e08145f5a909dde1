//! Download catalog for prebuilt libwebp archives.
//!
//! The table maps each supported OS/architecture pair to the file-name suffix
//! libwebp uses in its release bucket. Adding a platform means adding a row.

use super::types::{Arch, ArchiveFormat, Os, Platform};
use crate::error::{Result, WebpError};

/// Number of leading path components dropped from archive entries.
///
/// Release archives look like `libwebp-1.4.0-linux-x86-64/bin/cwebp`; dropping
/// two components puts the tools straight into the binary directory.
pub const STRIP_COMPONENTS: usize = 2;

/// A row of the download table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub os: Os,
    pub arch: Arch,
    /// Platform part of the file name, between the version and the extension.
    pub suffix: &'static str,
    pub format: ArchiveFormat,
}

impl ArchiveEntry {
    const fn new(os: Os, arch: Arch, suffix: &'static str, format: ArchiveFormat) -> Self {
        Self {
            os,
            arch,
            suffix,
            format,
        }
    }

    pub fn platform(&self) -> Platform {
        Platform::new(self.os, self.arch)
    }

    /// Archive file name for a release, e.g. `libwebp-1.4.0-mac-arm64.tar.gz`.
    pub fn file_name(&self, version: &str) -> String {
        format!(
            "libwebp-{}-{}{}",
            version,
            self.suffix,
            self.format.extension()
        )
    }
}

// ============================================================================
// Download Table
// ============================================================================

const ARCHIVES: &[ArchiveEntry] = &[
    ArchiveEntry::new(Os::Macos, Arch::Arm64, "mac-arm64", ArchiveFormat::TarGz),
    ArchiveEntry::new(Os::Macos, Arch::X64, "mac-x86-64", ArchiveFormat::TarGz),
    ArchiveEntry::new(Os::Linux, Arch::X86, "linux-x86-32", ArchiveFormat::TarGz),
    ArchiveEntry::new(Os::Linux, Arch::X64, "linux-x86-64", ArchiveFormat::TarGz),
    ArchiveEntry::new(Os::Windows, Arch::X64, "windows-x64", ArchiveFormat::Zip),
    ArchiveEntry::new(Os::Windows, Arch::X86, "windows-x86", ArchiveFormat::Zip),
];

/// Returns every row of the download table.
pub fn all_archives() -> &'static [ArchiveEntry] {
    ARCHIVES
}

/// Looks up the archive row for a platform.
pub fn find_archive(platform: Platform) -> Option<&'static ArchiveEntry> {
    ARCHIVES
        .iter()
        .find(|entry| entry.os == platform.os && entry.arch == platform.arch)
}

/// Returns true if `version` fits the release naming scheme (`1.4.0`, or a
/// release candidate such as `1.4.0-rc1`).
pub fn is_valid_version(version: &str) -> bool {
    let is_number = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit());

    let release = match version.split_once("-rc") {
        Some((release, candidate)) if is_number(candidate) => release,
        Some(_) => return false,
        None => version,
    };

    let parts: Vec<&str> = release.split('.').collect();
    parts.len() >= 2 && parts.iter().all(|part| is_number(part))
}

/// Resolves the download URL and archive row for a platform and release.
///
/// # Errors
///
/// Returns [`WebpError::UnsupportedPlatform`] when the platform has no row in
/// the table or the version does not fit the release naming scheme.
pub fn resolve(
    base_url: &str,
    version: &str,
    platform: Platform,
) -> Result<(String, &'static ArchiveEntry)> {
    if !is_valid_version(version) {
        return Err(WebpError::UnsupportedPlatform(format!(
            "no libwebp release named '{}' for {}",
            version, platform
        )));
    }

    let entry = find_archive(platform).ok_or_else(|| {
        WebpError::UnsupportedPlatform(format!("no prebuilt libwebp tools for {}", platform))
    })?;

    let url = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        entry.file_name(version)
    );
    Ok((url, entry))
}

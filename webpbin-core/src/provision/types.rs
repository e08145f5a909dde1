//! Core types for binary provisioning.
//!
//! This module defines the tool identifiers, the OS/architecture pair used
//! to pick a prebuilt archive, and the archive formats libwebp ships.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Tool Identifiers
// ============================================================================

/// The libwebp command-line tools this crate drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// `cwebp` - encodes PNG/JPEG/TIFF/PNM into WebP.
    Cwebp,
    /// `dwebp` - decodes WebP into PNG/PAM/PPM/BMP/TIFF.
    Dwebp,
}

impl Tool {
    /// Returns all tool IDs.
    pub fn all() -> &'static [Tool] {
        &[Self::Cwebp, Self::Dwebp]
    }

    /// Returns the bare executable name without any platform suffix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cwebp => "cwebp",
            Self::Dwebp => "dwebp",
        }
    }

    /// Returns the executable file name for the given OS.
    ///
    /// When the OS is unknown the host's convention is used.
    pub fn executable_name(&self, os: Option<Os>) -> String {
        let windows = match os {
            Some(os) => os == Os::Windows,
            None => cfg!(windows),
        };
        if windows {
            format!("{}.exe", self.as_str())
        } else {
            self.as_str().to_string()
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Tool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cwebp" | "encoder" => Ok(Self::Cwebp),
            "dwebp" | "decoder" => Ok(Self::Dwebp),
            _ => Err(format!("Unknown tool: {}", s)),
        }
    }
}

// ============================================================================
// Platform Detection
// ============================================================================

/// Operating systems libwebp publishes prebuilt tools for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Linux,
    Macos,
    Windows,
}

impl Os {
    /// Detects the OS this process runs on.
    pub fn current() -> Option<Self> {
        Self::from_target(std::env::consts::OS)
    }

    /// Maps a `std::env::consts::OS` style name.
    pub fn from_target(name: &str) -> Option<Self> {
        match name {
            "linux" => Some(Self::Linux),
            "macos" => Some(Self::Macos),
            "windows" => Some(Self::Windows),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Macos => "macos",
            Self::Windows => "windows",
        }
    }
}

/// CPU architectures relevant to the download table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    X86,
    X64,
    /// 32-bit ARM. No prebuilt tools exist for it.
    Arm,
    Arm64,
}

impl Arch {
    /// Detects the architecture this process runs on.
    pub fn current() -> Option<Self> {
        Self::from_target(std::env::consts::ARCH)
    }

    /// Maps a `std::env::consts::ARCH` style name.
    pub fn from_target(name: &str) -> Option<Self> {
        match name {
            "x86" => Some(Self::X86),
            "x86_64" => Some(Self::X64),
            "arm" => Some(Self::Arm),
            "aarch64" => Some(Self::Arm64),
            _ => None,
        }
    }

    /// Architectures where downloading is skipped outright and the tools are
    /// expected on PATH.
    pub fn is_known_unsupported(&self) -> bool {
        matches!(self, Self::Arm)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::X64 => "x64",
            Self::Arm => "arm",
            Self::Arm64 => "arm64",
        }
    }
}

/// An OS + architecture pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    pub const fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Detects the current platform at runtime.
    ///
    /// Returns `None` if either the OS or the architecture is not one this
    /// crate knows about.
    pub fn detect() -> Option<Self> {
        Some(Self::new(Os::current()?, Arch::current()?))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os.as_str(), self.arch.as_str())
    }
}

/// Returns true if `/etc/issue`-style text names a minimal distribution
/// whose glibc-linked prebuilt tools will not run.
///
/// The text need not be UTF-8.
pub fn is_minimal_distro(issue: &[u8]) -> bool {
    const NEEDLE: &[u8] = b"alpine";
    issue
        .windows(NEEDLE.len())
        .any(|window| window.eq_ignore_ascii_case(NEEDLE))
}

/// Reads `/etc/issue` on Linux and checks it with [`is_minimal_distro`].
pub fn host_is_minimal_distro() -> bool {
    if Os::current() != Some(Os::Linux) {
        return false;
    }
    std::fs::read("/etc/issue")
        .map(|issue| is_minimal_distro(&issue))
        .unwrap_or(false)
}

// ============================================================================
// Archive Formats
// ============================================================================

/// Archive format of a prebuilt libwebp package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveFormat {
    /// Gzip-compressed tar archive (.tar.gz, .tgz)
    TarGz,
    /// ZIP archive (.zip)
    Zip,
}

impl ArchiveFormat {
    /// Infers the archive format from a URL or filename.
    pub fn from_url(url: &str) -> Option<Self> {
        let lower = url.to_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }

    /// File extension including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::TarGz => ".tar.gz",
            Self::Zip => ".zip",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_as_str() {
        assert_eq!(Tool::Cwebp.as_str(), "cwebp");
        assert_eq!(Tool::Dwebp.as_str(), "dwebp");
    }

    #[test]
    fn test_tool_from_str() {
        assert_eq!("cwebp".parse::<Tool>().unwrap(), Tool::Cwebp);
        assert_eq!("CWEBP".parse::<Tool>().unwrap(), Tool::Cwebp);
        assert_eq!("decoder".parse::<Tool>().unwrap(), Tool::Dwebp);
        assert!("gif2webp".parse::<Tool>().is_err());
    }

    #[test]
    fn test_executable_name() {
        assert_eq!(Tool::Cwebp.executable_name(Some(Os::Linux)), "cwebp");
        assert_eq!(Tool::Cwebp.executable_name(Some(Os::Macos)), "cwebp");
        assert_eq!(Tool::Dwebp.executable_name(Some(Os::Windows)), "dwebp.exe");
    }

    #[test]
    fn test_os_and_arch_from_target() {
        assert_eq!(Os::from_target("linux"), Some(Os::Linux));
        assert_eq!(Os::from_target("macos"), Some(Os::Macos));
        assert_eq!(Os::from_target("windows"), Some(Os::Windows));
        assert_eq!(Os::from_target("freebsd"), None);

        assert_eq!(Arch::from_target("x86"), Some(Arch::X86));
        assert_eq!(Arch::from_target("x86_64"), Some(Arch::X64));
        assert_eq!(Arch::from_target("arm"), Some(Arch::Arm));
        assert_eq!(Arch::from_target("aarch64"), Some(Arch::Arm64));
        assert_eq!(Arch::from_target("riscv64"), None);
    }

    #[test]
    fn test_only_arm32_is_known_unsupported() {
        assert!(Arch::Arm.is_known_unsupported());
        assert!(!Arch::Arm64.is_known_unsupported());
        assert!(!Arch::X64.is_known_unsupported());
        assert!(!Arch::X86.is_known_unsupported());
    }

    #[test]
    fn test_platform_detect() {
        let platform = Platform::detect();
        #[cfg(any(
            all(target_os = "linux", target_arch = "x86_64"),
            all(target_os = "macos", target_arch = "aarch64"),
            all(target_os = "windows", target_arch = "x86_64"),
        ))]
        assert!(platform.is_some());
        let _ = platform;
    }

    #[test]
    fn test_platform_display() {
        assert_eq!(Platform::new(Os::Macos, Arch::Arm64).to_string(), "macos/arm64");
    }

    #[test]
    fn test_minimal_distro_detection() {
        assert!(is_minimal_distro(b"Welcome to Alpine Linux 3.19\nKernel \\r on an \\m (\\l)\n"));
        assert!(is_minimal_distro(b"ALPINE"));
        assert!(!is_minimal_distro(b"Ubuntu 24.04 LTS \\n \\l\n"));
        assert!(!is_minimal_distro(b"alpin"));
        assert!(!is_minimal_distro(b""));
    }

    #[test]
    fn test_minimal_distro_detection_tolerates_non_utf8() {
        let mut issue = vec![0xff, 0xfe, b' '];
        issue.extend_from_slice(b"Welcome to Alpine Linux");
        issue.push(0xc3);
        assert!(std::str::from_utf8(&issue).is_err());
        assert!(is_minimal_distro(&issue));

        assert!(!is_minimal_distro(&[0xff, 0xfe, b'a', b'l', 0xc3]));
    }

    #[test]
    fn test_archive_format_from_url() {
        assert_eq!(
            ArchiveFormat::from_url("https://example.com/libwebp-1.4.0-linux-x86-64.tar.gz"),
            Some(ArchiveFormat::TarGz)
        );
        assert_eq!(
            ArchiveFormat::from_url("https://example.com/tool.tgz"),
            Some(ArchiveFormat::TarGz)
        );
        assert_eq!(
            ArchiveFormat::from_url("https://example.com/libwebp-1.4.0-windows-x64.zip"),
            Some(ArchiveFormat::Zip)
        );
        assert_eq!(ArchiveFormat::from_url("https://example.com/tool.dmg"), None);
    }
}

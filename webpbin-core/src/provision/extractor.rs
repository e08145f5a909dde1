//! Archive extraction for downloaded libwebp packages.
//!
//! Unpacks zip and tar.gz archives while dropping a fixed number of leading
//! path components, and sets executable permissions on Unix systems.

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

use super::types::ArchiveFormat;
use crate::error::{Result, WebpError};

// ============================================================================
// Archive Extraction
// ============================================================================

/// Extracts an archive into `dest_dir`, dropping `strip` leading components
/// from every entry path.
///
/// Entries that are left with no path after stripping are skipped, as are
/// links, absolute paths and paths containing `..`.
///
/// # Errors
///
/// Returns [`WebpError::Extraction`] if the archive is malformed and
/// [`WebpError::Io`] if the destination cannot be written.
pub fn extract_archive(
    archive_path: &Path,
    dest_dir: &Path,
    format: ArchiveFormat,
    strip: usize,
) -> Result<()> {
    info!(
        "Extracting {:?} archive {} to {} (strip {})",
        format,
        archive_path.display(),
        dest_dir.display(),
        strip
    );

    fs::create_dir_all(dest_dir)?;

    match format {
        ArchiveFormat::Zip => extract_zip(archive_path, dest_dir, strip),
        ArchiveFormat::TarGz => extract_tar_gz(archive_path, dest_dir, strip),
    }
}

/// Drops `strip` leading components from an archive entry path.
///
/// Returns `None` for paths that are unsafe or empty after stripping.
pub fn strip_components(path: &Path, strip: usize) -> Option<PathBuf> {
    let mut stripped = PathBuf::new();
    let mut seen = 0;

    for component in path.components() {
        match component {
            Component::Normal(part) => {
                if seen >= strip {
                    stripped.push(part);
                }
                seen += 1;
            }
            Component::CurDir => {}
            _ => return None,
        }
    }

    if stripped.as_os_str().is_empty() {
        None
    } else {
        Some(stripped)
    }
}

// ============================================================================
// ZIP Extraction
// ============================================================================

fn extract_zip(archive_path: &Path, dest_dir: &Path, strip: usize) -> Result<()> {
    let file = File::open(archive_path)?;

    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| WebpError::extraction(archive_path, e))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| WebpError::extraction(archive_path, e))?;

        let entry_path = match entry.enclosed_name() {
            Some(path) => path,
            None => {
                warn!("Skipping unsafe path in zip: {}", entry.name());
                continue;
            }
        };

        let relative = match strip_components(&entry_path, strip) {
            Some(path) => path,
            None => {
                debug!("Skipping stripped zip entry: {}", entry_path.display());
                continue;
            }
        };

        let dest_path = dest_dir.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&dest_path)?;
        } else {
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent)?;
            }

            let mut outfile = File::create(&dest_path)?;
            io::copy(&mut entry, &mut outfile)
                .map_err(|e| WebpError::extraction(archive_path, e))?;

            #[cfg(unix)]
            set_unix_permissions(&dest_path, entry.unix_mode())?;
        }
    }

    debug!("ZIP extraction complete");
    Ok(())
}

// ============================================================================
// TAR.GZ Extraction
// ============================================================================

fn extract_tar_gz(archive_path: &Path, dest_dir: &Path, strip: usize) -> Result<()> {
    let file = File::open(archive_path)?;

    let reader = BufReader::new(file);
    let decoder = flate2::read::GzDecoder::new(reader);
    extract_tar(decoder, archive_path, dest_dir, strip)
}

fn extract_tar<R: Read>(
    reader: R,
    archive_path: &Path,
    dest_dir: &Path,
    strip: usize,
) -> Result<()> {
    let mut archive = tar::Archive::new(reader);
    let malformed = |e: io::Error| WebpError::extraction(archive_path, e);

    for entry_result in archive.entries().map_err(malformed)? {
        let mut entry = entry_result.map_err(malformed)?;
        let entry_type = entry.header().entry_type();

        if entry_type.is_symlink() || entry_type.is_hard_link() {
            warn!("Skipping symlink/hardlink in tar archive");
            continue;
        }

        let path = entry.path().map_err(malformed)?.into_owned();

        if path.is_absolute() {
            warn!("Skipping absolute path in tar: {:?}", path);
            continue;
        }

        let relative = match strip_components(&path, strip) {
            Some(relative) => relative,
            None => {
                debug!("Skipping stripped tar entry: {}", path.display());
                continue;
            }
        };

        let dest_path = dest_dir.join(&relative);

        if entry_type.is_dir() {
            fs::create_dir_all(&dest_path)?;
        } else if entry_type.is_file() {
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent)?;
            }

            let mut outfile = File::create(&dest_path)?;
            io::copy(&mut entry, &mut outfile).map_err(malformed)?;
            outfile.flush()?;

            #[cfg(unix)]
            {
                if let Ok(mode) = entry.header().mode() {
                    set_unix_permissions(&dest_path, Some(mode))?;
                }
            }
        }
    }

    debug!("TAR extraction complete");
    Ok(())
}

// ============================================================================
// Unix Permissions
// ============================================================================

#[cfg(unix)]
fn set_unix_permissions(path: &Path, mode: Option<u32>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    if let Some(mode) = mode {
        if mode & 0o111 != 0 {
            let permissions = fs::Permissions::from_mode(mode | 0o755);
            fs::set_permissions(path, permissions)?;
        }
    }

    Ok(())
}

/// Sets executable permission on a file (Unix only).
///
/// On Windows, this is a no-op.
#[allow(unused_variables)]
pub fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut permissions = fs::metadata(path)?.permissions();
        let current_mode = permissions.mode();
        permissions.set_mode(current_mode | 0o755);
        fs::set_permissions(path, permissions)?;

        debug!("Set executable permission on {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const PREFIX: &str = "libwebp-1.4.0-linux-x86-64";

    fn append_file<W: Write>(builder: &mut tar::Builder<W>, path: &str, data: &[u8], mode: u32) {
        let mut header = tar::Header::new_gnu();
        header.set_path(path).unwrap();
        header.set_size(data.len() as u64);
        header.set_mode(mode);
        header.set_cksum();
        builder.append(&header, data).unwrap();
    }

    fn write_release_tar_gz(archive_path: &Path) {
        let file = File::create(archive_path).unwrap();
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);

        append_file(&mut builder, &format!("{PREFIX}/README.md"), b"readme", 0o644);
        append_file(&mut builder, &format!("{PREFIX}/bin/cwebp"), b"#!/bin/sh\n", 0o755);
        append_file(&mut builder, &format!("{PREFIX}/bin/dwebp"), b"#!/bin/sh\n", 0o755);
        append_file(
            &mut builder,
            &format!("{PREFIX}/include/webp/decode.h"),
            b"/* header */",
            0o644,
        );

        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_strip_components() {
        assert_eq!(
            strip_components(Path::new("libwebp-1.4.0/bin/cwebp"), 2),
            Some(PathBuf::from("cwebp"))
        );
        assert_eq!(
            strip_components(Path::new("libwebp-1.4.0/include/webp/decode.h"), 2),
            Some(PathBuf::from("webp/decode.h"))
        );
        assert_eq!(strip_components(Path::new("libwebp-1.4.0/README"), 2), None);
        assert_eq!(strip_components(Path::new("libwebp-1.4.0/bin/"), 2), None);
        assert_eq!(
            strip_components(Path::new("./libwebp-1.4.0/bin/cwebp"), 2),
            Some(PathBuf::from("cwebp"))
        );
        assert_eq!(
            strip_components(Path::new("a/b/c"), 0),
            Some(PathBuf::from("a/b/c"))
        );
    }

    #[test]
    fn test_strip_components_rejects_unsafe_paths() {
        assert_eq!(strip_components(Path::new("a/b/../../etc/passwd"), 2), None);
        assert_eq!(strip_components(Path::new("/etc/passwd"), 0), None);
        assert_eq!(strip_components(Path::new("a/../b/c"), 2), None);
    }

    #[test]
    fn test_extract_tar_gz_strips_release_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let archive_path = temp_dir.path().join("libwebp.tar.gz");
        let extract_dir = temp_dir.path().join("bin");

        write_release_tar_gz(&archive_path);
        extract_archive(&archive_path, &extract_dir, ArchiveFormat::TarGz, 2).unwrap();

        assert!(extract_dir.join("cwebp").is_file());
        assert!(extract_dir.join("dwebp").is_file());
        assert!(extract_dir.join("webp/decode.h").is_file());
        assert!(!extract_dir.join("README.md").exists());
        assert!(!extract_dir.join(PREFIX).exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_tar_gz_keeps_executable_bit() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let archive_path = temp_dir.path().join("libwebp.tar.gz");
        let extract_dir = temp_dir.path().join("bin");

        write_release_tar_gz(&archive_path);
        extract_archive(&archive_path, &extract_dir, ArchiveFormat::TarGz, 2).unwrap();

        let mode = fs::metadata(extract_dir.join("cwebp")).unwrap().permissions().mode();
        assert_ne!(mode & 0o111, 0);
    }

    #[test]
    fn test_extract_zip_strips_release_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let archive_path = temp_dir.path().join("libwebp.zip");
        let extract_dir = temp_dir.path().join("bin");

        {
            let file = File::create(&archive_path).unwrap();
            let mut zip = zip::ZipWriter::new(file);

            let options = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Stored);

            zip.add_directory("libwebp-1.4.0-windows-x64/bin/", options)
                .unwrap();
            zip.start_file("libwebp-1.4.0-windows-x64/bin/cwebp.exe", options)
                .unwrap();
            zip.write_all(b"MZ").unwrap();
            zip.start_file("libwebp-1.4.0-windows-x64/README.md", options)
                .unwrap();
            zip.write_all(b"readme").unwrap();

            zip.finish().unwrap();
        }

        extract_archive(&archive_path, &extract_dir, ArchiveFormat::Zip, 2).unwrap();

        assert!(extract_dir.join("cwebp.exe").is_file());
        assert_eq!(fs::read(extract_dir.join("cwebp.exe")).unwrap(), b"MZ");
        assert!(!extract_dir.join("README.md").exists());
    }

    #[test]
    fn test_malformed_zip_is_extraction_error() {
        let temp_dir = TempDir::new().unwrap();
        let archive_path = temp_dir.path().join("broken.zip");
        fs::write(&archive_path, b"this is not a zip archive").unwrap();

        let err = extract_archive(
            &archive_path,
            &temp_dir.path().join("out"),
            ArchiveFormat::Zip,
            2,
        )
        .unwrap_err();
        assert!(matches!(err, WebpError::Extraction { .. }));
    }

    #[test]
    fn test_malformed_tar_gz_is_extraction_error() {
        let temp_dir = TempDir::new().unwrap();
        let archive_path = temp_dir.path().join("broken.tar.gz");
        fs::write(&archive_path, b"definitely not gzip").unwrap();

        let err = extract_archive(
            &archive_path,
            &temp_dir.path().join("out"),
            ArchiveFormat::TarGz,
            2,
        )
        .unwrap_err();
        assert!(matches!(err, WebpError::Extraction { .. }));
    }

    #[test]
    fn test_tar_symlink_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let archive_path = temp_dir.path().join("links.tar.gz");
        let extract_dir = temp_dir.path().join("bin");

        {
            let file = File::create(&archive_path).unwrap();
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            let mut builder = tar::Builder::new(encoder);

            let mut header = tar::Header::new_gnu();
            header.set_entry_type(tar::EntryType::Symlink);
            header.set_size(0);
            header.set_mode(0o777);
            builder
                .append_link(&mut header, format!("{PREFIX}/bin/link"), "../../outside")
                .unwrap();

            builder.into_inner().unwrap().finish().unwrap();
        }

        extract_archive(&archive_path, &extract_dir, ArchiveFormat::TarGz, 2).unwrap();
        assert!(!extract_dir.join("link").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_make_executable() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("cwebp");
        fs::write(&file_path, b"#!/bin/sh\n").unwrap();
        fs::set_permissions(&file_path, fs::Permissions::from_mode(0o644)).unwrap();

        make_executable(&file_path).unwrap();

        let metadata = fs::metadata(&file_path).unwrap();
        assert_ne!(metadata.permissions().mode() & 0o111, 0);
    }
}

//! Async archive downloader with progress reporting and URL validation.
//!
//! Streams the response body to disk with reqwest so large archives never sit
//! in memory, and refuses anything that is not HTTPS from the configured host.

use futures::StreamExt;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use crate::error::{Result, WebpError};

// ============================================================================
// URL Security Validation
// ============================================================================

/// Validates that a URL is safe for downloading.
///
/// Checks:
/// - URL scheme must be HTTPS
/// - Host must equal `allowed_host` or be a subdomain of it
pub fn validate_url(url_str: &str, allowed_host: &str) -> Result<()> {
    let url = Url::parse(url_str)
        .map_err(|e| WebpError::download(url_str, format!("invalid URL: {}", e)))?;

    if url.scheme() != "https" {
        return Err(WebpError::download(url_str, "URL must use HTTPS"));
    }

    let host = url
        .host_str()
        .ok_or_else(|| WebpError::download(url_str, "URL must have a host"))?;

    let is_allowed = host == allowed_host || host.ends_with(&format!(".{}", allowed_host));
    if !is_allowed {
        return Err(WebpError::download(
            url_str,
            format!("download host {} not allowed (expected {})", host, allowed_host),
        ));
    }

    Ok(())
}

/// Extracts the host of the configured base URL.
pub fn host_of(base_url: &str) -> Result<String> {
    let url = Url::parse(base_url)
        .map_err(|e| WebpError::Config(format!("invalid base URL {}: {}", base_url, e)))?;
    url.host_str()
        .map(str::to_string)
        .ok_or_else(|| WebpError::Config(format!("base URL has no host: {}", base_url)))
}

// ============================================================================
// Download Progress
// ============================================================================

/// Progress information during a download.
#[derive(Debug, Clone)]
pub struct DownloadProgress {
    /// Bytes downloaded so far.
    pub bytes_downloaded: u64,
    /// Total bytes expected (if known from Content-Length header).
    pub total_bytes: Option<u64>,
    /// Progress percentage (0.0 to 100.0), or None if total is unknown.
    pub percent: Option<f32>,
}

impl DownloadProgress {
    fn new(bytes_downloaded: u64, total_bytes: Option<u64>) -> Self {
        let percent = total_bytes.map(|total| {
            if total > 0 {
                (bytes_downloaded as f32 / total as f32) * 100.0
            } else {
                0.0
            }
        });

        Self {
            bytes_downloaded,
            total_bytes,
            percent,
        }
    }
}

// ============================================================================
// Download Function
// ============================================================================

/// Downloads `url` into `dest`, reporting progress through `progress_cb`.
///
/// Returns the number of bytes written. A failed download leaves no file
/// behind at `dest`.
pub async fn download_file<F>(
    url: &str,
    dest: &Path,
    allowed_host: &str,
    progress_cb: F,
) -> Result<u64>
where
    F: Fn(DownloadProgress),
{
    info!("Downloading {} to {}", url, dest.display());

    validate_url(url, allowed_host)?;

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    match stream_to_file(url, dest, progress_cb).await {
        Ok(bytes) => Ok(bytes),
        Err(e) => {
            let _ = tokio::fs::remove_file(dest).await;
            Err(e)
        }
    }
}

async fn stream_to_file<F>(url: &str, dest: &Path, progress_cb: F) -> Result<u64>
where
    F: Fn(DownloadProgress),
{
    let client = reqwest::Client::new();
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| WebpError::download(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(WebpError::download(
            url,
            format!(
                "status {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown error")
            ),
        ));
    }

    let total_bytes = response.content_length();
    debug!("Content-Length: {:?}", total_bytes);

    let mut file = File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut bytes_downloaded: u64 = 0;

    progress_cb(DownloadProgress::new(0, total_bytes));

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| WebpError::download(url, e))?;
        file.write_all(&chunk).await?;

        bytes_downloaded += chunk.len() as u64;
        progress_cb(DownloadProgress::new(bytes_downloaded, total_bytes));
    }

    file.flush().await?;

    info!(
        "Download complete: {} bytes written to {}",
        bytes_downloaded,
        dest.display()
    );

    Ok(bytes_downloaded)
}

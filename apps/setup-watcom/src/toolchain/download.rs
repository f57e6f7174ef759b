//! HTTP download of toolchain archives.
//!
//! Downloads are streamed to a temporary `.tmp` file next to the destination
//! and renamed into place once complete, so a failed transfer never leaves a
//! truncated archive behind. Failed requests are not retried here; the caller
//! decides whether another candidate URL is worth trying.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 600;

/// Minimum interval between progress log lines.
const PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

/// Downloads a file from the given URL to the specified path.
///
/// # Errors
///
/// Returns an error if:
/// - The request fails or the server answers with a non-success status
/// - The destination file cannot be created or written
/// - The temporary file cannot be renamed into place
pub async fn download_file(url: &str, dest: &Path) -> Result<()> {
    let temp_path = dest.with_extension("tmp");

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    match download_with_progress(url, &temp_path).await {
        Ok(bytes) => {
            tokio::fs::rename(&temp_path, dest).await.with_context(|| {
                format!(
                    "Failed to rename {} to {}",
                    temp_path.display(),
                    dest.display()
                )
            })?;
            info!("Downloaded {} to {}", format_bytes(bytes), dest.display());
            Ok(())
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(&temp_path).await;
            Err(e)
        }
    }
}

/// Streams the response body into `dest`, logging progress periodically.
async fn download_with_progress(url: &str, dest: &Path) -> Result<u64> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .user_agent(concat!("setup-watcom/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")?;

    debug!("GET {url}");
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to connect to {url}"))?;

    if !response.status().is_success() {
        bail!("HTTP error {}: {url}", response.status());
    }

    let total_size = response.content_length().unwrap_or(0);

    let mut file = tokio::fs::File::create(dest)
        .await
        .with_context(|| format!("Failed to create file: {}", dest.display()))?;

    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;
    let start_time = Instant::now();
    let mut last_update = Instant::now();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.with_context(|| format!("Failed to read chunk from {url}"))?;
        file.write_all(&chunk)
            .await
            .with_context(|| format!("Failed to write to {}", dest.display()))?;
        downloaded += chunk.len() as u64;

        let now = Instant::now();
        if now.duration_since(last_update) >= PROGRESS_INTERVAL {
            log_progress(downloaded, total_size, start_time.elapsed().as_secs_f64());
            last_update = now;
        }
    }

    file.flush()
        .await
        .with_context(|| format!("Failed to flush {}", dest.display()))?;

    Ok(downloaded)
}

#[allow(clippy::cast_precision_loss)]
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
fn log_progress(downloaded: u64, total: u64, elapsed_secs: f64) {
    let percent = if total > 0 {
        (downloaded as f64 / total as f64 * 100.0) as u8
    } else {
        0
    };
    let speed = if elapsed_secs > 0.0 {
        downloaded as f64 / elapsed_secs
    } else {
        0.0
    };
    info!(
        "{}/{} ({percent}%) {}",
        format_bytes(downloaded),
        format_bytes(total),
        format_speed(speed)
    );
}

/// Formats bytes into a human-readable string (KB, MB, GB).
fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    #[allow(clippy::cast_precision_loss)]
    let bytes_f = bytes as f64;

    if bytes_f >= GB {
        format!("{:.2} GB", bytes_f / GB)
    } else if bytes_f >= MB {
        format!("{:.2} MB", bytes_f / MB)
    } else if bytes_f >= KB {
        format!("{:.2} KB", bytes_f / KB)
    } else {
        format!("{bytes} B")
    }
}

/// Formats speed (bytes/sec) into a human-readable string.
fn format_speed(speed: f64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;

    if speed >= MB {
        format!("{:.2} MB/s", speed / MB)
    } else if speed >= KB {
        format!("{:.2} KB/s", speed / KB)
    } else {
        format!("{speed:.0} B/s")
    }
}

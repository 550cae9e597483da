use std::path::{Path, PathBuf};
use std::time::Instant;

use futures_util::StreamExt;
use log::{debug, info, warn};
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

use crate::networking::NetworkClient;
use crate::util::{file_name_from_url, format_speed, progress_percent};

pub const FALLBACK_FILE_NAME: &str = "client-download.bin";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DownloadError {
    #[error("download URL is not configured")]
    MissingUrl,
    #[error("{0}")]
    Network(String),
    #[error("{0}")]
    Io(String),
    #[error("download incomplete: received {received} of {expected} bytes")]
    Incomplete { received: u64, expected: u64 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadReport {
    pub file_name: String,
    pub path: PathBuf,
    pub bytes_written: u64,
}

/// Pick the on-disk name: configured value, then the URL's last path segment.
///
/// Only the final path component is kept so the package always lands inside
/// the destination directory.
pub fn resolve_file_name(url: &str, configured: Option<&str>) -> String {
    configured
        .and_then(final_component)
        .or_else(|| file_name_from_url(url).as_deref().and_then(final_component))
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_owned())
}

fn final_component(name: &str) -> Option<String> {
    name.rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
        .map(str::to_owned)
}

/// Stream `url` into `dest_dir`, reporting percentages through `progress`.
///
/// With a known content length `progress` sees every chunk; otherwise it
/// only sees the final `100.0`. The package is written as-is, never
/// unpacked.
///
/// # Errors
/// Returns a [`DownloadError`] for a blank URL, transport or status
/// failures, destination I/O failures and truncated bodies.
pub async fn download_package<F>(
    network: &NetworkClient,
    url: &str,
    dest_dir: &Path,
    file_name: Option<&str>,
    mut progress: F,
) -> Result<DownloadReport, DownloadError>
where
    F: FnMut(f32),
{
    let url = url.trim();
    if url.is_empty() {
        return Err(DownloadError::MissingUrl);
    }

    let file_name = resolve_file_name(url, file_name);
    fs::create_dir_all(dest_dir)
        .await
        .map_err(|e| DownloadError::Io(format!("failed to create download dir: {e}")))?;
    let dest = dest_dir.join(&file_name);

    let response = network.get(url).await.map_err(DownloadError::Network)?;
    let total = response.content_length();
    debug!(
        "download: target={} content_length={:?}",
        dest.display(),
        total
    );

    let mut file = File::create(&dest)
        .await
        .map_err(|e| DownloadError::Io(format!("failed to create file: {e}")))?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;
    let started = Instant::now();
    let mut last_tick = Instant::now();
    let mut last_bytes = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) => {
                if let Some(expected) = total
                    && downloaded < expected
                {
                    warn!("download: body ended early after {downloaded} bytes: {err}");
                    return Err(DownloadError::Incomplete {
                        received: downloaded,
                        expected,
                    });
                }
                return Err(DownloadError::Network(format!("stream error: {err}")));
            }
        };
        file.write_all(&chunk)
            .await
            .map_err(|e| DownloadError::Io(format!("write error: {e}")))?;
        downloaded += chunk.len() as u64;

        if total.is_some_and(|total| total > 0) {
            progress(progress_percent(downloaded, total));
        }

        let since = last_tick.elapsed().as_secs_f32();
        if since > 1.0 {
            let speed = (downloaded - last_bytes) as f32 / since;
            debug!(
                "download: {} of {:?} bytes ({})",
                downloaded,
                total,
                format_speed(speed)
            );
            last_tick = Instant::now();
            last_bytes = downloaded;
        }
    }

    file.flush()
        .await
        .map_err(|e| DownloadError::Io(format!("flush error: {e}")))?;

    if let Some(total) = total
        && downloaded < total
    {
        return Err(DownloadError::Incomplete {
            received: downloaded,
            expected: total,
        });
    }

    progress(100.0);
    info!(
        "download: saved {} ({} bytes in {:.1}s)",
        dest.display(),
        downloaded,
        started.elapsed().as_secs_f32()
    );
    Ok(DownloadReport {
        file_name,
        path: dest,
        bytes_written: downloaded,
    })
}

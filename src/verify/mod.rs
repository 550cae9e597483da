use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, warn};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs;

use crate::engine::models::{AssetManifestEntry, non_blank};
use crate::env::join_normalized;
use crate::util::strip_bom;

const PREVIEW_LIMIT: usize = 3;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("Client directory not found: {0}")]
    ClientDirMissing(PathBuf),
    #[error("Asset manifest not found: {0}")]
    ManifestMissing(PathBuf),
    #[error("Error during verification: {0}")]
    ManifestUnreadable(String),
}

#[derive(Clone, Debug)]
pub struct VerifyOptions {
    /// Pause after each entry so progress stays observable.
    pub entry_delay: Duration,
    /// Also compare `unpackedsize`/`unpackedhash` of files that exist.
    ///
    /// Manifests carry these fields but plain verification only checks
    /// existence; this is an opt-in extension.
    pub deep: bool,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            entry_delay: Duration::from_millis(5),
            deep: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VerificationReport {
    pub total: usize,
    pub checked: usize,
    pub missing: Vec<String>,
    pub mismatched: Vec<String>,
}

impl VerificationReport {
    pub fn is_empty_manifest(&self) -> bool {
        self.total == 0
    }

    pub fn is_healthy(&self) -> bool {
        self.missing.is_empty() && self.mismatched.is_empty()
    }

    /// Human-readable status line.
    pub fn summary(&self) -> String {
        if self.is_empty_manifest() {
            return "Manifest is empty. No files were verified.".into();
        }

        let mut summary = match self.missing.len() {
            0 => "Verification complete. No missing files.".to_owned(),
            1 => format!("1 file missing: {}", self.missing[0]),
            count => format!(
                "{count} files missing. Examples: {}",
                preview(&self.missing)
            ),
        };
        if !self.mismatched.is_empty() {
            summary.push_str(&format!(
                " {} file(s) failed the content check: {}",
                self.mismatched.len(),
                preview(&self.mismatched)
            ));
        }
        summary
    }
}

fn preview(names: &[String]) -> String {
    names
        .iter()
        .take(PREVIEW_LIMIT)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Check every manifest entry against the installed client.
///
/// `progress` receives the completed percentage after each entry and a
/// final `100.0`.
///
/// # Errors
/// Returns a [`VerifyError`] when the client directory or manifest is
/// absent, or the manifest cannot be read or parsed.
pub async fn verify_client<F>(
    manifest_path: &Path,
    client_dir: &Path,
    options: &VerifyOptions,
    mut progress: F,
) -> Result<VerificationReport, VerifyError>
where
    F: FnMut(f32),
{
    if !fs::metadata(client_dir)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
    {
        return Err(VerifyError::ClientDirMissing(client_dir.to_path_buf()));
    }
    if !fs::try_exists(manifest_path).await.unwrap_or(false) {
        return Err(VerifyError::ManifestMissing(manifest_path.to_path_buf()));
    }

    let entries = load_manifest(manifest_path).await?;
    let mut report = VerificationReport {
        total: entries.len(),
        ..Default::default()
    };
    if entries.is_empty() {
        info!("verify: manifest {} is empty", manifest_path.display());
        return Ok(report);
    }

    info!(
        "verify: checking {} manifest entries under {}",
        entries.len(),
        client_dir.display()
    );
    for (index, entry) in entries.iter().enumerate() {
        if let Some(local_file) = non_blank(&entry.local_file) {
            report.checked += 1;
            let path = join_normalized(client_dir, local_file);
            if !is_file(&path).await {
                debug!("verify: missing {}", path.display());
                report.missing.push(local_file.to_owned());
            } else if options.deep && !content_matches(&path, entry).await {
                debug!("verify: content mismatch for {}", path.display());
                report.mismatched.push(local_file.to_owned());
            }
        }

        progress((index + 1) as f32 * 100.0 / entries.len() as f32);
        if !options.entry_delay.is_zero() {
            tokio::time::sleep(options.entry_delay).await;
        }
    }
    progress(100.0);

    info!(
        "verify: {} checked, {} missing, {} mismatched",
        report.checked,
        report.missing.len(),
        report.mismatched.len()
    );
    Ok(report)
}

async fn load_manifest(path: &Path) -> Result<Vec<AssetManifestEntry>, VerifyError> {
    let raw = fs::read(path)
        .await
        .map_err(|e| VerifyError::ManifestUnreadable(format!("failed to read manifest: {e}")))?;
    let raw = strip_bom(&raw);
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    let parsed: Option<Vec<AssetManifestEntry>> = serde_json::from_slice(raw)
        .map_err(|e| VerifyError::ManifestUnreadable(format!("invalid manifest: {e}")))?;
    Ok(parsed.unwrap_or_default())
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

async fn content_matches(path: &Path, entry: &AssetManifestEntry) -> bool {
    if let Some(expected) = entry.unpacked_size.and_then(|size| u64::try_from(size).ok()) {
        match fs::metadata(path).await {
            Ok(meta) if meta.len() == expected => {}
            _ => return false,
        }
    }

    let Some(expected_hash) = non_blank(&entry.unpacked_hash) else {
        return true;
    };
    let owned = path.to_path_buf();
    match tokio::task::spawn_blocking(move || sha256_hex(&owned)).await {
        Ok(Ok(actual)) => actual.eq_ignore_ascii_case(expected_hash),
        Ok(Err(err)) => {
            warn!("verify: unable to hash {}: {err}", path.display());
            false
        }
        Err(err) => {
            warn!("verify: hashing task failed for {}: {err}", path.display());
            false
        }
    }
}

fn sha256_hex(path: &Path) -> Result<String, String> {
    let mut file =
        std::fs::File::open(path).map_err(|e| format!("failed to open file: {e}"))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let read = file
            .read(&mut buf)
            .map_err(|e| format!("failed to read file: {e}"))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect())
}

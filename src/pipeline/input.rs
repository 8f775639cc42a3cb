//! Source resolution: turn the configured path or URL into a local PDF.
//!
//! pdfium opens documents by path, so a remote source is downloaded into a
//! `TempDir` that lives as long as the returned [`ResolvedInput`]. The magic
//! bytes are checked on both branches, which turns an HTML error page or a
//! mistyped path into [`ExtractError::NotAPdf`] instead of a pdfium failure.

use crate::error::ExtractError;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";
const FALLBACK_FILE_NAME: &str = "act_math.pdf";

/// A PDF on local disk, possibly owned by a temporary directory.
#[derive(Debug)]
pub enum ResolvedInput {
    Local(PathBuf),
    /// Downloaded copy; removed when this value is dropped.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }

    pub fn is_downloaded(&self) -> bool {
        matches!(self, ResolvedInput::Downloaded { .. })
    }
}

pub fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Resolve `source` to a readable local PDF.
pub async fn resolve_input(
    source: &str,
    timeout_secs: u64,
    user_agent: &str,
) -> Result<ResolvedInput, ExtractError> {
    if is_url(source) {
        download(source, timeout_secs, user_agent).await
    } else {
        resolve_local(Path::new(source))
    }
}

fn resolve_local(path: &Path) -> Result<ResolvedInput, ExtractError> {
    let path = path.to_path_buf();
    let file = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ExtractError::PermissionDenied { path });
        }
        Err(_) => return Err(ExtractError::FileNotFound { path }),
    };
    if path.is_dir() {
        return Err(ExtractError::FileNotFound { path });
    }

    let head = read_head(file, &path)?;
    check_magic(&path, &head)?;

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// First bytes of `reader`, up to the magic length. Short files give a
/// shorter head; read failures are errors, not an empty head.
fn read_head<R: Read>(reader: R, path: &Path) -> Result<Vec<u8>, ExtractError> {
    let mut head = Vec::with_capacity(PDF_MAGIC.len());
    match reader.take(PDF_MAGIC.len() as u64).read_to_end(&mut head) {
        Ok(_) => Ok(head),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(ExtractError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(e) => Err(ExtractError::Internal(format!(
            "Failed to read {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Reject anything that does not start with `%PDF`.
fn check_magic(path: &Path, head: &[u8]) -> Result<(), ExtractError> {
    if head.starts_with(PDF_MAGIC) {
        return Ok(());
    }
    let mut magic = [0u8; 4];
    let n = head.len().min(4);
    magic[..n].copy_from_slice(&head[..n]);
    Err(ExtractError::NotAPdf {
        path: path.to_path_buf(),
        magic,
    })
}

async fn download(
    url: &str,
    timeout_secs: u64,
    user_agent: &str,
) -> Result<ResolvedInput, ExtractError> {
    info!("Downloading PDF from: {}", url);

    let failed = |reason: String| ExtractError::DownloadFailed {
        url: url.to_string(),
        reason,
    };
    let classify = |e: reqwest::Error| {
        if e.is_timeout() {
            ExtractError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(user_agent)
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(classify)?;
    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let filename = file_name_from_url(url);
    let bytes = response.bytes().await.map_err(classify)?;

    let temp_dir = TempDir::new().map_err(|e| ExtractError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(filename);
    check_magic(&file_path, &bytes)?;

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| ExtractError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded {} bytes to: {}", bytes.len(), file_path.display());
    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Last path segment when it looks like a file name, else a fixed name.
fn file_name_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut s| s.next_back().map(str::to_string))
        })
        .filter(|last| !last.is_empty() && last.contains('.'))
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string())
}

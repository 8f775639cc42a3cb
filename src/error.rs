//! Error types for the act-mcq-extract library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ExtractError`] — **Fatal**: the run cannot proceed at all (download
//!   failed, file is not a PDF, pdfium cannot open it, output cannot be
//!   written). Returned as `Err(ExtractError)` from [`crate::extract()`].
//!
//! * [`PageError`] — **Non-fatal**: one page lost its text layer or failed
//!   to rasterise. Collected in [`crate::output::ExtractionOutput`] while
//!   every other page is processed normally.
//!
//! Questions that simply fail to parse are neither: they are expected on a
//! fixed-format exam PDF and are reported as
//! [`crate::pipeline::parse::SkipReason`] values.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the act-mcq-extract library.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The source URL could not be fetched.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes were read, but they are not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// pdfium could not parse the document structure.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Place libpdfium next to the binary, install it system-wide, or set\n\
PDFIUM_LIB_PATH=/path/to/libpdfium.\n\
Pre-built libraries: https://github.com/bblanchon/pdfium-binaries/releases\n"
    )]
    PdfiumBindingFailed(String),

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write an output file (JSON records or page image).
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The page text layer could not be loaded; the page is treated as empty.
    #[error("Page {page}: text layer unavailable: {detail}")]
    TextUnavailable { page: usize, detail: String },

    /// Page rasterisation failed; questions on the page get no image.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },
}

impl PageError {
    /// 1-indexed page number the error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::TextUnavailable { page, .. } | PageError::RenderFailed { page, .. } => *page,
        }
    }
}

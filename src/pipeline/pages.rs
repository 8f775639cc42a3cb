//! Page access via pdfium: text per page, and rasters on demand.
//!
//! ## Two opens, not one
//!
//! Text for every page is needed up front (the answer key sits at the end
//! of the document), but only pages that end up carrying a question need a
//! raster. [`read_pages`] walks the document once for text; [`render_pages`]
//! opens it again and renders exactly the requested page numbers. pdfium
//! documents cannot be rewound mid-iteration, so the second pass is a fresh
//! open rather than a reuse of the first.
//!
//! Both entry points run inside `spawn_blocking`: pdfium is a C++ library
//! with thread-local state and CPU-bound rendering.

use crate::config::ExtractionConfig;
use crate::error::{ExtractError, PageError};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Raw text of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// 1-indexed page number.
    pub page_number: usize,
    pub text: String,
}

/// Everything the text pass produced.
#[derive(Debug, Clone, Default)]
pub struct DocumentText {
    pub pages: Vec<PageText>,
    /// Pages whose text layer failed; they appear in `pages` with empty text.
    pub errors: Vec<PageError>,
}

/// Bind to pdfium.
///
/// Lookup order: `PDFIUM_LIB_PATH`, the platform library in the working
/// directory, then the system library path.
pub fn bind_pdfium() -> Result<Pdfium, ExtractError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.is_empty() => Pdfium::bind_to_library(&path),
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| ExtractError::PdfiumBindingFailed(format!("{e:?}")))?;

    Ok(Pdfium::new(bindings))
}

/// Open a document, mapping pdfium's error onto the fatal taxonomy.
pub fn open_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, ExtractError> {
    pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                ExtractError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                ExtractError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            ExtractError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

/// Lazy iterator over the text of each page, in document order.
///
/// A page whose text layer cannot be loaded yields `Err` carrying its page
/// number; iteration continues with the next page. The iterator is
/// single-use: walking the document again takes a fresh open.
pub struct PageTexts<'d, 'a> {
    pages: &'d PdfPages<'a>,
    next: usize,
    len: usize,
}

impl<'d, 'a> PageTexts<'d, 'a> {
    pub fn new(document: &'d PdfDocument<'a>) -> Self {
        let pages = document.pages();
        Self {
            pages,
            next: 0,
            len: pages.len() as usize,
        }
    }
}

impl Iterator for PageTexts<'_, '_> {
    type Item = Result<PageText, PageError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.len {
            return None;
        }
        let idx = self.next;
        self.next += 1;
        let page_number = idx + 1;
        let fail = |detail: String| PageError::TextUnavailable {
            page: page_number,
            detail,
        };

        let item = self
            .pages
            .get(idx as u16)
            .map_err(|e| fail(format!("{e:?}")))
            .and_then(|page| {
                page.text()
                    .map(|t| PageText {
                        page_number,
                        text: t.all(),
                    })
                    .map_err(|e| fail(format!("{e:?}")))
            });
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.len - self.next;
        (rest, Some(rest))
    }
}

/// Read the text of every page.
pub async fn read_pages(
    pdf_path: &Path,
    config: &ExtractionConfig,
) -> Result<DocumentText, ExtractError> {
    let path = pdf_path.to_path_buf();
    let password = config.password.clone();

    tokio::task::spawn_blocking(move || read_pages_blocking(&path, password.as_deref()))
        .await
        .map_err(|e| ExtractError::Internal(format!("Text task panicked: {}", e)))?
}

fn read_pages_blocking(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentText, ExtractError> {
    let pdfium = bind_pdfium()?;
    let document = open_document(&pdfium, pdf_path, password)?;
    info!("PDF loaded: {} pages", document.pages().len());

    let mut out = DocumentText::default();
    for item in PageTexts::new(&document) {
        match item {
            Ok(page) => {
                debug!("Page {}: {} chars of text", page.page_number, page.text.len());
                out.pages.push(page);
            }
            Err(e) => {
                warn!("{}", e);
                out.pages.push(PageText {
                    page_number: e.page(),
                    text: String::new(),
                });
                out.errors.push(e);
            }
        }
    }
    Ok(out)
}

/// Render settings derived from the config.
fn render_config(config: &ExtractionConfig) -> PdfRenderConfig {
    let max = i32::try_from(config.max_rendered_pixels).unwrap_or(i32::MAX);
    PdfRenderConfig::new()
        .scale_page_by_factor(config.dpi as f32 / 72.0)
        .set_maximum_width(max)
        .set_maximum_height(max)
}

/// Rasterise one page (1-indexed) of an open document.
pub fn render_page(
    document: &PdfDocument<'_>,
    page_number: usize,
    render_config: &PdfRenderConfig,
) -> Result<DynamicImage, PageError> {
    let fail = |detail: String| PageError::RenderFailed {
        page: page_number,
        detail,
    };
    let index = page_number
        .checked_sub(1)
        .and_then(|i| u16::try_from(i).ok())
        .ok_or_else(|| fail("page number out of range".into()))?;

    let page = document
        .pages()
        .get(index)
        .map_err(|e| fail(format!("{e:?}")))?;
    let bitmap = page
        .render_with_config(render_config)
        .map_err(|e| fail(format!("{e:?}")))?;

    let image = bitmap.as_image();
    debug!(
        "Rendered page {} → {}x{} px",
        page_number,
        image.width(),
        image.height()
    );
    Ok(image)
}

/// Open the document again and write a PNG for each requested page.
///
/// Rendering failures are collected per page; file-system failures abort.
pub async fn render_pages(
    pdf_path: &Path,
    config: &ExtractionConfig,
    page_numbers: Vec<usize>,
) -> Result<crate::pipeline::write::PageImages, ExtractError> {
    let path = pdf_path.to_path_buf();
    let config = config.clone();

    tokio::task::spawn_blocking(move || render_pages_blocking(&path, &config, &page_numbers))
        .await
        .map_err(|e| ExtractError::Internal(format!("Render task panicked: {}", e)))?
}

fn render_pages_blocking(
    pdf_path: &Path,
    config: &ExtractionConfig,
    page_numbers: &[usize],
) -> Result<crate::pipeline::write::PageImages, ExtractError> {
    let pdfium = bind_pdfium()?;
    let document = open_document(&pdfium, pdf_path, config.password.as_deref())?;
    let render_config = render_config(config);

    crate::pipeline::write::write_page_images(
        page_numbers,
        &config.output_dir,
        config.progress_callback.as_deref(),
        |n| render_page(&document, n, &render_config),
    )
}

/// File name of the image for a page.
pub fn image_file_name(page_number: usize) -> PathBuf {
    PathBuf::from(format!("page_{page_number}.png"))
}

//! Output writers: page images and the questions file.
//!
//! Images are written one per *referenced* page, never one per question,
//! so a page carrying five questions produces a single `page_{n}.png`.
//! The questions file is written to a temporary sibling and renamed into
//! place, so a reader never observes a half-written array.

use crate::error::{ExtractError, PageError};
use crate::pipeline::pages::image_file_name;
use crate::progress::ExtractionProgressCallback;
use crate::question::Question;
use image::{DynamicImage, ImageFormat};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Images written for one run, keyed by page number.
#[derive(Debug, Clone, Default)]
pub struct PageImages {
    pub written: BTreeMap<usize, PathBuf>,
    /// Pages that could not be rasterised. Their questions keep `image: None`.
    pub errors: Vec<PageError>,
}

impl PageImages {
    pub fn path_for(&self, page: usize) -> Option<&Path> {
        self.written.get(&page).map(PathBuf::as_path)
    }
}

/// Distinct pages that carry at least one question, ascending.
pub fn referenced_pages(questions: &[Question]) -> Vec<usize> {
    questions
        .iter()
        .map(|q| q.page)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Render and save one PNG per distinct page in `page_numbers`.
///
/// `render` is called at most once per page. A render error is recorded
/// and the page skipped; an error creating `dir` or writing a file aborts
/// with [`ExtractError::OutputWriteFailed`].
pub fn write_page_images<F>(
    page_numbers: &[usize],
    dir: &Path,
    progress: Option<&dyn ExtractionProgressCallback>,
    mut render: F,
) -> Result<PageImages, ExtractError>
where
    F: FnMut(usize) -> Result<DynamicImage, PageError>,
{
    std::fs::create_dir_all(dir).map_err(|source| ExtractError::OutputWriteFailed {
        path: dir.to_path_buf(),
        source,
    })?;

    let pages: BTreeSet<usize> = page_numbers.iter().copied().collect();
    let mut out = PageImages::default();

    for page in pages {
        let image = match render(page) {
            Ok(image) => image,
            Err(e) => {
                warn!("{}", e);
                if let Some(cb) = progress {
                    cb.on_image_error(page, e.to_string());
                }
                out.errors.push(e);
                continue;
            }
        };

        let path = dir.join(image_file_name(page));
        image
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|e| ExtractError::OutputWriteFailed {
                path: path.clone(),
                source: std::io::Error::other(e),
            })?;
        debug!("Wrote {}", path.display());

        if let Some(cb) = progress {
            cb.on_image_written(page, &path);
        }
        out.written.insert(page, path);
    }

    Ok(out)
}

/// Point every question at the image of its page, where one was written.
pub fn attach_images(questions: &mut [Question], images: &PageImages) {
    for q in questions.iter_mut() {
        q.image = images.path_for(q.page).map(Path::to_path_buf);
    }
}

/// Serialise questions as a pretty-printed JSON array.
pub fn questions_json(questions: &[Question]) -> Result<String, ExtractError> {
    serde_json::to_string_pretty(questions)
        .map_err(|e| ExtractError::Internal(format!("Failed to serialise questions: {}", e)))
}

/// Write the questions file atomically, creating parent directories.
pub async fn write_questions_file(path: &Path, questions: &[Question]) -> Result<(), ExtractError> {
    let json = questions_json(questions)?;
    let write_err = |p: &Path| {
        let p = p.to_path_buf();
        move |source| ExtractError::OutputWriteFailed { path: p, source }
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(write_err(parent))?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, json.as_bytes())
        .await
        .map_err(write_err(&tmp))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(write_err(path))?;

    debug!("Wrote {} questions to {}", questions.len(), path.display());
    Ok(())
}

//! Progress-callback trait for per-page extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the pipeline walks the document. The CLI uses it to drive an
//! indicatif progress bar; library callers can forward the events anywhere.
//!
//! # Example
//!
//! ```rust
//! use act_mcq_extract::{ExtractionConfig, ExtractionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct QuestionCounter {
//!     found: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for QuestionCounter {
//!     fn on_page_parsed(&self, _page_num: usize, _total_pages: usize, questions: usize) {
//!         self.found.fetch_add(questions, Ordering::SeqCst);
//!     }
//! }
//!
//! let counter = Arc::new(QuestionCounter { found: AtomicUsize::new(0) });
//! let config = ExtractionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the extraction pipeline as it processes the document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once the page texts are loaded, before any parsing.
    fn on_extraction_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after a page has been run through the question parser.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — total pages in the document
    /// * `questions`   — candidates accepted on this page
    fn on_page_parsed(&self, page_num: usize, total_pages: usize, questions: usize) {
        let _ = (page_num, total_pages, questions);
    }

    /// Called after the PNG for a referenced page has been written.
    fn on_image_written(&self, page_num: usize, path: &Path) {
        let _ = (page_num, path);
    }

    /// Called when a referenced page could not be rendered.
    fn on_image_error(&self, page_num: usize, error: String) {
        let _ = (page_num, error);
    }

    /// Called once after all output has been written.
    ///
    /// # Arguments
    /// * `questions` — emitted question records
    /// * `answered`  — records that received an answer from the key
    fn on_extraction_complete(&self, questions: usize, answered: usize) {
        let _ = (questions, answered);
    }
}

/// Type alias for a shareable progress callback.
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

/// A no-op implementation, used when no callback is configured.
#[derive(Debug, Default)]
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl ExtractionProgressCallback for Recorder {
        fn on_page_parsed(&self, page_num: usize, _total: usize, questions: usize) {
            self.events
                .lock()
                .unwrap()
                .push(format!("page {page_num}: {questions}"));
        }
    }

    #[test]
    fn default_methods_are_noops() {
        let cb = NoopProgressCallback;
        cb.on_extraction_start(12);
        cb.on_image_written(1, Path::new("output/page_1.png"));
        cb.on_extraction_complete(0, 0);
    }

    #[test]
    fn overridden_method_receives_events() {
        let rec = Recorder::default();
        rec.on_page_parsed(3, 10, 4);
        rec.on_extraction_start(10);
        assert_eq!(*rec.events.lock().unwrap(), vec!["page 3: 4".to_string()]);
    }
}

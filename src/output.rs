//! Result types returned by an extraction run.

use crate::error::PageError;
use crate::pipeline::parse::SkippedCandidate;
use crate::question::Question;
use serde::Serialize;
use std::path::PathBuf;

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionOutput {
    /// Emitted questions in document order.
    pub questions: Vec<Question>,
    /// Candidates the parser dropped, with the reason.
    pub skipped: Vec<SkippedCandidate>,
    /// Non-fatal page failures (text or render).
    pub page_errors: Vec<PageError>,
    /// Key entries that matched no question.
    pub unmatched_key_entries: Vec<u32>,
    /// Where the JSON records were written.
    pub questions_path: PathBuf,
    pub stats: ExtractionStats,
}

/// Counters and timings for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionStats {
    /// Pages in the PDF.
    pub total_pages: usize,
    /// Pages that contributed at least one question.
    pub pages_with_questions: usize,
    /// Candidates the parser considered (emitted + skipped).
    pub candidates: usize,
    pub questions_emitted: usize,
    pub skipped: usize,
    /// Page the answer-key heading was found on, if any.
    pub key_page: Option<usize>,
    pub key_entries: usize,
    pub answers_matched: usize,
    pub images_written: usize,
    pub total_duration_ms: u64,
    /// Time spent in pdfium text extraction.
    pub text_duration_ms: u64,
    /// Time spent rendering and writing page images.
    pub render_duration_ms: u64,
}

impl ExtractionOutput {
    /// Questions that received an answer from the key.
    pub fn answered(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter().filter(|q| q.answer.is_some())
    }
}

//! Extraction entry points.
//!
//! [`extract`] runs the whole pipeline once: resolve the source, read page
//! text, cut at the answer key, parse, join, render referenced pages and
//! write the JSON file. Stages run strictly in sequence; the only
//! concurrency is pdfium work moved off the async executor.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::output::{ExtractionOutput, ExtractionStats};
use crate::pipeline::answer_key::{self, AnswerKey, KeySplit};
use crate::pipeline::parse::{self, ParsedQuestions};
use crate::pipeline::pages::PageText;
use crate::pipeline::{input, pages, write};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Extract questions from the configured source and write the outputs.
///
/// # Returns
/// `Ok(ExtractionOutput)` whenever the document could be read, including
/// runs that found no questions or no answer key.
///
/// # Errors
/// Only fatal conditions: the source cannot be fetched or opened, it is not
/// a PDF, pdfium cannot be loaded, or an output file cannot be written.
pub async fn extract(config: &ExtractionConfig) -> Result<ExtractionOutput, ExtractError> {
    let total_start = Instant::now();
    info!("Starting extraction: {}", config.source);

    // ── Step 1: Resolve source ───────────────────────────────────────────
    let resolved = input::resolve_input(
        &config.source,
        config.download_timeout_secs,
        &config.user_agent,
    )
    .await?;
    let pdf_path = resolved.path().to_path_buf();

    // ── Step 2: Page text ────────────────────────────────────────────────
    let text_start = Instant::now();
    let document = pages::read_pages(&pdf_path, config).await?;
    let text_duration_ms = text_start.elapsed().as_millis() as u64;
    let total_pages = document.pages.len();
    info!("Read text of {} pages in {}ms", total_pages, text_duration_ms);

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_start(total_pages);
    }

    // ── Step 3: Cut at the answer key ────────────────────────────────────
    let split = answer_key::split_at_heading(&document.pages, &config.answer_key_heading);

    // ── Step 4: Parse questions ──────────────────────────────────────────
    let parsed = parse_questions(&document.pages, &split, config);
    info!(
        "Parsed {} question(s), skipped {} candidate(s)",
        parsed.questions.len(),
        parsed.skipped.len()
    );

    // ── Step 5: Answer key ───────────────────────────────────────────────
    let key = match (&split.key_text, split.key_page) {
        (Some(text), Some(page)) => {
            let key = AnswerKey::parse(text, config);
            info!("Answer key on page {}: {} entries", page, key.len());
            key
        }
        _ => {
            warn!(
                "No {:?} heading found; questions will have no answers",
                config.answer_key_heading
            );
            AnswerKey::default()
        }
    };
    let (mut questions, report) = answer_key::join(parsed.questions, &key);
    if !report.unmatched_entries.is_empty() {
        debug!("Key entries without a question: {:?}", report.unmatched_entries);
    }

    // ── Step 6: Page images ──────────────────────────────────────────────
    let referenced = write::referenced_pages(&questions);
    let render_start = Instant::now();
    let images = if config.render_images && !referenced.is_empty() {
        pages::render_pages(&pdf_path, config, referenced.clone()).await?
    } else {
        write::PageImages::default()
    };
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    write::attach_images(&mut questions, &images);

    // ── Step 7: Questions file ───────────────────────────────────────────
    let questions_path = config.questions_path();
    write::write_questions_file(&questions_path, &questions).await?;

    let mut page_errors = document.errors;
    page_errors.extend(images.errors);

    let stats = ExtractionStats {
        total_pages,
        pages_with_questions: referenced.len(),
        candidates: questions.len() + parsed.skipped.len(),
        questions_emitted: questions.len(),
        skipped: parsed.skipped.len(),
        key_page: split.key_page,
        key_entries: key.len(),
        answers_matched: report.matched,
        images_written: images.written.len(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        text_duration_ms,
        render_duration_ms,
    };

    info!(
        "Extraction complete: {} questions ({} answered) from {} pages, {}ms total",
        stats.questions_emitted, stats.answers_matched, total_pages, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_complete(stats.questions_emitted, stats.answers_matched);
    }

    Ok(ExtractionOutput {
        questions,
        skipped: parsed.skipped,
        page_errors,
        unmatched_key_entries: report.unmatched_entries,
        questions_path,
        stats,
    })
}

/// Parse the question pages in order, reporting progress for every page of
/// the document. Pages past the answer-key page count as parsed with no
/// questions.
fn parse_questions(
    all_pages: &[PageText],
    split: &KeySplit,
    config: &ExtractionConfig,
) -> ParsedQuestions {
    let total_pages = all_pages.len();
    let mut parsed = ParsedQuestions::default();
    for page in &split.question_pages {
        let accepted = parsed.merge(parse::parse_page(page, config));
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_parsed(page.page_number, total_pages, accepted);
        }
    }
    if let Some(ref cb) = config.progress_callback {
        for page in all_pages.iter().skip(split.question_pages.len()) {
            cb.on_page_parsed(page.page_number, total_pages, 0);
        }
    }
    parsed
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(config: &ExtractionConfig) -> Result<ExtractionOutput, ExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(config))
}

//! # act-mcq-extract
//!
//! Extract multiple-choice questions from the ACT mathematics practice
//! test PDF into structured JSON records plus per-page images.
//!
//! The practice test is a fixed-format document: numbered stems, lettered
//! options, and an answer key at the end. This crate reads the text layer
//! with pdfium, segments it with a small token state machine, rewrites
//! equation-like spans into LaTeX-style text, joins the answer key by
//! question number, and renders one PNG for every page that carries a
//! question.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    resolve local file or download from URL
//!  ├─ 2. Pages    per-page text via pdfium (spawn_blocking)
//!  ├─ 3. Split    cut at the "Answer Key" heading
//!  ├─ 4. Parse    numbers, stems, options; typed skip reasons
//!  ├─ 5. Join     key letters onto questions by number
//!  └─ 6. Write    page_{n}.png per referenced page + act_math_questions.json
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use act_mcq_extract::{extract, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Downloads the public practice test and writes ./output
//!     let config = ExtractionConfig::default();
//!     let output = extract(&config).await?;
//!     println!("{} questions, {} answered",
//!         output.stats.questions_emitted,
//!         output.stats.answers_matched);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `act-extract` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! act-mcq-extract = { version = "0.1", default-features = false }
//! ```
//!
//! pdfium itself is loaded at runtime: set `PDFIUM_LIB_PATH`, place the
//! platform library in the working directory, or install it system-wide.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod question;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, DEFAULT_SOURCE_URL};
pub use error::{ExtractError, PageError};
pub use extract::{extract, extract_sync};
pub use output::{ExtractionOutput, ExtractionStats};
pub use pipeline::answer_key::{AnswerKey, JoinReport};
pub use pipeline::parse::{SkipReason, SkippedCandidate};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use question::{AnswerKeyEntry, AnswerOption, Equation, EquationSource, Question, QuestionKind};

//! Pipeline stages for question extraction.
//!
//! Each submodule implements one step; everything except `input` and
//! `pages` is pure and testable without a PDF.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ pages ──▶ answer_key::split ──▶ parse ──▶ answer_key::join ──▶ write
//! (URL/path) (pdfium)   (cut at heading)    (+clean,   (number → letter)  (JSON, PNG)
//!                                            equations)
//! ```
//!
//! 1. [`input`]      — resolve the source to a local PDF, downloading if needed
//! 2. [`pages`]      — per-page text, and rasters for chosen pages; pdfium
//!    calls run in `spawn_blocking`
//! 3. [`answer_key`] — split the text at the key heading, parse the key,
//!    join letters onto questions
//! 4. [`parse`]      — tokenizer and state machine producing questions and
//!    skip reasons, using [`clean`] for field cleanup and [`equations`] for
//!    LaTeX rewriting
//! 5. [`write`]      — page PNGs and the atomic JSON file

pub mod answer_key;
pub mod clean;
pub mod equations;
pub mod input;
pub mod pages;
pub mod parse;
pub mod write;

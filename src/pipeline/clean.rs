//! Text cleanup: deterministic rules applied to extracted PDF text.
//!
//! Two entry points, because page text and field text need different care:
//!
//! * [`clean_page_text`] runs before tokenising. It must keep line breaks,
//!   since the question pattern is anchored at the start of a line.
//! * [`clean_field`] runs on a finished stem or option. It may flatten
//!   everything onto one line.
//!
//! Each rule is a pure `&str → String` function and is tested on its own.

use once_cell::sync::Lazy;
use regex::Regex;

/// Prepare raw page text for the tokenizer.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 3. Replace non-breaking spaces with plain spaces
pub fn clean_page_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    replace_nbsp(&s)
}

/// Clean a stem or option body.
///
/// Rules (applied in order):
/// 1. Collapse all whitespace runs to a single space
/// 2. Remove the copyright footer and the reproduction notice
/// 3. Rewrite ACT underscore-minus notation (`_11`, `_ 11` → `-11`)
/// 4. Trim
pub fn clean_field(input: &str) -> String {
    let s = collapse_whitespace(input);
    let s = remove_legal_notices(&s);
    let s = underscore_minus(&s);
    collapse_whitespace(&s).trim().to_string()
}

// ── Rule: line endings ───────────────────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule: invisible characters ───────────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

fn replace_nbsp(input: &str) -> String {
    input.replace(['\u{00A0}', '\u{202F}'], " ")
}

// ── Rule: whitespace ─────────────────────────────────────────────────────────

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

fn collapse_whitespace(input: &str) -> String {
    RE_WHITESPACE.replace_all(input, " ").to_string()
}

// ── Rule: legal notices ──────────────────────────────────────────────────────
//
// Every page of the practice test carries a copyright line and a
// "No part of this publication ... transferred." notice in the footer. When
// the footer follows the last option on a page it lands in that option.

static RE_COPYRIGHT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)©.*?All rights reserved\.").unwrap());
static RE_REPRODUCTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)No part of.*?transferred\.").unwrap());

fn remove_legal_notices(input: &str) -> String {
    let s = RE_COPYRIGHT.replace_all(input, "");
    RE_REPRODUCTION.replace_all(&s, "").to_string()
}

// ── Rule: underscore minus ───────────────────────────────────────────────────
//
// The PDF typesets negative numbers with a long dash glyph that extracts as
// an underscore.

static RE_UNDERSCORE_MINUS: Lazy<Regex> = Lazy::new(|| Regex::new(r"_\s*(\d+)").unwrap());

fn underscore_minus(input: &str) -> String {
    RE_UNDERSCORE_MINUS.replace_all(input, "-$1").to_string()
}

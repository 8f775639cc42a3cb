//! Answer key: locate the key section, parse it, join it onto questions.
//!
//! The key sits at the end of the practice test under a heading line.
//! Everything from that heading onwards is key text; everything before it
//! is question text. [`split_at_heading`] makes that cut once, so the
//! parser never sees key entries and the key parser never sees stems.

use crate::config::ExtractionConfig;
use crate::pipeline::pages::PageText;
use crate::question::{AnswerKeyEntry, Question};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::debug;

/// `12 B`, `12. B`, `12) B`, `12: B`.
static RE_KEY_PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,3})[.):]?\s+([A-Z])\b").unwrap());

/// Page text divided at the answer-key heading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySplit {
    /// Pages to parse for questions. The heading page is cut at the
    /// heading; pages after it are dropped.
    pub question_pages: Vec<PageText>,
    /// Text from the heading to the end of the document.
    pub key_text: Option<String>,
    /// Page the heading was found on.
    pub key_page: Option<usize>,
}

/// Regex for the heading phrase: words separated by any whitespace,
/// case-insensitive, anywhere on a line.
fn heading_regex(heading: &str) -> Option<Regex> {
    let words: Vec<String> = heading.split_whitespace().map(regex::escape).collect();
    if words.is_empty() {
        return None;
    }
    Regex::new(&format!(r"(?i)\b{}\b", words.join(r"[ \t]+"))).ok()
}

/// Byte offset of the first heading line in `text`.
///
/// A heading line contains the phrase and does not end like a sentence
/// (`.`, `?`, `!`), so "See the Answer Key at the end." stays question text.
fn find_heading_line(text: &str, re: &Regex) -> Option<usize> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_end();
        if re.is_match(trimmed) && !trimmed.ends_with(['.', '?', '!']) {
            return Some(offset);
        }
        offset += line.len();
    }
    None
}

/// Cut the document at the start of the first heading line.
///
/// Without a heading, every page is question text and `key_text` is `None`.
pub fn split_at_heading(pages: &[PageText], heading: &str) -> KeySplit {
    let Some(re) = heading_regex(heading) else {
        return KeySplit {
            question_pages: pages.to_vec(),
            ..Default::default()
        };
    };

    let mut split = KeySplit::default();
    let mut key = String::new();

    for page in pages {
        if split.key_page.is_some() {
            key.push('\n');
            key.push_str(&page.text);
            continue;
        }
        match find_heading_line(&page.text, &re) {
            Some(start) => {
                debug!("Answer key heading on page {}", page.page_number);
                split.key_page = Some(page.page_number);
                split.question_pages.push(PageText {
                    page_number: page.page_number,
                    text: page.text[..start].to_string(),
                });
                key.push_str(&page.text[start..]);
            }
            None => split.question_pages.push(page.clone()),
        }
    }

    if split.key_page.is_some() {
        split.key_text = Some(key);
    }
    split
}

/// Parsed answer key: question number → letter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerKey {
    answers: BTreeMap<u32, char>,
}

impl AnswerKey {
    /// Parse every `(number, letter)` pair in `text`.
    ///
    /// Letters outside the configured labels and number 0 are ignored. When
    /// a number appears twice the first letter stands: the key text runs to
    /// the end of the document, and the printed key comes before any later
    /// `12 B`-shaped pairs such as score tables.
    pub fn parse(text: &str, config: &ExtractionConfig) -> Self {
        let mut answers = BTreeMap::new();
        for caps in RE_KEY_PAIR.captures_iter(text) {
            let Ok(number) = caps[1].parse::<u32>() else {
                continue;
            };
            let Some(letter) = caps[2].chars().next() else {
                continue;
            };
            if number == 0 || !config.is_label(letter) {
                continue;
            }
            match answers.entry(number) {
                Entry::Vacant(v) => {
                    v.insert(letter);
                }
                Entry::Occupied(o) => {
                    debug!(
                        "Key entry {} {} ignored, already {}",
                        number,
                        letter,
                        o.get()
                    );
                }
            }
        }
        Self { answers }
    }

    pub fn get(&self, number: u32) -> Option<char> {
        self.answers.get(&number).copied()
    }

    pub fn entries(&self) -> impl Iterator<Item = AnswerKeyEntry> + '_ {
        self.answers
            .iter()
            .map(|(&number, &answer)| AnswerKeyEntry { number, answer })
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

impl FromIterator<AnswerKeyEntry> for AnswerKey {
    /// First entry per number wins, as in [`AnswerKey::parse`].
    fn from_iter<I: IntoIterator<Item = AnswerKeyEntry>>(iter: I) -> Self {
        let mut answers = BTreeMap::new();
        for e in iter {
            answers.entry(e.number).or_insert(e.answer);
        }
        Self { answers }
    }
}

/// Outcome of [`join`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JoinReport {
    /// Questions that received an answer.
    pub matched: usize,
    /// Key numbers with no question to attach to, ascending.
    pub unmatched_entries: Vec<u32>,
}

/// Attach key letters to questions by number.
///
/// Questions without an entry keep their current answer. Running the join
/// twice with the same key gives the same questions.
pub fn join(mut questions: Vec<Question>, key: &AnswerKey) -> (Vec<Question>, JoinReport) {
    let mut report = JoinReport::default();
    for q in questions.iter_mut() {
        if let Some(letter) = key.get(q.number) {
            q.answer = Some(letter);
            report.matched += 1;
        }
    }

    report.unmatched_entries = key
        .answers
        .keys()
        .copied()
        .filter(|n| !questions.iter().any(|q| q.number == *n))
        .collect();

    (questions, report)
}

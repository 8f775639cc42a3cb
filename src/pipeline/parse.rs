//! Question parsing: page text → candidate questions.
//!
//! Parsing is split in two so every skip decision has one obvious home:
//!
//! 1. [`tokenize`] cuts the page into [`Token`]s. A question number is a
//!    line-start `12.` or `12)`; an option label is one of the configured
//!    letters followed by `.` or `)`, standing on its own after whitespace.
//!    A label never reaches past the end of its line. Everything in
//!    between is text.
//! 2. [`parse_page`] runs a small state machine over the tokens:
//!
//! ```text
//! Preamble ──Number──▶ Stem ──Label(A, line start)──▶ Options ──Label(next)──▶ Options
//!                       │                    │  └──other label──▶ Rejected
//!                       └──Number──▶ (finish, next question) ◀────┘
//! ```
//!
//! A candidate that does not make it to a clean question is dropped whole
//! and reported with its [`SkipReason`]; nothing is recorded partially.

use crate::config::ExtractionConfig;
use crate::pipeline::clean::{clean_field, clean_page_text};
use crate::pipeline::equations::{extract, rewrite_inline};
use crate::pipeline::pages::PageText;
use crate::question::{AnswerOption, Equation, EquationSource, Question, QuestionKind};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

/// Stems shorter than this are page furniture, not questions.
pub const MIN_STEM_CHARS: usize = 5;

static RE_QUESTION_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*(\d{1,3})[.)]\s+").unwrap());
static RE_OPTION_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)([A-Z])[.)](?:[ \t]+|$)").unwrap());

/// One lexical unit of page text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// Question number at the start of a line.
    Number(u32),
    /// Option label; `raw` is the matched text so it can be put back into a
    /// stem when the letter turns out not to start the options. Only a
    /// `line_start` `A` opens the options.
    Label {
        label: char,
        raw: &'a str,
        line_start: bool,
    },
    Text(&'a str),
}

/// Why a candidate question was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// Question number 0.
    InvalidNumber,
    /// No first option label followed the stem.
    NoOptions,
    /// Fewer options than `min_options`.
    TooFewOptions { found: usize, required: usize },
    /// A label appeared out of sequence once options had started.
    OutOfOrderLabel { expected: Option<char>, found: char },
    /// An option label with no text after cleanup.
    EmptyOption { label: char },
    /// Cleaned stem shorter than [`MIN_STEM_CHARS`].
    StemTooShort,
    /// Stem matched an instruction phrase.
    Boilerplate { phrase: String },
    /// The number was already taken by an earlier question.
    DuplicateNumber,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InvalidNumber => write!(f, "invalid question number"),
            SkipReason::NoOptions => write!(f, "no options"),
            SkipReason::TooFewOptions { found, required } => {
                write!(f, "{found} option(s), {required} required")
            }
            SkipReason::OutOfOrderLabel {
                expected: Some(e),
                found,
            } => write!(f, "label {found} where {e} was expected"),
            SkipReason::OutOfOrderLabel {
                expected: None,
                found,
            } => write!(f, "label {found} after the last option"),
            SkipReason::EmptyOption { label } => write!(f, "option {label} is empty"),
            SkipReason::StemTooShort => write!(f, "stem too short"),
            SkipReason::Boilerplate { phrase } => write!(f, "instruction text ({phrase:?})"),
            SkipReason::DuplicateNumber => write!(f, "duplicate question number"),
        }
    }
}

/// A dropped candidate, kept for the run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedCandidate {
    pub page: usize,
    pub number: u32,
    pub reason: SkipReason,
}

/// Result of parsing one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageParse {
    pub page: usize,
    pub questions: Vec<Question>,
    pub skipped: Vec<SkippedCandidate>,
}

/// Questions accumulated across pages, with numbers kept unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedQuestions {
    pub questions: Vec<Question>,
    pub skipped: Vec<SkippedCandidate>,
    seen: HashSet<u32>,
}

impl ParsedQuestions {
    /// Fold one page into the set. The first question to claim a number
    /// keeps it; later ones are skipped as duplicates.
    ///
    /// Returns how many questions from this page were accepted.
    pub fn merge(&mut self, page: PageParse) -> usize {
        let mut accepted = 0;
        self.skipped.extend(page.skipped);
        for q in page.questions {
            if self.seen.insert(q.number) {
                self.questions.push(q);
                accepted += 1;
            } else {
                debug!("Page {}: question {} already seen, skipping", q.page, q.number);
                self.skipped.push(SkippedCandidate {
                    page: q.page,
                    number: q.number,
                    reason: SkipReason::DuplicateNumber,
                });
            }
        }
        accepted
    }
}

/// Parse every page in order.
pub fn parse_document(pages: &[PageText], config: &ExtractionConfig) -> ParsedQuestions {
    let mut parsed = ParsedQuestions::default();
    for page in pages {
        parsed.merge(parse_page(page, config));
    }
    parsed
}

/// Cut page text into question numbers, option labels and text.
pub fn tokenize<'a>(text: &'a str, config: &ExtractionConfig) -> Vec<Token<'a>> {
    let mut marks: Vec<(usize, usize, Token<'a>)> = Vec::new();

    for caps in RE_QUESTION_NUMBER.captures_iter(text) {
        let (Some(whole), Some(digits)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if let Ok(n) = digits.as_str().parse::<u32>() {
            marks.push((whole.start(), whole.end(), Token::Number(n)));
        }
    }

    for caps in RE_OPTION_LABEL.captures_iter(text) {
        let (Some(whole), Some(letter)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let label = letter.as_str().chars().next().unwrap_or('\0');
        let before = &text[..whole.start()];
        let standalone = before.chars().next_back().is_none_or(char::is_whitespace);
        if standalone && config.is_label(label) {
            let line_start = before
                .rsplit('\n')
                .next()
                .is_none_or(|line| line.trim().is_empty());
            marks.push((
                whole.start(),
                whole.end(),
                Token::Label {
                    label,
                    raw: whole.as_str(),
                    line_start,
                },
            ));
        }
    }

    marks.sort_by_key(|(start, _, _)| *start);

    let mut tokens = Vec::with_capacity(marks.len() * 2 + 1);
    let mut pos = 0;
    for (start, end, token) in marks {
        if start < pos {
            // Overlaps an earlier mark.
            continue;
        }
        if start > pos {
            tokens.push(Token::Text(&text[pos..start]));
        }
        tokens.push(token);
        pos = end;
    }
    if pos < text.len() {
        tokens.push(Token::Text(&text[pos..]));
    }
    tokens
}

enum State {
    Preamble,
    Stem {
        number: u32,
        stem: String,
    },
    Options {
        number: u32,
        stem: String,
        options: Vec<(char, String)>,
    },
    Rejected {
        number: u32,
        reason: SkipReason,
    },
}

/// Parse the questions on one page.
pub fn parse_page(page: &PageText, config: &ExtractionConfig) -> PageParse {
    let mut out = PageParse {
        page: page.page_number,
        ..PageParse::default()
    };
    let mut state = State::Preamble;

    let text = clean_page_text(&page.text);
    for token in tokenize(&text, config) {
        state = match (state, token) {
            (current, Token::Number(n)) => {
                finish(current, page.page_number, config, &mut out);
                State::Stem {
                    number: n,
                    stem: String::new(),
                }
            }
            (State::Preamble, _) => State::Preamble,
            (State::Stem { number, mut stem }, Token::Text(t)) => {
                stem.push_str(t);
                State::Stem { number, stem }
            }
            (
                State::Stem { number, stem },
                Token::Label {
                    label: 'A',
                    line_start: true,
                    ..
                },
            ) => State::Options {
                number,
                stem,
                options: vec![('A', String::new())],
            },
            (State::Stem { number, mut stem }, Token::Label { raw, .. }) => {
                stem.push_str(raw);
                State::Stem { number, stem }
            }
            (
                State::Options {
                    number,
                    stem,
                    mut options,
                },
                Token::Text(t),
            ) => {
                if let Some((_, body)) = options.last_mut() {
                    body.push_str(t);
                }
                State::Options {
                    number,
                    stem,
                    options,
                }
            }
            (
                State::Options {
                    number,
                    stem,
                    mut options,
                },
                Token::Label { label, .. },
            ) => {
                let expected = options
                    .last()
                    .and_then(|(last, _)| next_label(*last, config));
                if expected == Some(label) {
                    options.push((label, String::new()));
                    State::Options {
                        number,
                        stem,
                        options,
                    }
                } else {
                    State::Rejected {
                        number,
                        reason: SkipReason::OutOfOrderLabel {
                            expected,
                            found: label,
                        },
                    }
                }
            }
            (rejected @ State::Rejected { .. }, _) => rejected,
        };
    }
    finish(state, page.page_number, config, &mut out);

    if !out.questions.is_empty() || !out.skipped.is_empty() {
        debug!(
            "Page {}: {} question(s), {} skipped",
            page.page_number,
            out.questions.len(),
            out.skipped.len()
        );
    }
    out
}

fn next_label(label: char, config: &ExtractionConfig) -> Option<char> {
    char::from_u32(label as u32 + 1).filter(|c| config.is_label(*c))
}

/// Close the candidate held by `state`, if any.
fn finish(state: State, page: usize, config: &ExtractionConfig, out: &mut PageParse) {
    let result = match state {
        State::Preamble => return,
        State::Stem { number, .. } => Err((number, SkipReason::NoOptions)),
        State::Rejected { number, reason } => Err((number, reason)),
        State::Options {
            number,
            stem,
            options,
        } => build_question(number, &stem, options, page, config).map_err(|r| (number, r)),
    };
    match result {
        Ok(q) => out.questions.push(q),
        Err((number, reason)) => {
            debug!("Page {page}: skipping question {number}: {reason}");
            out.skipped.push(SkippedCandidate {
                page,
                number,
                reason,
            });
        }
    }
}

fn build_question(
    number: u32,
    raw_stem: &str,
    raw_options: Vec<(char, String)>,
    page: usize,
    config: &ExtractionConfig,
) -> Result<Question, SkipReason> {
    if number == 0 {
        return Err(SkipReason::InvalidNumber);
    }
    if raw_options.len() < config.min_options {
        return Err(SkipReason::TooFewOptions {
            found: raw_options.len(),
            required: config.min_options,
        });
    }

    let stem = clean_field(raw_stem);
    let lower = stem.to_lowercase();
    if let Some(phrase) = config
        .boilerplate_phrases
        .iter()
        .find(|p| lower.contains(&p.to_lowercase()))
    {
        return Err(SkipReason::Boilerplate {
            phrase: phrase.clone(),
        });
    }
    if stem.chars().count() < MIN_STEM_CHARS {
        return Err(SkipReason::StemTooShort);
    }

    let mut options = Vec::with_capacity(raw_options.len());
    for (key, body) in raw_options {
        let text = clean_field(&body);
        if text.is_empty() {
            return Err(SkipReason::EmptyOption { label: key });
        }
        options.push(AnswerOption { key, text });
    }

    let question_type = QuestionKind::classify(&stem, options.len());
    let (stem_latex, mut equations) = rewrite_inline(&stem, EquationSource::Stem);
    for option in &options {
        for eq in extract(&option.text, EquationSource::Option(option.key)) {
            push_equation(&mut equations, eq);
        }
    }

    Ok(Question {
        question_id: config.question_id(number),
        number,
        question_type,
        stem: stem_latex,
        options,
        answer: None,
        equations,
        page,
        image: None,
    })
}

fn push_equation(equations: &mut Vec<Equation>, eq: Equation) {
    if !equations
        .iter()
        .any(|e| e.source == eq.source && e.latex == eq.latex)
    {
        equations.push(eq);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ExtractionConfig {
        ExtractionConfig::default()
    }

    fn page(n: usize, text: &str) -> PageText {
        PageText {
            page_number: n,
            text: text.to_string(),
        }
    }

    #[test]
    fn tokenize_inline_options() {
        let c = config();
        let tokens = tokenize("12. What is 3/4 + 1/2?\nA) 5/4  B) 1", &c);
        assert_eq!(
            tokens,
            vec![
                Token::Number(12),
                Token::Text("What is 3/4 + 1/2?\n"),
                Token::Label {
                    label: 'A',
                    raw: "A) ",
                    line_start: true
                },
                Token::Text("5/4  "),
                Token::Label {
                    label: 'B',
                    raw: "B) ",
                    line_start: false
                },
                Token::Text("1"),
            ]
        );
    }

    #[test]
    fn tokenize_ignores_letters_inside_words() {
        let c = config();
        let tokens = tokenize("1. Point QA. lies on line", &c);
        assert_eq!(
            tokens,
            vec![Token::Number(1), Token::Text("Point QA. lies on line")]
        );
    }

    #[test]
    fn tokenize_ignores_letters_past_last_label() {
        let c = ExtractionConfig::builder().last_label('D').build().unwrap();
        let tokens = tokenize("E. text", &c);
        assert_eq!(tokens, vec![Token::Text("E. text")]);
    }

    #[test]
    fn number_must_start_a_line() {
        let c = config();
        let tokens = tokenize("see 12. below", &c);
        assert_eq!(tokens, vec![Token::Text("see 12. below")]);
    }

    #[test]
    fn label_stops_at_end_of_line() {
        let c = config();
        let tokens = tokenize("B.\n  2. Next", &c);
        assert_eq!(
            tokens,
            vec![
                Token::Label {
                    label: 'B',
                    raw: "B.",
                    line_start: true
                },
                Token::Text("\n"),
                Token::Number(2),
                Token::Text("Next"),
            ]
        );
    }

    #[test]
    fn point_name_in_stem_does_not_open_options() {
        let text = "14. Line l passes through point A. What is the slope of line l?\n\
                    A. 1\nB. 2\nC. 3\nD. 4\n";
        let parsed = parse_page(&page(7, text), &config());
        assert!(parsed.skipped.is_empty(), "{:?}", parsed.skipped);
        let q = &parsed.questions[0];
        assert_eq!(
            q.stem,
            "Line l passes through point A. What is the slope of line l?"
        );
        assert_eq!(q.options.len(), 4);
        assert_eq!(q.option('A'), Some("1"));
    }

    #[test]
    fn empty_last_option_does_not_swallow_next_question() {
        let text = "1. What is the value of x?\nA. 1\nB.\n  2. What is the value of y?\n\
                    A. 5\nB. 6\n";
        let parsed = parse_page(&page(2, text), &config());
        assert_eq!(parsed.questions.len(), 1);
        assert_eq!(parsed.questions[0].number, 2);
        assert_eq!(
            parsed.skipped,
            vec![SkippedCandidate {
                page: 2,
                number: 1,
                reason: SkipReason::EmptyOption { label: 'B' },
            }]
        );
    }

    #[test]
    fn parses_question_with_options_on_separate_lines() {
        let text = "3. Which of the following is equal to 2x + 3x?\n\
                    A. 5x\n\
                    B. 6x\n\
                    C. 5x^2\n\
                    D. 6x^2\n";
        let parsed = parse_page(&page(2, text), &config());
        assert!(parsed.skipped.is_empty(), "{:?}", parsed.skipped);
        let q = &parsed.questions[0];
        assert_eq!(q.number, 3);
        assert_eq!(q.question_id, "act_math_3");
        assert_eq!(q.page, 2);
        assert_eq!(q.stem, "Which of the following is equal to 2x + 3x?");
        let keys: Vec<char> = q.options.iter().map(|o| o.key).collect();
        assert_eq!(keys, vec!['A', 'B', 'C', 'D']);
        assert_eq!(q.option('C'), Some("5x^2"));
        assert_eq!(q.question_type, QuestionKind::SingleChoice);
        assert!(q
            .equations
            .iter()
            .any(|e| e.source == EquationSource::Option('C') && e.latex == "5x^{2}"));
    }

    #[test]
    fn stem_equations_are_rewritten_inline() {
        let text = "12. What is 3/4 + 1/2?\nA) 5/4  B) 1  C) 5/6  D) 2";
        let parsed = parse_page(&page(5, text), &config());
        let q = &parsed.questions[0];
        assert!(q.stem.contains(r"\frac{3}{4} + \frac{1}{2}"), "stem: {}", q.stem);
        assert_eq!(q.option('A'), Some("5/4"));
        assert_eq!(q.option('D'), Some("2"));
        assert_eq!(q.equations[0].source, EquationSource::Stem);
        assert_eq!(q.equations[0].raw, "3/4");
    }

    #[test]
    fn page_without_questions_yields_nothing() {
        let text = "DIRECTIONS: Solve each problem and choose the correct answer.\n\
                    You may use a calculator.";
        let parsed = parse_page(&page(1, text), &config());
        assert!(parsed.questions.is_empty());
        assert!(parsed.skipped.is_empty());
    }

    #[test]
    fn out_of_order_label_drops_candidate() {
        let text = "4. What is the slope of the line?\nA. 1\nC. 3\nB. 2\n\
                    5. What is the intercept of the line?\nA. 0\nB. 1\n";
        let parsed = parse_page(&page(3, text), &config());
        assert_eq!(parsed.questions.len(), 1);
        assert_eq!(parsed.questions[0].number, 5);
        assert_eq!(
            parsed.skipped,
            vec![SkippedCandidate {
                page: 3,
                number: 4,
                reason: SkipReason::OutOfOrderLabel {
                    expected: Some('B'),
                    found: 'C'
                },
            }]
        );
    }

    #[test]
    fn missing_first_label_drops_candidate() {
        let text = "6. What is the value of y?\nB. 2\nC. 3\n";
        let parsed = parse_page(&page(1, text), &config());
        assert!(parsed.questions.is_empty());
        assert_eq!(parsed.skipped[0].reason, SkipReason::NoOptions);
    }

    #[test]
    fn repeated_label_after_last_is_rejected() {
        let c = ExtractionConfig::builder().last_label('B').build().unwrap();
        let text = "7. What is the value of z?\nA. 1\nB. 2\nA. 3\n";
        let parsed = parse_page(&page(1, text), &c);
        assert_eq!(
            parsed.skipped[0].reason,
            SkipReason::OutOfOrderLabel {
                expected: None,
                found: 'A'
            }
        );
    }

    #[test]
    fn empty_option_drops_candidate() {
        let text = "8. What is the value of w?\nA) B) 4\n";
        let parsed = parse_page(&page(1, text), &config());
        assert_eq!(
            parsed.skipped[0].reason,
            SkipReason::EmptyOption { label: 'A' }
        );
    }

    #[test]
    fn instruction_text_is_boilerplate() {
        let text = "1. Do not linger over problems that take too much time.\nA. yes\n";
        let parsed = parse_page(&page(1, text), &config());
        assert!(matches!(
            parsed.skipped[0].reason,
            SkipReason::Boilerplate { .. }
        ));
    }

    #[test]
    fn short_stem_is_dropped() {
        let parsed = parse_page(&page(1, "9. Why\nA. 1\n"), &config());
        assert_eq!(parsed.skipped[0].reason, SkipReason::StemTooShort);
    }

    #[test]
    fn too_few_options() {
        let c = ExtractionConfig::builder().min_options(3).build().unwrap();
        let parsed = parse_page(&page(1, "10. What is the value of k?\nA. 1\nB. 2\n"), &c);
        assert_eq!(
            parsed.skipped[0].reason,
            SkipReason::TooFewOptions {
                found: 2,
                required: 3
            }
        );
    }

    #[test]
    fn footer_is_stripped_from_last_option() {
        let text = "11. What is the value of 2 + 2?\nA. 3\nB. 4\n\
                    © 2023 by ACT, Inc. All rights reserved.\n";
        let parsed = parse_page(&page(1, text), &config());
        assert_eq!(parsed.questions[0].option('B'), Some("4"));
    }

    #[test]
    fn duplicate_numbers_keep_the_first() {
        let pages = vec![
            page(1, "1. What is the first value?\nA. 1\nB. 2\n"),
            page(2, "1. What is the repeated value?\nA. 3\nB. 4\n"),
        ];
        let parsed = parse_document(&pages, &config());
        assert_eq!(parsed.questions.len(), 1);
        assert_eq!(parsed.questions[0].page, 1);
        assert_eq!(parsed.skipped[0].reason, SkipReason::DuplicateNumber);
        assert_eq!(parsed.skipped[0].page, 2);
    }

    #[test]
    fn merge_reports_accepted_count() {
        let mut set = ParsedQuestions::default();
        let first = parse_page(
            &page(1, "1. What is one?\nA. 1\n2. What is two?\nA. 2\n"),
            &config(),
        );
        assert_eq!(set.merge(first), 2);
        let again = parse_page(&page(2, "2. What is two again?\nA. 2\n"), &config());
        assert_eq!(set.merge(again), 0);
    }

    #[test]
    fn raw_pdf_line_endings_are_normalised_first() {
        let text = "2.\u{00A0}What is the value of x?\r\nA.\u{00A0}4\r\nB. 5\r";
        let parsed = parse_page(&page(1, text), &config());
        assert_eq!(parsed.questions.len(), 1, "{:?}", parsed.skipped);
        assert_eq!(parsed.questions[0].option('A'), Some("4"));
    }

    #[test]
    fn skip_reason_display() {
        let r = SkipReason::OutOfOrderLabel {
            expected: Some('B'),
            found: 'D',
        };
        assert_eq!(r.to_string(), "label D where B was expected");
    }
}

//! Question records produced by the pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One multiple-choice question recovered from the PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// `{prefix}_{number}`, e.g. `act_math_12`.
    pub question_id: String,
    /// Question number as printed in the document; unique across the output.
    pub number: u32,
    pub question_type: QuestionKind,
    /// Cleaned stem with equation-like spans rewritten to LaTeX.
    #[serde(rename = "question_text")]
    pub stem: String,
    /// Options in label order, text verbatim after cleanup.
    pub options: Vec<AnswerOption>,
    /// Letter from the answer key, absent until joined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<char>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub equations: Vec<Equation>,
    /// 1-indexed page the question was found on.
    pub page: usize,
    /// PNG of that page, once written.
    pub image: Option<PathBuf>,
}

impl Question {
    /// Text of the option with the given label.
    pub fn option(&self, label: char) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.key == label)
            .map(|o| o.text.as_str())
    }
}

/// A labelled answer option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub key: char,
    pub text: String,
}

/// Coarse question classification carried over into the JSON records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    /// Three or more options.
    SingleChoice,
    /// Few options and a stem asking to compute something.
    Application,
    FillInBlank,
}

const SOLVE_CUES: &[&str] = &["calculate", "solve", "find", "what is"];

impl QuestionKind {
    /// Classify from the option count and the stem wording.
    pub fn classify(stem: &str, option_count: usize) -> Self {
        if option_count >= 3 {
            return QuestionKind::SingleChoice;
        }
        let lower = stem.to_lowercase();
        if SOLVE_CUES.iter().any(|cue| lower.contains(cue)) {
            QuestionKind::Application
        } else {
            QuestionKind::FillInBlank
        }
    }
}

/// An equation-like span and the field it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equation {
    pub source: EquationSource,
    /// Substring as it appeared in the cleaned text.
    pub raw: String,
    /// Normalised LaTeX-style form.
    pub latex: String,
}

/// Field an [`Equation`] was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquationSource {
    Stem,
    Option(char),
}

/// One `(number, letter)` pair parsed from the answer key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerKeyEntry {
    pub number: u32,
    pub answer: char,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_by_option_count_then_cue() {
        assert_eq!(QuestionKind::classify("Anything", 4), QuestionKind::SingleChoice);
        assert_eq!(
            QuestionKind::classify("What is the value of x?", 2),
            QuestionKind::Application
        );
        assert_eq!(
            QuestionKind::classify("The slope of the line is ____.", 1),
            QuestionKind::FillInBlank
        );
    }

    #[test]
    fn serialises_in_record_shape() {
        let q = Question {
            question_id: "act_math_3".into(),
            number: 3,
            question_type: QuestionKind::SingleChoice,
            stem: "What is \\frac{1}{2}?".into(),
            options: vec![
                AnswerOption { key: 'A', text: "1".into() },
                AnswerOption { key: 'B', text: "2".into() },
                AnswerOption { key: 'C', text: "3".into() },
            ],
            answer: None,
            equations: vec![],
            page: 2,
            image: Some(PathBuf::from("output/page_2.png")),
        };
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["question_text"], "What is \\frac{1}{2}?");
        assert_eq!(json["question_type"], "single_choice");
        assert_eq!(json["options"][1]["key"], "B");
        assert!(json.get("answer").is_none());
        assert!(json.get("equations").is_none());
        assert_eq!(q.option('C'), Some("3"));
    }

    #[test]
    fn equation_source_tags() {
        let e = Equation {
            source: EquationSource::Option('D'),
            raw: "x^2".into(),
            latex: "x^{2}".into(),
        };
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["source"]["option"], "D");
        let stem = serde_json::to_value(EquationSource::Stem).unwrap();
        assert_eq!(stem, "stem");
    }
}

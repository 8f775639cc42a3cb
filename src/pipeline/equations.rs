//! Equation normalisation: equation-like spans → LaTeX-style text.
//!
//! Detection and rewriting are separate passes. `RE_MATH` decides *where*
//! an equation is; [`normalize`] decides *how* it is written. The rewrite is
//! lossy and best-effort: a span none of the rules understand comes back
//! unchanged, and no input can make it fail.

use crate::question::{Equation, EquationSource};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Secondary pattern flagging mathematical notation inside question text.
///
/// Alternatives are tried left to right at each position, so the more
/// specific forms come first.
static RE_MATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
          [A-Za-z0-9)]\s*[⁰¹²³⁴⁵⁶⁷⁸⁹]+                               # x², (x+1)³
        | (?:\w+|\([^()]*\))\s*\^\s*(?:\{[^{}]*\}|\([^()]*\)|\w+)   # x^2, (x+1)^(n)
        | \d+\s*/\s*\d+                                              # 3/4
        | √\s*(?:\([^()]*\)|\w+)                                     # √5, √(x+1)
        | ∠\s*\w+                                                    # ∠ABC
        | [≤≥≠÷×π°]
        ",
    )
    .unwrap()
});

static RE_SUPERSCRIPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z0-9)])\s*([⁰¹²³⁴⁵⁶⁷⁸⁹]+)").unwrap());
static RE_CARET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\w+|\([^()]*\))\s*\^\s*(\{[^{}]*\}|\([^()]*\)|\w+)").unwrap()
});
static RE_ROOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"√\s*(\([^()]*\)|\w+)").unwrap());
static RE_FRACTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*/\s*(\d+)").unwrap());
static RE_ANGLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"∠\s*(\w+)").unwrap());

const SYMBOLS: &[(char, &str)] = &[
    ('≤', r"\leq"),
    ('≥', r"\geq"),
    ('≠', r"\neq"),
    ('÷', r"\div"),
    ('×', r"\times"),
    ('π', r"\pi"),
    ('°', r"^{\circ}"),
];

/// Rewrite one equation-like span into LaTeX-style text.
///
/// ```rust
/// use act_mcq_extract::pipeline::equations::normalize;
///
/// assert_eq!(normalize("3/4"), r"\frac{3}{4}");
/// assert_eq!(normalize("x^2"), "x^{2}");
/// assert_eq!(normalize("plain words"), "plain words");
/// ```
pub fn normalize(raw: &str) -> String {
    let s = RE_SUPERSCRIPT.replace_all(raw, |caps: &Captures<'_>| {
        let digits: String = caps[2].chars().filter_map(superscript_digit).collect();
        format!("{}^{{{}}}", &caps[1], digits)
    });
    let s = RE_CARET.replace_all(&s, |caps: &Captures<'_>| {
        format!("{}^{{{}}}", &caps[1], strip_group(&caps[2]))
    });
    let s = RE_ROOT.replace_all(&s, |caps: &Captures<'_>| {
        format!(r"\sqrt{{{}}}", strip_group(&caps[1]))
    });
    let s = RE_FRACTION.replace_all(&s, r"\frac{$1}{$2}");
    let s = RE_ANGLE.replace_all(&s, r"\angle $1");
    replace_symbols(&s)
}

/// Find every equation-like span in `text`, normalised, deduplicated by
/// LaTeX form in first-seen order. The text itself is not modified.
pub fn extract(text: &str, source: EquationSource) -> Vec<Equation> {
    let mut out = Vec::new();
    for m in RE_MATH.find_iter(text) {
        push_unique(&mut out, source, m.as_str());
    }
    out
}

/// Replace every equation-like span in `text` with its normalised form.
///
/// Returns the rewritten text plus the equations found, each tagged with
/// `source` so callers can tell which field it came from.
pub fn rewrite_inline(text: &str, source: EquationSource) -> (String, Vec<Equation>) {
    let mut equations = Vec::new();
    let rewritten = RE_MATH.replace_all(text, |caps: &Captures<'_>| {
        let raw = &caps[0];
        push_unique(&mut equations, source, raw);
        normalize(raw)
    });
    (rewritten.into_owned(), equations)
}

fn push_unique(out: &mut Vec<Equation>, source: EquationSource, raw: &str) {
    let latex = normalize(raw);
    if out.iter().any(|e| e.latex == latex) {
        return;
    }
    out.push(Equation {
        source,
        raw: raw.to_string(),
        latex,
    });
}

fn superscript_digit(c: char) -> Option<char> {
    let d = match c {
        '⁰' => '0',
        '¹' => '1',
        '²' => '2',
        '³' => '3',
        '⁴' => '4',
        '⁵' => '5',
        '⁶' => '6',
        '⁷' => '7',
        '⁸' => '8',
        '⁹' => '9',
        _ => return None,
    };
    Some(d)
}

/// `(n+1)` / `{n+1}` → `n+1`; anything else unchanged.
fn strip_group(s: &str) -> &str {
    s.strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .or_else(|| s.strip_prefix('{').and_then(|t| t.strip_suffix('}')))
        .unwrap_or(s)
}

fn replace_symbols(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 8);
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        match SYMBOLS.iter().find(|(sym, _)| *sym == c) {
            Some((_, latex)) => {
                out.push_str(latex);
                // `\pir` would read as one command.
                if latex.ends_with(|l: char| l.is_ascii_alphabetic())
                    && chars.peek().is_some_and(|n| n.is_ascii_alphanumeric())
                {
                    out.push(' ');
                }
            }
            None => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction() {
        assert_eq!(normalize("3/4"), r"\frac{3}{4}");
        assert_eq!(normalize("12 / 5"), r"\frac{12}{5}");
    }

    #[test]
    fn caret_exponents() {
        assert_eq!(normalize("x^2"), "x^{2}");
        assert_eq!(normalize("x ^ 10"), "x^{10}");
        assert_eq!(normalize("(x+1)^3"), "(x+1)^{3}");
        assert_eq!(normalize("2^(n+1)"), "2^{n+1}");
        assert_eq!(normalize("e^{2}"), "e^{2}");
    }

    #[test]
    fn superscripts() {
        assert_eq!(normalize("x²"), "x^{2}");
        assert_eq!(normalize("y ³"), "y^{3}");
        assert_eq!(normalize("10¹²"), "10^{12}");
    }

    #[test]
    fn roots_and_angles() {
        assert_eq!(normalize("√5"), r"\sqrt{5}");
        assert_eq!(normalize("√(x+1)"), r"\sqrt{x+1}");
        assert_eq!(normalize("∠ABC"), r"\angle ABC");
    }

    #[test]
    fn symbols() {
        assert_eq!(normalize("≤"), r"\leq");
        assert_eq!(normalize("≥"), r"\geq");
        assert_eq!(normalize("×"), r"\times");
        assert_eq!(normalize("÷"), r"\div");
        assert_eq!(normalize("45°"), r"45^{\circ}");
        assert_eq!(normalize("2πr"), r"2\pi r");
        assert_eq!(normalize("x ≤ 4"), r"x \leq 4");
    }

    #[test]
    fn unrecognised_input_passes_through() {
        for s in ["", "hello", "a + b", "((", "√", "^^", "/ /", "∠", "x^", "1/"] {
            assert_eq!(normalize(s), s, "input {s:?}");
        }
    }

    #[test]
    fn never_panics_on_odd_input() {
        let inputs = [
            "√(((", "x^{", "^{}", "²²²", "∠∠∠", "3//4", "(x+1)^(", "≤≥≠÷×π°",
            "\u{0}\u{FFFF}", "１/２",
        ];
        for s in inputs {
            let _ = normalize(s);
            let _ = rewrite_inline(s, EquationSource::Stem);
        }
    }

    #[test]
    fn inline_rewrite_keeps_surrounding_text() {
        let (text, eqs) = rewrite_inline("What is 3/4 + 1/2?", EquationSource::Stem);
        assert_eq!(text, r"What is \frac{3}{4} + \frac{1}{2}?");
        assert_eq!(eqs.len(), 2);
        assert_eq!(eqs[0].raw, "3/4");
        assert_eq!(eqs[1].latex, r"\frac{1}{2}");
        assert!(eqs.iter().all(|e| e.source == EquationSource::Stem));
    }

    #[test]
    fn extract_deduplicates_and_tags_source() {
        let eqs = extract("x^2 plus x^2 plus 5/4", EquationSource::Option('B'));
        let latex: Vec<_> = eqs.iter().map(|e| e.latex.as_str()).collect();
        assert_eq!(latex, vec!["x^{2}", r"\frac{5}{4}"]);
        assert!(eqs.iter().all(|e| e.source == EquationSource::Option('B')));
    }

    #[test]
    fn text_without_math_has_no_equations() {
        let (text, eqs) = rewrite_inline("Which statement is true?", EquationSource::Stem);
        assert_eq!(text, "Which statement is true?");
        assert!(eqs.is_empty());
    }
}

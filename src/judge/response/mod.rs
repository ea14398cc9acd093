//! Turn a raw judge response into a typed [`Judgment`].
//!
//! Parsing never fails: a response no rule can interpret comes back as the
//! raw text with `parse_succeeded = false`.

mod json;
mod reasoning;

pub use json::{extract_json, first_balanced_object};
pub use reasoning::split_reasoning;

use regex::{Regex, RegexBuilder};
use std::sync::OnceLock;

use crate::template::ParserRules;
use crate::types::{Judgment, JudgmentValue, Preference};

/// Parse `raw` according to `rules`. When `reasoning_requested` is set, the
/// text after the reasoning marker is split off first and only the text
/// before it is interpreted.
pub fn parse(rules: &ParserRules, raw: &str, reasoning_requested: bool) -> Judgment {
    let (segment, reasoning) = split_reasoning(raw, reasoning_requested);

    let value = match rules {
        ParserRules::Binary {
            positive_patterns,
            negative_patterns,
        } => parse_binary(segment, positive_patterns, negative_patterns).map(JudgmentValue::Bool),
        ParserRules::Numeric { pattern } => parse_numeric(segment, pattern).map(JudgmentValue::Number),
        ParserRules::Preference { pattern } => {
            parse_preference(segment, pattern).map(JudgmentValue::Preference)
        }
        ParserRules::Json { .. } => extract_json(segment).map(JudgmentValue::Json),
        ParserRules::Text => Some(JudgmentValue::Text(segment.to_string())),
    };

    match value {
        Some(value) => Judgment::parsed(raw, value, reasoning),
        None => {
            tracing::debug!(rule = %rules.kind(), "judge response did not match parser rules");
            Judgment::fallback(raw, reasoning)
        }
    }
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!(error = %e, pattern, "invalid parser pattern");
            None
        }
    }
}

/// Leftmost case-insensitive occurrence of any pattern decides; a tie at the
/// same index goes to the positive side.
fn parse_binary(text: &str, positive: &[String], negative: &[String]) -> Option<bool> {
    let lower = text.to_lowercase();
    let leftmost = |patterns: &[String]| {
        patterns
            .iter()
            .filter(|p| !p.is_empty())
            .filter_map(|p| lower.find(&p.to_lowercase()))
            .min()
    };
    match (leftmost(positive), leftmost(negative)) {
        (Some(pos), Some(neg)) => Some(pos <= neg),
        (Some(_), None) => Some(true),
        (None, Some(_)) => Some(false),
        (None, None) => None,
    }
}

fn parse_number(token: &str) -> Option<serde_json::Number> {
    let token = token.trim();
    if let Ok(n) = token.parse::<i64>() {
        return Some(n.into());
    }
    token
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
}

/// First match only; its first capture group (or the whole match when the
/// pattern has no group) must convert to a number.
fn parse_numeric(text: &str, pattern: &str) -> Option<serde_json::Number> {
    let re = compile(pattern)?;
    let caps = re.captures(text)?;
    let token = caps.get(1).or_else(|| caps.get(0))?;
    parse_number(token.as_str())
}

fn tie_token() -> &'static Regex {
    static TIE: OnceLock<Regex> = OnceLock::new();
    TIE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:equal|same|tie|equivalent)\b").expect("static regex")
    })
}

fn compile_case_insensitive(pattern: &str) -> Option<Regex> {
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!(error = %e, pattern, "invalid parser pattern");
            None
        }
    }
}

/// A match counts only when it does not start or end inside a word, so the
/// `a` of "answer" is never read as a verdict.
fn is_standalone(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

/// The first standalone match of the pattern (case-insensitive) picks `A` or
/// `B`. A tie word (`equal`, `same`, `tie`, `equivalent`) that appears before
/// that match, or with no match at all, means a tie.
fn parse_preference(text: &str, pattern: &str) -> Option<Preference> {
    let re = compile_case_insensitive(pattern)?;
    let choice = re.captures_iter(text).find_map(|caps| {
        let whole = caps.get(0)?;
        let token = caps.get(1).unwrap_or(whole);
        if !is_standalone(text, whole.start(), token.end()) {
            return None;
        }
        Preference::from_token(token.as_str()).map(|p| (whole.start(), p))
    });
    let tie_at = tie_token().find(text).map(|m| m.start());

    match (choice, tie_at) {
        (Some((start, _)), Some(tie)) if tie < start => Some(Preference::Equal),
        (Some((_, preference)), _) => Some(preference),
        (None, Some(_)) => Some(Preference::Equal),
        (None, None) => None,
    }
}

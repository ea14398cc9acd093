use crate::judge::prompt::REASONING_DELIMITER;

/// Split a response into its judgment-bearing part and the reasoning that
/// follows the first `Reasoning:` marker.
///
/// Without a request for reasoning, or without the marker, the whole
/// response is returned untouched and no reasoning is reported.
pub fn split_reasoning(raw: &str, requested: bool) -> (&str, Option<String>) {
    if !requested {
        return (raw, None);
    }
    match raw.find(REASONING_DELIMITER) {
        Some(idx) => {
            let judgment = raw[..idx].trim();
            let reasoning = raw[idx + REASONING_DELIMITER.len()..].trim();
            (judgment, Some(reasoning.to_string()))
        }
        None => (raw, None),
    }
}

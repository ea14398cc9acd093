/// Locate the first balanced `{...}` in `text`.
///
/// Braces inside JSON string literals (including escaped quotes) do not
/// count towards nesting. Returns `None` when the object never closes.
pub fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse the first balanced object in `text` as JSON.
pub fn extract_json(text: &str) -> Option<serde_json::Value> {
    let candidate = first_balanced_object(text)?;
    match serde_json::from_str(candidate) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(error = %e, "judge response contains malformed JSON");
            None
        }
    }
}

use serde::{Deserialize, Serialize};

/// Outcome of a pairwise comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Preference {
    A,
    B,
    Equal,
}

impl Preference {
    /// Map a captured token to a preference. Accepts `A`, `B` and `EQUAL` in any case.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "A" => Some(Preference::A),
            "B" => Some(Preference::B),
            "EQUAL" => Some(Preference::Equal),
            _ => None,
        }
    }
}

impl std::fmt::Display for Preference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            Preference::A => "A",
            Preference::B => "B",
            Preference::Equal => "EQUAL",
        })
    }
}

/// Single-text scoring or pairwise comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationMode {
    Single,
    Pairwise,
}

impl std::fmt::Display for EvaluationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            EvaluationMode::Single => "single",
            EvaluationMode::Pairwise => "pairwise",
        })
    }
}

/// The typed value extracted from a judge response. The variant is dictated
/// by the parser rule that produced it; `Text` doubles as the unparsed fallback.
///
/// Serialized as the bare value, which does not record the variant, so it is
/// write-only:
///
/// ```compile_fail
/// let value: judgeline::JudgmentValue = serde_json::from_str("\"A\"").unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum JudgmentValue {
    Bool(bool),
    Number(serde_json::Number),
    Preference(Preference),
    Text(String),
    Json(serde_json::Value),
}

impl JudgmentValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            JudgmentValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            JudgmentValue::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_preference(&self) -> Option<Preference> {
        match self {
            JudgmentValue::Preference(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            JudgmentValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            JudgmentValue::Json(v) => Some(v),
            _ => None,
        }
    }

    /// JSON rendering used by the evaluation log and CLI output.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            JudgmentValue::Bool(b) => serde_json::Value::Bool(*b),
            JudgmentValue::Number(n) => serde_json::Value::Number(n.clone()),
            JudgmentValue::Preference(p) => serde_json::Value::String(p.to_string()),
            JudgmentValue::Text(s) => serde_json::Value::String(s.clone()),
            JudgmentValue::Json(v) => v.clone(),
        }
    }
}

/// Structured result of interpreting one judge response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Judgment {
    /// The untouched model output.
    pub raw_response: String,
    pub judgment: JudgmentValue,
    /// False when no rule matched and `judgment` holds the raw response.
    pub parse_succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl Judgment {
    pub fn parsed(raw_response: &str, judgment: JudgmentValue, reasoning: Option<String>) -> Self {
        Self {
            raw_response: raw_response.to_string(),
            judgment,
            parse_succeeded: true,
            reasoning,
        }
    }

    /// Degraded result: the raw response is returned as the judgment.
    pub fn fallback(raw_response: &str, reasoning: Option<String>) -> Self {
        Self {
            raw_response: raw_response.to_string(),
            judgment: JudgmentValue::Text(raw_response.to_string()),
            parse_succeeded: false,
            reasoning,
        }
    }
}

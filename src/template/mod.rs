//! Evaluation templates: prompt structure plus output-parser rules.

mod adapt;
mod store;

pub use adapt::{model_family, TemplateAdaptation};
pub use store::{Catalogue, TemplateStore};

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::JudgeError;

pub const DEFAULT_NUMERIC_PATTERN: &str = r"\b([1-5])\b";
pub const DEFAULT_PREFERENCE_PATTERN: &str = r"(?:(?:Text|Option|Response)\s*)?([AB])";

/// A named, reusable prompt-construction and output-parsing recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Opaque key. Catalogue entries without one take their map key.
    #[serde(default)]
    pub template_id: String,
    pub template_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Advisory only.
    #[serde(default)]
    pub target_judge_model_family: Option<String>,
    pub prompt_structure: PromptStructure,
    #[serde(default)]
    pub output_parser_rules: ParserRules,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub model_adaptations: BTreeMap<String, TemplateAdaptation>,
}

impl Template {
    /// Create a template with a freshly generated identifier.
    pub fn new(name: &str, prompt_structure: PromptStructure, rules: ParserRules) -> Self {
        Self {
            template_id: uuid::Uuid::new_v4().to_string(),
            template_name: name.to_string(),
            description: None,
            target_judge_model_family: None,
            prompt_structure,
            output_parser_rules: rules,
            model_adaptations: BTreeMap::new(),
        }
    }

    pub fn validate(&self) -> Result<(), JudgeError> {
        self.output_parser_rules.validate(&self.template_id)?;
        for (family, adaptation) in &self.model_adaptations {
            if let Some(rules) = &adaptation.output_parser_rules {
                rules.validate(&format!("{} ({family})", self.template_id))?;
            }
        }
        Ok(())
    }
}

/// The three substitutable parts of a judge prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptStructure {
    #[serde(default)]
    pub system_message: String,
    #[serde(default)]
    pub user_instruction_prefix: String,
    #[serde(default)]
    pub user_instruction_suffix: String,
}

/// Caller-supplied overrides for individual prompt segments.
/// Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomPromptSegments {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_instruction_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_instruction_suffix: Option<String>,
}

impl CustomPromptSegments {
    pub fn is_empty(&self) -> bool {
        [
            &self.system_message,
            &self.user_instruction_prefix,
            &self.user_instruction_suffix,
        ]
        .iter()
        .all(|s| s.as_deref().map_or(true, str::is_empty))
    }

    /// Apply these overrides on top of `base`, one field at a time.
    pub fn overlay(&self, base: &PromptStructure) -> PromptStructure {
        fn pick(custom: &Option<String>, base: &str) -> String {
            match custom.as_deref() {
                Some(s) if !s.is_empty() => s.to_string(),
                _ => base.to_string(),
            }
        }
        PromptStructure {
            system_message: pick(&self.system_message, &base.system_message),
            user_instruction_prefix: pick(
                &self.user_instruction_prefix,
                &base.user_instruction_prefix,
            ),
            user_instruction_suffix: pick(
                &self.user_instruction_suffix,
                &base.user_instruction_suffix,
            ),
        }
    }
}

/// Output interpretation strategy, one variant per rule kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ParserRules {
    /// Case-insensitive literal substrings; the leftmost occurrence decides.
    Binary {
        #[serde(default = "default_positive_patterns")]
        positive_patterns: Vec<String>,
        #[serde(default = "default_negative_patterns")]
        negative_patterns: Vec<String>,
    },
    /// Regex whose first capture group holds the score.
    Numeric {
        #[serde(default = "default_numeric_pattern")]
        pattern: String,
    },
    /// Regex whose first capture group yields `A` or `B`.
    Preference {
        #[serde(default = "default_preference_pattern")]
        pattern: String,
    },
    /// Field name to type hint. Embedded in the prompt, never validated.
    Json {
        #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
        format: serde_json::Map<String, serde_json::Value>,
    },
    Text,
}

impl Default for ParserRules {
    fn default() -> Self {
        ParserRules::Text
    }
}

fn default_positive_patterns() -> Vec<String> {
    vec!["yes".into(), "true".into(), "positive".into()]
}

fn default_negative_patterns() -> Vec<String> {
    vec!["no".into(), "false".into(), "negative".into()]
}

fn default_numeric_pattern() -> String {
    DEFAULT_NUMERIC_PATTERN.to_string()
}

fn default_preference_pattern() -> String {
    DEFAULT_PREFERENCE_PATTERN.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Binary,
    Numeric,
    Preference,
    Json,
    Text,
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            RuleKind::Binary => "binary",
            RuleKind::Numeric => "numeric",
            RuleKind::Preference => "preference",
            RuleKind::Json => "json",
            RuleKind::Text => "text",
        })
    }
}

impl ParserRules {
    pub fn kind(&self) -> RuleKind {
        match self {
            ParserRules::Binary { .. } => RuleKind::Binary,
            ParserRules::Numeric { .. } => RuleKind::Numeric,
            ParserRules::Preference { .. } => RuleKind::Preference,
            ParserRules::Json { .. } => RuleKind::Json,
            ParserRules::Text => RuleKind::Text,
        }
    }

    /// Check that every regular expression compiles.
    pub fn validate(&self, template_id: &str) -> Result<(), JudgeError> {
        match self {
            ParserRules::Numeric { pattern } | ParserRules::Preference { pattern } => {
                Regex::new(pattern).map(|_| ()).map_err(|e| {
                    JudgeError::invalid_template(template_id, format!("bad pattern: {e}"))
                })
            }
            _ => Ok(()),
        }
    }

    /// Render a json rule's `format` map as an output-format instruction.
    pub fn format_instruction(&self) -> Option<String> {
        let ParserRules::Json { format } = self else {
            return None;
        };
        if format.is_empty() {
            return None;
        }
        let fields: Vec<String> = format
            .iter()
            .map(|(name, hint)| {
                let hint = match hint {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                format!("\"{name}\": <{hint}>")
            })
            .collect();
        Some(format!(
            "Respond with JSON in this format: {{{}}}",
            fields.join(", ")
        ))
    }
}

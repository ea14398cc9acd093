//! Per-model-family template variants.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use super::{CustomPromptSegments, ParserRules, Template};

/// Overrides applied when the judge model belongs to a given family.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateAdaptation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_structure: Option<CustomPromptSegments>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_parser_rules: Option<ParserRules>,
}

const KNOWN_FAMILIES: &[(&str, &str)] = &[
    ("llama", "llama"),
    ("mistral", "mistral"),
    ("falcon", "falcon"),
    ("claude", "claude"),
    ("gpt", "gpt"),
    ("palm", "google"),
    ("gemini", "google"),
    ("bloom", "bloom"),
];

/// Derive a model family from a model identifier such as
/// `meta-llama/Llama-3-8B-Instruct` or `Qwen/Qwen2-7B`.
pub fn model_family(model_id: &str) -> String {
    let lower = model_id.to_lowercase();
    for (needle, family) in KNOWN_FAMILIES {
        if lower.contains(needle) {
            return (*family).to_string();
        }
    }
    match lower.split_once('/') {
        Some((org, _)) if !org.is_empty() => org.to_string(),
        _ => "unknown".to_string(),
    }
}

impl Template {
    /// The template as it should be used with `model_id`. Borrowed when no
    /// adaptation applies.
    pub fn adapted_for(&self, model_id: &str) -> Cow<'_, Template> {
        let family = model_family(model_id);
        if let Some(target) = &self.target_judge_model_family {
            if !target.eq_ignore_ascii_case(&family) {
                tracing::debug!(
                    template = %self.template_id,
                    target = %target,
                    family = %family,
                    "judge model family differs from template target"
                );
            }
        }

        let Some(adaptation) = self.model_adaptations.get(&family) else {
            return Cow::Borrowed(self);
        };

        let mut adapted = self.clone();
        if let Some(segments) = &adaptation.prompt_structure {
            adapted.prompt_structure = segments.overlay(&self.prompt_structure);
        }
        if let Some(rules) = &adaptation.output_parser_rules {
            adapted.output_parser_rules = rules.clone();
        }
        Cow::Owned(adapted)
    }
}

use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::JudgeError;
use crate::template::{ParserRules, PromptStructure, RuleKind};
use crate::types::EvaluationMode;

/// Marker the judge is asked to put in front of its explanation.
pub const REASONING_DELIMITER: &str = "Reasoning:";

/// Appended to the output-format instruction when reasoning is requested.
pub const REASONING_INSTRUCTION: &str =
    " Then, on a new line, explain your reasoning starting with 'Reasoning:'";

const THINK: &str = "Think step by step about your evaluation. ";
const AFTER: &str = "After your analysis, ";

/// Middle of the chain-of-thought fragment, keyed by template id.
fn chain_of_thought_steps(template_id: Option<&str>) -> &'static str {
    match template_id {
        Some("binary_classification") => "First, identify the key aspects of the content relevant to the criteria. \
Then, assess how well the content meets or fails to meet each criterion. Finally, make your determination. ",
        Some("likert_scale") => "First, identify the key aspects of the content relevant to the criteria. \
Then, assess how well the content meets or fails to meet each criterion. \
Consider the strengths and weaknesses to determine the appropriate score. ",
        Some("toxicity_detection") => "First, identify any potentially harmful or inappropriate content. \
Then, assess the severity and intent of this content. \
Consider the context and the potential impact on different audiences. ",
        Some("factual_accuracy") => "First, identify the key factual claims in the text. \
Then, check each claim against the reference information. \
Note any inconsistencies, omissions, or additions that are not supported by the reference. ",
        Some("reasoning_evaluation") => "First, identify the main arguments and logical structure of the text. \
Then, assess the clarity, coherence, and soundness of the reasoning. \
Look for logical fallacies, unsupported assumptions, or gaps in the argument. ",
        Some("summarization_quality") => "First, identify the key points in the source text. \
Then, check if the summary captures these key points. \
Assess the completeness, accuracy, and conciseness of the summary. \
Consider if any important information is missing or if any extraneous details are included. ",
        Some("hallucination_detection") => "First, identify the key factual claims in the generated text. \
Then, check each claim against the source information. \
Note any claims that are not supported by or contradict the source. \
Assess the severity of any hallucinations found. ",
        _ => "Consider all relevant aspects of the content in relation to the criteria. \
Carefully weigh the evidence before making your determination. ",
    }
}

/// Chain-of-thought fragment put in front of the output-format instruction.
pub fn chain_of_thought_prefix(template_id: Option<&str>) -> String {
    if template_id == Some("pairwise_comparison") {
        return format!(
            "Think step by step about your comparison. \
First, identify the key aspects of both texts relevant to the criteria. \
Then, compare how well each text addresses these aspects. \
Note the strengths and weaknesses of each. Finally, determine which text is better overall. {AFTER}"
        );
    }
    format!("{THINK}{}{AFTER}", chain_of_thought_steps(template_id))
}

const OUTPUT_FORMAT_PLACEHOLDER: &str = "output_format_instruction";

const BINARY_INSTRUCTION: &str = "Respond with ONLY a single word: 'POSITIVE' or 'NEGATIVE'.";
const LIKERT_INSTRUCTION: &str =
    "Respond with ONLY a single number from 1 to 5, where 1 is the worst and 5 is the best.";
const PAIRWISE_INSTRUCTION: &str = "Respond with ONLY: 'A' if Text A is better, 'B' if Text B is better, or 'EQUAL' if they are of equal quality.";
const GENERIC_INSTRUCTION: &str = "Provide a clear and concise evaluation.";

/// Placeholder values keyed by name (without braces).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitutions(BTreeMap<String, String>);

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.0.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Fail when any of `keys` is missing or blank.
    pub fn require(&self, keys: &[&str]) -> Result<(), JudgeError> {
        let missing: Vec<&str> = keys
            .iter()
            .copied()
            .filter(|k| self.get(k).map_or(true, |v| v.trim().is_empty()))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(JudgeError::contract(format!(
                "missing required substitution(s): {}",
                missing.join(", ")
            )))
        }
    }
}

/// System/user message pair sent to the judge model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptMessages {
    pub system: String,
    pub user: String,
}

impl PromptMessages {
    /// OpenAI-style chat message list.
    pub fn to_chat_messages(&self) -> serde_json::Value {
        serde_json::json!([
            { "role": "system", "content": self.system },
            { "role": "user", "content": self.user },
        ])
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PromptOptions<'a> {
    pub provide_reasoning: bool,
    pub chain_of_thought: bool,
    /// Selects the task-specific chain-of-thought fragment.
    pub template_id: Option<&'a str>,
}

fn is_placeholder_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Replace `{key}` placeholders in one left-to-right pass. Unknown keys and
/// braces that are not placeholders (JSON examples, code) are kept verbatim;
/// substituted values are never re-scanned.
pub fn substitute(template: &str, subs: &Substitutions) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if is_placeholder_key(&after[..close]) => {
                let key = &after[..close];
                match subs.get(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Combine the caller's instruction with the reasoning and chain-of-thought fragments.
pub fn compose_instruction(base: Option<&str>, options: PromptOptions) -> String {
    let mut instruction = base.unwrap_or("").trim().to_string();
    if options.chain_of_thought {
        let mut chars = instruction.chars();
        let lowered = match chars.next() {
            Some(first) => first.to_lowercase().chain(chars).collect(),
            None => String::new(),
        };
        instruction = format!("{}{lowered}", chain_of_thought_prefix(options.template_id));
    }
    if options.provide_reasoning {
        instruction.push_str(REASONING_INSTRUCTION);
    }
    instruction.trim().to_string()
}

/// Assemble the system and user messages.
///
/// The user message is `prefix + content + suffix`, each segment substituted
/// from `subs` plus the composed output-format instruction. When no segment
/// mentions `{output_format_instruction}` the instruction is appended to the
/// user message so it is never silently dropped.
pub fn build_prompt(
    structure: &PromptStructure,
    subs: &Substitutions,
    content: &str,
    output_format_instruction: Option<&str>,
    options: PromptOptions,
) -> PromptMessages {
    let instruction = compose_instruction(output_format_instruction, options);
    let mut subs = subs.clone();
    subs.insert(OUTPUT_FORMAT_PLACEHOLDER, &instruction);

    let marker = format!("{{{OUTPUT_FORMAT_PLACEHOLDER}}}");
    let placed = [
        &structure.system_message,
        &structure.user_instruction_prefix,
        &structure.user_instruction_suffix,
    ]
    .iter()
    .any(|segment| segment.contains(&marker));

    let mut user = substitute(&structure.user_instruction_prefix, &subs);
    user.push_str(content);
    user.push_str(&substitute(&structure.user_instruction_suffix, &subs));
    if !placed && !instruction.is_empty() {
        if !user.is_empty() {
            user.push_str("\n\n");
        }
        user.push_str(&instruction);
    }

    PromptMessages {
        system: substitute(&structure.system_message, &subs),
        user,
    }
}

/// Instruction used when the caller supplies none.
pub fn default_output_format_instruction(
    template_id: Option<&str>,
    rules: &ParserRules,
    mode: EvaluationMode,
) -> String {
    let by_task = match template_id {
        Some("binary_classification") => Some("Respond with ONLY 'POSITIVE' or 'NEGATIVE'."),
        Some("likert_scale") => Some(LIKERT_INSTRUCTION),
        Some("pairwise_comparison") => Some(PAIRWISE_INSTRUCTION),
        Some("toxicity_detection") => Some("Respond with ONLY 'TOXIC' or 'NON-TOXIC'."),
        Some("reasoning_evaluation") => Some(
            "Respond with ONLY a single number from 1 to 5, where 1 indicates poor reasoning and 5 indicates excellent reasoning.",
        ),
        _ => None,
    };
    if let Some(instruction) = by_task {
        return instruction.to_string();
    }
    if let Some(instruction) = rules.format_instruction() {
        return instruction;
    }
    match (rules.kind(), mode) {
        (RuleKind::Preference, _) | (RuleKind::Text, EvaluationMode::Pairwise) => {
            PAIRWISE_INSTRUCTION.to_string()
        }
        (RuleKind::Binary, _) => BINARY_INSTRUCTION.to_string(),
        (RuleKind::Numeric, _) => LIKERT_INSTRUCTION.to_string(),
        (RuleKind::Json, _) => "Respond with a single JSON object.".to_string(),
        (RuleKind::Text, EvaluationMode::Single) => GENERIC_INSTRUCTION.to_string(),
    }
}

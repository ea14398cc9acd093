//! Ready-made evaluations for common judging tasks, built on the seed
//! catalogue's template ids.
//!
//! Each helper takes the caller's [`EvaluationOptions`] for the model, sampling
//! and reasoning settings and fills in the template and output format itself.

use super::invoke::{compare_texts, evaluate_text, Evaluation, EvaluationOptions};
use super::transport::ModelTransport;
use crate::error::JudgeError;
use crate::template::{CustomPromptSegments, TemplateStore};

const TOXICITY_CRITERIA: &str = "Evaluate whether the text contains toxic, harmful, offensive, or \
inappropriate content that could be damaging to individuals or groups. Consider aspects such as \
hate speech, profanity, violent language, discriminatory statements, and personal attacks.";

const CODE_CRITERIA: &str =
    "Evaluate the following code for quality, readability, efficiency, and adherence to best practices.";

/// Longer answers for the JSON verdicts, sampled close to greedy.
fn structured_sampling(mut options: EvaluationOptions) -> EvaluationOptions {
    options.sampling.max_tokens = 500;
    options.sampling.temperature = 0.1;
    options
}

fn with_task(
    mut options: EvaluationOptions,
    template_id: &str,
    instruction: &str,
) -> EvaluationOptions {
    options.template_id = Some(template_id.to_string());
    options.output_format_instruction = Some(instruction.to_string());
    options
}

/// TOXIC / NON-TOXIC verdict for `text`.
pub fn detect_toxicity(
    store: &dyn TemplateStore,
    transport: &dyn ModelTransport,
    text: &str,
    options: EvaluationOptions,
) -> Result<Evaluation, JudgeError> {
    let options = with_task(
        options,
        "toxicity_detection",
        "Respond with ONLY 'TOXIC' if the content contains any toxic elements, or 'NON-TOXIC' if it does not.",
    );
    evaluate_text(store, transport, text, TOXICITY_CRITERIA, options)
}

/// Check `text` against `reference_info`. The judgment is a JSON object with
/// `accuracy_score`, `errors_found` and `is_accurate`.
pub fn evaluate_factual_accuracy(
    store: &dyn TemplateStore,
    transport: &dyn ModelTransport,
    text: &str,
    reference_info: &str,
    options: EvaluationOptions,
) -> Result<Evaluation, JudgeError> {
    let options = with_task(
        structured_sampling(options),
        "factual_accuracy",
        r#"Respond with JSON in this format: {"accuracy_score": <1-5>, "errors_found": [<list of factual errors>], "is_accurate": <true|false>}"#,
    );
    evaluate_text(store, transport, text, reference_info, options)
}

/// Look for claims in `generated_text` that `source_info` does not support.
pub fn detect_hallucinations(
    store: &dyn TemplateStore,
    transport: &dyn ModelTransport,
    generated_text: &str,
    source_info: &str,
    options: EvaluationOptions,
) -> Result<Evaluation, JudgeError> {
    let options = with_task(
        structured_sampling(options),
        "hallucination_detection",
        r#"Respond with JSON in this format: {"contains_hallucinations": <true|false>, "hallucinated_claims": [<list of hallucinated claims>], "hallucination_severity": <"low"|"medium"|"high">}"#,
    );
    evaluate_text(store, transport, generated_text, source_info, options)
}

/// Compare two model responses to the same user prompt.
pub fn compare_responses(
    store: &dyn TemplateStore,
    transport: &dyn ModelTransport,
    prompt: &str,
    response_a: &str,
    response_b: &str,
    options: EvaluationOptions,
) -> Result<Evaluation, JudgeError> {
    let mut options = with_task(
        options,
        "pairwise_comparison",
        "Respond with 'A' if Response A is better, 'B' if Response B is better, or 'EQUAL' if they are of equal quality.",
    );
    options.custom_segments = Some(CustomPromptSegments {
        system_message: Some(
            "You are an expert evaluator of AI systems. Your task is to compare two AI responses \
to the same user prompt and determine which is better."
                .to_string(),
        ),
        user_instruction_prefix: Some(
            "Compare the following two AI responses to the user prompt. Choose the response that \
is more helpful, accurate, and appropriate.\n\nUser Prompt:\n\"\"\"\n{comparison_criteria}\n\"\"\"\n\n\
Response A:\n\"\"\"\n{text_A}\n\"\"\"\n\nResponse B:\n\"\"\"\n{text_B}\n\"\"\"\n\n"
                .to_string(),
        ),
        user_instruction_suffix: None,
    });
    compare_texts(store, transport, response_a, response_b, prompt, options)
}

/// Review `code`, optionally against `requirements`. Uses the `code_quality`
/// template when the store has it and a generic reviewer prompt otherwise.
pub fn evaluate_code(
    store: &dyn TemplateStore,
    transport: &dyn ModelTransport,
    code: &str,
    requirements: Option<&str>,
    mut options: EvaluationOptions,
) -> Result<Evaluation, JudgeError> {
    let criteria = match requirements.map(str::trim).filter(|r| !r.is_empty()) {
        Some(requirements) => format!("{CODE_CRITERIA}\n\nRequirements:\n{requirements}"),
        None => CODE_CRITERIA.to_string(),
    };

    if store.get_template("code_quality").is_ok() {
        options.template_id = Some("code_quality".to_string());
    } else {
        tracing::debug!("no code_quality template, using a generic review prompt");
        options.template_id = None;
        options.custom_segments = Some(CustomPromptSegments {
            system_message: Some(
                "You are an expert software developer. Your task is to evaluate the quality of the provided code."
                    .to_string(),
            ),
            user_instruction_prefix: Some(
                "Please evaluate the following code for quality, readability, efficiency, and best practices:\n\n\
{evaluation_criteria}\n\nCode to evaluate:\n\n"
                    .to_string(),
            ),
            user_instruction_suffix: Some("\n\n{output_format_instruction}".to_string()),
        });
    }
    let options = structured_sampling(options);
    evaluate_text(store, transport, code, &criteria, options)
}

//! Prompt assembly, model invocation and response interpretation.

mod config;
mod invoke;
pub mod prompt;
pub mod response;
mod tasks;
mod transport;

pub use config::{config_dir, load_config, load_config_from_path, JudgeConfig, SamplingParams};
pub use invoke::{
    compare_texts, evaluate, evaluate_text, prepare, Evaluation, EvaluationOptions,
    EvaluationRequest, PreparedEvaluation, Subject,
};
pub use prompt::{build_prompt, chain_of_thought_prefix, PromptMessages, PromptOptions, Substitutions};
pub use response::parse;
pub use tasks::{
    compare_responses, detect_hallucinations, detect_toxicity, evaluate_code,
    evaluate_factual_accuracy,
};
pub use transport::{CommandTransport, ModelTransport};

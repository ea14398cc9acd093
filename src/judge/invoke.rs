use serde::Serialize;

use super::config::SamplingParams;
use super::prompt::{
    build_prompt, default_output_format_instruction, PromptMessages, PromptOptions, Substitutions,
};
use super::response;
use super::transport::ModelTransport;
use crate::error::JudgeError;
use crate::template::{CustomPromptSegments, ParserRules, PromptStructure, RuleKind, TemplateStore};
use crate::types::{EvaluationMode, Judgment};

/// What the judge is asked to look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    Single { content: String },
    Pair { text_a: String, text_b: String },
}

impl Subject {
    pub fn mode(&self) -> EvaluationMode {
        match self {
            Subject::Single { .. } => EvaluationMode::Single,
            Subject::Pair { .. } => EvaluationMode::Pairwise,
        }
    }
}

/// Everything that shapes a single evaluation apart from the subject and criteria.
#[derive(Debug, Clone, Default)]
pub struct EvaluationOptions {
    pub template_id: Option<String>,
    /// Overrides template segments field by field, or stands alone when no
    /// template is named.
    pub custom_segments: Option<CustomPromptSegments>,
    pub output_format_instruction: Option<String>,
    pub provide_reasoning: bool,
    pub chain_of_thought: bool,
    pub model_id: String,
    pub sampling: SamplingParams,
}

#[derive(Debug, Clone)]
pub struct EvaluationRequest {
    pub subject: Subject,
    pub criteria: String,
    pub options: EvaluationOptions,
}

/// A resolved prompt and the rules its answer will be parsed with.
#[derive(Debug, Clone, Serialize)]
pub struct PreparedEvaluation {
    pub template_id: Option<String>,
    pub mode: EvaluationMode,
    pub rules: ParserRules,
    pub prompt: PromptMessages,
}

#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub template_id: Option<String>,
    pub mode: EvaluationMode,
    pub rule_kind: RuleKind,
    pub model_id: String,
    pub prompt: PromptMessages,
    #[serde(flatten)]
    pub judgment: Judgment,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

/// Resolve the template, substitutions and prompt for `request` without
/// contacting the model. Caller-contract violations are reported here.
pub fn prepare(
    store: &dyn TemplateStore,
    request: &EvaluationRequest,
) -> Result<PreparedEvaluation, JudgeError> {
    let options = &request.options;
    let mode = request.subject.mode();

    if request.criteria.trim().is_empty() {
        return Err(JudgeError::contract("criteria must not be empty"));
    }

    let mut subs = Substitutions::new();
    let content = match &request.subject {
        Subject::Single { content } => {
            if content.trim().is_empty() {
                return Err(JudgeError::contract("content to evaluate must not be empty"));
            }
            subs.insert("evaluation_criteria", &request.criteria);
            content.as_str()
        }
        Subject::Pair { text_a, text_b } => {
            subs.insert("comparison_criteria", &request.criteria);
            subs.insert("evaluation_criteria", &request.criteria);
            subs.insert("text_A", text_a);
            subs.insert("text_B", text_b);
            subs.require(&["text_A", "text_B"])?;
            ""
        }
    };

    let custom = options.custom_segments.as_ref().filter(|c| !c.is_empty());
    let template_id = non_blank(&options.template_id);

    let (structure, rules) = match (template_id, custom) {
        (None, None) => {
            return Err(JudgeError::contract(
                "either a template id or custom prompt segments are required",
            ))
        }
        (Some(id), custom) => {
            let template = store.get_template(id)?.adapted_for(&options.model_id);
            let structure = match custom {
                Some(segments) => segments.overlay(&template.prompt_structure),
                None => template.prompt_structure.clone(),
            };
            (structure, template.output_parser_rules.clone())
        }
        (None, Some(segments)) => (
            segments.overlay(&PromptStructure::default()),
            ParserRules::Text,
        ),
    };

    let instruction = match non_blank(&options.output_format_instruction) {
        Some(instruction) => instruction.to_string(),
        None => default_output_format_instruction(template_id, &rules, mode),
    };

    let prompt = build_prompt(
        &structure,
        &subs,
        content,
        Some(&instruction),
        PromptOptions {
            provide_reasoning: options.provide_reasoning,
            chain_of_thought: options.chain_of_thought,
            template_id,
        },
    );

    Ok(PreparedEvaluation {
        template_id: template_id.map(String::from),
        mode,
        rules,
        prompt,
    })
}

/// Build the prompt, make exactly one model call and parse the answer.
pub fn evaluate(
    store: &dyn TemplateStore,
    transport: &dyn ModelTransport,
    request: &EvaluationRequest,
) -> Result<Evaluation, JudgeError> {
    let prepared = prepare(store, request)?;
    let options = &request.options;

    let raw = transport.send(&prepared.prompt, &options.model_id, &options.sampling)?;
    let judgment = response::parse(&prepared.rules, &raw, options.provide_reasoning);

    tracing::debug!(
        template = prepared.template_id.as_deref().unwrap_or("(custom)"),
        rule = %prepared.rules.kind(),
        parse_succeeded = judgment.parse_succeeded,
        "evaluation complete"
    );
    if !judgment.parse_succeeded {
        tracing::info!(
            rule = %prepared.rules.kind(),
            "judge response did not match the parser rules, returning raw text"
        );
    }

    Ok(Evaluation {
        template_id: prepared.template_id,
        mode: prepared.mode,
        rule_kind: prepared.rules.kind(),
        model_id: options.model_id.clone(),
        prompt: prepared.prompt,
        judgment,
    })
}

/// Judge a single piece of content against `criteria`.
pub fn evaluate_text(
    store: &dyn TemplateStore,
    transport: &dyn ModelTransport,
    content: &str,
    criteria: &str,
    options: EvaluationOptions,
) -> Result<Evaluation, JudgeError> {
    evaluate(
        store,
        transport,
        &EvaluationRequest {
            subject: Subject::Single {
                content: content.to_string(),
            },
            criteria: criteria.to_string(),
            options,
        },
    )
}

/// Ask the judge which of two texts better meets `comparison_criteria`.
pub fn compare_texts(
    store: &dyn TemplateStore,
    transport: &dyn ModelTransport,
    text_a: &str,
    text_b: &str,
    comparison_criteria: &str,
    options: EvaluationOptions,
) -> Result<Evaluation, JudgeError> {
    evaluate(
        store,
        transport,
        &EvaluationRequest {
            subject: Subject::Pair {
                text_a: text_a.to_string(),
                text_b: text_b.to_string(),
            },
            criteria: comparison_criteria.to_string(),
            options,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::template::{Catalogue, Template, TemplateAdaptation};
    use crate::types::{JudgmentValue, Preference};
    use std::cell::{Cell, RefCell};

    fn catalogue() -> Catalogue {
        Catalogue::embedded().unwrap()
    }

    fn with_template(id: &str) -> EvaluationOptions {
        EvaluationOptions {
            template_id: Some(id.to_string()),
            model_id: "qwen2".to_string(),
            ..Default::default()
        }
    }

    fn answer(
        text: &'static str,
    ) -> impl Fn(&PromptMessages, &str, &SamplingParams) -> Result<String, TransportError> {
        move |_: &PromptMessages, _: &str, _: &SamplingParams| Ok(text.to_string())
    }

    fn unreachable_transport(
        _: &PromptMessages,
        _: &str,
        _: &SamplingParams,
    ) -> Result<String, TransportError> {
        panic!("transport must not be called");
    }

    #[test]
    fn test_binary_end_to_end() {
        let eval = evaluate_text(
            &catalogue(),
            &answer("This is SAFE content."),
            "Hello there, friend.",
            "Is the content safe for children?",
            with_template("binary_classification"),
        )
        .unwrap();
        assert_eq!(eval.judgment.judgment, JudgmentValue::Bool(true));
        assert!(eval.judgment.parse_succeeded);
        assert_eq!(eval.rule_kind, RuleKind::Binary);
        assert_eq!(eval.template_id.as_deref(), Some("binary_classification"));
    }

    #[test]
    fn test_preference_end_to_end() {
        let eval = compare_texts(
            &catalogue(),
            &answer("Option A is more complete."),
            "A thorough answer.",
            "A short one.",
            "Which is more complete?",
            with_template("pairwise_comparison"),
        )
        .unwrap();
        assert_eq!(
            eval.judgment.judgment,
            JudgmentValue::Preference(Preference::A)
        );
        assert_eq!(eval.mode, EvaluationMode::Pairwise);
    }

    #[test]
    fn test_prompt_carries_content_and_criteria() {
        let seen = RefCell::new(None);
        let transport = |p: &PromptMessages,
                         model: &str,
                         params: &SamplingParams|
         -> Result<String, TransportError> {
            assert_eq!(model, "qwen2");
            assert_eq!(params.max_tokens, 100);
            *seen.borrow_mut() = Some(p.clone());
            Ok("4".to_string())
        };
        let eval = evaluate_text(
            &catalogue(),
            &transport,
            "The mitochondria is the powerhouse of the cell.",
            "Scientific accuracy",
            with_template("likert_scale"),
        )
        .unwrap();

        let prompt = seen.into_inner().unwrap();
        assert!(prompt.user.contains("Scientific accuracy"));
        assert!(prompt.user.contains("The mitochondria is the powerhouse"));
        assert!(prompt.user.contains("from 1 to 5"));
        assert!(!prompt.user.contains("{output_format_instruction}"));
        assert_eq!(prompt, eval.prompt);
        assert_eq!(eval.judgment.judgment.as_f64(), Some(4.0));
    }

    #[test]
    fn test_pair_texts_are_substituted() {
        let prepared = prepare(
            &catalogue(),
            &EvaluationRequest {
                subject: Subject::Pair {
                    text_a: "first draft".into(),
                    text_b: "second draft".into(),
                },
                criteria: "clarity".into(),
                options: with_template("pairwise_comparison"),
            },
        )
        .unwrap();
        let user = &prepared.prompt.user;
        assert!(user.contains("Text A:\n\nfirst draft"));
        assert!(user.contains("Text B:\n\nsecond draft"));
        assert!(user.contains("clarity"));
        assert!(user.contains("'EQUAL'"));
        assert!(!user.contains("{text_A}"));
    }

    #[test]
    fn test_chain_of_thought_follows_template() {
        let mut options = with_template("factual_accuracy");
        options.chain_of_thought = true;
        let prepared = prepare(
            &catalogue(),
            &EvaluationRequest {
                subject: Subject::Single {
                    content: "The moon is made of cheese.".into(),
                },
                criteria: "accuracy".into(),
                options,
            },
        )
        .unwrap();
        assert!(prepared
            .prompt
            .user
            .contains("identify the key factual claims in the text"));
    }

    #[test]
    fn test_reasoning_requested() {
        let seen = RefCell::new(String::new());
        let transport = |p: &PromptMessages,
                         _: &str,
                         _: &SamplingParams|
         -> Result<String, TransportError> {
            *seen.borrow_mut() = p.user.clone();
            Ok("NO\nReasoning: It contains an insult.".to_string())
        };
        let mut options = with_template("binary_classification");
        options.provide_reasoning = true;
        let eval = evaluate_text(&catalogue(), &transport, "You fool.", "Is it polite?", options)
            .unwrap();

        assert!(seen.borrow().contains("starting with 'Reasoning:'"));
        assert_eq!(eval.judgment.judgment, JudgmentValue::Bool(false));
        assert_eq!(
            eval.judgment.reasoning.as_deref(),
            Some("It contains an insult.")
        );
    }

    #[test]
    fn test_chain_of_thought_prefixes_instruction() {
        let mut options = with_template("likert_scale");
        options.chain_of_thought = true;
        let prepared = prepare(
            &catalogue(),
            &EvaluationRequest {
                subject: Subject::Single {
                    content: "text".into(),
                },
                criteria: "quality".into(),
                options,
            },
        )
        .unwrap();
        assert!(prepared.prompt.user.contains("Think step by step"));
    }

    #[test]
    fn test_caller_instruction_overrides_default() {
        let mut options = with_template("likert_scale");
        options.output_format_instruction = Some("Answer with a digit.".into());
        let prepared = prepare(
            &catalogue(),
            &EvaluationRequest {
                subject: Subject::Single {
                    content: "text".into(),
                },
                criteria: "quality".into(),
                options,
            },
        )
        .unwrap();
        assert!(prepared.prompt.user.ends_with("Answer with a digit."));
        assert!(!prepared.prompt.user.contains("from 1 to 5"));
    }

    #[test]
    fn test_custom_segments_override_template_fields() {
        let mut options = with_template("likert_scale");
        options.custom_segments = Some(CustomPromptSegments {
            system_message: Some("You are a strict grader.".into()),
            ..Default::default()
        });
        let prepared = prepare(
            &catalogue(),
            &EvaluationRequest {
                subject: Subject::Single {
                    content: "text".into(),
                },
                criteria: "quality".into(),
                options,
            },
        )
        .unwrap();
        assert_eq!(prepared.prompt.system, "You are a strict grader.");
        assert!(prepared.prompt.user.starts_with("Please evaluate"));
        assert_eq!(prepared.rules.kind(), RuleKind::Numeric);
    }

    #[test]
    fn test_custom_segments_without_template() {
        let options = EvaluationOptions {
            custom_segments: Some(CustomPromptSegments {
                user_instruction_prefix: Some("Judge this for {evaluation_criteria}:\n".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let eval = evaluate_text(
            &catalogue(),
            &answer("Mostly upbeat."),
            "What a lovely day.",
            "tone",
            options,
        )
        .unwrap();
        assert_eq!(eval.template_id, None);
        assert_eq!(eval.rule_kind, RuleKind::Text);
        assert_eq!(eval.prompt.system, "");
        assert!(eval
            .prompt
            .user
            .starts_with("Judge this for tone:\nWhat a lovely day."));
        assert!(eval
            .prompt
            .user
            .ends_with("Provide a clear and concise evaluation."));
        assert_eq!(eval.judgment.judgment.as_text(), Some("Mostly upbeat."));
    }

    #[test]
    fn test_neither_template_nor_segments_is_contract_error() {
        let options = EvaluationOptions {
            custom_segments: Some(CustomPromptSegments::default()),
            ..Default::default()
        };
        let err = evaluate_text(&catalogue(), &unreachable_transport, "x", "y", options)
            .unwrap_err();
        assert!(matches!(err, JudgeError::CallerContract(_)), "{err}");
    }

    #[test]
    fn test_missing_second_text_is_contract_error() {
        let err = compare_texts(
            &catalogue(),
            &unreachable_transport,
            "only one text",
            "  ",
            "which is better",
            with_template("pairwise_comparison"),
        )
        .unwrap_err();
        match err {
            JudgeError::CallerContract(msg) => assert!(msg.contains("text_B"), "{msg}"),
            other => panic!("expected contract error, got {other}"),
        }
    }

    #[test]
    fn test_empty_criteria_is_contract_error() {
        let err = evaluate_text(
            &catalogue(),
            &unreachable_transport,
            "content",
            "",
            with_template("likert_scale"),
        )
        .unwrap_err();
        assert!(matches!(err, JudgeError::CallerContract(_)));
    }

    #[test]
    fn test_contract_checked_before_lookup() {
        let err = evaluate_text(
            &catalogue(),
            &unreachable_transport,
            "",
            "criteria",
            with_template("no_such_template"),
        )
        .unwrap_err();
        assert!(matches!(err, JudgeError::CallerContract(_)));
    }

    #[test]
    fn test_template_not_found_propagates() {
        let err = evaluate_text(
            &catalogue(),
            &unreachable_transport,
            "content",
            "criteria",
            with_template("no_such_template"),
        )
        .unwrap_err();
        assert!(matches!(err, JudgeError::TemplateNotFound(ref id) if id == "no_such_template"));
    }

    #[test]
    fn test_transport_error_propagates() {
        let failing = |_: &PromptMessages,
                       _: &str,
                       _: &SamplingParams|
         -> Result<String, TransportError> {
            Err(TransportError::Timeout(30))
        };
        let err = evaluate_text(
            &catalogue(),
            &failing,
            "content",
            "criteria",
            with_template("likert_scale"),
        )
        .unwrap_err();
        assert!(matches!(err, JudgeError::Transport(TransportError::Timeout(30))));
    }

    #[test]
    fn test_transport_called_once() {
        let calls = Cell::new(0);
        let transport = |_: &PromptMessages,
                         _: &str,
                         _: &SamplingParams|
         -> Result<String, TransportError> {
            calls.set(calls.get() + 1);
            Ok("not a score".to_string())
        };
        let eval = evaluate_text(
            &catalogue(),
            &transport,
            "content",
            "criteria",
            with_template("likert_scale"),
        )
        .unwrap();
        assert_eq!(calls.get(), 1);
        assert!(!eval.judgment.parse_succeeded);
        assert_eq!(eval.judgment.judgment.as_text(), Some("not a score"));
    }

    #[test]
    fn test_model_family_adaptation_applies() {
        let mut catalogue = Catalogue::default();
        let mut template = Template::new(
            "Adapted",
            PromptStructure {
                system_message: "Generic judge.".into(),
                user_instruction_prefix: "Rate for {evaluation_criteria}: ".into(),
                user_instruction_suffix: String::new(),
            },
            ParserRules::Numeric {
                pattern: crate::template::DEFAULT_NUMERIC_PATTERN.into(),
            },
        );
        template.model_adaptations.insert(
            "llama".into(),
            TemplateAdaptation {
                prompt_structure: Some(CustomPromptSegments {
                    system_message: Some("Llama judge.".into()),
                    ..Default::default()
                }),
                output_parser_rules: None,
            },
        );
        let id = catalogue.insert(template).unwrap();

        let mut options = with_template(&id);
        options.model_id = "meta-llama/Llama-3-8B-Instruct".into();
        let eval = evaluate_text(&catalogue, &answer("3"), "text", "clarity", options).unwrap();
        assert_eq!(eval.prompt.system, "Llama judge.");
        assert_eq!(eval.judgment.judgment.as_f64(), Some(3.0));

        let eval = evaluate_text(
            &catalogue,
            &answer("3"),
            "text",
            "clarity",
            with_template(&id),
        )
        .unwrap();
        assert_eq!(eval.prompt.system, "Generic judge.");
    }

    #[test]
    fn test_evaluation_serializes_flat_judgment() {
        let eval = evaluate_text(
            &catalogue(),
            &answer("Score: 4/5"),
            "content",
            "criteria",
            with_template("likert_scale"),
        )
        .unwrap();
        let json = serde_json::to_value(&eval).unwrap();
        assert_eq!(json["judgment"], 4);
        assert_eq!(json["parse_succeeded"], true);
        assert_eq!(json["rule_kind"], "numeric");
        assert_eq!(json["raw_response"], "Score: 4/5");
    }
}

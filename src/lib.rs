//! LLM-as-a-judge evaluation engine.
//!
//! Templates describe how to ask a judge model about some content and how to
//! read its answer; [`judge::evaluate`] ties a template, a [`judge::ModelTransport`]
//! and the output parser together.

pub mod embedded_templates;
pub mod error;
pub mod judge;
pub mod template;
pub mod types;

pub use error::{CatalogueError, JudgeError, TransportError};
pub use judge::{compare_texts, evaluate, evaluate_text, parse, EvaluationOptions};
pub use template::{Catalogue, ParserRules, Template, TemplateStore};
pub use types::{Judgment, JudgmentValue, Preference};

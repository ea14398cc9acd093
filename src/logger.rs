use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use judgeline::judge::{config_dir, Evaluation};
use judgeline::template::RuleKind;
use judgeline::types::EvaluationMode;

const MAX_RAW_LEN: usize = 1024;

#[derive(Debug, Serialize)]
pub struct LogEntry {
    pub ts: String,
    pub template_id: Option<String>,
    pub mode: EvaluationMode,
    pub rule_kind: RuleKind,
    pub model: String,
    pub judgment: serde_json::Value,
    pub parse_ok: bool,
    pub raw_response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

fn log_file_path() -> PathBuf {
    config_dir().join("logs").join("evaluations.jsonl")
}

/// Write a log entry. Errors are printed to stderr but do not fail the process.
pub fn log_evaluation(entry: &LogEntry) {
    log_evaluation_to(entry, &log_file_path());
}

/// Write a log entry to a specific path (for testing).
pub fn log_evaluation_to(entry: &LogEntry, path: &Path) {
    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("judgeline: failed to create log directory: {e}");
            return;
        }
    }

    let json = match serde_json::to_string(entry) {
        Ok(j) => j,
        Err(e) => {
            eprintln!("judgeline: failed to serialize log entry: {e}");
            return;
        }
    };

    let mut file = match OpenOptions::new().create(true).append(true).open(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("judgeline: failed to open log file: {e}");
            return;
        }
    };

    if let Err(e) = writeln!(file, "{json}") {
        eprintln!("judgeline: failed to write log entry: {e}");
    }
}

fn truncate(text: &str) -> String {
    if text.len() <= MAX_RAW_LEN {
        return text.to_string();
    }
    let mut end = MAX_RAW_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

/// Create a log entry from an evaluation result.
pub fn make_entry(evaluation: &Evaluation) -> LogEntry {
    let judgment = &evaluation.judgment;
    LogEntry {
        ts: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        template_id: evaluation.template_id.clone(),
        mode: evaluation.mode,
        rule_kind: evaluation.rule_kind,
        model: evaluation.model_id.clone(),
        judgment: if judgment.parse_succeeded {
            judgment.judgment.to_json()
        } else {
            serde_json::Value::Null
        },
        parse_ok: judgment.parse_succeeded,
        raw_response: truncate(&judgment.raw_response),
        reasoning: judgment.reasoning.clone(),
    }
}

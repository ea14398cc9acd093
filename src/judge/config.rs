use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct JudgeConfig {
    /// Command that receives a chat request as JSON on stdin and prints the
    /// judge's answer (or an OpenAI-style completion) on stdout.
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_model")]
    pub model: String,
    /// Template catalogue to use instead of the embedded one.
    #[serde(default)]
    pub templates: Option<PathBuf>,
    /// Append every CLI evaluation to the JSONL log.
    #[serde(default = "default_log")]
    pub log: bool,
    #[serde(default)]
    pub sampling: SamplingParams,
}

/// Generation parameters forwarded to the judge model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_top_k")]
    pub top_k: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(default)]
    pub frequency_penalty: f32,
    #[serde(default)]
    pub presence_penalty: f32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            stop: None,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}

fn default_command() -> String {
    "curl -sS --fail http://localhost:8080/v1/chat/completions -H Content-Type:application/json -d @-"
        .to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_model() -> String {
    "qwen2".to_string()
}

fn default_log() -> bool {
    true
}

fn default_max_tokens() -> u32 {
    100
}

fn default_temperature() -> f32 {
    0.2
}

fn default_top_p() -> f32 {
    0.95
}

fn default_top_k() -> i32 {
    40
}

pub fn config_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(home).join(".config").join("judgeline")
}

fn default_config_path() -> PathBuf {
    config_dir().join("config.yaml")
}

pub fn load_config() -> JudgeConfig {
    load_config_from_path(&default_config_path())
}

/// Read a config file, falling back to defaults when it is missing or broken.
pub fn load_config_from_path(path: &Path) -> JudgeConfig {
    if !path.exists() {
        return default_config();
    }
    match std::fs::read_to_string(path) {
        Ok(content) => serde_norway::from_str(&content).unwrap_or_else(|e| {
            eprintln!("judgeline: failed to parse config {}: {e}", path.display());
            default_config()
        }),
        Err(e) => {
            eprintln!("judgeline: failed to read config {}: {e}", path.display());
            default_config()
        }
    }
}

pub(crate) fn default_config() -> JudgeConfig {
    JudgeConfig {
        command: default_command(),
        timeout: default_timeout(),
        model: default_model(),
        templates: None,
        log: default_log(),
        sampling: SamplingParams::default(),
    }
}

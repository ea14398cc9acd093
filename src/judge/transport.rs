use serde::Serialize;
use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::time::Duration;

use super::config::{JudgeConfig, SamplingParams};
use super::prompt::PromptMessages;
use crate::error::TransportError;

/// Sends a prompt to a judge model and returns its raw text answer.
///
/// Timeouts, retries and cancellation belong to the implementation; the
/// engine calls `send` exactly once per evaluation.
pub trait ModelTransport {
    fn send(
        &self,
        prompt: &PromptMessages,
        model_id: &str,
        params: &SamplingParams,
    ) -> Result<String, TransportError>;
}

impl<F> ModelTransport for F
where
    F: Fn(&PromptMessages, &str, &SamplingParams) -> Result<String, TransportError>,
{
    fn send(
        &self,
        prompt: &PromptMessages,
        model_id: &str,
        params: &SamplingParams,
    ) -> Result<String, TransportError> {
        self(prompt, model_id, params)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: serde_json::Value,
    #[serde(flatten)]
    sampling: &'a SamplingParams,
}

/// OpenAI-compatible chat completion request body.
pub fn chat_request(
    prompt: &PromptMessages,
    model_id: &str,
    params: &SamplingParams,
) -> Result<Vec<u8>, TransportError> {
    serde_json::to_vec(&ChatRequest {
        model: model_id,
        messages: prompt.to_chat_messages(),
        sampling: params,
    })
    .map_err(TransportError::Encode)
}

/// Pull the answer text out of command output. OpenAI-style completion
/// bodies are unwrapped; anything else is taken as the answer itself.
pub fn completion_text(stdout: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(stdout.trim()) {
        let choice = &value["choices"][0];
        if let Some(content) = choice["message"]["content"]
            .as_str()
            .or_else(|| choice["text"].as_str())
        {
            return content.to_string();
        }
    }
    stdout.trim_end_matches(['\r', '\n']).to_string()
}

/// Runs an external command per evaluation. The chat request is written to
/// its stdin; stdout is the response.
#[derive(Debug, Clone)]
pub struct CommandTransport {
    command: String,
    timeout: u64,
}

impl CommandTransport {
    pub fn new(command: &str, timeout: u64) -> Self {
        Self {
            command: command.to_string(),
            timeout,
        }
    }

    pub fn from_config(config: &JudgeConfig) -> Self {
        Self::new(&config.command, config.timeout)
    }
}

struct Captured {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

fn spawn_judge(parts: &[String]) -> std::io::Result<Child> {
    Command::new(&parts[0])
        .args(&parts[1..])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
}

/// Feed the request to the judge and drain its output pipes until they close.
fn exchange(child: &mut Child, body: Vec<u8>) -> impl FnOnce() -> std::io::Result<Captured> {
    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    move || {
        let writer = std::thread::spawn(move || match stdin {
            Some(mut stdin) => stdin.write_all(&body),
            None => Ok(()),
        });
        let stderr_reader = std::thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(mut stderr) = stderr {
                stderr.read_to_end(&mut buf)?;
            }
            Ok::<_, std::io::Error>(buf)
        });

        let mut captured = Captured {
            stdout: Vec::new(),
            stderr: Vec::new(),
        };
        if let Some(mut stdout) = stdout {
            stdout.read_to_end(&mut captured.stdout)?;
        }
        captured.stderr = match stderr_reader.join() {
            Ok(result) => result?,
            Err(_) => Vec::new(),
        };

        // A judge that answers without reading its input is fine.
        match writer.join() {
            Ok(Err(e)) if e.kind() != std::io::ErrorKind::BrokenPipe => Err(e),
            _ => Ok(captured),
        }
    }
}

fn kill_judge(child: &mut Child) {
    if let Err(e) = child.kill() {
        tracing::debug!(error = %e, "failed to kill judge command");
    }
    let _ = child.wait();
}

impl ModelTransport for CommandTransport {
    fn send(
        &self,
        prompt: &PromptMessages,
        model_id: &str,
        params: &SamplingParams,
    ) -> Result<String, TransportError> {
        let parts: Vec<String> = self
            .command
            .split_whitespace()
            .map(String::from)
            .collect();
        if parts.is_empty() {
            return Err(TransportError::EmptyCommand);
        }
        let body = chat_request(prompt, model_id, params)?;

        let mut child = spawn_judge(&parts).map_err(TransportError::Spawn)?;
        let timeout = Duration::from_secs(self.timeout);
        let (tx, rx) = mpsc::channel();
        let work = exchange(&mut child, body);
        std::thread::spawn(move || {
            let _ = tx.send(work());
        });

        match rx.recv_timeout(timeout) {
            Ok(Ok(captured)) => {
                let status = child.wait().map_err(TransportError::Spawn)?;
                if status.success() {
                    Ok(completion_text(&String::from_utf8_lossy(&captured.stdout)))
                } else {
                    Err(TransportError::Exit {
                        status: status.to_string(),
                        stderr: String::from_utf8_lossy(&captured.stderr).trim().to_string(),
                    })
                }
            }
            Ok(Err(e)) => {
                kill_judge(&mut child);
                Err(TransportError::Spawn(e))
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                kill_judge(&mut child);
                Err(TransportError::Timeout(self.timeout))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                kill_judge(&mut child);
                Err(TransportError::Disconnected)
            }
        }
    }
}

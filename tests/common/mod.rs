//! Shared test harness for judgeline integration tests.
//!
//! Every `TestEnv` gets its own HOME with a judge config pointing at a fake
//! judge script, so tests never reach a real model.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

/// Captures exit code, stdout, and stderr from a judgeline invocation.
pub struct RunResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RunResult {
    /// Parse stdout as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.stdout).unwrap_or_else(|e| {
            panic!(
                "Failed to parse stdout as JSON: {e}\nstdout: {}\nstderr: {}",
                self.stdout, self.stderr
            )
        })
    }

    pub fn assert_exit(&self, expected: i32) {
        assert_eq!(
            self.exit_code, expected,
            "Expected exit code {expected}\nstdout: {}\nstderr: {}",
            self.stdout, self.stderr
        );
    }
}

/// An isolated HOME with `~/.config/judgeline/config.yaml` wired to a fake judge.
pub struct TestEnv {
    home_dir: tempfile::TempDir,
}

impl TestEnv {
    /// Environment whose fake judge answers with `reply`.
    pub fn with_reply(reply: &str) -> Self {
        let env = Self::bare();
        env.set_reply(reply);
        env.write_judge_script("#!/bin/sh\ndir=$(dirname \"$0\")\ncat > \"$dir/request.json\"\ncat \"$dir/reply.txt\"\n");
        env.write_config(&format!(
            "command: {}\ntimeout: 5\nmodel: test-model\n",
            env.judge_script().display()
        ));
        env
    }

    /// Environment whose fake judge fails with `stderr` and exit status 1.
    pub fn with_failing_judge(stderr: &str) -> Self {
        let env = Self::bare();
        env.write_judge_script(&format!(
            "#!/bin/sh\ncat > /dev/null\necho '{stderr}' >&2\nexit 1\n"
        ));
        env.write_config(&format!(
            "command: {}\ntimeout: 5\n",
            env.judge_script().display()
        ));
        env
    }

    /// Environment without a judge config. Any model call would fail.
    pub fn bare() -> Self {
        let home_dir = tempfile::TempDir::new().expect("Failed to create temp HOME dir");
        std::fs::create_dir_all(home_dir.path().join(".config").join("judgeline")).unwrap();
        let env = TestEnv { home_dir };
        env.write_config("command: /definitely-not-a-real-judge-command-12345\ntimeout: 1\n");
        env
    }

    pub fn home_path(&self) -> &Path {
        self.home_dir.path()
    }

    pub fn config_dir(&self) -> PathBuf {
        self.home_path().join(".config").join("judgeline")
    }

    pub fn log_path(&self) -> PathBuf {
        self.config_dir().join("logs").join("evaluations.jsonl")
    }

    fn judge_script(&self) -> PathBuf {
        self.config_dir().join("fake-judge.sh")
    }

    pub fn write_config(&self, yaml: &str) {
        std::fs::write(self.config_dir().join("config.yaml"), yaml).unwrap();
    }

    pub fn set_reply(&self, reply: &str) {
        std::fs::write(self.config_dir().join("reply.txt"), reply).unwrap();
    }

    fn write_judge_script(&self, contents: &str) {
        let path = self.judge_script();
        std::fs::write(&path, contents).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&path).unwrap().permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&path, perms).unwrap();
        }
    }

    /// The chat request the fake judge received, if it was called.
    pub fn last_request(&self) -> Option<serde_json::Value> {
        let content = std::fs::read_to_string(self.config_dir().join("request.json")).ok()?;
        Some(serde_json::from_str(&content).expect("judge request should be JSON"))
    }

    /// A judgeline command with HOME pointing at this environment.
    pub fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::new(judgeline_bin());
        cmd.env("HOME", self.home_path()).env_remove("JUDGELINE_LOG");
        cmd
    }

    pub fn run(&self, args: &[&str]) -> RunResult {
        self.run_with_stdin(args, "")
    }

    pub fn run_with_stdin(&self, args: &[&str], stdin: &str) -> RunResult {
        let output = self
            .cmd()
            .args(args)
            .write_stdin(stdin)
            .output()
            .expect("Failed to run judgeline");
        RunResult {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

/// Path to the compiled judgeline binary.
pub fn judgeline_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_judgeline"))
}

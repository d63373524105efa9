//! Interpreter sub-tool: runs one snippet and captures its output.

use std::process::Stdio;
use std::time::Duration;

use proto::ToolError;
use serde_json::Value;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_TIMEOUT_SECS: u64 = 300;
const MAX_OUTPUT_CHARS: usize = 10_000;

/// Interpreter a [`CodeRunner`] hands source code to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpreter {
    Shell,
    Python,
    Ruby,
}

impl Interpreter {
    /// Program name and the flag that takes inline source.
    fn command(self) -> (&'static str, &'static str) {
        match self {
            Self::Shell => ("bash", "-c"),
            Self::Python => ("python3", "-c"),
            Self::Ruby => ("ruby", "-e"),
        }
    }

    pub fn program(self) -> &'static str {
        self.command().0
    }
}

/// Runs source code with one interpreter.
///
/// A non-zero exit status is reported in the output, not as an error.
pub struct CodeRunner {
    interpreter: Interpreter,
    default_timeout: Duration,
}

impl CodeRunner {
    pub fn new(interpreter: Interpreter, default_timeout_secs: u64) -> Self {
        Self {
            interpreter,
            default_timeout: Duration::from_secs(default_timeout_secs.clamp(1, MAX_TIMEOUT_SECS)),
        }
    }

    pub fn interpreter(&self) -> Interpreter {
        self.interpreter
    }

    pub async fn execute(
        &self,
        source: &str,
        timeout_secs: Option<u64>,
    ) -> Result<Value, ToolError> {
        let timeout_duration = timeout_secs
            .map(|s| Duration::from_secs(s.clamp(1, MAX_TIMEOUT_SECS)))
            .unwrap_or(self.default_timeout);
        let (program, flag) = self.interpreter.command();

        debug!(program, "Running snippet: {source}");

        let mut cmd = Command::new(program);
        cmd.arg(flag).arg(source);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let output = match timeout(timeout_duration, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ToolError::MissingDependency(format!(
                    "'{program}' is not installed or not on PATH"
                )));
            }
            Ok(Err(e)) => return Err(ToolError::ExecutionFailed(e.to_string())),
            Err(_) => {
                warn!(
                    program,
                    "Snippet timed out after {}s",
                    timeout_duration.as_secs()
                );
                return Err(ToolError::Timeout(timeout_duration.as_secs()));
            }
        };

        let stdout = truncate_str(&String::from_utf8_lossy(&output.stdout), MAX_OUTPUT_CHARS / 2);
        let stderr = truncate_str(&String::from_utf8_lossy(&output.stderr), MAX_OUTPUT_CHARS / 2);
        let exit_code = output.status.code().unwrap_or(-1);
        Ok(Value::String(format_output(&stdout, &stderr, exit_code)))
    }
}

/// Truncates UTF-8 text to `max_chars` code points and appends a suffix when truncated.
fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}\n[... output truncated at {max_chars} chars]")
    }
}

/// Formats stdout/stderr and exit code into a single text payload.
fn format_output(stdout: &str, stderr: &str, exit_code: i32) -> String {
    let mut out = String::new();

    if !stdout.is_empty() {
        out.push_str("stdout:\n");
        out.push_str(stdout);
        if !stdout.ends_with('\n') {
            out.push('\n');
        }
    }

    if !stderr.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("stderr:\n");
        out.push_str(stderr);
        if !stderr.ends_with('\n') {
            out.push('\n');
        }
    }

    out.push_str(&format!("\nexit_code: {exit_code}"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell() -> CodeRunner {
        CodeRunner::new(Interpreter::Shell, DEFAULT_TIMEOUT_SECS)
    }

    #[tokio::test]
    async fn runs_successful_command() {
        let out = shell().execute("printf 'hello'", None).await.unwrap();
        let out = out.as_str().unwrap();
        assert!(out.contains("stdout:\nhello"));
        assert!(out.contains("exit_code: 0"));
    }

    #[tokio::test]
    async fn non_zero_exit_is_not_an_error() {
        let out = shell().execute("echo err 1>&2; exit 7", None).await.unwrap();
        let out = out.as_str().unwrap();
        assert!(out.contains("stderr:\nerr"));
        assert!(out.contains("exit_code: 7"));
    }

    #[tokio::test]
    async fn honors_timeout() {
        let err = CodeRunner::new(Interpreter::Shell, 1)
            .execute("sleep 3", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Timeout(1)));
        assert_eq!(err.to_string(), "Timeout after 1s");
    }

    #[test]
    fn timeouts_are_clamped() {
        assert_eq!(
            CodeRunner::new(Interpreter::Ruby, 0).default_timeout,
            Duration::from_secs(1)
        );
        assert_eq!(
            CodeRunner::new(Interpreter::Ruby, 10_000).default_timeout,
            Duration::from_secs(MAX_TIMEOUT_SECS)
        );
    }

    #[test]
    fn interpreters_map_to_programs() {
        assert_eq!(Interpreter::Shell.program(), "bash");
        assert_eq!(Interpreter::Python.program(), "python3");
        assert_eq!(Interpreter::Ruby.command(), ("ruby", "-e"));
    }

    #[test]
    fn truncate_str_adds_suffix_for_long_text() {
        assert_eq!(truncate_str("abc", 3), "abc");
        let out = truncate_str("abcdef", 3);
        assert!(out.starts_with("abc"));
        assert!(out.contains("output truncated"));
    }

    #[test]
    fn format_output_renders_sections() {
        let out = format_output("ok\n", "warn", 2);
        assert_eq!(out, "stdout:\nok\n\nstderr:\nwarn\n\nexit_code: 2");
        assert_eq!(format_output("", "", 0), "\nexit_code: 0");
    }
}

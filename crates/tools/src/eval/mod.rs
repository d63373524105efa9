//! Eval facade: shell, Python and Ruby snippets behind operator approval.

mod runner;

pub use runner::{CodeRunner, DEFAULT_TIMEOUT_SECS, Interpreter};

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use proto::{ToolError, ToolResult};
use serde_json::{Value, json};

use crate::{ActionRequest, ActionSet, Authorizer, Tool};

const TOOL_NAME: &str = "eval";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalAction {
    Shell,
    Python,
    Ruby,
}

impl ActionSet for EvalAction {
    const ALL: &'static [Self] = &[Self::Shell, Self::Python, Self::Ruby];

    fn as_str(self) -> &'static str {
        match self {
            Self::Shell => "shell",
            Self::Python => "python",
            Self::Ruby => "ruby",
        }
    }
}

impl EvalAction {
    /// Name of the parameter carrying the source.
    fn source_field(self) -> &'static str {
        match self {
            Self::Shell => "command",
            Self::Python | Self::Ruby => "code",
        }
    }

    fn interpreter(self) -> Interpreter {
        match self {
            Self::Shell => Interpreter::Shell,
            Self::Python => Interpreter::Python,
            Self::Ruby => Interpreter::Ruby,
        }
    }
}

/// Facade running code snippets. Every action asks the authorizer first.
pub struct EvalTool {
    default_timeout_secs: u64,
    authorizer: Arc<Authorizer>,
    shell: OnceLock<CodeRunner>,
    python: OnceLock<CodeRunner>,
    ruby: OnceLock<CodeRunner>,
}

impl EvalTool {
    pub fn new(default_timeout_secs: u64) -> Self {
        Self {
            default_timeout_secs,
            authorizer: Authorizer::global(),
            shell: OnceLock::new(),
            python: OnceLock::new(),
            ruby: OnceLock::new(),
        }
    }

    pub fn with_authorizer(mut self, authorizer: Arc<Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    fn runner(&self, action: EvalAction) -> &CodeRunner {
        let slot = match action {
            EvalAction::Shell => &self.shell,
            EvalAction::Python => &self.python,
            EvalAction::Ruby => &self.ruby,
        };
        slot.get_or_init(|| CodeRunner::new(action.interpreter(), self.default_timeout_secs))
    }

    /// Validates, authorizes and routes one request.
    pub async fn dispatch(&self, request: ActionRequest) -> Result<Value, ToolError> {
        request.log_start(TOOL_NAME);
        let outcome = self.route(&request).await;
        request.log_outcome(TOOL_NAME, &outcome);
        outcome
    }

    async fn route(&self, request: &ActionRequest) -> Result<Value, ToolError> {
        let action = EvalAction::parse(TOOL_NAME, request.action())?;
        let field = action.source_field();
        let source = request.require_str(field)?;
        if source.trim().is_empty() {
            return Err(request.invalid(field, "must not be empty"));
        }
        let timeout_secs = request.optional_u64("timeout_secs")?;

        let description = match action {
            EvalAction::Shell => format!("Run the shell command:\n{source}"),
            EvalAction::Python => format!("Run Python code:\n{source}"),
            EvalAction::Ruby => format!("Run Ruby code:\n{source}"),
        };
        self.authorizer
            .ensure(TOOL_NAME, action.as_str(), &description)
            .await?;

        self.runner(action).execute(source, timeout_secs).await
    }
}

impl Default for EvalTool {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT_SECS)
    }
}

#[async_trait]
impl Tool for EvalTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Execute a shell command, Python code or Ruby code and return stdout, \
         stderr and exit code. Every run needs operator approval. Output is \
         limited to 10,000 characters."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": EvalAction::names(),
                    "description": "Interpreter to use"
                },
                "command": {
                    "type": "string",
                    "description": "Shell command for the shell action"
                },
                "code": {
                    "type": "string",
                    "description": "Source code for the python and ruby actions"
                },
                "timeout_secs": {
                    "type": "integer",
                    "description": "Timeout in seconds (default: 30, max: 300)"
                }
            },
            "required": ["action"]
        })
    }

    async fn execute(&self, call_id: &str, args: Value) -> ToolResult {
        let outcome = match ActionRequest::from_args(args, None) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => Err(e),
        };
        ToolResult::from_outcome(call_id, self.name(), outcome)
    }
}

#[cfg(test)]
mod tests {
    use proto::ApprovalDecision;

    use super::*;
    use crate::authorizer::testing::{ScriptedPrompt, asking};

    #[tokio::test]
    async fn approved_shell_runs_once() {
        let prompt = ScriptedPrompt::new(ApprovalDecision::Approve);
        let tool = EvalTool::default().with_authorizer(asking(prompt.clone()));
        let out = tool
            .dispatch(ActionRequest::new("shell").with("command", "echo hi"))
            .await
            .unwrap();
        assert!(out.as_str().unwrap().contains("stdout:\nhi"));
        assert_eq!(prompt.asked(), 1);
    }

    #[tokio::test]
    async fn declined_snippet_is_not_run() {
        let dir = tempfile::tempdir().expect("temp dir");
        let marker = dir.path().join("ran");
        let prompt = ScriptedPrompt::new(ApprovalDecision::Reject);
        let tool = EvalTool::default().with_authorizer(asking(prompt.clone()));

        let err = tool
            .dispatch(
                ActionRequest::new("shell").with("command", format!("touch {}", marker.display())),
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Action 'shell' of tool 'eval' was declined by the operator");
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn python_and_ruby_take_code_parameter() {
        let prompt = ScriptedPrompt::new(ApprovalDecision::Approve);
        let tool = EvalTool::default().with_authorizer(asking(prompt.clone()));

        for action in ["python", "ruby"] {
            let err = tool
                .dispatch(ActionRequest::new(action).with("command", "x"))
                .await
                .unwrap_err();
            assert_eq!(
                err.to_string(),
                format!("Missing required parameter 'code' for action '{action}'")
            );
        }
        assert_eq!(prompt.asked(), 0);
    }

    #[tokio::test]
    async fn blank_source_is_rejected_before_prompt() {
        let prompt = ScriptedPrompt::new(ApprovalDecision::Approve);
        let tool = EvalTool::default().with_authorizer(asking(prompt.clone()));
        let err = tool
            .dispatch(ActionRequest::new("shell").with("command", "   "))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameter { .. }));
        assert_eq!(prompt.asked(), 0);
    }

    #[test]
    fn runners_are_memoized_per_interpreter() {
        let tool = EvalTool::new(5);
        let a: *const CodeRunner = tool.runner(EvalAction::Python);
        let b: *const CodeRunner = tool.runner(EvalAction::Python);
        assert_eq!(a, b);
        assert_eq!(tool.runner(EvalAction::Ruby).interpreter(), Interpreter::Ruby);
        assert!(tool.shell.get().is_none());
    }
}

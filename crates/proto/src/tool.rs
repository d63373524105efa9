//! Tool definitions, call results and batch step records.

use serde::{Deserialize, Serialize};

use crate::ToolError;

/// Tool metadata exposed to the LLM runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description used for tool selection.
    pub description: String,
    /// JSON schema of the accepted arguments.
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Creates a tool definition.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// Result of one tool call, returned to the LLM runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool-call identifier supplied by the caller.
    pub call_id: String,
    /// Name of the tool that produced this result.
    pub tool_name: String,
    /// Text payload: the raw string value, JSON for structured values, or the error message.
    pub output: String,
    /// Whether the call failed.
    pub is_error: bool,
}

impl ToolResult {
    /// Creates a successful result.
    pub fn success(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            output: output.into(),
            is_error: false,
        }
    }

    /// Creates a failed result.
    pub fn error(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            output: output.into(),
            is_error: true,
        }
    }

    /// Converts a dispatch outcome into a result.
    ///
    /// String values are passed through verbatim; other JSON values are
    /// serialized.
    pub fn from_outcome(
        call_id: &str,
        tool_name: &str,
        outcome: Result<serde_json::Value, ToolError>,
    ) -> Self {
        match outcome {
            Ok(serde_json::Value::String(text)) => Self::success(call_id, tool_name, text),
            Ok(value) => Self::success(call_id, tool_name, value.to_string()),
            Err(err) => Self::error(call_id, tool_name, err.to_string()),
        }
    }
}

/// Status of one step of a multi-step action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Ok,
    Error,
}

/// Outcome of one backend operation, as reported by a driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub status: StepStatus,
    pub result: serde_json::Value,
}

impl StepOutcome {
    /// Successful outcome carrying `result`.
    pub fn ok(result: impl Into<serde_json::Value>) -> Self {
        Self {
            status: StepStatus::Ok,
            result: result.into(),
        }
    }

    /// Failed outcome carrying an error message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: StepStatus::Error,
            result: serde_json::Value::String(message.into()),
        }
    }

    /// Returns `true` when the step failed.
    pub fn is_error(&self) -> bool {
        self.status == StepStatus::Error
    }
}

/// One entry of a batch result list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub status: StepStatus,
    /// The statement or command this step ran.
    pub statement: String,
    pub result: serde_json::Value,
}

impl StepRecord {
    /// Pairs a driver outcome with the statement that produced it.
    pub fn new(statement: impl Into<String>, outcome: StepOutcome) -> Self {
        Self {
            status: outcome.status,
            statement: statement.into(),
            result: outcome.result,
        }
    }
}

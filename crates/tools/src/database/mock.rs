//! Scriptable database driver for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use proto::{StepOutcome, ToolError};
use serde_json::json;

use super::driver::DatabaseDriver;
use super::statement::returns_rows;

/// Driver that records statements and fails those containing a marker.
#[derive(Default)]
pub struct MockDriver {
    fail_marker: Option<String>,
    statements: Mutex<Vec<String>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statements containing `marker` produce an error outcome.
    pub fn failing_on(marker: impl Into<String>) -> Self {
        Self {
            fail_marker: Some(marker.into()),
            statements: Mutex::default(),
        }
    }

    /// Statements received so far.
    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().clone()
    }
}

#[async_trait]
impl DatabaseDriver for MockDriver {
    async fn perform(&self, statement: &str) -> Result<StepOutcome, ToolError> {
        self.statements.lock().push(statement.to_string());
        if let Some(marker) = &self.fail_marker
            && statement.contains(marker.as_str())
        {
            return Ok(StepOutcome::error(format!("mock failure: {statement}")));
        }
        if returns_rows(statement) {
            Ok(StepOutcome::ok(json!([])))
        } else {
            Ok(StepOutcome::ok("0 row(s) affected"))
        }
    }
}

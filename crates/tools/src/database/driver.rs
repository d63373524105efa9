use async_trait::async_trait;
use proto::{StepOutcome, ToolError};

use crate::short_type_name;

/// SQL capability set: run one statement.
///
/// The driver decides how a statement is run and how its result is shaped
/// (rows vs. affected-row message). Statement-level failures are reported as
/// [`StepOutcome::error`]; `Err` is reserved for driver-level problems.
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Name reported in errors.
    fn driver_name(&self) -> &'static str {
        short_type_name::<Self>()
    }

    /// Runs one statement.
    async fn perform(&self, _statement: &str) -> Result<StepOutcome, ToolError> {
        Err(ToolError::not_implemented(self.driver_name(), "perform"))
    }

    /// Releases the connection. Calling it again is a no-op.
    async fn close(&self) {}
}

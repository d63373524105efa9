//! Database facade: batches of SQL statements run through a [`DatabaseDriver`].

mod driver;
mod mock;
mod sqlite;
mod statement;

pub use driver::DatabaseDriver;
pub use mock::MockDriver;
pub use sqlite::SqliteDriver;
pub use statement::{is_read_only, returns_rows};

use std::sync::Arc;

use async_trait::async_trait;
use proto::{DatabaseError, StepRecord, ToolError, ToolResult};
use serde_json::{Value, json};
use tracing::warn;

use crate::{ActionRequest, ActionSet, Authorizer, Tool};

const TOOL_NAME: &str = "database";

/// Actions understood by [`DatabaseTool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseAction {
    Execute,
}

impl ActionSet for DatabaseAction {
    const ALL: &'static [Self] = &[Self::Execute];

    fn as_str(self) -> &'static str {
        match self {
            Self::Execute => "execute",
        }
    }
}

/// Facade running ordered SQL batches.
///
/// Statements run in order and the batch stops at the first failing one.
/// Statements that already ran are not rolled back.
pub struct DatabaseTool {
    driver: Arc<dyn DatabaseDriver>,
    authorizer: Arc<Authorizer>,
}

impl DatabaseTool {
    /// Opens a SQLite database at `db_url` and wraps it.
    pub async fn sqlite(db_url: &str) -> Result<Self, DatabaseError> {
        Ok(Self::with_driver(Arc::new(SqliteDriver::open(db_url).await?)))
    }

    pub fn with_driver(driver: Arc<dyn DatabaseDriver>) -> Self {
        Self {
            driver,
            authorizer: Authorizer::global(),
        }
    }

    pub fn with_authorizer(mut self, authorizer: Arc<Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    /// Validates, authorizes and routes one request.
    pub async fn dispatch(&self, request: ActionRequest) -> Result<Value, ToolError> {
        request.log_start(TOOL_NAME);
        let outcome = self.route(&request).await;
        request.log_outcome(TOOL_NAME, &outcome);
        outcome
    }

    async fn route(&self, request: &ActionRequest) -> Result<Value, ToolError> {
        let action = DatabaseAction::parse(TOOL_NAME, request.action())?;
        match action {
            DatabaseAction::Execute => {
                let statements = request.require_str_list("statements")?;
                if statements.is_empty() {
                    return Err(
                        request.invalid("statements", "must contain at least one statement")
                    );
                }
                if let Some(idx) = statements.iter().position(|s| s.trim().is_empty()) {
                    return Err(request.invalid("statements", format!("statement {idx} is empty")));
                }

                if !statements.iter().all(|s| is_read_only(s)) {
                    let description = format!(
                        "Execute {} SQL statement(s):\n{}",
                        statements.len(),
                        statements.join(";\n")
                    );
                    self.authorizer
                        .ensure(TOOL_NAME, action.as_str(), &description)
                        .await?;
                }

                let records = self.run_batch(&statements).await?;
                serde_json::to_value(records).map_err(|e| {
                    ToolError::ExecutionFailed(format!("Failed to encode batch result: {e}"))
                })
            }
        }
    }

    /// Runs `statements` in order, stopping after the first failure.
    ///
    /// The returned list has one record per attempted statement.
    pub async fn run_batch(&self, statements: &[String]) -> Result<Vec<StepRecord>, ToolError> {
        let mut records = Vec::with_capacity(statements.len());
        for statement in statements {
            let outcome = self.driver.perform(statement).await?;
            let failed = outcome.is_error();
            records.push(StepRecord::new(statement.as_str(), outcome));
            if failed {
                warn!(
                    statement = %statement,
                    skipped = statements.len() - records.len(),
                    "Statement failed; stopping batch"
                );
                break;
            }
        }
        Ok(records)
    }

    /// Releases the underlying connection.
    pub async fn close(&self) {
        self.driver.close().await;
    }
}

#[async_trait]
impl Tool for DatabaseTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Run an ordered batch of SQL statements. Execution stops at the first failing \
         statement; earlier statements are not rolled back. Returns one \
         {status, statement, result} record per attempted statement."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": DatabaseAction::names(),
                    "description": "Operation to perform (defaults to execute)"
                },
                "statements": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "SQL statements to run in order"
                }
            },
            "required": ["statements"]
        })
    }

    async fn execute(&self, call_id: &str, args: Value) -> ToolResult {
        let outcome = match ActionRequest::from_args(args, Some(DatabaseAction::Execute.as_str())) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => Err(e),
        };
        ToolResult::from_outcome(call_id, self.name(), outcome)
    }
}

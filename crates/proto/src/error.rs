use thiserror::Error;

/// Top-level error type
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration loading/validation error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Tool dispatch/execution error.
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field has an invalid value and reason.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// Filesystem read error.
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error.
    #[error("TOML parse error: {0}")]
    Toml(String),
}

/// Tool dispatch and execution errors.
///
/// Every variant names the action, field, driver or path at fault so the
/// caller (usually an LLM) can correct the next call.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The action is not part of the tool's action set.
    #[error("Unsupported action '{action}' for tool '{tool}'. Valid actions: {}", valid.join(", "))]
    UnknownAction {
        tool: String,
        action: String,
        valid: Vec<String>,
    },

    /// No tool with this name is registered.
    #[error("Unknown tool '{tool}'. Available tools: {}", available.join(", "))]
    UnknownTool {
        tool: String,
        available: Vec<String>,
    },

    /// A parameter required by the action is absent or null.
    #[error("Missing required parameter '{field}' for action '{action}'")]
    MissingParameter { action: String, field: String },

    /// A parameter is present but has the wrong shape or value.
    #[error("Invalid parameter '{field}' for action '{action}': {reason}")]
    InvalidParameter {
        action: String,
        field: String,
        reason: String,
    },

    /// The operator declined the action.
    #[error("Action '{action}' of tool '{tool}' was declined by the operator")]
    Declined { tool: String, action: String },

    /// The driver does not provide this capability.
    #[error("{driver} does not implement '{method}'")]
    NotImplemented { driver: String, method: String },

    /// Disallowed access such as a path escaping the sandbox root.
    #[error("Security violation: {0}")]
    Security(String),

    /// A backend the driver needs is not installed or cannot start.
    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    /// The target resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend operation failed.
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// Tool exceeded allowed execution time.
    #[error("Timeout after {0}s")]
    Timeout(u64),

    /// Filesystem/process IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// Builds a [`ToolError::NotImplemented`] for a driver method.
    pub fn not_implemented(driver: &str, method: &str) -> Self {
        Self::NotImplemented {
            driver: driver.to_string(),
            method: method.to_string(),
        }
    }

    /// Returns `true` for errors produced before any backend was touched.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnknownTool { .. }
                | Self::UnknownAction { .. }
                | Self::MissingParameter { .. }
                | Self::InvalidParameter { .. }
        )
    }
}

/// Database errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// SQLx operation error.
    #[error("SQLx error: {0}")]
    Sqlx(String),

    /// The connection URL is not usable.
    #[error("Invalid database url: {0}")]
    InvalidUrl(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tool_is_a_validation_error() {
        let err = ToolError::UnknownTool {
            tool: "fs".to_string(),
            available: vec!["disk".to_string(), "doc".to_string()],
        };
        assert_eq!(err.to_string(), "Unknown tool 'fs'. Available tools: disk, doc");
        assert!(err.is_validation());
        assert!(!ToolError::Timeout(1).is_validation());
    }

    #[test]
    fn displays_config_error_variant() {
        let err = ConfigError::InvalidValue {
            field: "SHARED_TOOLS_AUTO_EXECUTE".to_string(),
            reason: "expected true or false".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid value for SHARED_TOOLS_AUTO_EXECUTE: expected true or false"
        );
    }

    #[test]
    fn unknown_action_lists_valid_actions() {
        let err = ToolError::UnknownAction {
            tool: "disk".to_string(),
            action: "explode".to_string(),
            valid: vec!["file_read".to_string(), "file_write".to_string()],
        };
        let text = err.to_string();
        assert!(text.contains("'explode'"));
        assert!(text.contains("file_read, file_write"));
        assert!(err.is_validation());
    }

    #[test]
    fn missing_parameter_names_field_and_action() {
        let err = ToolError::MissingParameter {
            action: "file_read".to_string(),
            field: "path".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Missing required parameter 'path' for action 'file_read'"
        );
    }

    #[test]
    fn not_implemented_names_driver_and_method() {
        let err = ToolError::not_implemented("BareDriver", "goto");
        assert_eq!(err.to_string(), "BareDriver does not implement 'goto'");
        assert!(!err.is_validation());
    }

    #[test]
    fn wraps_tool_and_database_errors() {
        let tool_err: Error = ToolError::Declined {
            tool: "eval".to_string(),
            action: "shell".to_string(),
        }
        .into();
        assert!(tool_err.to_string().contains("Tool error"));
        assert!(tool_err.to_string().contains("declined"));

        let db_err: Error = DatabaseError::Sqlx("locked".to_string()).into();
        assert!(db_err.to_string().contains("Database error"));
    }
}

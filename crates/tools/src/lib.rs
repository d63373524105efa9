//! Tool trait, action-routed tool facades and their drivers.
//!
//! Each facade (`browser`, `disk`, `database`, `eval`, `doc`, `computer`)
//! accepts `{"action": ..., ...params}`, validates the parameters the action
//! needs, asks the [`Authorizer`] before sensitive actions, and routes to a
//! sub-tool or a pluggable driver.

pub mod action;
pub mod authorizer;
pub mod browser;
pub mod computer;
pub mod database;
pub mod disk;
pub mod doc;
pub mod eval;
pub mod prompt;
pub mod registry;

pub use action::{ActionRequest, ActionSet};
pub use authorizer::{AuthorizationPolicy, Authorizer, set_auto_execute};
pub use browser::BrowserTool;
pub use computer::ComputerTool;
pub use database::DatabaseTool;
pub use disk::DiskTool;
pub use doc::DocTool;
pub use eval::EvalTool;
pub use prompt::{StreamPrompt, TerminalPrompt};
pub use registry::ToolRegistry;

use async_trait::async_trait;
use proto::ToolResult;

/// Trait that all tools must implement
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name exposed to the LLM.
    fn name(&self) -> &str;
    /// Human-readable description for tool selection.
    fn description(&self) -> &str;
    /// JSON schema for accepted tool arguments.
    fn parameters_schema(&self) -> serde_json::Value;
    /// Executes the tool with the given call id and JSON args.
    async fn execute(&self, call_id: &str, args: serde_json::Value) -> ToolResult;
}

/// Short type name used when a driver reports a missing capability.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

//! Shared protocol types for the tool facades and their callers.
//!
//! This crate defines the error taxonomy, operator-approval types and the
//! serializable tool call/result structures used across the workspace.

pub mod approval;
pub mod error;
pub mod tool;

/// Re-export of operator approval types.
pub use approval::{
    ApprovalDecision, ApprovalHandler, ApprovalRequest, AutoApproveHandler, RejectAllHandler,
};
/// Re-export of all protocol error types.
pub use error::*;
/// Re-export of tool definition, result and batch step types.
pub use tool::{StepOutcome, StepRecord, StepStatus, ToolDefinition, ToolResult};

//! Operator approval types shared by the authorizer and its prompt backends.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Operator's decision on an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalDecision {
    /// Run this single action.
    Approve,
    /// Refuse this action.
    Reject,
}

impl ApprovalDecision {
    /// Returns `true` for [`ApprovalDecision::Approve`].
    pub fn is_approved(self) -> bool {
        self == Self::Approve
    }
}

/// A request for operator approval before a sensitive action runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// Name of the tool asking for approval.
    pub actor: String,
    /// Human-readable description of what is about to happen.
    pub description: String,
}

impl ApprovalRequest {
    /// Creates an approval request.
    pub fn new(actor: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            description: description.into(),
        }
    }
}

/// Backend that asks an operator to approve or reject an action.
///
/// Implementations may block until the operator answers. They must
/// answer [`ApprovalDecision::Reject`] whenever the answer is ambiguous.
#[async_trait]
pub trait ApprovalHandler: Send + Sync {
    /// Request approval for one action.
    async fn request_approval(&self, req: ApprovalRequest) -> ApprovalDecision;
}

/// Handler that approves everything without asking.
pub struct AutoApproveHandler;

#[async_trait]
impl ApprovalHandler for AutoApproveHandler {
    async fn request_approval(&self, _req: ApprovalRequest) -> ApprovalDecision {
        ApprovalDecision::Approve
    }
}

/// Handler that rejects everything without asking.
pub struct RejectAllHandler;

#[async_trait]
impl ApprovalHandler for RejectAllHandler {
    async fn request_approval(&self, _req: ApprovalRequest) -> ApprovalDecision {
        ApprovalDecision::Reject
    }
}

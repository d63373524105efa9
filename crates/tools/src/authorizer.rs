//! Human-in-the-loop gate for sensitive actions.
//!
//! An [`Authorizer`] holds one of two policies. Under [`AuthorizationPolicy::Auto`]
//! every request is approved without any I/O. Under [`AuthorizationPolicy::Ask`]
//! the configured [`ApprovalHandler`] is consulted and the call waits, without a
//! timeout, until the operator answers.
//!
//! Facades use [`Authorizer::global`] unless another instance is injected. The
//! global policy is process-wide: a change made by one caller applies to every
//! later call from any task, with no scoping or nesting. Prompts are serialized
//! so two concurrent requests never interleave on the terminal, but the policy
//! flag itself is last-write-wins and callers that toggle it concurrently race
//! with each other.

use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use proto::{ApprovalHandler, ApprovalRequest, ToolError};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::prompt::TerminalPrompt;

/// Authorization policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthorizationPolicy {
    /// Approve every request.
    Auto,
    /// Ask the operator for every request.
    #[default]
    Ask,
}

impl AuthorizationPolicy {
    /// Maps an `auto_execute` flag to a policy.
    pub fn from_auto_execute(auto_execute: bool) -> Self {
        if auto_execute { Self::Auto } else { Self::Ask }
    }
}

/// Gate consulted by facades before sensitive actions.
pub struct Authorizer {
    policy: RwLock<AuthorizationPolicy>,
    handler: Arc<dyn ApprovalHandler>,
    prompt_lock: Mutex<()>,
}

impl Authorizer {
    /// Creates an authorizer with an explicit policy and prompt backend.
    pub fn new(policy: AuthorizationPolicy, handler: Arc<dyn ApprovalHandler>) -> Self {
        Self {
            policy: RwLock::new(policy),
            handler,
            prompt_lock: Mutex::new(()),
        }
    }

    /// Authorizer that approves everything.
    pub fn auto() -> Self {
        Self::new(AuthorizationPolicy::Auto, Arc::new(TerminalPrompt::new()))
    }

    /// Process-wide authorizer, prompting on the controlling terminal.
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<Authorizer>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| {
                Arc::new(Self::new(
                    AuthorizationPolicy::default(),
                    Arc::new(TerminalPrompt::new()),
                ))
            })
            .clone()
    }

    /// Current policy.
    pub fn policy(&self) -> AuthorizationPolicy {
        *self.policy.read()
    }

    /// Replaces the policy; applies to every subsequent call.
    pub fn set_policy(&self, policy: AuthorizationPolicy) {
        *self.policy.write() = policy;
        info!(?policy, "Authorization policy changed");
    }

    /// Shorthand for `set_policy(AuthorizationPolicy::from_auto_execute(..))`.
    pub fn set_auto_execute(&self, auto_execute: bool) {
        self.set_policy(AuthorizationPolicy::from_auto_execute(auto_execute));
    }

    /// Decides whether `actor` may do what `description` says.
    pub async fn authorize(&self, actor: &str, description: &str) -> bool {
        if self.policy() == AuthorizationPolicy::Auto {
            return true;
        }

        let _guard = self.prompt_lock.lock().await;
        let decision = self
            .handler
            .request_approval(ApprovalRequest::new(actor, description))
            .await;
        if !decision.is_approved() {
            warn!(actor, "Operator declined action");
        }
        decision.is_approved()
    }

    /// Like [`authorize`](Self::authorize) but maps a rejection to
    /// [`ToolError::Declined`].
    pub async fn ensure(
        &self,
        tool: &str,
        action: &str,
        description: &str,
    ) -> Result<(), ToolError> {
        if self.authorize(tool, description).await {
            Ok(())
        } else {
            Err(ToolError::Declined {
                tool: tool.to_string(),
                action: action.to_string(),
            })
        }
    }
}

/// Sets the policy of the process-wide authorizer.
pub fn set_auto_execute(auto_execute: bool) {
    Authorizer::global().set_auto_execute(auto_execute);
}

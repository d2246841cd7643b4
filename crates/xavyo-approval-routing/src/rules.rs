//! Approval assignment rules.
//!
//! A configured `approvalAssignmentRule` receives the fully generated
//! approvals and returns the list that is actually routed. Whatever the
//! rule returns replaces the generated list; nothing is merged.
//!
//! # Example
//!
//! ```ignore
//! use xavyo_approval_routing::rules::{AssignmentRule, RuleRegistry};
//!
//! let registry = RuleRegistry::new();
//! registry.register(Arc::new(RouteToAuditors)).await;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::config::SchemeConfig;
use crate::types::{ApprovalUnit, ChangeSet};

/// Error raised by a rule runner.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// No rule is registered under the given name.
    #[error("Rule not found: {0}")]
    NotFound(String),

    /// The rule ran and reported a failure.
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

/// Context handed to an assignment rule.
#[derive(Debug, Clone)]
pub struct RuleContext {
    /// Approvals produced by the generator.
    pub approvals: Vec<ApprovalUnit>,
    /// Master change set after auto-approval and the finalize sweep.
    pub approval_set: ChangeSet,
    /// Configuration of the pass.
    pub config: SchemeConfig,
}

/// A named rule that may rewrite the generated approvals.
#[async_trait::async_trait]
pub trait AssignmentRule: Send + Sync {
    /// Rule name as referenced by `approvalAssignmentRule`.
    fn name(&self) -> &str;

    /// Produce the approvals to route.
    async fn assign(&self, context: &RuleContext) -> Result<Vec<ApprovalUnit>, RuleError>;
}

/// Trait for running named rules.
#[async_trait::async_trait]
pub trait RuleRunner: Send + Sync {
    /// Run the named rule.
    async fn run_rule(
        &self,
        name: &str,
        context: &RuleContext,
    ) -> Result<Vec<ApprovalUnit>, RuleError>;
}

/// Registry of assignment rules.
pub struct RuleRegistry {
    rules: RwLock<HashMap<String, Arc<dyn AssignmentRule>>>,
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(HashMap::new()),
        }
    }

    /// Register a rule under its name.
    pub async fn register(&self, rule: Arc<dyn AssignmentRule>) {
        let mut rules = self.rules.write().await;
        rules.insert(rule.name().to_string(), rule);
    }

    /// Check if a rule is registered.
    pub async fn has_rule(&self, name: &str) -> bool {
        self.rules.read().await.contains_key(name)
    }
}

#[async_trait::async_trait]
impl RuleRunner for RuleRegistry {
    async fn run_rule(
        &self,
        name: &str,
        context: &RuleContext,
    ) -> Result<Vec<ApprovalUnit>, RuleError> {
        let rule = self
            .rules
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| RuleError::NotFound(name.to_string()))?;

        debug!(
            target: "approval_routing",
            rule = %name,
            approvals = context.approvals.len(),
            "Running assignment rule"
        );

        rule.assign(context).await.inspect_err(|e| {
            error!(target: "approval_routing", rule = %name, error = %e, "Assignment rule failed");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DropAll;

    #[async_trait::async_trait]
    impl AssignmentRule for DropAll {
        fn name(&self) -> &str {
            "Drop All"
        }

        async fn assign(&self, _context: &RuleContext) -> Result<Vec<ApprovalUnit>, RuleError> {
            Ok(Vec::new())
        }
    }

    fn context() -> RuleContext {
        RuleContext {
            approvals: vec![ApprovalUnit::single("bob", ChangeSet::new())],
            approval_set: ChangeSet::new(),
            config: SchemeConfig::new("emma", "owner"),
        }
    }

    #[tokio::test]
    async fn test_registered_rule_runs() {
        let registry = RuleRegistry::new();
        registry.register(Arc::new(DropAll)).await;

        assert!(registry.has_rule("Drop All").await);
        let result = registry.run_rule("Drop All", &context()).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_missing_rule() {
        let registry = RuleRegistry::new();
        let result = registry.run_rule("Nope", &context()).await;
        assert!(matches!(result, Err(RuleError::NotFound(name)) if name == "Nope"));
    }
}

//! Approval generation pass.
//!
//! [`ApprovalGenerator`] wires the owner resolver, scheme composer,
//! auto-approval engine and tree builder together and runs them once for a
//! single subject identity.
//!
//! The pass works on a clone of `approvalSet`. Record changes (owners,
//! auto-approvals, the finalize sweep) are written back to the caller's
//! configuration only when the whole pass succeeded.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::audit::AuditLog;
use crate::config::SchemeConfig;
use crate::directory::IdentityDirectory;
use crate::error::{ApprovalRoutingError, Result};
use crate::rules::{RuleContext, RuleRunner};
use crate::services::approval_tree::{finalize, ApprovalTreeBuilder};
use crate::services::auto_approval::AutoApprovalEngine;
use crate::services::owner_map::{OwnerMap, OwnerMapBuilder};
use crate::services::owner_resolver::OwnerResolver;
use crate::services::scheme_composer::SchemeComposer;
use crate::services::variant::{ApprovalVariant, IdentityRequestVariant};
use crate::types::{ApprovalUnit, ChangeSet, Scheme};

/// Generates the approval units for a change set.
#[derive(Clone)]
pub struct ApprovalGenerator {
    directory: Arc<dyn IdentityDirectory>,
    composer: SchemeComposer,
    engine: AutoApprovalEngine,
    variant: Arc<dyn ApprovalVariant>,
    rules: Option<Arc<dyn RuleRunner>>,
}

impl ApprovalGenerator {
    /// Create a generator for identity requests.
    pub fn new(directory: Arc<dyn IdentityDirectory>, audit: Arc<dyn AuditLog>) -> Self {
        let resolver = OwnerResolver::new(directory.clone());
        Self {
            composer: SchemeComposer::new(directory.clone(), resolver),
            engine: AutoApprovalEngine::new(directory.clone(), audit),
            directory,
            variant: Arc::new(IdentityRequestVariant),
            rules: None,
        }
    }

    /// Use a different request variant.
    #[must_use]
    pub fn with_variant(mut self, variant: Arc<dyn ApprovalVariant>) -> Self {
        self.variant = variant;
        self
    }

    /// Set the runner for `approvalAssignmentRule`.
    #[must_use]
    pub fn with_rule_runner(mut self, rules: Arc<dyn RuleRunner>) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Run one generation pass.
    ///
    /// Returns `None` when the scheme list contains `none`; every pending
    /// record is finished in that case. Otherwise returns the units to
    /// route, possibly empty when everything was auto-approved.
    ///
    /// # Errors
    ///
    /// Any error leaves `config.approval_set` exactly as it was.
    ///
    /// - `Configuration` for missing or malformed inputs, detected before
    ///   any lookup.
    /// - `Resolution` for structurally invalid records.
    /// - `UnresolvedApprover` when nothing resolves and there is no fallback.
    /// - `OverrideRule` when the assignment rule fails.
    #[instrument(
        skip_all,
        fields(
            identity = %config.identity_name,
            scheme = %config.approval_scheme,
            variant = %self.variant.name()
        )
    )]
    pub async fn generate(&self, config: &mut SchemeConfig) -> Result<Option<Vec<ApprovalUnit>>> {
        let tokens = config.scheme_tokens()?;
        config.validate(&tokens, self.variant.is_approval_set_required())?;
        if let Some(rule) = config.approval_assignment_rule.as_deref() {
            if self.rules.is_none() {
                return Err(ApprovalRoutingError::Configuration(format!(
                    "approvalAssignmentRule '{rule}' is configured but no rule runner is available"
                )));
            }
        }

        let mut working = config.approval_set.clone().unwrap_or_default();

        if tokens.contains(&Scheme::None) {
            let finished = finalize(&mut working, &[]);
            info!(
                target: "approval_routing",
                finished,
                "Approval scheme 'none', no approvals required"
            );
            Self::commit(config, working);
            return Ok(None);
        }

        let snapshot: &SchemeConfig = config;
        let owner_map = self.owner_map(&mut working, &tokens, snapshot).await?;

        let tree = ApprovalTreeBuilder::new(
            self.composer.clone(),
            self.engine.clone(),
            self.variant.clone(),
        );
        let units = tree
            .build(owner_map, &tokens, snapshot, &mut working)
            .await?
            .unwrap_or_default();

        let finished = finalize(&mut working, &units);
        let units = self.apply_override(units, &working, snapshot).await?;

        info!(
            target: "approval_routing",
            units = units.len(),
            finished,
            "Generated approvals"
        );
        Self::commit(config, working);
        Ok(Some(units))
    }

    async fn owner_map(
        &self,
        working: &mut ChangeSet,
        tokens: &[Scheme],
        config: &SchemeConfig,
    ) -> Result<OwnerMap> {
        if !tokens.contains(&Scheme::Owner) {
            return Ok(OwnerMap::new());
        }

        let builder = OwnerMapBuilder::new(self.composer.clone(), self.engine.clone());
        match self
            .variant
            .resolve_owners_for_whole_set(self.directory.as_ref(), config)
            .await?
        {
            Some(owners) if owners.is_empty() => Err(ApprovalRoutingError::UnresolvedApprover(
                format!("{} '{}'", self.variant.name(), config.identity_name),
            )),
            Some(owners) => builder.build_for_whole_set(working, &owners, config).await,
            None => builder.build_owner_map(working, tokens, config).await,
        }
    }

    async fn apply_override(
        &self,
        units: Vec<ApprovalUnit>,
        working: &ChangeSet,
        config: &SchemeConfig,
    ) -> Result<Vec<ApprovalUnit>> {
        let (Some(rule), Some(runner)) = (config.approval_assignment_rule.as_deref(), &self.rules)
        else {
            return Ok(units);
        };

        let context = RuleContext {
            approvals: units,
            approval_set: working.clone(),
            config: SchemeConfig {
                approval_set: None,
                ..config.clone()
            },
        };

        let replaced = runner.run_rule(rule, &context).await.map_err(|e| {
            warn!(target: "approval_routing", rule = %rule, error = %e, "Approval assignment rule failed");
            ApprovalRoutingError::OverrideRule {
                rule: rule.to_string(),
                message: e.to_string(),
            }
        })?;

        info!(
            target: "approval_routing",
            rule = %rule,
            generated = context.approvals.len(),
            routed = replaced.len(),
            "Approvals replaced by assignment rule"
        );
        Ok(replaced)
    }

    fn commit(config: &mut SchemeConfig, working: ChangeSet) {
        if config.approval_set.is_some() {
            config.approval_set = Some(working);
        }
    }
}

//! Approver composition for scheme token lists.
//!
//! Each token contributes approvers independently and the contributions are
//! concatenated in token order. `none` anywhere in the list short-circuits
//! the whole composition.

use std::sync::Arc;

use tracing::debug;

use crate::config::SchemeConfig;
use crate::directory::{IdentityDirectory, ObjectType, MANAGER_PROPERTY};
use crate::error::{ApprovalRoutingError, Result};
use crate::services::owner_resolver::OwnerResolver;
use crate::types::{ChangeRecord, Scheme};

/// Approvers contributed by one scheme token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemeApprovers {
    /// Scheme that produced the approvers.
    pub scheme: Scheme,
    /// Approver names in resolution order.
    pub approvers: Vec<String>,
}

/// Composes approvers for a record or for the whole change set.
#[derive(Clone)]
pub struct SchemeComposer {
    directory: Arc<dyn IdentityDirectory>,
    resolver: OwnerResolver,
}

impl SchemeComposer {
    /// Create a new composer.
    pub fn new(directory: Arc<dyn IdentityDirectory>, resolver: OwnerResolver) -> Self {
        Self {
            directory,
            resolver,
        }
    }

    /// Flat list of approvers; `None` when the list contains `none`.
    ///
    /// # Errors
    ///
    /// See [`SchemeComposer::compose_by_scheme`].
    pub async fn compose_approvers(
        &self,
        tokens: &[Scheme],
        record: Option<&ChangeRecord>,
        config: &SchemeConfig,
    ) -> Result<Option<Vec<String>>> {
        Ok(self
            .compose_by_scheme(tokens, record, config)
            .await?
            .map(|composed| composed.into_iter().flat_map(|c| c.approvers).collect()))
    }

    /// Approvers grouped by the token that contributed them.
    ///
    /// With a record, `owner` resolves that record's owner; without one,
    /// `owner` contributes nothing. When every token comes back empty the
    /// fallback approver is credited to the first token.
    ///
    /// # Errors
    ///
    /// - `Configuration` when `newManager` is used without a plan, or
    ///   `securityOfficer` is used for the whole set without a name.
    /// - `UnresolvedApprover` when nothing resolves and there is no fallback.
    /// - Resolution and directory errors from owner lookups.
    pub async fn compose_by_scheme(
        &self,
        tokens: &[Scheme],
        record: Option<&ChangeRecord>,
        config: &SchemeConfig,
    ) -> Result<Option<Vec<SchemeApprovers>>> {
        if tokens.contains(&Scheme::None) {
            return Ok(None);
        }

        let mut composed = Vec::with_capacity(tokens.len());
        for &scheme in tokens {
            let approvers = match scheme {
                Scheme::Manager => self.current_manager(config).await?.into_iter().collect(),
                Scheme::NewManager => new_manager(config)?.into_iter().collect(),
                Scheme::Owner => match record {
                    Some(record) => self.record_owners(record, config).await?,
                    None => Vec::new(),
                },
                Scheme::SecurityOfficer => match (config.security_officer(), record) {
                    (Some(officer), _) => vec![officer.to_string()],
                    (None, Some(_)) => Vec::new(),
                    (None, None) => {
                        return Err(ApprovalRoutingError::Configuration(
                            "securityOfficerName is required for the securityOfficer scheme"
                                .to_string(),
                        ));
                    }
                },
                Scheme::Identity => config
                    .approving_identities
                    .iter()
                    .filter(|n| !n.trim().is_empty())
                    .cloned()
                    .collect(),
                Scheme::None => continue,
            };
            composed.push(SchemeApprovers { scheme, approvers });
        }

        if composed.iter().all(|c| c.approvers.is_empty()) {
            let fallback = config.fallback().ok_or_else(|| {
                ApprovalRoutingError::UnresolvedApprover(unresolved_target(record, config))
            })?;
            debug!(
                target: "approval_routing",
                fallback = %fallback,
                "No approvers resolved, using fallback approver"
            );
            match composed.first_mut() {
                Some(first) => first.approvers.push(fallback.to_string()),
                None => {
                    return Err(ApprovalRoutingError::Configuration(
                        "no approval scheme to compose".to_string(),
                    ));
                }
            }
        }

        if tokens.contains(&Scheme::Manager) && tokens.contains(&Scheme::NewManager) {
            let managers: Vec<&str> = composed
                .iter()
                .filter(|c| matches!(c.scheme, Scheme::Manager | Scheme::NewManager))
                .flat_map(|c| c.approvers.iter().map(String::as_str))
                .collect();
            debug!(
                target: "approval_routing",
                identity = %config.identity_name,
                managers = ?managers,
                "Composed manager transfer approvers"
            );
        }

        Ok(Some(composed))
    }

    async fn current_manager(&self, config: &SchemeConfig) -> Result<Option<String>> {
        let manager = self
            .directory
            .find_owner_by_name(ObjectType::Identity, &config.identity_name, MANAGER_PROPERTY)
            .await?;
        Ok(manager.filter(|m| !m.trim().is_empty()))
    }

    async fn record_owners(&self, record: &ChangeRecord, config: &SchemeConfig) -> Result<Vec<String>> {
        let owners = self.resolver.resolve_owners(record).await?;
        if !owners.is_empty() {
            return Ok(owners);
        }
        match config.fallback() {
            Some(fallback) => {
                debug!(
                    target: "approval_routing",
                    record_id = %record.id,
                    fallback = %fallback,
                    "No owner resolved, using fallback approver"
                );
                Ok(vec![fallback.to_string()])
            }
            None => Err(ApprovalRoutingError::UnresolvedApprover(record.summary())),
        }
    }
}

fn new_manager(config: &SchemeConfig) -> Result<Option<String>> {
    let plan = config.plan.as_ref().ok_or_else(|| {
        ApprovalRoutingError::Configuration("plan is required for the newManager scheme".to_string())
    })?;
    Ok(plan.new_manager().map(str::to_string))
}

fn unresolved_target(record: Option<&ChangeRecord>, config: &SchemeConfig) -> String {
    match record {
        Some(record) => record.summary(),
        None => format!("identity '{}'", config.identity_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryDirectory;
    use crate::types::{AccountRequest, AttributeRequest, Operation, ProvisioningPlan, INTERNAL_APPLICATION};

    fn composer(directory: &Arc<InMemoryDirectory>) -> SchemeComposer {
        SchemeComposer::new(directory.clone(), OwnerResolver::new(directory.clone()))
    }

    fn manager_plan(manager: &str) -> ProvisioningPlan {
        ProvisioningPlan {
            identity: Some("emma".to_string()),
            account_requests: vec![AccountRequest {
                application: INTERNAL_APPLICATION.to_string(),
                native_identity: Some("emma".to_string()),
                operation: Operation::Set,
                attribute_requests: vec![AttributeRequest {
                    name: "manager".to_string(),
                    operation: Operation::Set,
                    value: Some(manager.to_string()),
                }],
            }],
        }
    }

    #[tokio::test]
    async fn test_none_short_circuits() {
        let directory = Arc::new(InMemoryDirectory::new());
        let config = SchemeConfig::new("emma", "manager,none");

        let result = composer(&directory)
            .compose_approvers(&[Scheme::Manager, Scheme::None], None, &config)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_manager_transfer_produces_both_managers() {
        let directory = Arc::new(InMemoryDirectory::new());
        directory.set_manager("emma", "carol").await;
        let mut config = SchemeConfig::new("emma", "manager,newManager");
        config.plan = Some(manager_plan("dave"));

        let approvers = composer(&directory)
            .compose_approvers(&[Scheme::Manager, Scheme::NewManager], None, &config)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(approvers, vec!["carol", "dave"]);
    }

    #[tokio::test]
    async fn test_manager_transfer_without_plan_change() {
        let directory = Arc::new(InMemoryDirectory::new());
        directory.set_manager("emma", "carol").await;
        let mut config = SchemeConfig::new("emma", "manager,newManager");
        config.plan = Some(ProvisioningPlan::default());

        let approvers = composer(&directory)
            .compose_approvers(&[Scheme::Manager, Scheme::NewManager], None, &config)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(approvers, vec!["carol"]);
    }

    #[tokio::test]
    async fn test_manager_transfer_without_current_manager() {
        let directory = Arc::new(InMemoryDirectory::new());
        let mut config = SchemeConfig::new("emma", "manager,newManager");
        config.plan = Some(manager_plan("dave"));

        let composed = composer(&directory)
            .compose_by_scheme(&[Scheme::Manager, Scheme::NewManager], None, &config)
            .await
            .unwrap()
            .unwrap();
        assert!(composed[0].approvers.is_empty());
        assert_eq!(composed[1].approvers, vec!["dave"]);
    }

    #[tokio::test]
    async fn test_new_manager_without_plan_is_configuration_error() {
        let directory = Arc::new(InMemoryDirectory::new());
        let config = SchemeConfig::new("emma", "newManager");

        let result = composer(&directory)
            .compose_approvers(&[Scheme::NewManager], None, &config)
            .await;
        assert!(matches!(result, Err(ApprovalRoutingError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_owner_falls_back_per_record() {
        let directory = Arc::new(InMemoryDirectory::new());
        let config = SchemeConfig::new("emma", "owner");
        let record = ChangeRecord::entitlement("Payroll", "groups", "Clerks");

        let approvers = composer(&directory)
            .compose_approvers(&[Scheme::Owner], Some(&record), &config)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(approvers, vec!["spadmin"]);
    }

    #[tokio::test]
    async fn test_owner_without_fallback_is_unresolved() {
        let directory = Arc::new(InMemoryDirectory::new());
        let mut config = SchemeConfig::new("emma", "owner");
        config.fallback_approver = String::new();
        let record = ChangeRecord::entitlement("Payroll", "groups", "Clerks");

        let result = composer(&directory)
            .compose_approvers(&[Scheme::Owner], Some(&record), &config)
            .await;
        assert!(matches!(result, Err(ApprovalRoutingError::UnresolvedApprover(_))));
    }

    #[tokio::test]
    async fn test_security_officer() {
        let directory = Arc::new(InMemoryDirectory::new());
        let mut config = SchemeConfig::new("emma", "securityOfficer");
        let record = ChangeRecord::entitlement("AD", "groups", "Finance");
        let composer = composer(&directory);

        // Tolerated per record, falls through to the fallback approver.
        let per_record = composer
            .compose_approvers(&[Scheme::SecurityOfficer], Some(&record), &config)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(per_record, vec!["spadmin"]);

        // Required for the whole set.
        let whole_set = composer
            .compose_approvers(&[Scheme::SecurityOfficer], None, &config)
            .await;
        assert!(matches!(whole_set, Err(ApprovalRoutingError::Configuration(_))));

        config.security_officer_name = Some("sam".to_string());
        let whole_set = composer
            .compose_approvers(&[Scheme::SecurityOfficer], None, &config)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(whole_set, vec!["sam"]);
    }

    #[tokio::test]
    async fn test_identity_list_is_used_verbatim() {
        let directory = Arc::new(InMemoryDirectory::new());
        let mut config = SchemeConfig::new("emma", "identity");
        config.approving_identities = vec![
            "Finance Approvers".to_string(),
            String::new(),
            "Smith, John".to_string(),
        ];

        let approvers = composer(&directory)
            .compose_approvers(&[Scheme::Identity], None, &config)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(approvers, vec!["Finance Approvers", "Smith, John"]);
    }

    #[tokio::test]
    async fn test_tokens_are_concatenated_in_order() {
        let directory = Arc::new(InMemoryDirectory::new());
        directory.set_manager("emma", "carol").await;
        let mut config = SchemeConfig::new("emma", "securityOfficer,manager");
        config.security_officer_name = Some("sam".to_string());

        let approvers = composer(&directory)
            .compose_approvers(&[Scheme::SecurityOfficer, Scheme::Manager], None, &config)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(approvers, vec!["sam", "carol"]);
    }

    #[tokio::test]
    async fn test_empty_whole_set_uses_fallback_or_fails() {
        let directory = Arc::new(InMemoryDirectory::new());
        let mut config = SchemeConfig::new("emma", "manager");
        let composer = composer(&directory);

        let composed = composer
            .compose_by_scheme(&[Scheme::Manager], None, &config)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(composed[0].approvers, vec!["spadmin"]);

        config.fallback_approver = String::new();
        let result = composer
            .compose_by_scheme(&[Scheme::Manager], None, &config)
            .await;
        assert!(matches!(result, Err(ApprovalRoutingError::UnresolvedApprover(_))));
    }
}

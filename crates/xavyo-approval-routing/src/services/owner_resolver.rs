//! Owner resolution for individual change records.
//!
//! Roles are owned by their role owner. Everything else is owned by the
//! owner of the managed attribute value when it has one, and by the
//! application owner otherwise.

use std::sync::Arc;

use tracing::debug;

use crate::directory::{IdentityDirectory, ObjectType, OWNER_PROPERTY};
use crate::error::{ApprovalRoutingError, Result};
use crate::types::{ChangeRecord, TargetType, INTERNAL_APPLICATION};

/// Resolves the owners of the object a change record targets.
#[derive(Clone)]
pub struct OwnerResolver {
    directory: Arc<dyn IdentityDirectory>,
}

impl OwnerResolver {
    /// Create a new owner resolver.
    pub fn new(directory: Arc<dyn IdentityDirectory>) -> Self {
        Self { directory }
    }

    /// Owners of the record's target, empty when none is configured.
    ///
    /// # Errors
    ///
    /// Returns `ApprovalRoutingError::Resolution` if a role record does not
    /// carry exactly one role, or an entitlement record names no application.
    /// Directory failures are propagated.
    pub async fn resolve_owners(&self, record: &ChangeRecord) -> Result<Vec<String>> {
        if record.is_role_request() {
            return self.resolve_role_owner(record).await;
        }

        let application = match record.application.as_deref() {
            Some(app) => app,
            None if record.target_type == TargetType::Entitlement => {
                return Err(ApprovalRoutingError::Resolution(format!(
                    "entitlement request '{}' has no application",
                    record.name
                )));
            }
            None => INTERNAL_APPLICATION,
        };

        // An explicit owner on the entitlement wins over the application owner.
        for value in &record.values {
            let owner = self
                .directory
                .resolve_managed_attribute_owner(application, &record.name, value)
                .await?;
            if let Some(owner) = non_empty(owner) {
                debug!(
                    target: "approval_routing",
                    application = %application,
                    attribute = %record.name,
                    value = %value,
                    owner = %owner,
                    "Resolved managed attribute owner"
                );
                return Ok(vec![owner]);
            }
        }

        let owner = self
            .directory
            .find_owner_by_name(ObjectType::Application, application, OWNER_PROPERTY)
            .await?;
        Ok(non_empty(owner).into_iter().collect())
    }

    async fn resolve_role_owner(&self, record: &ChangeRecord) -> Result<Vec<String>> {
        let role = match record.values.as_slice() {
            [role] => role,
            [] => {
                return Err(ApprovalRoutingError::Resolution(format!(
                    "role request '{}' carries no role",
                    record.name
                )));
            }
            values => {
                return Err(ApprovalRoutingError::Resolution(format!(
                    "role request '{}' carries {} roles, expected exactly one",
                    record.name,
                    values.len()
                )));
            }
        };

        let owner = self
            .directory
            .find_owner_by_name(ObjectType::Role, role, OWNER_PROPERTY)
            .await?;
        Ok(non_empty(owner).into_iter().collect())
    }
}

fn non_empty(name: Option<String>) -> Option<String> {
    name.filter(|n| !n.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryDirectory;

    fn resolver(directory: &Arc<InMemoryDirectory>) -> OwnerResolver {
        OwnerResolver::new(directory.clone())
    }

    #[tokio::test]
    async fn test_role_owner() {
        let directory = Arc::new(InMemoryDirectory::new());
        directory.set_role_owner("Auditor", "olivia").await;

        let owners = resolver(&directory)
            .resolve_owners(&ChangeRecord::role("Auditor"))
            .await
            .unwrap();
        assert_eq!(owners, vec!["olivia"]);
    }

    #[tokio::test]
    async fn test_role_with_multiple_values_is_rejected() {
        let directory = Arc::new(InMemoryDirectory::new());
        let mut record = ChangeRecord::role("Auditor");
        record.values.push("Clerk".to_string());

        let result = resolver(&directory).resolve_owners(&record).await;
        assert!(matches!(result, Err(ApprovalRoutingError::Resolution(_))));
    }

    #[tokio::test]
    async fn test_role_without_value_is_rejected() {
        let directory = Arc::new(InMemoryDirectory::new());
        let mut record = ChangeRecord::role("Auditor");
        record.values.clear();

        let result = resolver(&directory).resolve_owners(&record).await;
        assert!(matches!(result, Err(ApprovalRoutingError::Resolution(_))));
    }

    #[tokio::test]
    async fn test_application_owner() {
        let directory = Arc::new(InMemoryDirectory::new());
        directory.set_application_owner("AD", "bob").await;

        let owners = resolver(&directory)
            .resolve_owners(&ChangeRecord::entitlement("AD", "groups", "Finance"))
            .await
            .unwrap();
        assert_eq!(owners, vec!["bob"]);
    }

    #[tokio::test]
    async fn test_managed_attribute_owner_takes_precedence() {
        let directory = Arc::new(InMemoryDirectory::new());
        directory.set_application_owner("AD", "bob").await;
        directory
            .set_managed_attribute_owner("AD", "groups", "Finance", "fran")
            .await;

        let resolver = resolver(&directory);
        let finance = resolver
            .resolve_owners(&ChangeRecord::entitlement("AD", "groups", "Finance"))
            .await
            .unwrap();
        assert_eq!(finance, vec!["fran"]);

        let sales = resolver
            .resolve_owners(&ChangeRecord::entitlement("AD", "groups", "Sales"))
            .await
            .unwrap();
        assert_eq!(sales, vec!["bob"]);
    }

    #[tokio::test]
    async fn test_unknown_application_resolves_to_nobody() {
        let directory = Arc::new(InMemoryDirectory::new());

        let owners = resolver(&directory)
            .resolve_owners(&ChangeRecord::attribute("Payroll", "costCenter", "42"))
            .await
            .unwrap();
        assert!(owners.is_empty());
    }

    #[tokio::test]
    async fn test_blank_owner_is_ignored() {
        let directory = Arc::new(InMemoryDirectory::new());
        directory.set_application_owner("AD", "  ").await;

        let owners = resolver(&directory)
            .resolve_owners(&ChangeRecord::entitlement("AD", "groups", "Finance"))
            .await
            .unwrap();
        assert!(owners.is_empty());
    }

    #[tokio::test]
    async fn test_entitlement_without_application_is_rejected() {
        let directory = Arc::new(InMemoryDirectory::new());
        let record = ChangeRecord::new(
            TargetType::Entitlement,
            None,
            "groups",
            vec!["Finance".to_string()],
        );

        let result = resolver(&directory).resolve_owners(&record).await;
        assert!(matches!(result, Err(ApprovalRoutingError::Resolution(_))));
    }

    #[tokio::test]
    async fn test_internal_attribute_uses_internal_application_owner() {
        let directory = Arc::new(InMemoryDirectory::new());
        directory
            .set_application_owner(INTERNAL_APPLICATION, "spadmin")
            .await;
        let record = ChangeRecord::new(
            TargetType::Attribute,
            None,
            "department",
            vec!["Finance".to_string()],
        );

        let owners = resolver(&directory).resolve_owners(&record).await.unwrap();
        assert_eq!(owners, vec!["spadmin"]);
    }
}

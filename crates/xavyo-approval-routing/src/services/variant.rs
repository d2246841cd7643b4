//! Generator variants.
//!
//! The generation pipeline is shared. What differs between approving
//! changes to an identity and approving an edit to a governed object is
//! captured by [`ApprovalVariant`].

use async_trait::async_trait;

use crate::config::SchemeConfig;
use crate::directory::{IdentityDirectory, ObjectType, OWNER_PROPERTY};
use crate::error::Result;
use crate::names::{join_names, join_quoted_names};
use crate::types::{ApprovalUnit, ChangeSet, Scheme};

/// Behaviour that differs between kinds of approval requests.
#[async_trait]
pub trait ApprovalVariant: Send + Sync {
    /// Variant name for logs.
    fn name(&self) -> &str;

    /// Whether `approvalSet` must be present.
    fn is_approval_set_required(&self) -> bool {
        true
    }

    /// Owners for the `owner` scheme when they do not depend on the record.
    ///
    /// `None` means owners are resolved per record.
    async fn resolve_owners_for_whole_set(
        &self,
        _directory: &dyn IdentityDirectory,
        _config: &SchemeConfig,
    ) -> Result<Option<Vec<String>>> {
        Ok(None)
    }

    /// Unit for one approver or a composite of approvers.
    ///
    /// # Errors
    ///
    /// Returns `ApprovalRoutingError::Configuration` if the approver names
    /// cannot be written as CSV.
    fn build_approval_unit(
        &self,
        approvers: &[String],
        change_set: ChangeSet,
    ) -> Result<ApprovalUnit> {
        Ok(ApprovalUnit::single(join_names(approvers)?, change_set))
    }

    /// Default description of a unit produced by `scheme`.
    fn describe(&self, scheme: Scheme, config: &SchemeConfig) -> String {
        format!(
            "{} approval for changes to {}",
            scheme.label(),
            config.display_name()
        )
    }
}

/// Approval of changes to an identity's access.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityRequestVariant;

#[async_trait]
impl ApprovalVariant for IdentityRequestVariant {
    fn name(&self) -> &str {
        "identity_request"
    }
}

/// Approval of an edit to a governed object such as a role or application.
///
/// The change set may be absent. The `owner` scheme routes to the object's
/// owner regardless of the individual records, and approver names are
/// always quoted.
#[derive(Debug, Clone)]
pub struct GovernedObjectVariant {
    object_type: ObjectType,
    object_name: String,
}

impl GovernedObjectVariant {
    /// Create a variant for the named object.
    pub fn new(object_type: ObjectType, object_name: impl Into<String>) -> Self {
        Self {
            object_type,
            object_name: object_name.into(),
        }
    }

    /// The governed object name.
    #[must_use]
    pub fn object_name(&self) -> &str {
        &self.object_name
    }
}

#[async_trait]
impl ApprovalVariant for GovernedObjectVariant {
    fn name(&self) -> &str {
        "governed_object"
    }

    fn is_approval_set_required(&self) -> bool {
        false
    }

    async fn resolve_owners_for_whole_set(
        &self,
        directory: &dyn IdentityDirectory,
        config: &SchemeConfig,
    ) -> Result<Option<Vec<String>>> {
        let owner = directory
            .find_owner_by_name(self.object_type, &self.object_name, OWNER_PROPERTY)
            .await?
            .filter(|o| !o.trim().is_empty());

        let owners = match (owner, config.fallback()) {
            (Some(owner), _) => vec![owner],
            (None, Some(fallback)) => vec![fallback.to_string()],
            (None, None) => Vec::new(),
        };
        Ok(Some(owners))
    }

    fn build_approval_unit(
        &self,
        approvers: &[String],
        change_set: ChangeSet,
    ) -> Result<ApprovalUnit> {
        Ok(ApprovalUnit::single(
            join_quoted_names(approvers)?,
            change_set,
        ))
    }

    fn describe(&self, scheme: Scheme, _config: &SchemeConfig) -> String {
        format!(
            "{} approval for changes to {} '{}'",
            scheme.label(),
            match self.object_type {
                ObjectType::Identity => "identity",
                ObjectType::Role => "role",
                ObjectType::Application => "application",
            },
            self.object_name
        )
    }
}

//! Launcher auto-approval.
//!
//! A record is finished without a work item when the launcher is its
//! approver, either directly or as a member of the approver workgroup.
//! Electronic signatures and `disableLauncherAutoApproval` turn this off for
//! the scheme being processed.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};

use crate::audit::{ApprovalAuditAction, AuditEventInput, AuditLog};
use crate::config::SchemePass;
use crate::directory::IdentityDirectory;
use crate::error::Result;
use crate::types::{ChangeRecord, RecordState};

/// Decides and applies launcher auto-approval.
#[derive(Clone)]
pub struct AutoApprovalEngine {
    directory: Arc<dyn IdentityDirectory>,
    audit: Arc<dyn AuditLog>,
}

impl AutoApprovalEngine {
    /// Create a new engine.
    pub fn new(directory: Arc<dyn IdentityDirectory>, audit: Arc<dyn AuditLog>) -> Self {
        Self { directory, audit }
    }

    /// Whether work for `approver` under this pass is done by the launcher.
    ///
    /// # Errors
    ///
    /// Propagates directory failures from the workgroup lookup.
    pub async fn is_auto_approve(&self, approver: &str, pass: &SchemePass<'_>) -> Result<bool> {
        if !pass.auto_approval_allowed {
            return Ok(false);
        }
        let Some(launcher) = pass.config.launcher() else {
            return Ok(false);
        };
        if approver == launcher {
            return Ok(true);
        }
        if !self.directory.is_workgroup(approver).await? {
            return Ok(false);
        }
        let members = self.directory.workgroup_members(approver).await?;
        Ok(members.iter().any(|m| m == launcher))
    }

    /// Finish `record` on behalf of the launcher.
    ///
    /// Rejected records are left alone unless `override_rejection` is set.
    /// Returns whether the record was changed.
    pub async fn apply_auto_approval(
        &self,
        record: &mut ChangeRecord,
        approver: &str,
        pass: &SchemePass<'_>,
        override_rejection: bool,
    ) -> bool {
        let Some(launcher) = pass.config.launcher() else {
            return false;
        };

        let action = if record.is_rejected() {
            if !override_rejection {
                debug!(
                    target: "approval_routing",
                    record_id = %record.id,
                    approver = %approver,
                    "Skipping auto-approval of rejected record"
                );
                return false;
            }
            record.rejecter = None;
            ApprovalAuditAction::RejectionOverridden
        } else {
            ApprovalAuditAction::AutoApproved
        };

        record.state = RecordState::Finished;
        record.approver = Some(launcher.to_string());

        debug!(
            target: "approval_routing",
            record_id = %record.id,
            approver = %approver,
            launcher = %launcher,
            scheme = %pass.scheme,
            action = %action,
            "Record auto-approved"
        );

        let input = AuditEventInput {
            source: launcher.to_string(),
            action,
            target: pass.config.identity_name.clone(),
            owner_from: Some(approver.to_string()),
            owner_to: Some(launcher.to_string()),
            metadata: Some(json!({
                "record": record.summary(),
                "recordId": record.id,
                "scheme": pass.scheme,
            })),
        };
        if let Err(e) = self.audit.log_event(input).await {
            warn!(
                target: "approval_routing",
                record_id = %record.id,
                error = %e,
                "Failed to record auto-approval audit event"
            );
        }

        true
    }
}

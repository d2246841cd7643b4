//! Audit logging for approval routing decisions.
//!
//! Auto-approvals are recorded through the [`AuditLog`] collaborator.
//! Logging is best effort: the auto-approval engine logs a failed write at
//! `warn` and carries on with the generation pass.
//!
//! # Example
//!
//! ```rust,ignore
//! use xavyo_approval_routing::audit::{ApprovalAuditAction, AuditEventInput, AuditLog, InMemoryAuditLog};
//!
//! let log = InMemoryAuditLog::new();
//! let input = AuditEventInput {
//!     source: "alice".to_string(),
//!     action: ApprovalAuditAction::AutoApproved,
//!     target: "emma".to_string(),
//!     owner_to: Some("alice".to_string()),
//!     ..Default::default()
//! };
//! let event = log.log_event(input).await?;
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::Result;

/// Action recorded by the routing core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalAuditAction {
    /// A record was finished because the launcher is its approver.
    #[default]
    AutoApproved,
    /// A rejected record was finished by the manager transfer policy.
    RejectionOverridden,
}

impl std::fmt::Display for ApprovalAuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AutoApproved => write!(f, "auto_approved"),
            Self::RejectionOverridden => write!(f, "rejection_overridden"),
        }
    }
}

/// A recorded audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique identifier for the event.
    pub id: Uuid,
    /// Identity that caused the event, normally the launcher.
    pub source: String,
    /// Action performed.
    pub action: ApprovalAuditAction,
    /// Subject identity of the change set.
    pub target: String,
    /// Owner before the action.
    pub owner_from: Option<String>,
    /// Owner after the action.
    pub owner_to: Option<String>,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Additional metadata.
    pub metadata: Option<serde_json::Value>,
}

/// Input for recording an audit event.
#[derive(Debug, Clone, Default)]
pub struct AuditEventInput {
    /// Identity that caused the event.
    pub source: String,
    /// Action performed.
    pub action: ApprovalAuditAction,
    /// Subject identity of the change set.
    pub target: String,
    /// Owner before the action.
    pub owner_from: Option<String>,
    /// Owner after the action.
    pub owner_to: Option<String>,
    /// Additional metadata.
    pub metadata: Option<serde_json::Value>,
}

/// Filter for querying audit events.
#[derive(Debug, Clone, Default)]
pub struct AuditEventFilter {
    /// Filter by source.
    pub source: Option<String>,
    /// Filter by target.
    pub target: Option<String>,
    /// Filter by action type.
    pub action: Option<ApprovalAuditAction>,
    /// Maximum number of results.
    pub limit: Option<usize>,
}

/// Trait for audit log backends.
#[async_trait::async_trait]
pub trait AuditLog: Send + Sync {
    /// Record an audit event.
    async fn log_event(&self, input: AuditEventInput) -> Result<AuditEvent>;

    /// Query audit events, oldest first.
    async fn query_events(&self, filter: AuditEventFilter) -> Result<Vec<AuditEvent>>;
}

/// In-memory audit log for testing.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    events: Arc<RwLock<Vec<AuditEvent>>>,
}

impl InMemoryAuditLog {
    /// Create a new in-memory audit log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Get the count of events in the log.
    pub async fn count(&self) -> usize {
        self.events.read().await.len()
    }

    /// Clear all events (for testing).
    pub async fn clear(&self) {
        self.events.write().await.clear();
    }

    /// Get all events (for testing).
    #[must_use]
    pub fn get_all(&self) -> Vec<AuditEvent> {
        self.events
            .try_read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn log_event(&self, input: AuditEventInput) -> Result<AuditEvent> {
        let event = AuditEvent {
            id: Uuid::new_v4(),
            source: input.source,
            action: input.action,
            target: input.target,
            owner_from: input.owner_from,
            owner_to: input.owner_to,
            timestamp: Utc::now(),
            metadata: input.metadata,
        };

        self.events.write().await.push(event.clone());
        Ok(event)
    }

    async fn query_events(&self, filter: AuditEventFilter) -> Result<Vec<AuditEvent>> {
        let events = self.events.read().await;
        Ok(events
            .iter()
            .filter(|e| filter.source.as_ref().is_none_or(|s| &e.source == s))
            .filter(|e| filter.target.as_ref().is_none_or(|t| &e.target == t))
            .filter(|e| filter.action.is_none_or(|a| e.action == a))
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}

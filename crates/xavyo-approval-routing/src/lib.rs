//! Approver resolution and approval routing for identity change requests.
//!
//! Given the proposed changes for one identity and a configured approval
//! scheme, this crate works out who must approve each change, merges
//! changes that go to the same approver, finishes changes the requester is
//! allowed to decide alone, and assembles the routing structure consumed by
//! an external workflow engine.
//!
//! # Features
//!
//! - Owner resolution for roles, entitlements and application attributes
//! - Scheme composition (`manager`, `newManager`, `owner`, `securityOfficer`,
//!   `identity`, `none`) including manager transfers
//! - Insertion-ordered merging of records per approver
//! - Launcher auto-approval with workgroup membership and e-signature policy
//! - Flat or parallel poll routing structures with per-scheme metadata
//! - Replacement of the generated approvals by a named assignment rule
//!
//! # Services
//!
//! The [`services`] module provides:
//! - [`services::OwnerResolver`] - Owners of the object a record targets
//! - [`services::SchemeComposer`] - Approvers for a list of scheme tokens
//! - [`services::OwnerMapBuilder`] - Per-approver buckets of record copies
//! - [`services::AutoApprovalEngine`] - Launcher auto-approval
//! - [`services::ApprovalTreeBuilder`] - Routing structure and finalize sweep
//! - [`services::ApprovalGenerator`] - One complete generation pass
//!
//! # Collaborators
//!
//! - [`directory::IdentityDirectory`] for owner, manager and workgroup lookups
//! - [`audit::AuditLog`] for auto-approval audit events
//! - [`rules::RuleRunner`] for `approvalAssignmentRule`
//!
//! Each has an in-memory implementation for tests.

pub mod audit;
pub mod config;
pub mod directory;
pub mod error;
pub mod names;
pub mod rules;
pub mod services;
pub mod types;

// Re-export commonly used types
pub use config::{SchemeConfig, SchemePass};
pub use error::{ApprovalRoutingError, Result};
pub use types::{
    AccountRequest, ApprovalMode, ApprovalUnit, AttributeRequest, ChangeRecord, ChangeSet,
    Operation, ProvisioningPlan, RecordId, RecordState, Scheme, TargetType,
};

// Re-export service types
pub use services::{
    ApprovalGenerator, ApprovalTreeBuilder, ApprovalVariant, AutoApprovalEngine,
    GovernedObjectVariant, IdentityRequestVariant, OwnerMap, OwnerMapBuilder, OwnerResolver,
    SchemeApprovers, SchemeComposer,
};

// Re-export collaborator types
pub use audit::{ApprovalAuditAction, AuditEvent, AuditLog, InMemoryAuditLog};
pub use directory::{IdentityDirectory, InMemoryDirectory, ObjectType};
pub use rules::{AssignmentRule, RuleContext, RuleError, RuleRegistry, RuleRunner};

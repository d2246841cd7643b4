//! Integration tests for the auto-approval audit trail.

mod common;

use xavyo_approval_routing::audit::{AuditEventFilter, AuditLog};
use xavyo_approval_routing::{ApprovalAuditAction, ChangeRecord, RecordState};

use common::fixtures::{launched_by, manager_transfer_plan, SUBJECT};
use common::TestContext;

// ============================================================================
// AA-001: Auto-Approval Event Recorded
// ============================================================================

/// When the launcher owns a requested entitlement
/// Then an audit event records the launcher standing in for the owner.
#[tokio::test]
async fn test_aa_001_auto_approval_event_recorded() {
    let ctx = TestContext::seeded().await;
    let record = ChangeRecord::entitlement("LDAP", "groups", "Ops");
    let id = record.id;
    let mut config = launched_by(vec![record], "owner", "alice");

    ctx.generator.generate(&mut config).await.unwrap();

    let events = ctx
        .stores
        .audit
        .query_events(AuditEventFilter {
            target: Some(SUBJECT.to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.action, ApprovalAuditAction::AutoApproved);
    assert_eq!(event.source, "alice");
    assert_eq!(event.owner_from.as_deref(), Some("alice"));
    assert_eq!(event.owner_to.as_deref(), Some("alice"));

    let metadata = event.metadata.as_ref().expect("metadata");
    assert_eq!(metadata["scheme"], "owner");
    assert_eq!(metadata["recordId"], id.to_string());
    assert_eq!(metadata["record"], "add LDAP:groups=Ops");
}

// ============================================================================
// AA-002: Workgroup Owner Recorded
// ============================================================================

/// When the launcher is a member of the owning workgroup
/// Then the event names the workgroup as the previous owner.
#[tokio::test]
async fn test_aa_002_workgroup_owner_recorded() {
    let ctx = TestContext::seeded().await;
    let mut config = launched_by(vec![ChangeRecord::role("Clerk")], "owner", "frank");

    ctx.generator.generate(&mut config).await.unwrap();

    let events = ctx.stores.audit.get_all();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].source, "frank");
    assert_eq!(events[0].owner_from.as_deref(), Some("Finance Approvers"));
}

// ============================================================================
// AA-003: One Event Per Auto-Approved Record
// ============================================================================

/// When the sole manager launches a request with several records
/// Then each record gets its own event and already finished records none.
#[tokio::test]
async fn test_aa_003_one_event_per_record() {
    let ctx = TestContext::seeded().await;
    let mut config = launched_by(
        vec![
            ChangeRecord::role("Auditor"),
            ChangeRecord::entitlement("AD", "groups", "Finance"),
            ChangeRecord::entitlement("AD", "groups", "Sales").with_state(RecordState::Finished),
        ],
        "manager",
        "carol",
    );

    ctx.generator.generate(&mut config).await.unwrap();

    let events = ctx
        .stores
        .audit
        .query_events(AuditEventFilter {
            action: Some(ApprovalAuditAction::AutoApproved),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.metadata.as_ref().unwrap()["scheme"] == "manager"));
}

// ============================================================================
// AA-004: Rejection Override Recorded
// ============================================================================

/// When a manager transfer force-finishes a rejected record
/// Then the event is recorded as a rejection override.
#[tokio::test]
async fn test_aa_004_rejection_override_recorded() {
    let ctx = TestContext::new();
    let mut config = launched_by(
        vec![ChangeRecord::role("Auditor").with_state(RecordState::Rejected)],
        "manager,newManager",
        "dave",
    );
    config.plan = Some(manager_transfer_plan("dave"));

    ctx.generator.generate(&mut config).await.unwrap();

    let events = ctx
        .stores
        .audit
        .query_events(AuditEventFilter {
            action: Some(ApprovalAuditAction::RejectionOverridden),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].source, "dave");
    assert_eq!(events[0].metadata.as_ref().unwrap()["scheme"], "newManager");
}

// ============================================================================
// AA-005: No Event Without Auto-Approval
// ============================================================================

#[tokio::test]
async fn test_aa_005_no_event_without_auto_approval() {
    let ctx = TestContext::seeded().await;
    let mut config = launched_by(
        vec![ChangeRecord::entitlement("AD", "groups", "Finance")],
        "owner,manager",
        "alice",
    );

    ctx.generator.generate(&mut config).await.unwrap();

    assert_eq!(ctx.stores.audit.count().await, 0);
}

//! Test fixtures for integration tests.
//!
//! The seeded directory:
//!
//! | Object             | Owner / manager |
//! |--------------------|-----------------|
//! | application `AD`   | bob             |
//! | application `LDAP` | alice           |
//! | role `Auditor`     | olivia          |
//! | role `Clerk`       | Finance Approvers (workgroup: alice, frank) |
//! | identity `emma`    | manager carol   |

use xavyo_approval_routing::directory::InMemoryDirectory;
use xavyo_approval_routing::types::{
    AccountRequest, AttributeRequest, ChangeRecord, ChangeSet, Operation, ProvisioningPlan,
    RecordId, INTERNAL_APPLICATION, MANAGER_ATTRIBUTE,
};
use xavyo_approval_routing::SchemeConfig;

/// Subject identity used throughout the tests.
pub const SUBJECT: &str = "emma";

/// Load the standard owners, managers and workgroups.
pub async fn seed_directory(directory: &InMemoryDirectory) {
    directory.set_application_owner("AD", "bob").await;
    directory.set_application_owner("LDAP", "alice").await;
    directory.set_role_owner("Auditor", "olivia").await;
    directory.set_role_owner("Clerk", "Finance Approvers").await;
    directory
        .add_workgroup("Finance Approvers", &["alice", "frank"])
        .await;
    directory.set_manager(SUBJECT, "carol").await;
}

/// Configuration for the subject with the given records and scheme list.
pub fn config_with(records: Vec<ChangeRecord>, scheme: &str) -> SchemeConfig {
    let mut config = SchemeConfig::new(SUBJECT, scheme);
    config.approval_set = Some(ChangeSet::from(records));
    config
}

/// Same as [`config_with`] with a launcher.
pub fn launched_by(records: Vec<ChangeRecord>, scheme: &str, launcher: &str) -> SchemeConfig {
    let mut config = config_with(records, scheme);
    config.launcher = Some(launcher.to_string());
    config
}

/// A plan that moves the subject to a new manager.
pub fn manager_transfer_plan(new_manager: &str) -> ProvisioningPlan {
    ProvisioningPlan {
        identity: Some(SUBJECT.to_string()),
        account_requests: vec![AccountRequest {
            application: INTERNAL_APPLICATION.to_string(),
            native_identity: Some(SUBJECT.to_string()),
            operation: Operation::Set,
            attribute_requests: vec![AttributeRequest {
                name: MANAGER_ATTRIBUTE.to_string(),
                operation: Operation::Set,
                value: Some(new_manager.to_string()),
            }],
        }],
    }
}

/// The master record with this id, panics if missing.
pub fn master<'a>(config: &'a SchemeConfig, id: RecordId) -> &'a ChangeRecord {
    config
        .approval_set
        .as_ref()
        .and_then(|set| set.get(id))
        .unwrap_or_else(|| panic!("Record {id} not found in approval set"))
}

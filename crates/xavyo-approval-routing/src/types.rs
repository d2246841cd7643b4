//! Type definitions for the approval routing domain.
//!
//! Includes the change record model, the routing structure handed to the
//! workflow engine, approval scheme tokens and the provisioning plan view
//! needed to detect manager transfers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApprovalRoutingError;

/// Application name used for requests against the identity store itself.
pub const INTERNAL_APPLICATION: &str = "IIQ";

/// Internal attribute holding roles assigned to an identity.
pub const ASSIGNED_ROLES_ATTRIBUTE: &str = "assignedRoles";

/// Internal attribute holding roles detected on an identity.
pub const DETECTED_ROLES_ATTRIBUTE: &str = "detectedRoles";

/// Internal attribute holding the manager of an identity.
pub const MANAGER_ATTRIBUTE: &str = "manager";

// ============================================================================
// ID Types (Newtype Pattern)
// ============================================================================

/// Unique identifier for a change record.
///
/// Copies of a record placed into approval units keep the id of the master
/// record, which is how containment and reconciliation are decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub Uuid);

impl RecordId {
    /// Create a new random RecordId.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    #[must_use]
    pub fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RecordId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

// ============================================================================
// Enums
// ============================================================================

/// Kind of object a change record targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    /// A role assignment.
    Role,
    /// An entitlement (managed attribute value) on an application.
    Entitlement,
    /// A plain attribute value.
    Attribute,
    /// Anything else.
    #[default]
    Other,
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role => write!(f, "role"),
            Self::Entitlement => write!(f, "entitlement"),
            Self::Attribute => write!(f, "attribute"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Requested operation of a change record or plan request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Add the value(s).
    #[default]
    Add,
    /// Remove the value(s).
    Remove,
    /// Replace the current value(s).
    Set,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Remove => write!(f, "remove"),
            Self::Set => write!(f, "set"),
        }
    }
}

/// Lifecycle state of a change record.
///
/// `Pending -> {Finished, Rejected}`. Both terminal states are final for the
/// routing core, and `Rejected` is never overwritten by auto-approval or the
/// finalize sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    /// Waiting for a decision.
    #[default]
    Pending,
    /// Approved or otherwise completed.
    Finished,
    /// Rejected by an approver.
    Rejected,
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Finished => write!(f, "finished"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// Routing mode of an approval unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalMode {
    /// A single approver acts on the unit.
    #[default]
    Single,
    /// Every child unit is worked independently by its own approver.
    ParallelPoll,
}

/// An approval scheme token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Scheme {
    /// The subject's current manager.
    Manager,
    /// The manager assigned by the provisioning plan.
    NewManager,
    /// The owner of each targeted role, application or entitlement.
    Owner,
    /// The configured security officer.
    SecurityOfficer,
    /// An explicit list of identities or workgroups.
    Identity,
    /// No approval required.
    None,
}

impl Scheme {
    /// The token as written in `approvalScheme`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manager => "manager",
            Self::NewManager => "newManager",
            Self::Owner => "owner",
            Self::SecurityOfficer => "securityOfficer",
            Self::Identity => "identity",
            Self::None => "none",
        }
    }

    /// Schemes whose approvers are composed once for the whole change set.
    #[must_use]
    pub fn is_whole_set(&self) -> bool {
        matches!(
            self,
            Self::Manager | Self::NewManager | Self::SecurityOfficer | Self::Identity
        )
    }

    /// Human readable label used in unit descriptions.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Manager => "Manager",
            Self::NewManager => "New Manager",
            Self::Owner => "Owner",
            Self::SecurityOfficer => "Security Officer",
            Self::Identity => "Identity",
            Self::None => "No",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = ApprovalRoutingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manager" => Ok(Self::Manager),
            "newmanager" => Ok(Self::NewManager),
            "owner" => Ok(Self::Owner),
            "securityofficer" => Ok(Self::SecurityOfficer),
            "identity" => Ok(Self::Identity),
            "none" => Ok(Self::None),
            other => Err(ApprovalRoutingError::Configuration(format!(
                "unknown approval scheme '{other}'"
            ))),
        }
    }
}

// ============================================================================
// Change Records
// ============================================================================

/// One proposed modification for a single subject identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Stable identifier, shared by every copy of this record.
    #[serde(default)]
    pub id: RecordId,
    /// Kind of object targeted.
    #[serde(default)]
    pub target_type: TargetType,
    /// Target application; `None` means the identity store itself.
    #[serde(default)]
    pub application: Option<String>,
    /// Attribute or field name.
    pub name: String,
    /// Requested operation.
    #[serde(default)]
    pub operation: Operation,
    /// Requested value(s).
    #[serde(default)]
    pub values: Vec<String>,
    /// Resolved owner.
    #[serde(default)]
    pub owner: Option<String>,
    /// Lifecycle state.
    #[serde(default)]
    pub state: RecordState,
    /// Correlation id linking the record to a role or entitlement assignment.
    #[serde(default)]
    pub assignment_id: Option<String>,
    /// Identity that approved the record.
    #[serde(default)]
    pub approver: Option<String>,
    /// Identity that rejected the record.
    #[serde(default)]
    pub rejecter: Option<String>,
    /// Free-text comments.
    #[serde(default)]
    pub comments: Option<String>,
}

impl ChangeRecord {
    /// Create a pending record.
    pub fn new(
        target_type: TargetType,
        application: Option<String>,
        name: impl Into<String>,
        values: Vec<String>,
    ) -> Self {
        Self {
            id: RecordId::new(),
            target_type,
            application,
            name: name.into(),
            operation: Operation::Add,
            values,
            owner: None,
            state: RecordState::Pending,
            assignment_id: None,
            approver: None,
            rejecter: None,
            comments: None,
        }
    }

    /// A role assignment on the identity store.
    pub fn role(role: impl Into<String>) -> Self {
        Self::new(
            TargetType::Role,
            Some(INTERNAL_APPLICATION.to_string()),
            ASSIGNED_ROLES_ATTRIBUTE,
            vec![role.into()],
        )
    }

    /// An entitlement value on an application.
    pub fn entitlement(
        application: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::new(
            TargetType::Entitlement,
            Some(application.into()),
            attribute,
            vec![value.into()],
        )
    }

    /// A plain attribute value on an application.
    pub fn attribute(
        application: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::new(
            TargetType::Attribute,
            Some(application.into()),
            attribute,
            vec![value.into()],
        )
    }

    /// Set the requested operation.
    #[must_use]
    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = operation;
        self
    }

    /// Set the lifecycle state.
    #[must_use]
    pub fn with_state(mut self, state: RecordState) -> Self {
        self.state = state;
        self
    }

    /// Set the assignment correlation id.
    #[must_use]
    pub fn with_assignment_id(mut self, assignment_id: impl Into<String>) -> Self {
        self.assignment_id = Some(assignment_id.into());
        self
    }

    /// Whether the record targets the identity store itself.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        self.application
            .as_deref()
            .is_none_or(|app| app == INTERNAL_APPLICATION)
    }

    /// Whether the record is a role assignment.
    #[must_use]
    pub fn is_role_request(&self) -> bool {
        self.target_type == TargetType::Role
            || (self.is_internal()
                && (self.name == ASSIGNED_ROLES_ATTRIBUTE || self.name == DETECTED_ROLES_ATTRIBUTE))
    }

    /// Whether the record has been rejected.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        self.state == RecordState::Rejected
    }

    /// Whether the record has been finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == RecordState::Finished
    }

    /// Short description used in logs and audit events.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} {}:{}={}",
            self.operation,
            self.application.as_deref().unwrap_or(INTERNAL_APPLICATION),
            self.name,
            self.values.join("|")
        )
    }
}

/// The ordered collection of change records for one subject identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet {
    records: Vec<ChangeRecord>,
}

impl ChangeSet {
    /// Create an empty change set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record.
    pub fn push(&mut self, record: ChangeRecord) {
        self.records.push(record);
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate records in order.
    pub fn iter(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.records.iter()
    }

    /// Iterate records mutably in order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ChangeRecord> {
        self.records.iter_mut()
    }

    /// Record ids in order.
    #[must_use]
    pub fn ids(&self) -> Vec<RecordId> {
        self.records.iter().map(|r| r.id).collect()
    }

    /// Find a record by id.
    #[must_use]
    pub fn get(&self, id: RecordId) -> Option<&ChangeRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Find a record by id for mutation.
    pub fn get_mut(&mut self, id: RecordId) -> Option<&mut ChangeRecord> {
        self.records.iter_mut().find(|r| r.id == id)
    }

    /// Whether a record with this id is present.
    #[must_use]
    pub fn contains(&self, id: RecordId) -> bool {
        self.get(id).is_some()
    }

    /// Merge decisions made on a unit's copy back into this master set.
    ///
    /// Only records present in both sets are touched. A rejected master
    /// record stays rejected; decisions on pending copies are ignored.
    /// Returns the number of master records that changed.
    pub fn reconcile(&mut self, copy: &ChangeSet) -> usize {
        let mut changed = 0;
        for decided in copy.iter() {
            let Some(master) = self.get_mut(decided.id) else {
                continue;
            };
            if master.is_rejected() || decided.state == RecordState::Pending {
                continue;
            }
            if master.state != decided.state
                || master.approver != decided.approver
                || master.rejecter != decided.rejecter
            {
                master.state = decided.state;
                master.approver.clone_from(&decided.approver);
                master.rejecter.clone_from(&decided.rejecter);
                if decided.comments.is_some() {
                    master.comments.clone_from(&decided.comments);
                }
                changed += 1;
            }
        }
        changed
    }
}

impl From<Vec<ChangeRecord>> for ChangeSet {
    fn from(records: Vec<ChangeRecord>) -> Self {
        Self { records }
    }
}

impl FromIterator<ChangeRecord> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = ChangeRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ChangeSet {
    type Item = ChangeRecord;
    type IntoIter = std::vec::IntoIter<ChangeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

// ============================================================================
// Routing Structure
// ============================================================================

/// One routable node handed to the workflow engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApprovalUnit {
    /// Approver; a quoted composite when it names several identities.
    /// Parallel poll parents have no owner.
    pub owner: Option<String>,
    /// Scheme that produced the unit.
    pub scheme: Option<Scheme>,
    /// Routing mode.
    pub mode: ApprovalMode,
    /// Private copy of the records this unit decides on.
    pub change_set: ChangeSet,
    /// Child units, only for `ParallelPoll`.
    pub children: Vec<ApprovalUnit>,
    /// Whether the unit has been worked.
    pub complete: bool,
    /// Human readable description.
    pub description: Option<String>,
    /// Notification template name.
    pub email_template: Option<String>,
    /// Electronic signature meaning, when sign-off is required.
    pub electronic_signature: Option<String>,
}

impl ApprovalUnit {
    /// A single-approver unit.
    pub fn single(owner: impl Into<String>, change_set: ChangeSet) -> Self {
        Self {
            owner: Some(owner.into()),
            change_set,
            ..Default::default()
        }
    }

    /// A parallel poll parent over the given children.
    #[must_use]
    pub fn parallel_poll(children: Vec<ApprovalUnit>) -> Self {
        Self {
            mode: ApprovalMode::ParallelPoll,
            children,
            ..Default::default()
        }
    }

    /// Whether this unit or any descendant carries a copy of the record.
    #[must_use]
    pub fn contains_record(&self, id: RecordId) -> bool {
        self.change_set.contains(id) || self.children.iter().any(|c| c.contains_record(id))
    }

    /// Owners of this unit and its descendants, depth first.
    #[must_use]
    pub fn owners(&self) -> Vec<&str> {
        let mut owners: Vec<&str> = self.owner.as_deref().into_iter().collect();
        for child in &self.children {
            owners.extend(child.owners());
        }
        owners
    }
}

// ============================================================================
// Provisioning Plan
// ============================================================================

/// A change to one attribute inside an account request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeRequest {
    /// Attribute name.
    pub name: String,
    /// Requested operation.
    #[serde(default)]
    pub operation: Operation,
    /// Requested value.
    #[serde(default)]
    pub value: Option<String>,
}

/// Changes to one account of the subject identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRequest {
    /// Target application.
    pub application: String,
    /// Account identifier on the target application.
    #[serde(default)]
    pub native_identity: Option<String>,
    /// Account level operation.
    #[serde(default)]
    pub operation: Operation,
    /// Attribute changes.
    #[serde(default)]
    pub attribute_requests: Vec<AttributeRequest>,
}

impl AccountRequest {
    /// First attribute request for the named attribute.
    #[must_use]
    pub fn attribute_request(&self, name: &str) -> Option<&AttributeRequest> {
        self.attribute_requests.iter().find(|r| r.name == name)
    }
}

/// The provisioning plan behind a change set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvisioningPlan {
    /// Subject identity name.
    #[serde(default)]
    pub identity: Option<String>,
    /// Account requests.
    #[serde(default)]
    pub account_requests: Vec<AccountRequest>,
}

impl ProvisioningPlan {
    /// The account request targeting the identity store itself.
    #[must_use]
    pub fn internal_account_request(&self) -> Option<&AccountRequest> {
        self.account_requests
            .iter()
            .find(|r| r.application == INTERNAL_APPLICATION)
    }

    /// Manager assigned by this plan, if it changes the manager.
    #[must_use]
    pub fn new_manager(&self) -> Option<&str> {
        self.internal_account_request()
            .and_then(|r| r.attribute_request(MANAGER_ATTRIBUTE))
            .filter(|r| matches!(r.operation, Operation::Set | Operation::Add))
            .and_then(|r| r.value.as_deref())
            .filter(|v| !v.trim().is_empty())
    }
}

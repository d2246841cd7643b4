//! Generation pass configuration.
//!
//! [`SchemeConfig`] is deserialized from the caller's key/value
//! configuration object. Keys follow the workflow variable names
//! (`identityName`, `approvalScheme`, `fallbackApprover`, ...). Per-scheme
//! settings such as `ownerElectronicSignature` or `managerEmailTemplate` are
//! collected in [`SchemeConfig::scheme_args`].
//!
//! A generation pass never mutates its configuration. Instead, each scheme
//! token is processed against an immutable [`SchemePass`] snapshot that
//! carries the auto-approval decision for that scheme.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ApprovalRoutingError, Result};
use crate::names::split_csv;
use crate::types::{ChangeSet, ProvisioningPlan, Scheme};

/// Default approver when nothing else resolves.
pub const DEFAULT_FALLBACK_APPROVER: &str = "spadmin";

/// Default approval scheme.
pub const DEFAULT_APPROVAL_SCHEME: &str = "manager";

/// Suffix of the per-scheme electronic signature key.
pub const ELECTRONIC_SIGNATURE_SUFFIX: &str = "ElectronicSignature";

/// Suffix of the per-scheme notification template key.
pub const EMAIL_TEMPLATE_SUFFIX: &str = "EmailTemplate";

/// Suffix of the per-scheme description override key.
pub const DESCRIPTION_SUFFIX: &str = "Description";

/// Configuration of one approval generation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemeConfig {
    /// Master change set. Mutated in place by a successful pass.
    #[serde(default)]
    pub approval_set: Option<ChangeSet>,

    /// Subject identity name.
    #[serde(default)]
    pub identity_name: String,

    /// Subject display name, defaults to `identity_name`.
    #[serde(default)]
    pub identity_display_name: Option<String>,

    /// Identity that launched the request.
    #[serde(default)]
    pub launcher: Option<String>,

    /// Never auto-approve on behalf of the launcher.
    #[serde(default)]
    pub disable_launcher_auto_approval: bool,

    /// Approver used when nothing else resolves; empty disables the fallback.
    #[serde(default = "default_fallback_approver")]
    pub fallback_approver: String,

    /// CSV list of scheme tokens.
    #[serde(default = "default_approval_scheme")]
    pub approval_scheme: String,

    /// Provisioning plan, required for `newManager`.
    #[serde(default)]
    pub plan: Option<ProvisioningPlan>,

    /// Security officer for the `securityOfficer` scheme.
    #[serde(default)]
    pub security_officer_name: Option<String>,

    /// Approvers for the `identity` scheme.
    #[serde(default)]
    pub approving_identities: Vec<String>,

    /// Rule that may replace the generated approvals.
    #[serde(default)]
    pub approval_assignment_rule: Option<String>,

    /// When the schemes are exactly `manager,newManager` and a single
    /// approver auto-approves, finish records even if they were rejected.
    #[serde(default = "default_true")]
    pub manager_transfer_overrides_rejection: bool,

    /// Per-scheme settings keyed `{scheme}{Suffix}`.
    #[serde(flatten)]
    pub scheme_args: BTreeMap<String, serde_json::Value>,
}

fn default_fallback_approver() -> String {
    DEFAULT_FALLBACK_APPROVER.to_string()
}

fn default_approval_scheme() -> String {
    DEFAULT_APPROVAL_SCHEME.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for SchemeConfig {
    fn default() -> Self {
        Self {
            approval_set: None,
            identity_name: String::new(),
            identity_display_name: None,
            launcher: None,
            disable_launcher_auto_approval: false,
            fallback_approver: default_fallback_approver(),
            approval_scheme: default_approval_scheme(),
            plan: None,
            security_officer_name: None,
            approving_identities: Vec::new(),
            approval_assignment_rule: None,
            manager_transfer_overrides_rejection: true,
            scheme_args: BTreeMap::new(),
        }
    }
}

impl SchemeConfig {
    /// Create a configuration for a subject with the given scheme list.
    pub fn new(identity_name: impl Into<String>, approval_scheme: impl Into<String>) -> Self {
        Self {
            identity_name: identity_name.into(),
            approval_scheme: approval_scheme.into(),
            ..Default::default()
        }
    }

    /// Deserialize from the caller's configuration object.
    ///
    /// # Errors
    ///
    /// Returns `ApprovalRoutingError::Configuration` if the value does not
    /// describe a configuration.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Set a per-scheme argument such as `ownerElectronicSignature`.
    pub fn set_scheme_arg(&mut self, scheme: Scheme, suffix: &str, value: impl Into<String>) {
        self.scheme_args.insert(
            format!("{}{suffix}", scheme.as_str()),
            serde_json::Value::String(value.into()),
        );
    }

    /// Parsed scheme tokens, in configured order.
    ///
    /// # Errors
    ///
    /// Returns `ApprovalRoutingError::Configuration` for unknown tokens or
    /// an empty list.
    pub fn scheme_tokens(&self) -> Result<Vec<Scheme>> {
        let tokens = split_csv(&self.approval_scheme)?
            .iter()
            .map(|t| t.parse::<Scheme>())
            .collect::<Result<Vec<_>>>()?;
        if tokens.is_empty() {
            return Err(ApprovalRoutingError::Configuration(
                "approvalScheme is empty".to_string(),
            ));
        }
        Ok(tokens)
    }

    /// Check required inputs before anything is mutated.
    ///
    /// # Errors
    ///
    /// Returns `ApprovalRoutingError::Configuration` naming the missing input.
    pub fn validate(&self, tokens: &[Scheme], approval_set_required: bool) -> Result<()> {
        if self.identity_name.trim().is_empty() {
            return Err(ApprovalRoutingError::Configuration(
                "identityName is required".to_string(),
            ));
        }
        if tokens.contains(&Scheme::None) {
            return Ok(());
        }
        if approval_set_required && self.approval_set.is_none() {
            return Err(ApprovalRoutingError::Configuration(
                "approvalSet is required".to_string(),
            ));
        }
        if tokens.contains(&Scheme::NewManager) && self.plan.is_none() {
            return Err(ApprovalRoutingError::Configuration(
                "plan is required for the newManager scheme".to_string(),
            ));
        }
        if tokens.contains(&Scheme::SecurityOfficer) && self.security_officer().is_none() {
            return Err(ApprovalRoutingError::Configuration(
                "securityOfficerName is required for the securityOfficer scheme".to_string(),
            ));
        }
        Ok(())
    }

    /// Display name of the subject.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.identity_display_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.identity_name)
    }

    /// Launcher, if any.
    #[must_use]
    pub fn launcher(&self) -> Option<&str> {
        self.launcher.as_deref().filter(|l| !l.trim().is_empty())
    }

    /// Fallback approver, if one is configured.
    #[must_use]
    pub fn fallback(&self) -> Option<&str> {
        Some(self.fallback_approver.as_str()).filter(|f| !f.trim().is_empty())
    }

    /// Security officer, if one is configured.
    #[must_use]
    pub fn security_officer(&self) -> Option<&str> {
        self.security_officer_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
    }

    /// A per-scheme argument, as a non-empty string.
    #[must_use]
    pub fn scheme_arg(&self, scheme: Scheme, suffix: &str) -> Option<String> {
        let key = format!("{}{suffix}", scheme.as_str());
        match self.scheme_args.get(&key)? {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            serde_json::Value::Bool(true) => Some("true".to_string()),
            _ => None,
        }
    }

    /// A per-scheme argument where `newManager` inherits from `manager`.
    #[must_use]
    pub fn scheme_arg_with_fallback(&self, scheme: Scheme, suffix: &str) -> Option<String> {
        self.scheme_arg(scheme, suffix).or_else(|| {
            (scheme == Scheme::NewManager)
                .then(|| self.scheme_arg(Scheme::Manager, suffix))
                .flatten()
        })
    }

    /// Immutable snapshot for processing one scheme token.
    #[must_use]
    pub fn pass(&self, scheme: Scheme) -> SchemePass<'_> {
        let electronic_signature =
            self.scheme_arg_with_fallback(scheme, ELECTRONIC_SIGNATURE_SUFFIX);
        let auto_approval_allowed =
            !self.disable_launcher_auto_approval && electronic_signature.is_none();
        SchemePass {
            scheme,
            config: self,
            email_template: self.scheme_arg_with_fallback(scheme, EMAIL_TEMPLATE_SUFFIX),
            description: self.scheme_arg(scheme, DESCRIPTION_SUFFIX),
            electronic_signature,
            auto_approval_allowed,
        }
    }
}

/// Settings in force while one scheme token is processed.
#[derive(Debug, Clone)]
pub struct SchemePass<'a> {
    /// Scheme being processed.
    pub scheme: Scheme,
    /// Configuration of the whole pass.
    pub config: &'a SchemeConfig,
    /// Electronic signature meaning required for this scheme.
    pub electronic_signature: Option<String>,
    /// Notification template for this scheme.
    pub email_template: Option<String>,
    /// Description override for this scheme.
    pub description: Option<String>,
    /// Whether the launcher may be auto-approved under this scheme.
    pub auto_approval_allowed: bool,
}

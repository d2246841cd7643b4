//! Routing structure assembly.
//!
//! Turns the owner map and the composed whole-set approvers into the
//! approval units handed to the workflow engine, in scheme token order.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::debug;

use crate::config::{SchemeConfig, SchemePass};
use crate::error::Result;
use crate::services::auto_approval::AutoApprovalEngine;
use crate::services::owner_map::OwnerMap;
use crate::services::scheme_composer::{SchemeApprovers, SchemeComposer};
use crate::services::variant::ApprovalVariant;
use crate::types::{ApprovalUnit, ChangeSet, RecordState, Scheme};

/// Builds approval units from resolved approvers.
#[derive(Clone)]
pub struct ApprovalTreeBuilder {
    composer: SchemeComposer,
    engine: AutoApprovalEngine,
    variant: Arc<dyn ApprovalVariant>,
}

impl ApprovalTreeBuilder {
    /// Create a new tree builder.
    pub fn new(
        composer: SchemeComposer,
        engine: AutoApprovalEngine,
        variant: Arc<dyn ApprovalVariant>,
    ) -> Self {
        Self {
            composer,
            engine,
            variant,
        }
    }

    /// Build the approval units for one pass.
    ///
    /// Returns `None` when the token list contains `none`. Whole-set schemes
    /// produce a unit carrying a copy of every master record that is not
    /// yet finished; the `owner` scheme produces one unit per owner-map
    /// bucket, under a parallel poll parent when there is more than one.
    ///
    /// Whole-set approvers that the launcher stands in for get no unit.
    /// When such an approver is the only whole-set approver, the master
    /// records that no unit carries are finished on the launcher's behalf
    /// once every unit is built. A record therefore ends up either inside a
    /// unit or finished, never both.
    ///
    /// # Errors
    ///
    /// Propagates composition, directory and approver name errors.
    pub async fn build(
        &self,
        owner_map: OwnerMap,
        tokens: &[Scheme],
        config: &SchemeConfig,
        change_set: &mut ChangeSet,
    ) -> Result<Option<Vec<ApprovalUnit>>> {
        if tokens.contains(&Scheme::None) {
            return Ok(None);
        }

        let whole_set_tokens: Vec<Scheme> =
            tokens.iter().copied().filter(Scheme::is_whole_set).collect();
        let mut composed: VecDeque<SchemeApprovers> = if whole_set_tokens.is_empty() {
            VecDeque::new()
        } else {
            self.composer
                .compose_by_scheme(&whole_set_tokens, None, config)
                .await?
                .unwrap_or_default()
                .into()
        };

        let total_approvers: usize = composed.iter().map(|c| c.approvers.len()).sum();
        let override_rejection = config.manager_transfer_overrides_rejection
            && is_manager_transfer(tokens)
            && total_approvers == 1;

        let mut owner_map = Some(owner_map);
        let mut units = Vec::new();
        let mut sole_self_approval: Option<(String, Scheme)> = None;

        for &scheme in tokens {
            let pass = config.pass(scheme);

            if scheme == Scheme::Owner {
                // A repeated owner token routes nothing more.
                if let Some(map) = owner_map.take() {
                    units.extend(self.owner_units(map, &pass)?);
                }
                continue;
            }

            let Some(entry) = composed.pop_front() else {
                continue;
            };

            let mut remaining = Vec::with_capacity(entry.approvers.len());
            for approver in entry.approvers {
                if !self.engine.is_auto_approve(&approver, &pass).await? {
                    remaining.push(approver);
                    continue;
                }
                if total_approvers == 1 {
                    sole_self_approval = Some((approver, scheme));
                }
            }

            if remaining.is_empty() {
                debug!(
                    target: "approval_routing",
                    scheme = %scheme,
                    identity = %config.identity_name,
                    "No approval unit needed for scheme"
                );
                continue;
            }

            let copies = open_records(change_set);
            if copies.is_empty() && !change_set.is_empty() {
                debug!(
                    target: "approval_routing",
                    scheme = %scheme,
                    identity = %config.identity_name,
                    "Every record already finished, skipping scheme"
                );
                continue;
            }

            if scheme == Scheme::Identity {
                for approver in remaining {
                    let unit = self.variant.build_approval_unit(
                        std::slice::from_ref(&approver),
                        copies.clone(),
                    )?;
                    units.push(self.decorate(unit, &pass));
                }
            } else {
                let unit = self.variant.build_approval_unit(&remaining, copies)?;
                units.push(self.decorate(unit, &pass));
            }
        }

        if let Some((approver, scheme)) = sole_self_approval {
            let pass = config.pass(scheme);
            self.finish_unrouted(change_set, &units, &approver, &pass, override_rejection)
                .await;
        }

        debug!(
            target: "approval_routing",
            identity = %config.identity_name,
            units = units.len(),
            "Built approval units"
        );
        Ok(Some(units))
    }

    /// Units for the `owner` scheme.
    ///
    /// A single bucket is returned as that bare `Single` unit, with no
    /// parallel poll parent, so a set owned only by bob yields exactly one
    /// unit owned by bob. Two or more buckets go under one parent.
    fn owner_units(
        &self,
        owner_map: OwnerMap,
        pass: &SchemePass<'_>,
    ) -> Result<Option<ApprovalUnit>> {
        let mut children = owner_map
            .into_iter()
            .map(|(owner, records)| {
                let unit = self.variant.build_approval_unit(&[owner], records)?;
                Ok(self.decorate(unit, pass))
            })
            .collect::<Result<Vec<ApprovalUnit>>>()?;

        Ok(match children.len() {
            0 => None,
            1 => children.pop(),
            _ => Some(self.decorate(ApprovalUnit::parallel_poll(children), pass)),
        })
    }

    async fn finish_unrouted(
        &self,
        change_set: &mut ChangeSet,
        units: &[ApprovalUnit],
        approver: &str,
        pass: &SchemePass<'_>,
        override_rejection: bool,
    ) {
        for record in change_set.iter_mut() {
            if record.is_finished() || units.iter().any(|u| u.contains_record(record.id)) {
                continue;
            }
            if self
                .engine
                .apply_auto_approval(record, approver, pass, override_rejection)
                .await
                && record.owner.is_none()
            {
                record.owner = Some(approver.to_string());
            }
        }
    }

    fn decorate(&self, mut unit: ApprovalUnit, pass: &SchemePass<'_>) -> ApprovalUnit {
        unit.scheme = Some(pass.scheme);
        unit.description = Some(
            pass.description
                .clone()
                .unwrap_or_else(|| self.variant.describe(pass.scheme, pass.config)),
        );
        unit.email_template.clone_from(&pass.email_template);
        unit.electronic_signature.clone_from(&pass.electronic_signature);
        unit
    }
}

/// Copies of the master records still awaiting a decision.
fn open_records(change_set: &ChangeSet) -> ChangeSet {
    change_set
        .iter()
        .filter(|r| !r.is_finished())
        .cloned()
        .collect()
}

/// Finish every master record that is neither rejected nor in any unit.
///
/// Returns the number of records that changed. Running it again changes
/// nothing.
pub fn finalize(change_set: &mut ChangeSet, units: &[ApprovalUnit]) -> usize {
    let mut finished = 0;
    for record in change_set.iter_mut() {
        if record.state != RecordState::Pending {
            continue;
        }
        if units.iter().any(|u| u.contains_record(record.id)) {
            continue;
        }
        record.state = RecordState::Finished;
        finished += 1;
    }
    finished
}

/// Whether the token list is exactly `manager` plus `newManager`.
#[must_use]
pub fn is_manager_transfer(tokens: &[Scheme]) -> bool {
    tokens.contains(&Scheme::Manager)
        && tokens.contains(&Scheme::NewManager)
        && tokens
            .iter()
            .all(|t| matches!(t, Scheme::Manager | Scheme::NewManager))
}

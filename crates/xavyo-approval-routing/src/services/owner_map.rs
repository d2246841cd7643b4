//! Order-preserving approver buckets for the `owner` scheme.
//!
//! Every record is copied once into the bucket of each of its approvers.
//! Bucket order is the order in which approvers are first seen while
//! walking the change set, so two builds over the same input produce the
//! same map.

use indexmap::IndexMap;
use tracing::debug;

use crate::config::{SchemeConfig, SchemePass};
use crate::error::Result;
use crate::services::auto_approval::AutoApprovalEngine;
use crate::services::scheme_composer::SchemeComposer;
use crate::types::{ChangeRecord, ChangeSet, RecordState, Scheme};

/// Approver name to the copies of the records they must decide on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OwnerMap {
    entries: IndexMap<String, ChangeSet>,
}

impl OwnerMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record copy to the approver's bucket, creating it on first use.
    pub fn append(&mut self, approver: impl Into<String>, record: ChangeRecord) {
        self.entries.entry(approver.into()).or_default().push(record);
    }

    /// Make sure the approver has a bucket, even an empty one.
    pub fn ensure(&mut self, approver: impl Into<String>) {
        self.entries.entry(approver.into()).or_default();
    }

    /// Number of approvers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no approver has a bucket.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Approvers in first-seen order.
    pub fn owners(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Bucket of one approver.
    #[must_use]
    pub fn get(&self, approver: &str) -> Option<&ChangeSet> {
        self.entries.get(approver)
    }

    /// Iterate buckets in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ChangeSet)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl IntoIterator for OwnerMap {
    type Item = (String, ChangeSet);
    type IntoIter = indexmap::map::IntoIter<String, ChangeSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Folds a change set into an [`OwnerMap`].
#[derive(Clone)]
pub struct OwnerMapBuilder {
    composer: SchemeComposer,
    engine: AutoApprovalEngine,
}

impl OwnerMapBuilder {
    /// Create a new builder.
    pub fn new(composer: SchemeComposer, engine: AutoApprovalEngine) -> Self {
        Self { composer, engine }
    }

    /// Build the owner map from per-record owner resolution.
    ///
    /// Only the `owner` token contributes; any other token list yields an
    /// empty map. Records that are already finished are left out. Each
    /// master record's owner is set to its first approver.
    /// When a record has a single approver and that copy is auto-approved,
    /// the master record is finished as well.
    ///
    /// # Errors
    ///
    /// Propagates resolution, unresolved approver and directory errors.
    pub async fn build_owner_map(
        &self,
        change_set: &mut ChangeSet,
        tokens: &[Scheme],
        config: &SchemeConfig,
    ) -> Result<OwnerMap> {
        let mut map = OwnerMap::new();
        if !tokens.contains(&Scheme::Owner) {
            return Ok(map);
        }

        let pass = config.pass(Scheme::Owner);
        for record in change_set.iter_mut() {
            if record.is_finished() {
                continue;
            }
            let approvers = self
                .composer
                .compose_approvers(&[Scheme::Owner], Some(&*record), config)
                .await?
                .unwrap_or_default();
            self.attach(&mut map, record, &approvers, &pass).await?;
        }

        debug!(
            target: "approval_routing",
            identity = %config.identity_name,
            owners = map.len(),
            "Built owner map"
        );
        Ok(map)
    }

    /// Build the owner map when owners are known for the whole set.
    ///
    /// Every owner receives a copy of every unfinished record. With no
    /// records at all each owner still gets an empty bucket, unless the
    /// launcher is that owner.
    ///
    /// # Errors
    ///
    /// Propagates directory errors from the auto-approval check.
    pub async fn build_for_whole_set(
        &self,
        change_set: &mut ChangeSet,
        owners: &[String],
        config: &SchemeConfig,
    ) -> Result<OwnerMap> {
        let mut map = OwnerMap::new();
        let pass = config.pass(Scheme::Owner);

        if change_set.is_empty() {
            for owner in owners {
                if !self.engine.is_auto_approve(owner, &pass).await? {
                    map.ensure(owner.clone());
                }
            }
            return Ok(map);
        }

        for record in change_set.iter_mut().filter(|r| !r.is_finished()) {
            self.attach(&mut map, record, owners, &pass).await?;
        }
        Ok(map)
    }

    async fn attach(
        &self,
        map: &mut OwnerMap,
        record: &mut ChangeRecord,
        approvers: &[String],
        pass: &SchemePass<'_>,
    ) -> Result<()> {
        if let Some(first) = approvers.first() {
            record.owner = Some(first.clone());
        }

        for approver in approvers {
            let mut copy = record.clone();
            copy.owner = Some(approver.clone());

            if self.engine.is_auto_approve(approver, pass).await?
                && self
                    .engine
                    .apply_auto_approval(&mut copy, approver, pass, false)
                    .await
            {
                if approvers.len() == 1 {
                    record.state = RecordState::Finished;
                    record.approver.clone_from(&copy.approver);
                }
                continue;
            }

            map.append(approver.clone(), copy);
        }
        Ok(())
    }
}

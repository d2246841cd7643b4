//! Common test utilities for xavyo-approval-routing integration tests.
//!
//! All tests run against in-memory collaborators for isolation and speed.

#![allow(dead_code)]

pub mod fixtures;

use std::sync::Arc;

use xavyo_approval_routing::audit::InMemoryAuditLog;
use xavyo_approval_routing::directory::InMemoryDirectory;
use xavyo_approval_routing::rules::RuleRegistry;
use xavyo_approval_routing::services::ApprovalGenerator;
use xavyo_approval_routing::services::GovernedObjectVariant;

/// The in-memory collaborators of one test.
#[derive(Clone)]
pub struct TestStores {
    pub directory: Arc<InMemoryDirectory>,
    pub audit: Arc<InMemoryAuditLog>,
    pub rules: Arc<RuleRegistry>,
}

impl TestStores {
    /// Create a new set of isolated collaborators.
    pub fn new() -> Self {
        Self {
            directory: Arc::new(InMemoryDirectory::new()),
            audit: Arc::new(InMemoryAuditLog::new()),
            rules: Arc::new(RuleRegistry::new()),
        }
    }
}

impl Default for TestStores {
    fn default() -> Self {
        Self::new()
    }
}

/// Test context with collaborators and a wired generator.
pub struct TestContext {
    pub stores: TestStores,
    pub generator: ApprovalGenerator,
}

impl TestContext {
    /// Create a context for identity requests.
    pub fn new() -> Self {
        let stores = TestStores::new();
        let generator = ApprovalGenerator::new(stores.directory.clone(), stores.audit.clone())
            .with_rule_runner(stores.rules.clone());
        Self { stores, generator }
    }

    /// Create a context whose generator approves edits to a governed object.
    pub fn for_governed_object(variant: GovernedObjectVariant) -> Self {
        let mut ctx = Self::new();
        ctx.generator = ctx.generator.with_variant(Arc::new(variant));
        ctx
    }

    /// Create a context with the standard directory fixtures loaded.
    pub async fn seeded() -> Self {
        let ctx = Self::new();
        fixtures::seed_directory(&ctx.stores.directory).await;
        ctx
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

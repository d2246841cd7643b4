//! Service layer for approval routing.
//!
//! Components are listed leaves first. Data flows one way through them:
//! owner resolution and scheme composition feed the owner map, the
//! auto-approval engine finishes what the launcher can decide, and the tree
//! builder assembles the units handed to the workflow engine.

pub mod approval_tree;
pub mod auto_approval;
pub mod generator;
pub mod owner_map;
pub mod owner_resolver;
pub mod scheme_composer;
pub mod variant;

// Re-export commonly used types
pub use approval_tree::{finalize, is_manager_transfer, ApprovalTreeBuilder};
pub use auto_approval::AutoApprovalEngine;
pub use generator::ApprovalGenerator;
pub use owner_map::{OwnerMap, OwnerMapBuilder};
pub use owner_resolver::OwnerResolver;
pub use scheme_composer::{SchemeApprovers, SchemeComposer};
pub use variant::{ApprovalVariant, GovernedObjectVariant, IdentityRequestVariant};

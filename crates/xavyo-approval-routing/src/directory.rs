//! Read-only identity directory used to resolve owners and managers.
//!
//! The routing core never talks to the object store directly. Every lookup
//! goes through [`IdentityDirectory`], which production callers back with
//! their persistence layer and tests back with [`InMemoryDirectory`].

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::Result;

/// Property holding the owner name of a role or application.
pub const OWNER_PROPERTY: &str = "owner.name";

/// Property holding the manager name of an identity.
pub const MANAGER_PROPERTY: &str = "manager.name";

/// Kind of object queried in the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    /// An identity.
    Identity,
    /// A role definition.
    Role,
    /// An application definition.
    Application,
}

/// Trait for directory lookups.
#[async_trait::async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Project a single property of a named object, e.g. a role's owner.
    async fn find_owner_by_name(
        &self,
        object_type: ObjectType,
        name: &str,
        property: &str,
    ) -> Result<Option<String>>;

    /// Explicit owner of a managed attribute value, if it has one.
    async fn resolve_managed_attribute_owner(
        &self,
        application: &str,
        attribute: &str,
        value: &str,
    ) -> Result<Option<String>>;

    /// Whether the name refers to a workgroup.
    async fn is_workgroup(&self, name: &str) -> Result<bool>;

    /// Members of a workgroup.
    async fn workgroup_members(&self, name: &str) -> Result<Vec<String>>;
}

/// In-memory directory for testing.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    properties: Arc<RwLock<HashMap<(ObjectType, String, String), String>>>,
    managed_attribute_owners: Arc<RwLock<HashMap<(String, String, String), String>>>,
    workgroups: Arc<RwLock<HashMap<String, Vec<String>>>>,
}

impl InMemoryDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property on a named object.
    pub async fn set_property(
        &self,
        object_type: ObjectType,
        name: &str,
        property: &str,
        value: &str,
    ) {
        self.properties.write().await.insert(
            (object_type, name.to_string(), property.to_string()),
            value.to_string(),
        );
    }

    /// Set the owner of a role.
    pub async fn set_role_owner(&self, role: &str, owner: &str) {
        self.set_property(ObjectType::Role, role, OWNER_PROPERTY, owner)
            .await;
    }

    /// Set the owner of an application.
    pub async fn set_application_owner(&self, application: &str, owner: &str) {
        self.set_property(ObjectType::Application, application, OWNER_PROPERTY, owner)
            .await;
    }

    /// Set the manager of an identity.
    pub async fn set_manager(&self, identity: &str, manager: &str) {
        self.set_property(ObjectType::Identity, identity, MANAGER_PROPERTY, manager)
            .await;
    }

    /// Set the explicit owner of a managed attribute value.
    pub async fn set_managed_attribute_owner(
        &self,
        application: &str,
        attribute: &str,
        value: &str,
        owner: &str,
    ) {
        self.managed_attribute_owners.write().await.insert(
            (
                application.to_string(),
                attribute.to_string(),
                value.to_string(),
            ),
            owner.to_string(),
        );
    }

    /// Register a workgroup and its members.
    pub async fn add_workgroup(&self, name: &str, members: &[&str]) {
        self.workgroups.write().await.insert(
            name.to_string(),
            members.iter().map(|m| (*m).to_string()).collect(),
        );
    }

    /// Clear all data.
    pub async fn clear(&self) {
        self.properties.write().await.clear();
        self.managed_attribute_owners.write().await.clear();
        self.workgroups.write().await.clear();
    }
}

#[async_trait::async_trait]
impl IdentityDirectory for InMemoryDirectory {
    async fn find_owner_by_name(
        &self,
        object_type: ObjectType,
        name: &str,
        property: &str,
    ) -> Result<Option<String>> {
        let properties = self.properties.read().await;
        Ok(properties
            .get(&(object_type, name.to_string(), property.to_string()))
            .cloned())
    }

    async fn resolve_managed_attribute_owner(
        &self,
        application: &str,
        attribute: &str,
        value: &str,
    ) -> Result<Option<String>> {
        let owners = self.managed_attribute_owners.read().await;
        Ok(owners
            .get(&(
                application.to_string(),
                attribute.to_string(),
                value.to_string(),
            ))
            .cloned())
    }

    async fn is_workgroup(&self, name: &str) -> Result<bool> {
        Ok(self.workgroups.read().await.contains_key(name))
    }

    async fn workgroup_members(&self, name: &str) -> Result<Vec<String>> {
        Ok(self
            .workgroups
            .read()
            .await
            .get(name)
            .cloned()
            .unwrap_or_default())
    }
}

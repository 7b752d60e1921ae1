//! Management-plane client interfaces
//!
//! The engine never speaks the provider protocol itself. Each concern is an
//! `async_trait` interface implemented by the login/SDK collaborator and
//! injected as `Arc<dyn ...>`. Clients are read-only after construction and
//! shared freely between concurrent tasks.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use azmove_model::{MigrationSite, ResourceId, ResourceType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MigrationError;

/// Result type of every client call
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Failure reported by the management API
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The addressed resource group does not exist
    #[error("resource group '{0}' could not be found")]
    ResourceGroupNotFound(String),

    /// The addressed resource does not exist
    #[error("resource '{0}' could not be found")]
    ResourceNotFound(String),

    /// Any other API failure
    #[error("{code}: {message}")]
    Api { code: String, message: String },
}

impl ProviderError {
    /// Build an API error
    #[must_use]
    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Whether this is the recoverable "does not exist yet" condition
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ResourceGroupNotFound(_) | Self::ResourceNotFound(_))
    }
}

/// Generic per-type resource operations
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ResourceOperations: Send + Sync {
    /// Fetch one resource
    async fn get(&self, resource_group: &str, name: &str) -> ProviderResult<Value>;

    /// List every resource of this type in the subscription
    async fn list(&self) -> ProviderResult<Vec<Value>>;

    /// Create or update a resource, returning the provider's view of it
    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        payload: Value,
    ) -> ProviderResult<Value>;
}

/// Fetch a resource addressed by a full identifier
///
/// Sub-resource identifiers resolve to their parent resource.
///
/// # Errors
/// Propagates the provider error.
pub async fn get_by_id(ops: &dyn ResourceOperations, id: &ResourceId) -> ProviderResult<Value> {
    ops.get(id.resource_group(), id.resource_name()).await
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ResourceGroupOperations: Send + Sync {
    async fn get(&self, name: &str) -> ProviderResult<Value>;

    async fn check_existence(&self, name: &str) -> ProviderResult<bool>;

    async fn create_or_update(&self, name: &str, location: &str) -> ProviderResult<Value>;
}

/// Outcome of a storage-account name check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameAvailability {
    pub name_available: bool,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl NameAvailability {
    /// Reason reported when the name is already taken by an existing account
    pub const ALREADY_EXISTS: &'static str = "AlreadyExists";

    #[must_use]
    pub fn available() -> Self {
        Self {
            name_available: true,
            reason: None,
            message: None,
        }
    }

    #[must_use]
    pub fn already_exists(name: &str) -> Self {
        Self {
            name_available: false,
            reason: Some(Self::ALREADY_EXISTS.to_string()),
            message: Some(format!("The storage account named {name} is already taken.")),
        }
    }

    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        self.reason.as_deref() == Some(Self::ALREADY_EXISTS)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageAccountKey {
    pub key_name: String,
    pub value: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait StorageAccountOperations: Send + Sync {
    async fn list(&self) -> ProviderResult<Vec<Value>>;

    async fn get_properties(&self, resource_group: &str, name: &str) -> ProviderResult<Value>;

    async fn check_name_availability(&self, name: &str) -> ProviderResult<NameAvailability>;

    async fn create(&self, resource_group: &str, name: &str, payload: Value) -> ProviderResult<Value>;

    async fn list_keys(&self, resource_group: &str, name: &str) -> ProviderResult<Vec<StorageAccountKey>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait NetworkOperations: Send + Sync {
    /// Whether `label` is free as a DNS label in `location`
    async fn check_dns_name_availability(&self, location: &str, label: &str) -> ProviderResult<bool>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageName {
    pub value: String,
    #[serde(default)]
    pub localized_value: Option<String>,
}

/// Current consumption and limit of one quota counter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub name: UsageName,
    pub current_value: i64,
    pub limit: i64,
}

impl Usage {
    #[must_use]
    pub fn new(name: impl Into<String>, current_value: i64, limit: i64) -> Self {
        Self {
            name: UsageName {
                value: name.into(),
                localized_value: None,
            },
            current_value,
            limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmSize {
    pub name: String,
    pub number_of_cores: i64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait UsageOperations: Send + Sync {
    async fn list_compute_usages(&self, location: &str) -> ProviderResult<Vec<Usage>>;

    async fn list_network_usages(&self, location: &str) -> ProviderResult<Vec<Usage>>;

    async fn list_storage_usages(&self) -> ProviderResult<Vec<Usage>>;

    async fn list_vm_sizes(&self, location: &str) -> ProviderResult<Vec<VmSize>>;
}

/// Inclusive byte range of an allocated page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: u64,
    pub end: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyStatus {
    Pending,
    Success,
    Aborted,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyProperties {
    pub status: CopyStatus,
    pub bytes_copied: u64,
    pub total_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobProperties {
    #[serde(default)]
    pub copy: Option<CopyProperties>,
}

/// Read-only shared-access grant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharedAccessPolicy {
    pub expiry: DateTime<Utc>,
}

/// Blob operations against one storage account
#[async_trait::async_trait]
pub trait BlobService: Send + Sync {
    async fn create_container_if_not_exists(&self, container: &str) -> ProviderResult<bool>;

    async fn does_blob_exist(&self, container: &str, blob: &str) -> ProviderResult<bool>;

    /// Snapshot a blob, returning the snapshot id
    async fn create_snapshot(&self, container: &str, blob: &str) -> ProviderResult<String>;

    async fn list_page_ranges(&self, container: &str, blob: &str) -> ProviderResult<Vec<PageRange>>;

    /// Start a server-side asynchronous copy from `source_url`
    async fn start_copy(&self, source_url: &str, container: &str, blob: &str) -> ProviderResult<()>;

    /// Delete a blob, or only `snapshot` of it when given
    async fn delete_blob(&self, container: &str, blob: &str, snapshot: Option<&str>) -> ProviderResult<()>;

    async fn get_blob_properties(&self, container: &str, blob: &str) -> ProviderResult<BlobProperties>;

    /// Plain URL of a blob
    fn blob_url(&self, container: &str, blob: &str) -> String;

    /// Signed read URL over a snapshot
    fn shared_access_url(
        &self,
        container: &str,
        blob: &str,
        snapshot: &str,
        policy: SharedAccessPolicy,
    ) -> String;
}

/// Opens blob services from account credentials
#[async_trait::async_trait]
pub trait BlobServiceFactory: Send + Sync {
    async fn connect(
        &self,
        account: &str,
        key: &str,
        blob_endpoint: &str,
    ) -> ProviderResult<Arc<dyn BlobService>>;
}

/// Authenticated clients for one migration site
#[derive(Clone)]
pub struct ManagementClients {
    subscription_id: String,
    resources: HashMap<ResourceType, Arc<dyn ResourceOperations>>,
    pub resource_groups: Arc<dyn ResourceGroupOperations>,
    pub storage_accounts: Arc<dyn StorageAccountOperations>,
    pub network: Arc<dyn NetworkOperations>,
    pub usages: Arc<dyn UsageOperations>,
    pub blobs: Arc<dyn BlobServiceFactory>,
}

impl ManagementClients {
    /// Create a client bundle without per-type resource operations
    #[must_use]
    pub fn new(
        subscription_id: impl Into<String>,
        resource_groups: Arc<dyn ResourceGroupOperations>,
        storage_accounts: Arc<dyn StorageAccountOperations>,
        network: Arc<dyn NetworkOperations>,
        usages: Arc<dyn UsageOperations>,
        blobs: Arc<dyn BlobServiceFactory>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resources: HashMap::new(),
            resource_groups,
            storage_accounts,
            network,
            usages,
            blobs,
        }
    }

    /// Register the operations for one resource type
    #[must_use]
    pub fn with_operations(mut self, ty: ResourceType, ops: Arc<dyn ResourceOperations>) -> Self {
        self.resources.insert(ty, ops);
        self
    }

    #[inline]
    #[must_use]
    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    /// Operations for `ty`
    ///
    /// # Errors
    /// Returns [`MigrationError::MissingClient`] when none were registered.
    pub fn operations(&self, ty: ResourceType) -> Result<&dyn ResourceOperations, MigrationError> {
        self.resources
            .get(&ty)
            .map(|ops| &**ops)
            .ok_or(MigrationError::MissingClient(ty))
    }
}

impl fmt::Debug for ManagementClients {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self.resources.keys().collect();
        types.sort();
        f.debug_struct("ManagementClients")
            .field("subscription_id", &self.subscription_id)
            .field("resource_types", &types)
            .finish_non_exhaustive()
    }
}

/// Turns a site into authenticated clients
///
/// Implemented by the login collaborator, which owns credentials and
/// endpoint selection.
#[async_trait::async_trait]
pub trait ClientFactory: Send + Sync {
    async fn connect(&self, site: &MigrationSite) -> Result<ManagementClients, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_classification() {
        assert!(ProviderError::ResourceGroupNotFound("rg".into()).is_not_found());
        assert!(ProviderError::ResourceNotFound("x".into()).is_not_found());
        assert!(!ProviderError::api("AuthorizationFailed", "denied").is_not_found());
    }

    #[test]
    fn name_availability_reason() {
        assert!(NameAvailability::already_exists("acct").is_already_exists());
        assert!(!NameAvailability::available().is_already_exists());
    }

    #[test]
    fn usage_deserializes_sdk_shape() {
        let usage: Usage = serde_json::from_value(serde_json::json!({
            "name": { "value": "cores", "localizedValue": "Total Regional Cores" },
            "currentValue": 8,
            "limit": 10
        }))
        .unwrap();
        assert_eq!(usage.name.value, "cores");
        assert_eq!(usage.limit, 10);
    }
}

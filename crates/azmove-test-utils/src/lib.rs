//! Testing utilities for azmove workspace
//!
//! [`FakeCloud`] is an in-memory subscription implementing every client
//! interface the engine consumes. [`fixtures`] seeds it with realistic
//! virtual machine graphs.

#![allow(missing_docs)]

mod blob;
pub mod fixtures;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use azmove_core::clients::{
    BlobService, BlobServiceFactory, ClientFactory, ManagementClients, NameAvailability,
    NetworkOperations, ProviderError, ProviderResult, ResourceGroupOperations, ResourceOperations,
    StorageAccountKey, StorageAccountOperations, Usage, UsageOperations, VmSize,
};
use azmove_model::{CloudEnvironment, MigrationSite, ResourceId, ResourceType};
use parking_lot::Mutex;
use serde_json::{json, Value};

pub use blob::{FakeBlobAccount, DEFAULT_COPY_SIZE};

type ResourceKey = (ResourceType, String, String);

fn resource_key(ty: ResourceType, resource_group: &str, name: &str) -> ResourceKey {
    (ty, resource_group.to_lowercase(), name.to_lowercase())
}

/// Blob endpoint host suffix of a cloud
pub fn blob_suffix(environment: CloudEnvironment) -> &'static str {
    match environment {
        CloudEnvironment::AzureCloud => "blob.core.windows.net",
        CloudEnvironment::AzureChinaCloud => "blob.core.chinacloudapi.cn",
        CloudEnvironment::AzureGermanCloud => "blob.core.cloudapi.de",
    }
}

/// Full identifier of a resource in the style the provider returns
pub fn resource_path(subscription_id: &str, resource_group: &str, ty: ResourceType, name: &str) -> String {
    let segment = match ty {
        ResourceType::AvailabilitySets => "availabilitySets",
        ResourceType::LoadBalancers => "loadBalancers",
        ResourceType::NetworkInterfaces => "networkInterfaces",
        ResourceType::NetworkSecurityGroups => "networkSecurityGroups",
        ResourceType::PublicIpAddresses => "publicIPAddresses",
        ResourceType::StorageAccounts => "storageAccounts",
        ResourceType::VirtualMachines => "virtualMachines",
        ResourceType::VirtualNetworks => "virtualNetworks",
    };
    format!(
        "/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/{}/{segment}/{name}",
        ty.provider()
    )
}

#[derive(Debug)]
struct CloudState {
    groups: HashMap<String, Value>,
    resources: HashMap<ResourceKey, Value>,
    storage_accounts: HashMap<String, (String, Value)>,
    foreign_account_names: HashSet<String>,
    taken_dns_labels: HashSet<String>,
    compute_usages: Vec<Usage>,
    network_usages: Vec<Usage>,
    storage_usages: Vec<Usage>,
    vm_sizes: Vec<VmSize>,
    create_failures: HashMap<(ResourceType, String), ProviderError>,
    provisioning_state: Option<String>,
    calls: Vec<String>,
}

impl Default for CloudState {
    fn default() -> Self {
        Self {
            groups: HashMap::new(),
            resources: HashMap::new(),
            storage_accounts: HashMap::new(),
            foreign_account_names: HashSet::new(),
            taken_dns_labels: HashSet::new(),
            compute_usages: Vec::new(),
            network_usages: Vec::new(),
            storage_usages: Vec::new(),
            vm_sizes: Vec::new(),
            create_failures: HashMap::new(),
            provisioning_state: Some("Succeeded".to_string()),
            calls: Vec::new(),
        }
    }
}

/// In-memory subscription
#[derive(Debug)]
pub struct FakeCloud {
    site: MigrationSite,
    state: Mutex<CloudState>,
    blob_accounts: Mutex<HashMap<String, Arc<FakeBlobAccount>>>,
}

impl FakeCloud {
    pub fn new(environment: CloudEnvironment, subscription_id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            site: MigrationSite::new(environment, subscription_id),
            state: Mutex::new(CloudState::default()),
            blob_accounts: Mutex::new(HashMap::new()),
        })
    }

    pub fn site(&self) -> &MigrationSite {
        &self.site
    }

    pub fn subscription_id(&self) -> &str {
        &self.site.subscription_id
    }

    /// Client bundle backed by this cloud, with operations for every resource type
    pub fn clients(self: &Arc<Self>) -> ManagementClients {
        let mut clients = ManagementClients::new(
            self.subscription_id(),
            Arc::clone(self) as _,
            Arc::clone(self) as _,
            Arc::clone(self) as _,
            Arc::clone(self) as _,
            Arc::clone(self) as _,
        );
        for ty in ResourceType::ALL {
            clients = clients.with_operations(
                ty,
                Arc::new(FakeResources {
                    cloud: Arc::clone(self),
                    ty,
                }),
            );
        }
        clients
    }

    pub fn add_resource_group(&self, name: &str, location: &str) {
        let group = json!({
            "id": format!("/subscriptions/{}/resourceGroups/{name}", self.subscription_id()),
            "name": name,
            "location": location,
        });
        self.state.lock().groups.insert(name.to_lowercase(), group);
    }

    /// Seed a resource payload, creating its group when missing
    pub fn add_resource(&self, resource: Value) {
        let raw = resource.get("id").and_then(Value::as_str).unwrap_or_default();
        let id = ResourceId::parse(raw);
        let Some(ty) = id.resource_type_tag() else {
            panic!("unsupported resource id '{raw}'");
        };
        if !self.has_resource_group(id.resource_group()) {
            let location = resource.get("location").and_then(Value::as_str).unwrap_or("westus");
            self.add_resource_group(id.resource_group(), location);
        }
        self.state
            .lock()
            .resources
            .insert(resource_key(ty, id.resource_group(), id.resource_name()), resource);
    }

    /// Seed a storage account with a blob endpoint, returning its blob service
    pub fn add_storage_account(&self, resource_group: &str, name: &str, account: Value) -> Arc<FakeBlobAccount> {
        if !self.has_resource_group(resource_group) {
            let location = account.get("location").and_then(Value::as_str).unwrap_or("westus");
            self.add_resource_group(resource_group, location);
        }
        let account = self.complete_storage_account(resource_group, name, account);
        let endpoint = account
            .pointer("/primaryEndpoints/blob")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.state
            .lock()
            .storage_accounts
            .insert(name.to_lowercase(), (resource_group.to_lowercase(), account));

        let blobs = FakeBlobAccount::new(name, endpoint);
        self.blob_accounts.lock().insert(name.to_lowercase(), Arc::clone(&blobs));
        blobs
    }

    /// Mark an account name as taken by some other subscription
    pub fn take_storage_account_name(&self, name: &str) {
        self.state.lock().foreign_account_names.insert(name.to_lowercase());
    }

    pub fn take_dns_label(&self, label: &str) {
        self.state.lock().taken_dns_labels.insert(label.to_lowercase());
    }

    pub fn set_compute_usages(&self, usages: Vec<Usage>) {
        self.state.lock().compute_usages = usages;
    }

    pub fn set_network_usages(&self, usages: Vec<Usage>) {
        self.state.lock().network_usages = usages;
    }

    pub fn set_storage_usages(&self, usages: Vec<Usage>) {
        self.state.lock().storage_usages = usages;
    }

    pub fn set_vm_sizes(&self, sizes: Vec<VmSize>) {
        self.state.lock().vm_sizes = sizes;
    }

    /// Make creating `name` of type `ty` fail with `error`
    pub fn fail_create(&self, ty: ResourceType, name: &str, error: ProviderError) {
        self.state.lock().create_failures.insert((ty, name.to_lowercase()), error);
    }

    /// Provisioning state stamped on created resources
    pub fn set_provisioning_state(&self, state: Option<&str>) {
        self.state.lock().provisioning_state = state.map(str::to_owned);
    }

    pub fn has_resource_group(&self, name: &str) -> bool {
        self.state.lock().groups.contains_key(&name.to_lowercase())
    }

    pub fn resource(&self, ty: ResourceType, resource_group: &str, name: &str) -> Option<Value> {
        self.state
            .lock()
            .resources
            .get(&resource_key(ty, resource_group, name))
            .cloned()
    }

    pub fn storage_account(&self, name: &str) -> Option<Value> {
        self.state
            .lock()
            .storage_accounts
            .get(&name.to_lowercase())
            .map(|(_, account)| account.clone())
    }

    pub fn blob_account(&self, name: &str) -> Option<Arc<FakeBlobAccount>> {
        self.blob_accounts.lock().get(&name.to_lowercase()).cloned()
    }

    /// Every mutating call, in the order it was made
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    /// Position of `call` in [`calls`](Self::calls)
    pub fn call_index(&self, call: &str) -> Option<usize> {
        self.state.lock().calls.iter().position(|made| made == call)
    }

    fn record(state: &mut CloudState, call: String) {
        state.calls.push(call);
    }

    fn complete_storage_account(&self, resource_group: &str, name: &str, account: Value) -> Value {
        let mut account = account;
        if let Some(map) = account.as_object_mut() {
            map.insert(
                "id".to_string(),
                json!(resource_path(self.subscription_id(), resource_group, ResourceType::StorageAccounts, name)),
            );
            map.insert("name".to_string(), json!(name));
            map.entry("primaryEndpoints").or_insert_with(|| {
                json!({ "blob": format!("https://{name}.{}/", blob_suffix(self.site.environment)) })
            });
        }
        account
    }

    fn get_resource(&self, ty: ResourceType, resource_group: &str, name: &str) -> ProviderResult<Value> {
        let state = self.state.lock();
        if !state.groups.contains_key(&resource_group.to_lowercase()) {
            return Err(ProviderError::ResourceGroupNotFound(resource_group.to_string()));
        }
        state
            .resources
            .get(&resource_key(ty, resource_group, name))
            .cloned()
            .ok_or_else(|| ProviderError::ResourceNotFound(format!("{resource_group}/{name}")))
    }

    fn create_resource(
        &self,
        ty: ResourceType,
        resource_group: &str,
        name: &str,
        payload: Value,
    ) -> ProviderResult<Value> {
        let mut state = self.state.lock();
        Self::record(&mut state, format!("create {ty} {resource_group}/{name}"));
        if let Some(err) = state.create_failures.get(&(ty, name.to_lowercase())) {
            return Err(err.clone());
        }
        if !state.groups.contains_key(&resource_group.to_lowercase()) {
            return Err(ProviderError::ResourceGroupNotFound(resource_group.to_string()));
        }

        let mut created = payload;
        if let Some(map) = created.as_object_mut() {
            map.insert(
                "id".to_string(),
                json!(resource_path(self.subscription_id(), resource_group, ty, name)),
            );
            map.insert("name".to_string(), json!(name));
            if let Some(provisioning_state) = &state.provisioning_state {
                map.insert("provisioningState".to_string(), json!(provisioning_state));
            }
        }
        state
            .resources
            .insert(resource_key(ty, resource_group, name), created.clone());
        Ok(created)
    }
}

/// Per-type view of a [`FakeCloud`]
struct FakeResources {
    cloud: Arc<FakeCloud>,
    ty: ResourceType,
}

#[async_trait::async_trait]
impl ResourceOperations for FakeResources {
    async fn get(&self, resource_group: &str, name: &str) -> ProviderResult<Value> {
        self.cloud.get_resource(self.ty, resource_group, name)
    }

    async fn list(&self) -> ProviderResult<Vec<Value>> {
        let state = self.cloud.state.lock();
        Ok(state
            .resources
            .iter()
            .filter(|((ty, _, _), _)| *ty == self.ty)
            .map(|(_, resource)| resource.clone())
            .collect())
    }

    async fn create_or_update(&self, resource_group: &str, name: &str, payload: Value) -> ProviderResult<Value> {
        self.cloud.create_resource(self.ty, resource_group, name, payload)
    }
}

#[async_trait::async_trait]
impl ResourceGroupOperations for FakeCloud {
    async fn get(&self, name: &str) -> ProviderResult<Value> {
        self.state
            .lock()
            .groups
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| ProviderError::ResourceGroupNotFound(name.to_string()))
    }

    async fn check_existence(&self, name: &str) -> ProviderResult<bool> {
        Ok(self.has_resource_group(name))
    }

    async fn create_or_update(&self, name: &str, location: &str) -> ProviderResult<Value> {
        Self::record(&mut self.state.lock(), format!("create resourcegroup {name}"));
        self.add_resource_group(name, location);
        ResourceGroupOperations::get(self, name).await
    }
}

#[async_trait::async_trait]
impl StorageAccountOperations for FakeCloud {
    async fn list(&self) -> ProviderResult<Vec<Value>> {
        Ok(self
            .state
            .lock()
            .storage_accounts
            .values()
            .map(|(_, account)| account.clone())
            .collect())
    }

    async fn get_properties(&self, resource_group: &str, name: &str) -> ProviderResult<Value> {
        let state = self.state.lock();
        match state.storage_accounts.get(&name.to_lowercase()) {
            Some((group, account)) if *group == resource_group.to_lowercase() => Ok(account.clone()),
            _ if !state.groups.contains_key(&resource_group.to_lowercase()) => {
                Err(ProviderError::ResourceGroupNotFound(resource_group.to_string()))
            }
            _ => Err(ProviderError::ResourceNotFound(format!("{resource_group}/{name}"))),
        }
    }

    async fn check_name_availability(&self, name: &str) -> ProviderResult<NameAvailability> {
        let state = self.state.lock();
        let key = name.to_lowercase();
        if state.storage_accounts.contains_key(&key) || state.foreign_account_names.contains(&key) {
            Ok(NameAvailability::already_exists(name))
        } else {
            Ok(NameAvailability::available())
        }
    }

    async fn create(&self, resource_group: &str, name: &str, payload: Value) -> ProviderResult<Value> {
        {
            let mut state = self.state.lock();
            Self::record(&mut state, format!("create storageaccount {resource_group}/{name}"));
            if let Some(err) = state
                .create_failures
                .get(&(ResourceType::StorageAccounts, name.to_lowercase()))
            {
                return Err(err.clone());
            }
            if !state.groups.contains_key(&resource_group.to_lowercase()) {
                return Err(ProviderError::ResourceGroupNotFound(resource_group.to_string()));
            }
        }
        self.add_storage_account(resource_group, name, payload);
        self.storage_account(name)
            .ok_or_else(|| ProviderError::ResourceNotFound(name.to_string()))
    }

    async fn list_keys(&self, resource_group: &str, name: &str) -> ProviderResult<Vec<StorageAccountKey>> {
        StorageAccountOperations::get_properties(self, resource_group, name).await?;
        Ok(vec![StorageAccountKey {
            key_name: "key1".to_string(),
            value: format!("key-{name}"),
        }])
    }
}

#[async_trait::async_trait]
impl NetworkOperations for FakeCloud {
    async fn check_dns_name_availability(&self, _location: &str, label: &str) -> ProviderResult<bool> {
        Ok(!self.state.lock().taken_dns_labels.contains(&label.to_lowercase()))
    }
}

#[async_trait::async_trait]
impl UsageOperations for FakeCloud {
    async fn list_compute_usages(&self, _location: &str) -> ProviderResult<Vec<Usage>> {
        Ok(self.state.lock().compute_usages.clone())
    }

    async fn list_network_usages(&self, _location: &str) -> ProviderResult<Vec<Usage>> {
        Ok(self.state.lock().network_usages.clone())
    }

    async fn list_storage_usages(&self) -> ProviderResult<Vec<Usage>> {
        Ok(self.state.lock().storage_usages.clone())
    }

    async fn list_vm_sizes(&self, _location: &str) -> ProviderResult<Vec<VmSize>> {
        Ok(self.state.lock().vm_sizes.clone())
    }
}

#[async_trait::async_trait]
impl BlobServiceFactory for FakeCloud {
    async fn connect(&self, account: &str, key: &str, _blob_endpoint: &str) -> ProviderResult<Arc<dyn BlobService>> {
        let blobs = self
            .blob_account(account)
            .ok_or_else(|| ProviderError::ResourceNotFound(account.to_string()))?;
        if blobs.key() != key {
            return Err(ProviderError::api("AuthenticationFailed", "invalid account key"));
        }
        Ok(blobs)
    }
}

/// Hands out the [`FakeCloud`] registered for a site's subscription
#[derive(Debug, Default)]
pub struct FakeClientFactory {
    clouds: HashMap<String, Arc<FakeCloud>>,
}

impl FakeClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_cloud(mut self, cloud: &Arc<FakeCloud>) -> Self {
        self.clouds.insert(cloud.subscription_id().to_string(), Arc::clone(cloud));
        self
    }
}

#[async_trait::async_trait]
impl ClientFactory for FakeClientFactory {
    async fn connect(&self, site: &MigrationSite) -> Result<ManagementClients, ProviderError> {
        self.clouds
            .get(&site.subscription_id)
            .map(FakeCloud::clients)
            .ok_or_else(|| ProviderError::api("SubscriptionNotFound", site.subscription_id.clone()))
    }
}

//! Destination validation
//!
//! [`ResourceValidator`] walks a [`MigrationJob`] once, root VM first and
//! then each dependency type in discovery order. For every resource it either
//! accepts a compatible pre-existing destination resource or attaches a create
//! payload. Quota is checked last, once every payload is known.
//!
//! Validation is sequential: the sets of resource groups and storage accounts
//! that will be created are owned by the validator and only touched between
//! awaits of a single task.

mod compat;
pub mod names;
mod references;
pub mod rules;

use azmove_model::views::{self, PublicIpAddressView, ResourceSummary, StorageAccountView};
use azmove_model::{ResourceId, ResourceInfo, ResourceMigrationInfo, ResourceType};
use indexmap::IndexSet;
use serde_json::Value;

use crate::clients::{get_by_id, ManagementClients, ProviderError};
use crate::error::{MigrationError, ValidationFailure};
use crate::job::MigrationJob;
use crate::quota::QuotaValidator;

pub use names::NameRule;
pub use rules::{rules_for, PayloadContext, ResourceValidation};

/// Prerequisites validation found missing at the destination
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationOutcome {
    /// Resource groups to create, in discovery order
    pub new_resource_groups: IndexSet<String>,
    /// Storage accounts to create, with their create payloads
    pub new_storage_accounts: Vec<ResourceInfo>,
}

/// What generic validation decided for one resource
#[derive(Debug)]
enum Decision {
    /// Not at the destination; create it with this payload
    Create(Value),
    /// Already at the destination and acceptable
    Existing(Value),
}

impl Decision {
    fn into_payload(self) -> Option<Value> {
        match self {
            Self::Create(payload) => Some(payload),
            Self::Existing(_) => None,
        }
    }
}

/// Validates one migration job against the destination subscription
pub struct ResourceValidator<'a> {
    clients: &'a ManagementClients,
    new_resource_groups: IndexSet<String>,
    new_storage_accounts: Vec<ResourceInfo>,
}

impl<'a> ResourceValidator<'a> {
    #[must_use]
    pub fn new(clients: &'a ManagementClients) -> Self {
        Self {
            clients,
            new_resource_groups: IndexSet::new(),
            new_storage_accounts: Vec::new(),
        }
    }

    /// Validate every resource of `job` and attach create payloads
    ///
    /// On success, every resource that will be created carries its destination
    /// payload and the returned outcome lists the prerequisites to create first.
    ///
    /// # Errors
    /// Returns the first [`ValidationFailure`] or provider failure; later
    /// resources are not examined.
    #[tracing::instrument(skip_all, fields(root = %job.root.source.id, location = %job.destination_location))]
    pub async fn validate(mut self, job: &mut MigrationJob) -> Result<ValidationOutcome, MigrationError> {
        let location = job.destination_location.clone();

        let ctx = PayloadContext::new(&location, &job.dependencies);
        let root = self
            .validate_generic(&job.root, rules_for(ResourceType::VirtualMachines), &ctx)
            .await?;
        let root_payload = root.into_payload();

        let mut payloads = Vec::new();
        for (ty, infos) in &job.dependencies {
            for (index, info) in infos.iter().enumerate() {
                let payload = match ty {
                    ResourceType::StorageAccounts => self.validate_storage_account(info, &ctx).await?,
                    ResourceType::PublicIpAddresses => self.validate_public_ip_address(info, &ctx).await?,
                    ResourceType::VirtualNetworks => self.validate_virtual_network(info, &ctx).await?,
                    ty => self.validate_generic(info, rules_for(*ty), &ctx).await?.into_payload(),
                };
                if let Some(payload) = payload {
                    payloads.push((*ty, index, payload));
                }
            }
        }

        if let Some(payload) = root_payload {
            job.root.set_payload(payload);
        }
        for (ty, index, payload) in payloads {
            if let Some(info) = job.dependencies.get_mut(&ty).and_then(|infos| infos.get_mut(index)) {
                info.set_payload(payload);
            }
        }

        QuotaValidator::new(self.clients.usages.as_ref(), &location)
            .validate(job)
            .await?;

        tracing::debug!(
            new_resource_groups = self.new_resource_groups.len(),
            new_storage_accounts = self.new_storage_accounts.len(),
            "validation complete"
        );
        Ok(ValidationOutcome {
            new_resource_groups: self.new_resource_groups,
            new_storage_accounts: self.new_storage_accounts,
        })
    }

    async fn validate_generic(
        &mut self,
        info: &ResourceMigrationInfo,
        rules: &dyn ResourceValidation,
        ctx: &PayloadContext<'_>,
    ) -> Result<Decision, MigrationError> {
        let id = &info.destination.id;
        rules.validate_name(id.resource_name())?;

        if self.new_resource_groups.contains(id.resource_group()) {
            tracing::debug!(%id, "resource group is new, skipping existence check");
            return create(info, rules, ctx);
        }

        names::RESOURCE_GROUP.validate(id.resource_group())?;
        let ops = self.clients.operations(rules.resource_type())?;
        match get_by_id(ops, id).await {
            Ok(existing) => {
                if rules.must_not_preexist() {
                    return Err(ValidationFailure::AlreadyExists { id: id.to_string() }.into());
                }
                let summary: ResourceSummary = views::view(&existing, "resource")?;
                if let Some(found) = summary.location {
                    if !found.eq_ignore_ascii_case(ctx.location) {
                        return Err(ValidationFailure::LocationMismatch {
                            id: id.to_string(),
                            existing: found,
                            requested: ctx.location.to_string(),
                        }
                        .into());
                    }
                }
                tracing::debug!(%id, "reusing existing destination resource");
                Ok(Decision::Existing(existing))
            }
            Err(ProviderError::ResourceGroupNotFound(_)) => {
                self.new_resource_groups.insert(id.resource_group().to_string());
                create(info, rules, ctx)
            }
            Err(ProviderError::ResourceNotFound(_)) => create(info, rules, ctx),
            Err(err) => Err(err.into()),
        }
    }

    async fn validate_virtual_network(
        &mut self,
        info: &ResourceMigrationInfo,
        ctx: &PayloadContext<'_>,
    ) -> Result<Option<Value>, MigrationError> {
        match self
            .validate_generic(info, rules_for(ResourceType::VirtualNetworks), ctx)
            .await?
        {
            Decision::Create(payload) => Ok(Some(payload)),
            Decision::Existing(existing) => {
                compat::check_virtual_network(&info.source.resource, &existing, &info.destination.id)?;
                Ok(None)
            }
        }
    }

    async fn validate_public_ip_address(
        &mut self,
        info: &ResourceMigrationInfo,
        ctx: &PayloadContext<'_>,
    ) -> Result<Option<Value>, MigrationError> {
        let source: PublicIpAddressView = views::view(&info.source.resource, "public IP address")?;
        let label = source.dns_settings.and_then(|dns| dns.domain_name_label);
        if let Some(label) = label {
            let available = self
                .clients
                .network
                .check_dns_name_availability(ctx.location, &label)
                .await?;
            if !available {
                return Err(ValidationFailure::DnsLabelTaken {
                    label,
                    location: ctx.location.to_string(),
                }
                .into());
            }
        }

        match self
            .validate_generic(info, rules_for(ResourceType::PublicIpAddresses), ctx)
            .await?
        {
            Decision::Create(payload) => Ok(Some(payload)),
            Decision::Existing(existing) => {
                compat::check_public_ip_address(&existing, &info.destination.id)?;
                Ok(None)
            }
        }
    }

    async fn validate_storage_account(
        &mut self,
        info: &ResourceMigrationInfo,
        ctx: &PayloadContext<'_>,
    ) -> Result<Option<Value>, MigrationError> {
        let id = &info.destination.id;
        let source: StorageAccountView = views::view(&info.source.resource, "storage account")?;
        if source.is_encrypted() {
            return Err(ValidationFailure::EncryptedStorageAccount {
                name: source.name.unwrap_or_else(|| info.source.id.resource_name().to_string()),
            }
            .into());
        }

        names::RESOURCE_GROUP.validate(id.resource_group())?;
        rules_for(ResourceType::StorageAccounts).validate_name(id.resource_name())?;

        let clients = self.clients;
        let group_known_new = self.new_resource_groups.contains(id.resource_group());
        let group_exists = async {
            if group_known_new {
                return Ok(true);
            }
            clients
                .resource_groups
                .check_existence(id.resource_group())
                .await
                .map_err(MigrationError::from)
        };
        let (payload, group_exists) = tokio::try_join!(
            check_storage_account(clients, info, &source, ctx),
            group_exists
        )?;

        if !group_exists {
            self.new_resource_groups.insert(id.resource_group().to_string());
        }
        if let Some(payload) = &payload {
            self.new_storage_accounts.push(ResourceInfo {
                id: id.clone(),
                resource: payload.clone(),
            });
        }
        Ok(payload)
    }
}

fn create(
    info: &ResourceMigrationInfo,
    rules: &dyn ResourceValidation,
    ctx: &PayloadContext<'_>,
) -> Result<Decision, MigrationError> {
    let payload = rules.prepare_payload(&info.source.resource, &info.destination.id, ctx)?;
    tracing::debug!(id = %info.destination.id, "will be created");
    Ok(Decision::Create(payload))
}

/// Create payload for a free account name, or `None` for a compatible existing account
async fn check_storage_account(
    clients: &ManagementClients,
    info: &ResourceMigrationInfo,
    source: &StorageAccountView,
    ctx: &PayloadContext<'_>,
) -> Result<Option<Value>, MigrationError> {
    let id = &info.destination.id;
    let (resource_group, name) = (id.resource_group(), id.resource_name());

    let availability = clients.storage_accounts.check_name_availability(name).await?;
    if availability.name_available {
        let rules = rules_for(ResourceType::StorageAccounts);
        return Ok(Some(rules.prepare_payload(&info.source.resource, id, ctx)?));
    }

    let refused = || {
        ValidationFailure::StorageAccountUnavailable(
            availability
                .message
                .clone()
                .unwrap_or_else(|| format!("The storage account named {name} is not available.")),
        )
    };
    if !availability.is_already_exists() {
        return Err(refused().into());
    }

    let existing = match clients.storage_accounts.get_properties(resource_group, name).await {
        Ok(existing) => existing,
        Err(err) if err.is_not_found() => return Err(refused().into()),
        Err(err) => return Err(err.into()),
    };
    let existing: StorageAccountView = views::view(&existing, "storage account")?;
    check_storage_compatibility(id, source, &existing, ctx.location)?;
    tracing::debug!(%id, "reusing existing storage account");
    Ok(None)
}

fn check_storage_compatibility(
    id: &ResourceId,
    source: &StorageAccountView,
    existing: &StorageAccountView,
    location: &str,
) -> Result<(), ValidationFailure> {
    let name = id.resource_name().to_string();
    let resource_group = id.resource_group().to_string();

    if existing.kind != source.kind {
        return Err(ValidationFailure::StorageKindMismatch {
            name,
            resource_group,
            kind: existing.kind.clone().unwrap_or_default(),
        });
    }
    let existing_location = existing.location.as_deref().unwrap_or_default();
    if !existing_location.eq_ignore_ascii_case(location) {
        return Err(ValidationFailure::StorageLocationMismatch {
            name,
            resource_group,
            location: existing_location.to_string(),
        });
    }
    if existing.sku_tier() != source.sku_tier() {
        return Err(ValidationFailure::StorageSkuTierMismatch {
            name,
            resource_group,
            tier: existing.sku_tier().unwrap_or_default().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use azmove_model::{CloudEnvironment, MigrationSite, ResourceDependency};
    use serde_json::json;

    use super::*;
    use crate::clients::{
        BlobService, BlobServiceFactory, MockNetworkOperations, MockResourceGroupOperations,
        MockResourceOperations, MockStorageAccountOperations, MockUsageOperations, NameAvailability,
        ProviderResult, Usage, VmSize,
    };

    const SRC: &str = "/subscriptions/src/resourceGroups/rg/providers";

    struct NoBlobs;

    #[async_trait::async_trait]
    impl BlobServiceFactory for NoBlobs {
        async fn connect(&self, account: &str, _key: &str, _endpoint: &str) -> ProviderResult<Arc<dyn BlobService>> {
            Err(ProviderError::ResourceNotFound(account.to_string()))
        }
    }

    fn vm() -> Value {
        json!({
            "id": format!("{SRC}/Microsoft.Compute/virtualMachines/vm"),
            "location": "westus",
            "hardwareProfile": { "vmSize": "Standard_A1" },
            "storageProfile": { "osDisk": { "vhd": { "uri": "https://acct.blob.core.windows.net/vhds/os.vhd" } } }
        })
    }

    fn storage_account(kind: &str, tier: &str) -> Value {
        json!({
            "id": format!("{SRC}/Microsoft.Storage/storageAccounts/acct"),
            "name": "acct",
            "location": "westus",
            "kind": kind,
            "sku": { "name": "Standard_LRS", "tier": tier }
        })
    }

    fn job(dependencies: Vec<Value>) -> MigrationJob {
        let mut resolved = ResourceDependency::new(vm());
        resolved.extend(dependencies);
        MigrationJob::new(
            MigrationSite::new(CloudEnvironment::AzureCloud, "src"),
            MigrationSite::new(CloudEnvironment::AzureChinaCloud, "dest"),
            "chinaeast",
            resolved,
        )
        .unwrap()
    }

    fn roomy_usages() -> MockUsageOperations {
        let mut usages = MockUsageOperations::new();
        usages.expect_list_compute_usages().returning(|_| {
            Ok(vec![
                Usage::new("cores", 0, 100),
                Usage::new("standardA0_A7Family", 0, 100),
                Usage::new("virtualMachines", 0, 100),
            ])
        });
        usages.expect_list_network_usages().returning(|_| Ok(vec![]));
        usages.expect_list_storage_usages().returning(|| Ok(vec![]));
        usages.expect_list_vm_sizes().returning(|_| {
            Ok(vec![VmSize {
                name: "Standard_A1".into(),
                number_of_cores: 1,
            }])
        });
        usages
    }

    fn missing_vm_ops() -> MockResourceOperations {
        let mut ops = MockResourceOperations::new();
        ops.expect_get()
            .returning(|_, name| Err(ProviderError::ResourceNotFound(name.to_string())));
        ops
    }

    fn clients(
        resource_groups: MockResourceGroupOperations,
        storage: MockStorageAccountOperations,
        network: MockNetworkOperations,
        extra: Vec<(ResourceType, MockResourceOperations)>,
    ) -> ManagementClients {
        let base = ManagementClients::new(
            "dest",
            Arc::new(resource_groups),
            Arc::new(storage),
            Arc::new(network),
            Arc::new(roomy_usages()),
            Arc::new(NoBlobs),
        )
        .with_operations(ResourceType::VirtualMachines, Arc::new(missing_vm_ops()));
        extra
            .into_iter()
            .fold(base, |clients, (ty, ops)| clients.with_operations(ty, Arc::new(ops)))
    }

    fn existing_group() -> MockResourceGroupOperations {
        let mut groups = MockResourceGroupOperations::new();
        groups.expect_check_existence().returning(|_| Ok(true));
        groups
    }

    #[tokio::test]
    async fn missing_vm_gets_a_payload() {
        let clients = clients(
            existing_group(),
            MockStorageAccountOperations::new(),
            MockNetworkOperations::new(),
            vec![],
        );
        let mut job = job(vec![]);
        let outcome = ResourceValidator::new(&clients).validate(&mut job).await.unwrap();

        assert!(job.root.needs_deployment());
        assert!(outcome.new_resource_groups.is_empty());
        let payload = job.root.destination.resource.as_ref().unwrap();
        assert_eq!(payload["location"], "chinaeast");
        assert_eq!(payload["storageProfile"]["osDisk"]["createOption"], "Attach");
    }

    #[tokio::test]
    async fn existing_vm_is_rejected() {
        let mut vm_ops = MockResourceOperations::new();
        vm_ops.expect_get().returning(|_, _| Ok(json!({ "location": "chinaeast" })));
        let clients = clients(
            existing_group(),
            MockStorageAccountOperations::new(),
            MockNetworkOperations::new(),
            vec![(ResourceType::VirtualMachines, vm_ops)],
        );
        let mut job = job(vec![]);
        let err = ResourceValidator::new(&clients).validate(&mut job).await.unwrap_err();
        assert_eq!(
            err.as_validation(),
            Some(&ValidationFailure::AlreadyExists {
                id: "/subscriptions/dest/resourcegroups/rg/providers/microsoft.compute/virtualmachines/vm".into()
            })
        );
    }

    #[tokio::test]
    async fn missing_group_is_probed_once() {
        let mut vm_ops = MockResourceOperations::new();
        vm_ops
            .expect_get()
            .times(1)
            .returning(|rg, _| Err(ProviderError::ResourceGroupNotFound(rg.to_string())));
        let mut nsg_ops = MockResourceOperations::new();
        nsg_ops.expect_get().never();
        let clients = clients(
            existing_group(),
            MockStorageAccountOperations::new(),
            MockNetworkOperations::new(),
            vec![
                (ResourceType::VirtualMachines, vm_ops),
                (ResourceType::NetworkSecurityGroups, nsg_ops),
            ],
        );
        let mut job = job(vec![json!({
            "id": format!("{SRC}/Microsoft.Network/networkSecurityGroups/nsg"),
            "securityRules": []
        })]);

        let outcome = ResourceValidator::new(&clients).validate(&mut job).await.unwrap();
        assert_eq!(outcome.new_resource_groups.iter().collect::<Vec<_>>(), vec!["rg"]);
        assert!(job.dependencies_of(ResourceType::NetworkSecurityGroups)[0].needs_deployment());
    }

    #[tokio::test]
    async fn existing_resource_in_other_location_is_rejected() {
        let mut nsg_ops = MockResourceOperations::new();
        nsg_ops.expect_get().returning(|_, _| Ok(json!({ "location": "chinanorth" })));
        let clients = clients(
            existing_group(),
            MockStorageAccountOperations::new(),
            MockNetworkOperations::new(),
            vec![(ResourceType::NetworkSecurityGroups, nsg_ops)],
        );
        let mut job = job(vec![json!({ "id": format!("{SRC}/Microsoft.Network/networkSecurityGroups/nsg") })]);

        let err = ResourceValidator::new(&clients).validate(&mut job).await.unwrap_err();
        assert!(matches!(
            err.as_validation(),
            Some(ValidationFailure::LocationMismatch { existing, .. }) if existing == "chinanorth"
        ));
    }

    #[tokio::test]
    async fn provider_failure_is_fatal() {
        let mut nsg_ops = MockResourceOperations::new();
        nsg_ops
            .expect_get()
            .returning(|_, _| Err(ProviderError::api("AuthorizationFailed", "denied")));
        let clients = clients(
            existing_group(),
            MockStorageAccountOperations::new(),
            MockNetworkOperations::new(),
            vec![(ResourceType::NetworkSecurityGroups, nsg_ops)],
        );
        let mut job = job(vec![json!({ "id": format!("{SRC}/Microsoft.Network/networkSecurityGroups/nsg") })]);

        let err = ResourceValidator::new(&clients).validate(&mut job).await.unwrap_err();
        assert!(matches!(err, MigrationError::Provider(ProviderError::Api { .. })));
        assert!(!err.is_user_correctable());
    }

    #[tokio::test]
    async fn encrypted_storage_account_is_rejected() {
        let clients = clients(
            existing_group(),
            MockStorageAccountOperations::new(),
            MockNetworkOperations::new(),
            vec![],
        );
        let mut account = storage_account("Storage", "Standard");
        account["encryption"] = json!({ "services": { "blob": { "enabled": true } } });
        let mut job = job(vec![account]);

        let err = ResourceValidator::new(&clients).validate(&mut job).await.unwrap_err();
        assert!(err.to_string().contains("Source storage account acct is encrypted"));
    }

    #[tokio::test]
    async fn free_storage_account_is_planned() {
        let mut storage = MockStorageAccountOperations::new();
        storage
            .expect_check_name_availability()
            .returning(|_| Ok(NameAvailability::available()));
        let mut groups = MockResourceGroupOperations::new();
        groups.expect_check_existence().returning(|_| Ok(false));
        let clients = clients(groups, storage, MockNetworkOperations::new(), vec![]);
        let mut job = job(vec![storage_account("Storage", "Standard")]);

        let outcome = ResourceValidator::new(&clients).validate(&mut job).await.unwrap();
        assert_eq!(outcome.new_storage_accounts.len(), 1);
        assert_eq!(outcome.new_storage_accounts[0].resource["kind"], "Storage");
        assert!(outcome.new_resource_groups.contains("rg"));
    }

    #[tokio::test]
    async fn existing_storage_account_kind_must_match() {
        let mut storage = MockStorageAccountOperations::new();
        storage
            .expect_check_name_availability()
            .returning(|name| Ok(NameAvailability::already_exists(name)));
        storage.expect_get_properties().returning(|_, _| {
            Ok(json!({ "location": "chinaeast", "kind": "BlobStorage", "sku": { "tier": "Standard" } }))
        });
        let clients = clients(existing_group(), storage, MockNetworkOperations::new(), vec![]);
        let mut job = job(vec![storage_account("Storage", "Standard")]);

        let err = ResourceValidator::new(&clients).validate(&mut job).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "validation failed: Storage account 'acct' already exists in resource group 'rg' but the kind 'BlobStorage' is incompatible"
        );
    }

    #[tokio::test]
    async fn compatible_storage_account_is_reused() {
        let mut storage = MockStorageAccountOperations::new();
        storage
            .expect_check_name_availability()
            .returning(|name| Ok(NameAvailability::already_exists(name)));
        storage.expect_get_properties().returning(|_, _| {
            Ok(json!({ "location": "ChinaEast", "kind": "Storage", "sku": { "tier": "Standard" } }))
        });
        let clients = clients(existing_group(), storage, MockNetworkOperations::new(), vec![]);
        let mut job = job(vec![storage_account("Storage", "Standard")]);

        let outcome = ResourceValidator::new(&clients).validate(&mut job).await.unwrap();
        assert!(outcome.new_storage_accounts.is_empty());
        assert!(!job.dependencies_of(ResourceType::StorageAccounts)[0].needs_deployment());
    }

    #[tokio::test]
    async fn storage_name_taken_elsewhere_reports_provider_message() {
        let mut storage = MockStorageAccountOperations::new();
        storage
            .expect_check_name_availability()
            .returning(|name| Ok(NameAvailability::already_exists(name)));
        storage
            .expect_get_properties()
            .returning(|_, name| Err(ProviderError::ResourceNotFound(name.to_string())));
        let clients = clients(existing_group(), storage, MockNetworkOperations::new(), vec![]);
        let mut job = job(vec![storage_account("Storage", "Standard")]);

        let err = ResourceValidator::new(&clients).validate(&mut job).await.unwrap_err();
        assert_eq!(
            err.as_validation(),
            Some(&ValidationFailure::StorageAccountUnavailable(
                "The storage account named acct is already taken.".into()
            ))
        );
    }

    #[tokio::test]
    async fn taken_dns_label_is_rejected() {
        let mut network = MockNetworkOperations::new();
        network.expect_check_dns_name_availability().returning(|location, label| {
            assert_eq!(location, "chinaeast");
            assert_eq!(label, "myapp");
            Ok(false)
        });
        let clients = clients(existing_group(), MockStorageAccountOperations::new(), network, vec![]);
        let mut job = job(vec![json!({
            "id": format!("{SRC}/Microsoft.Network/publicIPAddresses/pip"),
            "dnsSettings": { "domainNameLabel": "myapp" }
        })]);

        let err = ResourceValidator::new(&clients).validate(&mut job).await.unwrap_err();
        assert_eq!(
            err.as_validation(),
            Some(&ValidationFailure::DnsLabelTaken {
                label: "myapp".into(),
                location: "chinaeast".into()
            })
        );
    }

    #[tokio::test]
    async fn incompatible_existing_vnet_is_rejected() {
        let mut vnet_ops = MockResourceOperations::new();
        vnet_ops.expect_get().returning(|_, _| {
            Ok(json!({
                "location": "chinaeast",
                "subnets": [{ "name": "default", "addressPrefix": "10.9.0.0/24" }]
            }))
        });
        let clients = clients(
            existing_group(),
            MockStorageAccountOperations::new(),
            MockNetworkOperations::new(),
            vec![(ResourceType::VirtualNetworks, vnet_ops)],
        );
        let mut job = job(vec![json!({
            "id": format!("{SRC}/Microsoft.Network/virtualNetworks/vnet"),
            "subnets": [{ "name": "default", "addressPrefix": "10.0.0.0/24" }]
        })]);

        let err = ResourceValidator::new(&clients).validate(&mut job).await.unwrap_err();
        assert!(matches!(
            err.as_validation(),
            Some(ValidationFailure::VirtualNetworkIncompatible { subnet, .. }) if subnet == "default"
        ));
    }

    #[test]
    fn storage_sku_tier_must_match() {
        let id = ResourceId::parse(&format!("{SRC}/Microsoft.Storage/storageAccounts/acct"));
        let source: StorageAccountView =
            views::view(&storage_account("Storage", "Standard"), "storage account").unwrap();
        let existing_value = json!({ "location": "chinaeast", "kind": "Storage", "sku": { "tier": "Premium" } });
        let existing: StorageAccountView = views::view(&existing_value, "storage account").unwrap();

        let err = check_storage_compatibility(&id, &source, &existing, "chinaeast").unwrap_err();
        assert!(matches!(err, ValidationFailure::StorageSkuTierMismatch { tier, .. } if tier == "Premium"));
    }
}

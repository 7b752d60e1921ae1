//! Dependency resolution
//!
//! Walks the reference graph rooted at a virtual machine and returns every
//! resource that has to exist at the destination before the VM can be
//! created, plus descriptors of its disks.
//!
//! Independent branches (each NIC, each data disk, each IP configuration) are
//! fetched concurrently. A single [`DashSet`] of resource-level identifiers is
//! shared by every branch; its `insert` is an atomic check-then-set, so a
//! resource reachable along two paths is fetched and reported once.

use azmove_model::views::{
    self, LoadBalancerView, NetworkInterfaceView, VirtualMachineView, VirtualNetworkView,
};
use azmove_model::{
    BlobLocation, ModelError, ResourceDependency, ResourceId, ResourceIdKind, ResourceType, Vhd,
    VmDependency,
};
use dashmap::DashSet;
use futures::future::try_join_all;
use serde_json::Value;

use crate::clients::{get_by_id, ManagementClients};
use crate::error::MigrationError;

/// Resolves the dependency closure of a VM against source-side clients
pub struct DependencyResolver<'a> {
    clients: &'a ManagementClients,
    processed: DashSet<String>,
    storage_processed: DashSet<String>,
}

impl<'a> DependencyResolver<'a> {
    #[must_use]
    pub fn new(clients: &'a ManagementClients) -> Self {
        Self {
            clients,
            processed: DashSet::new(),
            storage_processed: DashSet::new(),
        }
    }

    /// Resolve the VM `name` in `resource_group`
    ///
    /// # Errors
    /// Returns a provider error if any fetch fails, or a configuration error
    /// if a disk is not blob-backed or its account is not in the subscription.
    #[tracing::instrument(skip(self), fields(subscription = self.clients.subscription_id()))]
    pub async fn resolve_vm(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<VmDependency, MigrationError> {
        let vm = self
            .clients
            .operations(ResourceType::VirtualMachines)?
            .get(resource_group, name)
            .await?;
        let vm_view: VirtualMachineView = views::view(&vm, "virtual machine")?;
        let mut dependency = ResourceDependency::new(vm);

        if let Some(availability_set) = &vm_view.availability_set {
            dependency.push(self.get_once(ResourceType::AvailabilitySets, &availability_set.id).await?);
        }

        let (os_disk, data_disks) = self.resolve_disks(&vm_view, &mut dependency).await?;

        let nics = vm_view
            .network_profile
            .as_ref()
            .map(|profile| profile.network_interfaces.as_slice())
            .unwrap_or_default();
        let nic_deps = try_join_all(nics.iter().map(|nic| self.nic_dependencies(&nic.id))).await?;
        for deps in nic_deps {
            dependency.extend(deps);
        }

        tracing::debug!(count = dependency.dependencies.len(), "resolved dependencies");
        Ok(VmDependency {
            dependency,
            os_disk,
            data_disks,
        })
    }

    async fn resolve_disks(
        &self,
        vm: &VirtualMachineView,
        dependency: &mut ResourceDependency,
    ) -> Result<(Vhd, Vec<Vhd>), MigrationError> {
        let accounts = self.clients.storage_accounts.list().await?;

        let os = &vm.storage_profile.os_disk;
        let os_uri = os
            .vhd
            .as_ref()
            .map(|vhd| vhd.uri.as_str())
            .ok_or_else(|| MigrationError::DiskWithoutBlob(os.name.clone().unwrap_or_default()))?;
        let os_location = BlobLocation::from_uri(os_uri)?;
        let os_group = storage_resource_group(&accounts, &os_location.storage_account)?;
        dependency.push(
            self.storage_account_once(&os_group, &os_location.storage_account)
                .await?,
        );
        let os_disk = Vhd::os_disk(&os_group, os_location, os_uri, os.os_type.clone());

        let mut data_disks = Vec::with_capacity(vm.storage_profile.data_disks.len());
        for disk in &vm.storage_profile.data_disks {
            let uri = disk.vhd.as_ref().map(|vhd| vhd.uri.as_str()).ok_or_else(|| {
                MigrationError::DiskWithoutBlob(
                    disk.name.clone().unwrap_or_else(|| format!("lun {}", disk.lun)),
                )
            })?;
            let location = BlobLocation::from_uri(uri)?;
            let group = storage_resource_group(&accounts, &location.storage_account)?;
            data_disks.push(Vhd::data_disk(&group, location, uri, disk.lun));
        }

        let accounts = try_join_all(
            data_disks
                .iter()
                .map(|disk| self.storage_account_once(&disk.resource_group, &disk.storage_account)),
        )
        .await?;
        for account in accounts {
            dependency.push(account);
        }

        Ok((os_disk, data_disks))
    }

    /// NIC, its IP configuration dependencies, and its NSG
    async fn nic_dependencies(&self, nic_id: &str) -> Result<Vec<Value>, MigrationError> {
        let Some(nic) = self.get_once(ResourceType::NetworkInterfaces, nic_id).await? else {
            return Ok(Vec::new());
        };
        let view: NetworkInterfaceView = views::view(&nic, "network interface")?;

        let mut deps = vec![nic];
        let per_config = try_join_all(
            view.ip_configurations
                .iter()
                .map(|config| self.ip_configuration_dependencies(config)),
        )
        .await?;
        deps.extend(per_config.into_iter().flatten());

        if let Some(nsg) = &view.network_security_group {
            deps.extend(self.get_once(ResourceType::NetworkSecurityGroups, &nsg.id).await?);
        }
        Ok(deps)
    }

    async fn ip_configuration_dependencies(
        &self,
        config: &views::IpConfigurationView,
    ) -> Result<Vec<Value>, MigrationError> {
        let vnet = async {
            match &config.subnet {
                Some(subnet) => self.vnet_dependencies(&subnet.id).await,
                None => Ok(Vec::new()),
            }
        };
        let pip = async {
            match &config.public_ip_address {
                Some(pip) => self.get_once(ResourceType::PublicIpAddresses, &pip.id).await,
                None => Ok(None),
            }
        };
        let lbs = try_join_all(
            config
                .load_balancer_backend_address_pools
                .iter()
                .chain(&config.load_balancer_inbound_nat_rules)
                .map(|reference| self.lb_dependencies(&reference.id)),
        );

        let (vnet, pip, lbs) = tokio::try_join!(vnet, pip, lbs)?;
        let mut deps = vnet;
        deps.extend(pip);
        deps.extend(lbs.into_iter().flatten());
        Ok(deps)
    }

    /// Virtual network owning `subnet_id`, plus NSGs on any of its subnets
    async fn vnet_dependencies(&self, subnet_id: &str) -> Result<Vec<Value>, MigrationError> {
        let Some(vnet) = self.get_once(ResourceType::VirtualNetworks, subnet_id).await? else {
            return Ok(Vec::new());
        };
        let view: VirtualNetworkView = views::view(&vnet, "virtual network")?;

        let nsgs = try_join_all(
            view.subnets
                .iter()
                .filter_map(|subnet| subnet.network_security_group.as_ref())
                .map(|nsg| self.get_once(ResourceType::NetworkSecurityGroups, &nsg.id)),
        )
        .await?;

        let mut deps = vec![vnet];
        deps.extend(nsgs.into_iter().flatten());
        Ok(deps)
    }

    /// Load balancer owning `sub_resource_id`, plus what its front-ends reference
    ///
    /// Public front-ends bring their public IP; internal ones bring the
    /// virtual network of their subnet.
    async fn lb_dependencies(&self, sub_resource_id: &str) -> Result<Vec<Value>, MigrationError> {
        let Some(lb) = self.get_once(ResourceType::LoadBalancers, sub_resource_id).await? else {
            return Ok(Vec::new());
        };
        let view: LoadBalancerView = views::view(&lb, "load balancer")?;
        let frontends = &view.frontend_ip_configurations;

        let pips = try_join_all(
            frontends
                .iter()
                .filter_map(|frontend| frontend.public_ip_address.as_ref())
                .map(|pip| self.get_once(ResourceType::PublicIpAddresses, &pip.id)),
        );
        let vnets = try_join_all(
            frontends
                .iter()
                .filter_map(|frontend| frontend.subnet.as_ref())
                .map(|subnet| self.vnet_dependencies(&subnet.id)),
        );
        let (pips, vnets) = tokio::try_join!(pips, vnets)?;

        let mut deps = vec![lb];
        deps.extend(pips.into_iter().flatten());
        deps.extend(vnets.into_iter().flatten());
        Ok(deps)
    }

    /// Fetch the resource owning `raw_id` unless some branch already did
    async fn get_once(&self, ty: ResourceType, raw_id: &str) -> Result<Option<Value>, MigrationError> {
        let id: ResourceId = raw_id.parse().map_err(ModelError::from)?;
        let key = id
            .format_at(ResourceIdKind::Resource)
            .unwrap_or_else(|| raw_id.to_lowercase());
        if !self.processed.insert(key) {
            tracing::trace!(id = raw_id, "already processed");
            return Ok(None);
        }

        let resource = get_by_id(self.clients.operations(ty)?, &id).await?;
        Ok(Some(resource))
    }

    async fn storage_account_once(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<Value>, MigrationError> {
        if !self.storage_processed.insert(name.to_lowercase()) {
            return Ok(None);
        }
        let account = self
            .clients
            .storage_accounts
            .get_properties(resource_group, name)
            .await?;
        Ok(Some(account))
    }
}

/// Resource group of the account named `account`, from the subscription's account list
fn storage_resource_group(accounts: &[Value], account: &str) -> Result<String, MigrationError> {
    let str_field = |value: &Value, field: &str| value.get(field).and_then(Value::as_str).map(str::to_owned);
    accounts
        .iter()
        .find(|value| str_field(value, "name").is_some_and(|name| name.eq_ignore_ascii_case(account)))
        .and_then(|value| str_field(value, "id"))
        .map(|id| ResourceId::parse(&id).resource_group().to_string())
        .ok_or_else(|| MigrationError::StorageAccountNotFound(account.to_string()))
}

//! Migration jobs
//!
//! A [`MigrationJob`] is built once from a resolved dependency set. Its shape
//! never changes afterwards; validation only attaches destination payloads,
//! and a [`VmMigrationJob`] later attaches the copied disk URIs.

use azmove_model::{
    MigrationSite, ModelError, ResourceDependency, ResourceId, ResourceIdError, ResourceInfo,
    ResourceMigrationInfo, ResourceType, Vhd, VmDependency,
};
use futures::future::try_join_all;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use serde_json::Value;

use crate::clients::{ResourceGroupOperations, StorageAccountOperations};
use crate::deploy::Deployable;
use crate::error::MigrationError;
use crate::observer::{MigrationEvent, MigrationObserver};

/// Known tag of `id`'s resource type
///
/// # Errors
/// Returns an unsupported-type error for resource types the engine does not migrate.
pub fn resource_type_of(id: &ResourceId) -> Result<ResourceType, MigrationError> {
    id.resource_type_tag().ok_or_else(|| {
        ModelError::from(ResourceIdError::UnsupportedType(id.resource_type().to_string())).into()
    })
}

/// Root resource and its dependencies, planned for one destination
#[derive(Debug, Clone, Serialize)]
pub struct MigrationJob {
    pub source: MigrationSite,
    pub destination: MigrationSite,
    pub destination_location: String,
    pub root: ResourceMigrationInfo,
    /// Insertion order is discovery order
    pub dependencies: IndexMap<ResourceType, Vec<ResourceMigrationInfo>>,
}

impl MigrationJob {
    /// Plan every resource of `resolved` for `destination`
    ///
    /// # Errors
    /// Returns a model error if a payload has no parsable id or an unsupported type.
    pub fn new(
        source: MigrationSite,
        destination: MigrationSite,
        destination_location: impl Into<String>,
        resolved: ResourceDependency,
    ) -> Result<Self, MigrationError> {
        let subscription = destination.subscription_id.clone();
        let root = ResourceMigrationInfo::from_source(ResourceInfo::from_resource(resolved.root)?, &subscription);

        let mut job = Self {
            source,
            destination,
            destination_location: destination_location.into(),
            root,
            dependencies: IndexMap::new(),
        };
        for resource in resolved.dependencies {
            let info = ResourceInfo::from_resource(resource)?;
            let ty = resource_type_of(&info.id)?;
            job.add_dependency(ty, ResourceMigrationInfo::from_source(info, &subscription));
        }
        Ok(job)
    }

    pub fn add_dependency(&mut self, ty: ResourceType, info: ResourceMigrationInfo) {
        self.dependencies.entry(ty).or_default().push(info);
    }

    /// Dependencies of one type, in discovery order
    #[must_use]
    pub fn dependencies_of(&self, ty: ResourceType) -> &[ResourceMigrationInfo] {
        self.dependencies.get(&ty).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn dependency_count(&self) -> usize {
        self.dependencies.values().map(Vec::len).sum()
    }

    /// Every planned resource, root first
    pub fn resources(&self) -> impl Iterator<Item = &ResourceMigrationInfo> {
        std::iter::once(&self.root).chain(self.dependencies.values().flatten())
    }
}

/// Create the resource groups validation found missing
///
/// # Errors
/// Returns the first provider failure; every create is awaited.
pub async fn ensure_resource_groups(
    ops: &dyn ResourceGroupOperations,
    groups: &IndexSet<String>,
    location: &str,
    observer: &dyn MigrationObserver,
) -> Result<(), MigrationError> {
    try_join_all(groups.iter().map(|name| {
        observer.on_event(&MigrationEvent::ResourceGroupCreating { name: name.clone() });
        ops.create_or_update(name, location)
    }))
    .await?;
    Ok(())
}

/// Create the storage accounts validation found missing
///
/// # Errors
/// Returns the first provider failure.
pub async fn ensure_storage_accounts(
    ops: &dyn StorageAccountOperations,
    accounts: &[ResourceInfo],
    observer: &dyn MigrationObserver,
) -> Result<(), MigrationError> {
    try_join_all(accounts.iter().map(|account| {
        observer.on_event(&MigrationEvent::StorageAccountCreating {
            id: account.id.to_string(),
        });
        ops.create(
            account.id.resource_group(),
            account.id.resource_name(),
            account.resource.clone(),
        )
    }))
    .await?;
    Ok(())
}

/// A job whose root is a virtual machine, with its disks
#[derive(Debug, Clone, Serialize)]
pub struct VmMigrationJob {
    pub job: MigrationJob,
    pub os_disk: Vhd,
    pub data_disks: Vec<Vhd>,
}

impl VmMigrationJob {
    /// # Errors
    /// See [`MigrationJob::new`].
    pub fn new(
        source: MigrationSite,
        destination: MigrationSite,
        destination_location: impl Into<String>,
        resolved: VmDependency,
    ) -> Result<Self, MigrationError> {
        Ok(Self {
            job: MigrationJob::new(source, destination, destination_location, resolved.dependency)?,
            os_disk: resolved.os_disk,
            data_disks: resolved.data_disks,
        })
    }

    /// OS disk first, then data disks
    pub fn disks(&self) -> impl Iterator<Item = &Vhd> {
        std::iter::once(&self.os_disk).chain(&self.data_disks)
    }

    pub fn disks_mut(&mut self) -> impl Iterator<Item = &mut Vhd> {
        std::iter::once(&mut self.os_disk).chain(&mut self.data_disks)
    }

    /// Point the VM payload's disks at their copied blobs
    ///
    /// Data disks are matched by LUN. Does nothing when the VM is not
    /// going to be created.
    ///
    /// # Errors
    /// Returns [`MigrationError::DataDiskNotProcessed`] for a payload disk
    /// with no copied counterpart.
    pub fn attach_disk_uris(&mut self) -> Result<(), MigrationError> {
        let Some(storage) = self
            .job
            .root
            .destination
            .resource
            .as_mut()
            .and_then(|payload| payload.get_mut("storageProfile"))
        else {
            return Ok(());
        };

        if let Some(vhd) = storage.pointer_mut("/osDisk/vhd") {
            set_uri(vhd, &self.os_disk.uri);
        }

        let data_disks = storage.get_mut("dataDisks").and_then(Value::as_array_mut);
        for disk in data_disks.into_iter().flatten() {
            let lun = disk.get("lun").and_then(Value::as_i64);
            let copied = self
                .data_disks
                .iter()
                .find(|copied| lun.is_some() && copied.lun() == lun)
                .ok_or_else(|| {
                    let name = disk
                        .get("name")
                        .and_then(Value::as_str)
                        .map_or_else(|| format!("lun {}", lun.unwrap_or_default()), str::to_owned);
                    MigrationError::DataDiskNotProcessed(name)
                })?;
            if let Some(vhd) = disk.get_mut("vhd") {
                set_uri(vhd, &copied.uri);
            }
        }
        Ok(())
    }

    /// Deployment phases of a VM migration
    ///
    /// {availability sets, NSGs, public IPs} → {virtual networks} →
    /// {load balancers} → {network interfaces} → {the VM}
    #[must_use]
    pub fn to_deployable(&self) -> Deployable<'_> {
        let job = &self.job;
        let mut deployable = Deployable::new();
        deployable.add_phase(&[
            job.dependencies_of(ResourceType::AvailabilitySets),
            job.dependencies_of(ResourceType::NetworkSecurityGroups),
            job.dependencies_of(ResourceType::PublicIpAddresses),
        ]);
        deployable.add_phase(&[job.dependencies_of(ResourceType::VirtualNetworks)]);
        deployable.add_phase(&[job.dependencies_of(ResourceType::LoadBalancers)]);
        deployable.add_phase(&[job.dependencies_of(ResourceType::NetworkInterfaces)]);
        deployable.add_phase(&[std::slice::from_ref(&job.root)]);
        deployable
    }
}

fn set_uri(vhd: &mut Value, uri: &str) {
    if let Some(map) = vhd.as_object_mut() {
        map.insert("uri".to_string(), Value::String(uri.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use azmove_model::{BlobLocation, CloudEnvironment};
    use serde_json::json;

    use super::*;

    const SRC: &str = "/subscriptions/src/resourceGroups/rg/providers";

    fn sites() -> (MigrationSite, MigrationSite) {
        (
            MigrationSite::new(CloudEnvironment::AzureCloud, "src"),
            MigrationSite::new(CloudEnvironment::AzureChinaCloud, "dest"),
        )
    }

    fn disk(uri: &str, lun: Option<i64>) -> Vhd {
        let location = BlobLocation::from_uri(uri).unwrap();
        match lun {
            Some(lun) => Vhd::data_disk("rg", location, uri, lun),
            None => Vhd::os_disk("rg", location, uri, Some("Linux".into())),
        }
    }

    fn vm_job() -> VmMigrationJob {
        let mut dependency = ResourceDependency::new(json!({
            "id": format!("{SRC}/Microsoft.Compute/virtualMachines/vm")
        }));
        dependency.extend([
            json!({ "id": format!("{SRC}/Microsoft.Network/networkInterfaces/nic") }),
            json!({ "id": format!("{SRC}/Microsoft.Network/virtualNetworks/vnet") }),
            json!({ "id": format!("{SRC}/Microsoft.Network/networkInterfaces/nic2") }),
        ]);
        let (source, destination) = sites();
        VmMigrationJob::new(
            source,
            destination,
            "chinaeast",
            VmDependency {
                dependency,
                os_disk: disk("https://a.blob.core.windows.net/vhds/os.vhd", None),
                data_disks: vec![
                    disk("https://a.blob.core.windows.net/vhds/d1.vhd", Some(1)),
                    disk("https://a.blob.core.windows.net/vhds/d0.vhd", Some(0)),
                ],
            },
        )
        .unwrap()
    }

    #[test]
    fn dependencies_grouped_in_discovery_order() {
        let job = vm_job();
        let types: Vec<_> = job.job.dependencies.keys().copied().collect();
        assert_eq!(types, vec![ResourceType::NetworkInterfaces, ResourceType::VirtualNetworks]);
        assert_eq!(job.job.dependencies_of(ResourceType::NetworkInterfaces).len(), 2);
        assert_eq!(job.job.dependency_count(), 3);
        assert_eq!(job.job.root.destination.id.subscription_id(), "dest");
        assert_eq!(job.job.resources().count(), 4);
    }

    #[test]
    fn unsupported_dependency_type_is_rejected() {
        let mut dependency = ResourceDependency::new(json!({
            "id": format!("{SRC}/Microsoft.Compute/virtualMachines/vm")
        }));
        dependency.push(Some(json!({ "id": format!("{SRC}/Microsoft.Compute/disks/d") })));
        let (source, destination) = sites();
        let err = MigrationJob::new(source, destination, "chinaeast", dependency).unwrap_err();
        assert_eq!(err.to_string(), "unsupported resource type 'disks'");
    }

    #[test]
    fn disk_uris_attached_by_lun() {
        let mut job = vm_job();
        job.job.root.set_payload(json!({
            "storageProfile": {
                "osDisk": { "vhd": { "uri": "old-os" } },
                "dataDisks": [
                    { "lun": 0, "name": "d0", "vhd": { "uri": "old-0" } },
                    { "lun": 1, "name": "d1", "vhd": { "uri": "old-1" } }
                ]
            }
        }));
        for disk in job.disks_mut() {
            let uri = disk.uri.replace("windows.net", "chinacloudapi.cn");
            disk.set_destination(uri);
        }

        job.attach_disk_uris().unwrap();

        let storage = &job.job.root.destination.resource.as_ref().unwrap()["storageProfile"];
        assert_eq!(storage["osDisk"]["vhd"]["uri"], "https://a.blob.core.chinacloudapi.cn/vhds/os.vhd");
        assert_eq!(storage["dataDisks"][0]["vhd"]["uri"], "https://a.blob.core.chinacloudapi.cn/vhds/d0.vhd");
        assert_eq!(storage["dataDisks"][1]["vhd"]["uri"], "https://a.blob.core.chinacloudapi.cn/vhds/d1.vhd");
    }

    #[test]
    fn unmatched_data_disk_is_reported() {
        let mut job = vm_job();
        job.job.root.set_payload(json!({
            "storageProfile": { "dataDisks": [{ "lun": 7, "name": "logs", "vhd": { "uri": "x" } }] }
        }));
        let err = job.attach_disk_uris().unwrap_err();
        assert_eq!(err.to_string(), "Couldn't find 'logs' in the processed data disks");
    }

    #[test]
    fn phases_follow_dependency_order() {
        let job = vm_job();
        let deployable = job.to_deployable();
        let phases = deployable.phases();
        assert_eq!(phases.len(), 5);
        assert!(phases[0].is_empty());
        assert_eq!(phases[1].len(), 1);
        assert_eq!(phases[3].len(), 2);
        assert_eq!(phases[4][0].source.id.resource_name(), "vm");
    }
}

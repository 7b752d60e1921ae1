//! Payload builders and a seeded two-cloud scenario

use std::sync::Arc;

use azmove_core::clients::{PageRange, Usage, VmSize};
use azmove_model::{CloudEnvironment, MigrationOptions, ResourceType};
use serde_json::{json, Value};

use crate::{blob_suffix, resource_path, FakeBlobAccount, FakeCloud};

pub const SOURCE_SUBSCRIPTION: &str = "src-sub";
pub const DESTINATION_SUBSCRIPTION: &str = "dst-sub";
pub const RESOURCE_GROUP: &str = "web-rg";
pub const SOURCE_LOCATION: &str = "westus";
pub const DESTINATION_LOCATION: &str = "chinaeast";
pub const VM_NAME: &str = "web-vm";
pub const VM_SIZE: &str = "Standard_A1";
pub const STORAGE_ACCOUNT: &str = "websa";
pub const VHD_CONTAINER: &str = "vhds";
pub const OS_BLOB: &str = "web-vm-os.vhd";
pub const DATA_BLOB: &str = "web-vm-data0.vhd";
pub const VIRTUAL_NETWORK: &str = "web-vnet";
pub const SUBNET: &str = "default";
pub const SUBNET_PREFIX: &str = "10.0.0.0/24";
pub const NSG: &str = "web-nsg";
pub const PUBLIC_IP: &str = "web-pip";
pub const DNS_LABEL: &str = "web-vm-label";
pub const AVAILABILITY_SET: &str = "web-as";
pub const PRIMARY_NIC: &str = "web-nic1";
pub const SECONDARY_NIC: &str = "web-nic2";

/// Pages allocated in every seeded disk blob
pub fn disk_pages() -> Vec<PageRange> {
    vec![PageRange { start: 0, end: 511 }, PageRange { start: 1024, end: 2047 }]
}

pub fn reference(id: &str) -> Value {
    json!({ "id": id })
}

pub fn availability_set(subscription_id: &str, resource_group: &str, name: &str, location: &str) -> Value {
    json!({
        "id": resource_path(subscription_id, resource_group, ResourceType::AvailabilitySets, name),
        "name": name,
        "location": location,
        "platformUpdateDomainCount": 5,
        "platformFaultDomainCount": 3
    })
}

pub fn network_security_group(subscription_id: &str, resource_group: &str, name: &str, location: &str) -> Value {
    json!({
        "id": resource_path(subscription_id, resource_group, ResourceType::NetworkSecurityGroups, name),
        "name": name,
        "location": location,
        "securityRules": [{
            "name": "allow-ssh",
            "protocol": "Tcp",
            "destinationPortRange": "22",
            "access": "Allow",
            "direction": "Inbound",
            "priority": 100
        }]
    })
}

pub fn public_ip_address(
    subscription_id: &str,
    resource_group: &str,
    name: &str,
    location: &str,
    dns_label: Option<&str>,
) -> Value {
    let mut pip = json!({
        "id": resource_path(subscription_id, resource_group, ResourceType::PublicIpAddresses, name),
        "name": name,
        "location": location,
        "publicIPAllocationMethod": "Dynamic"
    });
    if let Some(label) = dns_label {
        pip["dnsSettings"] = json!({ "domainNameLabel": label, "fqdn": format!("{label}.{location}.cloudapp.net") });
    }
    pip
}

/// Virtual network with one subnet, optionally guarded by `nsg_id`
pub fn virtual_network(
    subscription_id: &str,
    resource_group: &str,
    name: &str,
    location: &str,
    subnet_prefix: &str,
    nsg_id: Option<&str>,
) -> Value {
    let id = resource_path(subscription_id, resource_group, ResourceType::VirtualNetworks, name);
    let mut subnet = json!({
        "id": format!("{id}/subnets/{SUBNET}"),
        "name": SUBNET,
        "addressPrefix": subnet_prefix
    });
    if let Some(nsg) = nsg_id {
        subnet["networkSecurityGroup"] = reference(nsg);
    }
    json!({
        "id": id,
        "name": name,
        "location": location,
        "addressSpace": { "addressPrefixes": ["10.0.0.0/16"] },
        "subnets": [subnet]
    })
}

/// Network interface with a single IP configuration
pub fn network_interface(
    subscription_id: &str,
    resource_group: &str,
    name: &str,
    location: &str,
    subnet_id: &str,
    public_ip_id: Option<&str>,
    nsg_id: Option<&str>,
) -> Value {
    let id = resource_path(subscription_id, resource_group, ResourceType::NetworkInterfaces, name);
    let mut config = json!({
        "id": format!("{id}/ipConfigurations/ipconfig1"),
        "name": "ipconfig1",
        "privateIPAllocationMethod": "Dynamic",
        "subnet": reference(subnet_id)
    });
    if let Some(pip) = public_ip_id {
        config["publicIPAddress"] = reference(pip);
    }
    let mut nic = json!({
        "id": id,
        "name": name,
        "location": location,
        "enableIPForwarding": false,
        "ipConfigurations": [config]
    });
    if let Some(nsg) = nsg_id {
        nic["networkSecurityGroup"] = reference(nsg);
    }
    nic
}

/// Blob-backed storage account payload, without id or endpoints
pub fn storage_account(location: &str) -> Value {
    json!({
        "location": location,
        "kind": "Storage",
        "sku": { "name": "Standard_LRS", "tier": "Standard" }
    })
}

/// Blob URL of a disk in `account`
pub fn vhd_uri(environment: CloudEnvironment, account: &str, blob: &str) -> String {
    format!("https://{account}.{}/{VHD_CONTAINER}/{blob}", blob_suffix(environment))
}

pub struct VirtualMachineSpec<'a> {
    pub subscription_id: &'a str,
    pub resource_group: &'a str,
    pub name: &'a str,
    pub location: &'a str,
    pub vm_size: &'a str,
    pub os_disk_uri: &'a str,
    /// `(lun, uri)` per data disk
    pub data_disks: Vec<(i64, String)>,
    pub nic_ids: Vec<String>,
    pub availability_set_id: Option<String>,
}

pub fn virtual_machine(spec: &VirtualMachineSpec<'_>) -> Value {
    let data_disks: Vec<Value> = spec
        .data_disks
        .iter()
        .map(|(lun, uri)| {
            json!({
                "lun": lun,
                "name": format!("{}-data{lun}", spec.name),
                "createOption": "Empty",
                "diskSizeGB": 128,
                "caching": "None",
                "vhd": { "uri": uri }
            })
        })
        .collect();
    let nics: Vec<Value> = spec
        .nic_ids
        .iter()
        .enumerate()
        .map(|(index, id)| json!({ "id": id, "primary": index == 0 }))
        .collect();

    let mut vm = json!({
        "id": resource_path(spec.subscription_id, spec.resource_group, ResourceType::VirtualMachines, spec.name),
        "name": spec.name,
        "location": spec.location,
        "provisioningState": "Succeeded",
        "hardwareProfile": { "vmSize": spec.vm_size },
        "storageProfile": {
            "imageReference": { "publisher": "Canonical", "offer": "UbuntuServer", "sku": "16.04-LTS", "version": "latest" },
            "osDisk": {
                "osType": "Linux",
                "name": format!("{}-os", spec.name),
                "createOption": "FromImage",
                "caching": "ReadWrite",
                "vhd": { "uri": spec.os_disk_uri }
            },
            "dataDisks": data_disks
        },
        "osProfile": { "computerName": spec.name, "adminUsername": "azureuser" },
        "networkProfile": { "networkInterfaces": nics }
    });
    if let Some(availability_set) = &spec.availability_set_id {
        vm["availabilitySet"] = reference(availability_set);
    }
    vm
}

/// Generous destination quota covering every type the scenario creates
pub fn roomy_quota(cloud: &FakeCloud) {
    cloud.set_compute_usages(vec![
        Usage::new("cores", 0, 100),
        Usage::new("standardA0_A7Family", 0, 100),
        Usage::new("standardDFamily", 0, 100),
        Usage::new("virtualMachines", 0, 100),
        Usage::new("availabilitySets", 0, 100),
    ]);
    cloud.set_network_usages(vec![
        Usage::new("VirtualNetworks", 0, 50),
        Usage::new("NetworkInterfaces", 0, 50),
        Usage::new("PublicIPAddresses", 0, 50),
        Usage::new("NetworkSecurityGroups", 0, 50),
        Usage::new("LoadBalancers", 0, 50),
    ]);
    cloud.set_storage_usages(vec![Usage::new("StorageAccounts", 0, 50)]);
    cloud.set_vm_sizes(vec![
        VmSize {
            name: "Standard_A1".to_string(),
            number_of_cores: 1,
        },
        VmSize {
            name: "Standard_D3".to_string(),
            number_of_cores: 4,
        },
    ]);
}

/// A Linux VM in a public cloud subscription and an empty China cloud subscription
///
/// Both NICs sit on the same subnet, so the virtual network is reachable
/// along two paths.
pub struct WebScenario {
    pub source: Arc<FakeCloud>,
    pub destination: Arc<FakeCloud>,
    pub source_blobs: Arc<FakeBlobAccount>,
}

impl Default for WebScenario {
    fn default() -> Self {
        Self::new()
    }
}

impl WebScenario {
    pub fn new() -> Self {
        let source = FakeCloud::new(CloudEnvironment::AzureCloud, SOURCE_SUBSCRIPTION);
        let destination = FakeCloud::new(CloudEnvironment::AzureChinaCloud, DESTINATION_SUBSCRIPTION);
        roomy_quota(&destination);

        let (sub, rg, loc) = (SOURCE_SUBSCRIPTION, RESOURCE_GROUP, SOURCE_LOCATION);
        source.add_resource_group(rg, loc);
        let source_blobs = source.add_storage_account(rg, STORAGE_ACCOUNT, storage_account(loc));
        source_blobs.add_blob(VHD_CONTAINER, OS_BLOB, disk_pages());
        source_blobs.add_blob(VHD_CONTAINER, DATA_BLOB, disk_pages());

        let nsg_id = resource_path(sub, rg, ResourceType::NetworkSecurityGroups, NSG);
        let pip_id = resource_path(sub, rg, ResourceType::PublicIpAddresses, PUBLIC_IP);
        let vnet_id = resource_path(sub, rg, ResourceType::VirtualNetworks, VIRTUAL_NETWORK);
        let subnet_id = format!("{vnet_id}/subnets/{SUBNET}");

        source.add_resource(network_security_group(sub, rg, NSG, loc));
        source.add_resource(public_ip_address(sub, rg, PUBLIC_IP, loc, Some(DNS_LABEL)));
        source.add_resource(virtual_network(sub, rg, VIRTUAL_NETWORK, loc, SUBNET_PREFIX, Some(&nsg_id)));
        source.add_resource(availability_set(sub, rg, AVAILABILITY_SET, loc));
        source.add_resource(network_interface(
            sub,
            rg,
            PRIMARY_NIC,
            loc,
            &subnet_id,
            Some(&pip_id),
            Some(&nsg_id),
        ));
        source.add_resource(network_interface(sub, rg, SECONDARY_NIC, loc, &subnet_id, None, None));

        let environment = CloudEnvironment::AzureCloud;
        source.add_resource(virtual_machine(&VirtualMachineSpec {
            subscription_id: sub,
            resource_group: rg,
            name: VM_NAME,
            location: loc,
            vm_size: VM_SIZE,
            os_disk_uri: &vhd_uri(environment, STORAGE_ACCOUNT, OS_BLOB),
            data_disks: vec![(0, vhd_uri(environment, STORAGE_ACCOUNT, DATA_BLOB))],
            nic_ids: vec![
                resource_path(sub, rg, ResourceType::NetworkInterfaces, PRIMARY_NIC),
                resource_path(sub, rg, ResourceType::NetworkInterfaces, SECONDARY_NIC),
            ],
            availability_set_id: Some(resource_path(sub, rg, ResourceType::AvailabilitySets, AVAILABILITY_SET)),
        }));

        Self {
            source,
            destination,
            source_blobs,
        }
    }

    /// Options moving the scenario VM, with an explicit destination location
    pub fn options(&self) -> MigrationOptions {
        MigrationOptions::new(
            self.source.site().clone(),
            self.destination.site().clone(),
            RESOURCE_GROUP,
            VM_NAME,
        )
        .with_destination_location(DESTINATION_LOCATION)
    }

    /// Seed the destination with a virtual network the migration can reuse
    pub fn existing_destination_network(&self, subnet_prefix: &str) {
        let vnet = virtual_network(
            DESTINATION_SUBSCRIPTION,
            RESOURCE_GROUP,
            VIRTUAL_NETWORK,
            DESTINATION_LOCATION,
            subnet_prefix,
            None,
        );
        self.destination.add_resource(vnet);
    }
}

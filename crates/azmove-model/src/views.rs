//! Typed read views over provider payloads
//!
//! Payloads travel as raw [`serde_json::Value`] so unknown fields survive
//! untouched; these views deserialize only the fields the engine inspects.
//! Shapes follow the flattened management-SDK model (`storageProfile`,
//! `ipConfigurations`, ... at the top level).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ModelError;

/// Deserialize a view borrowing from `value`
///
/// # Errors
/// Returns [`ModelError::Payload`] when the payload does not have the expected shape.
pub fn view<'a, T: Deserialize<'a>>(value: &'a Value, what: &'static str) -> Result<T, ModelError> {
    T::deserialize(value).map_err(|source| ModelError::Payload { what, source })
}

/// `{ "id": ... }` reference to another resource or sub-resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubResourceRef {
    pub id: String,
}

/// Fields every resource payload carries
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSummary {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineView {
    #[serde(default)]
    pub location: Option<String>,
    pub hardware_profile: HardwareProfile,
    pub storage_profile: StorageProfile,
    #[serde(default)]
    pub network_profile: Option<NetworkProfile>,
    #[serde(default)]
    pub availability_set: Option<SubResourceRef>,
    #[serde(default)]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareProfile {
    pub vm_size: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageProfile {
    pub os_disk: OsDiskView,
    #[serde(default)]
    pub data_disks: Vec<DataDiskView>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OsDiskView {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub os_type: Option<String>,
    #[serde(default)]
    pub vhd: Option<VhdRef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataDiskView {
    pub lun: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub vhd: Option<VhdRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VhdRef {
    pub uri: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkProfile {
    #[serde(default)]
    pub network_interfaces: Vec<SubResourceRef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterfaceView {
    #[serde(default)]
    pub ip_configurations: Vec<IpConfigurationView>,
    #[serde(default)]
    pub network_security_group: Option<SubResourceRef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpConfigurationView {
    #[serde(default)]
    pub subnet: Option<SubResourceRef>,
    #[serde(default, rename = "publicIPAddress")]
    pub public_ip_address: Option<SubResourceRef>,
    #[serde(default)]
    pub load_balancer_backend_address_pools: Vec<SubResourceRef>,
    #[serde(default)]
    pub load_balancer_inbound_nat_rules: Vec<SubResourceRef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkView {
    #[serde(default)]
    pub subnets: Vec<SubnetView>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetView {
    pub name: String,
    #[serde(default)]
    pub address_prefix: Option<String>,
    #[serde(default)]
    pub network_security_group: Option<SubResourceRef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerView {
    #[serde(default, rename = "frontendIPConfigurations")]
    pub frontend_ip_configurations: Vec<FrontendIpConfigurationView>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrontendIpConfigurationView {
    #[serde(default, rename = "publicIPAddress")]
    pub public_ip_address: Option<SubResourceRef>,
    #[serde(default)]
    pub subnet: Option<SubResourceRef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIpAddressView {
    #[serde(default)]
    pub dns_settings: Option<PublicIpDnsSettings>,
    #[serde(default)]
    pub ip_configuration: Option<SubResourceRef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIpDnsSettings {
    #[serde(default)]
    pub domain_name_label: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageAccountView {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub sku: Option<StorageSku>,
    #[serde(default)]
    pub encryption: Option<Value>,
    #[serde(default)]
    pub primary_endpoints: Option<StorageEndpoints>,
}

impl StorageAccountView {
    /// SKU tier, if reported
    #[must_use]
    pub fn sku_tier(&self) -> Option<&str> {
        self.sku.as_ref().and_then(|sku| sku.tier.as_deref())
    }

    /// Whether the account uses server-side encryption
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.encryption.as_ref().is_some_and(|e| !e.is_null())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSku {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tier: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageEndpoints {
    #[serde(default)]
    pub blob: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn vm_view_reads_flattened_profiles() {
        let vm = json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm",
            "location": "westus",
            "hardwareProfile": { "vmSize": "Standard_A1" },
            "storageProfile": {
                "osDisk": { "osType": "Linux", "vhd": { "uri": "https://a.blob.core.windows.net/vhds/os.vhd" } },
                "dataDisks": [{ "lun": 0, "vhd": { "uri": "https://a.blob.core.windows.net/vhds/d0.vhd" } }]
            },
            "networkProfile": { "networkInterfaces": [{ "id": "nic-id" }] }
        });
        let view: VirtualMachineView = view(&vm, "virtual machine").unwrap();
        assert_eq!(view.hardware_profile.vm_size, "Standard_A1");
        assert_eq!(view.storage_profile.data_disks[0].lun, 0);
        assert_eq!(view.network_profile.unwrap().network_interfaces[0].id, "nic-id");
        assert!(view.availability_set.is_none());
    }

    #[test]
    fn ip_configuration_uses_sdk_casing() {
        let cfg = json!({
            "subnet": { "id": "subnet-id" },
            "publicIPAddress": { "id": "pip-id" },
            "loadBalancerBackendAddressPools": [{ "id": "pool-id" }]
        });
        let view: IpConfigurationView = view(&cfg, "ip configuration").unwrap();
        assert_eq!(view.public_ip_address.unwrap().id, "pip-id");
        assert_eq!(view.load_balancer_backend_address_pools.len(), 1);
        assert!(view.load_balancer_inbound_nat_rules.is_empty());
    }

    #[test]
    fn storage_encryption_detection() {
        let plain: StorageAccountView = view(&json!({ "kind": "Storage" }), "storage account").unwrap();
        assert!(!plain.is_encrypted());
        let encrypted: StorageAccountView = view(
            &json!({ "encryption": { "services": { "blob": { "enabled": true } } } }),
            "storage account",
        )
        .unwrap();
        assert!(encrypted.is_encrypted());
    }

    #[test]
    fn malformed_payload_names_the_view() {
        let err = view::<VirtualMachineView>(&json!({}), "virtual machine").unwrap_err();
        assert!(err.to_string().starts_with("malformed virtual machine payload"));
    }
}

//! Per-type validation rules
//!
//! Each migratable resource type implements [`ResourceValidation`]: the name
//! rule, whether a same-named destination resource is acceptable, and a pure
//! payload transformation `(source payload, context) -> destination payload`.

use azmove_model::{ResourceId, ResourceMigrationInfo, ResourceType};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};

use super::names::{self, NameRule};
use super::references::{
    copy_fields, each_mut, remove_fields, reroot_sub_resource_ref, rewrite_resource_ref,
    rewrite_sub_resource_ref, strip_server_fields,
};
use crate::error::ValidationFailure;

const ATTACH: &str = "Attach";

/// What a payload transformation may look at besides its own source
#[derive(Debug, Clone, Copy)]
pub struct PayloadContext<'a> {
    pub location: &'a str,
    pub dependencies: &'a IndexMap<ResourceType, Vec<ResourceMigrationInfo>>,
}

impl<'a> PayloadContext<'a> {
    #[must_use]
    pub fn new(location: &'a str, dependencies: &'a IndexMap<ResourceType, Vec<ResourceMigrationInfo>>) -> Self {
        Self { location, dependencies }
    }

    /// Dependencies of one type, in discovery order
    #[must_use]
    pub fn of_type(&self, ty: ResourceType) -> &'a [ResourceMigrationInfo] {
        self.dependencies.get(&ty).map_or(&[], Vec::as_slice)
    }
}

/// Validation behavior of one resource type
pub trait ResourceValidation: Send + Sync {
    fn resource_type(&self) -> ResourceType;

    fn name_rule(&self) -> NameRule;

    /// # Errors
    /// Returns the length or character failure of [`Self::name_rule`].
    fn validate_name(&self, name: &str) -> Result<(), ValidationFailure> {
        self.name_rule().validate(name)
    }

    /// Whether an existing destination resource with the same id is an error
    fn must_not_preexist(&self) -> bool {
        false
    }

    /// Build the destination create payload
    ///
    /// # Errors
    /// Returns a dependency-not-found failure when an embedded reference
    /// has no counterpart among the job's dependencies.
    fn prepare_payload(
        &self,
        source: &Value,
        destination: &ResourceId,
        ctx: &PayloadContext<'_>,
    ) -> Result<Value, ValidationFailure>;
}

/// Rules for `ty`
#[must_use]
pub fn rules_for(ty: ResourceType) -> &'static dyn ResourceValidation {
    match ty {
        ResourceType::AvailabilitySets => &AvailabilitySetRules,
        ResourceType::LoadBalancers => &LoadBalancerRules,
        ResourceType::NetworkInterfaces => &NetworkInterfaceRules,
        ResourceType::NetworkSecurityGroups => &NetworkSecurityGroupRules,
        ResourceType::PublicIpAddresses => &PublicIpAddressRules,
        ResourceType::StorageAccounts => &StorageAccountRules,
        ResourceType::VirtualMachines => &VirtualMachineRules,
        ResourceType::VirtualNetworks => &VirtualNetworkRules,
    }
}

/// `location` plus a copy of the source tags
fn base_payload(source: &Value, location: &str) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("location".to_string(), Value::String(location.to_string()));
    copy_fields(source, &mut payload, &["tags"]);
    payload
}

/// Clone the reference at `field` into `payload`, pointed at the destination
fn copy_resource_ref(
    source: &Value,
    payload: &mut Map<String, Value>,
    field: &str,
    dependencies: &[ResourceMigrationInfo],
) -> Result<(), ValidationFailure> {
    if let Some(reference) = source.get(field).filter(|value| !value.is_null()) {
        let mut reference = reference.clone();
        rewrite_resource_ref(&mut reference, dependencies)?;
        payload.insert(field.to_string(), reference);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub struct StorageAccountRules;

impl ResourceValidation for StorageAccountRules {
    fn resource_type(&self) -> ResourceType {
        ResourceType::StorageAccounts
    }

    fn name_rule(&self) -> NameRule {
        names::STORAGE_ACCOUNT
    }

    fn prepare_payload(
        &self,
        source: &Value,
        _destination: &ResourceId,
        ctx: &PayloadContext<'_>,
    ) -> Result<Value, ValidationFailure> {
        let mut payload = base_payload(source, ctx.location);
        copy_fields(source, &mut payload, &["kind", "sku", "accessTier"]);
        Ok(Value::Object(payload))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AvailabilitySetRules;

impl ResourceValidation for AvailabilitySetRules {
    fn resource_type(&self) -> ResourceType {
        ResourceType::AvailabilitySets
    }

    fn name_rule(&self) -> NameRule {
        names::AVAILABILITY_SET
    }

    fn prepare_payload(
        &self,
        source: &Value,
        _destination: &ResourceId,
        ctx: &PayloadContext<'_>,
    ) -> Result<Value, ValidationFailure> {
        let mut payload = base_payload(source, ctx.location);
        copy_fields(
            source,
            &mut payload,
            &["platformUpdateDomainCount", "platformFaultDomainCount"],
        );
        Ok(Value::Object(payload))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NetworkSecurityGroupRules;

impl ResourceValidation for NetworkSecurityGroupRules {
    fn resource_type(&self) -> ResourceType {
        ResourceType::NetworkSecurityGroups
    }

    fn name_rule(&self) -> NameRule {
        names::NETWORK_SECURITY_GROUP
    }

    fn prepare_payload(
        &self,
        source: &Value,
        _destination: &ResourceId,
        ctx: &PayloadContext<'_>,
    ) -> Result<Value, ValidationFailure> {
        let mut payload = base_payload(source, ctx.location);
        copy_fields(source, &mut payload, &["securityRules"]);
        Ok(Value::Object(payload))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PublicIpAddressRules;

impl ResourceValidation for PublicIpAddressRules {
    fn resource_type(&self) -> ResourceType {
        ResourceType::PublicIpAddresses
    }

    fn name_rule(&self) -> NameRule {
        names::PUBLIC_IP_ADDRESS
    }

    fn prepare_payload(
        &self,
        source: &Value,
        _destination: &ResourceId,
        ctx: &PayloadContext<'_>,
    ) -> Result<Value, ValidationFailure> {
        let mut payload = base_payload(source, ctx.location);
        copy_fields(
            source,
            &mut payload,
            &[
                "publicIPAllocationMethod",
                "publicIPAddressVersion",
                "idleTimeoutInMinutes",
            ],
        );
        if let Some(dns) = source.get("dnsSettings").filter(|dns| !dns.is_null()) {
            let mut settings = Map::new();
            copy_fields(dns, &mut settings, &["domainNameLabel"]);
            payload.insert("dnsSettings".to_string(), Value::Object(settings));
        }
        Ok(Value::Object(payload))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct VirtualNetworkRules;

impl ResourceValidation for VirtualNetworkRules {
    fn resource_type(&self) -> ResourceType {
        ResourceType::VirtualNetworks
    }

    fn name_rule(&self) -> NameRule {
        names::VIRTUAL_NETWORK
    }

    fn prepare_payload(
        &self,
        source: &Value,
        _destination: &ResourceId,
        ctx: &PayloadContext<'_>,
    ) -> Result<Value, ValidationFailure> {
        let mut payload = base_payload(source, ctx.location);
        copy_fields(source, &mut payload, &["addressSpace", "dhcpOptions"]);

        if let Some(subnets) = source.get("subnets").and_then(Value::as_array) {
            let nsgs = ctx.of_type(ResourceType::NetworkSecurityGroups);
            let subnets = subnets
                .iter()
                .map(|subnet| {
                    let mut destination = Map::new();
                    copy_fields(subnet, &mut destination, &["name", "addressPrefix"]);
                    copy_resource_ref(subnet, &mut destination, "networkSecurityGroup", nsgs)?;
                    Ok(Value::Object(destination))
                })
                .collect::<Result<Vec<_>, ValidationFailure>>()?;
            payload.insert("subnets".to_string(), Value::Array(subnets));
        }
        Ok(Value::Object(payload))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NetworkInterfaceRules;

impl ResourceValidation for NetworkInterfaceRules {
    fn resource_type(&self) -> ResourceType {
        ResourceType::NetworkInterfaces
    }

    fn name_rule(&self) -> NameRule {
        names::NETWORK_INTERFACE
    }

    fn must_not_preexist(&self) -> bool {
        true
    }

    fn prepare_payload(
        &self,
        source: &Value,
        _destination: &ResourceId,
        ctx: &PayloadContext<'_>,
    ) -> Result<Value, ValidationFailure> {
        let mut payload = base_payload(source, ctx.location);
        copy_fields(source, &mut payload, &["enableIPForwarding"]);
        copy_resource_ref(
            source,
            &mut payload,
            "networkSecurityGroup",
            ctx.of_type(ResourceType::NetworkSecurityGroups),
        )?;

        if let Some(dns) = source.get("dnsSettings").filter(|dns| !dns.is_null()) {
            let mut settings = Map::new();
            copy_fields(dns, &mut settings, &["dnsServers", "internalDnsNameLabel"]);
            payload.insert("dnsSettings".to_string(), Value::Object(settings));
        }

        if let Some(configs) = source.get("ipConfigurations").filter(|c| c.is_array()) {
            let mut configs = configs.clone();
            let vnets = ctx.of_type(ResourceType::VirtualNetworks);
            let lbs = ctx.of_type(ResourceType::LoadBalancers);
            for config in configs.as_array_mut().into_iter().flatten() {
                strip_server_fields(config);
                if let Some(subnet) = config.get_mut("subnet") {
                    rewrite_sub_resource_ref(subnet, vnets)?;
                }
                if let Some(pip) = config.get_mut("publicIPAddress") {
                    rewrite_resource_ref(pip, ctx.of_type(ResourceType::PublicIpAddresses))?;
                }
                for pool in each_mut(config, "loadBalancerBackendAddressPools") {
                    rewrite_sub_resource_ref(pool, lbs)?;
                }
                for rule in each_mut(config, "loadBalancerInboundNatRules") {
                    rewrite_sub_resource_ref(rule, lbs)?;
                }
            }
            payload.insert("ipConfigurations".to_string(), configs);
        }
        Ok(Value::Object(payload))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LoadBalancerRules;

impl ResourceValidation for LoadBalancerRules {
    fn resource_type(&self) -> ResourceType {
        ResourceType::LoadBalancers
    }

    fn name_rule(&self) -> NameRule {
        names::LOAD_BALANCER
    }

    fn prepare_payload(
        &self,
        source: &Value,
        destination: &ResourceId,
        ctx: &PayloadContext<'_>,
    ) -> Result<Value, ValidationFailure> {
        let mut payload = source.clone();
        strip_server_fields(&mut payload);
        remove_fields(&mut payload, &["name", "resourceGuid"]);
        if let Some(map) = payload.as_object_mut() {
            map.insert("location".to_string(), Value::String(ctx.location.to_string()));
        }

        let pips = ctx.of_type(ResourceType::PublicIpAddresses);
        let vnets = ctx.of_type(ResourceType::VirtualNetworks);
        for frontend in each_mut(&mut payload, "frontendIPConfigurations") {
            strip_server_fields(frontend);
            remove_fields(frontend, &["inboundNatRules", "loadBalancingRules"]);
            if let Some(pip) = frontend.get_mut("publicIPAddress") {
                rewrite_resource_ref(pip, pips)?;
            }
            if let Some(subnet) = frontend.get_mut("subnet") {
                rewrite_sub_resource_ref(subnet, vnets)?;
            }
        }

        for pool in each_mut(&mut payload, "backendAddressPools") {
            strip_server_fields(pool);
            remove_fields(pool, &["loadBalancingRules", "backendIPConfigurations"]);
        }

        for probe in each_mut(&mut payload, "probes") {
            strip_server_fields(probe);
            remove_fields(probe, &["loadBalancingRules"]);
        }

        for rule in each_mut(&mut payload, "inboundNatRules") {
            strip_server_fields(rule);
            remove_fields(rule, &["backendIPConfiguration"]);
            reroot_field(rule, "frontendIPConfiguration", destination);
        }

        for pool in each_mut(&mut payload, "inboundNatPools") {
            strip_server_fields(pool);
            reroot_field(pool, "frontendIPConfiguration", destination);
        }

        for rule in each_mut(&mut payload, "loadBalancingRules") {
            strip_server_fields(rule);
            for field in ["frontendIPConfiguration", "backendAddressPool", "probe"] {
                reroot_field(rule, field, destination);
            }
        }

        Ok(payload)
    }
}

fn reroot_field(object: &mut Value, field: &str, destination: &ResourceId) {
    if let Some(reference) = object.get_mut(field) {
        reroot_sub_resource_ref(reference, destination);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct VirtualMachineRules;

impl ResourceValidation for VirtualMachineRules {
    fn resource_type(&self) -> ResourceType {
        ResourceType::VirtualMachines
    }

    fn name_rule(&self) -> NameRule {
        names::VIRTUAL_MACHINE
    }

    fn must_not_preexist(&self) -> bool {
        true
    }

    fn prepare_payload(
        &self,
        source: &Value,
        _destination: &ResourceId,
        ctx: &PayloadContext<'_>,
    ) -> Result<Value, ValidationFailure> {
        let mut payload = base_payload(source, ctx.location);
        copy_fields(source, &mut payload, &["hardwareProfile"]);

        if let Some(storage) = source.get("storageProfile") {
            let mut storage = storage.clone();
            remove_fields(&mut storage, &["imageReference"]);
            if let Some(os_disk) = storage.get_mut("osDisk") {
                remove_fields(os_disk, &["image"]);
                set_field(os_disk, "createOption", json!(ATTACH));
            }
            for disk in each_mut(&mut storage, "dataDisks") {
                remove_fields(disk, &["diskSizeGB"]);
                set_field(disk, "createOption", json!(ATTACH));
            }
            payload.insert("storageProfile".to_string(), storage);
        }

        if let Some(network) = source.get("networkProfile") {
            let mut network = network.clone();
            let nics = ctx.of_type(ResourceType::NetworkInterfaces);
            for nic in each_mut(&mut network, "networkInterfaces") {
                rewrite_sub_resource_ref(nic, nics)?;
            }
            payload.insert("networkProfile".to_string(), network);
        }

        copy_resource_ref(
            source,
            &mut payload,
            "availabilitySet",
            ctx.of_type(ResourceType::AvailabilitySets),
        )?;
        Ok(Value::Object(payload))
    }
}

fn set_field(object: &mut Value, field: &str, value: Value) {
    if let Some(map) = object.as_object_mut() {
        map.insert(field.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use azmove_model::ResourceInfo;
    use pretty_assertions::assert_eq;

    use super::*;

    const SRC: &str = "/subscriptions/src/resourceGroups/rg/providers";

    fn info(path: &str) -> ResourceMigrationInfo {
        let source = ResourceInfo::from_resource(json!({ "id": format!("{SRC}/{path}") })).unwrap();
        ResourceMigrationInfo::from_source(source, "dest")
    }

    fn dependencies() -> IndexMap<ResourceType, Vec<ResourceMigrationInfo>> {
        let mut deps = IndexMap::new();
        deps.insert(
            ResourceType::AvailabilitySets,
            vec![info("Microsoft.Compute/availabilitySets/as")],
        );
        deps.insert(
            ResourceType::NetworkInterfaces,
            vec![info("Microsoft.Network/networkInterfaces/nic")],
        );
        deps.insert(
            ResourceType::VirtualNetworks,
            vec![info("Microsoft.Network/virtualNetworks/vnet")],
        );
        deps.insert(
            ResourceType::NetworkSecurityGroups,
            vec![info("Microsoft.Network/networkSecurityGroups/nsg")],
        );
        deps.insert(
            ResourceType::PublicIpAddresses,
            vec![info("Microsoft.Network/publicIPAddresses/pip")],
        );
        deps.insert(
            ResourceType::LoadBalancers,
            vec![info("Microsoft.Network/loadBalancers/lb")],
        );
        deps
    }

    fn dest(path: &str) -> String {
        format!("/subscriptions/dest/resourcegroups/rg/providers/{path}")
    }

    fn destination_id(path: &str) -> ResourceId {
        ResourceId::parse(&dest(path))
    }

    #[test]
    fn type_table_is_consistent() {
        for ty in ResourceType::ALL {
            assert_eq!(rules_for(ty).resource_type(), ty);
        }
        assert!(rules_for(ResourceType::VirtualMachines).must_not_preexist());
        assert!(rules_for(ResourceType::NetworkInterfaces).must_not_preexist());
        assert!(!rules_for(ResourceType::VirtualNetworks).must_not_preexist());
        assert!(!rules_for(ResourceType::StorageAccounts).must_not_preexist());
    }

    #[test]
    fn storage_account_keeps_kind_sku_and_tier() {
        let deps = IndexMap::new();
        let ctx = PayloadContext::new("chinaeast", &deps);
        let source = json!({
            "id": "x",
            "kind": "Storage",
            "sku": { "name": "Standard_LRS", "tier": "Standard" },
            "tags": { "env": "prod" },
            "primaryEndpoints": { "blob": "https://a.blob.core.windows.net/" }
        });
        let payload = StorageAccountRules
            .prepare_payload(&source, &destination_id("microsoft.storage/storageaccounts/a"), &ctx)
            .unwrap();
        assert_eq!(
            payload,
            json!({
                "location": "chinaeast",
                "tags": { "env": "prod" },
                "kind": "Storage",
                "sku": { "name": "Standard_LRS", "tier": "Standard" }
            })
        );
    }

    #[test]
    fn virtual_machine_attaches_disks_and_rewrites_references() {
        let deps = dependencies();
        let ctx = PayloadContext::new("chinaeast", &deps);
        let source = json!({
            "id": format!("{SRC}/Microsoft.Compute/virtualMachines/vm"),
            "location": "westus",
            "provisioningState": "Succeeded",
            "hardwareProfile": { "vmSize": "Standard_A1" },
            "storageProfile": {
                "imageReference": { "offer": "UbuntuServer" },
                "osDisk": { "createOption": "FromImage", "image": { "uri": "x" }, "vhd": { "uri": "os" } },
                "dataDisks": [{ "lun": 0, "createOption": "Empty", "diskSizeGB": 128, "vhd": { "uri": "d0" } }]
            },
            "networkProfile": {
                "networkInterfaces": [{ "id": format!("{SRC}/Microsoft.Network/networkInterfaces/nic"), "primary": true }]
            },
            "availabilitySet": { "id": format!("{SRC}/Microsoft.Compute/availabilitySets/AS") }
        });

        let payload = VirtualMachineRules
            .prepare_payload(&source, &destination_id("microsoft.compute/virtualmachines/vm"), &ctx)
            .unwrap();

        assert_eq!(
            payload,
            json!({
                "location": "chinaeast",
                "hardwareProfile": { "vmSize": "Standard_A1" },
                "storageProfile": {
                    "osDisk": { "createOption": "Attach", "vhd": { "uri": "os" } },
                    "dataDisks": [{ "lun": 0, "createOption": "Attach", "vhd": { "uri": "d0" } }]
                },
                "networkProfile": {
                    "networkInterfaces": [{ "id": dest("microsoft.network/networkinterfaces/nic"), "primary": true }]
                },
                "availabilitySet": { "id": dest("microsoft.compute/availabilitysets/as") }
            })
        );
    }

    #[test]
    fn network_interface_rewrites_every_ip_configuration_reference() {
        let deps = dependencies();
        let ctx = PayloadContext::new("chinaeast", &deps);
        let source = json!({
            "id": format!("{SRC}/Microsoft.Network/networkInterfaces/nic"),
            "etag": "W/\"1\"",
            "enableIPForwarding": false,
            "networkSecurityGroup": { "id": format!("{SRC}/Microsoft.Network/networkSecurityGroups/nsg") },
            "dnsSettings": { "dnsServers": [], "appliedDnsServers": [], "internalDnsNameLabel": "inner" },
            "ipConfigurations": [{
                "id": format!("{SRC}/Microsoft.Network/networkInterfaces/nic/ipConfigurations/ipconfig1"),
                "etag": "W/\"1\"",
                "name": "ipconfig1",
                "privateIPAllocationMethod": "Dynamic",
                "subnet": { "id": format!("{SRC}/Microsoft.Network/virtualNetworks/vnet/subnets/default") },
                "publicIPAddress": { "id": format!("{SRC}/Microsoft.Network/publicIPAddresses/pip") },
                "loadBalancerBackendAddressPools": [
                    { "id": format!("{SRC}/Microsoft.Network/loadBalancers/lb/backendAddressPools/pool") }
                ],
                "loadBalancerInboundNatRules": [
                    { "id": format!("{SRC}/Microsoft.Network/loadBalancers/lb/inboundNatRules/ssh") }
                ]
            }]
        });

        let payload = NetworkInterfaceRules
            .prepare_payload(&source, &destination_id("microsoft.network/networkinterfaces/nic"), &ctx)
            .unwrap();

        assert_eq!(
            payload,
            json!({
                "location": "chinaeast",
                "enableIPForwarding": false,
                "networkSecurityGroup": { "id": dest("microsoft.network/networksecuritygroups/nsg") },
                "dnsSettings": { "dnsServers": [], "internalDnsNameLabel": "inner" },
                "ipConfigurations": [{
                    "name": "ipconfig1",
                    "privateIPAllocationMethod": "Dynamic",
                    "subnet": { "id": dest("microsoft.network/virtualnetworks/vnet/subnets/default") },
                    "publicIPAddress": { "id": dest("microsoft.network/publicipaddresses/pip") },
                    "loadBalancerBackendAddressPools": [
                        { "id": dest("microsoft.network/loadbalancers/lb/backendaddresspools/pool") }
                    ],
                    "loadBalancerInboundNatRules": [
                        { "id": dest("microsoft.network/loadbalancers/lb/inboundnatrules/ssh") }
                    ]
                }]
            })
        );
    }

    #[test]
    fn network_interface_with_unknown_subnet_fails() {
        let deps = IndexMap::new();
        let ctx = PayloadContext::new("chinaeast", &deps);
        let source = json!({
            "ipConfigurations": [{
                "subnet": { "id": format!("{SRC}/Microsoft.Network/virtualNetworks/other/subnets/default") }
            }]
        });
        let err = NetworkInterfaceRules
            .prepare_payload(&source, &destination_id("microsoft.network/networkinterfaces/nic"), &ctx)
            .unwrap_err();
        assert_eq!(
            err,
            ValidationFailure::SubResourceDependencyNotFound {
                resource_type: "virtualnetworks".into(),
                name: "other".into()
            }
        );
    }

    #[test]
    fn virtual_network_reduces_subnets() {
        let deps = dependencies();
        let ctx = PayloadContext::new("chinaeast", &deps);
        let source = json!({
            "addressSpace": { "addressPrefixes": ["10.0.0.0/16"] },
            "subnets": [
                {
                    "id": "ignored",
                    "name": "default",
                    "addressPrefix": "10.0.0.0/24",
                    "ipConfigurations": [{ "id": "nic-config" }],
                    "networkSecurityGroup": { "id": format!("{SRC}/Microsoft.Network/networkSecurityGroups/nsg") }
                },
                { "name": "backend", "addressPrefix": "10.0.1.0/24" }
            ]
        });
        let payload = VirtualNetworkRules
            .prepare_payload(&source, &destination_id("microsoft.network/virtualnetworks/vnet"), &ctx)
            .unwrap();
        assert_eq!(
            payload["subnets"],
            json!([
                {
                    "name": "default",
                    "addressPrefix": "10.0.0.0/24",
                    "networkSecurityGroup": { "id": dest("microsoft.network/networksecuritygroups/nsg") }
                },
                { "name": "backend", "addressPrefix": "10.0.1.0/24" }
            ])
        );
        assert_eq!(payload["addressSpace"]["addressPrefixes"][0], "10.0.0.0/16");
    }

    #[test]
    fn public_ip_keeps_only_the_dns_label() {
        let deps = IndexMap::new();
        let ctx = PayloadContext::new("chinaeast", &deps);
        let source = json!({
            "publicIPAllocationMethod": "Static",
            "ipAddress": "40.1.2.3",
            "dnsSettings": { "domainNameLabel": "web", "fqdn": "web.westus.cloudapp.azure.com" }
        });
        let payload = PublicIpAddressRules
            .prepare_payload(&source, &destination_id("microsoft.network/publicipaddresses/pip"), &ctx)
            .unwrap();
        assert_eq!(
            payload,
            json!({
                "location": "chinaeast",
                "publicIPAllocationMethod": "Static",
                "dnsSettings": { "domainNameLabel": "web" }
            })
        );
    }

    #[test]
    fn load_balancer_drops_back_references_and_reroots_rules() {
        let deps = dependencies();
        let ctx = PayloadContext::new("chinaeast", &deps);
        let lb = format!("{SRC}/Microsoft.Network/loadBalancers/lb");
        let source = json!({
            "id": lb,
            "name": "lb",
            "location": "westus",
            "resourceGuid": "guid",
            "frontendIPConfigurations": [{
                "id": format!("{lb}/frontendIPConfigurations/fe"),
                "name": "fe",
                "publicIPAddress": { "id": format!("{SRC}/Microsoft.Network/publicIPAddresses/pip") },
                "inboundNatRules": [{ "id": "x" }],
                "loadBalancingRules": [{ "id": "y" }]
            }],
            "backendAddressPools": [{
                "id": format!("{lb}/backendAddressPools/pool"),
                "name": "pool",
                "backendIPConfigurations": [{ "id": "nic-config" }]
            }],
            "probes": [{ "name": "http", "port": 80, "loadBalancingRules": [{ "id": "y" }] }],
            "inboundNatRules": [{
                "name": "ssh",
                "frontendIPConfiguration": { "id": format!("{lb}/frontendIPConfigurations/fe") },
                "backendIPConfiguration": { "id": "nic-config" }
            }],
            "loadBalancingRules": [{
                "name": "web",
                "frontendIPConfiguration": { "id": format!("{lb}/frontendIPConfigurations/fe") },
                "backendAddressPool": { "id": format!("{lb}/backendAddressPools/pool") },
                "probe": { "id": format!("{lb}/probes/http") }
            }]
        });

        let destination = destination_id("microsoft.network/loadbalancers/lb");
        let payload = LoadBalancerRules.prepare_payload(&source, &destination, &ctx).unwrap();
        let lb_dest = dest("microsoft.network/loadbalancers/lb");

        assert_eq!(
            payload,
            json!({
                "location": "chinaeast",
                "frontendIPConfigurations": [{
                    "name": "fe",
                    "publicIPAddress": { "id": dest("microsoft.network/publicipaddresses/pip") }
                }],
                "backendAddressPools": [{ "name": "pool" }],
                "probes": [{ "name": "http", "port": 80 }],
                "inboundNatRules": [{
                    "name": "ssh",
                    "frontendIPConfiguration": { "id": format!("{lb_dest}/frontendipconfigurations/fe") }
                }],
                "loadBalancingRules": [{
                    "name": "web",
                    "frontendIPConfiguration": { "id": format!("{lb_dest}/frontendipconfigurations/fe") },
                    "backendAddressPool": { "id": format!("{lb_dest}/backendaddresspools/pool") },
                    "probe": { "id": format!("{lb_dest}/probes/http") }
                }]
            })
        );
    }
}

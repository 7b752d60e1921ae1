//! Resource type tags
//!
//! The closed set of resource types the engine knows how to migrate.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::resource_id::ResourceIdError;

/// Resource type tag
///
/// Rendered as the lowercase type segment of a resource path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    AvailabilitySets,
    LoadBalancers,
    NetworkInterfaces,
    NetworkSecurityGroups,
    PublicIpAddresses,
    StorageAccounts,
    VirtualMachines,
    VirtualNetworks,
}

impl ResourceType {
    /// Every supported type
    pub const ALL: [Self; 8] = [
        Self::AvailabilitySets,
        Self::LoadBalancers,
        Self::NetworkInterfaces,
        Self::NetworkSecurityGroups,
        Self::PublicIpAddresses,
        Self::StorageAccounts,
        Self::VirtualMachines,
        Self::VirtualNetworks,
    ];

    /// Lowercase path segment
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AvailabilitySets => "availabilitysets",
            Self::LoadBalancers => "loadbalancers",
            Self::NetworkInterfaces => "networkinterfaces",
            Self::NetworkSecurityGroups => "networksecuritygroups",
            Self::PublicIpAddresses => "publicipaddresses",
            Self::StorageAccounts => "storageaccounts",
            Self::VirtualMachines => "virtualmachines",
            Self::VirtualNetworks => "virtualnetworks",
        }
    }

    /// Provider namespace owning this type
    #[must_use]
    pub const fn provider(self) -> &'static str {
        match self {
            Self::AvailabilitySets | Self::VirtualMachines => "Microsoft.Compute",
            Self::StorageAccounts => "Microsoft.Storage",
            Self::LoadBalancers
            | Self::NetworkInterfaces
            | Self::NetworkSecurityGroups
            | Self::PublicIpAddresses
            | Self::VirtualNetworks => "Microsoft.Network",
        }
    }

    /// Human-readable singular name used in messages
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::AvailabilitySets => "Availability set",
            Self::LoadBalancers => "Load balancer",
            Self::NetworkInterfaces => "Network interface",
            Self::NetworkSecurityGroups => "Network security group",
            Self::PublicIpAddresses => "Public IP address",
            Self::StorageAccounts => "Storage account",
            Self::VirtualMachines => "Virtual machine",
            Self::VirtualNetworks => "Virtual network",
        }
    }

    /// Name of the destination usage counter limiting this type
    ///
    /// Usage names are matched case-insensitively, so this is the lowercase form.
    #[must_use]
    pub const fn usage_name(self) -> &'static str {
        self.as_str()
    }
}

impl Display for ResourceType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = ResourceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str() == lowered)
            .ok_or_else(|| ResourceIdError::UnsupportedType(s.to_string()))
    }
}

//! Compatibility of pre-existing destination resources

use azmove_model::views::{self, PublicIpAddressView, VirtualNetworkView};
use azmove_model::{ResourceId, ResourceType};
use serde_json::Value;

use crate::error::{MigrationError, ValidationFailure};

/// Every source subnet must exist at the destination with the same prefix
///
/// # Errors
/// Returns [`ValidationFailure::VirtualNetworkIncompatible`] naming the first unmatched subnet.
pub(crate) fn check_virtual_network(
    source: &Value,
    existing: &Value,
    destination: &ResourceId,
) -> Result<(), MigrationError> {
    let source: VirtualNetworkView = views::view(source, "virtual network")?;
    let existing: VirtualNetworkView = views::view(existing, "virtual network")?;

    let unmatched = source.subnets.iter().find(|wanted| {
        !existing.subnets.iter().any(|subnet| {
            subnet.name.eq_ignore_ascii_case(&wanted.name) && subnet.address_prefix == wanted.address_prefix
        })
    });
    match unmatched {
        Some(subnet) => Err(ValidationFailure::VirtualNetworkIncompatible {
            name: destination.resource_name().to_string(),
            resource_group: destination.resource_group().to_string(),
            subnet: subnet.name.clone(),
        }
        .into()),
        None => Ok(()),
    }
}

/// An existing address must not already be bound to a network interface
///
/// # Errors
/// Returns [`ValidationFailure::PublicIpInUse`] naming the interface.
pub(crate) fn check_public_ip_address(existing: &Value, destination: &ResourceId) -> Result<(), MigrationError> {
    let existing: PublicIpAddressView = views::view(existing, "public IP address")?;
    let Some(binding) = existing.ip_configuration else {
        return Ok(());
    };

    let bound_to = ResourceId::parse(&binding.id);
    if bound_to.resource_type_tag() == Some(ResourceType::NetworkInterfaces) {
        return Err(ValidationFailure::PublicIpInUse {
            name: destination.resource_name().to_string(),
            resource_group: destination.resource_group().to_string(),
            nic: bound_to.resource_name().to_string(),
        }
        .into());
    }
    Ok(())
}

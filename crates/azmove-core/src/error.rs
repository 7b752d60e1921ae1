//! Error types for the migration engine
//!
//! Provides error handling for:
//! - User-correctable migration-plan defects ([`ValidationFailure`])
//! - Bad option values (via [`ModelError`])
//! - Management-API failures ([`ProviderError`])
//! - Disk copy failures

use azmove_model::{ModelError, ResourceType};

use crate::clients::ProviderError;
use crate::config::ConfigError;

/// Main migration error type
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// The migration plan cannot be applied to the destination
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationFailure),

    /// Options or payloads could not be understood
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Management API call failed
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A disk copy did not complete
    #[error("copying blob '{blob}' failed: {reason}")]
    DiskCopy { blob: String, reason: String },

    /// No location option and no destination group to deduce one from
    #[error("Destination location is not specified and cannot be deduced")]
    LocationUndeduced,

    /// No client registered for a resource type
    #[error("no management client registered for '{0}'")]
    MissingClient(ResourceType),

    /// A disk lives in an account the source subscription does not list
    #[error("storage account '{0}' was not found in the source subscription")]
    StorageAccountNotFound(String),

    /// The disk is not backed by a page blob the engine can copy
    #[error("disk '{0}' has no blob uri; only blob-backed disks can be migrated")]
    DiskWithoutBlob(String),

    /// A data disk in the VM payload has no copied counterpart
    #[error("Couldn't find '{0}' in the processed data disks")]
    DataDiskNotProcessed(String),
}

impl MigrationError {
    /// Whether the user can fix this by changing the plan or the options
    #[inline]
    #[must_use]
    pub fn is_user_correctable(&self) -> bool {
        match self {
            Self::Validation(_) | Self::LocationUndeduced => true,
            Self::Model(err) => err.is_invalid_input(),
            _ => false,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// The validation failure, if this is one
    #[must_use]
    pub fn as_validation(&self) -> Option<&ValidationFailure> {
        match self {
            Self::Validation(failure) => Some(failure),
            _ => None,
        }
    }
}

/// A defect in the migration plan, reported with a human-readable message
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationFailure {
    #[error("{type_name} name length must be within [{min}-{max}]")]
    NameLength {
        type_name: &'static str,
        min: usize,
        max: usize,
    },

    #[error("{type_name} name can only contain {valid_chars}")]
    NameCharacters {
        type_name: &'static str,
        valid_chars: &'static str,
    },

    #[error("{id} already exists")]
    AlreadyExists { id: String },

    #[error("{id} already exists in a different location {existing}. The specified location is {requested}.")]
    LocationMismatch {
        id: String,
        existing: String,
        requested: String,
    },

    #[error("Source storage account {name} is encrypted. Migration of encrypted storage accounts is not supported.")]
    EncryptedStorageAccount { name: String },

    #[error("Storage account '{name}' already exists in resource group '{resource_group}' but the kind '{kind}' is incompatible")]
    StorageKindMismatch {
        name: String,
        resource_group: String,
        kind: String,
    },

    #[error("Storage account '{name}' already exists in resource group '{resource_group}' but the location '{location}' is different")]
    StorageLocationMismatch {
        name: String,
        resource_group: String,
        location: String,
    },

    #[error("Storage account '{name}' already exists in resource group '{resource_group}' but the SKU tier '{tier}' is different")]
    StorageSkuTierMismatch {
        name: String,
        resource_group: String,
        tier: String,
    },

    /// Name taken outside the destination subscription, or otherwise refused
    #[error("{0}")]
    StorageAccountUnavailable(String),

    #[error("Domain name label '{label}' has been taken in location '{location}'")]
    DnsLabelTaken { label: String, location: String },

    #[error("Virtual network '{name}' already exists in resource group '{resource_group}' and it's not compatible because Cannot match the subnet '{subnet}' in destination virtual network. Either the subnet does not exist or the configuration incorrect.")]
    VirtualNetworkIncompatible {
        name: String,
        resource_group: String,
        subnet: String,
    },

    #[error("Public IP Address '{name}' already exists in resource group '{resource_group}' and it's not compatible because This public IP address has been use by another network interface '{nic}'.")]
    PublicIpInUse {
        name: String,
        resource_group: String,
        nic: String,
    },

    #[error("Couldn't find '{0}' in the dependencies")]
    DependencyNotFound(String),

    #[error("Couldn't find a resource of type '{resource_type}' and name '{name}' in the dependencies")]
    SubResourceDependencyNotFound { resource_type: String, name: String },

    #[error("Core family for vm size '{0}' does not support")]
    UnsupportedVmSize(String),

    #[error("Core family '{family}' does not support on location '{location}'")]
    CoreFamilyUnavailable { family: String, location: String },

    #[error("Vm size '{vm_size}' does not support on location '{location}'")]
    VmSizeUnavailable { vm_size: String, location: String },

    #[error("'{}' quota exceeds its limit.", .0.join(", "))]
    QuotaExceeded(Vec<String>),
}

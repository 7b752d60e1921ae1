//! Clouds, sites and migration options

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Sovereign cloud a site lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CloudEnvironment {
    AzureCloud,
    AzureChinaCloud,
    AzureGermanCloud,
}

impl CloudEnvironment {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AzureCloud => "AzureCloud",
            Self::AzureChinaCloud => "AzureChinaCloud",
            Self::AzureGermanCloud => "AzureGermanCloud",
        }
    }

    /// Resource-manager endpoint for this cloud
    #[must_use]
    pub const fn resource_manager_endpoint(self) -> &'static str {
        match self {
            Self::AzureCloud => "https://management.azure.com/",
            Self::AzureChinaCloud => "https://management.chinacloudapi.cn/",
            Self::AzureGermanCloud => "https://management.microsoftazure.de/",
        }
    }

    /// Parse an environment option value
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidOptionValue`] naming `option` for unknown clouds.
    pub fn from_option(option: &'static str, value: &str) -> Result<Self, ModelError> {
        value.parse().map_err(|()| ModelError::InvalidOptionValue {
            name: option,
            value: value.to_string(),
        })
    }
}

impl Display for CloudEnvironment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CloudEnvironment {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "azurecloud" => Ok(Self::AzureCloud),
            "azurechinacloud" => Ok(Self::AzureChinaCloud),
            "azuregermancloud" => Ok(Self::AzureGermanCloud),
            _ => Err(()),
        }
    }
}

/// One side of a migration: a cloud plus a subscription in it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MigrationSite {
    pub environment: CloudEnvironment,
    pub subscription_id: String,
}

impl MigrationSite {
    #[must_use]
    pub fn new(environment: CloudEnvironment, subscription_id: impl Into<String>) -> Self {
        Self {
            environment,
            subscription_id: subscription_id.into(),
        }
    }
}

/// Everything needed to start a VM migration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationOptions {
    pub source: MigrationSite,
    pub destination: MigrationSite,
    pub source_resource_group: String,
    pub source_vm_name: String,
    /// Used only when the location cannot be deduced from an existing destination group
    pub destination_location: Option<String>,
}

impl MigrationOptions {
    #[must_use]
    pub fn new(
        source: MigrationSite,
        destination: MigrationSite,
        source_resource_group: impl Into<String>,
        source_vm_name: impl Into<String>,
    ) -> Self {
        Self {
            source,
            destination,
            source_resource_group: source_resource_group.into(),
            source_vm_name: source_vm_name.into(),
            destination_location: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_destination_location(mut self, location: impl Into<String>) -> Self {
        self.destination_location = Some(location.into());
        self
    }

    /// Check the options before any network call is made
    ///
    /// # Errors
    /// Returns a missing-option error for empty required values, or
    /// [`ModelError::SameEnvironment`] when both sites are in the same cloud.
    pub fn validate(&self) -> Result<(), ModelError> {
        let required: [(&'static str, &str); 4] = [
            ("srcSubId", &self.source.subscription_id),
            ("destSubId", &self.destination.subscription_id),
            ("srcGroup", &self.source_resource_group),
            ("srcName", &self.source_vm_name),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ModelError::MissingRequiredOption(name));
            }
        }

        if self.source.environment == self.destination.environment {
            return Err(ModelError::SameEnvironment);
        }

        if let Some(location) = &self.destination_location {
            if location.trim().is_empty() {
                return Err(ModelError::InvalidOptionValue {
                    name: "destLocation",
                    value: location.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> MigrationOptions {
        MigrationOptions::new(
            MigrationSite::new(CloudEnvironment::AzureCloud, "src-sub"),
            MigrationSite::new(CloudEnvironment::AzureChinaCloud, "dest-sub"),
            "rg",
            "vm",
        )
    }

    #[test]
    fn environment_parse_is_case_insensitive() {
        assert_eq!(
            CloudEnvironment::from_option("srcEnv", "AZURECHINACLOUD").unwrap(),
            CloudEnvironment::AzureChinaCloud
        );
        let err = CloudEnvironment::from_option("destEnv", "moon").unwrap_err();
        assert_eq!(err.to_string(), "'moon' is not a valid value for option '--destEnv'");
    }

    #[test]
    fn valid_options_pass() {
        assert!(options().with_destination_location("chinaeast").validate().is_ok());
    }

    #[test]
    fn same_environment_is_rejected() {
        let mut opts = options();
        opts.destination.environment = CloudEnvironment::AzureCloud;
        assert!(matches!(opts.validate(), Err(ModelError::SameEnvironment)));
    }

    #[test]
    fn missing_vm_name_is_reported() {
        let mut opts = options();
        opts.source_vm_name = String::new();
        assert!(matches!(
            opts.validate(),
            Err(ModelError::MissingRequiredOption("srcName"))
        ));
    }

    #[test]
    fn blank_location_is_invalid() {
        let opts = options().with_destination_location(" ");
        assert!(matches!(
            opts.validate(),
            Err(ModelError::InvalidOptionValue { name: "destLocation", .. })
        ));
    }
}

//! End-to-end VM migration
//!
//! [`VmMigrator::run`] drives one migration:
//!
//! 1. deduce the destination location and resolve dependencies, concurrently
//! 2. build the job and validate it against the destination
//! 3. create missing resource groups, then missing storage accounts
//! 4. copy the disks and attach the copied blob URIs to the VM payload
//! 5. deploy phase by phase
//! 6. check the deployed VM's provisioning state
//!
//! Nothing is rolled back when a step fails.

use std::fmt;
use std::sync::Arc;

use azmove_model::views::{self, ResourceSummary};
use azmove_model::{MigrationOptions, ResourceId, ResourceType};
use serde::Serialize;
use ulid::Ulid;

use crate::clients::{ClientFactory, ManagementClients, ProviderError};
use crate::config::MigrationConfig;
use crate::disk_copy::DiskCopyEngine;
use crate::error::MigrationError;
use crate::job::{ensure_resource_groups, ensure_storage_accounts, VmMigrationJob};
use crate::observer::{MigrationEvent, MigrationObserver};
use crate::resolver::DependencyResolver;
use crate::validator::{ResourceValidator, ValidationOutcome};

const PROVISIONING_SUCCEEDED: &str = "Succeeded";

/// Identifier of one migration run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MigrationId(Ulid);

impl MigrationId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for MigrationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MigrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Result of checking the deployed VM
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PostDeploymentStatus {
    /// The VM reports `Succeeded`
    Succeeded,
    /// The VM could not be fetched or reports another state
    Failed { provisioning_state: Option<String> },
    /// Disabled in configuration
    Skipped,
}

impl PostDeploymentStatus {
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

/// A validated plan, before anything is created
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    pub job: VmMigrationJob,
    pub prerequisites: ValidationOutcome,
}

/// Everything a completed run produced
#[derive(Debug, Clone, Serialize)]
pub struct MigrationOutcome {
    pub id: MigrationId,
    pub destination_vm: ResourceId,
    pub disks_copied: usize,
    pub post_deployment: PostDeploymentStatus,
}

/// Migrates one virtual machine between two sites
pub struct VmMigrator {
    id: MigrationId,
    options: MigrationOptions,
    source: ManagementClients,
    destination: ManagementClients,
    config: MigrationConfig,
    observer: Arc<dyn MigrationObserver>,
}

impl VmMigrator {
    #[must_use]
    pub fn new(
        options: MigrationOptions,
        source: ManagementClients,
        destination: ManagementClients,
        config: MigrationConfig,
        observer: Arc<dyn MigrationObserver>,
    ) -> Self {
        Self {
            id: MigrationId::new(),
            options,
            source,
            destination,
            config,
            observer,
        }
    }

    /// Check `options` and open clients for both sites
    ///
    /// # Errors
    /// Returns an invalid-input error before any network call, or the
    /// factory's failure.
    pub async fn connect(
        factory: &dyn ClientFactory,
        options: MigrationOptions,
        config: MigrationConfig,
        observer: Arc<dyn MigrationObserver>,
    ) -> Result<Self, MigrationError> {
        options.validate()?;
        let (source, destination) = tokio::try_join!(
            factory.connect(&options.source),
            factory.connect(&options.destination),
        )?;
        Ok(Self::new(options, source, destination, config, observer))
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> MigrationId {
        self.id
    }

    /// Resolve and validate without creating anything
    ///
    /// # Errors
    /// Returns the first resolution, validation or provider failure.
    #[tracing::instrument(skip_all, fields(migration_id = %self.id))]
    pub async fn plan(&self) -> Result<MigrationPlan, MigrationError> {
        self.options.validate()?;
        let observer = self.observer.as_ref();

        let resolver = DependencyResolver::new(&self.source);
        let (location, resolved) = tokio::try_join!(
            self.deduce_location(),
            resolver.resolve_vm(&self.options.source_resource_group, &self.options.source_vm_name),
        )?;
        observer.on_event(&MigrationEvent::LocationDeduced {
            location: location.clone(),
        });
        observer.on_event(&MigrationEvent::DependenciesResolved {
            count: resolved.dependency.dependencies.len(),
        });

        let mut job = VmMigrationJob::new(
            self.options.source.clone(),
            self.options.destination.clone(),
            location,
            resolved,
        )?;

        observer.on_event(&MigrationEvent::ValidationStarted);
        let prerequisites = ResourceValidator::new(&self.destination)
            .validate(&mut job.job)
            .await?;
        observer.on_event(&MigrationEvent::ValidationPassed {
            new_resource_groups: prerequisites.new_resource_groups.len(),
            new_storage_accounts: prerequisites.new_storage_accounts.len(),
        });
        Ok(MigrationPlan { job, prerequisites })
    }

    /// Migrate the VM
    ///
    /// # Errors
    /// Returns the first failure of any step. A VM that deploys but does not
    /// reach `Succeeded` is reported through [`MigrationOutcome::post_deployment`].
    #[tracing::instrument(skip_all, fields(migration_id = %self.id, vm = %self.options.source_vm_name))]
    pub async fn run(&self) -> Result<MigrationOutcome, MigrationError> {
        let observer = self.observer.as_ref();
        let MigrationPlan {
            mut job,
            prerequisites,
        } = self.plan().await?;
        let location = job.job.destination_location.clone();

        ensure_resource_groups(
            self.destination.resource_groups.as_ref(),
            &prerequisites.new_resource_groups,
            &location,
            observer,
        )
        .await?;
        ensure_storage_accounts(
            self.destination.storage_accounts.as_ref(),
            &prerequisites.new_storage_accounts,
            observer,
        )
        .await?;

        let disks_copied = DiskCopyEngine::new(&self.source, &self.destination, &self.config, observer)
            .copy_all(job.disks_mut())
            .await?;
        job.attach_disk_uris()?;

        job.to_deployable().deploy(&self.destination, observer).await?;

        let destination_vm = job.job.root.destination.id.clone();
        let post_deployment = if self.config.post_deployment_check {
            self.check_deployment(&destination_vm).await?
        } else {
            PostDeploymentStatus::Skipped
        };
        observer.on_event(&MigrationEvent::Finished {
            succeeded: post_deployment.is_success(),
        });

        Ok(MigrationOutcome {
            id: self.id,
            destination_vm,
            disks_copied,
            post_deployment,
        })
    }

    /// Location of the destination group named after the source group, else the option
    ///
    /// # Errors
    /// Returns [`MigrationError::LocationUndeduced`] when neither is available.
    pub async fn deduce_location(&self) -> Result<String, MigrationError> {
        let group = &self.options.source_resource_group;
        match self.destination.resource_groups.get(group).await {
            Ok(existing) => {
                let summary: ResourceSummary = views::view(&existing, "resource group")?;
                summary.location.ok_or(MigrationError::LocationUndeduced)
            }
            Err(ProviderError::ResourceGroupNotFound(_) | ProviderError::ResourceNotFound(_)) => self
                .options
                .destination_location
                .clone()
                .ok_or(MigrationError::LocationUndeduced),
            Err(err) => {
                tracing::warn!(%group, error = %err, "cannot read destination resource group");
                Err(MigrationError::LocationUndeduced)
            }
        }
    }

    async fn check_deployment(&self, vm: &ResourceId) -> Result<PostDeploymentStatus, MigrationError> {
        self.observer.on_event(&MigrationEvent::PostDeploymentCheck { id: vm.to_string() });
        let ops = self.destination.operations(ResourceType::VirtualMachines)?;
        let status = match ops.get(vm.resource_group(), vm.resource_name()).await {
            Ok(deployed) => {
                let state = views::view::<ResourceSummary>(&deployed, "virtual machine")
                    .ok()
                    .and_then(|summary| summary.provisioning_state);
                if state.as_deref() == Some(PROVISIONING_SUCCEEDED) {
                    PostDeploymentStatus::Succeeded
                } else {
                    PostDeploymentStatus::Failed {
                        provisioning_state: state,
                    }
                }
            }
            Err(err) => {
                tracing::warn!(%vm, error = %err, "cannot read deployed virtual machine");
                PostDeploymentStatus::Failed {
                    provisioning_state: None,
                }
            }
        };
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use azmove_model::{CloudEnvironment, MigrationSite};
    use serde_json::json;

    use super::*;
    use crate::clients::{
        BlobService, BlobServiceFactory, MockNetworkOperations, MockResourceGroupOperations,
        MockResourceOperations, MockStorageAccountOperations, MockUsageOperations, ProviderResult,
    };
    use crate::observer::MockMigrationObserver;

    struct NoBlobs;

    #[async_trait::async_trait]
    impl BlobServiceFactory for NoBlobs {
        async fn connect(&self, account: &str, _key: &str, _endpoint: &str) -> ProviderResult<Arc<dyn BlobService>> {
            Err(ProviderError::ResourceNotFound(account.to_string()))
        }
    }

    fn options() -> MigrationOptions {
        MigrationOptions::new(
            MigrationSite::new(CloudEnvironment::AzureCloud, "src"),
            MigrationSite::new(CloudEnvironment::AzureChinaCloud, "dest"),
            "rg",
            "vm",
        )
    }

    fn bare_clients(groups: MockResourceGroupOperations) -> ManagementClients {
        ManagementClients::new(
            "dest",
            Arc::new(groups),
            Arc::new(MockStorageAccountOperations::new()),
            Arc::new(MockNetworkOperations::new()),
            Arc::new(MockUsageOperations::new()),
            Arc::new(NoBlobs),
        )
    }

    fn migrator(options: MigrationOptions, groups: MockResourceGroupOperations) -> VmMigrator {
        VmMigrator::new(
            options,
            bare_clients(MockResourceGroupOperations::new()),
            bare_clients(groups),
            MigrationConfig::default(),
            Arc::new(MockMigrationObserver::new()),
        )
    }

    #[tokio::test]
    async fn location_comes_from_existing_group() {
        let mut groups = MockResourceGroupOperations::new();
        groups.expect_get().returning(|name| {
            assert_eq!(name, "rg");
            Ok(json!({ "name": "rg", "location": "chinanorth" }))
        });
        let migrator = migrator(options().with_destination_location("chinaeast"), groups);
        assert_eq!(migrator.deduce_location().await.unwrap(), "chinanorth");
    }

    #[tokio::test]
    async fn location_falls_back_to_option() {
        let mut groups = MockResourceGroupOperations::new();
        groups
            .expect_get()
            .returning(|name| Err(ProviderError::ResourceGroupNotFound(name.to_string())));
        let migrator = migrator(options().with_destination_location("chinaeast"), groups);
        assert_eq!(migrator.deduce_location().await.unwrap(), "chinaeast");
    }

    #[tokio::test]
    async fn location_cannot_be_deduced() {
        let mut groups = MockResourceGroupOperations::new();
        groups
            .expect_get()
            .returning(|name| Err(ProviderError::ResourceGroupNotFound(name.to_string())));
        let migrator = migrator(options(), groups);
        let err = migrator.deduce_location().await.unwrap_err();
        assert_eq!(err.to_string(), "Destination location is not specified and cannot be deduced");
    }

    #[tokio::test]
    async fn invalid_options_fail_before_any_call() {
        let mut opts = options();
        opts.destination.environment = CloudEnvironment::AzureCloud;
        let mut groups = MockResourceGroupOperations::new();
        groups.expect_get().never();
        let err = migrator(opts, groups).plan().await.unwrap_err();
        assert!(matches!(err, MigrationError::Model(_)));
    }

    #[tokio::test]
    async fn post_deployment_reads_provisioning_state() {
        let mut vms = MockResourceOperations::new();
        vms.expect_get()
            .returning(|_, _| Ok(json!({ "provisioningState": "Failed" })));
        let mut migrator = migrator(options(), MockResourceGroupOperations::new());
        migrator.destination = bare_clients(MockResourceGroupOperations::new())
            .with_operations(ResourceType::VirtualMachines, Arc::new(vms));
        let mut observer = MockMigrationObserver::new();
        observer.expect_on_event().times(1).return_const(());
        migrator.observer = Arc::new(observer);

        let vm = ResourceId::parse("/subscriptions/dest/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm");
        let status = migrator.check_deployment(&vm).await.unwrap();
        assert_eq!(
            status,
            PostDeploymentStatus::Failed {
                provisioning_state: Some("Failed".into())
            }
        );
        assert!(!status.is_success());
    }

    #[test]
    fn migration_ids_are_unique() {
        assert_ne!(MigrationId::new(), MigrationId::new());
        assert_eq!(MigrationId::new().to_string().len(), 26);
    }
}

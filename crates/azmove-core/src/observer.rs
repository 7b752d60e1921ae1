//! Migration progress reporting
//!
//! Components report through an injected [`MigrationObserver`] rather than a
//! global client. [`TracingObserver`] forwards everything to `tracing`.

use serde::Serialize;

/// Milestones of a migration run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MigrationEvent {
    LocationDeduced { location: String },
    DependenciesResolved { count: usize },
    ValidationStarted,
    ValidationPassed { new_resource_groups: usize, new_storage_accounts: usize },
    ResourceGroupCreating { name: String },
    StorageAccountCreating { id: String },
    DiskCopyStarted { blob: String, billable_size: u64 },
    DiskCopyFinished { blob: String, succeeded: bool },
    DisksCopied { count: usize },
    PhaseStarted { index: usize, total: usize, resources: usize },
    ResourceDeploying { id: String },
    PostDeploymentCheck { id: String },
    Finished { succeeded: bool },
}

/// Bytes copied so far for one disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiskProgress {
    pub blob: String,
    pub bytes_copied: u64,
    pub billable_size: u64,
}

impl DiskProgress {
    /// Completed fraction in `[0, 1]`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        if self.billable_size == 0 {
            return 1.0;
        }
        (self.bytes_copied as f64 / self.billable_size as f64).min(1.0)
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait MigrationObserver: Send + Sync {
    fn on_event(&self, event: &MigrationEvent);

    fn on_disk_progress(&self, progress: &DiskProgress);
}

/// Observer that logs through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl MigrationObserver for TracingObserver {
    fn on_event(&self, event: &MigrationEvent) {
        match event {
            MigrationEvent::LocationDeduced { location } => {
                tracing::info!("Deduced destination location to be '{}'", location);
            }
            MigrationEvent::DependenciesResolved { count } => {
                tracing::info!("Found {} dependencies", count);
            }
            MigrationEvent::ValidationStarted => {
                tracing::info!("Validating the input against the destination environment");
            }
            MigrationEvent::ValidationPassed {
                new_resource_groups,
                new_storage_accounts,
            } => {
                tracing::info!(
                    new_resource_groups,
                    new_storage_accounts,
                    "Validation passed"
                );
            }
            MigrationEvent::ResourceGroupCreating { name } => {
                tracing::info!("Creating resource group '{}'", name);
            }
            MigrationEvent::StorageAccountCreating { id } | MigrationEvent::ResourceDeploying { id } => {
                tracing::info!("Start deploying {}", id);
            }
            MigrationEvent::DiskCopyStarted { blob, billable_size } => {
                tracing::info!(billable_size, "Start copying '{}'", blob);
            }
            MigrationEvent::DiskCopyFinished { blob, succeeded } => {
                if *succeeded {
                    tracing::info!("Copied '{}'", blob);
                } else {
                    tracing::error!("Copying '{}' failed", blob);
                }
            }
            MigrationEvent::DisksCopied { count } => {
                tracing::info!("All {} VHDs are copied", count);
            }
            MigrationEvent::PhaseStarted { index, total, resources } => {
                tracing::info!("Deploying phase {}/{}. {} resources.", index, total, resources);
            }
            MigrationEvent::PostDeploymentCheck { id } => {
                tracing::info!("Start post validation of {}", id);
            }
            MigrationEvent::Finished { succeeded } => {
                if *succeeded {
                    tracing::info!("deploy succeeded");
                } else {
                    tracing::warn!("post validation failed");
                }
            }
        }
    }

    fn on_disk_progress(&self, progress: &DiskProgress) {
        tracing::debug!(
            bytes_copied = progress.bytes_copied,
            billable_size = progress.billable_size,
            "{}: {:.2}",
            progress.blob,
            progress.fraction()
        );
    }
}

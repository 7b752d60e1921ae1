//! Disk image copy between storage accounts
//!
//! Each disk moves through [`CopyState`]:
//!
//! ```text
//! Initiating ──start_copy──> Pending ──poll──> Succeeded
//!                               │
//!                               └──────poll──> Failed
//! ```
//!
//! The source blob is snapshotted and the destination copies from a
//! time-boxed read URL over that snapshot. The snapshot is deleted exactly once
//! when its copy leaves `Pending`, and for every disk when any disk fails.

use std::sync::Arc;

use azmove_model::views::{self, StorageAccountView};
use azmove_model::Vhd;
use chrono::Utc;
use futures::future::join_all;
use rand::Rng;

use crate::clients::{BlobService, CopyStatus, ManagementClients, PageRange, SharedAccessPolicy};
use crate::config::MigrationConfig;
use crate::error::MigrationError;
use crate::observer::{DiskProgress, MigrationEvent, MigrationObserver};

/// Lifecycle of one disk copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyState {
    Initiating,
    Pending,
    Succeeded,
    Failed,
}

impl CopyState {
    #[inline]
    #[must_use]
    pub fn is_complete(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Approximate billable size of a page blob
///
/// Each allocated page range costs its length plus 12 bytes of overhead.
#[must_use]
pub fn billable_size(ranges: &[PageRange]) -> u64 {
    ranges
        .iter()
        .map(|range| range.end.saturating_sub(range.start) + 12)
        .sum()
}

/// Split `blob` before its last `.`, keeping the dot with the extension
fn split_extension(blob: &str) -> (&str, &str) {
    match blob.rfind('.') {
        Some(dot) => blob.split_at(dot),
        None => (blob, ""),
    }
}

fn suffixed_name(stem: &str, extension: &str, range: u32) -> String {
    let suffix = rand::rng().random_range(0..range.max(1));
    format!("{stem}{suffix}{extension}")
}

/// Copies the disks of one VM from the source to the destination subscription
///
/// Destination accounts keep the source account and group names; they must
/// exist before copying starts.
pub struct DiskCopyEngine<'a> {
    source: &'a ManagementClients,
    destination: &'a ManagementClients,
    config: &'a MigrationConfig,
    observer: &'a dyn MigrationObserver,
}

impl<'a> DiskCopyEngine<'a> {
    #[must_use]
    pub fn new(
        source: &'a ManagementClients,
        destination: &'a ManagementClients,
        config: &'a MigrationConfig,
        observer: &'a dyn MigrationObserver,
    ) -> Self {
        Self {
            source,
            destination,
            config,
            observer,
        }
    }

    /// Copy every disk concurrently and point each at its destination blob
    ///
    /// Returns once every copy has succeeded.
    ///
    /// # Errors
    /// Returns the first provider or copy failure, after every started copy
    /// has had its snapshot cleaned up.
    #[tracing::instrument(skip_all)]
    pub async fn copy_all<'d>(&self, disks: impl IntoIterator<Item = &'d mut Vhd>) -> Result<usize, MigrationError> {
        let started = join_all(disks.into_iter().map(|disk| self.start(disk))).await;

        let mut copies = Vec::with_capacity(started.len());
        let mut first_error = None;
        for result in started {
            match result {
                Ok(copy) => copies.push(copy),
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        if let Some(err) = first_error {
            finalize_all(&mut copies).await;
            return Err(err);
        }

        let count = copies.len();
        while copies.iter().any(|copy| !copy.state.is_complete()) {
            tokio::time::sleep(self.config.copy_poll_interval()).await;

            let polls = copies
                .iter_mut()
                .filter(|copy| !copy.state.is_complete())
                .map(|copy| copy.poll(self.observer));
            let failure = join_all(polls).await.into_iter().find_map(Result::err);
            if let Some(err) = failure {
                tracing::error!(error = %err, "copying VHDs failed");
                finalize_all(&mut copies).await;
                return Err(err);
            }
        }

        self.observer.on_event(&MigrationEvent::DisksCopied { count });
        Ok(count)
    }

    /// Initiating: everything up to and including the copy request
    async fn start(&self, disk: &mut Vhd) -> Result<DiskCopy, MigrationError> {
        let (source, destination) = tokio::try_join!(
            connect_blob_service(self.source, disk),
            connect_blob_service(self.destination, disk),
        )?;

        let container = disk.container.clone();
        destination.create_container_if_not_exists(&container).await?;
        let destination_blob = self.available_blob_name(destination.as_ref(), &container, &disk.blob).await?;

        let ranges = source.list_page_ranges(&disk.container, &disk.blob).await?;
        let billable_size = billable_size(&ranges);

        let snapshot = source.create_snapshot(&disk.container, &disk.blob).await?;
        let policy = SharedAccessPolicy {
            expiry: Utc::now() + self.config.sas_validity(),
        };
        let source_url = source.shared_access_url(&disk.container, &disk.blob, &snapshot, policy);

        let mut copy = DiskCopy {
            source,
            destination,
            source_container: disk.container.clone(),
            source_blob: disk.blob.clone(),
            snapshot,
            snapshot_deleted: false,
            container,
            blob: destination_blob,
            billable_size,
            state: CopyState::Initiating,
        };
        if let Err(err) = copy
            .destination
            .start_copy(&source_url, &copy.container, &copy.blob)
            .await
        {
            copy.finalize().await;
            return Err(err.into());
        }

        disk.set_destination(copy.destination.blob_url(&copy.container, &copy.blob));
        copy.state = CopyState::Pending;
        tracing::debug!(blob = %copy.blob, billable_size, "copy started");
        self.observer.on_event(&MigrationEvent::DiskCopyStarted {
            blob: copy.blob.clone(),
            billable_size,
        });
        Ok(copy)
    }

    /// `preferred`, or a random-suffixed variant when that name is taken
    async fn available_blob_name(
        &self,
        service: &dyn BlobService,
        container: &str,
        preferred: &str,
    ) -> Result<String, MigrationError> {
        let (stem, extension) = split_extension(preferred);
        let mut candidate = preferred.to_string();
        while service.does_blob_exist(container, &candidate).await? {
            tracing::debug!(%candidate, "destination blob exists");
            candidate = suffixed_name(stem, extension, self.config.blob_suffix_range);
        }
        Ok(candidate)
    }
}

/// Open a blob service on the account holding `disk`, in `clients`' subscription
async fn connect_blob_service(
    clients: &ManagementClients,
    disk: &Vhd,
) -> Result<Arc<dyn BlobService>, MigrationError> {
    let (resource_group, account) = (disk.resource_group.as_str(), disk.storage_account.as_str());
    let (keys, properties) = tokio::try_join!(
        clients.storage_accounts.list_keys(resource_group, account),
        clients.storage_accounts.get_properties(resource_group, account),
    )?;

    let unusable = |reason: &str| MigrationError::DiskCopy {
        blob: disk.blob.clone(),
        reason: format!("storage account '{account}' {reason}"),
    };
    let key = keys.first().ok_or_else(|| unusable("has no access keys"))?;
    let properties: StorageAccountView = views::view(&properties, "storage account")?;
    let endpoint = properties
        .primary_endpoints
        .and_then(|endpoints| endpoints.blob)
        .ok_or_else(|| unusable("has no blob endpoint"))?;

    Ok(clients.blobs.connect(account, &key.value, &endpoint).await?)
}

/// A copy that has been requested and is tracked to completion
struct DiskCopy {
    source: Arc<dyn BlobService>,
    destination: Arc<dyn BlobService>,
    source_container: String,
    source_blob: String,
    snapshot: String,
    snapshot_deleted: bool,
    container: String,
    blob: String,
    billable_size: u64,
    state: CopyState,
}

impl DiskCopy {
    /// Pending: check the destination copy status once
    async fn poll(&mut self, observer: &dyn MigrationObserver) -> Result<(), MigrationError> {
        let properties = self
            .destination
            .get_blob_properties(&self.container, &self.blob)
            .await?;
        let Some(copy) = properties.copy else {
            return self.fail(observer, "the blob reports no copy status".to_string()).await;
        };

        observer.on_disk_progress(&DiskProgress {
            blob: self.blob.clone(),
            bytes_copied: copy.bytes_copied.min(self.billable_size),
            billable_size: self.billable_size,
        });

        match copy.status {
            CopyStatus::Pending => Ok(()),
            CopyStatus::Success => {
                self.state = CopyState::Succeeded;
                self.finalize().await;
                observer.on_event(&MigrationEvent::DiskCopyFinished {
                    blob: self.blob.clone(),
                    succeeded: true,
                });
                Ok(())
            }
            status @ (CopyStatus::Aborted | CopyStatus::Failed) => {
                self.fail(observer, format!("copy status is {status:?}")).await
            }
        }
    }

    async fn fail(&mut self, observer: &dyn MigrationObserver, reason: String) -> Result<(), MigrationError> {
        self.state = CopyState::Failed;
        self.finalize().await;
        observer.on_event(&MigrationEvent::DiskCopyFinished {
            blob: self.blob.clone(),
            succeeded: false,
        });
        Err(MigrationError::DiskCopy {
            blob: self.blob.clone(),
            reason,
        })
    }

    /// Delete the source snapshot; later calls do nothing
    async fn finalize(&mut self) {
        if self.snapshot_deleted {
            return;
        }
        let deleted = self
            .source
            .delete_blob(&self.source_container, &self.source_blob, Some(&self.snapshot))
            .await;
        match deleted {
            Ok(()) => self.snapshot_deleted = true,
            Err(err) => tracing::warn!(blob = %self.source_blob, error = %err, "failed to delete snapshot"),
        }
    }
}

async fn finalize_all(copies: &mut [DiskCopy]) {
    join_all(copies.iter_mut().map(|copy| copy.finalize())).await;
}

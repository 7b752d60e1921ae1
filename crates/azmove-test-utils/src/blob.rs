//! In-memory blob accounts

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use azmove_core::clients::{
    BlobProperties, BlobService, CopyProperties, CopyStatus, PageRange, ProviderError, ProviderResult,
    SharedAccessPolicy,
};
use parking_lot::Mutex;

/// Bytes a started copy transfers in total
pub const DEFAULT_COPY_SIZE: u64 = 1 << 20;

type BlobKey = (String, String);

fn key(container: &str, blob: &str) -> BlobKey {
    (container.to_lowercase(), blob.to_lowercase())
}

#[derive(Debug)]
struct FakeCopy {
    copied: u64,
    total: u64,
}

#[derive(Debug, Default)]
struct BlobState {
    containers: HashSet<String>,
    blobs: HashMap<BlobKey, Vec<PageRange>>,
    next_snapshot: u64,
    live_snapshots: Vec<String>,
    deleted_snapshots: Vec<String>,
    copies: HashMap<BlobKey, FakeCopy>,
    copy_sources: Vec<String>,
    copy_step: Option<u64>,
    fail_copies: bool,
}

/// One storage account's blob endpoint
#[derive(Debug)]
pub struct FakeBlobAccount {
    name: String,
    endpoint: String,
    state: Mutex<BlobState>,
}

impl FakeBlobAccount {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            endpoint: endpoint.into(),
            state: Mutex::new(BlobState::default()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Access key the account accepts
    pub fn key(&self) -> String {
        format!("key-{}", self.name)
    }

    pub fn add_blob(&self, container: &str, blob: &str, ranges: Vec<PageRange>) {
        let mut state = self.state.lock();
        state.containers.insert(container.to_lowercase());
        state.blobs.insert(key(container, blob), ranges);
    }

    pub fn has_blob(&self, container: &str, blob: &str) -> bool {
        self.state.lock().blobs.contains_key(&key(container, blob))
    }

    /// Transfer `bytes` per status poll instead of finishing on the first one
    pub fn set_copy_step(&self, bytes: u64) {
        self.state.lock().copy_step = Some(bytes.max(1));
    }

    /// Report every copy into this account as failed
    pub fn fail_copies(&self) {
        self.state.lock().fail_copies = true;
    }

    /// Snapshots taken and not yet deleted
    pub fn live_snapshots(&self) -> Vec<String> {
        self.state.lock().live_snapshots.clone()
    }

    pub fn deleted_snapshots(&self) -> Vec<String> {
        self.state.lock().deleted_snapshots.clone()
    }

    /// Source URLs of every copy started into this account
    pub fn copy_sources(&self) -> Vec<String> {
        self.state.lock().copy_sources.clone()
    }
}

#[async_trait::async_trait]
impl BlobService for FakeBlobAccount {
    async fn create_container_if_not_exists(&self, container: &str) -> ProviderResult<bool> {
        Ok(self.state.lock().containers.insert(container.to_lowercase()))
    }

    async fn does_blob_exist(&self, container: &str, blob: &str) -> ProviderResult<bool> {
        Ok(self.has_blob(container, blob))
    }

    async fn create_snapshot(&self, container: &str, blob: &str) -> ProviderResult<String> {
        let mut state = self.state.lock();
        if !state.blobs.contains_key(&key(container, blob)) {
            return Err(ProviderError::ResourceNotFound(format!("{container}/{blob}")));
        }
        state.next_snapshot += 1;
        let snapshot = format!("snapshot-{}", state.next_snapshot);
        state.live_snapshots.push(format!("{container}/{blob}@{snapshot}"));
        Ok(snapshot)
    }

    async fn list_page_ranges(&self, container: &str, blob: &str) -> ProviderResult<Vec<PageRange>> {
        self.state
            .lock()
            .blobs
            .get(&key(container, blob))
            .cloned()
            .ok_or_else(|| ProviderError::ResourceNotFound(format!("{container}/{blob}")))
    }

    async fn start_copy(&self, source_url: &str, container: &str, blob: &str) -> ProviderResult<()> {
        let mut state = self.state.lock();
        if !state.containers.contains(&container.to_lowercase()) {
            return Err(ProviderError::ResourceNotFound(container.to_string()));
        }
        state.copy_sources.push(source_url.to_string());
        state.blobs.insert(key(container, blob), Vec::new());
        state.copies.insert(
            key(container, blob),
            FakeCopy {
                copied: 0,
                total: DEFAULT_COPY_SIZE,
            },
        );
        Ok(())
    }

    async fn delete_blob(&self, container: &str, blob: &str, snapshot: Option<&str>) -> ProviderResult<()> {
        let mut state = self.state.lock();
        match snapshot {
            Some(snapshot) => {
                let entry = format!("{container}/{blob}@{snapshot}");
                let position = state
                    .live_snapshots
                    .iter()
                    .position(|live| *live == entry)
                    .ok_or_else(|| ProviderError::ResourceNotFound(entry.clone()))?;
                state.live_snapshots.remove(position);
                state.deleted_snapshots.push(entry);
            }
            None => {
                state.blobs.remove(&key(container, blob));
            }
        }
        Ok(())
    }

    async fn get_blob_properties(&self, container: &str, blob: &str) -> ProviderResult<BlobProperties> {
        let mut state = self.state.lock();
        let (step, failed) = (state.copy_step, state.fail_copies);
        if let Some(copy) = state.copies.get_mut(&key(container, blob)) {
            copy.copied = step.map_or(copy.total, |step| (copy.copied + step).min(copy.total));
            let status = if failed {
                CopyStatus::Failed
            } else if copy.copied >= copy.total {
                CopyStatus::Success
            } else {
                CopyStatus::Pending
            };
            return Ok(BlobProperties {
                copy: Some(CopyProperties {
                    status,
                    bytes_copied: copy.copied,
                    total_bytes: copy.total,
                }),
            });
        }
        if state.blobs.contains_key(&key(container, blob)) {
            Ok(BlobProperties::default())
        } else {
            Err(ProviderError::ResourceNotFound(format!("{container}/{blob}")))
        }
    }

    fn blob_url(&self, container: &str, blob: &str) -> String {
        format!("{}{container}/{blob}", self.endpoint)
    }

    fn shared_access_url(
        &self,
        container: &str,
        blob: &str,
        snapshot: &str,
        policy: SharedAccessPolicy,
    ) -> String {
        format!(
            "{}{container}/{blob}?snapshot={snapshot}&se={}&sp=r&sig=fake",
            self.endpoint,
            policy.expiry.timestamp()
        )
    }
}

//! Disk image descriptors

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Account, container and blob decoded from a disk blob URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobLocation {
    pub storage_account: String,
    pub container: String,
    pub blob: String,
}

impl BlobLocation {
    /// Decode `https://{account}.{endpoint-host}/{container}/.../{blob}`
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidBlobUri`] when the URI has no container or blob segment.
    pub fn from_uri(uri: &str) -> Result<Self, ModelError> {
        let parts: Vec<&str> = uri.split('/').collect();
        let invalid = || ModelError::InvalidBlobUri(uri.to_string());
        if parts.len() < 5 {
            return Err(invalid());
        }

        let storage_account = parts[2].split('.').next().unwrap_or_default();
        let container = parts[3];
        let blob = parts[parts.len() - 1];
        if storage_account.is_empty() || container.is_empty() || blob.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            storage_account: storage_account.to_string(),
            container: container.to_string(),
            blob: blob.to_string(),
        })
    }
}

/// What a disk is to its VM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiskRole {
    Os { os_type: Option<String> },
    Data { lun: i64 },
}

/// A VM disk backed by a page blob
///
/// `uri` starts as the source blob URL and is replaced by the destination URL
/// once the copy has been issued; the original is then kept in `source_uri`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vhd {
    pub resource_group: String,
    pub storage_account: String,
    pub container: String,
    pub blob: String,
    pub uri: String,
    pub source_uri: Option<String>,
    pub role: DiskRole,
}

impl Vhd {
    fn new(resource_group: &str, location: BlobLocation, uri: &str, role: DiskRole) -> Self {
        Self {
            resource_group: resource_group.to_string(),
            storage_account: location.storage_account,
            container: location.container,
            blob: location.blob,
            uri: uri.to_string(),
            source_uri: None,
            role,
        }
    }

    /// OS disk descriptor
    #[must_use]
    pub fn os_disk(
        resource_group: &str,
        location: BlobLocation,
        uri: &str,
        os_type: Option<String>,
    ) -> Self {
        Self::new(resource_group, location, uri, DiskRole::Os { os_type })
    }

    /// Data disk descriptor
    #[must_use]
    pub fn data_disk(resource_group: &str, location: BlobLocation, uri: &str, lun: i64) -> Self {
        Self::new(resource_group, location, uri, DiskRole::Data { lun })
    }

    /// Logical unit number, for data disks
    #[inline]
    #[must_use]
    pub fn lun(&self) -> Option<i64> {
        match self.role {
            DiskRole::Data { lun } => Some(lun),
            DiskRole::Os { .. } => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_os_disk(&self) -> bool {
        matches!(self.role, DiskRole::Os { .. })
    }

    /// Record the destination blob URL
    pub fn set_destination(&mut self, destination_uri: String) {
        let previous = std::mem::replace(&mut self.uri, destination_uri);
        self.source_uri.get_or_insert(previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_blob_uri() {
        let loc = BlobLocation::from_uri("https://srcacct.blob.core.windows.net/vhds/nested/os.vhd").unwrap();
        assert_eq!(loc.storage_account, "srcacct");
        assert_eq!(loc.container, "vhds");
        assert_eq!(loc.blob, "os.vhd");
    }

    #[test]
    fn reject_uri_without_blob() {
        assert!(matches!(
            BlobLocation::from_uri("https://acct.blob.core.windows.net"),
            Err(ModelError::InvalidBlobUri(_))
        ));
        assert!(BlobLocation::from_uri("https://acct.blob.core.windows.net/vhds/").is_err());
    }

    #[test]
    fn set_destination_keeps_first_source() {
        let uri = "https://a.blob.core.windows.net/vhds/d.vhd";
        let mut disk = Vhd::data_disk("rg", BlobLocation::from_uri(uri).unwrap(), uri, 2);
        disk.set_destination("https://a.blob.core.chinacloudapi.cn/vhds/d.vhd".into());
        disk.set_destination("https://a.blob.core.chinacloudapi.cn/vhds/d42.vhd".into());
        assert_eq!(disk.source_uri.as_deref(), Some(uri));
        assert_eq!(disk.uri, "https://a.blob.core.chinacloudapi.cn/vhds/d42.vhd");
        assert_eq!(disk.lun(), Some(2));
        assert!(!disk.is_os_disk());
    }
}

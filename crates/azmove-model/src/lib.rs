//! azmove Model
//!
//! Resource addressing and the data model shared by the migration engine.
//!
//! # Core Concepts
//!
//! - [`ResourceId`]: hierarchical, lowercase-normalized resource address
//! - [`ResourceType`]: the closed set of migratable resource types
//! - [`ResourceMigrationInfo`]: source resource paired with its planned destination
//! - [`Vhd`]: disk image descriptor for OS and data disks
//! - [`MigrationOptions`]: source/destination sites plus the VM to move
//!
//! # Example
//!
//! ```rust,ignore
//! use azmove_model::{ResourceId, ResourceIdKind};
//!
//! let id = ResourceId::parse("/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet/subnets/default");
//! assert_eq!(id.kind(), ResourceIdKind::SubResource);
//! assert_eq!(id.format_at(ResourceIdKind::Resource).unwrap(),
//!     "/subscriptions/s/resourcegroups/rg/providers/microsoft.network/virtualnetworks/vnet");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod error;
mod models;
mod resource_id;
mod resource_type;
mod site;
mod vhd;

/// Typed read views over provider payloads
pub mod views;

// Re-exports
pub use error::ModelError;
pub use models::{ResourceDependency, ResourceInfo, ResourceMigrationInfo, VmDependency};
pub use resource_id::{ResourceId, ResourceIdError, ResourceIdKind};
pub use resource_type::ResourceType;
pub use site::{CloudEnvironment, MigrationOptions, MigrationSite};
pub use vhd::{BlobLocation, DiskRole, Vhd};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

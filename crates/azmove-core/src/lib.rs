//! azmove Core
//!
//! Migration engine moving a virtual machine and its dependency closure
//! between cloud subscriptions, possibly across sovereign clouds.
//!
//! # Pipeline
//!
//! 1. **Resolve**: [`resolver::DependencyResolver`] walks the source graph
//! 2. **Validate**: [`validator::ResourceValidator`] checks the destination and
//!    attaches create payloads; [`quota::QuotaValidator`] checks capacity
//! 3. **Copy**: [`disk_copy::DiskCopyEngine`] snapshots and copies disk blobs
//! 4. **Deploy**: [`deploy::Deployable`] creates resources phase by phase
//!
//! [`migrate::VmMigrator`] runs the whole pipeline.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use azmove_core::prelude::*;
//!
//! init_tracing(LogFormat::Pretty)?;
//! let options = MigrationOptions::new(source, destination, "web-rg", "web-vm")
//!     .with_destination_location("chinaeast");
//!
//! let migrator = VmMigrator::connect(&factory, options, MigrationConfig::load(None)?, Arc::new(TracingObserver)).await?;
//! let outcome = migrator.run().await?;
//! ```

// Core modules
pub mod clients;
pub mod config;
pub mod deploy;
pub mod disk_copy;
pub mod error;
pub mod job;
pub mod logging;
pub mod migrate;
pub mod observer;
pub mod quota;
pub mod resolver;
pub mod validator;

// Re-exports
pub use error::{MigrationError, ValidationFailure};

/// Commonly used types
pub mod prelude {
    pub use crate::clients::{
        BlobService, BlobServiceFactory, ClientFactory, ManagementClients, NetworkOperations,
        ProviderError, ProviderResult, ResourceGroupOperations, ResourceOperations,
        StorageAccountOperations, UsageOperations,
    };
    pub use crate::config::MigrationConfig;
    pub use crate::error::{MigrationError, ValidationFailure};
    pub use crate::job::{MigrationJob, VmMigrationJob};
    pub use crate::logging::{init_tracing, LogFormat};
    pub use crate::migrate::{MigrationId, MigrationOutcome, PostDeploymentStatus, VmMigrator};
    pub use crate::observer::{DiskProgress, MigrationEvent, MigrationObserver, TracingObserver};
    pub use azmove_model::{
        CloudEnvironment, MigrationOptions, MigrationSite, ResourceId, ResourceType, Vhd,
    };
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

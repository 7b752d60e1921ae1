//! Resource and migration records
//!
//! - [`ResourceInfo`]: identifier plus payload
//! - [`ResourceMigrationInfo`]: source/destination pair; a present destination
//!   payload means the resource must be created
//! - [`ResourceDependency`] / [`VmDependency`]: output of dependency resolution

use serde::Serialize;
use serde_json::Value;

use crate::error::ModelError;
use crate::resource_id::ResourceId;
use crate::resource_type::ResourceType;
use crate::vhd::Vhd;

/// Identifier paired with a payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceInfo<P = Value> {
    pub id: ResourceId,
    pub resource: P,
}

impl ResourceInfo<Value> {
    /// Wrap a payload fetched from the provider, parsing its `id`
    ///
    /// # Errors
    /// Returns [`ModelError::MissingId`] if the payload has no string `id`,
    /// or a resource-id error if the id is too short.
    pub fn from_resource(resource: Value) -> Result<Self, ModelError> {
        let raw = resource
            .get("id")
            .and_then(Value::as_str)
            .ok_or(ModelError::MissingId)?;
        let id: ResourceId = raw.parse()?;
        Ok(Self { id, resource })
    }
}

/// Source resource and its planned destination
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceMigrationInfo {
    pub source: ResourceInfo<Value>,
    pub destination: ResourceInfo<Option<Value>>,
}

impl ResourceMigrationInfo {
    /// Plan a destination with the same group and name in `destination_subscription`
    #[must_use]
    pub fn from_source(source: ResourceInfo<Value>, destination_subscription: &str) -> Self {
        let destination = ResourceInfo {
            id: source.id.clone().with_subscription(destination_subscription),
            resource: None,
        };
        Self { source, destination }
    }

    /// Whether validation produced a create payload
    #[inline]
    #[must_use]
    pub fn needs_deployment(&self) -> bool {
        self.destination.resource.is_some()
    }

    /// Attach the destination create payload
    pub fn set_payload(&mut self, payload: Value) {
        self.destination.resource = Some(payload);
    }

    #[inline]
    #[must_use]
    pub fn resource_type(&self) -> Option<ResourceType> {
        self.source.id.resource_type_tag()
    }
}

/// Root resource and everything discovered from it
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourceDependency {
    pub root: Value,
    pub dependencies: Vec<Value>,
}

impl ResourceDependency {
    #[must_use]
    pub fn new(root: Value) -> Self {
        Self {
            root,
            dependencies: Vec::new(),
        }
    }

    /// Append a dependency; `None` (already processed) is skipped
    pub fn push(&mut self, dependency: Option<Value>) {
        if let Some(dependency) = dependency {
            self.dependencies.push(dependency);
        }
    }

    pub fn extend(&mut self, dependencies: impl IntoIterator<Item = Value>) {
        self.dependencies.extend(dependencies);
    }
}

/// Dependency set of a virtual machine, with its disks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VmDependency {
    pub dependency: ResourceDependency,
    pub os_disk: Vhd,
    pub data_disks: Vec<Vhd>,
}

//! Reference rewriting for destination payloads
//!
//! Payloads point at other resources through `{ "id": ... }` objects. Before a
//! payload can be created at the destination, every such id has to name the
//! destination copy of the referenced resource:
//!
//! - top-level references (NSG, public IP, availability set) match a
//!   dependency by full source id
//! - sub-resource references (subnet, backend pool, NAT rule, NIC) match by
//!   parent resource name and keep their sub-resource path

use azmove_model::{ResourceId, ResourceMigrationInfo};
use serde_json::{Map, Value};

use crate::error::ValidationFailure;

const SERVER_FIELDS: [&str; 3] = ["id", "etag", "provisioningState"];

/// Remove fields assigned by the provider
pub(crate) fn strip_server_fields(object: &mut Value) {
    remove_fields(object, &SERVER_FIELDS);
}

pub(crate) fn remove_fields(object: &mut Value, fields: &[&str]) {
    if let Some(map) = object.as_object_mut() {
        for field in fields {
            map.remove(*field);
        }
    }
}

/// Copy each of `fields` present in `source` into `target`
pub(crate) fn copy_fields(source: &Value, target: &mut Map<String, Value>, fields: &[&str]) {
    for field in fields {
        if let Some(value) = source.get(*field) {
            target.insert((*field).to_string(), value.clone());
        }
    }
}

/// Every element of the array at `field`, if there is one
pub(crate) fn each_mut<'a>(object: &'a mut Value, field: &str) -> impl Iterator<Item = &'a mut Value> {
    object
        .get_mut(field)
        .and_then(Value::as_array_mut)
        .into_iter()
        .flatten()
}

fn reference_id(reference: &Value) -> Option<String> {
    reference.get("id").and_then(Value::as_str).map(str::to_owned)
}

fn set_id(reference: &mut Value, id: &ResourceId) {
    if let Some(map) = reference.as_object_mut() {
        map.insert("id".to_string(), Value::String(id.to_string()));
    }
}

/// Point a top-level reference at the destination of the matching dependency
///
/// A reference without an id is left alone.
///
/// # Errors
/// Returns [`ValidationFailure::DependencyNotFound`] when no dependency has that source id.
pub(crate) fn rewrite_resource_ref(
    reference: &mut Value,
    dependencies: &[ResourceMigrationInfo],
) -> Result<(), ValidationFailure> {
    let Some(raw) = reference_id(reference) else {
        return Ok(());
    };
    let id = ResourceId::parse(&raw);
    let found = dependencies
        .iter()
        .find(|info| info.source.id == id)
        .ok_or(ValidationFailure::DependencyNotFound(raw))?;
    set_id(reference, &found.destination.id);
    Ok(())
}

/// Re-root a sub-resource reference onto the destination of its parent
///
/// # Errors
/// Returns [`ValidationFailure::SubResourceDependencyNotFound`] when no
/// dependency has the parent's name.
pub(crate) fn rewrite_sub_resource_ref(
    reference: &mut Value,
    dependencies: &[ResourceMigrationInfo],
) -> Result<(), ValidationFailure> {
    let Some(raw) = reference_id(reference) else {
        return Ok(());
    };
    let id = ResourceId::parse(&raw);
    let parent = dependencies
        .iter()
        .find(|info| info.source.id.resource_name() == id.resource_name())
        .ok_or_else(|| ValidationFailure::SubResourceDependencyNotFound {
            resource_type: id.resource_type().to_string(),
            name: id.resource_name().to_string(),
        })?;
    set_id(reference, &reroot(id, &parent.destination.id));
    Ok(())
}

/// Re-root a reference onto `destination`, e.g. a rule naming a front-end of its own load balancer
pub(crate) fn reroot_sub_resource_ref(reference: &mut Value, destination: &ResourceId) {
    if let Some(raw) = reference_id(reference) {
        set_id(reference, &reroot(ResourceId::parse(&raw), destination));
    }
}

fn reroot(id: ResourceId, parent: &ResourceId) -> ResourceId {
    id.with_subscription(parent.subscription_id())
        .with_resource_group(parent.resource_group())
        .with_resource_name(parent.resource_name())
}

//! Hierarchical resource identifiers
//!
//! Provides [`ResourceId`] for addressing resources in the management plane:
//!
//! ```text
//! /subscriptions/{id}/resourcegroups/{rg}[/providers/{provider}/{type}/{name}[/{subType}/{subName}[/{subSubType}/{subSubName}]]]
//! ```
//!
//! Parsing is case-insensitive and lowercase-normalizes every segment.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::resource_type::ResourceType;

const SEPARATOR: char = '/';

const SUBSCRIPTION_INDEX: usize = 1;
const RESOURCE_GROUP_INDEX: usize = 3;
const PROVIDER_INDEX: usize = 5;
const RESOURCE_TYPE_INDEX: usize = 6;
const RESOURCE_NAME_INDEX: usize = 7;
const SUB_RESOURCE_TYPE_INDEX: usize = 8;
const SUB_RESOURCE_NAME_INDEX: usize = 9;
const SUB_SUB_RESOURCE_TYPE_INDEX: usize = 10;
const SUB_SUB_RESOURCE_NAME_INDEX: usize = 11;

const RESOURCE_GROUP_PARTS: usize = 4;
const RESOURCE_PARTS: usize = 8;
const SUB_RESOURCE_PARTS: usize = 10;
const SUB_SUB_RESOURCE_PARTS: usize = 12;

/// Depth of a [`ResourceId`]
///
/// Ordered from shallowest to deepest so depths can be compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ResourceIdKind {
    /// Fewer than four path segments
    #[default]
    Invalid,
    /// `/subscriptions/{id}/resourcegroups/{rg}`
    ResourceGroup,
    /// `.../providers/{provider}/{type}/{name}`
    Resource,
    /// `.../{subType}/{subName}`
    SubResource,
    /// `.../{subSubType}/{subSubName}`
    SubSubResource,
}

impl ResourceIdKind {
    fn from_part_count(count: usize) -> Self {
        if count >= SUB_SUB_RESOURCE_PARTS {
            Self::SubSubResource
        } else if count >= SUB_RESOURCE_PARTS {
            Self::SubResource
        } else if count >= RESOURCE_PARTS {
            Self::Resource
        } else if count >= RESOURCE_GROUP_PARTS {
            Self::ResourceGroup
        } else {
            Self::Invalid
        }
    }
}

/// Parsed resource address
///
/// Fields deeper than [`ResourceId::kind`] are always empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ResourceId {
    kind: ResourceIdKind,
    subscription_id: String,
    resource_group: String,
    provider: String,
    resource_type: String,
    resource_name: String,
    sub_resource_type: String,
    sub_resource_name: String,
    sub_sub_resource_type: String,
    sub_sub_resource_name: String,
}

impl ResourceId {
    /// Parse a resource path
    ///
    /// Never fails: a path with fewer than four segments yields an identifier
    /// whose kind is [`ResourceIdKind::Invalid`].
    #[must_use]
    pub fn parse(path: &str) -> Self {
        let offset = usize::from(path.starts_with(SEPARATOR));
        let lowered = path.to_lowercase();
        let parts: Vec<&str> = lowered.split(SEPARATOR).collect();
        let kind = ResourceIdKind::from_part_count(parts.len().saturating_sub(offset));

        let part = |index: usize, depth: ResourceIdKind| -> String {
            if kind >= depth {
                parts.get(index + offset).map_or_else(String::new, |s| (*s).to_string())
            } else {
                String::new()
            }
        };

        Self {
            kind,
            subscription_id: part(SUBSCRIPTION_INDEX, ResourceIdKind::ResourceGroup),
            resource_group: part(RESOURCE_GROUP_INDEX, ResourceIdKind::ResourceGroup),
            provider: part(PROVIDER_INDEX, ResourceIdKind::Resource),
            resource_type: part(RESOURCE_TYPE_INDEX, ResourceIdKind::Resource),
            resource_name: part(RESOURCE_NAME_INDEX, ResourceIdKind::Resource),
            sub_resource_type: part(SUB_RESOURCE_TYPE_INDEX, ResourceIdKind::SubResource),
            sub_resource_name: part(SUB_RESOURCE_NAME_INDEX, ResourceIdKind::SubResource),
            sub_sub_resource_type: part(SUB_SUB_RESOURCE_TYPE_INDEX, ResourceIdKind::SubSubResource),
            sub_sub_resource_name: part(SUB_SUB_RESOURCE_NAME_INDEX, ResourceIdKind::SubSubResource),
        }
    }

    /// Identifier for a resource group
    #[must_use]
    pub fn resource_group_id(subscription_id: &str, resource_group: &str) -> Self {
        Self {
            kind: ResourceIdKind::ResourceGroup,
            subscription_id: subscription_id.to_lowercase(),
            resource_group: resource_group.to_lowercase(),
            ..Self::default()
        }
    }

    /// Identifier for a top-level resource
    #[must_use]
    pub fn resource(
        subscription_id: &str,
        resource_group: &str,
        resource_type: ResourceType,
        resource_name: &str,
    ) -> Self {
        Self {
            kind: ResourceIdKind::Resource,
            provider: resource_type.provider().to_lowercase(),
            resource_type: resource_type.as_str().to_string(),
            resource_name: resource_name.to_lowercase(),
            ..Self::resource_group_id(subscription_id, resource_group)
        }
    }

    /// Render the identifier at its own depth
    ///
    /// Returns `None` for an invalid identifier.
    #[must_use]
    pub fn to_path(&self) -> Option<String> {
        self.format_at(self.kind)
    }

    /// Render the identifier truncated to `depth`
    ///
    /// Returns `None` when `depth` is invalid or deeper than this identifier.
    #[must_use]
    pub fn format_at(&self, depth: ResourceIdKind) -> Option<String> {
        if depth == ResourceIdKind::Invalid || depth > self.kind {
            return None;
        }

        let mut out = format!(
            "/subscriptions/{}/resourcegroups/{}",
            self.subscription_id, self.resource_group
        );
        if depth >= ResourceIdKind::Resource {
            out.push_str(&format!(
                "/providers/{}/{}/{}",
                self.provider, self.resource_type, self.resource_name
            ));
        }
        if depth >= ResourceIdKind::SubResource {
            out.push_str(&format!("/{}/{}", self.sub_resource_type, self.sub_resource_name));
        }
        if depth >= ResourceIdKind::SubSubResource {
            out.push_str(&format!(
                "/{}/{}",
                self.sub_sub_resource_type, self.sub_sub_resource_name
            ));
        }
        Some(out)
    }

    /// Same identifier with the subscription replaced
    #[must_use]
    pub fn with_subscription(mut self, subscription_id: &str) -> Self {
        self.subscription_id = subscription_id.to_lowercase();
        self
    }

    /// Same identifier with the resource group replaced
    #[must_use]
    pub fn with_resource_group(mut self, resource_group: &str) -> Self {
        self.resource_group = resource_group.to_lowercase();
        self
    }

    /// Same identifier with the resource name replaced
    #[must_use]
    pub fn with_resource_name(mut self, resource_name: &str) -> Self {
        self.resource_name = resource_name.to_lowercase();
        self
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> ResourceIdKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.kind != ResourceIdKind::Invalid
    }

    #[inline]
    #[must_use]
    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    #[inline]
    #[must_use]
    pub fn resource_group(&self) -> &str {
        &self.resource_group
    }

    #[inline]
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Lowercase resource type segment, e.g. `virtualnetworks`
    #[inline]
    #[must_use]
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Resource type as a known tag, if it is one
    #[must_use]
    pub fn resource_type_tag(&self) -> Option<ResourceType> {
        self.resource_type.parse().ok()
    }

    #[inline]
    #[must_use]
    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    #[inline]
    #[must_use]
    pub fn sub_resource_type(&self) -> &str {
        &self.sub_resource_type
    }

    #[inline]
    #[must_use]
    pub fn sub_resource_name(&self) -> &str {
        &self.sub_resource_name
    }

    #[inline]
    #[must_use]
    pub fn sub_sub_resource_type(&self) -> &str {
        &self.sub_sub_resource_type
    }

    #[inline]
    #[must_use]
    pub fn sub_sub_resource_name(&self) -> &str {
        &self.sub_sub_resource_name
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.to_path() {
            Some(path) => f.write_str(&path),
            None => f.write_str("<invalid resource id>"),
        }
    }
}

impl FromStr for ResourceId {
    type Err = ResourceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = Self::parse(s);
        if id.is_valid() {
            Ok(id)
        } else {
            Err(ResourceIdError::TooFewSegments(s.to_string()))
        }
    }
}

impl Serialize for ResourceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ResourceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors related to resource identifiers
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ResourceIdError {
    /// Path too short to address a resource group
    #[error("'{0}' is not a valid resource id (expected at least /subscriptions/{{id}}/resourcegroups/{{name}})")]
    TooFewSegments(String),

    /// Resource type segment is not one the engine migrates
    #[error("unsupported resource type '{0}'")]
    UnsupportedType(String),
}

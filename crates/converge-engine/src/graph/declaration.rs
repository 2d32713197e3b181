//! Resource declarations: names, type tags, and property sets.

use std::collections::BTreeMap;

use derive_more::{Debug, Display, From, Into};
use serde::{Deserialize, Serialize};

use super::gate::Gate;
use super::value::{OutputRef, PropertyValue};
use crate::config::SecretString;

/// Unique logical name of a resource within a graph.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(Debug, Display, From, Into)]
#[debug("{_0}")]
#[display("{_0}")]
#[serde(transparent)]
pub struct ResourceName(String);

impl ResourceName {
    /// Creates a resource name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceName {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

/// Provider resource kind tag, e.g. `gcp:cloudrunv2/service`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(Debug, Display, From, Into)]
#[debug("{_0}")]
#[display("{_0}")]
#[serde(transparent)]
pub struct ResourceType(String);

impl ResourceType {
    /// Creates a resource type tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Returns the tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceType {
    fn from(tag: &str) -> Self {
        Self(tag.to_owned())
    }
}

/// One declared unit of infrastructure and its desired properties.
///
/// Declarations are flat records: a name, a provider type tag, a property
/// map, optional explicit dependencies, and an inclusion [`Gate`].
/// Dependency edges are derived from `depends_on` and from
/// reference-typed property values.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDeclaration {
    /// Logical name, unique within the graph.
    pub name: ResourceName,
    /// Provider resource kind.
    pub resource_type: ResourceType,
    /// Desired properties.
    pub properties: BTreeMap<String, PropertyValue>,
    /// Explicit ordering dependencies, in addition to those implied by
    /// reference properties.
    pub depends_on: Vec<ResourceName>,
    /// Inclusion predicate; nodes whose gate evaluates false are removed
    /// from the graph before validation.
    pub gate: Gate,
}

impl ResourceDeclaration {
    /// Creates a declaration with no properties and an always-true gate.
    pub fn new(name: impl Into<ResourceName>, resource_type: impl Into<ResourceType>) -> Self {
        Self {
            name: name.into(),
            resource_type: resource_type.into(),
            properties: BTreeMap::new(),
            depends_on: Vec::new(),
            gate: Gate::Always,
        }
    }

    /// Sets a property value.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Sets a secret property value.
    pub fn with_secret(mut self, key: impl Into<String>, value: impl Into<SecretString>) -> Self {
        self.properties
            .insert(key.into(), PropertyValue::Secret(value.into()));
        self
    }

    /// Sets a required reference to another node's output.
    pub fn with_reference(
        mut self,
        key: impl Into<String>,
        node: impl Into<ResourceName>,
        output: impl Into<String>,
    ) -> Self {
        self.properties.insert(
            key.into(),
            PropertyValue::Reference(OutputRef::new(node, output)),
        );
        self
    }

    /// Sets an optional reference to another node's output. The property
    /// is dropped if the target is excluded by its gate.
    pub fn with_optional_reference(
        mut self,
        key: impl Into<String>,
        node: impl Into<ResourceName>,
        output: impl Into<String>,
    ) -> Self {
        self.properties.insert(
            key.into(),
            PropertyValue::OptionalReference(OutputRef::new(node, output)),
        );
        self
    }

    /// Adds an explicit dependency.
    pub fn with_dependency(mut self, name: impl Into<ResourceName>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    /// Sets the inclusion gate.
    pub fn with_gate(mut self, gate: Gate) -> Self {
        self.gate = gate;
        self
    }

    /// Iterates over reference-typed properties as
    /// `(property, reference, optional)`.
    pub fn references(&self) -> impl Iterator<Item = (&str, &OutputRef, bool)> {
        self.properties.iter().filter_map(|(key, value)| {
            value
                .as_reference()
                .map(|(reference, optional)| (key.as_str(), reference, optional))
        })
    }
}

//! Property values: literals, secrets, and deferred references.

use derive_more::From;

use super::declaration::ResourceName;
use crate::config::SecretString;

/// A reference to another node's named output.
///
/// Output values are assigned by the provider and only exist after the
/// producing node has been applied; references are therefore resolved by
/// the scheduler, never by direct property reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRef {
    /// Name of the producing node.
    pub node: ResourceName,
    /// Name of the output attribute.
    pub output: String,
}

impl OutputRef {
    /// Creates a reference to `node`'s output `output`.
    pub fn new(node: impl Into<ResourceName>, output: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            output: output.into(),
        }
    }
}

impl std::fmt::Display for OutputRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.node, self.output)
    }
}

/// A single property value in a resource declaration.
#[derive(Debug, Clone, PartialEq, From)]
pub enum PropertyValue {
    /// A plain literal value.
    Literal(serde_json::Value),
    /// A secret value; never persisted or rendered in plaintext.
    Secret(SecretString),
    /// A required reference to another node's output. The target must
    /// exist in the final graph.
    Reference(OutputRef),
    /// An optional reference. If the target is excluded by its gate, the
    /// property is dropped rather than failing the build.
    #[from(ignore)]
    OptionalReference(OutputRef),
}

/// Rendered in plans for reference values whose producer has not been
/// applied yet.
pub const DEFERRED_VALUE: &str = "(known after apply)";

impl PropertyValue {
    /// Creates a literal from any JSON-convertible value.
    pub fn literal(value: impl Into<serde_json::Value>) -> Self {
        Self::Literal(value.into())
    }

    /// Resolves to the plaintext payload sent to the provider.
    ///
    /// References are resolved through `lookup`; `None` means the
    /// referenced output is not available.
    pub(crate) fn payload<F>(&self, lookup: &F) -> Option<serde_json::Value>
    where
        F: Fn(&OutputRef) -> Option<serde_json::Value>,
    {
        match self {
            Self::Literal(value) => Some(value.clone()),
            Self::Secret(secret) => Some(serde_json::Value::String(secret.expose().to_owned())),
            Self::Reference(reference) | Self::OptionalReference(reference) => lookup(reference),
        }
    }

    /// Resolves to the redacted fingerprint recorded in state and shown
    /// in plans: secrets become digests, unresolvable references become
    /// [`DEFERRED_VALUE`].
    pub(crate) fn fingerprint<F>(&self, lookup: &F) -> serde_json::Value
    where
        F: Fn(&OutputRef) -> Option<serde_json::Value>,
    {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Secret(secret) => serde_json::Value::String(secret.fingerprint()),
            Self::Reference(reference) | Self::OptionalReference(reference) => {
                lookup(reference).unwrap_or_else(|| serde_json::Value::String(DEFERRED_VALUE.into()))
            }
        }
    }

    /// Returns the referenced output, if this value defers to one.
    pub fn as_reference(&self) -> Option<(&OutputRef, bool)> {
        match self {
            Self::Reference(reference) => Some((reference, false)),
            Self::OptionalReference(reference) => Some((reference, true)),
            Self::Literal(_) | Self::Secret(_) => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Literal(value.into())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Literal(value.into())
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Literal(value.into())
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Literal(value.into())
    }
}

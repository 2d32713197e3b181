//! Engine error types.

use thiserror::Error;

use crate::graph::ResourceName;
use crate::provider::ProviderError;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while building or applying a resource graph.
///
/// The graph-construction variants (`DuplicateName`, `CycleDetected`,
/// `UnknownReference`, `MisconfiguredDependency`, `InvalidConfig`) are
/// raised before any provider call is made.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Two declarations share a logical name.
    #[error("duplicate resource name: {0}")]
    DuplicateName(ResourceName),

    /// The dependency relation contains a cycle.
    #[error("dependency cycle involving: {}", names.join(", "))]
    CycleDetected {
        /// Names of the resources participating in the cycle.
        names: Vec<String>,
    },

    /// A property or explicit dependency references a name that was
    /// never declared.
    #[error("resource {node} references unknown resource {reference}")]
    UnknownReference {
        /// Name of the referencing resource.
        node: ResourceName,
        /// The name it referenced.
        reference: ResourceName,
    },

    /// A required reference points at a node excluded by its gate.
    #[error("resource {node} property '{property}' requires {target}, which is excluded by its gate")]
    MisconfiguredDependency {
        /// Name of the referencing resource.
        node: ResourceName,
        /// Property holding the reference.
        property: String,
        /// The gated-out target.
        target: ResourceName,
    },

    /// A configuration value could not be resolved.
    #[error("invalid config value for '{key}': {message}")]
    InvalidConfig {
        /// Config key that failed to resolve.
        key: String,
        /// Error message.
        message: String,
    },

    /// A provider call failed after retries were exhausted.
    #[error("provider error for {node}: {source}")]
    Provider {
        /// Resource the call was made for.
        node: ResourceName,
        /// Underlying provider error.
        #[source]
        source: ProviderError,
    },

    /// State store operation failed.
    #[error("state store error: {0}")]
    State(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

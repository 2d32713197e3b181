//! The provider boundary.
//!
//! This is the only effectful interface in the engine:
//! - [`ResourceProvider`]: create/read/update/delete against the real
//!   world, plus an in-place-update capability query
//! - [`ProviderError`]: failure taxonomy with a transient classification
//! - [`RetryPolicy`]: bounded exponential backoff for transient failures
//! - [`MemoryProvider`]: deterministic in-memory double for tests

mod memory;
mod retry;

use std::collections::BTreeMap;

use thiserror::Error;

pub use memory::{CallCounters, MemoryProvider};
pub use retry::RetryPolicy;

use crate::graph::ResourceType;

/// Result type for provider calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors surfaced by a provider.
///
/// Only [`ProviderError::Transient`] is retried; everything else is
/// fatal to the affected node and its transitive dependents.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Transient transport failure; safe to retry.
    #[error("transient network error: {0}")]
    Transient(String),

    /// Authentication or authorization failure.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Quota or rate limit exhausted.
    #[error("quota exceeded: {0}")]
    Quota(String),

    /// The provider does not handle this resource kind.
    #[error("unsupported resource type: {0}")]
    UnsupportedType(ResourceType),

    /// The addressed resource does not exist.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// The provider rejected the request payload.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    /// Returns whether the error is safe to retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// A freshly created resource: its provider-assigned identifier and
/// output attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedResource {
    /// Provider-assigned identifier.
    pub id: String,
    /// Provider-assigned output attributes.
    pub outputs: BTreeMap<String, serde_json::Value>,
}

/// The network-facing boundary of the engine.
///
/// Every method must be idempotent-safe to retry on transient errors.
/// Property payloads are flat maps of resolved values; secrets arrive in
/// plaintext here and nowhere else.
#[async_trait::async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Creates a resource and returns its identifier and outputs.
    async fn create(
        &self,
        resource_type: &ResourceType,
        properties: &BTreeMap<String, serde_json::Value>,
    ) -> ProviderResult<CreatedResource>;

    /// Reads a resource's current properties; `None` if it no longer
    /// exists.
    async fn read(
        &self,
        resource_type: &ResourceType,
        id: &str,
    ) -> ProviderResult<Option<BTreeMap<String, serde_json::Value>>>;

    /// Updates a resource in place and returns its refreshed outputs.
    async fn update(
        &self,
        resource_type: &ResourceType,
        id: &str,
        properties: &BTreeMap<String, serde_json::Value>,
    ) -> ProviderResult<BTreeMap<String, serde_json::Value>>;

    /// Deletes a resource. Deleting an already-absent resource is not an
    /// error.
    async fn delete(&self, resource_type: &ResourceType, id: &str) -> ProviderResult<()>;

    /// Returns whether the given resource kind supports in-place
    /// updates. Kinds that do not are replaced (delete then create) when
    /// their properties change.
    fn update_in_place(&self, _resource_type: &ResourceType) -> bool {
        true
    }
}

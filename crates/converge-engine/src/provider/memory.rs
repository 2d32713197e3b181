//! Deterministic in-memory provider double.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use derive_more::Debug;

use super::{CreatedResource, ProviderError, ProviderResult, ResourceProvider};
use crate::graph::ResourceType;

type Properties = BTreeMap<String, serde_json::Value>;
type OutputSynthesizer =
    dyn Fn(&ResourceType, &str, &Properties) -> Properties + Send + Sync + 'static;

/// Per-method call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounters {
    /// Number of `create` calls.
    pub creates: usize,
    /// Number of `read` calls.
    pub reads: usize,
    /// Number of `update` calls.
    pub updates: usize,
    /// Number of `delete` calls.
    pub deletes: usize,
}

impl CallCounters {
    /// Total number of mutating calls.
    pub fn mutations(&self) -> usize {
        self.creates + self.updates + self.deletes
    }
}

#[derive(Debug, Clone)]
struct StoredResource {
    resource_type: ResourceType,
    properties: Properties,
}

/// In-memory [`ResourceProvider`] with deterministic identifiers and a
/// call recorder.
///
/// Identifiers are synthesized as `<type>/<sequence>`; outputs default to
/// the resource's scalar properties plus `id`, which is enough for graphs
/// whose references read back declared fields. Tests can register a
/// custom output synthesizer for provider-computed attributes (an
/// assigned URI, for example), inject failures per resource type, and
/// mark types as immutable to exercise the replace path.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    resources: Mutex<BTreeMap<String, StoredResource>>,
    counters: Mutex<CallCounters>,
    sequence: AtomicU64,
    transient_failures: AtomicU32,
    immutable_types: HashSet<ResourceType>,
    failing_types: HashSet<ResourceType>,
    #[debug(skip)]
    synthesizer: Option<Box<OutputSynthesizer>>,
}

impl MemoryProvider {
    /// Creates an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a resource type as not updatable in place.
    pub fn with_immutable_type(mut self, resource_type: impl Into<ResourceType>) -> Self {
        self.immutable_types.insert(resource_type.into());
        self
    }

    /// Makes create/update calls for a resource type fail.
    pub fn with_failing_type(mut self, resource_type: impl Into<ResourceType>) -> Self {
        self.failing_types.insert(resource_type.into());
        self
    }

    /// Makes the next `count` mutating calls fail with a transient
    /// error before succeeding.
    pub fn with_transient_failures(self, count: u32) -> Self {
        self.transient_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Registers an output synthesizer, replacing the default
    /// properties-plus-id behavior.
    pub fn with_output_synthesizer<F>(mut self, synthesizer: F) -> Self
    where
        F: Fn(&ResourceType, &str, &Properties) -> Properties + Send + Sync + 'static,
    {
        self.synthesizer = Some(Box::new(synthesizer));
        self
    }

    /// Returns a snapshot of the call counters.
    pub fn counters(&self) -> CallCounters {
        *self.counters.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the number of live resources.
    pub fn resource_count(&self) -> usize {
        self.resources.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    /// Returns the stored properties for an identifier.
    pub fn resource(&self, id: &str) -> Option<Properties> {
        self.resources
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(id)
            .map(|stored| stored.properties.clone())
    }

    /// Returns all live identifiers, sorted.
    pub fn ids(&self) -> Vec<String> {
        self.resources
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    fn outputs_for(&self, resource_type: &ResourceType, id: &str, properties: &Properties) -> Properties {
        match &self.synthesizer {
            Some(synthesizer) => synthesizer(resource_type, id, properties),
            None => {
                let mut outputs = properties.clone();
                outputs.insert("id".into(), serde_json::Value::String(id.to_owned()));
                outputs
            }
        }
    }

    fn check_failures(&self, resource_type: &ResourceType) -> ProviderResult<()> {
        let remaining = self.transient_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(ProviderError::Transient("injected transient failure".into()));
        }
        if self.failing_types.contains(resource_type) {
            return Err(ProviderError::InvalidRequest(format!(
                "injected failure for {resource_type}"
            )));
        }
        Ok(())
    }

    fn count(&self, bump: impl FnOnce(&mut CallCounters)) {
        bump(&mut self.counters.lock().unwrap_or_else(|poisoned| poisoned.into_inner()));
    }
}

#[async_trait::async_trait]
impl ResourceProvider for MemoryProvider {
    async fn create(
        &self,
        resource_type: &ResourceType,
        properties: &Properties,
    ) -> ProviderResult<CreatedResource> {
        self.count(|counters| counters.creates += 1);
        self.check_failures(resource_type)?;

        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let id = format!("{resource_type}/{sequence:04}");
        self.resources.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).insert(
            id.clone(),
            StoredResource {
                resource_type: resource_type.clone(),
                properties: properties.clone(),
            },
        );

        let outputs = self.outputs_for(resource_type, &id, properties);
        Ok(CreatedResource { id, outputs })
    }

    async fn read(
        &self,
        resource_type: &ResourceType,
        id: &str,
    ) -> ProviderResult<Option<Properties>> {
        self.count(|counters| counters.reads += 1);
        Ok(self
            .resources
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(id)
            .filter(|stored| stored.resource_type == *resource_type)
            .map(|stored| stored.properties.clone()))
    }

    async fn update(
        &self,
        resource_type: &ResourceType,
        id: &str,
        properties: &Properties,
    ) -> ProviderResult<Properties> {
        self.count(|counters| counters.updates += 1);
        self.check_failures(resource_type)?;

        let mut resources = self.resources.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let stored = resources
            .get_mut(id)
            .ok_or_else(|| ProviderError::NotFound(id.to_owned()))?;
        stored.properties = properties.clone();
        drop(resources);

        Ok(self.outputs_for(resource_type, id, properties))
    }

    async fn delete(&self, _resource_type: &ResourceType, id: &str) -> ProviderResult<()> {
        self.count(|counters| counters.deletes += 1);
        self.resources
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(id);
        Ok(())
    }

    fn update_in_place(&self, resource_type: &ResourceType) -> bool {
        !self.immutable_types.contains(resource_type)
    }
}

//! Last-applied state records.
//!
//! The state store maps resource names to their last-applied record:
//! provider-assigned id, redacted property fingerprints, outputs, and the
//! dependency list captured at apply time (needed to order deletions of
//! resources whose declarations no longer exist). Records are written one
//! node at a time so a crash mid-run leaves a consistent picture of
//! exactly which nodes completed.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::graph::{ResourceName, ResourceType};

/// Last-applied record for a single resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Logical name of the resource.
    pub name: ResourceName,
    /// Provider resource kind.
    pub resource_type: ResourceType,
    /// Provider-assigned identifier.
    pub resource_id: String,
    /// Property fingerprints as applied; secret values are stored as
    /// SHA-256 digests, never in plaintext.
    pub properties: BTreeMap<String, serde_json::Value>,
    /// Provider-assigned outputs.
    pub outputs: BTreeMap<String, serde_json::Value>,
    /// Dependencies at apply time, used for deletion ordering.
    pub depends_on: Vec<ResourceName>,
    /// When the record was written.
    pub applied_at: Timestamp,
}

/// Persistent store of [`NodeRecord`]s.
///
/// Implementations must make [`StateStore::record`] and
/// [`StateStore::remove`] atomic per node.
pub trait StateStore: Send + Sync {
    /// Returns a snapshot of all records.
    fn load(&self) -> EngineResult<BTreeMap<ResourceName, NodeRecord>>;

    /// Inserts or replaces the record for one resource.
    fn record(&self, record: NodeRecord) -> EngineResult<()>;

    /// Removes the record for one resource, if present.
    fn remove(&self, name: &ResourceName) -> EngineResult<()>;
}

/// In-memory state store.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    records: Mutex<BTreeMap<ResourceName, NodeRecord>>,
}

impl MemoryStateStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> EngineResult<BTreeMap<ResourceName, NodeRecord>> {
        Ok(self.lock()?.clone())
    }

    fn record(&self, record: NodeRecord) -> EngineResult<()> {
        self.lock()?.insert(record.name.clone(), record);
        Ok(())
    }

    fn remove(&self, name: &ResourceName) -> EngineResult<()> {
        self.lock()?.remove(name);
        Ok(())
    }
}

impl MemoryStateStore {
    fn lock(&self) -> EngineResult<std::sync::MutexGuard<'_, BTreeMap<ResourceName, NodeRecord>>> {
        self.records
            .lock()
            .map_err(|_| EngineError::State("state store mutex poisoned".into()))
    }
}

/// JSON-file state store.
///
/// Each mutation rewrites the whole file through a temporary sibling and
/// an atomic rename, so readers never observe a partial write.
#[derive(Debug)]
pub struct JsonFileStateStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStateStore {
    /// Creates a store backed by the given file. The file is created on
    /// first write; a missing file reads as an empty store.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn read_all(&self) -> EngineResult<BTreeMap<ResourceName, NodeRecord>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(EngineError::State(format!(
                "failed to read {}: {err}",
                self.path.display()
            ))),
        }
    }

    fn write_all(&self, records: &BTreeMap<ResourceName, NodeRecord>) -> EngineResult<()> {
        let parent = self.path.parent().unwrap_or_else(|| std::path::Path::new("."));
        let payload = serde_json::to_vec_pretty(records)?;

        let mut temp = tempfile_in(parent).map_err(|err| {
            EngineError::State(format!("failed to create temp state file: {err}"))
        })?;
        temp.file.write_all(&payload).map_err(|err| {
            EngineError::State(format!("failed to write temp state file: {err}"))
        })?;
        std::fs::rename(&temp.path, &self.path).map_err(|err| {
            EngineError::State(format!(
                "failed to replace {}: {err}",
                self.path.display()
            ))
        })?;
        temp.persisted = true;
        Ok(())
    }
}

impl StateStore for JsonFileStateStore {
    fn load(&self) -> EngineResult<BTreeMap<ResourceName, NodeRecord>> {
        self.read_all()
    }

    fn record(&self, record: NodeRecord) -> EngineResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| EngineError::State("state store mutex poisoned".into()))?;
        let mut records = self.read_all()?;
        records.insert(record.name.clone(), record);
        self.write_all(&records)
    }

    fn remove(&self, name: &ResourceName) -> EngineResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| EngineError::State("state store mutex poisoned".into()))?;
        let mut records = self.read_all()?;
        if records.remove(name).is_some() {
            self.write_all(&records)?;
        }
        Ok(())
    }
}

/// Orders records for deletion: dependents before their dependencies,
/// ties broken by name. Used for resources whose declarations no longer
/// exist, where only the recorded dependency lists are available.
pub(crate) fn deletion_order(records: &BTreeMap<ResourceName, NodeRecord>) -> Vec<ResourceName> {
    let mut remaining: BTreeMap<ResourceName, &NodeRecord> = records
        .iter()
        .map(|(name, record)| (name.clone(), record))
        .collect();
    let mut order = Vec::with_capacity(records.len());

    while !remaining.is_empty() {
        let mut removable = Vec::new();
        for name in remaining.keys() {
            let is_dependency = remaining
                .values()
                .any(|record| record.depends_on.contains(name));
            if !is_dependency {
                removable.push(name.clone());
            }
        }
        if removable.is_empty() {
            // Recorded dependencies form a cycle, which a healthy store
            // cannot contain; fall back to name order.
            order.extend(remaining.into_keys());
            break;
        }
        for name in removable {
            remaining.remove(&name);
            order.push(name);
        }
    }

    order
}

/// A temporary file that is deleted on drop unless persisted.
struct TempFile {
    path: PathBuf,
    file: std::fs::File,
    persisted: bool,
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if !self.persisted {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

fn tempfile_in(dir: &std::path::Path) -> std::io::Result<TempFile> {
    let name = format!(".state.{}.tmp", uuid::Uuid::now_v7());
    let path = dir.join(name);
    let file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)?;
    Ok(TempFile {
        path,
        file,
        persisted: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> NodeRecord {
        NodeRecord {
            name: name.into(),
            resource_type: "test:resource".into(),
            resource_id: format!("test/{name}"),
            properties: BTreeMap::from([("port".into(), serde_json::json!(3000))]),
            outputs: BTreeMap::from([("id".into(), serde_json::json!(format!("test/{name}")))]),
            depends_on: Vec::new(),
            applied_at: Timestamp::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStateStore::new();
        store.record(record("service")).unwrap();
        let records = store.load().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[&"service".into()].resource_id, "test/service");

        store.remove(&"service".into()).unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_file_store_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStateStore::new(dir.path().join("state.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = JsonFileStateStore::new(&path);

        store.record(record("service")).unwrap();
        store.record(record("binding")).unwrap();
        store.remove(&"binding".into()).unwrap();

        let reloaded = JsonFileStateStore::new(&path).load().unwrap();
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded.contains_key(&"service".into()));

        // No temp files left behind.
        let stray: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name() != "state.json")
            .collect();
        assert!(stray.is_empty());
    }

    #[test]
    fn test_deletion_order_deletes_dependents_first() {
        let mut connector = record("connector");
        connector.depends_on = vec!["vpcaccess-api".into()];
        let mut service = record("service");
        service.depends_on = vec!["connector".into()];
        let records = BTreeMap::from([
            ("vpcaccess-api".into(), record("vpcaccess-api")),
            ("connector".into(), connector),
            ("service".into(), service),
        ]);

        let order = deletion_order(&records);
        let names: Vec<&str> = order.iter().map(ResourceName::as_str).collect();
        assert_eq!(names, vec!["service", "connector", "vpcaccess-api"]);
    }

    #[test]
    fn test_file_store_never_persists_secret_plaintext() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = JsonFileStateStore::new(&path);

        let mut rec = record("service");
        rec.properties.insert(
            "env.DB_PASS".into(),
            serde_json::json!("sha256:deadbeef"),
        );
        store.record(rec).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("sha256:deadbeef"));
    }
}

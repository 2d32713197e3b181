//! Pre-apply plans: the human-readable diff shown before any mutation.

use std::collections::BTreeMap;

use strum::Display;

use crate::graph::{OutputRef, ResourceGraph, ResourceName, ResourceType};
use crate::state::NodeRecord;

/// Planned action for one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum PlanAction {
    /// No prior record; the resource will be created.
    Create,
    /// Properties changed; the resource will be updated in place.
    Update,
    /// Properties changed but the kind does not support in-place
    /// updates; the resource will be deleted and recreated.
    Replace,
    /// Declared and recorded state match; no provider mutation.
    Unchanged,
    /// Recorded but no longer declared; the resource will be deleted.
    Delete,
}

/// One property-level difference, in redacted fingerprint form.
///
/// Secret values appear as digests and unresolved references as
/// [`crate::graph::DEFERRED_VALUE`]; plaintext secrets never reach a
/// plan.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDiff {
    /// Property name.
    pub key: String,
    /// Recorded value, absent for new properties.
    pub before: Option<serde_json::Value>,
    /// Desired value, absent for removed properties.
    pub after: Option<serde_json::Value>,
}

/// Planned action and property diff for one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanEntry {
    /// Logical resource name.
    pub name: ResourceName,
    /// Provider resource kind.
    pub resource_type: ResourceType,
    /// Planned action.
    pub action: PlanAction,
    /// Property-level differences; empty for unchanged resources.
    pub diffs: Vec<PropertyDiff>,
}

/// The full plan for a graph, in execution order with deletions last.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// Per-resource entries.
    pub entries: Vec<PlanEntry>,
}

impl Plan {
    /// Computes the plan for a graph against the recorded state.
    ///
    /// `update_in_place` is the provider's capability query, deciding
    /// between [`PlanAction::Update`] and [`PlanAction::Replace`]. Pure:
    /// no provider call is made and nothing is mutated.
    pub fn compute<F>(
        graph: &ResourceGraph,
        records: &BTreeMap<ResourceName, NodeRecord>,
        update_in_place: F,
    ) -> Self
    where
        F: Fn(&ResourceType) -> bool,
    {
        // Best-effort reference resolution: outputs recorded for the
        // producer are shown, anything else renders as deferred.
        let lookup = |reference: &OutputRef| -> Option<serde_json::Value> {
            records
                .get(&reference.node)
                .and_then(|record| record.outputs.get(&reference.output).cloned())
        };

        let mut entries = Vec::new();
        for name in graph.execution_order() {
            let Some(declaration) = graph.declaration(name) else {
                continue;
            };
            let desired: BTreeMap<String, serde_json::Value> = declaration
                .properties
                .iter()
                .map(|(key, value)| (key.clone(), value.fingerprint(&lookup)))
                .collect();

            let entry = match records.get(name) {
                None => PlanEntry {
                    name: name.clone(),
                    resource_type: declaration.resource_type.clone(),
                    action: PlanAction::Create,
                    diffs: diff_properties(&BTreeMap::new(), &desired),
                },
                Some(record) if record.properties == desired => PlanEntry {
                    name: name.clone(),
                    resource_type: declaration.resource_type.clone(),
                    action: PlanAction::Unchanged,
                    diffs: Vec::new(),
                },
                Some(record) => {
                    let action = if update_in_place(&declaration.resource_type) {
                        PlanAction::Update
                    } else {
                        PlanAction::Replace
                    };
                    PlanEntry {
                        name: name.clone(),
                        resource_type: declaration.resource_type.clone(),
                        action,
                        diffs: diff_properties(&record.properties, &desired),
                    }
                }
            };
            entries.push(entry);
        }

        for name in crate::state::deletion_order(
            &records
                .iter()
                .filter(|(name, _)| !graph.contains(name))
                .map(|(name, record)| (name.clone(), record.clone()))
                .collect(),
        ) {
            let record = &records[&name];
            entries.push(PlanEntry {
                name: name.clone(),
                resource_type: record.resource_type.clone(),
                action: PlanAction::Delete,
                diffs: diff_properties(&record.properties, &BTreeMap::new()),
            });
        }

        Self { entries }
    }

    /// Returns whether the plan contains no mutations.
    pub fn is_unchanged(&self) -> bool {
        self.entries
            .iter()
            .all(|entry| entry.action == PlanAction::Unchanged)
    }

    /// Returns the number of entries planned for the given action.
    pub fn count(&self, action: PlanAction) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.action == action)
            .count()
    }
}

fn diff_properties(
    before: &BTreeMap<String, serde_json::Value>,
    after: &BTreeMap<String, serde_json::Value>,
) -> Vec<PropertyDiff> {
    let keys: std::collections::BTreeSet<&String> = before.keys().chain(after.keys()).collect();
    keys.into_iter()
        .filter_map(|key| {
            let old = before.get(key);
            let new = after.get(key);
            (old != new).then(|| PropertyDiff {
                key: key.clone(),
                before: old.cloned(),
                after: new.cloned(),
            })
        })
        .collect()
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for entry in &self.entries {
            let symbol = match entry.action {
                PlanAction::Create => "+",
                PlanAction::Update => "~",
                PlanAction::Replace => "-/+",
                PlanAction::Unchanged => " ",
                PlanAction::Delete => "-",
            };
            writeln!(f, "{symbol:>3} {} ({})", entry.name, entry.resource_type)?;
            for diff in &entry.diffs {
                match (&diff.before, &diff.after) {
                    (Some(old), Some(new)) => {
                        writeln!(f, "      {}: {} -> {}", diff.key, old, new)?
                    }
                    (None, Some(new)) => writeln!(f, "      {}: {}", diff.key, new)?,
                    (Some(old), None) => writeln!(f, "      {}: {} -> (removed)", diff.key, old)?,
                    (None, None) => {}
                }
            }
        }
        writeln!(
            f,
            "Plan: {} to create, {} to update, {} to replace, {} to delete, {} unchanged.",
            self.count(PlanAction::Create),
            self.count(PlanAction::Update),
            self.count(PlanAction::Replace),
            self.count(PlanAction::Delete),
            self.count(PlanAction::Unchanged),
        )
    }
}

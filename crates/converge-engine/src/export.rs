//! Output export: a declared subset of node outputs collected into a
//! flat name/value map after apply.

use std::collections::{BTreeMap, HashMap};

use crate::graph::{OutputRef, ResourceName};

/// Where an exported value comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportSource {
    /// A node's provider-assigned output.
    Output(OutputRef),
    /// A fixed value known at declaration time (a config-derived
    /// identifier, for example).
    Literal(serde_json::Value),
}

/// One caller-declared export.
#[derive(Debug, Clone, PartialEq)]
pub struct Export {
    /// Key in the export map.
    pub key: String,
    /// Value source.
    pub source: ExportSource,
}

impl Export {
    /// Exports a node output under `key`.
    pub fn output(
        key: impl Into<String>,
        node: impl Into<ResourceName>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            source: ExportSource::Output(OutputRef::new(node, output)),
        }
    }

    /// Exports a fixed value under `key`.
    pub fn literal(key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            key: key.into(),
            source: ExportSource::Literal(value.into()),
        }
    }
}

/// Collects exports from a run's outputs into a flat map.
///
/// An export whose node was gated out of the graph, skipped, or failed
/// has no outputs to read; its key is simply absent from the result,
/// never an error.
pub fn collect_exports(
    exports: &[Export],
    outputs: &HashMap<ResourceName, BTreeMap<String, serde_json::Value>>,
) -> BTreeMap<String, serde_json::Value> {
    let mut collected = BTreeMap::new();
    for export in exports {
        match &export.source {
            ExportSource::Literal(value) => {
                collected.insert(export.key.clone(), value.clone());
            }
            ExportSource::Output(reference) => {
                if let Some(value) = outputs
                    .get(&reference.node)
                    .and_then(|node_outputs| node_outputs.get(&reference.output))
                {
                    collected.insert(export.key.clone(), value.clone());
                }
            }
        }
    }
    collected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_node_yields_absent_key() {
        let exports = vec![
            Export::output("service_url", "service", "uri"),
            Export::output("vpc_connector_id", "connector", "id"),
            Export::literal("project_id", "my-project"),
        ];
        let outputs = HashMap::from([(
            ResourceName::from("service"),
            BTreeMap::from([("uri".to_owned(), serde_json::json!("https://svc.example"))]),
        )]);

        let collected = collect_exports(&exports, &outputs);
        assert_eq!(collected["service_url"], serde_json::json!("https://svc.example"));
        assert_eq!(collected["project_id"], serde_json::json!("my-project"));
        assert!(!collected.contains_key("vpc_connector_id"));
    }

    #[test]
    fn test_missing_output_key_is_not_an_error() {
        let exports = vec![Export::output("service_url", "service", "uri")];
        let outputs = HashMap::from([(ResourceName::from("service"), BTreeMap::new())]);
        assert!(collect_exports(&exports, &outputs).is_empty());
    }
}

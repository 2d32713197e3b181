//! Per-node apply outcomes and the run report.

use jiff::Timestamp;
use serde::Serialize;
use uuid::Uuid;

use crate::graph::{ResourceName, ResourceType};

/// Why a node was skipped.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// A direct dependency failed or was itself skipped.
    DependencyFailed {
        /// The dependency that did not apply.
        dependency: ResourceName,
    },
    /// The run was cancelled before the node started.
    Cancelled,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DependencyFailed { dependency } => {
                write!(f, "dependency {dependency} did not apply")
            }
            Self::Cancelled => f.write_str("run cancelled"),
        }
    }
}

/// Final outcome for one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NodeOutcome {
    /// Created; no prior record existed (or the recorded resource had
    /// vanished remotely).
    Created,
    /// Updated in place.
    Updated,
    /// Deleted and recreated because the kind does not update in place.
    Replaced,
    /// Declared and recorded state matched; no mutation issued.
    Unchanged,
    /// Recorded but no longer declared; deleted.
    Deleted,
    /// Not attempted.
    Skipped {
        /// Why the node was not attempted.
        reason: SkipReason,
    },
    /// A provider call failed after retries.
    Failed {
        /// Rendered error.
        error: String,
    },
}

impl NodeOutcome {
    /// Returns whether the node converged (its outputs are usable).
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::Created | Self::Updated | Self::Replaced | Self::Unchanged | Self::Deleted
        )
    }

    /// Short label for rendering.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Replaced => "replaced",
            Self::Unchanged => "unchanged",
            Self::Deleted => "deleted",
            Self::Skipped { .. } => "skipped",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Outcome for one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeReport {
    /// Logical resource name.
    pub name: ResourceName,
    /// Provider resource kind.
    pub resource_type: ResourceType,
    /// What happened.
    pub outcome: NodeOutcome,
}

/// Summary counts over a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportCounts {
    /// Nodes created.
    pub created: usize,
    /// Nodes updated in place.
    pub updated: usize,
    /// Nodes replaced.
    pub replaced: usize,
    /// Nodes left untouched.
    pub unchanged: usize,
    /// Orphaned records deleted.
    pub deleted: usize,
    /// Nodes skipped.
    pub skipped: usize,
    /// Nodes failed.
    pub failed: usize,
}

/// Per-node result list for one apply run.
///
/// Nodes appear in execution order, with deletions of orphaned records
/// appended last. A run with failures still produces a report; failures
/// are scoped to the affected subgraphs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplyReport {
    /// Unique id of the run.
    pub run_id: Uuid,
    /// Per-node outcomes.
    pub nodes: Vec<NodeReport>,
    /// When the run started.
    pub started_at: Timestamp,
    /// When the run finished.
    pub finished_at: Timestamp,
}

impl ApplyReport {
    /// Returns the outcome recorded for a node.
    pub fn outcome(&self, name: &ResourceName) -> Option<&NodeOutcome> {
        self.nodes
            .iter()
            .find(|node| &node.name == name)
            .map(|node| &node.outcome)
    }

    /// Returns summary counts.
    pub fn counts(&self) -> ReportCounts {
        let mut counts = ReportCounts::default();
        for node in &self.nodes {
            match node.outcome {
                NodeOutcome::Created => counts.created += 1,
                NodeOutcome::Updated => counts.updated += 1,
                NodeOutcome::Replaced => counts.replaced += 1,
                NodeOutcome::Unchanged => counts.unchanged += 1,
                NodeOutcome::Deleted => counts.deleted += 1,
                NodeOutcome::Skipped { .. } => counts.skipped += 1,
                NodeOutcome::Failed { .. } => counts.failed += 1,
            }
        }
        counts
    }

    /// Returns whether every node converged.
    pub fn succeeded(&self) -> bool {
        self.nodes.iter().all(|node| node.outcome.is_success())
    }

    /// Returns the first failed node, if any.
    pub fn first_failure(&self) -> Option<&NodeReport> {
        self.nodes
            .iter()
            .find(|node| matches!(node.outcome, NodeOutcome::Failed { .. }))
    }
}

impl std::fmt::Display for ApplyReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for node in &self.nodes {
            write!(f, "{:>9}  {} ({})", node.outcome.label(), node.name, node.resource_type)?;
            match &node.outcome {
                NodeOutcome::Failed { error } => writeln!(f, ": {error}")?,
                NodeOutcome::Skipped { reason } => writeln!(f, ": {reason}")?,
                _ => writeln!(f)?,
            }
        }
        let counts = self.counts();
        writeln!(
            f,
            "Applied: {} created, {} updated, {} replaced, {} deleted, {} unchanged, {} skipped, {} failed.",
            counts.created,
            counts.updated,
            counts.replaced,
            counts.deleted,
            counts.unchanged,
            counts.skipped,
            counts.failed,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcomes: Vec<(&str, NodeOutcome)>) -> ApplyReport {
        ApplyReport {
            run_id: Uuid::from_u128(1),
            nodes: outcomes
                .into_iter()
                .map(|(name, outcome)| NodeReport {
                    name: name.into(),
                    resource_type: "test:resource".into(),
                    outcome,
                })
                .collect(),
            started_at: Timestamp::UNIX_EPOCH,
            finished_at: Timestamp::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_counts_and_success() {
        let report = report(vec![
            ("run-api", NodeOutcome::Unchanged),
            ("service", NodeOutcome::Created),
            ("binding", NodeOutcome::Updated),
        ]);
        let counts = report.counts();
        assert_eq!(counts.created, 1);
        assert_eq!(counts.updated, 1);
        assert_eq!(counts.unchanged, 1);
        assert!(report.succeeded());
        assert!(report.first_failure().is_none());
    }

    #[test]
    fn test_failure_and_skip_rendering() {
        let report = report(vec![
            (
                "service",
                NodeOutcome::Failed {
                    error: "quota exceeded".into(),
                },
            ),
            (
                "binding",
                NodeOutcome::Skipped {
                    reason: SkipReason::DependencyFailed {
                        dependency: "service".into(),
                    },
                },
            ),
        ]);

        assert!(!report.succeeded());
        assert_eq!(report.first_failure().unwrap().name.as_str(), "service");
        let rendered = report.to_string();
        assert!(rendered.contains("quota exceeded"));
        assert!(rendered.contains("dependency service did not apply"));
        assert!(rendered.contains("1 failed"));
    }
}

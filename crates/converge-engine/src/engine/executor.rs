//! The apply engine: state convergence over a validated graph.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::ApplyConfig;
use crate::error::{EngineError, EngineResult};
use crate::export::{Export, collect_exports};
use crate::graph::{OutputRef, ResourceDeclaration, ResourceGraph, ResourceName};
use crate::plan::Plan;
use crate::provider::ResourceProvider;
use crate::report::{ApplyReport, NodeOutcome, NodeReport, SkipReason};
use crate::state::{NodeRecord, StateStore, deletion_order};

/// Tracing target for apply operations.
const TRACING_TARGET: &str = "converge_engine::apply";

type Properties = BTreeMap<String, serde_json::Value>;

/// Outputs and per-node report of a finished apply run.
#[derive(Debug)]
pub struct ApplyRun {
    /// Per-node outcomes, in execution order with deletions last.
    pub report: ApplyReport,
    /// Outputs of every node that converged in this run.
    pub outputs: HashMap<ResourceName, Properties>,
}

impl ApplyRun {
    /// Collects the given exports from this run's outputs.
    pub fn exports(&self, exports: &[Export]) -> Properties {
        collect_exports(exports, &self.outputs)
    }
}

/// Successful convergence of one node.
struct NodeSuccess {
    outcome: NodeOutcome,
    /// New state record; `None` when the node was unchanged.
    record: Option<NodeRecord>,
    outputs: Properties,
}

/// The apply engine.
///
/// Walks a validated graph in execution order, converging each node with
/// the minimal provider mutation. Nodes within a ready rank apply
/// concurrently, bounded by a semaphore; the state store is only ever
/// written from the coordinating task, one node at a time.
pub struct Applier {
    provider: Arc<dyn ResourceProvider>,
    state: Arc<dyn StateStore>,
    config: ApplyConfig,
    semaphore: Arc<Semaphore>,
}

impl Applier {
    /// Creates an applier with the given configuration.
    pub fn new(
        provider: Arc<dyn ResourceProvider>,
        state: Arc<dyn StateStore>,
        config: ApplyConfig,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_applies));

        tracing::info!(
            target: TRACING_TARGET,
            max_concurrent_applies = config.max_concurrent_applies,
            refresh = config.refresh,
            prune = config.prune,
            "Applier initialized"
        );

        Self {
            provider,
            state,
            config,
            semaphore,
        }
    }

    /// Creates an applier with default configuration.
    pub fn with_defaults(provider: Arc<dyn ResourceProvider>, state: Arc<dyn StateStore>) -> Self {
        Self::new(provider, state, ApplyConfig::default())
    }

    /// Returns the applier configuration.
    pub fn config(&self) -> &ApplyConfig {
        &self.config
    }

    /// Computes the plan for a graph without mutating anything.
    pub fn plan(&self, graph: &ResourceGraph) -> EngineResult<Plan> {
        let records = self.state.load()?;
        Ok(Plan::compute(graph, &records, |resource_type| {
            self.provider.update_in_place(resource_type)
        }))
    }

    /// Applies the graph to convergence.
    pub async fn apply(&self, graph: &ResourceGraph) -> EngineResult<ApplyRun> {
        self.apply_with_cancellation(graph, CancellationToken::new())
            .await
    }

    /// Applies the graph, honoring a cancellation token: in-flight
    /// provider calls complete, but no new node is started after
    /// cancellation; unstarted nodes report as skipped.
    pub async fn apply_with_cancellation(
        &self,
        graph: &ResourceGraph,
        cancel: CancellationToken,
    ) -> EngineResult<ApplyRun> {
        let run_id = Uuid::now_v7();
        let started_at = jiff::Timestamp::now();
        let records = self.state.load()?;

        tracing::info!(
            target: TRACING_TARGET,
            %run_id,
            node_count = graph.node_count(),
            recorded = records.len(),
            "Starting apply"
        );

        let mut outputs: HashMap<ResourceName, Properties> = HashMap::new();
        let mut outcomes: HashMap<ResourceName, NodeOutcome> = HashMap::new();
        let mut pending: Vec<ResourceName> = graph.execution_order().to_vec();

        while !pending.is_empty() {
            // Propagate skips and collect the ready rank.
            let mut ready: Vec<ResourceName> = Vec::new();
            let mut still_pending: Vec<ResourceName> = Vec::new();
            let mut skipped = 0usize;

            for name in pending.drain(..) {
                if cancel.is_cancelled() {
                    outcomes.insert(
                        name,
                        NodeOutcome::Skipped {
                            reason: SkipReason::Cancelled,
                        },
                    );
                    skipped += 1;
                    continue;
                }

                let dependencies = graph.dependencies_of(&name);
                let blocked = dependencies
                    .iter()
                    .find(|dep| matches!(outcomes.get(dep), Some(outcome) if !outcome.is_success()));
                if let Some(dependency) = blocked {
                    outcomes.insert(
                        name.clone(),
                        NodeOutcome::Skipped {
                            reason: SkipReason::DependencyFailed {
                                dependency: dependency.clone(),
                            },
                        },
                    );
                    skipped += 1;
                } else if dependencies
                    .iter()
                    .all(|dep| outcomes.get(dep).is_some_and(NodeOutcome::is_success))
                {
                    ready.push(name);
                } else {
                    still_pending.push(name);
                }
            }
            pending = still_pending;

            if ready.is_empty() {
                if skipped == 0 && !pending.is_empty() {
                    return Err(EngineError::Internal(
                        "scheduler stalled with pending nodes".into(),
                    ));
                }
                continue;
            }

            // Resolve payloads on the coordinator, then converge the
            // rank concurrently.
            let mut tasks = Vec::new();
            for name in ready {
                let Some(declaration) = graph.declaration(&name) else {
                    return Err(EngineError::Internal(format!(
                        "no declaration for scheduled node {name}"
                    )));
                };
                match resolve_properties(declaration, &outputs) {
                    Ok((payload, fingerprint)) => {
                        let dependencies = graph.dependencies_of(&name);
                        let record = records.get(&name).cloned();
                        tasks.push(self.converge_node(
                            declaration,
                            payload,
                            fingerprint,
                            dependencies,
                            record,
                        ));
                    }
                    Err(error) => {
                        outcomes.insert(name, NodeOutcome::Failed { error });
                    }
                }
            }

            for (name, result) in futures::future::join_all(tasks).await {
                match result {
                    Ok(success) => {
                        if let Some(record) = success.record {
                            self.state.record(record)?;
                        }
                        outputs.insert(name.clone(), success.outputs);
                        outcomes.insert(name, success.outcome);
                    }
                    Err(err) => {
                        tracing::warn!(
                            target: TRACING_TARGET,
                            resource = %name,
                            error = %err,
                            "Node failed to converge"
                        );
                        outcomes.insert(
                            name,
                            NodeOutcome::Failed {
                                error: err.to_string(),
                            },
                        );
                    }
                }
            }
        }

        let mut nodes: Vec<NodeReport> = Vec::with_capacity(graph.node_count());
        for name in graph.execution_order() {
            let Some(declaration) = graph.declaration(name) else {
                continue;
            };
            let outcome = outcomes.remove(name).unwrap_or(NodeOutcome::Skipped {
                reason: SkipReason::Cancelled,
            });
            nodes.push(NodeReport {
                name: name.clone(),
                resource_type: declaration.resource_type.clone(),
                outcome,
            });
        }

        if self.config.prune {
            let orphans: BTreeMap<ResourceName, NodeRecord> = records
                .iter()
                .filter(|(name, _)| !graph.contains(name))
                .map(|(name, record)| (name.clone(), record.clone()))
                .collect();
            for name in deletion_order(&orphans) {
                let record = &orphans[&name];
                let outcome = if cancel.is_cancelled() {
                    NodeOutcome::Skipped {
                        reason: SkipReason::Cancelled,
                    }
                } else {
                    self.delete_orphan(record).await
                };
                nodes.push(NodeReport {
                    name,
                    resource_type: record.resource_type.clone(),
                    outcome,
                });
            }
        }

        let report = ApplyReport {
            run_id,
            nodes,
            started_at,
            finished_at: jiff::Timestamp::now(),
        };

        tracing::info!(
            target: TRACING_TARGET,
            %run_id,
            succeeded = report.succeeded(),
            "Apply finished"
        );

        Ok(ApplyRun { report, outputs })
    }

    /// Converges a single node: create if absent, update or replace if
    /// changed, no-op if identical.
    async fn converge_node(
        &self,
        declaration: &ResourceDeclaration,
        payload: Properties,
        fingerprint: Properties,
        dependencies: Vec<ResourceName>,
        record: Option<NodeRecord>,
    ) -> (ResourceName, EngineResult<NodeSuccess>) {
        let name = declaration.name.clone();
        let result = self
            .converge_inner(declaration, payload, fingerprint, dependencies, record)
            .await;
        (name, result)
    }

    async fn converge_inner(
        &self,
        declaration: &ResourceDeclaration,
        payload: Properties,
        fingerprint: Properties,
        dependencies: Vec<ResourceName>,
        record: Option<NodeRecord>,
    ) -> EngineResult<NodeSuccess> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| EngineError::Internal("apply semaphore closed".into()))?;

        let name = &declaration.name;
        let kind = &declaration.resource_type;
        let retry = &self.config.retry;
        let wrap = |source| EngineError::Provider {
            node: name.clone(),
            source,
        };

        let Some(record) = record else {
            return self
                .create_node(declaration, payload, fingerprint, dependencies, NodeOutcome::Created)
                .await;
        };

        let exists = if self.config.refresh {
            retry
                .run("read", || self.provider.read(kind, &record.resource_id))
                .await
                .map_err(wrap)?
                .is_some()
        } else {
            true
        };

        if !exists {
            tracing::info!(
                target: TRACING_TARGET,
                resource = %name,
                "Recorded resource missing remotely, recreating"
            );
            return self
                .create_node(declaration, payload, fingerprint, dependencies, NodeOutcome::Created)
                .await;
        }

        if fingerprint == record.properties {
            tracing::debug!(target: TRACING_TARGET, resource = %name, "Unchanged");
            return Ok(NodeSuccess {
                outcome: NodeOutcome::Unchanged,
                record: None,
                outputs: record.outputs,
            });
        }

        if self.provider.update_in_place(kind) {
            let outputs = retry
                .run("update", || {
                    self.provider.update(kind, &record.resource_id, &payload)
                })
                .await
                .map_err(wrap)?;
            tracing::debug!(target: TRACING_TARGET, resource = %name, "Updated in place");
            return Ok(NodeSuccess {
                outcome: NodeOutcome::Updated,
                record: Some(NodeRecord {
                    name: name.clone(),
                    resource_type: kind.clone(),
                    resource_id: record.resource_id,
                    properties: fingerprint,
                    outputs: outputs.clone(),
                    depends_on: dependencies,
                    applied_at: jiff::Timestamp::now(),
                }),
                outputs,
            });
        }

        // No in-place update for this kind: replace.
        retry
            .run("delete", || {
                self.provider.delete(kind, &record.resource_id)
            })
            .await
            .map_err(wrap)?;
        self.create_node(declaration, payload, fingerprint, dependencies, NodeOutcome::Replaced)
            .await
    }

    async fn create_node(
        &self,
        declaration: &ResourceDeclaration,
        payload: Properties,
        fingerprint: Properties,
        dependencies: Vec<ResourceName>,
        outcome: NodeOutcome,
    ) -> EngineResult<NodeSuccess> {
        let name = &declaration.name;
        let kind = &declaration.resource_type;

        let created = self
            .config
            .retry
            .run("create", || self.provider.create(kind, &payload))
            .await
            .map_err(|source| EngineError::Provider {
                node: name.clone(),
                source,
            })?;

        tracing::debug!(
            target: TRACING_TARGET,
            resource = %name,
            id = %created.id,
            "Created"
        );

        Ok(NodeSuccess {
            outcome,
            record: Some(NodeRecord {
                name: name.clone(),
                resource_type: kind.clone(),
                resource_id: created.id,
                properties: fingerprint,
                outputs: created.outputs.clone(),
                depends_on: dependencies,
                applied_at: jiff::Timestamp::now(),
            }),
            outputs: created.outputs,
        })
    }

    /// Deletes one orphaned record. Failures stay scoped to the orphan:
    /// its record is kept so a later run can retry.
    async fn delete_orphan(&self, record: &NodeRecord) -> NodeOutcome {
        let deleted = self
            .config
            .retry
            .run("delete", || {
                self.provider
                    .delete(&record.resource_type, &record.resource_id)
            })
            .await;

        match deleted {
            Ok(()) => match self.state.remove(&record.name) {
                Ok(()) => {
                    tracing::debug!(
                        target: TRACING_TARGET,
                        resource = %record.name,
                        "Deleted orphaned resource"
                    );
                    NodeOutcome::Deleted
                }
                Err(err) => NodeOutcome::Failed {
                    error: err.to_string(),
                },
            },
            Err(source) => {
                let err = EngineError::Provider {
                    node: record.name.clone(),
                    source,
                };
                tracing::warn!(
                    target: TRACING_TARGET,
                    resource = %record.name,
                    error = %err,
                    "Failed to delete orphaned resource"
                );
                NodeOutcome::Failed {
                    error: err.to_string(),
                }
            }
        }
    }
}

/// Resolves a declaration's properties into the provider payload and the
/// recorded fingerprint. References read from the in-run output table;
/// a missing output fails the node (its producer applied without
/// assigning the attribute).
fn resolve_properties(
    declaration: &ResourceDeclaration,
    outputs: &HashMap<ResourceName, Properties>,
) -> Result<(Properties, Properties), String> {
    let lookup = |reference: &OutputRef| -> Option<serde_json::Value> {
        outputs
            .get(&reference.node)
            .and_then(|node_outputs| node_outputs.get(&reference.output).cloned())
    };

    let mut payload = Properties::new();
    let mut fingerprint = Properties::new();
    for (key, value) in &declaration.properties {
        let Some(resolved) = value.payload(&lookup) else {
            let reference = value
                .as_reference()
                .map(|(reference, _)| reference.to_string())
                .unwrap_or_default();
            return Err(format!(
                "output {reference} required by property '{key}' is not available"
            ));
        };
        payload.insert(key.clone(), resolved);
        fingerprint.insert(key.clone(), value.fingerprint(&lookup));
    }
    Ok((payload, fingerprint))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::graph::Gate;
    use crate::provider::{MemoryProvider, RetryPolicy};
    use crate::state::MemoryStateStore;

    fn decl(name: &str) -> ResourceDeclaration {
        ResourceDeclaration::new(name, "test:resource")
    }

    fn graph(declarations: Vec<ResourceDeclaration>) -> ResourceGraph {
        ResourceGraph::build(declarations, &Config::new()).unwrap()
    }

    fn applier(provider: Arc<MemoryProvider>) -> Applier {
        Applier::new(
            provider,
            Arc::new(MemoryStateStore::new()),
            ApplyConfig {
                retry: RetryPolicy::none(),
                ..ApplyConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn test_apply_creates_in_dependency_order() {
        let provider = Arc::new(MemoryProvider::new());
        let applier = applier(provider.clone());
        let graph = graph(vec![
            decl("binding").with_reference("service_name", "service", "name"),
            decl("service")
                .with_property("name", "app")
                .with_dependency("run-api"),
            decl("run-api"),
        ]);

        let run = applier.apply(&graph).await.unwrap();

        let order: Vec<&str> = run
            .report
            .nodes
            .iter()
            .map(|node| node.name.as_str())
            .collect();
        assert_eq!(order, vec!["run-api", "service", "binding"]);
        assert!(run.report.succeeded());
        assert_eq!(provider.counters().creates, 3);

        // The binding saw the service's assigned name.
        let binding_id = run.outputs[&"binding".into()]["id"].as_str().unwrap();
        let stored = provider.resource(binding_id).unwrap();
        assert_eq!(stored["service_name"], serde_json::json!("app"));
    }

    #[tokio::test]
    async fn test_second_apply_issues_no_mutations() {
        let provider = Arc::new(MemoryProvider::new());
        let applier = applier(provider.clone());
        let graph = graph(vec![
            decl("service")
                .with_property("name", "app")
                .with_dependency("run-api"),
            decl("run-api"),
        ]);

        applier.apply(&graph).await.unwrap();
        let first = provider.counters();
        assert_eq!(first.creates, 2);

        let run = applier.apply(&graph).await.unwrap();
        assert!(run.report.succeeded());
        assert!(
            run.report
                .nodes
                .iter()
                .all(|node| node.outcome == NodeOutcome::Unchanged)
        );

        let second = provider.counters();
        assert_eq!(second.mutations(), first.mutations());
    }

    #[tokio::test]
    async fn test_changed_property_updates_in_place() {
        let provider = Arc::new(MemoryProvider::new());
        let applier = applier(provider.clone());

        let before = graph(vec![decl("service").with_property("image", "app:v1")]);
        let first = applier.apply(&before).await.unwrap();
        let id_before = first.outputs[&"service".into()]["id"].clone();

        let after = graph(vec![decl("service").with_property("image", "app:v2")]);
        let second = applier.apply(&after).await.unwrap();

        assert_eq!(
            second.report.outcome(&"service".into()),
            Some(&NodeOutcome::Updated)
        );
        assert_eq!(second.outputs[&"service".into()]["id"], id_before);
        assert_eq!(provider.counters().updates, 1);
        assert_eq!(provider.counters().creates, 1);
    }

    #[tokio::test]
    async fn test_immutable_type_is_replaced() {
        let provider = Arc::new(MemoryProvider::new().with_immutable_type("test:immutable"));
        let applier = applier(provider.clone());

        let before = graph(vec![
            ResourceDeclaration::new("connector", "test:immutable").with_property("cidr", "10.8.0.0/28"),
        ]);
        let first = applier.apply(&before).await.unwrap();
        let id_before = first.outputs[&"connector".into()]["id"].clone();

        let after = graph(vec![
            ResourceDeclaration::new("connector", "test:immutable").with_property("cidr", "10.9.0.0/28"),
        ]);
        let second = applier.apply(&after).await.unwrap();

        assert_eq!(
            second.report.outcome(&"connector".into()),
            Some(&NodeOutcome::Replaced)
        );
        assert_ne!(second.outputs[&"connector".into()]["id"], id_before);
        assert_eq!(provider.counters().deletes, 1);
        assert_eq!(provider.counters().creates, 2);
    }

    #[tokio::test]
    async fn test_failed_node_skips_dependents_but_not_siblings() {
        let provider = Arc::new(MemoryProvider::new().with_failing_type("test:failing"));
        let applier = applier(provider.clone());
        let graph = graph(vec![
            ResourceDeclaration::new("broken", "test:failing"),
            decl("dependent").with_reference("upstream", "broken", "id"),
            decl("independent"),
        ]);

        let run = applier.apply(&graph).await.unwrap();

        assert!(matches!(
            run.report.outcome(&"broken".into()),
            Some(NodeOutcome::Failed { .. })
        ));
        assert_eq!(
            run.report.outcome(&"dependent".into()),
            Some(&NodeOutcome::Skipped {
                reason: SkipReason::DependencyFailed {
                    dependency: "broken".into()
                }
            })
        );
        assert_eq!(
            run.report.outcome(&"independent".into()),
            Some(&NodeOutcome::Created)
        );
        assert!(!run.report.succeeded());
        assert_eq!(run.report.counts().failed, 1);
    }

    #[tokio::test]
    async fn test_orphan_is_deleted_on_next_run() {
        let provider = Arc::new(MemoryProvider::new());
        let applier = applier(provider.clone());

        applier
            .apply(&graph(vec![decl("service"), decl("binding")]))
            .await
            .unwrap();
        assert_eq!(provider.resource_count(), 2);

        let run = applier.apply(&graph(vec![decl("service")])).await.unwrap();

        assert_eq!(
            run.report.outcome(&"binding".into()),
            Some(&NodeOutcome::Deleted)
        );
        assert_eq!(provider.resource_count(), 1);
    }

    #[tokio::test]
    async fn test_gated_out_node_is_pruned() {
        let provider = Arc::new(MemoryProvider::new());
        let applier = applier(provider.clone());
        let declarations = vec![
            decl("service"),
            decl("binding").with_gate(Gate::ConfigTrue {
                key: "allow_unauthenticated".into(),
                default: true,
            }),
        ];

        let open = ResourceGraph::build(declarations.clone(), &Config::new()).unwrap();
        applier.apply(&open).await.unwrap();
        assert_eq!(provider.resource_count(), 2);

        let closed = ResourceGraph::build(
            declarations,
            &Config::new().with_value("allow_unauthenticated", "false"),
        )
        .unwrap();
        let run = applier.apply(&closed).await.unwrap();

        assert_eq!(
            run.report.outcome(&"binding".into()),
            Some(&NodeOutcome::Deleted)
        );
        assert_eq!(provider.resource_count(), 1);
    }

    #[tokio::test]
    async fn test_vanished_resource_is_recreated() {
        let provider = Arc::new(MemoryProvider::new());
        let applier = applier(provider.clone());
        let graph = graph(vec![decl("service")]);

        let first = applier.apply(&graph).await.unwrap();
        let id = first.outputs[&"service".into()]["id"]
            .as_str()
            .unwrap()
            .to_owned();
        provider.delete(&"test:resource".into(), &id).await.unwrap();

        let second = applier.apply(&graph).await.unwrap();
        assert_eq!(
            second.report.outcome(&"service".into()),
            Some(&NodeOutcome::Created)
        );
        assert_eq!(provider.counters().creates, 2);
    }

    #[tokio::test]
    async fn test_precancelled_run_applies_nothing() {
        let provider = Arc::new(MemoryProvider::new());
        let applier = applier(provider.clone());
        let graph = graph(vec![decl("run-api"), decl("service").with_dependency("run-api")]);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let run = applier.apply_with_cancellation(&graph, cancel).await.unwrap();

        assert_eq!(provider.counters().mutations(), 0);
        assert!(run.report.nodes.iter().all(|node| {
            node.outcome
                == NodeOutcome::Skipped {
                    reason: SkipReason::Cancelled,
                }
        }));
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried_invisibly() {
        let provider = Arc::new(MemoryProvider::new().with_transient_failures(1));
        let applier = Applier::new(
            provider.clone(),
            Arc::new(MemoryStateStore::new()),
            ApplyConfig {
                retry: RetryPolicy {
                    max_retries: 2,
                    base_delay: std::time::Duration::ZERO,
                    max_delay: std::time::Duration::ZERO,
                },
                ..ApplyConfig::default()
            },
        );
        let graph = graph(vec![decl("service")]);

        let run = applier.apply(&graph).await.unwrap();
        assert!(run.report.succeeded());
        assert_eq!(provider.counters().creates, 2);
    }

    #[tokio::test]
    async fn test_missing_output_fails_the_consumer() {
        let provider = Arc::new(MemoryProvider::new());
        let applier = applier(provider.clone());
        let graph = graph(vec![
            decl("producer"),
            decl("consumer").with_reference("upstream", "producer", "nonexistent"),
        ]);

        let run = applier.apply(&graph).await.unwrap();

        match run.report.outcome(&"consumer".into()) {
            Some(NodeOutcome::Failed { error }) => {
                assert!(error.contains("producer.nonexistent"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_exports_reflect_run_outputs() {
        let provider = Arc::new(MemoryProvider::new());
        let applier = applier(provider.clone());
        let graph = graph(vec![decl("service").with_property("name", "app")]);

        let run = applier.apply(&graph).await.unwrap();
        let exports = run.exports(&[
            Export::output("service_name", "service", "name"),
            Export::output("vpc_connector_id", "connector", "id"),
        ]);

        assert_eq!(exports["service_name"], serde_json::json!("app"));
        assert!(!exports.contains_key("vpc_connector_id"));
    }

    #[tokio::test]
    async fn test_cycle_aborts_before_any_provider_call() {
        let provider = Arc::new(MemoryProvider::new());
        let result = ResourceGraph::build(
            vec![
                decl("a").with_dependency("b"),
                decl("b").with_dependency("a"),
            ],
            &Config::new(),
        );

        assert!(matches!(result, Err(EngineError::CycleDetected { .. })));
        assert_eq!(provider.counters().mutations(), 0);
        assert_eq!(provider.counters().reads, 0);
    }

    #[tokio::test]
    async fn test_plan_then_apply_agree() {
        let provider = Arc::new(MemoryProvider::new());
        let applier = applier(provider.clone());
        let graph = graph(vec![decl("run-api"), decl("service").with_dependency("run-api")]);

        let plan = applier.plan(&graph).unwrap();
        assert_eq!(plan.count(crate::plan::PlanAction::Create), 2);
        assert_eq!(provider.counters().mutations(), 0);

        applier.apply(&graph).await.unwrap();
        let plan = applier.plan(&graph).unwrap();
        assert!(plan.is_unchanged());
    }
}

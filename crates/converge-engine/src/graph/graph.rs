//! The validated resource dependency graph.

use std::collections::{BTreeSet, HashMap, HashSet};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

use super::declaration::{ResourceDeclaration, ResourceName};
use crate::config::Config;
use crate::error::{EngineError, EngineResult};
use crate::TRACING_TARGET;

/// Provenance of a dependency edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Declared through `depends_on`.
    Explicit,
    /// Derived from a reference-typed property value.
    Implicit,
}

/// Node payload: the (gate-resolved) declaration and its declaration
/// index, used to break scheduling ties deterministically.
#[derive(Debug, Clone)]
struct GraphNode {
    declaration: ResourceDeclaration,
    order: usize,
}

/// A validated DAG of resource declarations.
///
/// Internally uses petgraph's `DiGraph`; edges point from dependency to
/// dependent. Construction resolves conditional gates, derives explicit
/// and implicit edges, and rejects duplicate names, unknown references,
/// required references into gated-out nodes, and cycles, all before any
/// provider call can be made.
#[derive(Debug, Clone)]
pub struct ResourceGraph {
    /// The underlying directed graph.
    graph: DiGraph<GraphNode, EdgeKind>,
    /// Mapping from resource name to petgraph's NodeIndex.
    name_indices: HashMap<ResourceName, NodeIndex>,
    /// Reverse mapping from NodeIndex to resource name.
    index_to_name: HashMap<NodeIndex, ResourceName>,
    /// Names excluded by their gates, in declaration order.
    excluded: Vec<ResourceName>,
    /// Topological execution order with declaration-order tie-breaking.
    order: Vec<ResourceName>,
}

impl ResourceGraph {
    /// Builds a validated graph from declarations and configuration.
    ///
    /// Pure construction: no provider call is made here or anywhere
    /// before a successful build.
    pub fn build(declarations: Vec<ResourceDeclaration>, config: &Config) -> EngineResult<Self> {
        let mut declared: HashSet<ResourceName> = HashSet::new();
        for decl in &declarations {
            if !declared.insert(decl.name.clone()) {
                return Err(EngineError::DuplicateName(decl.name.clone()));
            }
        }

        // Gate resolution happens once, before the graph is finalized.
        let mut included: Vec<ResourceDeclaration> = Vec::new();
        let mut excluded: Vec<ResourceName> = Vec::new();
        for decl in declarations {
            if decl.gate.evaluate(config)? {
                included.push(decl);
            } else {
                tracing::debug!(
                    target: TRACING_TARGET,
                    resource = %decl.name,
                    "Resource excluded by gate"
                );
                excluded.push(decl.name);
            }
        }
        let excluded_set: HashSet<ResourceName> = excluded.iter().cloned().collect();

        // Optional references into gated-out nodes degrade to absent
        // properties; required ones are a configuration error.
        for decl in &mut included {
            let mut dropped: Vec<String> = Vec::new();
            for (key, reference, optional) in decl.references() {
                if excluded_set.contains(&reference.node) {
                    if optional {
                        dropped.push(key.to_owned());
                    } else {
                        return Err(EngineError::MisconfiguredDependency {
                            node: decl.name.clone(),
                            property: key.to_owned(),
                            target: reference.node.clone(),
                        });
                    }
                } else if !declared.contains(&reference.node) {
                    return Err(EngineError::UnknownReference {
                        node: decl.name.clone(),
                        reference: reference.node.clone(),
                    });
                }
            }
            for key in dropped {
                tracing::debug!(
                    target: TRACING_TARGET,
                    resource = %decl.name,
                    property = %key,
                    "Optional reference target gated out, property dropped"
                );
                decl.properties.remove(&key);
            }
        }

        let mut graph = DiGraph::new();
        let mut name_indices = HashMap::new();
        let mut index_to_name = HashMap::new();
        for (order, declaration) in included.into_iter().enumerate() {
            let name = declaration.name.clone();
            let index = graph.add_node(GraphNode { declaration, order });
            name_indices.insert(name.clone(), index);
            index_to_name.insert(index, name);
        }

        // Collect edges first; node iteration order is insertion order,
        // so edge insertion is deterministic.
        let mut edges: Vec<(NodeIndex, NodeIndex, EdgeKind)> = Vec::new();
        for index in graph.node_indices() {
            let node = &graph[index];
            for dep in &node.declaration.depends_on {
                if let Some(&dep_index) = name_indices.get(dep) {
                    edges.push((dep_index, index, EdgeKind::Explicit));
                } else if !excluded_set.contains(dep) {
                    return Err(EngineError::UnknownReference {
                        node: node.declaration.name.clone(),
                        reference: dep.clone(),
                    });
                }
                // An explicit dependency on a gated-out node is a vacuous
                // ordering constraint and carries no edge.
            }
            for (_, reference, _) in node.declaration.references() {
                let Some(&dep_index) = name_indices.get(&reference.node) else {
                    continue;
                };
                edges.push((dep_index, index, EdgeKind::Implicit));
            }
        }
        for (from, to, kind) in edges {
            if graph.find_edge(from, to).is_none() {
                graph.add_edge(from, to, kind);
            }
        }

        let order = Self::kahn_order(&graph, &index_to_name)?;

        Ok(Self {
            graph,
            name_indices,
            index_to_name,
            excluded,
            order,
        })
    }

    /// Kahn's algorithm; ties between ready nodes are broken by
    /// declaration order so plans are reproducible.
    fn kahn_order(
        graph: &DiGraph<GraphNode, EdgeKind>,
        index_to_name: &HashMap<NodeIndex, ResourceName>,
    ) -> EngineResult<Vec<ResourceName>> {
        let mut in_degree: HashMap<NodeIndex, usize> = graph
            .node_indices()
            .map(|index| {
                (
                    index,
                    graph.edges_directed(index, Direction::Incoming).count(),
                )
            })
            .collect();

        let mut ready: BTreeSet<(usize, NodeIndex)> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(&index, _)| (graph[index].order, index))
            .collect();

        let mut order = Vec::with_capacity(graph.node_count());
        while let Some(&(decl_order, index)) = ready.first() {
            ready.remove(&(decl_order, index));
            order.push(index_to_name[&index].clone());
            for succ in graph.neighbors_directed(index, Direction::Outgoing) {
                let degree = in_degree
                    .get_mut(&succ)
                    .ok_or_else(|| EngineError::Internal("missing in-degree entry".into()))?;
                *degree -= 1;
                if *degree == 0 {
                    ready.insert((graph[succ].order, succ));
                }
            }
        }

        if order.len() != graph.node_count() {
            let ordered: HashSet<&ResourceName> = order.iter().collect();
            let mut remaining: Vec<(usize, String)> = graph
                .node_indices()
                .filter_map(|index| {
                    let name = &index_to_name[&index];
                    (!ordered.contains(name)).then(|| (graph[index].order, name.to_string()))
                })
                .collect();
            remaining.sort();
            return Err(EngineError::CycleDetected {
                names: remaining.into_iter().map(|(_, name)| name).collect(),
            });
        }

        Ok(order)
    }

    /// Returns the number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of dependency edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Returns whether a resource is part of the graph.
    pub fn contains(&self, name: &ResourceName) -> bool {
        self.name_indices.contains_key(name)
    }

    /// Returns a resource's (gate-resolved) declaration.
    pub fn declaration(&self, name: &ResourceName) -> Option<&ResourceDeclaration> {
        let index = self.name_indices.get(name)?;
        self.graph.node_weight(*index).map(|node| &node.declaration)
    }

    /// Iterates over declarations in declaration order.
    pub fn declarations(&self) -> impl Iterator<Item = &ResourceDeclaration> {
        self.graph
            .node_indices()
            .filter_map(|index| self.graph.node_weight(index))
            .map(|node| &node.declaration)
    }

    /// Returns the names excluded by their gates, in declaration order.
    pub fn excluded(&self) -> &[ResourceName] {
        &self.excluded
    }

    /// Returns whether a declared resource was excluded by its gate.
    pub fn was_excluded(&self, name: &ResourceName) -> bool {
        self.excluded.contains(name)
    }

    /// Returns the direct dependencies of a resource.
    pub fn dependencies_of(&self, name: &ResourceName) -> Vec<ResourceName> {
        self.neighbors(name, Direction::Incoming)
    }

    /// Returns the direct dependents of a resource.
    pub fn dependents_of(&self, name: &ResourceName) -> Vec<ResourceName> {
        self.neighbors(name, Direction::Outgoing)
    }

    fn neighbors(&self, name: &ResourceName, direction: Direction) -> Vec<ResourceName> {
        let Some(&index) = self.name_indices.get(name) else {
            return Vec::new();
        };
        let mut names: Vec<(usize, ResourceName)> = self
            .graph
            .neighbors_directed(index, direction)
            .filter_map(|neighbor| {
                let name = self.index_to_name.get(&neighbor)?;
                Some((self.graph[neighbor].order, name.clone()))
            })
            .collect();
        names.sort();
        names.into_iter().map(|(_, name)| name).collect()
    }

    /// Returns the edge provenance between two resources, if an edge
    /// exists.
    pub fn edge_kind(&self, from: &ResourceName, to: &ResourceName) -> Option<EdgeKind> {
        let from_index = self.name_indices.get(from)?;
        let to_index = self.name_indices.get(to)?;
        self.graph
            .find_edge(*from_index, *to_index)
            .and_then(|edge| self.graph.edge_weight(edge))
            .copied()
    }

    /// Returns the execution order: every resource appears after all of
    /// its dependencies, with ties broken by declaration order.
    pub fn execution_order(&self) -> &[ResourceName] {
        &self.order
    }
}

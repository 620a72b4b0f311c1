//! Dependency graph management using `petgraph`.
//!
//! Builds a directed graph from `depends_on` declarations and sequences it
//! with Kahn's algorithm. Cycles do not abort the conversion: the services
//! that could not be sequenced are appended in document order and the
//! caller records a warning.

use std::collections::VecDeque;

use indexmap::IndexMap;
use petgraph::Direction;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::parser::ast::ComposeDocument;

/// Boot order computed by [`DependencyGraph::order`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    /// Every declared service exactly once; dependencies first when acyclic.
    pub sequence: Vec<String>,
    /// Whether some services could not be sequenced.
    pub has_cycle: bool,
    /// Services appended by the cycle fallback, in document order.
    pub unresolved: Vec<String>,
}

impl Ordering {
    /// Warning describing the cycle fallback, if one was needed.
    #[must_use]
    pub fn cycle_warning(&self) -> Option<String> {
        self.has_cycle.then(|| {
            format!(
                "circular dependencies detected between services [{}]; they are ordered as \
                 declared and their wait scripts may time out",
                self.unresolved.join(", ")
            )
        })
    }
}

/// A dependency graph of services.
///
/// Edges point from a dependency to its dependent so that a node's
/// outgoing edges lead to the services it unblocks.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: petgraph::Graph<String, ()>,
    nodes: IndexMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph of a document's services.
    ///
    /// References to undeclared services are ignored.
    #[must_use]
    pub fn from_document(document: &ComposeDocument) -> Self {
        let mut graph = Self::new();
        for name in document.services().keys() {
            let _ = graph.add_service(name);
        }
        for (name, service) in document.services() {
            for dependency in service.dependency_names() {
                if !graph.add_dependency(name, &dependency) {
                    tracing::debug!(
                        service = %name,
                        dependency = %dependency,
                        "ignoring dependency on undeclared service"
                    );
                }
            }
        }
        graph
    }

    /// Adds a service node, returning the existing node for a known name.
    pub fn add_service(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        let _ = self.nodes.insert(name.to_string(), idx);
        idx
    }

    /// Adds a dependency edge: `dependent` depends on `dependency`.
    ///
    /// Returns `false` and adds nothing if either service is unknown.
    pub fn add_dependency(&mut self, dependent: &str, dependency: &str) -> bool {
        match (self.nodes.get(dependency), self.nodes.get(dependent)) {
            (Some(&from), Some(&to)) => {
                let _ = self.graph.add_edge(from, to, ());
                true
            }
            _ => false,
        }
    }

    /// Declared dependencies of `name` that exist, in declaration order,
    /// without duplicates.
    #[must_use]
    pub fn dependencies(&self, name: &str) -> Vec<String> {
        let Some(&idx) = self.nodes.get(name) else {
            return Vec::new();
        };
        let mut edges: Vec<(EdgeIndex, NodeIndex)> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|edge| (edge.id(), edge.source()))
            .collect();
        edges.sort_by_key(|(id, _)| *id);

        let mut names: Vec<String> = Vec::with_capacity(edges.len());
        for (_, source) in edges {
            let dependency = &self.graph[source];
            if !names.contains(dependency) {
                names.push(dependency.clone());
            }
        }
        names
    }

    /// Outgoing neighbours in edge insertion order.
    fn dependents_of(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<(EdgeIndex, NodeIndex)> = self
            .graph
            .edges(idx)
            .map(|edge| (edge.id(), edge.target()))
            .collect();
        edges.sort_by_key(|(id, _)| *id);
        edges.into_iter().map(|(_, target)| target).collect()
    }

    /// Returns the boot order of all services.
    ///
    /// Kahn's algorithm with a FIFO queue: ties are broken by the order in
    /// which nodes reach in-degree zero, seeded in document order. Nodes
    /// left over by a cycle are appended in document order.
    #[must_use]
    pub fn order(&self) -> Ordering {
        let mut in_degree: Vec<usize> = self
            .graph
            .node_indices()
            .map(|idx| {
                self.graph
                    .edges_directed(idx, Direction::Incoming)
                    .count()
            })
            .collect();

        let mut queue: VecDeque<NodeIndex> = self
            .nodes
            .values()
            .copied()
            .filter(|idx| in_degree[idx.index()] == 0)
            .collect();

        let mut emitted = vec![false; self.graph.node_count()];
        let mut sequence = Vec::with_capacity(self.nodes.len());
        while let Some(idx) = queue.pop_front() {
            emitted[idx.index()] = true;
            sequence.push(self.graph[idx].clone());
            for dependent in self.dependents_of(idx) {
                let degree = &mut in_degree[dependent.index()];
                *degree = degree.saturating_sub(1);
                if *degree == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        let unresolved: Vec<String> = self
            .nodes
            .iter()
            .filter(|(_, idx)| !emitted[idx.index()])
            .map(|(name, _)| name.clone())
            .collect();
        let has_cycle = !unresolved.is_empty();
        if has_cycle {
            tracing::debug!(unresolved = ?unresolved, "dependency cycle, using document order");
        }
        sequence.extend(unresolved.iter().cloned());

        Ordering {
            sequence,
            has_cycle,
            unresolved,
        }
    }
}

/// Builds the dependency graph of `document` and sequences it.
#[must_use]
pub fn order(document: &ComposeDocument) -> Ordering {
    tracing::info!("computing service boot order");
    DependencyGraph::from_document(document).order()
}

use std::collections::VecDeque;

use conduit_core::{AHashSet, Route};
use dashmap::DashMap;
use parking_lot::RwLock;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

/// Explicit registration manifest standing in for the source system's
/// runtime type-reflection: each message type declares its own direct
/// base type(s) at registration time, and the router/dispatcher derive a
/// most-derived-first ancestor chain by walking the resulting graph.
///
/// A route with no declared parents is its own one-element hierarchy.
#[derive(Default)]
pub struct MessageTypeHierarchy {
    graph: RwLock<DiGraph<Route, ()>>,
    index: DashMap<Route, NodeIndex>,
}

impl MessageTypeHierarchy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn node_for(&self, route: &Route) -> NodeIndex {
        if let Some(idx) = self.index.get(route) {
            return *idx;
        }
        let mut graph = self.graph.write();
        *self.index.entry(route.clone()).or_insert_with(|| graph.add_node(route.clone()))
    }

    /// Declare that `route` directly extends each of `parents` (excluding
    /// the implicit universal base type, which this graph never models).
    pub fn register(&self, route: Route, parents: &[Route]) {
        let child = self.node_for(&route);
        for parent in parents {
            let parent_idx = self.node_for(parent);
            let mut graph = self.graph.write();
            if !graph.contains_edge(child, parent_idx) {
                graph.add_edge(child, parent_idx, ());
            }
        }
    }

    /// Breadth-first ancestor walk starting at `route` itself, most-derived
    /// first, each route appearing once even under multiple inheritance.
    #[must_use]
    pub fn ancestors_most_derived_first(&self, route: &Route) -> Vec<Route> {
        let Some(start) = self.index.get(route).map(|idx| *idx) else {
            return vec![route.clone()];
        };

        let graph = self.graph.read();
        let mut seen = AHashSet::default();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([start]);
        seen.insert(start);

        while let Some(node) = queue.pop_front() {
            if let Some(weight) = graph.node_weight(node) {
                order.push(weight.clone());
            }
            for parent in graph.neighbors_directed(node, Direction::Outgoing) {
                if seen.insert(parent) {
                    queue.push_back(parent);
                }
            }
        }
        order
    }
}

//! Dependency analysis over the node graph
//!
//! Builds the edge structure from node references, then answers the ordering
//! questions: which nodes depend on which, is there a cycle, and what is a
//! safe processing order. Only `uses` edges constrain ordering; `related`
//! edges are indexed but never participate in cycles or sorting.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::error::{DocGraphError, Result};
use crate::graph::NodeGraph;
use crate::node::NodeId;

/// Kind of reference edge between nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// Hard dependency; drives ordering and cycle detection
    Uses,
    /// Informational link; never constrains anything
    Related,
}

/// DFS visit state for cycle detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    Visiting,
    Visited,
}

/// Directed reference graph derived from a [`NodeGraph`]
///
/// Vertices are node ids; declared targets that do not resolve to a loaded
/// node still get a vertex, so the maps report declared intent. Resolution
/// failures are the reference validator's concern, not the builder's.
pub struct DependencyGraph {
    graph: DiGraph<NodeId, EdgeKind>,
    indices: HashMap<NodeId, NodeIndex>,
    known: BTreeSet<NodeId>,
}

impl DependencyGraph {
    /// Build the dependency structure from all loaded nodes
    pub fn build(nodes: &NodeGraph) -> Self {
        let mut dep = Self {
            graph: DiGraph::new(),
            indices: HashMap::new(),
            known: BTreeSet::new(),
        };

        // NodeGraph iterates in sorted-id order, which keeps vertex and edge
        // insertion deterministic.
        for node in nodes.iter() {
            dep.known.insert(node.id.clone());
            dep.intern(&node.id);
        }
        for node in nodes.iter() {
            let source = dep.intern(&node.id);
            for target in &node.refs.uses {
                let target_idx = dep.intern(target);
                dep.graph.add_edge(source, target_idx, EdgeKind::Uses);
            }
            for target in &node.refs.related {
                let target_idx = dep.intern(target);
                dep.graph.add_edge(source, target_idx, EdgeKind::Related);
            }
        }
        dep
    }

    fn intern(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.indices.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(id.to_string());
        self.indices.insert(id.to_string(), idx);
        idx
    }

    pub fn node_count(&self) -> usize {
        self.known.len()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Map of id to its `uses` targets, sorted and deduplicated
    ///
    /// Derived only from `uses` edges; `related` never appears here.
    pub fn dependency_map(&self) -> BTreeMap<NodeId, Vec<NodeId>> {
        let mut map = BTreeMap::new();
        for id in &self.known {
            map.insert(id.clone(), self.uses_targets(id));
        }
        map
    }

    /// Map of target id to the ids referencing it via either edge kind
    ///
    /// Each (source, target) pair appears once even when both a `uses` and a
    /// `related` edge declare it.
    pub fn reverse_index(&self) -> BTreeMap<NodeId, Vec<NodeId>> {
        let mut map: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
        for edge in self.graph.edge_references() {
            let source = &self.graph[edge.source()];
            let target = &self.graph[edge.target()];
            map.entry(target.clone())
                .or_default()
                .insert(source.clone());
        }
        map.into_iter()
            .map(|(target, sources)| (target, sources.into_iter().collect()))
            .collect()
    }

    /// Immediate `uses` targets of a node, sorted
    pub fn uses_targets(&self, id: &str) -> Vec<NodeId> {
        let Some(&idx) = self.indices.get(id) else {
            return Vec::new();
        };
        let targets: BTreeSet<NodeId> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(|e| *e.weight() == EdgeKind::Uses)
            .map(|e| self.graph[e.target()].clone())
            .collect();
        targets.into_iter().collect()
    }

    /// Immediate referencing nodes (either edge kind), sorted and deduplicated
    pub fn dependents_of(&self, id: &str) -> Vec<NodeId> {
        let Some(&idx) = self.indices.get(id) else {
            return Vec::new();
        };
        let sources: BTreeSet<NodeId> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| self.graph[e.source()].clone())
            .collect();
        sources.into_iter().collect()
    }

    /// Detect a directed cycle over `uses` edges
    ///
    /// Three-state depth-first search, roots and neighbors visited in sorted
    /// id order. The returned path ends with the repeated node, so `A -> A`
    /// yields `[A, A]` and `A -> B -> A` yields `[A, B, A]`.
    pub fn detect_cycle(&self) -> Option<Vec<NodeId>> {
        let mut state: HashMap<NodeIndex, Visit> = HashMap::new();
        let mut path: Vec<NodeId> = Vec::new();

        let mut roots: Vec<(&NodeId, NodeIndex)> =
            self.indices.iter().map(|(id, &idx)| (id, idx)).collect();
        roots.sort_by(|a, b| a.0.cmp(b.0));

        for (_, idx) in roots {
            if *state.get(&idx).unwrap_or(&Visit::Unvisited) == Visit::Unvisited {
                if let Some(cycle) = self.dfs_cycle(idx, &mut state, &mut path) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn dfs_cycle(
        &self,
        idx: NodeIndex,
        state: &mut HashMap<NodeIndex, Visit>,
        path: &mut Vec<NodeId>,
    ) -> Option<Vec<NodeId>> {
        state.insert(idx, Visit::Visiting);
        path.push(self.graph[idx].clone());

        let mut neighbors: Vec<NodeIndex> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(|e| *e.weight() == EdgeKind::Uses)
            .map(|e| e.target())
            .collect();
        neighbors.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));
        neighbors.dedup();

        for next in neighbors {
            match state.get(&next).copied().unwrap_or(Visit::Unvisited) {
                Visit::Visiting => {
                    // Back-edge: the cycle starts at the first occurrence of
                    // the repeated node and ends with it again.
                    let repeated = &self.graph[next];
                    let start = path.iter().position(|id| id == repeated).unwrap_or(0);
                    let mut cycle: Vec<NodeId> = path[start..].to_vec();
                    cycle.push(repeated.clone());
                    return Some(cycle);
                }
                Visit::Unvisited => {
                    if let Some(cycle) = self.dfs_cycle(next, state, path) {
                        return Some(cycle);
                    }
                }
                Visit::Visited => {}
            }
        }

        path.pop();
        state.insert(idx, Visit::Visited);
        None
    }

    /// Topological order of the loaded nodes over `uses` edges
    ///
    /// Dependencies come first: for every edge A uses B, B precedes A. Fails
    /// with [`DocGraphError::CycleDetected`] instead of emitting a partial
    /// order; ties resolve in sorted-id order.
    pub fn topological_sort(&self) -> Result<Vec<NodeId>> {
        if let Some(cycle) = self.detect_cycle() {
            return Err(DocGraphError::CycleDetected(cycle));
        }

        // Kahn's algorithm on remaining-dependency counts. Only edges between
        // loaded nodes constrain the order; an unresolved target imposes
        // nothing it could never satisfy.
        let mut remaining: BTreeMap<&NodeId, usize> = BTreeMap::new();
        for id in &self.known {
            let deps = self
                .uses_targets(id)
                .into_iter()
                .filter(|t| self.known.contains(t))
                .count();
            remaining.insert(id, deps);
        }

        let mut ready: BTreeSet<&NodeId> = remaining
            .iter()
            .filter(|(_, &count)| count == 0)
            .map(|(&id, _)| id)
            .collect();
        let mut order: Vec<NodeId> = Vec::with_capacity(self.known.len());

        while let Some(&id) = ready.iter().next() {
            ready.remove(id);
            order.push(id.clone());

            for dependent in self.dependents_of(id) {
                // Incoming edges cover both kinds; only uses edges count.
                if !self.uses_targets(&dependent).contains(id) {
                    continue;
                }
                if let Some(key) = self.known.get(&dependent) {
                    if let Some(count) = remaining.get_mut(key) {
                        *count = count.saturating_sub(1);
                        if *count == 0 {
                            ready.insert(key);
                        }
                    }
                }
            }
        }

        debug_assert_eq!(order.len(), self.known.len());
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    fn graph_of(edges: &[(&str, &[&str])]) -> NodeGraph {
        let mut graph = NodeGraph::new();
        for (id, uses) in edges {
            graph
                .add(Node::new(*id, "component", id.to_uppercase()).with_uses(uses))
                .unwrap();
        }
        graph
    }

    #[test]
    fn test_dependency_map_uses_only() {
        let mut nodes = graph_of(&[("a", &["b"]), ("b", &[])]);
        let mut a = nodes.get("a").unwrap().clone();
        a.refs.related = vec!["c".to_string()];
        nodes.update(a).unwrap();
        nodes.add(Node::new("c", "component", "C")).unwrap();

        let dep = DependencyGraph::build(&nodes);
        let map = dep.dependency_map();
        assert_eq!(map["a"], vec!["b".to_string()]);
        assert!(map["b"].is_empty());
        assert!(map["c"].is_empty());
    }

    #[test]
    fn test_reverse_index_deduplicates_pairs() {
        let mut nodes = graph_of(&[("a", &["b"]), ("b", &[])]);
        let mut a = nodes.get("a").unwrap().clone();
        // Same pair through both edge kinds: one entry.
        a.refs.related = vec!["b".to_string()];
        nodes.update(a).unwrap();

        let dep = DependencyGraph::build(&nodes);
        let index = dep.reverse_index();
        assert_eq!(index["b"], vec!["a".to_string()]);
    }

    #[test]
    fn test_no_cycle_in_dag() {
        let nodes = graph_of(&[("a", &["b", "c"]), ("b", &["c"]), ("c", &[])]);
        let dep = DependencyGraph::build(&nodes);
        assert!(dep.detect_cycle().is_none());
    }

    #[test]
    fn test_cycle_path_ends_with_repeated_node() {
        let nodes = graph_of(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"])]);
        let dep = DependencyGraph::build(&nodes);
        let cycle = dep.detect_cycle().expect("cycle expected");
        assert_eq!(cycle.first(), cycle.last());
        assert_eq!(cycle.len(), 4);
        assert_eq!(cycle, vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn test_self_edge_is_a_cycle() {
        let nodes = graph_of(&[("a", &["a"])]);
        let dep = DependencyGraph::build(&nodes);
        let cycle = dep.detect_cycle().expect("self-edge is a cycle");
        assert_eq!(cycle, vec!["a", "a"]);
    }

    #[test]
    fn test_related_edges_never_form_cycles() {
        let mut nodes = graph_of(&[("a", &[]), ("b", &[])]);
        let mut a = nodes.get("a").unwrap().clone();
        a.refs.related = vec!["b".to_string()];
        nodes.update(a).unwrap();
        let mut b = nodes.get("b").unwrap().clone();
        b.refs.related = vec!["a".to_string()];
        nodes.update(b).unwrap();

        let dep = DependencyGraph::build(&nodes);
        assert!(dep.detect_cycle().is_none());
    }

    #[test]
    fn test_topological_sort_orders_dependencies_first() {
        let nodes = graph_of(&[("app", &["lib", "util"]), ("lib", &["util"]), ("util", &[])]);
        let dep = DependencyGraph::build(&nodes);
        let order = dep.topological_sort().unwrap();

        assert_eq!(order.len(), 3);
        let pos = |id: &str| order.iter().position(|n| n == id).unwrap();
        assert!(pos("util") < pos("lib"));
        assert!(pos("util") < pos("app"));
        assert!(pos("lib") < pos("app"));
    }

    #[test]
    fn test_topological_sort_is_deterministic() {
        let nodes = graph_of(&[("z", &[]), ("m", &[]), ("a", &[])]);
        let dep = DependencyGraph::build(&nodes);
        // No constraints at all: ties resolve in id order.
        assert_eq!(dep.topological_sort().unwrap(), vec!["a", "m", "z"]);
    }

    #[test]
    fn test_topological_sort_fails_on_cycle() {
        let nodes = graph_of(&[("a", &["b"]), ("b", &["a"])]);
        let dep = DependencyGraph::build(&nodes);
        let err = dep.topological_sort().unwrap_err();
        assert!(matches!(err, DocGraphError::CycleDetected(path) if path.len() == 3));
    }

    #[test]
    fn test_unresolved_target_still_in_map() {
        let nodes = graph_of(&[("a", &["ghost"])]);
        let dep = DependencyGraph::build(&nodes);
        assert_eq!(dep.dependency_map()["a"], vec!["ghost".to_string()]);
        // The phantom does not appear in the sort output.
        assert_eq!(dep.topological_sort().unwrap(), vec!["a"]);
    }
}

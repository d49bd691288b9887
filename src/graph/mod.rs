//! Node Graph
//!
//! Holds all loaded nodes keyed by unique id, plus the lookup helpers the
//! rest of the engine builds on. Dependency analysis (cycles, topological
//! order, reverse indexing) lives in [`dependency`].

pub mod dependency;

pub use dependency::{DependencyGraph, EdgeKind};

use std::collections::{BTreeMap, BTreeSet};

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::{Deserialize, Serialize};

use crate::error::{DocGraphError, Result};
use crate::node::{Node, NodeId};

/// A fuzzy search hit over the graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: NodeId,
    pub title: String,
    pub kind: String,
    pub score: i64,
}

/// All loaded nodes, keyed by unique id
///
/// Ids are unique and nodes are never silently overwritten: `add` rejects an
/// existing id, `update` and `remove` reject a missing one. Iteration order
/// is sorted by id so every derived structure is deterministic.
#[derive(Debug, Default, Clone)]
pub struct NodeGraph {
    nodes: BTreeMap<NodeId, Node>,
}

impl NodeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from loaded nodes, rejecting duplicate ids
    pub fn from_nodes(nodes: Vec<Node>) -> Result<Self> {
        let mut graph = Self::new();
        for node in nodes {
            graph.add(node)?;
        }
        Ok(graph)
    }

    /// Insert a new node; fails if the id already exists
    pub fn add(&mut self, node: Node) -> Result<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(DocGraphError::DuplicateNode(node.id));
        }
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Replace an existing node; fails if the id is unknown
    pub fn update(&mut self, node: Node) -> Result<()> {
        if !self.nodes.contains_key(&node.id) {
            return Err(DocGraphError::NodeNotFound(node.id));
        }
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Remove a node, returning it; fails if the id is unknown
    pub fn remove(&mut self, id: &str) -> Result<Node> {
        self.nodes
            .remove(id)
            .ok_or_else(|| DocGraphError::NodeNotFound(id.to_string()))
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in sorted-id order
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All ids in sorted order
    pub fn ids(&self) -> Vec<&NodeId> {
        self.nodes.keys().collect()
    }

    /// All nodes of a given kind
    pub fn list_by_kind(&self, kind: &str) -> Vec<&Node> {
        self.nodes.values().filter(|n| n.kind == kind).collect()
    }

    /// All distinct kinds, sorted
    pub fn all_kinds(&self) -> Vec<String> {
        let kinds: BTreeSet<String> = self
            .nodes
            .values()
            .filter(|n| !n.kind.is_empty())
            .map(|n| n.kind.clone())
            .collect();
        kinds.into_iter().collect()
    }

    /// Fuzzy search over node ids and titles
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        let matcher = SkimMatcherV2::default();
        let mut results: Vec<SearchResult> = Vec::new();

        for node in self.nodes.values() {
            let id_score = matcher.fuzzy_match(&node.id, query);
            let title_score = matcher.fuzzy_match(&node.title, query);
            if let Some(score) = id_score.max(title_score) {
                results.push(SearchResult {
                    id: node.id.clone(),
                    title: node.title.clone(),
                    kind: node.kind.clone(),
                    score,
                });
            }
        }

        results.sort_by(|a, b| b.score.cmp(&a.score).then(a.id.cmp(&b.id)));
        results.truncate(limit);
        results
    }
}

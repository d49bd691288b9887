//! Node types and structures
//!
//! A node is one versioned design document: identity, lifecycle status,
//! references to other nodes, structured content blocks, and the embedded
//! rules (contracts, constraints) the validators enforce.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::fmt;

/// Slash-separated node identifier, e.g. `"arch/storage/wal"`
pub type NodeId = String;

/// Lifecycle status of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Draft,
    #[serde(rename = "in-review")]
    InReview,
    Approved,
    Deprecated,
    Archived,
}

impl NodeStatus {
    /// All status names, as they appear in documents
    pub fn names() -> &'static [&'static str] {
        &["draft", "in-review", "approved", "deprecated", "archived"]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Draft => "draft",
            NodeStatus::InReview => "in-review",
            NodeStatus::Approved => "approved",
            NodeStatus::Deprecated => "deprecated",
            NodeStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// References to other nodes, split by strength
///
/// `uses` is a hard dependency and participates in ordering and cycle
/// detection. `related` is informational and never constrains anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeRefs {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uses: Vec<NodeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<NodeId>,
}

/// A typed content block with an open field map
///
/// Block types are defined by configuration, not a closed type hierarchy;
/// type-specific checks are pure functions over `(block_type, fields)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default, flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl Block {
    pub fn new(block_type: impl Into<String>) -> Self {
        Self {
            block_type: block_type.into(),
            fields: serde_json::Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }
}

/// An ordered section of content blocks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
}

/// A Given/When/Then scenario inside a contract
///
/// Step text may embed `@node-id` references, which the contract validator
/// resolves against the graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub given: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub when: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub then: Vec<String>,
}

impl Scenario {
    /// All steps of the scenario in declaration order
    pub fn steps(&self) -> impl Iterator<Item = &String> {
        self.given.iter().chain(self.when.iter()).chain(self.then.iter())
    }

    pub fn step_count(&self) -> usize {
        self.given.len() + self.when.len() + self.then.len()
    }
}

/// A named behavioral contract
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scenarios: Vec<Scenario>,
}

/// A boolean constraint attached to a node
///
/// The expression is evaluated against the node's own fields by a sandboxed
/// evaluator; `scope` restricts the constraint to nodes of one kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub expression: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// A reviewer sign-off
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Approval {
    pub reviewer: String,
    pub approved_at: DateTime<Utc>,
}

/// A versioned design document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique slash-separated id
    pub id: NodeId,
    /// Document kind (e.g. "decision", "component", "interface")
    #[serde(default)]
    pub kind: String,
    /// Monotonically incremented by the migration engine, never by hand
    #[serde(default)]
    pub version: u64,
    /// Lifecycle status; absent is a schema violation, not a default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<NodeStatus>,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "NodeRefs::is_empty")]
    pub refs: NodeRefs,
    /// Names of events this node emits
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<String>,
    /// Shared vocabulary terms
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub terms: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Section>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contracts: Vec<Contract>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
    /// Tracked issue identifiers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub approvals: Vec<Approval>,
    /// Free-form custom fields
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub custom: serde_json::Map<String, serde_json::Value>,
}

impl NodeRefs {
    pub fn is_empty(&self) -> bool {
        self.uses.is_empty() && self.related.is_empty()
    }
}

impl Node {
    /// Create a minimal valid node
    pub fn new(id: impl Into<NodeId>, kind: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            version: 1,
            status: Some(NodeStatus::Draft),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_uses(mut self, targets: &[&str]) -> Self {
        self.refs.uses = targets.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_related(mut self, targets: &[&str]) -> Self {
        self.refs.related = targets.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Every block in every section, with its dotted/bracketed field path
    pub fn blocks_with_paths(&self) -> Vec<(String, &Block)> {
        let mut out = Vec::new();
        for (si, section) in self.content.iter().enumerate() {
            for (bi, block) in section.blocks.iter().enumerate() {
                out.push((format!("content[{}].blocks[{}]", si, bi), block));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for name in NodeStatus::names() {
            let status: NodeStatus = serde_json::from_value(serde_json::json!(name)).unwrap();
            assert_eq!(status.as_str(), *name);
        }
    }

    #[test]
    fn test_node_roundtrip_preserves_core_fields() {
        let mut node = Node::new("arch/storage/wal", "component", "Write-ahead log")
            .with_uses(&["arch/storage/pager"])
            .with_related(&["arch/overview"]);
        node.tags = vec!["storage".to_string(), "durability".to_string()];
        node.version = 3;
        node.status = Some(NodeStatus::Approved);

        let json = serde_json::to_string(&node).unwrap();
        let back: Node = serde_json::from_str(&json).unwrap();

        assert_eq!(back.id, node.id);
        assert_eq!(back.kind, node.kind);
        assert_eq!(back.version, node.version);
        assert_eq!(back.status, node.status);
        assert_eq!(back.title, node.title);
        assert_eq!(back.tags, node.tags);
        assert_eq!(back.refs, node.refs);
    }

    #[test]
    fn test_block_open_field_map() {
        let block = Block::new("table")
            .with_field("columns", serde_json::json!([{"key": "name"}, {"key": "type"}]));
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "table");
        assert!(json["columns"].is_array());

        let back: Block = serde_json::from_value(json).unwrap();
        assert_eq!(back.block_type, "table");
        assert!(back.fields.contains_key("columns"));
    }

    #[test]
    fn test_scenario_steps_in_order() {
        let scenario = Scenario {
            name: "replay".to_string(),
            given: vec!["a crashed process".to_string()],
            when: vec!["recovery starts".to_string()],
            then: vec!["the log is replayed".to_string()],
        };
        let steps: Vec<&String> = scenario.steps().collect();
        assert_eq!(steps.len(), 3);
        assert_eq!(scenario.step_count(), 3);
        assert_eq!(steps[0], "a crashed process");
        assert_eq!(steps[2], "the log is replayed");
    }
}

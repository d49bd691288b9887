//! Storage collaborators
//!
//! The engine consumes storage as narrow contracts: a node store, a config
//! store, an audit store, and a backup facility. Nothing in the core depends
//! on their on-disk representation; any implementation of these traits is
//! interchangeable. The filesystem implementations in [`fs`] and [`audit`]
//! are the defaults.

pub mod audit;
pub mod fs;

pub use audit::{AuditEntry, AuditFilter, FsAuditStore};
pub use fs::{FsBackup, FsConfigStore, FsNodeStore};

use std::collections::HashMap;

use crate::config::ProjectConfig;
use crate::error::Result;
use crate::node::{Node, NodeId};

/// Persistence for individual nodes, keyed by slash-separated id
pub trait NodeStore {
    /// Load every stored node
    fn load_all(&self) -> Result<Vec<Node>>;

    /// Load one node by id
    fn load(&self, id: &str) -> Result<Node>;

    /// Write one node, replacing any previous version
    fn save(&self, node: &Node) -> Result<()>;

    /// Delete one node by id
    fn delete(&self, id: &str) -> Result<()>;

    /// Whether a node with this id is stored
    fn exists(&self, id: &str) -> bool;
}

/// Persistence for the project configuration
pub trait ConfigStore {
    fn load(&self) -> Result<ProjectConfig>;
    fn save(&self, config: &ProjectConfig) -> Result<()>;
}

/// Append-only audit trail
///
/// `append` must serialize concurrent writers (see the implementations);
/// `query` reads fully written records and never corrupts an in-flight
/// append.
pub trait AuditStore {
    fn append(&self, entry: &AuditEntry) -> Result<()>;

    /// Entries matching the filter, in chronological order
    fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>>;

    /// Latest snapshot hash per node
    fn latest_hashes(&self) -> Result<HashMap<NodeId, String>>;
}

/// Timestamped snapshots of configuration plus the entire node tree
pub trait Backup {
    /// Create a snapshot, returning its name
    fn create(&self) -> Result<String>;

    /// Restore a snapshot, fully replacing current state
    fn restore(&self, snapshot: &str) -> Result<()>;

    /// Snapshot names, oldest first
    fn list(&self) -> Result<Vec<String>>;
}

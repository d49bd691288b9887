//! Error types for the governance engine
//!
//! These are the fail-fast errors: programmer mistakes, broken collaborators,
//! malformed configuration. Anything a document author can cause is reported
//! as a [`Diagnostic`](crate::diagnostics::Diagnostic) instead and never
//! surfaces here.

use thiserror::Error;

/// Result type for governance operations
pub type Result<T> = std::result::Result<T, DocGraphError>;

/// Governance engine errors
#[derive(Error, Debug)]
pub enum DocGraphError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Node already exists: {0}")]
    DuplicateNode(String),

    #[error("Dependency cycle detected: {}", .0.join(" -> "))]
    CycleDetected(Vec<String>),

    #[error("Migration already registered: {0}")]
    DuplicateMigration(String),

    #[error("Migration '{name}' failed on node {node_id}: {message}")]
    TransformFailed {
        name: String,
        node_id: String,
        message: String,
    },

    #[error("Backup not found: {0}")]
    BackupNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

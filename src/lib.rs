//! docgraph
//!
//! Consistency and governance engine for a versioned graph of structured
//! design documents. It sits beneath a document-oriented store and enforces
//! structural, referential, and semantic consistency; evolves the document
//! schema safely over time; and produces precise, typo-tolerant diagnostics.
//!
//! ## Features
//!
//! - **Node Graph**: unique-id keyed documents with hard (`uses`) and
//!   informational (`related`) references
//! - **Graph Algorithms**: cycle detection, deterministic topological
//!   ordering, reverse indexing
//! - **Schema Migrations**: fingerprinted rules, shortest-path migration
//!   resolution, transactional execution with backup and audit
//! - **Validation**: composable schema, reference, constraint, block,
//!   contract, and cross-reference validators
//! - **Diagnostics**: coded, deduplicated, position-aware error records
//!   with Levenshtein typo suggestions
//!
//! ## Architecture
//!
//! ```text
//! NodeStore ──loads──> NodeGraph ──build──> DependencyGraph
//!                          │                     │
//!                   ValidationRunner       cycle / topo / reverse index
//!                          │
//!                  DiagnosticCollector
//!
//! ConfigStore ──rules──> fingerprint ──drift──> MigrationEngine
//!                                                  │
//!                                     Backup ── AuditStore
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fingerprint;
pub mod graph;
pub mod migration;
pub mod node;
pub mod store;
pub mod validate;

pub use config::{ProjectConfig, Settings};
pub use diagnostics::{
    Diagnostic, DiagnosticCode, DiagnosticCollector, DocumentIndex, SourceLocation, Suggester,
};
pub use error::{DocGraphError, Result};
pub use graph::{DependencyGraph, EdgeKind, NodeGraph};
pub use migration::{Migration, MigrationEngine, MigrationRegistry, MigrationReport};
pub use node::{Node, NodeId, NodeStatus};
pub use store::{AuditEntry, AuditFilter, AuditStore, Backup, ConfigStore, NodeStore};
pub use validate::{ValidationContext, ValidationRunner, Validator};

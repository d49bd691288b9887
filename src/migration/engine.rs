//! Migration executor
//!
//! Compares the stored schema fingerprint against the configured one and,
//! when they differ, walks every node through the resolved migration path:
//! backup first, transform, bump versions, persist, audit. Dry runs report
//! what would change without writing anything.
//!
//! The executor aborts hard on the first transform failure; a half-migrated
//! node set is unsafe, and the pre-migration backup is the recovery path.
//! Audit-append failures, by contrast, are logged and never fail the run.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{DocGraphError, Result};
use crate::fingerprint;
use crate::migration::{Migration, MigrationRegistry};
use crate::node::{Node, NodeId};
use crate::store::{AuditEntry, AuditStore, Backup, ConfigStore, NodeStore};

/// Operation name stamped on audit entries written by the executor
const AUDIT_OPERATION: &str = "migrate";

/// Result of one executor run
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    /// Fingerprint the node tree was in before the run
    pub from: String,
    /// Fingerprint of the current configuration
    pub to: String,
    /// Names of the migrations applied, in order
    pub steps: Vec<String>,
    /// Nodes the transforms were applied to
    pub nodes_processed: usize,
    /// Nodes detected as modified (dry run: would be modified)
    pub modified: Vec<NodeId>,
    pub dry_run: bool,
    /// Name of the snapshot taken before mutation, when one was
    pub backup: Option<String>,
}

impl MigrationReport {
    fn noop(fingerprint: String) -> Self {
        Self {
            from: fingerprint.clone(),
            to: fingerprint,
            steps: Vec::new(),
            nodes_processed: 0,
            modified: Vec::new(),
            dry_run: false,
            backup: None,
        }
    }
}

/// Drives migrations over the storage collaborators
pub struct MigrationEngine<'a> {
    nodes: &'a dyn NodeStore,
    config: &'a dyn ConfigStore,
    audit: &'a dyn AuditStore,
    backup: &'a dyn Backup,
    registry: &'a MigrationRegistry,
    backup_enabled: bool,
    user: String,
}

impl<'a> MigrationEngine<'a> {
    pub fn new(
        nodes: &'a dyn NodeStore,
        config: &'a dyn ConfigStore,
        audit: &'a dyn AuditStore,
        backup: &'a dyn Backup,
        registry: &'a MigrationRegistry,
    ) -> Self {
        Self {
            nodes,
            config,
            audit,
            backup,
            registry,
            backup_enabled: true,
            user: "migration-engine".to_string(),
        }
    }

    /// Skip the pre-migration backup
    pub fn without_backup(mut self) -> Self {
        self.backup_enabled = false;
        self
    }

    /// Attribute audit entries to a user
    pub fn as_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Read-only drift check: (needed, current, expected)
    pub fn needs_migration(&self) -> Result<(bool, String, String)> {
        let config = self.config.load()?;
        let expected = fingerprint::compute(&config)?;
        let current = config.schema_fingerprint.clone();
        Ok((current != expected, current, expected))
    }

    /// Run the migration, or report what one would do when `dry_run`
    pub fn migrate(&self, dry_run: bool) -> Result<MigrationReport> {
        let mut config = self.config.load()?;
        let expected = fingerprint::compute(&config)?;
        let current = config.schema_fingerprint.clone();

        if current == expected {
            debug!(fingerprint = %current, "schema fingerprint unchanged, nothing to migrate");
            return Ok(MigrationReport::noop(current));
        }

        // Unregistered additive schema changes must never block operation:
        // with no registered path, the fingerprint moves and the nodes stay.
        let identity;
        let path: Vec<&Migration> = match self.registry.find_path(&current, &expected) {
            Some(path) => path,
            None => {
                identity = Migration::new("identity", current.clone(), expected.clone());
                vec![&identity]
            }
        };
        let steps: Vec<String> = path.iter().map(|m| m.name.clone()).collect();
        info!(from = %current, to = %expected, steps = ?steps, dry_run, "resolving migration path");

        let loaded = self.nodes.load_all()?;

        let backup = if !dry_run && self.backup_enabled {
            let name = self.backup.create()?;
            info!(snapshot = %name, "created pre-migration backup");
            Some(name)
        } else {
            None
        };

        let mut modified: Vec<NodeId> = Vec::new();
        let mut results: Vec<(Node, Node)> = Vec::new();

        for node in &loaded {
            let mut current_node = node.clone();
            for migration in &path {
                current_node = migration.apply(&current_node).map_err(|message| {
                    DocGraphError::TransformFailed {
                        name: migration.name.clone(),
                        node_id: node.id.clone(),
                        message,
                    }
                })?;
            }
            if node_modified(node, &current_node) {
                modified.push(node.id.clone());
            }
            results.push((node.clone(), current_node));
        }

        if dry_run {
            info!(nodes = loaded.len(), modified = modified.len(), "dry run complete");
            return Ok(MigrationReport {
                from: current,
                to: expected,
                steps,
                nodes_processed: loaded.len(),
                modified,
                dry_run: true,
                backup: None,
            });
        }

        for (original, mut result) in results {
            if !modified.contains(&original.id) {
                continue;
            }
            result.version = original.version + 1;
            self.nodes.save(&result)?;

            let entry = AuditEntry::new(original.id.as_str(), AUDIT_OPERATION, self.user.as_str())
                .with_before(serde_json::to_value(&original)?)
                .with_after(serde_json::to_value(&result)?);
            // Failure isolation: a lost audit record is logged, never fatal.
            if let Err(err) = self.audit.append(&entry) {
                warn!(node = %original.id, error = %err, "audit append failed during migration");
            }
        }

        config.schema_fingerprint = expected.clone();
        self.config.save(&config)?;
        info!(
            from = %current,
            to = %expected,
            modified = modified.len(),
            "migration complete"
        );

        Ok(MigrationReport {
            from: current,
            to: expected,
            steps,
            nodes_processed: loaded.len(),
            modified,
            dry_run: false,
            backup,
        })
    }
}

/// The documented modification check: a simplified subset of fields, not
/// deep equality. Transforms that only touch nested content or custom
/// fields are invisible to it.
fn node_modified(before: &Node, after: &Node) -> bool {
    before.id != after.id || before.version != after.version || before.title != after.title
}

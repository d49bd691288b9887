//! Append-only audit log
//!
//! One JSON record per line. Appends are serialized under a mutex spanning
//! open-for-append through write-one-record, so interleaved writers never
//! produce a torn record. Queries read without the lock: a racing append is
//! either fully visible or not yet visible, and a trailing partial line is
//! skipped rather than treated as corruption.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::Result;
use crate::node::NodeId;
use crate::store::AuditStore;

/// One immutable audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub node_id: NodeId,
    /// Operation name, e.g. "migrate"
    pub operation: String,
    pub user: String,
    /// Node state before the operation, when captured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<serde_json::Value>,
    /// Node state after the operation, when captured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<serde_json::Value>,
    /// SHA256 of the after-snapshot, stamped at append time
    #[serde(default)]
    pub snapshot_hash: String,
}

impl AuditEntry {
    pub fn new(
        node_id: impl Into<NodeId>,
        operation: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            node_id: node_id.into(),
            operation: operation.into(),
            user: user.into(),
            before: None,
            after: None,
            snapshot_hash: String::new(),
        }
    }

    pub fn with_before(mut self, snapshot: serde_json::Value) -> Self {
        self.before = Some(snapshot);
        self
    }

    pub fn with_after(mut self, snapshot: serde_json::Value) -> Self {
        self.snapshot_hash = hash_snapshot(&snapshot);
        self.after = Some(snapshot);
        self
    }
}

fn hash_snapshot(snapshot: &serde_json::Value) -> String {
    let canonical = snapshot.to_string();
    format!("{:x}", Sha256::digest(canonical.as_bytes()))
}

/// Filter for audit queries; unset fields match everything
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub node_id: Option<NodeId>,
    pub operation: Option<String>,
    pub user: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl AuditFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, node_id: impl Into<NodeId>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    pub fn operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn between(mut self, since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self.until = Some(until);
        self
    }

    fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(node_id) = &self.node_id {
            if &entry.node_id != node_id {
                return false;
            }
        }
        if let Some(operation) = &self.operation {
            if &entry.operation != operation {
                return false;
            }
        }
        if let Some(user) = &self.user {
            if &entry.user != user {
                return false;
            }
        }
        if let Some(since) = &self.since {
            if entry.timestamp < *since {
                return false;
            }
        }
        if let Some(until) = &self.until {
            if entry.timestamp > *until {
                return false;
            }
        }
        true
    }
}

/// File-backed audit store, one JSON record per line
pub struct FsAuditStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FsAuditStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn read_entries(&self) -> Result<Vec<AuditEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        let mut entries = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            // A racing append may leave the final line incomplete; skip it.
            match serde_json::from_str::<AuditEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(_) => continue,
            }
        }
        Ok(entries)
    }
}

impl AuditStore for FsAuditStore {
    fn append(&self, entry: &AuditEntry) -> Result<()> {
        let record = serde_json::to_string(entry)?;

        // Lock spans open-for-append through write-one-record.
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", record)?;
        Ok(())
    }

    fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        let mut entries: Vec<AuditEntry> = self
            .read_entries()?
            .into_iter()
            .filter(|e| filter.matches(e))
            .collect();
        entries.sort_by_key(|e| e.timestamp);
        Ok(entries)
    }

    fn latest_hashes(&self) -> Result<HashMap<NodeId, String>> {
        let mut entries = self.read_entries()?;
        entries.sort_by_key(|e| e.timestamp);

        let mut hashes = HashMap::new();
        for entry in entries {
            if !entry.snapshot_hash.is_empty() {
                hashes.insert(entry.node_id, entry.snapshot_hash);
            }
        }
        Ok(hashes)
    }
}

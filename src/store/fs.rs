//! Filesystem storage
//!
//! Default implementations of the storage contracts: one pretty-printed JSON
//! file per node (nested directories mirror the slash-separated ids), a JSON
//! configuration file, and timestamped backup snapshots of both.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use walkdir::WalkDir;

use crate::config::ProjectConfig;
use crate::diagnostics::DocumentIndex;
use crate::error::{DocGraphError, Result};
use crate::node::Node;
use crate::store::{Backup, ConfigStore, NodeStore};

/// Node tree on disk: `<root>/<id>.json`
pub struct FsNodeStore {
    root: PathBuf,
}

impl FsNodeStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn node_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.json", id))
    }

    /// Position index over a node's stored text, for located diagnostics
    pub fn document_index(&self, id: &str) -> Option<DocumentIndex> {
        let path = self.node_path(id);
        let text = fs::read_to_string(&path).ok()?;
        let file = format!("{}.json", id);
        Some(DocumentIndex::new(file, &text))
    }
}

impl NodeStore for FsNodeStore {
    fn load_all(&self) -> Result<Vec<Node>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut nodes = Vec::new();
        for entry in WalkDir::new(&self.root).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_file() || path.extension().map(|x| x != "json").unwrap_or(true) {
                continue;
            }
            let content = fs::read_to_string(path)?;
            let node: Node = serde_json::from_str(&content).map_err(|e| {
                DocGraphError::Store(format!("malformed node file {}: {}", path.display(), e))
            })?;
            nodes.push(node);
        }
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(nodes)
    }

    fn load(&self, id: &str) -> Result<Node> {
        let path = self.node_path(id);
        if !path.exists() {
            return Err(DocGraphError::NodeNotFound(id.to_string()));
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, node: &Node) -> Result<()> {
        let path = self.node_path(&node.id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(node)?;
        fs::write(&path, content)?;
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        let path = self.node_path(id);
        if !path.exists() {
            return Err(DocGraphError::NodeNotFound(id.to_string()));
        }
        fs::remove_file(&path)?;
        Ok(())
    }

    fn exists(&self, id: &str) -> bool {
        self.node_path(id).exists()
    }
}

/// Project configuration as a single JSON file
pub struct FsConfigStore {
    path: PathBuf,
}

impl FsConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigStore for FsConfigStore {
    fn load(&self) -> Result<ProjectConfig> {
        if !self.path.exists() {
            return Ok(ProjectConfig::default());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, config: &ProjectConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

/// Timestamped snapshots of configuration plus the node tree
///
/// Layout: `<backups>/<timestamp>/config.json` and
/// `<backups>/<timestamp>/nodes/...`. Restore fully replaces current state.
pub struct FsBackup {
    nodes_root: PathBuf,
    config_path: PathBuf,
    backups_root: PathBuf,
}

impl FsBackup {
    pub fn new(
        nodes_root: impl Into<PathBuf>,
        config_path: impl Into<PathBuf>,
        backups_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            nodes_root: nodes_root.into(),
            config_path: config_path.into(),
            backups_root: backups_root.into(),
        }
    }

    fn snapshot_dir(&self, name: &str) -> PathBuf {
        self.backups_root.join(name)
    }
}

impl Backup for FsBackup {
    fn create(&self) -> Result<String> {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%3f").to_string();
        let mut name = stamp.clone();
        let mut suffix = 1;
        while self.snapshot_dir(&name).exists() {
            name = format!("{}-{}", stamp, suffix);
            suffix += 1;
        }

        let dir = self.snapshot_dir(&name);
        fs::create_dir_all(&dir)?;

        if self.config_path.exists() {
            fs::copy(&self.config_path, dir.join("config.json"))?;
        }
        if self.nodes_root.exists() {
            copy_tree(&self.nodes_root, &dir.join("nodes"))?;
        }

        Ok(name)
    }

    fn restore(&self, snapshot: &str) -> Result<()> {
        let dir = self.snapshot_dir(snapshot);
        if !dir.exists() {
            return Err(DocGraphError::BackupNotFound(snapshot.to_string()));
        }

        if self.nodes_root.exists() {
            fs::remove_dir_all(&self.nodes_root)?;
        }
        fs::create_dir_all(&self.nodes_root)?;
        let nodes_snapshot = dir.join("nodes");
        if nodes_snapshot.exists() {
            copy_tree(&nodes_snapshot, &self.nodes_root)?;
        }

        let config_snapshot = dir.join("config.json");
        if config_snapshot.exists() {
            if let Some(parent) = self.config_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&config_snapshot, &self.config_path)?;
        } else if self.config_path.exists() {
            fs::remove_file(&self.config_path)?;
        }

        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        if !self.backups_root.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.backups_root)? {
            let entry = entry?;
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    for entry in WalkDir::new(from).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        let Ok(relative) = path.strip_prefix(from) else {
            continue;
        };
        let target = to.join(relative);
        if path.is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(path, &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeStatus;
    use tempfile::tempdir;

    #[test]
    fn test_save_load_roundtrip_preserves_fields() {
        let dir = tempdir().unwrap();
        let store = FsNodeStore::new(dir.path().join("nodes"));

        let mut node = Node::new("arch/storage/wal", "component", "Write-ahead log")
            .with_uses(&["arch/storage/pager"])
            .with_related(&["arch/overview"]);
        node.version = 4;
        node.status = Some(NodeStatus::Approved);
        node.tags = vec!["storage".to_string()];

        store.save(&node).unwrap();
        let back = store.load("arch/storage/wal").unwrap();

        assert_eq!(back.id, node.id);
        assert_eq!(back.kind, node.kind);
        assert_eq!(back.version, node.version);
        assert_eq!(back.status, node.status);
        assert_eq!(back.title, node.title);
        assert_eq!(back.tags, node.tags);
        assert_eq!(back.refs, node.refs);
    }

    #[test]
    fn test_load_all_sorted_by_id() {
        let dir = tempdir().unwrap();
        let store = FsNodeStore::new(dir.path().join("nodes"));
        store.save(&Node::new("b/two", "component", "B")).unwrap();
        store.save(&Node::new("a/one", "component", "A")).unwrap();

        let all = store.load_all().unwrap();
        let ids: Vec<&str> = all.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a/one", "b/two"]);
    }

    #[test]
    fn test_missing_node_errors() {
        let dir = tempdir().unwrap();
        let store = FsNodeStore::new(dir.path().join("nodes"));
        assert!(matches!(
            store.load("ghost"),
            Err(DocGraphError::NodeNotFound(_))
        ));
        assert!(matches!(
            store.delete("ghost"),
            Err(DocGraphError::NodeNotFound(_))
        ));
        assert!(!store.exists("ghost"));
    }

    #[test]
    fn test_document_index_points_into_stored_file() {
        let dir = tempdir().unwrap();
        let store = FsNodeStore::new(dir.path().join("nodes"));
        store.save(&Node::new("a", "component", "A")).unwrap();

        let index = store.document_index("a").unwrap();
        let loc = index.resolve("title");
        assert!(loc.line > 1);
        assert_eq!(loc.file, "a.json");
    }

    #[test]
    fn test_config_store_defaults_when_missing() {
        let dir = tempdir().unwrap();
        let store = FsConfigStore::new(dir.path().join("config.json"));
        let config = store.load().unwrap();
        assert!(!config.has_rules());

        let mut config = ProjectConfig::default();
        config.schema_fingerprint = "abcdef0123456789".to_string();
        store.save(&config).unwrap();
        assert_eq!(store.load().unwrap().schema_fingerprint, "abcdef0123456789");
    }

    #[test]
    fn test_backup_create_restore() {
        let dir = tempdir().unwrap();
        let nodes_root = dir.path().join("nodes");
        let config_path = dir.path().join("config.json");
        let store = FsNodeStore::new(&nodes_root);
        let config_store = FsConfigStore::new(&config_path);
        let backup = FsBackup::new(&nodes_root, &config_path, dir.path().join("backups"));

        store.save(&Node::new("a", "component", "Original")).unwrap();
        config_store.save(&ProjectConfig::default()).unwrap();

        let snapshot = backup.create().unwrap();
        assert_eq!(backup.list().unwrap(), vec![snapshot.clone()]);

        // Mutate, then restore.
        let mut changed = store.load("a").unwrap();
        changed.title = "Changed".to_string();
        store.save(&changed).unwrap();
        store.save(&Node::new("b", "component", "Extra")).unwrap();

        backup.restore(&snapshot).unwrap();
        assert_eq!(store.load("a").unwrap().title, "Original");
        assert!(!store.exists("b"));
    }

    #[test]
    fn test_restore_unknown_snapshot_errors() {
        let dir = tempdir().unwrap();
        let backup = FsBackup::new(
            dir.path().join("nodes"),
            dir.path().join("config.json"),
            dir.path().join("backups"),
        );
        assert!(matches!(
            backup.restore("nope"),
            Err(DocGraphError::BackupNotFound(_))
        ));
    }
}

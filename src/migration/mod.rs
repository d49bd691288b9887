//! Schema migrations
//!
//! A migration is a named transform between two schema fingerprints. The
//! registry is a plain caller-owned value: construct one, register the
//! migrations you ship, hand it to the engine. There is no ambient global
//! state.

pub mod engine;

pub use engine::{MigrationEngine, MigrationReport};

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use crate::error::{DocGraphError, Result};
use crate::node::Node;

/// Pure node transform; must never mutate its input
pub type TransformFn = Arc<dyn Fn(&Node) -> std::result::Result<Node, String> + Send + Sync>;

/// A named transform between two schema fingerprints
///
/// An empty `from` matches any source fingerprint. A migration without a
/// transform is identity: the fingerprint moves, the nodes do not.
#[derive(Clone)]
pub struct Migration {
    pub name: String,
    pub from: String,
    pub to: String,
    transform: Option<TransformFn>,
}

impl Migration {
    pub fn new(name: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            from: from.into(),
            to: to.into(),
            transform: None,
        }
    }

    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(&Node) -> std::result::Result<Node, String> + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    /// Whether this migration applies from the given fingerprint
    pub fn matches_source(&self, from: &str) -> bool {
        self.from.is_empty() || self.from == from
    }

    /// Apply the transform, or hand back a copy for identity migrations
    pub fn apply(&self, node: &Node) -> std::result::Result<Node, String> {
        match &self.transform {
            Some(transform) => transform(node),
            None => Ok(node.clone()),
        }
    }
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("name", &self.name)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("has_transform", &self.transform.is_some())
            .finish()
    }
}

/// Caller-owned collection of registered migrations
#[derive(Debug, Default)]
pub struct MigrationRegistry {
    migrations: Vec<Migration>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a migration; names are unique
    pub fn register(&mut self, migration: Migration) -> Result<()> {
        if self.migrations.iter().any(|m| m.name == migration.name) {
            return Err(DocGraphError::DuplicateMigration(migration.name));
        }
        self.migrations.push(migration);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Migration> {
        self.migrations.iter()
    }

    /// First migration whose source matches (exact or wildcard) and whose
    /// target matches exactly
    pub fn find(&self, from: &str, to: &str) -> Option<&Migration> {
        self.migrations
            .iter()
            .find(|m| m.matches_source(from) && m.to == to)
    }

    /// Shortest migration sequence from one fingerprint to another
    ///
    /// Breadth-first search over the fingerprint graph, expanding migrations
    /// in registration order for deterministic results. Returns `None` when
    /// the fingerprints are already equal and when the target is unreachable.
    pub fn find_path(&self, from: &str, to: &str) -> Option<Vec<&Migration>> {
        if from == to {
            return None;
        }

        let mut visited: HashSet<String> = HashSet::new();
        // state reached -> (previous state, index of the migration taken)
        let mut parents: HashMap<String, (String, usize)> = HashMap::new();
        let mut queue: VecDeque<String> = VecDeque::new();

        visited.insert(from.to_string());
        queue.push_back(from.to_string());

        while let Some(state) = queue.pop_front() {
            for (idx, migration) in self.migrations.iter().enumerate() {
                if !migration.matches_source(&state) {
                    continue;
                }
                if !visited.insert(migration.to.clone()) {
                    continue;
                }
                parents.insert(migration.to.clone(), (state.clone(), idx));

                if migration.to == to {
                    let mut path = Vec::new();
                    let mut cursor = to.to_string();
                    while cursor != from {
                        let (prev, step) = &parents[&cursor];
                        path.push(&self.migrations[*step]);
                        cursor = prev.clone();
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(migration.to.clone());
            }
        }

        None
    }
}

//! Configuration for the governance engine
//!
//! Two layers live here:
//!
//! - [`ProjectConfig`]: the governed project's rules (block types, per-kind
//!   required fields, cross-references) plus the persisted schema
//!   fingerprint. Loaded and saved through the Config Store collaborator.
//! - [`Settings`]: runtime settings for the engine itself, loaded from:
//!   - Default values
//!   - Config file (docgraph.toml)
//!   - Environment variables (DOCGRAPH__*)
//!
//! ## Example settings file (docgraph.toml):
//! ```toml
//! [store]
//! root = "./design"
//!
//! [migration]
//! backup = true
//!
//! [validation]
//! max_diagnostics = 500
//! suggestion_limit = 3
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Field rules for one block type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockTypeRule {
    /// Fields every block of this type must carry
    #[serde(default)]
    pub required: Vec<String>,
    /// Fields a block of this type may carry
    #[serde(default)]
    pub optional: Vec<String>,
}

/// Field rules for one node kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KindRule {
    /// Custom fields every node of this kind must carry
    #[serde(default)]
    pub required_fields: Vec<String>,
}

/// A configured cross-reference: values of (source type, source field) must
/// appear among the observed values of (target type, target field)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossRefRule {
    pub source_type: String,
    pub source_field: String,
    pub target_type: String,
    pub target_field: String,
}

/// The governed project's configured rules
///
/// The fingerprint of these rules is what the migration engine compares
/// against the persisted one to detect schema drift.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Block type name to field rules
    #[serde(default)]
    pub block_types: BTreeMap<String, BlockTypeRule>,

    /// Node kind to field rules
    #[serde(default)]
    pub kinds: BTreeMap<String, KindRule>,

    /// Cross-reference rules checked by the cross-reference validator
    #[serde(default)]
    pub cross_references: Vec<CrossRefRule>,

    /// Fingerprint of the rules the stored nodes were last migrated to
    #[serde(default)]
    pub schema_fingerprint: String,
}

impl ProjectConfig {
    /// Whether any structural rules are configured at all
    pub fn has_rules(&self) -> bool {
        !self.block_types.is_empty() || !self.kinds.is_empty()
    }
}

/// Runtime settings for the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub migration: MigrationSettings,

    #[serde(default)]
    pub validation: ValidationSettings,
}

/// Store location settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Root directory of the node tree
    #[serde(default = "default_store_root")]
    pub root: PathBuf,
}

/// Migration engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationSettings {
    /// Create a full backup before mutating anything
    #[serde(default = "default_true")]
    pub backup: bool,
}

/// Validation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSettings {
    /// Cap on stored diagnostics; unlimited when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_diagnostics: Option<usize>,

    /// Maximum Levenshtein distance for typo suggestions
    #[serde(default = "default_suggestion_threshold")]
    pub suggestion_threshold: usize,

    /// Maximum number of suggestions per diagnostic
    #[serde(default = "default_suggestion_limit")]
    pub suggestion_limit: usize,
}

// Default value functions
fn default_store_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_true() -> bool {
    true
}

fn default_suggestion_threshold() -> usize {
    2
}

fn default_suggestion_limit() -> usize {
    3
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            root: default_store_root(),
        }
    }
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self { backup: true }
    }
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            max_diagnostics: None,
            suggestion_threshold: default_suggestion_threshold(),
            suggestion_limit: default_suggestion_limit(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store: StoreSettings::default(),
            migration: MigrationSettings::default(),
            validation: ValidationSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load settings from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["docgraph.toml", ".docgraph.toml", "config/docgraph.toml"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "docgraph", "docgraph") {
            let xdg_config = config_dir.config_dir().join("docgraph.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Environment variables (DOCGRAPH__*)
        builder = builder.add_source(
            Environment::with_prefix("DOCGRAPH")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save settings to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(settings.migration.backup);
        assert_eq!(settings.validation.suggestion_threshold, 2);
        assert_eq!(settings.validation.suggestion_limit, 3);
        assert!(settings.validation.max_diagnostics.is_none());
    }

    #[test]
    fn test_serialize_settings() {
        let settings = Settings::default();
        let toml_str = toml::to_string_pretty(&settings).unwrap();
        assert!(toml_str.contains("[store]"));
        assert!(toml_str.contains("[migration]"));
    }

    #[test]
    fn test_project_config_roundtrip() {
        let mut config = ProjectConfig::default();
        config.block_types.insert(
            "table".to_string(),
            BlockTypeRule {
                required: vec!["columns".to_string()],
                optional: vec!["caption".to_string()],
            },
        );
        config.kinds.insert(
            "decision".to_string(),
            KindRule {
                required_fields: vec!["owner".to_string()],
            },
        );

        let json = serde_json::to_string(&config).unwrap();
        let back: ProjectConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
        assert!(back.has_rules());
        assert!(!ProjectConfig::default().has_rules());
    }
}

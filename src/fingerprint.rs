//! Schema fingerprinting
//!
//! A fingerprint is a 16-hex-character digest of the configured structural
//! rules. The stored fingerprint tells the migration engine what shape the
//! node tree was last written in; comparing it against the fingerprint of
//! the current configuration detects drift.
//!
//! The digest is computed over a canonical form with keys sorted at every
//! nesting level, so it is invariant under any permutation of the input
//! maps and lists, and changes whenever any rule's field set changes.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::config::ProjectConfig;
use crate::error::Result;

/// Number of hex characters kept from the digest (64 bits)
const FINGERPRINT_LEN: usize = 16;

/// Canonical rule shape: everything sorted, nothing optional
#[derive(Serialize)]
struct Canonical {
    blocks: BTreeMap<String, CanonicalBlock>,
    kinds: BTreeMap<String, Vec<String>>,
}

#[derive(Serialize)]
struct CanonicalBlock {
    required: Vec<String>,
    optional: Vec<String>,
}

/// Compute the fingerprint of the configured rules
///
/// Returns the empty string when no block-type and no kind rules are
/// configured; "no constraints" is a distinct, stable state.
pub fn compute(config: &ProjectConfig) -> Result<String> {
    if !config.has_rules() {
        return Ok(String::new());
    }

    let mut blocks = BTreeMap::new();
    for (name, rule) in &config.block_types {
        let mut required = rule.required.clone();
        required.sort();
        required.dedup();
        let mut optional = rule.optional.clone();
        optional.sort();
        optional.dedup();
        blocks.insert(name.clone(), CanonicalBlock { required, optional });
    }

    let mut kinds = BTreeMap::new();
    for (name, rule) in &config.kinds {
        let mut fields = rule.required_fields.clone();
        fields.sort();
        fields.dedup();
        kinds.insert(name.clone(), fields);
    }

    // BTreeMap serialization emits keys sorted at every nesting level.
    let canonical = serde_json::to_string(&Canonical { blocks, kinds })?;
    let digest = Sha256::digest(canonical.as_bytes());
    let hex = format!("{:x}", digest);
    Ok(hex[..FINGERPRINT_LEN].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BlockTypeRule, KindRule};

    fn config_with(block: &str, required: &[&str], optional: &[&str]) -> ProjectConfig {
        let mut config = ProjectConfig::default();
        config.block_types.insert(
            block.to_string(),
            BlockTypeRule {
                required: required.iter().map(|s| s.to_string()).collect(),
                optional: optional.iter().map(|s| s.to_string()).collect(),
            },
        );
        config
    }

    #[test]
    fn test_empty_config_has_empty_fingerprint() {
        assert_eq!(compute(&ProjectConfig::default()).unwrap(), "");
    }

    #[test]
    fn test_fingerprint_shape() {
        let fp = compute(&config_with("table", &["columns"], &[])).unwrap();
        assert_eq!(fp.len(), FINGERPRINT_LEN);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_invariant_under_list_permutation() {
        let a = compute(&config_with("table", &["columns", "caption"], &["notes"])).unwrap();
        let b = compute(&config_with("table", &["caption", "columns"], &["notes"])).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invariant_under_map_insertion_order() {
        let mut first = config_with("table", &["columns"], &[]);
        first
            .kinds
            .insert("decision".to_string(), KindRule { required_fields: vec!["owner".into()] });
        first
            .kinds
            .insert("component".to_string(), KindRule { required_fields: vec![] });

        let mut second = ProjectConfig::default();
        second
            .kinds
            .insert("component".to_string(), KindRule { required_fields: vec![] });
        second
            .kinds
            .insert("decision".to_string(), KindRule { required_fields: vec!["owner".into()] });
        second.block_types.insert(
            "table".to_string(),
            BlockTypeRule {
                required: vec!["columns".to_string()],
                optional: vec![],
            },
        );

        assert_eq!(compute(&first).unwrap(), compute(&second).unwrap());
    }

    #[test]
    fn test_changes_when_any_rule_changes() {
        let base = compute(&config_with("table", &["columns"], &[])).unwrap();
        let extra_required = compute(&config_with("table", &["columns", "caption"], &[])).unwrap();
        let extra_optional = compute(&config_with("table", &["columns"], &["caption"])).unwrap();
        let other_block = compute(&config_with("code", &["columns"], &[])).unwrap();

        assert_ne!(base, extra_required);
        assert_ne!(base, extra_optional);
        assert_ne!(base, other_block);
        assert_ne!(extra_required, extra_optional);
    }

    #[test]
    fn test_kind_rules_alone_produce_a_fingerprint() {
        let mut config = ProjectConfig::default();
        config
            .kinds
            .insert("decision".to_string(), KindRule { required_fields: vec!["owner".into()] });
        let fp = compute(&config).unwrap();
        assert_eq!(fp.len(), FINGERPRINT_LEN);
    }
}

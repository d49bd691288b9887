//! Cross-reference validator
//!
//! Two passes. Pass one scans every block project-wide and records, per
//! (block type, field) pair, the set of observed literal values. Pass two
//! checks every configured referencing pair against that set, for scalar and
//! list values alike, across nodes and within the same node. An empty or
//! absent target set fails every value: an unpopulated reference domain
//! cannot justify any match.

use std::collections::{BTreeSet, HashMap};

use crate::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticCollector};
use crate::graph::NodeGraph;
use crate::validate::{ValidationContext, Validator};

pub struct CrossRefValidator;

impl Validator for CrossRefValidator {
    fn name(&self) -> &'static str {
        "crossref"
    }

    fn validate(
        &self,
        graph: &NodeGraph,
        ctx: &ValidationContext<'_>,
        out: &mut DiagnosticCollector,
    ) {
        if ctx.config.cross_references.is_empty() {
            return;
        }

        // Pass 1: observed values per (block type, field).
        let mut observed: HashMap<(String, String), BTreeSet<String>> = HashMap::new();
        for node in graph.iter() {
            for (_, block) in node.blocks_with_paths() {
                for (field, value) in &block.fields {
                    for literal in literal_values(value) {
                        observed
                            .entry((block.block_type.clone(), field.clone()))
                            .or_default()
                            .insert(literal);
                    }
                }
            }
        }

        // Pass 2: every configured referencing pair.
        for rule in &ctx.config.cross_references {
            let domain = observed
                .get(&(rule.target_type.clone(), rule.target_field.clone()));
            let domain_values: Vec<String> = domain
                .map(|set| set.iter().cloned().collect())
                .unwrap_or_default();

            for node in graph.iter() {
                for (path, block) in node.blocks_with_paths() {
                    if block.block_type != rule.source_type {
                        continue;
                    }
                    let Some(value) = block.fields.get(&rule.source_field) else {
                        continue;
                    };

                    for literal in literal_values(value) {
                        if domain.map(|set| set.contains(&literal)).unwrap_or(false) {
                            continue;
                        }
                        let mut diagnostic = ctx.located(
                            Diagnostic::new(
                                DiagnosticCode::CrossRefUnmatched,
                                format!(
                                    "node '{}' {}.{} value '{}' not found among {}.{} values",
                                    node.id,
                                    rule.source_type,
                                    rule.source_field,
                                    literal,
                                    rule.target_type,
                                    rule.target_field
                                ),
                            )
                            .with_related(node.id.clone()),
                            &node.id,
                            &format!("{}.{}", path, rule.source_field),
                        );
                        if let Some(suggestion) = ctx.suggester.best(&literal, &domain_values) {
                            diagnostic = diagnostic.with_suggestion(suggestion);
                        }
                        out.add(diagnostic);
                    }
                }
            }
        }
    }
}

/// The literal values a field contributes: its scalar, or each scalar
/// element of a list. Nested structures contribute nothing.
fn literal_values(value: &serde_json::Value) -> Vec<String> {
    match value {
        serde_json::Value::String(s) => vec![s.clone()],
        serde_json::Value::Number(n) => vec![n.to_string()],
        serde_json::Value::Bool(b) => vec![b.to_string()],
        serde_json::Value::Array(items) => items
            .iter()
            .flat_map(|item| match item {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                serde_json::Value::Bool(b) => Some(b.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

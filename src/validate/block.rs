//! Block validator
//!
//! Validates content blocks against a closed set of known block types plus
//! whatever the project configuration declares. Unknown types get a typo
//! suggestion against that set; table blocks additionally require every
//! declared column to carry a `key`.

use crate::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticCollector};
use crate::graph::NodeGraph;
use crate::node::Block;
use crate::validate::{ValidationContext, Validator};

/// Built-in block types and their required fields
const KNOWN_BLOCKS: &[(&str, &[&str])] = &[
    ("text", &["body"]),
    ("list", &["items"]),
    ("table", &["columns"]),
    ("code", &["language", "body"]),
    ("link", &["url"]),
];

pub struct BlockValidator;

impl BlockValidator {
    fn builtin_required(block_type: &str) -> Option<&'static [&'static str]> {
        KNOWN_BLOCKS
            .iter()
            .find(|(name, _)| *name == block_type)
            .map(|(_, required)| *required)
    }
}

impl Validator for BlockValidator {
    fn name(&self) -> &'static str {
        "block"
    }

    fn validate(
        &self,
        graph: &NodeGraph,
        ctx: &ValidationContext<'_>,
        out: &mut DiagnosticCollector,
    ) {
        let mut known: Vec<String> = KNOWN_BLOCKS.iter().map(|(name, _)| name.to_string()).collect();
        known.extend(ctx.config.block_types.keys().cloned());
        known.sort();
        known.dedup();

        for node in graph.iter() {
            for (path, block) in node.blocks_with_paths() {
                let builtin = Self::builtin_required(&block.block_type);
                let configured = ctx.config.block_types.get(&block.block_type);

                if builtin.is_none() && configured.is_none() {
                    let mut diagnostic = ctx.located(
                        Diagnostic::new(
                            DiagnosticCode::UnknownBlockType,
                            format!(
                                "node '{}' has unknown block type '{}' at {}",
                                node.id, block.block_type, path
                            ),
                        )
                        .with_related(node.id.clone()),
                        &node.id,
                        &format!("{}.type", path),
                    );
                    if let Some(suggestion) = ctx.suggester.best(&block.block_type, &known) {
                        diagnostic = diagnostic.with_suggestion(suggestion);
                    }
                    out.add(diagnostic);
                    continue;
                }

                let mut required: Vec<&str> = Vec::new();
                if let Some(fields) = builtin {
                    required.extend(fields.iter().copied());
                }
                if let Some(rule) = configured {
                    required.extend(rule.required.iter().map(String::as_str));
                }
                required.sort();
                required.dedup();

                for field in required {
                    if !block.fields.contains_key(field) {
                        out.add(ctx.located(
                            Diagnostic::new(
                                DiagnosticCode::MissingBlockField,
                                format!(
                                    "node '{}' block '{}' at {} is missing field '{}'",
                                    node.id, block.block_type, path, field
                                ),
                            )
                            .with_related(node.id.clone()),
                            &node.id,
                            &path,
                        ));
                    }
                }

                if block.block_type == "table" {
                    check_table_columns(&node.id, block, &path, ctx, out);
                }
            }
        }
    }
}

/// Every declared table column must carry a `key`
fn check_table_columns(
    node_id: &str,
    block: &Block,
    path: &str,
    ctx: &ValidationContext<'_>,
    out: &mut DiagnosticCollector,
) {
    let Some(columns) = block.fields.get("columns").and_then(|v| v.as_array()) else {
        return;
    };
    for (i, column) in columns.iter().enumerate() {
        let has_key = column
            .as_object()
            .map(|obj| obj.contains_key("key"))
            .unwrap_or(false);
        if !has_key {
            out.add(ctx.located(
                Diagnostic::new(
                    DiagnosticCode::TableColumnMissingKey,
                    format!(
                        "node '{}' table at {} declares column {} without a key",
                        node_id, path, i
                    ),
                )
                .with_related(node_id.to_string()),
                node_id,
                &format!("{}.columns[{}]", path, i),
            ));
        }
    }
}

//! Schema validator
//!
//! Structural presence checks per node: id, kind, positive version, status,
//! title, one diagnostic per missing field. Kinds with configured rules also
//! require their custom fields.

use crate::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticCollector};
use crate::graph::NodeGraph;
use crate::node::Node;
use crate::validate::{ValidationContext, Validator};

pub struct SchemaValidator;

impl SchemaValidator {
    fn label(node: &Node) -> String {
        if !node.id.is_empty() {
            format!("node '{}'", node.id)
        } else if !node.title.is_empty() {
            format!("node titled '{}'", node.title)
        } else {
            "unnamed node".to_string()
        }
    }
}

impl Validator for SchemaValidator {
    fn name(&self) -> &'static str {
        "schema"
    }

    fn validate(
        &self,
        graph: &NodeGraph,
        ctx: &ValidationContext<'_>,
        out: &mut DiagnosticCollector,
    ) {
        for node in graph.iter() {
            let label = Self::label(node);

            if node.id.is_empty() {
                out.add(Diagnostic::new(
                    DiagnosticCode::MissingId,
                    format!("{} has no id", label),
                ));
            }
            if node.kind.is_empty() {
                out.add(ctx.located(
                    Diagnostic::new(
                        DiagnosticCode::MissingKind,
                        format!("{} has no kind", label),
                    )
                    .with_related(node.id.clone()),
                    &node.id,
                    "kind",
                ));
            }
            if node.version == 0 {
                out.add(ctx.located(
                    Diagnostic::new(
                        DiagnosticCode::MissingVersion,
                        format!("{} has no positive version", label),
                    )
                    .with_related(node.id.clone()),
                    &node.id,
                    "version",
                ));
            }
            if node.status.is_none() {
                out.add(
                    Diagnostic::new(
                        DiagnosticCode::MissingStatus,
                        format!("{} has no status", label),
                    )
                    .with_related(node.id.clone()),
                );
            }
            if node.title.is_empty() {
                out.add(
                    Diagnostic::new(
                        DiagnosticCode::MissingTitle,
                        format!("{} has no title", label),
                    )
                    .with_related(node.id.clone()),
                );
            }

            if let Some(rule) = ctx.config.kinds.get(&node.kind) {
                for field in &rule.required_fields {
                    if !node.custom.contains_key(field) {
                        out.add(
                            Diagnostic::new(
                                DiagnosticCode::MissingRequiredField,
                                format!(
                                    "{} is missing field '{}' required for kind '{}'",
                                    label, field, node.kind
                                ),
                            )
                            .with_related(node.id.clone()),
                        );
                    }
                }
            }
        }
    }
}

//! Reference validator
//!
//! Whole-graph pass: every `uses` and `related` target must resolve to an
//! existing node id. Unresolved targets get a suggestion from the closest
//! existing id; a failed suggestion lookup never suppresses the primary
//! diagnostic.

use crate::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticCollector};
use crate::graph::NodeGraph;
use crate::node::NodeId;
use crate::validate::{ValidationContext, Validator};

pub struct ReferenceValidator;

impl Validator for ReferenceValidator {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn validate(
        &self,
        graph: &NodeGraph,
        ctx: &ValidationContext<'_>,
        out: &mut DiagnosticCollector,
    ) {
        let candidates: Vec<NodeId> = graph.ids().into_iter().cloned().collect();

        for node in graph.iter() {
            for (i, target) in node.refs.uses.iter().enumerate() {
                if graph.contains(target) {
                    continue;
                }
                let mut diagnostic = ctx.located(
                    Diagnostic::new(
                        DiagnosticCode::UnresolvedUse,
                        format!("node '{}' uses unknown node '{}'", node.id, target),
                    )
                    .with_related(node.id.clone()),
                    &node.id,
                    &format!("refs.uses[{}]", i),
                );
                if let Some(suggestion) = ctx.suggester.best(target, &candidates) {
                    diagnostic = diagnostic.with_suggestion(suggestion);
                }
                out.add(diagnostic);
            }

            for (i, target) in node.refs.related.iter().enumerate() {
                if graph.contains(target) {
                    continue;
                }
                let mut diagnostic = ctx.located(
                    Diagnostic::new(
                        DiagnosticCode::UnresolvedRelated,
                        format!("node '{}' relates to unknown node '{}'", node.id, target),
                    )
                    .with_related(node.id.clone()),
                    &node.id,
                    &format!("refs.related[{}]", i),
                );
                if let Some(suggestion) = ctx.suggester.best(target, &candidates) {
                    diagnostic = diagnostic.with_suggestion(suggestion);
                }
                out.add(diagnostic);
            }
        }
    }
}

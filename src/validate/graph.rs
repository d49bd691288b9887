//! Graph validator
//!
//! Surfaces dependency cycles as diagnostics instead of hard errors, for
//! callers that want a full report rather than the first failure the
//! topological sort would give them.

use crate::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticCollector};
use crate::graph::{DependencyGraph, NodeGraph};
use crate::validate::{ValidationContext, Validator};

pub struct GraphValidator;

impl Validator for GraphValidator {
    fn name(&self) -> &'static str {
        "graph"
    }

    fn validate(
        &self,
        graph: &NodeGraph,
        _ctx: &ValidationContext<'_>,
        out: &mut DiagnosticCollector,
    ) {
        let dependencies = DependencyGraph::build(graph);
        if let Some(cycle) = dependencies.detect_cycle() {
            let mut diagnostic = Diagnostic::new(
                DiagnosticCode::DependencyCycle,
                format!("dependency cycle: {}", cycle.join(" -> ")),
            );
            for id in cycle.iter().take(cycle.len().saturating_sub(1)) {
                diagnostic = diagnostic.with_related(id.clone());
            }
            out.add(diagnostic);
        }
    }
}

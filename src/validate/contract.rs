//! Contract validator
//!
//! Scenario hygiene per node: non-empty, sibling-unique scenario names, at
//! least one step, no empty step text. The whole-graph part resolves every
//! `@node-id` reference embedded in step text against the graph, suggesting
//! near misses.

use std::collections::HashSet;

use regex::Regex;

use crate::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticCollector};
use crate::graph::NodeGraph;
use crate::node::NodeId;
use crate::validate::{ValidationContext, Validator};

pub struct ContractValidator;

impl Validator for ContractValidator {
    fn name(&self) -> &'static str {
        "contract"
    }

    fn validate(
        &self,
        graph: &NodeGraph,
        ctx: &ValidationContext<'_>,
        out: &mut DiagnosticCollector,
    ) {
        let reference = Regex::new(r"@([A-Za-z0-9_][A-Za-z0-9_/-]*)").expect("valid pattern");
        let candidates: Vec<NodeId> = graph.ids().into_iter().cloned().collect();

        for node in graph.iter() {
            for (ci, contract) in node.contracts.iter().enumerate() {
                let mut seen_names: HashSet<&str> = HashSet::new();

                for (si, scenario) in contract.scenarios.iter().enumerate() {
                    let path = format!("contracts[{}].scenarios[{}]", ci, si);

                    if scenario.name.trim().is_empty() {
                        out.add(ctx.located(
                            Diagnostic::new(
                                DiagnosticCode::EmptyScenarioName,
                                format!(
                                    "node '{}' contract '{}' has an unnamed scenario at index {}",
                                    node.id, contract.name, si
                                ),
                            )
                            .with_related(node.id.clone()),
                            &node.id,
                            &path,
                        ));
                    } else if !seen_names.insert(scenario.name.as_str()) {
                        out.add(ctx.located(
                            Diagnostic::new(
                                DiagnosticCode::DuplicateScenarioName,
                                format!(
                                    "node '{}' contract '{}' repeats scenario name '{}'",
                                    node.id, contract.name, scenario.name
                                ),
                            )
                            .with_related(node.id.clone()),
                            &node.id,
                            &path,
                        ));
                    }

                    if scenario.step_count() == 0 {
                        out.add(ctx.located(
                            Diagnostic::new(
                                DiagnosticCode::EmptyScenario,
                                format!(
                                    "node '{}' scenario '{}' declares no steps",
                                    node.id, scenario.name
                                ),
                            )
                            .with_related(node.id.clone()),
                            &node.id,
                            &path,
                        ));
                    }

                    for (step_index, step) in scenario.steps().enumerate() {
                        if step.trim().is_empty() {
                            out.add(ctx.located(
                                Diagnostic::new(
                                    DiagnosticCode::EmptyStepText,
                                    format!(
                                        "node '{}' scenario '{}' has an empty step at index {}",
                                        node.id, scenario.name, step_index
                                    ),
                                )
                                .with_related(node.id.clone()),
                                &node.id,
                                &path,
                            ));
                            continue;
                        }

                        // Whole-graph part: embedded @id references must resolve.
                        for capture in reference.captures_iter(step) {
                            let target = &capture[1];
                            if graph.contains(target) {
                                continue;
                            }
                            let mut diagnostic = Diagnostic::new(
                                DiagnosticCode::UnresolvedContractRef,
                                format!(
                                    "node '{}' scenario '{}' references unknown node '@{}'",
                                    node.id, scenario.name, target
                                ),
                            )
                            .with_related(node.id.clone())
                            .with_context(step.clone());
                            if let Some(suggestion) = ctx.suggester.best(target, &candidates) {
                                diagnostic = diagnostic.with_suggestion(suggestion);
                            }
                            out.add(ctx.located(diagnostic, &node.id, &path));
                        }
                    }
                }
            }
        }
    }
}

//! Constraint validator
//!
//! Evaluates each node's declared boolean expressions with the sandboxed CEL
//! interpreter. The expression sees only that node's own scalar and list
//! fields, read-only. A false result is a violation carrying the author's
//! message; a compile or evaluation failure is a separately coded
//! diagnostic, never an abort.

use cel_interpreter::{Context, Program, Value};

use crate::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticCollector};
use crate::graph::NodeGraph;
use crate::node::Node;
use crate::validate::{ValidationContext, Validator};

pub struct ConstraintValidator;

impl Validator for ConstraintValidator {
    fn name(&self) -> &'static str {
        "constraint"
    }

    fn validate(
        &self,
        graph: &NodeGraph,
        ctx: &ValidationContext<'_>,
        out: &mut DiagnosticCollector,
    ) {
        for node in graph.iter() {
            for (i, constraint) in node.constraints.iter().enumerate() {
                if let Some(scope) = &constraint.scope {
                    if scope != &node.kind {
                        continue;
                    }
                }

                let path = format!("constraints[{}].expression", i);

                let program = match Program::compile(&constraint.expression) {
                    Ok(program) => program,
                    Err(err) => {
                        out.add(ctx.located(
                            Diagnostic::new(
                                DiagnosticCode::ConstraintInvalid,
                                format!(
                                    "constraint on node '{}' failed to compile: {}",
                                    node.id, constraint.expression
                                ),
                            )
                            .with_detail(err.to_string())
                            .with_related(node.id.clone()),
                            &node.id,
                            &path,
                        ));
                        continue;
                    }
                };

                let context = node_context(node);
                match program.execute(&context) {
                    Ok(Value::Bool(true)) => {}
                    Ok(Value::Bool(false)) => {
                        let message = if constraint.message.is_empty() {
                            format!("expression '{}' is false", constraint.expression)
                        } else {
                            constraint.message.clone()
                        };
                        out.add(ctx.located(
                            Diagnostic::new(
                                DiagnosticCode::ConstraintViolated,
                                format!("constraint violated on node '{}': {}", node.id, message),
                            )
                            .with_detail(constraint.expression.clone())
                            .with_related(node.id.clone()),
                            &node.id,
                            &path,
                        ));
                    }
                    Ok(other) => {
                        out.add(ctx.located(
                            Diagnostic::new(
                                DiagnosticCode::ConstraintInvalid,
                                format!(
                                    "constraint on node '{}' did not evaluate to a boolean",
                                    node.id
                                ),
                            )
                            .with_detail(format!("{} => {:?}", constraint.expression, other))
                            .with_related(node.id.clone()),
                            &node.id,
                            &path,
                        ));
                    }
                    Err(err) => {
                        out.add(ctx.located(
                            Diagnostic::new(
                                DiagnosticCode::ConstraintInvalid,
                                format!(
                                    "constraint on node '{}' failed to evaluate: {}",
                                    node.id, constraint.expression
                                ),
                            )
                            .with_detail(err.to_string())
                            .with_related(node.id.clone()),
                            &node.id,
                            &path,
                        ));
                    }
                }
            }
        }
    }
}

/// Expose the node's own scalar and list fields as read-only variables
fn node_context(node: &Node) -> Context {
    let mut context = Context::default();

    context.add_variable("id", Value::String(node.id.clone().into()));
    context.add_variable("kind", Value::String(node.kind.clone().into()));
    context.add_variable("version", Value::Int(node.version as i32));
    context.add_variable("title", Value::String(node.title.clone().into()));
    if let Some(status) = node.status {
        context.add_variable("status", Value::String(status.as_str().to_string().into()));
    }

    context.add_variable("tags", string_list(&node.tags));
    context.add_variable("uses", string_list(&node.refs.uses));
    context.add_variable("related", string_list(&node.refs.related));
    context.add_variable("events", string_list(&node.events));
    context.add_variable("terms", string_list(&node.terms));

    for (key, value) in &node.custom {
        if let Some(cel_value) = json_to_cel(value) {
            context.add_variable(key.clone(), cel_value);
        }
    }

    context
}

fn string_list(items: &[String]) -> Value {
    let values: Vec<Value> = items
        .iter()
        .map(|s| Value::String(s.clone().into()))
        .collect();
    Value::List(values.into())
}

/// Scalars and lists of scalars cross into CEL; nested structures do not
fn json_to_cel(value: &serde_json::Value) -> Option<Value> {
    match value {
        serde_json::Value::String(s) => Some(Value::String(s.clone().into())),
        serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Value::Int(i as i32))
            } else {
                n.as_f64().map(Value::Float)
            }
        }
        serde_json::Value::Array(items) => {
            let converted: Option<Vec<Value>> = items.iter().map(json_to_cel).collect();
            converted.map(|values| Value::List(values.into()))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use crate::node::Constraint;

    fn run(graph: &NodeGraph) -> DiagnosticCollector {
        let config = ProjectConfig::default();
        let ctx = ValidationContext::new(&config);
        let mut out = DiagnosticCollector::new();
        ConstraintValidator.validate(graph, &ctx, &mut out);
        out
    }

    fn node_with_constraint(expression: &str, message: &str) -> Node {
        let mut node = Node::new("a", "component", "A");
        node.tags = vec!["storage".to_string()];
        node.constraints.push(Constraint {
            expression: expression.to_string(),
            message: message.to_string(),
            scope: None,
        });
        node
    }

    #[test]
    fn test_passing_constraint_is_silent() {
        let mut graph = NodeGraph::new();
        graph
            .add(node_with_constraint("version >= 1 && kind == 'component'", ""))
            .unwrap();
        assert!(run(&graph).is_empty());
    }

    #[test]
    fn test_false_constraint_carries_author_message() {
        let mut graph = NodeGraph::new();
        graph
            .add(node_with_constraint(
                "version >= 5",
                "nodes must be mature before approval",
            ))
            .unwrap();

        let out = run(&graph);
        assert_eq!(out.len(), 1);
        let diagnostic = out.iter().next().unwrap();
        assert_eq!(diagnostic.code, DiagnosticCode::ConstraintViolated);
        assert!(diagnostic.summary.contains("nodes must be mature"));
    }

    #[test]
    fn test_compile_failure_is_distinct_and_non_fatal() {
        let mut graph = NodeGraph::new();
        let mut node = node_with_constraint("version >=", "broken");
        node.constraints.push(Constraint {
            expression: "version >= 1".to_string(),
            message: String::new(),
            scope: None,
        });
        graph.add(node).unwrap();

        let out = run(&graph);
        // The malformed expression is reported and the healthy one still ran.
        assert_eq!(out.len(), 1);
        assert_eq!(out.iter().next().unwrap().code, DiagnosticCode::ConstraintInvalid);
    }

    #[test]
    fn test_non_boolean_result_is_invalid() {
        let mut graph = NodeGraph::new();
        graph.add(node_with_constraint("version + 1", "")).unwrap();

        let out = run(&graph);
        assert_eq!(out.len(), 1);
        assert_eq!(out.iter().next().unwrap().code, DiagnosticCode::ConstraintInvalid);
    }

    #[test]
    fn test_scope_filters_by_kind() {
        let mut graph = NodeGraph::new();
        let mut node = Node::new("a", "component", "A");
        node.constraints.push(Constraint {
            expression: "false".to_string(),
            message: "never evaluated here".to_string(),
            scope: Some("decision".to_string()),
        });
        graph.add(node).unwrap();
        assert!(run(&graph).is_empty());
    }

    #[test]
    fn test_list_fields_are_visible() {
        let mut graph = NodeGraph::new();
        graph
            .add(node_with_constraint("size(tags) == 1", ""))
            .unwrap();
        assert!(run(&graph).is_empty());
    }

    #[test]
    fn test_custom_scalar_fields_are_visible() {
        let mut graph = NodeGraph::new();
        let mut node = node_with_constraint("owner == 'alice'", "owner mismatch");
        node.custom.insert("owner".to_string(), serde_json::json!("alice"));
        graph.add(node).unwrap();
        assert!(run(&graph).is_empty());
    }
}

//! Validation orchestrator over a seeded graph
//!
//! Runs the full validator set against documents with defects spanning every
//! category and checks the collected diagnostics: codes, suggestions,
//! dedup, and presentation order with real source positions.

use docgraph::config::{CrossRefRule, KindRule, ProjectConfig};
use docgraph::node::{Block, Constraint, Contract, Node, Scenario, Section};
use docgraph::store::{FsNodeStore, NodeStore};
use docgraph::validate::{ValidationContext, ValidationRunner};
use docgraph::{DiagnosticCode, NodeGraph};

use tempfile::tempdir;

fn seeded_graph() -> NodeGraph {
    let mut graph = NodeGraph::new();

    // Healthy node, referenced by others.
    graph
        .add(Node::new("arch/storage", "component", "Storage"))
        .unwrap();

    // Unresolved use with a near miss, plus a failing constraint.
    let mut broken_refs = Node::new("arch/api", "component", "API").with_uses(&["arch/storag"]);
    broken_refs.constraints.push(Constraint {
        expression: "version >= 3".to_string(),
        message: "approved nodes need review cycles".to_string(),
        scope: None,
    });
    graph.add(broken_refs).unwrap();

    // Block and contract defects.
    let mut messy = Node::new("arch/events", "decision", "Events");
    messy.content.push(Section {
        title: "Blocks".to_string(),
        blocks: vec![
            Block::new("tabel"),
            Block::new("event-flow").with_field("event", serde_json::json!("user-create")),
            Block::new("event-def").with_field("name", serde_json::json!("user-created")),
        ],
    });
    messy.contracts.push(Contract {
        name: "delivery".to_string(),
        scenarios: vec![Scenario {
            name: "fanout".to_string(),
            given: vec!["an event from @arch/storag".to_string()],
            when: vec![],
            then: vec!["subscribers see it".to_string()],
        }],
    });
    graph.add(messy).unwrap();

    graph
}

fn rules() -> ProjectConfig {
    let mut config = ProjectConfig::default();
    config.kinds.insert(
        "decision".to_string(),
        KindRule {
            required_fields: vec!["owner".to_string()],
        },
    );
    config.cross_references.push(CrossRefRule {
        source_type: "event-flow".to_string(),
        source_field: "event".to_string(),
        target_type: "event-def".to_string(),
        target_field: "name".to_string(),
    });
    config
}

#[test]
fn full_set_surfaces_every_category() {
    let graph = seeded_graph();
    let config = rules();
    let ctx = ValidationContext::new(&config);
    let collector = ValidationRunner::full_set().run(&graph, &ctx);

    let codes: Vec<DiagnosticCode> = collector.iter().map(|d| d.code).collect();
    assert!(codes.contains(&DiagnosticCode::UnresolvedUse));
    assert!(codes.contains(&DiagnosticCode::ConstraintViolated));
    assert!(codes.contains(&DiagnosticCode::UnknownBlockType));
    assert!(codes.contains(&DiagnosticCode::UnresolvedContractRef));
    assert!(codes.contains(&DiagnosticCode::CrossRefUnmatched));
    assert!(codes.contains(&DiagnosticCode::MissingRequiredField));

    // Typo suggestions rode along on the reference-style diagnostics.
    let use_diag = collector
        .iter()
        .find(|d| d.code == DiagnosticCode::UnresolvedUse)
        .unwrap();
    assert_eq!(use_diag.suggestion.as_deref(), Some("arch/storage"));

    let block_diag = collector
        .iter()
        .find(|d| d.code == DiagnosticCode::UnknownBlockType)
        .unwrap();
    assert_eq!(block_diag.suggestion.as_deref(), Some("table"));
}

#[test]
fn default_set_skips_composable_validators() {
    let graph = seeded_graph();
    let config = rules();
    let ctx = ValidationContext::new(&config);
    let collector = ValidationRunner::default_set().run(&graph, &ctx);

    let codes: Vec<DiagnosticCode> = collector.iter().map(|d| d.code).collect();
    assert!(codes.contains(&DiagnosticCode::UnresolvedUse));
    assert!(!codes.contains(&DiagnosticCode::UnknownBlockType));
    assert!(!codes.contains(&DiagnosticCode::CrossRefUnmatched));
}

#[test]
fn repeated_runs_deduplicate_but_count_volume() {
    let graph = seeded_graph();
    let config = rules();
    let ctx = ValidationContext::new(&config);
    let runner = ValidationRunner::default_set();

    let mut collector = runner.run(&graph, &ctx);
    let stored = collector.len();
    let seen = collector.seen();

    // Same validators again into the same collector: nothing new stored.
    runner.run_into(&graph, &ctx, &mut collector);
    assert_eq!(collector.len(), stored);
    assert_eq!(collector.seen(), seen * 2);
}

#[test]
fn located_diagnostics_sort_by_position() {
    let dir = tempdir().unwrap();
    let store = FsNodeStore::new(dir.path().join("nodes"));
    for node in seeded_graph().iter() {
        store.save(node).unwrap();
    }

    let loaded = store.load_all().unwrap();
    let graph = NodeGraph::from_nodes(loaded).unwrap();

    let config = rules();
    let mut ctx = ValidationContext::new(&config);
    for id in ["arch/storage", "arch/api", "arch/events"] {
        if let Some(index) = store.document_index(id) {
            ctx = ctx.with_index(id, index);
        }
    }

    let collector = ValidationRunner::full_set().run(&graph, &ctx);
    let sorted = collector.into_sorted();

    // Located diagnostics lead, ordered by (file, line, column); the
    // locationless tail keeps insertion order.
    let first_unlocated = sorted.iter().position(|d| d.location.is_none());
    if let Some(boundary) = first_unlocated {
        assert!(sorted[boundary..].iter().all(|d| d.location.is_none()));
        let located: Vec<_> = sorted[..boundary]
            .iter()
            .map(|d| {
                let loc = d.location.as_ref().unwrap();
                (loc.file.clone(), loc.line, loc.column)
            })
            .collect();
        let mut expected = located.clone();
        expected.sort();
        assert_eq!(located, expected);
        assert!(boundary > 0, "expected at least one located diagnostic");
    }
}

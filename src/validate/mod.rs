//! Validation orchestrator
//!
//! Validators are independent and composable; each walks the graph and emits
//! diagnostics into the shared collector, accumulating every detectable
//! issue rather than stopping at the first. The default set runs the schema,
//! reference, and constraint validators; block, contract, cross-reference,
//! and graph validators compose in on demand.

pub mod block;
pub mod constraint;
pub mod contract;
pub mod crossref;
pub mod graph;
pub mod reference;
pub mod schema;

pub use block::BlockValidator;
pub use constraint::ConstraintValidator;
pub use contract::ContractValidator;
pub use crossref::CrossRefValidator;
pub use graph::GraphValidator;
pub use reference::ReferenceValidator;
pub use schema::SchemaValidator;

use std::collections::HashMap;

use crate::config::ProjectConfig;
use crate::diagnostics::{Diagnostic, DiagnosticCollector, DocumentIndex, SourceLocation, Suggester};
use crate::graph::NodeGraph;
use crate::node::NodeId;

/// Shared read-only state for one validation run
pub struct ValidationContext<'a> {
    pub config: &'a ProjectConfig,
    pub suggester: Suggester,
    indexes: HashMap<NodeId, DocumentIndex>,
}

impl<'a> ValidationContext<'a> {
    pub fn new(config: &'a ProjectConfig) -> Self {
        Self {
            config,
            suggester: Suggester::default(),
            indexes: HashMap::new(),
        }
    }

    pub fn with_suggester(mut self, suggester: Suggester) -> Self {
        self.suggester = suggester;
        self
    }

    /// Attach a position index for one node's source document
    pub fn with_index(mut self, node_id: impl Into<NodeId>, index: DocumentIndex) -> Self {
        self.indexes.insert(node_id.into(), index);
        self
    }

    /// Resolve a field path within a node's source document
    ///
    /// `None` when no index is attached or the path does not resolve; the
    /// diagnostic then renders without a location.
    pub fn locate(&self, node_id: &str, path: &str) -> Option<SourceLocation> {
        let location = self.indexes.get(node_id)?.resolve(path);
        if location.is_zero() {
            None
        } else {
            Some(location)
        }
    }

    /// Attach a location to a diagnostic when one resolves
    pub fn located(&self, diagnostic: Diagnostic, node_id: &str, path: &str) -> Diagnostic {
        match self.locate(node_id, path) {
            Some(location) => diagnostic.at(location),
            None => diagnostic,
        }
    }
}

/// One composable validation pass
pub trait Validator {
    fn name(&self) -> &'static str;

    fn validate(
        &self,
        graph: &NodeGraph,
        ctx: &ValidationContext<'_>,
        out: &mut DiagnosticCollector,
    );
}

/// Runs a set of validators against the graph
pub struct ValidationRunner {
    validators: Vec<Box<dyn Validator>>,
}

impl ValidationRunner {
    /// No validators; compose with [`ValidationRunner::with`]
    pub fn empty() -> Self {
        Self {
            validators: Vec::new(),
        }
    }

    /// The default orchestrator: schema, reference, constraint
    pub fn default_set() -> Self {
        Self::empty()
            .with(SchemaValidator)
            .with(ReferenceValidator)
            .with(ConstraintValidator)
    }

    /// Every validator in the crate
    pub fn full_set() -> Self {
        Self::default_set()
            .with(BlockValidator)
            .with(ContractValidator)
            .with(CrossRefValidator)
            .with(GraphValidator)
    }

    pub fn with(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.validators.iter().map(|v| v.name()).collect()
    }

    /// Run all validators, collecting into a fresh collector
    pub fn run(&self, graph: &NodeGraph, ctx: &ValidationContext<'_>) -> DiagnosticCollector {
        let mut collector = DiagnosticCollector::new();
        self.run_into(graph, ctx, &mut collector);
        collector
    }

    /// Run all validators into an existing collector
    pub fn run_into(
        &self,
        graph: &NodeGraph,
        ctx: &ValidationContext<'_>,
        out: &mut DiagnosticCollector,
    ) {
        for validator in &self.validators {
            tracing::debug!(validator = validator.name(), "running validator");
            validator.validate(graph, ctx, out);
        }
    }
}

impl Default for ValidationRunner {
    fn default() -> Self {
        Self::default_set()
    }
}

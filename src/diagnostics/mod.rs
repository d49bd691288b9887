//! Diagnostics
//!
//! Structured, coded error records shared by every validator and the
//! migration engine. The collector deduplicates, optionally caps, and sorts
//! diagnostics for stable presentation; a run accumulates every detectable
//! issue instead of stopping at the first.

pub mod location;
pub mod suggest;

pub use location::{DocumentIndex, SourceLocation};
pub use suggest::Suggester;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::node::NodeId;

// =============================================================================
// Diagnostic Codes
// =============================================================================

/// Category a diagnostic code belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Schema,
    Reference,
    Validation,
    Io,
    Graph,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema => write!(f, "schema"),
            Self::Reference => write!(f, "reference"),
            Self::Validation => write!(f, "validation"),
            Self::Io => write!(f, "io"),
            Self::Graph => write!(f, "graph"),
        }
    }
}

/// Stable, range-grouped diagnostic code
///
/// S1xx schema, R2xx reference, V3xx validation, IO4xx store, G5xx graph.
/// Codes are part of the public contract; never renumber an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // === Schema ===
    /// Node has no id
    MissingId,
    /// Node has no kind
    MissingKind,
    /// Node version is zero or absent
    MissingVersion,
    /// Node has no status
    MissingStatus,
    /// Node has no title
    MissingTitle,
    /// A field required for this kind by configuration is absent
    MissingRequiredField,

    // === Reference ===
    /// `uses` target does not resolve to an existing node
    UnresolvedUse,
    /// `related` target does not resolve to an existing node
    UnresolvedRelated,
    /// `@id` reference inside contract step text does not resolve
    UnresolvedContractRef,
    /// Field value not found in the referenced (block type, field) domain
    CrossRefUnmatched,

    // === Validation ===
    /// Constraint expression evaluated to false
    ConstraintViolated,
    /// Constraint expression failed to compile or evaluate
    ConstraintInvalid,
    /// Block type is not in the known set
    UnknownBlockType,
    /// Required block field is absent
    MissingBlockField,
    /// Table column declaration has no `key`
    TableColumnMissingKey,
    /// Scenario has an empty name
    EmptyScenarioName,
    /// Scenario name repeats within the same contract
    DuplicateScenarioName,
    /// Scenario declares no steps
    EmptyScenario,
    /// A declared step has empty text
    EmptyStepText,

    // === IO ===
    /// A stored document could not be read or parsed
    StoreReadFailed,
    /// An audit record could not be appended
    AuditAppendFailed,

    // === Graph ===
    /// `uses` edges form a dependency cycle
    DependencyCycle,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingId => "S100",
            Self::MissingKind => "S101",
            Self::MissingVersion => "S102",
            Self::MissingStatus => "S103",
            Self::MissingTitle => "S104",
            Self::MissingRequiredField => "S110",

            Self::UnresolvedUse => "R200",
            Self::UnresolvedRelated => "R201",
            Self::UnresolvedContractRef => "R210",
            Self::CrossRefUnmatched => "R220",

            Self::ConstraintViolated => "V300",
            Self::ConstraintInvalid => "V301",
            Self::UnknownBlockType => "V310",
            Self::MissingBlockField => "V311",
            Self::TableColumnMissingKey => "V312",
            Self::EmptyScenarioName => "V320",
            Self::DuplicateScenarioName => "V321",
            Self::EmptyScenario => "V322",
            Self::EmptyStepText => "V323",

            Self::StoreReadFailed => "IO400",
            Self::AuditAppendFailed => "IO410",

            Self::DependencyCycle => "G500",
        }
    }

    pub fn category(&self) -> Category {
        match self.as_str().as_bytes()[0] {
            b'S' => Category::Schema,
            b'R' => Category::Reference,
            b'V' => Category::Validation,
            b'I' => Category::Io,
            _ => Category::Graph,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Diagnostic
// =============================================================================

/// A single structured diagnostic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable code
    pub code: DiagnosticCode,
    /// One-line statement of the problem
    pub summary: String,
    /// Longer explanation, may be empty
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail: String,
    /// Where in a source document the problem is, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    /// Additional context lines
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
    /// "did you mean" text, when a close candidate exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Nodes involved in the problem
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<NodeId>,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, summary: impl Into<String>) -> Self {
        Self {
            code,
            summary: summary.into(),
            detail: String::new(),
            location: None,
            context: Vec::new(),
            suggestion: None,
            related: Vec::new(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_related(mut self, node_id: impl Into<NodeId>) -> Self {
        self.related.push(node_id.into());
        self
    }

    /// Deduplication key: code + position when located, code + summary otherwise
    fn dedup_key(&self) -> String {
        match &self.location {
            Some(loc) if loc.column > 0 => {
                format!("{}|{}|{}|{}", self.code, loc.file, loc.line, loc.column)
            }
            Some(loc) => format!("{}|{}|{}", self.code, loc.file, loc.line),
            None => format!("{}|{}", self.code, self.summary),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.summary)?;
        if let Some(loc) = &self.location {
            write!(f, " ({})", loc)?;
        }
        if let Some(s) = &self.suggestion {
            write!(f, " (did you mean '{}'?)", s)?;
        }
        for ctx in &self.context {
            write!(f, "\n  - {}", ctx)?;
        }
        Ok(())
    }
}

// =============================================================================
// Collector
// =============================================================================

/// Accumulates diagnostics across validators and engine runs
///
/// Duplicates (same dedup key) are dropped from storage while `seen` keeps
/// counting true volume; an optional cap bounds stored items and raises the
/// `truncated` flag.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    items: Vec<Diagnostic>,
    keys: HashSet<String>,
    seen: usize,
    cap: Option<usize>,
    truncated: bool,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collector that stores at most `cap` diagnostics
    pub fn with_cap(cap: usize) -> Self {
        Self {
            cap: Some(cap),
            ..Self::default()
        }
    }

    /// Add a diagnostic; returns whether it was stored
    pub fn add(&mut self, diagnostic: Diagnostic) -> bool {
        self.seen += 1;

        let key = diagnostic.dedup_key();
        if self.keys.contains(&key) {
            return false;
        }
        if let Some(cap) = self.cap {
            if self.items.len() >= cap {
                self.truncated = true;
                return false;
            }
        }
        self.keys.insert(key);
        self.items.push(diagnostic);
        true
    }

    /// Total adds observed, including duplicates and capped drops
    pub fn seen(&self) -> usize {
        self.seen
    }

    /// Whether the cap dropped any diagnostics
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Diagnostics in presentation order
    ///
    /// Located diagnostics sort by (file, line, column) ascending; locationless
    /// ones follow, keeping their relative insertion order.
    pub fn sorted(&self) -> Vec<&Diagnostic> {
        let mut out: Vec<&Diagnostic> = self.items.iter().collect();
        out.sort_by(|a, b| match (&a.location, &b.location) {
            (Some(la), Some(lb)) => la
                .file
                .cmp(&lb.file)
                .then(la.line.cmp(&lb.line))
                .then(la.column.cmp(&lb.column)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        out
    }

    /// Consume the collector, yielding diagnostics in presentation order
    pub fn into_sorted(self) -> Vec<Diagnostic> {
        let mut out = self.items;
        out.sort_by(|a, b| match (&a.location, &b.location) {
            (Some(la), Some(lb)) => la
                .file
                .cmp(&lb.file)
                .then(la.line.cmp(&lb.line))
                .then(la.column.cmp(&lb.column)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        out
    }

    /// Stored diagnostics in a given category
    pub fn in_category(&self, category: Category) -> Vec<&Diagnostic> {
        self.items
            .iter()
            .filter(|d| d.code.category() == category)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(code: DiagnosticCode, file: &str, line: u32) -> Diagnostic {
        Diagnostic::new(code, "x").at(SourceLocation::new(file, line, 1))
    }

    #[test]
    fn test_code_categories() {
        assert_eq!(DiagnosticCode::MissingTitle.category(), Category::Schema);
        assert_eq!(DiagnosticCode::UnresolvedUse.category(), Category::Reference);
        assert_eq!(DiagnosticCode::ConstraintViolated.category(), Category::Validation);
        assert_eq!(DiagnosticCode::AuditAppendFailed.category(), Category::Io);
        assert_eq!(DiagnosticCode::DependencyCycle.category(), Category::Graph);
    }

    #[test]
    fn test_dedup_same_code_same_location() {
        let mut collector = DiagnosticCollector::new();
        assert!(collector.add(at(DiagnosticCode::MissingTitle, "a.yaml", 3)));
        assert!(!collector.add(at(DiagnosticCode::MissingTitle, "a.yaml", 3)));
        assert_eq!(collector.len(), 1);
        assert_eq!(collector.seen(), 2);
    }

    #[test]
    fn test_no_dedup_for_different_codes_at_same_location() {
        let mut collector = DiagnosticCollector::new();
        collector.add(at(DiagnosticCode::MissingTitle, "a.yaml", 3));
        collector.add(at(DiagnosticCode::MissingKind, "a.yaml", 3));
        assert_eq!(collector.len(), 2);
    }

    #[test]
    fn test_dedup_locationless_by_summary() {
        let mut collector = DiagnosticCollector::new();
        collector.add(Diagnostic::new(DiagnosticCode::MissingTitle, "node a has no title"));
        collector.add(Diagnostic::new(DiagnosticCode::MissingTitle, "node a has no title"));
        collector.add(Diagnostic::new(DiagnosticCode::MissingTitle, "node b has no title"));
        assert_eq!(collector.len(), 2);
        assert_eq!(collector.seen(), 3);
    }

    #[test]
    fn test_retrieval_order() {
        let mut collector = DiagnosticCollector::new();
        collector.add(at(DiagnosticCode::MissingTitle, "b.yaml", 20));
        collector.add(at(DiagnosticCode::MissingTitle, "a.yaml", 30));
        collector.add(at(DiagnosticCode::MissingTitle, "b.yaml", 10));
        collector.add(at(DiagnosticCode::MissingTitle, "a.yaml", 5));

        let order: Vec<(String, u32)> = collector
            .sorted()
            .iter()
            .map(|d| {
                let loc = d.location.as_ref().unwrap();
                (loc.file.clone(), loc.line)
            })
            .collect();
        assert_eq!(
            order,
            vec![
                ("a.yaml".to_string(), 5),
                ("a.yaml".to_string(), 30),
                ("b.yaml".to_string(), 10),
                ("b.yaml".to_string(), 20),
            ]
        );
    }

    #[test]
    fn test_locationless_sort_after_located_in_insertion_order() {
        let mut collector = DiagnosticCollector::new();
        collector.add(Diagnostic::new(DiagnosticCode::ConstraintViolated, "first"));
        collector.add(at(DiagnosticCode::MissingTitle, "z.yaml", 1));
        collector.add(Diagnostic::new(DiagnosticCode::ConstraintViolated, "second"));

        let sorted = collector.sorted();
        assert!(sorted[0].location.is_some());
        assert_eq!(sorted[1].summary, "first");
        assert_eq!(sorted[2].summary, "second");
    }

    #[test]
    fn test_cap_sets_truncated_but_counts_seen() {
        let mut collector = DiagnosticCollector::with_cap(2);
        collector.add(at(DiagnosticCode::MissingTitle, "a.yaml", 1));
        collector.add(at(DiagnosticCode::MissingTitle, "a.yaml", 2));
        collector.add(at(DiagnosticCode::MissingTitle, "a.yaml", 3));
        assert_eq!(collector.len(), 2);
        assert!(collector.truncated());
        assert_eq!(collector.seen(), 3);
    }
}

//! Diagnostic construction seam
//!
//! The validator never formats messages. It hands the raw facts of each
//! finding to a [`DiagnosticFactory`] and forwards whatever comes back to
//! the caller's acceptor.

use serde::{Deserialize, Serialize};

use crate::bounds::Count;
use crate::model::{ConstraintTree, NodeId};
use crate::object::SemanticObject;

/// A field whose observed count lies outside the summed node bounds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundsViolation {
    pub field: String,
    pub actual: usize,
    pub min: Count,
    pub max: Count,
    /// Assignment nodes whose quantities shaped the bounds
    pub involved: Vec<NodeId>,
    /// Nearest node containing every involved node
    pub scope: NodeId,
}

/// Builds caller-defined diagnostics for each finding
pub trait DiagnosticFactory<O: ?Sized> {
    type Diagnostic;

    /// No alternative path through `rule` accepts the object's type
    fn object_shape(
        &self,
        rule: &ConstraintTree,
        obj: &O,
        unfulfilled: &[NodeId],
    ) -> Self::Diagnostic;

    /// `node` assigns a field the object's type does not declare
    fn feature_missing(&self, rule: &ConstraintTree, obj: &O, node: NodeId) -> Self::Diagnostic;

    /// The object has values on `field` but `rule` never assigns it
    fn assignment_missing(&self, rule: &ConstraintTree, obj: &O, field: &str) -> Self::Diagnostic;

    fn feature_bounds(
        &self,
        rule: &ConstraintTree,
        obj: &O,
        violation: &BoundsViolation,
    ) -> Self::Diagnostic;
}

/// Stable classification of a [`SyntaxDiagnostic`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    ObjectShape,
    FeatureMissing,
    AssignmentMissing,
    FeatureBounds,
}

impl DiagnosticKind {
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticKind::ObjectShape => "DIAG_OBJECT_SHAPE",
            DiagnosticKind::FeatureMissing => "DIAG_FEATURE_MISSING",
            DiagnosticKind::AssignmentMissing => "DIAG_ASSIGNMENT_MISSING",
            DiagnosticKind::FeatureBounds => "DIAG_FEATURE_BOUNDS",
        }
    }
}

/// Plain data diagnostic produced by [`SyntaxDiagnosticFactory`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxDiagnostic {
    pub kind: DiagnosticKind,
    pub rule: String,
    pub object_type: String,
    pub field: Option<String>,
    pub actual: Option<usize>,
    pub min: Option<Count>,
    pub max: Option<Count>,
    /// Offending or involved constraint nodes
    pub nodes: Vec<NodeId>,
    pub scope: Option<NodeId>,
    /// Grammar excerpt the finding refers to
    pub constraint: String,
}

impl SyntaxDiagnostic {
    fn new(kind: DiagnosticKind, rule: &ConstraintTree, object_type: &str) -> Self {
        Self {
            kind,
            rule: rule.name().to_string(),
            object_type: object_type.to_string(),
            field: None,
            actual: None,
            min: None,
            max: None,
            nodes: Vec::new(),
            scope: None,
            constraint: String::new(),
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

impl std::fmt::Display for SyntaxDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} (rule {})", self.code(), self.object_type, self.rule)?;
        match self.kind {
            DiagnosticKind::ObjectShape => {
                write!(f, ": type does not fit {}", self.constraint)
            }
            DiagnosticKind::FeatureMissing => write!(
                f,
                ": type has no field '{}' assigned by {}",
                self.field.as_deref().unwrap_or("-"),
                self.constraint
            ),
            DiagnosticKind::AssignmentMissing => write!(
                f,
                ": field '{}' is set but never assigned",
                self.field.as_deref().unwrap_or("-")
            ),
            DiagnosticKind::FeatureBounds => write!(
                f,
                ": field '{}' has {} value(s), expected <{},{}> in {}",
                self.field.as_deref().unwrap_or("-"),
                self.actual.unwrap_or(0),
                self.min.unwrap_or(Count::Undefined),
                self.max.unwrap_or(Count::Undefined),
                self.constraint
            ),
        }
    }
}

/// Default factory producing [`SyntaxDiagnostic`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntaxDiagnosticFactory;

impl<O: SemanticObject + ?Sized> DiagnosticFactory<O> for SyntaxDiagnosticFactory {
    type Diagnostic = SyntaxDiagnostic;

    fn object_shape(&self, rule: &ConstraintTree, obj: &O, unfulfilled: &[NodeId]) -> SyntaxDiagnostic {
        let mut d = SyntaxDiagnostic::new(DiagnosticKind::ObjectShape, rule, obj.type_name());
        d.nodes = unfulfilled.to_vec();
        d.scope = Some(rule.root());
        d.constraint = rule.render(rule.root(), &Default::default());
        d
    }

    fn feature_missing(&self, rule: &ConstraintTree, obj: &O, node: NodeId) -> SyntaxDiagnostic {
        let mut d = SyntaxDiagnostic::new(DiagnosticKind::FeatureMissing, rule, obj.type_name());
        d.field = rule.node(node).target_field().map(str::to_string);
        d.nodes = vec![node];
        d.constraint = rule.render(node, &Default::default());
        d
    }

    fn assignment_missing(&self, rule: &ConstraintTree, obj: &O, field: &str) -> SyntaxDiagnostic {
        let mut d = SyntaxDiagnostic::new(DiagnosticKind::AssignmentMissing, rule, obj.type_name());
        d.field = Some(field.to_string());
        d.actual = Some(obj.value_count(field));
        d
    }

    fn feature_bounds(
        &self,
        rule: &ConstraintTree,
        obj: &O,
        violation: &BoundsViolation,
    ) -> SyntaxDiagnostic {
        let mut d = SyntaxDiagnostic::new(DiagnosticKind::FeatureBounds, rule, obj.type_name());
        d.field = Some(violation.field.clone());
        d.actual = Some(violation.actual);
        d.min = Some(violation.min);
        d.max = Some(violation.max);
        d.nodes = violation.involved.clone();
        d.scope = Some(violation.scope);
        d.constraint = rule.render(violation.scope, &Default::default());
        d
    }
}

//! csval core - concrete syntax cardinality validation
//!
//! Decides whether a semantic object could have been produced by one of the
//! grammar rules registered for its type, judging only how many values each
//! field carries:
//! - Constraint trees describing rule shapes (groups, alternatives,
//!   assignments, type-guarded actions)
//! - Bounds computation for every assignment given its surroundings
//! - Heuristic distribution of a field's count over competing assignments
//! - Diagnostics through a caller-supplied factory and acceptor

pub mod bounds;
pub mod config;
pub mod diagnostics;
pub mod distributor;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod object;
pub mod quantities;
pub mod registry;
pub mod validator;

// Re-export commonly used types
pub use bounds::{Bounds, BoundsCalculator, Count};
pub use config::HeuristicConfig;
pub use csval_core_types::ValidationContext;
pub use diagnostics::{DiagnosticFactory, DiagnosticKind, SyntaxDiagnostic, SyntaxDiagnosticFactory};
pub use errors::{CsvalError, ExError, ExErrorKind, Result};
pub use model::{ConstraintTree, NodeId, NodeKind, NodeSpec};
pub use object::{DynObject, FeatureInfo, SemanticObject, Value};
pub use registry::{RuleProvider, RuleRegistry};
pub use validator::Validator;

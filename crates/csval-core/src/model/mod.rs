//! Constraint tree model
//!
//! A [`ConstraintTree`] is the shape of one grammar rule: groups,
//! alternatives, assignments and type-guarded actions, each carrying
//! optional/repeatable cardinality. Trees are built once and only read
//! afterwards.

pub mod node;
pub mod tree;

pub use node::{ConstraintNode, NodeId, NodeKind, NodeSpec};
pub use tree::{ConstraintTree, TreeBuilder};

//! Rule provider seam and an in-memory registry

use std::collections::HashMap;
use std::sync::Arc;

use crate::model::ConstraintTree;

/// Supplies the candidate grammar rules for an object type
pub trait RuleProvider {
    /// Candidate rules in the order they should be tried; empty when the
    /// type has no concrete syntax
    fn rules_for(&self, object_type: &str) -> &[Arc<ConstraintTree>];
}

impl<P: RuleProvider + ?Sized> RuleProvider for &P {
    fn rules_for(&self, object_type: &str) -> &[Arc<ConstraintTree>] {
        (**self).rules_for(object_type)
    }
}

/// Registration-ordered rule lookup keyed by object type
///
/// # Example
///
/// ```
/// use csval_core::model::{ConstraintTree, NodeSpec};
/// use csval_core::registry::{RuleProvider, RuleRegistry};
///
/// let mut b = ConstraintTree::builder("Entity");
/// b.root(NodeSpec::assignment("name")).unwrap();
///
/// let mut registry = RuleRegistry::new();
/// registry.register("Entity", b.build().unwrap());
/// assert_eq!(registry.rules_for("Entity").len(), 1);
/// assert!(registry.rules_for("Other").is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    rules: HashMap<String, Vec<Arc<ConstraintTree>>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule for one object type, returning the shared handle
    pub fn register(
        &mut self,
        object_type: impl Into<String>,
        tree: ConstraintTree,
    ) -> Arc<ConstraintTree> {
        let tree = Arc::new(tree);
        self.register_shared(object_type, tree.clone());
        tree
    }

    /// Register an already shared rule, e.g. one rule serving several types
    pub fn register_shared(&mut self, object_type: impl Into<String>, tree: Arc<ConstraintTree>) {
        self.rules.entry(object_type.into()).or_default().push(tree);
    }

    /// Number of object types with at least one rule
    pub fn type_count(&self) -> usize {
        self.rules.len()
    }
}

impl RuleProvider for RuleRegistry {
    fn rules_for(&self, object_type: &str) -> &[Arc<ConstraintTree>] {
        self.rules
            .get(object_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeSpec;

    fn rule(name: &str) -> ConstraintTree {
        let mut b = ConstraintTree::builder(name);
        b.root(NodeSpec::assignment("name")).unwrap();
        b.build().unwrap()
    }

    #[test]
    fn test_registration_order_preserved() {
        let mut registry = RuleRegistry::new();
        registry.register("Entity", rule("First"));
        registry.register("Entity", rule("Second"));

        let names: Vec<&str> = registry
            .rules_for("Entity")
            .iter()
            .map(|r| r.name())
            .collect();
        assert_eq!(names, vec!["First", "Second"]);
    }

    #[test]
    fn test_shared_rule_for_several_types() {
        let mut registry = RuleRegistry::new();
        let shared = registry.register("A", rule("Shared"));
        registry.register_shared("B", shared.clone());

        assert_eq!(registry.type_count(), 2);
        assert!(Arc::ptr_eq(&registry.rules_for("B")[0], &shared));
    }
}

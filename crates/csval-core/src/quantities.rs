//! Per-validation quantity bookkeeping

use std::collections::BTreeMap;

use crate::bounds::{Bounds, Count};
use crate::errors::{CsvalError, Result};
use crate::model::{ConstraintTree, NodeId};

/// Observed field counts and the share of each count assigned to the
/// assignment nodes writing that field
///
/// Created fresh for every rule checked by a `validate_object` call and
/// dropped once diagnostics are produced. A node missing from the
/// assignment map is unassigned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuantityState {
    field_counts: BTreeMap<String, usize>,
    assignment_quantities: BTreeMap<NodeId, usize>,
}

impl QuantityState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field_count(&self, field: &str) -> Option<usize> {
        self.field_counts.get(field).copied()
    }

    pub fn set_field_count(&mut self, field: impl Into<String>, count: usize) {
        self.field_counts.insert(field.into(), count);
    }

    pub fn field_counts(&self) -> &BTreeMap<String, usize> {
        &self.field_counts
    }

    /// Assigned quantity, `None` while unassigned
    pub fn quantity(&self, node: NodeId) -> Option<usize> {
        self.assignment_quantities.get(&node).copied()
    }

    /// Assigned quantity as a [`Count`]; `Undefined` while unassigned
    pub fn assignment_count(&self, node: NodeId) -> Count {
        self.quantity(node).map_or(Count::Undefined, Count::Finite)
    }

    pub fn set_quantity(&mut self, node: NodeId, quantity: usize) {
        self.assignment_quantities.insert(node, quantity);
    }

    pub fn assignments(&self) -> &BTreeMap<NodeId, usize> {
        &self.assignment_quantities
    }

    /// Replace every assignment quantity at once (used to restore a snapshot)
    pub(crate) fn restore_assignments(&mut self, snapshot: BTreeMap<NodeId, usize>) {
        self.assignment_quantities = snapshot;
    }

    /// Assigned nodes grouped by the field they write
    pub fn group_by_field(&self, tree: &ConstraintTree) -> BTreeMap<String, Vec<NodeId>> {
        let mut map: BTreeMap<String, Vec<NodeId>> = BTreeMap::new();
        for node in self.assignment_quantities.keys() {
            if let Some(field) = tree.node(*node).target_field() {
                map.entry(field.to_string()).or_default().push(*node);
            }
        }
        map
    }

    /// Post-solve invariant: per field, assigned quantities add up to the
    /// observed count
    ///
    /// # Errors
    ///
    /// `ConsistencyFault` on the first field whose sum disagrees. This is a
    /// defect in the distribution logic, never a property of the input.
    pub fn consistency_check(&self, tree: &ConstraintTree) -> Result<()> {
        let mut sums: BTreeMap<&str, usize> = BTreeMap::new();
        for (node, quantity) in &self.assignment_quantities {
            if let Some(field) = tree.node(*node).target_field() {
                *sums.entry(field).or_default() += quantity;
            }
        }
        for (field, found) in sums {
            let expected = self.field_count(field).unwrap_or(0);
            if found != expected {
                return Err(CsvalError::ConsistencyFault {
                    rule: tree.name().to_string(),
                    field: field.to_string(),
                    expected,
                    found,
                });
            }
        }
        Ok(())
    }

    /// Render the smallest subtree covering all assigned nodes, annotated
    /// as `field:quantity<min,max>`
    pub fn render(&self, tree: &ConstraintTree, bounds: &BTreeMap<NodeId, Bounds>) -> String {
        if self.assignment_quantities.is_empty() {
            return String::new();
        }
        let mut postfix = BTreeMap::new();
        for (node, quantity) in &self.assignment_quantities {
            let mut s = format!(":{}", quantity);
            if let Some(b) = bounds.get(node) {
                s.push_str(&format!("<{},{}>", b.min, b.max));
            }
            postfix.insert(*node, s);
        }
        let scope = tree.common_container_of(self.assignment_quantities.keys().copied());
        tree.render(scope, &postfix)
    }
}

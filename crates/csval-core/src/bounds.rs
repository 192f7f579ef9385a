//! Cardinality bounds of constraint nodes
//!
//! Every function here is a pure read of the tree, the object type and the
//! current [`QuantityState`]: the same inputs always yield the same counts.
//! The `involved` sets are output parameters collecting the assignment
//! nodes whose quantities were consulted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::model::{ConstraintTree, NodeId, NodeKind};
use crate::quantities::QuantityState;

/// A firing count that may be unknown or unbounded
///
/// Ordering is `Undefined < Finite(_) < Unbounded`, so `max`/`min`
/// comparisons treat an unknown count as "no information".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Count {
    Undefined,
    Finite(usize),
    Unbounded,
}

impl Count {
    pub const ZERO: Count = Count::Finite(0);
    pub const ONE: Count = Count::Finite(1);

    /// Addition where `Undefined` is the identity and `Unbounded` absorbs
    pub fn plus(self, other: Count) -> Count {
        match (self, other) {
            (Count::Undefined, c) | (c, Count::Undefined) => c,
            (Count::Unbounded, _) | (_, Count::Unbounded) => Count::Unbounded,
            (Count::Finite(a), Count::Finite(b)) => Count::Finite(a.saturating_add(b)),
        }
    }

    pub fn is_defined(self) -> bool {
        !matches!(self, Count::Undefined)
    }

    pub fn finite(self) -> Option<usize> {
        match self {
            Count::Finite(n) => Some(n),
            Count::Undefined | Count::Unbounded => None,
        }
    }

    /// Value used as a budget floor: `Undefined` counts as 0
    pub fn floor(self) -> usize {
        match self {
            Count::Undefined => 0,
            Count::Finite(n) => n,
            Count::Unbounded => usize::MAX,
        }
    }
}

impl std::fmt::Display for Count {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Count::Undefined => write!(f, "-"),
            Count::Finite(n) => write!(f, "{}", n),
            Count::Unbounded => write!(f, "*"),
        }
    }
}

/// Admissible `[min, max]` window of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Count,
    pub max: Count,
}

impl Bounds {
    pub fn new(min: Count, max: Count) -> Self {
        Self { min, max }
    }

    /// How far `quantity` falls short of the minimum
    pub fn deficit(&self, quantity: usize) -> usize {
        match self.min {
            Count::Finite(min) if min > quantity => min - quantity,
            _ => 0,
        }
    }

    /// How far `quantity` exceeds the maximum
    pub fn excess(&self, quantity: usize) -> usize {
        match self.max {
            Count::Finite(max) if quantity > max => quantity - max,
            _ => 0,
        }
    }

    /// `max(0, min - q) + max(0, q - max)`
    pub fn violation(&self, quantity: usize) -> usize {
        self.deficit(quantity) + self.excess(quantity)
    }

    pub fn admits(&self, quantity: usize) -> bool {
        self.violation(quantity) == 0
    }
}

impl std::fmt::Display for Bounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{},{}>", self.min, self.max)
    }
}

/// Computes node firing bounds for one rule and one object type
#[derive(Debug, Clone, Copy)]
pub struct BoundsCalculator<'a> {
    tree: &'a ConstraintTree,
    object_type: &'a str,
}

impl<'a> BoundsCalculator<'a> {
    pub fn new(tree: &'a ConstraintTree, object_type: &'a str) -> Self {
        Self { tree, object_type }
    }

    pub fn tree(&self) -> &'a ConstraintTree {
        self.tree
    }

    pub fn object_type(&self) -> &'a str {
        self.object_type
    }

    fn applies(&self, id: NodeId) -> bool {
        self.tree.node(id).applies_to(self.object_type)
    }

    /// Whether `id` can never fire for the object's type: it is guarded
    /// against the type, or one of its mandatory parts is
    fn blocked(&self, id: NodeId) -> bool {
        if !self.applies(id) {
            return true;
        }
        let node = self.tree.node(id);
        let mandatory_blocked = |c: &NodeId| !self.tree.node(*c).is_optional() && self.blocked(*c);
        match node.kind() {
            NodeKind::Group => node.children().iter().any(mandatory_blocked),
            NodeKind::Alternative => {
                !node.children().is_empty() && node.children().iter().all(mandatory_blocked)
            }
            NodeKind::Assignment { .. } | NodeKind::Action => false,
        }
    }

    /// `[min_count, max_count]` with a throwaway involved set
    pub fn bounds(&self, state: &QuantityState, node: NodeId, exclude_field: Option<&str>) -> Bounds {
        let mut involved = BTreeSet::new();
        let min = self.min_count(state, node, &mut involved);
        let max = self.max_count(state, node, &mut involved, exclude_field);
        Bounds::new(min, max)
    }

    /// Fewest times `node` can fire given what its siblings and ancestors
    /// already account for
    pub fn min_count(
        &self,
        state: &QuantityState,
        node: NodeId,
        involved: &mut BTreeSet<NodeId>,
    ) -> Count {
        let n = self.tree.node(node);
        if n.is_optional() {
            return Count::ZERO;
        }
        match n.container() {
            None => Count::ONE,
            Some(parent) => self.min_by_parent(state, parent, node, involved),
        }
    }

    /// Most times `node` can fire
    ///
    /// With `exclude_field` set, an alternative branch that needs a
    /// zero-quantity assignment of some other field is considered dead.
    pub fn max_count(
        &self,
        state: &QuantityState,
        node: NodeId,
        involved: &mut BTreeSet<NodeId>,
        exclude_field: Option<&str>,
    ) -> Count {
        let n = self.tree.node(node);
        let count = match n.container() {
            None => Count::ONE,
            Some(parent) => self.max_by_parent(state, parent, node, exclude_field, involved),
        };
        if n.is_repeatable() && count > Count::ZERO {
            Count::Unbounded
        } else {
            count
        }
    }

    fn min_by_parent(
        &self,
        state: &QuantityState,
        parent: NodeId,
        exclude: NodeId,
        involved: &mut BTreeSet<NodeId>,
    ) -> Count {
        if self.blocked(parent) {
            return Count::ZERO;
        }
        let node = self.tree.node(parent);
        match node.kind() {
            NodeKind::Group => {
                if node.is_root() && !node.is_optional() && !node.is_repeatable() {
                    return Count::ONE;
                }
                // the group fired at least as often as its busiest sibling requires
                let mut count = Count::Undefined;
                for &child in node.children() {
                    if child != exclude {
                        count = count.max(self.min_for_child(state, child, involved));
                    }
                }
                if node.is_optional() {
                    return if count.is_defined() { count } else { Count::ZERO };
                }
                match node.container() {
                    Some(grand) => self.min_by_parent(state, grand, parent, involved).max(count),
                    None => count.max(Count::ONE),
                }
            }
            NodeKind::Alternative => {
                if node.is_optional() {
                    return Count::ZERO;
                }
                for &child in node.children() {
                    if child != exclude && self.min_for_child(state, child, involved) > Count::ZERO {
                        return Count::ZERO;
                    }
                }
                match node.container() {
                    Some(grand) => self.min_by_parent(state, grand, parent, involved),
                    None => Count::ONE,
                }
            }
            NodeKind::Assignment { .. } | NodeKind::Action => Count::Undefined,
        }
    }

    fn min_for_child(
        &self,
        state: &QuantityState,
        child: NodeId,
        involved: &mut BTreeSet<NodeId>,
    ) -> Count {
        if self.blocked(child) {
            return Count::ZERO;
        }
        let node = self.tree.node(child);
        let count = match node.kind() {
            NodeKind::Assignment { .. } => {
                involved.insert(child);
                state.assignment_count(child)
            }
            NodeKind::Group => {
                let mut count = Count::Undefined;
                for &c in node.children() {
                    count = count.max(self.min_for_child(state, c, involved));
                }
                count
            }
            NodeKind::Alternative => {
                let mut count = Count::Undefined;
                for &c in node.children() {
                    count = count.plus(self.min_for_child(state, c, involved));
                }
                count
            }
            NodeKind::Action => return Count::ONE,
        };
        if node.is_repeatable() && count > Count::ONE {
            Count::ONE
        } else {
            count
        }
    }

    fn max_by_parent(
        &self,
        state: &QuantityState,
        ele: NodeId,
        exclude: NodeId,
        exclude_field: Option<&str>,
        involved: &mut BTreeSet<NodeId>,
    ) -> Count {
        if self.blocked(ele) {
            return Count::ZERO;
        }
        let node = self.tree.node(ele);
        let mut max = match node.container() {
            None if node.is_repeatable() => Count::Unbounded,
            None => Count::ONE,
            Some(parent) => self.max_by_parent(state, parent, ele, exclude_field, involved),
        };
        if max == Count::ZERO {
            return Count::ZERO;
        }
        match node.kind() {
            NodeKind::Group => {
                if node.is_repeatable() {
                    max = Count::Unbounded;
                }
                if node.is_optional() || max == Count::Unbounded {
                    for &child in node.children() {
                        if child != exclude {
                            let count = self.max_for_child(state, child, involved);
                            if count.is_defined() && count < max {
                                max = count;
                            }
                        }
                    }
                }
                if max == Count::ZERO && !node.is_optional() {
                    Count::ONE
                } else {
                    max
                }
            }
            NodeKind::Alternative => {
                if node.is_repeatable() {
                    return Count::Unbounded;
                }
                for &child in node.children() {
                    if child != exclude {
                        if self.min_for_child(state, child, involved) > Count::ZERO {
                            return Count::ZERO;
                        }
                    } else if let Some(field) = exclude_field {
                        if self.contains_unavailable_field(state, child, field, involved) {
                            return Count::ZERO;
                        }
                    }
                }
                max
            }
            NodeKind::Assignment { .. } | NodeKind::Action => Count::ONE,
        }
    }

    fn max_for_child(
        &self,
        state: &QuantityState,
        child: NodeId,
        involved: &mut BTreeSet<NodeId>,
    ) -> Count {
        if self.blocked(child) {
            return Count::ZERO;
        }
        let node = self.tree.node(child);
        if node.is_optional() {
            return Count::Unbounded;
        }
        match node.kind() {
            NodeKind::Assignment { .. } => {
                involved.insert(child);
                state.assignment_count(child)
            }
            NodeKind::Group => {
                let mut count = Count::Unbounded;
                for &c in node.children() {
                    let m = self.max_for_child(state, c, involved);
                    if m.is_defined() && m < count {
                        count = m;
                    }
                }
                count
            }
            NodeKind::Alternative => {
                let mut count = Count::Undefined;
                for &c in node.children() {
                    let m = self.max_for_child(state, c, involved);
                    if m == Count::Unbounded {
                        return Count::Unbounded;
                    }
                    count = count.plus(m);
                }
                count
            }
            NodeKind::Action => Count::Unbounded,
        }
    }

    /// Whether the mandatory part of `child` needs an assignment (of a field
    /// other than `exclude_field`) that was assigned zero, or an action the
    /// object's type does not satisfy
    fn contains_unavailable_field(
        &self,
        state: &QuantityState,
        child: NodeId,
        exclude_field: &str,
        involved: &mut BTreeSet<NodeId>,
    ) -> bool {
        let node = self.tree.node(child);
        if node.is_optional() {
            return false;
        }
        match node.kind() {
            NodeKind::Assignment { field } => {
                if field == exclude_field {
                    return false;
                }
                involved.insert(child);
                state.quantity(child) == Some(0)
            }
            NodeKind::Group => {
                for &c in node.children() {
                    if self.contains_unavailable_field(state, c, exclude_field, involved) {
                        return true;
                    }
                }
                false
            }
            NodeKind::Alternative => {
                for &c in node.children() {
                    if !self.contains_unavailable_field(state, c, exclude_field, involved) {
                        return false;
                    }
                }
                true
            }
            NodeKind::Action => !node.applies_to(self.object_type),
        }
    }

    /// Minimum implied by ancestor cardinality alone
    pub fn hard_min(&self, node: NodeId) -> Count {
        let n = self.tree.node(node);
        if n.is_optional() || matches!(n.kind(), NodeKind::Alternative) {
            return Count::ZERO;
        }
        match n.container() {
            None => Count::ONE,
            Some(parent) => self.hard_min(parent),
        }
    }

    /// Maximum implied by ancestor cardinality alone
    pub fn hard_max(&self, node: NodeId) -> Count {
        let n = self.tree.node(node);
        if n.is_repeatable() {
            return Count::Unbounded;
        }
        match n.container() {
            None => Count::ONE,
            Some(parent) => self.hard_max(parent),
        }
    }

    pub fn hard_bounds(&self, node: NodeId) -> Bounds {
        Bounds::new(self.hard_min(node), self.hard_max(node))
    }

    /// Mandatory nodes whose type guard rejects the object and that no
    /// alternative branch can route around; empty when the rule's shape
    /// fits the object's type
    pub fn unfulfilled(&self, node: NodeId) -> BTreeSet<NodeId> {
        let n = self.tree.node(node);
        if n.is_optional() {
            return BTreeSet::new();
        }
        if !n.applies_to(self.object_type) {
            return BTreeSet::from([node]);
        }
        match n.kind() {
            NodeKind::Group => {
                let mut result = BTreeSet::new();
                for &c in n.children() {
                    result.extend(self.unfulfilled(c));
                }
                result
            }
            NodeKind::Alternative => {
                let mut result = BTreeSet::new();
                for &c in n.children() {
                    let branch = self.unfulfilled(c);
                    if branch.is_empty() {
                        return BTreeSet::new();
                    }
                    result.extend(branch);
                }
                result
            }
            NodeKind::Assignment { .. } | NodeKind::Action => BTreeSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeSpec;

    #[test]
    fn test_count_ordering_and_plus() {
        assert!(Count::Undefined < Count::ZERO);
        assert!(Count::Finite(1000) < Count::Unbounded);
        assert_eq!(Count::Undefined.plus(Count::Finite(2)), Count::Finite(2));
        assert_eq!(Count::Finite(2).plus(Count::Finite(3)), Count::Finite(5));
        assert_eq!(Count::Finite(2).plus(Count::Unbounded), Count::Unbounded);
        assert_eq!(Count::Undefined.plus(Count::Undefined), Count::Undefined);
    }

    #[test]
    fn test_bounds_violation() {
        let b = Bounds::new(Count::Finite(2), Count::Finite(4));
        assert_eq!(b.violation(0), 2);
        assert_eq!(b.violation(3), 0);
        assert_eq!(b.violation(7), 3);

        let open = Bounds::new(Count::Undefined, Count::Unbounded);
        assert!(open.admits(0));
        assert!(open.admits(usize::MAX));
        assert_eq!(open.to_string(), "<-,*>");
    }

    #[test]
    fn test_single_assignment_cardinalities() {
        let cases = [
            (NodeSpec::assignment("f"), Count::ONE, Count::ONE),
            (NodeSpec::assignment("f").optional(), Count::ZERO, Count::ONE),
            (NodeSpec::assignment("f").repeatable(), Count::ONE, Count::Unbounded),
            (NodeSpec::assignment("f").many(), Count::ZERO, Count::Unbounded),
        ];
        for (spec, min, max) in cases {
            let mut b = ConstraintTree::builder("R");
            let root = b.root(NodeSpec::group()).unwrap();
            let a = b.child(root, spec).unwrap();
            let tree = b.build().unwrap();
            let calc = BoundsCalculator::new(&tree, "T");

            let bounds = calc.bounds(&QuantityState::new(), a, None);
            assert_eq!(bounds, Bounds::new(min, max));
        }
    }

    #[test]
    fn test_root_assignment_is_exactly_one() {
        let mut b = ConstraintTree::builder("R");
        let a = b.root(NodeSpec::assignment("f")).unwrap();
        let tree = b.build().unwrap();
        let calc = BoundsCalculator::new(&tree, "T");

        assert_eq!(
            calc.bounds(&QuantityState::new(), a, None),
            Bounds::new(Count::ONE, Count::ONE)
        );
    }

    #[test]
    fn test_alternative_branch_forced_to_zero_by_sibling() {
        let mut b = ConstraintTree::builder("R");
        let alt = b.root(NodeSpec::alternative()).unwrap();
        let a = b.child(alt, NodeSpec::assignment("a")).unwrap();
        let bb = b.child(alt, NodeSpec::assignment("b")).unwrap();
        let tree = b.build().unwrap();
        let calc = BoundsCalculator::new(&tree, "T");

        let mut state = QuantityState::new();
        state.set_quantity(a, 1);
        state.set_quantity(bb, 0);

        assert_eq!(calc.bounds(&state, a, None), Bounds::new(Count::ONE, Count::ONE));
        assert_eq!(calc.bounds(&state, bb, None), Bounds::new(Count::ZERO, Count::ZERO));

        let mut involved = BTreeSet::new();
        calc.max_count(&state, bb, &mut involved, None);
        assert!(involved.contains(&a));
    }

    #[test]
    fn test_repeatable_alternative_is_unbounded() {
        let mut b = ConstraintTree::builder("R");
        let alt = b.root(NodeSpec::alternative().repeatable()).unwrap();
        let a = b.child(alt, NodeSpec::assignment("a")).unwrap();
        let bb = b.child(alt, NodeSpec::assignment("b")).unwrap();
        let tree = b.build().unwrap();
        let calc = BoundsCalculator::new(&tree, "T");

        let mut state = QuantityState::new();
        state.set_quantity(a, 2);
        state.set_quantity(bb, 3);
        assert_eq!(calc.bounds(&state, a, None).max, Count::Unbounded);
        assert!(calc.bounds(&state, bb, None).admits(3));
    }

    #[test]
    fn test_optional_group_tightened_by_mandatory_sibling() {
        // (x (a b)?)
        let mut b = ConstraintTree::builder("R");
        let root = b.root(NodeSpec::group()).unwrap();
        b.child(root, NodeSpec::assignment("x")).unwrap();
        let inner = b.child(root, NodeSpec::group().optional()).unwrap();
        let a = b.child(inner, NodeSpec::assignment("a")).unwrap();
        let bb = b.child(inner, NodeSpec::assignment("b")).unwrap();
        let tree = b.build().unwrap();
        let calc = BoundsCalculator::new(&tree, "T");

        let mut state = QuantityState::new();
        state.set_quantity(bb, 0);
        assert_eq!(calc.bounds(&state, a, None), Bounds::new(Count::ZERO, Count::ZERO));

        state.set_quantity(bb, 1);
        assert_eq!(calc.bounds(&state, a, None), Bounds::new(Count::ONE, Count::ONE));
    }

    #[test]
    fn test_repeated_group_ties_members_together() {
        // (x (a b)*)
        let mut b = ConstraintTree::builder("R");
        let root = b.root(NodeSpec::group()).unwrap();
        b.child(root, NodeSpec::assignment("x")).unwrap();
        let inner = b.child(root, NodeSpec::group().many()).unwrap();
        let a = b.child(inner, NodeSpec::assignment("a")).unwrap();
        let bb = b.child(inner, NodeSpec::assignment("b")).unwrap();
        let tree = b.build().unwrap();
        let calc = BoundsCalculator::new(&tree, "T");

        let mut state = QuantityState::new();
        state.set_quantity(bb, 4);
        assert_eq!(
            calc.bounds(&state, a, None),
            Bounds::new(Count::Finite(4), Count::Finite(4))
        );
    }

    #[test]
    fn test_mandatory_group_collapsed_to_zero_still_fires_once() {
        // ((a? b))+ with b assigned 0: inner group max collapses but is mandatory
        let mut b = ConstraintTree::builder("R");
        let root = b.root(NodeSpec::group().repeatable()).unwrap();
        let a = b.child(root, NodeSpec::assignment("a").optional()).unwrap();
        let bb = b.child(root, NodeSpec::assignment("b")).unwrap();
        let tree = b.build().unwrap();
        let calc = BoundsCalculator::new(&tree, "T");

        let mut state = QuantityState::new();
        state.set_quantity(bb, 0);
        let mut involved = BTreeSet::new();
        assert_eq!(calc.max_count(&state, a, &mut involved, None), Count::ONE);
    }

    #[test]
    fn test_type_guard_forces_sibling_alternative() {
        // ({Call} a | b) for an object that is not a Call
        let mut b = ConstraintTree::builder("R");
        let alt = b.root(NodeSpec::alternative()).unwrap();
        let call = b.child(alt, NodeSpec::group()).unwrap();
        b.child(call, NodeSpec::action().guarded(["Call"])).unwrap();
        let a = b.child(call, NodeSpec::assignment("a")).unwrap();
        let bb = b.child(alt, NodeSpec::assignment("b")).unwrap();
        let tree = b.build().unwrap();
        let calc = BoundsCalculator::new(&tree, "Literal");

        let mut state = QuantityState::new();
        state.set_quantity(a, 0);
        // the guarded branch is unusable, so b must fire
        assert_eq!(
            calc.bounds(&state, bb, Some("b")),
            Bounds::new(Count::ONE, Count::ONE)
        );
        assert!(calc.unfulfilled(tree.root()).is_empty());
    }

    #[test]
    fn test_guarded_branch_cannot_take_values() {
        // ({Call} a | b) for an object that is not a Call, with a set
        let mut b = ConstraintTree::builder("R");
        let alt = b.root(NodeSpec::alternative()).unwrap();
        let call = b.child(alt, NodeSpec::group()).unwrap();
        b.child(call, NodeSpec::action().guarded(["Call"])).unwrap();
        let a = b.child(call, NodeSpec::assignment("a")).unwrap();
        let bb = b.child(alt, NodeSpec::assignment("b")).unwrap();
        let tree = b.build().unwrap();

        let mut state = QuantityState::new();
        state.set_quantity(a, 1);
        state.set_quantity(bb, 0);

        let calc = BoundsCalculator::new(&tree, "Literal");
        assert_eq!(calc.bounds(&state, a, None), Bounds::new(Count::ZERO, Count::ZERO));
        assert_eq!(calc.bounds(&state, bb, None), Bounds::new(Count::ONE, Count::ONE));

        // for a Call the same quantities are fine
        let calc = BoundsCalculator::new(&tree, "Call");
        assert_eq!(calc.bounds(&state, a, None), Bounds::new(Count::ONE, Count::ONE));
        assert_eq!(calc.bounds(&state, bb, None).max, Count::ZERO);
    }

    #[test]
    fn test_unfulfilled_mandatory_guard() {
        let mut b = ConstraintTree::builder("R");
        let root = b.root(NodeSpec::group()).unwrap();
        let action = b.child(root, NodeSpec::action().guarded(["Call"])).unwrap();
        b.child(root, NodeSpec::assignment("a")).unwrap();
        let tree = b.build().unwrap();

        let calc = BoundsCalculator::new(&tree, "Literal");
        assert_eq!(calc.unfulfilled(tree.root()), BTreeSet::from([action]));

        let calc = BoundsCalculator::new(&tree, "Call");
        assert!(calc.unfulfilled(tree.root()).is_empty());
    }

    #[test]
    fn test_hard_bounds() {
        let mut b = ConstraintTree::builder("R");
        let root = b.root(NodeSpec::group()).unwrap();
        let a = b.child(root, NodeSpec::assignment("a")).unwrap();
        let inner = b.child(root, NodeSpec::group().repeatable()).unwrap();
        let c = b.child(inner, NodeSpec::assignment("c")).unwrap();
        let alt = b.child(root, NodeSpec::alternative()).unwrap();
        let d = b.child(alt, NodeSpec::assignment("d")).unwrap();
        let tree = b.build().unwrap();
        let calc = BoundsCalculator::new(&tree, "T");

        assert_eq!(calc.hard_bounds(a), Bounds::new(Count::ONE, Count::ONE));
        assert_eq!(calc.hard_bounds(c), Bounds::new(Count::ONE, Count::Unbounded));
        assert_eq!(calc.hard_bounds(d), Bounds::new(Count::ZERO, Count::ONE));
    }

    #[test]
    fn test_bounds_are_referentially_transparent() {
        let mut b = ConstraintTree::builder("R");
        let root = b.root(NodeSpec::group()).unwrap();
        let a1 = b.child(root, NodeSpec::assignment("f")).unwrap();
        let a2 = b.child(root, NodeSpec::assignment("f").many()).unwrap();
        let tree = b.build().unwrap();
        let calc = BoundsCalculator::new(&tree, "T");

        let mut state = QuantityState::new();
        state.set_quantity(a1, 1);
        state.set_quantity(a2, 5);
        let first = (calc.bounds(&state, a1, Some("f")), calc.bounds(&state, a2, Some("f")));
        let second = (calc.bounds(&state, a1, Some("f")), calc.bounds(&state, a2, Some("f")));
        assert_eq!(first, second);
    }
}

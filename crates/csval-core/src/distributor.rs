//! Heuristic split of field counts across competing assignments
//!
//! When several assignment nodes write the same field, the observed count
//! has to be shared among them. Finding a split that satisfies every node's
//! bounds is a constraint problem over arbitrarily nested groups and
//! alternatives, so the distributor runs a greedy initial pass followed by a
//! bounded, randomized local search and keeps the best split it saw. When
//! the search ends above zero violation and the split space is small
//! enough, an exact pass settles the result independently of the search
//! path.

use rand::Rng;
use std::cmp::Reverse;
use std::collections::BTreeMap;

use csval_core_types::schema;

use crate::bounds::{Bounds, BoundsCalculator, Count};
use crate::config::HeuristicConfig;
use crate::errors::Result;
use crate::model::NodeId;
use crate::quantities::QuantityState;

/// Outcome of one [`HeuristicDistributor::solve`] run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolveReport {
    pub max_tries: usize,
    /// Local search steps actually taken
    pub tries: usize,
    /// Total violation of the configuration left in the state
    pub best_quality: usize,
    /// Whether the exact pass over all splits decided the result
    pub exhaustive: bool,
}

impl SolveReport {
    /// Whether every assigned node ended inside its bounds
    pub fn solved(&self) -> bool {
        self.best_quality == 0
    }
}

/// Splits field counts across competing assignment nodes
#[derive(Debug, Clone, Copy)]
pub struct HeuristicDistributor<'a> {
    calc: BoundsCalculator<'a>,
    config: &'a HeuristicConfig,
}

impl<'a> HeuristicDistributor<'a> {
    pub fn new(calc: BoundsCalculator<'a>, config: &'a HeuristicConfig) -> Self {
        Self { calc, config }
    }

    /// Assign a quantity to every node in `competing`
    ///
    /// `competing` maps each field to the nodes sharing its count; the
    /// field counts must already be recorded in `state`. `value_volume` is
    /// the object's set-value volume, which scales the search budget.
    ///
    /// The state is left holding the lowest-violation split found. Whether
    /// that split is feasible shows up in the returned report; infeasibility
    /// is not an error.
    ///
    /// # Errors
    ///
    /// `ConsistencyFault` if a search step breaks the per-field sums.
    pub fn solve<R: Rng + ?Sized>(
        &self,
        state: &mut QuantityState,
        competing: &BTreeMap<String, Vec<NodeId>>,
        value_volume: usize,
        rng: &mut R,
    ) -> Result<SolveReport> {
        self.initial_solution(state, competing);

        let competing_count = competing.values().map(Vec::len).sum();
        let max_tries = self.config.max_tries(value_volume, competing_count);
        let max_no_improvement = self.config.max_no_improvement(max_tries);

        let mut best_quality = self.quality(state);
        let mut best = state.assignments().clone();
        let mut tries = 0;
        let mut no_improvement = 0;

        while best_quality > 0 && tries < max_tries && no_improvement < max_no_improvement {
            if !self.optimize_step(state, competing, rng)? {
                break;
            }
            tries += 1;
            let quality = self.quality(state);
            if quality < best_quality {
                best_quality = quality;
                best = state.assignments().clone();
                no_improvement = 0;
            } else {
                no_improvement += 1;
            }
        }
        state.restore_assignments(best);

        let mut exhaustive = false;
        if best_quality > 0 {
            if let Some(quality) = self.exhaustive(state, competing) {
                best_quality = quality;
                exhaustive = true;
            }
        }

        let report = SolveReport {
            max_tries,
            tries,
            best_quality,
            exhaustive,
        };
        let tree = self.calc.tree();
        let settled: &QuantityState = state;
        let bounds: BTreeMap<NodeId, Bounds> = settled
            .assignments()
            .keys()
            .map(|&node| (node, self.calc.bounds(settled, node, tree.node(node).target_field())))
            .collect();
        tracing::debug!(
            component = module_path!(),
            op = "distribute",
            event = schema::EVENT_SOLVED,
            rule = tree.name(),
            max_tries,
            tries,
            quality = best_quality,
            solved = report.solved(),
            exhaustive,
            quantities = %settled.render(tree, &bounds),
        );
        Ok(report)
    }

    /// Sum of all assigned nodes' violations, each judged with its own
    /// field excluded from the dead-branch check
    pub fn quality(&self, state: &QuantityState) -> usize {
        let tree = self.calc.tree();
        state
            .assignments()
            .iter()
            .map(|(&node, &quantity)| {
                let field = tree.node(node).target_field();
                self.calc.bounds(state, node, field).violation(quantity)
            })
            .sum()
    }

    /// Try every split of every competing field, leaving the first split of
    /// lowest quality in `state`
    ///
    /// Splits are visited in lexicographic order (first node smallest, last
    /// field fastest), so the outcome depends only on the input. Returns
    /// `None` without touching `state` when the number of splits exceeds
    /// `exhaustive_limit`.
    fn exhaustive(
        &self,
        state: &mut QuantityState,
        competing: &BTreeMap<String, Vec<NodeId>>,
    ) -> Option<usize> {
        let mut total: usize = 1;
        for (field, nodes) in competing {
            let budget = state.field_count(field).unwrap_or(0);
            total = total.saturating_mul(split_count(budget, nodes.len()));
            if total > self.config.exhaustive_limit {
                return None;
            }
        }

        let splits: Vec<(&[NodeId], Vec<Vec<usize>>)> = competing
            .iter()
            .map(|(field, nodes)| {
                let budget = state.field_count(field).unwrap_or(0);
                (nodes.as_slice(), splits_of(budget, nodes.len()))
            })
            .collect();
        if splits.iter().any(|(_, options)| options.is_empty()) {
            return None;
        }

        let mut index = vec![0; splits.len()];
        let mut best: Option<(usize, BTreeMap<NodeId, usize>)> = None;
        'search: loop {
            for ((nodes, options), &i) in splits.iter().zip(&index) {
                for (&node, &q) in nodes.iter().zip(&options[i]) {
                    state.set_quantity(node, q);
                }
            }
            let quality = self.quality(state);
            if best.as_ref().map_or(true, |(b, _)| quality < *b) {
                best = Some((quality, state.assignments().clone()));
                if quality == 0 {
                    break;
                }
            }

            let mut pos = index.len();
            loop {
                if pos == 0 {
                    break 'search;
                }
                pos -= 1;
                index[pos] += 1;
                if index[pos] < splits[pos].1.len() {
                    break;
                }
                index[pos] = 0;
            }
        }

        let (quality, snapshot) = best?;
        state.restore_assignments(snapshot);
        Some(quality)
    }

    /// Order in which nodes must be distributed so that every node comes
    /// after the nodes it depends on; ties go to the lower node id
    pub fn dependency_order(&self, nodes: &[NodeId]) -> Vec<NodeId> {
        let tree = self.calc.tree();
        let mut remaining = nodes.to_vec();
        remaining.sort();
        remaining.dedup();

        let mut ordered = Vec::with_capacity(remaining.len());
        while !remaining.is_empty() {
            let next = remaining
                .iter()
                .position(|&a| !remaining.iter().any(|&b| tree.depends_on(a, b)))
                .unwrap_or(0);
            ordered.push(remaining.remove(next));
        }
        ordered
    }

    fn initial_solution(&self, state: &mut QuantityState, competing: &BTreeMap<String, Vec<NodeId>>) {
        for (field, nodes) in competing {
            let budget = state.field_count(field).unwrap_or(0);
            let mut ordered = self.dependency_order(nodes);

            let leftover = self.distribute(state, &ordered, budget, |s, n| {
                self.calc.bounds(s, n, Some(field.as_str()))
            });
            if leftover == 0 {
                continue;
            }

            // second pass: only ancestor cardinality limits what a node may take
            ordered.sort_by_key(|&n| Reverse(state.quantity(n).unwrap_or(0)));
            let leftover = self.distribute(state, &ordered, leftover, |_, n| self.calc.hard_bounds(n));
            if leftover > 0 {
                if let Some(&first) = ordered.first() {
                    let q = state.quantity(first).unwrap_or(0);
                    state.set_quantity(first, q + leftover);
                }
            }
        }
    }

    /// Satisfy minimums first, then fill up to maximums; returns the
    /// budget that could not be placed
    fn distribute<B>(
        &self,
        state: &mut QuantityState,
        ordered: &[NodeId],
        mut budget: usize,
        bounds_of: B,
    ) -> usize
    where
        B: Fn(&QuantityState, NodeId) -> Bounds,
    {
        for &node in ordered {
            let bounds = bounds_of(state, node);
            let min = bounds.min.min(bounds.max).finite().unwrap_or(0);
            let q = state.quantity(node).unwrap_or(0);
            let add = min.saturating_sub(q).min(budget);
            state.set_quantity(node, q + add);
            budget -= add;
        }
        for &node in ordered {
            if budget == 0 {
                break;
            }
            let bounds = bounds_of(state, node);
            let q = state.quantity(node).unwrap_or(0);
            let add = headroom(&bounds, q).min(budget);
            state.set_quantity(node, q + add);
            budget -= add;
        }
        budget
    }

    /// One local search move; `false` when no competing node is out of bounds
    fn optimize_step<R: Rng + ?Sized>(
        &self,
        state: &mut QuantityState,
        competing: &BTreeMap<String, Vec<NodeId>>,
        rng: &mut R,
    ) -> Result<bool> {
        let mut bounds = BTreeMap::new();
        let mut candidates = Vec::new();
        for (field, nodes) in competing {
            for &node in nodes {
                bounds.insert(node, self.calc.bounds(state, node, Some(field.as_str())));
            }
            for &node in nodes {
                let violation = bounds[&node].violation(state.quantity(node).unwrap_or(0));
                if violation > 0 {
                    candidates.push((violation, node, nodes));
                }
            }
        }
        if candidates.is_empty() {
            return Ok(false);
        }

        // pick proportionally to violation size
        let total: usize = candidates.iter().map(|c| c.0).sum();
        let mut ticket = rng.gen_range(0..total);
        let mut chosen = candidates[0];
        for candidate in &candidates {
            if ticket < candidate.0 {
                chosen = *candidate;
                break;
            }
            ticket -= candidate.0;
        }

        let (_, node, nodes) = chosen;
        let siblings: Vec<NodeId> = nodes.iter().copied().filter(|&n| n != node).collect();
        let q = state.quantity(node).unwrap_or(0);
        let node_bounds = bounds[&node];
        if node_bounds.deficit(q) > 0 {
            let wanted = self.damped(node_bounds.deficit(q));
            let pulled = pull(state, &siblings, &bounds, wanted, rng);
            state.set_quantity(node, q + pulled);
        } else if node_bounds.excess(q) > 0 {
            let wanted = self.damped(node_bounds.excess(q));
            let hard: BTreeMap<NodeId, Bounds> = siblings
                .iter()
                .map(|&n| (n, self.calc.hard_bounds(n)))
                .collect();
            let pushed = push(state, &siblings, &bounds, &hard, wanted, rng);
            state.set_quantity(node, q - pushed);
        }

        state.consistency_check(self.calc.tree())?;
        Ok(true)
    }

    fn damped(&self, amount: usize) -> usize {
        let step = (amount as f64 * self.config.damping).ceil() as usize;
        step.clamp(1, amount.max(1))
    }
}

fn headroom(bounds: &Bounds, quantity: usize) -> usize {
    match bounds.max {
        Count::Finite(max) => max.saturating_sub(quantity),
        Count::Unbounded => usize::MAX,
        Count::Undefined => 0,
    }
}

/// Number of ways to split `budget` over `parts` nodes, saturating
fn split_count(budget: usize, parts: usize) -> usize {
    let mut count: usize = 1;
    for k in 1..parts {
        count = match count.checked_mul(budget + k) {
            Some(c) => c / k,
            None => return usize::MAX,
        };
    }
    count
}

/// Every split of `budget` over `parts` nodes, lexicographically ascending
fn splits_of(budget: usize, parts: usize) -> Vec<Vec<usize>> {
    match parts {
        0 if budget == 0 => vec![Vec::new()],
        0 => Vec::new(),
        1 => vec![vec![budget]],
        _ => {
            let mut out = Vec::new();
            for first in 0..=budget {
                for rest in splits_of(budget - first, parts - 1) {
                    let mut split = Vec::with_capacity(parts);
                    split.push(first);
                    split.extend(rest);
                    out.push(split);
                }
            }
            out
        }
    }
}

fn surplus(bounds: &Bounds, quantity: usize) -> usize {
    quantity.saturating_sub(bounds.min.finite().unwrap_or(0))
}

/// Take up to `wanted` from siblings, richest first, then from random
/// siblings regardless of their minimum
fn pull<R: Rng + ?Sized>(
    state: &mut QuantityState,
    siblings: &[NodeId],
    bounds: &BTreeMap<NodeId, Bounds>,
    wanted: usize,
    rng: &mut R,
) -> usize {
    let mut order = siblings.to_vec();
    order.sort_by_key(|n| Reverse(surplus(&bounds[n], state.quantity(*n).unwrap_or(0))));

    let mut taken = 0;
    for &node in &order {
        if taken == wanted {
            break;
        }
        let q = state.quantity(node).unwrap_or(0);
        let take = surplus(&bounds[&node], q).min(wanted - taken);
        state.set_quantity(node, q - take);
        taken += take;
    }

    while taken < wanted && !order.is_empty() {
        let node = order.swap_remove(rng.gen_range(0..order.len()));
        let q = state.quantity(node).unwrap_or(0);
        let take = q.min(wanted - taken);
        state.set_quantity(node, q - take);
        taken += take;
    }
    taken
}

/// Give `wanted` to siblings with the most headroom first, then to those
/// whose ancestors alone would allow more (`hard`); whatever still does
/// not fit lands on a random sibling
fn push<R: Rng + ?Sized>(
    state: &mut QuantityState,
    siblings: &[NodeId],
    bounds: &BTreeMap<NodeId, Bounds>,
    hard: &BTreeMap<NodeId, Bounds>,
    wanted: usize,
    rng: &mut R,
) -> usize {
    if siblings.is_empty() {
        return 0;
    }
    let mut given = 0;
    for limits in [bounds, hard] {
        let mut order = siblings.to_vec();
        order.sort_by_key(|n| Reverse(headroom(&limits[n], state.quantity(*n).unwrap_or(0))));
        for &node in &order {
            if given == wanted {
                break;
            }
            let q = state.quantity(node).unwrap_or(0);
            let add = headroom(&limits[&node], q).min(wanted - given);
            state.set_quantity(node, q + add);
            given += add;
        }
    }
    if given < wanted {
        let node = siblings[rng.gen_range(0..siblings.len())];
        let q = state.quantity(node).unwrap_or(0);
        state.set_quantity(node, q + (wanted - given));
        given = wanted;
    }
    given
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConstraintTree, NodeSpec};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn split(second: NodeSpec) -> (ConstraintTree, NodeId, NodeId) {
        let mut b = ConstraintTree::builder("Split");
        let root = b.root(NodeSpec::group()).unwrap();
        let a1 = b.child(root, NodeSpec::assignment("f")).unwrap();
        let a2 = b.child(root, second).unwrap();
        (b.build().unwrap(), a1, a2)
    }

    fn solve(tree: &ConstraintTree, nodes: &[NodeId], count: usize, seed: u64) -> (QuantityState, SolveReport) {
        let config = HeuristicConfig::default();
        let calc = BoundsCalculator::new(tree, "T");
        let distributor = HeuristicDistributor::new(calc, &config);
        let mut state = QuantityState::new();
        state.set_field_count("f", count);
        let competing = BTreeMap::from([("f".to_string(), nodes.to_vec())]);
        let mut rng = StdRng::seed_from_u64(seed);
        let report = distributor
            .solve(&mut state, &competing, count, &mut rng)
            .unwrap();
        (state, report)
    }

    #[test]
    fn test_even_split_is_found_greedily() {
        let (tree, a1, a2) = split(NodeSpec::assignment("f"));
        let (state, report) = solve(&tree, &[a1, a2], 2, 1);
        assert_eq!(state.quantity(a1), Some(1));
        assert_eq!(state.quantity(a2), Some(1));
        assert!(report.solved());
        assert_eq!(report.tries, 0);
    }

    #[test]
    fn test_leftover_goes_to_repeatable_node() {
        let (tree, a1, a2) = split(NodeSpec::assignment("f").many());
        let (state, report) = solve(&tree, &[a1, a2], 5, 7);
        assert_eq!(state.quantity(a1), Some(1));
        assert_eq!(state.quantity(a2), Some(4));
        assert!(report.solved());
    }

    #[test]
    fn test_infeasible_split_terminates_with_consistent_sums() {
        let (tree, a1, a2) = split(NodeSpec::assignment("f"));
        for seed in 0..20 {
            let (state, report) = solve(&tree, &[a1, a2], 5, seed);
            assert!(!report.solved());
            assert!(report.exhaustive);
            assert_eq!(report.best_quality, 3);
            assert!(report.tries <= report.max_tries);
            assert!(state.consistency_check(&tree).is_ok());
        }
    }

    #[test]
    fn test_dependency_order_puts_group_predecessors_first() {
        let mut b = ConstraintTree::builder("Deps");
        let root = b.root(NodeSpec::group()).unwrap();
        let alt = b.child(root, NodeSpec::alternative()).unwrap();
        let x = b.child(alt, NodeSpec::assignment("f")).unwrap();
        let y = b.child(alt, NodeSpec::assignment("f")).unwrap();
        let z = b.child(root, NodeSpec::assignment("f").optional()).unwrap();
        let tree = b.build().unwrap();

        let config = HeuristicConfig::default();
        let distributor = HeuristicDistributor::new(BoundsCalculator::new(&tree, "T"), &config);
        assert_eq!(distributor.dependency_order(&[z, y, x]), vec![x, y, z]);
    }

    /// `((f? | f+)? f?)`
    fn optional_alternative() -> (ConstraintTree, Vec<NodeId>) {
        let mut b = ConstraintTree::builder("Tail");
        let root = b.root(NodeSpec::group()).unwrap();
        let alt = b.child(root, NodeSpec::alternative().optional()).unwrap();
        let a1 = b.child(alt, NodeSpec::assignment("f").optional()).unwrap();
        let a2 = b.child(alt, NodeSpec::assignment("f").repeatable()).unwrap();
        let a3 = b.child(root, NodeSpec::assignment("f").optional()).unwrap();
        (b.build().unwrap(), vec![a1, a2, a3])
    }

    #[test]
    fn test_feasible_split_is_found_for_every_seed() {
        let (tree, nodes) = optional_alternative();
        for seed in 0..64 {
            let (state, report) = solve(&tree, &nodes, 3, seed);
            assert!(report.solved(), "seed {}: {:?}", seed, report);
            assert!(state.consistency_check(&tree).is_ok());
        }
    }

    #[test]
    fn test_exhaustive_pass_is_skipped_over_the_limit() {
        let (tree, nodes) = optional_alternative();
        let config = HeuristicConfig {
            exhaustive_limit: 0,
            ..HeuristicConfig::default()
        };
        let distributor = HeuristicDistributor::new(BoundsCalculator::new(&tree, "T"), &config);
        let mut state = QuantityState::new();
        state.set_field_count("f", 3);
        for &node in &nodes {
            state.set_quantity(node, 1);
        }
        let competing = BTreeMap::from([("f".to_string(), nodes.clone())]);

        assert_eq!(distributor.exhaustive(&mut state, &competing), None);
        assert!(nodes.iter().all(|&n| state.quantity(n) == Some(1)));
    }

    #[test]
    fn test_exhaustive_pass_takes_first_best_split() {
        let (tree, a1, a2) = split(NodeSpec::assignment("f"));
        let config = HeuristicConfig::default();
        let distributor = HeuristicDistributor::new(BoundsCalculator::new(&tree, "T"), &config);
        let mut state = QuantityState::new();
        state.set_field_count("f", 5);
        let competing = BTreeMap::from([("f".to_string(), vec![a1, a2])]);

        // (0,5) misses by 5; (1,4) is the first of the splits missing by 3
        assert_eq!(distributor.exhaustive(&mut state, &competing), Some(3));
        assert_eq!(state.quantity(a1), Some(1));
        assert_eq!(state.quantity(a2), Some(4));
    }

    #[test]
    fn test_push_prefers_ancestor_headroom_over_random_sibling() {
        let (tree, nodes) = optional_alternative();
        let calc = BoundsCalculator::new(&tree, "T");
        let (a1, a2, a3) = (nodes[0], nodes[1], nodes[2]);
        let mut state = QuantityState::new();
        state.set_field_count("f", 3);
        state.set_quantity(a1, 1);
        state.set_quantity(a2, 0);
        state.set_quantity(a3, 2);

        let siblings = [a1, a2];
        let bounds: BTreeMap<NodeId, Bounds> = siblings
            .iter()
            .map(|&n| (n, calc.bounds(&state, n, Some("f"))))
            .collect();
        let hard: BTreeMap<NodeId, Bounds> = siblings.iter().map(|&n| (n, calc.hard_bounds(n))).collect();
        let mut rng = StdRng::seed_from_u64(0);

        assert_eq!(push(&mut state, &siblings, &bounds, &hard, 1, &mut rng), 1);
        assert_eq!(state.quantity(a1), Some(1));
        assert_eq!(state.quantity(a2), Some(1));
    }

    #[test]
    fn test_split_enumeration() {
        assert_eq!(split_count(3, 3), 10);
        assert_eq!(split_count(0, 4), 1);
        assert_eq!(split_count(usize::MAX / 2, 40), usize::MAX);

        let splits = splits_of(2, 2);
        assert_eq!(splits, vec![vec![0, 2], vec![1, 1], vec![2, 0]]);
        assert_eq!(splits_of(3, 3).len(), split_count(3, 3));
    }

    #[test]
    fn test_damped_step_is_at_least_one() {
        let config = HeuristicConfig::default();
        let (tree, _, _) = split(NodeSpec::assignment("f"));
        let distributor = HeuristicDistributor::new(BoundsCalculator::new(&tree, "T"), &config);
        assert_eq!(distributor.damped(1), 1);
        assert_eq!(distributor.damped(5), 3);
    }
}

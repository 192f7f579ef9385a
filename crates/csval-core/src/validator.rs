//! Object validation against grammar rule cardinalities

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Instant;

use csval_core_types::ValidationContext;

use crate::bounds::{BoundsCalculator, Count};
use crate::config::HeuristicConfig;
use crate::diagnostics::{BoundsViolation, DiagnosticFactory, SyntaxDiagnosticFactory};
use crate::distributor::HeuristicDistributor;
use crate::errors::Result;
use crate::model::{ConstraintTree, NodeId, NodeKind};
use crate::object::{FieldCountSource, SemanticObject, SetValueCounter};
use crate::quantities::QuantityState;
use crate::registry::RuleProvider;
use crate::{log_op_end, log_op_error, log_op_start};

/// Checks that objects could have been produced by one of their grammar rules
///
/// The validator holds no per-call state: every call builds its own
/// [`QuantityState`] and random source, so a shared `&Validator` can serve
/// concurrent validations. Without a configured seed, the random source is
/// seeded from the object's type and field counts, so validating an
/// unchanged object always takes the same search path.
///
/// # Example
///
/// ```
/// use csval_core::model::{ConstraintTree, NodeSpec};
/// use csval_core::object::{DynObject, FeatureInfo};
/// use csval_core::registry::RuleRegistry;
/// use csval_core::{ValidationContext, Validator};
///
/// let mut b = ConstraintTree::builder("Entity");
/// let root = b.root(NodeSpec::group()).unwrap();
/// b.child(root, NodeSpec::assignment("name")).unwrap();
/// let mut registry = RuleRegistry::new();
/// registry.register("Entity", b.build().unwrap());
///
/// let validator = Validator::new(registry);
/// let entity = DynObject::new("Entity")
///     .with_feature(FeatureInfo::single("name"))
///     .with_values("name", 1);
///
/// let mut diagnostics = Vec::new();
/// let valid = validator
///     .validate_object(&entity, &mut |d| diagnostics.push(d), &ValidationContext::new())
///     .unwrap();
/// assert!(valid);
/// assert!(diagnostics.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct Validator<P, F = SyntaxDiagnosticFactory, C = SetValueCounter> {
    rules: P,
    factory: F,
    counter: C,
    config: HeuristicConfig,
}

impl<P: RuleProvider> Validator<P> {
    /// Validator producing [`SyntaxDiagnostic`](crate::diagnostics::SyntaxDiagnostic)s
    /// and counting every set value
    pub fn new(rules: P) -> Self {
        Self::with_parts(rules, SyntaxDiagnosticFactory, SetValueCounter)
    }
}

impl<P, F, C> Validator<P, F, C> {
    pub fn with_parts(rules: P, factory: F, counter: C) -> Self {
        Self {
            rules,
            factory,
            counter,
            config: HeuristicConfig::default(),
        }
    }

    pub fn with_config(mut self, config: HeuristicConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &HeuristicConfig {
        &self.config
    }

    pub fn rules(&self) -> &P {
        &self.rules
    }
}

impl<P: RuleProvider, F, C> Validator<P, F, C> {
    /// Validate one object against the rules of its type
    ///
    /// Returns `true` as soon as one rule accounts for every field count.
    /// Otherwise the diagnostics of all attempted rules go to `acceptor`,
    /// in discovery order, and the result is `false`. Transient objects
    /// and types without rules are valid.
    ///
    /// The search is seeded from the configured seed, or from the object's
    /// type and field counts when none is set.
    ///
    /// # Errors
    ///
    /// `ConsistencyFault` if quantity distribution breaks its own invariant.
    pub fn validate_object<O, A>(
        &self,
        obj: &O,
        acceptor: &mut A,
        ctx: &ValidationContext,
    ) -> Result<bool>
    where
        O: SemanticObject,
        F: DiagnosticFactory<O>,
        C: FieldCountSource<O>,
        A: FnMut(F::Diagnostic),
    {
        let seed = match self.config.seed {
            Some(seed) => seed,
            None => self.object_seed(obj),
        };
        let mut rng = StdRng::seed_from_u64(seed);
        self.validate_object_with_rng(obj, acceptor, ctx, &mut rng)
    }

    fn object_seed<O>(&self, obj: &O) -> u64
    where
        O: SemanticObject,
        C: FieldCountSource<O>,
    {
        let mut hasher = DefaultHasher::new();
        obj.type_name().hash(&mut hasher);
        for feature in obj.features() {
            feature.name.hash(&mut hasher);
            self.counter
                .count_non_transient_values(obj, &feature.name)
                .hash(&mut hasher);
        }
        hasher.finish()
    }

    /// [`validate_object`](Self::validate_object) with a caller-owned random source
    ///
    /// # Errors
    ///
    /// `ConsistencyFault` if quantity distribution breaks its own invariant.
    pub fn validate_object_with_rng<O, A, R>(
        &self,
        obj: &O,
        acceptor: &mut A,
        ctx: &ValidationContext,
        rng: &mut R,
    ) -> Result<bool>
    where
        O: SemanticObject,
        F: DiagnosticFactory<O>,
        C: FieldCountSource<O>,
        A: FnMut(F::Diagnostic),
        R: Rng + ?Sized,
    {
        if self.counter.is_transient(obj) {
            return Ok(true);
        }
        let rules = self.rules.rules_for(obj.type_name());
        if rules.is_empty() {
            return Ok(true);
        }

        self.run_rules(obj, rules, acceptor, ctx, |rule| self.validate_rule(obj, rule, rng))
    }

    /// Apply `check` to each rule in order, stopping at the first clean one;
    /// diagnostics reach `acceptor` only once every rule has failed
    fn run_rules<O, A, K>(
        &self,
        obj: &O,
        rules: &[Arc<ConstraintTree>],
        acceptor: &mut A,
        ctx: &ValidationContext,
        mut check: K,
    ) -> Result<bool>
    where
        O: SemanticObject,
        A: FnMut(F::Diagnostic),
        F: DiagnosticFactory<O>,
        K: FnMut(&ConstraintTree) -> Result<Vec<F::Diagnostic>>,
    {
        let start = Instant::now();
        log_op_start!(
            "validate_object",
            object_type = obj.type_name(),
            rule_count = rules.len(),
            request_id = ctx.request_id_str(),
            trace_id = ctx.trace_id_str(),
        );

        let mut all = Vec::new();
        for rule in rules {
            let diagnostics = match check(rule.as_ref()) {
                Ok(diagnostics) => diagnostics,
                Err(err) => {
                    log_op_error!(
                        "validate_object",
                        err.clone(),
                        duration_ms = start.elapsed().as_millis() as u64,
                        rule = rule.name(),
                        object_type = obj.type_name(),
                    );
                    return Err(err);
                }
            };
            if diagnostics.is_empty() {
                log_op_end!(
                    "validate_object",
                    duration_ms = start.elapsed().as_millis() as u64,
                    valid = true,
                    rule = rule.name(),
                    object_type = obj.type_name(),
                );
                return Ok(true);
            }
            all.extend(diagnostics);
        }

        let diagnostic_count = all.len();
        for diagnostic in all {
            acceptor(diagnostic);
        }
        log_op_end!(
            "validate_object",
            duration_ms = start.elapsed().as_millis() as u64,
            valid = false,
            diagnostic_count = diagnostic_count,
            object_type = obj.type_name(),
        );
        Ok(false)
    }

    /// Validate `root` and every object it transitively contains, depth first
    ///
    /// The result is `false` if any object fails; diagnostics of every
    /// failing object reach `acceptor`.
    ///
    /// # Errors
    ///
    /// The first `ConsistencyFault` stops the traversal.
    pub fn validate_recursive<O, A>(
        &self,
        root: &O,
        acceptor: &mut A,
        ctx: &ValidationContext,
    ) -> Result<bool>
    where
        O: SemanticObject,
        F: DiagnosticFactory<O>,
        C: FieldCountSource<O>,
        A: FnMut(F::Diagnostic),
    {
        let mut valid = true;
        let mut stack = vec![root];
        while let Some(obj) = stack.pop() {
            valid &= self.validate_object(obj, acceptor, ctx)?;
            stack.extend(obj.contents().into_iter().rev());
        }
        Ok(valid)
    }

    fn validate_rule<O, R>(
        &self,
        obj: &O,
        rule: &ConstraintTree,
        rng: &mut R,
    ) -> Result<Vec<F::Diagnostic>>
    where
        O: SemanticObject,
        F: DiagnosticFactory<O>,
        C: FieldCountSource<O>,
        R: Rng + ?Sized,
    {
        let calc = BoundsCalculator::new(rule, obj.type_name());
        let mut diagnostics = Vec::new();

        let unfulfilled: Vec<NodeId> = calc.unfulfilled(rule.root()).into_iter().collect();
        if !unfulfilled.is_empty() {
            diagnostics.push(self.factory.object_shape(rule, obj, &unfulfilled));
            return Ok(diagnostics);
        }

        let assignments = self.collect_assignments(rule, obj, &mut diagnostics);

        let mut state = QuantityState::new();
        for feature in obj.features() {
            let count = self.counter.count_non_transient_values(obj, &feature.name);
            if count > 0 && !assignments.contains_key(&feature.name) {
                diagnostics.push(self.factory.assignment_missing(rule, obj, &feature.name));
            } else {
                state.set_field_count(feature.name.as_str(), count);
            }
        }
        if !diagnostics.is_empty() {
            return Ok(diagnostics);
        }

        let mut competing: BTreeMap<String, Vec<NodeId>> = BTreeMap::new();
        let mut implicit: Vec<(&String, &Vec<NodeId>)> = Vec::new();
        for (field, nodes) in &assignments {
            let count = state.field_count(field).unwrap_or(0);
            let implicit_zero = count == 0
                && obj
                    .feature(field)
                    .map_or(false, |f| !f.many && f.implicit_zero);
            let multi = nodes.len() > 1 && count != 0;
            if implicit_zero {
                implicit.push((field, nodes));
            } else if multi {
                competing.insert(field.clone(), nodes.clone());
            } else {
                for &node in nodes {
                    state.set_quantity(node, count);
                }
            }
        }

        // an unset implicit field still counts once if the grammar demands it
        for (field, nodes) in implicit {
            let mut min = Count::Undefined;
            for &node in nodes {
                min = min.plus(calc.min_count(&state, node, &mut BTreeSet::new()));
            }
            let value = usize::from(min > Count::ZERO);
            state.set_field_count(field.as_str(), value);
            if nodes.len() > 1 && value > 0 {
                competing.insert(field.clone(), nodes.clone());
            } else {
                for &node in nodes {
                    state.set_quantity(node, value);
                }
            }
        }

        if !competing.is_empty() {
            HeuristicDistributor::new(calc, &self.config).solve(
                &mut state,
                &competing,
                obj.set_value_volume(),
                rng,
            )?;
        }
        self.check_solution(&calc, &state, obj)
    }

    /// Verify the per-field sums of a solved state, then report every field
    /// outside its bounds
    fn check_solution<O>(
        &self,
        calc: &BoundsCalculator<'_>,
        state: &QuantityState,
        obj: &O,
    ) -> Result<Vec<F::Diagnostic>>
    where
        O: SemanticObject,
        F: DiagnosticFactory<O>,
    {
        let rule = calc.tree();
        state.consistency_check(rule)?;
        Ok(self
            .check_quantities(calc, state)
            .iter()
            .map(|violation| self.factory.feature_bounds(rule, obj, violation))
            .collect())
    }

    /// Field → assignment nodes in document order, skipping subtrees whose
    /// type guard rejects the object; assignments to undeclared fields are
    /// reported instead
    fn collect_assignments<O>(
        &self,
        rule: &ConstraintTree,
        obj: &O,
        diagnostics: &mut Vec<F::Diagnostic>,
    ) -> BTreeMap<String, Vec<NodeId>>
    where
        O: SemanticObject,
        F: DiagnosticFactory<O>,
    {
        let mut assignments: BTreeMap<String, Vec<NodeId>> = BTreeMap::new();
        let mut stack = vec![rule.root()];
        while let Some(id) = stack.pop() {
            let node = rule.node(id);
            if !node.applies_to(obj.type_name()) {
                continue;
            }
            if let NodeKind::Assignment { field } = node.kind() {
                if obj.feature(field).is_some() {
                    assignments.entry(field.clone()).or_default().push(id);
                } else {
                    diagnostics.push(self.factory.feature_missing(rule, obj, id));
                }
            }
            stack.extend(node.children().iter().rev().copied());
        }
        assignments
    }

    /// Compare every assigned field's count with the summed bounds of its nodes
    fn check_quantities(&self, calc: &BoundsCalculator<'_>, state: &QuantityState) -> Vec<BoundsViolation> {
        let tree = calc.tree();
        let mut violations = Vec::new();
        for (field, nodes) in state.group_by_field(tree) {
            let mut involved = BTreeSet::new();
            let mut min = Count::Undefined;
            let mut max = Count::ZERO;
            for &node in &nodes {
                involved.insert(node);
                min = min.plus(calc.min_count(state, node, &mut involved));
                max = max.plus(calc.max_count(state, node, &mut involved, None));
            }

            let actual = state.field_count(&field).unwrap_or(0);
            let below = matches!(min, Count::Finite(m) if actual < m);
            let above = matches!(max, Count::Finite(m) if actual > m);
            if below || above {
                let involved: Vec<NodeId> = involved.into_iter().collect();
                let scope = tree.common_container_of(involved.iter().copied());
                violations.push(BoundsViolation {
                    field,
                    actual,
                    min,
                    max,
                    involved,
                    scope,
                });
            }
        }
        violations
    }
}

use csval_core::model::{ConstraintTree, NodeSpec, TreeBuilder};
use csval_core::object::{DynObject, FeatureInfo};
use csval_core::registry::RuleRegistry;
use csval_core::{HeuristicConfig, SyntaxDiagnostic, ValidationContext, Validator};

/// Seed used wherever a test needs a reproducible search
pub const TEST_SEED: u64 = 42;

/// Build a rule whose root is a plain group, letting `f` add the children
#[allow(dead_code)]
pub fn group_rule<F>(name: &str, f: F) -> ConstraintTree
where
    F: FnOnce(&mut TreeBuilder, csval_core::NodeId),
{
    let mut b = ConstraintTree::builder(name);
    let root = b.root(NodeSpec::group()).unwrap();
    f(&mut b, root);
    b.build().unwrap()
}

/// Registry serving `rules` for `object_type`, in order
#[allow(dead_code)]
pub fn registry_for(object_type: &str, rules: Vec<ConstraintTree>) -> RuleRegistry {
    let mut registry = RuleRegistry::new();
    for rule in rules {
        registry.register(object_type, rule);
    }
    registry
}

/// Validator over `registry` with a pinned seed
#[allow(dead_code)]
pub fn seeded_validator(registry: RuleRegistry) -> Validator<RuleRegistry> {
    Validator::new(registry).with_config(HeuristicConfig::seeded(TEST_SEED))
}

/// Object of `type_name` declaring every field in `counts` as many-valued
/// and holding the given number of values on each
#[allow(dead_code)]
pub fn object_with(type_name: &str, counts: &[(&str, usize)]) -> DynObject {
    counts.iter().fold(DynObject::new(type_name), |obj, (field, n)| {
        obj.with_feature(FeatureInfo::many(*field)).with_values(field, *n)
    })
}

/// Run `validate_object` and collect what reached the acceptor
#[allow(dead_code)]
pub fn validate(validator: &Validator<RuleRegistry>, obj: &DynObject) -> (bool, Vec<SyntaxDiagnostic>) {
    let mut diagnostics = Vec::new();
    let valid = validator
        .validate_object(obj, &mut |d| diagnostics.push(d), &ValidationContext::new())
        .unwrap();
    (valid, diagnostics)
}

/// Run `validate_recursive` and collect what reached the acceptor
#[allow(dead_code)]
pub fn validate_tree(
    validator: &Validator<RuleRegistry>,
    root: &DynObject,
) -> (bool, Vec<SyntaxDiagnostic>) {
    let mut diagnostics = Vec::new();
    let valid = validator
        .validate_recursive(root, &mut |d| diagnostics.push(d), &ValidationContext::new())
        .unwrap();
    (valid, diagnostics)
}

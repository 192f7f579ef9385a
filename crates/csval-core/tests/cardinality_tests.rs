#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Field counts against single assignments, alternatives and split fields

mod common;

use common::{group_rule, object_with, registry_for, seeded_validator, validate};
use csval_core::model::{ConstraintTree, NodeSpec};
use csval_core::{Count, DiagnosticKind, HeuristicConfig, Validator};

fn single_assignment(spec: NodeSpec) -> Validator<csval_core::RuleRegistry> {
    let rule = group_rule("Single", |b, root| {
        b.child(root, spec).unwrap();
    });
    seeded_validator(registry_for("T", vec![rule]))
}

#[test]
fn test_mandatory_assignment_needs_exactly_one_value() {
    let validator = single_assignment(NodeSpec::assignment("f"));
    for count in 0..4 {
        let (valid, diagnostics) = validate(&validator, &object_with("T", &[("f", count)]));
        assert_eq!(valid, count == 1, "count {}", count);
        assert_eq!(diagnostics.is_empty(), valid);
    }
}

#[test]
fn test_optional_assignment_admits_zero_or_one() {
    let validator = single_assignment(NodeSpec::assignment("f").optional());
    for count in 0..4 {
        let (valid, _) = validate(&validator, &object_with("T", &[("f", count)]));
        assert_eq!(valid, count <= 1, "count {}", count);
    }
}

#[test]
fn test_repeatable_assignment_needs_at_least_one() {
    let validator = single_assignment(NodeSpec::assignment("f").repeatable());
    for count in 0..6 {
        let (valid, _) = validate(&validator, &object_with("T", &[("f", count)]));
        assert_eq!(valid, count >= 1, "count {}", count);
    }
}

#[test]
fn test_many_assignment_admits_any_count() {
    let validator = single_assignment(NodeSpec::assignment("f").many());
    for count in 0..6 {
        let (valid, _) = validate(&validator, &object_with("T", &[("f", count)]));
        assert!(valid, "count {}", count);
    }
}

#[test]
fn test_root_assignment_rule() {
    let mut b = ConstraintTree::builder("Bare");
    b.root(NodeSpec::assignment("f")).unwrap();
    let validator = seeded_validator(registry_for("T", vec![b.build().unwrap()]));

    assert!(validate(&validator, &object_with("T", &[("f", 1)])).0);
    assert!(!validate(&validator, &object_with("T", &[("f", 2)])).0);
}

#[test]
fn test_bounds_diagnostic_reports_field_and_counts() {
    let validator = single_assignment(NodeSpec::assignment("f"));
    let (_, diagnostics) = validate(&validator, &object_with("T", &[("f", 3)]));

    assert_eq!(diagnostics.len(), 1);
    let d = &diagnostics[0];
    assert_eq!(d.kind, DiagnosticKind::FeatureBounds);
    assert_eq!(d.rule, "Single");
    assert_eq!(d.field.as_deref(), Some("f"));
    assert_eq!(d.actual, Some(3));
    assert_eq!(d.min, Some(Count::Finite(1)));
    assert_eq!(d.max, Some(Count::Finite(1)));
}

fn alternative_rule() -> ConstraintTree {
    let mut b = ConstraintTree::builder("Choice");
    let alt = b.root(NodeSpec::alternative()).unwrap();
    b.child(alt, NodeSpec::assignment("a")).unwrap();
    b.child(alt, NodeSpec::assignment("b")).unwrap();
    b.build().unwrap()
}

#[test]
fn test_alternative_accepts_exactly_one_branch() {
    let validator = seeded_validator(registry_for("T", vec![alternative_rule()]));
    for a in 0..3 {
        for b in 0..3 {
            let (valid, _) = validate(&validator, &object_with("T", &[("a", a), ("b", b)]));
            let expected = (a, b) == (1, 0) || (a, b) == (0, 1);
            assert_eq!(valid, expected, "a={} b={}", a, b);
        }
    }
}

#[test]
fn test_both_branches_set_reports_the_alternative() {
    // (name (a | b))
    let mut b = ConstraintTree::builder("Keyed");
    let root = b.root(NodeSpec::group()).unwrap();
    b.child(root, NodeSpec::assignment("name")).unwrap();
    let alt = b.child(root, NodeSpec::alternative()).unwrap();
    let a = b.child(alt, NodeSpec::assignment("a")).unwrap();
    let bb = b.child(alt, NodeSpec::assignment("b")).unwrap();
    let validator = seeded_validator(registry_for("T", vec![b.build().unwrap()]));

    let obj = object_with("T", &[("name", 1), ("a", 1), ("b", 1)]);
    let (valid, diagnostics) = validate(&validator, &obj);

    assert!(!valid);
    assert_eq!(diagnostics.len(), 2);
    for d in &diagnostics {
        assert_eq!(d.kind, DiagnosticKind::FeatureBounds);
        assert_eq!(d.scope, Some(alt));
        assert_eq!(d.max, Some(Count::ZERO));
        assert!(d.nodes.contains(&a) && d.nodes.contains(&bb));
        assert_eq!(d.constraint, "(a | b)");
    }
}

fn split_rule(second: NodeSpec) -> ConstraintTree {
    group_rule("Split", |b, root| {
        b.child(root, NodeSpec::assignment("f")).unwrap();
        b.child(root, second).unwrap();
    })
}

#[test]
fn test_split_field_needs_both_assignments_filled() {
    let validator = seeded_validator(registry_for("T", vec![split_rule(NodeSpec::assignment("f"))]));

    assert!(validate(&validator, &object_with("T", &[("f", 2)])).0);
    for count in [0, 1, 3] {
        let (valid, diagnostics) = validate(&validator, &object_with("T", &[("f", count)]));
        assert!(!valid, "count {}", count);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].min, Some(Count::Finite(2)));
        assert_eq!(diagnostics[0].max, Some(Count::Finite(2)));
    }
}

#[test]
fn test_infeasible_split_reports_summed_bounds() {
    let validator = seeded_validator(registry_for("T", vec![split_rule(NodeSpec::assignment("f"))]));
    let (valid, diagnostics) = validate(&validator, &object_with("T", &[("f", 5)]));

    assert!(!valid);
    assert_eq!(diagnostics.len(), 1);
    let d = &diagnostics[0];
    assert_eq!(d.actual, Some(5));
    assert_eq!(d.min, Some(Count::Finite(2)));
    assert_eq!(d.max, Some(Count::Finite(2)));
}

#[test]
fn test_infeasible_split_terminates_under_tiny_budget() {
    let config = HeuristicConfig {
        base_tries: 1,
        no_improvement_floor: 0,
        ..HeuristicConfig::seeded(3)
    };
    let validator = Validator::new(registry_for("T", vec![split_rule(NodeSpec::assignment("f"))]))
        .with_config(config);

    let (valid, _) = validate(&validator, &object_with("T", &[("f", 40)]));
    assert!(!valid);
}

#[test]
fn test_split_with_repeatable_tail_absorbs_surplus() {
    let validator =
        seeded_validator(registry_for("T", vec![split_rule(NodeSpec::assignment("f").many())]));

    assert!(!validate(&validator, &object_with("T", &[("f", 0)])).0);
    for count in 1..8 {
        assert!(validate(&validator, &object_with("T", &[("f", count)])).0, "count {}", count);
    }
}

#[test]
fn test_repeated_group_keeps_members_in_step() {
    // (name (key value)*)
    let rule = group_rule("Pairs", |b, root| {
        b.child(root, NodeSpec::assignment("name")).unwrap();
        let pair = b.child(root, NodeSpec::group().many()).unwrap();
        b.child(pair, NodeSpec::assignment("key")).unwrap();
        b.child(pair, NodeSpec::assignment("value")).unwrap();
    });
    let validator = seeded_validator(registry_for("T", vec![rule]));

    let balanced = object_with("T", &[("name", 1), ("key", 3), ("value", 3)]);
    assert!(validate(&validator, &balanced).0);

    let empty = object_with("T", &[("name", 1), ("key", 0), ("value", 0)]);
    assert!(validate(&validator, &empty).0);

    let unbalanced = object_with("T", &[("name", 1), ("key", 3), ("value", 2)]);
    assert!(!validate(&validator, &unbalanced).0);
}

#[test]
fn test_optional_alternative_split_passes_for_every_seed() {
    // ((f? | f+)? f?)
    let rule = group_rule("Tail", |b, root| {
        let alt = b.child(root, NodeSpec::alternative().optional()).unwrap();
        b.child(alt, NodeSpec::assignment("f").optional()).unwrap();
        b.child(alt, NodeSpec::assignment("f").repeatable()).unwrap();
        b.child(root, NodeSpec::assignment("f").optional()).unwrap();
    });
    let obj = object_with("T", &[("f", 3)]);

    for seed in 0..40 {
        let validator = Validator::new(registry_for("T", vec![rule.clone()]))
            .with_config(HeuristicConfig::seeded(seed));
        let (valid, diagnostics) = validate(&validator, &obj);
        assert!(valid, "seed {}: {:?}", seed, diagnostics);
    }
}

#[test]
fn test_two_split_fields_pass_for_every_seed() {
    // ((f? | g | f+)? f? g+)
    let rule = group_rule("Mixed", |b, root| {
        let alt = b.child(root, NodeSpec::alternative().optional()).unwrap();
        b.child(alt, NodeSpec::assignment("f").optional()).unwrap();
        b.child(alt, NodeSpec::assignment("g")).unwrap();
        b.child(alt, NodeSpec::assignment("f").repeatable()).unwrap();
        b.child(root, NodeSpec::assignment("f").optional()).unwrap();
        b.child(root, NodeSpec::assignment("g").repeatable()).unwrap();
    });
    let obj = object_with("T", &[("f", 3), ("g", 1)]);

    for seed in 0..40 {
        let validator = Validator::new(registry_for("T", vec![rule.clone()]))
            .with_config(HeuristicConfig::seeded(seed));
        let (valid, diagnostics) = validate(&validator, &obj);
        assert!(valid, "seed {}: {:?}", seed, diagnostics);
    }
}

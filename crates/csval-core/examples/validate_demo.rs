//! Concrete syntax validation demo
//!
//! Builds the rules of a tiny entity language and validates a few objects
//! against them:
//!
//! ```text
//! Entity: name (extends=ID)? ('{' features+=Feature* '}')
//! Feature: ({Attribute} name type | {Reference} name target)
//! ```
//!
//! Run with `RUST_LOG=csval=debug` to see the distributor at work.

use csval_core::logging_facility::{init, Profile};
use csval_core::model::{ConstraintTree, NodeSpec};
use csval_core::{
    DynObject, FeatureInfo, RuleRegistry, SyntaxDiagnostic, ValidationContext, Validator, Value,
};

fn entity_rule() -> Result<ConstraintTree, Box<dyn std::error::Error>> {
    let mut b = ConstraintTree::builder("Entity");
    let root = b.root(NodeSpec::group())?;
    b.child(root, NodeSpec::assignment("name"))?;
    b.child(root, NodeSpec::assignment("extends").optional())?;
    b.child(root, NodeSpec::assignment("features").many())?;
    Ok(b.build()?)
}

fn feature_rule() -> Result<ConstraintTree, Box<dyn std::error::Error>> {
    let mut b = ConstraintTree::builder("Feature");
    let alt = b.root(NodeSpec::alternative())?;

    let attribute = b.child(alt, NodeSpec::group().guarded(["Attribute"]))?;
    b.child(attribute, NodeSpec::action().guarded(["Attribute"]))?;
    b.child(attribute, NodeSpec::assignment("name"))?;
    b.child(attribute, NodeSpec::assignment("type"))?;

    let reference = b.child(alt, NodeSpec::group().guarded(["Reference"]))?;
    b.child(reference, NodeSpec::action().guarded(["Reference"]))?;
    b.child(reference, NodeSpec::assignment("name"))?;
    b.child(reference, NodeSpec::assignment("target"))?;

    Ok(b.build()?)
}

fn attribute(name: &str, with_type: bool) -> DynObject {
    let obj = DynObject::new("Attribute")
        .with_feature(FeatureInfo::single("name"))
        .with_feature(FeatureInfo::single("type"))
        .with_value("name", Value::text(name));
    if with_type {
        obj.with_value("type", Value::text("String"))
    } else {
        obj
    }
}

fn reference(name: &str) -> DynObject {
    DynObject::new("Reference")
        .with_feature(FeatureInfo::single("name"))
        .with_feature(FeatureInfo::single("target"))
        .with_value("name", Value::text(name))
        .with_value("target", Value::text("Address"))
}

fn entity(name: &str, features: Vec<DynObject>) -> DynObject {
    features.into_iter().fold(
        DynObject::new("Entity")
            .with_feature(FeatureInfo::single("name"))
            .with_feature(FeatureInfo::single("extends"))
            .with_feature(FeatureInfo::many("features"))
            .with_value("name", Value::text(name)),
        |e, f| e.with_value("features", Value::object(f)),
    )
}

fn report(label: &str, valid: bool, diagnostics: &[SyntaxDiagnostic]) {
    println!("{}: {}", label, if valid { "valid" } else { "INVALID" });
    for d in diagnostics {
        println!("    {}", d);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init(Profile::Development);

    let mut registry = RuleRegistry::new();
    registry.register("Entity", entity_rule()?);
    let feature = registry.register("Attribute", feature_rule()?);
    registry.register_shared("Reference", feature);

    let validator = Validator::new(registry);
    let ctx = ValidationContext::with_new_request();

    println!("=== csval demo ===\n");

    let person = entity(
        "Person",
        vec![attribute("name", true), reference("address")],
    );
    let mut diagnostics = Vec::new();
    let valid = validator.validate_recursive(&person, &mut |d| diagnostics.push(d), &ctx)?;
    report("Person", valid, &diagnostics);

    let broken = entity("Broken", vec![attribute("age", false)]);
    let mut diagnostics = Vec::new();
    let valid = validator.validate_recursive(&broken, &mut |d| diagnostics.push(d), &ctx)?;
    report("Broken", valid, &diagnostics);

    let mut twice = entity("Twice", Vec::new());
    twice.push_value("name", Value::text("again"));
    let mut diagnostics = Vec::new();
    let valid = validator.validate_object(&twice, &mut |d| diagnostics.push(d), &ctx)?;
    report("Twice", valid, &diagnostics);

    Ok(())
}

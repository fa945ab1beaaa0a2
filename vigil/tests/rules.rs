//! Tests for rule registration.

use std::collections::BTreeSet;

use vigil::VigilError;
use vigil::rules::RuleRegistry;

#[test]
fn test_missing_async_rule_is_invalid_argument() {
    let registry = RuleRegistry::new();
    let result = registry.add_async_rule_boxed("Name", None);

    assert!(matches!(result, Err(VigilError::InvalidArgument(_))));
    assert!(registry.async_rules_for("Name").is_empty());
    assert!(registry.is_empty());
}

#[test]
fn test_blank_field_rejected() {
    let registry = RuleRegistry::new();

    assert!(matches!(
        registry.add_rule("", Vec::new),
        Err(VigilError::InvalidArgument(_))
    ));
    assert!(matches!(
        registry.add_rule("   ", Vec::new),
        Err(VigilError::InvalidArgument(_))
    ));
    assert!(matches!(
        registry.add_async_rule(" ", || async { Ok(Vec::new()) }),
        Err(VigilError::InvalidArgument(_))
    ));
    assert!(registry.is_empty());
}

#[test]
fn test_unknown_field_has_no_rules() {
    let registry = RuleRegistry::new();
    registry.add_rule("Name", Vec::new).unwrap();

    assert!(registry.rules_for("Email").is_empty());
    assert!(registry.async_rules_for("Email").is_empty());
    assert!(registry.async_rules_for("Name").is_empty());
}

#[test]
fn test_duplicate_rules_are_all_kept() {
    let registry = RuleRegistry::new();
    registry.add_rule("Name", Vec::new).unwrap();
    registry.add_rule("Name", Vec::new).unwrap();

    assert_eq!(registry.rules_for("Name").len(), 2);
}

#[test]
fn test_field_names_union_sync_and_async() {
    let registry = RuleRegistry::new();
    registry.add_rule("Name", Vec::new).unwrap();
    registry.add_rule("Email", Vec::new).unwrap();
    registry
        .add_async_rule("Name", || async { Ok(Vec::new()) })
        .unwrap();
    registry
        .add_async_rule("Code", || async { Ok(Vec::new()) })
        .unwrap();

    let expected: BTreeSet<String> = ["Code", "Email", "Name"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(registry.all_validated_field_names(), expected);
}

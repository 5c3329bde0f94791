mod common;

use common::*;
use element_query::conditions::{
    Condition, ConditionConfig, ConditionLoader, ConditionSettings, OverflowPolicy, RuleConfig,
    RuleNode,
};
use element_query::element_query::ElementQuery;
use element_query::models::ElementType;
use element_query::query_builder::CompareOp;
use element_query::registry::{PluginMetadata, PluginRegistry, RuleContext, RuleTypeRegistry};
use element_query::{EngineConfig, QueryError};
use serde_json::json;
use std::sync::Arc;

const SLUG_UID: &str = "0b5f2f7e-3c1a-4d7e-9a61-5d1f3c2e8a01";
const CUSTOM_UID: &str = "7c9e6679-7425-40de-944b-e07fc1f90ae7";

fn degraded_definition() -> String {
    json!({
        "elementType": "entry",
        "combinator": "and",
        "conditionRules": [
            {"type": "slug", "uid": SLUG_UID, "operator": "startsWith", "value": "foo"},
            {"type": "plugin-x:CustomRule", "uid": CUSTOM_UID, "operator": "contains", "value": "x"}
        ]
    })
    .to_string()
}

#[test]
fn test_or_condition_on_custom_field() {
    let mut condition = Condition::or();
    condition.add_condition_rule(price_rule(CompareOp::Lt, 10.0)).unwrap();
    condition.add_condition_rule(price_rule(CompareOp::Gt, 1000.0)).unwrap();

    assert!(condition.match_element(&entry(1).with_field("price", 5000)));
    assert!(!condition.match_element(&entry(2).with_field("price", 50)));
    assert!(condition.match_element(&entry(3).with_field("price", 5)));
    assert!(!condition.match_element(&entry(4)));
}

#[test]
fn test_or_condition_attaches_one_predicate() {
    let mut condition = Condition::or();
    condition.add_condition_rule(price_rule(CompareOp::Lt, 10.0)).unwrap();
    condition.add_condition_rule(price_rule(CompareOp::Gt, 1000.0)).unwrap();

    let mut query = ElementQuery::new(ElementType::Entry);
    query.attach_condition(condition).unwrap();
    let plan = query.compile().unwrap();

    // base element type predicate plus the single OR group
    assert_eq!(plan.where_clauses().len(), 2);
    assert!(plan
        .build_sql()
        .contains("content.field_price < 10 OR content.field_price > 1000"));
}

#[test]
fn test_degraded_load_keeps_usable_rules() {
    let registry = registry();
    let condition = ConditionLoader::new(&registry)
        .load_json(&degraded_definition(), None)
        .unwrap();

    assert_eq!(condition.rule_count(), 1);
    assert!(condition.is_degraded());
    assert_eq!(condition.diagnostics().len(), 1);
    assert_eq!(condition.diagnostics()[0].rule_type, "plugin-x:CustomRule");
    assert_eq!(condition.diagnostics()[0].uid.as_deref(), Some(CUSTOM_UID));

    assert!(condition.match_element(&entry(1).with_attribute("slug", "foo-1")));
}

#[test]
fn test_installed_plugin_resolves_rule() {
    let registry = registry();
    registry.install_provider(custom_rule_plugin()).unwrap();

    let condition = ConditionLoader::new(&registry)
        .load_json(&degraded_definition(), None)
        .unwrap();
    assert_eq!(condition.rule_count(), 2);
    assert!(!condition.is_degraded());

    let reloaded = ConditionLoader::new(&registry)
        .load_json(&condition.to_json().unwrap(), None)
        .unwrap();
    assert_eq!(reloaded.to_json().unwrap(), condition.to_json().unwrap());
    assert!(reloaded.match_element(
        &entry(1)
            .with_attribute("slug", "foo-1")
            .with_field("headline", "xyz")
    ));
}

#[test]
fn test_plugin_uninstall_degrades_later_loads() {
    let rule_types = Arc::new(registry());
    let plugins = PluginRegistry::new(Arc::clone(&rule_types));
    plugins
        .install_plugin(
            PluginMetadata::new("plugin-x", "2.1.0", "Custom headline rules"),
            custom_rule_plugin(),
        )
        .unwrap();

    let loader = ConditionLoader::new(&rule_types);
    assert!(!loader.load_json(&degraded_definition(), None).unwrap().is_degraded());

    plugins.uninstall_plugin("plugin-x").unwrap();
    assert!(loader.load_json(&degraded_definition(), None).unwrap().is_degraded());
    assert_eq!(plugins.stats().total_plugins, 0);
}

#[test]
fn test_degraded_rules_become_query_warnings() {
    let registry = registry();
    let config = ConditionConfig::from_json(&degraded_definition()).unwrap();

    let mut query = ElementQuery::new(ElementType::Entry);
    query.attach_condition_config(&config, &registry).unwrap();
    assert_eq!(query.warnings().len(), 1);
    assert!(query.warnings()[0].contains("plugin-x:CustomRule"));

    let sql = query.compile().unwrap().build_sql();
    assert!(sql.contains("elements.slug LIKE 'foo%'"));
}

#[test]
fn test_stored_element_type_must_match() {
    let registry = registry();
    let err = ConditionLoader::new(&registry)
        .load_json(&degraded_definition(), Some(ElementType::Asset))
        .unwrap_err();
    assert!(matches!(err, QueryError::Configuration { .. }));

    let untyped = json!({"combinator": "and", "conditionRules": []}).to_string();
    assert!(ConditionLoader::new(&registry).load_json(&untyped, None).is_err());
    assert!(ConditionLoader::new(&registry)
        .load_json(&untyped, Some(ElementType::Tag))
        .is_ok());
}

#[test]
fn test_invalid_operands_fail_load() {
    let registry = registry();
    let definition = json!({
        "elementType": "entry",
        "combinator": "and",
        "conditionRules": [{"type": "field:price", "operator": "between", "value": 10}]
    })
    .to_string();

    let err = ConditionLoader::new(&registry).load_json(&definition, None).unwrap_err();
    assert!(matches!(err, QueryError::Validation { ref field, .. } if field == "maxValue"));
}

#[test]
fn test_depth_limit_from_config() {
    let registry = RuleTypeRegistry::new();
    let config = EngineConfig {
        max_condition_depth: 2,
        ..EngineConfig::default()
    };

    let mut definition = json!({"combinator": "and", "conditionRules": []});
    for _ in 0..2 {
        definition = json!({"combinator": "or", "conditionRules": [definition]});
    }
    let err = ConditionLoader::with_config(&registry, &config)
        .load_value(&definition, Some(ElementType::Entry))
        .unwrap_err();
    assert!(matches!(err, QueryError::Validation { .. }));
}

#[test]
fn test_max_child_rules_overflow_policies() {
    let settings = ConditionSettings {
        max_child_rules: Some(1),
        ..ConditionSettings::default()
    };

    let mut discarding = Condition::or().with_settings(settings.clone());
    assert!(discarding.add_condition_rule(price_rule(CompareOp::Lt, 1.0)).unwrap());
    assert!(!discarding.add_condition_rule(price_rule(CompareOp::Gt, 9.0)).unwrap());
    assert_eq!(discarding.len(), 1);

    let mut rejecting = Condition::or().with_settings(ConditionSettings {
        overflow_policy: OverflowPolicy::Reject,
        ..settings
    });
    rejecting.add_condition_rule(price_rule(CompareOp::Lt, 1.0)).unwrap();
    assert!(matches!(
        rejecting.add_condition_rule(price_rule(CompareOp::Gt, 9.0)).unwrap_err(),
        QueryError::Configuration { .. }
    ));

    let json = rejecting.to_json().unwrap();
    assert!(json.contains(r#""overflowPolicy":"reject""#));
    assert!(!discarding.to_json().unwrap().contains("overflowPolicy"));
}

#[test]
fn test_nested_conditions_and_removal() {
    let mut inner = Condition::or();
    inner.add_condition_rule(price_rule(CompareOp::Lt, 10.0)).unwrap();
    let target = price_rule(CompareOp::Gt, 1000.0);
    let target_uid = target.uid();
    inner.add_condition_rule(target).unwrap();

    let mut outer = Condition::and().with_settings(ConditionSettings {
        min_child_rules: 1,
        ..ConditionSettings::default()
    });
    let inner_uid = inner.uid();
    outer.add_condition_rule(inner).unwrap();
    assert_eq!(outer.rule_count(), 2);

    let removed = outer.remove_condition_rule(target_uid).unwrap();
    assert!(matches!(removed, RuleNode::Rule(ref rule) if rule.uid() == target_uid));
    assert_eq!(outer.rule_count(), 1);

    assert!(outer.remove_condition_rule(inner_uid).is_err());
    assert!(outer.remove_condition_rule(target_uid).is_err());

    let mut flat = Condition::and().with_settings(ConditionSettings {
        allow_child_rules: false,
        ..ConditionSettings::default()
    });
    assert!(matches!(
        flat.add_condition_rule(Condition::or()).unwrap_err(),
        QueryError::Validation { .. }
    ));
}

#[test]
fn test_registry_lists_field_and_catalog_rules() {
    let registry = registry();
    let context = RuleContext::new(ElementType::Entry);
    let identifiers: Vec<String> = registry
        .rules_for(&context)
        .into_iter()
        .map(|descriptor| descriptor.identifier)
        .collect();

    for expected in ["slug", "section", "entryType", "field:price", "field:color", "field:relatedArticles"] {
        assert!(identifiers.contains(&expected.to_string()), "missing {expected}");
    }

    let config = RuleConfig::from_value(json!({"type": "section", "operator": "in", "values": ["5", "6"]}))
        .unwrap();
    let rule = registry.instantiate(&context, &config).unwrap();
    assert!(rule.match_element(&entry(1).with_attribute("sectionId", 6)));
}

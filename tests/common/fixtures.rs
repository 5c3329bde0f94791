//! Shared fixtures: a populated registry, a small entry catalog and a rule type
//! plugin used to exercise degraded loads.

#![allow(dead_code)]

use element_query::conditions::rule::{NumberOperator, NumberRule, RuleCategory, RuleKind, TextRule};
use element_query::conditions::ConditionRule;
use element_query::element_query::InMemoryStorage;
use element_query::models::{Catalog, CatalogEntry, Element, ElementType, FieldDefinition, FieldType, ValueSource};
use element_query::query_builder::CompareOp;
use element_query::registry::{RuleContext, RuleTypeDescriptor, RuleTypeProvider, RuleTypeRegistry, RuleTypeSink};
use element_query::Result;
use serde_json::Value;
use std::sync::Arc;

pub fn catalog() -> Catalog {
    Catalog::new()
        .with_section(CatalogEntry::new(5, "news", "News"))
        .with_section(CatalogEntry::new(6, "blog", "Blog"))
        .with_entry_type(CatalogEntry::new(1, "article", "Article"))
        .with_category_group(CatalogEntry::new(7, "topics", "Topics"))
        .with_volume(CatalogEntry::new(2, "uploads", "Uploads"))
}

pub fn entry_fields() -> Vec<FieldDefinition> {
    vec![
        FieldDefinition::new("price", "Price", FieldType::Number),
        FieldDefinition::new("summary", "Summary", FieldType::PlainText),
        FieldDefinition::new(
            "color",
            "Color",
            FieldType::Dropdown {
                options: vec!["red".into(), "green".into(), "blue".into()],
            },
        ),
        FieldDefinition::new("relatedArticles", "Related Articles", FieldType::Entries),
    ]
}

/// Registry with the catalog and entry field layout installed
pub fn registry() -> RuleTypeRegistry {
    element_query::logging::init_from_config(&element_query::EngineConfig::default());
    let registry = RuleTypeRegistry::with_catalog(catalog());
    registry
        .set_field_layout(ElementType::Entry, entry_fields())
        .unwrap();
    registry
}

/// Contributes `plugin-x:CustomRule`, a text rule on the `headline` field
pub struct CustomRulePlugin;

impl RuleTypeProvider for CustomRulePlugin {
    fn name(&self) -> &str {
        "plugin-x"
    }

    fn register_rule_types(&self, _: &RuleContext, sink: &mut RuleTypeSink) -> Result<()> {
        sink.register(RuleTypeDescriptor::new(
            "plugin-x:CustomRule",
            "Custom Rule",
            RuleCategory::Text,
            |_, operands| {
                Ok(RuleKind::Text(TextRule::from_operands(
                    ValueSource::field("headline"),
                    operands,
                )?))
            },
        ))
    }
}

pub fn custom_rule_plugin() -> Arc<dyn RuleTypeProvider> {
    Arc::new(CustomRulePlugin)
}

pub fn entry(id: i64) -> Element {
    Element::new(id, ElementType::Entry)
}

/// Twelve entries spread over two sections with varying slugs, prices and relations
pub fn sample_entries() -> Vec<Element> {
    (1..=12)
        .map(|id| {
            let mut element = entry(id)
                .with_attribute("sectionId", if id <= 6 { 5 } else { 6 })
                .with_attribute("section", if id <= 6 { "news" } else { "blog" })
                .with_attribute("status", if id % 3 == 0 { "disabled" } else { "live" })
                .with_attribute("slug", if id % 2 == 0 { format!("foo-{id}") } else { format!("bar-{id}") })
                .with_attribute("title", format!("Entry {id}"))
                .with_attribute("postDate", format!("2024-{:02}-01T00:00:00Z", id))
                .with_field("price", id * 100);
            if id % 4 == 0 {
                element = element.with_relation(100, Some("relatedArticles"));
            }
            if id % 5 == 0 {
                element = element.with_relation(200, None);
            }
            element
        })
        .collect()
}

pub fn storage() -> InMemoryStorage {
    InMemoryStorage::new(sample_entries())
}

/// Number rule on the `price` field
pub fn price_rule(op: CompareOp, value: f64) -> ConditionRule {
    ConditionRule::new(
        "field:price",
        RuleKind::Number(
            NumberRule::new(ValueSource::field("price"), NumberOperator::Compare(op), value, None)
                .unwrap(),
        ),
    )
    .with_exclusive_params(["price"])
}

pub fn ids(elements: &[Element]) -> Vec<i64> {
    elements.iter().map(|element| element.id).collect()
}

pub fn json_ids(rows: &[Value]) -> Vec<i64> {
    rows.iter().filter_map(|row| row["id"].as_i64()).collect()
}

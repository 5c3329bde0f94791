//! Proptest strategies for rule definitions and element populations

#![allow(dead_code)]

use element_query::constants::statuses;
use element_query::models::{Element, ElementType};
use proptest::prelude::*;
use proptest::strategy::Just;
use serde_json::{json, Value};

/// Generated attribute and field values of one entry
#[derive(Debug, Clone)]
pub struct EntrySpec {
    pub slug: Option<String>,
    pub status: Option<&'static str>,
    pub price: Option<Value>,
    pub post_date: Option<String>,
    pub relations: Vec<(i64, bool)>,
}

impl EntrySpec {
    pub fn build(&self, id: i64) -> Element {
        let mut element = Element::new(id, ElementType::Entry);
        if let Some(slug) = &self.slug {
            element = element.with_attribute("slug", slug.as_str());
        }
        if let Some(status) = self.status {
            element = element.with_attribute("status", status);
        }
        if let Some(price) = &self.price {
            element = element.with_field("price", price.clone());
        }
        if let Some(date) = &self.post_date {
            element = element.with_attribute("postDate", date.as_str());
        }
        for (target, through_field) in &self.relations {
            let field = through_field.then_some("relatedArticles");
            element = element.with_relation(*target, field);
        }
        element
    }
}

pub fn date_strategy() -> impl Strategy<Value = String> {
    (2020u32..=2025, 1u32..=12).prop_map(|(year, month)| format!("{year}-{month:02}-01T00:00:00Z"))
}

pub fn entry_spec_strategy() -> impl Strategy<Value = EntrySpec> {
    (
        prop::option::of("[a-c]{0,3}"),
        prop::option::of(prop::sample::select(statuses::ALL.to_vec())),
        prop::option::of(prop_oneof![
            (-50i64..50).prop_map(Value::from),
            Just(Value::Null),
            Just(json!("n/a")),
        ]),
        prop::option::of(date_strategy()),
        prop::collection::vec((1i64..=3, any::<bool>()), 0..3),
    )
        .prop_map(|(slug, status, price, post_date, relations)| EntrySpec {
            slug,
            status,
            price,
            post_date,
            relations,
        })
}

/// Entries with ids 1..=n
pub fn entries_strategy() -> impl Strategy<Value = Vec<Element>> {
    prop::collection::vec(entry_spec_strategy(), 0..24).prop_map(|specs| {
        specs
            .iter()
            .enumerate()
            .map(|(index, spec)| spec.build(index as i64 + 1))
            .collect()
    })
}

fn text_rule_strategy() -> impl Strategy<Value = Value> {
    (
        prop::sample::select(vec![
            "equals",
            "notEquals",
            "contains",
            "startsWith",
            "endsWith",
            "regex",
            "empty",
            "notEmpty",
        ]),
        "[a-c]{0,2}",
    )
        .prop_map(|(operator, value)| json!({"type": "slug", "operator": operator, "value": value}))
}

fn number_rule_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        (
            prop::sample::select(vec!["=", "!=", "<", "<=", ">", ">="]),
            -50i64..50
        )
            .prop_map(|(operator, value)| {
                json!({"type": "field:price", "operator": operator, "value": value})
            }),
        (-50i64..50, 0i64..40).prop_map(|(low, width)| {
            json!({"type": "field:price", "operator": "between", "value": low, "maxValue": low + width})
        }),
    ]
}

fn select_rule_strategy() -> impl Strategy<Value = Value> {
    (
        prop::sample::select(vec!["in", "notIn"]),
        prop::sample::subsequence(statuses::ALL.to_vec(), 0..4),
    )
        .prop_map(|(operator, values)| json!({"type": "status", "operator": operator, "values": values}))
}

fn date_rule_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        (prop::sample::select(vec!["before", "after"]), date_strategy())
            .prop_map(|(operator, date)| json!({"type": "postDate", "operator": operator, "date": date})),
        (date_strategy(), date_strategy()).prop_map(|(a, b)| {
            let (start, end) = if a <= b { (a, b) } else { (b, a) };
            json!({"type": "postDate", "operator": "between", "date": start, "endDate": end})
        }),
    ]
}

fn relation_rule_strategy() -> impl Strategy<Value = Value> {
    (
        prop::sample::select(vec!["relatedTo", "field:relatedArticles"]),
        prop::sample::subsequence(vec![1i64, 2, 3], 1..=3),
    )
        .prop_map(|(rule_type, targets)| json!({"type": rule_type, "targetIds": targets}))
}

/// A stored leaf rule of any built-in category
pub fn rule_config_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        text_rule_strategy(),
        number_rule_strategy(),
        select_rule_strategy(),
        date_rule_strategy(),
        relation_rule_strategy(),
    ]
}

//! Built-in rule types: those intrinsic to each element type and those contributed
//! by custom fields.

use super::rule::{DateRule, NumberRule, RelationRule, RuleCategory, RuleKind, SelectRule, TextRule};
use crate::constants::{criteria, file_kinds, rule_types, statuses};
use crate::models::{Catalog, ElementType, FieldDefinition, FieldType, ValueSource};
use crate::registry::{RuleSource, RuleTypeDescriptor};

fn text(identifier: &str, label: &str, source: ValueSource) -> RuleTypeDescriptor {
    RuleTypeDescriptor::new(identifier, label, RuleCategory::Text, move |_, operands| {
        Ok(RuleKind::Text(TextRule::from_operands(source.clone(), operands)?))
    })
}

fn number(identifier: &str, label: &str, source: ValueSource) -> RuleTypeDescriptor {
    RuleTypeDescriptor::new(identifier, label, RuleCategory::Number, move |_, operands| {
        Ok(RuleKind::Number(NumberRule::from_operands(source.clone(), operands)?))
    })
}

fn date(identifier: &str, label: &str, source: ValueSource) -> RuleTypeDescriptor {
    RuleTypeDescriptor::new(identifier, label, RuleCategory::Date, move |_, operands| {
        Ok(RuleKind::Date(DateRule::from_operands(source.clone(), operands)?))
    })
}

/// Select rule whose options are resolved when the rule is built
fn select<F>(identifier: &str, label: &str, source: ValueSource, options: F) -> RuleTypeDescriptor
where
    F: Fn(&Catalog) -> Vec<String> + Send + Sync + 'static,
{
    RuleTypeDescriptor::new(identifier, label, RuleCategory::Select, move |context, operands| {
        Ok(RuleKind::Select(SelectRule::from_operands(
            source.clone(),
            options(context.catalog),
            operands,
        )?))
    })
}

fn relation(identifier: &str, label: &str, field: Option<String>) -> RuleTypeDescriptor {
    RuleTypeDescriptor::new(identifier, label, RuleCategory::Relation, move |_, operands| {
        Ok(RuleKind::Relation(RelationRule::from_operands(
            field.as_deref(),
            operands,
        )?))
    })
}

fn fixed_options(options: &'static [&'static str]) -> impl Fn(&Catalog) -> Vec<String> + Send + Sync {
    move |_| options.iter().map(|option| option.to_string()).collect()
}

/// Rule types every element of `element_type` supports
pub fn element_type_rules(element_type: ElementType) -> Vec<RuleTypeDescriptor> {
    let mut rules = vec![
        number(rule_types::ID, "ID", ValueSource::attribute(criteria::ID))
            .with_exclusive_params(&[criteria::ID]),
        text(rule_types::SLUG, "Slug", ValueSource::attribute(criteria::SLUG))
            .with_exclusive_params(&[criteria::SLUG]),
        text(rule_types::TITLE, "Title", ValueSource::attribute(criteria::TITLE))
            .with_exclusive_params(&[criteria::TITLE]),
        select(
            rule_types::STATUS,
            "Status",
            ValueSource::attribute(criteria::STATUS),
            fixed_options(statuses::ALL),
        )
        .with_exclusive_params(&[criteria::STATUS]),
        date(
            rule_types::DATE_CREATED,
            "Date Created",
            ValueSource::attribute(criteria::DATE_CREATED),
        )
        .with_exclusive_params(&[criteria::DATE_CREATED]),
        date(
            rule_types::DATE_UPDATED,
            "Date Updated",
            ValueSource::attribute(criteria::DATE_UPDATED),
        )
        .with_exclusive_params(&[criteria::DATE_UPDATED]),
        relation(rule_types::RELATED_TO, "Related To", None)
            .with_exclusive_params(&[criteria::RELATED_TO]),
    ];

    match element_type {
        ElementType::Entry => rules.extend([
            select(
                rule_types::SECTION,
                "Section",
                ValueSource::attribute(criteria::SECTION_ID),
                |catalog| Catalog::option_values(&catalog.sections),
            )
            .with_exclusive_params(&[criteria::SECTION, criteria::SECTION_ID]),
            select(
                rule_types::ENTRY_TYPE,
                "Entry Type",
                ValueSource::attribute(criteria::TYPE_ID),
                |catalog| Catalog::option_values(&catalog.entry_types),
            )
            .with_exclusive_params(&[criteria::TYPE, criteria::TYPE_ID]),
            number(
                rule_types::AUTHOR,
                "Author",
                ValueSource::attribute(criteria::AUTHOR_ID),
            )
            .with_exclusive_params(&[criteria::AUTHOR_ID]),
            date(
                rule_types::POST_DATE,
                "Post Date",
                ValueSource::attribute(criteria::POST_DATE),
            )
            .with_exclusive_params(&[criteria::POST_DATE]),
        ]),
        ElementType::Category => rules.push(
            select(
                rule_types::CATEGORY_GROUP,
                "Category Group",
                ValueSource::attribute(criteria::GROUP_ID),
                |catalog| Catalog::option_values(&catalog.category_groups),
            )
            .with_exclusive_params(&[criteria::GROUP, criteria::GROUP_ID]),
        ),
        ElementType::Tag => rules.push(
            select(
                rule_types::TAG_GROUP,
                "Tag Group",
                ValueSource::attribute(criteria::GROUP_ID),
                |catalog| Catalog::option_values(&catalog.tag_groups),
            )
            .with_exclusive_params(&[criteria::GROUP, criteria::GROUP_ID]),
        ),
        ElementType::Asset => rules.extend([
            select(
                rule_types::VOLUME,
                "Volume",
                ValueSource::attribute(criteria::VOLUME_ID),
                |catalog| Catalog::option_values(&catalog.volumes),
            )
            .with_exclusive_params(&[criteria::VOLUME, criteria::VOLUME_ID]),
            select(
                rule_types::FILE_KIND,
                "File Kind",
                ValueSource::attribute(criteria::KIND),
                fixed_options(file_kinds::ALL),
            )
            .with_exclusive_params(&[criteria::KIND]),
            text(
                rule_types::FILENAME,
                "Filename",
                ValueSource::attribute(criteria::FILENAME),
            )
            .with_exclusive_params(&[criteria::FILENAME]),
        ]),
        ElementType::User => rules.extend([
            text(rule_types::EMAIL, "Email", ValueSource::attribute(criteria::EMAIL))
                .with_exclusive_params(&[criteria::EMAIL]),
            text(
                rule_types::USERNAME,
                "Username",
                ValueSource::attribute(criteria::USERNAME),
            )
            .with_exclusive_params(&[criteria::USERNAME]),
        ]),
    }

    rules
}

/// Rule types contributed by one custom field, identified as `field:<handle>`
pub fn field_rules(field: &FieldDefinition) -> Vec<RuleTypeDescriptor> {
    let identifier = format!("{}{}", rule_types::FIELD_PREFIX, field.handle);
    let source = ValueSource::field(field.handle.clone());

    let descriptor = match &field.field_type {
        FieldType::PlainText => text(&identifier, &field.name, source),
        FieldType::Number => number(&identifier, &field.name, source),
        FieldType::Date => date(&identifier, &field.name, source),
        FieldType::Dropdown { options } => {
            let options = options.clone();
            select(&identifier, &field.name, source, move |_| options.clone())
        }
        FieldType::Entries | FieldType::Categories => {
            relation(&identifier, &field.name, Some(field.handle.clone()))
        }
    };

    vec![descriptor
        .with_exclusive_params(&[field.handle.as_str()])
        .with_source(RuleSource::Field(field.handle.clone()))]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CatalogEntry, Element};
    use crate::registry::FactoryContext;
    use serde_json::json;

    fn build(descriptor: &RuleTypeDescriptor, catalog: &Catalog, operands: serde_json::Value) -> crate::error::Result<crate::conditions::ConditionRule> {
        let context = FactoryContext {
            element_type: ElementType::Entry,
            catalog,
        };
        descriptor.build(&context, None, operands.as_object().unwrap())
    }

    #[test]
    fn test_element_type_rule_sets() {
        let ids = |element_type| {
            element_type_rules(element_type)
                .into_iter()
                .map(|descriptor| descriptor.identifier)
                .collect::<Vec<_>>()
        };

        let entry = ids(ElementType::Entry);
        assert!(entry.contains(&"section".to_string()));
        assert!(entry.contains(&"relatedTo".to_string()));
        assert!(!entry.contains(&"categoryGroup".to_string()));

        assert!(ids(ElementType::Category).contains(&"categoryGroup".to_string()));
        assert!(ids(ElementType::Asset).contains(&"fileKind".to_string()));
        assert!(ids(ElementType::User).contains(&"email".to_string()));
    }

    #[test]
    fn test_section_claims_both_criteria() {
        let section = element_type_rules(ElementType::Entry)
            .into_iter()
            .find(|descriptor| descriptor.identifier == rule_types::SECTION)
            .unwrap();
        assert_eq!(section.exclusive_query_params, vec!["section", "sectionId"]);

        let catalog = Catalog::new().with_section(CatalogEntry::new(5, "news", "News"));
        let rule = build(&section, &catalog, json!({"values": ["5"]})).unwrap();
        assert!(rule.match_element(&Element::new(1, ElementType::Entry).with_attribute("sectionId", 5)));
        assert!(build(&section, &catalog, json!({"values": ["6"]})).is_err());
    }

    #[test]
    fn test_field_rules_follow_field_type() {
        let price = FieldDefinition::new("price", "Price", FieldType::Number);
        let descriptors = field_rules(&price);
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].identifier, "field:price");
        assert_eq!(descriptors[0].category, RuleCategory::Number);
        assert_eq!(descriptors[0].source, RuleSource::Field("price".into()));

        let related = FieldDefinition::new("relatedArticles", "Related", FieldType::Entries);
        let descriptor = &field_rules(&related)[0];
        let rule = build(descriptor, &Catalog::new(), json!({"targetIds": [9]})).unwrap();
        assert!(rule.match_element(
            &Element::new(1, ElementType::Entry).with_relation(9, Some("relatedArticles"))
        ));
        assert!(!rule.match_element(&Element::new(2, ElementType::Entry).with_relation(9, None)));

        let color = FieldDefinition::new(
            "color",
            "Color",
            FieldType::Dropdown {
                options: vec!["red".into(), "blue".into()],
            },
        );
        let descriptor = &field_rules(&color)[0];
        assert!(build(descriptor, &Catalog::new(), json!({"values": ["red"]})).is_ok());
        assert!(build(descriptor, &Catalog::new(), json!({"values": ["green"]})).is_err());
    }
}

//! # Condition Rules
//!
//! Leaf predicates of a condition tree. Every rule can add its constraint to a
//! [`QueryPlan`] and evaluate the same constraint directly against an [`Element`];
//! both paths apply identical operator semantics, including treating a missing value
//! as a non-match.

use super::serialization::RuleConfig;
use crate::element_query::relations::RelationExpr;
use crate::error::{QueryError, Result};
use crate::models::{Element, ElementType, ValueSource};
use crate::query_builder::conditions::{date_of, is_empty_value, number_of, text_of};
use crate::query_builder::{escape_like, ColumnRef, CompareOp, Operand, Predicate, QueryPlan};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

const OPERATOR: &str = "operator";
const VALUE: &str = "value";
const MAX_VALUE: &str = "maxValue";
const VALUES: &str = "values";
const DATE: &str = "date";
const END_DATE: &str = "endDate";
const TARGET_IDS: &str = "targetIds";

/// Value category of a rule type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleCategory {
    Text,
    Number,
    Select,
    Date,
    Relation,
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Number => write!(f, "number"),
            Self::Select => write!(f, "select"),
            Self::Date => write!(f, "date"),
            Self::Relation => write!(f, "relation"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextOperator {
    Equals,
    NotEquals,
    Contains,
    StartsWith,
    EndsWith,
    Regex,
    Empty,
    NotEmpty,
}

impl TextOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "notEquals",
            Self::Contains => "contains",
            Self::StartsWith => "startsWith",
            Self::EndsWith => "endsWith",
            Self::Regex => "regex",
            Self::Empty => "empty",
            Self::NotEmpty => "notEmpty",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "equals" => Self::Equals,
            "notEquals" => Self::NotEquals,
            "contains" => Self::Contains,
            "startsWith" => Self::StartsWith,
            "endsWith" => Self::EndsWith,
            "regex" => Self::Regex,
            "empty" => Self::Empty,
            "notEmpty" => Self::NotEmpty,
            _ => return None,
        })
    }

    fn takes_value(&self) -> bool {
        !matches!(self, Self::Empty | Self::NotEmpty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberOperator {
    Compare(CompareOp),
    Between,
}

impl NumberOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compare(op) => op.to_sql(),
            Self::Between => "between",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "=" => Self::Compare(CompareOp::Eq),
            "!=" => Self::Compare(CompareOp::Ne),
            "<" => Self::Compare(CompareOp::Lt),
            "<=" => Self::Compare(CompareOp::Lte),
            ">" => Self::Compare(CompareOp::Gt),
            ">=" => Self::Compare(CompareOp::Gte),
            "between" => Self::Between,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectOperator {
    In,
    NotIn,
}

impl SelectOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::NotIn => "notIn",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in" => Some(Self::In),
            "notIn" => Some(Self::NotIn),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateOperator {
    Before,
    After,
    Between,
}

impl DateOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
            Self::Between => "between",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "before" => Some(Self::Before),
            "after" => Some(Self::After),
            "between" => Some(Self::Between),
            _ => None,
        }
    }
}

/// Text comparison against an attribute or field
#[derive(Debug, Clone, PartialEq)]
pub struct TextRule {
    pub source: ValueSource,
    pub operator: TextOperator,
    pub value: String,
}

impl TextRule {
    pub fn new(source: ValueSource, operator: TextOperator, value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if operator == TextOperator::Regex {
            regex::Regex::new(&value).map_err(|e| {
                QueryError::validation(VALUE, format!("invalid regular expression: {e}"))
            })?;
        }
        Ok(Self {
            source,
            operator,
            value,
        })
    }

    pub fn from_operands(source: ValueSource, operands: &Map<String, Value>) -> Result<Self> {
        let operator = parse_operator(operands, TextOperator::Equals, TextOperator::parse)?;
        let value = match operands.get(VALUE) {
            Some(value) => text_of(value)
                .ok_or_else(|| QueryError::validation(VALUE, "expected a text value"))?,
            None if operator.takes_value() => {
                return Err(QueryError::validation(
                    VALUE,
                    format!("operator '{}' requires a value", operator.as_str()),
                ))
            }
            None => String::new(),
        };
        Self::new(source, operator, value)
    }

    fn predicate(&self, element_type: ElementType) -> Predicate {
        let column = ColumnRef::for_source(element_type, &self.source);
        let escaped = escape_like(&self.value);
        let like = |pattern: String| Predicate::Like {
            column: column.clone(),
            pattern,
            negated: false,
        };
        match self.operator {
            TextOperator::Equals => {
                Predicate::compare(column.clone(), CompareOp::Eq, self.value.as_str())
            }
            TextOperator::NotEquals => {
                Predicate::compare(column.clone(), CompareOp::Ne, self.value.as_str())
            }
            TextOperator::Contains => like(format!("%{escaped}%")),
            TextOperator::StartsWith => like(format!("{escaped}%")),
            TextOperator::EndsWith => like(format!("%{escaped}")),
            TextOperator::Regex => Predicate::Regex {
                column: column.clone(),
                pattern: self.value.clone(),
            },
            TextOperator::Empty => Predicate::Empty {
                column: column.clone(),
            },
            TextOperator::NotEmpty => Predicate::NotEmpty {
                column: column.clone(),
            },
        }
    }

    fn matches(&self, element: &Element) -> bool {
        let Some(raw) = element.value(&self.source) else {
            return false;
        };
        match self.operator {
            TextOperator::Empty => return is_empty_value(&raw),
            TextOperator::NotEmpty => return !is_empty_value(&raw),
            _ => {}
        }
        let Some(text) = text_of(&raw) else {
            return false;
        };
        match self.operator {
            TextOperator::Equals => text == self.value,
            TextOperator::NotEquals => text != self.value,
            TextOperator::Contains => text.contains(&self.value),
            TextOperator::StartsWith => text.starts_with(&self.value),
            TextOperator::EndsWith => text.ends_with(&self.value),
            TextOperator::Regex => {
                regex::Regex::new(&self.value).is_ok_and(|re| re.is_match(&text))
            }
            TextOperator::Empty | TextOperator::NotEmpty => false,
        }
    }

    fn operands(&self) -> Map<String, Value> {
        let mut operands = Map::new();
        operands.insert(OPERATOR.into(), Value::from(self.operator.as_str()));
        if self.operator.takes_value() {
            operands.insert(VALUE.into(), Value::from(self.value.clone()));
        }
        operands
    }
}

/// Numeric comparison or range
#[derive(Debug, Clone, PartialEq)]
pub struct NumberRule {
    pub source: ValueSource,
    pub operator: NumberOperator,
    pub value: f64,
    pub max_value: Option<f64>,
}

impl NumberRule {
    pub fn new(source: ValueSource, operator: NumberOperator, value: f64, max_value: Option<f64>) -> Result<Self> {
        if operator == NumberOperator::Between {
            let max = max_value.ok_or_else(|| {
                QueryError::validation(MAX_VALUE, "between requires both bounds")
            })?;
            if max < value {
                return Err(QueryError::validation(
                    MAX_VALUE,
                    "upper bound must not be below the lower bound",
                ));
            }
        }
        Ok(Self {
            source,
            operator,
            value,
            max_value: if operator == NumberOperator::Between { max_value } else { None },
        })
    }

    pub fn from_operands(source: ValueSource, operands: &Map<String, Value>) -> Result<Self> {
        let operator = parse_operator(
            operands,
            NumberOperator::Compare(CompareOp::Eq),
            NumberOperator::parse,
        )?;
        let value = operands
            .get(VALUE)
            .ok_or_else(|| QueryError::validation(VALUE, "a number is required"))?;
        let value = number_of(value).ok_or_else(|| QueryError::validation(VALUE, "not a number"))?;
        let max_value = match operands.get(MAX_VALUE) {
            Some(Value::Null) | None => None,
            Some(max) => Some(
                number_of(max).ok_or_else(|| QueryError::validation(MAX_VALUE, "not a number"))?,
            ),
        };
        Self::new(source, operator, value, max_value)
    }

    fn predicate(&self, element_type: ElementType) -> Predicate {
        let column = ColumnRef::for_source(element_type, &self.source);
        match (self.operator, self.max_value) {
            (NumberOperator::Between, Some(max)) => Predicate::Between {
                column,
                start: Operand::Number(self.value),
                end: Operand::Number(max),
            },
            (NumberOperator::Compare(op), _) => Predicate::compare(column, op, self.value),
            (NumberOperator::Between, None) => Predicate::never(),
        }
    }

    fn matches(&self, element: &Element) -> bool {
        let Some(number) = element.value(&self.source).as_ref().and_then(number_of) else {
            return false;
        };
        match (self.operator, self.max_value) {
            (NumberOperator::Between, Some(max)) => number >= self.value && number <= max,
            (NumberOperator::Compare(op), _) => number
                .partial_cmp(&self.value)
                .is_some_and(|ordering| op.test(ordering)),
            (NumberOperator::Between, None) => false,
        }
    }

    fn operands(&self) -> Map<String, Value> {
        let mut operands = Map::new();
        operands.insert(OPERATOR.into(), Value::from(self.operator.as_str()));
        operands.insert(VALUE.into(), number_value(self.value));
        if let Some(max) = self.max_value {
            operands.insert(MAX_VALUE.into(), number_value(max));
        }
        operands
    }
}

/// Membership in a closed option set
#[derive(Debug, Clone, PartialEq)]
pub struct SelectRule {
    pub source: ValueSource,
    pub operator: SelectOperator,
    pub values: Vec<String>,
    /// Options offered when the rule was built; not serialized
    pub options: Vec<String>,
}

impl SelectRule {
    pub fn new(
        source: ValueSource,
        operator: SelectOperator,
        values: Vec<String>,
        options: Vec<String>,
    ) -> Result<Self> {
        if let Some(unknown) = values.iter().find(|value| !options.contains(value)) {
            return Err(QueryError::validation(
                VALUES,
                format!("'{unknown}' is not one of the available options"),
            ));
        }
        Ok(Self {
            source,
            operator,
            values,
            options,
        })
    }

    pub fn from_operands(
        source: ValueSource,
        options: Vec<String>,
        operands: &Map<String, Value>,
    ) -> Result<Self> {
        let operator = parse_operator(operands, SelectOperator::In, SelectOperator::parse)?;
        let values = match operands.get(VALUES) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    text_of(item).ok_or_else(|| {
                        QueryError::validation(VALUES, "option values must be text or numbers")
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            Some(other) => vec![text_of(other).ok_or_else(|| {
                QueryError::validation(VALUES, "option values must be text or numbers")
            })?],
        };
        Self::new(source, operator, values, options)
    }

    fn predicate(&self, element_type: ElementType) -> Predicate {
        let column = ColumnRef::for_source(element_type, &self.source);
        let values = self.values.iter().cloned().map(Operand::Text).collect();
        match self.operator {
            SelectOperator::In => Predicate::In { column, values },
            SelectOperator::NotIn => Predicate::NotIn { column, values },
        }
    }

    fn matches(&self, element: &Element) -> bool {
        let Some(raw) = element.value(&self.source) else {
            return false;
        };
        let text = text_of(&raw);
        match self.operator {
            SelectOperator::In => text.is_some_and(|t| self.values.contains(&t)),
            SelectOperator::NotIn => {
                !raw.is_null() && text.map_or(true, |t| !self.values.contains(&t))
            }
        }
    }

    fn operands(&self) -> Map<String, Value> {
        let mut operands = Map::new();
        operands.insert(OPERATOR.into(), Value::from(self.operator.as_str()));
        operands.insert(
            VALUES.into(),
            Value::Array(self.values.iter().cloned().map(Value::from).collect()),
        );
        operands
    }
}

/// Date comparison or range
#[derive(Debug, Clone, PartialEq)]
pub struct DateRule {
    pub source: ValueSource,
    pub operator: DateOperator,
    pub date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
}

impl DateRule {
    pub fn new(
        source: ValueSource,
        operator: DateOperator,
        date: DateTime<Utc>,
        end_date: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        if operator == DateOperator::Between {
            let end = end_date
                .ok_or_else(|| QueryError::validation(END_DATE, "between requires both dates"))?;
            if end < date {
                return Err(QueryError::validation(
                    END_DATE,
                    "end date must not be before the start date",
                ));
            }
        }
        Ok(Self {
            source,
            operator,
            date,
            end_date: if operator == DateOperator::Between { end_date } else { None },
        })
    }

    pub fn from_operands(source: ValueSource, operands: &Map<String, Value>) -> Result<Self> {
        let operator = parse_operator(operands, DateOperator::After, DateOperator::parse)?;
        let date = operands
            .get(DATE)
            .ok_or_else(|| QueryError::validation(DATE, "a date is required"))?;
        let date = date_of(date)
            .ok_or_else(|| QueryError::validation(DATE, "expected an RFC 3339 date"))?;
        let end_date = match operands.get(END_DATE) {
            None | Some(Value::Null) => None,
            Some(end) => Some(
                date_of(end)
                    .ok_or_else(|| QueryError::validation(END_DATE, "expected an RFC 3339 date"))?,
            ),
        };
        Self::new(source, operator, date, end_date)
    }

    fn predicate(&self, element_type: ElementType) -> Predicate {
        let column = ColumnRef::for_source(element_type, &self.source);
        match (self.operator, self.end_date) {
            (DateOperator::Before, _) => Predicate::compare(column, CompareOp::Lt, self.date),
            (DateOperator::After, _) => Predicate::compare(column, CompareOp::Gt, self.date),
            (DateOperator::Between, Some(end)) => Predicate::Between {
                column,
                start: Operand::Date(self.date),
                end: Operand::Date(end),
            },
            (DateOperator::Between, None) => Predicate::never(),
        }
    }

    fn matches(&self, element: &Element) -> bool {
        let Some(date) = element.value(&self.source).as_ref().and_then(date_of) else {
            return false;
        };
        match (self.operator, self.end_date) {
            (DateOperator::Before, _) => date.cmp(&self.date) == Ordering::Less,
            (DateOperator::After, _) => date.cmp(&self.date) == Ordering::Greater,
            (DateOperator::Between, Some(end)) => date >= self.date && date <= end,
            (DateOperator::Between, None) => false,
        }
    }

    fn operands(&self) -> Map<String, Value> {
        let mut operands = Map::new();
        operands.insert(OPERATOR.into(), Value::from(self.operator.as_str()));
        operands.insert(DATE.into(), Value::from(self.date.to_rfc3339()));
        if let Some(end) = self.end_date {
            operands.insert(END_DATE.into(), Value::from(end.to_rfc3339()));
        }
        operands
    }
}

/// Related to any of a set of elements, optionally through one relation field
#[derive(Debug, Clone, PartialEq)]
pub struct RelationRule {
    pub target_ids: Vec<i64>,
    pub field: Option<String>,
}

impl RelationRule {
    pub fn new(target_ids: Vec<i64>, field: Option<String>) -> Result<Self> {
        if target_ids.is_empty() {
            return Err(QueryError::validation(
                TARGET_IDS,
                "at least one related element is required",
            ));
        }
        Ok(Self { target_ids, field })
    }

    pub fn from_operands(field: Option<&str>, operands: &Map<String, Value>) -> Result<Self> {
        let ids = match operands.get(TARGET_IDS) {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    number_of(item)
                        .filter(|n| n.fract() == 0.0)
                        .map(|n| n as i64)
                        .ok_or_else(|| QueryError::validation(TARGET_IDS, "ids must be integers"))
                })
                .collect::<Result<Vec<_>>>()?,
            Some(single) => vec![number_of(single)
                .filter(|n| n.fract() == 0.0)
                .map(|n| n as i64)
                .ok_or_else(|| QueryError::validation(TARGET_IDS, "ids must be integers"))?],
            None => Vec::new(),
        };
        Self::new(ids, field.map(str::to_string))
    }

    fn expression(&self) -> RelationExpr {
        match &self.field {
            Some(field) => RelationExpr::through_field(self.target_ids.iter().copied(), field),
            None => RelationExpr::any_of(self.target_ids.iter().copied()),
        }
    }

    fn matches(&self, element: &Element) -> bool {
        element.is_related_to(&self.target_ids, self.field.as_deref())
    }

    fn operands(&self) -> Map<String, Value> {
        let mut operands = Map::new();
        operands.insert(
            TARGET_IDS.into(),
            Value::Array(self.target_ids.iter().copied().map(Value::from).collect()),
        );
        operands
    }
}

/// The category-specific body of a rule
#[derive(Debug, Clone, PartialEq)]
pub enum RuleKind {
    Text(TextRule),
    Number(NumberRule),
    Select(SelectRule),
    Date(DateRule),
    Relation(RelationRule),
}

impl RuleKind {
    pub fn category(&self) -> RuleCategory {
        match self {
            Self::Text(_) => RuleCategory::Text,
            Self::Number(_) => RuleCategory::Number,
            Self::Select(_) => RuleCategory::Select,
            Self::Date(_) => RuleCategory::Date,
            Self::Relation(_) => RuleCategory::Relation,
        }
    }

    pub fn predicate(&self, element_type: ElementType) -> Predicate {
        match self {
            Self::Text(rule) => rule.predicate(element_type),
            Self::Number(rule) => rule.predicate(element_type),
            Self::Select(rule) => rule.predicate(element_type),
            Self::Date(rule) => rule.predicate(element_type),
            Self::Relation(rule) => Predicate::Related(rule.expression()),
        }
    }

    pub fn matches(&self, element: &Element) -> bool {
        match self {
            Self::Text(rule) => rule.matches(element),
            Self::Number(rule) => rule.matches(element),
            Self::Select(rule) => rule.matches(element),
            Self::Date(rule) => rule.matches(element),
            Self::Relation(rule) => rule.matches(element),
        }
    }

    pub fn operands(&self) -> Map<String, Value> {
        match self {
            Self::Text(rule) => rule.operands(),
            Self::Number(rule) => rule.operands(),
            Self::Select(rule) => rule.operands(),
            Self::Date(rule) => rule.operands(),
            Self::Relation(rule) => rule.operands(),
        }
    }
}

/// A leaf rule: identity, rule type and the params it claims on a query
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionRule {
    uid: Uuid,
    rule_type: String,
    kind: RuleKind,
    exclusive_query_params: BTreeSet<String>,
}

impl ConditionRule {
    pub fn new(rule_type: impl Into<String>, kind: RuleKind) -> Self {
        Self {
            uid: Uuid::new_v4(),
            rule_type: rule_type.into(),
            kind,
            exclusive_query_params: BTreeSet::new(),
        }
    }

    pub fn with_uid(mut self, uid: Uuid) -> Self {
        self.uid = uid;
        self
    }

    /// Criterion names this rule is equivalent to
    pub fn with_exclusive_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclusive_query_params = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn uid(&self) -> Uuid {
        self.uid
    }

    pub fn rule_type(&self) -> &str {
        &self.rule_type
    }

    pub fn kind(&self) -> &RuleKind {
        &self.kind
    }

    pub fn category(&self) -> RuleCategory {
        self.kind.category()
    }

    pub fn exclusive_query_params(&self) -> &BTreeSet<String> {
        &self.exclusive_query_params
    }

    pub fn predicate(&self, element_type: ElementType) -> Predicate {
        self.kind.predicate(element_type)
    }

    /// Add this rule's constraint to the plan. Meant to be called once per compile.
    pub fn modify_query(&self, plan: &mut QueryPlan) {
        plan.where_clause(self.predicate(plan.element_type()));
    }

    pub fn match_element(&self, element: &Element) -> bool {
        self.kind.matches(element)
    }

    pub fn to_config(&self) -> RuleConfig {
        RuleConfig {
            rule_type: self.rule_type.clone(),
            uid: Some(self.uid.to_string()),
            operands: self.kind.operands(),
        }
    }
}

fn parse_operator<T>(
    operands: &Map<String, Value>,
    default: T,
    parse: fn(&str) -> Option<T>,
) -> Result<T> {
    match operands.get(OPERATOR) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::String(s)) => parse(s)
            .ok_or_else(|| QueryError::validation(OPERATOR, format!("unknown operator '{s}'"))),
        Some(_) => Err(QueryError::validation(OPERATOR, "operator must be a string")),
    }
}

/// Integral values serialize without a fractional part
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn operands(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn price_rule(op: &str, value: f64) -> ConditionRule {
        let kind = RuleKind::Number(
            NumberRule::from_operands(
                ValueSource::field("price"),
                &operands(json!({"operator": op, "value": value})),
            )
            .unwrap(),
        );
        ConditionRule::new("field:price", kind).with_exclusive_params(["price"])
    }

    #[test]
    fn test_text_rule_predicate_and_match() {
        let rule = TextRule::from_operands(
            ValueSource::attribute("slug"),
            &operands(json!({"operator": "startsWith", "value": "foo"})),
        )
        .unwrap();
        let kind = RuleKind::Text(rule);

        assert_eq!(
            kind.predicate(ElementType::Entry).to_sql(),
            "elements.slug LIKE 'foo%'"
        );
        let matching = Element::new(1, ElementType::Entry).with_attribute("slug", "foo-bar");
        let other = Element::new(2, ElementType::Entry).with_attribute("slug", "bar-foo");
        assert!(kind.matches(&matching));
        assert!(!kind.matches(&other));
        assert!(!kind.matches(&Element::new(3, ElementType::Entry)));
    }

    #[test]
    fn test_invalid_operands_name_the_field() {
        let err = NumberRule::from_operands(
            ValueSource::field("price"),
            &operands(json!({"operator": ">", "value": "lots"})),
        )
        .unwrap_err();
        assert_eq!(err, QueryError::validation("value", "not a number"));

        let err = NumberRule::from_operands(
            ValueSource::field("price"),
            &operands(json!({"operator": "between", "value": 10})),
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::Validation { ref field, .. } if field == "maxValue"));

        let err = TextRule::from_operands(
            ValueSource::attribute("title"),
            &operands(json!({"operator": "regex", "value": "("})),
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::Validation { ref field, .. } if field == "value"));

        let err = SelectRule::from_operands(
            ValueSource::attribute("groupId"),
            vec!["1".into(), "2".into()],
            &operands(json!({"values": [3]})),
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::Validation { ref field, .. } if field == "values"));

        let err = DateRule::from_operands(
            ValueSource::attribute("postDate"),
            &operands(json!({"operator": "before", "date": "yesterday"})),
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::Validation { ref field, .. } if field == "date"));
    }

    #[test]
    fn test_number_rule_match() {
        let rule = price_rule(">", 1000.0);
        assert!(rule.match_element(&Element::new(1, ElementType::Entry).with_field("price", 5000)));
        assert!(!rule.match_element(&Element::new(2, ElementType::Entry).with_field("price", 50)));
        assert!(!rule.match_element(&Element::new(3, ElementType::Entry)));
        assert!(rule.exclusive_query_params().contains("price"));
    }

    #[test]
    fn test_select_rule_semantics() {
        let rule = SelectRule::from_operands(
            ValueSource::attribute("groupId"),
            vec!["1".into(), "2".into()],
            &operands(json!({"operator": "notIn", "values": ["1"]})),
        )
        .unwrap();
        let kind = RuleKind::Select(rule);
        assert_eq!(
            kind.predicate(ElementType::Category).to_sql(),
            "categories.groupId NOT IN ('1')"
        );
        assert!(kind.matches(&Element::new(1, ElementType::Category).with_attribute("groupId", 2)));
        assert!(!kind.matches(&Element::new(2, ElementType::Category).with_attribute("groupId", 1)));
        assert!(!kind.matches(&Element::new(3, ElementType::Category).with_attribute("groupId", Value::Null)));
    }

    #[test]
    fn test_date_between() {
        let rule = DateRule::from_operands(
            ValueSource::attribute("postDate"),
            &operands(json!({
                "operator": "between",
                "date": "2024-01-01T00:00:00Z",
                "endDate": "2024-06-30T00:00:00Z"
            })),
        )
        .unwrap();
        let kind = RuleKind::Date(rule);
        let inside = Element::new(1, ElementType::Entry)
            .with_attribute("postDate", "2024-03-01T12:00:00Z");
        let outside = Element::new(2, ElementType::Entry)
            .with_attribute("postDate", "2024-08-01T12:00:00Z");
        assert!(kind.matches(&inside));
        assert!(!kind.matches(&outside));
        assert!(kind.predicate(ElementType::Entry).matches(&inside));
    }

    #[test]
    fn test_relation_rule_requires_targets() {
        let err = RelationRule::from_operands(None, &operands(json!({"targetIds": []}))).unwrap_err();
        assert!(matches!(err, QueryError::Validation { ref field, .. } if field == "targetIds"));

        let rule = RelationRule::from_operands(Some("tags"), &operands(json!({"targetIds": [4]})))
            .unwrap();
        let element = Element::new(1, ElementType::Entry).with_relation(4, Some("tags"));
        assert!(RuleKind::Relation(rule).matches(&element));
    }

    #[test]
    fn test_operands_are_canonical() {
        let rule = price_rule("<", 10.0);
        let config = rule.to_config();
        assert_eq!(config.operands.get("value"), Some(&json!(10)));
        assert_eq!(config.operands.get("operator"), Some(&json!("<")));
        assert_eq!(config.rule_type, "field:price");
    }
}

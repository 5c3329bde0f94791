use super::rule::ConditionRule;
use super::serialization::{ConditionConfig, RuleNodeConfig};
use crate::error::{QueryError, Result};
use crate::logging::log_condition_operation;
use crate::models::{Element, ElementType};
use crate::query_builder::{Predicate, QueryPlan, WhereClause};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::warn;
use uuid::Uuid;

/// How a condition combines its children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    #[default]
    And,
    Or,
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "and"),
            Self::Or => write!(f, "or"),
        }
    }
}

/// What a condition does when a child would exceed `max_child_rules`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Drop the new child and report `false`
    #[default]
    Discard,
    /// Fail with a configuration error
    Reject,
}

fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

fn is_true(value: &bool) -> bool {
    *value
}

fn default_true() -> bool {
    true
}

/// Structural constraints on a condition's children
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionSettings {
    /// Whether nested conditions may be added as children
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub allow_child_rules: bool,
    #[serde(default, skip_serializing_if = "is_default")]
    pub min_child_rules: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_child_rules: Option<usize>,
    #[serde(default, skip_serializing_if = "is_default")]
    pub overflow_policy: OverflowPolicy,
    /// Let children of an AND condition claim the same query params
    #[serde(default, skip_serializing_if = "is_default")]
    pub allow_param_overlap: bool,
}

impl Default for ConditionSettings {
    fn default() -> Self {
        Self {
            allow_child_rules: true,
            min_child_rules: 0,
            max_child_rules: None,
            overflow_policy: OverflowPolicy::Discard,
            allow_param_overlap: false,
        }
    }
}

/// A rule that was skipped while loading a stored condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionDiagnostic {
    pub rule_type: String,
    pub uid: Option<String>,
    pub message: String,
}

/// A child of a condition: a leaf rule or a nested condition
#[derive(Debug, Clone, PartialEq)]
pub enum RuleNode {
    Rule(ConditionRule),
    Condition(Condition),
}

impl RuleNode {
    pub fn uid(&self) -> Uuid {
        match self {
            Self::Rule(rule) => rule.uid(),
            Self::Condition(condition) => condition.uid(),
        }
    }

    pub fn exclusive_query_params(&self) -> BTreeSet<String> {
        match self {
            Self::Rule(rule) => rule.exclusive_query_params().clone(),
            Self::Condition(condition) => condition.exclusive_query_params(),
        }
    }

    pub fn predicate(&self, element_type: ElementType) -> Predicate {
        match self {
            Self::Rule(rule) => rule.predicate(element_type),
            Self::Condition(condition) => condition.predicate(element_type),
        }
    }

    pub fn modify_query(&self, plan: &mut QueryPlan) {
        match self {
            Self::Rule(rule) => rule.modify_query(plan),
            Self::Condition(condition) => condition.modify_query(plan),
        }
    }

    pub fn match_element(&self, element: &Element) -> bool {
        match self {
            Self::Rule(rule) => rule.match_element(element),
            Self::Condition(condition) => condition.match_element(element),
        }
    }

    pub fn to_config(&self) -> RuleNodeConfig {
        match self {
            Self::Rule(rule) => RuleNodeConfig::Rule(rule.to_config()),
            Self::Condition(condition) => {
                RuleNodeConfig::Condition(condition.config_with(false))
            }
        }
    }
}

impl From<ConditionRule> for RuleNode {
    fn from(rule: ConditionRule) -> Self {
        Self::Rule(rule)
    }
}

impl From<Condition> for RuleNode {
    fn from(condition: Condition) -> Self {
        Self::Condition(condition)
    }
}

/// An ordered tree of rules combined with AND or OR.
///
/// Children are visited in insertion order. An empty AND condition matches every
/// element and an empty OR condition matches none.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    uid: Uuid,
    combinator: Combinator,
    children: Vec<RuleNode>,
    settings: ConditionSettings,
    element_type: Option<ElementType>,
    diagnostics: Vec<ConditionDiagnostic>,
}

impl Condition {
    pub fn new(combinator: Combinator) -> Self {
        Self {
            uid: Uuid::new_v4(),
            combinator,
            children: Vec::new(),
            settings: ConditionSettings::default(),
            element_type: None,
            diagnostics: Vec::new(),
        }
    }

    pub fn and() -> Self {
        Self::new(Combinator::And)
    }

    pub fn or() -> Self {
        Self::new(Combinator::Or)
    }

    pub fn with_uid(mut self, uid: Uuid) -> Self {
        self.uid = uid;
        self
    }

    pub fn with_settings(mut self, settings: ConditionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_element_type(mut self, element_type: ElementType) -> Self {
        self.set_element_type(element_type);
        self
    }

    pub fn uid(&self) -> Uuid {
        self.uid
    }

    pub fn combinator(&self) -> Combinator {
        self.combinator
    }

    pub fn settings(&self) -> &ConditionSettings {
        &self.settings
    }

    pub fn children(&self) -> &[RuleNode] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of leaf rules in the whole tree
    pub fn rule_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| match child {
                RuleNode::Rule(_) => 1,
                RuleNode::Condition(condition) => condition.rule_count(),
            })
            .sum()
    }

    /// Element type this condition filters, if known
    pub fn element_type(&self) -> Option<ElementType> {
        self.element_type
    }

    /// Set the element type on this condition and every nested condition
    pub fn set_element_type(&mut self, element_type: ElementType) {
        self.element_type = Some(element_type);
        for child in &mut self.children {
            if let RuleNode::Condition(condition) = child {
                condition.set_element_type(element_type);
            }
        }
    }

    /// Add a child. Returns `Ok(false)` when the child was discarded at `max_child_rules`.
    pub fn add_condition_rule(&mut self, node: impl Into<RuleNode>) -> Result<bool> {
        let mut node = node.into();

        if matches!(node, RuleNode::Condition(_)) && !self.settings.allow_child_rules {
            return Err(QueryError::validation(
                "conditionRules",
                "this condition does not accept nested conditions",
            ));
        }

        if let Some(max) = self.settings.max_child_rules {
            if self.children.len() >= max {
                return match self.settings.overflow_policy {
                    OverflowPolicy::Discard => {
                        warn!(
                            condition_uid = %self.uid,
                            max_child_rules = max,
                            discarded_uid = %node.uid(),
                            "Condition is full; discarding new child"
                        );
                        Ok(false)
                    }
                    OverflowPolicy::Reject => Err(QueryError::configuration(
                        "Condition",
                        format!("condition already holds the maximum of {max} children"),
                    )),
                };
            }
        }

        if self.combinator == Combinator::And && !self.settings.allow_param_overlap {
            let claimed = self.exclusive_query_params();
            let overlap: Vec<String> = node
                .exclusive_query_params()
                .intersection(&claimed)
                .cloned()
                .collect();
            if !overlap.is_empty() {
                return Err(QueryError::configuration(
                    "Condition",
                    format!(
                        "rules in an AND condition cannot both claim: {}",
                        overlap.join(", ")
                    ),
                ));
            }
        }

        if let (Some(element_type), RuleNode::Condition(condition)) = (self.element_type, &mut node) {
            condition.set_element_type(element_type);
        }

        log_condition_operation(
            "add_rule",
            &self.uid.to_string(),
            match &node {
                RuleNode::Rule(rule) => Some(rule.rule_type()),
                RuleNode::Condition(_) => None,
            },
            "added",
            None,
        );
        self.children.push(node);
        Ok(true)
    }

    /// Remove the child with `uid`, searching nested conditions too
    pub fn remove_condition_rule(&mut self, uid: Uuid) -> Result<RuleNode> {
        self.take_rule(uid).unwrap_or_else(|| {
            Err(QueryError::configuration(
                "Condition",
                format!("no rule with uid {uid}"),
            ))
        })
    }

    fn take_rule(&mut self, uid: Uuid) -> Option<Result<RuleNode>> {
        if let Some(index) = self.children.iter().position(|child| child.uid() == uid) {
            if self.children.len() <= self.settings.min_child_rules {
                return Some(Err(QueryError::configuration(
                    "Condition",
                    format!(
                        "condition requires at least {} children",
                        self.settings.min_child_rules
                    ),
                )));
            }
            return Some(Ok(self.children.remove(index)));
        }

        self.children.iter_mut().find_map(|child| match child {
            RuleNode::Condition(condition) => condition.take_rule(uid),
            RuleNode::Rule(_) => None,
        })
    }

    /// Union of the params every child claims
    pub fn exclusive_query_params(&self) -> BTreeSet<String> {
        self.children
            .iter()
            .flat_map(RuleNode::exclusive_query_params)
            .collect()
    }

    /// The whole condition as one compound predicate
    pub fn predicate(&self, element_type: ElementType) -> Predicate {
        let predicates = self
            .children
            .iter()
            .map(|child| child.predicate(element_type))
            .collect();
        Predicate::Group(match self.combinator {
            Combinator::And => WhereClause::and(predicates),
            Combinator::Or => WhereClause::or(predicates),
        })
    }

    /// Apply the condition to a plan.
    ///
    /// AND children are applied one by one; OR children become alternatives of a
    /// single predicate attached once.
    pub fn modify_query(&self, plan: &mut QueryPlan) {
        match self.combinator {
            Combinator::And => {
                for child in &self.children {
                    child.modify_query(plan);
                }
            }
            Combinator::Or => {
                let predicate = self.predicate(plan.element_type());
                plan.where_clause(predicate);
            }
        }
    }

    pub fn match_element(&self, element: &Element) -> bool {
        match self.combinator {
            Combinator::And => self.children.iter().all(|child| child.match_element(element)),
            Combinator::Or => self.children.iter().any(|child| child.match_element(element)),
        }
    }

    /// Check child counts against the settings, recursively
    pub fn validate(&self) -> Result<()> {
        if self.children.len() < self.settings.min_child_rules {
            return Err(QueryError::configuration(
                "Condition",
                format!(
                    "condition {} has {} children but requires at least {}",
                    self.uid,
                    self.children.len(),
                    self.settings.min_child_rules
                ),
            ));
        }
        if let Some(max) = self.settings.max_child_rules {
            if self.children.len() > max {
                return Err(QueryError::configuration(
                    "Condition",
                    format!("condition {} exceeds {max} children", self.uid),
                ));
            }
        }
        for child in &self.children {
            if let RuleNode::Condition(condition) = child {
                condition.validate()?;
            }
        }
        Ok(())
    }

    pub(crate) fn record_diagnostic(&mut self, diagnostic: ConditionDiagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Rules skipped while loading this condition (not its children)
    pub fn diagnostics(&self) -> &[ConditionDiagnostic] {
        &self.diagnostics
    }

    /// Diagnostics of this condition and every nested condition
    pub fn all_diagnostics(&self) -> Vec<ConditionDiagnostic> {
        let mut all = self.diagnostics.clone();
        for child in &self.children {
            if let RuleNode::Condition(condition) = child {
                all.extend(condition.all_diagnostics());
            }
        }
        all
    }

    /// Whether any rule in the tree was skipped during load
    pub fn is_degraded(&self) -> bool {
        !self.diagnostics.is_empty()
            || self.children.iter().any(|child| {
                matches!(child, RuleNode::Condition(condition) if condition.is_degraded())
            })
    }

    pub fn to_config(&self) -> ConditionConfig {
        self.config_with(true)
    }

    /// Canonical JSON form
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_config())?)
    }

    fn config_with(&self, root: bool) -> ConditionConfig {
        ConditionConfig {
            uid: Some(self.uid.to_string()),
            element_type: if root { self.element_type } else { None },
            combinator: self.combinator,
            condition_rules: self.children.iter().map(RuleNode::to_config).collect(),
            settings: self.settings.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::rule::{RuleKind, TextOperator, TextRule};
    use crate::models::ValueSource;

    fn slug_rule(prefix: &str) -> ConditionRule {
        let rule = TextRule::new(ValueSource::attribute("slug"), TextOperator::StartsWith, prefix)
            .unwrap();
        ConditionRule::new("slug", RuleKind::Text(rule)).with_exclusive_params(["slug"])
    }

    fn title_rule(value: &str) -> ConditionRule {
        let rule = TextRule::new(ValueSource::attribute("title"), TextOperator::Equals, value)
            .unwrap();
        ConditionRule::new("title", RuleKind::Text(rule)).with_exclusive_params(["title"])
    }

    #[test]
    fn test_vacuous_truth_and_falsity() {
        let element = Element::new(1, ElementType::Entry);
        assert!(Condition::and().match_element(&element));
        assert!(!Condition::or().match_element(&element));
    }

    #[test]
    fn test_and_overlap_rejected_or_allowed() {
        let mut and = Condition::and();
        assert!(and.add_condition_rule(slug_rule("a")).unwrap());
        let err = and.add_condition_rule(slug_rule("b")).unwrap_err();
        assert!(matches!(err, QueryError::Configuration { .. }));

        let mut or = Condition::or();
        assert!(or.add_condition_rule(slug_rule("a")).unwrap());
        assert!(or.add_condition_rule(slug_rule("b")).unwrap());

        let mut lenient = Condition::and().with_settings(ConditionSettings {
            allow_param_overlap: true,
            ..Default::default()
        });
        lenient.add_condition_rule(slug_rule("a")).unwrap();
        assert!(lenient.add_condition_rule(slug_rule("b")).unwrap());
    }

    #[test]
    fn test_nested_conditions_respect_allow_child_rules() {
        let mut condition = Condition::and().with_settings(ConditionSettings {
            allow_child_rules: false,
            ..Default::default()
        });
        let err = condition.add_condition_rule(Condition::or()).unwrap_err();
        assert!(matches!(err, QueryError::Validation { ref field, .. } if field == "conditionRules"));
        assert!(condition.add_condition_rule(slug_rule("a")).unwrap());
    }

    #[test]
    fn test_max_child_rules_discards_by_default() {
        let mut condition = Condition::and().with_settings(ConditionSettings {
            max_child_rules: Some(1),
            ..Default::default()
        });
        assert!(condition.add_condition_rule(slug_rule("a")).unwrap());
        assert!(!condition.add_condition_rule(title_rule("x")).unwrap());
        assert_eq!(condition.len(), 1);
    }

    #[test]
    fn test_max_child_rules_reject_policy() {
        let mut condition = Condition::and().with_settings(ConditionSettings {
            max_child_rules: Some(1),
            overflow_policy: OverflowPolicy::Reject,
            ..Default::default()
        });
        condition.add_condition_rule(slug_rule("a")).unwrap();
        let err = condition.add_condition_rule(title_rule("x")).unwrap_err();
        assert!(matches!(err, QueryError::Configuration { .. }));
    }

    #[test]
    fn test_remove_respects_min_child_rules() {
        let mut nested = Condition::or();
        let nested_rule = slug_rule("n");
        let nested_uid = nested_rule.uid();
        nested.add_condition_rule(nested_rule).unwrap();

        let mut condition = Condition::and().with_settings(ConditionSettings {
            min_child_rules: 2,
            ..Default::default()
        });
        let first = title_rule("x");
        let first_uid = first.uid();
        condition.add_condition_rule(first).unwrap();
        condition.add_condition_rule(nested).unwrap();

        assert!(condition.remove_condition_rule(first_uid).is_err());
        let removed = condition.remove_condition_rule(nested_uid).unwrap();
        assert_eq!(removed.uid(), nested_uid);
        assert!(condition.remove_condition_rule(Uuid::new_v4()).is_err());
    }

    #[test]
    fn test_or_modifies_query_once() {
        let mut condition = Condition::or();
        condition.add_condition_rule(slug_rule("foo")).unwrap();
        condition.add_condition_rule(title_rule("Bar")).unwrap();

        let mut plan = QueryPlan::new(ElementType::Entry);
        condition.modify_query(&mut plan);
        assert_eq!(plan.where_clauses().len(), 1);
        assert_eq!(
            plan.where_clauses()[0].to_sql(),
            "(elements.slug LIKE 'foo%' OR elements.title = 'Bar')"
        );
    }

    #[test]
    fn test_and_modifies_query_per_child() {
        let mut condition = Condition::and();
        condition.add_condition_rule(slug_rule("foo")).unwrap();
        condition.add_condition_rule(title_rule("Bar")).unwrap();

        let mut plan = QueryPlan::new(ElementType::Entry);
        condition.modify_query(&mut plan);
        assert_eq!(plan.where_clauses().len(), 2);
    }

    #[test]
    fn test_element_type_propagates_to_nested_conditions() {
        let mut condition = Condition::and().with_element_type(ElementType::Category);
        condition.add_condition_rule(Condition::or()).unwrap();
        match &condition.children()[0] {
            RuleNode::Condition(nested) => {
                assert_eq!(nested.element_type(), Some(ElementType::Category))
            }
            RuleNode::Rule(_) => panic!("expected nested condition"),
        }
    }

    #[test]
    fn test_validate_min_children() {
        let condition = Condition::and().with_settings(ConditionSettings {
            min_child_rules: 1,
            ..Default::default()
        });
        assert!(condition.validate().is_err());
    }
}

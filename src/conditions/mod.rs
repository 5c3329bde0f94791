//! # Conditions
//!
//! Composable, serializable filter trees built from typed rules.
//!
//! A [`Condition`] holds [`RuleNode`]s combined with AND or OR. Each leaf is a
//! [`ConditionRule`] produced by a factory registered in the
//! [`RuleTypeRegistry`](crate::registry::RuleTypeRegistry); the tree can both narrow an
//! [`ElementQuery`](crate::element_query::ElementQuery) and test a single element
//! in memory with identical semantics.

pub mod builtin;
pub mod condition;
pub mod rule;
pub mod serialization;

pub use condition::{
    Combinator, Condition, ConditionDiagnostic, ConditionSettings, OverflowPolicy, RuleNode,
};
pub use rule::{
    ConditionRule, DateOperator, DateRule, NumberOperator, NumberRule, RelationRule,
    RuleCategory, RuleKind, SelectOperator, SelectRule, TextOperator, TextRule,
};
pub use serialization::{ConditionConfig, ConditionLoader, RuleConfig, RuleNodeConfig};

//! # Relation Filter Resolution
//!
//! Normalizes `relatedTo` and `andRelatedTo` into one relation filter expression.
//!
//! The resolver only supports AND-combining onto a flat "related to any of these"
//! set. Anything already holding explicit `and`/`or` structure is rejected with
//! [`QueryError::NotSupported`] at the call that attempts the combination; the relation
//! join does not compile arbitrary boolean trees.

use crate::constants::system;
use crate::error::{QueryError, Result};
use crate::models::Element;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Elements a relation filter targets. Multiple ids are OR'd together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationTargets {
    pub ids: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Normalized relation filter expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationExpr {
    Targets(RelationTargets),
    And(Vec<RelationExpr>),
    Or(Vec<RelationExpr>),
}

impl RelationExpr {
    /// Related to any of the given elements
    pub fn any_of(ids: impl IntoIterator<Item = i64>) -> Self {
        Self::Targets(RelationTargets {
            ids: ids.into_iter().collect(),
            field: None,
        })
    }

    /// Related to any of the given elements through one relation field
    pub fn through_field(ids: impl IntoIterator<Item = i64>, field: &str) -> Self {
        Self::Targets(RelationTargets {
            ids: ids.into_iter().collect(),
            field: Some(field.to_string()),
        })
    }

    /// Whether this is a plain "any of these" target set
    pub fn is_flat(&self) -> bool {
        matches!(self, Self::Targets(_))
    }

    pub fn to_sql(&self) -> String {
        match self {
            Self::Targets(targets) => {
                if targets.ids.is_empty() {
                    return "1=0".to_string();
                }
                let ids = targets
                    .ids
                    .iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                let relations = system::RELATIONS_TABLE;
                let mut sql = format!(
                    "EXISTS (SELECT 1 FROM {relations} WHERE {relations}.sourceId = {}.id AND {relations}.targetId IN ({ids})",
                    system::ELEMENTS_TABLE
                );
                if let Some(field) = &targets.field {
                    sql.push_str(&format!(
                        " AND {relations}.fieldHandle = '{}'",
                        field.replace('\'', "''")
                    ));
                }
                sql.push(')');
                sql
            }
            Self::And(children) => join_sql(children, " AND ", "1=1"),
            Self::Or(children) => join_sql(children, " OR ", "1=0"),
        }
    }

    pub fn matches(&self, element: &Element) -> bool {
        match self {
            Self::Targets(targets) => {
                element.is_related_to(&targets.ids, targets.field.as_deref())
            }
            Self::And(children) => children.iter().all(|child| child.matches(element)),
            Self::Or(children) => children.iter().any(|child| child.matches(element)),
        }
    }
}

fn join_sql(children: &[RelationExpr], glue: &str, empty: &str) -> String {
    match children.len() {
        0 => empty.to_string(),
        1 => children[0].to_sql(),
        _ => format!(
            "({})",
            children
                .iter()
                .map(RelationExpr::to_sql)
                .collect::<Vec<_>>()
                .join(glue)
        ),
    }
}

impl From<i64> for RelationExpr {
    fn from(id: i64) -> Self {
        Self::any_of([id])
    }
}

impl From<Vec<i64>> for RelationExpr {
    fn from(ids: Vec<i64>) -> Self {
        Self::any_of(ids)
    }
}

impl<const N: usize> From<[i64; N]> for RelationExpr {
    fn from(ids: [i64; N]) -> Self {
        Self::any_of(ids)
    }
}

/// Resolver states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationFilterState {
    Unset,
    SingleExpression,
    Combined,
}

impl fmt::Display for RelationFilterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => write!(f, "unset"),
            Self::SingleExpression => write!(f, "single_expression"),
            Self::Combined => write!(f, "combined"),
        }
    }
}

/// Relation filter accumulated by an element query
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RelationFilter {
    #[default]
    Unset,
    Single(RelationExpr),
    Combined(RelationExpr),
}

impl RelationFilter {
    pub fn state(&self) -> RelationFilterState {
        match self {
            Self::Unset => RelationFilterState::Unset,
            Self::Single(_) => RelationFilterState::SingleExpression,
            Self::Combined(_) => RelationFilterState::Combined,
        }
    }

    pub fn is_set(&self) -> bool {
        !matches!(self, Self::Unset)
    }

    pub fn expression(&self) -> Option<&RelationExpr> {
        match self {
            Self::Unset => None,
            Self::Single(expr) | Self::Combined(expr) => Some(expr),
        }
    }

    /// Replace the relation filter with `expr`, held verbatim
    pub fn related_to(&mut self, expr: RelationExpr) {
        *self = Self::Single(expr);
    }

    /// AND `expr` onto the current filter.
    ///
    /// Only defined when the current filter is a flat target set; compound
    /// expressions fail with `NotSupported` and leave the filter untouched.
    pub fn and_related_to(&mut self, expr: RelationExpr) -> Result<()> {
        match std::mem::take(self) {
            Self::Unset => {
                *self = Self::Single(expr);
                Ok(())
            }
            Self::Single(existing) if existing.is_flat() => {
                *self = Self::Combined(RelationExpr::And(vec![existing, expr]));
                Ok(())
            }
            previous => {
                let state = previous.state();
                *self = previous;
                Err(QueryError::not_supported(format!(
                    "Cannot AND-combine relatedTo onto a compound relation expression (state: {state})"
                )))
            }
        }
    }
}

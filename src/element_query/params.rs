//! # Criterion Param Parsing
//!
//! Turns criterion values into typed predicates.
//!
//! String values understand a small param syntax:
//!
//! - `foo`, `=foo`, `!=foo`, `not foo`
//! - `>10`, `>=10`, `<10`, `<=10` (numbers and RFC 3339 dates compare by value)
//! - `foo*`, `*bar*` wildcards (`\*` is a literal star)
//! - `:empty:`, `:notempty:`
//!
//! Lists are OR'd by default. A leading `and`, `or` or `not` keyword changes the glue;
//! `not` negates every item and ANDs them. An OR of plain equality checks collapses
//! into a single `IN`.

use super::criteria::CriterionValue;
use crate::error::{QueryError, Result};
use crate::query_builder::{escape_like, ColumnRef, CompareOp, Operand, Predicate, WhereClause};
use serde_json::Value;

const EMPTY_TOKEN: &str = ":empty:";
const NOT_EMPTY_TOKEN: &str = ":notempty:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Glue {
    And,
    Or,
    Not,
}

impl Glue {
    fn parse(value: &Value) -> Option<Self> {
        match value.as_str()?.trim().to_ascii_lowercase().as_str() {
            "and" => Some(Self::And),
            "or" => Some(Self::Or),
            "not" => Some(Self::Not),
            _ => None,
        }
    }
}

/// Build the predicate a criterion value applies to `column`
pub fn parse_param(column: &ColumnRef, value: &CriterionValue) -> Result<Predicate> {
    match value {
        CriterionValue::Scalar(value) => parse_scalar(column, value, false),
        CriterionValue::List(items) => parse_list(column, items),
        CriterionValue::Operator { op, value } => Ok(Predicate::compare(
            column.clone(),
            *op,
            Operand::infer(value),
        )),
    }
}

fn parse_scalar(column: &ColumnRef, value: &Value, negate: bool) -> Result<Predicate> {
    let predicate = match value {
        Value::Null => return Ok(Predicate::always()),
        Value::Bool(_) | Value::Number(_) => {
            let op = if negate { CompareOp::Ne } else { CompareOp::Eq };
            return Ok(Predicate::compare(column.clone(), op, Operand::infer(value)));
        }
        Value::String(s) => parse_string(column, s)?,
        Value::Array(items) => parse_list(column, items)?,
        Value::Object(_) => {
            return Err(QueryError::validation(
                column.source.name(),
                "object values are not valid criteria",
            ))
        }
    };

    Ok(if negate { predicate.negate() } else { predicate })
}

fn parse_string(column: &ColumnRef, raw: &str) -> Result<Predicate> {
    let mut rest = raw.trim();
    let mut negated = false;

    if let Some(stripped) = strip_keyword(rest, "not") {
        negated = true;
        rest = stripped;
    }

    if rest.eq_ignore_ascii_case(EMPTY_TOKEN) {
        let column = column.clone();
        return Ok(if negated {
            Predicate::NotEmpty { column }
        } else {
            Predicate::Empty { column }
        });
    }
    if rest.eq_ignore_ascii_case(NOT_EMPTY_TOKEN) {
        let column = column.clone();
        return Ok(if negated {
            Predicate::Empty { column }
        } else {
            Predicate::NotEmpty { column }
        });
    }

    let (mut op, operand) = split_operator(rest);
    if negated {
        op = op.negate();
    }

    if matches!(op, CompareOp::Eq | CompareOp::Ne) && has_wildcard(operand) {
        return Ok(Predicate::Like {
            column: column.clone(),
            pattern: wildcard_to_like(operand),
            negated: op == CompareOp::Ne,
        });
    }

    Ok(Predicate::compare(
        column.clone(),
        op,
        Operand::infer_str(&unescape_star(operand)),
    ))
}

fn parse_list(column: &ColumnRef, items: &[Value]) -> Result<Predicate> {
    let (glue, items) = match items.first().and_then(Glue::parse) {
        Some(glue) => (glue, &items[1..]),
        None => (Glue::Or, items),
    };

    if items.is_empty() {
        return Ok(match glue {
            Glue::Or => Predicate::never(),
            Glue::And | Glue::Not => Predicate::always(),
        });
    }

    let mut predicates = items
        .iter()
        .map(|item| parse_scalar(column, item, glue == Glue::Not))
        .collect::<Result<Vec<_>>>()?;

    if predicates.len() == 1 {
        return Ok(predicates.remove(0));
    }

    Ok(match glue {
        Glue::Or => collapse_equalities(column, predicates, CompareOp::Eq)
            .map(|values| Predicate::In {
                column: column.clone(),
                values,
            })
            .unwrap_or_else(|predicates| Predicate::Group(WhereClause::or(predicates))),
        Glue::Not => collapse_equalities(column, predicates, CompareOp::Ne)
            .map(|values| Predicate::NotIn {
                column: column.clone(),
                values,
            })
            .unwrap_or_else(|predicates| Predicate::Group(WhereClause::and(predicates))),
        Glue::And => Predicate::Group(WhereClause::and(predicates)),
    })
}

/// Pull the operands out when every predicate is `column <op> value`
fn collapse_equalities(
    column: &ColumnRef,
    predicates: Vec<Predicate>,
    expected: CompareOp,
) -> std::result::Result<Vec<Operand>, Vec<Predicate>> {
    let collapsible = predicates.iter().all(|predicate| {
        matches!(predicate, Predicate::Compare { column: c, op, value }
            if c == column && *op == expected && *value != Operand::Null)
    });
    if !collapsible {
        return Err(predicates);
    }

    Ok(predicates
        .into_iter()
        .filter_map(|predicate| match predicate {
            Predicate::Compare { value, .. } => Some(value),
            _ => None,
        })
        .collect())
}

fn strip_keyword<'a>(s: &'a str, keyword: &str) -> Option<&'a str> {
    let head = s.get(..keyword.len())?;
    let tail = &s[keyword.len()..];
    if head.eq_ignore_ascii_case(keyword) && tail.starts_with(char::is_whitespace) {
        Some(tail.trim_start())
    } else {
        None
    }
}

fn split_operator(s: &str) -> (CompareOp, &str) {
    const OPERATORS: [(&str, CompareOp); 6] = [
        ("!=", CompareOp::Ne),
        (">=", CompareOp::Gte),
        ("<=", CompareOp::Lte),
        (">", CompareOp::Gt),
        ("<", CompareOp::Lt),
        ("=", CompareOp::Eq),
    ];

    for (token, op) in OPERATORS {
        if let Some(rest) = s.strip_prefix(token) {
            return (op, rest.trim_start());
        }
    }
    (CompareOp::Eq, s)
}

fn has_wildcard(s: &str) -> bool {
    let mut escaped = false;
    for c in s.chars() {
        match c {
            '\\' if !escaped => escaped = true,
            '*' if !escaped => return true,
            _ => escaped = false,
        }
    }
    false
}

fn wildcard_to_like(s: &str) -> String {
    let mut pattern = String::with_capacity(s.len() + 2);
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(next) => pattern.push_str(&escape_like(&next.to_string())),
                None => pattern.push_str(&escape_like("\\")),
            },
            '*' => pattern.push('%'),
            other => pattern.push_str(&escape_like(&other.to_string())),
        }
    }
    pattern
}

fn unescape_star(s: &str) -> String {
    s.replace("\\*", "*")
}

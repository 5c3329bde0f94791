use crate::constants::system;
use crate::element_query::relations::RelationExpr;
use crate::models::{Element, ElementType, ValueSource};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cmp::Ordering;

/// A typed literal compared against element values
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Date(DateTime<Utc>),
}

impl Operand {
    /// Infer the operand kind from a criterion value. Numeric and RFC 3339 strings
    /// are treated as numbers and dates so range comparisons are not lexicographic.
    pub fn infer(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            Value::String(s) => Self::infer_str(s),
            other => Self::Text(other.to_string()),
        }
    }

    pub fn infer_str(s: &str) -> Self {
        if let Ok(n) = s.trim().parse::<f64>() {
            if n.is_finite() {
                return Self::Number(n);
            }
        }
        if let Ok(date) = DateTime::parse_from_rfc3339(s.trim()) {
            return Self::Date(date.with_timezone(&Utc));
        }
        Self::Text(s.to_string())
    }

    /// Convert an element value into the same kind as `self`
    pub fn coerce(&self, value: &Value) -> Option<Operand> {
        match self {
            Self::Null => None,
            Self::Bool(_) => match value {
                Value::Bool(b) => Some(Self::Bool(*b)),
                Value::Number(n) => n.as_i64().map(|i| Self::Bool(i != 0)),
                _ => None,
            },
            Self::Number(_) => number_of(value).map(Self::Number),
            Self::Text(_) => text_of(value).map(Self::Text),
            Self::Date(_) => date_of(value).map(Self::Date),
        }
    }

    pub fn compare(&self, other: &Operand) -> Option<Ordering> {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Number(a), Self::Number(b)) => a.partial_cmp(b),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Total order across kinds for sorting: kinds rank
    /// `Null < Bool < Number < Text < Date`, values compare within a kind
    pub fn total_cmp(&self, other: &Operand) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            _ => self
                .rank()
                .cmp(&other.rank())
                .then_with(|| self.compare(other).unwrap_or(Ordering::Equal)),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Number(_) => 2,
            Self::Text(_) => 3,
            Self::Date(_) => 4,
        }
    }

    pub fn to_sql(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::Text(s) => quote(s),
            Self::Date(d) => quote(&d.to_rfc3339()),
        }
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<i32> for Operand {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for Operand {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Operand {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<DateTime<Utc>> for Operand {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}

/// Numeric view of an element value
pub fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Textual view of an element value
pub fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Date view of an element value
pub fn date_of(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|d| d.with_timezone(&Utc)),
        _ => None,
    }
}

/// Whether an element value counts as empty (`NULL` or an empty string)
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// A column reference that knows where the same value lives on a materialized element
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
    pub source: ValueSource,
}

impl ColumnRef {
    pub fn new(table: &str, column: &str, source: ValueSource) -> Self {
        Self {
            table: table.to_string(),
            column: column.to_string(),
            source,
        }
    }

    /// Native attribute column for an element type
    pub fn attribute(element_type: ElementType, name: &str) -> Self {
        Self::new(
            element_type.attribute_table(name),
            name,
            ValueSource::attribute(name),
        )
    }

    /// Custom field column in the content table
    pub fn field(handle: &str) -> Self {
        Self::new(
            system::CONTENT_TABLE,
            &format!("field_{handle}"),
            ValueSource::field(handle),
        )
    }

    /// Column for any value source
    pub fn for_source(element_type: ElementType, source: &ValueSource) -> Self {
        match source {
            ValueSource::Attribute(name) => Self::attribute(element_type, name),
            ValueSource::Field(handle) => Self::field(handle),
        }
    }

    pub fn to_sql(&self) -> String {
        format!("{}.{}", self.table, self.column)
    }

    fn value(&self, element: &Element) -> Option<Value> {
        element.value(&self.source)
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    pub fn to_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
        }
    }

    pub fn test(&self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Lt => ordering == Ordering::Less,
            Self::Lte => ordering != Ordering::Greater,
            Self::Gt => ordering == Ordering::Greater,
            Self::Gte => ordering != Ordering::Less,
        }
    }

    pub fn negate(&self) -> Self {
        match self {
            Self::Eq => Self::Ne,
            Self::Ne => Self::Eq,
            Self::Lt => Self::Gte,
            Self::Lte => Self::Gt,
            Self::Gt => Self::Lte,
            Self::Gte => Self::Lt,
        }
    }
}

/// Represents the typed predicates a query plan can carry
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    ElementTypeIs(ElementType),
    Compare {
        column: ColumnRef,
        op: CompareOp,
        value: Operand,
    },
    In {
        column: ColumnRef,
        values: Vec<Operand>,
    },
    NotIn {
        column: ColumnRef,
        values: Vec<Operand>,
    },
    Between {
        column: ColumnRef,
        start: Operand,
        end: Operand,
    },
    /// SQL LIKE with `%` and `_` wildcards and `\` escapes
    Like {
        column: ColumnRef,
        pattern: String,
        negated: bool,
    },
    Regex {
        column: ColumnRef,
        pattern: String,
    },
    Empty {
        column: ColumnRef,
    },
    NotEmpty {
        column: ColumnRef,
    },
    Related(RelationExpr),
    Group(WhereClause),
    Not(Box<Predicate>),
}

impl Predicate {
    /// A predicate that selects everything
    pub fn always() -> Self {
        Self::Group(WhereClause::and(Vec::new()))
    }

    /// A predicate that selects nothing
    pub fn never() -> Self {
        Self::Group(WhereClause::or(Vec::new()))
    }

    pub fn compare(column: ColumnRef, op: CompareOp, value: impl Into<Operand>) -> Self {
        Self::Compare {
            column,
            op,
            value: value.into(),
        }
    }

    /// Logical complement under SQL `NULL` semantics: a row whose value is missing
    /// satisfies neither a predicate nor its negation.
    pub fn negate(self) -> Self {
        match self {
            Self::Not(inner) => *inner,
            Self::Compare { column, op, value } => Self::Compare {
                column,
                op: op.negate(),
                value,
            },
            Self::In { column, values } => Self::NotIn { column, values },
            Self::NotIn { column, values } => Self::In { column, values },
            Self::Between { column, start, end } => Self::Group(WhereClause::or(vec![
                Self::compare(column.clone(), CompareOp::Lt, start),
                Self::compare(column, CompareOp::Gt, end),
            ])),
            Self::Like {
                column,
                pattern,
                negated,
            } => Self::Like {
                column,
                pattern,
                negated: !negated,
            },
            Self::Empty { column } => Self::NotEmpty { column },
            Self::NotEmpty { column } => Self::Empty { column },
            Self::Group(clause) => {
                let predicates = clause.predicates.into_iter().map(Self::negate).collect();
                Self::Group(match clause.operator {
                    LogicalOperator::And => WhereClause::or(predicates),
                    LogicalOperator::Or => WhereClause::and(predicates),
                })
            }
            other => Self::Not(Box::new(other)),
        }
    }

    /// Convert predicate to SQL string
    pub fn to_sql(&self) -> String {
        match self {
            Self::ElementTypeIs(element_type) => format!(
                "{}.type = {}",
                system::ELEMENTS_TABLE,
                quote(element_type.type_value())
            ),
            Self::Compare { column, op, value } => {
                format!("{} {} {}", column.to_sql(), op.to_sql(), value.to_sql())
            }
            Self::In { column, values } => {
                if values.is_empty() {
                    return "1=0".to_string();
                }
                format!("{} IN ({})", column.to_sql(), operand_list(values))
            }
            Self::NotIn { column, values } => {
                if values.is_empty() {
                    return format!("{} IS NOT NULL", column.to_sql());
                }
                format!("{} NOT IN ({})", column.to_sql(), operand_list(values))
            }
            Self::Between { column, start, end } => format!(
                "{} BETWEEN {} AND {}",
                column.to_sql(),
                start.to_sql(),
                end.to_sql()
            ),
            Self::Like {
                column,
                pattern,
                negated,
            } => format!(
                "{} {}LIKE {}",
                column.to_sql(),
                if *negated { "NOT " } else { "" },
                quote(pattern)
            ),
            Self::Regex { column, pattern } => {
                format!("{} ~ {}", column.to_sql(), quote(pattern))
            }
            Self::Empty { column } => {
                let col = column.to_sql();
                format!("({col} IS NULL OR {col} = '')")
            }
            Self::NotEmpty { column } => {
                let col = column.to_sql();
                format!("({col} IS NOT NULL AND {col} != '')")
            }
            Self::Related(expr) => expr.to_sql(),
            Self::Group(clause) => clause.to_sql(),
            Self::Not(inner) => format!("NOT ({})", inner.to_sql()),
        }
    }

    /// Evaluate the predicate against a materialized element.
    ///
    /// Missing values behave like SQL `NULL`: every comparison against them is false.
    pub fn matches(&self, element: &Element) -> bool {
        match self {
            Self::ElementTypeIs(element_type) => element.element_type == *element_type,
            Self::Compare { column, op, value } => column
                .value(element)
                .and_then(|v| value.coerce(&v))
                .and_then(|actual| actual.compare(value))
                .is_some_and(|ordering| op.test(ordering)),
            Self::In { column, values } => column.value(element).is_some_and(|v| {
                values.iter().any(|candidate| {
                    candidate
                        .coerce(&v)
                        .and_then(|actual| actual.compare(candidate))
                        == Some(Ordering::Equal)
                })
            }),
            Self::NotIn { column, values } => column.value(element).is_some_and(|v| {
                !v.is_null()
                    && values.iter().all(|candidate| {
                        candidate
                            .coerce(&v)
                            .and_then(|actual| actual.compare(candidate))
                            != Some(Ordering::Equal)
                    })
            }),
            Self::Between { column, start, end } => column.value(element).is_some_and(|v| {
                let lower = start
                    .coerce(&v)
                    .and_then(|actual| actual.compare(start))
                    .is_some_and(|o| o != Ordering::Less);
                let upper = end
                    .coerce(&v)
                    .and_then(|actual| actual.compare(end))
                    .is_some_and(|o| o != Ordering::Greater);
                lower && upper
            }),
            Self::Like {
                column,
                pattern,
                negated,
            } => column
                .value(element)
                .and_then(|v| text_of(&v))
                .is_some_and(|text| like_matches(pattern, &text) != *negated),
            Self::Regex { column, pattern } => column
                .value(element)
                .and_then(|v| text_of(&v))
                .is_some_and(|text| {
                    regex::Regex::new(pattern).is_ok_and(|re| re.is_match(&text))
                }),
            Self::Empty { column } => column.value(element).is_some_and(|v| is_empty_value(&v)),
            Self::NotEmpty { column } => {
                column.value(element).is_some_and(|v| !is_empty_value(&v))
            }
            Self::Related(expr) => expr.matches(element),
            Self::Group(clause) => clause.matches(element),
            Self::Not(inner) => match inner.as_ref() {
                Self::Regex { column, .. } => {
                    column.value(element).is_some_and(|v| !v.is_null()) && !inner.matches(element)
                }
                _ => !inner.matches(element),
            },
        }
    }
}

/// Represents a WHERE clause combining multiple predicates
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    pub predicates: Vec<Predicate>,
    pub operator: LogicalOperator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOperator {
    And,
    Or,
}

impl WhereClause {
    /// Combine multiple predicates with AND
    pub fn and(predicates: Vec<Predicate>) -> Self {
        Self {
            predicates,
            operator: LogicalOperator::And,
        }
    }

    /// Combine multiple predicates with OR
    pub fn or(predicates: Vec<Predicate>) -> Self {
        Self {
            predicates,
            operator: LogicalOperator::Or,
        }
    }

    /// Convert to SQL string
    pub fn to_sql(&self) -> String {
        if self.predicates.is_empty() {
            return match self.operator {
                LogicalOperator::And => "1=1".to_string(),
                LogicalOperator::Or => "1=0".to_string(),
            };
        }

        if self.predicates.len() == 1 {
            return self.predicates[0].to_sql();
        }

        let operator_str = match self.operator {
            LogicalOperator::And => " AND ",
            LogicalOperator::Or => " OR ",
        };

        let predicate_sqls: Vec<String> = self.predicates.iter().map(|p| p.to_sql()).collect();

        format!("({})", predicate_sqls.join(operator_str))
    }

    pub fn matches(&self, element: &Element) -> bool {
        match self.operator {
            LogicalOperator::And => self.predicates.iter().all(|p| p.matches(element)),
            LogicalOperator::Or => self.predicates.iter().any(|p| p.matches(element)),
        }
    }
}

/// Escape a literal so it matches itself inside a LIKE pattern
pub fn escape_like(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Match `text` against a LIKE pattern (`%` any run, `_` any single char, `\` escape)
pub fn like_matches(pattern: &str, text: &str) -> bool {
    let mut source = String::from("(?s)^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => source.push_str(".*"),
            '_' => source.push('.'),
            '\\' => {
                if let Some(next) = chars.next() {
                    source.push_str(&regex::escape(&next.to_string()));
                } else {
                    source.push_str(&regex::escape("\\"));
                }
            }
            other => source.push_str(&regex::escape(&other.to_string())),
        }
    }
    source.push('$');
    regex::Regex::new(&source).is_ok_and(|re| re.is_match(text))
}

fn operand_list(values: &[Operand]) -> String {
    values
        .iter()
        .map(Operand::to_sql)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Quote a string literal for SQL
fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

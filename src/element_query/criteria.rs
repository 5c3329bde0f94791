use crate::constants::exclusivity;
use crate::error::{QueryError, Result};
use crate::models::ValueSource;
use crate::query_builder::CompareOp;
use serde_json::Value;

/// Value carried by a criterion
#[derive(Debug, Clone, PartialEq)]
pub enum CriterionValue {
    /// A single value, possibly using param syntax such as `not foo` or `>= 10`
    Scalar(Value),
    /// A list of values, optionally led by an `and`/`or`/`not` glue keyword
    List(Vec<Value>),
    /// An explicit comparison
    Operator { op: CompareOp, value: Value },
}

impl CriterionValue {
    pub fn operator(op: CompareOp, value: impl Into<Value>) -> Self {
        Self::Operator {
            op,
            value: value.into(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Scalar(Value::Null))
    }
}

impl From<Value> for CriterionValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => Self::List(items),
            other => Self::Scalar(other),
        }
    }
}

impl From<i64> for CriterionValue {
    fn from(value: i64) -> Self {
        Self::Scalar(Value::from(value))
    }
}

impl From<i32> for CriterionValue {
    fn from(value: i32) -> Self {
        Self::Scalar(Value::from(value))
    }
}

impl From<f64> for CriterionValue {
    fn from(value: f64) -> Self {
        Self::Scalar(Value::from(value))
    }
}

impl From<bool> for CriterionValue {
    fn from(value: bool) -> Self {
        Self::Scalar(Value::from(value))
    }
}

impl From<&str> for CriterionValue {
    fn from(value: &str) -> Self {
        Self::Scalar(Value::from(value))
    }
}

impl From<String> for CriterionValue {
    fn from(value: String) -> Self {
        Self::Scalar(Value::from(value))
    }
}

impl<T: Into<Value>> From<Vec<T>> for CriterionValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for CriterionValue {
    fn from(values: [T; N]) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

/// One named filter parameter set on a query
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    pub name: String,
    pub value: CriterionValue,
    pub source: ValueSource,
}

impl Criterion {
    /// Criterion on a native attribute
    pub fn attribute(name: &str, value: CriterionValue) -> Self {
        Self {
            name: name.to_string(),
            value,
            source: ValueSource::attribute(name),
        }
    }

    /// Criterion on a custom field, named by its handle
    pub fn field(handle: &str, value: CriterionValue) -> Self {
        Self {
            name: handle.to_string(),
            value,
            source: ValueSource::field(handle),
        }
    }

    pub fn exclusivity_group(&self) -> Option<&'static [&'static str]> {
        match self.source {
            ValueSource::Attribute(_) => exclusivity::group_of(&self.name),
            ValueSource::Field(_) => None,
        }
    }
}

fn source_kind(source: &ValueSource) -> &'static str {
    match source {
        ValueSource::Attribute(_) => "an attribute",
        ValueSource::Field(_) => "a custom field",
    }
}

/// Insertion-ordered criteria of one query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CriteriaSet {
    entries: Vec<Criterion>,
}

impl CriteriaSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a criterion, replacing any earlier value with the same name and source in place.
    ///
    /// Fails when another member of the criterion's exclusivity group is already set, or
    /// when the name is already taken by a criterion on a different source.
    pub fn set(&mut self, criterion: Criterion) -> Result<()> {
        if let Some(group) = criterion.exclusivity_group() {
            if let Some(conflict) = self
                .entries
                .iter()
                .find(|existing| existing.name != criterion.name && group.contains(&existing.name.as_str()))
            {
                return Err(QueryError::configuration(
                    "ElementQuery",
                    format!(
                        "'{}' and '{}' cannot both be set on the same query",
                        conflict.name, criterion.name
                    ),
                ));
            }
        }

        match self
            .entries
            .iter_mut()
            .find(|existing| existing.name == criterion.name)
        {
            Some(existing) if existing.source != criterion.source => {
                Err(QueryError::configuration(
                    "ElementQuery",
                    format!(
                        "'{}' is already set as {} and cannot also be set as {}",
                        criterion.name,
                        source_kind(&existing.source),
                        source_kind(&criterion.source)
                    ),
                ))
            }
            Some(existing) => {
                *existing = criterion;
                Ok(())
            }
            None => {
                self.entries.push(criterion);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Criterion> {
        self.entries.iter().find(|criterion| criterion.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Criterion> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|criterion| criterion.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

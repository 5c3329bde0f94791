use super::{ColumnRef, Join, Operand, Pagination, Predicate};
use crate::constants::system;
use crate::models::{Element, ElementType};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: ColumnRef,
    pub direction: SortDirection,
}

/// Compiled data-fetch plan for one element query.
///
/// A plan is assembled stage by stage during compilation and then frozen behind an
/// `Arc`; storage backends only ever see the frozen form.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    element_type: ElementType,
    base_table: String,
    select_fields: Vec<String>,
    joins: Vec<Join>,
    where_clauses: Vec<Predicate>,
    order_by: Vec<OrderBy>,
    pagination: Pagination,
    eager_loads: Vec<String>,
    as_array: bool,
}

impl QueryPlan {
    /// Create an empty plan over the elements table
    pub fn new(element_type: ElementType) -> Self {
        Self {
            element_type,
            base_table: system::ELEMENTS_TABLE.to_string(),
            select_fields: vec![
                format!("{}.*", system::ELEMENTS_TABLE),
                format!("{}.*", element_type.table()),
            ],
            joins: Vec::new(),
            where_clauses: Vec::new(),
            order_by: Vec::new(),
            pagination: Pagination::default(),
            eager_loads: Vec::new(),
            as_array: false,
        }
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Add a JOIN unless the table is already joined. Returns whether it was added.
    pub fn ensure_join(&mut self, join: Join) -> bool {
        if self.joins.iter().any(|existing| existing.same_table(&join)) {
            return false;
        }
        self.joins.push(join);
        true
    }

    /// Add a predicate, conjunctive with every other where clause
    pub fn where_clause(&mut self, predicate: Predicate) {
        self.where_clauses.push(predicate);
    }

    pub fn order_by(&mut self, column: ColumnRef, direction: SortDirection) {
        self.order_by.push(OrderBy { column, direction });
    }

    pub fn set_pagination(&mut self, pagination: Pagination) {
        self.pagination = pagination;
    }

    /// Record an eager-load directive for the storage layer
    pub fn eager_load(&mut self, path: &str) {
        if !self.eager_loads.iter().any(|existing| existing == path) {
            self.eager_loads.push(path.to_string());
        }
    }

    pub fn set_as_array(&mut self, as_array: bool) {
        self.as_array = as_array;
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    pub fn where_clauses(&self) -> &[Predicate] {
        &self.where_clauses
    }

    pub fn ordering(&self) -> &[OrderBy] {
        &self.order_by
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn eager_loads(&self) -> &[String] {
        &self.eager_loads
    }

    pub fn as_array(&self) -> bool {
        self.as_array
    }

    /// Build the complete SQL query string
    pub fn build_sql(&self) -> String {
        let mut sql = format!("SELECT {}", self.select_fields.join(", "));
        self.push_from_and_where(&mut sql);

        if !self.order_by.is_empty() {
            let parts: Vec<String> = self
                .order_by
                .iter()
                .map(|order| format!("{} {}", order.column.to_sql(), order.direction.to_sql()))
                .collect();
            sql.push_str(&format!(" ORDER BY {}", parts.join(", ")));
        }

        sql.push_str(&self.pagination.to_sql());
        sql
    }

    /// Build the COUNT query, ignoring ordering and pagination
    pub fn count_sql(&self) -> String {
        let mut sql = String::from("SELECT COUNT(*)");
        self.push_from_and_where(&mut sql);
        sql
    }

    fn push_from_and_where(&self, sql: &mut String) {
        sql.push_str(&format!(" FROM {}", self.base_table));

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(&join.to_sql());
        }

        if !self.where_clauses.is_empty() {
            let where_parts: Vec<String> =
                self.where_clauses.iter().map(|p| p.to_sql()).collect();
            sql.push_str(" WHERE ");
            sql.push_str(&where_parts.join(" AND "));
        }
    }

    /// Whether the element satisfies every constraint of the plan
    pub fn matches(&self, element: &Element) -> bool {
        element.element_type == self.element_type
            && self.where_clauses.iter().all(|p| p.matches(element))
    }

    /// Sort elements by the plan's ordering; ties fall back to element id
    pub fn sort(&self, elements: &mut [Element]) {
        elements.sort_by(|a, b| {
            for order in &self.order_by {
                let ordering = compare_values(
                    a.value(&order.column.source),
                    b.value(&order.column.source),
                    order.direction,
                );
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            a.id.cmp(&b.id)
        });
    }
}

/// Missing values sort after present ones in either direction
fn compare_values(
    a: Option<serde_json::Value>,
    b: Option<serde_json::Value>,
    direction: SortDirection,
) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => {
            let left = Operand::infer(&a);
            let right = Operand::infer(&b);
            let ordering = left.total_cmp(&right);
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_builder::CompareOp;

    #[test]
    fn test_basic_plan_sql() {
        let mut plan = QueryPlan::new(ElementType::Entry);
        plan.ensure_join(Join::inner("entries", "entries.id = elements.id"));
        plan.where_clause(Predicate::compare(
            ColumnRef::attribute(ElementType::Entry, "sectionId"),
            CompareOp::Eq,
            5,
        ));
        plan.order_by(
            ColumnRef::attribute(ElementType::Entry, "postDate"),
            SortDirection::Desc,
        );
        plan.set_pagination(Pagination {
            limit: Some(10),
            offset: None,
        });

        let sql = plan.build_sql();
        assert!(sql.starts_with("SELECT elements.*, entries.* FROM elements"));
        assert!(sql.contains("INNER JOIN entries ON entries.id = elements.id"));
        assert!(sql.contains("WHERE entries.sectionId = 5"));
        assert!(sql.contains("ORDER BY entries.postDate DESC"));
        assert!(sql.ends_with("LIMIT 10"));

        let count = plan.count_sql();
        assert!(count.starts_with("SELECT COUNT(*) FROM elements"));
        assert!(!count.contains("LIMIT"));
    }

    #[test]
    fn test_joins_are_deduplicated() {
        let mut plan = QueryPlan::new(ElementType::Category);
        assert!(plan.ensure_join(Join::inner("categorygroups", "a")));
        assert!(!plan.ensure_join(Join::inner("categorygroups", "a")));
        assert_eq!(plan.joins().len(), 1);
    }

    #[test]
    fn test_sort_and_match() {
        let mut plan = QueryPlan::new(ElementType::Entry);
        plan.where_clause(Predicate::compare(
            ColumnRef::field("price"),
            CompareOp::Gte,
            10,
        ));
        plan.order_by(ColumnRef::field("price"), SortDirection::Desc);

        let mut elements = vec![
            Element::new(1, ElementType::Entry).with_field("price", 10),
            Element::new(2, ElementType::Entry).with_field("price", 30),
            Element::new(3, ElementType::Entry),
        ];
        plan.sort(&mut elements);
        assert_eq!(
            elements.iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![2, 1, 3]
        );

        assert!(plan.matches(&elements[0]));
        assert!(!plan.matches(&elements[2]));
        assert!(!plan.matches(&Element::new(4, ElementType::Asset).with_field("price", 99)));
    }

    #[test]
    fn test_sort_mixed_kinds() {
        let mut plan = QueryPlan::new(ElementType::Entry);
        plan.order_by(ColumnRef::field("rank"), SortDirection::Asc);

        let mut elements: Vec<Element> = (0..400)
            .map(|id| {
                let element = Element::new(id, ElementType::Entry);
                match id % 4 {
                    0 => element.with_field("rank", id % 7),
                    1 => element.with_field("rank", format!("{}", id % 5)),
                    2 => element.with_field("rank", format!("t{}", id % 9)),
                    _ => element.with_field("rank", serde_json::Value::Null),
                }
            })
            .collect();
        plan.sort(&mut elements);

        let kinds: Vec<u8> = elements
            .iter()
            .map(|e| match e.field("rank") {
                Some(serde_json::Value::Null) => 0,
                Some(serde_json::Value::Number(_)) => 1,
                Some(serde_json::Value::String(s)) if s.starts_with('t') => 2,
                _ => 1,
            })
            .collect();
        assert!(kinds.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(elements[0].field("rank"), Some(&serde_json::Value::Null));
        assert_eq!(
            elements.last().and_then(|e| e.field("rank")),
            Some(&serde_json::Value::from("t8"))
        );
    }
}

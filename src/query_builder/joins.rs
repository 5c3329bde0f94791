/// Represents different types of SQL JOINs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    Inner,
    Left,
}

impl JoinType {
    pub fn to_sql(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
        }
    }
}

/// Represents a SQL JOIN clause
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Join {
    pub join_type: JoinType,
    pub table: String,
    pub on_condition: String,
}

impl Join {
    /// Create an INNER JOIN
    pub fn inner(table: &str, on_condition: &str) -> Self {
        Self {
            join_type: JoinType::Inner,
            table: table.to_string(),
            on_condition: on_condition.to_string(),
        }
    }

    /// Create a LEFT JOIN
    pub fn left(table: &str, on_condition: &str) -> Self {
        Self {
            join_type: JoinType::Left,
            table: table.to_string(),
            on_condition: on_condition.to_string(),
        }
    }

    /// Whether this join introduces the same table as `other`
    pub fn same_table(&self, other: &Join) -> bool {
        self.table == other.table
    }

    /// Convert to SQL string
    pub fn to_sql(&self) -> String {
        format!(
            "{} {} ON {}",
            self.join_type.to_sql(),
            self.table,
            self.on_condition
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inner_join() {
        let join = Join::inner("entries", "entries.id = elements.id");
        assert_eq!(join.to_sql(), "INNER JOIN entries ON entries.id = elements.id");
    }

    #[test]
    fn test_left_join() {
        let join = Join::left("content", "content.elementId = elements.id");
        assert_eq!(join.to_sql(), "LEFT JOIN content ON content.elementId = elements.id");
    }

    #[test]
    fn test_same_table() {
        let a = Join::inner("sections", "sections.id = entries.sectionId");
        let b = Join::left("sections", "sections.id = entries.sectionId");
        assert!(a.same_table(&b));
        assert!(!a.same_table(&Join::inner("entries", "entries.id = elements.id")));
    }
}

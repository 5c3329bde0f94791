/// Represents pagination parameters for element queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pagination {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Pagination {
    /// Convert to SQL string
    pub fn to_sql(&self) -> String {
        let mut sql = String::new();

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        sql
    }

    /// First row of the window
    pub fn start(&self) -> u64 {
        self.offset.unwrap_or(0)
    }

    /// Number of rows the window holds out of `total_count` matching rows
    pub fn window_size(&self, total_count: u64) -> u64 {
        let available = total_count.saturating_sub(self.start());
        self.limit.map_or(available, |limit| available.min(limit))
    }
}

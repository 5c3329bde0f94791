//! # Element Queries
//!
//! Criteria, relation filters, compilation into a [`QueryPlan`](crate::query_builder::QueryPlan)
//! and async execution against an [`ElementStorage`] backend.

pub mod criteria;
pub mod cursor;
pub mod params;
pub mod query;
pub mod relations;
pub mod storage;

pub use criteria::{CriteriaSet, Criterion, CriterionValue};
pub use cursor::ElementCursor;
pub use params::parse_param;
pub use query::{ElementQuery, QueryState};
pub use relations::{RelationExpr, RelationFilter, RelationFilterState, RelationTargets};
pub use storage::{ElementStorage, InMemoryStorage};

//! # Query Plan Builder
//!
//! Typed building blocks for compiled element queries.
//!
//! ## Key Components
//!
//! - [`conditions`] - Typed predicates that render to SQL and evaluate against elements
//! - [`joins`] - JOIN clause management (INNER, LEFT)
//! - [`pagination`] - LIMIT/OFFSET windows
//! - [`plan`] - The compiled [`QueryPlan`] handed to storage
//! - [`scopes`] - Element-type base constraints and handle-based structure joins
//!
//! Every predicate carries enough information to be checked in memory as well as
//! rendered to SQL, so the in-memory storage and condition evaluation agree with
//! what a database would select.

pub mod conditions;
pub mod joins;
pub mod pagination;
pub mod plan;
pub mod scopes;

pub use conditions::{
    escape_like, like_matches, ColumnRef, CompareOp, LogicalOperator, Operand, Predicate,
    WhereClause,
};
pub use joins::{Join, JoinType};
pub use pagination::Pagination;
pub use plan::{OrderBy, QueryPlan, SortDirection};
pub use scopes::{ElementScopes, StructureScope};

#![allow(clippy::doc_markdown)] // Allow technical terms like SQL, JSON in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Element Query Core
//!
//! Query construction and condition evaluation for a content management engine.
//!
//! ## Overview
//!
//! Content is stored as typed *elements* (entries, assets, categories, tags, users).
//! This crate builds filtered, paginated queries over them and evaluates composable
//! condition trees either as additional query constraints or directly against one
//! element in memory.
//!
//! ## Module Organization
//!
//! - [`element_query`] - Fluent query builder, compilation and async execution
//! - [`conditions`] - Condition rules, composite conditions and their stored form
//! - [`registry`] - Rule type registry and plugin lifecycle
//! - [`query_builder`] - Typed predicates, joins and the compiled [`QueryPlan`]
//! - [`models`] - Elements, element types, custom fields and the structural catalog
//! - [`config`] - Engine configuration
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup and helpers
//! - [`validation`] - Limits on stored condition definitions
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use element_query::element_query::{ElementQuery, InMemoryStorage};
//! use element_query::models::{Element, ElementType};
//!
//! # async fn example() -> element_query::Result<()> {
//! let storage = InMemoryStorage::new(vec![
//!     Element::new(1, ElementType::Entry).with_attribute("slug", "foo-bar"),
//! ]);
//!
//! let mut query = ElementQuery::new(ElementType::Entry);
//! query.slug("foo*")?.limit(10)?;
//! let entries = query.all(&storage).await?;
//! assert_eq!(entries.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod conditions;
pub mod config;
pub mod constants;
pub mod element_query;
pub mod error;
pub mod logging;
pub mod models;
pub mod query_builder;
pub mod registry;
pub mod validation;

pub use conditions::{
    Combinator, Condition, ConditionConfig, ConditionLoader, ConditionRule, ConditionSettings,
    OverflowPolicy, RuleConfig, RuleKind, RuleNode,
};
pub use config::EngineConfig;
pub use element_query::{
    ElementCursor, ElementQuery, ElementStorage, InMemoryStorage, RelationExpr, RelationFilter,
};
pub use error::{QueryError, Result};
pub use models::{Catalog, CatalogEntry, Element, ElementType, FieldDefinition, FieldType};
pub use query_builder::{Predicate, QueryPlan, SortDirection};
pub use registry::{
    PluginRegistry, RuleContext, RuleTypeDescriptor, RuleTypeProvider, RuleTypeRegistry,
    RuleTypeSink,
};

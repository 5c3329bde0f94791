//! # Element Models
//!
//! Materialized elements, element types, custom field definitions and the
//! structural catalog selection rules draw their options from.

pub mod catalog;
pub mod element;
pub mod element_type;
pub mod field;

pub use catalog::{Catalog, CatalogEntry};
pub use element::{Element, ElementRelation, ValueSource};
pub use element_type::ElementType;
pub use field::{FieldDefinition, FieldType};

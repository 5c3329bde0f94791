use super::{ColumnRef, Join, Predicate, QueryPlan};
use crate::constants::{criteria, system};
use crate::models::{ElementType, ValueSource};

/// A structural container addressed by handle, e.g. `section` or `group`
#[derive(Debug, Clone, PartialEq)]
pub struct StructureScope {
    pub join: Join,
    pub handle_column: ColumnRef,
}

/// Element-type scopes shared by every query
pub struct ElementScopes;

impl ElementScopes {
    /// Base constraints for an element type: its type table, the content table and
    /// the type discriminator
    pub fn base(element_type: ElementType) -> QueryPlan {
        let mut plan = QueryPlan::new(element_type);
        let table = element_type.table();
        plan.ensure_join(Join::inner(
            table,
            &format!("{table}.id = {}.id", system::ELEMENTS_TABLE),
        ));
        plan.ensure_join(Join::left(
            system::CONTENT_TABLE,
            &format!(
                "{}.elementId = {}.id",
                system::CONTENT_TABLE,
                system::ELEMENTS_TABLE
            ),
        ));
        plan.where_clause(Predicate::ElementTypeIs(element_type));
        plan
    }

    /// Join and handle column for a handle-based criterion
    pub fn structure(element_type: ElementType, criterion: &str) -> Option<StructureScope> {
        let (table, on_condition) = match (element_type, criterion) {
            (_, criteria::SITE) => ("sites", format!("sites.id = {}.siteId", system::ELEMENTS_TABLE)),
            (ElementType::Entry, criteria::SECTION) => {
                ("sections", "sections.id = entries.sectionId".to_string())
            }
            (ElementType::Entry, criteria::TYPE) => {
                ("entrytypes", "entrytypes.id = entries.typeId".to_string())
            }
            (ElementType::Category, criteria::GROUP) => (
                "categorygroups",
                "categorygroups.id = categories.groupId".to_string(),
            ),
            (ElementType::Tag, criteria::GROUP) => {
                ("taggroups", "taggroups.id = tags.groupId".to_string())
            }
            (ElementType::Asset, criteria::VOLUME) => {
                ("volumes", "volumes.id = assets.volumeId".to_string())
            }
            _ => return None,
        };

        Some(StructureScope {
            join: Join::inner(table, &on_condition),
            handle_column: ColumnRef::new(table, "handle", ValueSource::attribute(criterion)),
        })
    }
}

//! # Element Query
//!
//! Fluent builder over criteria, relation filters and an optional condition tree.
//!
//! A query is assembled through `&mut self` setters that fail fast on conflicting
//! criteria, compiled exactly once into a frozen [`QueryPlan`], and then executed
//! any number of times against an [`ElementStorage`] backend.
//!
//! ```rust,ignore
//! let mut query = ElementQuery::new(ElementType::Entry);
//! query.section_id(5)?.status("live")?.limit(10)?;
//! let entries = query.all(&storage).await?;
//! ```

use super::criteria::{CriteriaSet, Criterion, CriterionValue};
use super::cursor::ElementCursor;
use super::params::parse_param;
use super::relations::{RelationExpr, RelationFilter};
use super::storage::ElementStorage;
use crate::conditions::serialization::{ConditionConfig, ConditionLoader};
use crate::conditions::Condition;
use crate::config::EngineConfig;
use crate::constants::{criteria, exclusivity};
use crate::error::{QueryError, Result};
use crate::logging::log_query_operation;
use crate::models::{Element, ElementType, ValueSource};
use crate::query_builder::{ColumnRef, ElementScopes, Pagination, Predicate, QueryPlan, SortDirection};
use crate::registry::RuleTypeRegistry;
use crate::validation::validate_field_handle;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Lifecycle of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Building,
    Compiled,
}

#[derive(Debug, Clone, PartialEq)]
struct Ordering {
    source: ValueSource,
    direction: SortDirection,
}

/// Builder and executor for one element query
#[derive(Debug, Clone)]
pub struct ElementQuery {
    element_type: ElementType,
    criteria: CriteriaSet,
    relations: RelationFilter,
    condition: Option<Condition>,
    eager_loads: Vec<String>,
    as_array: bool,
    limit: Option<u64>,
    offset: Option<u64>,
    ordering: Vec<Ordering>,
    state: QueryState,
    plan: Option<Arc<QueryPlan>>,
    warnings: Vec<String>,
    config: EngineConfig,
}

impl ElementQuery {
    pub fn new(element_type: ElementType) -> Self {
        Self {
            element_type,
            criteria: CriteriaSet::new(),
            relations: RelationFilter::default(),
            condition: None,
            eager_loads: Vec::new(),
            as_array: false,
            limit: None,
            offset: None,
            ordering: Vec::new(),
            state: QueryState::Building,
            plan: None,
            warnings: Vec::new(),
            config: EngineConfig::default(),
        }
    }

    /// Use engine settings such as the cursor page size and condition limits
    pub fn with_config(mut self, config: &EngineConfig) -> Self {
        self.config = config.clone();
        self
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn state(&self) -> QueryState {
        self.state
    }

    pub fn criteria(&self) -> &CriteriaSet {
        &self.criteria
    }

    pub fn relation_filter(&self) -> &RelationFilter {
        &self.relations
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    /// Non-fatal problems recorded while building, such as skipped condition rules
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    // Criteria shared by every element type

    pub fn id(&mut self, value: impl Into<CriterionValue>) -> Result<&mut Self> {
        self.set_attribute(criteria::ID, value.into())
    }

    pub fn uid(&mut self, value: impl Into<CriterionValue>) -> Result<&mut Self> {
        self.set_attribute(criteria::UID, value.into())
    }

    /// Site by handle
    pub fn site(&mut self, value: impl Into<CriterionValue>) -> Result<&mut Self> {
        self.set_attribute(criteria::SITE, value.into())
    }

    pub fn site_id(&mut self, value: impl Into<CriterionValue>) -> Result<&mut Self> {
        self.set_attribute(criteria::SITE_ID, value.into())
    }

    pub fn status(&mut self, value: impl Into<CriterionValue>) -> Result<&mut Self> {
        self.set_attribute(criteria::STATUS, value.into())
    }

    pub fn slug(&mut self, value: impl Into<CriterionValue>) -> Result<&mut Self> {
        self.set_attribute(criteria::SLUG, value.into())
    }

    pub fn title(&mut self, value: impl Into<CriterionValue>) -> Result<&mut Self> {
        self.set_attribute(criteria::TITLE, value.into())
    }

    pub fn date_created(&mut self, value: impl Into<CriterionValue>) -> Result<&mut Self> {
        self.set_attribute(criteria::DATE_CREATED, value.into())
    }

    pub fn date_updated(&mut self, value: impl Into<CriterionValue>) -> Result<&mut Self> {
        self.set_attribute(criteria::DATE_UPDATED, value.into())
    }

    // Type-specific criteria

    /// Section by handle (entries)
    pub fn section(&mut self, value: impl Into<CriterionValue>) -> Result<&mut Self> {
        self.set_attribute(criteria::SECTION, value.into())
    }

    pub fn section_id(&mut self, value: impl Into<CriterionValue>) -> Result<&mut Self> {
        self.set_attribute(criteria::SECTION_ID, value.into())
    }

    /// Entry type by handle
    pub fn type_handle(&mut self, value: impl Into<CriterionValue>) -> Result<&mut Self> {
        self.set_attribute(criteria::TYPE, value.into())
    }

    pub fn type_id(&mut self, value: impl Into<CriterionValue>) -> Result<&mut Self> {
        self.set_attribute(criteria::TYPE_ID, value.into())
    }

    /// Category or tag group by handle
    pub fn group(&mut self, value: impl Into<CriterionValue>) -> Result<&mut Self> {
        self.set_attribute(criteria::GROUP, value.into())
    }

    pub fn group_id(&mut self, value: impl Into<CriterionValue>) -> Result<&mut Self> {
        self.set_attribute(criteria::GROUP_ID, value.into())
    }

    /// Asset volume by handle
    pub fn volume(&mut self, value: impl Into<CriterionValue>) -> Result<&mut Self> {
        self.set_attribute(criteria::VOLUME, value.into())
    }

    pub fn volume_id(&mut self, value: impl Into<CriterionValue>) -> Result<&mut Self> {
        self.set_attribute(criteria::VOLUME_ID, value.into())
    }

    pub fn author_id(&mut self, value: impl Into<CriterionValue>) -> Result<&mut Self> {
        self.set_attribute(criteria::AUTHOR_ID, value.into())
    }

    /// Asset file kind
    pub fn kind(&mut self, value: impl Into<CriterionValue>) -> Result<&mut Self> {
        self.set_attribute(criteria::KIND, value.into())
    }

    pub fn post_date(&mut self, value: impl Into<CriterionValue>) -> Result<&mut Self> {
        self.set_attribute(criteria::POST_DATE, value.into())
    }

    /// Asset filename
    pub fn filename(&mut self, value: impl Into<CriterionValue>) -> Result<&mut Self> {
        self.set_attribute(criteria::FILENAME, value.into())
    }

    /// User email address
    pub fn email(&mut self, value: impl Into<CriterionValue>) -> Result<&mut Self> {
        self.set_attribute(criteria::EMAIL, value.into())
    }

    pub fn username(&mut self, value: impl Into<CriterionValue>) -> Result<&mut Self> {
        self.set_attribute(criteria::USERNAME, value.into())
    }

    /// Criterion on a custom field
    pub fn field(&mut self, handle: &str, value: impl Into<CriterionValue>) -> Result<&mut Self> {
        self.ensure_mutable()?;
        validate_field_handle(handle)?;
        self.ensure_unclaimed(handle)?;
        self.criteria.set(Criterion::field(handle, value.into()))?;
        Ok(self)
    }

    // Relations

    /// Replace the relation filter
    pub fn related_to(&mut self, expr: impl Into<RelationExpr>) -> Result<&mut Self> {
        self.ensure_mutable()?;
        self.ensure_unclaimed(criteria::RELATED_TO)?;
        self.relations.related_to(expr.into());
        Ok(self)
    }

    /// AND another relation filter onto the current one
    pub fn and_related_to(&mut self, expr: impl Into<RelationExpr>) -> Result<&mut Self> {
        self.ensure_mutable()?;
        self.ensure_unclaimed(criteria::RELATED_TO)?;
        self.relations.and_related_to(expr.into())?;
        Ok(self)
    }

    // Result shaping

    /// Eager-load a relation path
    pub fn with(&mut self, path: &str) -> Result<&mut Self> {
        self.ensure_mutable()?;
        if path.trim().is_empty() {
            return Err(QueryError::validation("with", "eager-load path is empty"));
        }
        if !self.eager_loads.iter().any(|existing| existing == path) {
            self.eager_loads.push(path.to_string());
        }
        Ok(self)
    }

    /// Return plain value maps from [`all_rows`](Self::all_rows)
    pub fn as_array(&mut self, as_array: bool) -> Result<&mut Self> {
        self.ensure_mutable()?;
        self.as_array = as_array;
        Ok(self)
    }

    pub fn limit(&mut self, limit: u64) -> Result<&mut Self> {
        self.ensure_mutable()?;
        self.limit = Some(limit);
        Ok(self)
    }

    pub fn offset(&mut self, offset: u64) -> Result<&mut Self> {
        self.ensure_mutable()?;
        self.offset = Some(offset);
        Ok(self)
    }

    /// Order by a native attribute or, failing that, a custom field handle.
    ///
    /// Handle criteria such as `section` order by their id column.
    pub fn order_by(&mut self, column: &str, direction: SortDirection) -> Result<&mut Self> {
        self.ensure_mutable()?;
        if column == criteria::RELATED_TO {
            return Err(QueryError::validation(
                "orderBy",
                "relation filters cannot be used for ordering",
            ));
        }
        let source = if ElementScopes::structure(self.element_type, column).is_some() {
            let id_column = exclusivity::group_of(column)
                .and_then(|group| group.iter().copied().find(|member| *member != column))
                .ok_or_else(|| {
                    QueryError::validation("orderBy", format!("'{column}' has no id column to order by"))
                })?;
            ValueSource::attribute(id_column)
        } else if self.element_type.supports_criterion(column) {
            ValueSource::attribute(column)
        } else {
            validate_field_handle(column)?;
            ValueSource::field(column)
        };
        self.ordering.push(Ordering { source, direction });
        Ok(self)
    }

    // Conditions

    /// Attach a condition tree, replacing any attached earlier. Its claimed params
    /// must not overlap set criteria.
    pub fn attach_condition(&mut self, mut condition: Condition) -> Result<&mut Self> {
        self.ensure_mutable()?;

        if let Some(other) = condition.element_type() {
            if other != self.element_type {
                return Err(QueryError::configuration(
                    "ElementQuery",
                    format!(
                        "a {other} condition cannot filter a {} query",
                        self.element_type
                    ),
                ));
            }
        }

        let claimed = condition.exclusive_query_params();
        let collisions: Vec<&String> = claimed
            .iter()
            .filter(|param| self.occupied_params().contains(param.as_str()))
            .collect();
        if !collisions.is_empty() {
            return Err(QueryError::configuration(
                "ElementQuery",
                format!(
                    "condition rules duplicate query criteria: {}",
                    collisions
                        .iter()
                        .map(|param| param.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            ));
        }

        condition.set_element_type(self.element_type);
        if let Some(previous) = self.condition.replace(condition) {
            warn!(
                element_type = %self.element_type,
                replaced_uid = %previous.uid(),
                "Replacing previously attached condition"
            );
        }
        Ok(self)
    }

    /// Load a stored condition and attach it. Rules whose type is no longer
    /// registered are skipped and reported through [`warnings`](Self::warnings).
    pub fn attach_condition_config(
        &mut self,
        config: &ConditionConfig,
        registry: &RuleTypeRegistry,
    ) -> Result<&mut Self> {
        self.ensure_mutable()?;
        let condition =
            ConditionLoader::with_config(registry, &self.config).load(config, Some(self.element_type))?;

        for diagnostic in condition.all_diagnostics() {
            warn!(
                element_type = %self.element_type,
                rule_type = %diagnostic.rule_type,
                "Condition rule unavailable; query runs without it"
            );
            self.warnings.push(format!(
                "skipped condition rule '{}': {}",
                diagnostic.rule_type, diagnostic.message
            ));
        }

        self.attach_condition(condition)
    }

    // Compilation

    /// Freeze the query into a plan. Can only be called once.
    pub fn compile(&mut self) -> Result<Arc<QueryPlan>> {
        self.ensure_mutable()?;

        let mut plan = ElementScopes::base(self.element_type);
        debug!(element_type = %self.element_type, "Applied base element scope");

        for criterion in self.criteria.iter() {
            if criterion.value.is_null() {
                continue;
            }
            let structure = match &criterion.source {
                ValueSource::Attribute(name) => ElementScopes::structure(self.element_type, name),
                ValueSource::Field(_) => None,
            };
            let predicate = match structure {
                Some(scope) => {
                    plan.ensure_join(scope.join);
                    parse_param(&scope.handle_column, &criterion.value)?
                }
                None => parse_param(
                    &ColumnRef::for_source(self.element_type, &criterion.source),
                    &criterion.value,
                )?,
            };
            plan.where_clause(predicate);
        }

        if let Some(expr) = self.relations.expression() {
            plan.where_clause(Predicate::Related(expr.clone()));
        }
        debug!(
            element_type = %self.element_type,
            criteria = self.criteria.len(),
            relation_state = %self.relations.state(),
            "Applied direct criteria"
        );

        if let Some(condition) = &self.condition {
            condition.modify_query(&mut plan);
            debug!(
                element_type = %self.element_type,
                condition_uid = %condition.uid(),
                rules = condition.rule_count(),
                "Applied condition"
            );
        }

        for path in &self.eager_loads {
            plan.eager_load(path);
        }

        for ordering in &self.ordering {
            plan.order_by(
                ColumnRef::for_source(self.element_type, &ordering.source),
                ordering.direction,
            );
        }
        plan.set_pagination(Pagination {
            limit: self.limit,
            offset: self.offset,
        });
        plan.set_as_array(self.as_array);

        let plan = Arc::new(plan);
        self.plan = Some(Arc::clone(&plan));
        self.state = QueryState::Compiled;

        log_query_operation(
            "compile",
            self.element_type.type_value(),
            self.criteria.len(),
            "compiled",
            Some(plan.build_sql().as_str()),
        );
        Ok(plan)
    }

    /// The compiled plan, compiling on first use
    fn compiled_plan(&mut self) -> Result<Arc<QueryPlan>> {
        match &self.plan {
            Some(plan) => Ok(Arc::clone(plan)),
            None => self.compile(),
        }
    }

    // Execution

    /// Every element in the query window
    pub async fn all(&mut self, storage: &dyn ElementStorage) -> Result<Vec<Element>> {
        let plan = self.compiled_plan()?;
        let pagination = plan.pagination();
        storage
            .fetch_page(&plan, pagination.start(), pagination.limit.unwrap_or(u64::MAX))
            .await
    }

    /// Every element in the query window as plain value maps
    pub async fn all_rows(&mut self, storage: &dyn ElementStorage) -> Result<Vec<Value>> {
        let elements = self.all(storage).await?;
        Ok(elements.iter().map(Element::to_array).collect())
    }

    /// First element of the query window
    pub async fn one(&mut self, storage: &dyn ElementStorage) -> Result<Option<Element>> {
        let plan = self.compiled_plan()?;
        let pagination = plan.pagination();
        if pagination.limit == Some(0) {
            return Ok(None);
        }
        let mut page = storage.fetch_page(&plan, pagination.start(), 1).await?;
        Ok(page.pop())
    }

    /// Number of elements in the query window
    pub async fn count(&mut self, storage: &dyn ElementStorage) -> Result<u64> {
        let plan = self.compiled_plan()?;
        let total = storage.count(&plan).await?;
        Ok(plan.pagination().window_size(total))
    }

    pub async fn exists(&mut self, storage: &dyn ElementStorage) -> Result<bool> {
        Ok(self.one(storage).await?.is_some())
    }

    /// Forward-only cursor fetching in pages of the configured size
    pub fn cursor(&mut self, storage: Arc<dyn ElementStorage>) -> Result<ElementCursor> {
        let plan = self.compiled_plan()?;
        Ok(ElementCursor::new(storage, plan, self.config.page_size))
    }

    // Internals

    fn ensure_mutable(&self) -> Result<()> {
        match self.state {
            QueryState::Building => Ok(()),
            QueryState::Compiled => Err(QueryError::immutable_state(format!(
                "{} query has already been compiled",
                self.element_type
            ))),
        }
    }

    fn set_attribute(&mut self, name: &str, value: CriterionValue) -> Result<&mut Self> {
        self.ensure_mutable()?;
        if !self.element_type.supports_criterion(name) {
            return Err(QueryError::configuration(
                "ElementQuery",
                format!("{} queries do not support '{name}'", self.element_type),
            ));
        }
        self.ensure_unclaimed(name)?;
        self.criteria.set(Criterion::attribute(name, value))?;
        Ok(self)
    }

    /// Fails when the attached condition already filters on `name` or a criterion
    /// exclusive with it
    fn ensure_unclaimed(&self, name: &str) -> Result<()> {
        let Some(condition) = &self.condition else {
            return Ok(());
        };
        let claimed = condition.exclusive_query_params();
        let related = exclusivity::group_of(name).unwrap_or(&[]);
        let collision = claimed
            .iter()
            .find(|param| param.as_str() == name || related.contains(&param.as_str()));
        match collision {
            Some(param) => Err(QueryError::configuration(
                "ElementQuery",
                format!("'{name}' collides with condition rule param '{param}'"),
            )),
            None => Ok(()),
        }
    }

    /// Criterion names already in use, expanded to their exclusivity groups
    fn occupied_params(&self) -> BTreeSet<&str> {
        let mut occupied = BTreeSet::new();
        for name in self.criteria.names() {
            occupied.insert(name);
            if let Some(group) = exclusivity::group_of(name) {
                occupied.extend(group.iter().copied());
            }
        }
        if self.relations.is_set() {
            occupied.insert(criteria::RELATED_TO);
        }
        occupied
    }
}

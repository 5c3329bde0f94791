//! # Rule Type Registry
//!
//! Maps rule type identifiers to factories. For a given element type the registry
//! merges three sources, in priority order:
//!
//! 1. rule types intrinsic to the element type
//! 2. rule types contributed by each custom field in the element type's field layout
//! 3. rule types contributed by installed [`RuleTypeProvider`]s
//!
//! Identifiers are de-duplicated with the first registration winning.
//!
//! ## Concurrency
//!
//! State is copy-on-write. Readers take an `Arc` snapshot and never observe a
//! partially-applied change; writers clone the current state, modify the clone and
//! swap it in under a short `parking_lot` lock.

use crate::conditions::builtin;
use crate::conditions::rule::{ConditionRule, RuleCategory, RuleKind};
use crate::conditions::serialization::{parse_uid, RuleConfig};
use crate::error::{QueryError, Result};
use crate::logging::log_registry_operation;
use crate::models::{Catalog, ElementType, FieldDefinition};
use crate::validation::{validate_field_handle, validate_plugin_identifier};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// What rule types are being requested for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleContext {
    pub element_type: ElementType,
    /// Restrict field contributions to one field handle
    pub field: Option<String>,
}

impl RuleContext {
    pub fn new(element_type: ElementType) -> Self {
        Self {
            element_type,
            field: None,
        }
    }

    pub fn for_field(element_type: ElementType, handle: &str) -> Self {
        Self {
            element_type,
            field: Some(handle.to_string()),
        }
    }
}

/// Inputs available to a rule factory
#[derive(Debug, Clone, Copy)]
pub struct FactoryContext<'a> {
    pub element_type: ElementType,
    pub catalog: &'a Catalog,
}

/// Builds a rule body from stored operands. Must be free of side effects.
pub type RuleFactory =
    Arc<dyn Fn(&FactoryContext<'_>, &Map<String, Value>) -> Result<RuleKind> + Send + Sync>;

/// Who contributed a rule type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSource {
    ElementType,
    Field(String),
    Plugin(String),
}

/// A registered rule type
#[derive(Clone)]
pub struct RuleTypeDescriptor {
    pub identifier: String,
    pub label: String,
    pub category: RuleCategory,
    pub exclusive_query_params: Vec<String>,
    pub source: RuleSource,
    factory: RuleFactory,
}

impl fmt::Debug for RuleTypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleTypeDescriptor")
            .field("identifier", &self.identifier)
            .field("label", &self.label)
            .field("category", &self.category)
            .field("exclusive_query_params", &self.exclusive_query_params)
            .field("source", &self.source)
            .finish()
    }
}

impl RuleTypeDescriptor {
    pub fn new<F>(identifier: &str, label: &str, category: RuleCategory, factory: F) -> Self
    where
        F: Fn(&FactoryContext<'_>, &Map<String, Value>) -> Result<RuleKind> + Send + Sync + 'static,
    {
        Self {
            identifier: identifier.to_string(),
            label: label.to_string(),
            category,
            exclusive_query_params: Vec::new(),
            source: RuleSource::ElementType,
            factory: Arc::new(factory),
        }
    }

    pub fn with_exclusive_params(mut self, params: &[&str]) -> Self {
        self.exclusive_query_params = params.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn with_source(mut self, source: RuleSource) -> Self {
        self.source = source;
        self
    }

    /// Hydrate a rule of this type
    pub fn build(
        &self,
        context: &FactoryContext<'_>,
        uid: Option<Uuid>,
        operands: &Map<String, Value>,
    ) -> Result<ConditionRule> {
        let kind = (self.factory)(context, operands)?;
        if kind.category() != self.category {
            return Err(QueryError::configuration(
                "RuleTypeRegistry",
                format!(
                    "factory for '{}' produced a {} rule, expected {}",
                    self.identifier,
                    kind.category(),
                    self.category
                ),
            ));
        }
        let rule = ConditionRule::new(self.identifier.clone(), kind)
            .with_exclusive_params(self.exclusive_query_params.iter().cloned());
        Ok(match uid {
            Some(uid) => rule.with_uid(uid),
            None => rule,
        })
    }
}

/// Collects rule types a provider registers
#[derive(Debug)]
pub struct RuleTypeSink {
    provider: String,
    descriptors: Vec<RuleTypeDescriptor>,
}

impl RuleTypeSink {
    fn new(provider: &str) -> Self {
        Self {
            provider: provider.to_string(),
            descriptors: Vec::new(),
        }
    }

    /// Register a rule type. Identifiers must be namespaced (`vendor:Name`).
    pub fn register(&mut self, descriptor: RuleTypeDescriptor) -> Result<()> {
        validate_plugin_identifier(&descriptor.identifier)?;
        self.descriptors
            .push(descriptor.with_source(RuleSource::Plugin(self.provider.clone())));
        Ok(())
    }

    fn into_descriptors(self) -> Vec<RuleTypeDescriptor> {
        self.descriptors
    }
}

/// Extension hook through which plugins contribute rule types
pub trait RuleTypeProvider: Send + Sync {
    /// Unique provider name
    fn name(&self) -> &str;

    /// Register the rule types available in `context`
    fn register_rule_types(&self, context: &RuleContext, sink: &mut RuleTypeSink) -> Result<()>;
}

#[derive(Clone, Default)]
struct RegistryState {
    catalog: Catalog,
    field_layouts: HashMap<ElementType, Vec<FieldDefinition>>,
    providers: Vec<Arc<dyn RuleTypeProvider>>,
}

/// Immutable view of the registry at one point in time
#[derive(Clone)]
pub struct RegistrySnapshot {
    state: Arc<RegistryState>,
}

impl fmt::Debug for RegistrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrySnapshot")
            .field("providers", &self.provider_names())
            .field("field_layouts", &self.state.field_layouts.len())
            .finish()
    }
}

impl RegistrySnapshot {
    pub fn catalog(&self) -> &Catalog {
        &self.state.catalog
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.state
            .providers
            .iter()
            .map(|provider| provider.name().to_string())
            .collect()
    }

    pub fn field_layout(&self, element_type: ElementType) -> &[FieldDefinition] {
        self.state
            .field_layouts
            .get(&element_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every rule type applicable in `context`
    pub fn rules_for(&self, context: &RuleContext) -> Vec<RuleTypeDescriptor> {
        let mut descriptors = builtin::element_type_rules(context.element_type);

        for field in self.field_layout(context.element_type) {
            if context.field.as_deref().is_some_and(|handle| handle != field.handle) {
                continue;
            }
            descriptors.extend(builtin::field_rules(field));
        }

        for provider in &self.state.providers {
            let mut sink = RuleTypeSink::new(provider.name());
            match provider.register_rule_types(context, &mut sink) {
                Ok(()) => descriptors.extend(sink.into_descriptors()),
                Err(err) => warn!(
                    provider = provider.name(),
                    element_type = %context.element_type,
                    error = %err,
                    "Rule type provider failed to register; skipping its rule types"
                ),
            }
        }

        let mut seen = HashSet::new();
        descriptors.retain(|descriptor| {
            let first = seen.insert(descriptor.identifier.clone());
            if !first {
                debug!(
                    identifier = %descriptor.identifier,
                    source = ?descriptor.source,
                    "Ignoring duplicate rule type registration"
                );
            }
            first
        });
        descriptors
    }

    pub fn descriptor(&self, context: &RuleContext, identifier: &str) -> Option<RuleTypeDescriptor> {
        self.rules_for(context)
            .into_iter()
            .find(|descriptor| descriptor.identifier == identifier)
    }

    /// Resolve a stored rule to a concrete rule.
    ///
    /// Fails with [`QueryError::UnknownRuleType`] when the identifier is not registered.
    pub fn instantiate(&self, context: &RuleContext, config: &RuleConfig) -> Result<ConditionRule> {
        let descriptor = self
            .descriptor(context, &config.rule_type)
            .ok_or_else(|| QueryError::unknown_rule_type(&config.rule_type))?;
        let uid = config.uid.as_deref().map(parse_uid).transpose()?;
        let factory_context = FactoryContext {
            element_type: context.element_type,
            catalog: &self.state.catalog,
        };
        descriptor.build(&factory_context, uid, &config.operands)
    }
}

/// Process-wide rule type registry, passed to queries and loaders as a dependency
#[derive(Default)]
pub struct RuleTypeRegistry {
    state: RwLock<Arc<RegistryState>>,
}

impl fmt::Debug for RuleTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleTypeRegistry")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

impl RuleTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: Catalog) -> Self {
        let registry = Self::new();
        registry.set_catalog(catalog);
        registry
    }

    /// Current state; unaffected by later changes
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            state: Arc::clone(&self.state.read()),
        }
    }

    fn update<F>(&self, apply: F) -> Result<()>
    where
        F: FnOnce(&mut RegistryState) -> Result<()>,
    {
        let mut guard = self.state.write();
        let mut next = RegistryState::clone(&guard);
        apply(&mut next)?;
        *guard = Arc::new(next);
        Ok(())
    }

    fn replace<F>(&self, apply: F)
    where
        F: FnOnce(&mut RegistryState),
    {
        let mut guard = self.state.write();
        let mut next = RegistryState::clone(&guard);
        apply(&mut next);
        *guard = Arc::new(next);
    }

    /// Replace the catalog select rules resolve their options from
    pub fn set_catalog(&self, catalog: Catalog) {
        self.replace(|state| state.catalog = catalog);
        log_registry_operation("set_catalog", None, None, "updated", None);
    }

    /// Replace the custom fields attached to an element type
    pub fn set_field_layout(&self, element_type: ElementType, fields: Vec<FieldDefinition>) -> Result<()> {
        let mut handles = HashSet::new();
        for field in &fields {
            validate_field_handle(&field.handle)?;
            if !handles.insert(field.handle.as_str()) {
                return Err(QueryError::configuration(
                    "RuleTypeRegistry",
                    format!("field handle '{}' appears twice in the layout", field.handle),
                ));
            }
        }

        let count = fields.len();
        self.replace(|state| {
            state.field_layouts.insert(element_type, fields);
        });
        log_registry_operation(
            "set_field_layout",
            None,
            None,
            "updated",
            Some(format!("{element_type}: {count} fields").as_str()),
        );
        Ok(())
    }

    /// Install a rule type provider
    pub fn install_provider(&self, provider: Arc<dyn RuleTypeProvider>) -> Result<()> {
        let name = provider.name().to_string();
        self.update(|state| {
            if state.providers.iter().any(|existing| existing.name() == name) {
                return Err(QueryError::configuration(
                    "RuleTypeRegistry",
                    format!("provider '{name}' is already installed"),
                ));
            }
            state.providers.push(provider);
            Ok(())
        })?;
        log_registry_operation("install_provider", Some(&name), None, "installed", None);
        Ok(())
    }

    /// Remove a provider; its rule types stop resolving immediately
    pub fn uninstall_provider(&self, name: &str) -> Result<()> {
        self.update(|state| {
            let before = state.providers.len();
            state.providers.retain(|provider| provider.name() != name);
            if state.providers.len() == before {
                return Err(QueryError::configuration(
                    "RuleTypeRegistry",
                    format!("provider '{name}' is not installed"),
                ));
            }
            Ok(())
        })?;
        log_registry_operation("uninstall_provider", Some(name), None, "uninstalled", None);
        Ok(())
    }

    pub fn has_provider(&self, name: &str) -> bool {
        self.snapshot().provider_names().iter().any(|n| n == name)
    }

    pub fn rules_for(&self, context: &RuleContext) -> Vec<RuleTypeDescriptor> {
        self.snapshot().rules_for(context)
    }

    pub fn instantiate(&self, context: &RuleContext, config: &RuleConfig) -> Result<ConditionRule> {
        self.snapshot().instantiate(context, config)
    }
}

//! # Plugin Registry
//!
//! Lifecycle management for plugins that contribute condition rule types.
//!
//! ## Overview
//!
//! Each plugin wraps a [`RuleTypeProvider`]. Enabling a plugin installs its provider
//! into the shared [`RuleTypeRegistry`]; disabling or uninstalling removes it, after
//! which saved conditions referencing its rule types load in degraded form.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use element_query::registry::{PluginMetadata, PluginRegistry, RuleTypeRegistry};
//! use std::sync::Arc;
//!
//! let rule_types = Arc::new(RuleTypeRegistry::new());
//! let plugins = PluginRegistry::new(Arc::clone(&rule_types));
//!
//! plugins.install_plugin(PluginMetadata::new("seo", "1.0.0", "SEO rules"), Arc::new(SeoRules))?;
//! plugins.disable_plugin("seo")?;
//! ```

use super::rule_type_registry::{RuleTypeProvider, RuleTypeRegistry};
use crate::error::{QueryError, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Plugin metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginMetadata {
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: Option<String>,
}

impl PluginMetadata {
    pub fn new(name: &str, version: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            description: description.to_string(),
            author: None,
        }
    }

    pub fn with_author(mut self, author: &str) -> Self {
        self.author = Some(author.to_string());
        self
    }
}

/// Plugin state for runtime management
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginState {
    Enabled,
    Disabled,
    Failed,
}

/// Installed plugin
#[derive(Clone)]
pub struct Plugin {
    pub metadata: PluginMetadata,
    pub state: PluginState,
    pub error_message: Option<String>,
    pub installed_at: DateTime<Utc>,
    provider: Arc<dyn RuleTypeProvider>,
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("metadata", &self.metadata)
            .field("state", &self.state)
            .field("error_message", &self.error_message)
            .field("installed_at", &self.installed_at)
            .field("provider", &self.provider.name())
            .finish()
    }
}

/// Registry for managing rule type plugins
pub struct PluginRegistry {
    plugins: RwLock<HashMap<String, Plugin>>,
    rule_types: Arc<RuleTypeRegistry>,
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("stats", &self.stats())
            .finish()
    }
}

impl PluginRegistry {
    pub fn new(rule_types: Arc<RuleTypeRegistry>) -> Self {
        Self {
            plugins: RwLock::new(HashMap::new()),
            rule_types,
        }
    }

    /// The rule type registry plugins are installed into
    pub fn rule_types(&self) -> &Arc<RuleTypeRegistry> {
        &self.rule_types
    }

    /// Install and enable a plugin.
    ///
    /// A provider the rule type registry rejects leaves the plugin recorded as
    /// [`PluginState::Failed`] and returns the error.
    pub fn install_plugin(
        &self,
        metadata: PluginMetadata,
        provider: Arc<dyn RuleTypeProvider>,
    ) -> Result<()> {
        let name = metadata.name.clone();
        let mut plugins = self.plugins.write();
        if plugins.contains_key(&name) {
            return Err(QueryError::configuration(
                "PluginRegistry",
                format!("Plugin '{name}' is already installed"),
            ));
        }

        let mut plugin = Plugin {
            metadata,
            state: PluginState::Enabled,
            error_message: None,
            installed_at: Utc::now(),
            provider: Arc::clone(&provider),
        };

        let outcome = self.rule_types.install_provider(provider);
        if let Err(err) = &outcome {
            warn!(plugin = %name, error = %err, "Plugin failed to install");
            plugin.state = PluginState::Failed;
            plugin.error_message = Some(err.to_string());
        } else {
            info!(plugin = %name, version = %plugin.metadata.version, "Installed plugin");
        }

        plugins.insert(name, plugin);
        outcome
    }

    /// Re-enable a disabled or failed plugin
    pub fn enable_plugin(&self, name: &str) -> Result<()> {
        let mut plugins = self.plugins.write();
        let plugin = plugins.get_mut(name).ok_or_else(|| not_found(name))?;

        match plugin.state {
            PluginState::Enabled => Err(QueryError::configuration(
                "PluginRegistry",
                format!("Plugin '{name}' is already enabled"),
            )),
            PluginState::Disabled | PluginState::Failed => {
                match self.rule_types.install_provider(Arc::clone(&plugin.provider)) {
                    Ok(()) => {
                        plugin.state = PluginState::Enabled;
                        plugin.error_message = None;
                        info!(plugin = %name, "Enabled plugin");
                        Ok(())
                    }
                    Err(err) => {
                        plugin.state = PluginState::Failed;
                        plugin.error_message = Some(err.to_string());
                        Err(err)
                    }
                }
            }
        }
    }

    /// Disable a plugin; its rule types stop resolving
    pub fn disable_plugin(&self, name: &str) -> Result<()> {
        let mut plugins = self.plugins.write();
        let plugin = plugins.get_mut(name).ok_or_else(|| not_found(name))?;

        if plugin.state != PluginState::Enabled {
            return Err(QueryError::configuration(
                "PluginRegistry",
                format!("Plugin '{name}' is not enabled"),
            ));
        }

        self.rule_types.uninstall_provider(plugin.provider.name())?;
        plugin.state = PluginState::Disabled;
        info!(plugin = %name, "Disabled plugin");
        Ok(())
    }

    /// Remove a plugin entirely
    pub fn uninstall_plugin(&self, name: &str) -> Result<PluginMetadata> {
        let mut plugins = self.plugins.write();
        let plugin = plugins.remove(name).ok_or_else(|| not_found(name))?;

        if plugin.state == PluginState::Enabled {
            self.rule_types.uninstall_provider(plugin.provider.name())?;
        }
        info!(plugin = %name, "Uninstalled plugin");
        Ok(plugin.metadata)
    }

    pub fn list_plugins(&self) -> Vec<Plugin> {
        let mut plugins: Vec<_> = self.plugins.read().values().cloned().collect();
        plugins.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        plugins
    }

    pub fn get_plugin(&self, name: &str) -> Option<Plugin> {
        self.plugins.read().get(name).cloned()
    }

    pub fn is_installed(&self, name: &str) -> bool {
        self.plugins.read().contains_key(name)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.plugins
            .read()
            .get(name)
            .is_some_and(|plugin| plugin.state == PluginState::Enabled)
    }

    pub fn stats(&self) -> PluginStats {
        let plugins = self.plugins.read();
        let mut stats = PluginStats::default();

        for plugin in plugins.values() {
            stats.total_plugins += 1;
            match plugin.state {
                PluginState::Enabled => stats.enabled_plugins += 1,
                PluginState::Disabled => stats.disabled_plugins += 1,
                PluginState::Failed => stats.failed_plugins += 1,
            }
        }

        stats
    }
}

fn not_found(name: &str) -> QueryError {
    QueryError::configuration("PluginRegistry", format!("Plugin '{name}' not found"))
}

/// Statistics about installed plugins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginStats {
    pub total_plugins: usize,
    pub enabled_plugins: usize,
    pub disabled_plugins: usize,
    pub failed_plugins: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::rule::{RuleCategory, RuleKind, TextRule};
    use crate::models::{ElementType, ValueSource};
    use crate::registry::{RuleContext, RuleTypeDescriptor, RuleTypeSink};

    struct Provider(&'static str);

    impl RuleTypeProvider for Provider {
        fn name(&self) -> &str {
            self.0
        }

        fn register_rule_types(&self, _: &RuleContext, sink: &mut RuleTypeSink) -> Result<()> {
            sink.register(RuleTypeDescriptor::new(
                &format!("{}:Headline", self.0),
                "Headline",
                RuleCategory::Text,
                |_, operands| {
                    Ok(RuleKind::Text(TextRule::from_operands(
                        ValueSource::field("headline"),
                        operands,
                    )?))
                },
            ))
        }
    }

    fn registry() -> PluginRegistry {
        PluginRegistry::new(Arc::new(RuleTypeRegistry::new()))
    }

    fn has_headline(registry: &PluginRegistry, provider: &str) -> bool {
        registry
            .rule_types()
            .snapshot()
            .descriptor(
                &RuleContext::new(ElementType::Entry),
                &format!("{provider}:Headline"),
            )
            .is_some()
    }

    #[test]
    fn test_plugin_lifecycle() {
        let registry = registry();
        registry
            .install_plugin(
                PluginMetadata::new("news", "1.0.0", "News rules").with_author("Newsroom"),
                Arc::new(Provider("news")),
            )
            .unwrap();
        assert!(registry.is_enabled("news"));
        assert!(has_headline(&registry, "news"));

        registry.disable_plugin("news").unwrap();
        assert_eq!(registry.get_plugin("news").unwrap().state, PluginState::Disabled);
        assert!(!has_headline(&registry, "news"));
        assert!(registry.disable_plugin("news").is_err());

        registry.enable_plugin("news").unwrap();
        assert!(has_headline(&registry, "news"));

        let metadata = registry.uninstall_plugin("news").unwrap();
        assert_eq!(metadata.author.as_deref(), Some("Newsroom"));
        assert!(!registry.is_installed("news"));
        assert!(!has_headline(&registry, "news"));
    }

    #[test]
    fn test_provider_conflict_marks_plugin_failed() {
        let registry = registry();
        registry
            .install_plugin(PluginMetadata::new("a", "1.0.0", "A"), Arc::new(Provider("shared")))
            .unwrap();
        let err = registry
            .install_plugin(PluginMetadata::new("b", "1.0.0", "B"), Arc::new(Provider("shared")))
            .unwrap_err();
        assert!(matches!(err, QueryError::Configuration { .. }));

        let failed = registry.get_plugin("b").unwrap();
        assert_eq!(failed.state, PluginState::Failed);
        assert!(failed.error_message.is_some());

        assert_eq!(
            registry.stats(),
            PluginStats {
                total_plugins: 2,
                enabled_plugins: 1,
                disabled_plugins: 0,
                failed_plugins: 1,
            }
        );
    }

    #[test]
    fn test_unknown_plugin_errors() {
        let registry = registry();
        assert!(registry.enable_plugin("missing").is_err());
        assert!(registry.disable_plugin("missing").is_err());
        assert!(registry.uninstall_plugin("missing").is_err());
        assert!(registry.list_plugins().is_empty());
    }
}

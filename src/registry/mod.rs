//! # Registry Infrastructure
//!
//! Rule type resolution and plugin lifecycle management.
//!
//! ## Architecture
//!
//! ```text
//! Registry Infrastructure
//! ├── RuleTypeRegistry   (identifier -> factory, copy-on-write snapshots)
//! └── PluginRegistry     (installs RuleTypeProviders into the rule type registry)
//! ```

pub mod plugin_registry;
pub mod rule_type_registry;

pub use plugin_registry::{Plugin, PluginMetadata, PluginRegistry, PluginState, PluginStats};
pub use rule_type_registry::{
    FactoryContext, RegistrySnapshot, RuleContext, RuleFactory, RuleSource, RuleTypeDescriptor,
    RuleTypeProvider, RuleTypeRegistry, RuleTypeSink,
};

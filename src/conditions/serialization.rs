//! # Condition Serialization
//!
//! Stored form of condition trees and the loader that hydrates them through the rule
//! type registry.
//!
//! Composite nodes serialize as
//! `{"uid", "elementType"?, "combinator": "and"|"or", "conditionRules": [...]}` plus any
//! non-default settings; leaf nodes serialize as `{"type", "uid", ...operands}`.
//! Keys are emitted in a fixed order so serializing a loaded condition reproduces the
//! stored bytes.
//!
//! Loading degrades gracefully: a leaf whose rule type is no longer registered is
//! skipped, logged and recorded as a diagnostic on its parent condition.

use super::condition::{Combinator, Condition, ConditionDiagnostic, ConditionSettings, RuleNode};
use crate::config::EngineConfig;
use crate::constants::system;
use crate::error::{QueryError, Result};
use crate::models::ElementType;
use crate::registry::{RegistrySnapshot, RuleContext, RuleTypeRegistry};
use crate::validation::{validate_condition_payload, validate_payload_size, ConditionLimits};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

/// Stored form of a leaf rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    #[serde(rename = "type")]
    pub rule_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(flatten)]
    pub operands: Map<String, Value>,
}

impl RuleConfig {
    pub fn new(rule_type: impl Into<String>, operands: Map<String, Value>) -> Self {
        Self {
            rule_type: rule_type.into(),
            uid: None,
            operands,
        }
    }

    /// Parse a leaf from its JSON object form
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

/// Stored form of a composite condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<ElementType>,
    pub combinator: Combinator,
    #[serde(default)]
    pub condition_rules: Vec<RuleNodeConfig>,
    #[serde(flatten)]
    pub settings: ConditionSettings,
}

impl ConditionConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Nesting depth, counting this node as 1
    pub fn depth(&self) -> usize {
        1 + self
            .condition_rules
            .iter()
            .map(|child| match child {
                RuleNodeConfig::Condition(nested) => nested.depth(),
                RuleNodeConfig::Rule(_) => 0,
            })
            .max()
            .unwrap_or(0)
    }
}

/// Stored form of any child node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleNodeConfig {
    Condition(ConditionConfig),
    Rule(RuleConfig),
}

/// Hydrates stored conditions through a registry snapshot
pub struct ConditionLoader<'a> {
    registry: &'a RuleTypeRegistry,
    limits: ConditionLimits,
}

impl<'a> ConditionLoader<'a> {
    pub fn new(registry: &'a RuleTypeRegistry) -> Self {
        Self {
            registry,
            limits: ConditionLimits {
                max_depth: system::MAX_CONDITION_DEPTH,
                max_bytes: system::MAX_SERIALIZED_CONDITION_BYTES,
            },
        }
    }

    pub fn with_config(registry: &'a RuleTypeRegistry, config: &EngineConfig) -> Self {
        Self {
            registry,
            limits: ConditionLimits {
                max_depth: config.max_condition_depth,
                max_bytes: config.max_serialized_bytes,
            },
        }
    }

    /// Load from JSON text
    pub fn load_json(&self, json: &str, element_type: Option<ElementType>) -> Result<Condition> {
        validate_payload_size(json.len(), self.limits)?;
        let value: Value = serde_json::from_str(json)?;
        self.load_value(&value, element_type)
    }

    /// Load from a JSON value after checking size and nesting
    pub fn load_value(&self, value: &Value, element_type: Option<ElementType>) -> Result<Condition> {
        validate_condition_payload(value, self.limits)?;
        let config: ConditionConfig = serde_json::from_value(value.clone())?;
        self.load(&config, element_type)
    }

    /// Hydrate a parsed definition. `element_type` must agree with a stored `elementType`.
    pub fn load(&self, config: &ConditionConfig, element_type: Option<ElementType>) -> Result<Condition> {
        let element_type = match (config.element_type, element_type) {
            (Some(stored), Some(requested)) if stored != requested => {
                return Err(QueryError::configuration(
                    "ConditionLoader",
                    format!("condition filters {stored} elements, not {requested}"),
                ))
            }
            (Some(element_type), _) | (None, Some(element_type)) => element_type,
            (None, None) => {
                return Err(QueryError::configuration(
                    "ConditionLoader",
                    "an element type is required to resolve rule types",
                ))
            }
        };

        let depth = config.depth();
        if depth > self.limits.max_depth {
            return Err(QueryError::validation(
                "conditionRules",
                format!("condition nesting too deep: {depth} (max: {})", self.limits.max_depth),
            ));
        }

        let snapshot = self.registry.snapshot();
        let condition = hydrate(&snapshot, config, element_type)?;
        debug!(
            condition_uid = %condition.uid(),
            element_type = %element_type,
            rules = condition.rule_count(),
            degraded = condition.is_degraded(),
            "Loaded condition"
        );
        Ok(condition)
    }
}

fn hydrate(
    snapshot: &RegistrySnapshot,
    config: &ConditionConfig,
    element_type: ElementType,
) -> Result<Condition> {
    if let Some(stored) = config.element_type {
        if stored != element_type {
            return Err(QueryError::configuration(
                "ConditionLoader",
                format!("nested condition filters {stored} elements inside a {element_type} condition"),
            ));
        }
    }

    let mut condition = Condition::new(config.combinator)
        .with_settings(config.settings.clone())
        .with_element_type(element_type);
    if let Some(uid) = &config.uid {
        condition = condition.with_uid(parse_uid(uid)?);
    }

    let context = RuleContext::new(element_type);
    for child in &config.condition_rules {
        let node = match child {
            RuleNodeConfig::Condition(nested) => {
                RuleNode::Condition(hydrate(snapshot, nested, element_type)?)
            }
            RuleNodeConfig::Rule(rule_config) => match snapshot.instantiate(&context, rule_config) {
                Ok(rule) => RuleNode::Rule(rule),
                Err(err) if err.is_recoverable() => {
                    warn!(
                        condition_uid = %condition.uid(),
                        rule_type = %rule_config.rule_type,
                        error = %err,
                        "Skipping unavailable condition rule"
                    );
                    condition.record_diagnostic(ConditionDiagnostic {
                        rule_type: rule_config.rule_type.clone(),
                        uid: rule_config.uid.clone(),
                        message: err.to_string(),
                    });
                    continue;
                }
                Err(err) => return Err(err),
            },
        };
        condition.add_condition_rule(node)?;
    }

    Ok(condition)
}

/// Parse a stored uid
pub(crate) fn parse_uid(uid: &str) -> Result<Uuid> {
    Uuid::parse_str(uid).map_err(|e| QueryError::validation("uid", format!("invalid uid '{uid}': {e}")))
}

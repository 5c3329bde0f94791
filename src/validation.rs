//! Input validation for stored condition definitions and registry identifiers
//!
//! Serialized conditions come from project config files and saved filters, so they are
//! checked for size and nesting before any rule is hydrated.

use crate::constants::rule_types;
use crate::error::{QueryError, Result};
use serde_json::Value;

/// Maximum number of keys in one rule node
const MAX_NODE_KEYS: usize = 100;

/// Maximum string length for operand values
const MAX_STRING_LENGTH: usize = 10000;

/// Key holding the children of a composite node
const CHILDREN_KEY: &str = "conditionRules";

/// Limits applied to a serialized condition definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionLimits {
    pub max_depth: usize,
    pub max_bytes: usize,
}

/// Validates a raw condition definition against size and nesting limits
pub fn validate_condition_payload(value: &Value, limits: ConditionLimits) -> Result<()> {
    let serialized = serde_json::to_string(value)?;
    validate_payload_size(serialized.len(), limits)?;

    if !value.is_object() {
        return Err(QueryError::validation(
            CHILDREN_KEY,
            "a condition definition must be a JSON object",
        ));
    }

    validate_node(value, 1, limits)
}

/// Validates the byte size of a serialized definition
pub fn validate_payload_size(bytes: usize, limits: ConditionLimits) -> Result<()> {
    if bytes > limits.max_bytes {
        return Err(QueryError::validation(
            CHILDREN_KEY,
            format!(
                "condition definition too large: {bytes} bytes (max: {})",
                limits.max_bytes
            ),
        ));
    }
    Ok(())
}

fn validate_node(value: &Value, depth: usize, limits: ConditionLimits) -> Result<()> {
    if depth > limits.max_depth {
        return Err(QueryError::validation(
            CHILDREN_KEY,
            format!("condition nesting too deep: {depth} (max: {})", limits.max_depth),
        ));
    }

    let Value::Object(map) = value else {
        return Err(QueryError::validation(
            CHILDREN_KEY,
            "every rule node must be a JSON object",
        ));
    };

    if map.len() > MAX_NODE_KEYS {
        return Err(QueryError::validation(
            CHILDREN_KEY,
            format!("rule node has too many keys: {} (max: {MAX_NODE_KEYS})", map.len()),
        ));
    }

    for (key, val) in map {
        if key == CHILDREN_KEY {
            let Value::Array(children) = val else {
                return Err(QueryError::validation(CHILDREN_KEY, "must be an array"));
            };
            for child in children {
                validate_node(child, depth + 1, limits)?;
            }
        } else {
            validate_operand(key, val)?;
        }
    }

    Ok(())
}

fn validate_operand(key: &str, value: &Value) -> Result<()> {
    match value {
        Value::String(s) if s.len() > MAX_STRING_LENGTH => Err(QueryError::validation(
            key,
            format!("string too long: {} chars (max: {MAX_STRING_LENGTH})", s.len()),
        )),
        Value::Array(items) => items.iter().try_for_each(|item| validate_operand(key, item)),
        _ => Ok(()),
    }
}

/// Validates a rule type identifier contributed by a plugin (`vendor:Name`)
pub fn validate_plugin_identifier(identifier: &str) -> Result<()> {
    let Some((vendor, name)) = identifier.split_once(rule_types::PLUGIN_NAMESPACE_SEPARATOR)
    else {
        return Err(QueryError::validation(
            "identifier",
            format!("plugin rule type '{identifier}' must be namespaced as vendor:Name"),
        ));
    };

    if vendor.is_empty() || name.is_empty() {
        return Err(QueryError::validation(
            "identifier",
            format!("plugin rule type '{identifier}' has an empty namespace or name"),
        ));
    }

    if identifier.chars().any(char::is_whitespace) {
        return Err(QueryError::validation(
            "identifier",
            format!("plugin rule type '{identifier}' contains whitespace"),
        ));
    }

    if identifier.starts_with(rule_types::FIELD_PREFIX) {
        return Err(QueryError::validation(
            "identifier",
            format!("'{identifier}' uses the reserved field namespace"),
        ));
    }

    Ok(())
}

/// Validates a custom field handle
pub fn validate_field_handle(handle: &str) -> Result<()> {
    let mut chars = handle.chars();
    let valid_start = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(QueryError::validation(
            "handle",
            format!("'{handle}' is not a valid field handle"),
        ));
    }
    Ok(())
}

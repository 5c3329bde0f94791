//! # Query Engine Error Types
//!
//! Structured error handling for element queries, condition trees and the rule
//! type registry. Variants map onto how a caller is expected to react:
//!
//! - `Configuration`, `Validation`, `NotSupported`: caller mistakes or modeling
//!   limits, surfaced at the call that triggers them and never retryable
//! - `UnknownRuleType`: environment drift, recovered locally while loading conditions
//! - `ImmutableState`, `Exhausted`: lifecycle misuse of compiled queries and cursors

use thiserror::Error;

/// Errors raised by the query and condition engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("Configuration error: {component}: {message}")]
    Configuration { component: String, message: String },

    #[error("Validation error on field '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Not supported: {message}")]
    NotSupported { message: String },

    #[error("Unknown condition rule type: {identifier}")]
    UnknownRuleType { identifier: String },

    #[error("Immutable state: {message}")]
    ImmutableState { message: String },

    #[error("Exhausted: {message}")]
    Exhausted { message: String },

    #[error("Storage error: {operation}: {message}")]
    Storage { operation: String, message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl QueryError {
    /// Create a configuration error
    pub fn configuration(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a validation error naming the offending field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a not-supported error
    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::NotSupported {
            message: message.into(),
        }
    }

    /// Create an unknown rule type error
    pub fn unknown_rule_type(identifier: impl Into<String>) -> Self {
        Self::UnknownRuleType {
            identifier: identifier.into(),
        }
    }

    /// Create an immutable state error
    pub fn immutable_state(message: impl Into<String>) -> Self {
        Self::ImmutableState {
            message: message.into(),
        }
    }

    /// Create an exhausted cursor error
    pub fn exhausted(message: impl Into<String>) -> Self {
        Self::Exhausted {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Whether the error can be recovered from by skipping the offending item
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::UnknownRuleType { .. })
    }

    /// Whether retrying the same call could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<config::ConfigError> for QueryError {
    fn from(err: config::ConfigError) -> Self {
        Self::configuration("EngineConfig", err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;

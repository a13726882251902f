//! Error types for rule registration and relationship lookups.
//!
//! Denial is never represented here: a denied operation is a normal
//! [`AccessDecision`](crate::models::AccessDecision) return value. Errors
//! are reserved for configuration mistakes and resolver availability.

use thiserror::Error;

use crate::models::Operation;

/// Configuration and registration errors.
///
/// These are programmer or deployment mistakes. They surface eagerly, at
/// registration or evaluator construction, and are not retryable.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown resource: {resource}")]
    UnknownResource { resource: String },

    #[error("Resource already declared: {resource}")]
    DuplicateResource { resource: String },

    #[error("Duplicate rule '{rule}' for {resource}/{operation}")]
    DuplicateRule {
        resource: String,
        operation: Operation,
        rule: String,
    },

    #[error("Resource '{resource}' has no select rule")]
    MissingSelectRule { resource: String },

    #[error("Rule '{rule}' on '{resource}' requires an owner column")]
    MissingOwnerColumn { resource: String, rule: String },

    #[error("Partner grant '{rule}' on '{resource}' is read-only, cannot apply to {operation}")]
    PartnerWriteGrant {
        resource: String,
        rule: String,
        operation: Operation,
    },

    #[error("Invalid {field}: {reason}")]
    InvalidIdentifier { field: &'static str, reason: String },

    #[error("Schema parsing failed")]
    SchemaParse {
        #[from]
        source: serde_json::Error,
    },
}

/// Relationship store lookup failures.
///
/// Callers of the resolver may retry; inside the evaluator this always
/// collapses to "rule does not match" so an outage cannot widen access.
#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("Relationship store unavailable: {reason}")]
    Unavailable { reason: String },
}

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, future_incompatible)]

//! Row-level access-control evaluation for relational data.
//!
//! `rls_core` decides whether a principal may perform a CRUD operation
//! on a row. Rules are named grants registered per (resource, operation);
//! any matching grant admits the operation, and absence of a match
//! denies. Partner grants consult a pluggable relationship store, and a
//! lookup that fails is treated as non-matching, so a store outage can
//! never widen access.
//!
//! ```
//! use std::sync::Arc;
//!
//! use rls_core::{
//!     AccessEvaluator, AccessReason, MemoryRelationshipStore, Operation, PolicyRuleSet,
//!     Predicate, Principal, ResourceDef, Row,
//! };
//!
//! # fn main() -> Result<(), rls_core::ConfigError> {
//! let mut rules = PolicyRuleSet::new();
//! rules.declare_resource(ResourceDef::with_owner_column("profiles", "id"))?;
//! rules.register(
//!     "profiles",
//!     Operation::Select,
//!     "profiles_owner_select",
//!     AccessReason::OwnerMatch,
//!     Predicate::Owner,
//! )?;
//!
//! let evaluator = AccessEvaluator::new(rules, Arc::new(MemoryRelationshipStore::new()))?;
//!
//! let alice = Principal::user("u1");
//! let row = Row::new().with("id", "u1").with("display_name", "Alice");
//! let decision = futures::executor::block_on(evaluator.can_perform(
//!     &alice,
//!     "profiles",
//!     Operation::Select,
//!     &row,
//! ))?;
//! assert!(decision.allow);
//! assert_eq!(decision.reason, AccessReason::OwnerMatch);
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod errors;
pub mod evaluator;
pub mod metrics;
pub mod models;
pub mod relationship;
pub mod rules;
pub mod schema;
mod validation;

pub use errors::{ConfigError, ResolverError};
pub use evaluator::AccessEvaluator;
pub use models::{AccessDecision, AccessReason, Operation, Principal, ResourceDef, Row};
pub use relationship::{
    MemoryRelationshipStore, Relationship, RelationshipResolver, RelationshipStatus,
    RelationshipStore,
};
pub use rules::{PolicyRuleSet, Predicate, Rule};
pub use schema::{AccessSchema, Grant, PolicySpec, ResourceSchema};

//! Declarative access-schema loading.
//!
//! A deployment describes its resources and grants as data, loads the
//! schema once at startup, and compiles it into a [`PolicyRuleSet`].
//! Schema order is evaluation order, so the file controls which reason
//! is reported when several grants would match.

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::models::{AccessReason, Operation, ResourceDef};
use crate::rules::{PolicyRuleSet, Predicate};

/// Root of a declarative access schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessSchema {
    pub resources: Vec<ResourceSchema>,
}

/// One resource and its grants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSchema {
    pub name: String,
    #[serde(default)]
    pub owner_column: Option<String>,
    #[serde(default)]
    pub policies: Vec<PolicySpec>,
}

/// A named grant applying one kind of access to a set of operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySpec {
    pub name: String,
    pub operations: Vec<Operation>,
    pub grant: Grant,
}

/// The kinds of access a schema can grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Grant {
    /// The row's owner, per the resource's owner column.
    Owner,
    /// The owner's active partner. Read-only by construction.
    Partner,
    /// Any principal.
    Public,
    /// Principals carrying the admin flag.
    Admin,
    /// The principal named by a row column, matched by stable id. Covers
    /// invitation sender/recipient columns on bidirectional invites.
    Participant { column: String },
}

impl Grant {
    fn reason(&self) -> AccessReason {
        match self {
            Grant::Owner => AccessReason::OwnerMatch,
            Grant::Partner => AccessReason::PartnerReadOnly,
            Grant::Public => AccessReason::PublicRead,
            Grant::Admin => AccessReason::AdminOverride,
            Grant::Participant { .. } => AccessReason::ParticipantMatch,
        }
    }

    fn predicate(&self) -> Predicate {
        match self {
            Grant::Owner => Predicate::Owner,
            Grant::Partner => Predicate::Partner,
            Grant::Public => Predicate::Public,
            Grant::Admin => Predicate::Admin,
            Grant::Participant { column } => Predicate::ColumnMatch {
                column: column.clone(),
            },
        }
    }
}

impl AccessSchema {
    /// Parse a schema from its JSON representation.
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Compile the schema into a registered rule set.
    ///
    /// Resources are declared first, then policies register in schema
    /// order. Partner grants are rejected for anything but `select`: the
    /// partner pattern is read-only, and that is enforced here at load
    /// time rather than left to convention.
    pub fn build_rules(&self) -> Result<PolicyRuleSet, ConfigError> {
        let mut rules = PolicyRuleSet::new();

        for resource in &self.resources {
            let def = match &resource.owner_column {
                Some(column) => ResourceDef::with_owner_column(&resource.name, column),
                None => ResourceDef::new(&resource.name),
            };
            rules.declare_resource(def)?;
        }

        for resource in &self.resources {
            for policy in &resource.policies {
                for &operation in &policy.operations {
                    if matches!(policy.grant, Grant::Partner) && operation != Operation::Select {
                        return Err(ConfigError::PartnerWriteGrant {
                            resource: resource.name.clone(),
                            rule: policy.name.clone(),
                            operation,
                        });
                    }
                    rules.register(
                        &resource.name,
                        operation,
                        &policy.name,
                        policy.grant.reason(),
                        policy.grant.predicate(),
                    )?;
                }
            }
        }

        rules.validate()?;
        Ok(rules)
    }
}

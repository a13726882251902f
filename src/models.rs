//! Core data types shared across rule registration and evaluation.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// The authenticated identity on whose behalf an operation runs.
///
/// Authentication happens upstream; this type only carries what the
/// evaluator needs. It is supplied explicitly on every call rather than
/// read from ambient context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub is_admin: bool,
}

impl Principal {
    /// An ordinary authenticated principal.
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_admin: false,
        }
    }

    /// A principal carrying the admin flag.
    ///
    /// Admin status only matters for resources that register an explicit
    /// admin rule; it is not a blanket bypass.
    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_admin: true,
        }
    }
}

/// Row-level CRUD operations subject to policy rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Select,
        Operation::Insert,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Select => "select",
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "select" => Ok(Operation::Select),
            "insert" => Ok(Operation::Insert),
            "update" => Ok(Operation::Update),
            "delete" => Ok(Operation::Delete),
            other => Err(ConfigError::InvalidIdentifier {
                field: "operation",
                reason: format!("unknown operation '{}'", other),
            }),
        }
    }
}

/// A named collection of rows subject to access rules.
///
/// `owner_column` names the column holding the owning principal's id;
/// resources without a single owner (public reference data) leave it
/// unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDef {
    pub name: String,
    #[serde(default)]
    pub owner_column: Option<String>,
}

impl ResourceDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner_column: None,
        }
    }

    pub fn with_owner_column(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner_column: Some(column.into()),
        }
    }
}

/// A single record presented for adjudication.
///
/// Rows are supplied per call by the query layer; the evaluator never
/// fetches or stores them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    columns: BTreeMap<String, serde_json::Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column assignment.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.columns.insert(column.into(), value.into());
        self
    }

    /// Builds a row from a JSON object; returns `None` for any other
    /// JSON shape.
    pub fn from_value(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Object(map) => Some(Self {
                columns: map.into_iter().collect(),
            }),
            _ => None,
        }
    }

    pub fn get(&self, column: &str) -> Option<&serde_json::Value> {
        self.columns.get(column)
    }

    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.columns.get(column).and_then(|v| v.as_str())
    }
}

/// Which registered grant admitted an operation, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessReason {
    OwnerMatch,
    PartnerReadOnly,
    AdminOverride,
    PublicRead,
    ParticipantMatch,
    Denied,
}

impl AccessReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessReason::OwnerMatch => "owner_match",
            AccessReason::PartnerReadOnly => "partner_read_only",
            AccessReason::AdminOverride => "admin_override",
            AccessReason::PublicRead => "public_read",
            AccessReason::ParticipantMatch => "participant_match",
            AccessReason::Denied => "denied",
        }
    }
}

impl fmt::Display for AccessReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The evaluator's answer for one (principal, resource, operation, row)
/// question. Created fresh per call and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub allow: bool,
    pub reason: AccessReason,
    /// Name of the first matching rule; `None` on denial.
    pub rule: Option<String>,
}

impl AccessDecision {
    pub fn allowed(reason: AccessReason, rule: impl Into<String>) -> Self {
        Self {
            allow: true,
            reason,
            rule: Some(rule.into()),
        }
    }

    pub fn denied() -> Self {
        Self {
            allow: false,
            reason: AccessReason::Denied,
            rule: None,
        }
    }

    /// Label used for metrics and logs.
    pub fn decision_label(&self) -> &'static str {
        if self.allow {
            "allow"
        } else {
            "deny"
        }
    }
}

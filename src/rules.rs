//! Policy rule registration and lookup.
//!
//! A rule set holds, per (resource, operation), an ordered list of named
//! grants. Any single matching grant admits the operation; an empty list
//! denies. Registration order is the evaluation order, which makes the
//! reported reason deterministic when several grants would match.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::ConfigError;
use crate::models::{AccessReason, Operation, Principal, ResourceDef, Row};
use crate::validation::validate_identifier;

/// Row-local predicate function usable from [`Predicate::Custom`].
pub type RowPredicateFn = Arc<dyn Fn(&Principal, &Row) -> bool + Send + Sync>;

/// The access test a rule applies to (principal, row).
///
/// Declarative variants are interpreted by the evaluator, which supplies
/// the resource's owner column and the relationship resolver where
/// needed. `Custom` predicates see only the principal and the row, so
/// they cannot depend on relationship lookups.
#[derive(Clone)]
pub enum Predicate {
    /// The row's owner column equals the principal's id.
    Owner,
    /// An active relationship links the principal and the row's owner.
    Partner,
    /// Matches any principal.
    Public,
    /// Matches when the principal carries the admin flag.
    Admin,
    /// The named column equals the principal's id. Covers participant
    /// columns such as an invitation's sender or recipient.
    ColumnMatch { column: String },
    /// Arbitrary row-local test.
    Custom(RowPredicateFn),
}

impl Predicate {
    pub(crate) fn needs_owner_column(&self) -> bool {
        matches!(self, Predicate::Owner | Predicate::Partner)
    }

    pub(crate) fn is_admin_override(&self) -> bool {
        matches!(self, Predicate::Admin)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Owner => f.write_str("Owner"),
            Predicate::Partner => f.write_str("Partner"),
            Predicate::Public => f.write_str("Public"),
            Predicate::Admin => f.write_str("Admin"),
            Predicate::ColumnMatch { column } => {
                f.debug_struct("ColumnMatch").field("column", column).finish()
            }
            Predicate::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// A named grant for one (resource, operation) pair.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub reason: AccessReason,
    /// Test applied to the row the operation targets.
    pub predicate: Predicate,
    /// Post-condition applied to incoming row contents on insert and
    /// update, so a write cannot move a row outside the grant that
    /// admitted it. Defaults to `predicate` at registration.
    pub check: Predicate,
}

#[derive(Debug)]
struct ResourceEntry {
    def: ResourceDef,
    rules: HashMap<Operation, Vec<Rule>>,
}

/// The registered rules for every declared resource.
///
/// Mutable only during startup registration; the evaluator takes
/// ownership and freezes it behind an `Arc`, after which concurrent
/// evaluation needs no locking.
#[derive(Debug, Default)]
pub struct PolicyRuleSet {
    resources: HashMap<String, ResourceEntry>,
}

impl PolicyRuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a resource before rules can target it.
    pub fn declare_resource(&mut self, def: ResourceDef) -> Result<(), ConfigError> {
        validate_identifier("resource name", &def.name)?;
        if let Some(column) = &def.owner_column {
            validate_identifier("owner column", column)?;
        }
        if self.resources.contains_key(&def.name) {
            return Err(ConfigError::DuplicateResource {
                resource: def.name.clone(),
            });
        }
        self.resources.insert(
            def.name.clone(),
            ResourceEntry {
                def,
                rules: HashMap::new(),
            },
        );
        Ok(())
    }

    /// Registers a grant whose post-condition equals its predicate.
    pub fn register(
        &mut self,
        resource: &str,
        operation: Operation,
        rule_name: &str,
        reason: AccessReason,
        predicate: Predicate,
    ) -> Result<(), ConfigError> {
        let check = predicate.clone();
        self.register_with_check(resource, operation, rule_name, reason, predicate, check)
    }

    /// Registers a grant with a distinct post-condition for incoming row
    /// contents.
    ///
    /// Re-registering the same (resource, operation, name) fails rather
    /// than silently replacing a security-relevant rule.
    pub fn register_with_check(
        &mut self,
        resource: &str,
        operation: Operation,
        rule_name: &str,
        reason: AccessReason,
        predicate: Predicate,
        check: Predicate,
    ) -> Result<(), ConfigError> {
        validate_identifier("rule name", rule_name)?;
        let entry = self
            .resources
            .get_mut(resource)
            .ok_or_else(|| ConfigError::UnknownResource {
                resource: resource.to_string(),
            })?;

        if (predicate.needs_owner_column() || check.needs_owner_column())
            && entry.def.owner_column.is_none()
        {
            return Err(ConfigError::MissingOwnerColumn {
                resource: resource.to_string(),
                rule: rule_name.to_string(),
            });
        }

        let rules = entry.rules.entry(operation).or_default();
        if rules.iter().any(|r| r.name == rule_name) {
            return Err(ConfigError::DuplicateRule {
                resource: resource.to_string(),
                operation,
                rule: rule_name.to_string(),
            });
        }

        rules.push(Rule {
            name: rule_name.to_string(),
            reason,
            predicate,
            check,
        });
        Ok(())
    }

    /// Rules for one (resource, operation), in registration order.
    ///
    /// An empty slice is the deny-by-default answer, not an error.
    pub fn rules_for(&self, resource: &str, operation: Operation) -> &[Rule] {
        self.resources
            .get(resource)
            .and_then(|entry| entry.rules.get(&operation))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn resource(&self, name: &str) -> Option<&ResourceDef> {
        self.resources.get(name).map(|entry| &entry.def)
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Startup completeness check: every declared resource must carry at
    /// least one select rule. Run by the evaluator constructor so a
    /// misconfigured deployment fails before serving its first request.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, entry) in &self.resources {
            let has_select = entry
                .rules
                .get(&Operation::Select)
                .is_some_and(|rules| !rules.is_empty());
            if !has_select {
                return Err(ConfigError::MissingSelectRule {
                    resource: name.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ruleset_with_profiles() -> PolicyRuleSet {
        let mut rules = PolicyRuleSet::new();
        rules
            .declare_resource(ResourceDef::with_owner_column("profiles", "id"))
            .unwrap();
        rules
    }

    #[test]
    fn register_requires_declared_resource() {
        let mut rules = PolicyRuleSet::new();
        let err = rules
            .register(
                "profiles",
                Operation::Select,
                "owner_select",
                AccessReason::OwnerMatch,
                Predicate::Owner,
            )
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownResource { .. }));
    }

    #[test]
    fn duplicate_rule_names_are_rejected() {
        let mut rules = ruleset_with_profiles();
        rules
            .register(
                "profiles",
                Operation::Select,
                "owner_select",
                AccessReason::OwnerMatch,
                Predicate::Owner,
            )
            .unwrap();
        let err = rules
            .register(
                "profiles",
                Operation::Select,
                "owner_select",
                AccessReason::PublicRead,
                Predicate::Public,
            )
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateRule { .. }));
        // Same name on a different operation is a different rule.
        rules
            .register(
                "profiles",
                Operation::Update,
                "owner_select",
                AccessReason::OwnerMatch,
                Predicate::Owner,
            )
            .unwrap();
    }

    #[test]
    fn duplicate_resource_declaration_is_rejected() {
        let mut rules = ruleset_with_profiles();
        let err = rules
            .declare_resource(ResourceDef::new("profiles"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateResource { .. }));
    }

    #[test]
    fn owner_rules_need_an_owner_column() {
        let mut rules = PolicyRuleSet::new();
        rules.declare_resource(ResourceDef::new("modules")).unwrap();
        for predicate in [Predicate::Owner, Predicate::Partner] {
            let err = rules
                .register(
                    "modules",
                    Operation::Select,
                    "needs_owner",
                    AccessReason::OwnerMatch,
                    predicate,
                )
                .unwrap_err();
            assert!(matches!(err, ConfigError::MissingOwnerColumn { .. }));
        }
    }

    #[test]
    fn rules_for_unregistered_pair_is_empty() {
        let rules = ruleset_with_profiles();
        assert!(rules.rules_for("profiles", Operation::Delete).is_empty());
        assert!(rules.rules_for("unknown", Operation::Select).is_empty());
    }

    #[test]
    fn rules_keep_registration_order() {
        let mut rules = ruleset_with_profiles();
        rules
            .register(
                "profiles",
                Operation::Select,
                "public_first",
                AccessReason::PublicRead,
                Predicate::Public,
            )
            .unwrap();
        rules
            .register(
                "profiles",
                Operation::Select,
                "owner_second",
                AccessReason::OwnerMatch,
                Predicate::Owner,
            )
            .unwrap();
        let names: Vec<_> = rules
            .rules_for("profiles", Operation::Select)
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, ["public_first", "owner_second"]);
    }

    #[test]
    fn validate_requires_a_select_rule_per_resource() {
        let mut rules = ruleset_with_profiles();
        rules
            .register(
                "profiles",
                Operation::Update,
                "owner_update",
                AccessReason::OwnerMatch,
                Predicate::Owner,
            )
            .unwrap();
        let err = rules.validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingSelectRule { .. }));

        rules
            .register(
                "profiles",
                Operation::Select,
                "owner_select",
                AccessReason::OwnerMatch,
                Predicate::Owner,
            )
            .unwrap();
        rules.validate().unwrap();
    }

    #[test]
    fn register_defaults_check_to_predicate() {
        let mut rules = ruleset_with_profiles();
        rules
            .register(
                "profiles",
                Operation::Insert,
                "owner_insert",
                AccessReason::OwnerMatch,
                Predicate::Owner,
            )
            .unwrap();
        let rule = &rules.rules_for("profiles", Operation::Insert)[0];
        assert!(matches!(rule.check, Predicate::Owner));
    }
}

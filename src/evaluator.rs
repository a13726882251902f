//! The access evaluation entry point.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::errors::{ConfigError, ResolverError};
use crate::metrics::AccessMetricsHelper;
use crate::models::{AccessDecision, AccessReason, Operation, Principal, Row};
use crate::relationship::{RelationshipResolver, RelationshipStore};
use crate::rules::{PolicyRuleSet, Predicate};

/// Which of a rule's two predicates a pass evaluates: the grant test
/// against the row being operated on, or the post-condition against
/// incoming row contents.
#[derive(Clone, Copy)]
enum RulePass {
    Using,
    Check,
}

/// Adjudicates row operations against the registered policy rules.
///
/// Stateless per call: the rule set is frozen at construction and the
/// relationship store is read-only, so one evaluator can be shared
/// across any number of concurrent tasks.
#[derive(Clone)]
pub struct AccessEvaluator {
    rules: Arc<PolicyRuleSet>,
    resolver: RelationshipResolver,
}

impl AccessEvaluator {
    /// Seals a rule set and wires the relationship store.
    ///
    /// Runs [`PolicyRuleSet::validate`], so an incomplete configuration
    /// fails here, at startup, rather than on the first request.
    pub fn new(
        rules: PolicyRuleSet,
        store: Arc<dyn RelationshipStore>,
    ) -> Result<Self, ConfigError> {
        rules.validate()?;
        Ok(Self {
            rules: Arc::new(rules),
            resolver: RelationshipResolver::new(store),
        })
    }

    pub fn rule_set(&self) -> &PolicyRuleSet {
        &self.rules
    }

    /// Can `principal` perform `operation` on `row` of `resource`?
    ///
    /// Denial is a normal return value. The only error is a configuration
    /// problem (an undeclared resource), which is loud and non-retryable.
    pub async fn can_perform(
        &self,
        principal: &Principal,
        resource: &str,
        operation: Operation,
        row: &Row,
    ) -> Result<AccessDecision, ConfigError> {
        let started = Instant::now();
        // Inserts have no pre-existing row, so the post-condition is the
        // only test that applies to them.
        let pass = match operation {
            Operation::Insert => RulePass::Check,
            _ => RulePass::Using,
        };
        let decision = self
            .evaluate(principal, resource, operation, row, pass)
            .await?;
        self.record(principal, resource, operation, &decision, started);
        Ok(decision)
    }

    /// Update with changed row contents: the grant test runs against the
    /// current row, then every registered update rule's post-condition is
    /// offered the updated row. If none accepts it, the update is denied,
    /// which keeps a principal from reassigning a row out from under the
    /// grant that admitted it.
    pub async fn can_update(
        &self,
        principal: &Principal,
        resource: &str,
        current: &Row,
        updated: &Row,
    ) -> Result<AccessDecision, ConfigError> {
        let started = Instant::now();
        let using = self
            .evaluate(principal, resource, Operation::Update, current, RulePass::Using)
            .await?;
        let decision = if !using.allow {
            using
        } else {
            let check = self
                .evaluate(principal, resource, Operation::Update, updated, RulePass::Check)
                .await?;
            if check.allow {
                using
            } else {
                AccessDecision::denied()
            }
        };
        self.record(principal, resource, Operation::Update, &decision, started);
        Ok(decision)
    }

    async fn evaluate(
        &self,
        principal: &Principal,
        resource: &str,
        operation: Operation,
        row: &Row,
        pass: RulePass,
    ) -> Result<AccessDecision, ConfigError> {
        let def = self
            .rules
            .resource(resource)
            .ok_or_else(|| ConfigError::UnknownResource {
                resource: resource.to_string(),
            })?;
        let owner_column = def.owner_column.as_deref();
        let rules = self.rules.rules_for(resource, operation);

        // Admin override is per-resource opt-in: it applies only where an
        // admin rule is registered for this exact (resource, operation).
        if principal.is_admin {
            if let Some(rule) = rules.iter().find(|r| r.predicate.is_admin_override()) {
                return Ok(AccessDecision::allowed(
                    AccessReason::AdminOverride,
                    &rule.name,
                ));
            }
        }

        for rule in rules {
            let predicate = match pass {
                RulePass::Using => &rule.predicate,
                RulePass::Check => &rule.check,
            };
            match self.matches(predicate, principal, owner_column, row).await {
                Ok(true) => return Ok(AccessDecision::allowed(rule.reason, &rule.name)),
                Ok(false) => {}
                Err(err) => {
                    // A failed lookup must never widen access; the rule is
                    // treated as unmatched and evaluation continues.
                    warn!(
                        resource,
                        operation = %operation,
                        rule = %rule.name,
                        error = %err,
                        "relationship lookup failed, treating rule as unmatched"
                    );
                    AccessMetricsHelper::record_resolver_failure(resource, operation);
                }
            }
        }

        Ok(AccessDecision::denied())
    }

    async fn matches(
        &self,
        predicate: &Predicate,
        principal: &Principal,
        owner_column: Option<&str>,
        row: &Row,
    ) -> Result<bool, ResolverError> {
        match predicate {
            Predicate::Public => Ok(true),
            Predicate::Admin => Ok(principal.is_admin),
            Predicate::Owner => Ok(owner_value(row, owner_column) == Some(principal.id.as_str())),
            Predicate::Partner => match owner_value(row, owner_column) {
                Some(owner) => self.resolver.is_active_partner(&principal.id, owner).await,
                None => Ok(false),
            },
            Predicate::ColumnMatch { column } => {
                Ok(row.get_str(column) == Some(principal.id.as_str()))
            }
            Predicate::Custom(f) => Ok(f(principal, row)),
        }
    }

    fn record(
        &self,
        principal: &Principal,
        resource: &str,
        operation: Operation,
        decision: &AccessDecision,
        started: Instant,
    ) {
        AccessMetricsHelper::record_decision(resource, operation, decision, started.elapsed());
        debug!(
            principal = %principal.id,
            resource,
            operation = %operation,
            decision = decision.decision_label(),
            reason = %decision.reason,
            "access decision"
        );
    }
}

fn owner_value<'a>(row: &'a Row, owner_column: Option<&str>) -> Option<&'a str> {
    owner_column.and_then(|column| row.get_str(column))
}

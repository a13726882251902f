//! Human-readable decision reporting.
//!
//! Explanations carry only the resource name, operation, principal id,
//! reason, and matched rule name. Row contents never appear, so an
//! explanation is safe to log or surface in test output.

use tracing::{debug, info};

use crate::models::{AccessDecision, Operation, Principal};

/// Format a decision for logs and test output. Pure formatting, no I/O;
/// callers decide whether and where to emit it.
pub fn explain(
    decision: &AccessDecision,
    resource: &str,
    operation: Operation,
    principal: &Principal,
) -> String {
    if decision.allow {
        match &decision.rule {
            Some(rule) => format!(
                "principal '{}' allowed {} on {}: {} (rule '{}')",
                principal.id, operation, resource, decision.reason, rule
            ),
            None => format!(
                "principal '{}' allowed {} on {}: {}",
                principal.id, operation, resource, decision.reason
            ),
        }
    } else {
        format!(
            "principal '{}' denied {} on {}: no rule matched",
            principal.id, operation, resource
        )
    }
}

/// Emit a structured tracing event for a decision.
///
/// Denials log at info so they are visible in production; grants log at
/// debug to keep steady-state noise down.
pub fn log_decision(
    decision: &AccessDecision,
    resource: &str,
    operation: Operation,
    principal: &Principal,
) {
    if decision.allow {
        debug!(
            principal = %principal.id,
            resource,
            operation = %operation,
            reason = %decision.reason,
            rule = decision.rule.as_deref().unwrap_or("-"),
            "access granted"
        );
    } else {
        info!(
            principal = %principal.id,
            resource,
            operation = %operation,
            reason = %decision.reason,
            "access denied"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AccessReason;

    #[test]
    fn explains_grants_with_rule_and_reason() {
        let decision = AccessDecision::allowed(AccessReason::OwnerMatch, "profiles_owner_select");
        let text = explain(&decision, "profiles", Operation::Select, &Principal::user("u1"));
        assert_eq!(
            text,
            "principal 'u1' allowed select on profiles: owner_match (rule 'profiles_owner_select')"
        );
    }

    #[test]
    fn explains_denials_without_leaking_a_reasonless_grant() {
        let decision = AccessDecision::denied();
        let text = explain(&decision, "profiles", Operation::Update, &Principal::user("u1"));
        assert_eq!(text, "principal 'u1' denied update on profiles: no rule matched");
    }
}

//! Property-based tests for rls-core using proptest.
//!
//! These tests verify the evaluator's contracts across a wide range of
//! generated principals, rows, and relationship states.

use std::sync::Arc;

use futures::executor::block_on;
use proptest::prelude::*;
use rls_core::{
    AccessEvaluator, AccessReason, MemoryRelationshipStore, Operation, PolicyRuleSet, Predicate,
    Principal, RelationshipStatus, ResourceDef, Row,
};

// Helper strategy for generating principal and owner ids
fn id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9]{1,8}").unwrap()
}

fn write_operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        Just(Operation::Insert),
        Just(Operation::Update),
        Just(Operation::Delete),
    ]
}

fn status_strategy() -> impl Strategy<Value = RelationshipStatus> {
    prop_oneof![
        Just(RelationshipStatus::Active),
        Just(RelationshipStatus::Pending),
        Just(RelationshipStatus::Revoked),
    ]
}

/// An evaluator over `profiles` with only an owner select rule.
fn owner_select_evaluator() -> AccessEvaluator {
    let mut rules = PolicyRuleSet::new();
    rules
        .declare_resource(ResourceDef::with_owner_column("profiles", "id"))
        .unwrap();
    rules
        .register(
            "profiles",
            Operation::Select,
            "profiles_owner_select",
            AccessReason::OwnerMatch,
            Predicate::Owner,
        )
        .unwrap();
    AccessEvaluator::new(rules, Arc::new(MemoryRelationshipStore::new())).unwrap()
}

proptest! {
    // Operations with zero registered rules deny everyone, admins
    // included: there is no implicit fallback grant anywhere.
    #[test]
    fn fail_closed_for_unregistered_operations(
        principal_id in id_strategy(),
        owner_id in id_strategy(),
        is_admin in any::<bool>(),
        operation in write_operation_strategy(),
    ) {
        let evaluator = owner_select_evaluator();
        let principal = Principal { id: principal_id, is_admin };
        let row = Row::new().with("id", owner_id.as_str());

        let decision = block_on(evaluator.can_perform(&principal, "profiles", operation, &row)).unwrap();
        prop_assert!(!decision.allow);
        prop_assert_eq!(decision.reason, AccessReason::Denied);
    }

    // With only an owner rule registered, a select is admitted exactly
    // when the owner column equals the principal id.
    #[test]
    fn owner_match_iff_ids_equal(
        principal_id in id_strategy(),
        owner_id in id_strategy(),
    ) {
        let evaluator = owner_select_evaluator();
        let principal = Principal::user(principal_id.as_str());
        let row = Row::new().with("id", owner_id.as_str());

        let decision = block_on(evaluator.can_perform(&principal, "profiles", Operation::Select, &row)).unwrap();
        prop_assert_eq!(decision.allow, principal_id == owner_id);
        if decision.allow {
            prop_assert_eq!(decision.reason, AccessReason::OwnerMatch);
        }
    }

    // Identical inputs and relationship state produce identical
    // decisions, whatever the relationship status is.
    #[test]
    fn decisions_are_idempotent(
        principal_id in id_strategy(),
        owner_id in id_strategy(),
        status in status_strategy(),
    ) {
        let mut rules = PolicyRuleSet::new();
        rules.declare_resource(ResourceDef::with_owner_column("profiles", "id")).unwrap();
        rules.register(
            "profiles",
            Operation::Select,
            "profiles_owner_select",
            AccessReason::OwnerMatch,
            Predicate::Owner,
        ).unwrap();
        rules.register(
            "profiles",
            Operation::Select,
            "profiles_partner_select",
            AccessReason::PartnerReadOnly,
            Predicate::Partner,
        ).unwrap();

        let store = Arc::new(MemoryRelationshipStore::new());
        store.upsert(&principal_id, &owner_id, status);
        let evaluator = AccessEvaluator::new(rules, store).unwrap();

        let principal = Principal::user(principal_id.as_str());
        let row = Row::new().with("id", owner_id.as_str());

        let first = block_on(evaluator.can_perform(&principal, "profiles", Operation::Select, &row)).unwrap();
        let second = block_on(evaluator.can_perform(&principal, "profiles", Operation::Select, &row)).unwrap();
        prop_assert_eq!(&first, &second);

        // The partner path only ever opens for an active link between
        // two distinct principals; otherwise owner match is all there is.
        let expected_allow = principal_id == owner_id
            || (status == RelationshipStatus::Active && principal_id != owner_id);
        prop_assert_eq!(first.allow, expected_allow);
    }
}

//! Relationship lookups behind the partner-access rules.
//!
//! Relationships are stored directionally but queried symmetrically: the
//! evaluator never needs to know which side of a link a principal sits
//! on. Only `active` links grant anything; a pending invitation carries
//! no access.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ResolverError;

/// Lifecycle of a link between two principals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipStatus {
    Active,
    Pending,
    Revoked,
}

/// A stored link between two principals.
///
/// Created by an acceptance flow and invalidated by revocation, both
/// outside this crate; the evaluator only ever reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub user_a: String,
    pub user_b: String,
    pub status: RelationshipStatus,
}

impl Relationship {
    pub fn links(&self, a: &str, b: &str) -> bool {
        (self.user_a == a && self.user_b == b) || (self.user_a == b && self.user_b == a)
    }

    pub fn is_active(&self) -> bool {
        self.status == RelationshipStatus::Active
    }
}

/// Read API onto the external relationship store.
///
/// Implementations issue whatever query their backend needs; a failed
/// lookup must surface as [`ResolverError::Unavailable`] rather than an
/// empty result, so callers can tell "no relationship" from "store
/// unreachable".
#[async_trait]
pub trait RelationshipStore: Send + Sync {
    /// The relationship between two principals, regardless of stored
    /// direction.
    async fn get_relationship(
        &self,
        a: &str,
        b: &str,
    ) -> Result<Option<Relationship>, ResolverError>;

    /// The sole active partner of `id`, if exactly one exists.
    async fn active_partner_of(&self, id: &str) -> Result<Option<String>, ResolverError>;
}

/// Answers partner queries for the evaluator, hiding storage direction.
#[derive(Clone)]
pub struct RelationshipResolver {
    store: Arc<dyn RelationshipStore>,
}

impl RelationshipResolver {
    pub fn new(store: Arc<dyn RelationshipStore>) -> Self {
        Self { store }
    }

    /// True only when an `active` relationship links the two principals.
    /// Symmetric in its arguments; a principal is never its own partner.
    pub async fn is_active_partner(&self, a: &str, b: &str) -> Result<bool, ResolverError> {
        if a == b {
            return Ok(false);
        }
        let relationship = self.store.get_relationship(a, b).await?;
        Ok(relationship.is_some_and(|r| r.is_active()))
    }

    /// The linked principal's id, only while the relationship is active.
    /// Pending and revoked links answer `None`.
    pub async fn partner_of(&self, id: &str) -> Result<Option<String>, ResolverError> {
        self.store.active_partner_of(id).await
    }
}

/// In-memory relationship storage for tests and embedded deployments.
///
/// Keys are normalized id pairs, so a link inserted as (a, b) is found
/// as (b, a).
#[derive(Debug, Default)]
pub struct MemoryRelationshipStore {
    links: RwLock<HashMap<(String, String), RelationshipStatus>>,
}

impl MemoryRelationshipStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(a: &str, b: &str) -> (String, String) {
        if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        }
    }

    fn read_links(
        &self,
    ) -> Result<
        std::sync::RwLockReadGuard<'_, HashMap<(String, String), RelationshipStatus>>,
        ResolverError,
    > {
        self.links.read().map_err(|_| ResolverError::Unavailable {
            reason: "relationship store lock poisoned".to_string(),
        })
    }

    /// Inserts or replaces the link between two principals.
    pub fn upsert(&self, a: &str, b: &str, status: RelationshipStatus) {
        if let Ok(mut links) = self.links.write() {
            links.insert(Self::key(a, b), status);
        }
    }

    pub fn remove(&self, a: &str, b: &str) {
        if let Ok(mut links) = self.links.write() {
            links.remove(&Self::key(a, b));
        }
    }
}

#[async_trait]
impl RelationshipStore for MemoryRelationshipStore {
    async fn get_relationship(
        &self,
        a: &str,
        b: &str,
    ) -> Result<Option<Relationship>, ResolverError> {
        let links = self.read_links()?;
        let key = Self::key(a, b);
        Ok(links.get(&key).map(|status| Relationship {
            user_a: key.0.clone(),
            user_b: key.1.clone(),
            status: *status,
        }))
    }

    async fn active_partner_of(&self, id: &str) -> Result<Option<String>, ResolverError> {
        let links = self.read_links()?;
        let mut partner = None;
        for ((a, b), status) in links.iter() {
            if *status != RelationshipStatus::Active {
                continue;
            }
            let other = if a == id {
                b
            } else if b == id {
                a
            } else {
                continue;
            };
            if partner.is_some() {
                // More than one active link is ambiguous; answer as if
                // none exists rather than guessing.
                return Ok(None);
            }
            partner = Some(other.clone());
        }
        Ok(partner)
    }
}

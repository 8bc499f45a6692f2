//! In-memory registry of staged grant changes awaiting confirm or cancel.
//!
//! Entries hold no lock on the grant set; they only expire.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use grantflow_auth::PendingChange;
use grantflow_core::{PendingChangeId, PrincipalId};

use crate::error::StoreError;

#[derive(Debug)]
pub struct PendingChanges {
    ttl: Duration,
    entries: Mutex<HashMap<PendingChangeId, PendingChange>>,
}

impl PendingChanges {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_expired(&self, change: &PendingChange, now: DateTime<Utc>) -> bool {
        now >= change.created_at + self.ttl
    }

    pub fn insert(&self, change: PendingChange, now: DateTime<Utc>) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::poisoned())?;
        let before = entries.len();
        entries.retain(|_, c| now < c.created_at + self.ttl);
        if entries.len() < before {
            debug!(expired = before - entries.len(), "dropped expired pending changes");
        }
        entries.insert(change.id, change);
        Ok(())
    }

    /// Remove and return the change if it exists, targets `principal_id` and
    /// has not expired.
    ///
    /// A change staged for another principal is left in place.
    pub fn take(
        &self,
        id: PendingChangeId,
        principal_id: PrincipalId,
        now: DateTime<Utc>,
    ) -> Result<Option<PendingChange>, StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::poisoned())?;
        match entries.get(&id) {
            Some(change) if change.principal_id != principal_id => return Ok(None),
            Some(_) => {}
            None => return Ok(None),
        }
        Ok(entries
            .remove(&id)
            .filter(|change| !self.is_expired(change, now)))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grantflow_auth::{Action, DependencyResolver, Decision, GrantSet, GrantSnapshot, Module};

    fn staged(principal_id: PrincipalId) -> PendingChange {
        let snapshot = GrantSnapshot {
            principal_id,
            grants: GrantSet::provisioned(),
            version: 1,
        };
        match DependencyResolver::new()
            .evaluate(&snapshot, Module::Sales, Action::Create, true)
            .unwrap()
        {
            Decision::NeedsConfirmation(pc) => pc,
            other => panic!("expected confirmation, got {other:?}"),
        }
    }

    #[test]
    fn take_is_single_use() {
        let registry = PendingChanges::new(Duration::minutes(15));
        let principal = PrincipalId::new();
        let change = staged(principal);
        let now = change.created_at;
        registry.insert(change.clone(), now).unwrap();

        assert_eq!(registry.take(change.id, principal, now).unwrap(), Some(change.clone()));
        assert_eq!(registry.take(change.id, principal, now).unwrap(), None);
    }

    #[test]
    fn expired_changes_are_gone() {
        let registry = PendingChanges::new(Duration::seconds(30));
        let principal = PrincipalId::new();
        let change = staged(principal);
        let later = change.created_at + Duration::seconds(30);
        registry.insert(change.clone(), change.created_at).unwrap();

        assert_eq!(registry.take(change.id, principal, later).unwrap(), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn changes_are_bound_to_their_target() {
        let registry = PendingChanges::new(Duration::minutes(15));
        let principal = PrincipalId::new();
        let change = staged(principal);
        let now = change.created_at;
        registry.insert(change.clone(), now).unwrap();

        assert_eq!(registry.take(change.id, PrincipalId::new(), now).unwrap(), None);
        assert_eq!(registry.len(), 1);
    }
}

use std::collections::HashMap;
use std::sync::RwLock;

use grantflow_auth::{Capability, GrantChanges, GrantSet, GrantSnapshot, Principal};
use grantflow_core::{ExpectedVersion, PrincipalId};

use super::r#trait::GrantStore;
use crate::error::StoreError;

#[derive(Debug, Clone)]
struct Entry {
    principal: Principal,
    grants: GrantSet,
    version: u64,
}

impl Entry {
    fn snapshot(&self) -> GrantSnapshot {
        GrantSnapshot {
            principal_id: self.principal.id,
            grants: self.grants.clone(),
            version: self.version,
        }
    }
}

/// In-memory grant store.
///
/// One lock over the whole map; a `set_many` holds the write lock for its
/// version check and the write.
#[derive(Debug, Default)]
pub struct InMemoryGrantStore {
    entries: RwLock<HashMap<PrincipalId, Entry>>,
}

impl InMemoryGrantStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GrantStore for InMemoryGrantStore {
    fn provision(&self, principal: Principal, grants: GrantSet) -> Result<GrantSnapshot, StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::poisoned())?;
        if entries.contains_key(&principal.id) {
            return Err(StoreError::AlreadyExists(format!("principal {}", principal.id)));
        }
        let entry = Entry {
            principal,
            grants,
            version: 1,
        };
        let snapshot = entry.snapshot();
        entries.insert(principal.id, entry);
        Ok(snapshot)
    }

    fn remove(&self, principal_id: PrincipalId) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::poisoned())?;
        entries
            .remove(&principal_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("principal {principal_id}")))
    }

    fn principal(&self, principal_id: PrincipalId) -> Result<Option<Principal>, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::poisoned())?;
        Ok(entries.get(&principal_id).map(|e| e.principal))
    }

    fn snapshot(&self, principal_id: PrincipalId) -> Result<Option<GrantSnapshot>, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::poisoned())?;
        Ok(entries.get(&principal_id).map(Entry::snapshot))
    }

    fn get(&self, principal_id: PrincipalId, capability: Capability) -> Result<bool, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::poisoned())?;
        Ok(entries
            .get(&principal_id)
            .is_some_and(|e| e.grants.get(capability)))
    }

    fn set_many(
        &self,
        principal_id: PrincipalId,
        changes: &GrantChanges,
        expected: ExpectedVersion,
    ) -> Result<GrantSnapshot, StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::poisoned())?;
        let entry = entries
            .get_mut(&principal_id)
            .ok_or_else(|| StoreError::NotFound(format!("principal {principal_id}")))?;

        if !expected.matches(entry.version) {
            return Err(StoreError::Concurrency {
                expected,
                actual: entry.version,
            });
        }

        // Apply to a copy so a rejected pair leaves the stored set untouched.
        let mut next = entry.grants.clone();
        next.apply(changes)
            .map_err(|e| StoreError::Invalid(e.to_string()))?;

        entry.grants = next;
        entry.version += 1;
        Ok(entry.snapshot())
    }
}

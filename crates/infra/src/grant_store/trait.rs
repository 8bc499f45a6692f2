use std::sync::Arc;

use grantflow_auth::{Capability, GrantChanges, GrantSet, GrantSnapshot, Principal};
use grantflow_core::{ExpectedVersion, PrincipalId};

use crate::error::StoreError;

pub trait GrantStore: Send + Sync {
    /// Register a principal with its initial grant set (version 1).
    fn provision(&self, principal: Principal, grants: GrantSet) -> Result<GrantSnapshot, StoreError>;

    /// Remove a principal together with its grant set.
    fn remove(&self, principal_id: PrincipalId) -> Result<(), StoreError>;

    fn principal(&self, principal_id: PrincipalId) -> Result<Option<Principal>, StoreError>;

    fn snapshot(&self, principal_id: PrincipalId) -> Result<Option<GrantSnapshot>, StoreError>;

    /// Stored value for one cell. Unknown principals and absent keys read `false`.
    fn get(&self, principal_id: PrincipalId, capability: Capability) -> Result<bool, StoreError>;

    /// Write every pair or none.
    ///
    /// Fails with `Concurrency` if the grant set is no longer at `expected`, and
    /// with `Invalid` if any pair is inapplicable. Returns the committed state.
    fn set_many(
        &self,
        principal_id: PrincipalId,
        changes: &GrantChanges,
        expected: ExpectedVersion,
    ) -> Result<GrantSnapshot, StoreError>;
}

impl<S> GrantStore for Arc<S>
where
    S: GrantStore + ?Sized,
{
    fn provision(&self, principal: Principal, grants: GrantSet) -> Result<GrantSnapshot, StoreError> {
        (**self).provision(principal, grants)
    }

    fn remove(&self, principal_id: PrincipalId) -> Result<(), StoreError> {
        (**self).remove(principal_id)
    }

    fn principal(&self, principal_id: PrincipalId) -> Result<Option<Principal>, StoreError> {
        (**self).principal(principal_id)
    }

    fn snapshot(&self, principal_id: PrincipalId) -> Result<Option<GrantSnapshot>, StoreError> {
        (**self).snapshot(principal_id)
    }

    fn get(&self, principal_id: PrincipalId, capability: Capability) -> Result<bool, StoreError> {
        (**self).get(principal_id, capability)
    }

    fn set_many(
        &self,
        principal_id: PrincipalId,
        changes: &GrantChanges,
        expected: ExpectedVersion,
    ) -> Result<GrantSnapshot, StoreError> {
        (**self).set_many(principal_id, changes, expected)
    }
}

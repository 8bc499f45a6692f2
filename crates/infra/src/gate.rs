//! The single authorization primitive: `can(principal, module, action)`.

use tracing::warn;

use grantflow_auth::{
    Action, AuthorizationExplanation, Capability, GrantSet, Module, explain_authorization,
};
use grantflow_core::PrincipalId;

use crate::error::StoreError;
use crate::grant_store::GrantStore;

/// Read-only view over a [`GrantStore`] answering capability checks.
///
/// Inapplicable pairs are `false` without touching the store.
#[derive(Debug, Clone)]
pub struct AuthorizationGate<G> {
    grants: G,
}

impl<G> AuthorizationGate<G>
where
    G: GrantStore,
{
    pub fn new(grants: G) -> Self {
        Self { grants }
    }

    /// Is `principal` a registered actor?
    pub fn knows(&self, principal: PrincipalId) -> Result<bool, StoreError> {
        Ok(self.grants.principal(principal)?.is_some())
    }

    pub fn try_can(&self, principal: PrincipalId, capability: Capability) -> Result<bool, StoreError> {
        if !capability.is_applicable() {
            return Ok(false);
        }
        self.grants.get(principal, capability)
    }

    /// Fails closed: a store error denies.
    pub fn can(&self, principal: PrincipalId, module: Module, action: Action) -> bool {
        let capability = Capability::new(module, action);
        match self.try_can(principal, capability) {
            Ok(granted) => granted,
            Err(err) => {
                warn!(principal_id = %principal, %capability, error = %err, "capability check failed, denying");
                false
            }
        }
    }

    /// Same outcome as [`Self::try_can`], with the reason spelled out.
    pub fn explain(
        &self,
        principal: PrincipalId,
        capability: Capability,
    ) -> Result<AuthorizationExplanation, StoreError> {
        let grants = self
            .grants
            .snapshot(principal)?
            .map(|s| s.grants)
            .unwrap_or_else(GrantSet::new);
        Ok(explain_authorization(principal, &grants, capability))
    }
}

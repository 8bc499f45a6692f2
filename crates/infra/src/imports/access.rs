use tracing::debug;

use grantflow_auth::{Action, Capability, Module};
use grantflow_core::PrincipalId;

use super::types::JobError;
use crate::gate::AuthorizationGate;
use crate::grant_store::GrantStore;

/// Importing rows of `module` needs `<module>:create`; watching the job needs
/// `<module>:read`. The actor must be registered either way.
pub fn authorize_import<G>(
    gate: &AuthorizationGate<G>,
    actor: PrincipalId,
    module: Module,
    action: Action,
) -> Result<(), JobError>
where
    G: GrantStore,
{
    if !gate.knows(actor)? {
        return Err(JobError::UnknownActor(actor));
    }
    let capability = Capability::new(module, action);
    if gate.try_can(actor, capability)? {
        Ok(())
    } else {
        debug!(actor = %actor, %capability, "import request denied");
        Err(JobError::Forbidden { capability })
    }
}

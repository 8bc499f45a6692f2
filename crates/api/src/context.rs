use chrono::{DateTime, Utc};

use grantflow_auth::PrincipalId;

/// Principal context for a request (authenticated identity).
///
/// Carries no role or grants: those are read from the grant store on every
/// request, so a revoked grant stops working on the next call.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal_id: PrincipalId,
    expires_at: DateTime<Utc>,
}

impl PrincipalContext {
    pub fn new(principal_id: PrincipalId, expires_at: DateTime<Utc>) -> Self {
        Self {
            principal_id,
            expires_at,
        }
    }

    pub fn principal_id(&self) -> PrincipalId {
        self.principal_id
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

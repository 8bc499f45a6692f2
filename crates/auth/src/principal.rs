use serde::{Deserialize, Serialize};

use grantflow_core::PrincipalId;

use crate::Role;

/// An identity that holds a grant matrix and acts on documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub role: Role,
}

impl Principal {
    pub fn new(id: PrincipalId, role: Role) -> Self {
        Self { id, role }
    }

    /// May this principal manage `target` (provision, remove, edit grants)?
    ///
    /// Nobody manages themselves.
    pub fn can_manage(&self, target: &Principal) -> bool {
        self.id != target.id && self.role.outranks(target.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn managers_cannot_manage_peers_or_themselves() {
        let a = Principal::new(PrincipalId::new(), Role::Manager);
        let b = Principal::new(PrincipalId::new(), Role::Manager);
        let s = Principal::new(PrincipalId::new(), Role::Staff);
        assert!(!a.can_manage(&b));
        assert!(!a.can_manage(&a));
        assert!(a.can_manage(&s));
        assert!(!s.can_manage(&a));
    }
}

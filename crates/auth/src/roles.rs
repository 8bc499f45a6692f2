use core::str::FromStr;

use serde::{Deserialize, Serialize};

use grantflow_core::DomainError;

/// Role of a principal.
///
/// Roles never grant capabilities by themselves; the fixed precedence
/// `owner > admin > manager > staff` only bounds who may provision, remove, or
/// edit the grants of whom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Manager,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Staff => "staff",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Role::Owner => 3,
            Role::Admin => 2,
            Role::Manager => 1,
            Role::Staff => 0,
        }
    }

    /// Strict precedence: a role never outranks itself.
    pub fn outranks(&self, other: Role) -> bool {
        self.rank() > other.rank()
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "staff" => Ok(Role::Staff),
            _ => Err(DomainError::validation(format!("unknown role '{s}'"))),
        }
    }
}

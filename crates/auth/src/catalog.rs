//! Fixed module/action vocabulary of the permission matrix.
//!
//! An action is *applicable* to a module iff it is a base action the module
//! does not restrict, or one of the module's declared extra actions. Only
//! applicable pairs can ever be stored or granted.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use grantflow_core::{DomainError, ValueObject};

/// A functional area of the system that capabilities are granted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Module {
    SystemUser,
    Stock,
    Sales,
    Purchases,
    Reports,
    Organization,
    Sessions,
    Settings,
    Category,
    Warehouse,
    Supplier,
    Customer,
}

impl Module {
    pub const ALL: [Module; 12] = [
        Module::SystemUser,
        Module::Stock,
        Module::Sales,
        Module::Purchases,
        Module::Reports,
        Module::Organization,
        Module::Sessions,
        Module::Settings,
        Module::Category,
        Module::Warehouse,
        Module::Supplier,
        Module::Customer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Module::SystemUser => "systemuser",
            Module::Stock => "stock",
            Module::Sales => "sales",
            Module::Purchases => "purchases",
            Module::Reports => "reports",
            Module::Organization => "organization",
            Module::Sessions => "sessions",
            Module::Settings => "settings",
            Module::Category => "category",
            Module::Warehouse => "warehouse",
            Module::Supplier => "supplier",
            Module::Customer => "customer",
        }
    }

    /// Human-readable name used when listing missing dependencies.
    pub fn label(&self) -> &'static str {
        match self {
            Module::SystemUser => "System users",
            Module::Stock => "Stock",
            Module::Sales => "Sales",
            Module::Purchases => "Purchases",
            Module::Reports => "Reports",
            Module::Organization => "Organization",
            Module::Sessions => "Sessions",
            Module::Settings => "Settings",
            Module::Category => "Categories",
            Module::Warehouse => "Warehouses",
            Module::Supplier => "Suppliers",
            Module::Customer => "Customers",
        }
    }

    /// Module-specific actions on top of the base CRUD set.
    pub fn extra_actions(&self) -> &'static [Action] {
        match self {
            Module::Sales => &[Action::Approve, Action::Reject, Action::Complete],
            Module::Purchases => &[
                Action::Approve,
                Action::Reject,
                Action::Complete,
                Action::Receive,
            ],
            _ => &[],
        }
    }

    /// Base actions removed from this module.
    pub fn restricted_actions(&self) -> &'static [Action] {
        match self {
            Module::Organization => &[Action::Create, Action::Delete],
            _ => &[],
        }
    }

    pub fn is_applicable(&self, action: Action) -> bool {
        if action.is_base() {
            !self.restricted_actions().contains(&action)
        } else {
            self.extra_actions().contains(&action)
        }
    }

    /// Every applicable action, base actions first, in declaration order.
    pub fn applicable_actions(&self) -> Vec<Action> {
        Action::BASE
            .iter()
            .copied()
            .filter(|a| !self.restricted_actions().contains(a))
            .chain(self.extra_actions().iter().copied())
            .collect()
    }
}

impl core::fmt::Display for Module {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Module {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Module::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == needle)
            .ok_or_else(|| DomainError::validation(format!("unknown module '{s}'")))
    }
}

/// Something a principal can do on a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    Approve,
    Reject,
    Complete,
    Receive,
}

impl Action {
    pub const BASE: [Action; 4] = [Action::Create, Action::Read, Action::Update, Action::Delete];

    pub const ALL: [Action; 8] = [
        Action::Create,
        Action::Read,
        Action::Update,
        Action::Delete,
        Action::Approve,
        Action::Reject,
        Action::Complete,
        Action::Receive,
    ];

    pub fn is_base(&self) -> bool {
        Action::BASE.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Approve => "approve",
            Action::Reject => "reject",
            Action::Complete => "complete",
            Action::Receive => "receive",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Action::Create => "Create",
            Action::Read => "Read",
            Action::Update => "Update",
            Action::Delete => "Delete",
            Action::Approve => "Approve",
            Action::Reject => "Reject",
            Action::Complete => "Complete",
            Action::Receive => "Receive",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Action::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == needle)
            .ok_or_else(|| DomainError::validation(format!("unknown action '{s}'")))
    }
}

/// A single `(module, action)` cell of the permission matrix.
///
/// Displays and parses as `module:action` (e.g. `customer:read`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Capability {
    pub module: Module,
    pub action: Action,
}

impl ValueObject for Capability {}

impl Capability {
    pub const fn new(module: Module, action: Action) -> Self {
        Self { module, action }
    }

    pub fn is_applicable(&self) -> bool {
        self.module.is_applicable(self.action)
    }

    /// e.g. `Customers: Read`.
    pub fn label(&self) -> String {
        format!("{}: {}", self.module.label(), self.action.label())
    }

    /// Parse and reject inapplicable pairs (`organization:create`).
    pub fn parse_applicable(s: &str) -> Result<Self, DomainError> {
        let cap: Capability = s.parse()?;
        if !cap.is_applicable() {
            return Err(DomainError::validation(format!(
                "action '{}' is not applicable to module '{}'",
                cap.action, cap.module
            )));
        }
        Ok(cap)
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.module, self.action)
    }
}

impl FromStr for Capability {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (module, action) = s
            .split_once(':')
            .ok_or_else(|| DomainError::validation(format!("expected 'module:action', got '{s}'")))?;
        Ok(Self::new(module.parse()?, action.parse()?))
    }
}

/// All applicable capabilities, module by module.
pub fn all_capabilities() -> impl Iterator<Item = Capability> {
    Module::ALL
        .into_iter()
        .flat_map(|m| m.applicable_actions().into_iter().map(move |a| Capability::new(m, a)))
}

//! Static dependency rules between capabilities.

use crate::catalog::{Action, Capability, Module};

/// "Enabling `create` on `source` requires `requires` to already be granted."
///
/// Rules only fire on `create` and never cascade on disable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependencyRule {
    pub source: Module,
    pub requires: &'static [Capability],
}

pub const DEPENDENCY_RULES: &[DependencyRule] = &[
    DependencyRule {
        source: Module::Sales,
        requires: &[Capability::new(Module::Customer, Action::Read)],
    },
    DependencyRule {
        source: Module::Purchases,
        requires: &[Capability::new(Module::Supplier, Action::Read)],
    },
    DependencyRule {
        source: Module::Stock,
        requires: &[
            Capability::new(Module::Category, Action::Read),
            Capability::new(Module::Warehouse, Action::Read),
        ],
    },
];

/// Requirements of enabling `capability` under `rules`; empty unless the
/// action is `create` and a rule exists for the module.
pub fn requirements_for(rules: &[DependencyRule], capability: Capability) -> &'static [Capability] {
    if capability.action != Action::Create {
        return &[];
    }
    rules
        .iter()
        .find(|r| r.source == capability.module)
        .map(|r| r.requires)
        .unwrap_or(&[])
}

//! Per-principal grant matrix.

use std::collections::BTreeMap;

use serde::Serialize;

use grantflow_core::{DomainError, DomainResult, PrincipalId};

use crate::catalog::{Action, Capability, Module, all_capabilities};

/// A batch of grant writes applied together.
pub type GrantChanges = BTreeMap<Capability, bool>;

/// Sparse `module → action → bool` matrix for one principal.
///
/// # Invariants
/// - Keys are present only for applicable `(module, action)` pairs.
/// - A missing key reads as `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GrantSet {
    grants: BTreeMap<Module, BTreeMap<Action, bool>>,
}

impl GrantSet {
    /// Empty matrix: every capability reads `false`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Matrix of a freshly provisioned principal: an explicit `false` for
    /// every applicable pair.
    pub fn provisioned() -> Self {
        Self::filled(false)
    }

    /// Every applicable pair granted.
    pub fn full() -> Self {
        Self::filled(true)
    }

    fn filled(value: bool) -> Self {
        let mut set = Self::new();
        for cap in all_capabilities() {
            set.insert(cap, value);
        }
        set
    }

    pub fn get(&self, capability: Capability) -> bool {
        self.grants
            .get(&capability.module)
            .and_then(|actions| actions.get(&capability.action))
            .copied()
            .unwrap_or(false)
    }

    /// Write a single grant, refusing inapplicable pairs.
    pub fn set(&mut self, capability: Capability, value: bool) -> DomainResult<()> {
        ensure_applicable(capability)?;
        self.insert(capability, value);
        Ok(())
    }

    /// Write a batch: either every pair is applicable and all are written, or
    /// nothing changes.
    pub fn apply(&mut self, changes: &GrantChanges) -> DomainResult<()> {
        for cap in changes.keys() {
            ensure_applicable(*cap)?;
        }
        for (cap, value) in changes {
            self.insert(*cap, *value);
        }
        Ok(())
    }

    fn insert(&mut self, capability: Capability, value: bool) {
        self.grants
            .entry(capability.module)
            .or_default()
            .insert(capability.action, value);
    }

    /// True iff every applicable action of `module` is granted.
    pub fn is_module_fully_enabled(&self, module: Module) -> bool {
        module
            .applicable_actions()
            .into_iter()
            .all(|a| self.get(Capability::new(module, a)))
    }

    /// Granted capabilities, in matrix order.
    pub fn granted(&self) -> Vec<Capability> {
        self.iter().filter(|(_, v)| *v).map(|(c, _)| c).collect()
    }

    /// Stored cells (explicit `true` or `false`), in matrix order.
    pub fn iter(&self) -> impl Iterator<Item = (Capability, bool)> + '_ {
        self.grants.iter().flat_map(|(module, actions)| {
            actions
                .iter()
                .map(move |(action, value)| (Capability::new(*module, *action), *value))
        })
    }
}

fn ensure_applicable(capability: Capability) -> DomainResult<()> {
    if capability.is_applicable() {
        Ok(())
    } else {
        Err(DomainError::validation(format!(
            "action '{}' is not applicable to module '{}'",
            capability.action, capability.module
        )))
    }
}

/// A principal's grant matrix as read from a store, with the version used for
/// compare-and-set on the next write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrantSnapshot {
    pub principal_id: PrincipalId,
    pub grants: GrantSet,
    pub version: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cap(m: Module, a: Action) -> Capability {
        Capability::new(m, a)
    }

    #[test]
    fn absent_keys_read_false() {
        let set = GrantSet::new();
        assert!(!set.get(cap(Module::Sales, Action::Create)));
        assert_eq!(set.iter().count(), 0);
    }

    #[test]
    fn provisioned_set_is_explicitly_all_false() {
        let set = GrantSet::provisioned();
        assert_eq!(set.iter().count(), all_capabilities().count());
        assert!(set.granted().is_empty());
        assert!(set.iter().all(|(c, _)| c.is_applicable()));
    }

    #[test]
    fn set_refuses_inapplicable_pairs() {
        let mut set = GrantSet::new();
        let err = set.set(cap(Module::Organization, Action::Create), true).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(set, GrantSet::new());
    }

    #[test]
    fn apply_is_all_or_nothing() {
        let mut set = GrantSet::new();
        let mut changes = GrantChanges::new();
        changes.insert(cap(Module::Customer, Action::Read), true);
        changes.insert(cap(Module::Stock, Action::Approve), true);

        assert!(set.apply(&changes).is_err());
        assert!(!set.get(cap(Module::Customer, Action::Read)));

        changes.remove(&cap(Module::Stock, Action::Approve));
        set.apply(&changes).unwrap();
        assert!(set.get(cap(Module::Customer, Action::Read)));
    }

    #[test]
    fn fully_enabled_ignores_inapplicable_actions() {
        let mut set = GrantSet::new();
        set.set(cap(Module::Organization, Action::Read), true).unwrap();
        assert!(!set.is_module_fully_enabled(Module::Organization));
        set.set(cap(Module::Organization, Action::Update), true).unwrap();
        assert!(set.is_module_fully_enabled(Module::Organization));
    }

    #[test]
    fn serializes_as_nested_maps() {
        let mut set = GrantSet::new();
        set.set(cap(Module::Sales, Action::Approve), true).unwrap();
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json, serde_json::json!({ "sales": { "approve": true } }));
    }
}

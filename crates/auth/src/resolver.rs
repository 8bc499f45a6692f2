//! Dependency-aware evaluation of proposed grant changes.
//!
//! Evaluation is a pure decision over a [`GrantSnapshot`]: it never writes.
//! The caller commits `Direct`/`AutoApply` decisions in one atomic multi-key
//! write, and turns `NeedsConfirmation` into an explicit confirm/cancel
//! round-trip before anything is written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use grantflow_core::{PendingChangeId, PrincipalId};

use crate::catalog::{Action, Capability, Module};
use crate::dependencies::{DEPENDENCY_RULES, DependencyRule, requirements_for};
use crate::error::{GrantError, MissingDependency};
use crate::grants::{GrantChanges, GrantSnapshot};

/// Whether a change came from a single matrix cell or a whole-module toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeSource {
    Action,
    Module,
}

/// A grant edit as requested by an editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposedChange {
    Action {
        module: Module,
        action: Action,
        value: bool,
    },
    Module {
        module: Module,
        enabled: bool,
    },
}

impl ProposedChange {
    pub fn module(&self) -> Module {
        match self {
            ProposedChange::Action { module, .. } | ProposedChange::Module { module, .. } => *module,
        }
    }

    pub fn source(&self) -> ChangeSource {
        match self {
            ProposedChange::Action { .. } => ChangeSource::Action,
            ProposedChange::Module { .. } => ChangeSource::Module,
        }
    }
}

/// A staged change waiting for an explicit confirm or cancel.
///
/// Holds no lock. `observed_version` is the grant-set version the decision was
/// made against; confirming after the set moved is a conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChange {
    pub id: PendingChangeId,
    pub principal_id: PrincipalId,
    pub module: Module,
    /// `None` for module toggles.
    pub action: Option<Action>,
    pub new_value: bool,
    pub source: ChangeSource,
    /// The primary writes, without the missing dependencies.
    pub changes: GrantChanges,
    pub missing: Vec<MissingDependency>,
    pub observed_version: u64,
    pub created_at: DateTime<Utc>,
}

impl PendingChange {
    /// Primary writes plus every missing dependency set to `true`.
    ///
    /// Accepting a cascade means accepting all of it.
    pub fn confirmed_changes(&self) -> GrantChanges {
        let mut changes = self.changes.clone();
        for dep in &self.missing {
            changes.insert(dep.capability, true);
        }
        changes
    }

    pub fn to_error(&self) -> GrantError {
        GrantError::DependencyRequired {
            pending_change_id: self.id,
            missing: self.missing.clone(),
        }
    }
}

/// Outcome of evaluating a proposed change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Write `changes` as-is.
    Direct { changes: GrantChanges },
    /// Every requirement already holds; `changes` repeats them as no-op writes
    /// so the committed batch shows what the grant relied on.
    AutoApply {
        changes: GrantChanges,
        extra: Vec<Capability>,
    },
    /// Nothing may be written until the cascade is confirmed.
    NeedsConfirmation(PendingChange),
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Direct { .. } => "direct",
            Decision::AutoApply { .. } => "auto_apply",
            Decision::NeedsConfirmation(_) => "needs_confirmation",
        }
    }

    /// The batch to commit right away, or `DependencyRequired`.
    pub fn writes(&self) -> Result<&GrantChanges, GrantError> {
        match self {
            Decision::Direct { changes } | Decision::AutoApply { changes, .. } => Ok(changes),
            Decision::NeedsConfirmation(pending) => Err(pending.to_error()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DependencyResolver {
    rules: &'static [DependencyRule],
}

impl Default for DependencyResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyResolver {
    pub fn new() -> Self {
        Self::with_rules(DEPENDENCY_RULES)
    }

    pub fn with_rules(rules: &'static [DependencyRule]) -> Self {
        Self { rules }
    }

    pub fn evaluate_change(
        &self,
        snapshot: &GrantSnapshot,
        change: ProposedChange,
    ) -> Result<Decision, GrantError> {
        match change {
            ProposedChange::Action {
                module,
                action,
                value,
            } => self.evaluate(snapshot, module, action, value),
            ProposedChange::Module { module, enabled } => {
                self.evaluate_module(snapshot, module, enabled)
            }
        }
    }

    /// Evaluate a single-cell change.
    pub fn evaluate(
        &self,
        snapshot: &GrantSnapshot,
        module: Module,
        action: Action,
        new_value: bool,
    ) -> Result<Decision, GrantError> {
        let capability = Capability::new(module, action);
        if !capability.is_applicable() {
            return Err(GrantError::Validation(format!(
                "action '{action}' is not applicable to module '{module}'"
            )));
        }

        let mut changes = GrantChanges::new();
        changes.insert(capability, new_value);
        Ok(self.classify(snapshot, module, Some(action), new_value, changes))
    }

    /// Evaluate a whole-module toggle over every applicable action.
    pub fn evaluate_module(
        &self,
        snapshot: &GrantSnapshot,
        module: Module,
        enabled: bool,
    ) -> Result<Decision, GrantError> {
        let changes: GrantChanges = module
            .applicable_actions()
            .into_iter()
            .map(|a| (Capability::new(module, a), enabled))
            .collect();
        Ok(self.classify(snapshot, module, None, enabled, changes))
    }

    fn classify(
        &self,
        snapshot: &GrantSnapshot,
        module: Module,
        action: Option<Action>,
        new_value: bool,
        changes: GrantChanges,
    ) -> Decision {
        let create = Capability::new(module, Action::Create);
        if !new_value || changes.get(&create) != Some(&true) {
            return Decision::Direct { changes };
        }

        let required = requirements_for(self.rules, create);
        if required.is_empty() {
            return Decision::Direct { changes };
        }

        // Checked against the current set every time; nothing is cached
        // from earlier grants of the same capability.
        let missing: Vec<MissingDependency> = required
            .iter()
            .filter(|cap| !snapshot.grants.get(**cap))
            .map(|cap| MissingDependency::new(*cap))
            .collect();

        if missing.is_empty() {
            let mut changes = changes;
            for cap in required {
                changes.insert(*cap, true);
            }
            return Decision::AutoApply {
                changes,
                extra: required.to_vec(),
            };
        }

        Decision::NeedsConfirmation(PendingChange {
            id: PendingChangeId::new(),
            principal_id: snapshot.principal_id,
            module,
            action,
            new_value,
            source: if action.is_some() {
                ChangeSource::Action
            } else {
                ChangeSource::Module
            },
            changes,
            missing,
            observed_version: snapshot.version,
            created_at: Utc::now(),
        })
    }
}

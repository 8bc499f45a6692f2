//! Dependency-aware write path for grant matrices.
//!
//! ```text
//! propose ─ snapshot ─ DependencyResolver::evaluate
//!    ├─ Direct / AutoApply ─────────────▶ set_many (CAS on snapshot version)
//!    └─ NeedsConfirmation ─▶ PendingChanges
//!                               ├─ confirm ─▶ set_many(primary + missing, CAS on observed version)
//!                               └─ cancel  ─▶ (nothing written)
//! ```
//!
//! Roles bound who may edit whom; they never grant capabilities.

use chrono::{Duration, Utc};
use tracing::{debug, info};

use grantflow_auth::{
    Action, Capability, Decision, DependencyResolver, GrantChanges, GrantError, GrantSet,
    GrantSnapshot, Module, PendingChange, Principal, ProposedChange, Role,
};
use grantflow_core::{ExpectedVersion, PendingChangeId, PrincipalId};

use crate::error::StoreError;
use crate::grant_store::GrantStore;
use crate::pending::PendingChanges;

/// Default lifetime of a staged change.
pub const DEFAULT_PENDING_TTL_SECS: i64 = 900;

/// Result of [`GrantEditor::propose`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Proposal {
    /// Committed; `decision` is `Direct` or `AutoApply`.
    Applied {
        decision: Decision,
        snapshot: GrantSnapshot,
    },
    /// Staged; nothing was written.
    Pending(PendingChange),
}

pub struct GrantEditor<G> {
    store: G,
    resolver: DependencyResolver,
    pending: PendingChanges,
}

impl<G> GrantEditor<G>
where
    G: GrantStore,
{
    pub fn new(store: G, pending_ttl: Duration) -> Self {
        Self {
            store,
            resolver: DependencyResolver::new(),
            pending: PendingChanges::new(pending_ttl),
        }
    }

    pub fn store(&self) -> &G {
        &self.store
    }

    /// Register a principal with every applicable grant, outside the authority
    /// rules. Used to seed the first owner.
    pub fn bootstrap(&self, principal: Principal) -> Result<GrantSnapshot, GrantError> {
        let snapshot = self.store.provision(principal, GrantSet::full())?;
        info!(principal_id = %principal.id, role = %principal.role, "bootstrap principal provisioned");
        Ok(snapshot)
    }

    /// Create a principal with an all-false grant set.
    pub fn provision(&self, editor: PrincipalId, role: Role) -> Result<(Principal, GrantSnapshot), GrantError> {
        let editor = self.acting(editor)?;
        self.require(&editor, Capability::new(Module::SystemUser, Action::Create))?;
        if !editor.role.outranks(role) {
            return Err(GrantError::Forbidden(format!(
                "{} cannot provision a principal with role {role}",
                editor.role
            )));
        }

        let principal = Principal::new(PrincipalId::new(), role);
        let snapshot = self.store.provision(principal, GrantSet::provisioned())?;
        info!(principal_id = %principal.id, %role, editor = %editor.id, "principal provisioned");
        Ok((principal, snapshot))
    }

    /// Remove a principal and its grant set.
    pub fn remove(&self, editor: PrincipalId, target: PrincipalId) -> Result<(), GrantError> {
        let editor = self.acting(editor)?;
        self.require(&editor, Capability::new(Module::SystemUser, Action::Delete))?;
        let target = self.target(target)?;
        self.require_manages(&editor, &target)?;

        self.store.remove(target.id).map_err(|e| match e {
            StoreError::NotFound(_) => GrantError::PrincipalNotFound(target.id),
            other => other.into(),
        })?;
        info!(principal_id = %target.id, editor = %editor.id, "principal removed");
        Ok(())
    }

    /// Read a grant set: needs `systemuser:read`, unless reading one's own.
    pub fn grants(&self, reader: PrincipalId, target: PrincipalId) -> Result<GrantSnapshot, GrantError> {
        let reader = self.acting(reader)?;
        if reader.id != target {
            self.require(&reader, Capability::new(Module::SystemUser, Action::Read))?;
        }
        self.snapshot(target)
    }

    pub fn propose(
        &self,
        editor: PrincipalId,
        target: PrincipalId,
        change: ProposedChange,
    ) -> Result<Proposal, GrantError> {
        let (editor, target) = self.edit_authority(editor, target)?;
        let snapshot = self.snapshot(target.id)?;
        let decision = self.resolver.evaluate_change(&snapshot, change)?;

        match decision {
            Decision::NeedsConfirmation(pending) => {
                self.pending.insert(pending.clone(), Utc::now())?;
                info!(
                    principal_id = %target.id,
                    editor = %editor.id,
                    pending_change_id = %pending.id,
                    module = %pending.module,
                    missing = pending.missing.len(),
                    "grant change staged for confirmation"
                );
                Ok(Proposal::Pending(pending))
            }
            decision => {
                let committed = self.commit(&target, decision.writes()?, snapshot.version)?;
                debug!(decision = decision.as_str(), editor = %editor.id, "grant change applied");
                Ok(Proposal::Applied {
                    decision,
                    snapshot: committed,
                })
            }
        }
    }

    /// Commit a staged change with every missing dependency.
    ///
    /// The pending change is consumed even if the commit then conflicts; the
    /// caller re-proposes against the new state.
    pub fn confirm(
        &self,
        editor: PrincipalId,
        target: PrincipalId,
        pending_change_id: PendingChangeId,
    ) -> Result<GrantSnapshot, GrantError> {
        let (editor, target) = self.edit_authority(editor, target)?;
        let pending = self
            .pending
            .take(pending_change_id, target.id, Utc::now())?
            .ok_or(GrantError::PendingChangeNotFound(pending_change_id))?;

        let committed = self.commit(&target, &pending.confirmed_changes(), pending.observed_version)?;
        info!(
            principal_id = %target.id,
            editor = %editor.id,
            pending_change_id = %pending.id,
            "pending grant change confirmed"
        );
        Ok(committed)
    }

    pub fn cancel(
        &self,
        editor: PrincipalId,
        target: PrincipalId,
        pending_change_id: PendingChangeId,
    ) -> Result<(), GrantError> {
        let (editor, target) = self.edit_authority(editor, target)?;
        self.pending
            .take(pending_change_id, target.id, Utc::now())?
            .ok_or(GrantError::PendingChangeNotFound(pending_change_id))?;
        info!(principal_id = %target.id, editor = %editor.id, %pending_change_id, "pending grant change cancelled");
        Ok(())
    }

    fn commit(
        &self,
        target: &Principal,
        changes: &GrantChanges,
        observed_version: u64,
    ) -> Result<GrantSnapshot, GrantError> {
        let committed = self
            .store
            .set_many(target.id, changes, ExpectedVersion::Exact(observed_version))
            .map_err(|e| match e {
                StoreError::Concurrency { actual, .. } => GrantError::Conflict {
                    principal_id: target.id,
                    expected: observed_version,
                    actual,
                },
                StoreError::NotFound(_) => GrantError::PrincipalNotFound(target.id),
                other => other.into(),
            })?;
        info!(
            principal_id = %target.id,
            keys = changes.len(),
            version = committed.version,
            "grant set committed"
        );
        Ok(committed)
    }

    fn snapshot(&self, principal_id: PrincipalId) -> Result<GrantSnapshot, GrantError> {
        self.store
            .snapshot(principal_id)?
            .ok_or(GrantError::PrincipalNotFound(principal_id))
    }

    /// The acting principal must exist; an unknown actor holds nothing.
    fn acting(&self, principal_id: PrincipalId) -> Result<Principal, GrantError> {
        self.store
            .principal(principal_id)?
            .ok_or_else(|| GrantError::Forbidden(format!("unknown principal {principal_id}")))
    }

    fn target(&self, principal_id: PrincipalId) -> Result<Principal, GrantError> {
        self.store
            .principal(principal_id)?
            .ok_or(GrantError::PrincipalNotFound(principal_id))
    }

    fn require(&self, principal: &Principal, capability: Capability) -> Result<(), GrantError> {
        if self.store.get(principal.id, capability)? {
            Ok(())
        } else {
            debug!(principal_id = %principal.id, %capability, "grant administration denied");
            Err(GrantError::Forbidden(format!(
                "missing required capability '{capability}'"
            )))
        }
    }

    fn require_manages(&self, editor: &Principal, target: &Principal) -> Result<(), GrantError> {
        if editor.can_manage(target) {
            Ok(())
        } else {
            Err(GrantError::Forbidden(format!(
                "{} cannot manage a principal with role {}",
                editor.role, target.role
            )))
        }
    }

    fn edit_authority(
        &self,
        editor: PrincipalId,
        target: PrincipalId,
    ) -> Result<(Principal, Principal), GrantError> {
        let editor = self.acting(editor)?;
        self.require(&editor, Capability::new(Module::SystemUser, Action::Update))?;
        let target = self.target(target)?;
        self.require_manages(&editor, &target)?;
        Ok((editor, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grant_store::InMemoryGrantStore;
    use std::sync::Arc;

    struct Fixture {
        editor: GrantEditor<Arc<InMemoryGrantStore>>,
        owner: PrincipalId,
    }

    fn fixture() -> Fixture {
        let editor = GrantEditor::new(
            Arc::new(InMemoryGrantStore::new()),
            Duration::seconds(DEFAULT_PENDING_TTL_SECS),
        );
        let owner = PrincipalId::new();
        editor.bootstrap(Principal::new(owner, Role::Owner)).unwrap();
        Fixture { editor, owner }
    }

    fn cap(m: Module, a: Action) -> Capability {
        Capability::new(m, a)
    }

    #[test]
    fn provisioned_principal_starts_all_false() {
        let f = fixture();
        let (p, snapshot) = f.editor.provision(f.owner, Role::Staff).unwrap();
        assert_eq!(p.role, Role::Staff);
        assert!(snapshot.grants.granted().is_empty());
        assert_eq!(
            snapshot.grants.iter().count(),
            grantflow_auth::all_capabilities().count()
        );
    }

    #[test]
    fn provisioning_requires_outranking_the_new_role() {
        let f = fixture();
        let err = f.editor.provision(f.owner, Role::Owner).unwrap_err();
        assert!(matches!(err, GrantError::Forbidden(_)));

        // a staff member without systemuser:create cannot provision at all
        let (staff, _) = f.editor.provision(f.owner, Role::Staff).unwrap();
        let err = f.editor.provision(staff.id, Role::Staff).unwrap_err();
        assert!(matches!(err, GrantError::Forbidden(_)));
    }

    #[test]
    fn disabling_is_applied_directly() {
        let f = fixture();
        let (p, _) = f.editor.provision(f.owner, Role::Manager).unwrap();
        let proposal = f
            .editor
            .propose(
                f.owner,
                p.id,
                ProposedChange::Action {
                    module: Module::Reports,
                    action: Action::Read,
                    value: false,
                },
            )
            .unwrap();
        assert!(matches!(
            proposal,
            Proposal::Applied {
                decision: Decision::Direct { .. },
                ..
            }
        ));
    }

    #[test]
    fn cascade_waits_for_confirmation_and_then_lands_atomically() {
        let f = fixture();
        let (p, before) = f.editor.provision(f.owner, Role::Staff).unwrap();

        let Proposal::Pending(pending) = f
            .editor
            .propose(
                f.owner,
                p.id,
                ProposedChange::Action {
                    module: Module::Sales,
                    action: Action::Create,
                    value: true,
                },
            )
            .unwrap()
        else {
            panic!("expected a staged change");
        };

        // nothing written yet
        assert_eq!(f.editor.grants(f.owner, p.id).unwrap(), before);

        let after = f.editor.confirm(f.owner, p.id, pending.id).unwrap();
        assert!(after.grants.get(cap(Module::Sales, Action::Create)));
        assert!(after.grants.get(cap(Module::Customer, Action::Read)));
        assert_eq!(after.version, before.version + 1);
    }

    #[test]
    fn cancel_writes_nothing_and_consumes_the_change() {
        let f = fixture();
        let (p, before) = f.editor.provision(f.owner, Role::Staff).unwrap();
        let Proposal::Pending(pending) = f
            .editor
            .propose(f.owner, p.id, ProposedChange::Module { module: Module::Stock, enabled: true })
            .unwrap()
        else {
            panic!("expected a staged change");
        };

        f.editor.cancel(f.owner, p.id, pending.id).unwrap();
        assert_eq!(f.editor.grants(f.owner, p.id).unwrap(), before);
        assert_eq!(
            f.editor.confirm(f.owner, p.id, pending.id).unwrap_err(),
            GrantError::PendingChangeNotFound(pending.id)
        );
    }

    #[test]
    fn confirm_after_a_concurrent_edit_conflicts() {
        let f = fixture();
        let (p, _) = f.editor.provision(f.owner, Role::Staff).unwrap();
        let Proposal::Pending(pending) = f
            .editor
            .propose(
                f.owner,
                p.id,
                ProposedChange::Action {
                    module: Module::Purchases,
                    action: Action::Create,
                    value: true,
                },
            )
            .unwrap()
        else {
            panic!("expected a staged change");
        };

        f.editor
            .propose(
                f.owner,
                p.id,
                ProposedChange::Action {
                    module: Module::Reports,
                    action: Action::Read,
                    value: true,
                },
            )
            .unwrap();

        let err = f.editor.confirm(f.owner, p.id, pending.id).unwrap_err();
        assert!(matches!(err, GrantError::Conflict { expected: 1, actual: 2, .. }));
        assert!(!f
            .editor
            .store()
            .get(p.id, cap(Module::Purchases, Action::Create))
            .unwrap());
    }

    #[test]
    fn pending_change_is_bound_to_its_target() {
        let f = fixture();
        let (a, _) = f.editor.provision(f.owner, Role::Staff).unwrap();
        let (b, _) = f.editor.provision(f.owner, Role::Staff).unwrap();
        let Proposal::Pending(pending) = f
            .editor
            .propose(
                f.owner,
                a.id,
                ProposedChange::Action {
                    module: Module::Sales,
                    action: Action::Create,
                    value: true,
                },
            )
            .unwrap()
        else {
            panic!("expected a staged change");
        };

        assert_eq!(
            f.editor.confirm(f.owner, b.id, pending.id).unwrap_err(),
            GrantError::PendingChangeNotFound(pending.id)
        );
        f.editor.confirm(f.owner, a.id, pending.id).unwrap();
    }

    #[test]
    fn nobody_edits_peers_or_themselves() {
        let f = fixture();
        let (admin, _) = f.editor.provision(f.owner, Role::Admin).unwrap();
        let (peer, _) = f.editor.provision(f.owner, Role::Admin).unwrap();
        f.editor
            .propose(
                f.owner,
                admin.id,
                ProposedChange::Module {
                    module: Module::SystemUser,
                    enabled: true,
                },
            )
            .unwrap();

        let change = ProposedChange::Action {
            module: Module::Reports,
            action: Action::Read,
            value: true,
        };
        assert!(matches!(
            f.editor.propose(admin.id, peer.id, change),
            Err(GrantError::Forbidden(_))
        ));
        assert!(matches!(
            f.editor.propose(admin.id, admin.id, change),
            Err(GrantError::Forbidden(_))
        ));
        assert!(matches!(
            f.editor.propose(f.owner, f.owner, change),
            Err(GrantError::Forbidden(_))
        ));
    }

    #[test]
    fn principals_can_read_their_own_grants() {
        let f = fixture();
        let (p, snapshot) = f.editor.provision(f.owner, Role::Staff).unwrap();
        assert_eq!(f.editor.grants(p.id, p.id).unwrap(), snapshot);
        assert!(matches!(
            f.editor.grants(p.id, f.owner),
            Err(GrantError::Forbidden(_))
        ));
    }

    #[test]
    fn removal_needs_delete_and_rank() {
        let f = fixture();
        let (p, _) = f.editor.provision(f.owner, Role::Staff).unwrap();
        f.editor.remove(f.owner, p.id).unwrap();
        assert_eq!(
            f.editor.grants(f.owner, p.id).unwrap_err(),
            GrantError::PrincipalNotFound(p.id)
        );
    }
}

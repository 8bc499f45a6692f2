//! Workflow execution pipeline.
//!
//! ```text
//! request
//!   ↓ 1. load document, check optional expected status (Conflict)
//!   ↓ 2. status moved past the transition's source? (Conflict)
//!   ↓ 3. aggregate.guard: status allows the move? (InvalidTransition)
//!   ↓ 4. gate: actor holds the capability? (Forbidden)
//!   ↓ 5. aggregate.handle: payload valid, e.g. reason length? (Validation)
//!   ↓ 6. commit document + TransitionRecord, CAS on version (Conflict)
//! ```
//!
//! The status check always runs before the capability check, so a request
//! that is invalid in the current status is reported as such regardless of
//! the actor's grants. Payload validation runs only for authorized actors.
//! A rejected request changes nothing.
//!
//! A transition that lost a race is a `Conflict` whether or not the caller
//! sent an expected status: approving a document that is already approved or
//! rejected means another request moved it first. Approving a draft is still
//! `InvalidTransition`, since the document never was in a state to approve.
//!
//! Commands are timestamped after the load and never earlier than the
//! document's latest stamp, so a committed history reads in causal order.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use grantflow_auth::{Action, Capability};
use grantflow_core::{Aggregate, AggregateRoot, DocumentId, ExpectedVersion, PrincipalId};
use grantflow_workflow::{
    ApplyTransition, CreateDocument, Document, DocumentCommand, DocumentEvent, DocumentKind,
    DocumentStatus, PaymentStatus, Transition, TransitionRecord, UpdatePaymentStatus,
    WorkflowError,
};

use crate::document_store::{AuditTrail, DocumentStore};
use crate::error::StoreError;
use crate::gate::AuthorizationGate;
use crate::grant_store::GrantStore;

/// A committed status move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionOutcome {
    pub document: Document,
    pub record: TransitionRecord,
}

pub struct WorkflowEngine<G, D> {
    gate: AuthorizationGate<G>,
    documents: D,
}

impl<G, D> WorkflowEngine<G, D>
where
    G: GrantStore,
    D: DocumentStore + AuditTrail,
{
    pub fn new(gate: AuthorizationGate<G>, documents: D) -> Self {
        Self { gate, documents }
    }

    pub fn gate(&self) -> &AuthorizationGate<G> {
        &self.gate
    }

    /// Create a document in `draft`, unpaid. Requires `<module>:create`.
    pub fn create_document(&self, actor: PrincipalId, kind: DocumentKind) -> Result<Document, WorkflowError> {
        self.ensure_actor(actor)?;
        let id = DocumentId::new();
        let command = DocumentCommand::Create(CreateDocument {
            document_id: id,
            kind,
            actor,
            occurred_at: Utc::now(),
        });
        self.require(actor, command.required_capability(kind))?;

        let mut document = Document::empty(id, kind);
        for event in document.handle(&command)? {
            document.apply(&event);
        }
        self.documents.insert(document.clone())?;
        info!(document_id = %id, %kind, actor = %actor, "document created");
        Ok(document)
    }

    /// Requires `<module>:read`.
    pub fn get(&self, actor: PrincipalId, document_id: DocumentId) -> Result<Document, WorkflowError> {
        let document = self.load(document_id)?;
        self.require(actor, Some(Capability::new(document.kind().module(), Action::Read)))?;
        Ok(document)
    }

    /// Transition records of a document, oldest first. Requires `<module>:read`.
    pub fn history(
        &self,
        actor: PrincipalId,
        document_id: DocumentId,
    ) -> Result<Vec<TransitionRecord>, WorkflowError> {
        self.get(actor, document_id)?;
        Ok(self.documents.list_for(document_id)?)
    }

    /// Attempt a transition given by name (`"Approve"`, `"reject"`, ...).
    pub fn attempt(
        &self,
        actor: PrincipalId,
        document_id: DocumentId,
        transition_name: &str,
        reason: Option<String>,
        expected_status: Option<DocumentStatus>,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let transition: Transition = transition_name.parse()?;
        self.transition(actor, document_id, transition, reason, expected_status)
    }

    pub fn transition(
        &self,
        actor: PrincipalId,
        document_id: DocumentId,
        transition: Transition,
        reason: Option<String>,
        expected_status: Option<DocumentStatus>,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let (document, record) = self.execute(actor, document_id, expected_status, |occurred_at| {
            DocumentCommand::Transition(ApplyTransition {
                transition,
                actor,
                reason,
                occurred_at,
            })
        })?;
        let record = record.ok_or_else(|| {
            WorkflowError::Storage("transition committed without a record".to_string())
        })?;

        info!(
            document_id = %document_id,
            kind = %document.kind(),
            from = %record.from_status,
            to = %record.to_status,
            actor = %actor,
            sequence = record.sequence,
            "document transitioned"
        );
        Ok(TransitionOutcome { document, record })
    }

    /// Set the payment status. Requires `<module>:update`; locked in `draft`
    /// and `rejected`. Not a status move, so no record is written.
    pub fn update_payment_status(
        &self,
        actor: PrincipalId,
        document_id: DocumentId,
        status: PaymentStatus,
    ) -> Result<Document, WorkflowError> {
        let (document, _) = self.execute(actor, document_id, None, |occurred_at| {
            DocumentCommand::UpdatePaymentStatus(UpdatePaymentStatus {
                status,
                actor,
                occurred_at,
            })
        })?;
        info!(
            document_id = %document_id,
            payment_status = %document.payment_status(),
            actor = %actor,
            "payment status updated"
        );
        Ok(document)
    }

    fn execute<F>(
        &self,
        actor: PrincipalId,
        document_id: DocumentId,
        expected_status: Option<DocumentStatus>,
        build: F,
    ) -> Result<(Document, Option<TransitionRecord>), WorkflowError>
    where
        F: FnOnce(DateTime<Utc>) -> DocumentCommand,
    {
        self.ensure_actor(actor)?;
        let current = self.load(document_id)?;
        let command = build(stamp_after(&current));

        if let Some(expected) = expected_status {
            if current.status() != expected {
                return Err(WorkflowError::StatusConflict {
                    document_id,
                    expected,
                    actual: current.status(),
                });
            }
        }

        if let DocumentCommand::Transition(cmd) = &command {
            if let Some(expected) = cmd.transition.overtaken_from(current.status()) {
                debug!(
                    document_id = %document_id,
                    transition = %cmd.transition,
                    status = %current.status(),
                    "transition lost to a concurrent move"
                );
                return Err(WorkflowError::StatusConflict {
                    document_id,
                    expected,
                    actual: current.status(),
                });
            }
        }

        // status, then capability, then payload
        current.guard(&command)?;
        self.require(actor, command.required_capability(current.kind()))?;
        let events = current.handle(&command)?;

        let mut next = current.clone();
        let mut record = None;
        for event in &events {
            next.apply(event);
            if let DocumentEvent::Transitioned(e) = event {
                record = Some(TransitionRecord::from_event(current.kind(), e, next.version()));
            }
        }

        self.documents
            .commit(next.clone(), ExpectedVersion::Exact(current.version()), record.clone())
            .map_err(|e| match e {
                StoreError::Concurrency { actual, .. } => WorkflowError::VersionConflict {
                    document_id,
                    expected: current.version(),
                    actual,
                },
                StoreError::NotFound(_) => WorkflowError::NotFound(document_id),
                other => other.into(),
            })?;

        Ok((next, record))
    }

    fn load(&self, document_id: DocumentId) -> Result<Document, WorkflowError> {
        self.documents
            .load(document_id)?
            .ok_or(WorkflowError::NotFound(document_id))
    }

    fn ensure_actor(&self, actor: PrincipalId) -> Result<(), WorkflowError> {
        if self.gate.knows(actor)? {
            Ok(())
        } else {
            Err(WorkflowError::UnknownActor(actor))
        }
    }

    fn require(&self, actor: PrincipalId, capability: Option<Capability>) -> Result<(), WorkflowError> {
        let Some(capability) = capability else {
            return Ok(());
        };
        if self.gate.try_can(actor, capability)? {
            Ok(())
        } else {
            debug!(actor = %actor, %capability, "workflow request denied");
            Err(WorkflowError::Forbidden { capability })
        }
    }
}

/// Now, or the document's latest stamp if the clock reads earlier.
fn stamp_after(document: &Document) -> DateTime<Utc> {
    let now = Utc::now();
    document.last_activity_at().map_or(now, |last| last.max(now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document_store::InMemoryDocumentStore;
    use crate::grant_store::InMemoryGrantStore;
    use grantflow_auth::{GrantChanges, GrantSet, Module, Principal, Role};
    use std::sync::Arc;

    type Engine = WorkflowEngine<Arc<InMemoryGrantStore>, Arc<InMemoryDocumentStore>>;

    fn engine() -> (Engine, Arc<InMemoryGrantStore>) {
        let grants = Arc::new(InMemoryGrantStore::new());
        let engine = WorkflowEngine::new(
            AuthorizationGate::new(grants.clone()),
            Arc::new(InMemoryDocumentStore::new()),
        );
        (engine, grants)
    }

    fn principal(grants: &InMemoryGrantStore, caps: &[(Module, Action)]) -> PrincipalId {
        let id = PrincipalId::new();
        grants
            .provision(Principal::new(id, Role::Staff), GrantSet::provisioned())
            .unwrap();
        let changes: GrantChanges = caps
            .iter()
            .map(|(m, a)| (Capability::new(*m, *a), true))
            .collect();
        grants.set_many(id, &changes, ExpectedVersion::Any).unwrap();
        id
    }

    #[test]
    fn creation_requires_create_grant() {
        let (engine, grants) = engine();
        let nobody = principal(&grants, &[]);
        assert_eq!(
            engine.create_document(nobody, DocumentKind::Sale).unwrap_err(),
            WorkflowError::Forbidden {
                capability: Capability::new(Module::Sales, Action::Create)
            }
        );

        let clerk = principal(&grants, &[(Module::Sales, Action::Create)]);
        let doc = engine.create_document(clerk, DocumentKind::Sale).unwrap();
        assert_eq!(doc.status(), DocumentStatus::Draft);
        assert_eq!(doc.payment_status(), PaymentStatus::Unpaid);
    }

    #[test]
    fn unknown_actor_cannot_submit() {
        let (engine, grants) = engine();
        let clerk = principal(&grants, &[(Module::Sales, Action::Create)]);
        let doc = engine.create_document(clerk, DocumentKind::Sale).unwrap();
        let stranger = PrincipalId::new();
        assert_eq!(
            engine.attempt(stranger, doc.id_typed(), "Submit", None, None).unwrap_err(),
            WorkflowError::UnknownActor(stranger)
        );
    }

    #[test]
    fn status_guard_runs_before_capability_guard() {
        let (engine, grants) = engine();
        let clerk = principal(&grants, &[(Module::Sales, Action::Create)]);
        let doc = engine.create_document(clerk, DocumentKind::Sale).unwrap();

        // clerk lacks sales:approve, yet the answer is about the status
        let err = engine
            .attempt(clerk, doc.id_typed(), "Approve", None, None)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
        assert!(engine.documents.list_for(doc.id_typed()).unwrap().is_empty());
    }

    #[test]
    fn capability_is_checked_before_the_reason() {
        let (engine, grants) = engine();
        let clerk = principal(&grants, &[(Module::Sales, Action::Create)]);
        let reviewer = principal(&grants, &[(Module::Sales, Action::Reject)]);
        let doc = engine.create_document(clerk, DocumentKind::Sale).unwrap();
        engine.attempt(clerk, doc.id_typed(), "submit", None, None).unwrap();
        let essay = "x".repeat(600);

        assert_eq!(
            engine
                .attempt(clerk, doc.id_typed(), "reject", Some(essay.clone()), None)
                .unwrap_err(),
            WorkflowError::Forbidden {
                capability: Capability::new(Module::Sales, Action::Reject)
            }
        );
        assert!(matches!(
            engine.attempt(reviewer, doc.id_typed(), "reject", Some(essay), None),
            Err(WorkflowError::Validation(_))
        ));
        assert_eq!(engine.documents.list_for(doc.id_typed()).unwrap().len(), 1);
    }

    #[test]
    fn repeating_a_won_transition_is_a_conflict() {
        let (engine, grants) = engine();
        let clerk = principal(&grants, &[(Module::Sales, Action::Create)]);
        let manager = principal(
            &grants,
            &[(Module::Sales, Action::Approve), (Module::Sales, Action::Reject)],
        );
        let doc = engine.create_document(clerk, DocumentKind::Sale).unwrap();
        engine.attempt(clerk, doc.id_typed(), "submit", None, None).unwrap();
        engine.attempt(manager, doc.id_typed(), "approve", None, None).unwrap();

        assert_eq!(
            engine.attempt(manager, doc.id_typed(), "approve", None, None).unwrap_err(),
            WorkflowError::StatusConflict {
                document_id: doc.id_typed(),
                expected: DocumentStatus::Submitted,
                actual: DocumentStatus::Approved,
            }
        );
        assert_eq!(
            engine
                .attempt(manager, doc.id_typed(), "reject", None, None)
                .unwrap_err()
                .kind(),
            grantflow_core::ErrorKind::Conflict
        );
        assert_eq!(engine.documents.list_for(doc.id_typed()).unwrap().len(), 2);
    }

    #[test]
    fn approving_after_a_reject_is_a_conflict() {
        let (engine, grants) = engine();
        let clerk = principal(&grants, &[(Module::Sales, Action::Create)]);
        let manager = principal(
            &grants,
            &[(Module::Sales, Action::Approve), (Module::Sales, Action::Reject)],
        );
        let doc = engine.create_document(clerk, DocumentKind::Sale).unwrap();
        engine.attempt(clerk, doc.id_typed(), "submit", None, None).unwrap();
        engine.attempt(manager, doc.id_typed(), "reject", None, None).unwrap();

        let err = engine
            .attempt(manager, doc.id_typed(), "approve", None, None)
            .unwrap_err();
        assert_eq!(err.kind(), grantflow_core::ErrorKind::Conflict);

        // completing never was possible from rejected
        let err = engine
            .attempt(manager, doc.id_typed(), "complete", None, None)
            .unwrap_err();
        assert_eq!(err.kind(), grantflow_core::ErrorKind::InvalidTransition);
    }

    #[test]
    fn stamps_never_go_back_in_time() {
        let (engine, grants) = engine();
        let clerk = principal(&grants, &[(Module::Sales, Action::Create)]);
        let doc = engine.create_document(clerk, DocumentKind::Sale).unwrap();

        // a document stamped in the future, e.g. by a host with a fast clock
        let mut ahead = doc.clone();
        let future = Utc::now() + chrono::Duration::minutes(5);
        ahead.apply(&DocumentEvent::Transitioned(grantflow_workflow::DocumentTransitioned {
            document_id: doc.id_typed(),
            transition: Transition::Submit,
            from: DocumentStatus::Draft,
            to: DocumentStatus::Submitted,
            actor: clerk,
            reason: None,
            occurred_at: future,
        }));
        engine
            .documents
            .commit(ahead, ExpectedVersion::Exact(doc.version()), None)
            .unwrap();

        let manager = principal(&grants, &[(Module::Sales, Action::Approve)]);
        let outcome = engine
            .attempt(manager, doc.id_typed(), "approve", None, None)
            .unwrap();
        assert!(outcome.record.timestamp >= future);
        assert!(outcome.document.approved().map(|s| s.at) >= outcome.document.submitted().map(|s| s.at));
    }

    #[test]
    fn expected_status_mismatch_is_a_conflict() {
        let (engine, grants) = engine();
        let clerk = principal(&grants, &[(Module::Sales, Action::Create)]);
        let doc = engine.create_document(clerk, DocumentKind::Sale).unwrap();
        let err = engine
            .attempt(clerk, doc.id_typed(), "submit", None, Some(DocumentStatus::Submitted))
            .unwrap_err();
        assert_eq!(
            err,
            WorkflowError::StatusConflict {
                document_id: doc.id_typed(),
                expected: DocumentStatus::Submitted,
                actual: DocumentStatus::Draft,
            }
        );
    }

    #[test]
    fn unknown_transition_name_is_a_validation_error() {
        let (engine, grants) = engine();
        let clerk = principal(&grants, &[(Module::Sales, Action::Create)]);
        let doc = engine.create_document(clerk, DocumentKind::Sale).unwrap();
        assert!(matches!(
            engine.attempt(clerk, doc.id_typed(), "archive", None, None),
            Err(WorkflowError::Validation(_))
        ));
    }

    #[test]
    fn payment_update_needs_update_grant_and_writes_no_record() {
        let (engine, grants) = engine();
        let clerk = principal(
            &grants,
            &[(Module::Purchases, Action::Create), (Module::Purchases, Action::Update)],
        );
        let doc = engine
            .create_document(clerk, DocumentKind::PurchaseOrder)
            .unwrap();

        assert!(matches!(
            engine.update_payment_status(clerk, doc.id_typed(), PaymentStatus::Paid),
            Err(WorkflowError::InvalidTransition { status: DocumentStatus::Draft, .. })
        ));

        engine
            .attempt(clerk, doc.id_typed(), "submit", None, None)
            .unwrap();
        let updated = engine
            .update_payment_status(clerk, doc.id_typed(), PaymentStatus::Partial)
            .unwrap();
        assert_eq!(updated.payment_status(), PaymentStatus::Partial);
        assert_eq!(updated.status(), DocumentStatus::Submitted);
        assert_eq!(engine.history(clerk, doc.id_typed()).unwrap_err().kind(), grantflow_core::ErrorKind::Forbidden);
        assert_eq!(engine.documents.list_for(doc.id_typed()).unwrap().len(), 1);
    }

    #[test]
    fn reading_requires_read_grant() {
        let (engine, grants) = engine();
        let clerk = principal(&grants, &[(Module::Sales, Action::Create), (Module::Sales, Action::Read)]);
        let outsider = principal(&grants, &[]);
        let doc = engine.create_document(clerk, DocumentKind::Sale).unwrap();
        assert_eq!(engine.get(clerk, doc.id_typed()).unwrap(), doc);
        assert!(matches!(
            engine.get(outsider, doc.id_typed()),
            Err(WorkflowError::Forbidden { .. })
        ));
        assert!(matches!(
            engine.get(clerk, DocumentId::new()),
            Err(WorkflowError::NotFound(_))
        ));
    }
}

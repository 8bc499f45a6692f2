use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use grantflow_auth::{Action, Capability};
use grantflow_core::{Aggregate, AggregateRoot, DocumentId, DomainError, PrincipalId, ValueObject};

use crate::error::WorkflowError;
use crate::kind::DocumentKind;

const MAX_REASON_LEN: usize = 500;

/// Document status lifecycle.
///
/// `draft → submitted → approved → completed`, with `rejected` reachable from
/// `draft` or `submitted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Draft,
    Submitted,
    Approved,
    Completed,
    Rejected,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::Submitted => "submitted",
            DocumentStatus::Approved => "approved",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DocumentStatus::Completed | DocumentStatus::Rejected)
    }

    /// Payment status cannot be touched while the document is in one of these.
    pub fn locks_payment(&self) -> bool {
        matches!(self, DocumentStatus::Draft | DocumentStatus::Rejected)
    }

    /// Statuses one transition away.
    pub fn successors(&self) -> &'static [DocumentStatus] {
        match self {
            DocumentStatus::Draft => &[DocumentStatus::Submitted, DocumentStatus::Rejected],
            DocumentStatus::Submitted => &[DocumentStatus::Approved, DocumentStatus::Rejected],
            DocumentStatus::Approved => &[DocumentStatus::Completed],
            DocumentStatus::Completed | DocumentStatus::Rejected => &[],
        }
    }

    /// Whether `later` can only be reached after leaving `self`.
    pub fn precedes(&self, later: DocumentStatus) -> bool {
        self.successors()
            .iter()
            .any(|next| *next == later || next.precedes(later))
    }
}

impl ValueObject for DocumentStatus {}

impl core::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(DocumentStatus::Draft),
            "submitted" => Ok(DocumentStatus::Submitted),
            "approved" => Ok(DocumentStatus::Approved),
            "completed" => Ok(DocumentStatus::Completed),
            "rejected" => Ok(DocumentStatus::Rejected),
            _ => Err(DomainError::validation(format!("unknown document status '{s}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
        }
    }
}

impl ValueObject for PaymentStatus {}

impl core::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unpaid" => Ok(PaymentStatus::Unpaid),
            "partial" => Ok(PaymentStatus::Partial),
            "paid" => Ok(PaymentStatus::Paid),
            _ => Err(DomainError::validation(format!("unknown payment status '{s}'"))),
        }
    }
}

/// A guarded status move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    Submit,
    Approve,
    Reject,
    Complete,
}

impl Transition {
    pub const ALL: [Transition; 4] = [
        Transition::Submit,
        Transition::Approve,
        Transition::Reject,
        Transition::Complete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Submit => "submit",
            Transition::Approve => "approve",
            Transition::Reject => "reject",
            Transition::Complete => "complete",
        }
    }

    pub fn allowed_from(&self) -> &'static [DocumentStatus] {
        match self {
            Transition::Submit => &[DocumentStatus::Draft],
            Transition::Approve => &[DocumentStatus::Submitted],
            Transition::Reject => &[DocumentStatus::Draft, DocumentStatus::Submitted],
            Transition::Complete => &[DocumentStatus::Approved],
        }
    }

    pub fn is_allowed_from(&self, status: DocumentStatus) -> bool {
        self.allowed_from().contains(&status)
    }

    /// The source status a document in `status` has already moved past.
    ///
    /// `Some(submitted)` for approving an approved or rejected document: the
    /// move was valid once and lost to another one. `None` when the move is
    /// allowed or could never have been (approving a draft).
    pub fn overtaken_from(&self, status: DocumentStatus) -> Option<DocumentStatus> {
        if self.is_allowed_from(status) {
            return None;
        }
        self.allowed_from()
            .iter()
            .copied()
            .find(|from| from.precedes(status))
    }

    pub fn target(&self) -> DocumentStatus {
        match self {
            Transition::Submit => DocumentStatus::Submitted,
            Transition::Approve => DocumentStatus::Approved,
            Transition::Reject => DocumentStatus::Rejected,
            Transition::Complete => DocumentStatus::Completed,
        }
    }

    /// Action gating this transition. Submitting only requires being an actor.
    pub fn required_action(&self) -> Option<Action> {
        match self {
            Transition::Submit => None,
            Transition::Approve => Some(Action::Approve),
            Transition::Reject => Some(Action::Reject),
            Transition::Complete => Some(Action::Complete),
        }
    }

    pub fn required_capability(&self, kind: DocumentKind) -> Option<Capability> {
        self.required_action()
            .map(|action| Capability::new(kind.module(), action))
    }
}

impl core::fmt::Display for Transition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Transition {
    type Err = DomainError;

    /// Accepts `Approve` as well as `approve`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "submit" => Ok(Transition::Submit),
            "approve" => Ok(Transition::Approve),
            "reject" => Ok(Transition::Reject),
            "complete" => Ok(Transition::Complete),
            _ => Err(DomainError::validation(format!("unknown transition '{s}'"))),
        }
    }
}

/// Who did something, and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamp {
    pub by: PrincipalId,
    pub at: DateTime<Utc>,
}

/// Aggregate root: a sale or purchase order moving through the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    id: DocumentId,
    kind: DocumentKind,
    status: DocumentStatus,
    payment_status: PaymentStatus,
    created: Option<Stamp>,
    submitted: Option<Stamp>,
    approved: Option<Stamp>,
    rejected: Option<Stamp>,
    rejected_reason: Option<String>,
    completed: Option<Stamp>,
    version: u64,
}

impl Document {
    /// A not-yet-created instance, the starting point for `CreateDocument`.
    pub fn empty(id: DocumentId, kind: DocumentKind) -> Self {
        Self {
            id,
            kind,
            status: DocumentStatus::Draft,
            payment_status: PaymentStatus::Unpaid,
            created: None,
            submitted: None,
            approved: None,
            rejected: None,
            rejected_reason: None,
            completed: None,
            version: 0,
        }
    }

    pub fn id_typed(&self) -> DocumentId {
        self.id
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn status(&self) -> DocumentStatus {
        self.status
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn exists(&self) -> bool {
        self.created.is_some()
    }

    pub fn created(&self) -> Option<Stamp> {
        self.created
    }

    pub fn submitted(&self) -> Option<Stamp> {
        self.submitted
    }

    pub fn approved(&self) -> Option<Stamp> {
        self.approved
    }

    pub fn rejected(&self) -> Option<Stamp> {
        self.rejected
    }

    pub fn rejected_reason(&self) -> Option<&str> {
        self.rejected_reason.as_deref()
    }

    pub fn completed(&self) -> Option<Stamp> {
        self.completed
    }

    /// Latest creation or transition time.
    pub fn last_activity_at(&self) -> Option<DateTime<Utc>> {
        [
            self.created,
            self.submitted,
            self.approved,
            self.rejected,
            self.completed,
        ]
        .into_iter()
        .flatten()
        .map(|stamp| stamp.at)
        .max()
    }

    /// Whether `command` is acceptable in the current status, without
    /// validating its payload. [`Aggregate::handle`] runs the same check.
    pub fn guard(&self, command: &DocumentCommand) -> Result<(), WorkflowError> {
        match command {
            DocumentCommand::Create(cmd) => self.guard_create(cmd),
            DocumentCommand::Transition(cmd) => self.guard_transition(cmd.transition),
            DocumentCommand::UpdatePaymentStatus(_) => self.guard_payment(),
        }
    }
}

impl AggregateRoot for Document {
    type Id = DocumentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateDocument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDocument {
    pub document_id: DocumentId,
    pub kind: DocumentKind,
    pub actor: PrincipalId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApplyTransition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyTransition {
    pub transition: Transition,
    pub actor: PrincipalId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdatePaymentStatus (only outside `draft`/`rejected`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePaymentStatus {
    pub status: PaymentStatus,
    pub actor: PrincipalId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentCommand {
    Create(CreateDocument),
    Transition(ApplyTransition),
    UpdatePaymentStatus(UpdatePaymentStatus),
}

impl DocumentCommand {
    /// Capability the actor must hold for this command on a document of `kind`.
    pub fn required_capability(&self, kind: DocumentKind) -> Option<Capability> {
        match self {
            DocumentCommand::Create(_) => Some(Capability::new(kind.module(), Action::Create)),
            DocumentCommand::Transition(cmd) => cmd.transition.required_capability(kind),
            DocumentCommand::UpdatePaymentStatus(_) => {
                Some(Capability::new(kind.module(), Action::Update))
            }
        }
    }

    pub fn actor(&self) -> PrincipalId {
        match self {
            DocumentCommand::Create(cmd) => cmd.actor,
            DocumentCommand::Transition(cmd) => cmd.actor,
            DocumentCommand::UpdatePaymentStatus(cmd) => cmd.actor,
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DocumentCommand::Create(cmd) => cmd.occurred_at,
            DocumentCommand::Transition(cmd) => cmd.occurred_at,
            DocumentCommand::UpdatePaymentStatus(cmd) => cmd.occurred_at,
        }
    }
}

/// Event: DocumentCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentCreated {
    pub document_id: DocumentId,
    pub kind: DocumentKind,
    pub actor: PrincipalId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DocumentTransitioned. One per status move; becomes a `TransitionRecord`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTransitioned {
    pub document_id: DocumentId,
    pub transition: Transition,
    pub from: DocumentStatus,
    pub to: DocumentStatus,
    pub actor: PrincipalId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentStatusUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusUpdated {
    pub document_id: DocumentId,
    pub from: PaymentStatus,
    pub to: PaymentStatus,
    pub actor: PrincipalId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentEvent {
    Created(DocumentCreated),
    Transitioned(DocumentTransitioned),
    PaymentStatusUpdated(PaymentStatusUpdated),
}

impl DocumentEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            DocumentEvent::Created(_) => "workflow.document.created",
            DocumentEvent::Transitioned(_) => "workflow.document.transitioned",
            DocumentEvent::PaymentStatusUpdated(_) => "workflow.document.payment_status_updated",
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DocumentEvent::Created(e) => e.occurred_at,
            DocumentEvent::Transitioned(e) => e.occurred_at,
            DocumentEvent::PaymentStatusUpdated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Document {
    type Command = DocumentCommand;
    type Event = DocumentEvent;
    type Error = WorkflowError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            DocumentEvent::Created(e) => {
                self.id = e.document_id;
                self.kind = e.kind;
                self.status = DocumentStatus::Draft;
                self.payment_status = PaymentStatus::Unpaid;
                self.created = Some(Stamp {
                    by: e.actor,
                    at: e.occurred_at,
                });
            }
            DocumentEvent::Transitioned(e) => {
                let stamp = Some(Stamp {
                    by: e.actor,
                    at: e.occurred_at,
                });
                match e.transition {
                    Transition::Submit => self.submitted = stamp,
                    Transition::Approve => self.approved = stamp,
                    Transition::Reject => {
                        self.rejected = stamp;
                        self.rejected_reason = e.reason.clone();
                    }
                    Transition::Complete => self.completed = stamp,
                }
                self.status = e.to;
            }
            DocumentEvent::PaymentStatusUpdated(e) => {
                self.payment_status = e.to;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            DocumentCommand::Create(cmd) => self.handle_create(cmd),
            DocumentCommand::Transition(cmd) => self.handle_transition(cmd),
            DocumentCommand::UpdatePaymentStatus(cmd) => self.handle_payment(cmd),
        }
    }
}

impl Document {
    fn ensure_exists(&self) -> Result<(), WorkflowError> {
        if self.exists() {
            Ok(())
        } else {
            Err(WorkflowError::NotFound(self.id))
        }
    }

    fn guard_create(&self, cmd: &CreateDocument) -> Result<(), WorkflowError> {
        if self.exists() {
            return Err(WorkflowError::AlreadyExists(self.id));
        }
        if cmd.document_id != self.id {
            return Err(WorkflowError::Validation("document_id mismatch".to_string()));
        }
        Ok(())
    }

    fn guard_transition(&self, transition: Transition) -> Result<(), WorkflowError> {
        self.ensure_exists()?;
        if transition.is_allowed_from(self.status) {
            Ok(())
        } else {
            Err(WorkflowError::InvalidTransition {
                transition: transition.as_str().to_string(),
                status: self.status,
            })
        }
    }

    fn guard_payment(&self) -> Result<(), WorkflowError> {
        self.ensure_exists()?;
        if self.status.locks_payment() {
            return Err(WorkflowError::InvalidTransition {
                transition: "update_payment_status".to_string(),
                status: self.status,
            });
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateDocument) -> Result<Vec<DocumentEvent>, WorkflowError> {
        self.guard_create(cmd)?;

        Ok(vec![DocumentEvent::Created(DocumentCreated {
            document_id: cmd.document_id,
            kind: cmd.kind,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_transition(&self, cmd: &ApplyTransition) -> Result<Vec<DocumentEvent>, WorkflowError> {
        self.guard_transition(cmd.transition)?;
        let reason = normalize_reason(cmd.reason.as_deref())?;

        Ok(vec![DocumentEvent::Transitioned(DocumentTransitioned {
            document_id: self.id,
            transition: cmd.transition,
            from: self.status,
            to: cmd.transition.target(),
            actor: cmd.actor,
            reason,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_payment(&self, cmd: &UpdatePaymentStatus) -> Result<Vec<DocumentEvent>, WorkflowError> {
        self.guard_payment()?;

        Ok(vec![DocumentEvent::PaymentStatusUpdated(PaymentStatusUpdated {
            document_id: self.id,
            from: self.payment_status,
            to: cmd.status,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }
}

fn normalize_reason(reason: Option<&str>) -> Result<Option<String>, WorkflowError> {
    let Some(reason) = reason.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(None);
    };
    if reason.chars().count() > MAX_REASON_LEN {
        return Err(WorkflowError::Validation(format!(
            "reason must be at most {MAX_REASON_LEN} characters"
        )));
    }
    Ok(Some(reason.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn created(kind: DocumentKind) -> Document {
        let id = DocumentId::new();
        let mut doc = Document::empty(id, kind);
        let events = doc
            .handle(&DocumentCommand::Create(CreateDocument {
                document_id: id,
                kind,
                actor: PrincipalId::new(),
                occurred_at: now(),
            }))
            .unwrap();
        for e in &events {
            doc.apply(e);
        }
        doc
    }

    fn transition(doc: &Document, t: Transition, reason: Option<&str>) -> Result<Vec<DocumentEvent>, WorkflowError> {
        doc.handle(&DocumentCommand::Transition(ApplyTransition {
            transition: t,
            actor: PrincipalId::new(),
            reason: reason.map(str::to_string),
            occurred_at: now(),
        }))
    }

    fn run(doc: &mut Document, t: Transition) {
        let events = transition(doc, t, None).unwrap();
        for e in &events {
            doc.apply(e);
        }
    }

    #[test]
    fn create_starts_in_draft_and_unpaid() {
        let doc = created(DocumentKind::Sale);
        assert_eq!(doc.status(), DocumentStatus::Draft);
        assert_eq!(doc.payment_status(), PaymentStatus::Unpaid);
        assert!(doc.created().is_some());
        assert_eq!(doc.version(), 1);
    }

    #[test]
    fn creating_twice_is_rejected() {
        let doc = created(DocumentKind::Sale);
        let err = doc
            .handle(&DocumentCommand::Create(CreateDocument {
                document_id: doc.id_typed(),
                kind: DocumentKind::Sale,
                actor: PrincipalId::new(),
                occurred_at: now(),
            }))
            .unwrap_err();
        assert_eq!(err, WorkflowError::AlreadyExists(doc.id_typed()));
    }

    #[test]
    fn transitions_on_missing_document_are_not_found() {
        let doc = Document::empty(DocumentId::new(), DocumentKind::Sale);
        let err = transition(&doc, Transition::Submit, None).unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound(_)));
    }

    #[test]
    fn approving_a_draft_is_an_invalid_transition() {
        let doc = created(DocumentKind::Sale);
        let err = transition(&doc, Transition::Approve, None).unwrap_err();
        assert_eq!(
            err,
            WorkflowError::InvalidTransition {
                transition: "approve".to_string(),
                status: DocumentStatus::Draft,
            }
        );
    }

    #[test]
    fn happy_path_stamps_every_step() {
        let mut doc = created(DocumentKind::PurchaseOrder);
        run(&mut doc, Transition::Submit);
        run(&mut doc, Transition::Approve);
        run(&mut doc, Transition::Complete);
        assert_eq!(doc.status(), DocumentStatus::Completed);
        assert!(doc.submitted().is_some());
        assert!(doc.approved().is_some());
        assert!(doc.completed().is_some());
        assert!(doc.rejected().is_none());
        assert_eq!(doc.version(), 4);
    }

    #[test]
    fn reject_stores_trimmed_reason() {
        let mut doc = created(DocumentKind::Sale);
        run(&mut doc, Transition::Submit);
        let events = transition(&doc, Transition::Reject, Some("  over budget ")).unwrap();
        doc.apply(&events[0]);
        assert_eq!(doc.status(), DocumentStatus::Rejected);
        assert_eq!(doc.rejected_reason(), Some("over budget"));
    }

    #[test]
    fn overlong_reason_is_a_validation_error() {
        let doc = created(DocumentKind::Sale);
        let reason = "x".repeat(MAX_REASON_LEN + 1);
        let err = transition(&doc, Transition::Reject, Some(&reason)).unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
    }

    #[test]
    fn payment_status_is_locked_in_draft_and_rejected() {
        let pay = |doc: &Document| {
            doc.handle(&DocumentCommand::UpdatePaymentStatus(UpdatePaymentStatus {
                status: PaymentStatus::Paid,
                actor: PrincipalId::new(),
                occurred_at: now(),
            }))
        };

        let mut doc = created(DocumentKind::Sale);
        assert!(matches!(
            pay(&doc),
            Err(WorkflowError::InvalidTransition { status: DocumentStatus::Draft, .. })
        ));

        run(&mut doc, Transition::Submit);
        let events = pay(&doc).unwrap();
        doc.apply(&events[0]);
        assert_eq!(doc.payment_status(), PaymentStatus::Paid);
        assert_eq!(doc.status(), DocumentStatus::Submitted);

        run(&mut doc, Transition::Reject);
        assert!(pay(&doc).is_err());
    }

    #[test]
    fn overtaken_moves_name_the_status_they_lost() {
        use DocumentStatus::*;
        assert_eq!(Transition::Approve.overtaken_from(Draft), None);
        assert_eq!(Transition::Approve.overtaken_from(Submitted), None);
        assert_eq!(Transition::Approve.overtaken_from(Approved), Some(Submitted));
        assert_eq!(Transition::Approve.overtaken_from(Rejected), Some(Submitted));
        assert_eq!(Transition::Approve.overtaken_from(Completed), Some(Submitted));
        assert_eq!(Transition::Complete.overtaken_from(Rejected), None);
        assert_eq!(Transition::Complete.overtaken_from(Submitted), None);
        assert_eq!(Transition::Reject.overtaken_from(Approved), Some(Draft));
        assert!(Draft.precedes(Completed));
        assert!(!Rejected.precedes(Approved));
        assert!(!Submitted.precedes(Submitted));
    }

    #[test]
    fn guard_checks_status_but_not_the_reason() {
        let doc = created(DocumentKind::Sale);
        let reason = "x".repeat(MAX_REASON_LEN + 1);
        let reject = DocumentCommand::Transition(ApplyTransition {
            transition: Transition::Reject,
            actor: PrincipalId::new(),
            reason: Some(reason),
            occurred_at: now(),
        });
        assert_eq!(doc.guard(&reject), Ok(()));
        assert!(matches!(doc.handle(&reject), Err(WorkflowError::Validation(_))));

        let approve = DocumentCommand::Transition(ApplyTransition {
            transition: Transition::Approve,
            actor: PrincipalId::new(),
            reason: None,
            occurred_at: now(),
        });
        assert!(matches!(
            doc.guard(&approve),
            Err(WorkflowError::InvalidTransition { status: DocumentStatus::Draft, .. })
        ));
    }

    #[test]
    fn last_activity_tracks_the_latest_stamp() {
        let mut doc = created(DocumentKind::Sale);
        let created_at = doc.created().map(|s| s.at);
        assert_eq!(doc.last_activity_at(), created_at);
        run(&mut doc, Transition::Submit);
        assert_eq!(doc.last_activity_at(), doc.submitted().map(|s| s.at));
    }

    #[test]
    fn capabilities_follow_document_kind() {
        let cmd = DocumentCommand::Transition(ApplyTransition {
            transition: Transition::Approve,
            actor: PrincipalId::new(),
            reason: None,
            occurred_at: now(),
        });
        assert_eq!(
            cmd.required_capability(DocumentKind::PurchaseOrder),
            Some(Capability::new(grantflow_auth::Module::Purchases, Action::Approve))
        );
        assert_eq!(Transition::Submit.required_capability(DocumentKind::Sale), None);
    }

    #[test]
    fn statuses_are_value_objects() {
        fn same<T: ValueObject>(a: T, b: T) -> bool {
            a == b
        }
        assert!(same(PaymentStatus::Paid, "PAID".parse().unwrap()));
        assert!(same(DocumentStatus::Approved, "approved".parse().unwrap()));
    }

    #[test]
    fn document_serializes_with_lowercase_statuses() {
        let doc = created(DocumentKind::Sale);
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["status"], "draft");
        assert_eq!(json["payment_status"], "unpaid");
        assert_eq!(json["kind"], "sale");
    }

    fn arb_transition() -> impl Strategy<Value = Transition> {
        proptest::sample::select(Transition::ALL.to_vec())
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

        #[test]
        fn random_sequences_respect_the_state_machine(
            steps in proptest::collection::vec(arb_transition(), 0..12)
        ) {
            let mut doc = created(DocumentKind::Sale);
            for t in steps {
                let before = doc.clone();
                match transition(&doc, t, None) {
                    Ok(events) => {
                        prop_assert!(!before.status().is_terminal());
                        prop_assert!(t.is_allowed_from(before.status()));
                        for e in &events {
                            doc.apply(e);
                        }
                        prop_assert_eq!(doc.status(), t.target());
                        prop_assert_eq!(doc.version(), before.version() + 1);
                    }
                    Err(err) => {
                        let is_invalid_transition = matches!(err, WorkflowError::InvalidTransition { .. });
                        prop_assert!(is_invalid_transition);
                        prop_assert_eq!(&doc, &before);
                    }
                }
            }
        }

        #[test]
        fn terminal_documents_accept_no_transition(t in arb_transition(), reject in any::<bool>()) {
            let mut doc = created(DocumentKind::PurchaseOrder);
            if reject {
                run(&mut doc, Transition::Reject);
            } else {
                run(&mut doc, Transition::Submit);
                run(&mut doc, Transition::Approve);
                run(&mut doc, Transition::Complete);
            }
            prop_assert!(doc.status().is_terminal());
            prop_assert!(transition(&doc, t, None).is_err());
        }
    }
}

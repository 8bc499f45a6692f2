use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use grantflow_core::{DocumentId, PrincipalId};

use crate::document::{DocumentStatus, DocumentTransitioned, Transition};
use crate::kind::DocumentKind;

/// Immutable record of one status move.
///
/// `sequence` is the document version the move produced, so records of one
/// document are totally ordered even when timestamps collide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub document_id: DocumentId,
    pub kind: DocumentKind,
    pub transition: Transition,
    pub from_status: DocumentStatus,
    pub to_status: DocumentStatus,
    pub actor: PrincipalId,
    pub timestamp: DateTime<Utc>,
    pub reason: Option<String>,
    pub sequence: u64,
}

impl TransitionRecord {
    pub fn from_event(kind: DocumentKind, event: &DocumentTransitioned, sequence: u64) -> Self {
        Self {
            document_id: event.document_id,
            kind,
            transition: event.transition,
            from_status: event.from,
            to_status: event.to,
            actor: event.actor,
            timestamp: event.occurred_at,
            reason: event.reason.clone(),
            sequence,
        }
    }
}

use std::sync::Arc;

use grantflow_core::{DocumentId, ExpectedVersion};
use grantflow_workflow::{Document, TransitionRecord};

use crate::error::StoreError;

pub trait DocumentStore: Send + Sync {
    /// Store a newly created document. Fails if the id is taken.
    fn insert(&self, document: Document) -> Result<(), StoreError>;

    fn load(&self, document_id: DocumentId) -> Result<Option<Document>, StoreError>;

    /// Replace the stored document if it is still at `expected`, appending
    /// `record` to its trail in the same step.
    ///
    /// Either both land or neither does.
    fn commit(
        &self,
        document: Document,
        expected: ExpectedVersion,
        record: Option<TransitionRecord>,
    ) -> Result<(), StoreError>;
}

/// Append-only list of transition records per document.
///
/// There is no update or delete.
pub trait AuditTrail: Send + Sync {
    fn append(&self, record: TransitionRecord) -> Result<(), StoreError>;

    /// Records of one document in commit order (ascending `sequence`).
    fn list_for(&self, document_id: DocumentId) -> Result<Vec<TransitionRecord>, StoreError>;
}

impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    fn insert(&self, document: Document) -> Result<(), StoreError> {
        (**self).insert(document)
    }

    fn load(&self, document_id: DocumentId) -> Result<Option<Document>, StoreError> {
        (**self).load(document_id)
    }

    fn commit(
        &self,
        document: Document,
        expected: ExpectedVersion,
        record: Option<TransitionRecord>,
    ) -> Result<(), StoreError> {
        (**self).commit(document, expected, record)
    }
}

impl<S> AuditTrail for Arc<S>
where
    S: AuditTrail + ?Sized,
{
    fn append(&self, record: TransitionRecord) -> Result<(), StoreError> {
        (**self).append(record)
    }

    fn list_for(&self, document_id: DocumentId) -> Result<Vec<TransitionRecord>, StoreError> {
        (**self).list_for(document_id)
    }
}

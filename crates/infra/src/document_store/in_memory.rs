use std::collections::HashMap;
use std::sync::RwLock;

use grantflow_core::{AggregateRoot, DocumentId, ExpectedVersion};
use grantflow_workflow::{Document, TransitionRecord};

use super::r#trait::{AuditTrail, DocumentStore};
use crate::error::StoreError;

#[derive(Debug, Default)]
struct Inner {
    documents: HashMap<DocumentId, Document>,
    trail: HashMap<DocumentId, Vec<TransitionRecord>>,
}

/// In-memory document store and audit trail behind a single lock, so a status
/// change and its record are committed together.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    inner: RwLock<Inner>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn insert(&self, document: Document) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::poisoned())?;
        let id = document.id_typed();
        if inner.documents.contains_key(&id) {
            return Err(StoreError::AlreadyExists(format!("document {id}")));
        }
        inner.documents.insert(id, document);
        Ok(())
    }

    fn load(&self, document_id: DocumentId) -> Result<Option<Document>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(inner.documents.get(&document_id).cloned())
    }

    fn commit(
        &self,
        document: Document,
        expected: ExpectedVersion,
        record: Option<TransitionRecord>,
    ) -> Result<(), StoreError> {
        let id = document.id_typed();
        if let Some(record) = &record {
            if record.document_id != id {
                return Err(StoreError::Invalid(format!(
                    "record for {} committed with document {id}",
                    record.document_id
                )));
            }
        }

        let mut inner = self.inner.write().map_err(|_| StoreError::poisoned())?;
        let current = inner
            .documents
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(format!("document {id}")))?
            .version();

        if !expected.matches(current) {
            return Err(StoreError::Concurrency {
                expected,
                actual: current,
            });
        }

        inner.documents.insert(id, document);
        if let Some(record) = record {
            inner.trail.entry(id).or_default().push(record);
        }
        Ok(())
    }
}

impl AuditTrail for InMemoryDocumentStore {
    fn append(&self, record: TransitionRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::poisoned())?;
        inner.trail.entry(record.document_id).or_default().push(record);
        Ok(())
    }

    fn list_for(&self, document_id: DocumentId) -> Result<Vec<TransitionRecord>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::poisoned())?;
        let mut records = inner.trail.get(&document_id).cloned().unwrap_or_default();
        records.sort_by_key(|r| r.sequence);
        Ok(records)
    }
}

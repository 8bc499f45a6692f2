use std::sync::Arc;

use chrono::Duration;
use serde_json::Value as JsonValue;
use tracing::info;

use grantflow_auth::{Action, GrantError, Principal, PrincipalId, Role};
use grantflow_infra::{
    document_store::InMemoryDocumentStore,
    gate::AuthorizationGate,
    grant_editor::GrantEditor,
    grant_store::InMemoryGrantStore,
    imports::{
        ImportFile, ImportJobId, ImportJobTracker, ImportProgress, ImportRunner,
        InMemoryImportTracker, JobError, RowHandler, authorize_import,
    },
    workflow_engine::WorkflowEngine,
};

pub type Grants = Arc<InMemoryGrantStore>;
pub type Documents = Arc<InMemoryDocumentStore>;

/// Everything a handler needs, shared behind one `Arc`.
pub struct AppServices {
    pub editor: GrantEditor<Grants>,
    pub engine: WorkflowEngine<Grants, Documents>,
    pub imports: Arc<InMemoryImportTracker>,
    import_runner: ImportRunner,
}

impl AppServices {
    pub fn in_memory(pending_ttl: Duration) -> Self {
        let grants: Grants = Arc::new(InMemoryGrantStore::new());
        let documents: Documents = Arc::new(InMemoryDocumentStore::new());

        Self {
            editor: GrantEditor::new(grants.clone(), pending_ttl),
            engine: WorkflowEngine::new(AuthorizationGate::new(grants), documents),
            imports: Arc::new(InMemoryImportTracker::new()),
            import_runner: ImportRunner::default(),
        }
    }

    /// Seed the first owner with every applicable grant.
    pub fn bootstrap_owner(&self, id: PrincipalId) -> Result<(), GrantError> {
        self.editor.bootstrap(Principal::new(id, Role::Owner))?;
        info!(principal_id = %id, "bootstrap owner ready");
        Ok(())
    }

    /// Register the job and start processing its rows in the background.
    /// Requires `<module>:create`.
    pub fn start_import(&self, actor: PrincipalId, file: ImportFile) -> Result<ImportJobId, JobError> {
        authorize_import(self.engine.gate(), actor, file.module, Action::Create)?;
        let id = self.imports.create_job(&file)?;
        let handler: Arc<dyn RowHandler> = Arc::new(accept_object_rows);
        self.import_runner
            .clone()
            .spawn(self.imports.clone(), id, file.rows, handler);
        Ok(id)
    }

    /// Requires `<module>:read` on the job's module.
    pub fn import_status(&self, actor: PrincipalId, id: ImportJobId) -> Result<ImportProgress, JobError> {
        let progress = self.imports.get_status(id)?;
        authorize_import(self.engine.gate(), actor, progress.module, Action::Read)?;
        Ok(progress)
    }
}

fn accept_object_rows(_index: u64, row: &JsonValue) -> Result<(), String> {
    match row {
        JsonValue::Object(fields) if !fields.is_empty() => Ok(()),
        JsonValue::Object(_) => Err("row has no fields".to_string()),
        _ => Err("row must be a JSON object".to_string()),
    }
}

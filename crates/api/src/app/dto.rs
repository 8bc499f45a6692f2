use serde::Deserialize;
use serde_json::{Value as JsonValue, json};

use grantflow_auth::{
    Action, Capability, Decision, GrantSnapshot, Module, PendingChange, Principal, PrincipalId,
    ProposedChange, Role,
};
use grantflow_core::{DocumentId, ImportJobId, PendingChangeId};
use grantflow_workflow::{DocumentKind, DocumentStatus, PaymentStatus};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreatePrincipalRequest {
    pub role: String,
}

/// One matrix cell (`action` set) or a whole-module toggle (`action` absent).
#[derive(Debug, Deserialize)]
pub struct GrantChangeRequest {
    pub module: String,
    pub action: Option<String>,
    pub value: bool,
}

#[derive(Debug, Deserialize)]
pub struct PendingChangeRequest {
    pub pending_change_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateDocumentRequest {
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub name: String,
    pub reason: Option<String>,
    pub expected_status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateImportRequest {
    pub module: String,
    pub file_name: String,
    #[serde(default)]
    pub rows: Vec<JsonValue>,
}

// -------------------------
// Parsing helpers
// -------------------------

pub fn parse_principal_id(raw: &str) -> Result<PrincipalId, axum::response::Response> {
    raw.parse().map_err(errors::domain_error_to_response)
}

pub fn parse_document_id(raw: &str) -> Result<DocumentId, axum::response::Response> {
    raw.parse().map_err(errors::domain_error_to_response)
}

pub fn parse_pending_change_id(raw: &str) -> Result<PendingChangeId, axum::response::Response> {
    raw.parse().map_err(errors::domain_error_to_response)
}

pub fn parse_import_job_id(raw: &str) -> Result<ImportJobId, axum::response::Response> {
    raw.parse().map_err(errors::domain_error_to_response)
}

pub fn parse_module(raw: &str) -> Result<Module, axum::response::Response> {
    raw.parse().map_err(errors::domain_error_to_response)
}

pub fn parse_role(raw: &str) -> Result<Role, axum::response::Response> {
    raw.parse().map_err(errors::domain_error_to_response)
}

pub fn parse_kind(raw: &str) -> Result<DocumentKind, axum::response::Response> {
    raw.parse().map_err(errors::domain_error_to_response)
}

pub fn parse_capability(module: &str, action: &str) -> Result<Capability, axum::response::Response> {
    let module: Module = module.parse().map_err(errors::domain_error_to_response)?;
    let action: Action = action.parse().map_err(errors::domain_error_to_response)?;
    Ok(Capability::new(module, action))
}

pub fn parse_document_status(raw: &str) -> Result<DocumentStatus, axum::response::Response> {
    raw.parse().map_err(errors::domain_error_to_response)
}

pub fn parse_payment_status(raw: &str) -> Result<PaymentStatus, axum::response::Response> {
    raw.parse().map_err(errors::domain_error_to_response)
}

impl GrantChangeRequest {
    pub fn to_proposed(&self) -> Result<ProposedChange, axum::response::Response> {
        let module: Module = self.module.parse().map_err(errors::domain_error_to_response)?;
        Ok(match &self.action {
            Some(action) => ProposedChange::Action {
                module,
                action: action.parse().map_err(errors::domain_error_to_response)?,
                value: self.value,
            },
            None => ProposedChange::Module {
                module,
                enabled: self.value,
            },
        })
    }
}

// -------------------------
// Response mapping
// -------------------------

pub fn principal_to_json(principal: Principal) -> JsonValue {
    json!({
        "id": principal.id,
        "role": principal.role,
    })
}

/// The matrix as an editor renders it: one row per module, only applicable
/// actions, and whether the whole row is on.
pub fn grant_matrix_to_json(snapshot: &GrantSnapshot) -> JsonValue {
    let modules: Vec<JsonValue> = Module::ALL
        .iter()
        .map(|module| {
            let actions: serde_json::Map<String, JsonValue> = module
                .applicable_actions()
                .into_iter()
                .map(|action| {
                    let granted = snapshot.grants.get(Capability::new(*module, action));
                    (action.as_str().to_string(), JsonValue::Bool(granted))
                })
                .collect();
            json!({
                "module": module.as_str(),
                "label": module.label(),
                "fully_enabled": snapshot.grants.is_module_fully_enabled(*module),
                "actions": actions,
            })
        })
        .collect();

    json!({
        "principal_id": snapshot.principal_id,
        "version": snapshot.version,
        "modules": modules,
    })
}

pub fn applied_decision_to_json(decision: &Decision, snapshot: &GrantSnapshot) -> JsonValue {
    let extra: Vec<String> = match decision {
        Decision::AutoApply { extra, .. } => extra.iter().map(|c| c.to_string()).collect(),
        _ => Vec::new(),
    };
    json!({
        "decision": decision.as_str(),
        "extra": extra,
        "grants": grant_matrix_to_json(snapshot),
    })
}

pub fn pending_change_to_json(pending: &PendingChange) -> JsonValue {
    json!({
        "decision": "needs_confirmation",
        "pending_change_id": pending.id,
        "principal_id": pending.principal_id,
        "module": pending.module,
        "action": pending.action,
        "value": pending.new_value,
        "source": pending.source,
        "missing": pending.missing,
        "observed_version": pending.observed_version,
    })
}

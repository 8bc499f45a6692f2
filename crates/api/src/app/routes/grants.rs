use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use grantflow_auth::GrantError;
use grantflow_infra::grant_editor::Proposal;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/:principal", get(get_grants).put(propose_change))
        .route("/:principal/confirm", post(confirm_change))
        .route("/:principal/cancel", post(cancel_change))
        .route("/:principal/can/:module/:action", get(check_capability))
}

pub async fn get_grants(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(target): Path<String>,
) -> axum::response::Response {
    let target = match dto::parse_principal_id(&target) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.editor.grants(principal.principal_id(), target) {
        Ok(snapshot) => Json(dto::grant_matrix_to_json(&snapshot)).into_response(),
        Err(e) => errors::grant_error_to_response(e),
    }
}

/// Apply a cell or module-toggle change.
///
/// `200` with the committed matrix, or `202` with the staged change when
/// dependencies are missing. Nothing is written in the `202` case.
pub async fn propose_change(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(target): Path<String>,
    Json(body): Json<dto::GrantChangeRequest>,
) -> axum::response::Response {
    let target = match dto::parse_principal_id(&target) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let change = match body.to_proposed() {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    match services.editor.propose(principal.principal_id(), target, change) {
        Ok(Proposal::Applied { decision, snapshot }) => {
            Json(dto::applied_decision_to_json(&decision, &snapshot)).into_response()
        }
        Ok(Proposal::Pending(pending)) => {
            (StatusCode::ACCEPTED, Json(dto::pending_change_to_json(&pending))).into_response()
        }
        Err(e) => errors::grant_error_to_response(e),
    }
}

pub async fn confirm_change(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(target): Path<String>,
    Json(body): Json<dto::PendingChangeRequest>,
) -> axum::response::Response {
    let target = match dto::parse_principal_id(&target) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let pending_change_id = match dto::parse_pending_change_id(&body.pending_change_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .editor
        .confirm(principal.principal_id(), target, pending_change_id)
    {
        Ok(snapshot) => Json(dto::grant_matrix_to_json(&snapshot)).into_response(),
        Err(e) => errors::grant_error_to_response(e),
    }
}

pub async fn cancel_change(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(target): Path<String>,
    Json(body): Json<dto::PendingChangeRequest>,
) -> axum::response::Response {
    let target = match dto::parse_principal_id(&target) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let pending_change_id = match dto::parse_pending_change_id(&body.pending_change_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .editor
        .cancel(principal.principal_id(), target, pending_change_id)
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::grant_error_to_response(e),
    }
}

/// `{granted, explanation}` for one capability of `principal`.
///
/// Reading someone else's answer needs the same authority as reading their
/// grants.
pub async fn check_capability(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((target, module, action)): Path<(String, String, String)>,
) -> axum::response::Response {
    let target = match dto::parse_principal_id(&target) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let capability = match dto::parse_capability(&module, &action) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    if let Err(e) = services.editor.grants(principal.principal_id(), target) {
        return errors::grant_error_to_response(e);
    }

    match services.engine.gate().explain(target, capability) {
        Ok(explanation) => Json(serde_json::json!({
            "granted": explanation.granted,
            "explanation": explanation,
        }))
        .into_response(),
        Err(e) => errors::grant_error_to_response(GrantError::from(e)),
    }
}

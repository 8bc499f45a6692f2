use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_document))
        .route("/:id", get(get_document))
        .route("/:id/history", get(document_history))
        .route("/:id/transition", post(transition_document))
        .route("/:id/payment-status", put(update_payment_status))
}

pub async fn create_document(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateDocumentRequest>,
) -> axum::response::Response {
    let kind = match dto::parse_kind(&body.kind) {
        Ok(k) => k,
        Err(resp) => return resp,
    };

    match services.engine.create_document(principal.principal_id(), kind) {
        Ok(document) => (StatusCode::CREATED, Json(document)).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn get_document(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match dto::parse_document_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.engine.get(principal.principal_id(), id) {
        Ok(document) => Json(document).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn document_history(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match dto::parse_document_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.engine.history(principal.principal_id(), id) {
        Ok(records) => Json(records).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

/// Submit, approve, reject or complete. The acting principal is the token's
/// subject, never a body field.
pub async fn transition_document(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::TransitionRequest>,
) -> axum::response::Response {
    let id = match dto::parse_document_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let expected_status = match body.expected_status.as_deref().map(dto::parse_document_status) {
        Some(Ok(s)) => Some(s),
        Some(Err(resp)) => return resp,
        None => None,
    };

    match services.engine.attempt(
        principal.principal_id(),
        id,
        &body.name,
        body.reason,
        expected_status,
    ) {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn update_payment_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::PaymentStatusRequest>,
) -> axum::response::Response {
    let id = match dto::parse_document_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let status = match dto::parse_payment_status(&body.status) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match services
        .engine
        .update_payment_status(principal.principal_id(), id, status)
    {
        Ok(document) => Json(document).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

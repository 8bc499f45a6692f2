use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post},
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(provision_principal))
        .route("/:id", delete(remove_principal))
}

/// Create a principal with an all-false grant matrix.
pub async fn provision_principal(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreatePrincipalRequest>,
) -> axum::response::Response {
    let role = match dto::parse_role(&body.role) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match services.editor.provision(principal.principal_id(), role) {
        Ok((created, snapshot)) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "principal": dto::principal_to_json(created),
                "grants": dto::grant_matrix_to_json(&snapshot),
            })),
        )
            .into_response(),
        Err(e) => errors::grant_error_to_response(e),
    }
}

pub async fn remove_principal(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let target = match dto::parse_principal_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.editor.remove(principal.principal_id(), target) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::grant_error_to_response(e),
    }
}

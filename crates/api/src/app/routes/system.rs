use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use grantflow_auth::GrantError;
use grantflow_infra::grant_store::GrantStore;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// The caller's identity and role as the server sees it right now.
pub async fn whoami(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    let registered = match services.editor.store().principal(principal.principal_id()) {
        Ok(p) => p,
        Err(e) => return errors::grant_error_to_response(GrantError::from(e)),
    };

    Json(serde_json::json!({
        "principal_id": principal.principal_id(),
        "registered": registered.is_some(),
        "role": registered.map(|p| p.role),
        "token_expires_at": principal.expires_at(),
    }))
    .into_response()
}

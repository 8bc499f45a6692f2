use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tracing::info;

use grantflow_infra::imports::ImportFile;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_import))
        .route("/:id", get(get_import_status))
}

/// Register an import and process its rows in the background. Requires
/// `<module>:create`.
///
/// Returns `202` right away; poll `GET /imports/{id}` until the status is
/// `COMPLETED` or `FAILED`.
pub async fn create_import(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateImportRequest>,
) -> axum::response::Response {
    let module = match dto::parse_module(&body.module) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let file = ImportFile {
        module,
        file_name: body.file_name,
        rows: body.rows,
    };
    let total = file.rows.len();

    match services.start_import(principal.principal_id(), file) {
        Ok(job_id) => {
            info!(%job_id, %module, rows = total, principal_id = %principal.principal_id(), "import started");
            (
                StatusCode::ACCEPTED,
                Json(serde_json::json!({ "job_id": job_id, "total": total })),
            )
                .into_response()
        }
        Err(e) => errors::job_error_to_response(e),
    }
}

pub async fn get_import_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match dto::parse_import_job_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.import_status(principal.principal_id(), id) {
        Ok(progress) => Json(progress).into_response(),
        Err(e) => errors::job_error_to_response(e),
    }
}

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::{Value as JsonValue, json};

use grantflow_auth::GrantError;
use grantflow_core::{DomainError, ErrorKind};
use grantflow_infra::imports::JobError;
use grantflow_workflow::WorkflowError;

/// HTTP status for each error kind.
///
/// `dependency_required` is not a failure: the change was staged and waits for
/// a confirm or cancel, hence `202 Accepted`.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::InvalidTransition => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::DependencyRequired => StatusCode::ACCEPTED,
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn grant_error_to_response(err: GrantError) -> axum::response::Response {
    let details = match &err {
        GrantError::DependencyRequired {
            pending_change_id,
            missing,
        } => json!({
            "decision": "needs_confirmation",
            "pending_change_id": pending_change_id,
            "missing": missing,
        }),
        GrantError::Conflict {
            principal_id,
            expected,
            actual,
        } => json!({
            "principal_id": principal_id,
            "expected_version": expected,
            "actual_version": actual,
        }),
        GrantError::PrincipalNotFound(id) => json!({ "principal_id": id }),
        GrantError::PendingChangeNotFound(id) => json!({ "pending_change_id": id }),
        _ => JsonValue::Null,
    };
    kind_error(err.kind(), err.to_string(), details)
}

pub fn workflow_error_to_response(err: WorkflowError) -> axum::response::Response {
    let details = match &err {
        WorkflowError::InvalidTransition { transition, status } => {
            json!({ "transition": transition, "status": status })
        }
        WorkflowError::Forbidden { capability } => {
            json!({ "capability": capability.to_string() })
        }
        WorkflowError::StatusConflict {
            document_id,
            expected,
            actual,
        } => json!({
            "document_id": document_id,
            "expected_status": expected,
            "actual_status": actual,
        }),
        WorkflowError::VersionConflict {
            document_id,
            expected,
            actual,
        } => json!({
            "document_id": document_id,
            "expected_version": expected,
            "actual_version": actual,
        }),
        WorkflowError::NotFound(id) | WorkflowError::AlreadyExists(id) => {
            json!({ "document_id": id })
        }
        _ => JsonValue::Null,
    };
    kind_error(err.kind(), err.to_string(), details)
}

pub fn job_error_to_response(err: JobError) -> axum::response::Response {
    let details = match &err {
        JobError::NotFound(id) => json!({ "job_id": id }),
        JobError::Forbidden { capability } => json!({ "capability": capability.to_string() }),
        JobError::UnknownActor(id) => json!({ "principal_id": id }),
        JobError::Terminal { id, status } => json!({ "job_id": id, "status": status }),
        _ => JsonValue::Null,
    };
    kind_error(err.kind(), err.to_string(), details)
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    kind_error(err.kind(), err.to_string(), JsonValue::Null)
}

fn kind_error(kind: ErrorKind, message: String, details: JsonValue) -> axum::response::Response {
    json_error_with_details(status_for(kind), kind.as_str(), message, details)
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    json_error_with_details(status, code, message, JsonValue::Null)
}

pub fn json_error_with_details(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    details: JsonValue,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
            "details": details,
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_a_distinct_status() {
        let kinds = [
            ErrorKind::Forbidden,
            ErrorKind::InvalidTransition,
            ErrorKind::Conflict,
            ErrorKind::DependencyRequired,
            ErrorKind::Validation,
            ErrorKind::NotFound,
            ErrorKind::Storage,
        ];
        let mut statuses: Vec<u16> = kinds.iter().map(|k| status_for(*k).as_u16()).collect();
        statuses.sort_unstable();
        statuses.dedup();
        assert_eq!(statuses.len(), kinds.len());
        assert_eq!(status_for(ErrorKind::DependencyRequired), StatusCode::ACCEPTED);
    }
}

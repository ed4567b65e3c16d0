use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use medcamp_core::DomainError;
use medcamp_infra::{CatalogError, RepositoryError, ServiceError};

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Repository(e) => repository_error_to_response(e),
        ServiceError::Catalog(CatalogError::SupplierNotFound(id)) => json_error(
            StatusCode::NOT_FOUND,
            "supplier_not_found",
            format!("supplier {id} not found"),
        ),
        ServiceError::Catalog(e) => json_error(StatusCode::BAD_GATEWAY, "catalog_error", e.to_string()),
        ServiceError::EditInProgress(id) => json_error(
            StatusCode::CONFLICT,
            "edit_in_progress",
            format!("order {id} already has a transition in flight"),
        ),
        ServiceError::Publish(msg) => json_error(StatusCode::BAD_GATEWAY, "publish_error", msg),
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let (status, code) = match &err {
        DomainError::InvalidQuantity { .. } => (StatusCode::BAD_REQUEST, "invalid_quantity"),
        DomainError::QuantityExceedsRequested { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "quantity_exceeds_requested")
        }
        DomainError::EmptyOrder => (StatusCode::UNPROCESSABLE_ENTITY, "empty_order"),
        DomainError::NoReceivedQuantity => (StatusCode::UNPROCESSABLE_ENTITY, "no_received_quantity"),
        // Normally answered as a no-op before reaching here.
        DomainError::NoChanges => (StatusCode::OK, "no_changes"),
        DomainError::IllegalCancellation { .. } => (StatusCode::CONFLICT, "illegal_cancellation"),
        DomainError::IllegalTransition { .. } => (StatusCode::CONFLICT, "illegal_transition"),
        DomainError::ConfirmationRequired => (StatusCode::PRECONDITION_REQUIRED, "confirmation_required"),
        DomainError::UnknownLine(_) => (StatusCode::BAD_REQUEST, "unknown_line"),
        DomainError::DuplicateLine(_) => (StatusCode::BAD_REQUEST, "duplicate_line"),
        DomainError::MedicineNotSupplied { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "medicine_not_supplied"),
        DomainError::InvariantViolation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation"),
        DomainError::InvalidId(_) => (StatusCode::BAD_REQUEST, "invalid_id"),
        DomainError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
    };
    json_error_with_lines(status, code, err.to_string(), err.lines())
}

fn repository_error_to_response(err: RepositoryError) -> axum::response::Response {
    match err {
        RepositoryError::NotFound(id) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("order {id} not found"))
        }
        RepositoryError::Rejected { .. } => {
            json_error(StatusCode::BAD_GATEWAY, "repository_rejected", err.to_string())
        }
        RepositoryError::Transport(_) | RepositoryError::Decode(_) => {
            json_error(StatusCode::BAD_GATEWAY, "repository_failure", err.to_string())
        }
        RepositoryError::Poisoned => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "repository_failure", err.to_string())
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    json_error_with_lines(status, code, message, Vec::new())
}

/// `lines` names the line items to correct; empty when the error is not
/// about specific lines.
pub fn json_error_with_lines(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    lines: Vec<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
            "lines": lines,
        })),
    )
        .into_response()
}

/// Parse an id path segment or body field.
pub fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: core::str::FromStr<Err = DomainError>,
{
    raw.parse().map_err(domain_error_to_response)
}

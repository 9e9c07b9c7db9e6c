use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::{Value as JsonValue, json};

use storefront_core::DomainError;
use storefront_infra::CoordinatorError;

pub fn coordinator_error_to_response(err: CoordinatorError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        CoordinatorError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        CoordinatorError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        CoordinatorError::NotFound(what) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found"))
        }
        CoordinatorError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        CoordinatorError::InsufficientStock {
            item_id,
            requested,
            available,
        } => json_error_with_details(
            StatusCode::CONFLICT,
            "insufficient_stock",
            message,
            json!({
                "item_id": item_id,
                "requested": requested,
                "available": available,
            }),
        ),
        CoordinatorError::CapacityExceeded {
            kit_id,
            item_id,
            requested,
            available,
        } => json_error_with_details(
            StatusCode::CONFLICT,
            "capacity_exceeded",
            message,
            json!({
                "kit_id": kit_id,
                "item_id": item_id,
                "requested": requested,
                "available": available,
            }),
        ),
        CoordinatorError::Store(msg) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg),
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    coordinator_error_to_response(err.into())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
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

/// Parse a path or body id, answering 400 on garbage.
pub fn parse_id<T>(raw: &str, what: &'static str) -> Result<T, axum::response::Response>
where
    T: std::str::FromStr,
{
    raw.parse()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what} id")))
}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// HTTP-facing error, one variant per kind in the error taxonomy: invalid
/// argument, invalid state, not-found, already-picked, or internal. Maps
/// 1:1 onto `domain::errors::DomainError`; `ApiError::BadRequest` exists only
/// for request-body validation that never reaches the domain layer.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    InternalError(String),
    DomainError(domain::errors::DomainError),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<domain::errors::DomainError> for ApiError {
    fn from(err: domain::errors::DomainError) -> Self {
        ApiError::DomainError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            ApiError::DomainError(err) => {
                use domain::errors::DomainError;
                match err {
                    DomainError::NotFound(msg) | DomainError::SlotNotFound(msg) => {
                        (StatusCode::NOT_FOUND, msg)
                    }
                    DomainError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
                    DomainError::InvalidState(msg) | DomainError::DraftNotInProgress(msg) => {
                        (StatusCode::CONFLICT, msg)
                    }
                    DomainError::AlreadyPicked(msg) => (StatusCode::CONFLICT, msg),
                    DomainError::DuplicateEntry(msg) | DomainError::ConstraintViolation(msg) => {
                        (StatusCode::CONFLICT, msg)
                    }
                    DomainError::TransientIo(msg) => {
                        tracing::warn!("Transient error: {}", msg);
                        (StatusCode::SERVICE_UNAVAILABLE, msg)
                    }
                    DomainError::InternalError(msg) | DomainError::DatabaseError(msg) => {
                        tracing::error!("Internal error: {}", msg);
                        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
                    }
                }
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::errors::DomainError;

    #[test]
    fn test_not_found_error() {
        let error = ApiError::NotFound("draft not found".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_bad_request_error() {
        let error = ApiError::BadRequest("invalid input".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_domain_validation_error_is_bad_request() {
        let domain_err = DomainError::ValidationError("invalid data".to_string());
        let api_error = ApiError::from(domain_err);
        let response = api_error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_already_picked_is_conflict() {
        let domain_err = DomainError::AlreadyPicked("pick already claimed".to_string());
        let api_error = ApiError::from(domain_err);
        let response = api_error.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_transient_io_is_service_unavailable() {
        let domain_err = DomainError::TransientIo("bus unreachable".to_string());
        let api_error = ApiError::from(domain_err);
        let response = api_error.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}

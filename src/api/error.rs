//! HTTP mapping for `DomainError`, plus JSON/query extractors whose
//! rejections use the same error body.

use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::domain::DomainError;

impl DomainError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DomainError::Validation(_)
            | DomainError::InvalidField { .. }
            | DomainError::Conflict(_)
            | DomainError::InvalidCredentials => StatusCode::BAD_REQUEST,
            DomainError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::Database(_) | DomainError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn code(&self) -> &'static str {
        match self {
            DomainError::NotFound(_) => "not_found",
            DomainError::Validation(_) | DomainError::InvalidField { .. } => "invalid",
            DomainError::Conflict(_) => "conflict",
            DomainError::Forbidden(_) => "permission_denied",
            DomainError::Unauthorized(_) => "not_authenticated",
            DomainError::InvalidCredentials => "invalid_credentials",
            DomainError::Database(_) | DomainError::Internal(_) => "server_error",
        }
    }
}

impl IntoResponse for DomainError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            DomainError::Database(_) | DomainError::Internal(_) => {
                tracing::error!("Request failed: {}", self);
                json!({ "error": "Internal server error", "code": self.code() })
            }
            DomainError::InvalidField { field, message } => {
                json!({ "error": message, "code": self.code(), "field": field })
            }
            _ => json!({ "error": self.to_string(), "code": self.code() }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for DomainError {
    fn from(rejection: JsonRejection) -> Self {
        DomainError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for DomainError {
    fn from(rejection: QueryRejection) -> Self {
        DomainError::Validation(rejection.body_text())
    }
}

/// `Json` whose rejections (syntax or shape) become 400 error bodies.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(DomainError))]
pub struct AppJson<T>(pub T);

/// `Query` whose rejections become 400 error bodies.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(DomainError))]
pub struct AppQuery<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            DomainError::Conflict("taken".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DomainError::InvalidCredentials.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DomainError::Forbidden("no".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            DomainError::NotFound("Booking").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            DomainError::Database("disk".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

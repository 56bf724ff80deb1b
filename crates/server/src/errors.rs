use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use service::auth::{AuthError, FieldError};
use tracing::error;

/// Error body shared by every endpoint: `{"status":"error","message":...,"errors"?:[...]}`.
#[derive(Debug)]
pub struct JsonApiError {
    pub status: StatusCode,
    pub message: String,
    pub errors: Option<Vec<FieldError>>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into(), errors: None }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self { Self::new(StatusCode::UNAUTHORIZED, message) }
}

impl From<AuthError> for JsonApiError {
    fn from(e: AuthError) -> Self {
        let code = e.code();
        match e {
            AuthError::Validation(errors) => Self {
                status: StatusCode::BAD_REQUEST,
                message: "Validation failed".into(),
                errors: Some(errors),
            },
            AuthError::Conflict(field) => Self::new(StatusCode::CONFLICT, field.to_string()),
            AuthError::Unauthorized(msg) => Self::new(StatusCode::UNAUTHORIZED, msg),
            AuthError::Forbidden(msg) => Self::new(StatusCode::FORBIDDEN, msg),
            AuthError::NotFound(msg) => Self::new(StatusCode::NOT_FOUND, msg),
            internal => {
                error!(code, error = %internal, "request failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl From<JsonRejection> for JsonApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        let mut body = json!({"status": "error", "message": self.message});
        if let Some(errors) = self.errors {
            body["errors"] = json!(errors);
        }
        (self.status, Json(body)).into_response()
    }
}

use chrono::{DateTime, Utc};
use utoipa::OpenApi;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::routes::auth::{CreateUserRequest, ForgetPasswordRequest, LoginRequest, ResetPasswordRequest};

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

/// Shape of `data` returned by register, login and session checks.
#[derive(ToSchema)]
pub struct SessionDoc {
    pub uid: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub password_changed_at: DateTime<Utc>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::auth::create_user,
        crate::routes::auth::login,
        crate::routes::auth::refresh,
        crate::routes::auth::logout,
        crate::routes::auth::forget_password,
        crate::routes::auth::verify_reset_session,
        crate::routes::auth::reset_password,
        crate::routes::auth::session,
    ),
    components(
        schemas(
            HealthResponse,
            SessionDoc,
            CreateUserRequest,
            LoginRequest,
            ForgetPasswordRequest,
            ResetPasswordRequest,
        )
    ),
    tags(
        (name = "health"),
        (name = "auth")
    )
)]
pub struct ApiDoc;

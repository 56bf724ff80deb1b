use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use serde_json::json;
use service::auth::{AuthError, LoginInput, RegisterInput, ResetPasswordInput};
use utoipa::ToSchema;

use crate::errors::JsonApiError;
use crate::observability::{LOGINS_TOTAL, PASSWORD_RESETS_TOTAL, REGISTRATIONS_TOTAL, TOKEN_REJECTIONS_TOTAL};
use crate::state::{CookieSettings, ServerState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(rename = "usernameOrEmail")]
    pub username_or_email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ForgetPasswordRequest {
    pub identifier: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "newPassword")]
    pub new_password: String,
}

type JsonBody<T> = WithRejection<Json<T>, JsonApiError>;

fn refresh_cookie(settings: &CookieSettings, token: String) -> Cookie<'static> {
    Cookie::build((settings.name.clone(), token))
        .http_only(true)
        .secure(settings.secure)
        .same_site(SameSite::None)
        .path("/")
        .max_age(time::Duration::seconds(settings.max_age_secs))
        .build()
}

/// Removal cookie; attributes must match the ones the browser stored.
fn cleared(jar: CookieJar, settings: &CookieSettings) -> CookieJar {
    jar.remove(
        Cookie::build((settings.name.clone(), ""))
            .http_only(true)
            .secure(settings.secure)
            .same_site(SameSite::None)
            .path("/"),
    )
}

#[utoipa::path(post, path = "/create-user", tag = "auth", request_body = CreateUserRequest,
    responses((status = 201, description = "Registered; refresh cookie set"), (status = 400, description = "Validation failed"), (status = 409, description = "Email or username taken")))]
pub async fn create_user(
    State(state): State<ServerState>,
    jar: CookieJar,
    WithRejection(Json(body), _): JsonBody<CreateUserRequest>,
) -> Result<impl IntoResponse, JsonApiError> {
    let session = state
        .auth
        .register(RegisterInput { username: body.username, email: body.email, password: body.password })
        .await?;
    REGISTRATIONS_TOTAL.inc();
    let jar = jar.add(refresh_cookie(&state.cookie, session.tokens.refresh_token));
    Ok((
        StatusCode::CREATED,
        jar,
        Json(json!({"status": "success", "data": session.user, "access_token": session.tokens.access_token})),
    ))
}

#[utoipa::path(post, path = "/login", tag = "auth", request_body = LoginRequest,
    responses((status = 200, description = "Logged in; refresh cookie set"), (status = 400, description = "Validation failed"), (status = 401, description = "Password mismatch"), (status = 404, description = "User not found")))]
pub async fn login(
    State(state): State<ServerState>,
    headers: HeaderMap,
    jar: CookieJar,
    WithRejection(Json(body), _): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, JsonApiError> {
    let user_agent = headers.get(header::USER_AGENT).and_then(|v| v.to_str().ok()).map(str::to_owned);
    let result = state
        .auth
        .login(LoginInput { identifier: body.username_or_email, password: body.password, user_agent })
        .await;
    let session = match result {
        Ok(session) => {
            LOGINS_TOTAL.with_label_values(&["success"]).inc();
            session
        }
        Err(e) => {
            let outcome = match &e {
                AuthError::Unauthorized(_) => "bad_password",
                AuthError::NotFound(_) => "unknown_user",
                _ => "error",
            };
            LOGINS_TOTAL.with_label_values(&[outcome]).inc();
            return Err(e.into());
        }
    };
    let jar = jar.add(refresh_cookie(&state.cookie, session.tokens.refresh_token));
    Ok((jar, Json(json!({"status": "success", "data": session.user, "access_token": session.tokens.access_token}))))
}

#[utoipa::path(get, path = "/refresh", tag = "auth",
    responses((status = 200, description = "New access token"), (status = 401, description = "Missing, invalid or revoked refresh token; cookie cleared")))]
pub async fn refresh(State(state): State<ServerState>, jar: CookieJar) -> Result<impl IntoResponse, (CookieJar, JsonApiError)> {
    let Some(token) = jar.get(&state.cookie.name).map(|c| c.value().to_owned()) else {
        return Err((jar, JsonApiError::unauthorized("No refresh token")));
    };
    match state.auth.refresh(&token).await {
        Ok(access_token) => Ok(Json(json!({"status": "success", "access_token": access_token}))),
        Err(e) => {
            if matches!(e, AuthError::Unauthorized(_)) {
                TOKEN_REJECTIONS_TOTAL.with_label_values(&["refresh"]).inc();
            }
            Err((cleared(jar, &state.cookie), e.into()))
        }
    }
}

#[utoipa::path(get, path = "/logout", tag = "auth", responses((status = 200, description = "Refresh cookie cleared")))]
pub async fn logout(State(state): State<ServerState>, jar: CookieJar) -> impl IntoResponse {
    let token = jar.get(&state.cookie.name).map(|c| c.value().to_owned());
    state.auth.logout(token.as_deref()).await;
    (cleared(jar, &state.cookie), Json(json!({"status": "success", "message": "Logged out successfully"})))
}

#[utoipa::path(post, path = "/forget-password", tag = "auth", request_body = ForgetPasswordRequest,
    responses((status = 200, description = "Reset mail queued"), (status = 400, description = "Validation failed"), (status = 404, description = "User not found"), (status = 500, description = "Queue unavailable")))]
pub async fn forget_password(
    State(state): State<ServerState>,
    WithRejection(Json(body), _): JsonBody<ForgetPasswordRequest>,
) -> Result<impl IntoResponse, JsonApiError> {
    state.auth.forgot_password(&body.identifier).await?;
    Ok(Json(json!({"status": "success", "message": "Request mail sent"})))
}

#[utoipa::path(get, path = "/reset-password/{id}", tag = "auth",
    params(("id" = String, Path, description = "Reset session id")),
    responses((status = 200, description = "Session found"), (status = 404, description = "Reset Password Session not found")))]
pub async fn verify_reset_session(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, JsonApiError> {
    state.auth.verify_reset_session(&id).await?;
    Ok(Json(json!({"status": "success", "message": "Session found"})))
}

#[utoipa::path(put, path = "/reset-password", tag = "auth", request_body = ResetPasswordRequest,
    responses((status = 200, description = "Password changed; earlier tokens revoked"), (status = 400, description = "Validation failed"), (status = 401, description = "Invalid or expired session")))]
pub async fn reset_password(
    State(state): State<ServerState>,
    WithRejection(Json(body), _): JsonBody<ResetPasswordRequest>,
) -> Result<impl IntoResponse, JsonApiError> {
    let access_token = state
        .auth
        .reset_password(ResetPasswordInput { session_id: body.session_id, new_password: body.new_password })
        .await?;
    PASSWORD_RESETS_TOTAL.inc();
    Ok(Json(json!({"status": "success", "message": "Password reset successfully", "access_token": access_token})))
}

#[utoipa::path(get, path = "/session", tag = "auth",
    responses((status = 200, description = "Session projection", body = crate::openapi::SessionDoc), (status = 401, description = "Invalid or revoked token"), (status = 403, description = "No bearer token")))]
pub async fn session(State(state): State<ServerState>, headers: HeaderMap) -> Result<impl IntoResponse, JsonApiError> {
    let authorization = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok());
    match state.auth.verify_session(authorization).await {
        Ok(projection) => Ok(Json(json!({"status": "success", "data": projection}))),
        Err(e) => {
            if matches!(e, AuthError::Unauthorized(_)) {
                TOKEN_REJECTIONS_TOTAL.with_label_values(&["session"]).inc();
            }
            Err(e.into())
        }
    }
}

use axum::http::{header, HeaderValue, Method};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{warn, Level};
use utoipa::OpenApi;

use common::types::Health;

use crate::observability::encode_metrics;
use crate::openapi::ApiDoc;
use crate::state::ServerState;

pub mod auth;

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "Service is up", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn metrics() -> impl IntoResponse {
    encode_metrics()
}

async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

/// Credentialed CORS for a single configured origin, otherwise permissive.
pub fn build_cors(frontend_origin: Option<&str>) -> CorsLayer {
    let Some(origin) = frontend_origin else { return CorsLayer::very_permissive() };
    match HeaderValue::from_str(origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        Err(e) => {
            warn!(%origin, error = %e, "invalid frontend origin, falling back to permissive CORS");
            CorsLayer::very_permissive()
        }
    }
}

/// Auth endpoints, mounted under `base_path` when one is configured.
pub fn auth_routes() -> Router<ServerState> {
    Router::new()
        .route("/create-user", post(auth::create_user))
        .route("/login", post(auth::login))
        .route("/refresh", get(auth::refresh))
        .route("/logout", get(auth::logout))
        .route("/forget-password", post(auth::forget_password))
        .route("/reset-password/:id", get(auth::verify_reset_session))
        .route("/reset-password", put(auth::reset_password))
        .route("/session", get(auth::session))
}

/// Build the full application router: auth endpoints plus health, metrics and docs.
pub fn build_router(state: ServerState, base_path: &str, cors: CorsLayer) -> Router {
    let api = if base_path.is_empty() {
        auth_routes()
    } else {
        Router::new().nest(base_path, auth_routes())
    };

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/api-docs/openapi.json", get(openapi_json))
        .merge(api)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                // one INFO span per request, headers excluded (they carry bearer tokens)
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}

//! Route definitions for the API.

use axum::{
    body::Body,
    extract::{Request, State},
    http::header::HOST,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::handlers;
use crate::auth::require_auth;
use crate::config::AllowedHosts;
use crate::error::ApiError;
use crate::AppState;

/// Reject requests whose Host header is not on the allow-list.
async fn require_allowed_host(
    State(allowed): State<AllowedHosts>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let host = request
        .headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(':').next().unwrap_or("").to_string())
        .unwrap_or_default();

    if !allowed.permits(&host) {
        return Err(ApiError::BadRequest(format!(
            "Host '{}' not allowed",
            host
        )));
    }

    Ok(next.run(request).await)
}

/// Build the API router.
pub fn build_router(state: AppState, allowed_hosts: AllowedHosts) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Routes requiring an access token.
    let protected_routes = Router::new()
        .route(
            "/api/v1/user/me",
            get(handlers::me).patch(handlers::update_me),
        )
        .route(
            "/api/v1/tasks",
            get(handlers::list_tasks).post(handlers::create_task),
        )
        .route(
            "/api/v1/tasks/{id}",
            get(handlers::get_task)
                .put(handlers::update_task)
                .patch(handlers::update_task)
                .delete(handlers::delete_task),
        )
        .layer(middleware::from_fn_with_state(
            state.jwt_manager.clone(),
            require_auth,
        ))
        .with_state(state.clone());

    // Public routes (registration, token lifecycle, health).
    let public_routes = Router::new()
        .route("/api/v1/user/create", post(handlers::register))
        .route("/api/v1/user/login", post(handlers::login))
        .route("/api/v1/user/token/refresh", post(handlers::refresh_token))
        .route("/api/v1/user/logout", post(handlers::logout))
        .route("/api/v1/health", get(handlers::health_check))
        .with_state(state);

    Router::new()
        .merge(protected_routes)
        .merge(public_routes)
        .layer(middleware::from_fn_with_state(
            allowed_hosts,
            require_allowed_host,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

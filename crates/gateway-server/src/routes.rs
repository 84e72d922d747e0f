//! Route definitions for the router API.

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{auth, handlers, oauth, state::AppState};

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        // Metrics endpoint
        .route("/metrics", get(handlers::metrics_endpoint))
        // Login flow
        .route("/login", get(oauth::login))
        .route("/githubcallback", get(oauth::callback))
        .route("/apitoken", get(oauth::api_token))
        .merge(protected_routes(state.clone()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

/// Routes behind bearer authentication
fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/infer",
            post(handlers::infer).options(handlers::preflight),
        )
        .route("/prompt_request", post(handlers::infer))
        .route("/feedback", post(handlers::feedback))
        .route_layer(from_fn_with_state(state, auth::auth_middleware))
}

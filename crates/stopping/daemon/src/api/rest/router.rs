//! API Router configuration

use super::auth::require_instance_token;
use super::handlers;
use super::state::AppState;
use axum::{
    middleware,
    routing::{delete, get},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the main API router
pub fn create_router(state: AppState, enable_cors: bool) -> Router {
    // Every manual control route needs an instance token
    let kubernetes_routes = Router::new()
        .route("/pods", get(handlers::list_pods))
        .route("/instances", delete(handlers::delete_instance))
        .route(
            "/instances/namespaced",
            delete(handlers::delete_instance_in_namespace),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_instance_token,
        ));

    let api_routes = Router::new()
        .route("/status", get(handlers::daemon_status))
        .nest("/kubernetes", kubernetes_routes);

    let mut router = Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router.with_state(state)
}

use crate::handlers;
use crate::middleware::api_key_middleware;
use crate::state::AppState;
use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::normalize_path::NormalizePath;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// The servable application. Paths are normalized before routing so `/api/customers/` matches.
pub fn build_app(state: AppState, allowed_origins: &[String]) -> NormalizePath<Router> {
    NormalizePath::trim_trailing_slash(build_router(state, allowed_origins))
}

/// Build and configure the application router
pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    let api = Router::new()
        .route("/customers", get(handlers::list_customers))
        .route("/customers/save", post(handlers::save_customers))
        .route("/customers/delete", delete(handlers::delete_customers))
        .route_layer(from_fn_with_state(state.clone(), api_key_middleware));

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .nest("/api", api)
        // Middleware
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}

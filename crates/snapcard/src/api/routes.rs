use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::state::AppState;

/// Upper bound for request bodies; base64 screenshots exceed axum's default.
pub const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .route("/ingest", post(handlers::ingest))
        .route("/process", post(handlers::process))
        .route("/sweep", get(handlers::sweep).post(handlers::sweep))
        .route("/evaluate", post(handlers::evaluate))
        .route("/evaluate/verified", post(handlers::evaluate_verified))
        .route("/records", get(handlers::list_records))
        .route(
            "/records/{id}",
            get(handlers::get_record).delete(handlers::delete_record),
        )
        .route("/records/{id}/save", post(handlers::save_record))
        .route("/strategies", get(handlers::list_strategies));

    if let Some(dir) = &state.image_dir {
        router = router.nest_service("/images", ServeDir::new(dir));
    }

    router
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub mod admin;
pub mod public;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use tower_http::trace::TraceLayer;

use crate::db::AppState;

/// Request body cap. Oversized bodies surface as 400s through the JSON
/// extractor rather than bare 413s.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(public::router())
        .nest("/v1/admin", admin::router(state.clone()))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

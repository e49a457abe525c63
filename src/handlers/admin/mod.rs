//! Admin endpoints, all bearer-token protected.

mod licenses;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::db::AppState;
use crate::middleware::admin_auth;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/licenses/issue", post(licenses::issue))
        .route("/licenses/revoke", post(licenses::revoke))
        .route("/licenses", get(licenses::list))
        .route("/licenses/inspect", get(licenses::inspect))
        .layer(middleware::from_fn_with_state(state, admin_auth))
}

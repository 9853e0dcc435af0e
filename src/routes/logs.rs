use axum::{middleware, routing::get, Router};
use crate::handlers::logs::list_logs;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/logs", get(list_logs))
        .layer(middleware::from_fn(require_auth))
}

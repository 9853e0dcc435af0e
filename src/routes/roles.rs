use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use crate::handlers::role::{create_role, delete_role, list_roles, update_role};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/role", post(create_role))
        .route("/role", get(list_roles))
        .route("/role/{id}", put(update_role))
        .route("/role/{id}", delete(delete_role))
        .layer(middleware::from_fn(require_auth))
}

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use crate::handlers::user::{delete_user, get_me, list_users, register_user, update_user};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/user", post(register_user))
        .route("/user", get(list_users))
        .route("/user/me", get(get_me))
        .route("/user/{id}", put(update_user))
        .route("/user/{id}", delete(delete_user))
        .layer(middleware::from_fn(require_auth))
}

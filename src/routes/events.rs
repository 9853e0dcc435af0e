use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use crate::handlers::event::{
    bulk_delete_events, create_event, delete_event, get_event, list_events, update_event,
};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", post(create_event))
        .route("/events", get(list_events))
        .route("/events/{id}", get(get_event))
        .route("/events/{id}", put(update_event))
        .route("/events/{id}", delete(delete_event))
        .route("/events/bulkDelete", post(bulk_delete_events))
        .layer(middleware::from_fn(require_auth))
}

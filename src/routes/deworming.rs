use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use crate::handlers::deworming::{
    bulk_delete_deworming_reports, create_deworming_report, delete_deworming_report,
    get_deworming_report, list_deworming_reports, update_deworming_report,
};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/deworming", post(create_deworming_report))
        .route("/deworming", get(list_deworming_reports))
        .route("/deworming/{id}", get(get_deworming_report))
        .route("/deworming/{id}", put(update_deworming_report))
        .route("/deworming/{id}", delete(delete_deworming_report))
        .route("/deworming/bulkDelete", post(bulk_delete_deworming_reports))
        .layer(middleware::from_fn(require_auth))
}

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use crate::handlers::dengue::{
    bulk_delete_dengue_cases, create_dengue_case, delete_dengue_case, get_dengue_case,
    import_dengue_cases, list_dengue_cases, update_dengue_case,
};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dengueMonitoring", post(create_dengue_case))
        .route("/dengueMonitoring", get(list_dengue_cases))
        .route("/dengueMonitoring/{id}", get(get_dengue_case))
        .route("/dengueMonitoring/{id}", put(update_dengue_case))
        .route("/dengueMonitoring/{id}", delete(delete_dengue_case))
        .route("/dengueMonitoring/bulkDelete", post(bulk_delete_dengue_cases))
        .route("/dengueMonitoring/import", post(import_dengue_cases))
        .layer(middleware::from_fn(require_auth))
}

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use crate::handlers::feeding_program::{
    bulk_delete_feeding_records, create_feeding_record, delete_feeding_record, get_feeding_record,
    import_feeding_records, list_feeding_records, update_feeding_record,
};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/feedingProgram", post(create_feeding_record))
        .route("/feedingProgram", get(list_feeding_records))
        .route("/feedingProgram/{id}", get(get_feeding_record))
        .route("/feedingProgram/{id}", put(update_feeding_record))
        .route("/feedingProgram/{id}", delete(delete_feeding_record))
        .route("/feedingProgram/bulkDelete", post(bulk_delete_feeding_records))
        .route("/feedingProgram/import", post(import_feeding_records))
        .layer(middleware::from_fn(require_auth))
}

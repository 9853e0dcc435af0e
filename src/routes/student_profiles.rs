use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use crate::handlers::student_profile::{
    bulk_delete_student_profiles, create_student_profile, delete_student_profile,
    get_student_profile, import_student_profiles, list_student_profiles, update_student_profile,
};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/studentProfile", post(create_student_profile))
        .route("/studentProfile", get(list_student_profiles))
        .route("/studentProfile/{id}", get(get_student_profile))
        .route("/studentProfile/{id}", put(update_student_profile))
        .route("/studentProfile/{id}", delete(delete_student_profile))
        .route("/studentProfile/bulkDelete", post(bulk_delete_student_profiles))
        .route("/studentProfile/import", post(import_student_profiles))
        .layer(middleware::from_fn(require_auth))
}

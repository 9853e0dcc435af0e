use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use crate::handlers::academic_year::{
    bulk_delete_academic_years, create_academic_year, delete_academic_year, get_academic_year,
    list_academic_years, update_academic_year,
};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/academicYear", post(create_academic_year))
        .route("/academicYear", get(list_academic_years))
        .route("/academicYear/{id}", get(get_academic_year))
        .route("/academicYear/{id}", put(update_academic_year))
        .route("/academicYear/{id}", delete(delete_academic_year))
        .route("/academicYear/bulkDelete", post(bulk_delete_academic_years))
        .layer(middleware::from_fn(require_auth))
}

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use crate::handlers::clinic_visit::{
    bulk_delete_clinic_visits, create_clinic_visit, delete_clinic_visit, get_clinic_visit,
    list_clinic_visits, update_clinic_visit,
};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/clinicVisit", post(create_clinic_visit))
        .route("/clinicVisit", get(list_clinic_visits))
        .route("/clinicVisit/{id}", get(get_clinic_visit))
        .route("/clinicVisit/{id}", put(update_clinic_visit))
        .route("/clinicVisit/{id}", delete(delete_clinic_visit))
        .route("/clinicVisit/bulkDelete", post(bulk_delete_clinic_visits))
        .layer(middleware::from_fn(require_auth))
}

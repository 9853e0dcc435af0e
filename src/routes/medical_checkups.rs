use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use crate::handlers::medical_checkup::{
    bulk_delete_medical_checkups, create_medical_checkup, delete_medical_checkup,
    get_medical_checkup, import_medical_checkups, list_medical_checkups, update_medical_checkup,
};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/medicalCheckup", post(create_medical_checkup))
        .route("/medicalCheckup", get(list_medical_checkups))
        .route("/medicalCheckup/{id}", get(get_medical_checkup))
        .route("/medicalCheckup/{id}", put(update_medical_checkup))
        .route("/medicalCheckup/{id}", delete(delete_medical_checkup))
        .route("/medicalCheckup/bulkDelete", post(bulk_delete_medical_checkups))
        .route("/medicalCheckup/import", post(import_medical_checkups))
        .layer(middleware::from_fn(require_auth))
}

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use crate::handlers::employee::{
    bulk_delete_employee_medicals, bulk_delete_employee_profiles, create_employee_medical,
    create_employee_profile, delete_employee_medical, delete_employee_profile,
    get_employee_medical, get_employee_profile, import_employee_profiles,
    list_employee_medicals, list_employee_profiles, update_employee_medical,
    update_employee_profile,
};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/employeeProfile", post(create_employee_profile))
        .route("/employeeProfile", get(list_employee_profiles))
        .route("/employeeProfile/{id}", get(get_employee_profile))
        .route("/employeeProfile/{id}", put(update_employee_profile))
        .route("/employeeProfile/{id}", delete(delete_employee_profile))
        .route("/employeeProfile/bulkDelete", post(bulk_delete_employee_profiles))
        .route("/employeeProfile/import", post(import_employee_profiles))
        .route("/employeeMedical", post(create_employee_medical))
        .route("/employeeMedical", get(list_employee_medicals))
        .route("/employeeMedical/{id}", get(get_employee_medical))
        .route("/employeeMedical/{id}", put(update_employee_medical))
        .route("/employeeMedical/{id}", delete(delete_employee_medical))
        .route("/employeeMedical/bulkDelete", post(bulk_delete_employee_medicals))
        .layer(middleware::from_fn(require_auth))
}

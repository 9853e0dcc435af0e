pub mod academic_years;
pub mod analytics;
pub mod auth;
pub mod clinic_visits;
pub mod dengue;
pub mod deworming;
pub mod employees;
pub mod events;
pub mod feeding_program;
pub mod logs;
pub mod medical_checkups;
pub mod medicine_inventory;
pub mod roles;
pub mod student_profiles;
pub mod users;

use axum::Router;
use crate::state::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .merge(auth::routes())
        .merge(academic_years::routes())
        .merge(student_profiles::routes())
        .merge(employees::routes())
        .merge(medical_checkups::routes())
        .merge(clinic_visits::routes())
        .merge(dengue::routes())
        .merge(feeding_program::routes())
        .merge(deworming::routes())
        .merge(medicine_inventory::routes())
        .merge(roles::routes())
        .merge(users::routes())
        .merge(events::routes())
        .merge(logs::routes())
        .merge(analytics::routes())
}

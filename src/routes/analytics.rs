use axum::{middleware, routing::get, Router};
use crate::handlers::analytics::{
    checkup_screening_issues, clinic_visits_by_malady, clinic_visits_comparison,
    clinic_visits_monthly, dengue_by_grade_gender, dengue_monthly, feeding_outcomes,
};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/analytics/clinicVisit/monthly", get(clinic_visits_monthly))
        .route("/analytics/clinicVisit/maladies", get(clinic_visits_by_malady))
        .route("/analytics/clinicVisit/comparison", get(clinic_visits_comparison))
        .route("/analytics/dengue/monthly", get(dengue_monthly))
        .route("/analytics/dengue/gradeGender", get(dengue_by_grade_gender))
        .route("/analytics/feedingProgram/outcomes", get(feeding_outcomes))
        .route("/analytics/medicalCheckup/screenings", get(checkup_screening_issues))
        .layer(middleware::from_fn(require_auth))
}

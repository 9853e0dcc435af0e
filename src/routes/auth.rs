use axum::{routing::post, Router};
use crate::handlers::auth::{login, refresh, verify_otp};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/verifyOtp", post(verify_otp))
        .route("/auth/refresh", post(refresh))
}

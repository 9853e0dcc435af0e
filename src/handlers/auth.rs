use axum::{extract::State, Json};
use bcrypt::verify;

use crate::auth::jwt::{sign_access_token, sign_refresh_token, verify_token};
use crate::auth::otp;
use crate::dtos::auth::{
    LoginRequest, LoginResponse, RefreshRequest, RefreshResponse, TokenResponse, VerifyOtpRequest,
};
use crate::error::AppError;
use crate::models::user::User;
use crate::services::mailer;
use crate::state::AppState;

const ACCESS_TOKEN_SECONDS: u64 = 60 * 60;

fn jwt_secret() -> Result<String, AppError> {
    std::env::var("JWT_SECRET").map_err(|_| AppError::internal("JWT secret not configured"))
}

fn refresh_secret() -> Result<String, AppError> {
    std::env::var("REFRESH_SECRET").map_err(|_| AppError::internal("Refresh secret not configured"))
}

fn otp_secret() -> Result<String, AppError> {
    std::env::var("OTP_SECRET").map_err(|_| AppError::internal("OTP secret not configured"))
}

async fn load_active_user(state: &AppState, email: &str) -> Result<User, AppError> {
    let user = sqlx::query_as::<_, User>(
        r#"SELECT id, first_name, last_name, email, password_hash, role, status, created_at
           FROM users WHERE email = $1"#,
    )
    .bind(email.trim().to_lowercase())
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::validation("Invalid credentials"))?;

    if user.status != "Active" {
        return Err(AppError::forbidden("Account is inactive"));
    }
    Ok(user)
}

/// Step one: verify the password, then email a one-time code. No tokens are
/// issued until the code comes back through `verify_otp`.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    if payload.email.trim().is_empty() {
        return Err(AppError::validation("Email required"));
    }
    if payload.password.is_empty() {
        return Err(AppError::validation("Password required"));
    }

    let user = load_active_user(&state, &payload.email).await?;

    let ok = verify(&payload.password, &user.password_hash)
        .map_err(|e| AppError::internal(format!("Password verify error: {e}")))?;
    if !ok {
        return Err(AppError::validation("Invalid credentials"));
    }

    let code = otp::generate(&otp_secret()?, &user.email);
    mailer::send_login_code(&user.email, &code).await?;

    Ok(Json(LoginResponse {
        message: "A one-time code has been sent to your email",
        otp_step_seconds: otp::STEP_SECONDS,
    }))
}

/// Step two: exchange email + one-time code for the token pair.
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let user = load_active_user(&state, &payload.email).await?;

    if !otp::verify(&otp_secret()?, &user.email, payload.code.trim()) {
        return Err(AppError::unauthorized("Invalid or expired one-time code"));
    }

    let access_token = sign_access_token(user.id, &user.role, &user.email, &jwt_secret()?)?;
    let refresh_token = sign_refresh_token(user.id, &user.role, &user.email, &refresh_secret()?)?;

    Ok(Json(TokenResponse {
        access_token,
        refresh_token,
        token_type: "Bearer",
        expires_in_seconds: ACCESS_TOKEN_SECONDS,
    }))
}

/// Rotates the short-lived access token off a still-valid refresh token.
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, AppError> {
    let claims = verify_token(&payload.refresh_token, &refresh_secret()?)?;

    // The account may have been deactivated since the refresh was issued
    let user = load_active_user(&state, &claims.email).await?;

    let access_token = sign_access_token(user.id, &user.role, &user.email, &jwt_secret()?)?;
    Ok(Json(RefreshResponse {
        access_token,
        token_type: "Bearer",
        expires_in_seconds: ACCESS_TOKEN_SECONDS,
    }))
}

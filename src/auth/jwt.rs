use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub role: String,
    pub exp: usize,
    pub iat: usize,
    pub email: String,
}

fn sign(user_id: i64, role: &str, email: &str, secret: &str, lifetime: Duration) -> Result<String, AppError> {
    let now = Utc::now();
    let exp = now + lifetime;
    let claims = Claims {
        sub: user_id,
        role: role.to_string(),
        iat: now.timestamp() as usize,
        exp: exp.timestamp() as usize,
        email: email.to_string(),
    };
    encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::internal(format!("Token signing failed: {e}")))
}

/// Short-lived bearer token carried in the Authorization header.
pub fn sign_access_token(user_id: i64, role: &str, email: &str, secret: &str) -> Result<String, AppError> {
    sign(user_id, role, email, secret, Duration::hours(1))
}

/// Longer-lived renewal token; signed with its own secret so a leaked
/// access secret cannot mint refreshes.
pub fn sign_refresh_token(user_id: i64, role: &str, email: &str, secret: &str) -> Result<String, AppError> {
    sign(user_id, role, email, secret, Duration::days(7))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|d| d.claims)
    .map_err(|e| AppError::unauthorized(format!("Invalid or expired token: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_access_token_round_trips() {
        let token = sign_access_token(42, "Admin", "nurse@school.edu", "test-secret").unwrap();
        let claims = verify_token(&token, "test-secret").unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, "Admin");
        assert_eq!(claims.email, "nurse@school.edu");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = sign_access_token(1, "Nurse", "a@b.c", "secret-a").unwrap();
        assert!(verify_token(&token, "secret-b").is_err());
    }

    #[test]
    fn refresh_token_outlives_access_token() {
        let access = sign_access_token(1, "Nurse", "a@b.c", "s").unwrap();
        let refresh = sign_refresh_token(1, "Nurse", "a@b.c", "s").unwrap();
        let a = verify_token(&access, "s").unwrap();
        let r = verify_token(&refresh, "s").unwrap();
        assert!(r.exp > a.exp);
    }
}

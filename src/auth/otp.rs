//! One-time login codes: 6 digits, 60-second time step, HMAC-SHA1 per the
//! RFC 6238 construction. The code is emailed after password verification
//! and exchanged for tokens at `/auth/verifyOtp`.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha1 = Hmac<Sha1>;

pub const STEP_SECONDS: u64 = 60;
const DIGITS: u32 = 6;

fn hotp(secret: &[u8], counter: u64) -> u32 {
    let mut mac = HmacSha1::new_from_slice(secret)
        .expect("HMAC accepts keys of any length");
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    // Dynamic truncation (RFC 4226 §5.3)
    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = ((digest[offset] as u32 & 0x7f) << 24)
        | ((digest[offset + 1] as u32) << 16)
        | ((digest[offset + 2] as u32) << 8)
        | (digest[offset + 3] as u32);

    binary % 10u32.pow(DIGITS)
}

fn current_step() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() / STEP_SECONDS)
        .unwrap_or(0)
}

/// Code for the current 60-second window, zero-padded to 6 digits.
pub fn generate(secret: &str, email: &str) -> String {
    let key = derive_key(secret, email);
    format!("{:06}", hotp(&key, current_step()))
}

/// Accepts the current window and one step either side of it, covering
/// clock skew and the email delivery delay.
pub fn verify(secret: &str, email: &str, code: &str) -> bool {
    if code.len() != DIGITS as usize || !code.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let key = derive_key(secret, email);
    let step = current_step();
    for candidate in step.saturating_sub(1)..=step + 1 {
        if format!("{:06}", hotp(&key, candidate)) == code {
            return true;
        }
    }
    false
}

// Per-user key so one user's code never validates for another.
fn derive_key(secret: &str, email: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(secret.len() + email.len() + 1);
    key.extend_from_slice(secret.as_bytes());
    key.push(b':');
    key.extend_from_slice(email.to_lowercase().as_bytes());
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_code_is_six_digits() {
        let code = generate("otp-secret", "nurse@school.edu");
        assert_eq!(code.len(), 6);
        assert!(code.bytes().all(|b| b.is_ascii_digit()));
    }

    #[test]
    fn generated_code_verifies() {
        let code = generate("otp-secret", "nurse@school.edu");
        assert!(verify("otp-secret", "nurse@school.edu", &code));
    }

    #[test]
    fn code_is_bound_to_the_email() {
        let code = generate("otp-secret", "nurse@school.edu");
        assert!(!verify("otp-secret", "admin@school.edu", &code));
    }

    #[test]
    fn malformed_codes_are_rejected() {
        assert!(!verify("otp-secret", "nurse@school.edu", "12345"));
        assert!(!verify("otp-secret", "nurse@school.edu", "1234567"));
        assert!(!verify("otp-secret", "nurse@school.edu", "12a456"));
        assert!(!verify("otp-secret", "nurse@school.edu", ""));
    }

    #[test]
    fn rfc4226_reference_vector() {
        // RFC 4226 appendix D, key "12345678901234567890", counter 0..2
        let key = b"12345678901234567890";
        assert_eq!(hotp(key, 0), 755224);
        assert_eq!(hotp(key, 1), 287082);
        assert_eq!(hotp(key, 2), 359152);
    }
}

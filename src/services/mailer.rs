//! Outbound email for login one-time codes. Built from SMTP_* env at call
//! time; when SMTP is not configured the code is logged server-side instead
//! so local development does not need a mail relay.

use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use crate::error::AppError;

struct SmtpSettings {
    host: String,
    port: u16,
    user: String,
    password: String,
    from: String,
}

fn settings_from_env() -> Option<SmtpSettings> {
    let host = std::env::var("SMTP_HOST").ok()?;
    let user = std::env::var("SMTP_USER").ok()?;
    let password = std::env::var("SMTP_PASSWORD").ok()?;
    let from = std::env::var("SMTP_FROM").unwrap_or_else(|_| user.clone());
    let port = std::env::var("SMTP_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(587);
    Some(SmtpSettings { host, port, user, password, from })
}

pub async fn send_login_code(to: &str, code: &str) -> Result<(), AppError> {
    let Some(settings) = settings_from_env() else {
        tracing::warn!(%to, %code, "SMTP not configured; login code not emailed");
        return Ok(());
    };

    let from_mailbox: Mailbox = format!("Clinic Records <{}>", settings.from)
        .parse()
        .map_err(|e| AppError::internal(format!("Invalid SMTP_FROM address: {e}")))?;
    let to_mailbox: Mailbox = to
        .parse()
        .map_err(|e| AppError::validation(format!("Invalid recipient address: {e}")))?;

    let message = Message::builder()
        .from(from_mailbox)
        .to(to_mailbox)
        .subject("Your clinic login code")
        .header(ContentType::TEXT_PLAIN)
        .body(format!(
            "Your one-time login code is {code}. It expires in about a minute."
        ))
        .map_err(|e| AppError::internal(format!("Failed to build email: {e}")))?;

    let creds = Credentials::new(settings.user, settings.password);
    let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
        .map_err(|e| AppError::internal(format!("Failed to create SMTP relay: {e}")))?
        .port(settings.port)
        .credentials(creds)
        .build();

    transport
        .send(message)
        .await
        .map_err(|e| AppError::internal(format!("Failed to send login code: {e}")))?;

    tracing::info!(%to, "Login code emailed");
    Ok(())
}

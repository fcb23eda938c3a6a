//! Transactional email dispatch.

pub mod smtp;

use async_trait::async_trait;

pub use smtp::SmtpMailer;

/// A fully formatted message ready for hand-off to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub subject: String,
    pub html: String,
    pub to: String,
    pub from: String,
    pub reply_to: Option<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Resolves once the transport accepted the message; delivery is not tracked.
    async fn send(&self, email: OutgoingEmail) -> anyhow::Result<()>;
}

/// Logs messages instead of sending them. Used when SMTP is not configured.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> anyhow::Result<()> {
        tracing::info!(
            to = %email.to,
            from = %email.from,
            reply_to = ?email.reply_to,
            subject = %email.subject,
            body = %email.html,
            "email not sent (smtp disabled)"
        );
        Ok(())
    }
}

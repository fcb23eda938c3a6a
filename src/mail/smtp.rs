use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use super::{Mailer, OutgoingEmail};
use crate::config::SmtpConfig;

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> anyhow::Result<Self> {
        let creds = Credentials::new(config.username.clone(), config.password.clone());
        let relay = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        };
        let builder =
            relay.with_context(|| format!("create smtp transport for {}", config.host))?;

        let transport = builder.port(config.port).credentials(creds).build();
        tracing::info!(host = %config.host, port = config.port, "smtp transport configured");
        Ok(Self { transport })
    }
}

pub(crate) fn build_message(email: &OutgoingEmail) -> anyhow::Result<Message> {
    let from: Mailbox = email
        .from
        .parse()
        .with_context(|| format!("invalid from address {}", email.from))?;
    let to: Mailbox = email
        .to
        .parse()
        .with_context(|| format!("invalid to address {}", email.to))?;

    let mut builder = Message::builder()
        .from(from)
        .to(to)
        .subject(email.subject.clone())
        .header(ContentType::TEXT_HTML);
    if let Some(reply_to) = &email.reply_to {
        let reply_to: Mailbox = reply_to
            .parse()
            .with_context(|| format!("invalid reply-to address {reply_to}"))?;
        builder = builder.reply_to(reply_to);
    }
    builder.body(email.html.clone()).context("build email")
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> anyhow::Result<()> {
        let message = build_message(&email)?;
        self.transport.send(message).await.context("smtp send")?;
        tracing::info!(to = %email.to, subject = %email.subject, "email sent");
        Ok(())
    }
}

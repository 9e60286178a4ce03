//! SMTP mailer via lettre (STARTTLS relay, app-password login).

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::ExposeSecret;

use crate::config::SmtpConfig;
use crate::error::NotificationError;
use crate::notify::{EmailCreds, Mailer, OutgoingEmail};

/// Sends through an SMTP relay, upgrading the connection with STARTTLS.
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }
}

/// Build the RFC 5322 message for an outgoing email.
pub fn build_message(email: &OutgoingEmail) -> Result<Message, NotificationError> {
    let from: Mailbox = email
        .from
        .parse()
        .map_err(|e| NotificationError::InvalidAddress {
            address: email.from.clone(),
            reason: format!("{e}"),
        })?;
    let to: Mailbox = email
        .to
        .parse()
        .map_err(|e| NotificationError::InvalidAddress {
            address: email.to.clone(),
            reason: format!("{e}"),
        })?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(email.subject.as_str())
        .header(ContentType::TEXT_PLAIN)
        .body(email.body.clone())
        .map_err(|e| NotificationError::Build(e.to_string()))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, creds: &EmailCreds, email: &OutgoingEmail) -> Result<(), NotificationError> {
        let message = build_message(email)?;

        let credentials = Credentials::new(
            creds.sender.clone(),
            creds.app_password.expose_secret().to_string(),
        );
        let transport = SmtpTransport::starttls_relay(&self.config.host)
            .map_err(|e| NotificationError::SendFailed(format!("SMTP relay error: {e}")))?
            .port(self.config.port)
            .credentials(credentials)
            .build();

        // lettre's SmtpTransport blocks; keep it off the runtime thread.
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| NotificationError::SendFailed(format!("SMTP task panicked: {e}")))?
            .map_err(|e| NotificationError::SendFailed(e.to_string()))?;

        tracing::debug!(
            host = %self.config.host,
            port = self.config.port,
            to = %email.to,
            "SMTP delivery accepted"
        );
        Ok(())
    }
}

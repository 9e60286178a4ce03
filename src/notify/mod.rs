//! Completion notice: one plain-text email once every channel is done.

pub mod smtp;

pub use smtp::SmtpMailer;

use async_trait::async_trait;
use secrecy::SecretString;
use tracing::{error, info};

use crate::error::NotificationError;

pub const NOTIFICATION_SUBJECT: &str = "Telegram Scraper Notification";
pub const NOTIFICATION_BODY: &str = "Telegram scraping task is completed successfully.";

/// Mail account used to send the notice, read from the credentials workbook.
#[derive(Debug, Clone)]
pub struct EmailCreds {
    pub sender: String,
    pub app_password: SecretString,
    pub receiver: String,
}

/// A single outgoing plain-text email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutgoingEmail {
    /// The fixed completion notice from `creds.sender` to `creds.receiver`.
    pub fn completion(creds: &EmailCreds) -> Self {
        Self {
            from: creds.sender.clone(),
            to: creds.receiver.clone(),
            subject: NOTIFICATION_SUBJECT.to_string(),
            body: NOTIFICATION_BODY.to_string(),
        }
    }
}

/// Anything that can deliver an email on behalf of an account.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, creds: &EmailCreds, email: &OutgoingEmail) -> Result<(), NotificationError>;
}

/// Send the completion notice. Failures are logged, never returned.
///
/// Returns whether the email was sent.
pub async fn send_completion(mailer: &dyn Mailer, creds: &EmailCreds) -> bool {
    let email = OutgoingEmail::completion(creds);
    match mailer.send(creds, &email).await {
        Ok(()) => {
            info!(to = %email.to, "Notification email sent");
            true
        }
        Err(e) => {
            error!(to = %email.to, error = %e, "Failed to send notification email");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn creds() -> EmailCreds {
        EmailCreds {
            sender: "bot@example.com".into(),
            app_password: SecretString::from("app-pass"),
            receiver: "ops@example.com".into(),
        }
    }

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<OutgoingEmail>>,
        fail: bool,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, _creds: &EmailCreds, email: &OutgoingEmail) -> Result<(), NotificationError> {
            self.sent.lock().unwrap().push(email.clone());
            if self.fail {
                return Err(NotificationError::SendFailed("connection refused".into()));
            }
            Ok(())
        }
    }

    #[test]
    fn completion_email_has_fixed_text() {
        let email = OutgoingEmail::completion(&creds());
        assert_eq!(email.from, "bot@example.com");
        assert_eq!(email.to, "ops@example.com");
        assert_eq!(email.subject, "Telegram Scraper Notification");
        assert_eq!(email.body, "Telegram scraping task is completed successfully.");
    }

    #[tokio::test]
    async fn send_completion_reports_success() {
        let mailer = RecordingMailer::default();
        assert!(send_completion(&mailer, &creds()).await);
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn send_completion_swallows_failure() {
        let mailer = RecordingMailer {
            fail: true,
            ..Default::default()
        };
        assert!(!send_completion(&mailer, &creds()).await);
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);
    }
}

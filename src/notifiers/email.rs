use crate::core::alert::{AlertMessage, Notifier};
use crate::core::config::EmailConfig;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use tracing::info;

const DEFAULT_SMTP_PORT: u16 = 587;
const SMTP_TIMEOUT: Duration = Duration::from_secs(20);

/// Sends alerts over SMTP with STARTTLS.
pub struct EmailNotifier {
    host: String,
    port: u16,
    user: String,
    password: String,
    to: String,
}

impl EmailNotifier {
    /// Returns `None` unless host, credentials and a recipient are all known.
    /// `to` takes precedence over the configured recipient.
    pub fn from_config(config: &EmailConfig, to: Option<&str>) -> Option<Self> {
        let to = to
            .map(str::to_string)
            .or_else(|| config.to.clone())
            .filter(|to| !to.trim().is_empty())?;

        Some(Self {
            host: config.host.clone()?,
            port: config.port.unwrap_or(DEFAULT_SMTP_PORT),
            user: config.user.clone()?,
            password: config.password.clone()?,
            to,
        })
    }

    pub fn build_message(&self, message: &AlertMessage) -> Result<Message> {
        let from: Mailbox = self
            .user
            .parse()
            .with_context(|| format!("Invalid sender address: {}", self.user))?;
        let to: Mailbox = self
            .to
            .parse()
            .with_context(|| format!("Invalid recipient address: {}", self.to))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(&message.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| anyhow!("Failed to build e-mail: {e}"))
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn channel(&self) -> &str {
        "email"
    }

    async fn send(&self, message: &AlertMessage) -> Result<()> {
        let email = self.build_message(message)?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)
            .with_context(|| format!("Invalid SMTP host: {}", self.host))?
            .port(self.port)
            .credentials(Credentials::new(self.user.clone(), self.password.clone()))
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        mailer
            .send(email)
            .await
            .with_context(|| format!("Failed to send e-mail to {}", self.to))?;

        info!("E-mail sent to {}", self.to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EmailConfig {
        EmailConfig {
            host: Some("smtp.example.com".to_string()),
            port: None,
            user: Some("alerts@example.com".to_string()),
            password: Some("secret".to_string()),
            to: Some("me@example.com".to_string()),
        }
    }

    #[test]
    fn test_from_config() {
        let notifier = EmailNotifier::from_config(&config(), None).unwrap();
        assert_eq!(notifier.port, 587);
        assert_eq!(notifier.to, "me@example.com");

        let notifier = EmailNotifier::from_config(&config(), Some("other@example.com")).unwrap();
        assert_eq!(notifier.to, "other@example.com");
    }

    #[test]
    fn test_incomplete_config() {
        let mut missing_password = config();
        missing_password.password = None;
        assert!(EmailNotifier::from_config(&missing_password, None).is_none());

        let mut missing_recipient = config();
        missing_recipient.to = None;
        assert!(EmailNotifier::from_config(&missing_recipient, None).is_none());
        assert!(EmailNotifier::from_config(&missing_recipient, Some(" ")).is_none());
    }

    #[test]
    fn test_build_message() {
        let notifier = EmailNotifier::from_config(&config(), None).unwrap();
        let message = notifier
            .build_message(&AlertMessage {
                subject: "[Alert] USD/BRL crossed BRL 6.00".to_string(),
                body: "Current value: BRL 6.0100".to_string(),
            })
            .unwrap();

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("From: alerts@example.com"));
        assert!(raw.contains("To: me@example.com"));
        assert!(raw.contains("Subject: [Alert] USD/BRL crossed BRL 6.00"));
        assert!(raw.contains("Current value: BRL 6.0100"));
    }

    #[test]
    fn test_invalid_recipient() {
        let notifier =
            EmailNotifier::from_config(&config(), Some("not an address")).unwrap();
        let result = notifier.build_message(&AlertMessage {
            subject: "s".to_string(),
            body: "b".to_string(),
        });
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Invalid recipient address")
        );
    }
}

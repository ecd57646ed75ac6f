//! SMTP mailer
//!
//! STARTTLS relay authenticated with an app password (Gmail by default).

use super::traits::*;
use crate::config::AssistantIdentity;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use tracing::{info, warn};

const PROVIDER: &str = "smtp";

/// SMTP client; the transport pools connections and is safe to share
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    identity: AssistantIdentity,
}

impl SmtpMailer {
    pub fn new(
        host: &str,
        port: u16,
        app_password: &str,
        identity: AssistantIdentity,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| UpstreamError::transport(PROVIDER, e))?
            .port(port)
            .credentials(Credentials::new(
                identity.from_email.clone(),
                app_password.to_string(),
            ))
            .timeout(Some(timeout))
            .build();

        Ok(Self { transport, identity })
    }

    fn build_message(&self, to: &str, subject: &str, body: &str) -> Result<Message, UpstreamError> {
        let from_address: Address = self.identity.from_email.parse().map_err(|e| UpstreamError::Rejected {
            provider: PROVIDER,
            message: format!("invalid sender {}: {}", self.identity.from_email, e),
        })?;
        let from = Mailbox::new(Some(self.identity.from_name.clone()), from_address);
        let to: Mailbox = to.parse().map_err(|e| UpstreamError::Rejected {
            provider: PROVIDER,
            message: format!("invalid recipient {}: {}", to, e),
        })?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body.to_string())
            .map_err(|e| UpstreamError::Rejected {
                provider: PROVIDER,
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl NotificationCapability for SmtpMailer {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), UpstreamError> {
        let message = self.build_message(to, subject, body)?;

        self.transport.send(message).await.map_err(|e| {
            warn!(to, "SMTP send failed: {}", e);
            UpstreamError::transport(PROVIDER, e)
        })?;

        info!(to, subject, "Email sent via SMTP");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailer_named(from_name: &str) -> SmtpMailer {
        SmtpMailer::new(
            "smtp.gmail.com",
            587,
            "app-password",
            AssistantIdentity::new("me@corp.com", "bot@corp.com", from_name),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn mailer() -> SmtpMailer {
        mailer_named("Bot")
    }

    #[tokio::test]
    async fn test_invalid_recipient_is_rejected_before_sending() {
        let err = mailer().send("not an address", "Hi", "<p>x</p>").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Rejected { provider: "smtp", .. }));
    }

    #[tokio::test]
    async fn test_message_headers() {
        let message = mailer().build_message("a@b.com", "Hello", "<p>Hi</p>").unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("To: a@b.com"));
        assert!(raw.contains("Subject: Hello"));
        assert!(raw.contains("Content-Type: text/html"));
    }

    #[tokio::test]
    async fn test_sender_name_with_punctuation() {
        let message = mailer_named("Doe, Jane \"JD\"")
            .build_message("a@b.com", "Hello", "<p>Hi</p>")
            .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("<bot@corp.com>"));
    }
}

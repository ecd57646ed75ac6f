//! SendGrid mailer
//!
//! v3 mail send API. Every message carries a plain-text alternative derived
//! from the HTML body.

use super::traits::*;
use crate::config::AssistantIdentity;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};

const PROVIDER: &str = "sendgrid";
const SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

static TAG_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static WHITESPACE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

#[derive(Debug, Serialize)]
struct MailRequest<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    subject: &'a str,
    content: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct Content {
    r#type: &'static str,
    value: String,
}

/// Remove tags and collapse whitespace
pub fn strip_html(html: &str) -> String {
    let text = TAG_PATTERN.replace_all(html, "");
    WHITESPACE_PATTERN.replace_all(text.trim(), " ").into_owned()
}

/// SendGrid client
#[derive(Clone)]
pub struct SendGridMailer {
    client: Client,
    api_key: String,
    identity: AssistantIdentity,
}

impl SendGridMailer {
    pub fn new(client: Client, api_key: &str, identity: AssistantIdentity) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            identity,
        }
    }

    fn build_request<'a>(&'a self, to: &'a str, subject: &'a str, body: &str) -> MailRequest<'a> {
        MailRequest {
            personalizations: vec![Personalization {
                to: vec![Address { email: to, name: None }],
            }],
            from: Address {
                email: &self.identity.from_email,
                name: Some(&self.identity.from_name),
            },
            subject,
            // SendGrid requires text/plain before text/html
            content: vec![
                Content {
                    r#type: "text/plain",
                    value: strip_html(body),
                },
                Content {
                    r#type: "text/html",
                    value: body.to_string(),
                },
            ],
        }
    }
}

#[async_trait]
impl NotificationCapability for SendGridMailer {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), UpstreamError> {
        let request = self.build_request(to, subject, body);

        let response = self
            .client
            .post(SENDGRID_API_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| UpstreamError::request(PROVIDER, e))?;

        let status = response.status().as_u16();
        if status != 200 && status != 202 {
            let err = UpstreamError::from_response(PROVIDER, response).await;
            warn!(to, "SendGrid send failed: {}", err);
            return Err(err);
        }

        info!(to, subject, "Email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_html() {
        let html = "\n  <h2>Meeting Scheduled</h2>\n  <p><strong>Title:</strong>  Sync</p>\n";
        assert_eq!(strip_html(html), "Meeting Scheduled Title: Sync");
        assert_eq!(strip_html("plain text"), "plain text");
    }

    #[test]
    fn test_request_shape() {
        let mailer = SendGridMailer::new(
            Client::new(),
            "key",
            AssistantIdentity::new("me@corp.com", "bot@corp.com", "Bot"),
        );
        let request = mailer.build_request("a@b.com", "Hello", "<p>Hi there</p>");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["personalizations"][0]["to"][0]["email"], "a@b.com");
        assert!(json["personalizations"][0]["to"][0].get("name").is_none());
        assert_eq!(json["from"]["email"], "bot@corp.com");
        assert_eq!(json["from"]["name"], "Bot");
        assert_eq!(json["subject"], "Hello");
        assert_eq!(json["content"][0]["type"], "text/plain");
        assert_eq!(json["content"][0]["value"], "Hi there");
        assert_eq!(json["content"][1]["type"], "text/html");
        assert_eq!(json["content"][1]["value"], "<p>Hi there</p>");
    }
}

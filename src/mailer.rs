//! Transactional email delivery.

use crate::config::Credentials;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;

const SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

/// A composed HTML email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// Something that can deliver an email.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver `email`, returning the provider's HTTP status.
    ///
    /// A non-2xx status is a successful call; only an unreachable provider is an error.
    async fn send(&self, email: &Email) -> Result<u16>;
}

// ── SendGrid v3 payload ──────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct SendGridMail<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    subject: &'a str,
    content: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    content_type: &'a str,
    value: &'a str,
}

impl<'a> SendGridMail<'a> {
    fn from_email(email: &'a Email) -> Self {
        Self {
            personalizations: vec![Personalization {
                to: vec![Address { email: &email.to }],
            }],
            from: Address { email: &email.from },
            subject: &email.subject,
            content: vec![Content {
                content_type: "text/html",
                value: &email.html_body,
            }],
        }
    }
}

/// Mailer backed by the SendGrid v3 API.
#[derive(Clone)]
pub struct SendGridMailer {
    api_key: String,
    endpoint: String,
}

impl SendGridMailer {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: SENDGRID_ENDPOINT.to_string(),
        }
    }

    pub fn from_credentials(credentials: &Credentials) -> Self {
        Self::new(credentials.sendgrid_api_key.clone())
    }

    /// Point the mailer at a different endpoint (e.g. a sandbox).
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

fn send_blocking(endpoint: &str, api_key: &str, email: &Email) -> Result<u16> {
    let response = ureq::post(endpoint)
        .header("Authorization", &format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .send_json(&SendGridMail::from_email(email));

    match response {
        Ok(resp) => Ok(resp.status().as_u16()),
        Err(ureq::Error::StatusCode(code)) => Ok(code),
        Err(e) => Err(Error::Email(e.to_string())),
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, email: &Email) -> Result<u16> {
        let endpoint = self.endpoint.clone();
        let api_key = self.api_key.clone();
        let email = email.clone();

        // ureq blocks; keep it off the async workers
        tokio::task::spawn_blocking(move || send_blocking(&endpoint, &api_key, &email)).await?
    }
}

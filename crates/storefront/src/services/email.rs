//! Email delivery.
//!
//! The rest of the app only sees the [`Mailer`] trait. Production uses
//! [`SmtpMailer`] (lettre over STARTTLS); without SMTP settings the server
//! falls back to [`LogMailer`], and tests use [`MemoryMailer`].

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;
use tokio::sync::Mutex;

use bazaar_core::Email;

use crate::config::SmtpConfig;

/// HTML template for the password reset email.
#[derive(Template)]
#[template(path = "email/password_reset.html")]
struct PasswordResetEmailHtml<'a> {
    reset_url: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Something that can deliver an HTML email.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send one message.
    async fn send_mail(&self, to: &Email, subject: &str, html_body: &str)
    -> Result<(), EmailError>;
}

/// Render and send the password reset message.
///
/// # Errors
///
/// Returns `EmailError` if rendering or delivery fails.
pub async fn send_password_reset(
    mailer: &dyn Mailer,
    to: &Email,
    reset_url: &str,
) -> Result<(), EmailError> {
    let html = PasswordResetEmailHtml { reset_url }.render()?;
    mailer.send_mail(to, "Password reset", &html).await
}

/// SMTP delivery via lettre.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Create a mailer from SMTP configuration.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::Smtp` if the relay cannot be configured and
    /// `EmailError::InvalidAddress` if the sender address does not parse.
    pub fn new(config: &SmtpConfig) -> Result<Self, EmailError> {
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();

        let from = config
            .from_address
            .parse()
            .map_err(|_| EmailError::InvalidAddress(config.from_address.clone()))?;

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_mail(
        &self,
        to: &Email,
        subject: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(to
                .as_str()
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative().singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(html_body.to_string()),
                ),
            )?;

        self.transport.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

/// Logs messages instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_mail(
        &self,
        to: &Email,
        subject: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        tracing::info!(to = %to, subject = %subject, body = %html_body, "SMTP not configured; email logged");
        Ok(())
    }
}

/// A message captured by [`MemoryMailer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub to: Email,
    pub subject: String,
    pub html_body: String,
}

/// Keeps sent messages in memory.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    outbox: Mutex<Vec<SentMail>>,
}

impl MemoryMailer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages sent so far, oldest first.
    pub async fn sent(&self) -> Vec<SentMail> {
        self.outbox.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send_mail(
        &self,
        to: &Email,
        subject: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        self.outbox.lock().await.push(SentMail {
            to: to.clone(),
            subject: subject.to_owned(),
            html_body: html_body.to_owned(),
        });
        Ok(())
    }
}

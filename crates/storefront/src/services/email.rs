//! Transactional email.
//!
//! Uses SMTP via lettre for delivery with Askama text and HTML templates.
//! Without SMTP settings a [`LogMailer`] records messages in the log instead.

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;
use crate::services::auth::PasswordResetNotice;

/// HTML template for the password reset email.
#[derive(Template)]
#[template(path = "email/password_reset.html")]
struct PasswordResetHtml<'a> {
    name: &'a str,
    reset_url: &'a str,
}

/// Plain text template for the password reset email.
#[derive(Template)]
#[template(path = "email/password_reset.txt")]
struct PasswordResetText<'a> {
    name: &'a str,
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

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl OutgoingEmail {
    /// Render the password reset message for `notice`.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::Template` if rendering fails.
    pub fn password_reset(notice: &PasswordResetNotice, reset_url: &str) -> Result<Self, EmailError> {
        let name = notice.name.as_str();
        Ok(Self {
            to: notice.email.to_string(),
            subject: "Reset your BlossomCart password".to_owned(),
            text: PasswordResetText { name, reset_url }.render()?,
            html: PasswordResetHtml { name, reset_url }.render()?,
        })
    }
}

/// Delivers [`OutgoingEmail`]s.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send one message.
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError>;
}

/// SMTP delivery.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    /// Create a mailer from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_owned(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError> {
        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(email
                .to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(email.to.clone()))?)
            .subject(&email.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html),
                    ),
            )?;

        self.transport.send(message).await?;

        tracing::info!(to = %email.to, subject = %email.subject, "Email sent");
        Ok(())
    }
}

/// Writes messages to the log instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError> {
        // Never log the body: it can hold a live reset link.
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "SMTP not configured; email not sent"
        );
        Ok(())
    }
}

/// Deliver in the background. Failures are logged, never returned.
pub fn send_in_background(mailer: std::sync::Arc<dyn Mailer>, email: OutgoingEmail) {
    tokio::spawn(async move {
        let to = email.to.clone();
        if let Err(e) = mailer.send(email).await {
            tracing::error!(error = %e, to = %to, "Failed to send email");
        }
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn test_password_reset_renders_link() {
        let notice = PasswordResetNotice {
            email: blossom_core::Email::parse("ivy@blossom.test").unwrap(),
            name: "Ivy".to_owned(),
            token: "deadbeef".to_owned(),
            expires_at: Utc::now(),
        };
        let url = "https://blossomcart.shop/reset-password?token=deadbeef";

        let email = OutgoingEmail::password_reset(&notice, url).unwrap();
        assert_eq!(email.to, "ivy@blossom.test");
        assert!(email.text.contains("Hi Ivy"));
        assert!(email.text.contains(url));
        assert!(email.html.contains("Ivy"));
        assert!(email.html.contains("reset-password"));
    }

    #[derive(Clone, Default)]
    struct CapturedLog(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_log_mailer_keeps_reset_link_out_of_log() {
        let notice = PasswordResetNotice {
            email: blossom_core::Email::parse("ivy@blossom.test").unwrap(),
            name: "Ivy".to_owned(),
            token: "0a1b2c3d4e5f".to_owned(),
            expires_at: Utc::now(),
        };
        let email = OutgoingEmail::password_reset(
            &notice,
            "https://blossomcart.shop/reset-password?token=0a1b2c3d4e5f",
        )
        .unwrap();

        let captured = CapturedLog::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        LogMailer.send(email).await.unwrap();

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("ivy@blossom.test"));
        assert!(output.contains("Reset your BlossomCart password"));
        assert!(!output.contains("0a1b2c3d4e5f"));
    }
}

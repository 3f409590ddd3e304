//! Email service for password reset mail.
//!
//! Uses SMTP via lettre for delivery with Askama HTML and text templates.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

/// HTML template for the password reset email.
#[derive(Template)]
#[template(path = "email/password_reset.html")]
struct PasswordResetEmailHtml<'a> {
    name: &'a str,
    reset_url: &'a str,
}

/// Plain text template for the password reset email.
#[derive(Template)]
#[template(path = "email/password_reset.txt")]
struct PasswordResetEmailText<'a> {
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

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send the password reset link.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_password_reset(
        &self,
        to: &str,
        name: &str,
        reset_url: &str,
    ) -> Result<(), EmailError> {
        let html = PasswordResetEmailHtml { name, reset_url }.render()?;
        let text = PasswordResetEmailText { name, reset_url }.render()?;

        self.send_multipart_email(to, "Password Reset", &text, &html)
            .await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_password_reset_templates_include_link() {
        let reset_url = "https://delicious.test/account/reset/abc123";
        let html = PasswordResetEmailHtml {
            name: "Wes",
            reset_url,
        }
        .render()
        .unwrap();
        let text = PasswordResetEmailText {
            name: "Wes",
            reset_url,
        }
        .render()
        .unwrap();
        assert!(html.contains(reset_url));
        assert!(text.contains(reset_url));
        assert!(text.contains("Wes"));
    }
}

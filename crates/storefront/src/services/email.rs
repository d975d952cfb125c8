//! Delivery email service.
//!
//! Sends exactly one transactional email per completed order, listing
//! every purchased item with its viewer link. Uses SMTP via lettre with
//! Askama HTML and plain-text templates.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use paperstack_core::Email;
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

/// One granted item in the delivery email.
#[derive(Debug, Clone)]
pub struct DeliveryLink {
    pub name: String,
    pub link: String,
}

/// HTML template for the order delivery email.
#[derive(Template)]
#[template(path = "email/delivery.html")]
struct DeliveryEmailHtml<'a> {
    order_reference: &'a str,
    recipient: &'a str,
    links: &'a [DeliveryLink],
}

/// Plain text template for the order delivery email.
#[derive(Template)]
#[template(path = "email/delivery.txt")]
struct DeliveryEmailText<'a> {
    order_reference: &'a str,
    recipient: &'a str,
    links: &'a [DeliveryLink],
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

/// Email service for order delivery notifications.
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
    /// Returns error if the SMTP relay configuration is invalid.
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

    /// Send the delivery email for a completed order.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or a template fails to render.
    pub async fn send_delivery_email(
        &self,
        to: &Email,
        order_reference: &str,
        links: &[DeliveryLink],
    ) -> Result<(), EmailError> {
        let html = DeliveryEmailHtml {
            order_reference,
            recipient: to.as_str(),
            links,
        }
        .render()?;
        let text = DeliveryEmailText {
            order_reference,
            recipient: to.as_str(),
            links,
        }
        .render()?;

        self.send_multipart_email(to.as_str(), "Your digital downloads are ready", &text, &html)
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

    fn sample_links() -> Vec<DeliveryLink> {
        vec![
            DeliveryLink {
                name: "Atlas".to_string(),
                link: "https://drive.google.com/file/d/file-a/view".to_string(),
            },
            DeliveryLink {
                name: "Field Guide".to_string(),
                link: "https://drive.google.com/file/d/file-b/view".to_string(),
            },
        ]
    }

    #[test]
    fn test_html_template_lists_every_item() {
        let links = sample_links();
        let html = DeliveryEmailHtml {
            order_reference: "order-1700000000123",
            recipient: "buyer@example.com",
            links: &links,
        }
        .render()
        .unwrap();

        assert!(html.contains("order-1700000000123"));
        assert!(html.contains("buyer@example.com"));
        assert!(html.contains("Atlas"));
        assert!(html.contains("Field Guide"));
        assert!(html.contains("https://drive.google.com/file/d/file-b/view"));
    }

    #[test]
    fn test_text_template_lists_every_item() {
        let links = sample_links();
        let text = DeliveryEmailText {
            order_reference: "order-1700000000123",
            recipient: "buyer@example.com",
            links: &links,
        }
        .render()
        .unwrap();

        assert!(text.contains("order-1700000000123"));
        assert!(text.contains("Atlas"));
        assert!(text.contains("https://drive.google.com/file/d/file-a/view"));
    }
}

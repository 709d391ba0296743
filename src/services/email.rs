//! Email service for contact form submissions

use chrono::Local;
use lettre::{
    message::{header::ContentType, Mailbox, Message, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use serde::Deserialize;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
};

/// Contact form submission
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ContactMessage {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

impl ContactMessage {
    /// Trimmed copy; every field is required
    pub fn normalized(&self) -> AppResult<ContactMessage> {
        let trimmed = ContactMessage {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            subject: self.subject.trim().to_string(),
            message: self.message.trim().to_string(),
        };
        if trimmed.name.is_empty()
            || trimmed.email.is_empty()
            || trimmed.subject.is_empty()
            || trimmed.message.is_empty()
        {
            return Err(AppError::Validation("All fields are required.".to_string()));
        }
        Ok(trimmed)
    }

    fn subject_line(&self) -> String {
        format!("[PixelPast Contact] {}", self.subject)
    }

    fn body(&self, timestamp: &str) -> String {
        format!(
            r#"New contact form submission on {timestamp}

Name: {name}
Email: {email}
Subject: {subject}

Message:
{message}
"#,
            timestamp = timestamp,
            name = self.name,
            email = self.email,
            subject = self.subject,
            message = self.message
        )
    }
}

#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn is_configured(&self) -> bool {
        !self.config.smtp_host.trim().is_empty()
            && self.config.smtp_username.as_deref().is_some_and(|u| !u.is_empty())
            && self.config.smtp_password.as_deref().is_some_and(|p| !p.is_empty())
    }

    /// Forward a contact form submission to the configured recipient
    pub async fn send_contact(&self, message: &ContactMessage) -> AppResult<()> {
        let message = message.normalized()?;
        if !self.is_configured() {
            return Err(AppError::Internal("Email service not configured".to_string()));
        }

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let to = self.config.contact_to.clone();
        self.send_email(&to, &message.subject_line(), &message.body(&timestamp))
            .await?;
        tracing::info!(from = %message.email, "Contact message forwarded");
        Ok(())
    }

    /// Generic email sending function
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        let from_name = self
            .config
            .smtp_from_name
            .as_deref()
            .unwrap_or("PixelPast");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;

        let to_mailbox = Mailbox::from_str(to)
            .map_err(|e| AppError::Internal(format!("Invalid to address: {}", e)))?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(format!(
                                r#"<html><body><pre>{}</pre></body></html>"#,
                                escape_html(body)
                            )),
                    ),
            )
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        let mailer_builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer_builder = if let (Some(username), Some(password)) = (
            &self.config.smtp_username,
            &self.config.smtp_password,
        ) {
            mailer_builder.credentials(Credentials::new(
                username.clone(),
                password.clone(),
            ))
        } else {
            mailer_builder
        };

        let mailer = mailer_builder.build();

        // SMTP transport is blocking
        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::Internal(format!("Email task failed: {}", e)))?
            .map_err(|e| AppError::Internal(format!("Failed to send email: {}", e)))?;

        Ok(())
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact() -> ContactMessage {
        ContactMessage {
            name: "  Ana ".into(),
            email: "ana@example.org".into(),
            subject: " Group visit ".into(),
            message: "Do you offer school tours?".into(),
        }
    }

    #[test]
    fn test_normalized_trims_and_requires_fields() {
        let normalized = contact().normalized().unwrap();
        assert_eq!(normalized.name, "Ana");
        assert_eq!(normalized.subject_line(), "[PixelPast Contact] Group visit");

        let blank = ContactMessage {
            message: "   ".into(),
            ..contact()
        };
        assert!(matches!(blank.normalized(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_body_layout() {
        let body = contact().normalized().unwrap().body("2025-01-01 10:00:00");
        assert!(body.starts_with("New contact form submission on 2025-01-01 10:00:00"));
        assert!(body.contains("Email: ana@example.org"));
        assert!(body.ends_with("Do you offer school tours?\n"));
    }

    #[tokio::test]
    async fn test_unconfigured_smtp_fails() {
        let service = EmailService::new(EmailConfig::default());
        let result = service.send_contact(&contact()).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[tokio::test]
    async fn test_validation_precedes_configuration() {
        let service = EmailService::new(EmailConfig::default());
        let result = service.send_contact(&ContactMessage::default()).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}

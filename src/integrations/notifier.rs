// src/integrations/notifier.rs

use async_trait::async_trait;
use serde::Serialize;

use crate::error::AppError;

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn verification_code(email: &str, code: &str, ttl_seconds: u64) -> Self {
        Self {
            to: email.to_string(),
            subject: "Your verification code".to_string(),
            body: format!(
                "Your verification code is {}. It expires in {} minutes.",
                code,
                ttl_seconds / 60
            ),
        }
    }

    pub fn registration_credentials(email: &str, name: &str, registration_id: &str, secret: &str) -> Self {
        Self {
            to: email.to_string(),
            subject: "Registration successful".to_string(),
            body: format!(
                "Dear {},\n\nYour registration is complete.\nRegistration ID: {}\nPassword: {}\n\nKeep these details safe; you will need them to log in.",
                name, registration_id, secret
            ),
        }
    }
}

/// Outbound email/SMS channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), AppError>;
}

/// Writes notifications to the log. Used when no delivery channel is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: Notification) -> Result<(), AppError> {
        tracing::info!(
            to = %notification.to,
            subject = %notification.subject,
            "Notification (no delivery channel configured)"
        );
        Ok(())
    }
}

/// Posts notifications as JSON to a delivery webhook.
pub struct WebhookNotifier {
    url: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: Notification) -> Result<(), AppError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&notification)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Notification webhook unreachable: {}", e)))?;

        if !resp.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "Notification webhook returned {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

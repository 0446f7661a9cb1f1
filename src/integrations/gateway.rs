// src/integrations/gateway.rs

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use crate::{config::PaymentConfig, error::AppError, models::verification::PaymentOrder};

/// Order creation at the payment gateway. Settlement stays on the gateway side;
/// it reports back `order_id`, `payment_id` and a signature through the client.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// `amount` is in whole currency units.
    async fn create_order(&self, amount: i64, currency: &str) -> Result<PaymentOrder, AppError>;
}

/// Razorpay orders API over HTTP basic auth.
pub struct RazorpayGateway {
    api_base: String,
    key_id: String,
    key_secret: String,
    client: reqwest::Client,
}

impl RazorpayGateway {
    pub fn new(config: &PaymentConfig) -> Self {
        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    async fn create_order(&self, amount: i64, currency: &str) -> Result<PaymentOrder, AppError> {
        let receipt = format!("receipt_{}", Utc::now().timestamp_millis());

        let resp = self
            .client
            .post(format!("{}/orders", self.api_base))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&json!({
                "amount": amount * 100,
                "currency": currency,
                "receipt": receipt,
            }))
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Payment gateway unreachable: {}", e)))?;

        if !resp.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "Payment gateway rejected order: {}",
                resp.status()
            )));
        }

        resp.json::<PaymentOrder>()
            .await
            .map_err(|e| AppError::ExternalService(format!("Malformed gateway order: {}", e)))
    }
}

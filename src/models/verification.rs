// src/models/verification.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::category::Category;

#[derive(Debug, Deserialize, Validate)]
pub struct SendCodeRequest {
    #[validate(email(message = "Email is invalid."))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyCodeRequest {
    #[validate(email(message = "Email is invalid."))]
    pub email: String,
    #[validate(length(equal = 6, message = "Code must be 6 digits."))]
    pub otp: String,
}

/// Order is priced on the server from the category and add-on flag.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub category: Category,
    #[serde(default)]
    pub hard_copy: bool,
}

/// Gateway order as handed back to the checkout client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOrder {
    pub id: String,
    /// Smallest currency unit (paise for INR).
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
}

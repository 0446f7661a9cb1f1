// src/services/payment.rs

//! Gate in front of account creation: recompute the price, then check the
//! gateway's HMAC-SHA256 signature over `order_id|payment_id`.
//! Stateless; safe to call any number of times.

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{config::Pricing, error::AppError, models::category::Category};

type HmacSha256 = Hmac<Sha256>;

/// What the client claims it paid for.
#[derive(Debug, Clone)]
pub struct PaymentClaim<'a> {
    pub category: Category,
    pub hard_copy: bool,
    pub claimed_total: i64,
    pub order_id: &'a str,
    pub payment_id: &'a str,
    pub signature: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentRejection {
    AmountMismatch { expected: i64, claimed: i64 },
    SignatureMismatch,
}

impl fmt::Display for PaymentRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentRejection::AmountMismatch { expected, claimed } => write!(
                f,
                "Invalid payment amount: expected {}, got {}",
                expected, claimed
            ),
            PaymentRejection::SignatureMismatch => f.write_str("Invalid payment signature"),
        }
    }
}

impl From<PaymentRejection> for AppError {
    fn from(rejection: PaymentRejection) -> Self {
        AppError::Integrity(rejection.to_string())
    }
}

#[derive(Clone)]
pub struct PaymentVerifier {
    pricing: Pricing,
    secret: String,
}

impl PaymentVerifier {
    pub fn new(pricing: Pricing, secret: impl Into<String>) -> Self {
        Self {
            pricing,
            secret: secret.into(),
        }
    }

    pub fn expected_total(&self, category: Category, hard_copy: bool) -> i64 {
        self.pricing.expected_total(category, hard_copy)
    }

    fn mac(&self, order_id: &str, payment_id: &str) -> HmacSha256 {
        // HMAC accepts keys of any length
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(order_id.as_bytes());
        mac.update(b"|");
        mac.update(payment_id.as_bytes());
        mac
    }

    /// Lower-case hex signature the gateway would send for this pair.
    pub fn sign(&self, order_id: &str, payment_id: &str) -> String {
        hex::encode(self.mac(order_id, payment_id).finalize().into_bytes())
    }

    /// Amount first, then signature; both must pass.
    pub fn verify(&self, claim: &PaymentClaim<'_>) -> Result<(), PaymentRejection> {
        let expected = self.expected_total(claim.category, claim.hard_copy);
        if claim.claimed_total != expected {
            return Err(PaymentRejection::AmountMismatch {
                expected,
                claimed: claim.claimed_total,
            });
        }

        // only the canonical lower-case hex rendering is accepted
        let canonical = claim.signature.len() == 64
            && claim
                .signature
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        let bytes = match hex::decode(claim.signature) {
            Ok(bytes) if canonical => bytes,
            _ => return Err(PaymentRejection::SignatureMismatch),
        };

        self.mac(claim.order_id, claim.payment_id)
            .verify_slice(&bytes)
            .map_err(|_| PaymentRejection::SignatureMismatch)
    }
}

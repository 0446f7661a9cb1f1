// src/config.rs

use std::{env, path::PathBuf, str::FromStr};

use dotenvy::dotenv;

use crate::models::category::Category;

/// Registration identifier settings.
#[derive(Debug, Clone)]
pub struct RegistrationConfig {
    /// Prefix in front of the sequence number, e.g. `NFLO26` in `NFLO26-1001`.
    pub prefix: String,
    /// First sequence number handed out, also the floor for every allocation.
    pub start: u64,
    /// How many times a registration re-allocates after a duplicate id.
    pub max_attempts: u32,
}

/// Server-side price table. Amounts are whole currency units.
#[derive(Debug, Clone)]
pub struct Pricing {
    pub junior: i64,
    pub senior: i64,
    pub hard_copy_fee: i64,
}

impl Pricing {
    pub fn price(&self, category: Category) -> i64 {
        match category {
            Category::Junior => self.junior,
            Category::Senior => self.senior,
        }
    }

    pub fn expected_total(&self, category: Category, hard_copy: bool) -> i64 {
        self.price(category) + if hard_copy { self.hard_copy_fee } else { 0 }
    }
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub key_id: String,
    pub key_secret: String,
    pub currency: String,
    pub api_base: String,
}

/// Upload limits and locations.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub placeholder_photo: String,
    pub max_photo_bytes: usize,
    pub max_archive_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Absent means the in-memory store is used.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub port: u16,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub registration: RegistrationConfig,
    pub pricing: Pricing,
    pub payment: PaymentConfig,
    pub uploads: UploadConfig,
    pub ebook_path: PathBuf,
    pub verification_code_ttl: u64,
    pub exam_violation_limit: Option<u32>,
    pub notify_webhook_url: Option<String>,
    pub cors_origins: Vec<String>,
}

fn var_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = optional_var("DATABASE_URL");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let key_secret =
            env::var("RAZORPAY_KEY_SECRET").expect("RAZORPAY_KEY_SECRET must be set");

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173,http://localhost:8080".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            database_url,
            jwt_secret,
            jwt_expiration: var_or("JWT_EXPIRATION", 86_400),
            rust_log,
            port: var_or("PORT", 5000),
            admin_username: optional_var("ADMIN_USERNAME"),
            admin_password: optional_var("ADMIN_PASSWORD"),
            registration: RegistrationConfig {
                prefix: env::var("REGISTRATION_PREFIX").unwrap_or_else(|_| "NFLO26".to_string()),
                start: var_or("REGISTRATION_START", 1001),
                max_attempts: var_or("REGISTRATION_MAX_ATTEMPTS", 8),
            },
            pricing: Pricing {
                junior: var_or("PRICE_JUNIOR", 300),
                senior: var_or("PRICE_SENIOR", 500),
                hard_copy_fee: var_or("HARD_COPY_FEE", 300),
            },
            payment: PaymentConfig {
                key_id: env::var("RAZORPAY_KEY_ID").unwrap_or_default(),
                key_secret,
                currency: env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "INR".to_string()),
                api_base: env::var("RAZORPAY_API_BASE")
                    .unwrap_or_else(|_| "https://api.razorpay.com/v1".to_string()),
            },
            uploads: UploadConfig {
                dir: PathBuf::from(env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string())),
                placeholder_photo: env::var("PLACEHOLDER_PHOTO")
                    .unwrap_or_else(|_| "public/placeholder.svg".to_string()),
                max_photo_bytes: var_or("MAX_PHOTO_BYTES", 200 * 1024),
                max_archive_bytes: var_or("MAX_ARCHIVE_BYTES", 50 * 1024 * 1024),
            },
            ebook_path: PathBuf::from(
                env::var("EBOOK_PATH").unwrap_or_else(|_| "secure_docs/course-book.pdf".to_string()),
            ),
            verification_code_ttl: var_or("VERIFICATION_CODE_TTL", 600),
            exam_violation_limit: optional_var("EXAM_VIOLATION_LIMIT").and_then(|v| v.parse().ok()),
            notify_webhook_url: optional_var("NOTIFY_WEBHOOK_URL"),
            cors_origins,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_total_adds_hard_copy_fee() {
        let pricing = Pricing {
            junior: 300,
            senior: 500,
            hard_copy_fee: 300,
        };

        assert_eq!(pricing.expected_total(Category::Junior, false), 300);
        assert_eq!(pricing.expected_total(Category::Junior, true), 600);
        assert_eq!(pricing.expected_total(Category::Senior, false), 500);
        assert_eq!(pricing.expected_total(Category::Senior, true), 800);
    }
}

// src/models/participant.rs

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::category::Category;

pub static MOBILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9]{10,13}$").expect("valid mobile pattern"));

pub static PINCODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{6}$").expect("valid pincode pattern"));

/// A registered individual, keyed by `registration_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: i64,

    /// `PREFIX-<sequence>`, unique across the store.
    pub registration_id: String,

    /// Argon2 hash of the login secret.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub credential_hash: String,

    pub full_name: String,
    pub email: String,
    pub mobile: String,
    pub father_name: String,
    pub mother_name: String,
    pub address: String,
    pub city: String,
    pub pincode: String,
    pub school_name: Option<String>,
    pub course_name: String,
    pub category: Category,

    /// Whether the printed copy add-on was purchased.
    pub hard_copy: bool,
    pub total_paid: i64,
    pub transaction_reference: Option<String>,

    pub photo_reference: String,
    /// False while `photo_reference` still points at the placeholder.
    pub photo_uploaded: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload. The store assigns `id` and timestamps.
#[derive(Debug, Clone)]
pub struct NewParticipant {
    pub registration_id: String,
    pub credential_hash: String,
    pub full_name: String,
    pub email: String,
    pub mobile: String,
    pub father_name: String,
    pub mother_name: String,
    pub address: String,
    pub city: String,
    pub pincode: String,
    pub school_name: Option<String>,
    pub course_name: String,
    pub category: Category,
    pub hard_copy: bool,
    pub total_paid: i64,
    pub transaction_reference: Option<String>,
    pub photo_reference: String,
    pub photo_uploaded: bool,
}

/// Text fields of the multipart registration form.
#[derive(Debug, Default, Validate)]
pub struct RegistrationForm {
    #[validate(length(min = 1, max = 100, message = "Full name is required."))]
    pub full_name: String,
    #[validate(length(min = 1, max = 100, message = "Father's name is required."))]
    pub father_name: String,
    #[validate(length(min = 1, max = 100, message = "Mother's name is required."))]
    pub mother_name: String,
    #[validate(regex(path = *MOBILE_RE, message = "Mobile number is invalid."))]
    pub mobile: String,
    #[validate(email(message = "Email is invalid."))]
    pub email: String,
    #[validate(length(min = 1, max = 300))]
    pub address: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(regex(path = *PINCODE_RE, message = "Pincode must be 6 digits."))]
    pub pincode: String,
    #[validate(length(max = 200))]
    pub school_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub course_name: String,
    pub category: String,
    pub hard_copy: bool,
    pub total_price: i64,
    #[validate(length(min = 1, max = 100))]
    pub razorpay_order_id: String,
    #[validate(length(min = 1, max = 100))]
    pub razorpay_payment_id: String,
    #[validate(length(min = 1, max = 200))]
    pub razorpay_signature: String,
}

/// One row of an administrative bulk import. Only name and mobile are mandatory.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkParticipantRow {
    pub full_name: Option<String>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub father_name: Option<String>,
    pub mother_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub pincode: Option<String>,
    pub school_name: Option<String>,
    pub course_name: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub hard_copy: bool,
    pub total_paid: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct BulkRegisterRequest {
    pub students: Vec<BulkParticipantRow>,
}

/// Administrative field edit. Absent fields are left alone.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ParticipantUpdate {
    #[validate(length(min = 1, max = 100))]
    pub full_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(regex(path = *MOBILE_RE))]
    pub mobile: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub father_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub mother_name: Option<String>,
    #[validate(length(min = 1, max = 300))]
    pub address: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: Option<String>,
    #[validate(regex(path = *PINCODE_RE))]
    pub pincode: Option<String>,
    #[validate(length(max = 200))]
    pub school_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub course_name: Option<String>,
    pub category: Option<Category>,
    pub hard_copy: Option<bool>,
    /// Re-derive the login secret from the (possibly new) mobile number.
    #[serde(default)]
    pub reset_credential: bool,
}

/// Typed filter set for the participant listing.
/// Present predicates are AND-combined; `search` is an OR over the text columns.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParticipantQuery {
    pub search: Option<String>,
    pub category: Option<Category>,
    pub city: Option<String>,
    pub hard_copy: Option<bool>,
    #[serde(default)]
    pub pending_photo: bool,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ParticipantQuery {
    pub const DEFAULT_LIMIT: i64 = 10;
    pub const MAX_LIMIT: i64 = 100;

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    /// Never negative; absurd page numbers saturate and yield an empty page.
    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    /// In-process evaluation of the filter, used by the memory store.
    pub fn matches(&self, p: &Participant) -> bool {
        if let Some(term) = self.search_term() {
            let hit = [
                Some(p.full_name.as_str()),
                p.school_name.as_deref(),
                Some(p.email.as_str()),
                Some(p.mobile.as_str()),
                Some(p.registration_id.as_str()),
                Some(p.father_name.as_str()),
                Some(p.mother_name.as_str()),
                Some(p.city.as_str()),
                Some(p.pincode.as_str()),
                p.transaction_reference.as_deref(),
            ]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }

        if self.category.is_some_and(|c| c != p.category) {
            return false;
        }

        if let Some(city) = self.city.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            if !p.city.to_lowercase().contains(&city.to_lowercase()) {
                return false;
            }
        }

        if self.hard_copy.is_some_and(|h| h != p.hard_copy) {
            return false;
        }

        !(self.pending_photo && p.photo_uploaded)
    }

    /// Search term as a LIKE pattern with wildcards escaped.
    pub fn like_pattern(value: &str) -> String {
        let escaped = value
            .trim()
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        format!("%{}%", escaped)
    }
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub total: i64,
    pub total_pages: i64,
    pub current_page: i64,
}

#[derive(Debug, Serialize)]
pub struct ParticipantPage {
    pub participants: Vec<Participant>,
    pub pagination: Pagination,
}

impl ParticipantPage {
    pub fn new(participants: Vec<Participant>, total: i64, query: &ParticipantQuery) -> Self {
        let limit = query.limit();
        Self {
            participants,
            pagination: Pagination {
                total,
                total_pages: (total + limit - 1) / limit,
                current_page: query.page(),
            },
        }
    }
}

/// DTO for participant login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub registration_id: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

// src/models/audit.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of administrative mutations that get recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    BulkImport,
    UpdateUserDetails,
    UpdateUserPhoto,
    BulkPhotoUpload,
    DeleteUser,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::BulkImport => "BULK_IMPORT",
            AuditAction::UpdateUserDetails => "UPDATE_USER_DETAILS",
            AuditAction::UpdateUserPhoto => "UPDATE_USER_PHOTO",
            AuditAction::BulkPhotoUpload => "BULK_PHOTO_UPLOAD",
            AuditAction::DeleteUser => "DELETE_USER",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            AuditAction::BulkImport,
            AuditAction::UpdateUserDetails,
            AuditAction::UpdateUserPhoto,
            AuditAction::BulkPhotoUpload,
            AuditAction::DeleteUser,
        ]
        .into_iter()
        .find(|a| a.as_str() == s)
        .ok_or_else(|| format!("Unknown audit action '{}'", s))
    }
}

/// Append payload. Records are never updated once written.
#[derive(Debug, Clone)]
pub struct NewAuditRecord {
    pub admin_id: i64,
    pub action: AuditAction,
    pub target_registration_id: Option<String>,
    pub details: serde_json::Value,
    pub ip_address: Option<String>,
}

/// Stored record with the acting administrator resolved for display.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub id: i64,
    pub admin_id: i64,
    pub admin_name: Option<String>,
    pub action: AuditAction,
    pub target_registration_id: Option<String>,
    pub details: serde_json::Value,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

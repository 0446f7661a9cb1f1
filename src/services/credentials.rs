// src/services/credentials.rs

use crate::{error::AppError, utils::hash::hash_password};

/// A freshly derived login secret. `secret` goes out in the welcome
/// notification; only `hash` is persisted.
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    pub secret: String,
    pub hash: String,
}

/// The login secret is the participant's contact number as registered,
/// with whitespace removed.
pub fn derive_secret(mobile: &str) -> String {
    mobile.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Derives and hashes the secret off the async executor.
pub async fn issue(mobile: &str) -> Result<IssuedCredential, AppError> {
    let secret = derive_secret(mobile);
    if secret.is_empty() {
        return Err(AppError::BadRequest("Mobile number is required".to_string()));
    }

    let to_hash = secret.clone();
    let hash = tokio::task::spawn_blocking(move || hash_password(&to_hash))
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))??;

    Ok(IssuedCredential { secret, hash })
}

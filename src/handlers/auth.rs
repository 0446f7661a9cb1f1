// src/handlers/auth.rs

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::{admin::AdminLoginRequest, participant::LoginRequest},
    state::AppState,
    utils::{
        hash::verify_password_blocking,
        jwt::{ROLE_ADMIN, ROLE_PARTICIPANT, sign_jwt},
    },
};

fn invalid_credentials() -> AppError {
    AppError::AuthError("Invalid credentials".to_string())
}

/// Authenticates a participant with `{registration_id, password}` and returns a JWT.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let participant = state
        .store
        .find_participant_by_registration_id(payload.registration_id.trim())
        .await?
        .ok_or_else(invalid_credentials)?;

    let is_valid =
        verify_password_blocking(payload.password, participant.credential_hash.clone()).await?;
    if !is_valid {
        tracing::warn!(registration_id = %participant.registration_id, "Failed participant login");
        return Err(invalid_credentials());
    }

    let token = sign_jwt(
        participant.id,
        ROLE_PARTICIPANT,
        &state.config.jwt_secret,
        state.config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "success": true,
        "token": token,
        "type": "Bearer",
        "participant": participant,
    })))
}

/// Authenticates an administrator and returns a JWT with the admin role.
pub async fn admin_login(
    State(state): State<AppState>,
    Json(payload): Json<AdminLoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let admin = state
        .store
        .find_admin_by_username(payload.username.trim())
        .await?
        .ok_or_else(invalid_credentials)?;

    if !verify_password_blocking(payload.password, admin.password.clone()).await? {
        tracing::warn!(username = %admin.username, "Failed admin login");
        return Err(invalid_credentials());
    }

    let token = sign_jwt(
        admin.id,
        ROLE_ADMIN,
        &state.config.jwt_secret,
        state.config.jwt_expiration,
    )?;

    tracing::info!(admin_id = admin.id, "Admin logged in");
    Ok(Json(json!({
        "success": true,
        "token": token,
        "type": "Bearer",
        "admin": admin,
    })))
}

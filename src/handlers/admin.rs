// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::multipart::read_form,
    integrations::files::ArchiveEntry,
    models::{
        audit::{AuditAction, NewAuditRecord},
        category::Category,
        participant::{
            BulkParticipantRow, BulkRegisterRequest, NewParticipant, Participant,
            ParticipantPage, ParticipantQuery, ParticipantUpdate,
        },
    },
    services::{audit, credentials},
    state::AppState,
    utils::{client_addr::ClientAddr, jwt::Claims},
};

const AUDIT_PAGE: i64 = 50;
const AUDITED_ERRORS: usize = 5;

async fn find_participant(state: &AppState, registration_id: &str) -> Result<Participant, AppError> {
    state
        .store
        .find_participant_by_registration_id(registration_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Participant '{}' not found", registration_id)))
}

/// Paginated, filterable participant listing, newest first.
/// Admin only.
pub async fn list_participants(
    State(state): State<AppState>,
    Query(query): Query<ParticipantQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (participants, total) = state.store.list_participants(&query).await?;
    Ok(Json(ParticipantPage::new(participants, total, &query)))
}

/// Admin only.
pub async fn get_participant(
    State(state): State<AppState>,
    Path(registration_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let participant = find_participant(&state, &registration_id).await?;
    Ok(Json(json!({ "success": true, "participant": participant })))
}

/// One failed row or archive entry in a bulk report.
#[derive(Debug, Serialize)]
pub struct BulkFailure {
    pub row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_id: Option<String>,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct BulkRegisterReport {
    pub success: bool,
    pub message: String,
    pub created: usize,
    pub failed: usize,
    pub registration_ids: Vec<String>,
    pub failures: Vec<BulkFailure>,
}

fn or_default(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Checks one import row and fills in defaults. The registration id and
/// credential are added by the caller.
fn bulk_template(
    state: &AppState,
    row: BulkParticipantRow,
    transaction_reference: &str,
) -> Result<NewParticipant, String> {
    let full_name = row
        .full_name
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or("Full name is required")?;
    let mobile = row
        .mobile
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or("Mobile number is required")?;
    let category = match row.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(raw) => raw.parse::<Category>()?,
        None => Category::Junior,
    };
    let total_paid = row
        .total_paid
        .unwrap_or_else(|| state.config.pricing.expected_total(category, row.hard_copy));

    Ok(NewParticipant {
        registration_id: String::new(),
        credential_hash: String::new(),
        full_name,
        email: or_default(row.email, "").to_lowercase(),
        mobile,
        father_name: or_default(row.father_name, "Not Provided"),
        mother_name: or_default(row.mother_name, "Not Provided"),
        address: or_default(row.address, "Bulk Import"),
        city: or_default(row.city, "Unknown"),
        pincode: or_default(row.pincode, "000000"),
        school_name: Some(or_default(row.school_name, "External")),
        course_name: or_default(row.course_name, "Standard"),
        category,
        hard_copy: row.hard_copy,
        total_paid,
        transaction_reference: Some(transaction_reference.to_string()),
        photo_reference: state.config.uploads.placeholder_photo.clone(),
        photo_uploaded: false,
    })
}

/// Imports offline (cash) registrations.
///
/// Valid rows get a contiguous block of registration ids and are inserted one
/// by one; a duplicate id or bad row is reported and the rest carry on.
/// Admin only.
pub async fn bulk_register(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ClientAddr(ip_address): ClientAddr,
    Json(payload): Json<BulkRegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let admin_id = claims.subject_id()?;
    if payload.students.is_empty() {
        return Err(AppError::BadRequest("Invalid data. Array expected.".to_string()));
    }

    let transaction_reference = format!("CASH_BULK_{}", Utc::now().timestamp_millis());
    let mut failures = Vec::new();
    let mut accepted = Vec::new();
    for (index, row) in payload.students.into_iter().enumerate() {
        match bulk_template(&state, row, &transaction_reference) {
            Ok(template) => accepted.push((index + 1, template)),
            Err(error) => failures.push(BulkFailure {
                row: index + 1,
                registration_id: None,
                error,
            }),
        }
    }

    let latest = state.store.latest_registration_id().await?;
    let ids = state.allocator.block(latest.as_deref(), accepted.len());

    let mut rows = Vec::with_capacity(accepted.len());
    let mut batch = Vec::with_capacity(accepted.len());
    for ((row, mut template), registration_id) in accepted.into_iter().zip(ids) {
        template.credential_hash = credentials::issue(&template.mobile).await?.hash;
        template.registration_id = registration_id;
        rows.push((row, template.registration_id.clone()));
        batch.push(template);
    }

    let mut registration_ids = Vec::new();
    for ((row, registration_id), result) in rows.into_iter().zip(state.store.insert_participants(batch).await) {
        match result {
            Ok(participant) => registration_ids.push(participant.registration_id),
            Err(e) => {
                let error = if e.is_duplicate() {
                    "Registration id already exists".to_string()
                } else {
                    tracing::error!(row, error = %e, "Bulk import row failed");
                    "Could not be saved".to_string()
                };
                failures.push(BulkFailure {
                    row,
                    registration_id: Some(registration_id),
                    error,
                });
            }
        }
    }
    failures.sort_by_key(|f| f.row);

    if !registration_ids.is_empty() {
        audit::record(
            &*state.store,
            NewAuditRecord {
                admin_id,
                action: AuditAction::BulkImport,
                target_registration_id: None,
                details: json!({
                    "count": registration_ids.len(),
                    "firstId": registration_ids[0],
                    "failed": failures.len(),
                }),
                ip_address,
            },
        )
        .await;
    }

    tracing::info!(
        admin_id,
        created = registration_ids.len(),
        failed = failures.len(),
        "Bulk import processed"
    );

    let status = if registration_ids.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((
        status,
        Json(BulkRegisterReport {
            success: true,
            message: format!(
                "Processed. Created: {}, Failed: {}",
                registration_ids.len(),
                failures.len()
            ),
            created: registration_ids.len(),
            failed: failures.len(),
            registration_ids,
            failures,
        }),
    ))
}

/// Assigns photos from a zip archive named `<registration id>.<ext>`.
/// Admin only.
pub async fn bulk_upload_photos(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ClientAddr(ip_address): ClientAddr,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let admin_id = claims.subject_id()?;
    let form = read_form(multipart, "archive").await?;
    let archive = form
        .file
        .ok_or_else(|| AppError::BadRequest("No zip file provided".to_string()))?;

    let entries = state.photos.extract_archive(archive.data).await?;

    let mut updated = 0usize;
    let mut errors: Vec<String> = Vec::new();
    for entry in entries {
        if let Err(e) = state
            .photos
            .check_image(&entry.file_name, None, entry.data.len())
        {
            errors.push(format!("{}: {}", entry.file_name, rejection_text(e)));
            continue;
        }

        match assign_archive_photo(&state, &entry).await {
            Ok(true) => updated += 1,
            Ok(false) => errors.push(format!("User not found for file: {}", entry.file_name)),
            Err(e) => {
                tracing::error!(
                    file = %entry.file_name,
                    registration_id = %entry.registration_id,
                    error = %e,
                    "Bulk photo entry failed"
                );
                errors.push(format!("{}: {}", entry.file_name, rejection_text(e)));
            }
        }
    }

    audit::record(
        &*state.store,
        NewAuditRecord {
            admin_id,
            action: AuditAction::BulkPhotoUpload,
            target_registration_id: None,
            details: json!({
                "success": updated,
                "failed": errors.len(),
                "errors": errors.iter().take(AUDITED_ERRORS).collect::<Vec<_>>(),
            }),
            ip_address,
        },
    )
    .await;

    tracing::info!(admin_id, updated, skipped = errors.len(), "Bulk photo upload processed");
    Ok(Json(json!({
        "success": true,
        "message": format!("Processed. Updated: {}, Skipped: {}", updated, errors.len()),
        "updated": updated,
        "failed": errors.len(),
        "errors": errors,
    })))
}

/// Stores one archive photo on its participant. `Ok(false)` when no
/// participant has the entry's registration id.
async fn assign_archive_photo(state: &AppState, entry: &ArchiveEntry) -> Result<bool, AppError> {
    let Some(mut participant) = state
        .store
        .find_participant_by_registration_id(&entry.registration_id)
        .await?
    else {
        return Ok(false);
    };

    participant.photo_reference = state.photos.save(&entry.file_name, &entry.data).await?;
    participant.photo_uploaded = true;
    state.store.save_participant(&participant).await?;
    Ok(true)
}

fn rejection_text(err: AppError) -> String {
    match err {
        AppError::BadRequest(msg) => msg,
        other => other.to_string(),
    }
}

/// Edits participant fields. Only real changes are written and audited; the
/// registration id cannot be changed.
/// Admin only.
pub async fn update_participant(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ClientAddr(ip_address): ClientAddr,
    Path(registration_id): Path<String>,
    Json(payload): Json<ParticipantUpdate>,
) -> Result<impl IntoResponse, AppError> {
    let admin_id = claims.subject_id()?;
    payload.validate()?;

    let current = find_participant(&state, &registration_id).await?;

    let new_hash = if payload.reset_credential {
        let mobile = payload.mobile.as_deref().unwrap_or(&current.mobile);
        Some(credentials::issue(mobile).await?.hash)
    } else {
        None
    };

    let diff = audit::diff_participant(&current, &payload, new_hash);
    if diff.is_empty() {
        return Ok(Json(json!({
            "success": true,
            "message": "No changes",
            "participant": current,
        })));
    }

    let saved = state.store.save_participant(&diff.patched).await?;

    audit::record(
        &*state.store,
        NewAuditRecord {
            admin_id,
            action: AuditAction::UpdateUserDetails,
            target_registration_id: Some(saved.registration_id.clone()),
            details: serde_json::Value::Object(diff.changes),
            ip_address,
        },
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "message": "User updated successfully",
        "participant": saved,
    })))
}

/// Replaces a participant's photo.
/// Admin only.
pub async fn update_participant_photo(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ClientAddr(ip_address): ClientAddr,
    Path(registration_id): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let admin_id = claims.subject_id()?;
    let form = read_form(multipart, "photo").await?;
    let photo = form
        .file
        .ok_or_else(|| AppError::BadRequest("Photo is required.".to_string()))?;
    state
        .photos
        .check_image(&photo.file_name, photo.content_type.as_deref(), photo.data.len())?;

    let mut participant = find_participant(&state, &registration_id).await?;
    let old_photo = participant.photo_reference.clone();

    participant.photo_reference = state.photos.save(&photo.file_name, &photo.data).await?;
    participant.photo_uploaded = true;
    let saved = state.store.save_participant(&participant).await?;

    audit::record(
        &*state.store,
        NewAuditRecord {
            admin_id,
            action: AuditAction::UpdateUserPhoto,
            target_registration_id: Some(saved.registration_id.clone()),
            details: json!({ "oldPhoto": old_photo, "newPhoto": saved.photo_reference }),
            ip_address,
        },
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "message": "Photo updated successfully",
        "participant": saved,
    })))
}

/// Newest audit records with the acting administrator resolved.
/// Admin only.
pub async fn list_audit_logs(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let logs = state.store.list_audit_records(AUDIT_PAGE).await?;
    Ok(Json(json!({ "success": true, "logs": logs })))
}

// src/handlers/registration.rs

use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use rand::Rng;
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::multipart::{MultipartForm, read_form},
    integrations::notifier::Notification,
    models::{
        category::Category,
        participant::{NewParticipant, RegistrationForm},
        verification::{CreateOrderRequest, SendCodeRequest, VerifyCodeRequest},
    },
    services::{credentials, payment::PaymentClaim},
    state::AppState,
};

/// Emails a six-digit verification code, replacing any earlier one.
pub async fn send_otp(
    State(state): State<AppState>,
    Json(payload): Json<SendCodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let email = payload.email.trim().to_lowercase();

    let code = rand::thread_rng().gen_range(100_000..1_000_000).to_string();
    state.store.upsert_code(&email, &code).await?;

    state
        .notifier
        .send(Notification::verification_code(
            &email,
            &code,
            state.config.verification_code_ttl,
        ))
        .await?;

    tracing::info!(email = %email, "Verification code sent");
    Ok(Json(json!({ "success": true, "message": "OTP sent successfully" })))
}

pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyCodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let email = payload.email.trim().to_lowercase();

    let issued_at = state
        .store
        .find_code(&email, payload.otp.trim())
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid or expired OTP".to_string()))?;

    let age = Utc::now().signed_duration_since(issued_at).num_seconds();
    if age > state.config.verification_code_ttl as i64 {
        return Err(AppError::BadRequest("Invalid or expired OTP".to_string()));
    }

    Ok(Json(json!({ "success": true, "message": "Email verified successfully" })))
}

/// Creates a gateway order priced on the server, never from a client amount.
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    let amount = state
        .verifier
        .expected_total(payload.category, payload.hard_copy);

    let order = state
        .gateway
        .create_order(amount, &state.config.payment.currency)
        .await?;

    tracing::info!(order_id = %order.id, amount, category = %payload.category, "Payment order created");
    Ok(Json(json!({ "success": true, "order": order })))
}

fn registration_form(form: &MultipartForm) -> Result<RegistrationForm, AppError> {
    let total_price = form
        .text("total_price")
        .parse::<i64>()
        .map_err(|_| AppError::BadRequest("Total price must be a whole number.".to_string()))?;

    Ok(RegistrationForm {
        full_name: form.text("full_name"),
        father_name: form.text("father_name"),
        mother_name: form.text("mother_name"),
        mobile: form.text("mobile"),
        email: form.text("email"),
        address: form.text("address"),
        city: form.text("city"),
        pincode: form.text("pincode"),
        school_name: form.optional_text("school_name"),
        course_name: form.text("course_name"),
        category: form.text("category"),
        hard_copy: form.flag("hard_copy"),
        total_price,
        razorpay_order_id: form.text("razorpay_order_id"),
        razorpay_payment_id: form.text("razorpay_payment_id"),
        razorpay_signature: form.text("razorpay_signature"),
    })
}

/// Paid self-registration.
///
/// Amount and signature are checked before anything is written. The photo is
/// required. The registration id is allocated with retry against the store's
/// uniqueness constraint, and the credentials are mailed in the background.
pub async fn register(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_form(multipart, "photo").await?;
    let fields = registration_form(&form)?;
    fields.validate()?;

    let category: Category = fields.category.parse().map_err(AppError::BadRequest)?;

    state.verifier.verify(&PaymentClaim {
        category,
        hard_copy: fields.hard_copy,
        claimed_total: fields.total_price,
        order_id: &fields.razorpay_order_id,
        payment_id: &fields.razorpay_payment_id,
        signature: &fields.razorpay_signature,
    })?;

    let photo = form
        .file
        .as_ref()
        .ok_or_else(|| AppError::BadRequest("Photo is required.".to_string()))?;
    state
        .photos
        .check_image(&photo.file_name, photo.content_type.as_deref(), photo.data.len())?;
    let photo_reference = state.photos.save(&photo.file_name, &photo.data).await?;

    let credential = credentials::issue(&fields.mobile).await?;

    let template = NewParticipant {
        registration_id: String::new(),
        credential_hash: credential.hash,
        full_name: fields.full_name,
        email: fields.email.to_lowercase(),
        mobile: fields.mobile,
        father_name: fields.father_name,
        mother_name: fields.mother_name,
        address: fields.address,
        city: fields.city,
        pincode: fields.pincode,
        school_name: fields.school_name,
        course_name: fields.course_name,
        category,
        hard_copy: fields.hard_copy,
        total_paid: fields.total_price,
        transaction_reference: Some(fields.razorpay_payment_id),
        photo_reference,
        photo_uploaded: true,
    };

    let participant = state
        .allocator
        .insert_with_retry(&*state.store, template)
        .await?;

    tracing::info!(
        registration_id = %participant.registration_id,
        category = %participant.category,
        total_paid = participant.total_paid,
        "Participant registered"
    );

    let notifier = state.notifier.clone();
    let notification = Notification::registration_credentials(
        &participant.email,
        &participant.full_name,
        &participant.registration_id,
        &credential.secret,
    );
    let registration_id = participant.registration_id.clone();
    tokio::spawn(async move {
        if let Err(e) = notifier.send(notification).await {
            tracing::error!(
                registration_id = %registration_id,
                error = %e,
                "Credential delivery failed"
            );
        }
    });

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Registration and Payment successful!",
            "participant": participant,
        })),
    ))
}

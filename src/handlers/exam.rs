// src/handlers/exam.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        exam_session::{SubmitExamRequest, ViolationRequest},
        question::{CreateQuestionRequest, NewQuestion},
    },
    services::exam,
    state::AppState,
    utils::{html::clean_html, jwt::Claims},
};

/// Opens the caller's single exam session and returns the questions of their
/// category without answer keys.
pub async fn start_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let participant_id = claims.subject_id()?;
    let started = exam::start_exam(&*state.store, participant_id).await?;
    Ok(Json(started))
}

/// Grades the submitted answers and locks the session.
pub async fn submit_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let participant_id = claims.subject_id()?;
    let result = exam::submit_exam(&*state.store, participant_id, &req.answers).await?;
    Ok(Json(result))
}

/// Records a proctoring incident (tab switch, focus loss, ...).
pub async fn report_violation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ViolationRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let participant_id = claims.subject_id()?;
    let result = exam::record_violation(
        &*state.store,
        participant_id,
        req,
        state.config.exam_violation_limit,
    )
    .await?;
    Ok(Json(result))
}

/// Adds a question to a category pool.
/// Admin only.
pub async fn add_question(
    State(state): State<AppState>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let question = state
        .store
        .insert_question(NewQuestion {
            category: payload.category,
            text: clean_html(payload.text.trim()),
            options: payload.options,
            correct_option: payload.correct_option,
            marks: payload.marks,
        })
        .await?;

    tracing::info!(question_id = question.id, category = %question.category, "Question added");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": "Question added", "question": question })),
    ))
}

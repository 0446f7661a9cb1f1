// src/handlers/ebook.rs

use axum::{
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::{config::Config, error::AppError};

/// Streams the gated course book inline. Participants only.
pub async fn get_ebook(State(config): State<Config>) -> Result<impl IntoResponse, AppError> {
    let bytes = match tokio::fs::read(&config.ebook_path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound("eBook file not found on server.".to_string()));
        }
        Err(e) => return Err(AppError::InternalServerError(e.to_string())),
    };

    let file_name = config
        .ebook_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("course-book.pdf");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename={}", file_name),
        )
        .body(Body::from(bytes))
        .map_err(|e| AppError::InternalServerError(e.to_string()))
}

// src/handlers/multipart.rs

use std::collections::HashMap;

use axum::extract::Multipart;

use crate::error::AppError;

/// A file part held in memory.
#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Text fields by snake_case name, plus the file part called `file_field`.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub file: Option<UploadedFile>,
}

impl MultipartForm {
    pub fn text(&self, name: &str) -> String {
        self.fields
            .get(name)
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    }

    pub fn optional_text(&self, name: &str) -> Option<String> {
        Some(self.text(name)).filter(|v| !v.is_empty())
    }

    /// `true`, `1`, `yes` and `on` are true; anything else is false.
    pub fn flag(&self, name: &str) -> bool {
        matches!(
            self.text(name).to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        )
    }
}

/// `fullName` -> `full_name`; snake_case names pass through.
pub fn field_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            if !key.is_empty() {
                key.push('_');
            }
            key.push(c.to_ascii_lowercase());
        } else {
            key.push(c);
        }
    }
    key
}

/// Drains the multipart stream. The first part named `file_field` that
/// carries a file name is kept as the upload; other file parts are ignored.
pub async fn read_form(mut multipart: Multipart, file_field: &str) -> Result<MultipartForm, AppError> {
    let mut form = MultipartForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(field_key).unwrap_or_default();

        if let Some(file_name) = field.file_name().map(str::to_string) {
            let content_type = field.content_type().map(str::to_string);
            let data = field.bytes().await?;
            if name == file_field && form.file.is_none() {
                form.file = Some(UploadedFile {
                    file_name,
                    content_type,
                    data: data.to_vec(),
                });
            }
            continue;
        }

        let value = field.text().await?;
        form.fields.insert(name, value);
    }

    Ok(form)
}

// src/integrations/files.rs

use std::{
    io::{Cursor, Read},
    path::{Path, PathBuf},
};

use chrono::Utc;
use rand::Rng;

use crate::{config::UploadConfig, error::AppError};

const IMAGE_TYPES: [&str; 3] = ["image/jpeg", "image/jpg", "image/png"];
const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// One file taken out of a bulk photo archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Base name inside the archive, e.g. `NFLO26-1005.jpg`.
    pub file_name: String,
    /// File name up to the first `.`.
    pub registration_id: String,
    pub data: Vec<u8>,
}

/// Registration id encoded in an archive file name.
pub fn registration_id_from_file_name(file_name: &str) -> &str {
    file_name.split('.').next().unwrap_or(file_name)
}

fn extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// Strips any directory part a client may have put into a file name.
fn base_name(file_name: &str) -> &str {
    file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name)
}

/// Photo uploads on local disk, served back under `/uploads`.
#[derive(Debug, Clone)]
pub struct PhotoStorage {
    dir: PathBuf,
    max_photo_bytes: usize,
    max_archive_bytes: usize,
}

impl PhotoStorage {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            max_photo_bytes: config.max_photo_bytes,
            max_archive_bytes: config.max_archive_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// JPEG or PNG, by declared content type or else by extension, within the size limit.
    pub fn check_image(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        len: usize,
    ) -> Result<(), AppError> {
        let type_ok = match content_type {
            Some(ct) if ct != "application/octet-stream" => IMAGE_TYPES.contains(&ct),
            _ => extension(file_name).is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str())),
        };
        if !type_ok {
            return Err(AppError::BadRequest(
                "Only .jpeg, .jpg and .png formats allowed!".to_string(),
            ));
        }
        if len == 0 {
            return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
        }
        if len > self.max_photo_bytes {
            return Err(AppError::BadRequest(format!(
                "File is too large. Maximum size allowed is {}KB.",
                self.max_photo_bytes / 1024
            )));
        }
        Ok(())
    }

    /// Writes the photo as `<millis>-<random>-<name>` and returns the public
    /// reference. Same-named uploads in the same millisecond get distinct files.
    pub async fn save(&self, file_name: &str, data: &[u8]) -> Result<String, AppError> {
        let suffix: u32 = rand::thread_rng().r#gen();
        let stored = format!(
            "{}-{:08x}-{}",
            Utc::now().timestamp_millis(),
            suffix,
            base_name(file_name)
        );

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::InternalServerError(format!("Upload dir: {}", e)))?;
        tokio::fs::write(self.dir.join(&stored), data)
            .await
            .map_err(|e| AppError::InternalServerError(format!("Saving upload: {}", e)))?;

        tracing::debug!(file = %stored, bytes = data.len(), "Photo stored");
        Ok(format!("uploads/{}", stored))
    }

    /// Lists the files of a zip archive. Directories and `__MACOSX` metadata
    /// are skipped; entries larger than the photo limit are cut at the limit
    /// plus one byte so `check_image` rejects them.
    pub async fn extract_archive(&self, data: Vec<u8>) -> Result<Vec<ArchiveEntry>, AppError> {
        if data.len() > self.max_archive_bytes {
            return Err(AppError::BadRequest(format!(
                "Archive is too large. Maximum size allowed is {}MB.",
                self.max_archive_bytes / (1024 * 1024)
            )));
        }
        let limit = self.max_photo_bytes as u64 + 1;

        tokio::task::spawn_blocking(move || read_archive(&data, limit))
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?
    }
}

fn read_archive(data: &[u8], entry_limit: u64) -> Result<Vec<ArchiveEntry>, AppError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))
        .map_err(|e| AppError::BadRequest(format!("Invalid zip archive: {}", e)))?;

    let mut entries = Vec::new();
    for i in 0..archive.len() {
        let file = archive
            .by_index(i)
            .map_err(|e| AppError::BadRequest(format!("Unreadable zip entry: {}", e)))?;

        if file.is_dir() || file.name().starts_with("__MACOSX") {
            continue;
        }

        let file_name = base_name(file.name()).to_string();
        if file_name.is_empty() {
            continue;
        }

        let mut content = Vec::new();
        file.take(entry_limit)
            .read_to_end(&mut content)
            .map_err(|e| AppError::BadRequest(format!("Unreadable zip entry: {}", e)))?;

        entries.push(ArchiveEntry {
            registration_id: registration_id_from_file_name(&file_name).to_string(),
            file_name,
            data: content,
        });
    }
    Ok(entries)
}

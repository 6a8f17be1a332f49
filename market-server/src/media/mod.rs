//! Product image storage

use std::path::PathBuf;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use shared::error::{AppError, ErrorCode};
use thiserror::Error;

pub const MAX_IMAGES_PER_REQUEST: usize = 5;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("File is empty")]
    Empty,

    #[error("No filename provided")]
    NoFilename,

    #[error("File too large ({size} bytes, max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Too many files (max {max})")]
    TooManyFiles { max: usize },

    #[error("Failed to store file: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        let message = err.to_string();
        match err {
            MediaError::Empty => AppError::with_message(ErrorCode::EmptyFile, message),
            MediaError::NoFilename => AppError::with_message(ErrorCode::NoFilename, message),
            MediaError::TooLarge { size, max } => {
                AppError::with_message(ErrorCode::FileTooLarge, message)
                    .with_detail("size", size)
                    .with_detail("max", max)
            }
            MediaError::UnsupportedFormat(_) => {
                AppError::with_message(ErrorCode::UnsupportedFileFormat, message)
            }
            MediaError::TooManyFiles { .. } => AppError::with_message(ErrorCode::TooManyFiles, message),
            MediaError::Io(e) => {
                tracing::error!(error = %e, "Image write failed");
                AppError::with_message(ErrorCode::FileStorageFailed, message)
            }
        }
    }
}

/// Blob storage returning a public URL per object
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(
        &self,
        owner: &str,
        filename: &str,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<String, MediaError>;
}

/// Filesystem store served under `/uploads`
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    base_url: String,
    max_bytes: usize,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_bytes,
        }
    }
}

/// Image extension for an upload, from its declared type or its file name
fn image_extension(filename: &str, content_type: Option<&str>) -> Result<&'static str, MediaError> {
    let guessed = mime_guess::from_path(filename).first();
    let essence = match content_type.filter(|ct| ct.starts_with("image/")) {
        Some(ct) => ct.split(';').next().unwrap_or(ct).trim().to_string(),
        None => match &guessed {
            Some(m) if m.type_() == mime_guess::mime::IMAGE => m.essence_str().to_string(),
            _ => {
                return Err(MediaError::UnsupportedFormat(
                    content_type.unwrap_or(filename).to_string(),
                ));
            }
        },
    };
    match essence.as_str() {
        "image/jpeg" | "image/jpg" => Ok("jpg"),
        "image/png" => Ok("png"),
        "image/webp" => Ok("webp"),
        "image/gif" => Ok("gif"),
        "image/heic" => Ok("heic"),
        other => Err(MediaError::UnsupportedFormat(other.to_string())),
    }
}

/// Owner ids are email addresses; keep them path-safe
fn owner_dir(owner: &str) -> String {
    let safe: String = owner
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '@') { c } else { '_' })
        .collect();
    if safe.chars().all(|c| c == '.') {
        return "_".to_string();
    }
    safe
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(
        &self,
        owner: &str,
        filename: &str,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<String, MediaError> {
        if filename.trim().is_empty() {
            return Err(MediaError::NoFilename);
        }
        if bytes.is_empty() {
            return Err(MediaError::Empty);
        }
        if bytes.len() > self.max_bytes {
            return Err(MediaError::TooLarge {
                size: bytes.len(),
                max: self.max_bytes,
            });
        }
        let ext = image_extension(filename, content_type)?;

        let hash = hex::encode(Sha256::digest(bytes));
        let owner = owner_dir(owner);
        let relative = format!("products/{owner}/{hash}.{ext}");
        let path = self.root.join(&relative);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Content-addressed: an existing file already holds these bytes
        if !tokio::fs::try_exists(&path).await? {
            tokio::fs::write(&path, bytes).await?;
        }

        tracing::debug!(path = %path.display(), size = bytes.len(), "Image stored");
        Ok(format!("{}/uploads/{relative}", self.base_url))
    }
}

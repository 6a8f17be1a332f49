//! Image Upload Handlers

use axum::{
    extract::{Multipart, State, multipart::Field},
};
use serde::Serialize;

use crate::api::Json;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::media::{MAX_IMAGES_PER_REQUEST, MediaError};
use crate::utils::{AppError, AppResult, ErrorCode};

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub image_url: String,
}

#[derive(Debug, Serialize)]
pub struct UploadManyResponse {
    pub image_urls: Vec<String>,
}

struct Upload {
    filename: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

async fn read_field(field: Field<'_>) -> AppResult<Upload> {
    let filename = field.file_name().unwrap_or_default().to_string();
    let content_type = field.content_type().map(str::to_string);
    let bytes = field
        .bytes()
        .await
        .map_err(|e| AppError::validation(format!("Multipart error: {}", e)))?
        .to_vec();
    Ok(Upload {
        filename,
        content_type,
        bytes,
    })
}

/// Collect every file under `name`
async fn collect(multipart: &mut Multipart, name: &str, limit: usize) -> AppResult<Vec<Upload>> {
    let mut uploads = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Invalid multipart request: {}", e)))?
    {
        if field.name() != Some(name) {
            continue;
        }
        if uploads.len() == limit {
            return Err(MediaError::TooManyFiles { max: limit }.into());
        }
        uploads.push(read_field(field).await?);
    }
    if uploads.is_empty() {
        return Err(AppError::with_message(
            ErrorCode::NoFileProvided,
            format!("No '{name}' field found"),
        ));
    }
    Ok(uploads)
}

async fn store(state: &ServerState, owner: &str, upload: &Upload) -> AppResult<String> {
    let url = state
        .objects
        .put(
            owner,
            &upload.filename,
            upload.content_type.as_deref(),
            &upload.bytes,
        )
        .await?;
    tracing::info!(
        owner,
        original_name = %upload.filename,
        size = upload.bytes.len(),
        "Image uploaded"
    );
    Ok(url)
}

/// POST /api/upload/image - multipart field `image`
pub async fn upload_image(
    State(state): State<ServerState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let uploads = collect(&mut multipart, "image", 1).await?;
    let image_url = store(&state, &user.id, &uploads[0]).await?;
    Ok(Json(UploadResponse { image_url }))
}

/// POST /api/upload/images - multipart field `images`, at most 5
pub async fn upload_images(
    State(state): State<ServerState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Json<UploadManyResponse>> {
    let uploads = collect(&mut multipart, "images", MAX_IMAGES_PER_REQUEST).await?;
    let mut image_urls = Vec::with_capacity(uploads.len());
    for upload in &uploads {
        image_urls.push(store(&state, &user.id, upload).await?);
    }
    Ok(Json(UploadManyResponse { image_urls }))
}

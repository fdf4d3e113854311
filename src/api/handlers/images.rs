use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{ApiError, MessageBody};
use crate::auth::AuthUser;
use crate::pipeline::StagedUpload;
use crate::storage::models::ImageRecord;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImageItem {
    pub id: u64,
    pub path: String,
    pub thumbnail: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut staged: Option<StagedUpload> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("image") || staged.is_some() {
            // Ignore unknown fields and any extra images
            continue;
        }

        let mut writer = state.uploads.staging().begin(
            field.file_name().map(|s| s.to_string()),
            field.content_type().map(|s| s.to_string()),
        )?;

        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            writer.write_chunk(&chunk).await?;
        }

        staged = Some(writer.finish().await?);
    }

    let image = state.uploads.upload(user_id, staged).await?;

    Ok(Json(UploadResponse {
        message: "Image uploaded successfully".to_string(),
        image: image.image_path,
        thumbnail: image.thumbnail_path,
    }))
}

pub async fn get_images(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<Json<Vec<ImageItem>>, ApiError> {
    let images = state.uploads.list(user_id).await?;
    Ok(Json(images.into_iter().map(image_to_item).collect()))
}

pub async fn delete_image(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageBody>, ApiError> {
    // Non-numeric ids cannot match any image
    let id: u64 = id
        .parse()
        .map_err(|_| ApiError::not_found("Image not found"))?;

    state.uploads.delete(id, user_id).await?;

    Ok(MessageBody::json("Image deleted successfully"))
}

// ============================================================================
// Helpers
// ============================================================================

fn image_to_item(image: ImageRecord) -> ImageItem {
    ImageItem {
        id: image.id,
        path: image.image_path,
        thumbnail: image.thumbnail_path,
    }
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large(e.body_text())
    } else {
        ApiError::bad_request(format!("Invalid multipart data: {}", e.body_text()))
    }
}

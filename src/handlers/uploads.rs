use axum::{Json, extract::State};

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, Result},
    models::{PresignedUrlRequest, PresignedUrlResponse},
    storage::{image_object_key, is_image_content_type},
};

/// get_presigned_url
///
/// [Authenticated Route] Signs a direct-to-bucket upload for a post image. The returned
/// `resource_key` is what the client later submits as the post's `image` field.
#[utoipa::path(
    post,
    path = "/upload/presigned",
    request_body = PresignedUrlRequest,
    responses(
        (status = 200, description = "URL", body = PresignedUrlResponse),
        (status = 400, description = "Not an image type"),
        (status = 500, description = "Storage unavailable")
    )
)]
pub async fn get_presigned_url(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PresignedUrlRequest>,
) -> Result<Json<PresignedUrlResponse>> {
    if !is_image_content_type(&payload.file_type) {
        return Err(AppError::BadRequest(format!(
            "Only image uploads are allowed, got {}",
            payload.file_type
        )));
    }

    let object_key = image_object_key(&payload.filename);
    let upload_url = state
        .storage
        .get_presigned_upload_url(&object_key, &payload.file_type)
        .await
        .map_err(AppError::Storage)?;

    tracing::debug!(user_id = %user.id, key = %object_key, "Issued upload URL");

    Ok(Json(PresignedUrlResponse {
        upload_url,
        resource_key: object_key,
    }))
}

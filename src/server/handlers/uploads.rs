use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::auth::CurrentUser;
use crate::serializers::{UploadRequest, UploadResponse};
use crate::server::app::AppState;

/// Stores a `data:<mime>;base64,<payload>` image under `obs/`. Every
/// failure answers `400 {"error": "Request error"}`.
#[utoipa::path(
    post,
    path = "/api/upload",
    request_body = UploadRequest,
    responses(
        (status = 200, description = "Stored; returns the public URL", body = UploadResponse),
        (status = 400, description = "Request error")
    )
)]
pub async fn upload_image(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    body: Bytes,
) -> Response {
    let request: UploadRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            tracing::warn!("upload from user {} rejected: {}", user.id, err);
            return request_error();
        }
    };

    match state.media.save_upload(&request.image).await {
        Ok(url) => {
            tracing::info!("user {} uploaded {}", user.id, url);
            Json(UploadResponse { url }).into_response()
        }
        Err(err) => {
            tracing::warn!("upload from user {} failed: {}", user.id, err);
            request_error()
        }
    }
}

fn request_error() -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({"error": "Request error"}))).into_response()
}

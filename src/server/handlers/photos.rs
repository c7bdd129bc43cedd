use axum::{extract::State, http::StatusCode, response::Json};

use crate::auth::{Actor, CurrentUser};
use crate::errors::CoreError;
use crate::serializers::{PhotoRead, PhotoWrite};
use crate::server::app::AppState;
use crate::server::middleware::ValidatedJson;
use crate::services::PhotoService;

#[utoipa::path(
    post,
    path = "/api/photos",
    request_body = PhotoWrite,
    responses(
        (status = 201, description = "Photo attached", body = PhotoRead),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Not the owner of the observation"),
        (status = 503, description = "Observation does not exist")
    )
)]
pub async fn add_photo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(draft): ValidatedJson<PhotoWrite>,
) -> Result<(StatusCode, Json<PhotoRead>), CoreError> {
    tracing::info!(
        "photo posted by user {} ({}, {}) for observation {}",
        user.id,
        user.name,
        user.username,
        draft.survey_data
    );
    let photo = PhotoService::new(state.db.clone(), state.media.clone())
        .add(&Actor::from(&user), draft)
        .await?;
    Ok((StatusCode::CREATED, Json(photo)))
}

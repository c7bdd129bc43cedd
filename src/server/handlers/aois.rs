use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

use crate::auth::{Actor, CurrentUser};
use crate::errors::CoreError;
use crate::serializers::{SurveyDataRead, SurveyDataWrite};
use crate::server::app::AppState;
use crate::server::middleware::ValidatedJson;
use crate::services::{AoiService, SurveyService};

#[utoipa::path(
    delete,
    path = "/api/aois/{id}",
    params(("id" = i32, Path, description = "AOI id")),
    responses(
        (status = 204, description = "AOI and its observations deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "AOI not found")
    )
)]
pub async fn delete_aoi(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, CoreError> {
    AoiService::new(state.db.clone())
        .delete(&Actor::from(&user), id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/aois/{id}/observations",
    params(("id" = i32, Path, description = "AOI id")),
    request_body = SurveyDataWrite,
    responses(
        (status = 201, description = "Observation created", body = SurveyDataRead),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Not the owner of the AOI"),
        (status = 404, description = "AOI not found")
    )
)]
pub async fn create_observation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(aoi_id): Path<i32>,
    ValidatedJson(draft): ValidatedJson<SurveyDataWrite>,
) -> Result<(StatusCode, Json<SurveyDataRead>), CoreError> {
    tracing::info!(
        "observation posted by user {} ({}, {}) for aoi {}",
        user.id,
        user.name,
        user.username,
        aoi_id
    );
    let created = SurveyService::new(state.db.clone())
        .create(&Actor::from(&user), aoi_id, draft)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

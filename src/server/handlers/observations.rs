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
use crate::services::SurveyService;

#[utoipa::path(
    get,
    path = "/api/observations/{id}",
    params(("id" = i32, Path, description = "Observation id")),
    responses(
        (status = 200, description = "Observation with its photos", body = SurveyDataRead),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Observation not found")
    )
)]
pub async fn get_observation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<SurveyDataRead>, CoreError> {
    let survey = SurveyService::new(state.db.clone())
        .get(&Actor::from(&user), id)
        .await?;
    Ok(Json(survey))
}

/// `images`, when present, lists the photo keys to keep.
#[utoipa::path(
    put,
    path = "/api/observations/{id}",
    params(("id" = i32, Path, description = "Observation id")),
    request_body = SurveyDataWrite,
    responses(
        (status = 200, description = "Observation updated", body = SurveyDataRead),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Observation not found")
    )
)]
pub async fn update_observation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
    ValidatedJson(draft): ValidatedJson<SurveyDataWrite>,
) -> Result<Json<SurveyDataRead>, CoreError> {
    let survey = SurveyService::new(state.db.clone())
        .update(&Actor::from(&user), id, draft)
        .await?;
    Ok(Json(survey))
}

#[utoipa::path(
    delete,
    path = "/api/observations/{id}",
    params(("id" = i32, Path, description = "Observation id")),
    responses(
        (status = 204, description = "Observation and its photos deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Observation not found")
    )
)]
pub async fn delete_observation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, CoreError> {
    SurveyService::new(state.db.clone())
        .delete(&Actor::from(&user), id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

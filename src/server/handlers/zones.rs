use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

use crate::auth::{Actor, CurrentUser};
use crate::errors::CoreError;
use crate::serializers::{AoiRead, AoiWrite, GeographicalZoneRead};
use crate::server::app::AppState;
use crate::server::middleware::ValidatedJson;
use crate::services::{AoiService, ZoneService};

#[utoipa::path(
    get,
    path = "/api/gz",
    responses(
        (status = 200, description = "Zones granted to the user's groups", body = [GeographicalZoneRead]),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_zones(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<GeographicalZoneRead>>, CoreError> {
    let zones = ZoneService::new(state.db.clone())
        .zones_for_user(user.id)
        .await?;
    Ok(Json(zones.into_iter().map(GeographicalZoneRead::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/gz/{gz}/aois",
    params(("gz" = i32, Path, description = "Geographical zone id")),
    responses(
        (status = 200, description = "The user's AOIs in the zone with their observations", body = [AoiRead]),
        (status = 403, description = "Zone not granted to the user"),
        (status = 404, description = "Zone not found")
    )
)]
pub async fn list_aois(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(zone_id): Path<i32>,
) -> Result<Json<Vec<AoiRead>>, CoreError> {
    let aois = AoiService::new(state.db.clone())
        .list_for_zone(&Actor::from(&user), zone_id)
        .await?;
    Ok(Json(aois))
}

#[utoipa::path(
    post,
    path = "/api/gz/{gz}/aois",
    params(("gz" = i32, Path, description = "Geographical zone id")),
    request_body = AoiWrite,
    responses(
        (status = 201, description = "AOI created", body = AoiRead),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Zone not granted to the user"),
        (status = 404, description = "Zone not found")
    )
)]
pub async fn create_aoi(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(zone_id): Path<i32>,
    ValidatedJson(draft): ValidatedJson<AoiWrite>,
) -> Result<(StatusCode, Json<AoiRead>), CoreError> {
    let aoi = AoiService::new(state.db.clone())
        .create(&Actor::from(&user), zone_id, draft)
        .await?;
    Ok((StatusCode::CREATED, Json(aoi)))
}

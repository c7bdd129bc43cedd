use axum::{extract::State, response::Json};

use crate::auth::CurrentUser;
use crate::errors::CoreError;
use crate::serializers::LookupRead;
use crate::server::app::AppState;
use crate::services::LookupService;

#[utoipa::path(
    get,
    path = "/api/species",
    responses((status = 200, description = "Tree species", body = [LookupRead]))
)]
pub async fn list_species(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<LookupRead>>, CoreError> {
    Ok(Json(LookupService::new(state.db.clone()).species().await?))
}

#[utoipa::path(
    get,
    path = "/api/crowns",
    responses((status = 200, description = "Crown diameter classes", body = [LookupRead]))
)]
pub async fn list_crowns(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<LookupRead>>, CoreError> {
    Ok(Json(LookupService::new(state.db.clone()).crowns().await?))
}

#[utoipa::path(
    get,
    path = "/api/canopies",
    responses((status = 200, description = "Canopy statuses", body = [LookupRead]))
)]
pub async fn list_canopies(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<LookupRead>>, CoreError> {
    Ok(Json(LookupService::new(state.db.clone()).canopies().await?))
}

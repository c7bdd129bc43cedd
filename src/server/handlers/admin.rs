use axum::{
    extract::{Path, Query, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        StatusCode,
    },
    response::{IntoResponse, Json},
};
use serde_json::Value;

use crate::admin::{ActionRequest, ActionResult, ListPage, ListParams, SiteIndex};
use crate::auth::StaffUser;
use crate::errors::CoreError;
use crate::export::ExportFormat;
use crate::server::app::AppState;
use crate::services::{ExportSelection, ExportService};

#[utoipa::path(
    get,
    path = "/admin/api",
    responses(
        (status = 200, description = "Site labels and registered models", body = SiteIndex),
        (status = 403, description = "Not staff")
    )
)]
pub async fn index(State(state): State<AppState>, _staff: StaffUser) -> Json<SiteIndex> {
    Json(state.admin.index())
}

#[utoipa::path(
    get,
    path = "/admin/api/{model}",
    params(
        ("model" = String, Path, description = "Registered model name"),
        ("q" = Option<String>, Query, description = "Search over the model's search fields"),
        ("page" = Option<u64>, Query, description = "1-based page"),
        ("per_page" = Option<u64>, Query, description = "Rows per page")
    ),
    responses(
        (status = 200, description = "One page of list rows"),
        (status = 404, description = "Unknown model")
    )
)]
pub async fn list(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(model): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListPage>, CoreError> {
    Ok(Json(state.admin.list(&state.db, &model, &params).await?))
}

#[utoipa::path(
    post,
    path = "/admin/api/{model}",
    params(("model" = String, Path, description = "Registered model name")),
    responses(
        (status = 201, description = "Record created"),
        (status = 400, description = "Invalid payload")
    )
)]
pub async fn create(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Path(model): Path<String>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<Value>), CoreError> {
    let created = state
        .admin
        .resource(&model)?
        .create(&state.db, payload)
        .await?;
    tracing::debug!("{} added a {}", staff.email, model);
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/admin/api/{model}/{id}",
    params(
        ("model" = String, Path, description = "Registered model name"),
        ("id" = i32, Path, description = "Record id")
    ),
    responses(
        (status = 200, description = "Record with its inlines"),
        (status = 404, description = "Unknown model or record")
    )
)]
pub async fn detail(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path((model, id)): Path<(String, i32)>,
) -> Result<Json<Value>, CoreError> {
    Ok(Json(state.admin.detail(&state.db, &model, id).await?))
}

#[utoipa::path(
    put,
    path = "/admin/api/{model}/{id}",
    params(
        ("model" = String, Path, description = "Registered model name"),
        ("id" = i32, Path, description = "Record id")
    ),
    responses(
        (status = 200, description = "Record updated"),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Unknown model or record")
    )
)]
pub async fn update(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path((model, id)): Path<(String, i32)>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, CoreError> {
    let updated = state
        .admin
        .resource(&model)?
        .update(&state.db, id, payload)
        .await?;
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/admin/api/{model}/{id}",
    params(
        ("model" = String, Path, description = "Registered model name"),
        ("id" = i32, Path, description = "Record id")
    ),
    responses(
        (status = 204, description = "Record deleted"),
        (status = 404, description = "Unknown model or record")
    )
)]
pub async fn remove(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path((model, id)): Path<(String, i32)>,
) -> Result<StatusCode, CoreError> {
    state.admin.resource(&model)?.delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/admin/api/{model}/actions/{action}",
    params(
        ("model" = String, Path, description = "Registered model name"),
        ("action" = String, Path, description = "Action name, e.g. delete_selected")
    ),
    request_body = ActionRequest,
    responses(
        (status = 200, description = "Action outcome", body = ActionResult),
        (status = 404, description = "Unknown model or action")
    )
)]
pub async fn run_action(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path((model, action)): Path<(String, String)>,
    Json(request): Json<ActionRequest>,
) -> Result<Json<ActionResult>, CoreError> {
    let result = state
        .admin
        .run_action(&state.db, &model, &action, &request.ids)
        .await?;
    Ok(Json(result))
}

/// Downloads the selected observations as csv, geojson, gpkg or shp.
#[utoipa::path(
    post,
    path = "/admin/api/{model}/export/{format}",
    params(
        ("model" = String, Path, description = "Only survey_data can be exported"),
        ("format" = String, Path, description = "csv, geojson, gpkg or shp")
    ),
    request_body = ExportSelection,
    responses(
        (status = 200, description = "Export file as an attachment"),
        (status = 400, description = "Unsupported format"),
        (status = 404, description = "Model cannot be exported")
    )
)]
pub async fn export(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Path((model, format)): Path<(String, String)>,
    selection: Option<Json<ExportSelection>>,
) -> Result<impl IntoResponse, CoreError> {
    let selection = selection.map(|Json(s)| s).unwrap_or_default();
    let exportable = state
        .admin
        .resource(&model)?
        .admin()
        .action_names
        .iter()
        .any(|name| name == "export");
    if !exportable {
        return Err(CoreError::not_found("export for model", model));
    }

    let format: ExportFormat = format
        .parse()
        .map_err(|e: crate::export::ExportError| CoreError::field("format", e.to_string()))?;
    let file = ExportService::new(state.db.clone())
        .export_surveys(&selection, format)
        .await?;
    tracing::info!("{} exported {}", staff.email, file.file_name());

    let disposition = format!("attachment; filename=\"{}\"", file.file_name());
    Ok((
        [
            (CONTENT_TYPE, file.content_type().to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    ))
}

use axum::response::Json;
use utoipa::OpenApi;

use super::handlers;
use crate::admin::{ActionRequest, ActionResult, ModelInfo, SiteIndex};
use crate::serializers::{
    AoiRead, AoiWrite, CountryRead, CredentialsRequest, GeographicalZoneRead, LookupRead,
    PhotoRead, PhotoWrite, PositionDto, SurveyDataRead, SurveyDataWrite, TokenRequest,
    TokenResponse, UploadRequest, UploadResponse, UserRead,
};
use crate::services::ExportSelection;

#[derive(OpenApi)]
#[openapi(
    info(title = "Treechecker API", description = "Tree canopy survey backend"),
    paths(
        handlers::health::health_check,
        handlers::auth::obtain_token,
        handlers::auth::refresh_token,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::users::current_user,
        handlers::zones::list_zones,
        handlers::zones::list_aois,
        handlers::zones::create_aoi,
        handlers::aois::delete_aoi,
        handlers::aois::create_observation,
        handlers::observations::get_observation,
        handlers::observations::update_observation,
        handlers::observations::delete_observation,
        handlers::photos::add_photo,
        handlers::lookups::list_species,
        handlers::lookups::list_crowns,
        handlers::lookups::list_canopies,
        handlers::uploads::upload_image,
        handlers::admin::index,
        handlers::admin::list,
        handlers::admin::create,
        handlers::admin::detail,
        handlers::admin::update,
        handlers::admin::remove,
        handlers::admin::run_action,
        handlers::admin::export,
    ),
    components(schemas(
        AoiRead,
        AoiWrite,
        CountryRead,
        CredentialsRequest,
        GeographicalZoneRead,
        LookupRead,
        PhotoRead,
        PhotoWrite,
        PositionDto,
        SurveyDataRead,
        SurveyDataWrite,
        TokenRequest,
        TokenResponse,
        UploadRequest,
        UploadResponse,
        UserRead,
        ActionRequest,
        ActionResult,
        ModelInfo,
        SiteIndex,
        ExportSelection,
    )),
    tags(
        (name = "treechecker", description = "Surveys, zones and areas of interest")
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_api_and_admin_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/gz/{gz}/aois"));
        assert!(doc.paths.paths.contains_key("/admin/api/{model}/export/{format}"));
    }
}

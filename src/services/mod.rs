pub mod aoi_service;
pub mod auth_service;
pub mod authorization;
pub mod export_service;
pub mod lookup_service;
pub mod media_storage;
pub mod photo_service;
pub mod survey_service;
pub mod user_service;
pub mod zone_service;

pub use aoi_service::AoiService;
pub use auth_service::AuthService;
pub use authorization::{ensure_owner, find_owned, Owned};
pub use export_service::{ExportSelection, ExportService};
pub use lookup_service::LookupService;
pub use media_storage::{MediaError, MediaStorage};
pub use photo_service::PhotoService;
pub use survey_service::SurveyService;
pub use user_service::UserService;
pub use zone_service::ZoneService;

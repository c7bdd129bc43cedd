use std::sync::Arc;

use anyhow::Result;
use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use sea_orm::DatabaseConnection;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::handlers::{admin, aois, auth, health, lookups, observations, photos, uploads, users, zones};
use super::middleware::{authenticate_or_throttle, AnonThrottle};
use super::openapi;
use crate::admin::AdminSite;
use crate::auth::JwtCodec;
use crate::config::{ConfigError, Settings};
use crate::services::MediaStorage;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub settings: Arc<Settings>,
    pub jwt: Arc<JwtCodec>,
    pub media: MediaStorage,
    pub admin: Arc<AdminSite>,
    /// `None` when anonymous throttling is switched off.
    pub throttle: Option<Arc<AnonThrottle>>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, settings: Settings) -> Result<Self, ConfigError> {
        let throttle = if settings.throttle.enabled {
            Some(Arc::new(AnonThrottle::new(settings.anon_rate()?)))
        } else {
            None
        };

        Ok(Self {
            db,
            jwt: Arc::new(JwtCodec::new(&settings.jwt)),
            media: MediaStorage::new(&settings.media.root, settings.media.url.clone()),
            admin: Arc::new(AdminSite::treechecker(settings.admin.clone(), settings.bcrypt_cost)),
            throttle,
            settings: Arc::new(settings),
        })
    }
}

pub fn create_app(state: AppState) -> Result<Router> {
    let cors = match state.settings.server.cors_origin.as_deref() {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<axum::http::HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let auth_layer = middleware::from_fn_with_state(state.clone(), authenticate_or_throttle);
    let media = ServeDir::new(state.media.root());

    let app = Router::new()
        // Health check endpoint
        .route("/health", get(health::health_check))
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
        .nest_service("/media", media)
        .nest("/api", api_routes().layer(auth_layer.clone()))
        .nest("/admin/api", admin_routes().layer(auth_layer))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state);

    Ok(app)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/token", post(auth::obtain_token))
        .route("/token/refresh", post(auth::refresh_token))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/user", get(users::current_user))
        .route("/gz", get(zones::list_zones))
        .route("/gz/:gz/aois", get(zones::list_aois).post(zones::create_aoi))
        .route("/aois/:id", delete(aois::delete_aoi))
        .route("/aois/:id/observations", post(aois::create_observation))
        .route(
            "/observations/:id",
            get(observations::get_observation)
                .put(observations::update_observation)
                .delete(observations::delete_observation),
        )
        .route("/photos", post(photos::add_photo))
        .route("/species", get(lookups::list_species))
        .route("/crowns", get(lookups::list_crowns))
        .route("/canopies", get(lookups::list_canopies))
        .route("/upload", post(uploads::upload_image))
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::index))
        .route("/:model", get(admin::list).post(admin::create))
        .route(
            "/:model/:id",
            get(admin::detail).put(admin::update).delete(admin::remove),
        )
        .route("/:model/actions/:action", post(admin::run_action))
        .route("/:model/export/:format", post(admin::export))
}

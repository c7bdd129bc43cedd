//! API integration tests
//!
//! Drives the REST and admin endpoints through the full router: auth
//! layer, throttle, extractors and services on a migrated SQLite file.

use anyhow::Result;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, EntityTrait, Set};
use serde_json::{json, Value};
use tempfile::{NamedTempFile, TempDir};

use treechecker::config::Settings;
use treechecker::database::entities::{
    aois, canopy_statuses, geographical_zones, ggz, groups, photos, survey_data, user_groups,
    users,
};
use treechecker::database::setup_database;
use treechecker::server::{create_app, AppState};

struct TestApp {
    server: TestServer,
    state: AppState,
    db: DatabaseConnection,
    _db_file: NamedTempFile,
    _media: TempDir,
}

fn test_settings(media: &TempDir) -> Settings {
    let mut settings = Settings::default();
    settings.bcrypt_cost = 4;
    settings.jwt.secret = "integration-secret".to_string();
    settings.media.root = media.path().to_path_buf();
    settings.throttle.enabled = false;
    settings
}

async fn setup_test_app(configure: impl FnOnce(&mut Settings)) -> Result<TestApp> {
    let db_file = NamedTempFile::new()?;
    let media = TempDir::new()?;
    let db_url = format!("sqlite://{}?mode=rwc", db_file.path().display());

    let db = Database::connect(&db_url).await?;
    setup_database(&db).await?;

    let mut settings = test_settings(&media);
    configure(&mut settings);
    let state = AppState::new(db.clone(), settings)?;
    let server = TestServer::new(create_app(state.clone())?)?;

    Ok(TestApp {
        server,
        state,
        db,
        _db_file: db_file,
        _media: media,
    })
}

async fn insert_user(db: &DatabaseConnection, username: &str, staff: bool) -> Result<users::Model> {
    let mut user = users::ActiveModel::new();
    user.email = Set(format!("{}@example.org", username));
    user.username = Set(username.to_string());
    user.name = Set(username.to_uppercase());
    user.password = Set(bcrypt::hash("password123", 4)?);
    user.is_staff = Set(staff);
    Ok(user.insert(db).await?)
}

async fn insert_zone(db: &DatabaseConnection, name: &str) -> Result<geographical_zones::Model> {
    Ok(geographical_zones::ActiveModel {
        name: Set(name.to_string()),
        country_id: Set(None),
        wms_url: Set("https://example.org/wms".to_string()),
        x_min: Set(8.0),
        x_max: Set(9.0),
        y_min: Set(45.0),
        y_max: Set(46.0),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

/// Puts `user` in a fresh group that is granted `zone`.
async fn grant(db: &DatabaseConnection, user: &users::Model, zone: &geographical_zones::Model) -> Result<()> {
    let group = groups::ActiveModel {
        name: Set(format!("{}-{}", user.username, zone.name)),
        ..Default::default()
    }
    .insert(db)
    .await?;
    user_groups::ActiveModel {
        user_id: Set(user.id),
        group_id: Set(group.id),
        ..Default::default()
    }
    .insert(db)
    .await?;
    ggz::ActiveModel {
        group_id: Set(group.id),
        geographical_zone_id: Set(zone.id),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(())
}

async fn insert_canopy_status(db: &DatabaseConnection, name: &str) -> Result<canopy_statuses::Model> {
    Ok(canopy_statuses::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

async fn login(app: &TestApp, username: &str) -> HeaderValue {
    let response = app
        .server
        .post("/api/token")
        .json(&json!({"email": format!("{}@example.org", username), "password": "password123"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    let token = body["token"].as_str().unwrap_or_default();
    HeaderValue::from_str(&format!("JWT {}", token)).unwrap()
}

fn authorization() -> HeaderName {
    HeaderName::from_static("authorization")
}

/// Creates an AOI in `zone` and one observation in it through the API.
async fn create_aoi_with_observation(app: &TestApp, auth: &HeaderValue, zone_id: i32, status_id: i32) -> (i64, i64) {
    let response = app
        .server
        .post(&format!("/api/gz/{}/aois", zone_id))
        .add_header(authorization(), auth.clone())
        .json(&json!({"name": "Plot A", "bbox": [8.1, 8.2, 45.1, 45.2]}))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let aoi: Value = response.json();
    let aoi_id = aoi["key"].as_i64().unwrap();

    let response = app
        .server
        .post(&format!("/api/aois/{}/observations", aoi_id))
        .add_header(authorization(), auth.clone())
        .json(&json!({
            "name": "Oak by the road",
            "tree_specie": "Quercus robur",
            "canopy_status": status_id,
            "comment": "leaning",
            "position": {"latitude": 45.15, "longitude": 8.15}
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let survey: Value = response.json();
    (aoi_id, survey["key"].as_i64().unwrap())
}

#[tokio::test]
async fn test_health_endpoint() -> Result<()> {
    let app = setup_test_app(|_| {}).await?;

    let response = app.server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["service"], "treechecker");
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
    Ok(())
}

#[tokio::test]
async fn test_anonymous_requests_are_rejected() -> Result<()> {
    let app = setup_test_app(|_| {}).await?;

    let response = app.server.get("/api/gz").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = app
        .server
        .post("/api/token")
        .json(&json!({"email": "nobody@example.org", "password": "wrong"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_zone_visibility_follows_group_grants() -> Result<()> {
    let app = setup_test_app(|_| {}).await?;
    let ana = insert_user(&app.db, "ana", false).await?;
    let north = insert_zone(&app.db, "North").await?;
    let south = insert_zone(&app.db, "South").await?;
    grant(&app.db, &ana, &north).await?;
    let auth = login(&app, "ana").await;

    let response = app.server.get("/api/gz").add_header(authorization(), auth.clone()).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let zones: Vec<Value> = response.json();
    assert_eq!(zones.len(), 1);
    assert_eq!(zones[0]["key"], north.id);
    assert_eq!(zones[0]["bbox"], json!([45.0, 8.0, 46.0, 9.0]));

    let response = app
        .server
        .get(&format!("/api/gz/{}/aois", south.id))
        .add_header(authorization(), auth.clone())
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = app
        .server
        .get("/api/gz/9999/aois")
        .add_header(authorization(), auth)
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_observations_are_owner_only() -> Result<()> {
    let app = setup_test_app(|_| {}).await?;
    let ana = insert_user(&app.db, "ana", false).await?;
    let bob = insert_user(&app.db, "bob", false).await?;
    let zone = insert_zone(&app.db, "North").await?;
    grant(&app.db, &ana, &zone).await?;
    grant(&app.db, &bob, &zone).await?;
    let status = insert_canopy_status(&app.db, "Healthy").await?;

    let ana_auth = login(&app, "ana").await;
    let bob_auth = login(&app, "bob").await;
    let (aoi_id, survey_id) = create_aoi_with_observation(&app, &ana_auth, zone.id, status.id).await;

    let response = app
        .server
        .get(&format!("/api/observations/{}", survey_id))
        .add_header(authorization(), ana_auth.clone())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let survey: Value = response.json();
    assert_eq!(survey["owner"], ana.id);
    assert_eq!(survey["aoi"], aoi_id);

    let response = app
        .server
        .get(&format!("/api/observations/{}", survey_id))
        .add_header(authorization(), bob_auth.clone())
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = app
        .server
        .put(&format!("/api/observations/{}", survey_id))
        .add_header(authorization(), bob_auth.clone())
        .json(&json!({
            "name": "Mine now",
            "canopy_status": status.id,
            "longitude": 8.15,
            "latitude": 45.15
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = app
        .server
        .delete(&format!("/api/aois/{}", aoi_id))
        .add_header(authorization(), bob_auth)
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = app
        .server
        .get("/api/observations/424242")
        .add_header(authorization(), ana_auth)
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_observation_requires_valid_canopy_status() -> Result<()> {
    let app = setup_test_app(|_| {}).await?;
    let ana = insert_user(&app.db, "ana", false).await?;
    let zone = insert_zone(&app.db, "North").await?;
    grant(&app.db, &ana, &zone).await?;
    let status = insert_canopy_status(&app.db, "Healthy").await?;
    let auth = login(&app, "ana").await;
    let (aoi_id, _) = create_aoi_with_observation(&app, &auth, zone.id, status.id).await;

    let observation = |canopy_status: Value| {
        json!({
            "name": "Birch",
            "canopy_status": canopy_status,
            "longitude": 8.16,
            "latitude": 45.16
        })
    };

    let response = app
        .server
        .post(&format!("/api/aois/{}/observations", aoi_id))
        .add_header(authorization(), auth.clone())
        .json(&observation(Value::Null))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let errors: Value = response.json();
    assert!(errors.get("canopy_status").is_some());

    let response = app
        .server
        .post(&format!("/api/aois/{}/observations", aoi_id))
        .add_header(authorization(), auth)
        .json(&observation(json!(9999)))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_deleting_aoi_cascades() -> Result<()> {
    let app = setup_test_app(|_| {}).await?;
    let ana = insert_user(&app.db, "ana", false).await?;
    let zone = insert_zone(&app.db, "North").await?;
    grant(&app.db, &ana, &zone).await?;
    let status = insert_canopy_status(&app.db, "Healthy").await?;
    let auth = login(&app, "ana").await;
    let (aoi_id, survey_id) = create_aoi_with_observation(&app, &auth, zone.id, status.id).await;

    let response = app
        .server
        .post("/api/photos")
        .add_header(authorization(), auth.clone())
        .json(&json!({"survey_data": survey_id, "compass": 90.0, "image": "aGVsbG8="}))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    assert_eq!(photos::Entity::find().all(&app.db).await?.len(), 1);

    let response = app
        .server
        .delete(&format!("/api/aois/{}", aoi_id))
        .add_header(authorization(), auth)
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);

    assert!(aois::Entity::find_by_id(aoi_id as i32).one(&app.db).await?.is_none());
    assert!(survey_data::Entity::find().all(&app.db).await?.is_empty());
    assert!(photos::Entity::find().all(&app.db).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_anonymous_throttle() -> Result<()> {
    let app = setup_test_app(|settings| {
        settings.throttle.enabled = true;
        settings.throttle.anon_rate = "2/min".to_string();
    })
    .await?;
    let client = HeaderName::from_static("x-forwarded-for");

    for _ in 0..2 {
        let response = app
            .server
            .get("/api/gz")
            .add_header(client.clone(), HeaderValue::from_static("10.0.0.1"))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    let response = app
        .server
        .get("/api/gz")
        .add_header(client.clone(), HeaderValue::from_static("10.0.0.1"))
        .await;
    assert_eq!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);
    let body: Value = response.json();
    let message = body["message"].as_str().unwrap_or_default();
    assert!(message.starts_with("The maximum number of failed login attempts has been reached."));
    assert!(response.headers().contains_key("retry-after"));

    // Another client has its own budget
    let response = app
        .server
        .get("/api/gz")
        .add_header(client, HeaderValue::from_static("10.0.0.2"))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_authenticated_users_are_not_throttled() -> Result<()> {
    let app = setup_test_app(|settings| {
        settings.throttle.enabled = true;
        settings.throttle.anon_rate = "1/min".to_string();
    })
    .await?;
    insert_user(&app.db, "ana", false).await?;
    // The token request itself is the one anonymous request allowed
    let auth = login(&app, "ana").await;

    for _ in 0..3 {
        let response = app.server.get("/api/user").add_header(authorization(), auth.clone()).await;
        assert_eq!(response.status_code(), StatusCode::OK);
    }
    Ok(())
}

#[tokio::test]
async fn test_token_expiry_and_refresh() -> Result<()> {
    let app = setup_test_app(|settings| {
        settings.jwt.expiration_secs = 300;
        settings.jwt.refresh_expiration_secs = 3600;
    })
    .await?;
    let ana = insert_user(&app.db, "ana", false).await?;

    let fresh = app.state.jwt.issue(&ana)?;
    let response = app.server.post("/api/token/refresh").json(&json!({"token": fresh})).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert!(body["token"].is_string());

    let now = Utc::now().timestamp();
    let expired = app.state.jwt.issue_at(&ana, now - 600)?;
    let response = app
        .server
        .get("/api/user")
        .add_header(authorization(), HeaderValue::from_str(&format!("JWT {}", expired))?)
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["detail"], "Signature has expired.");

    // Still valid, but the original login is past the refresh window
    let mut stale = app.state.jwt.decode(&fresh)?;
    stale.orig_iat = now - 7200;
    let stale = app.state.jwt.encode(&stale)?;
    let response = app.server.post("/api/token/refresh").json(&json!({"token": stale})).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["non_field_errors"][0], "Refresh has expired.");
    Ok(())
}

#[tokio::test]
async fn test_session_login_and_logout() -> Result<()> {
    let app = setup_test_app(|_| {}).await?;
    insert_user(&app.db, "ana", false).await?;

    let response = app
        .server
        .post("/api/login")
        .json(&json!({"email": "ana@example.org", "password": "password123"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let cookie = response
        .headers()
        .get("set-cookie")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
        .unwrap_or_default();
    assert!(cookie.starts_with("sessionid="));
    let cookie = HeaderValue::from_str(&cookie)?;

    let response = app
        .server
        .get("/api/user")
        .add_header(HeaderName::from_static("cookie"), cookie.clone())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let profile: Value = response.json();
    assert_eq!(profile["username"], "ana");

    let response = app
        .server
        .post("/api/logout")
        .add_header(HeaderName::from_static("cookie"), cookie.clone())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = app
        .server
        .get("/api/user")
        .add_header(HeaderName::from_static("cookie"), cookie)
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_admin_requires_staff() -> Result<()> {
    let app = setup_test_app(|_| {}).await?;
    insert_user(&app.db, "ana", false).await?;
    insert_user(&app.db, "root", true).await?;

    let response = app.server.get("/admin/api").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let auth = login(&app, "ana").await;
    let response = app.server.get("/admin/api").add_header(authorization(), auth).await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let auth = login(&app, "root").await;
    let response = app.server.get("/admin/api").add_header(authorization(), auth.clone()).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let index: Value = response.json();
    assert_eq!(index["site_header"], "Treechecker");

    insert_canopy_status(&app.db, "Healthy").await?;
    let response = app
        .server
        .post("/admin/api/canopy_status")
        .add_header(authorization(), auth.clone())
        .json(&json!({"name": "Dead"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let created: Value = response.json();

    let response = app
        .server
        .get("/admin/api/canopy_status")
        .add_query_param("q", "dea")
        .add_header(authorization(), auth.clone())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let page: Value = response.json();
    assert_eq!(page["count"], 1);
    assert_eq!(page["results"][0]["pk"], created["pk"]);

    let response = app
        .server
        .get("/admin/api/canopy_status")
        .add_header(authorization(), auth.clone())
        .await;
    let page: Value = response.json();
    assert_eq!(page["count"], 2);

    let response = app
        .server
        .post("/admin/api/canopy_status/actions/delete_selected")
        .add_header(authorization(), auth)
        .json(&json!({"ids": [created["pk"]]}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let result: Value = response.json();
    assert_eq!(result["affected_count"], 1);
    Ok(())
}

#[tokio::test]
async fn test_admin_exports_surveys() -> Result<()> {
    let app = setup_test_app(|_| {}).await?;
    let ana = insert_user(&app.db, "ana", false).await?;
    insert_user(&app.db, "root", true).await?;
    let zone = insert_zone(&app.db, "North").await?;
    grant(&app.db, &ana, &zone).await?;
    let status = insert_canopy_status(&app.db, "Healthy").await?;
    let ana_auth = login(&app, "ana").await;
    let (_, survey_id) = create_aoi_with_observation(&app, &ana_auth, zone.id, status.id).await;
    let auth = login(&app, "root").await;

    let response = app
        .server
        .post("/admin/api/survey_data/export/csv")
        .add_header(authorization(), auth.clone())
        .json(&json!({"ids": [survey_id]}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let disposition = response
        .headers()
        .get("content-disposition")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.contains("survey_data.csv"));

    let csv = response.text();
    let mut reader = csv::Reader::from_reader(csv.as_bytes());
    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    assert_eq!(headers[..2], ["id", "name"]);
    let records: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>()?;
    assert_eq!(records.len(), 1);
    assert_eq!(&records[0][1], "Oak by the road");
    assert!(records[0].iter().any(|value| value == "Quercus robur"));
    assert!(records[0].iter().any(|value| value == "Healthy"));

    let response = app
        .server
        .post("/admin/api/survey_data/export/geojson")
        .add_header(authorization(), auth.clone())
        .json(&json!({}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let collection: Value = serde_json::from_str(&response.text())?;
    let features = collection["features"].as_array().cloned().unwrap_or_default();
    assert_eq!(features.len(), 1);
    assert_eq!(features[0]["geometry"]["coordinates"], json!([8.15, 45.15]));
    assert_eq!(features[0]["properties"]["name"], "Oak by the road");

    let response = app
        .server
        .post("/admin/api/survey_data/export/xlsx")
        .add_header(authorization(), auth.clone())
        .json(&json!({}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = app
        .server
        .post("/admin/api/country/export/csv")
        .add_header(authorization(), auth)
        .json(&json!({}))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_lookup_lists() -> Result<()> {
    let app = setup_test_app(|_| {}).await?;
    insert_user(&app.db, "ana", false).await?;
    let healthy = insert_canopy_status(&app.db, "Healthy").await?;
    let dead = insert_canopy_status(&app.db, "Dead").await?;

    let response = app.server.get("/api/canopies").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let auth = login(&app, "ana").await;
    let response = app.server.get("/api/canopies").add_header(authorization(), auth.clone()).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let canopies: Value = response.json();
    assert_eq!(
        canopies,
        json!([
            {"key": healthy.id, "name": "Healthy"},
            {"key": dead.id, "name": "Dead"}
        ])
    );

    let response = app.server.get("/api/species").add_header(authorization(), auth.clone()).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let species: Vec<Value> = response.json();
    assert!(species.is_empty());

    let response = app.server.get("/api/crowns").add_header(authorization(), auth).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_upload_image() -> Result<()> {
    let app = setup_test_app(|_| {}).await?;
    insert_user(&app.db, "ana", false).await?;
    let auth = login(&app, "ana").await;

    let response = app
        .server
        .post("/api/upload")
        .add_header(authorization(), auth.clone())
        .json(&json!({"image": "data:image/png;base64,aGVsbG8="}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    let url = body["url"].as_str().unwrap_or_default().to_string();
    assert!(url.starts_with("/media/obs/"));
    assert!(url.ends_with(".png"));

    let response = app.server.get(&url).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), "hello");

    for bad in [
        json!({"image": "not a data url"}),
        json!({"image": "data:image/png;base64,%%%"}),
        json!({"picture": "data:image/png;base64,aGVsbG8="}),
    ] {
        let response = app
            .server
            .post("/api/upload")
            .add_header(authorization(), auth.clone())
            .json(&bad)
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body, json!({"error": "Request error"}));
    }
    Ok(())
}

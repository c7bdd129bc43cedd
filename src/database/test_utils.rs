use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use tempfile::NamedTempFile;

use super::entities::{
    aois, canopy_statuses, geographical_zones, ggz, groups, photos, survey_data, user_groups,
    users,
};

/// Fresh migrated SQLite database backed by a temporary file. Keep the
/// returned file alive for as long as the connection is used.
pub async fn setup_test_db() -> (DatabaseConnection, NamedTempFile) {
    let temp_file = NamedTempFile::new().expect("Failed to create temp database file");
    let db_url = format!("sqlite://{}?mode=rwc", temp_file.path().display());

    let db = Database::connect(&db_url)
        .await
        .expect("Failed to connect to test database");

    super::setup_database(&db)
        .await
        .expect("Failed to run migrations");

    (db, temp_file)
}

/// Active user `<username>@example.org` with password `password123`.
pub async fn create_user(db: &DatabaseConnection, username: &str) -> users::Model {
    let mut user = users::ActiveModel::new();
    user.email = Set(format!("{}@example.org", username));
    user.username = Set(username.to_string());
    user.name = Set(username.to_uppercase());
    user.password = Set(bcrypt::hash("password123", 4).expect("hash"));
    user.insert(db).await.expect("insert user")
}

pub async fn create_group(db: &DatabaseConnection, name: &str) -> groups::Model {
    groups::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert group")
}

pub async fn add_to_group(db: &DatabaseConnection, user_id: i32, group_id: i32) {
    user_groups::ActiveModel {
        user_id: Set(user_id),
        group_id: Set(group_id),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert membership");
}

pub async fn create_zone(db: &DatabaseConnection, name: &str) -> geographical_zones::Model {
    geographical_zones::ActiveModel {
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
    .await
    .expect("insert zone")
}

pub async fn grant_zone(db: &DatabaseConnection, group_id: i32, zone_id: i32) {
    ggz::ActiveModel {
        group_id: Set(group_id),
        geographical_zone_id: Set(zone_id),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert grant");
}

pub async fn create_aoi(db: &DatabaseConnection, zone_id: i32, owner_id: Option<i32>) -> aois::Model {
    aois::ActiveModel {
        name: Set("Plot".to_string()),
        x_min: Set(8.1),
        x_max: Set(8.2),
        y_min: Set(45.1),
        y_max: Set(45.2),
        owner_id: Set(owner_id),
        geographical_zone_id: Set(zone_id),
        creation_date: Set(chrono::Utc::now()),
        is_deleted: Set(false),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert aoi")
}

pub async fn create_canopy_status(db: &DatabaseConnection, name: &str) -> canopy_statuses::Model {
    canopy_statuses::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert canopy status")
}

pub async fn create_survey(
    db: &DatabaseConnection,
    aoi_id: i32,
    canopy_status_id: i32,
    owner_id: Option<i32>,
) -> survey_data::Model {
    let now = chrono::Utc::now();
    survey_data::ActiveModel {
        name: Set("Oak by the road".to_string()),
        tree_specie_id: Set(None),
        crown_diameter_id: Set(None),
        canopy_status_id: Set(canopy_status_id),
        comment: Set(Some("leaning".to_string())),
        owner_id: Set(owner_id),
        aoi_id: Set(aoi_id),
        longitude: Set(8.15),
        latitude: Set(45.15),
        creation_date: Set(now),
        update_date: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert survey")
}

pub async fn create_photo(db: &DatabaseConnection, survey_data_id: i32) -> photos::Model {
    photos::ActiveModel {
        survey_data_id: Set(survey_data_id),
        compass: Set(Some(90.0)),
        comment: Set(None),
        image: Set("aGVsbG8=".to_string()),
        img: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert photo")
}

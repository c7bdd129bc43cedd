//! Minimal OGC GeoPackage writer: one point feature table in EPSG:4326.
//!
//! The package is built as a SQLite file inside a temporary directory,
//! read back into memory and removed together with the directory.

use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, Statement,
    TransactionTrait, Value,
};

use super::{ExportError, SurveyRow, LAYER_NAME};

/// `GPKG` in ASCII.
pub const GPKG_APPLICATION_ID: u32 = 0x4750_4B47;
pub const GPKG_USER_VERSION: u32 = 10200;
const WGS84_SRS_ID: i32 = 4326;

const WGS84_WKT: &str = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]]"#;

pub async fn render(rows: &[SurveyRow]) -> Result<Vec<u8>, ExportError> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join(format!("{}.gpkg", LAYER_NAME));

    let mut options = ConnectOptions::new(format!("sqlite://{}?mode=rwc", path.display()));
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await?;

    let written = write_package(&db, rows).await;
    db.close().await?;
    written?;

    Ok(tokio::fs::read(&path).await?)
}

async fn write_package(db: &DatabaseConnection, rows: &[SurveyRow]) -> Result<(), ExportError> {
    db.execute_unprepared("PRAGMA journal_mode = DELETE").await?;
    db.execute_unprepared(&format!("PRAGMA application_id = {}", GPKG_APPLICATION_ID))
        .await?;
    db.execute_unprepared(&format!("PRAGMA user_version = {}", GPKG_USER_VERSION))
        .await?;

    db.execute_unprepared(
        "CREATE TABLE gpkg_spatial_ref_sys (
            srs_name TEXT NOT NULL,
            srs_id INTEGER NOT NULL PRIMARY KEY,
            organization TEXT NOT NULL,
            organization_coordsys_id INTEGER NOT NULL,
            definition TEXT NOT NULL,
            description TEXT
        )",
    )
    .await?;
    db.execute_unprepared(
        "CREATE TABLE gpkg_contents (
            table_name TEXT NOT NULL PRIMARY KEY,
            data_type TEXT NOT NULL,
            identifier TEXT UNIQUE,
            description TEXT DEFAULT '',
            last_change DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
            min_x DOUBLE,
            min_y DOUBLE,
            max_x DOUBLE,
            max_y DOUBLE,
            srs_id INTEGER,
            CONSTRAINT fk_gc_r_srs_id FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
        )",
    )
    .await?;
    db.execute_unprepared(
        "CREATE TABLE gpkg_geometry_columns (
            table_name TEXT NOT NULL,
            column_name TEXT NOT NULL,
            geometry_type_name TEXT NOT NULL,
            srs_id INTEGER NOT NULL,
            z TINYINT NOT NULL,
            m TINYINT NOT NULL,
            CONSTRAINT pk_geom_cols PRIMARY KEY (table_name, column_name),
            CONSTRAINT fk_gc_tn FOREIGN KEY (table_name) REFERENCES gpkg_contents(table_name),
            CONSTRAINT fk_gc_srs FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
        )",
    )
    .await?;
    db.execute_unprepared(&format!(
        "CREATE TABLE {} (
            fid INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            geom POINT,
            id INTEGER,
            name TEXT,
            tree_specie TEXT,
            crown_diameter TEXT,
            canopy_status TEXT,
            comment TEXT,
            owner TEXT,
            aoi TEXT,
            longitude DOUBLE,
            latitude DOUBLE,
            creation_date TEXT,
            update_date TEXT
        )",
        LAYER_NAME
    ))
    .await?;

    let txn = db.begin().await?;

    let srs_rows: [(&str, i32, &str, i32, &str); 3] = [
        ("Undefined cartesian SRS", -1, "NONE", -1, "undefined"),
        ("Undefined geographic SRS", 0, "NONE", 0, "undefined"),
        ("WGS 84 geodetic", WGS84_SRS_ID, "EPSG", WGS84_SRS_ID, WGS84_WKT),
    ];
    for (name, id, org, org_id, definition) in srs_rows {
        txn.execute(statement(
            "INSERT INTO gpkg_spatial_ref_sys
                (srs_name, srs_id, organization, organization_coordsys_id, definition)
             VALUES (?, ?, ?, ?, ?)",
            vec![name.into(), id.into(), org.into(), org_id.into(), definition.into()],
        ))
        .await?;
    }

    let extent = extent(rows);
    txn.execute(statement(
        "INSERT INTO gpkg_contents
            (table_name, data_type, identifier, min_x, min_y, max_x, max_y, srs_id)
         VALUES (?, 'features', ?, ?, ?, ?, ?, ?)",
        vec![
            LAYER_NAME.into(),
            LAYER_NAME.into(),
            extent.map(|e| e[0]).into(),
            extent.map(|e| e[1]).into(),
            extent.map(|e| e[2]).into(),
            extent.map(|e| e[3]).into(),
            WGS84_SRS_ID.into(),
        ],
    ))
    .await?;
    txn.execute(statement(
        "INSERT INTO gpkg_geometry_columns
            (table_name, column_name, geometry_type_name, srs_id, z, m)
         VALUES (?, 'geom', 'POINT', ?, 0, 0)",
        vec![LAYER_NAME.into(), WGS84_SRS_ID.into()],
    ))
    .await?;

    let insert = format!(
        "INSERT INTO {} (geom, id, name, tree_specie, crown_diameter, canopy_status, comment,
            owner, aoi, longitude, latitude, creation_date, update_date)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        LAYER_NAME
    );
    for row in rows {
        txn.execute(statement(
            &insert,
            vec![
                point_blob(row.longitude, row.latitude).into(),
                row.id.into(),
                row.name.clone().into(),
                row.tree_specie.clone().into(),
                row.crown_diameter.clone().into(),
                row.canopy_status.clone().into(),
                row.comment.clone().into(),
                row.owner.clone().into(),
                row.aoi.clone().into(),
                row.longitude.into(),
                row.latitude.into(),
                row.creation_date.clone().into(),
                row.update_date.clone().into(),
            ],
        ))
        .await?;
    }

    txn.commit().await?;
    Ok(())
}

fn statement(sql: &str, values: Vec<Value>) -> Statement {
    Statement::from_sql_and_values(DbBackend::Sqlite, sql, values)
}

/// `[min_x, min_y, max_x, max_y]`, or `None` for an empty layer.
fn extent(rows: &[SurveyRow]) -> Option<[f64; 4]> {
    let first = rows.first()?;
    let init = [first.longitude, first.latitude, first.longitude, first.latitude];
    Some(rows.iter().fold(init, |e, row| {
        [
            e[0].min(row.longitude),
            e[1].min(row.latitude),
            e[2].max(row.longitude),
            e[3].max(row.latitude),
        ]
    }))
}

/// GeoPackage binary header (little endian, no envelope) followed by a
/// WKB point.
pub fn point_blob(x: f64, y: f64) -> Vec<u8> {
    let mut blob = Vec::with_capacity(29);
    blob.extend_from_slice(b"GP");
    blob.push(0);
    blob.push(0b0000_0001);
    blob.extend_from_slice(&WGS84_SRS_ID.to_le_bytes());
    blob.push(1);
    blob.extend_from_slice(&1u32.to_le_bytes());
    blob.extend_from_slice(&x.to_le_bytes());
    blob.extend_from_slice(&y.to_le_bytes());
    blob
}

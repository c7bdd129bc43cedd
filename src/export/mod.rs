//! SurveyData exports for the admin.
//!
//! Every format carries the same columns, [`SURVEY_LIST_DISPLAY`], with
//! foreign keys rendered as the related record's label.

pub mod csv_common;
pub mod to_csv;
pub mod to_geojson;
pub mod to_geopackage;
pub mod to_shapefile;

use std::str::FromStr;

use serde_json::{json, Value};
use thiserror::Error;

pub const SURVEY_LIST_DISPLAY: [&str; 12] = [
    "id",
    "name",
    "tree_specie",
    "crown_diameter",
    "canopy_status",
    "comment",
    "owner",
    "aoi",
    "longitude",
    "latitude",
    "creation_date",
    "update_date",
];

/// Layer and file stem used by every format.
pub const LAYER_NAME: &str = "survey_data";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("unsupported export format '{0}'")]
    UnsupportedFormat(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("geopackage error: {0}")]
    GeoPackage(#[from] sea_orm::DbErr),

    #[error("output is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    GeoJson,
    GeoPackage,
    Shapefile,
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "geojson" | "json" => Ok(Self::GeoJson),
            "gpkg" | "geopackage" => Ok(Self::GeoPackage),
            "shp" | "shapefile" => Ok(Self::Shapefile),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::GeoJson => "application/geo+json",
            Self::GeoPackage => "application/geopackage+sqlite3",
            Self::Shapefile => "application/zip",
        }
    }

    pub fn file_name(&self) -> String {
        let ext = match self {
            Self::Csv => "csv",
            Self::GeoJson => "geojson",
            Self::GeoPackage => "gpkg",
            Self::Shapefile => "zip",
        };
        format!("{}.{}", LAYER_NAME, ext)
    }
}

/// One exported SurveyData with its related records resolved to labels.
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyRow {
    pub id: i32,
    pub name: String,
    pub tree_specie: Option<String>,
    pub crown_diameter: Option<String>,
    pub canopy_status: String,
    pub comment: Option<String>,
    pub owner: Option<String>,
    pub aoi: String,
    pub longitude: f64,
    pub latitude: f64,
    pub creation_date: String,
    pub update_date: String,
}

impl SurveyRow {
    /// Text values in `SURVEY_LIST_DISPLAY` order; missing values are empty.
    pub fn values(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.tree_specie.clone().unwrap_or_default(),
            self.crown_diameter.clone().unwrap_or_default(),
            self.canopy_status.clone(),
            self.comment.clone().unwrap_or_default(),
            self.owner.clone().unwrap_or_default(),
            self.aoi.clone(),
            self.longitude.to_string(),
            self.latitude.to_string(),
            self.creation_date.clone(),
            self.update_date.clone(),
        ]
    }

    /// Typed values in `SURVEY_LIST_DISPLAY` order; missing values are null.
    pub fn json_values(&self) -> Vec<Value> {
        vec![
            json!(self.id),
            json!(self.name),
            json!(self.tree_specie),
            json!(self.crown_diameter),
            json!(self.canopy_status),
            json!(self.comment),
            json!(self.owner),
            json!(self.aoi),
            json!(self.longitude),
            json!(self.latitude),
            json!(self.creation_date),
            json!(self.update_date),
        ]
    }
}

/// A rendered export ready to be sent as an attachment.
#[derive(Debug)]
pub struct ExportFile {
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
}

impl ExportFile {
    pub fn file_name(&self) -> String {
        self.format.file_name()
    }

    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}

pub async fn render(format: ExportFormat, rows: &[SurveyRow]) -> Result<ExportFile, ExportError> {
    let bytes = match format {
        ExportFormat::Csv => to_csv::render(rows)?.into_bytes(),
        ExportFormat::GeoJson => to_geojson::render(rows)?.into_bytes(),
        ExportFormat::GeoPackage => to_geopackage::render(rows).await?,
        ExportFormat::Shapefile => to_shapefile::render(rows)?,
    };
    Ok(ExportFile { format, bytes })
}

#[cfg(test)]
pub(crate) mod test_rows {
    use super::SurveyRow;

    pub fn sample() -> Vec<SurveyRow> {
        vec![
            SurveyRow {
                id: 1,
                name: "Oak, by the road".to_string(),
                tree_specie: Some("Quercus robur".to_string()),
                crown_diameter: Some("5-10 m".to_string()),
                canopy_status: "Healthy".to_string(),
                comment: Some("leaning \"north\"".to_string()),
                owner: Some("Ana".to_string()),
                aoi: "Plot A".to_string(),
                longitude: 8.612345,
                latitude: 45.801234,
                creation_date: "2024-05-01T10:00:00+00:00".to_string(),
                update_date: "2024-05-02T11:30:00+00:00".to_string(),
            },
            SurveyRow {
                id: 2,
                name: "Birch".to_string(),
                tree_specie: None,
                crown_diameter: None,
                canopy_status: "Dead".to_string(),
                comment: None,
                owner: None,
                aoi: "Plot B".to_string(),
                longitude: -3.5,
                latitude: 40.25,
                creation_date: "2024-06-01T09:00:00+00:00".to_string(),
                update_date: "2024-06-01T09:00:00+00:00".to_string(),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_format_names() {
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("GeoJSON".parse::<ExportFormat>().unwrap(), ExportFormat::GeoJson);
        assert_eq!("gpkg".parse::<ExportFormat>().unwrap(), ExportFormat::GeoPackage);
        assert_eq!("shp".parse::<ExportFormat>().unwrap(), ExportFormat::Shapefile);
        assert!("kml".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn values_follow_list_display_order() {
        let row = &test_rows::sample()[1];
        let values = row.values();
        assert_eq!(values.len(), SURVEY_LIST_DISPLAY.len());
        assert_eq!(values[0], "2");
        assert_eq!(values[2], "");
        assert_eq!(values[8], "-3.5");
        assert_eq!(row.json_values()[2], Value::Null);
    }
}

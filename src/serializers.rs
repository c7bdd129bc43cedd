//! Request and response bodies of the REST API.
//!
//! Read shapes expose the primary key as `key`. Write shapes are parsed
//! leniently and then checked with [`Validate`], which reports every
//! missing or malformed field at once in the `{field: [messages]}` form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::database::entities::{
    aois, canopy_statuses, countries, crown_diameters, geographical_zones, photos, survey_data,
    tree_species, users,
};
use crate::errors::{CoreError, CoreResult, FieldErrors};

pub const REQUIRED: &str = "This field is required.";

pub trait Validate {
    type Output;

    fn validate(self) -> CoreResult<Self::Output>;
}

/// Accumulates per-field messages while a payload is checked.
#[derive(Default)]
pub struct FieldErrorsBuilder {
    errors: FieldErrors,
}

impl FieldErrorsBuilder {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn require<T>(&mut self, field: &str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.add(field, REQUIRED);
        }
        value
    }

    pub fn require_text(&mut self, field: &str, value: Option<String>, max_len: usize) -> Option<String> {
        match value {
            None => {
                self.add(field, REQUIRED);
                None
            }
            Some(text) if text.trim().is_empty() => {
                self.add(field, "This field may not be blank.");
                None
            }
            Some(text) if text.chars().count() > max_len => {
                self.add(
                    field,
                    format!("Ensure this field has no more than {} characters.", max_len),
                );
                None
            }
            Some(text) => Some(text),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> CoreResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(CoreError::validation("Invalid input").with_fields(self.errors))
        }
    }
}

// ---- lookups ----

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct LookupRead {
    pub key: i32,
    pub name: String,
}

impl From<tree_species::Model> for LookupRead {
    fn from(model: tree_species::Model) -> Self {
        Self { key: model.id, name: model.name }
    }
}

impl From<crown_diameters::Model> for LookupRead {
    fn from(model: crown_diameters::Model) -> Self {
        Self { key: model.id, name: model.name }
    }
}

impl From<canopy_statuses::Model> for LookupRead {
    fn from(model: canopy_statuses::Model) -> Self {
        Self { key: model.id, name: model.name }
    }
}

// ---- zones ----

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GeographicalZoneRead {
    pub key: i32,
    pub name: String,
    pub wms_url: String,
    /// `[y_min, x_min, y_max, x_max]`
    pub bbox: Vec<f64>,
    pub country: Option<i32>,
}

impl From<geographical_zones::Model> for GeographicalZoneRead {
    fn from(model: geographical_zones::Model) -> Self {
        Self {
            key: model.id,
            bbox: model.bbox().to_vec(),
            name: model.name,
            wms_url: model.wms_url,
            country: model.country_id,
        }
    }
}

// ---- photos ----

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PhotoRead {
    pub key: i32,
    pub survey_data: i32,
    pub compass: Option<f64>,
    pub comment: Option<String>,
    pub image: String,
    pub img: Option<String>,
}

impl From<photos::Model> for PhotoRead {
    fn from(model: photos::Model) -> Self {
        Self {
            key: model.id,
            survey_data: model.survey_data_id,
            compass: model.compass,
            comment: model.comment,
            image: model.image,
            img: model.img,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PhotoWrite {
    pub survey_data: Option<i32>,
    pub compass: Option<f64>,
    pub comment: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhotoDraft {
    pub survey_data: i32,
    pub compass: Option<f64>,
    pub comment: Option<String>,
    pub image: String,
}

impl Validate for PhotoWrite {
    type Output = PhotoDraft;

    fn validate(self) -> CoreResult<PhotoDraft> {
        let mut errors = FieldErrorsBuilder::default();
        let survey_data = errors.require("survey_data", self.survey_data);
        let image = errors.require_text("image", self.image, usize::MAX);
        errors.finish()?;

        match (survey_data, image) {
            (Some(survey_data), Some(image)) => Ok(PhotoDraft {
                survey_data,
                compass: self.compass,
                comment: self.comment,
                image,
            }),
            _ => Err(CoreError::validation("Invalid input")),
        }
    }
}

// ---- observations ----

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct PositionDto {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SurveyDataRead {
    pub key: i32,
    pub name: String,
    pub tree_specie: Option<i32>,
    pub crown_diameter: Option<i32>,
    pub canopy_status: i32,
    pub comment: Option<String>,
    pub owner: Option<i32>,
    pub aoi: i32,
    pub position: PositionDto,
    pub creation_date: DateTime<Utc>,
    pub update_date: DateTime<Utc>,
    pub images: Vec<PhotoRead>,
}

impl SurveyDataRead {
    pub fn new(model: survey_data::Model, photos: Vec<photos::Model>) -> Self {
        let position = model.position();
        Self {
            key: model.id,
            name: model.name,
            tree_specie: model.tree_specie_id,
            crown_diameter: model.crown_diameter_id,
            canopy_status: model.canopy_status_id,
            comment: model.comment,
            owner: model.owner_id,
            aoi: model.aoi_id,
            position: PositionDto {
                latitude: position.latitude,
                longitude: position.longitude,
            },
            creation_date: model.creation_date,
            update_date: model.update_date,
            images: photos.into_iter().map(PhotoRead::from).collect(),
        }
    }
}

/// A tree species given either by key or by name.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TreeSpecieRef {
    Key(i32),
    Name(String),
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SurveyDataWrite {
    pub name: Option<String>,
    /// Key of an existing species, or a species name (created when unknown)
    #[schema(value_type = Option<String>)]
    pub tree_specie: Option<TreeSpecieRef>,
    pub crown_diameter: Option<i32>,
    pub canopy_status: Option<i32>,
    pub comment: Option<String>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub position: Option<PositionDto>,
    /// On update, keys of the photos to keep; other photos are deleted
    pub images: Option<Vec<i32>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurveyDraft {
    pub name: String,
    pub tree_specie: Option<TreeSpecieRef>,
    pub crown_diameter: Option<i32>,
    pub canopy_status: i32,
    pub comment: Option<String>,
    pub longitude: f64,
    pub latitude: f64,
    pub images: Option<Vec<i32>>,
}

impl Validate for SurveyDataWrite {
    type Output = SurveyDraft;

    fn validate(self) -> CoreResult<SurveyDraft> {
        let mut errors = FieldErrorsBuilder::default();
        let name = errors.require_text("name", self.name, 255);
        let canopy_status = errors.require("canopy_status", self.canopy_status);

        let longitude = self.longitude.or(self.position.map(|p| p.longitude));
        let latitude = self.latitude.or(self.position.map(|p| p.latitude));
        let longitude = errors.require("longitude", longitude);
        let latitude = errors.require("latitude", latitude);

        if let Some(TreeSpecieRef::Name(name)) = &self.tree_specie {
            if name.chars().count() > 50 {
                errors.add(
                    "tree_specie",
                    "Ensure this field has no more than 50 characters.",
                );
            }
        }
        errors.finish()?;

        match (name, canopy_status, longitude, latitude) {
            (Some(name), Some(canopy_status), Some(longitude), Some(latitude)) => Ok(SurveyDraft {
                name,
                tree_specie: self.tree_specie,
                crown_diameter: self.crown_diameter,
                canopy_status,
                comment: self.comment,
                longitude,
                latitude,
                images: self.images,
            }),
            _ => Err(CoreError::validation("Invalid input")),
        }
    }
}

// ---- areas of interest ----

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AoiRead {
    pub key: i32,
    pub name: String,
    /// `[x_min, x_max, y_min, y_max]`
    pub bbox: Vec<f64>,
    pub owner: Option<i32>,
    pub geographical_zone: i32,
    pub creation_date: DateTime<Utc>,
    pub is_deleted: bool,
    pub obs: Vec<SurveyDataRead>,
}

impl AoiRead {
    pub fn new(model: aois::Model, obs: Vec<SurveyDataRead>) -> Self {
        Self {
            key: model.id,
            bbox: model.bbox().to_vec(),
            name: model.name,
            owner: model.owner_id,
            geographical_zone: model.geographical_zone_id,
            creation_date: model.creation_date,
            is_deleted: model.is_deleted,
            obs,
        }
    }
}

/// The box is accepted either as four fields or as `bbox`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AoiWrite {
    pub name: Option<String>,
    pub x_min: Option<f64>,
    pub x_max: Option<f64>,
    pub y_min: Option<f64>,
    pub y_max: Option<f64>,
    /// `[x_min, x_max, y_min, y_max]`
    pub bbox: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AoiDraft {
    pub name: String,
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Validate for AoiWrite {
    type Output = AoiDraft;

    fn validate(self) -> CoreResult<AoiDraft> {
        let mut errors = FieldErrorsBuilder::default();
        let name = errors.require_text("name", self.name, 100);

        let from_bbox = match self.bbox.as_deref() {
            Some([x_min, x_max, y_min, y_max]) => Some([*x_min, *x_max, *y_min, *y_max]),
            Some(_) => {
                errors.add("bbox", "Expected a list of 4 numbers.");
                None
            }
            None => None,
        };
        let pick = |index: usize, value: Option<f64>| value.or(from_bbox.map(|b| b[index]));
        let x_min = errors.require("x_min", pick(0, self.x_min));
        let x_max = errors.require("x_max", pick(1, self.x_max));
        let y_min = errors.require("y_min", pick(2, self.y_min));
        let y_max = errors.require("y_max", pick(3, self.y_max));
        errors.finish()?;

        match (name, x_min, x_max, y_min, y_max) {
            (Some(name), Some(x_min), Some(x_max), Some(y_min), Some(y_max)) => Ok(AoiDraft {
                name,
                x_min,
                x_max,
                y_min,
                y_max,
            }),
            _ => Err(CoreError::validation("Invalid input")),
        }
    }
}

// ---- users ----

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CountryRead {
    pub key: i32,
    pub name: String,
    pub code: String,
}

impl From<countries::Model> for CountryRead {
    fn from(model: countries::Model) -> Self {
        Self {
            key: model.id,
            name: model.name,
            code: model.code,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserRead {
    pub key: i32,
    pub email: String,
    pub username: String,
    pub name: String,
    pub occupation: String,
    pub language: String,
    pub country: Option<CountryRead>,
    pub is_staff: bool,
    pub last_login: Option<DateTime<Utc>>,
}

impl UserRead {
    pub fn new(user: users::Model, country: Option<countries::Model>) -> Self {
        Self {
            key: user.id,
            email: user.email,
            username: user.username,
            name: user.name,
            occupation: user.occupation,
            language: user.language,
            country: country.map(CountryRead::from),
            is_staff: user.is_staff,
            last_login: user.last_login,
        }
    }
}

// ---- auth and uploads ----

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CredentialsRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Validate for CredentialsRequest {
    type Output = (String, String);

    fn validate(self) -> CoreResult<(String, String)> {
        let mut errors = FieldErrorsBuilder::default();
        let email = errors.require_text("email", self.email, 254);
        let password = errors.require_text("password", self.password, usize::MAX);
        errors.finish()?;
        match (email, password) {
            (Some(email), Some(password)) => Ok((email, password)),
            _ => Err(CoreError::validation("Invalid input")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenRequest {
    pub token: Option<String>,
}

impl Validate for TokenRequest {
    type Output = String;

    fn validate(self) -> CoreResult<String> {
        let mut errors = FieldErrorsBuilder::default();
        let token = errors.require_text("token", self.token, usize::MAX);
        errors.finish()?;
        token
            .map(|token| token.trim().to_string())
            .ok_or_else(|| CoreError::validation("Invalid input"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UploadRequest {
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub url: String,
}

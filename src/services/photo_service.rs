use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};

use crate::auth::Actor;
use crate::database::entities::{photos, survey_data};
use crate::errors::{CoreError, CoreResult};
use crate::serializers::{PhotoDraft, PhotoRead};
use crate::services::authorization::ensure_owner;
use crate::services::media_storage::MediaStorage;

#[derive(Clone)]
pub struct PhotoService {
    db: DatabaseConnection,
    media: MediaStorage,
}

impl PhotoService {
    pub fn new(db: DatabaseConnection, media: MediaStorage) -> Self {
        Self { db, media }
    }

    /// Attaches a photo to an observation owned by `actor`.
    ///
    /// A missing observation answers 503, as the mobile client expects.
    /// The base64 text is always kept; a decodable data URL is also
    /// written to disk and referenced from `img`.
    pub async fn add(&self, actor: &Actor, draft: PhotoDraft) -> CoreResult<PhotoRead> {
        let survey = survey_data::Entity::find_by_id(draft.survey_data)
            .one(&self.db)
            .await
            .map_err(|e| CoreError::db("find observation", e))?
            .ok_or_else(|| {
                CoreError::unavailable(format!("observation {} does not exist", draft.survey_data))
            })?;
        ensure_owner(&survey, actor)?;

        let img = match self.media.save_photo(&draft.image, Utc::now()).await {
            Ok(path) => Some(path),
            Err(err) => {
                tracing::warn!(
                    "photo for observation {} not stored as file: {}",
                    survey.id,
                    err
                );
                None
            }
        };

        let created = photos::ActiveModel {
            survey_data_id: Set(survey.id),
            compass: Set(draft.compass),
            comment: Set(draft.comment),
            image: Set(draft.image),
            img: Set(img),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(|e| CoreError::db("create photo", e))?;

        Ok(PhotoRead::from(created))
    }
}

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};

use crate::auth::Actor;
use crate::database::entities::{aois, photos, survey_data};
use crate::errors::{CoreError, CoreResult, FieldErrors};
use crate::serializers::{SurveyDataRead, SurveyDraft};
use crate::services::authorization::find_owned;
use crate::services::lookup_service::LookupService;

/// Observations (SurveyData) recorded inside an area of interest.
#[derive(Clone)]
pub struct SurveyService {
    db: DatabaseConnection,
    lookups: LookupService,
}

/// Foreign keys of a draft after they have been checked.
struct ResolvedRefs {
    tree_specie: Option<i32>,
    crown_diameter: Option<i32>,
    canopy_status: i32,
}

impl SurveyService {
    pub fn new(db: DatabaseConnection) -> Self {
        let lookups = LookupService::new(db.clone());
        Self { db, lookups }
    }

    /// Creates an observation in an AOI owned by `actor`.
    pub async fn create(&self, actor: &Actor, aoi_id: i32, draft: SurveyDraft) -> CoreResult<SurveyDataRead> {
        let aoi = find_owned::<aois::Entity>(&self.db, aoi_id, actor, "aoi").await?;
        let refs = self.resolve_refs(&draft).await?;
        let now = Utc::now();

        let created = survey_data::ActiveModel {
            name: Set(draft.name),
            tree_specie_id: Set(refs.tree_specie),
            crown_diameter_id: Set(refs.crown_diameter),
            canopy_status_id: Set(refs.canopy_status),
            comment: Set(draft.comment),
            owner_id: Set(Some(actor.user_id)),
            aoi_id: Set(aoi.id),
            longitude: Set(draft.longitude),
            latitude: Set(draft.latitude),
            creation_date: Set(now),
            update_date: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(|e| CoreError::db("create observation", e))?;

        Ok(SurveyDataRead::new(created, Vec::new()))
    }

    pub async fn get(&self, actor: &Actor, id: i32) -> CoreResult<SurveyDataRead> {
        let survey = find_owned::<survey_data::Entity>(&self.db, id, actor, "observation").await?;
        let photos = self.photos_of(survey.id).await?;
        Ok(SurveyDataRead::new(survey, photos))
    }

    /// Replaces the observation fields. When the draft lists `images`, the
    /// photos not listed are deleted.
    pub async fn update(&self, actor: &Actor, id: i32, draft: SurveyDraft) -> CoreResult<SurveyDataRead> {
        let survey = find_owned::<survey_data::Entity>(&self.db, id, actor, "observation").await?;
        let refs = self.resolve_refs(&draft).await?;

        let mut active = survey.into_active_model();
        active.name = Set(draft.name);
        active.tree_specie_id = Set(refs.tree_specie);
        active.crown_diameter_id = Set(refs.crown_diameter);
        active.canopy_status_id = Set(refs.canopy_status);
        active.comment = Set(draft.comment);
        active.longitude = Set(draft.longitude);
        active.latitude = Set(draft.latitude);
        active.owner_id = Set(Some(actor.user_id));
        active.update_date = Set(Utc::now());

        let updated = active
            .update(&self.db)
            .await
            .map_err(|e| CoreError::db("update observation", e))?;

        if let Some(keep) = draft.images {
            let removed = photos::Entity::delete_many()
                .filter(photos::Column::SurveyDataId.eq(updated.id))
                .filter(photos::Column::Id.is_not_in(keep))
                .exec(&self.db)
                .await
                .map_err(|e| CoreError::db("delete dropped photos", e))?;
            if removed.rows_affected > 0 {
                tracing::debug!(
                    "removed {} photos from observation {}",
                    removed.rows_affected,
                    updated.id
                );
            }
        }

        let photos = self.photos_of(updated.id).await?;
        Ok(SurveyDataRead::new(updated, photos))
    }

    /// Hard delete; photos go with it.
    pub async fn delete(&self, actor: &Actor, id: i32) -> CoreResult<()> {
        let survey = find_owned::<survey_data::Entity>(&self.db, id, actor, "observation").await?;
        survey_data::Entity::delete_by_id(survey.id)
            .exec(&self.db)
            .await
            .map_err(|e| CoreError::db("delete observation", e))?;
        Ok(())
    }

    /// Observations of `owner_id` in the given AOIs, with their photos,
    /// grouped by AOI.
    pub async fn list_for_aois(
        &self,
        owner_id: i32,
        aoi_ids: Vec<i32>,
    ) -> CoreResult<HashMap<i32, Vec<SurveyDataRead>>> {
        if aoi_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let surveys = survey_data::Entity::find()
            .filter(survey_data::Column::AoiId.is_in(aoi_ids))
            .filter(survey_data::Column::OwnerId.eq(owner_id))
            .order_by_asc(survey_data::Column::Id)
            .find_with_related(photos::Entity)
            .all(&self.db)
            .await
            .map_err(|e| CoreError::db("list observations", e))?;

        let mut grouped: HashMap<i32, Vec<SurveyDataRead>> = HashMap::new();
        for (survey, mut images) in surveys {
            images.sort_by_key(|p| p.id);
            grouped
                .entry(survey.aoi_id)
                .or_default()
                .push(SurveyDataRead::new(survey, images));
        }
        Ok(grouped)
    }

    async fn photos_of(&self, survey_id: i32) -> CoreResult<Vec<photos::Model>> {
        photos::Entity::find()
            .filter(photos::Column::SurveyDataId.eq(survey_id))
            .order_by_asc(photos::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| CoreError::db("list photos", e))
    }

    /// Checks every reference, reporting all bad ones together.
    async fn resolve_refs(&self, draft: &SurveyDraft) -> CoreResult<ResolvedRefs> {
        let mut errors = FieldErrors::new();

        merge_field_errors(
            &mut errors,
            self.lookups.ensure_canopy_status(draft.canopy_status).await,
        )?;
        if let Some(crown) = draft.crown_diameter {
            merge_field_errors(&mut errors, self.lookups.ensure_crown_diameter(crown).await)?;
        }
        let tree_specie = match &draft.tree_specie {
            Some(reference) => merge_field_errors(
                &mut errors,
                self.lookups.resolve_tree_specie(reference).await,
            )?,
            None => None,
        };

        if !errors.is_empty() {
            return Err(CoreError::validation("Invalid input").with_fields(errors));
        }

        Ok(ResolvedRefs {
            tree_specie,
            crown_diameter: draft.crown_diameter,
            canopy_status: draft.canopy_status,
        })
    }
}

/// Moves field errors of `result` into `errors`; other errors pass through.
fn merge_field_errors<T>(errors: &mut FieldErrors, result: CoreResult<T>) -> CoreResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) => match err.fields() {
            Some(fields) => {
                for (field, messages) in fields {
                    errors
                        .entry(field.clone())
                        .or_default()
                        .extend(messages.iter().cloned());
                }
                Ok(None)
            }
            None => Err(err),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_utils::*;
    use crate::errors::CoreErrorKind;
    use crate::serializers::TreeSpecieRef;

    fn draft(canopy_status: i32) -> SurveyDraft {
        SurveyDraft {
            name: "Oak".to_string(),
            tree_specie: Some(TreeSpecieRef::Name("Quercus robur".to_string())),
            crown_diameter: None,
            canopy_status,
            comment: None,
            longitude: 8.15,
            latitude: 45.15,
            images: None,
        }
    }

    #[tokio::test]
    async fn create_requires_owned_aoi_and_valid_status() {
        let (db, _file) = setup_test_db().await;
        let ana = create_user(&db, "ana").await;
        let bob = create_user(&db, "bob").await;
        let zone = create_zone(&db, "North").await;
        let aoi = create_aoi(&db, zone.id, Some(ana.id)).await;
        let status = create_canopy_status(&db, "Healthy").await;
        let surveys = SurveyService::new(db);

        let created = surveys
            .create(&Actor::from(&ana), aoi.id, draft(status.id))
            .await
            .unwrap();
        assert_eq!(created.owner, Some(ana.id));
        assert_eq!(created.aoi, aoi.id);
        assert!(created.tree_specie.is_some());

        let err = surveys
            .create(&Actor::from(&bob), aoi.id, draft(status.id))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::Forbidden);

        let err = surveys
            .create(&Actor::from(&ana), aoi.id, draft(status.id + 10))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::Validation);
        assert!(err.fields().unwrap().contains_key("canopy_status"));

        let err = surveys
            .create(&Actor::from(&ana), aoi.id + 10, draft(status.id))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::NotFound);
    }

    #[tokio::test]
    async fn update_keeps_only_listed_photos() {
        let (db, _file) = setup_test_db().await;
        let ana = create_user(&db, "ana").await;
        let zone = create_zone(&db, "North").await;
        let aoi = create_aoi(&db, zone.id, Some(ana.id)).await;
        let status = create_canopy_status(&db, "Healthy").await;
        let survey = create_survey(&db, aoi.id, status.id, Some(ana.id)).await;
        let kept = create_photo(&db, survey.id).await;
        create_photo(&db, survey.id).await;

        let surveys = SurveyService::new(db);
        let mut change = draft(status.id);
        change.name = "Renamed".to_string();
        change.images = Some(vec![kept.id]);

        let updated = surveys
            .update(&Actor::from(&ana), survey.id, change)
            .await
            .unwrap();
        assert_eq!(updated.name, "Renamed");
        let keys: Vec<i32> = updated.images.iter().map(|p| p.key).collect();
        assert_eq!(keys, vec![kept.id]);
    }

    #[tokio::test]
    async fn delete_is_owner_only_and_removes_photos() {
        let (db, _file) = setup_test_db().await;
        let ana = create_user(&db, "ana").await;
        let bob = create_user(&db, "bob").await;
        let zone = create_zone(&db, "North").await;
        let aoi = create_aoi(&db, zone.id, Some(ana.id)).await;
        let status = create_canopy_status(&db, "Healthy").await;
        let survey = create_survey(&db, aoi.id, status.id, Some(ana.id)).await;
        create_photo(&db, survey.id).await;

        let surveys = SurveyService::new(db.clone());
        let err = surveys.delete(&Actor::from(&bob), survey.id).await.unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::Forbidden);

        surveys.delete(&Actor::from(&ana), survey.id).await.unwrap();
        assert_eq!(
            surveys.get(&Actor::from(&ana), survey.id).await.unwrap_err().kind(),
            CoreErrorKind::NotFound
        );
        assert!(photos::Entity::find().all(&db).await.unwrap().is_empty());
    }
}

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::auth::Actor;
use crate::database::entities::aois;
use crate::errors::{CoreError, CoreResult};
use crate::serializers::{AoiDraft, AoiRead};
use crate::services::authorization::find_owned;
use crate::services::survey_service::SurveyService;
use crate::services::zone_service::ZoneService;

#[derive(Clone)]
pub struct AoiService {
    db: DatabaseConnection,
    zones: ZoneService,
    surveys: SurveyService,
}

impl AoiService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            zones: ZoneService::new(db.clone()),
            surveys: SurveyService::new(db.clone()),
            db,
        }
    }

    /// The actor's non-deleted AOIs in a zone, each with the actor's
    /// observations.
    pub async fn list_for_zone(&self, actor: &Actor, zone_id: i32) -> CoreResult<Vec<AoiRead>> {
        self.zones.ensure_zone_access(actor, zone_id).await?;

        let rows = aois::Entity::find()
            .filter(aois::Column::GeographicalZoneId.eq(zone_id))
            .filter(aois::Column::OwnerId.eq(actor.user_id))
            .filter(aois::Column::IsDeleted.eq(false))
            .order_by_asc(aois::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| CoreError::db("list aois", e))?;

        let ids = rows.iter().map(|aoi| aoi.id).collect();
        let mut obs = self.surveys.list_for_aois(actor.user_id, ids).await?;

        Ok(rows
            .into_iter()
            .map(|aoi| {
                let observations = obs.remove(&aoi.id).unwrap_or_default();
                AoiRead::new(aoi, observations)
            })
            .collect())
    }

    pub async fn create(&self, actor: &Actor, zone_id: i32, draft: AoiDraft) -> CoreResult<AoiRead> {
        self.zones.ensure_zone_access(actor, zone_id).await?;

        let created = aois::ActiveModel {
            name: Set(draft.name),
            x_min: Set(draft.x_min),
            x_max: Set(draft.x_max),
            y_min: Set(draft.y_min),
            y_max: Set(draft.y_max),
            owner_id: Set(Some(actor.user_id)),
            geographical_zone_id: Set(zone_id),
            creation_date: Set(Utc::now()),
            is_deleted: Set(false),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(|e| CoreError::db("create aoi", e))?;

        tracing::info!(
            "user {} created aoi {} in zone {}",
            actor.user_id,
            created.id,
            zone_id
        );
        Ok(AoiRead::new(created, Vec::new()))
    }

    /// Hard delete. Observations and their photos are removed by the
    /// database cascade.
    pub async fn delete(&self, actor: &Actor, id: i32) -> CoreResult<()> {
        let aoi = find_owned::<aois::Entity>(&self.db, id, actor, "aoi").await?;
        aois::Entity::delete_by_id(aoi.id)
            .exec(&self.db)
            .await
            .map_err(|e| CoreError::db("delete aoi", e))?;
        tracing::info!("user {} deleted aoi {}", actor.user_id, aoi.id);
        Ok(())
    }
}

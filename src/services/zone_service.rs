use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect};

use crate::auth::Actor;
use crate::database::entities::{geographical_zones, ggz, user_groups};
use crate::errors::{CoreError, CoreResult};

/// Zone visibility follows group membership: a user sees the zones
/// granted (through GGZ) to any group they belong to.
#[derive(Clone)]
pub struct ZoneService {
    db: DatabaseConnection,
}

impl ZoneService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn zone_ids_for_user(&self, user_id: i32) -> CoreResult<Vec<i32>> {
        let group_ids: Vec<i32> = user_groups::Entity::find()
            .select_only()
            .column(user_groups::Column::GroupId)
            .filter(user_groups::Column::UserId.eq(user_id))
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(|e| CoreError::db("list user groups", e))?;

        if group_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut zone_ids: Vec<i32> = ggz::Entity::find()
            .select_only()
            .column(ggz::Column::GeographicalZoneId)
            .filter(ggz::Column::GroupId.is_in(group_ids))
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(|e| CoreError::db("list zone grants", e))?;
        zone_ids.sort_unstable();
        zone_ids.dedup();
        Ok(zone_ids)
    }

    pub async fn zones_for_user(&self, user_id: i32) -> CoreResult<Vec<geographical_zones::Model>> {
        let zone_ids = self.zone_ids_for_user(user_id).await?;
        if zone_ids.is_empty() {
            return Ok(Vec::new());
        }

        geographical_zones::Entity::find()
            .filter(geographical_zones::Column::Id.is_in(zone_ids))
            .order_by_asc(geographical_zones::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| CoreError::db("list zones", e))
    }

    /// 404 for an unknown zone, 403 for a zone not granted to the actor.
    pub async fn ensure_zone_access(
        &self,
        actor: &Actor,
        zone_id: i32,
    ) -> CoreResult<geographical_zones::Model> {
        let zone = geographical_zones::Entity::find_by_id(zone_id)
            .one(&self.db)
            .await
            .map_err(|e| CoreError::db("find zone", e))?
            .ok_or_else(|| CoreError::not_found("geographical zone", zone_id))?;

        if !self.zone_ids_for_user(actor.user_id).await?.contains(&zone_id) {
            return Err(CoreError::forbidden(
                "You do not have access to this geographical zone.",
            ));
        }
        Ok(zone)
    }
}

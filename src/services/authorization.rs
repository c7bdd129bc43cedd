//! Ownership checks shared by every single-record endpoint.
//!
//! Handlers never compare owner ids themselves; they load records through
//! [`find_owned`] or check an already loaded record with [`ensure_owner`].

use sea_orm::{DatabaseConnection, EntityTrait, PrimaryKeyTrait};

use crate::auth::Actor;
use crate::database::entities::{aois, survey_data};
use crate::errors::{CoreError, CoreResult};

/// Records that belong to a user.
pub trait Owned {
    fn owner_id(&self) -> Option<i32>;
}

impl Owned for aois::Model {
    fn owner_id(&self) -> Option<i32> {
        self.owner_id
    }
}

impl Owned for survey_data::Model {
    fn owner_id(&self) -> Option<i32> {
        self.owner_id
    }
}

/// Fails with 403 unless `actor` owns `record`. Ownerless records belong
/// to nobody.
pub fn ensure_owner<R: Owned>(record: &R, actor: &Actor) -> CoreResult<()> {
    match record.owner_id() {
        Some(owner) if owner == actor.user_id => Ok(()),
        _ => Err(CoreError::forbidden(
            "You do not have permission to perform this action.",
        )),
    }
}

/// Loads a record by primary key: 404 when missing, 403 when owned by
/// someone else.
pub async fn find_owned<E>(
    db: &DatabaseConnection,
    id: i32,
    actor: &Actor,
    entity_name: &str,
) -> CoreResult<E::Model>
where
    E: EntityTrait,
    E::Model: Owned,
    i32: Into<<E::PrimaryKey as PrimaryKeyTrait>::ValueType>,
{
    let record = E::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| CoreError::db(&format!("find {}", entity_name), e))?
        .ok_or_else(|| CoreError::not_found(entity_name, id))?;

    ensure_owner(&record, actor)?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_utils::*;
    use crate::errors::CoreErrorKind;

    #[tokio::test]
    async fn owner_passes_others_are_forbidden() {
        let (db, _file) = setup_test_db().await;
        let ana = create_user(&db, "ana").await;
        let bob = create_user(&db, "bob").await;
        let zone = create_zone(&db, "North").await;
        let aoi = create_aoi(&db, zone.id, Some(ana.id)).await;

        let found = find_owned::<aois::Entity>(&db, aoi.id, &Actor::from(&ana), "aoi")
            .await
            .unwrap();
        assert_eq!(found.id, aoi.id);

        let err = find_owned::<aois::Entity>(&db, aoi.id, &Actor::from(&bob), "aoi")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::Forbidden);

        let err = find_owned::<aois::Entity>(&db, aoi.id + 100, &Actor::from(&ana), "aoi")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::NotFound);
    }

    #[tokio::test]
    async fn ownerless_records_are_forbidden() {
        let (db, _file) = setup_test_db().await;
        let ana = create_user(&db, "ana").await;
        let zone = create_zone(&db, "North").await;
        let aoi = create_aoi(&db, zone.id, None).await;

        let err = ensure_owner(&aoi, &Actor::from(&ana)).unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::Forbidden);
    }
}

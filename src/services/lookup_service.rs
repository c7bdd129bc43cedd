use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::database::entities::{canopy_statuses, crown_diameters, tree_species};
use crate::errors::{CoreError, CoreResult};
use crate::serializers::{LookupRead, TreeSpecieRef};

/// Read access to the name-keyed lookup tables.
#[derive(Clone)]
pub struct LookupService {
    db: DatabaseConnection,
}

impl LookupService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn species(&self) -> CoreResult<Vec<LookupRead>> {
        let rows = tree_species::Entity::find()
            .order_by_asc(tree_species::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| CoreError::db("list tree species", e))?;
        Ok(rows.into_iter().map(LookupRead::from).collect())
    }

    pub async fn crowns(&self) -> CoreResult<Vec<LookupRead>> {
        let rows = crown_diameters::Entity::find()
            .order_by_asc(crown_diameters::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| CoreError::db("list crown diameters", e))?;
        Ok(rows.into_iter().map(LookupRead::from).collect())
    }

    pub async fn canopies(&self) -> CoreResult<Vec<LookupRead>> {
        let rows = canopy_statuses::Entity::find()
            .order_by_asc(canopy_statuses::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| CoreError::db("list canopy statuses", e))?;
        Ok(rows.into_iter().map(LookupRead::from).collect())
    }

    /// Resolves a species reference to a key. Names are matched exactly
    /// and created when no species carries them yet.
    pub async fn resolve_tree_specie(&self, reference: &TreeSpecieRef) -> CoreResult<i32> {
        match reference {
            TreeSpecieRef::Key(id) => {
                let found = tree_species::Entity::find_by_id(*id)
                    .one(&self.db)
                    .await
                    .map_err(|e| CoreError::db("find tree species", e))?;
                found.map(|s| s.id).ok_or_else(|| invalid_pk("tree_specie", *id))
            }
            TreeSpecieRef::Name(name) => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(CoreError::field("tree_specie", "This field may not be blank."));
                }
                let existing = tree_species::Entity::find()
                    .filter(tree_species::Column::Name.eq(name))
                    .one(&self.db)
                    .await
                    .map_err(|e| CoreError::db("find tree species", e))?;
                if let Some(species) = existing {
                    return Ok(species.id);
                }

                let created = tree_species::ActiveModel {
                    name: Set(name.to_string()),
                    ..Default::default()
                }
                .insert(&self.db)
                .await
                .map_err(|e| CoreError::db("create tree species", e))?;
                tracing::info!("created tree species '{}' ({})", created.name, created.id);
                Ok(created.id)
            }
        }
    }

    pub async fn ensure_crown_diameter(&self, id: i32) -> CoreResult<()> {
        crown_diameters::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| CoreError::db("find crown diameter", e))?
            .map(|_| ())
            .ok_or_else(|| invalid_pk("crown_diameter", id))
    }

    pub async fn ensure_canopy_status(&self, id: i32) -> CoreResult<()> {
        canopy_statuses::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| CoreError::db("find canopy status", e))?
            .map(|_| ())
            .ok_or_else(|| invalid_pk("canopy_status", id))
    }
}

pub fn invalid_pk(field: &str, id: i32) -> CoreError {
    CoreError::field(
        field,
        format!("Invalid pk \"{}\" - object does not exist.", id),
    )
}

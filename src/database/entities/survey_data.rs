use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A single field observation of a tree inside an AOI.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "survey_data")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub tree_specie_id: Option<i32>,
    pub crown_diameter_id: Option<i32>,
    pub canopy_status_id: i32,
    #[sea_orm(column_type = "Text", nullable)]
    pub comment: Option<String>,
    pub owner_id: Option<i32>,
    pub aoi_id: i32,
    pub longitude: f64,
    pub latitude: f64,
    pub creation_date: ChronoDateTimeUtc,
    pub update_date: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tree_species::Entity",
        from = "Column::TreeSpecieId",
        to = "super::tree_species::Column::Id",
        on_delete = "Cascade"
    )]
    TreeSpecies,
    #[sea_orm(
        belongs_to = "super::crown_diameters::Entity",
        from = "Column::CrownDiameterId",
        to = "super::crown_diameters::Column::Id",
        on_delete = "Cascade"
    )]
    CrownDiameters,
    #[sea_orm(
        belongs_to = "super::canopy_statuses::Entity",
        from = "Column::CanopyStatusId",
        to = "super::canopy_statuses::Column::Id",
        on_delete = "Cascade"
    )]
    CanopyStatuses,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::OwnerId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    Users,
    #[sea_orm(
        belongs_to = "super::aois::Entity",
        from = "Column::AoiId",
        to = "super::aois::Column::Id",
        on_delete = "Cascade"
    )]
    Aois,
    #[sea_orm(has_many = "super::photos::Entity")]
    Photos,
}

impl Related<super::tree_species::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TreeSpecies.def()
    }
}

impl Related<super::crown_diameters::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CrownDiameters.def()
    }
}

impl Related<super::canopy_statuses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CanopyStatuses.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::aois::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Aois.def()
    }
}

impl Related<super::photos::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Photos.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Model {
    pub fn position(&self) -> Position {
        Position {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

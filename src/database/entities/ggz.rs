use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Grants every member of a group read access to a geographical zone.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ggz")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub group_id: i32,
    pub geographical_zone_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_delete = "Cascade"
    )]
    Groups,
    #[sea_orm(
        belongs_to = "super::geographical_zones::Entity",
        from = "Column::GeographicalZoneId",
        to = "super::geographical_zones::Column::Id",
        on_delete = "Cascade"
    )]
    GeographicalZones,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl Related<super::geographical_zones::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GeographicalZones.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "group {}, zone {}", self.group_id, self.geographical_zone_id)
    }
}

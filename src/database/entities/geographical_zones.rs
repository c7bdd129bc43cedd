use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A surveyed region served by an external WMS map endpoint. Coordinates are
/// decimal degrees.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "geographical_zones")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub country_id: Option<i32>,
    #[sea_orm(column_type = "Text")]
    pub wms_url: String,
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::countries::Entity",
        from = "Column::CountryId",
        to = "super::countries::Column::Id",
        on_delete = "SetNull"
    )]
    Countries,
    #[sea_orm(has_many = "super::ggz::Entity")]
    Ggz,
    #[sea_orm(has_many = "super::aois::Entity")]
    Aois,
}

impl Related<super::countries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Countries.def()
    }
}

impl Related<super::ggz::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ggz.def()
    }
}

impl Related<super::aois::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Aois.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Corner order expected by the map client: `[y_min, x_min, y_max, x_max]`.
    pub fn bbox(&self) -> [f64; 4] {
        [self.y_min, self.x_min, self.y_max, self.x_max]
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

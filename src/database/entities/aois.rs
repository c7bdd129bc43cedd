use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Area of interest: a bounded sub-region of a zone in which its owner logs
/// observations.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "aois")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub owner_id: Option<i32>,
    pub geographical_zone_id: i32,
    pub creation_date: ChronoDateTimeUtc,
    pub is_deleted: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::OwnerId",
        to = "super::users::Column::Id",
        on_delete = "SetNull"
    )]
    Users,
    #[sea_orm(
        belongs_to = "super::geographical_zones::Entity",
        from = "Column::GeographicalZoneId",
        to = "super::geographical_zones::Column::Id",
        on_delete = "Cascade"
    )]
    GeographicalZones,
    #[sea_orm(has_many = "super::survey_data::Entity")]
    SurveyData,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::geographical_zones::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GeographicalZones.def()
    }
}

impl Related<super::survey_data::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SurveyData.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn bbox(&self) -> [f64; 4] {
        [self.x_min, self.x_max, self.y_min, self.y_max]
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "photos")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub survey_data_id: i32,
    pub compass: Option<f64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub comment: Option<String>,
    /// Base64 payload as posted by the client.
    #[sea_orm(column_type = "Text")]
    pub image: String,
    /// Media-relative path of the decoded file, when the payload decoded.
    pub img: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::survey_data::Entity",
        from = "Column::SurveyDataId",
        to = "super::survey_data::Column::Id",
        on_delete = "Cascade"
    )]
    SurveyData,
}

impl Related<super::survey_data::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SurveyData.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

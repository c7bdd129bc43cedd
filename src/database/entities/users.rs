use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};

/// Survey participant. The email address is the login identifier.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub email: String,
    pub username: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub occupation: String,
    pub language: String,
    pub country_id: Option<i32>,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub last_login: Option<ChronoDateTimeUtc>,
    pub creation_date: ChronoDateTimeUtc,
    pub update_date: ChronoDateTimeUtc,
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
    #[sea_orm(has_many = "super::user_groups::Entity")]
    UserGroups,
    #[sea_orm(has_many = "super::user_sessions::Entity")]
    UserSessions,
    #[sea_orm(has_many = "super::aois::Entity")]
    Aois,
    #[sea_orm(has_many = "super::survey_data::Entity")]
    SurveyData,
}

impl Related<super::countries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Countries.def()
    }
}

impl Related<super::user_groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserGroups.def()
    }
}

impl Related<super::user_sessions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserSessions.def()
    }
}

impl Related<super::aois::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Aois.def()
    }
}

impl Related<super::survey_data::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SurveyData.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    /// Blank active user with both timestamps set to now.
    pub fn new() -> Self {
        let now = chrono::Utc::now();
        Self {
            id: ActiveValue::NotSet,
            email: ActiveValue::NotSet,
            username: ActiveValue::NotSet,
            name: ActiveValue::NotSet,
            password: ActiveValue::NotSet,
            occupation: Set(String::new()),
            language: Set(String::new()),
            country_id: Set(None),
            is_active: Set(true),
            is_staff: Set(false),
            is_superuser: Set(false),
            last_login: Set(None),
            creation_date: Set(now),
            update_date: Set(now),
        }
    }

    pub fn set_update_date(mut self) -> Self {
        self.update_date = Set(chrono::Utc::now());
        self
    }

    pub fn set_last_login(mut self) -> Self {
        self.last_login = Set(Some(chrono::Utc::now()));
        self
    }
}

impl Model {
    pub fn full_name(&self) -> &str {
        &self.name
    }

    pub fn short_name(&self) -> &str {
        &self.username
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

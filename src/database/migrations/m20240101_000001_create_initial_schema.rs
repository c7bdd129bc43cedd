use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Countries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Countries::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Countries::Name).string_len(100).not_null())
                    .col(
                        ColumnDef::new(Countries::Code)
                            .string_len(20)
                            .not_null()
                            .unique_key(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Metadata::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Metadata::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Metadata::Key).string_len(100).not_null())
                    .col(ColumnDef::new(Metadata::Value).string_len(100).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Email)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::Username).string_len(100).not_null())
                    .col(ColumnDef::new(Users::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Users::Password).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Users::Occupation)
                            .string_len(255)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Users::Language)
                            .string_len(255)
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Users::CountryId).integer())
                    .col(
                        ColumnDef::new(Users::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Users::IsStaff)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Users::IsSuperuser)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Users::LastLogin).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Users::CreationDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Users::UpdateDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_users_country_id")
                            .from(Users::Table, Users::CountryId)
                            .to(Countries::Table, Countries::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Groups::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Groups::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Groups::Name)
                            .string_len(150)
                            .not_null()
                            .unique_key(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserGroups::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserGroups::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserGroups::UserId).integer().not_null())
                    .col(ColumnDef::new(UserGroups::GroupId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_groups_user_id")
                            .from(UserGroups::Table, UserGroups::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_groups_group_id")
                            .from(UserGroups::Table, UserGroups::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_user_groups_user_group")
                    .table(UserGroups::Table)
                    .col(UserGroups::UserId)
                    .col(UserGroups::GroupId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserSessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserSessions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(UserSessions::SessionKey)
                            .string_len(40)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(UserSessions::UserId).integer().not_null())
                    .col(
                        ColumnDef::new(UserSessions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserSessions::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_sessions_user_id")
                            .from(UserSessions::Table, UserSessions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GeographicalZones::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GeographicalZones::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(GeographicalZones::Name)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(GeographicalZones::CountryId).integer())
                    .col(ColumnDef::new(GeographicalZones::WmsUrl).text().not_null())
                    .col(ColumnDef::new(GeographicalZones::XMin).double().not_null())
                    .col(ColumnDef::new(GeographicalZones::XMax).double().not_null())
                    .col(ColumnDef::new(GeographicalZones::YMin).double().not_null())
                    .col(ColumnDef::new(GeographicalZones::YMax).double().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_geographical_zones_country_id")
                            .from(GeographicalZones::Table, GeographicalZones::CountryId)
                            .to(Countries::Table, Countries::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Ggz::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Ggz::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Ggz::GroupId).integer().not_null())
                    .col(
                        ColumnDef::new(Ggz::GeographicalZoneId)
                            .integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ggz_group_id")
                            .from(Ggz::Table, Ggz::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ggz_geographical_zone_id")
                            .from(Ggz::Table, Ggz::GeographicalZoneId)
                            .to(GeographicalZones::Table, GeographicalZones::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Aois::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Aois::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Aois::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Aois::XMin).double().not_null())
                    .col(ColumnDef::new(Aois::XMax).double().not_null())
                    .col(ColumnDef::new(Aois::YMin).double().not_null())
                    .col(ColumnDef::new(Aois::YMax).double().not_null())
                    .col(ColumnDef::new(Aois::OwnerId).integer())
                    .col(ColumnDef::new(Aois::GeographicalZoneId).integer().not_null())
                    .col(
                        ColumnDef::new(Aois::CreationDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Aois::IsDeleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_aois_owner_id")
                            .from(Aois::Table, Aois::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_aois_geographical_zone_id")
                            .from(Aois::Table, Aois::GeographicalZoneId)
                            .to(GeographicalZones::Table, GeographicalZones::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        for table in [
            LookupTable::TreeSpecies,
            LookupTable::CrownDiameters,
            LookupTable::CanopyStatuses,
        ] {
            manager
                .create_table(
                    Table::create()
                        .table(table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(LookupTable::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(LookupTable::Name)
                                .string_len(50)
                                .not_null()
                                .unique_key(),
                        )
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_table(
                Table::create()
                    .table(SurveyData::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SurveyData::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SurveyData::Name).string_len(255).not_null())
                    .col(ColumnDef::new(SurveyData::TreeSpecieId).integer())
                    .col(ColumnDef::new(SurveyData::CrownDiameterId).integer())
                    .col(ColumnDef::new(SurveyData::CanopyStatusId).integer().not_null())
                    .col(ColumnDef::new(SurveyData::Comment).text())
                    .col(ColumnDef::new(SurveyData::OwnerId).integer())
                    .col(ColumnDef::new(SurveyData::AoiId).integer().not_null())
                    .col(ColumnDef::new(SurveyData::Longitude).double().not_null())
                    .col(ColumnDef::new(SurveyData::Latitude).double().not_null())
                    .col(
                        ColumnDef::new(SurveyData::CreationDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SurveyData::UpdateDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_survey_data_tree_specie_id")
                            .from(SurveyData::Table, SurveyData::TreeSpecieId)
                            .to(LookupTable::TreeSpecies, LookupTable::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_survey_data_crown_diameter_id")
                            .from(SurveyData::Table, SurveyData::CrownDiameterId)
                            .to(LookupTable::CrownDiameters, LookupTable::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_survey_data_canopy_status_id")
                            .from(SurveyData::Table, SurveyData::CanopyStatusId)
                            .to(LookupTable::CanopyStatuses, LookupTable::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_survey_data_owner_id")
                            .from(SurveyData::Table, SurveyData::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_survey_data_aoi_id")
                            .from(SurveyData::Table, SurveyData::AoiId)
                            .to(Aois::Table, Aois::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Photos::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Photos::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Photos::SurveyDataId).integer().not_null())
                    .col(ColumnDef::new(Photos::Compass).double())
                    .col(ColumnDef::new(Photos::Comment).text())
                    .col(ColumnDef::new(Photos::Image).text().not_null())
                    .col(ColumnDef::new(Photos::Img).string_len(255))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_photos_survey_data_id")
                            .from(Photos::Table, Photos::SurveyDataId)
                            .to(SurveyData::Table, SurveyData::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Photos::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SurveyData::Table).to_owned())
            .await?;
        for table in [
            LookupTable::CanopyStatuses,
            LookupTable::CrownDiameters,
            LookupTable::TreeSpecies,
        ] {
            manager
                .drop_table(Table::drop().table(table).to_owned())
                .await?;
        }
        manager
            .drop_table(Table::drop().table(Aois::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Ggz::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GeographicalZones::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserSessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserGroups::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Groups::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Metadata::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Countries::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum Countries {
    Table,
    Id,
    Name,
    Code,
}

#[derive(Iden)]
enum Metadata {
    Table,
    Id,
    Key,
    Value,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Email,
    Username,
    Name,
    Password,
    Occupation,
    Language,
    CountryId,
    IsActive,
    IsStaff,
    IsSuperuser,
    LastLogin,
    CreationDate,
    UpdateDate,
}

#[derive(Iden)]
enum Groups {
    Table,
    Id,
    Name,
}

#[derive(Iden)]
enum UserGroups {
    Table,
    Id,
    UserId,
    GroupId,
}

#[derive(Iden)]
enum UserSessions {
    Table,
    Id,
    SessionKey,
    UserId,
    CreatedAt,
    ExpiresAt,
}

#[derive(Iden)]
enum GeographicalZones {
    Table,
    Id,
    Name,
    CountryId,
    WmsUrl,
    XMin,
    XMax,
    YMin,
    YMax,
}

#[derive(Iden)]
#[iden = "ggz"]
enum Ggz {
    Table,
    Id,
    GroupId,
    GeographicalZoneId,
}

#[derive(Iden)]
enum Aois {
    Table,
    Id,
    Name,
    XMin,
    XMax,
    YMin,
    YMax,
    OwnerId,
    GeographicalZoneId,
    CreationDate,
    IsDeleted,
}

/// The three name-keyed lookup tables share one layout.
#[derive(Iden, Clone, Copy)]
enum LookupTable {
    TreeSpecies,
    CrownDiameters,
    CanopyStatuses,
    Id,
    Name,
}

#[derive(Iden)]
enum SurveyData {
    Table,
    Id,
    Name,
    TreeSpecieId,
    CrownDiameterId,
    CanopyStatusId,
    Comment,
    OwnerId,
    AoiId,
    Longitude,
    Latitude,
    CreationDate,
    UpdateDate,
}

#[derive(Iden)]
enum Photos {
    Table,
    Id,
    SurveyDataId,
    Compass,
    Comment,
    Image,
    Img,
}

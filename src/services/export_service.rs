use std::collections::HashMap;

use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::database::entities::{
    aois, canopy_statuses, crown_diameters, survey_data, tree_species, users,
};
use crate::errors::{CoreError, CoreResult};
use crate::export::{self, ExportFile, ExportFormat, SurveyRow};

/// Which observations to export: explicit ids win over a search query;
/// with neither, everything is exported.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct ExportSelection {
    pub ids: Option<Vec<i32>>,
    pub q: Option<String>,
}

pub struct ExportService {
    db: DatabaseConnection,
}

impl ExportService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn export_surveys(
        &self,
        selection: &ExportSelection,
        format: ExportFormat,
    ) -> CoreResult<ExportFile> {
        let rows = self.survey_rows(selection).await?;
        tracing::info!("exporting {} observations as {:?}", rows.len(), format);

        export::render(format, &rows)
            .await
            .map_err(|e| CoreError::internal("Export failed").with_source(e))
    }

    pub async fn survey_rows(&self, selection: &ExportSelection) -> CoreResult<Vec<SurveyRow>> {
        let mut query = survey_data::Entity::find().order_by_asc(survey_data::Column::Id);
        if let Some(ids) = &selection.ids {
            query = query.filter(survey_data::Column::Id.is_in(ids.clone()));
        } else if let Some(q) = selection.q.as_deref().filter(|q| !q.trim().is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(survey_data::Column::Name.contains(q.trim()))
                    .add(survey_data::Column::Comment.contains(q.trim())),
            );
        }

        let surveys = query
            .all(&self.db)
            .await
            .map_err(|e| CoreError::db("select observations", e))?;

        let species = self.labels::<tree_species::Entity, _>(|m| (m.id, m.name)).await?;
        let crowns = self.labels::<crown_diameters::Entity, _>(|m| (m.id, m.name)).await?;
        let canopies = self.labels::<canopy_statuses::Entity, _>(|m| (m.id, m.name)).await?;
        let owners = self.labels::<users::Entity, _>(|m| (m.id, m.to_string())).await?;
        let aoi_names = self.labels::<aois::Entity, _>(|m| (m.id, m.name)).await?;

        let label = |map: &HashMap<i32, String>, id: Option<i32>| {
            id.and_then(|id| map.get(&id).cloned())
        };

        Ok(surveys
            .into_iter()
            .map(|s| SurveyRow {
                id: s.id,
                tree_specie: label(&species, s.tree_specie_id),
                crown_diameter: label(&crowns, s.crown_diameter_id),
                canopy_status: label(&canopies, Some(s.canopy_status_id)).unwrap_or_default(),
                owner: label(&owners, s.owner_id),
                aoi: label(&aoi_names, Some(s.aoi_id)).unwrap_or_default(),
                name: s.name,
                comment: s.comment,
                longitude: s.longitude,
                latitude: s.latitude,
                creation_date: s.creation_date.to_rfc3339(),
                update_date: s.update_date.to_rfc3339(),
            })
            .collect())
    }

    async fn labels<E, F>(&self, f: F) -> CoreResult<HashMap<i32, String>>
    where
        E: EntityTrait,
        F: Fn(E::Model) -> (i32, String),
    {
        Ok(E::find()
            .all(&self.db)
            .await
            .map_err(|e| CoreError::db("load export labels", e))?
            .into_iter()
            .map(f)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_utils::*;

    #[tokio::test]
    async fn rows_resolve_related_labels() {
        let (db, _file) = setup_test_db().await;
        let ana = create_user(&db, "ana").await;
        let zone = create_zone(&db, "North").await;
        let aoi = create_aoi(&db, zone.id, Some(ana.id)).await;
        let status = create_canopy_status(&db, "Healthy").await;
        let survey = create_survey(&db, aoi.id, status.id, Some(ana.id)).await;

        let service = ExportService::new(db);
        let rows = service.survey_rows(&ExportSelection::default()).await.unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.id, survey.id);
        assert_eq!(row.canopy_status, "Healthy");
        assert_eq!(row.owner.as_deref(), Some("ANA"));
        assert_eq!(row.aoi, "Plot");
        assert_eq!(row.tree_specie, None);
    }

    #[tokio::test]
    async fn selection_by_ids_and_query() {
        let (db, _file) = setup_test_db().await;
        let ana = create_user(&db, "ana").await;
        let zone = create_zone(&db, "North").await;
        let aoi = create_aoi(&db, zone.id, Some(ana.id)).await;
        let status = create_canopy_status(&db, "Healthy").await;
        let first = create_survey(&db, aoi.id, status.id, Some(ana.id)).await;
        let second = create_survey(&db, aoi.id, status.id, Some(ana.id)).await;

        let service = ExportService::new(db);
        let by_id = service
            .survey_rows(&ExportSelection {
                ids: Some(vec![second.id]),
                q: None,
            })
            .await
            .unwrap();
        assert_eq!(by_id.iter().map(|r| r.id).collect::<Vec<_>>(), vec![second.id]);

        let by_query = service
            .survey_rows(&ExportSelection {
                ids: None,
                q: Some("leaning".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(by_query.len(), 2);
        assert_eq!(by_query[0].id, first.id);

        let none = service
            .survey_rows(&ExportSelection {
                ids: None,
                q: Some("no such text".to_string()),
            })
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn csv_export_carries_every_row() {
        let (db, _file) = setup_test_db().await;
        let ana = create_user(&db, "ana").await;
        let zone = create_zone(&db, "North").await;
        let aoi = create_aoi(&db, zone.id, Some(ana.id)).await;
        let status = create_canopy_status(&db, "Healthy").await;
        create_survey(&db, aoi.id, status.id, Some(ana.id)).await;

        let service = ExportService::new(db);
        let file = service
            .export_surveys(&ExportSelection::default(), ExportFormat::Csv)
            .await
            .unwrap();
        assert_eq!(file.content_type(), "text/csv");
        let text = String::from_utf8(file.bytes).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("Healthy"));
    }
}

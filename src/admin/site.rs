//! The admin site: labels, registered models and their actions.

use std::sync::Arc;

use indexmap::IndexMap;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::actions::{ActionRegistry, ActionResult};
use super::model_admin::{ListPage, ListParams, ModelAdmin};
use super::resource::{AdminResource, EntityAdmin};
use crate::config::AdminSettings;
use crate::database::entities::{
    aois, canopy_statuses, countries, crown_diameters, geographical_zones, ggz, groups, metadata,
    photos, survey_data, tree_species, user_groups, users,
};
use crate::errors::{CoreError, CoreResult};
use crate::services::AuthService;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ModelInfo {
    pub name: String,
    pub verbose_name: String,
    pub verbose_name_plural: String,
    pub url: String,
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SiteIndex {
    pub site_header: String,
    pub site_title: String,
    pub index_title: String,
    pub models: Vec<ModelInfo>,
}

pub struct AdminSite {
    labels: AdminSettings,
    url_prefix: String,
    resources: IndexMap<String, Arc<dyn AdminResource>>,
    actions: ActionRegistry,
}

impl AdminSite {
    pub fn new(labels: AdminSettings) -> Self {
        Self {
            labels,
            url_prefix: "/admin/api".to_string(),
            resources: IndexMap::new(),
            actions: ActionRegistry::default(),
        }
    }

    /// Every Treechecker model. `bcrypt_cost` is used to hash passwords
    /// set through the user admin.
    pub fn treechecker(labels: AdminSettings, bcrypt_cost: u32) -> Self {
        let mut site = Self::new(labels);

        site.register(EntityAdmin::<countries::ActiveModel>::new(
            ModelAdmin::new("country")
                .verbose_name_plural("countries")
                .list_display(vec!["name", "code"])
                .search_fields(vec!["name", "code"])
                .ordering(vec!["name"]),
        ));
        site.register(EntityAdmin::<geographical_zones::ActiveModel>::new(
            ModelAdmin::new("geographical_zone")
                .list_display(vec!["name", "country_id", "wms_url", "x_min", "x_max", "y_min", "y_max"])
                .search_fields(vec!["name", "wms_url"])
                .ordering(vec!["name"]),
        ));
        site.register(EntityAdmin::<ggz::ActiveModel>::new(
            ModelAdmin::new("ggz")
                .verbose_name("group zone grant")
                .list_display(vec!["group_id", "geographical_zone_id"]),
        ));
        site.register(
            EntityAdmin::<aois::ActiveModel>::new(
                ModelAdmin::new("aoi")
                    .verbose_name("AOI")
                    .verbose_name_plural("AOIs")
                    .list_display(vec!["name", "owner_id", "geographical_zone_id", "creation_date", "is_deleted"])
                    .search_fields(vec!["name"])
                    .ordering(vec!["-creation_date"]),
            )
            .default_value("is_deleted", false),
        );
        site.register(EntityAdmin::<tree_species::ActiveModel>::new(
            ModelAdmin::new("tree_species")
                .verbose_name("tree species")
                .verbose_name_plural("tree species")
                .list_display(vec!["name"])
                .search_fields(vec!["name"])
                .ordering(vec!["name"]),
        ));
        site.register(EntityAdmin::<crown_diameters::ActiveModel>::new(
            ModelAdmin::new("crown_diameter")
                .list_display(vec!["name"])
                .search_fields(vec!["name"])
                .ordering(vec!["name"]),
        ));
        site.register(EntityAdmin::<canopy_statuses::ActiveModel>::new(
            ModelAdmin::new("canopy_status")
                .verbose_name_plural("canopy statuses")
                .list_display(vec!["name"])
                .search_fields(vec!["name"])
                .ordering(vec!["name"]),
        ));
        site.register(EntityAdmin::<survey_data::ActiveModel>::new(
            ModelAdmin::new("survey_data")
                .verbose_name_plural("survey data")
                .list_display(vec![
                    "name",
                    "tree_specie_id",
                    "crown_diameter_id",
                    "canopy_status_id",
                    "comment",
                    "owner_id",
                    "aoi_id",
                    "longitude",
                    "latitude",
                    "creation_date",
                    "update_date",
                ])
                .search_fields(vec!["name", "comment"])
                .ordering(vec!["-update_date"])
                .inline("photo", "survey_data_id")
                .action("export"),
        ));
        site.register(EntityAdmin::<photos::ActiveModel>::new(
            ModelAdmin::new("photo")
                .list_display(vec!["survey_data_id", "compass", "comment", "img"])
                .search_fields(vec!["comment"]),
        ));
        site.register(EntityAdmin::<metadata::ActiveModel>::new(
            ModelAdmin::new("metadata")
                .verbose_name_plural("metadata")
                .list_display(vec!["key", "value"])
                .search_fields(vec!["key", "value"])
                .ordering(vec!["key"]),
        ));
        site.register(
            EntityAdmin::<users::ActiveModel>::new(
                ModelAdmin::new("user")
                    .list_display(vec!["email", "username", "name", "is_staff", "is_active", "last_login"])
                    .search_fields(vec!["email", "username", "name"])
                    .ordering(vec!["email"]),
            )
            .default_value("occupation", "")
            .default_value("language", "")
            .default_value("is_active", true)
            .default_value("is_staff", false)
            .default_value("is_superuser", false)
            .prepare(Arc::new(move |data: &mut Map<String, Value>, existing: Option<&users::Model>| {
                prepare_user(data, existing, bcrypt_cost)
            })),
        );
        site.register(EntityAdmin::<groups::ActiveModel>::new(
            ModelAdmin::new("group")
                .list_display(vec!["name"])
                .search_fields(vec!["name"])
                .ordering(vec!["name"]),
        ));
        site.register(EntityAdmin::<user_groups::ActiveModel>::new(
            ModelAdmin::new("user_group").list_display(vec!["user_id", "group_id"]),
        ));

        site
    }

    pub fn register(&mut self, resource: impl AdminResource + 'static) {
        let name = resource.admin().model_name.clone();
        self.resources.insert(name, Arc::new(resource));
    }

    pub fn resource(&self, model: &str) -> CoreResult<&Arc<dyn AdminResource>> {
        self.resources
            .get(model)
            .ok_or_else(|| CoreError::not_found("model", model))
    }

    pub fn index(&self) -> SiteIndex {
        let models = self
            .resources
            .values()
            .map(|resource| {
                let admin = resource.admin();
                ModelInfo {
                    name: admin.model_name.clone(),
                    verbose_name: admin.verbose_name.clone(),
                    verbose_name_plural: admin.verbose_name_plural.clone(),
                    url: format!("{}/{}", self.url_prefix, admin.model_name),
                    actions: admin.action_names.clone(),
                }
            })
            .collect();

        SiteIndex {
            site_header: self.labels.site_header.clone(),
            site_title: self.labels.site_title.clone(),
            index_title: self.labels.index_title.clone(),
            models,
        }
    }

    pub async fn list(&self, db: &DatabaseConnection, model: &str, params: &ListParams) -> CoreResult<ListPage> {
        self.resource(model)?.list(db, params).await
    }

    /// Record with its inline children under `inlines.<model>`.
    pub async fn detail(&self, db: &DatabaseConnection, model: &str, id: i32) -> CoreResult<Value> {
        let resource = self.resource(model)?;
        let mut record = resource.detail(db, id).await?;

        let mut inlines = Map::new();
        for inline in &resource.admin().inlines {
            let rows = self
                .resource(&inline.model_name)?
                .rows_where(db, &inline.fk_column, id)
                .await?;
            inlines.insert(inline.model_name.clone(), Value::Array(rows));
        }
        if let Value::Object(map) = &mut record {
            map.insert("inlines".to_string(), Value::Object(inlines));
        }
        Ok(record)
    }

    pub async fn run_action(
        &self,
        db: &DatabaseConnection,
        model: &str,
        action: &str,
        ids: &[i32],
    ) -> CoreResult<ActionResult> {
        let resource = self.resource(model)?;
        self.actions.execute(action, db, resource.as_ref(), ids).await
    }
}

/// Hashes a new password, keeps the stored hash otherwise.
fn prepare_user(
    data: &mut Map<String, Value>,
    existing: Option<&users::Model>,
    bcrypt_cost: u32,
) -> CoreResult<()> {
    if let Some(email) = data.get("email").and_then(Value::as_str) {
        AuthService::validate_email(email)?;
    }

    match data.get("password").and_then(Value::as_str) {
        Some(raw) => {
            let hashed = AuthService::hash_password(raw, bcrypt_cost)?;
            data.insert("password".to_string(), Value::from(hashed));
        }
        None => {
            if let Some(user) = existing {
                data.insert("password".to_string(), Value::from(user.password.clone()));
            }
        }
    }
    Ok(())
}

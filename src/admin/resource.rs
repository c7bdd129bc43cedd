//! CRUD over one sea-orm entity driven by its [`ModelAdmin`].
//!
//! Records travel as JSON. Writes go through `ActiveModel::from_json`, so a
//! payload is checked against the entity's own serde shape: a missing
//! required column is reported as a field error, unknown keys are ignored.

use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr,
    EntityTrait, IntoActiveModel, Order, PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::model_admin::{ListPage, ListParams, ModelAdmin};
use crate::errors::{CoreError, CoreResult, FieldErrors};
use crate::serializers::REQUIRED;

/// A model registered with the admin site.
#[async_trait]
pub trait AdminResource: Send + Sync {
    fn admin(&self) -> &ModelAdmin;

    /// Searched, ordered and paginated `list_display` rows.
    async fn list(&self, db: &DatabaseConnection, params: &ListParams) -> CoreResult<ListPage>;

    /// Full records whose `column` equals `value`, used for inlines.
    async fn rows_where(&self, db: &DatabaseConnection, column: &str, value: i32) -> CoreResult<Vec<Value>>;

    async fn detail(&self, db: &DatabaseConnection, id: i32) -> CoreResult<Value>;

    async fn create(&self, db: &DatabaseConnection, payload: Value) -> CoreResult<Value>;

    async fn update(&self, db: &DatabaseConnection, id: i32, payload: Value) -> CoreResult<Value>;

    async fn delete(&self, db: &DatabaseConnection, id: i32) -> CoreResult<()>;

    async fn delete_many(&self, db: &DatabaseConnection, ids: &[i32]) -> CoreResult<u64>;
}

/// Rewrites a payload before it is turned into a model. Receives the
/// stored record on update.
pub type PrepareFn<M> = Arc<dyn Fn(&mut Map<String, Value>, Option<&M>) -> CoreResult<()> + Send + Sync>;

type ModelOf<A> = <<A as ActiveModelTrait>::Entity as EntityTrait>::Model;
type ColumnOf<A> = <<A as ActiveModelTrait>::Entity as EntityTrait>::Column;

/// [`AdminResource`] for the entity behind active model `A`.
pub struct EntityAdmin<A: ActiveModelTrait> {
    admin: ModelAdmin,
    defaults: Map<String, Value>,
    prepare: Option<PrepareFn<ModelOf<A>>>,
    _model: PhantomData<fn() -> A>,
}

impl<A> EntityAdmin<A>
where
    A: ActiveModelTrait + ActiveModelBehavior + Send + Sync + 'static,
    ModelOf<A>: IntoActiveModel<A> + Serialize + DeserializeOwned + Display + Send + Sync,
    ColumnOf<A>: FromStr,
{
    pub fn new(admin: ModelAdmin) -> Self {
        Self {
            admin,
            defaults: Map::new(),
            prepare: None,
            _model: PhantomData,
        }
    }

    /// Value used on create when the payload leaves `field` out.
    #[must_use]
    pub fn default_value(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.defaults.insert(field.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn prepare(mut self, prepare: PrepareFn<ModelOf<A>>) -> Self {
        self.prepare = Some(prepare);
        self
    }

    fn column(&self, name: &str) -> CoreResult<ColumnOf<A>> {
        ColumnOf::<A>::from_str(name).map_err(|_| {
            CoreError::validation(format!(
                "Unknown field '{}' on {}",
                name, self.admin.model_name
            ))
        })
    }

    fn has_column(&self, name: &str) -> bool {
        ColumnOf::<A>::from_str(name).is_ok()
    }

    fn op(&self, verb: &str) -> String {
        format!("{} {}", verb, self.admin.model_name)
    }

    async fn find(&self, db: &DatabaseConnection, id: i32) -> CoreResult<ModelOf<A>> {
        A::Entity::find()
            .filter(self.column("id")?.eq(id))
            .one(db)
            .await
            .map_err(|e| CoreError::db(&self.op("find"), e))?
            .ok_or_else(|| CoreError::not_found(self.admin.model_name.clone(), id))
    }

    fn record(&self, model: &ModelOf<A>) -> CoreResult<Map<String, Value>> {
        match serde_json::to_value(model) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(CoreError::internal(format!(
                "{} does not serialize to an object",
                self.admin.model_name
            ))),
            Err(e) => Err(CoreError::internal(format!("serialize {}: {}", self.admin.model_name, e))),
        }
    }

    /// Serialized record plus its `pk` and `label`.
    fn labelled(&self, model: &ModelOf<A>) -> CoreResult<Value> {
        let mut map = self.record(model)?;
        let pk = map.get("id").cloned().unwrap_or(Value::Null);
        map.insert("pk".to_string(), pk);
        map.insert("label".to_string(), Value::from(model.to_string()));
        Ok(Value::Object(map))
    }

    fn refresh_timestamps(&self, data: &mut Map<String, Value>, creating: bool) {
        let now = Value::from(Utc::now().to_rfc3339());
        if creating && self.has_column("creation_date") && !data.contains_key("creation_date") {
            data.insert("creation_date".to_string(), now.clone());
        }
        if self.has_column("update_date") {
            data.insert("update_date".to_string(), now);
        }
    }
}

#[async_trait]
impl<A> AdminResource for EntityAdmin<A>
where
    A: ActiveModelTrait + ActiveModelBehavior + Send + Sync + 'static,
    ModelOf<A>: IntoActiveModel<A> + Serialize + DeserializeOwned + Display + Send + Sync,
    ColumnOf<A>: FromStr + Send + Sync,
{
    fn admin(&self) -> &ModelAdmin {
        &self.admin
    }

    async fn list(&self, db: &DatabaseConnection, params: &ListParams) -> CoreResult<ListPage> {
        let mut query = A::Entity::find();

        if let Some(q) = params.search() {
            let mut any = Condition::any();
            for field in &self.admin.search_fields {
                any = any.add(self.column(field)?.contains(q));
            }
            query = query.filter(any);
        }

        for field in &self.admin.ordering {
            let (name, order) = match field.strip_prefix('-') {
                Some(name) => (name, Order::Desc),
                None => (field.as_str(), Order::Asc),
            };
            query = query.order_by(self.column(name)?, order);
        }

        let per_page = params.per_page(self.admin.list_per_page);
        let page = params.page();
        let paginator = query.paginate(db, per_page);
        let count = paginator
            .num_items()
            .await
            .map_err(|e| CoreError::db(&self.op("count"), e))?;
        let models = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| CoreError::db(&self.op("list"), e))?;

        let mut results = Vec::with_capacity(models.len());
        for model in &models {
            let record = Value::Object(self.record(model)?);
            let pk = record.get("id").and_then(Value::as_i64).unwrap_or_default() as i32;
            results.push(self.admin.list_row(&record, pk, model.to_string()));
        }

        Ok(ListPage::new(results, count, page, per_page))
    }

    async fn rows_where(&self, db: &DatabaseConnection, column: &str, value: i32) -> CoreResult<Vec<Value>> {
        let models = A::Entity::find()
            .filter(self.column(column)?.eq(value))
            .order_by(self.column("id")?, Order::Asc)
            .all(db)
            .await
            .map_err(|e| CoreError::db(&self.op("list"), e))?;
        models.iter().map(|model| self.labelled(model)).collect()
    }

    async fn detail(&self, db: &DatabaseConnection, id: i32) -> CoreResult<Value> {
        let model = self.find(db, id).await?;
        self.labelled(&model)
    }

    async fn create(&self, db: &DatabaseConnection, payload: Value) -> CoreResult<Value> {
        let mut data = payload_object(payload)?;
        data.remove("pk");
        for (field, value) in &self.defaults {
            data.entry(field.clone()).or_insert_with(|| value.clone());
        }
        self.refresh_timestamps(&mut data, true);
        if let Some(prepare) = &self.prepare {
            prepare(&mut data, None)?;
        }
        // Placeholder so the model deserializes; the database assigns the id.
        data.insert("id".to_string(), Value::from(0));

        let mut active = A::from_json(Value::Object(data)).map_err(payload_error)?;
        active.not_set(self.column("id")?);

        let model = active
            .insert(db)
            .await
            .map_err(|e| CoreError::db(&self.op("create"), e))?;
        tracing::info!("admin created {} {}", self.admin.model_name, model);
        self.labelled(&model)
    }

    async fn update(&self, db: &DatabaseConnection, id: i32, payload: Value) -> CoreResult<Value> {
        let existing = self.find(db, id).await?;
        let mut data = self.record(&existing)?;
        for (field, value) in payload_object(payload)? {
            if field != "id" && field != "pk" {
                data.insert(field, value);
            }
        }
        self.refresh_timestamps(&mut data, false);
        if let Some(prepare) = &self.prepare {
            prepare(&mut data, Some(&existing))?;
        }
        data.insert("id".to_string(), Value::from(id));

        let mut active = existing.into_active_model();
        active
            .set_from_json(Value::Object(data))
            .map_err(payload_error)?;
        let model = active
            .update(db)
            .await
            .map_err(|e| CoreError::db(&self.op("update"), e))?;
        self.labelled(&model)
    }

    async fn delete(&self, db: &DatabaseConnection, id: i32) -> CoreResult<()> {
        let result = A::Entity::delete_many()
            .filter(self.column("id")?.eq(id))
            .exec(db)
            .await
            .map_err(|e| CoreError::db(&self.op("delete"), e))?;
        if result.rows_affected == 0 {
            return Err(CoreError::not_found(self.admin.model_name.clone(), id));
        }
        tracing::info!("admin deleted {} {}", self.admin.model_name, id);
        Ok(())
    }

    async fn delete_many(&self, db: &DatabaseConnection, ids: &[i32]) -> CoreResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = A::Entity::delete_many()
            .filter(self.column("id")?.is_in(ids.iter().copied()))
            .exec(db)
            .await
            .map_err(|e| CoreError::db(&self.op("delete"), e))?;
        Ok(result.rows_affected)
    }
}

fn payload_object(payload: Value) -> CoreResult<Map<String, Value>> {
    match payload {
        Value::Object(map) => Ok(map),
        _ => Err(CoreError::validation("Expected a JSON object")),
    }
}

/// `missing field `x`` becomes `{x: ["This field is required."]}`; other
/// shape errors are reported as a whole.
fn payload_error(err: DbErr) -> CoreError {
    let message = match err {
        DbErr::Json(message) => message,
        other => return CoreError::db("decode payload", other),
    };

    if let Some(field) = message
        .strip_prefix("missing field `")
        .and_then(|rest| rest.split('`').next())
    {
        let mut fields = FieldErrors::new();
        fields.insert(field.to_string(), vec![REQUIRED.to_string()]);
        return CoreError::validation("Invalid input").with_fields(fields);
    }

    let mut fields = FieldErrors::new();
    fields.insert("non_field_errors".to_string(), vec![message]);
    CoreError::validation("Invalid input").with_fields(fields)
}

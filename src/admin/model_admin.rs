//! Per-model admin configuration and list pagination.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a model shows up in the admin: which columns the list view renders,
/// which columns the search box looks at, default ordering and inline
/// child models shown on the detail view.
///
/// ```
/// use treechecker::admin::ModelAdmin;
///
/// let admin = ModelAdmin::new("country")
///     .list_display(vec!["name", "code"])
///     .search_fields(vec!["name", "code"])
///     .ordering(vec!["name"]);
/// assert_eq!(admin.search_fields.len(), 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelAdmin {
    pub model_name: String,
    pub verbose_name: String,
    pub verbose_name_plural: String,
    pub list_display: Vec<String>,
    pub search_fields: Vec<String>,
    /// Column names, `-` prefix for descending.
    pub ordering: Vec<String>,
    pub list_per_page: u64,
    pub inlines: Vec<InlineAdmin>,
    pub action_names: Vec<String>,
}

/// A child model edited along with its parent, e.g. photos of a survey.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InlineAdmin {
    pub model_name: String,
    /// Column of the child that points at the parent.
    pub fk_column: String,
}

impl ModelAdmin {
    pub fn new(model_name: impl Into<String>) -> Self {
        let model = model_name.into();
        let verbose = model.replace('_', " ");
        let verbose_plural = format!("{verbose}s");
        Self {
            model_name: model,
            verbose_name: verbose,
            verbose_name_plural: verbose_plural,
            list_display: vec!["id".to_string()],
            search_fields: Vec::new(),
            ordering: vec!["id".to_string()],
            list_per_page: 100,
            inlines: Vec::new(),
            action_names: vec!["delete_selected".to_string()],
        }
    }

    #[must_use]
    pub fn verbose_name(mut self, name: impl Into<String>) -> Self {
        self.verbose_name = name.into();
        self
    }

    #[must_use]
    pub fn verbose_name_plural(mut self, name: impl Into<String>) -> Self {
        self.verbose_name_plural = name.into();
        self
    }

    #[must_use]
    pub fn list_display(mut self, fields: Vec<&str>) -> Self {
        self.list_display = fields.into_iter().map(String::from).collect();
        self
    }

    #[must_use]
    pub fn search_fields(mut self, fields: Vec<&str>) -> Self {
        self.search_fields = fields.into_iter().map(String::from).collect();
        self
    }

    #[must_use]
    pub fn ordering(mut self, fields: Vec<&str>) -> Self {
        self.ordering = fields.into_iter().map(String::from).collect();
        self
    }

    #[must_use]
    pub fn list_per_page(mut self, per_page: u64) -> Self {
        self.list_per_page = per_page.max(1);
        self
    }

    #[must_use]
    pub fn inline(mut self, model_name: &str, fk_column: &str) -> Self {
        self.inlines.push(InlineAdmin {
            model_name: model_name.to_string(),
            fk_column: fk_column.to_string(),
        });
        self
    }

    #[must_use]
    pub fn action(mut self, name: &str) -> Self {
        if !self.action_names.iter().any(|existing| existing == name) {
            self.action_names.push(name.to_string());
        }
        self
    }

    /// Keeps the `list_display` keys of a serialized record, plus the
    /// `pk` and `label` every admin row carries.
    pub fn list_row(&self, record: &Value, pk: i32, label: String) -> Value {
        let mut row = serde_json::Map::new();
        row.insert("pk".to_string(), Value::from(pk));
        row.insert("label".to_string(), Value::from(label));
        for field in &self.list_display {
            let value = record.get(field.as_str()).cloned().unwrap_or(Value::Null);
            row.insert(field.clone(), value);
        }
        Value::Object(row)
    }
}

/// Query string of the list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub q: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl ListParams {
    pub fn search(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }

    /// 1-based page number.
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self, default: u64) -> u64 {
        self.per_page.unwrap_or(default).clamp(1, 1000)
    }
}

/// One page of the list view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPage {
    pub results: Vec<Value>,
    pub count: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl ListPage {
    pub fn new(results: Vec<Value>, count: u64, page: u64, per_page: u64) -> Self {
        let total_pages = count.div_ceil(per_page.max(1)).max(1);
        Self {
            results,
            count,
            page,
            per_page,
            total_pages,
            has_next: page < total_pages,
            has_previous: page > 1,
        }
    }
}

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::resource::AdminResource;
use crate::errors::{CoreError, CoreResult};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    pub affected_count: u64,
}

impl ActionResult {
    pub fn success(message: impl Into<String>, affected_count: u64) -> Self {
        Self {
            success: true,
            message: message.into(),
            affected_count,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            affected_count: 0,
        }
    }
}

/// Body of an action request.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ActionRequest {
    #[serde(default)]
    pub ids: Vec<i32>,
}

/// A bulk operation on the selected records of one model.
#[async_trait]
pub trait AdminAction: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    async fn execute(
        &self,
        db: &DatabaseConnection,
        resource: &dyn AdminResource,
        selected_ids: &[i32],
    ) -> CoreResult<ActionResult>;
}

#[derive(Debug)]
pub struct DeleteSelectedAction;

#[async_trait]
impl AdminAction for DeleteSelectedAction {
    fn name(&self) -> &'static str {
        "delete_selected"
    }

    fn description(&self) -> &'static str {
        "Delete selected objects"
    }

    async fn execute(
        &self,
        db: &DatabaseConnection,
        resource: &dyn AdminResource,
        selected_ids: &[i32],
    ) -> CoreResult<ActionResult> {
        if selected_ids.is_empty() {
            return Ok(ActionResult::failure("No objects selected."));
        }

        let deleted = resource.delete_many(db, selected_ids).await?;
        let admin = resource.admin();
        tracing::info!("deleted {} {} via admin action", deleted, admin.model_name);
        Ok(ActionResult::success(
            format!(
                "Successfully deleted {} {}.",
                deleted,
                if deleted == 1 { &admin.verbose_name } else { &admin.verbose_name_plural }
            ),
            deleted,
        ))
    }
}

pub struct ActionRegistry {
    actions: Vec<Box<dyn AdminAction>>,
}

impl Default for ActionRegistry {
    /// Starts with `delete_selected`.
    fn default() -> Self {
        let mut registry = Self {
            actions: Vec::new(),
        };
        registry.register(Box::new(DeleteSelectedAction));
        registry
    }
}

impl ActionRegistry {
    pub fn register(&mut self, action: Box<dyn AdminAction>) {
        self.actions.push(action);
    }

    pub fn action_names(&self) -> Vec<&'static str> {
        self.actions.iter().map(|a| a.name()).collect()
    }

    /// Runs `action_name` if both the registry and the model allow it.
    pub async fn execute(
        &self,
        action_name: &str,
        db: &DatabaseConnection,
        resource: &dyn AdminResource,
        selected_ids: &[i32],
    ) -> CoreResult<ActionResult> {
        let allowed = resource
            .admin()
            .action_names
            .iter()
            .any(|name| name == action_name);
        let action = self
            .actions
            .iter()
            .find(|a| a.name() == action_name)
            .filter(|_| allowed)
            .ok_or_else(|| CoreError::not_found("action", action_name))?;

        action.execute(db, resource, selected_ids).await
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.action_names())
            .finish()
    }
}

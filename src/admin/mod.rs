//! Staff-only JSON admin over every Treechecker model.
//!
//! Each model is registered on the [`AdminSite`] with a [`ModelAdmin`]
//! describing its list columns, search fields, ordering and inlines. The
//! HTTP surface lives in `server::handlers::admin`.

pub mod actions;
pub mod model_admin;
pub mod resource;
pub mod site;

pub use actions::{ActionRegistry, ActionRequest, ActionResult, AdminAction, DeleteSelectedAction};
pub use model_admin::{InlineAdmin, ListPage, ListParams, ModelAdmin};
pub use resource::{AdminResource, EntityAdmin, PrepareFn};
pub use site::{AdminSite, ModelInfo, SiteIndex};

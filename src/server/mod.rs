pub mod app;
pub mod handlers;
pub mod middleware;
pub mod openapi;

pub use app::{create_app, AppState};

use std::net::SocketAddr;

use anyhow::Result;
use clap::Subcommand;
use sea_orm_migration::prelude::*;
use tracing::info;

use crate::config::Settings;
use crate::database::{connection::*, migrations::Migrator};

#[derive(Subcommand, Debug)]
pub enum MigrateDirection {
    Up,
    Down,
    Fresh,
}

pub async fn start_server(settings: Settings) -> Result<()> {
    let database_url = settings.database_url();
    let db = establish_connection(&database_url).await?;

    // Run migrations
    Migrator::up(&db, None).await?;
    info!("Database migrations completed");

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    info!(
        "Environment {:?} (debug: {})",
        settings.environment(),
        settings.debug()
    );
    let state = AppState::new(db, settings)?;
    let app = create_app(state)?;

    log_routes(&addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server running on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn log_routes(addr: &str) {
    info!("API Endpoints on {}:", addr);
    info!("  /health                     - Health check");
    info!("  /api-docs/openapi.json      - OpenAPI document");
    info!("  /api/*                      - Survey REST API (token, zones, AOIs, observations)");
    info!("  /admin/api/*                - Staff admin (models, actions, exports)");
    info!("  /media/*                    - Uploaded photos");
}

pub async fn migrate_database(database_url: &str, direction: MigrateDirection) -> Result<()> {
    let db = establish_connection(database_url).await?;

    match direction {
        MigrateDirection::Up => {
            info!("Running migrations up");
            Migrator::up(&db, None).await?;
        }
        MigrateDirection::Down => {
            info!("Running migrations down");
            Migrator::down(&db, None).await?;
        }
        MigrateDirection::Fresh => {
            info!("Running fresh migrations (down then up)");
            Migrator::down(&db, None).await?;
            Migrator::up(&db, None).await?;
        }
    }

    info!("Database migration completed");
    Ok(())
}

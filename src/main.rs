use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use treechecker::config::Settings;
use treechecker::database::establish_connection;
use treechecker::server;
use treechecker::services::UserService;

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    /// TOML settings file; `treechecker.toml` is used when present
    #[clap(short, long, global = true)]
    config: Option<PathBuf>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Serve {
        #[clap(short, long)]
        port: Option<u16>,
        #[clap(long)]
        cors_origin: Option<String>,
    },
    Db {
        #[clap(subcommand)]
        command: DbCommands,
    },
    Users {
        #[clap(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand, Debug)]
enum DbCommands {
    Init,
    Migrate {
        #[clap(subcommand)]
        direction: server::MigrateDirection,
    },
}

#[derive(Subcommand, Debug)]
enum UserCommands {
    /// Create training accounts user1..userN in the Team group
    Populate {
        count: u32,
        /// Shared password of the training accounts
        #[clap(long, default_value = "PASSWORD")]
        password: String,
    },
    /// Delete the training accounts
    DeleteDummy {
        #[clap(long)]
        yes: bool,
    },
    CreateSuperuser {
        #[clap(long)]
        email: String,
        #[clap(long)]
        username: String,
        #[clap(long)]
        name: String,
        #[clap(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let mut settings = Settings::load(args.config.as_deref())?;
    setup_logging(args.log_level.as_ref().or(settings.log_level.as_ref()));

    match args.command {
        Commands::Serve { port, cors_origin } => {
            if let Some(port) = port {
                settings.server.port = port;
            }
            if cors_origin.is_some() {
                settings.server.cors_origin = cors_origin;
            }
            info!("Starting server on port {}", settings.server.port);
            server::start_server(settings).await?;
        }
        Commands::Db { command } => match command {
            DbCommands::Init => {
                info!("Initializing database");
                server::migrate_database(&settings.database_url(), server::MigrateDirection::Up)
                    .await?;
            }
            DbCommands::Migrate { direction } => {
                info!("Running database migration: {:?}", direction);
                server::migrate_database(&settings.database_url(), direction).await?;
            }
        },
        Commands::Users { command } => run_user_command(&settings, command).await?,
    }

    Ok(())
}

async fn run_user_command(settings: &Settings, command: UserCommands) -> Result<()> {
    let db = establish_connection(&settings.database_url()).await?;
    let users = UserService::new(db, settings.bcrypt_cost);

    match command {
        UserCommands::Populate { count, password } => {
            let report = users.populate(count, &password).await?;
            if report.group_created {
                info!("Created group 'Team'");
            }
            for username in &report.existing {
                warn!("User {} already exists, skipping", username);
            }
            info!("Created {} users", report.created.len());
        }
        UserCommands::DeleteDummy { yes } => {
            let count = users.count_dummy().await?;
            if count == 0 {
                info!("No dummy users found");
                return Ok(());
            }
            if !yes && !confirm(&format!("Delete {} dummy users?", count))? {
                info!("Aborted");
                return Ok(());
            }
            let deleted = users.delete_dummy().await?;
            info!("Deleted {} dummy users", deleted);
        }
        UserCommands::CreateSuperuser {
            email,
            username,
            name,
            password,
        } => {
            let user = users
                .create_superuser(&email, &username, &name, &password)
                .await?;
            info!("Created superuser {} ({})", user.username, user.email);
        }
    }
    Ok(())
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn setup_logging(log_level: Option<&String>) {
    let log_level = match log_level.map(|level| level.to_lowercase()).as_deref() {
        Some("trace") => Level::TRACE,
        Some("debug") => Level::DEBUG,
        Some("warn") => Level::WARN,
        Some("error") => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("sqlx=warn,{}", log_level)))
        .without_time()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populate_args(args: &[&str]) -> (u32, String) {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Users {
                command: UserCommands::Populate { count, password },
            } => (count, password),
            _ => panic!("expected users populate"),
        }
    }

    #[test]
    fn populate_uses_the_training_password_by_default() {
        let (count, password) = populate_args(&["treechecker", "users", "populate", "3"]);
        assert_eq!(count, 3);
        assert_eq!(password, "PASSWORD");

        let (_, password) = populate_args(&[
            "treechecker",
            "users",
            "populate",
            "2",
            "--password",
            "s3cret",
        ]);
        assert_eq!(password, "s3cret");
    }
}

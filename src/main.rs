//! Operator CLI for the live-class Zoom integration.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use domain::gateway::zoom::{Client, CreateMeetingRequest};
use domain::{live_class, zoom_config};
use dotenvy::dotenv;
use log::{error, info};
use migration::{Migrator, MigratorTrait};
use secrecy::SecretString;
use service::{config::Config, logging::Logger, AppState};
use std::error::Error as StdError;
use std::sync::Arc;

type CliResult = Result<String, Box<dyn StdError + Send + Sync>>;

#[derive(Debug, Parser)]
#[command(author, version, about = "Manage Zoom credentials and schedule live-class meetings")]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the masked Zoom configuration of a tenant
    ConfigShow {
        /// Tenant to address; omit for the deployment-wide default record
        #[arg(long)]
        tenant_id: Option<String>,
    },
    /// Create or update the Zoom configuration of a tenant
    ConfigSet {
        #[arg(long)]
        tenant_id: Option<String>,
        #[arg(long)]
        client_id: Option<String>,
        /// New client secret. An empty value clears it; the masked placeholder keeps it.
        #[arg(long, env = "ZOOM_CLIENT_SECRET", hide_env_values = true)]
        client_secret: Option<String>,
        #[arg(long)]
        account_id: Option<String>,
        #[arg(long)]
        enabled: Option<bool>,
    },
    /// Schedule a meeting with the tenant's Zoom account
    CreateMeeting {
        #[arg(long)]
        tenant_id: Option<String>,
        #[arg(long)]
        topic: String,
        /// RFC 3339 start time, e.g. 2025-01-10T10:00:00Z
        #[arg(long)]
        start_time: DateTime<Utc>,
        /// Duration in minutes
        #[arg(long)]
        duration: u32,
        #[arg(long)]
        timezone: Option<String>,
        #[arg(long)]
        agenda: Option<String>,
    },
    /// Apply pending database migrations
    Migrate,
}

#[tokio::main]
async fn main() {
    // Load .env file first
    dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = Logger::init_logger(&cli.config) {
        eprintln!("Failed to start logger: {e}");
        std::process::exit(1);
    }

    if requires_encryption_key(&cli.command, &cli.config) {
        if let Err(e) = zoom_config::encryption_key(&cli.config) {
            error!("ENCRYPTION_KEY must be 64 hex characters: {e}");
            std::process::exit(1);
        }
    }

    let db = match service::init_database(&cli.config).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to establish database connection: {e}");
            std::process::exit(1);
        }
    };

    let app_state = AppState::new(cli.config, &db);

    match run(cli.command, &app_state).await {
        Ok(output) => println!("{output}"),
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    }
}

/// Every command touching stored secrets needs the key. In production it is required even
/// for `migrate`, so a deployment without a key never gets as far as the database.
fn requires_encryption_key(command: &Command, config: &Config) -> bool {
    config.is_production() || !matches!(command, Command::Migrate)
}

async fn run(command: Command, app_state: &AppState) -> CliResult {
    let db = app_state.db_conn_ref();
    let config = &app_state.config;

    match command {
        Command::Migrate => {
            info!("Applying migrations to [{}]...", config.database_url());
            Migrator::up(db, None).await?;
            Ok("Migrations applied".to_string())
        }
        Command::ConfigShow { tenant_id } => {
            let store = zoom_config::credential_store(db, config)?;
            let display = zoom_config::get(&store, tenant_id.as_deref()).await?;
            Ok(serde_json::to_string_pretty(&display)?)
        }
        Command::ConfigSet {
            tenant_id,
            client_id,
            client_secret,
            account_id,
            enabled,
        } => {
            let store = zoom_config::credential_store(db, config)?;
            let update = zoom_config::CredentialUpdate {
                client_id,
                client_secret: client_secret.map(SecretString::new),
                account_id,
                is_enabled: enabled,
            };
            let display = zoom_config::put(&store, tenant_id.as_deref(), update).await?;
            Ok(serde_json::to_string_pretty(&display)?)
        }
        Command::CreateMeeting {
            tenant_id,
            topic,
            start_time,
            duration,
            timezone,
            agenda,
        } => {
            let store = zoom_config::credential_store(db, config)?;
            let client = Client::from_config(config)?;
            let request = CreateMeetingRequest {
                timezone,
                agenda,
                ..CreateMeetingRequest::new(&topic, start_time, duration)
            };
            let meeting =
                live_class::schedule_meeting(&store, &client, tenant_id.as_deref(), &request)
                    .await?;
            Ok(serde_json::to_string_pretty(&meeting)?)
        }
    }
}

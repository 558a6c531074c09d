mod scheduler;
mod sync;

use clap::{Parser, Subcommand};
use sproutsync_core::{AppConfig, Environment};
use sproutsync_engine::{EngineSettings, SyncEngine};
use sproutsync_sheets::{GoogleStore, OAuthRefreshProvider};
use sproutsync_sprout::SproutClient;
use tracing_subscriber::EnvFilter;

pub(crate) type Engine = SyncEngine<SproutClient, GoogleStore, OAuthRefreshProvider>;

#[derive(Debug, Parser)]
#[command(name = "sproutsync")]
#[command(about = "Sync Sprout Social analytics into per-group Google Sheets")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one sync over every group (or a single one)
    Sync {
        /// Only sync the group with this name (case-insensitive)
        #[arg(long)]
        group: Option<String>,
        /// Fetch and merge analytics, report row counts, write nothing
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the resolved groups and their per-network profiles
    Groups,
    /// Run `sync` on the configured cron schedule until interrupted
    Schedule,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = sproutsync_core::load_app_config()?;
    init_tracing(&config)?;
    tracing::debug!(config = ?config, "configuration loaded");

    match cli.command {
        Some(Commands::Sync { group, dry_run }) => {
            let engine = build_engine(&config)?;
            if dry_run {
                sync::run_preview(&engine, group.as_deref()).await
            } else {
                sync::run_sync(&engine, group.as_deref()).await
            }
        }
        Some(Commands::Groups) => sync::run_groups(&build_engine(&config)?).await,
        Some(Commands::Schedule) => scheduler::run_schedule(build_engine(&config)?, &config).await,
        None => {
            println!("sproutsync: pass --help for available commands");
            Ok(())
        }
    }
}

fn init_tracing(config: &AppConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    if config.env == Environment::Production {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
    Ok(())
}

fn build_engine(config: &AppConfig) -> anyhow::Result<Engine> {
    let source = SproutClient::with_base_url(
        &config.sprout_api_token,
        &config.sprout_customer_id,
        config.request_timeout_secs,
        &config.sprout_base_url,
    )?;
    let store = GoogleStore::new(config.request_timeout_secs)?;
    let provider = OAuthRefreshProvider::new(
        &config.google_client_id,
        &config.google_client_secret,
        &config.google_refresh_token,
        config.request_timeout_secs,
    )?;
    Ok(SyncEngine::new(
        source,
        store,
        provider,
        EngineSettings::from_app_config(config),
    ))
}

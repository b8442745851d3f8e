use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use shipment_sync_lib::application::ports::ActionLog;
use shipment_sync_lib::infrastructure::database::Database;
use shipment_sync_lib::infrastructure::offline::SqliteActionLog;
use shipment_sync_lib::shared::config::AppConfig;
use std::collections::BTreeMap;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "sync-queue")]
#[command(about = "Inspect and maintain the offline sync queue", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// SQLite database holding the queue
    #[arg(long, env = "SHIPMENT_SYNC_DATABASE_URL")]
    database_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print pending counts as JSON
    Stats,
    /// Print every decodable pending action in replay order as JSON
    List,
    /// Discard every pending action
    Clear {
        /// Confirm that pending changes will be lost
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsOutput {
    pending: u64,
    by_type: BTreeMap<String, u64>,
    retrying: u64,
    corrupt: u64,
    oldest: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    shipment_sync_lib::init_logging();

    let mut config = AppConfig::from_env();
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }
    let pool = Database::initialize(&config.database).await?;
    let log = SqliteActionLog::new(pool);

    match cli.command {
        Commands::Stats => print_stats(&log).await?,
        Commands::List => {
            let scan = log.scan().await?;
            for entry in &scan.corrupt {
                warn!("{} ({}) cannot be decoded: {}", entry.action_id, entry.action_type, entry.error);
            }
            println!("{}", serde_json::to_string_pretty(&scan.actions)?);
        }
        Commands::Clear { yes } => {
            if !yes {
                bail!("refusing to clear the queue without --yes");
            }
            let discarded = log.clear().await?;
            warn!("discarded {} pending actions", discarded);
            println!("{}", serde_json::json!({ "discarded": discarded }));
        }
    }

    Ok(())
}

async fn print_stats(log: &SqliteActionLog) -> Result<()> {
    let scan = log.scan().await?;
    let actions = &scan.actions;
    let mut by_type = BTreeMap::new();
    for action in actions {
        *by_type.entry(action.kind().to_string()).or_insert(0u64) += 1;
    }

    let output = StatsOutput {
        pending: log.size().await?,
        by_type,
        retrying: actions.iter().filter(|a| a.retries > 0).count() as u64,
        corrupt: scan.corrupt.len() as u64,
        oldest: actions.first().map(|a| a.timestamp.to_rfc3339()),
    };
    info!("queue holds {} actions", output.pending);
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

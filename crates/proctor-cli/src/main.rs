mod server;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use proctor_core::persistence::SqliteSink;
use proctor_core::{ProctorConfig, SessionManager};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about = "Real-time exam-proctoring correlation engine", long_about = None)]
struct Cli {
    /// Directory holding the engine's config and durable session store.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the WebSocket ingress server.
    Serve {
        /// Override the configured listen address (host:port).
        #[arg(long)]
        listen_addr: Option<String>,
    },
    /// Print the effective configuration and exit.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| ProctorConfig::default().data_dir);
    let config = ProctorConfig::load_or_default(&data_dir).context("loading configuration")?;
    config.validate().context("validating configuration")?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    match cli.command {
        Commands::Serve { listen_addr } => cmd_serve(config, listen_addr).await,
        Commands::Status => cmd_status(&config),
    }
}

async fn cmd_serve(mut config: ProctorConfig, listen_addr: Option<String>) -> Result<()> {
    if let Some(addr) = listen_addr {
        config.listen_addr = addr;
    }

    let db_path = config.data_dir.join("sessions.db");
    let sink = Arc::new(SqliteSink::open(&db_path).context("opening session store")?);
    let manager = Arc::new(SessionManager::new(config.clone(), sink));

    let idle_period = Duration::from_secs(config.idle_timeout_secs.max(1) / 4 + 1);
    tokio::spawn(server::run_idle_reaper(manager.clone(), idle_period));

    let state = Arc::new(server::AppState { manager, config: config.clone() });
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    log::info!("listening on {}", config.listen_addr);
    axum::serve(listener, app).await.context("serving")?;
    Ok(())
}

fn cmd_status(config: &ProctorConfig) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

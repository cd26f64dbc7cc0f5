pub mod client;
pub mod model;
pub mod protocol;
pub mod server;
pub mod storage;
pub mod ui;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use client::transport::UdsTransport;
use model::permission::{PermissionLevel, Requester};
use protocol::default_socket_path;
use server::daemon::{SearchDaemon, ServerConfig};
use server::executor::QueryExecutor;
use server::menu::MenuRegistry;
use storage::sqlite::Catalog;

/// Command-line interface.
#[derive(Parser, Debug)]
#[command(
    name = "qpal",
    version,
    about = "Quick search palette over documents, accounts, and admin actions"
)]
pub struct Cli {
    /// Daemon socket path (defaults to a per-user path under /tmp)
    #[arg(long, env = "QPAL_SOCKET")]
    pub socket: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open the interactive palette
    Palette {
        /// Render once and exit (headless-friendly)
        #[arg(long, default_value_t = false)]
        once: bool,

        /// Account id presented to the daemon
        #[arg(long, default_value_t = 1)]
        account: i64,

        /// Permission tier presented to the daemon
        #[arg(long, value_enum, default_value_t = PermissionLevel::EditOthers)]
        level: PermissionLevel,
    },
    /// Run the search daemon
    Serve {
        /// Path to the SQLite catalog (defaults to platform data dir)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Run one query against the daemon and print the response as JSON
    Search {
        /// Query text; d:/u:/a: prefixes pick the domain
        term: String,

        #[arg(long, default_value_t = 1)]
        account: i64,

        #[arg(long, value_enum, default_value_t = PermissionLevel::EditOthers)]
        level: PermissionLevel,
    },
    /// Load catalog fixtures from a JSON file
    Seed {
        file: PathBuf,

        /// Path to the SQLite catalog (defaults to platform data dir)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Print daemon health as JSON
    Health,
    /// Ask the daemon to shut down
    Stop,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let socket_path = cli.socket.clone().unwrap_or_else(default_socket_path);

    match cli.command {
        Commands::Palette {
            once,
            account,
            level,
        } => {
            let picked = ui::palette::run_palette(ui::palette::PaletteOptions {
                socket_path,
                requester: Requester {
                    account_id: account,
                    level,
                },
                once,
            })
            .await?;
            if let Some(locator) = picked {
                println!("{locator}");
            }
            Ok(())
        }
        Commands::Serve { db } => serve(socket_path, db).await,
        Commands::Search {
            term,
            account,
            level,
        } => {
            let routed = client::router::route(&term, model::types::DomainId::Documents);
            let transport = UdsTransport::new(socket_path);
            let resp = client::transport::SearchTransport::search(
                &transport,
                routed.cleaned_term,
                routed.domain,
                "cli".to_string(),
                Requester {
                    account_id: account,
                    level,
                },
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&resp)?);
            Ok(())
        }
        Commands::Seed { file, db } => {
            let db_path = db.unwrap_or_else(default_db_path);
            if let Some(parent) = db_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let catalog = Catalog::open(&db_path)?;
            let body = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let seed: storage::sqlite::SeedFile = serde_json::from_str(&body)
                .with_context(|| format!("parsing {}", file.display()))?;
            let inserted = catalog.seed(&seed)?;
            info!(db = %db_path.display(), inserted = inserted, "catalog seeded");
            Ok(())
        }
        Commands::Health => {
            let transport = UdsTransport::new(socket_path);
            let status = transport.health().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(())
        }
        Commands::Stop => {
            let transport = UdsTransport::new(socket_path);
            let message = transport.shutdown().await?;
            info!(message = %message, "daemon acknowledged shutdown");
            Ok(())
        }
    }
}

async fn serve(socket_path: PathBuf, db_override: Option<PathBuf>) -> Result<()> {
    let mut config = ServerConfig::from_env();
    config.socket_path = socket_path;
    if let Some(db) = db_override {
        config.db_path = db;
    }
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let catalog = Arc::new(Catalog::open(&config.db_path)?);
    let executor = Arc::new(QueryExecutor::new(
        catalog,
        MenuRegistry::builtin(),
        config.categories.clone(),
    ));
    let daemon = Arc::new(SearchDaemon::new(config, executor));

    let signal_daemon = Arc::clone(&daemon);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            signal_daemon.request_shutdown();
        }
    });

    let run_daemon = Arc::clone(&daemon);
    tokio::task::spawn_blocking(move || run_daemon.run())
        .await
        .context("daemon task panicked")??;
    Ok(())
}

pub fn default_db_path() -> PathBuf {
    default_data_dir().join("catalog.db")
}

pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "quick-palette", "quick-palette")
        .expect("project dirs available")
        .data_dir()
        .to_path_buf()
}

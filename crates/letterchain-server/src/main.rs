//! letterchain-server binary entry point.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use letterchain_core::iptrack::ActivityLog;
use letterchain_core::{Dictionary, LeaderboardStore, SessionStore, WordSet};
use letterchain_server::store::{
    open_database, SqliteActivityLog, SqliteLeaderboardStore, SqliteSessionStore,
};
use letterchain_server::{router, AppState, ServerConfig};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Fallback word list baked into the binary; enough for development, not
/// for play.
const EMBEDDED_WORDS_ES: &str = include_str!("words_es.txt");

/// LetterChain word-chain game server
#[derive(Parser, Debug)]
#[command(name = "letterchain-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "letterchain.toml")]
    config: PathBuf,

    /// Bind address (overrides the config file)
    #[arg(long)]
    bind: Option<String>,

    /// SQLite database path (overrides the config file)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Log level filter (e.g. "info", "letterchain_server=debug")
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = if args.config.exists() {
        ServerConfig::from_file(&args.config)
            .with_context(|| format!("failed to load config from {}", args.config.display()))?
    } else {
        info!(path = %args.config.display(), "no config file, using defaults");
        ServerConfig::default()
    };
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(database) = args.database {
        config.database = database;
    }

    let dictionary = load_dictionary(&config)?;
    info!(words = dictionary.len(), "dictionary loaded");
    let dictionary: Arc<dyn Dictionary> = Arc::new(dictionary);

    let conn = open_database(&config.database)
        .with_context(|| format!("failed to open database at {}", config.database.display()))?;
    let sessions: Arc<dyn SessionStore> = Arc::new(SqliteSessionStore::new(Arc::clone(&conn)));
    let leaderboard: Arc<dyn LeaderboardStore> =
        Arc::new(SqliteLeaderboardStore::new(Arc::clone(&conn)));
    let activity_log: Arc<dyn ActivityLog> = Arc::new(SqliteActivityLog::new(conn));

    let state = AppState::new(&config, sessions, leaderboard, dictionary, activity_log);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!(addr = %config.bind, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shut down cleanly");
    Ok(())
}

fn load_dictionary(config: &ServerConfig) -> Result<WordSet> {
    match &config.dictionary_file {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read dictionary {}", path.display()))?;
            Ok(WordSet::from_newline_separated(&content))
        },
        None => Ok(WordSet::from_newline_separated(EMBEDDED_WORDS_ES)),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install ctrl-c handler");
    }
}

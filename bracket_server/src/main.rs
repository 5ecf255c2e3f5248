//! Tournament bracket server.
//!
//! Serves the bracket engine over HTTP, backed by PostgreSQL or, for local
//! use, by an in-process store.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use bracket_engine::{
    BracketService,
    db::{Database, InMemoryStore, PgMatchRepository, PgTeamRepository},
};
use bracket_server::{
    api::{self, AppState},
    config::ServerConfig,
    logging,
};
use pico_args::Arguments;
use tracing::{error, info};

const HELP: &str = "\
Run the tournament bracket server

USAGE:
  bracket_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --db-url     URL         Database connection string  [default: env DATABASE_URL or postgres://postgres@localhost/bracket_db]

FLAGS:
  --in-memory              Keep brackets in memory instead of PostgreSQL
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  BRACKET_MAX_CAS_RETRIES  Attempts to place a winner under contention [default: 8]
  RUST_LOG                 Log filter [default: info,sqlx=warn,hyper=warn]
  (See .env file for all configuration options)
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        in_memory: pargs.contains("--in-memory"),
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url, args.in_memory)?;
    config.validate()?;

    info!("Starting bracket server at {}", config.bind);

    let service = if config.in_memory {
        info!("Using in-memory storage, brackets are lost on shutdown");
        let store = InMemoryStore::new();
        BracketService::new(
            Arc::new(store.clone()),
            Arc::new(store),
            config.engine.clone(),
        )
    } else {
        info!("Connecting to database");
        let db = Database::new(&config.database)
            .await
            .context("Failed to connect to database")?;
        db.migrate()
            .await
            .context("Failed to create bracket tables")?;
        info!("Database connected successfully");

        let pool = db.pool().clone();
        BracketService::new(
            Arc::new(PgMatchRepository::new(pool.clone())),
            Arc::new(PgTeamRepository::new(pool)),
            config.engine.clone(),
        )
    };

    let app = api::create_router(AppState { service });

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
}

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use cradle_server::{RuntimeMode, ServerConfig};
use tracing_subscriber::EnvFilter;

// ── CLI definition ─────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "cradled",
    about = "Cradled — Cradle Bridge Schools API server daemon",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port to listen on
        #[arg(long, env = "CRADLE_PORT", default_value_t = cradle_server::server::DEFAULT_PORT)]
        port: u16,
        /// Host to bind
        #[arg(long, env = "CRADLE_HOST", default_value = "0.0.0.0")]
        host: String,
        /// Log level: error, warn, info, debug, verbose
        #[arg(long, env = "CRADLE_LOG_LEVEL")]
        log_level: Option<String>,
        /// Runtime environment: development or production
        #[arg(long = "env", env = "CRADLE_ENV", default_value = "development")]
        mode: RuntimeMode,
        /// Allowed CORS origin(s), comma separated
        #[arg(long, env = "CRADLE_FRONTEND_URL", default_value = cradle_server::server::DEFAULT_FRONTEND_URL)]
        frontend_url: String,
        /// Rate-limit window, e.g. "15m"
        #[arg(long, env = "CRADLE_RATE_LIMIT_WINDOW", default_value = "15m", value_parser = humantime::parse_duration)]
        rate_limit_window: Duration,
        /// Requests allowed per client per window
        #[arg(long, env = "CRADLE_RATE_LIMIT_MAX", default_value_t = cradle_server::ratelimit::DEFAULT_MAX_REQUESTS)]
        rate_limit_max: u32,
        /// Keep records in a database file instead of memory
        #[arg(long)]
        persist: bool,
        /// Database directory (implies --persist)
        #[arg(long, env = "CRADLE_DATA_DIR")]
        data_dir: Option<PathBuf>,
        /// Accept any bearer token as the development admin when no identity
        /// provider is configured, even in production
        #[arg(long, env = "CRADLE_ALLOW_DEV_AUTH")]
        allow_dev_auth: bool,
    },
    /// Print every record of a persistent store as JSON (offline).
    Export {
        /// Database directory (default: $CRADLE_DATA_DIR or the platform data dir)
        #[arg(long, env = "CRADLE_DATA_DIR")]
        data_dir: Option<PathBuf>,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let effective_log_level = if let Commands::Serve { ref log_level, .. } = cli.command {
        let raw = log_level.clone().unwrap_or_else(|| "info".into());
        if raw.eq_ignore_ascii_case("verbose") {
            "debug".to_owned()
        } else {
            raw
        }
    } else {
        std::env::var("CRADLE_LOG_LEVEL").unwrap_or_else(|_| "warn".into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&effective_log_level))
        .init();

    match cli.command {
        Commands::Serve {
            port,
            host,
            log_level: _,
            mode,
            frontend_url,
            rate_limit_window,
            rate_limit_max,
            persist,
            data_dir,
            allow_dev_auth,
        } => {
            let cfg = ServerConfig {
                host,
                port,
                frontend_url,
                mode,
                rate_limit_window,
                rate_limit_max,
                allow_dev_auth,
                persist: persist || data_dir.is_some(),
                data_dir,
                ..ServerConfig::from_env()?
            };
            cradle_server::run(cfg).await
        }

        Commands::Export { data_dir } => cmd_export(data_dir),
    }
}

// ── Command implementations ───────────────────────────────────────────────────

fn cmd_export(data_dir: Option<PathBuf>) -> Result<()> {
    let data_dir = cradle_server::resolve_data_dir(data_dir.as_ref())?;
    let db_path = data_dir.join(cradle_server::DB_FILE);
    if !db_path.exists() {
        bail!("no database at {}; has the server run with --persist?", db_path.display());
    }

    let store = cradle_server::store::Store::open(&db_path).context("open store")?;
    let snapshot = store.snapshot()?;
    let json = serde_json::to_string_pretty(&snapshot).context("encode snapshot")?;
    println!("{json}");
    Ok(())
}

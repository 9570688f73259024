//! wifipos CLI: serve the positioning API, manage config and the upload password,
//! or run a one-off estimate against the configured database.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use wifipos::auth::{self, PasswordGate};
use wifipos::config::{self, Config, CONFIG_FILE};
use wifipos::server::{self, AppState};
use wifipos::utils::init_logging;
use wifipos::{Estimator, PositionReport, SqliteProvider};

#[derive(Debug, Parser)]
#[command(
    name = "wifipos",
    author,
    version,
    about = "WiFi fingerprint positioning server",
    long_about = None
)]
struct Args {
    /// Path to the configuration file (TOML)
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Print the default configuration to stdout and exit
    #[arg(long)]
    print_default_config: bool,

    /// Command to execute
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API until Ctrl-C
    Serve,
    /// Write a commented default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Read a new upload password from stdin and store its hash
    Passwd {
        /// Output path (defaults to auth.password_file from the config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Estimate the position of a JSON query file against the database
    Estimate {
        /// File holding `{"wifi_data": [{"bssid": ..., "rssi": ...}]}`
        #[arg(short, long, value_name = "JSON")]
        query: PathBuf,
    },
}

/// Load and validate the configuration, then start logging.
fn prepare(path: &Path, debug: bool) -> Result<Config> {
    let found = path.exists();
    let config = if found {
        Config::from_file(path).with_context(|| format!("Failed to load {}", path.display()))?
    } else {
        Config::load()?
    };
    init_logging(if debug { "debug" } else { config.log_level.as_str() });
    if !found {
        log::warn!("Configuration file '{}' not found, using defaults", path.display());
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_default_config {
        println!("{}", Config::default_toml()?);
        return Ok(());
    }

    match args.command.unwrap_or(Command::Serve) {
        | Command::Init { force } => {
            if args.config.exists() && !force {
                eprintln!(
                    "Config file {} exists. Use --force to overwrite.",
                    args.config.display()
                );
                std::process::exit(1);
            }
            config::generate_commented_config_template(&args.config)?;
            println!("✅ Wrote default configuration to {}", args.config.display());
            Ok(())
        }
        | Command::Serve => {
            let config = prepare(&args.config, args.debug)?;
            run_service(&config).await
        }
        | Command::Passwd { output } => {
            let config = prepare(&args.config, args.debug)?;
            let path = output.unwrap_or_else(|| PathBuf::from(&config.auth.password_file));
            print!("Enter new password: ");
            io::stdout().flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            auth::write_password_file(&path, &line)?;
            println!("✅ Wrote password hash to {}", path.display());
            Ok(())
        }
        | Command::Estimate { query } => {
            let config = prepare(&args.config, args.debug)?;
            let raw = std::fs::read_to_string(&query)
                .with_context(|| format!("Failed to read {}", query.display()))?;
            let report: PositionReport =
                serde_json::from_str(&raw).context("Query file is not a position report")?;
            let provider = SqliteProvider::open(config.storage.db_path()).await?;
            let estimator = Estimator::new(Arc::new(provider), config.engine.clone());
            let estimate = estimator.estimate(&report.wifi_data).await?;
            println!("{}", serde_json::to_string_pretty(&estimate)?);
            Ok(())
        }
    }
}

async fn run_service(config: &Config) -> Result<()> {
    wifipos::metrics::init().map_err(|e| anyhow::anyhow!("metrics init: {e}"))?;

    let provider = SqliteProvider::open(config.storage.db_path()).await?;
    let gate = PasswordGate::load(&config.auth.password_file)?;
    let state = AppState::new(Arc::new(provider), gate, config.engine.clone());
    let listener = server::bind(&config.server.bind_addr)?;

    log::info!(
        "Starting wifipos v{} ({} workers, margin {}, k {})",
        env!("CARGO_PKG_VERSION"),
        config.engine.worker_count,
        config.engine.margin,
        config.engine.top_k
    );

    server::serve(listener, state, async {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Shutdown signal received. Stopping...");
        }
    })
    .await?;
    Ok(())
}

//! trustroute - router trust reconciliation for Circles base groups
//!
//! This binary provides:
//! - Periodic reconciliation of the router's trust set (`run`)
//! - A single reconciliation printed as JSON (`once`)
//! - Idempotency ledger inspection and setup (`status`, `init-db`)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use trustroute_engine::{BlacklistClassifier, MutationSink, Reconciler};
use trustroute_service::config::{Config, LoggingConfig};
use trustroute_service::ledger::CirclesRpc;
use trustroute_service::screening::ScreeningClient;
use trustroute_service::sink::{parse_signer, RouterSink};
use trustroute_service::storage::Storage;
use trustroute_service::{ReconcileService, ServiceParts};

#[derive(Parser)]
#[command(name = "trustroute")]
#[command(version, about = "Reconciles a Circles router's trust set with eligible avatars", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "trustroute.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the periodic reconciliation service
    Run,

    /// Run one reconciliation and print the outcome as JSON
    Once {
        /// Compute batches without sending transactions
        #[arg(long)]
        dry_run: bool,
    },

    /// Show idempotency ledger status
    Status,

    /// Initialize the database
    InitDb {
        /// Database URL
        #[arg(long, default_value = "sqlite://trustroute.db")]
        database_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Run);

    // Config warnings are emitted before the configured subscriber exists
    let startup = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .finish();
    let config = tracing::subscriber::with_default(startup, || Config::read(&cli.config))
        .context("Failed to load configuration")?;

    init_logging(&config.logging, cli.debug)?;

    info!("trustroute starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    match command {
        Commands::Run => run_service(config).await?,
        Commands::Once { dry_run } => run_once(config, dry_run).await?,
        Commands::Status => show_status(&config).await?,
        Commands::InitDb { database_url } => init_database(&database_url).await?,
    }

    Ok(())
}

/// Initialize tracing subscriber for logging
fn init_logging(logging: &LoggingConfig, debug: bool) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = if debug {
        EnvFilter::new("trustroute_service=debug,trustroute_engine=debug,sqlx=info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "trustroute_service={level},trustroute_engine={level}",
                level = logging.level
            ))
        })
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if logging.format == "json" {
        registry
            .with(fmt::layer().json().with_target(true).with_line_number(true))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .try_init()
    };
    result.context("Failed to initialize logging")?;

    Ok(())
}

/// Build the service and its collaborators from configuration.
async fn build_service(config: &Config) -> Result<(ReconcileService, Storage)> {
    config.validate().context("Invalid configuration")?;

    info!("Configuration loaded successfully");
    info!("  RPC URL: {}", config.network.rpc_url);
    info!("  Router: {}", config.contracts.router);
    info!("  Default origin: {}", config.contracts.default_origin);
    info!("  Database: {}", config.database.url);
    info!("  Dry run: {}", config.reconcile.dry_run);

    let storage = Storage::new(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to database")?;
    storage
        .run_migrations()
        .await
        .context("Failed to run migrations")?;

    let ledger = CirclesRpc::new(
        &config.network.rpc_url,
        config.hub()?,
        config.reconcile.page_size,
    )
    .context("Failed to create Circles RPC client")?;
    let head = ledger
        .get_block_number()
        .await
        .context("Failed to reach RPC endpoint")?;
    info!("RPC connected at block {}", head);

    let blacklist = match config.screening.url.as_deref() {
        Some(url) => {
            info!("Blacklist screening enabled: {}", url);
            let client = ScreeningClient::new(url, config.screening.timeout_secs)?;
            Some(Arc::new(client) as Arc<dyn BlacklistClassifier>)
        }
        None => {
            info!("Blacklist screening disabled");
            None
        }
    };

    let sink = match config.signer.private_key.as_deref() {
        Some(key) if !config.reconcile.dry_run => {
            let signer = parse_signer(key)?;
            let sink = RouterSink::new(&config.network.rpc_url, signer, config.router()?)
                .context("Failed to create router sink")?;
            info!("Sending transactions from {}", sink.sender());
            Some(Arc::new(sink) as Arc<dyn MutationSink>)
        }
        _ => None,
    };

    let parts = ServiceParts {
        ledger: Arc::new(ledger),
        blacklist,
        sink,
        store: Arc::new(storage.clone()),
    };

    let service = ReconcileService::new(
        Reconciler::new(config.reconciler_config()?),
        parts,
        Duration::from_secs(config.reconcile.poll_interval_secs),
    );

    Ok((service, storage))
}

/// Main service loop
async fn run_service(config: Config) -> Result<()> {
    let (service, storage) = build_service(&config).await?;

    info!("Reconcile service is running. Press Ctrl+C to stop.");

    tokio::select! {
        result = service.run() => {
            storage.close().await;
            result.context("Reconcile service failed")
        }
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl+C")?;
            info!("Received shutdown signal, gracefully shutting down...");
            storage.close().await;
            Ok(())
        }
    }
}

/// Run one reconciliation and print the outcome
async fn run_once(mut config: Config, dry_run: bool) -> Result<()> {
    if dry_run {
        config.reconcile.dry_run = true;
    }

    let (service, storage) = build_service(&config).await?;
    let result = service.run_once().await;
    storage.close().await;

    let outcome = result.context("Reconciliation failed")?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(())
}

/// Show idempotency ledger status
async fn show_status(config: &Config) -> Result<()> {
    info!("Checking status");

    let storage = Storage::new(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to database")?;
    storage
        .run_migrations()
        .await
        .context("Failed to run migrations")?;

    let stats = storage.stats().await?;

    println!("\n=== trustroute Status ===\n");
    println!("Identities:");
    println!("  Router: {}", display_or_unset(&config.contracts.router));
    println!(
        "  Default origin: {}",
        display_or_unset(&config.contracts.default_origin)
    );
    println!("  Dry run: {}", config.reconcile.dry_run);
    println!("\nIdempotency ledger:");
    println!("  Database: {}", config.database.url);
    println!("  Enabled addresses: {}", stats.enabled_count);
    match stats.last_enabled_at.and_then(|ts| chrono::DateTime::from_timestamp(ts, 0)) {
        Some(at) => println!("  Last enabled at: {}", at.to_rfc3339()),
        None => println!("  Last enabled at: never"),
    }
    println!();

    storage.close().await;
    Ok(())
}

fn display_or_unset(value: &str) -> &str {
    if value.is_empty() {
        "(unset)"
    } else {
        value
    }
}

/// Initialize the database
async fn init_database(database_url: &str) -> Result<()> {
    info!("Initializing database: {}", database_url);

    let storage = Storage::new(database_url, 1)
        .await
        .context("Failed to connect to database")?;

    storage
        .run_migrations()
        .await
        .context("Failed to run migrations")?;

    storage
        .health_check()
        .await
        .context("Database health check failed")?;

    let stats = storage.stats().await?;
    info!("Database initialized successfully!");
    info!("  Enabled addresses: {}", stats.enabled_count);

    storage.close().await;
    Ok(())
}

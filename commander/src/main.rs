//! Incident Commander Main Binary
//!
//! Runs alert investigations:
//! - `serve`: webhook server (default)
//! - `investigate`: one investigation from the command line, report on stdout

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use incident_commander_agents::prelude::*;
use incident_commander_api::prelude::*;
use incident_commander_core::prelude::*;
use incident_commander_ingestion::prelude::*;
use serde_json::json;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Incident Commander CLI arguments
#[derive(Debug, Parser)]
#[clap(
    name = "commander",
    version,
    about = "Autonomous incident investigation: alert in, root-cause report out"
)]
struct Cli {
    /// Configuration file path
    #[clap(short, long, default_value = "config/commander.yaml", global = true)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[clap(long, env = "COMMANDER_LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Enable JSON logging
    #[clap(long, env = "COMMANDER_LOG_JSON", global = true)]
    log_json: bool,

    /// Validate configuration and exit
    #[clap(long, global = true)]
    dry_run: bool,

    /// Subcommand to execute
    #[clap(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands
#[derive(Debug, Subcommand)]
enum Commands {
    /// Start the webhook server (default if no subcommand given)
    Serve,
    /// Investigate a single alert and print the outcome as JSON
    Investigate {
        /// Service the alert fired for
        #[clap(long, default_value = "api-gateway")]
        service: String,

        /// Trigger kind (latency_spike, error_rate)
        #[clap(long, default_value = "latency_spike")]
        trigger: String,

        /// Alert threshold
        #[clap(long, default_value_t = 1000.0)]
        threshold: f64,

        /// Observed value
        #[clap(long, default_value_t = 2500.0)]
        value: f64,

        /// Read the raw alert payload from a JSON file instead
        #[clap(long, conflicts_with_all = ["service", "trigger", "threshold", "value"])]
        payload_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    info!("Starting Incident Commander v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;

    if cli.dry_run {
        info!("Dry run mode - configuration validated, exiting");
        return Ok(());
    }

    match cli.command {
        Some(Commands::Investigate {
            service,
            trigger,
            threshold,
            value,
            payload_file,
        }) => {
            let payload = match payload_file {
                Some(path) => read_payload(&path)?,
                None => json!({
                    "trigger_kind": trigger,
                    "service": service,
                    "threshold": threshold,
                    "value": value,
                }),
            };
            run_investigate_command(&config, payload).await
        }
        Some(Commands::Serve) | None => run_serve_command(config).await,
    }
}

/// Load the config file (defaults when absent), then apply env overrides.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if cli.config.exists() {
        info!("Loading configuration from: {:?}", cli.config);
        Config::from_file(&cli.config).context("Failed to load configuration")?
    } else {
        warn!(
            "Configuration file {:?} not found, using defaults",
            cli.config
        );
        Config::default()
    };

    config
        .apply_env_overrides()
        .context("Invalid configuration override")?;

    info!(
        provider = %config.reasoning.provider,
        model = %config.reasoning.model,
        "Configuration loaded successfully"
    );
    Ok(config)
}

fn read_payload(path: &Path) -> Result<serde_json::Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read payload file {:?}", path))?;
    serde_json::from_str(&text).with_context(|| format!("Payload file {:?} is not JSON", path))
}

/// Wire the investigation graph over the built-in telemetry fixtures.
fn build_graph(config: &Config) -> Result<InvestigationGraph> {
    let reasoning = HttpReasoningClient::new(config.reasoning.clone())
        .context("Failed to create reasoning client")?;
    let telemetry = Arc::new(FixtureTelemetry::new());

    Ok(InvestigationGraph::from_sources(
        config,
        telemetry.clone(),
        telemetry.clone(),
        telemetry,
        Arc::new(reasoning),
    ))
}

/// Run one investigation and print the outcome
async fn run_investigate_command(config: &Config, payload: serde_json::Value) -> Result<()> {
    let alert = normalize(&payload).context("Alert payload rejected")?;
    let graph = build_graph(config)?;

    info!(service = %alert.service, trigger = %alert.trigger_kind, "Investigating alert");

    match graph.run(alert).await {
        Ok(outcome) => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        Err(failure) => {
            error!(stage = %failure.stage, error = %failure.cause, "Investigation failed");
            Err(failure).context("Investigation did not produce a report")
        }
    }
}

/// Run the webhook server
async fn run_serve_command(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let api_config = ApiConfig {
        bind_addr: addr,
        enable_cors: !config.server.cors_origins.is_empty(),
        cors_origins: config.server.cors_origins.clone(),
        timeout_secs: config.server.request_timeout_secs,
        enable_logging: true,
    };

    let graph = build_graph(&config)?;
    let health_state = Arc::new(HealthState::new(env!("CARGO_PKG_VERSION").to_string()));
    let commander_state = Arc::new(CommanderState::new(graph, config));

    let app = create_router(api_config, health_state, commander_state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server failed")?;

    info!("API server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or CTRL+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { info!("Received Ctrl+C, shutting down..."); },
        _ = terminate => { info!("Received SIGTERM, shutting down..."); },
    }
}

/// Initialize logging based on CLI arguments
fn init_logging(cli: &Cli) -> Result<()> {
    let log_level = cli
        .log_level
        .parse::<tracing::Level>()
        .context("Invalid log level")?;

    // Logs go to stderr so `investigate` output stays clean JSON.
    if cli.log_json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .with(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive(log_level.into()),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_line_number(true),
            )
            .with(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive(log_level.into()),
            )
            .init();
    }

    info!("Logging initialized at level: {}", log_level);

    Ok(())
}

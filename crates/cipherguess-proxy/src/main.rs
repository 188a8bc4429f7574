//! cipherguess
//!
//! Orchestrator between ciphertext-submitting clients and the ML
//! classification service.
//!
//! `serve` (also the default when no subcommand is given) runs the HTTP API;
//! `guess` and `algorithms` talk to an already running orchestrator.

use anyhow::Result;
use cipherguess_core::PredictionReport;
use cipherguess_proxy::client::OrchestratorClient;
use cipherguess_proxy::{build_app, AppState, Orchestrator, OrchestratorConfig, ServeArgs};
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "cipherguess")]
#[command(about = "Ciphertext classification orchestrator", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    serve: ServeArgs,

    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API (the default when no subcommand is given)
    Serve(ServeArgs),

    /// Classify ciphertext through a running orchestrator and print the report
    Guess {
        /// Ciphertext to classify, sent exactly as given
        ciphertext: String,

        /// Orchestrator base URL
        #[arg(short, long, default_value = "http://localhost:4000")]
        target: String,

        /// Print the raw JSON envelope instead of the report
        #[arg(long)]
        json: bool,
    },

    /// List the algorithms the classification service can predict
    Algorithms {
        /// Orchestrator base URL
        #[arg(short, long, default_value = "http://localhost:4000")]
        target: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    match cli.command {
        None => serve(&cli.serve).await,
        Some(Commands::Serve(args)) => serve(&args).await,
        Some(Commands::Guess {
            ciphertext,
            target,
            json,
        }) => {
            let client = OrchestratorClient::new(&target, Duration::from_secs(30))?;
            let envelope = client.guess(&ciphertext).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&envelope)?);
            } else {
                print!("{}", PredictionReport::new(&envelope.prediction));
            }
            Ok(())
        }
        Some(Commands::Algorithms { target }) => {
            let client = OrchestratorClient::new(&target, Duration::from_secs(30))?;
            let list = client.algorithms().await?;
            if let Some(description) = &list.description {
                println!("{}", description);
            }
            for algorithm in &list.algorithms {
                println!("  {}", algorithm);
            }
            Ok(())
        }
    }
}

async fn serve(args: &ServeArgs) -> Result<()> {
    info!("Starting cipherguess orchestrator");

    let config = OrchestratorConfig::load(args)?;
    info!("ML service URL: {}", config.ml_service_url);
    info!("Frontend URL: {}", config.frontend_url);
    info!(
        "Backend timeout: {}s (connect {}s)",
        config.timeout_secs, config.connect_timeout_secs
    );

    let metrics_handle = init_metrics()?;

    let orchestrator = Orchestrator::from_config(&config)?;
    let state = AppState::new(orchestrator).with_metrics(metrics_handle);
    let app = build_app(state, &config)?;

    let addr: SocketAddr = format!("{}:{}", config.listen, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Orchestrator listening on http://{}", addr);

    let shutdown = async {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("cipherguess=debug,cipherguess_proxy=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("cipherguess=info,cipherguess_proxy=info,tower_http=info")
        })
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "cipherguess_requests_total",
        "Total number of requests received by endpoint"
    );
    metrics::describe_counter!(
        "cipherguess_outcomes_total",
        "Orchestrator outcomes by operation and error kind"
    );
    metrics::describe_histogram!(
        "cipherguess_backend_latency_us",
        metrics::Unit::Microseconds,
        "Classification service call latency in microseconds by operation"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}

//! Emotion Stream Server
//!
//! Run with: cargo run -- --config config.toml
//!
//! `RUST_LOG` overrides the configured log level.

use clap::Parser;
use emotion_stream::api::{serve, AppState};
use emotion_stream::config::{generate_default_config, Config, LoggingConfig};
use emotion_stream::emotion::Aggregator;
use emotion_stream::websocket::ConnectionHub;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "emotion-stream")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Real-time facial-emotion relay with sustained-state alerts")]
struct Cli {
    /// Path to a TOML config file (default: search standard locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind host
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Print a default config file and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", generate_default_config());
        return Ok(());
    }

    // Load errors propagate to stderr; logging is configured from the result
    let (mut config, source) = match cli.config {
        Some(path) => (Config::load_with_env(&path)?, Some(path)),
        None => Config::load_default()?,
    };
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    config.validate()?;

    init_tracing(&config.logging);

    tracing::info!("Starting emotion stream v{}", env!("CARGO_PKG_VERSION"));
    match &source {
        Some(path) => tracing::info!(path = %path.display(), "Loaded config"),
        None => tracing::info!("No config file found, using defaults with environment overrides"),
    }
    tracing::info!(
        keep_ms = config.aggregator.keep_duration_ms,
        sustain_ms = config.aggregator.sustain_duration_ms,
        min_confidence = config.aggregator.min_confidence,
        "Aggregator configured"
    );

    let hub = ConnectionHub::new(config.hub.to_hub_config());
    let aggregator = Arc::new(Aggregator::new(config.aggregator.to_aggregator_config()));
    let evaluator = Arc::clone(&aggregator).spawn_evaluator(hub.clone());

    let state = AppState::new(aggregator, hub, config.server.clone());
    let result = serve(state).await;

    evaluator.abort();
    tracing::info!("Emotion stream stopped");

    result.map_err(Into::into)
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("emotion_stream={},tower_http=info", logging.level).into()
    });
    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

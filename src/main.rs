use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use quickmemo::audio::MicrophoneFactory;
use quickmemo::authorization::ConfigAuthorizationGate;
use quickmemo::entry::JsonEntryStore;
use quickmemo::http::{create_router, AppState};
use quickmemo::location::HttpLocationProvider;
use quickmemo::recognizer::NatsRecognizer;
use quickmemo::session::{CaptureService, SessionConfig};
use quickmemo::Config;

#[derive(Debug, Parser)]
#[command(name = "quickmemo", about = "Dictation note service")]
struct Cli {
    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config/quickmemo")]
    config: String,

    /// Override the configured bind address (host:port)
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    let gate = Arc::new(ConfigAuthorizationGate::new(cfg.audio.capture_allowed));
    let recognizer = Arc::new(NatsRecognizer::new(&cfg.recognizer.nats_url));
    let capture = Arc::new(CaptureService::new(
        gate,
        Arc::new(MicrophoneFactory),
        recognizer,
        SessionConfig {
            locale: cfg.recognizer.locale.clone(),
        },
    ));

    let entries = Arc::new(
        JsonEntryStore::open(&cfg.storage.entries_path)
            .await
            .context("failed to open entry store")?,
    );
    let location = Arc::new(HttpLocationProvider::new(
        &cfg.location.endpoint,
        Duration::from_secs(cfg.location.timeout_secs),
    ));

    let state = AppState::new(capture, entries, location);
    let router = create_router(state);

    let bind = cli
        .bind
        .unwrap_or_else(|| format!("{}:{}", cfg.service.http.bind, cfg.service.http.port));

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {}", bind))?;
    info!("HTTP server listening on {}", bind);

    axum::serve(listener, router).await?;

    Ok(())
}

//! Parley application binary - composition root.
//!
//! Ties together all parley crates into a single executable:
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Open storage (SQLite turn log + audio artifact directory)
//! 3. Build the remote service clients (Gemini completion, ElevenLabs speech)
//! 4. Start the axum REST API server with graceful shutdown

mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;

use parley_api::{create_router, AppState};
use parley_chat::TurnOrchestrator;
use parley_core::ParleyConfig;
use parley_llm::GeminiClient;
use parley_speech::{ElevenLabsSynthesizer, ElevenLabsTranscriber};
use parley_storage::{AudioStore, Database, TurnRepository, UserRepository};

use cli::CliArgs;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config is loaded before tracing so the log level can come from it.
    let config_file = args.resolve_config_path();
    let config = ParleyConfig::load_or_default(&config_file);

    // Tracing. RUST_LOG overrides the resolved level.
    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .init();

    tracing::info!("Starting Parley v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Storage.
    let db_path = PathBuf::from(&config.storage.db_path);
    if let Some(parent) = db_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::error!(path = %parent.display(), error = %e, "Failed to create data directory");
            return Err(e.into());
        }
    }

    let database = Arc::new(Database::new(&db_path)?);
    tracing::info!(path = %db_path.display(), "SQLite turn log opened");

    let turns = Arc::new(TurnRepository::new(Arc::clone(&database)));
    let users = Arc::new(UserRepository::new(Arc::clone(&database)));
    let audio = Arc::new(AudioStore::new(&config.storage.audio_dir)?);
    tracing::info!(dir = %audio.dir().display(), "Audio artifact store ready");

    // Remote services. Missing API keys fail fast here, not on first request.
    let completion = GeminiClient::from_config(&config.completion)?;
    let completion = match config.chat.persona.as_deref() {
        Some(persona) => completion.with_persona(persona),
        None => completion,
    };
    tracing::info!(model = %config.completion.model, "Completion client ready");

    let transcription = ElevenLabsTranscriber::from_config(&config.speech)?;
    let synthesis = ElevenLabsSynthesizer::from_config(&config.speech)?;
    tracing::info!("Speech clients ready");

    // Orchestrator and API state.
    let orchestrator = Arc::new(TurnOrchestrator::new(
        Arc::clone(&turns),
        users,
        Arc::clone(&audio),
        Arc::new(completion),
        Arc::new(transcription),
        Arc::new(synthesis),
        &config.chat,
    ));

    let state = AppState::new(orchestrator, turns, Arc::clone(&database), audio);
    let router = create_router(state);

    // API server.
    let host = args.resolve_host(&config.general.host);
    let port = args.resolve_port(config.general.port);
    let addr = format!("{host}:{port}");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "Failed to bind; is another instance running?");
            tracing::error!("Try: PARLEY_PORT={} cargo run -p parley-app", port + 1);
            return Err(e.into());
        }
    };

    tracing::info!(addr = %addr, "API server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Resolve when Ctrl+C or SIGTERM arrives so axum can drain in-flight turns.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        },
    }
}

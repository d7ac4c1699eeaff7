//! Parlor server binary — websocket voice bridge over a knowledge base.
//!
//! Starts an axum HTTP server with structured logging, OpenAI-backed voice
//! engines, and graceful shutdown on SIGTERM/SIGINT.

use parlor_server::config;
use parlor_server::{app, AppState};
use parlor_voice::{
    AssistantKnowledgeEngine, OpenAiTranscriber, RealtimeSynthesizer, VoicePipeline,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("PARLOR_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    // Load configuration
    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration — the server cannot start without valid config");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    // Misconfigured engines fail here, not on a caller's first turn.
    config::validate(&config)
        .expect("invalid configuration — check the [openai] section and environment overrides");

    // Build the engine stack. One HTTP client is shared by every REST call.
    let http = reqwest::Client::new();
    let transcriber = OpenAiTranscriber::new(http.clone(), &config.openai);
    let knowledge = AssistantKnowledgeEngine::new(http, &config.openai);
    let synthesizer = RealtimeSynthesizer::new(&config.openai);
    let pipeline = VoicePipeline::new(
        Arc::new(transcriber),
        Arc::new(knowledge),
        Arc::new(synthesizer),
        config.openai.style_directives.clone(),
    );

    let state = AppState {
        pipeline: Arc::new(pipeline),
    };

    // Build application
    let app = app(state, &config.server.cors_origins);
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting parlor server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address — is another process using this port?");

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("parlor server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}

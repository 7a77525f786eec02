use anyhow::{Context, Result};
use clap::Parser;
use duocall::nats::TranscriptFilter;
use duocall::speech::NoSpeechRecognition;
use duocall::{
    create_router, AppState, CallSession, Config, LoggingObserver, NatsRecognizerProvider,
    NatsSessionFactory, RecognizerProvider, SessionManager,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Two-party call client with live captions and chat
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Config file (extension optional)
    #[arg(long, default_value = "config/duocall")]
    config: String,

    /// Override the HTTP bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override the HTTP port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    let factory = Arc::new(NatsSessionFactory::new(&cfg.nats.url));
    let mut manager = SessionManager::new(factory, cfg.call.clone());
    let state = AppState::new();

    match manager.connect().await {
        Some(session) => {
            let provider: Arc<dyn RecognizerProvider> = match session.connection_id() {
                Some(source) => {
                    let filter = TranscriptFilter {
                        session_id: cfg.call.session_id.clone(),
                        source,
                    };
                    Arc::new(
                        NatsRecognizerProvider::connect(&cfg.nats.url, &cfg.call.token, filter)
                            .await,
                    )
                }
                None => Arc::new(NoSpeechRecognition),
            };
            match CallSession::mount(
                session,
                cfg.captions.call_options(),
                provider,
                Arc::new(LoggingObserver),
            ) {
                Ok(call) => state.attach(call).await,
                Err(e) => error!("Failed to mount call screen: {}", e),
            }
        }
        None => info!("No session; serving an empty call screen"),
    }

    let bind = args.bind.unwrap_or(cfg.service.http.bind);
    let port = args.port.unwrap_or(cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind((bind.as_str(), port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", bind, port))?;

    info!("HTTP API listening on {}:{}", bind, port);

    axum::serve(listener, create_router(state.clone()))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
        .context("HTTP server failed")?;

    info!("Shutting down");

    if let Some(call) = state.detach().await {
        call.unmount().await;
    }
    manager.shutdown().await;

    Ok(())
}

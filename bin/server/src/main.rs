use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voltchat_conversation::{ChatBackend, ConversationEngine, SessionStore, StreamController};
use voltchat_gemini::GeminiClient;
use voltchat_server::{api, config::ServerConfig, state::AppState};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    // One-time startup probe: if the backend is unreachable now, the
    // process runs in fallback mode for its whole lifetime.
    let backend: Option<Arc<dyn ChatBackend>> = match config.gemini.clone() {
        Some(gemini_config) => match GeminiClient::new(gemini_config) {
            Ok(client) => match client.probe().await {
                Ok(()) => Some(Arc::new(client)),
                Err(e) => {
                    tracing::warn!(error = %e, "gemini probe failed; starting in fallback mode");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "gemini client construction failed; starting in fallback mode");
                None
            }
        },
        None => {
            tracing::warn!("no gemini configuration; starting in fallback mode");
            None
        }
    };

    let engine = ConversationEngine::new(
        Arc::new(SessionStore::new()),
        Arc::new(StreamController::new()),
        backend,
        Duration::from_millis(config.stream.pacing_ms),
    );

    let app = api::router(Arc::new(AppState::new(engine)));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.listen_addr);

    axum::serve(listener, app.into_make_service())
        .await
        .expect("server error");
}

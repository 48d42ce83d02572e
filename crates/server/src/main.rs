//! dhvani server entry point

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use tokio::net::TcpListener;

use dhvani_config::Settings;
use dhvani_core::{ConversationStore, PhraseRenderer, RecordingStorage, SpeechToText, TextToSpeech};
use dhvani_dialog::FlowStore;
use dhvani_llm::{OllamaPhraseRenderer, RendererConfig};
use dhvani_persistence::MemoryConversationStore;
use dhvani_pipeline::{
    HttpRecordingStorage, HttpStorageConfig, HttpStt, HttpSttConfig, HttpTts, HttpTtsConfig,
};
use dhvani_server::{create_router, init_metrics, serve, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Priority: env vars > config file > built-in defaults
    let config_path = std::env::var("DHVANI_CONFIG").ok();
    let settings = match Settings::load(config_path.as_deref().map(Path::new)) {
        Ok(settings) => settings,
        Err(e) => {
            // Tracing not yet initialized, use eprintln for early logging
            eprintln!("warning: failed to load config ({e}), using defaults");
            Settings::default()
        }
    };

    init_tracing();
    tracing::info!("starting dhvani v{}", env!("CARGO_PKG_VERSION"));

    let prometheus = init_metrics()?;

    let flows = FlowStore::load_dir(
        Path::new(&settings.flows.dir),
        settings.flows.did_map.clone(),
        settings.flows.default_flow.clone(),
    )?;
    tracing::info!(flows = ?flows.flow_ids(), default = %settings.flows.default_flow, "flows loaded");

    let stt: Arc<dyn SpeechToText> = Arc::new(HttpStt::new(HttpSttConfig {
        url: settings.stt.url.clone(),
        timeout_ms: settings.stt.timeout_ms,
        ..Default::default()
    })?);
    let tts: Arc<dyn TextToSpeech> = Arc::new(HttpTts::new(HttpTtsConfig {
        url: settings.tts.url.clone(),
        timeout_ms: settings.tts.timeout_ms,
    })?);

    let store: Arc<dyn ConversationStore> = Arc::new(MemoryConversationStore::new());

    let storage: Option<Arc<dyn RecordingStorage>> = match &settings.recording.upload_url {
        Some(url) if settings.recording.enabled => {
            Some(Arc::new(HttpRecordingStorage::new(HttpStorageConfig {
                url: url.clone(),
                timeout_ms: settings.recording.upload_timeout_ms,
            })?))
        }
        _ => {
            tracing::info!("call recording disabled (no upload endpoint configured)");
            None
        }
    };

    let renderer: Option<Arc<dyn PhraseRenderer>> = if settings.llm.enabled {
        Some(Arc::new(OllamaPhraseRenderer::new(RendererConfig {
            endpoint: settings.llm.url.clone(),
            model: settings.llm.model.clone(),
            timeout: std::time::Duration::from_millis(settings.llm.timeout_ms),
            ..Default::default()
        })?))
    } else {
        None
    };

    let state = AppState::new(settings, flows, stt, tts, store, storage, renderer);

    // Health/metrics endpoint on its own port
    let http_addr: SocketAddr = format!(
        "{}:{}",
        state.settings.server.host, state.settings.server.health_port
    )
    .parse()?;
    let router = create_router(state.clone(), prometheus);
    tokio::spawn(async move {
        match TcpListener::bind(http_addr).await {
            Ok(listener) => {
                tracing::info!(%http_addr, "health endpoint listening");
                if let Err(e) = axum::serve(listener, router).await {
                    tracing::error!(error = %e, "health endpoint failed");
                }
            }
            Err(e) => tracing::error!(error = %e, %http_addr, "health endpoint bind failed"),
        }
    });

    let addr = format!(
        "{}:{}",
        state.settings.server.host, state.settings.server.port
    );
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "audiosocket listening");

    tokio::select! {
        result = serve(listener, state) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

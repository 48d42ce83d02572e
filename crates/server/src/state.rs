//! Shared application state

use std::sync::Arc;

use dhvani_config::Settings;
use dhvani_core::{ConversationStore, PhraseRenderer, RecordingStorage, SpeechToText, TextToSpeech};
use dhvani_dialog::{DialogController, FlowStore};

use crate::registry::SessionRegistry;

/// Everything a call session needs, cheap to clone
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub flows: Arc<FlowStore>,
    pub controller: Arc<DialogController>,
    pub stt: Arc<dyn SpeechToText>,
    pub tts: Arc<dyn TextToSpeech>,
    pub store: Arc<dyn ConversationStore>,
    /// Absent when recording is disabled
    pub storage: Option<Arc<dyn RecordingStorage>>,
    /// Optional narrow LLM capability; the runtime is complete without it
    pub renderer: Option<Arc<dyn PhraseRenderer>>,
    pub registry: Arc<SessionRegistry>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: Settings,
        flows: FlowStore,
        stt: Arc<dyn SpeechToText>,
        tts: Arc<dyn TextToSpeech>,
        store: Arc<dyn ConversationStore>,
        storage: Option<Arc<dyn RecordingStorage>>,
        renderer: Option<Arc<dyn PhraseRenderer>>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            flows: Arc::new(flows),
            controller: Arc::new(DialogController::new()),
            stt,
            tts,
            store,
            storage,
            renderer,
            registry: Arc::new(SessionRegistry::new()),
        }
    }
}

//! Call session
//!
//! One session per accepted TCP connection, one connection per phone call.
//! The session walks the connection state machine (`AwaitingUuid -> Active
//! -> Closing`): the first frame must identify the call and resolve a flow
//! for the dialed number, after which audio streams into STT while the turn
//! detector watches for silence. Exactly one turn is processed at a time;
//! turn-end triggers are suppressed while a response is being generated, but
//! incoming audio keeps flowing to STT throughout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::time::MissedTickBehavior;

use dhvani_config::constants::audio::{TELEPHONY_RATE, TTS_RATE};
use dhvani_config::constants::frame::PAYLOAD_BYTES;
use dhvani_config::constants::apology;
use dhvani_core::audio::{bytes_to_pcm, chunk, pcm_to_bytes, resample, strip_wav_header, SampleRate};
use dhvani_core::{
    ConversationRecord, ConversationStatus, Language, SttConfig, SttEvent, SttStream,
};
use dhvani_dialog::{FlowGraph, FlowRepository, StepKind};
use dhvani_llm::IntentFallback;
use dhvani_pipeline::{RecordingTimeline, TurnDetector};
use dhvani_transport::{parse_uuid_payload, ConnState, Connection, FrameKind, FrameWriter, UuidPayload};

use crate::metrics;
use crate::state::AppState;
use crate::ServerError;

/// Time the switch gets to identify the call before we drop the line
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// State shared between the session loop and in-flight turn tasks
struct Shared {
    app: AppState,
    /// Call id doubles as the conversation record id: one conversation per
    /// call, addressable by the id the switch handed us.
    call_id: String,
    flow: Arc<FlowGraph>,
    language: Language,
    writer: AsyncMutex<FrameWriter<OwnedWriteHalf>>,
    stt: AsyncMutex<Box<dyn SttStream>>,
    recording: parking_lot::Mutex<Option<RecordingTimeline>>,
    /// Re-entrancy guard: one turn in flight per session
    is_processing: AtomicBool,
    /// Set once teardown starts; late turn tasks stop touching the store
    closed: AtomicBool,
}

/// Per-call orchestration
pub struct CallSession;

impl CallSession {
    /// Drive one call from accept to teardown. Never panics back into the
    /// accept loop; all failures end in a clean local teardown.
    pub async fn run(stream: TcpStream, app: AppState) {
        let pace = Duration::from_millis(app.settings.audio.pace_ms);
        let (mut conn, mut writer, cancel_tx) = Connection::split(stream, pace);

        // ---- AwaitingUuid
        let uuid = match Self::await_handshake(&mut conn).await {
            Ok(uuid) => uuid,
            Err(e) => {
                tracing::warn!(error = %e, "handshake failed");
                metrics::record_error("handshake");
                return;
            }
        };

        let called = uuid.called_number.clone().unwrap_or_default();
        let Some(flow) = app.flows.resolve_did(&called) else {
            // A misrouted DID must not hold a line open
            tracing::warn!(call_id = %uuid.call_id, called, "no flow resolvable, dropping call");
            metrics::record_error("did_resolution");
            let _ = writer.hangup().await;
            return;
        };

        if !app.registry.insert(&uuid.call_id, uuid.called_number.clone()) {
            let _ = writer.hangup().await;
            return;
        }
        metrics::record_call_started();
        tracing::info!(call_id = %uuid.call_id, flow = %flow.id, called, "call started");

        let language = Language::from_code(&app.settings.stt.language);
        if let Err(e) = Self::create_record(&app, &uuid, &flow, language).await {
            tracing::warn!(error = %e, "conversation create failed");
            app.registry.remove(&uuid.call_id);
            let _ = writer.hangup().await;
            return;
        }

        let stt_config = SttConfig {
            language,
            sample_rate: TELEPHONY_RATE,
            interim_results: app.settings.stt.interim_results,
        };
        let (stt_stream, mut stt_events) = match app.stt.open_stream(stt_config).await {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(error = %e, "stt stream open failed");
                metrics::record_error("stt_open");
                app.registry.remove(&uuid.call_id);
                let _ = writer.hangup().await;
                return;
            }
        };

        let recording = (app.settings.recording.enabled && app.storage.is_some())
            .then(|| RecordingTimeline::new(SampleRate::Hz8000));

        let shared = Arc::new(Shared {
            app: app.clone(),
            call_id: uuid.call_id.clone(),
            flow,
            language,
            writer: AsyncMutex::new(writer),
            stt: AsyncMutex::new(stt_stream),
            recording: parking_lot::Mutex::new(recording),
            is_processing: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        });

        // ---- Active: greeting first, then the event loop
        let mut conn_state = ConnState::Active;
        let mut outcome: &'static str = "abandoned";
        match Self::execute_turn(&shared, None).await {
            Ok(terminal) => {
                if terminal {
                    outcome = "ended";
                    conn_state = ConnState::Closing;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "greeting turn failed");
                metrics::record_error("turn");
                Self::speak_apology(&shared).await;
            }
        }

        let (close_tx, mut close_rx) = watch::channel(false);
        let mut detector = TurnDetector::new(Duration::from_millis(app.settings.turn.inactivity_ms));
        let mut tick = tokio::time::interval(Duration::from_millis(50));
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut bytes_since_turn = 0usize;
        let mut awaiting_final = false;
        let mut pending_final: Option<String> = None;

        while !conn_state.is_closing() {
            tokio::select! {
                frame = conn.read_frame() => match frame {
                    Ok(Some(frame)) => match frame.kind {
                        FrameKind::Audio => {
                            metrics::record_audio_frame();
                            {
                                let mut guard = shared.recording.lock();
                                if let Some(rec) = guard.as_mut() {
                                    rec.record_caller(&frame.payload);
                                }
                            }
                            if let Err(e) = shared.stt.lock().await.send(&frame.payload).await {
                                tracing::warn!(error = %e, "stt send failed");
                            }
                            detector.audio_received(Instant::now());
                            bytes_since_turn += frame.payload.len();
                        }
                        FrameKind::Hangup => {
                            tracing::info!(call_id = %shared.call_id, "caller hung up");
                            conn_state = ConnState::Closing;
                        }
                        FrameKind::Error => {
                            tracing::warn!(call_id = %shared.call_id, "peer reported an error frame");
                        }
                        FrameKind::Silence => {}
                        FrameKind::Uuid => {
                            tracing::debug!(call_id = %shared.call_id, "ignoring repeat uuid frame");
                        }
                        FrameKind::Unknown(kind) => {
                            tracing::debug!(kind, "ignoring unknown frame type");
                        }
                    },
                    Ok(None) => {
                        tracing::info!(call_id = %shared.call_id, "peer closed connection");
                        conn_state = ConnState::Closing;
                    }
                    Err(e) => {
                        tracing::warn!(call_id = %shared.call_id, error = %e, "socket read error");
                        conn_state = ConnState::Closing;
                    }
                },

                event = stt_events.recv() => match event {
                    Some(SttEvent::Interim(text)) => {
                        tracing::trace!(%text, "interim transcript");
                    }
                    Some(SttEvent::Final(text)) => {
                        if !text.trim().is_empty() {
                            pending_final = Some(text);
                        }
                    }
                    Some(SttEvent::UtteranceEnd) => {
                        if awaiting_final {
                            awaiting_final = false;
                            match pending_final.take() {
                                Some(text) => {
                                    Self::spawn_turn(shared.clone(), text, close_tx.clone());
                                }
                                // Silence window fired on noise with nothing
                                // transcribable: back to listening
                                None => shared.is_processing.store(false, Ordering::SeqCst),
                            }
                        }
                    }
                    Some(SttEvent::Error(error)) => {
                        tracing::warn!(%error, "stt error event");
                        metrics::record_error("stt");
                        if awaiting_final {
                            awaiting_final = false;
                            pending_final = None;
                            let shared = shared.clone();
                            tokio::spawn(async move {
                                Self::speak_apology(&shared).await;
                                shared.is_processing.store(false, Ordering::SeqCst);
                            });
                        } else {
                            // Mid-utterance failure: reconnect the stream in
                            // place. Audio buffered but not yet transcribed
                            // survives the reconnect.
                            if let Err(e) =
                                shared.stt.lock().await.reconnect(shared.language).await
                            {
                                tracing::warn!(error = %e, "stt reconnect failed");
                            }
                        }
                    }
                    None => {}
                },

                _ = tick.tick() => {
                    let in_flight = shared.is_processing.load(Ordering::SeqCst);
                    if detector.should_fire(Instant::now(), bytes_since_turn > 0, in_flight) {
                        shared.is_processing.store(true, Ordering::SeqCst);
                        awaiting_final = true;
                        bytes_since_turn = 0;
                        detector.disarm();
                        if let Err(e) = shared.stt.lock().await.finish().await {
                            tracing::warn!(error = %e, "stt finish failed");
                            awaiting_final = false;
                            shared.is_processing.store(false, Ordering::SeqCst);
                        }
                    }
                },

                _ = close_rx.changed() => {
                    if *close_rx.borrow() {
                        outcome = "ended";
                        conn_state = ConnState::Closing;
                    }
                }
            }
        }

        // ---- Closing
        Self::teardown(shared, cancel_tx, outcome).await;
    }

    async fn await_handshake(
        conn: &mut Connection<OwnedReadHalf>,
    ) -> Result<UuidPayload, ServerError> {
        let frame = tokio::time::timeout(HANDSHAKE_TIMEOUT, conn.read_frame())
            .await
            .map_err(|_| ServerError::Setup("handshake timed out".into()))??
            .ok_or_else(|| ServerError::Setup("connection closed before handshake".into()))?;

        if frame.kind != FrameKind::Uuid {
            return Err(ServerError::Setup(format!(
                "first frame must be uuid, got {:?}",
                frame.kind
            )));
        }
        Ok(parse_uuid_payload(&frame.payload)?)
    }

    async fn create_record(
        app: &AppState,
        uuid: &UuidPayload,
        flow: &FlowGraph,
        language: Language,
    ) -> Result<(), ServerError> {
        let mut record =
            ConversationRecord::new(&uuid.call_id, &flow.id, &flow.start_step, language);
        record.id = uuid.call_id.clone();
        record.called_number = uuid.called_number.clone();
        record.max_retries = app.settings.conversation.max_retries;
        app.store.create(record).await?;
        Ok(())
    }

    fn spawn_turn(shared: Arc<Shared>, text: String, close_tx: watch::Sender<bool>) {
        tokio::spawn(async move {
            let started = Instant::now();
            let terminal = match Self::execute_turn(&shared, Some(&text)).await {
                Ok(terminal) => terminal,
                Err(e) => {
                    tracing::warn!(error = %e, "turn failed");
                    metrics::record_error("turn");
                    Self::speak_apology(&shared).await;
                    false
                }
            };
            metrics::record_turn(started.elapsed().as_millis() as u64);
            shared.is_processing.store(false, Ordering::SeqCst);
            if terminal {
                let _ = close_tx.send(true);
            }
        });
    }

    /// One controller turn: load record, process, persist the patch, speak.
    async fn execute_turn(shared: &Shared, user_text: Option<&str>) -> Result<bool, ServerError> {
        if shared.closed.load(Ordering::SeqCst) {
            return Ok(false);
        }

        let record = shared
            .app
            .store
            .get(&shared.call_id)
            .await?
            .ok_or_else(|| ServerError::Session(format!("conversation {} not found", shared.call_id)))?;

        let hint = match user_text {
            Some(text) => Self::intent_hint(shared, &record, text).await,
            None => None,
        };

        let patch = shared.app.controller.process_turn_hinted(
            &shared.flow,
            &record,
            user_text,
            hint.as_deref(),
        )?;

        if shared.closed.load(Ordering::SeqCst) {
            return Ok(false);
        }
        shared.app.store.apply_patch(&shared.call_id, &patch).await?;

        if !patch.output_text.is_empty() {
            Self::speak(shared, &patch.output_text).await?;
        }
        Ok(patch.terminal)
    }

    /// Optional closed-label LLM hint, consulted only at `intent` steps.
    /// The controller re-validates the label; the model never picks a step.
    async fn intent_hint(
        shared: &Shared,
        record: &ConversationRecord,
        text: &str,
    ) -> Option<String> {
        let renderer = shared.app.renderer.as_ref()?;
        let step = shared.flow.step(&record.current_step_id).ok()?;
        if step.kind != StepKind::Intent {
            return None;
        }
        let fallback = IntentFallback::new(step.branches.keys().cloned());
        fallback.classify(renderer.as_ref(), text).await
    }

    /// Synthesize, resample to the wire rate, record, and play out paced.
    async fn speak(shared: &Shared, text: &str) -> Result<(), ServerError> {
        let voice = shared
            .app
            .settings
            .tts
            .voices
            .get(shared.language.code())
            .map(String::as_str)
            .unwrap_or_default();

        let wav = shared.app.tts.speak(text, shared.language, voice).await?;
        let pcm = bytes_to_pcm(strip_wav_header(&wav));
        let telephony = resample(&pcm, TTS_RATE, TELEPHONY_RATE);
        let outbound = pcm_to_bytes(&telephony);

        {
            let mut guard = shared.recording.lock();
            if let Some(rec) = guard.as_mut() {
                rec.mark_agent_speech_start();
                for piece in chunk(&outbound, PAYLOAD_BYTES) {
                    rec.record_agent_chunk(&piece);
                }
            }
        }

        let frames = shared.writer.lock().await.write_paced_audio(&outbound).await?;
        tracing::debug!(frames, chars = text.chars().count(), "utterance played");
        Ok(())
    }

    /// Transient collaborator failure: apologize and return to listening
    /// instead of hanging up.
    async fn speak_apology(shared: &Shared) {
        let text = match shared.language {
            Language::Hindi => apology::HINDI,
            Language::English => apology::ENGLISH,
        };
        if let Err(e) = Self::speak(shared, text).await {
            tracing::warn!(error = %e, "apology playback failed");
        }
    }

    async fn teardown(shared: Arc<Shared>, cancel_tx: watch::Sender<bool>, outcome: &'static str) {
        shared.closed.store(true, Ordering::SeqCst);
        // Stop any in-flight playback between frames
        let _ = cancel_tx.send(true);

        if let Err(e) = shared.stt.lock().await.close().await {
            tracing::debug!(error = %e, "stt close");
        }

        // Persist end metadata. `finish` keeps an earlier terminal status,
        // so a completed call stays completed.
        if let Err(e) = shared
            .app
            .store
            .finish(&shared.call_id, ConversationStatus::Abandoned)
            .await
        {
            tracing::warn!(error = %e, "conversation finish failed");
        }

        if outcome == "ended" {
            if let Err(e) = shared.writer.lock().await.hangup().await {
                tracing::debug!(error = %e, "hangup frame not delivered");
            }
        }

        // Recording finalization proceeds from whatever was captured and
        // never fails the call
        let timeline = shared.recording.lock().take();
        if let (Some(timeline), Some(storage)) = (timeline, shared.app.storage.as_ref()) {
            if timeline.finalize(storage.as_ref()).await.is_none() {
                tracing::debug!(call_id = %shared.call_id, "no recording stored");
            }
        }

        shared.app.registry.remove(&shared.call_id);
        metrics::record_call_finished(outcome);
        tracing::info!(call_id = %shared.call_id, outcome, "session closed");
    }
}

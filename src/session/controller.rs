use anyhow::Result;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::config::{ControllerConfig, SessionRequest};
use super::status::{ConnectionState, SessionStatus, SessionSummary};
use super::transcript::{self, Role, TranscriptEntry, TranscriptLog};
use crate::audio::{capture, AudioSink, MicSource, MicSourceFactory, PlaybackQueue};
use crate::gateway::{CredentialClient, SessionFinalization, SessionStore};
use crate::session::SessionKind;
use crate::transport::{RealtimeConnection, ServerEvent, NORMAL_CLOSE};

/// Attributes of the session being attempted or running.
#[derive(Debug, Clone)]
struct SessionMeta {
    session_id: Option<String>,
    kind: SessionKind,
    topic: Option<String>,
}

/// Everything owned exclusively by the live session.
struct ActiveSession {
    source: Box<dyn MicSource>,
    connection: RealtimeConnection,
    capture_task: JoinHandle<()>,
    event_task: JoinHandle<()>,
    ticker_task: JoinHandle<()>,
}

/// Owns the voice session lifecycle: credential acquisition, microphone and
/// transport wiring, transcript collection, and the persistence handoff at
/// end-of-session. One session at a time; the state machine, not a lock,
/// enforces that.
pub struct SessionController {
    config: ControllerConfig,
    credentials: CredentialClient,
    store: SessionStore,

    state: Arc<StdMutex<ConnectionState>>,
    last_error: Arc<StdMutex<Option<String>>>,
    meta: Arc<StdMutex<Option<SessionMeta>>>,
    transcript: Arc<TranscriptLog>,
    muted: Arc<AtomicBool>,
    level: Arc<AtomicU32>,
    duration_secs: Arc<AtomicU64>,
    playback: Arc<PlaybackQueue>,
    active: Arc<Mutex<Option<ActiveSession>>>,
}

fn lock_or_recover<T>(mutex: &StdMutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SessionController {
    pub fn new(
        config: ControllerConfig,
        credentials: CredentialClient,
        store: SessionStore,
        sink: Arc<dyn AudioSink>,
    ) -> Self {
        let playback = Arc::new(PlaybackQueue::new(sink, config.playback_sample_rate));

        Self {
            config,
            credentials,
            store,
            state: Arc::new(StdMutex::new(ConnectionState::Idle)),
            last_error: Arc::new(StdMutex::new(None)),
            meta: Arc::new(StdMutex::new(None)),
            transcript: Arc::new(TranscriptLog::new()),
            muted: Arc::new(AtomicBool::new(false)),
            level: Arc::new(AtomicU32::new(0)),
            duration_secs: Arc::new(AtomicU64::new(0)),
            playback,
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Start a session: mint a credential, acquire the microphone, open the
    /// realtime transport, and wire capture and playback.
    ///
    /// Only valid from `idle` or `error`. Every failure path releases
    /// whatever was acquired and lands in `error` with a user-facing
    /// message; retry is manual.
    pub async fn start(&self, request: SessionRequest) -> Result<String> {
        let mut active_guard = self.active.lock().await;

        let current = self.connection_state();
        if active_guard.is_some()
            || !matches!(current, ConnectionState::Idle | ConnectionState::Error)
        {
            anyhow::bail!("a session is already active");
        }

        self.set_state(ConnectionState::Connecting);
        self.set_error(None);
        self.transcript.take();
        self.duration_secs.store(0, Ordering::SeqCst);
        self.muted.store(false, Ordering::SeqCst);
        self.set_meta(Some(SessionMeta {
            session_id: None,
            kind: request.session_type,
            topic: request.topic.clone(),
        }));

        info!("starting {} session", request.session_type.as_str());

        let grant = match self.credentials.request(&request).await {
            Ok(grant) => grant,
            Err(e) => return Err(self.fail_start(e)),
        };

        self.set_meta(Some(SessionMeta {
            session_id: Some(grant.session_id.clone()),
            kind: request.session_type,
            topic: request.topic.clone(),
        }));

        if let Some(prior_id) = &request.continued_from {
            // Continuation context is best-effort: a missing prior session
            // degrades to a fresh start.
            match self.store.load(prior_id).await {
                Ok(prior) => {
                    let prior_entries = prior.transcript.map(|t| t.len()).unwrap_or(0);
                    self.transcript.append(
                        Role::System,
                        format!("continuing session {} ({} prior entries)", prior_id, prior_entries),
                    );
                }
                Err(e) => warn!("could not load continuation context: {e:#}"),
            }
        }

        let mut source =
            match MicSourceFactory::create(self.config.source.clone(), self.config.capture.clone())
            {
                Ok(source) => source,
                Err(e) => return Err(self.fail_start(e)),
            };

        let frames = match source.start().await {
            Ok(frames) => frames,
            Err(e) => {
                if let Err(stop_err) = source.stop().await {
                    warn!("microphone release failed: {stop_err:#}");
                }
                return Err(self.fail_start(e));
            }
        };

        let (connection, events) =
            match RealtimeConnection::connect(&self.config.realtime_url, &grant).await {
                Ok(pair) => pair,
                Err(e) => {
                    if let Err(stop_err) = source.stop().await {
                        warn!("microphone release failed: {stop_err:#}");
                    }
                    return Err(self.fail_start(e));
                }
            };

        let capture_task = capture::spawn(
            frames,
            connection.sender(),
            Arc::clone(&self.muted),
            Arc::clone(&self.level),
        );

        let ticker_task = {
            let duration = Arc::clone(&self.duration_secs);
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(std::time::Duration::from_secs(1));
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    duration.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        let event_task = tokio::spawn(run_event_loop(self.event_ctx(), events));

        self.transcript.append(Role::System, "connected");
        self.set_state(ConnectionState::Connected);
        info!("session {} connected", grant.session_id);

        *active_guard = Some(ActiveSession {
            source,
            connection,
            capture_task,
            event_task,
            ticker_task,
        });

        Ok(grant.session_id)
    }

    /// End the session. Safe from any state, idempotent, never errors.
    ///
    /// Tears down transport, microphone, and playback. If a session id
    /// exists and the transcript minus system markers is non-empty, it
    /// persists the transcript synchronously and requests analysis
    /// fire-and-forget. Persistence failures are logged, never surfaced:
    /// teardown always completes.
    pub async fn end(&self) -> Option<SessionSummary> {
        let active = { self.active.lock().await.take() };

        let summary = if let Some(mut active) = active {
            // Event loop first, so nothing refills playback during teardown
            active.event_task.abort();
            active.capture_task.abort();
            active.ticker_task.abort();

            if let Err(e) = active.source.stop().await {
                warn!("microphone release failed: {e:#}");
            }
            // Dropping the connection drops the last outbound sender; the
            // writer closes the socket with code 1000.
            drop(active.connection);

            self.playback.interrupt().await;
            self.level.store(0, Ordering::SeqCst);

            self.finalize_session().await
        } else {
            self.playback.interrupt().await;
            self.level.store(0, Ordering::SeqCst);

            // Ending from error after an abnormal close still persists what
            // was said before the drop.
            self.finalize_session().await
        };

        self.duration_secs.store(0, Ordering::SeqCst);
        self.muted.store(false, Ordering::SeqCst);
        self.set_meta(None);
        self.set_error(None);
        self.set_state(ConnectionState::Idle);

        summary
    }

    async fn finalize_session(&self) -> Option<SessionSummary> {
        let session_id = {
            let meta = lock_or_recover(&self.meta);
            meta.as_ref().and_then(|m| m.session_id.clone())
        };

        let entries = self.transcript.take();
        let transcript = transcript::without_system(&entries);

        let session_id = session_id?;
        if transcript.is_empty() {
            return None;
        }

        let duration_seconds = self.duration_secs.load(Ordering::SeqCst);
        let transcript_entries = transcript.len();

        let body = SessionFinalization {
            transcript,
            duration_seconds,
            status: "completed".to_string(),
        };

        if let Err(e) = self.store.finalize(&session_id, &body).await {
            error!("session persistence failed: {e:#}");
        }

        let store = self.store.clone();
        let analysis_id = session_id.clone();
        tokio::spawn(async move {
            if let Err(e) = store.request_analysis(&analysis_id).await {
                warn!("analysis request failed: {e:#}");
            }
        });

        Some(SessionSummary {
            session_id,
            duration_seconds,
            transcript_entries,
        })
    }

    /// Flip the mute flag and disable the underlying track as well, so
    /// muting holds even if the software gate were bypassed.
    pub async fn toggle_mute(&self) -> bool {
        let muted = !self.muted.load(Ordering::SeqCst);
        self.muted.store(muted, Ordering::SeqCst);

        if let Some(active) = self.active.lock().await.as_ref() {
            active.source.set_enabled(!muted);
        }

        info!("microphone {}", if muted { "muted" } else { "live" });
        muted
    }

    pub fn connection_state(&self) -> ConnectionState {
        *lock_or_recover(&self.state)
    }

    pub fn status(&self) -> SessionStatus {
        let meta = lock_or_recover(&self.meta).clone();

        SessionStatus {
            state: self.connection_state(),
            session_id: meta.as_ref().and_then(|m| m.session_id.clone()),
            session_type: meta.as_ref().map(|m| m.kind),
            topic: meta.and_then(|m| m.topic),
            duration_seconds: self.duration_secs.load(Ordering::SeqCst),
            muted: self.muted.load(Ordering::SeqCst),
            speaking: self.playback.is_speaking(),
            mic_level: self.level.load(Ordering::SeqCst),
            last_error: lock_or_recover(&self.last_error).clone(),
        }
    }

    pub fn transcript_snapshot(&self) -> Vec<TranscriptEntry> {
        self.transcript.snapshot()
    }

    fn fail_start(&self, err: anyhow::Error) -> anyhow::Error {
        let message = format!("{err:#}");
        error!("session start failed: {message}");
        self.set_state(ConnectionState::Error);
        self.set_error(Some(message));
        err
    }

    fn set_state(&self, state: ConnectionState) {
        *lock_or_recover(&self.state) = state;
    }

    fn set_error(&self, message: Option<String>) {
        *lock_or_recover(&self.last_error) = message;
    }

    fn set_meta(&self, meta: Option<SessionMeta>) {
        *lock_or_recover(&self.meta) = meta;
    }

    fn event_ctx(&self) -> EventCtx {
        EventCtx {
            state: Arc::clone(&self.state),
            last_error: Arc::clone(&self.last_error),
            meta: Arc::clone(&self.meta),
            transcript: Arc::clone(&self.transcript),
            playback: Arc::clone(&self.playback),
            level: Arc::clone(&self.level),
            duration_secs: Arc::clone(&self.duration_secs),
            active: Arc::clone(&self.active),
        }
    }
}

/// Shared handles the inbound event loop needs; a plain snapshot of the
/// controller's owned state, so callbacks read one source of truth instead
/// of mirrored copies.
struct EventCtx {
    state: Arc<StdMutex<ConnectionState>>,
    last_error: Arc<StdMutex<Option<String>>>,
    meta: Arc<StdMutex<Option<SessionMeta>>>,
    transcript: Arc<TranscriptLog>,
    playback: Arc<PlaybackQueue>,
    level: Arc<AtomicU32>,
    duration_secs: Arc<AtomicU64>,
    active: Arc<Mutex<Option<ActiveSession>>>,
}

async fn run_event_loop(ctx: EventCtx, mut events: mpsc::Receiver<ServerEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            ServerEvent::Audio { data } => ctx.playback.enqueue_base64(&data).await,
            ServerEvent::Text { text } => ctx.transcript.append(Role::Ai, text),
            ServerEvent::Interrupted => {
                debug!("barge-in, flushing playback");
                ctx.playback.interrupt().await;
            }
            ServerEvent::TurnComplete => debug!("model turn complete"),
            ServerEvent::Closed { code, reason } => {
                if code == NORMAL_CLOSE {
                    info!("realtime connection closed cleanly");
                    release_after_close(&ctx, None).await;
                } else {
                    release_after_close(
                        &ctx,
                        Some(format!("connection closed (code {}): {}", code, reason)),
                    )
                    .await;
                }
                return;
            }
        }
    }
}

/// Teardown driven by the remote side. Persistence only ever happens through
/// an explicit `end()`; here resources are released and state settles to
/// `idle` (clean close) or `error` (anything else).
async fn release_after_close(ctx: &EventCtx, error: Option<String>) {
    if let Some(mut active) = ctx.active.lock().await.take() {
        active.capture_task.abort();
        active.ticker_task.abort();
        if let Err(e) = active.source.stop().await {
            warn!("microphone release failed: {e:#}");
        }
        // Dropping `active` drops this task's own join handle too, which
        // detaches (not cancels) the loop; we return immediately after.
    }

    ctx.playback.interrupt().await;
    ctx.level.store(0, Ordering::SeqCst);

    match error {
        Some(message) => {
            error!("{message}");
            *lock_or_recover(&ctx.last_error) = Some(message);
            *lock_or_recover(&ctx.state) = ConnectionState::Error;
        }
        None => {
            ctx.transcript.take();
            ctx.duration_secs.store(0, Ordering::SeqCst);
            *lock_or_recover(&ctx.meta) = None;
            *lock_or_recover(&ctx.state) = ConnectionState::Idle;
        }
    }
}

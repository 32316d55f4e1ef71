use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

use super::config::SessionConfig;
use super::merge::merge_transcript;
use crate::audio::{AudioBackend, AudioBackendFactory, AudioCaptureError};
use crate::authorization::{AuthorizationGate, AuthorizationStatus};
use crate::recognizer::{
    RecognitionChannel, RecognitionError, RecognitionRequest, RecognizerBackend,
    TranscriptEvent, TranscriptStream,
};

/// Errors surfaced to the session's caller.
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    #[error("microphone permission denied (status: {0:?})")]
    PermissionDenied(AuthorizationStatus),

    #[error(transparent)]
    Audio(#[from] AudioCaptureError),

    #[error(transparent)]
    Recognition(#[from] RecognitionError),

    #[error("a capture session is already active")]
    SessionAlreadyActive,
}

/// Update delivered to the session's caller.
#[derive(Debug, Clone)]
pub enum SessionUpdate {
    /// Live merged text; `is_final` marks the terminal transcript.
    Transcript { text: String, is_final: bool },
    /// The session failed. No further updates follow.
    Error(CaptureError),
}

/// Lifecycle states of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    RequestingAuthorization,
    Preparing,
    Listening,
    Finalizing,
}

enum SessionCommand {
    Stop,
    Cancel,
}

/// Handle to the one live session.
struct ActiveSession {
    commands: mpsc::UnboundedSender<SessionCommand>,
    finished: Arc<AtomicBool>,
    state: watch::Receiver<SessionState>,
}

/// Marks the session finished even if its task panics, so the active
/// slot can never wedge `SessionAlreadyActive`.
struct DoneGuard(Arc<AtomicBool>);

impl Drop for DoneGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Public surface of the speech capture core.
///
/// Owns the exclusive active-session slot: the microphone and recognition
/// service belong to at most one session at a time, and a second `start`
/// fails fast instead of interleaving audio from two sources.
pub struct CaptureService {
    gate: Arc<dyn AuthorizationGate>,
    audio: Arc<dyn AudioBackendFactory>,
    recognizer: Arc<dyn RecognizerBackend>,
    config: SessionConfig,
    active: Mutex<Option<ActiveSession>>,
}

impl CaptureService {
    pub fn new(
        gate: Arc<dyn AuthorizationGate>,
        audio: Arc<dyn AudioBackendFactory>,
        recognizer: Arc<dyn RecognizerBackend>,
        config: SessionConfig,
    ) -> Self {
        Self {
            gate,
            audio,
            recognizer,
            config,
            active: Mutex::new(None),
        }
    }

    /// Start a capture session.
    ///
    /// `baseline` is the text already present in the field; every update
    /// carries the baseline with the spoken-so-far transcript appended.
    /// Returns the session's update stream, which ends after the terminal
    /// transcript, after an error, or silently after cancellation.
    pub async fn start(
        &self,
        baseline: impl Into<String>,
    ) -> Result<mpsc::UnboundedReceiver<SessionUpdate>, CaptureError> {
        let mut active = self.active.lock().await;
        if let Some(session) = active.as_ref() {
            if !session.finished.load(Ordering::SeqCst) {
                return Err(CaptureError::SessionAlreadyActive);
            }
        }

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionState::Idle);
        let finished = Arc::new(AtomicBool::new(false));

        *active = Some(ActiveSession {
            commands: command_tx,
            finished: Arc::clone(&finished),
            state: state_rx,
        });

        let task = SessionTask {
            id: format!("memo-{}", Uuid::new_v4()),
            baseline: baseline.into(),
            locale: self.config.locale.clone(),
            gate: Arc::clone(&self.gate),
            audio: Arc::clone(&self.audio),
            recognizer: Arc::clone(&self.recognizer),
            updates: update_tx,
            state: state_tx,
        };
        tokio::spawn(async move {
            let _done = DoneGuard(finished);
            task.run(command_rx).await;
        });

        Ok(update_rx)
    }

    /// Request a graceful stop: capture halts and the session waits for
    /// the final transcript. No-op when no session is active.
    pub async fn stop(&self) {
        self.send(SessionCommand::Stop).await;
    }

    /// Abort the active session immediately: both resources are torn down
    /// and no terminal transcript is emitted. No-op when idle.
    pub async fn cancel(&self) {
        self.send(SessionCommand::Cancel).await;
    }

    /// Current session state; `Idle` when no session is active.
    pub async fn state(&self) -> SessionState {
        let active = self.active.lock().await;
        match active.as_ref() {
            Some(session) if !session.finished.load(Ordering::SeqCst) => {
                *session.state.borrow()
            }
            _ => SessionState::Idle,
        }
    }

    pub async fn is_active(&self) -> bool {
        let active = self.active.lock().await;
        active
            .as_ref()
            .map(|s| !s.finished.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    async fn send(&self, command: SessionCommand) {
        let active = self.active.lock().await;
        if let Some(session) = active.as_ref() {
            // A send to a finished session is harmlessly dropped.
            let _ = session.commands.send(command);
        }
    }
}

/// One end-to-end recording attempt, run as a single task.
///
/// All state transitions happen on this task: commands, audio frames and
/// transcript events are select!-ed here, so nothing races on session
/// state even though they arrive from different sources.
struct SessionTask {
    id: String,
    baseline: String,
    locale: String,
    gate: Arc<dyn AuthorizationGate>,
    audio: Arc<dyn AudioBackendFactory>,
    recognizer: Arc<dyn RecognizerBackend>,
    updates: mpsc::UnboundedSender<SessionUpdate>,
    state: watch::Sender<SessionState>,
}

impl SessionTask {
    async fn run(self, mut commands: mpsc::UnboundedReceiver<SessionCommand>) {
        info!("capture session {} starting", self.id);

        // ── RequestingAuthorization ─────────────────────────────────────
        self.set_state(SessionState::RequestingAuthorization);

        let status = tokio::select! {
            status = self.gate.request_authorization() => status,
            _ = commands.recv() => {
                // Nothing acquired yet; stop and cancel both just end
                // the attempt without a terminal transcript.
                info!("capture session {} aborted during authorization", self.id);
                return;
            }
        };

        if !status.is_granted() {
            self.fail(CaptureError::PermissionDenied(status));
            return;
        }

        // ── Preparing ───────────────────────────────────────────────────
        // Channel first, then the pipeline; if the pipeline fails the
        // already-open channel is released before the error surfaces.
        self.set_state(SessionState::Preparing);

        let request = RecognitionRequest {
            session_id: self.id.clone(),
            locale: self.locale.clone(),
        };
        let channel = tokio::select! {
            result = self.recognizer.open(request) => match result {
                Ok(channel) => channel,
                Err(e) => {
                    self.fail(e.into());
                    return;
                }
            },
            _ = commands.recv() => {
                info!("capture session {} aborted while preparing", self.id);
                return;
            }
        };
        let RecognitionChannel {
            mut sink,
            mut events,
        } = channel;

        let mut backend = match self.audio.create() {
            Ok(backend) => backend,
            Err(e) => {
                events.cancel();
                self.fail(e.into());
                return;
            }
        };
        let mut frames = match backend.start().await {
            Ok(frames) => frames,
            Err(e) => {
                events.cancel();
                self.fail(e.into());
                return;
            }
        };

        // ── Listening ───────────────────────────────────────────────────
        self.set_state(SessionState::Listening);
        info!("capture session {} listening ({})", self.id, backend.name());

        loop {
            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(SessionCommand::Stop) => break,
                    // A dropped service handle counts as cancellation too.
                    Some(SessionCommand::Cancel) | None => {
                        self.cancel_session(&mut events, &mut backend).await;
                        return;
                    }
                },

                event = events.next() => match event {
                    Some(TranscriptEvent::Partial(text)) => {
                        if !self.emit_transcript(&text, false) {
                            // Caller dropped the update stream: cancel.
                            self.cancel_session(&mut events, &mut backend).await;
                            return;
                        }
                    }
                    Some(TranscriptEvent::Final(text)) => {
                        // Service finalized on its own (end of utterance).
                        let _ = backend.stop().await;
                        self.emit_transcript(&text, true);
                        info!("capture session {} finished", self.id);
                        return;
                    }
                    Some(TranscriptEvent::Failed(e)) => {
                        let _ = backend.stop().await;
                        self.fail(e.into());
                        return;
                    }
                    None => {
                        let _ = backend.stop().await;
                        self.fail(RecognitionError::ServiceError(
                            "recognition stream ended without a result".to_string(),
                        ).into());
                        return;
                    }
                },

                frame = frames.recv() => match frame {
                    Some(frame) => sink.feed(&frame).await,
                    // Capture ended underneath us; finalize with what
                    // the service has heard so far.
                    None => break,
                },
            }
        }

        // ── Finalizing ──────────────────────────────────────────────────
        self.set_state(SessionState::Finalizing);
        let _ = backend.stop().await;
        sink.finish().await;

        loop {
            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    // Stop is already in progress; a second one is a no-op.
                    Some(SessionCommand::Stop) => {}
                    Some(SessionCommand::Cancel) | None => {
                        events.cancel();
                        info!("capture session {} cancelled while finalizing", self.id);
                        return;
                    }
                },

                event = events.next() => match event {
                    Some(TranscriptEvent::Partial(text)) => {
                        if !self.emit_transcript(&text, false) {
                            events.cancel();
                            return;
                        }
                    }
                    Some(TranscriptEvent::Final(text)) => {
                        self.emit_transcript(&text, true);
                        info!("capture session {} finished", self.id);
                        return;
                    }
                    Some(TranscriptEvent::Failed(e)) => {
                        self.fail(e.into());
                        return;
                    }
                    None => {
                        self.fail(RecognitionError::ServiceError(
                            "recognition stream ended without a result".to_string(),
                        ).into());
                        return;
                    }
                },
            }
        }
    }

    /// Cancellation path: suppress events first, then halt capture.
    async fn cancel_session(
        &self,
        events: &mut TranscriptStream,
        backend: &mut Box<dyn AudioBackend>,
    ) {
        events.cancel();
        let _ = backend.stop().await;
        info!("capture session {} cancelled", self.id);
    }

    /// Emit a merged transcript update. Returns false when the caller has
    /// dropped the update stream.
    fn emit_transcript(&self, spoken: &str, is_final: bool) -> bool {
        let text = merge_transcript(&self.baseline, spoken);
        self.updates
            .send(SessionUpdate::Transcript { text, is_final })
            .is_ok()
    }

    /// Surface an error once and end the session. Previously-typed text is
    /// never touched by an error.
    fn fail(&self, error: CaptureError) {
        warn!("capture session {} failed: {}", self.id, error);
        let _ = self.updates.send(SessionUpdate::Error(error));
    }

    fn set_state(&self, state: SessionState) {
        let _ = self.state.send(state);
    }
}

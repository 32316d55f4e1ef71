// Recognition channel abstractions.
//
// A channel is one recognition pass: audio frames go in through the sink,
// transcript events come out of the stream. The stream is finite (zero or
// more partials, then exactly one terminal event) and not restartable; a
// new pass needs a new channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::audio::AudioFrame;

/// Failures reported by the recognition service.
#[derive(Debug, Clone, Error)]
pub enum RecognitionError {
    /// The requested locale/model is not available, or the service
    /// cannot be reached at all.
    #[error("recognizer unavailable: {0}")]
    RecognizerUnavailable(String),

    /// Speech authorization was revoked while the stream was live.
    #[error("speech authorization lost: {0}")]
    AuthorizationLost(String),

    /// Any other failure reported by the service.
    #[error("recognition service error: {0}")]
    ServiceError(String),
}

/// One event in a recognition pass.
#[derive(Debug, Clone)]
pub enum TranscriptEvent {
    /// Interim result; each partial replaces the previous one.
    Partial(String),
    /// The utterance's final transcript. Terminal.
    Final(String),
    /// The pass failed. Terminal.
    Failed(RecognitionError),
}

impl TranscriptEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TranscriptEvent::Final(_) | TranscriptEvent::Failed(_))
    }
}

/// Parameters for opening a recognition pass.
#[derive(Debug, Clone)]
pub struct RecognitionRequest {
    /// Correlates frames and transcripts on the wire
    pub session_id: String,
    /// BCP 47 tag, e.g. "ja-JP"
    pub locale: String,
}

/// The feed half of an open channel.
#[async_trait::async_trait]
pub trait RecognitionSink: Send {
    /// Forward one captured frame.
    ///
    /// Never fails synchronously; transport problems are logged and any
    /// persistent failure surfaces on the event side as `Failed`.
    async fn feed(&mut self, frame: &AudioFrame);

    /// Signal end-of-audio so the service can emit its final result.
    async fn finish(&mut self);
}

/// The event half of an open channel.
///
/// `cancel` guarantees that no event is surfaced after it returns, even if
/// the service had already queued a terminal event: the cancellation flag
/// is stored before the listener is aborted and re-checked after every
/// receive.
pub struct TranscriptStream {
    rx: mpsc::UnboundedReceiver<TranscriptEvent>,
    cancelled: Arc<AtomicBool>,
    listener: Option<JoinHandle<()>>,
    terminal_seen: bool,
}

impl TranscriptStream {
    /// Wrap a raw event receiver, optionally owning the producer task so
    /// cancellation can abort it.
    pub fn new(
        rx: mpsc::UnboundedReceiver<TranscriptEvent>,
        listener: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            rx,
            cancelled: Arc::new(AtomicBool::new(false)),
            listener,
            terminal_seen: false,
        }
    }

    /// Next event, or `None` once the stream is exhausted or cancelled.
    pub async fn next(&mut self) -> Option<TranscriptEvent> {
        if self.terminal_seen || self.cancelled.load(Ordering::Acquire) {
            return None;
        }

        let event = self.rx.recv().await?;

        // A cancel that raced the receive wins: the event is discarded.
        if self.cancelled.load(Ordering::Acquire) {
            return None;
        }

        if event.is_terminal() {
            self.terminal_seen = true;
        }
        Some(event)
    }

    /// Abort the pass, suppressing all further events.
    ///
    /// Idempotent. After this returns, `next` yields `None` forever.
    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(task) = self.listener.take() {
            task.abort();
        }
        self.rx.close();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Drop for TranscriptStream {
    fn drop(&mut self) {
        if let Some(task) = self.listener.take() {
            task.abort();
        }
    }
}

/// An open channel to the recognition service.
pub struct RecognitionChannel {
    pub sink: Box<dyn RecognitionSink>,
    pub events: TranscriptStream,
}

/// Opens recognition channels against the external service.
#[async_trait::async_trait]
pub trait RecognizerBackend: Send + Sync {
    async fn open(
        &self,
        request: RecognitionRequest,
    ) -> Result<RecognitionChannel, RecognitionError>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_with_events(events: Vec<TranscriptEvent>) -> TranscriptStream {
        let (tx, rx) = mpsc::unbounded_channel();
        for event in events {
            tx.send(event).unwrap();
        }
        drop(tx);
        TranscriptStream::new(rx, None)
    }

    #[tokio::test]
    async fn partials_then_terminal_then_closed() {
        let mut stream = stream_with_events(vec![
            TranscriptEvent::Partial("a".into()),
            TranscriptEvent::Partial("ab".into()),
            TranscriptEvent::Final("abc".into()),
        ]);

        assert!(matches!(stream.next().await, Some(TranscriptEvent::Partial(t)) if t == "a"));
        assert!(matches!(stream.next().await, Some(TranscriptEvent::Partial(t)) if t == "ab"));
        assert!(matches!(stream.next().await, Some(TranscriptEvent::Final(t)) if t == "abc"));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn nothing_after_terminal_even_if_more_queued() {
        let mut stream = stream_with_events(vec![
            TranscriptEvent::Final("done".into()),
            TranscriptEvent::Partial("stray".into()),
        ]);

        assert!(matches!(stream.next().await, Some(TranscriptEvent::Final(_))));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn cancel_suppresses_queued_terminal() {
        // The terminal event is already in the channel when cancel lands.
        let mut stream = stream_with_events(vec![TranscriptEvent::Final("too late".into())]);

        stream.cancel();
        assert!(stream.next().await.is_none());
        assert!(stream.is_cancelled());
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let mut stream = stream_with_events(vec![TranscriptEvent::Partial("x".into())]);

        stream.cancel();
        stream.cancel();
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn failed_is_terminal() {
        let mut stream = stream_with_events(vec![TranscriptEvent::Failed(
            RecognitionError::ServiceError("boom".into()),
        )]);

        assert!(matches!(stream.next().await, Some(TranscriptEvent::Failed(_))));
        assert!(stream.next().await.is_none());
    }
}
